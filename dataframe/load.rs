use super::*;
use std::{collections::BTreeMap, path::Path};
use thiserror::Error;

#[derive(Clone)]
pub struct FromCsvOptions<'a> {
	/// Column types to use instead of inferring them. Columns not present in the map are inferred.
	pub column_types: Option<BTreeMap<String, ColumnType>>,
	pub invalid_values: &'a [&'a str],
}

impl<'a> Default for FromCsvOptions<'a> {
	fn default() -> Self {
		Self {
			column_types: None,
			invalid_values: INVALID_VALUES,
		}
	}
}

/// These values are the default values that are considered missing.
pub const INVALID_VALUES: &[&str] = &[
	"", "null", "NULL", "n/a", "N/A", "nan", "-nan", "NaN", "-NaN", "?",
];

#[derive(Debug, Error)]
pub enum FromCsvError {
	#[error(transparent)]
	Csv(#[from] csv::Error),
	#[error("column \"{column_name}\" contains a value that is not valid utf-8")]
	Utf8 { column_name: String },
}

impl DataFrame {
	pub fn from_path(
		path: &Path,
		options: FromCsvOptions,
		progress: impl Fn(u64),
	) -> Result<Self, FromCsvError> {
		Self::from_csv(&mut csv::Reader::from_path(path)?, options, progress)
	}

	pub fn from_csv<R>(
		reader: &mut csv::Reader<R>,
		options: FromCsvOptions,
		progress: impl Fn(u64),
	) -> Result<Self, FromCsvError>
	where
		R: std::io::Read + std::io::Seek,
	{
		let column_names: Vec<String> = reader
			.headers()?
			.into_iter()
			.map(|column_name| column_name.trim().to_owned())
			.collect();
		let n_columns = column_names.len();
		let start_position = reader.position().clone();
		let invalid_values = options.invalid_values;
		let mut n_rows = None;

		#[derive(Clone, Debug)]
		enum ColumnTypeOrInferStats<'a> {
			ColumnType(ColumnType),
			InferStats(InferStats<'a>),
		}

		// Retrieve any column types present in the options.
		let mut column_types: Vec<ColumnTypeOrInferStats> = if let Some(column_types) =
			options.column_types.as_ref()
		{
			column_names
				.iter()
				.map(|column_name| {
					column_types
						.get(column_name)
						.map(|column_type| ColumnTypeOrInferStats::ColumnType(*column_type))
						.unwrap_or_else(|| {
							ColumnTypeOrInferStats::InferStats(InferStats::new(invalid_values))
						})
				})
				.collect()
		} else {
			vec![ColumnTypeOrInferStats::InferStats(InferStats::new(invalid_values)); n_columns]
		};

		// Passing over the csv to infer column types is only necessary if one or more columns did not have its type specified.
		let needs_infer = column_types.iter().any(|column_type_or_infer_stats| {
			matches!(
				column_type_or_infer_stats,
				ColumnTypeOrInferStats::InferStats(_)
			)
		});

		let column_types: Vec<ColumnType> = if needs_infer {
			let mut infer_stats: Vec<(usize, &mut InferStats)> = column_types
				.iter_mut()
				.enumerate()
				.filter_map(
					|(index, column_type_or_infer_stats)| match column_type_or_infer_stats {
						ColumnTypeOrInferStats::ColumnType(_) => None,
						ColumnTypeOrInferStats::InferStats(infer_stats) => {
							Some((index, infer_stats))
						}
					},
				)
				.collect();
			let mut record = csv::StringRecord::new();
			let mut n_rows_computed = 0;
			while reader.read_record(&mut record)? {
				n_rows_computed += 1;
				for (index, infer_stats) in infer_stats.iter_mut() {
					if let Some(value) = record.get(*index) {
						infer_stats.update(value);
					}
				}
			}
			n_rows = Some(n_rows_computed);
			let column_types = column_types
				.into_iter()
				.map(
					|column_type_or_infer_stats| match column_type_or_infer_stats {
						ColumnTypeOrInferStats::ColumnType(column_type) => column_type,
						ColumnTypeOrInferStats::InferStats(infer_stats) => infer_stats.finalize(),
					},
				)
				.collect();
			// After inference, return back to the beginning of the csv to load the values.
			reader.seek(start_position)?;
			column_types
		} else {
			column_types
				.into_iter()
				.filter_map(
					|column_type_or_infer_stats| match column_type_or_infer_stats {
						ColumnTypeOrInferStats::ColumnType(column_type) => Some(column_type),
						ColumnTypeOrInferStats::InferStats(_) => None,
					},
				)
				.collect()
		};

		let mut dataframe = Self::new(column_names, column_types);
		// If an inference pass was done, reserve storage for the values because we know how many rows are in the csv.
		if let Some(n_rows) = n_rows {
			for column in dataframe.columns.iter_mut() {
				match column {
					Column::Unknown(_) | Column::Enum(_) => {}
					Column::Number(column) => column.data.reserve_exact(n_rows),
					Column::Text(column) => column.data.reserve_exact(n_rows),
				}
			}
		}
		// Read each csv record and insert the values into the columns of the dataframe.
		let mut record = csv::ByteRecord::new();
		while reader.read_byte_record(&mut record)? {
			if let Some(position) = record.position() {
				progress(position.byte());
			}
			for (index, column) in dataframe.columns.iter_mut().enumerate() {
				let value = record.get(index).unwrap_or(b"");
				match column {
					Column::Unknown(column) => {
						column.len += 1;
					}
					Column::Number(column) => {
						let value = match lexical::parse::<f32, _>(trim_ascii(value)) {
							Ok(value) if value.is_finite() => value,
							_ => std::f32::NAN,
						};
						column.data.push(value);
					}
					Column::Enum(_) => unreachable!(),
					Column::Text(column) => {
						let value =
							std::str::from_utf8(value).map_err(|_| FromCsvError::Utf8 {
								column_name: column.name.clone(),
							})?;
						column.data.push(value.to_owned());
					}
				}
			}
		}
		Ok(dataframe)
	}
}

fn trim_ascii(value: &[u8]) -> &[u8] {
	let start = value
		.iter()
		.position(|byte| !byte.is_ascii_whitespace())
		.unwrap_or_else(|| value.len());
	let end = value
		.iter()
		.rposition(|byte| !byte.is_ascii_whitespace())
		.map(|position| position + 1)
		.unwrap_or(start);
	&value[start..end]
}

#[derive(Clone, Debug)]
pub struct InferStats<'a> {
	invalid_values: &'a [&'a str],
	column_type: InferColumnType,
}

#[derive(PartialEq, Clone, Copy, Debug)]
enum InferColumnType {
	Unknown,
	Number,
	Text,
}

impl<'a> InferStats<'a> {
	pub fn new(invalid_values: &'a [&'a str]) -> Self {
		Self {
			invalid_values,
			column_type: InferColumnType::Unknown,
		}
	}

	pub fn update(&mut self, value: &str) {
		let value = value.trim();
		if self.invalid_values.contains(&value) {
			return;
		}
		match self.column_type {
			InferColumnType::Unknown | InferColumnType::Number => {
				if lexical::parse::<f32, _>(value)
					.map(|v| v.is_finite())
					.unwrap_or(false)
				{
					self.column_type = InferColumnType::Number;
				} else {
					self.column_type = InferColumnType::Text;
				}
			}
			InferColumnType::Text => {}
		}
	}

	pub fn finalize(self) -> ColumnType {
		match self.column_type {
			InferColumnType::Unknown => ColumnType::Unknown,
			InferColumnType::Number => ColumnType::Number,
			InferColumnType::Text => ColumnType::Text,
		}
	}
}

#[test]
fn test_infer() {
	let csv = r#"number,text,missing
1,test,
2, hello,NaN
,world,?
"#;
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions::default(),
		|_| {},
	)
	.unwrap();
	assert_eq!(df.nrows(), 3);
	let number = df.column("number").unwrap().as_number().unwrap();
	assert_eq!(number.data[..2], [1.0, 2.0]);
	assert!(number.data[2].is_nan());
	insta::assert_debug_snapshot!(&df.columns[1..], @r###"
	[
	    Text(
	        TextColumn {
	            name: "text",
	            data: [
	                "test",
	                " hello",
	                "world",
	            ],
	        },
	    ),
	    Unknown(
	        UnknownColumn {
	            name: "missing",
	            len: 3,
	        },
	    ),
	]
	"###);
}

#[test]
fn test_column_types() {
	let csv = r#"code,count
1,3
1.0,x
A,
"#;
	let mut column_types = BTreeMap::new();
	column_types.insert("code".to_owned(), ColumnType::Text);
	column_types.insert("count".to_owned(), ColumnType::Number);
	let df = DataFrame::from_csv(
		&mut csv::Reader::from_reader(std::io::Cursor::new(csv)),
		FromCsvOptions {
			column_types: Some(column_types),
			..Default::default()
		},
		|_| {},
	)
	.unwrap();
	assert_eq!(
		df.column("code").unwrap().as_text().unwrap().data,
		vec!["1".to_owned(), "1.0".to_owned(), "A".to_owned()]
	);
	let count = &df.column("count").unwrap().as_number().unwrap().data;
	assert_eq!(count[0], 3.0);
	assert!(count[1].is_nan());
	assert!(count[2].is_nan());
}
