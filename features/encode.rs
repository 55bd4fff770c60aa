use crate::code_map::{canonical_values, CodeMap};
use ivf_dataframe::{Column, DataFrame, EnumColumn};
use thiserror::Error;

/// Which values a categorical column's code map is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vocabulary {
	/// Build the map from the union of the train and eval values. The eval table must be known when encoding.
	Joint,
	/// Build the map from the train values only and map unseen eval values to a reserved code.
	TrainOnly,
}

impl Default for Vocabulary {
	fn default() -> Self {
		Vocabulary::Joint
	}
}

#[derive(Debug, Error, PartialEq)]
pub enum EncodeError {
	#[error("no categorical columns were given to encode")]
	MissingCategoricalList,
}

/// The reason a single column could not be encoded. A failed column is left unchanged in both tables.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ColumnFailure {
	#[error("column \"{column_name}\" was not found in the {table} table")]
	ColumnNotFound {
		column_name: String,
		table: &'static str,
	},
	#[error("column \"{column_name}\" in the {table} table is a {column_type} column and cannot be encoded as categories")]
	UnsupportedColumnType {
		column_name: String,
		table: &'static str,
		column_type: &'static str,
	},
}

impl ColumnFailure {
	pub fn column_name(&self) -> &str {
		match self {
			ColumnFailure::ColumnNotFound { column_name, .. } => column_name,
			ColumnFailure::UnsupportedColumnType { column_name, .. } => column_name,
		}
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct EncodedColumn {
	pub column_name: String,
	pub code_map: CodeMap,
}

/// The outcome of encoding every requested column. Each column succeeds or fails on its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EncodeReport {
	pub encoded: Vec<EncodedColumn>,
	pub failures: Vec<ColumnFailure>,
}

impl EncodeReport {
	pub fn is_success(&self) -> bool {
		self.failures.is_empty()
	}

	pub fn code_map(&self, column_name: &str) -> Option<&CodeMap> {
		self.encoded
			.iter()
			.find(|encoded| encoded.column_name == column_name)
			.map(|encoded| &encoded.code_map)
	}
}

/**
Encode the categorical columns `column_names` of both `train` and `eval` into dense integer codes.

For every column, all train and eval values are converted to their canonical string form, a [`CodeMap`](../code_map/struct.CodeMap.html) is built according to `vocabulary`, and both columns are replaced by enum columns holding the codes, in the original row order.

Returns an error only if `column_names` is empty. Columns that are missing or already encoded are reported in [`EncodeReport::failures`] and the remaining columns are still encoded.
*/
pub fn encode_categorical(
	train: &mut DataFrame,
	eval: &mut DataFrame,
	column_names: &[&str],
	vocabulary: Vocabulary,
) -> Result<EncodeReport, EncodeError> {
	if column_names.is_empty() {
		return Err(EncodeError::MissingCategoricalList);
	}
	let mut report = EncodeReport::default();
	for column_name in column_names {
		match encode_column(train, eval, column_name, vocabulary) {
			Ok(code_map) => {
				tracing::info!(column = %column_name, code_map = %code_map, "encoded categorical column");
				report.encoded.push(EncodedColumn {
					column_name: (*column_name).to_owned(),
					code_map,
				});
			}
			Err(failure) => {
				tracing::warn!("{}", failure);
				report.failures.push(failure);
			}
		}
	}
	tracing::info!(
		n_encoded = report.encoded.len(),
		n_failed = report.failures.len(),
		"encoded categorical columns"
	);
	Ok(report)
}

fn encode_column(
	train: &mut DataFrame,
	eval: &mut DataFrame,
	column_name: &str,
	vocabulary: Vocabulary,
) -> Result<CodeMap, ColumnFailure> {
	// Validate both columns before touching either, so a failure leaves both tables unchanged.
	let train_values = column_canonical_values(train, column_name, "train")?;
	let eval_values = column_canonical_values(eval, column_name, "eval")?;
	let code_map = match vocabulary {
		Vocabulary::Joint => CodeMap::build_joint(
			train_values.iter().map(|value| value.as_str()),
			eval_values.iter().map(|value| value.as_str()),
		),
		Vocabulary::TrainOnly => {
			CodeMap::build_train_only(train_values.iter().map(|value| value.as_str()))
		}
	};
	replace_with_codes(train, column_name, &train_values, &code_map);
	replace_with_codes(eval, column_name, &eval_values, &code_map);
	Ok(code_map)
}

fn column_canonical_values(
	dataframe: &DataFrame,
	column_name: &str,
	table: &'static str,
) -> Result<Vec<String>, ColumnFailure> {
	let column = dataframe
		.column(column_name)
		.ok_or_else(|| ColumnFailure::ColumnNotFound {
			column_name: column_name.to_owned(),
			table,
		})?;
	canonical_values(column).ok_or_else(|| ColumnFailure::UnsupportedColumnType {
		column_name: column_name.to_owned(),
		table,
		column_type: column.column_type_name(),
	})
}

fn replace_with_codes(
	dataframe: &mut DataFrame,
	column_name: &str,
	values: &[String],
	code_map: &CodeMap,
) {
	let data = values
		.iter()
		.map(|value| {
			code_map
				.code(value)
				.expect("the code map covers every value it was built from")
		})
		.collect();
	if let Some(column) = dataframe.column_mut(column_name) {
		*column = Column::Enum(EnumColumn {
			name: column_name.to_owned(),
			options: code_map.encoded_options(),
			data,
		});
	}
}

#[cfg(test)]
fn text_dataframe(columns: &[(&str, &[&str])]) -> DataFrame {
	use ivf_dataframe::TextColumn;
	DataFrame {
		columns: columns
			.iter()
			.map(|(name, values)| {
				Column::Text(TextColumn {
					name: (*name).to_owned(),
					data: values.iter().map(|value| (*value).to_owned()).collect(),
				})
			})
			.collect(),
	}
}

#[test]
fn test_encode_joint() {
	let mut train = text_dataframe(&[("cat", &["A", "B", "A", "C", "B"])]);
	let mut eval = text_dataframe(&[("cat", &["B", "D"])]);
	let report = encode_categorical(&mut train, &mut eval, &["cat"], Vocabulary::Joint).unwrap();
	assert!(report.is_success());
	let code_map = report.code_map("cat").unwrap();
	assert_eq!(code_map.options(), ["A", "B", "C", "D"]);
	let train_column = train.column("cat").unwrap().as_enum().unwrap();
	assert_eq!(train_column.data, vec![0, 1, 0, 2, 1]);
	assert_eq!(train_column.options, vec!["A", "B", "C", "D"]);
	assert_eq!(eval.column("cat").unwrap().as_enum().unwrap().data, vec![1, 3]);
}

#[test]
fn test_encode_normalizes_mixed_representations() {
	use ivf_dataframe::NumberColumn;
	let mut train = DataFrame {
		columns: vec![Column::Number(NumberColumn {
			name: "count".to_owned(),
			data: vec![1.0, 2.0, std::f32::NAN],
		})],
	};
	let mut eval = text_dataframe(&[("count", &["1", "2.0", "", "6 이상"])]);
	let report =
		encode_categorical(&mut train, &mut eval, &["count"], Vocabulary::Joint).unwrap();
	insta::assert_snapshot!(report.code_map("count").unwrap().to_string(), @r###"{"1": 0, "2": 1, "6 이상": 2, "nan": 3}"###);
	assert_eq!(
		train.column("count").unwrap().as_enum().unwrap().data,
		vec![0, 1, 3]
	);
	assert_eq!(
		eval.column("count").unwrap().as_enum().unwrap().data,
		vec![0, 1, 3, 2]
	);
}

#[test]
fn test_encode_train_only() {
	let mut train = text_dataframe(&[("cat", &["A", "B"])]);
	let mut eval = text_dataframe(&[("cat", &["B", "D"])]);
	let report =
		encode_categorical(&mut train, &mut eval, &["cat"], Vocabulary::TrainOnly).unwrap();
	assert_eq!(report.code_map("cat").unwrap().len(), 2);
	let eval_column = eval.column("cat").unwrap().as_enum().unwrap();
	assert_eq!(eval_column.data, vec![1, 2]);
	assert_eq!(eval_column.options, vec!["A", "B", "<unseen>"]);
}

#[test]
fn test_encode_empty_list() {
	let mut train = text_dataframe(&[("cat", &["A"])]);
	let mut eval = text_dataframe(&[("cat", &["A"])]);
	assert_eq!(
		encode_categorical(&mut train, &mut eval, &[], Vocabulary::Joint),
		Err(EncodeError::MissingCategoricalList)
	);
}

#[test]
fn test_encode_reports_failures_per_column() {
	let mut train = text_dataframe(&[("a", &["x", "y"]), ("b", &["p", "q"])]);
	let mut eval = text_dataframe(&[("a", &["y"]), ("b", &["q"])]);
	let report =
		encode_categorical(&mut train, &mut eval, &["a", "missing", "b"], Vocabulary::Joint)
			.unwrap();
	assert!(!report.is_success());
	assert_eq!(report.encoded.len(), 2);
	assert_eq!(
		report.failures,
		vec![ColumnFailure::ColumnNotFound {
			column_name: "missing".to_owned(),
			table: "train",
		}]
	);
	assert!(train.column("b").unwrap().as_enum().is_some());
}

#[test]
fn test_encode_rejects_encoded_column() {
	let mut train = text_dataframe(&[("cat", &["A", "B"])]);
	let mut eval = text_dataframe(&[("cat", &["B"])]);
	encode_categorical(&mut train, &mut eval, &["cat"], Vocabulary::Joint).unwrap();
	let encoded_train = train.clone();
	let encoded_eval = eval.clone();
	let report = encode_categorical(&mut train, &mut eval, &["cat"], Vocabulary::Joint).unwrap();
	assert_eq!(
		report.failures,
		vec![ColumnFailure::UnsupportedColumnType {
			column_name: "cat".to_owned(),
			table: "train",
			column_type: "enum",
		}]
	);
	assert_eq!(train, encoded_train);
	assert_eq!(eval, encoded_eval);
}

#[cfg(test)]
#[derive(Clone, Default)]
struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

#[cfg(test)]
impl std::io::Write for LogBuffer {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.0.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

#[test]
fn test_encode_logs_code_maps_at_info_level() {
	let buffer = LogBuffer::default();
	let writer = buffer.clone();
	let subscriber = tracing_subscriber::fmt()
		.with_max_level(tracing::Level::INFO)
		.with_ansi(false)
		.with_writer(move || writer.clone())
		.finish();
	let mut train = text_dataframe(&[("cat", &["A", "B"])]);
	let mut eval = text_dataframe(&[("cat", &["C"])]);
	tracing::subscriber::with_default(subscriber, || {
		encode_categorical(&mut train, &mut eval, &["cat"], Vocabulary::Joint).unwrap();
	});
	let logs = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
	assert!(logs.contains(r#"column=cat code_map={"A": 0, "B": 1, "C": 2}"#));
}
