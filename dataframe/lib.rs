/*!
This crate provides a basic implementation of dataframes, which are two dimensional arrays of data where each column can have a different data type, like a spreadsheet. It only implements what the preprocessing pipeline needs: loading from csv, dropping and gathering columns and rows, and writing back to csv.
*/

pub mod load;

pub use self::load::*;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Unknown(UnknownColumn),
	Number(NumberColumn),
	Enum(EnumColumn),
	Text(TextColumn),
}

/// A column in which no valid value was found. Only its length is tracked.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumn {
	pub name: String,
	pub len: usize,
}

/// A number column. Missing values are stored as `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

/// An encoded categorical column. Every value is an index into `options`.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumColumn {
	pub name: String,
	pub options: Vec<String>,
	pub data: Vec<usize>,
}

/// A column holding the raw text of each cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TextColumn {
	pub name: String,
	pub data: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColumnType {
	Unknown,
	Number,
	Text,
}

impl DataFrame {
	pub fn new(column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
		let columns = column_names
			.into_iter()
			.zip(column_types.into_iter())
			.map(|(column_name, column_type)| match column_type {
				ColumnType::Unknown => Column::Unknown(UnknownColumn::new(column_name)),
				ColumnType::Number => Column::Number(NumberColumn::new(column_name)),
				ColumnType::Text => Column::Text(TextColumn::new(column_name)),
			})
			.collect();
		Self { columns }
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn column_names(&self) -> Vec<&str> {
		self.columns.iter().map(|column| column.name()).collect()
	}

	pub fn column_index(&self, name: &str) -> Option<usize> {
		self.columns.iter().position(|column| column.name() == name)
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|column| column.name() == name)
	}

	pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
		self.columns.iter_mut().find(|column| column.name() == name)
	}

	pub fn remove_column(&mut self, name: &str) -> Option<Column> {
		let index = self.column_index(name)?;
		Some(self.columns.remove(index))
	}

	/// Keep only the columns for which `f` returns true, preserving their order. Returns the number of columns removed.
	pub fn retain_columns(&mut self, mut f: impl FnMut(&Column) -> bool) -> usize {
		let n_columns_before = self.columns.len();
		self.columns.retain(|column| f(column));
		n_columns_before - self.columns.len()
	}

	/// Create a new dataframe with the rows at `indices`, in the order given.
	pub fn take_rows(&self, indices: &[usize]) -> Self {
		let columns = self
			.columns
			.iter()
			.map(|column| column.take_rows(indices))
			.collect();
		Self { columns }
	}

	pub fn to_csv<W>(&self, writer: &mut csv::Writer<W>) -> csv::Result<()>
	where
		W: std::io::Write,
	{
		writer.write_record(self.columns.iter().map(|column| column.name()))?;
		let mut record = csv::StringRecord::with_capacity(0, self.ncols());
		for index in 0..self.nrows() {
			record.clear();
			for column in self.columns.iter() {
				record.push_field(&column.cell_to_string(index));
			}
			writer.write_record(&record)?;
		}
		writer.flush()?;
		Ok(())
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Unknown(s) => s.len,
			Self::Number(s) => s.data.len(),
			Self::Enum(s) => s.data.len(),
			Self::Text(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		match self {
			Self::Unknown(s) => s.len == 0,
			Self::Number(s) => s.data.is_empty(),
			Self::Enum(s) => s.data.is_empty(),
			Self::Text(s) => s.data.is_empty(),
		}
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Unknown(s) => s.name.as_str(),
			Self::Number(s) => s.name.as_str(),
			Self::Enum(s) => s.name.as_str(),
			Self::Text(s) => s.name.as_str(),
		}
	}

	pub fn column_type_name(&self) -> &'static str {
		match self {
			Self::Unknown(_) => "unknown",
			Self::Number(_) => "number",
			Self::Enum(_) => "enum",
			Self::Text(_) => "text",
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_number_mut(&mut self) -> Option<&mut NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_enum(&self) -> Option<&EnumColumn> {
		match self {
			Self::Enum(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&TextColumn> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn take_rows(&self, indices: &[usize]) -> Self {
		match self {
			Self::Unknown(column) => Self::Unknown(UnknownColumn {
				name: column.name.clone(),
				len: indices.len(),
			}),
			Self::Number(column) => Self::Number(NumberColumn {
				name: column.name.clone(),
				data: indices.iter().map(|index| column.data[*index]).collect(),
			}),
			Self::Enum(column) => Self::Enum(EnumColumn {
				name: column.name.clone(),
				options: column.options.clone(),
				data: indices.iter().map(|index| column.data[*index]).collect(),
			}),
			Self::Text(column) => Self::Text(TextColumn {
				name: column.name.clone(),
				data: indices.iter().map(|index| column.data[*index].clone()).collect(),
			}),
		}
	}

	fn cell_to_string(&self, index: usize) -> String {
		match self {
			Self::Unknown(_) => String::new(),
			Self::Number(column) => {
				let value = column.data[index];
				if value.is_nan() {
					String::new()
				} else {
					value.to_string()
				}
			}
			Self::Enum(column) => column.data[index].to_string(),
			Self::Text(column) => column.data[index].clone(),
		}
	}
}

impl UnknownColumn {
	pub fn new(name: String) -> Self {
		Self { name, len: 0 }
	}
}

impl NumberColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}

	pub fn n_missing(&self) -> usize {
		self.data.iter().filter(|value| value.is_nan()).count()
	}
}

impl TextColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}
}

#[cfg(test)]
fn test_dataframe() -> DataFrame {
	DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "number".to_owned(),
				data: vec![1.0, std::f32::NAN, 2.5],
			}),
			Column::Enum(EnumColumn {
				name: "enum".to_owned(),
				options: vec!["a".to_owned(), "b".to_owned()],
				data: vec![1, 0, 1],
			}),
			Column::Text(TextColumn {
				name: "text".to_owned(),
				data: vec!["x".to_owned(), "y".to_owned(), "z".to_owned()],
			}),
		],
	}
}

#[test]
fn test_take_rows() {
	let dataframe = test_dataframe().take_rows(&[2, 0]);
	assert_eq!(dataframe.nrows(), 2);
	assert_eq!(dataframe.columns[0].as_number().unwrap().data, vec![2.5, 1.0]);
	assert_eq!(dataframe.columns[1].as_enum().unwrap().data, vec![1, 1]);
	assert_eq!(
		dataframe.columns[2].as_text().unwrap().data,
		vec!["z".to_owned(), "x".to_owned()]
	);
}

#[test]
fn test_retain_and_remove_columns() {
	let mut dataframe = test_dataframe();
	let n_removed = dataframe.retain_columns(|column| column.name() != "enum");
	assert_eq!(n_removed, 1);
	assert_eq!(dataframe.column_names(), vec!["number", "text"]);
	let removed = dataframe.remove_column("number").unwrap();
	assert_eq!(removed.name(), "number");
	assert!(dataframe.remove_column("number").is_none());
	assert_eq!(dataframe.column_names(), vec!["text"]);
}

#[test]
fn test_to_csv() {
	let mut buffer = Vec::new();
	test_dataframe()
		.to_csv(&mut csv::Writer::from_writer(&mut buffer))
		.unwrap();
	let csv = String::from_utf8(buffer).unwrap();
	insta::assert_snapshot!(csv, @r###"
	number,enum,text
	1,1,x
	,0,y
	2.5,1,z
	"###);
}
