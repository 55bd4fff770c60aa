use ivf_dataframe::DataFrame;
use thiserror::Error;

/// The value written in place of a missing number.
pub const DEFAULT_FILL_VALUE: f32 = 0.0;

#[derive(Debug, Error, PartialEq)]
pub enum ImputeError {
	#[error("column \"{column_name}\" was not found")]
	ColumnNotFound { column_name: String },
	#[error("column \"{column_name}\" is a {column_type} column, expected a number column")]
	NotNumber {
		column_name: String,
		column_type: &'static str,
	},
}

/// Replace every missing value in the number columns `column_names` with `fill_value`. Values that are present are left untouched. Every column is checked before any is modified. Returns the number of values filled.
pub fn impute_numeric(
	dataframe: &mut DataFrame,
	column_names: &[&str],
	fill_value: f32,
) -> Result<usize, ImputeError> {
	for column_name in column_names {
		let column = dataframe
			.column(column_name)
			.ok_or_else(|| ImputeError::ColumnNotFound {
				column_name: (*column_name).to_owned(),
			})?;
		if column.as_number().is_none() {
			return Err(ImputeError::NotNumber {
				column_name: (*column_name).to_owned(),
				column_type: column.column_type_name(),
			});
		}
	}
	let mut n_filled = 0;
	for column in dataframe.columns.iter_mut() {
		if !column_names.contains(&column.name()) {
			continue;
		}
		if let Some(column) = column.as_number_mut() {
			for value in column.data.iter_mut().filter(|value| value.is_nan()) {
				*value = fill_value;
				n_filled += 1;
			}
		}
	}
	Ok(n_filled)
}

#[cfg(test)]
fn number_dataframe() -> DataFrame {
	use ivf_dataframe::{Column, NumberColumn, TextColumn};
	DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "a".to_owned(),
				data: vec![1.0, std::f32::NAN, 3.0, 4.0, std::f32::NAN],
			}),
			Column::Number(NumberColumn {
				name: "b".to_owned(),
				data: vec![std::f32::NAN, 2.0, 0.5, 0.0, 1.0],
			}),
			Column::Text(TextColumn {
				name: "t".to_owned(),
				data: vec!["".to_owned(); 5],
			}),
		],
	}
}

#[test]
fn test_impute_numeric() {
	let mut dataframe = number_dataframe();
	let n_filled = impute_numeric(&mut dataframe, &["a"], DEFAULT_FILL_VALUE).unwrap();
	assert_eq!(n_filled, 2);
	assert_eq!(
		dataframe.column("a").unwrap().as_number().unwrap().data,
		vec![1.0, 0.0, 3.0, 4.0, 0.0]
	);
	// Columns not named are left alone.
	assert_eq!(
		dataframe.column("b").unwrap().as_number().unwrap().n_missing(),
		1
	);
}

#[test]
fn test_impute_errors_leave_dataframe_unchanged() {
	let mut dataframe = number_dataframe();
	let before = dataframe.clone();
	assert_eq!(
		impute_numeric(&mut dataframe, &["a", "t"], DEFAULT_FILL_VALUE),
		Err(ImputeError::NotNumber {
			column_name: "t".to_owned(),
			column_type: "text",
		})
	);
	assert_eq!(
		impute_numeric(&mut dataframe, &["a", "z"], DEFAULT_FILL_VALUE),
		Err(ImputeError::ColumnNotFound {
			column_name: "z".to_owned(),
		})
	);
	// NaN != NaN, so compare the missing counts instead of the dataframes.
	for (left, right) in dataframe.columns.iter().zip(before.columns.iter()) {
		if let (Some(left), Some(right)) = (left.as_number(), right.as_number()) {
			assert_eq!(left.n_missing(), right.n_missing());
		}
	}
}
