use ivf_dataframe::DataFrame;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum SelectError {
	#[error("the list of columns to keep is empty")]
	EmptyAllowList,
}

/// Drop every column of `dataframe` whose name is not in `allow_list`, keeping the rest in their original order. Names in the allow list that the dataframe does not have are ignored. Returns the number of dropped columns.
pub fn select_columns(dataframe: &mut DataFrame, allow_list: &[&str]) -> Result<usize, SelectError> {
	if allow_list.is_empty() {
		return Err(SelectError::EmptyAllowList);
	}
	Ok(dataframe.retain_columns(|column| allow_list.contains(&column.name())))
}

/// Restrict both the train and the eval table to the columns in `allow_list`.
pub fn select_features(
	train: &mut DataFrame,
	eval: &mut DataFrame,
	allow_list: &[&str],
) -> Result<(), SelectError> {
	let n_dropped_train = select_columns(train, allow_list)?;
	let n_dropped_eval = select_columns(eval, allow_list)?;
	tracing::info!(
		n_dropped_train,
		n_dropped_eval,
		n_kept_train = train.ncols(),
		n_kept_eval = eval.ncols(),
		"dropped columns outside the feature list"
	);
	Ok(())
}

#[cfg(test)]
fn unknown_dataframe(names: &[&str]) -> DataFrame {
	use ivf_dataframe::{Column, UnknownColumn};
	DataFrame {
		columns: names
			.iter()
			.map(|name| {
				Column::Unknown(UnknownColumn {
					name: (*name).to_owned(),
					len: 2,
				})
			})
			.collect(),
	}
}

#[test]
fn test_select_features() {
	let mut train = unknown_dataframe(&["id", "a", "b", "label", "c"]);
	let mut eval = unknown_dataframe(&["id", "a", "b", "c"]);
	let allow_list = ["c", "a", "label", "not_present"];
	select_features(&mut train, &mut eval, &allow_list).unwrap();
	assert_eq!(train.column_names(), vec!["a", "label", "c"]);
	assert_eq!(eval.column_names(), vec!["a", "c"]);
	for name in train.column_names().iter().chain(eval.column_names().iter()) {
		assert!(allow_list.contains(name));
	}
}

#[test]
fn test_select_empty_allow_list() {
	let mut train = unknown_dataframe(&["a"]);
	let mut eval = unknown_dataframe(&["a"]);
	assert_eq!(
		select_features(&mut train, &mut eval, &[]),
		Err(SelectError::EmptyAllowList)
	);
	assert_eq!(train.ncols(), 1);
}
