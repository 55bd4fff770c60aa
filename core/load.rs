use crate::progress::Progress;
use ivf_dataframe::{ColumnType, DataFrame, FromCsvError, FromCsvOptions};
use ivf_util::progress_counter::ProgressCounter;
use std::{
	collections::BTreeMap,
	path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
	Train,
	Eval,
}

impl std::fmt::Display for TableKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			TableKind::Train => write!(f, "train"),
			TableKind::Eval => write!(f, "eval"),
		}
	}
}

#[derive(Debug, Error)]
pub enum LoadError {
	#[error("the path to the {0} data was not given")]
	MissingPath(TableKind),
	#[error("failed to read the {table} data at {}", .path.display())]
	Io {
		table: TableKind,
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to parse the {table} data at {}", .path.display())]
	Csv {
		table: TableKind,
		path: PathBuf,
		#[source]
		source: FromCsvError,
	},
}

/**
Load the train and eval tables from the csv files at `train_path` and `eval_path`.

Both paths are checked before any file is opened, and a missing one is reported as [`LoadError::MissingPath`]. Columns named in `column_types` are read with the given type, the rest are inferred.
*/
pub fn load_tables(
	train_path: Option<&Path>,
	eval_path: Option<&Path>,
	column_types: Option<&BTreeMap<String, ColumnType>>,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<(DataFrame, DataFrame), LoadError> {
	let train_path = train_path.ok_or(LoadError::MissingPath(TableKind::Train))?;
	let eval_path = eval_path.ok_or(LoadError::MissingPath(TableKind::Eval))?;
	let train = load_table(TableKind::Train, train_path, column_types, update_progress)?;
	let eval = load_table(TableKind::Eval, eval_path, column_types, update_progress)?;
	Ok((train, eval))
}

fn load_table(
	table: TableKind,
	path: &Path,
	column_types: Option<&BTreeMap<String, ColumnType>>,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<DataFrame, LoadError> {
	let len = std::fs::metadata(path)
		.map_err(|source| LoadError::Io {
			table,
			path: path.to_owned(),
			source,
		})?
		.len();
	let progress_counter = ProgressCounter::new(len);
	update_progress(Progress::Loading(table, progress_counter.clone()));
	let dataframe = DataFrame::from_path(
		path,
		FromCsvOptions {
			column_types: column_types.cloned(),
			..Default::default()
		},
		|byte| progress_counter.set(byte),
	)
	.map_err(|source| LoadError::Csv {
		table,
		path: path.to_owned(),
		source,
	})?;
	tracing::info!(
		table = %table,
		path = %path.display(),
		n_rows = dataframe.nrows(),
		n_columns = dataframe.ncols(),
		n_bytes_read = progress_counter.get(),
		"loaded table"
	);
	Ok(dataframe)
}

#[test]
fn test_missing_paths() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("train.csv");
	std::fs::write(&path, "a\n1\n").unwrap();
	let mut n_updates = 0;
	let result = load_tables(None, Some(path.as_path()), None, &mut |_| n_updates += 1);
	assert!(matches!(result, Err(LoadError::MissingPath(TableKind::Train))));
	let result = load_tables(Some(path.as_path()), None, None, &mut |_| n_updates += 1);
	assert!(matches!(result, Err(LoadError::MissingPath(TableKind::Eval))));
	// The paths are checked before anything is read.
	assert_eq!(n_updates, 0);
}

#[test]
fn test_load_tables() {
	let dir = tempfile::tempdir().unwrap();
	let train_path = dir.path().join("train.csv");
	let eval_path = dir.path().join("eval.csv");
	std::fs::write(&train_path, "code,count,label\nA,1,0\n1,,1\n").unwrap();
	std::fs::write(&eval_path, "code,count\nB,2\n").unwrap();
	let mut column_types = BTreeMap::new();
	column_types.insert("code".to_owned(), ColumnType::Text);
	let mut loaded = Vec::new();
	let (train, eval) = load_tables(
		Some(train_path.as_path()),
		Some(eval_path.as_path()),
		Some(&column_types),
		&mut |progress| {
			if let Progress::Loading(table, _) = progress {
				loaded.push(table)
			}
		},
	)
	.unwrap();
	assert_eq!(loaded, vec![TableKind::Train, TableKind::Eval]);
	assert_eq!(train.column_names(), vec!["code", "count", "label"]);
	assert_eq!(train.nrows(), 2);
	assert!(train.column("code").unwrap().as_text().is_some());
	assert!(train.column("count").unwrap().as_number().is_some());
	assert_eq!(eval.nrows(), 1);
}

#[test]
fn test_load_nonexistent_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("missing.csv");
	let result = load_tables(Some(path.as_path()), Some(path.as_path()), None, &mut |_| {});
	assert!(matches!(
		result,
		Err(LoadError::Io {
			table: TableKind::Train,
			..
		})
	));
}
