/*!
This module writes submission files: the template file provided by the competition with its prediction column filled in.
*/

use chrono::NaiveDate;
use ivf_dataframe::INVALID_VALUES;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_RESULTS_ROOT: &str = "../results";
pub const DEFAULT_TEMPLATE_PATH: &str = "../data/sample_submission.csv";
pub const PREDICTION_COLUMN: &str = "probability";

#[derive(Debug, Clone)]
pub struct SubmissionOptions {
	/// The directory under `results_root` the file is written to.
	pub dir_name: String,
	pub model_name: Option<String>,
	/// The validation ROC AUC of the model that made the predictions.
	pub score: Option<f64>,
	pub template_path: PathBuf,
	pub results_root: PathBuf,
}

impl SubmissionOptions {
	pub fn new(dir_name: String) -> SubmissionOptions {
		SubmissionOptions {
			dir_name,
			model_name: None,
			score: None,
			template_path: PathBuf::from(DEFAULT_TEMPLATE_PATH),
			results_root: PathBuf::from(DEFAULT_RESULTS_ROOT),
		}
	}
}

#[derive(Debug, Error)]
pub enum SubmissionError {
	#[error("failed to read the submission template {}", .path.display())]
	Template {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},
	#[error("failed to read the predictions {}", .path.display())]
	Predictions {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},
	#[error("did not find a column of predictions in {}", .path.display())]
	NoPredictionColumn { path: PathBuf },
	#[error("row {row} of column \"{column_name}\" in {} holds \"{value}\", which is not a prediction", .path.display())]
	InvalidPrediction {
		path: PathBuf,
		column_name: String,
		row: usize,
		value: String,
	},
	#[error("the template has {n_rows} rows but {n_predictions} predictions were given")]
	RowCountMismatch { n_rows: usize, n_predictions: usize },
	#[error("failed to create directory {}", .path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},
	#[error("failed to write {}", .path.display())]
	Csv {
		path: PathBuf,
		#[source]
		source: csv::Error,
	},
}

/**
Compute the name of a submission file, `<YYYYMMDD>_0_<score digits>_<model name>.csv`.

The score digits are the digits after the decimal point of `score`, so a score of `0.8123` is written as `0_8123`. A missing or zero score is written as `none`, as is a missing model name.
*/
pub fn submission_file_name(date: NaiveDate, score: Option<f64>, model_name: Option<&str>) -> String {
	let mut file_name = date.format("%Y%m%d").to_string();
	match score.filter(|score| *score != 0.0) {
		Some(score) => {
			let score = score.to_string();
			let digits = match score.find('.') {
				Some(index) => &score[index + 1..],
				None => "0",
			};
			file_name.push_str("_0_");
			file_name.push_str(digits);
		}
		None => file_name.push_str("_none"),
	}
	match model_name.filter(|model_name| !model_name.is_empty()) {
		Some(model_name) => {
			file_name.push('_');
			file_name.push_str(model_name);
			file_name.push_str(".csv");
		}
		None => file_name.push_str("_none.csv"),
	}
	file_name
}

/// Fill the prediction column of the template with `predictions` and write it to `<results_root>/<dir_name>/<file name>`. Every other cell of the template is copied through as written. Returns the path of the written file.
pub fn write_submission(
	options: &SubmissionOptions,
	predictions: &[f64],
	date: NaiveDate,
) -> Result<PathBuf, SubmissionError> {
	let (mut headers, records) =
		read_records(&options.template_path).map_err(|source| SubmissionError::Template {
			path: options.template_path.clone(),
			source,
		})?;
	let n_rows = records.len();
	if n_rows != predictions.len() {
		return Err(SubmissionError::RowCountMismatch {
			n_rows,
			n_predictions: predictions.len(),
		});
	}
	let prediction_index = headers
		.iter()
		.position(|column_name| column_name.trim() == PREDICTION_COLUMN);
	if prediction_index.is_none() {
		headers.push_field(PREDICTION_COLUMN);
	}
	let dir = options.results_root.join(&options.dir_name);
	create_dir(&dir)?;
	let path = dir.join(submission_file_name(
		date,
		options.score,
		options.model_name.as_deref(),
	));
	let write = || -> csv::Result<()> {
		let mut writer = csv::Writer::from_path(&path)?;
		writer.write_record(&headers)?;
		let mut record = csv::StringRecord::with_capacity(0, headers.len());
		for (template_record, prediction) in records.iter().zip(predictions.iter()) {
			let prediction = prediction.to_string();
			record.clear();
			for (index, value) in template_record.iter().enumerate() {
				if Some(index) == prediction_index {
					record.push_field(&prediction);
				} else {
					record.push_field(value);
				}
			}
			if prediction_index.is_none() {
				record.push_field(&prediction);
			}
			writer.write_record(&record)?;
		}
		writer.flush()?;
		Ok(())
	};
	write().map_err(|source| SubmissionError::Csv {
		path: path.clone(),
		source,
	})?;
	tracing::info!(path = %path.display(), n_rows, "wrote submission");
	Ok(path)
}

/**
Read the predictions of a model from the csv file at `path`. The predictions are taken from the `probability` column, or else from the first column in which every value is a number.

The values are parsed as `f64` so that predictions differing only in their last digits keep their order.
*/
pub fn read_predictions(path: &Path) -> Result<Vec<f64>, SubmissionError> {
	let (headers, records) =
		read_records(path).map_err(|source| SubmissionError::Predictions {
			path: path.to_owned(),
			source,
		})?;
	let parse = |value: &str| match lexical::parse::<f64, _>(value.trim()) {
		Ok(value) if value.is_finite() => Some(value),
		_ => None,
	};
	let column_index = headers
		.iter()
		.position(|column_name| column_name.trim() == PREDICTION_COLUMN)
		.or_else(|| {
			(0..headers.len()).find(|index| {
				records
					.iter()
					.all(|record| parse(record.get(*index).unwrap_or("")).is_some())
			})
		})
		.ok_or_else(|| SubmissionError::NoPredictionColumn {
			path: path.to_owned(),
		})?;
	let column_name = headers.get(column_index).unwrap_or("").trim();
	let mut predictions = Vec::with_capacity(records.len());
	for (row, record) in records.iter().enumerate() {
		let value = record.get(column_index).unwrap_or("");
		match parse(value) {
			Some(prediction) => predictions.push(prediction),
			None => {
				return Err(SubmissionError::InvalidPrediction {
					path: path.to_owned(),
					column_name: column_name.to_owned(),
					row,
					value: if INVALID_VALUES.contains(&value.trim()) {
						"<missing>".to_owned()
					} else {
						value.to_owned()
					},
				})
			}
		}
	}
	tracing::info!(path = %path.display(), column = column_name, n_predictions = predictions.len(), "read predictions");
	Ok(predictions)
}

fn read_records(path: &Path) -> csv::Result<(csv::StringRecord, Vec<csv::StringRecord>)> {
	let mut reader = csv::Reader::from_path(path)?;
	let headers = reader.headers()?.clone();
	let records = reader.records().collect::<csv::Result<Vec<_>>>()?;
	Ok((headers, records))
}

fn create_dir(dir: &Path) -> Result<(), SubmissionError> {
	std::fs::create_dir_all(dir).map_err(|source| SubmissionError::Io {
		path: dir.to_owned(),
		source,
	})
}

#[test]
fn test_submission_file_name() {
	let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
	assert_eq!(
		submission_file_name(date, Some(0.5), Some("sample")),
		"20250201_0_5_sample.csv"
	);
	assert_eq!(
		submission_file_name(date, Some(0.7383), Some("lgbm")),
		"20250201_0_7383_lgbm.csv"
	);
	assert_eq!(
		submission_file_name(date, None, Some("lgbm")),
		"20250201_none_lgbm.csv"
	);
	assert_eq!(
		submission_file_name(date, Some(0.7383), None),
		"20250201_0_7383_none.csv"
	);
	assert_eq!(submission_file_name(date, Some(0.0), None), "20250201_none_none.csv");
}

#[test]
fn test_write_submission() {
	let dir = tempfile::tempdir().unwrap();
	let template_path = dir.path().join("sample_submission.csv");
	std::fs::write(&template_path, "ID,probability\nTEST_00000,0\nTEST_00001,0\nTEST_00002,0\n").unwrap();
	let options = SubmissionOptions {
		model_name: Some("sample".to_owned()),
		score: Some(0.5),
		template_path,
		results_root: dir.path().join("results"),
		..SubmissionOptions::new("baseline".to_owned())
	};
	let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
	let path = write_submission(&options, &[0.25, 0.5, 0.125], date).unwrap();
	assert_eq!(
		path,
		dir.path().join("results/baseline/20250201_0_5_sample.csv")
	);
	assert_eq!(
		std::fs::read_to_string(&path).unwrap(),
		"ID,probability\nTEST_00000,0.25\nTEST_00001,0.5\nTEST_00002,0.125\n"
	);
}

#[test]
fn test_write_submission_appends_column() {
	let dir = tempfile::tempdir().unwrap();
	let template_path = dir.path().join("sample_submission.csv");
	std::fs::write(&template_path, "ID\nTEST_00000\n").unwrap();
	let options = SubmissionOptions {
		template_path,
		results_root: dir.path().to_owned(),
		..SubmissionOptions::new("run".to_owned())
	};
	let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
	let path = write_submission(&options, &[0.75], date).unwrap();
	assert!(path.ends_with("run/20250201_none_none.csv"));
	let contents = std::fs::read_to_string(&path).unwrap();
	assert_eq!(contents, "ID,probability\nTEST_00000,0.75\n");
	assert!(matches!(
		write_submission(&options, &[0.75, 0.25], date),
		Err(SubmissionError::RowCountMismatch {
			n_rows: 1,
			n_predictions: 2
		})
	));
}

#[test]
fn test_write_submission_keeps_ids_and_digits() {
	let dir = tempfile::tempdir().unwrap();
	let template_path = dir.path().join("sample_submission.csv");
	std::fs::write(&template_path, "ID,probability\n007,0\n010,0\n").unwrap();
	let predictions_path = dir.path().join("predictions.csv");
	std::fs::write(
		&predictions_path,
		"ID,probability\n007,0.1234567891\n010,0.1234567894\n",
	)
	.unwrap();
	let predictions = read_predictions(&predictions_path).unwrap();
	assert_eq!(predictions, vec![0.1234567891, 0.1234567894]);
	assert!(predictions[0] < predictions[1]);
	let options = SubmissionOptions {
		template_path,
		results_root: dir.path().to_owned(),
		..SubmissionOptions::new("run".to_owned())
	};
	let date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
	let path = write_submission(&options, &predictions, date).unwrap();
	assert_eq!(
		std::fs::read_to_string(&path).unwrap(),
		"ID,probability\n007,0.1234567891\n010,0.1234567894\n"
	);
}

#[test]
fn test_read_predictions() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("predictions.csv");
	std::fs::write(&path, "ID,score\nTEST_00000,0.25\nTEST_00001,0.75\n").unwrap();
	assert_eq!(read_predictions(&path).unwrap(), vec![0.25, 0.75]);
	std::fs::write(&path, "ID,probability\nTEST_00000,0.25\nTEST_00001,\n").unwrap();
	assert!(matches!(
		read_predictions(&path),
		Err(SubmissionError::InvalidPrediction { row: 1, ref column_name, ref value, .. })
			if column_name == "probability" && value == "<missing>"
	));
	std::fs::write(&path, "ID,label\nTEST_00000,yes\n").unwrap();
	assert!(matches!(
		read_predictions(&path),
		Err(SubmissionError::NoPredictionColumn { .. })
	));
}
