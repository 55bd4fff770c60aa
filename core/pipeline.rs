use crate::{
	config::Config,
	load::load_tables,
	progress::Progress,
	split::{split, validate_val_size, LabeledSet, Split, SplitPolicy},
	strategy::{FeatureSpec, Strategy, GROUP_COLUMN},
};
use anyhow::{format_err, Context, Result};
use ivf_dataframe::DataFrame;
use ivf_features::{
	encode_categorical, impute_numeric, select_features, EncodedColumn, Vocabulary,
	DEFAULT_FILL_VALUE,
};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
	pub val_size: f64,
	pub split_policy: SplitPolicy,
	pub vocabulary: Vocabulary,
}

/// The fit and validation sets, the transformed eval table, and the code map of every categorical feature.
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
	pub fit: LabeledSet,
	pub validation: LabeledSet,
	pub eval: DataFrame,
	pub code_maps: Vec<EncodedColumn>,
}

impl PreprocessOutput {
	/// Write `fit.csv`, `validation.csv` and `eval.csv` to `dir`, creating it if needed. The label is the last column of the fit and validation files.
	pub fn write_csv(&self, dir: &Path) -> Result<()> {
		std::fs::create_dir_all(dir)
			.with_context(|| format!("failed to create directory {}", dir.display()))?;
		let tables = [
			("fit.csv", self.fit.to_dataframe()),
			("validation.csv", self.validation.to_dataframe()),
			("eval.csv", self.eval.clone()),
		];
		for (file_name, dataframe) in tables.iter() {
			let path = dir.join(file_name);
			let mut writer = csv::Writer::from_path(&path)
				.with_context(|| format!("failed to create {}", path.display()))?;
			dataframe
				.to_csv(&mut writer)
				.with_context(|| format!("failed to write {}", path.display()))?;
			tracing::info!(path = %path.display(), n_rows = dataframe.nrows(), "wrote table");
		}
		Ok(())
	}
}

/**
Run the full preprocessing pipeline of `strategy` on the csv files at `train_path` and `eval_path`.

The tables are loaded, restricted to the strategy's features, their categorical features are encoded with code maps shared between the two tables, missing numbers are filled with zero, and the train table is split into a fit set and a validation set. The split is seeded from `config`, so repeated runs give identical outputs.
*/
pub fn preprocess(
	strategy: Strategy,
	train_path: Option<&Path>,
	eval_path: Option<&Path>,
	config: &Config,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<PreprocessOutput> {
	let mut feature_spec = strategy.feature_spec();
	if let Some(label_column) = &config.label_column {
		feature_spec.label_column = label_column.clone();
	}
	let options = PipelineOptions {
		val_size: config.validation_fraction(),
		split_policy: config.split_policy(GROUP_COLUMN, strategy.default_split_policy()),
		vocabulary: config.vocabulary(),
	};
	validate_val_size(options.val_size)?;
	tracing::info!(strategy = %strategy, seed = config.seed(), options = ?options, "preprocessing");
	let (train, eval) = load_tables(
		train_path,
		eval_path,
		Some(&feature_spec.column_types()),
		update_progress,
	)?;
	let mut rng = Xoshiro256Plus::seed_from_u64(config.seed());
	preprocess_tables(train, eval, &feature_spec, &options, &mut rng, update_progress)
}

/// Run the pipeline on tables that are already loaded, drawing the split from `rng`.
pub fn preprocess_tables<R>(
	mut train: DataFrame,
	mut eval: DataFrame,
	feature_spec: &FeatureSpec,
	options: &PipelineOptions,
	rng: &mut R,
	update_progress: &mut dyn FnMut(Progress),
) -> Result<PreprocessOutput>
where
	R: Rng + ?Sized,
{
	feature_spec.validate()?;
	if let SplitPolicy::GroupStratified { group_column } = &options.split_policy {
		if !feature_spec.features().any(|name| name == group_column.as_str()) {
			return Err(format_err!(
				"the group column \"{}\" is not one of the features",
				group_column
			));
		}
	}

	update_progress(Progress::Selecting);
	select_features(&mut train, &mut eval, &feature_spec.train_allow_list())?;

	update_progress(Progress::Encoding);
	let report = encode_categorical(
		&mut train,
		&mut eval,
		&feature_spec.categorical_names(),
		options.vocabulary,
	)?;
	if !report.is_success() {
		let failures: Vec<String> = report
			.failures
			.iter()
			.map(|failure| failure.to_string())
			.collect();
		return Err(format_err!(
			"failed to encode {} categorical column(s): {}",
			failures.len(),
			failures.join("; ")
		));
	}

	update_progress(Progress::Imputing);
	let numerical_names = feature_spec.numerical_names();
	let n_filled_train = impute_numeric(&mut train, &numerical_names, DEFAULT_FILL_VALUE)
		.context("failed to fill in the train table")?;
	let n_filled_eval = impute_numeric(&mut eval, &numerical_names, DEFAULT_FILL_VALUE)
		.context("failed to fill in the eval table")?;
	tracing::info!(n_filled_train, n_filled_eval, "filled in missing numbers");

	update_progress(Progress::Splitting);
	let Split { fit, validation } = split(
		&train,
		&feature_spec.label_column,
		options.val_size,
		&options.split_policy,
		rng,
	)?;

	Ok(PreprocessOutput {
		fit,
		validation,
		eval,
		code_maps: report.encoded,
	})
}

#[cfg(test)]
fn small_tables() -> (DataFrame, DataFrame) {
	use ivf_dataframe::{Column, NumberColumn, TextColumn};
	let text = |name: &str, values: &[&str]| {
		Column::Text(TextColumn {
			name: name.to_owned(),
			data: values.iter().map(|value| (*value).to_owned()).collect(),
		})
	};
	let number = |name: &str, data: Vec<f32>| {
		Column::Number(NumberColumn {
			name: name.to_owned(),
			data,
		})
	};
	let train = DataFrame {
		columns: vec![
			number("id", vec![0.0, 1.0, 2.0, 3.0, 4.0]),
			text("cat", &["A", "B", "A", "C", "B"]),
			number("num", vec![1.0, std::f32::NAN, 3.0, 4.0, std::f32::NAN]),
			number("label", vec![0.0, 1.0, 0.0, 1.0, 0.0]),
		],
	};
	let eval = DataFrame {
		columns: vec![
			number("id", vec![0.0, 1.0]),
			text("cat", &["B", "D"]),
			number("num", vec![std::f32::NAN, 2.0]),
		],
	};
	(train, eval)
}

#[cfg(test)]
fn small_feature_spec() -> FeatureSpec {
	FeatureSpec {
		categorical_features: vec!["cat".to_owned()],
		numerical_features: vec!["num".to_owned()],
		label_column: "label".to_owned(),
	}
}

#[test]
fn test_preprocess_tables() {
	let (train, eval) = small_tables();
	let options = PipelineOptions {
		val_size: 0.2,
		split_policy: SplitPolicy::GroupStratified {
			group_column: "cat".to_owned(),
		},
		vocabulary: Vocabulary::Joint,
	};
	let mut stages = Vec::new();
	let output = preprocess_tables(
		train,
		eval,
		&small_feature_spec(),
		&options,
		&mut Xoshiro256Plus::seed_from_u64(2025),
		&mut |progress| stages.push(progress.to_string()),
	)
	.unwrap();
	assert_eq!(
		stages,
		vec![
			"selecting features",
			"encoding categorical features",
			"filling in missing numbers",
			"splitting into fit and validation sets",
		]
	);
	assert_eq!(output.code_maps.len(), 1);
	insta::assert_snapshot!(output.code_maps[0].code_map.to_string(), @r###"{"A": 0, "B": 1, "C": 2, "D": 3}"###);
	assert_eq!(output.fit.nrows() + output.validation.nrows(), 5);
	let mut row_ids: Vec<usize> = output
		.fit
		.row_ids
		.iter()
		.chain(output.validation.row_ids.iter())
		.cloned()
		.collect();
	row_ids.sort_unstable();
	assert_eq!(row_ids, vec![0, 1, 2, 3, 4]);
	// The id column is not a feature and is dropped.
	assert_eq!(output.fit.features.column_names(), vec!["cat", "num"]);
	assert_eq!(output.eval.column_names(), vec!["cat", "num"]);
	assert_eq!(
		output.eval.column("cat").unwrap().as_enum().unwrap().data,
		vec![1, 3]
	);
	assert_eq!(
		output.eval.column("num").unwrap().as_number().unwrap().data,
		vec![0.0, 2.0]
	);
	let fit_numbers = output.fit.features.column("num").unwrap().as_number().unwrap();
	assert_eq!(fit_numbers.n_missing(), 0);
	for (row_id, value) in output.fit.row_ids.iter().zip(fit_numbers.data.iter()) {
		let expected = [1.0, 0.0, 3.0, 4.0, 0.0][*row_id];
		assert_eq!(*value, expected);
	}
	assert!(output.fit.labels.as_number().is_some());
}

#[test]
fn test_preprocess_tables_uniform() {
	let (train, eval) = small_tables();
	let options = PipelineOptions {
		val_size: 0.2,
		split_policy: SplitPolicy::Uniform,
		vocabulary: Vocabulary::Joint,
	};
	let run = || {
		let (train, eval) = small_tables();
		preprocess_tables(
			train,
			eval,
			&small_feature_spec(),
			&options,
			&mut Xoshiro256Plus::seed_from_u64(2025),
			&mut |_| {},
		)
		.unwrap()
	};
	let output = preprocess_tables(
		train,
		eval,
		&small_feature_spec(),
		&options,
		&mut Xoshiro256Plus::seed_from_u64(2025),
		&mut |_| {},
	)
	.unwrap();
	assert_eq!(output.validation.nrows(), 1);
	assert_eq!(output.fit.nrows(), 4);
	assert_eq!(output.validation.row_ids, run().validation.row_ids);
}

#[test]
fn test_preprocess_tables_errors() {
	let options = PipelineOptions {
		val_size: 0.2,
		split_policy: SplitPolicy::GroupStratified {
			group_column: "region".to_owned(),
		},
		vocabulary: Vocabulary::Joint,
	};
	let (train, eval) = small_tables();
	let error = preprocess_tables(
		train,
		eval,
		&small_feature_spec(),
		&options,
		&mut Xoshiro256Plus::seed_from_u64(0),
		&mut |_| {},
	)
	.unwrap_err();
	assert_eq!(
		error.to_string(),
		"the group column \"region\" is not one of the features"
	);

	// A categorical feature missing from the eval table fails the run.
	let options = PipelineOptions {
		split_policy: SplitPolicy::Uniform,
		..options
	};
	let (train, mut eval) = small_tables();
	eval.remove_column("cat");
	let error = preprocess_tables(
		train,
		eval,
		&small_feature_spec(),
		&options,
		&mut Xoshiro256Plus::seed_from_u64(0),
		&mut |_| {},
	)
	.unwrap_err();
	insta::assert_snapshot!(error.to_string(), @r###"failed to encode 1 categorical column(s): column "cat" was not found in the eval table"###);
}

#[cfg(test)]
fn write_reference_paper_tables(
	dir: &Path,
	label_column: &str,
) -> (std::path::PathBuf, std::path::PathBuf) {
	let mut feature_spec = Strategy::ReferencePaper.feature_spec();
	feature_spec.label_column = label_column.to_owned();
	let header = feature_spec.train_allow_list();
	let mut train_csv = format!("ID,{}\n", header.join(","));
	for row in 0..10 {
		let mut values = vec![format!("TRAIN_{:05}", row)];
		for name in header.iter() {
			let value = if *name == "시술 당시 나이" {
				["만18-34세", "만35-37세", "알 수 없음"][row % 3].to_owned()
			} else if *name == label_column {
				(row % 2).to_string()
			} else if row % 4 == 0 {
				String::new()
			} else {
				(row % 3).to_string()
			};
			values.push(value);
		}
		train_csv.push_str(&values.join(","));
		train_csv.push('\n');
	}
	let eval_header = feature_spec.eval_allow_list();
	let mut eval_csv = format!("ID,{}\n", eval_header.join(","));
	for row in 0..3 {
		let mut values = vec![format!("TEST_{:05}", row)];
		for name in eval_header.iter() {
			let value = if *name == "시술 당시 나이" {
				"만43-44세".to_owned()
			} else {
				row.to_string()
			};
			values.push(value);
		}
		eval_csv.push_str(&values.join(","));
		eval_csv.push('\n');
	}
	let train_path = dir.join("train.csv");
	let eval_path = dir.join("test.csv");
	std::fs::write(&train_path, train_csv).unwrap();
	std::fs::write(&eval_path, eval_csv).unwrap();
	(train_path, eval_path)
}

#[test]
fn test_preprocess_from_files() {
	use crate::strategy::LABEL_COLUMN;
	let dir = tempfile::tempdir().unwrap();
	let (train_path, eval_path) = write_reference_paper_tables(dir.path(), LABEL_COLUMN);

	let output = preprocess(
		Strategy::ReferencePaper,
		Some(train_path.as_path()),
		Some(eval_path.as_path()),
		&Config::default(),
		&mut |_| {},
	)
	.unwrap();
	assert_eq!(output.fit.nrows(), 8);
	assert_eq!(output.validation.nrows(), 2);
	assert_eq!(output.eval.nrows(), 3);
	assert_eq!(output.eval.ncols(), 25);
	assert_eq!(output.code_maps.len(), 4);
	let age = output
		.code_maps
		.iter()
		.find(|encoded| encoded.column_name == "시술 당시 나이")
		.unwrap();
	assert_eq!(
		age.code_map.options(),
		["만18-34세", "만35-37세", "만43-44세", "알 수 없음"]
	);

	let output_dir = dir.path().join("out");
	output.write_csv(&output_dir).unwrap();
	let fit = std::fs::read_to_string(output_dir.join("fit.csv")).unwrap();
	let fit_header = fit.lines().next().unwrap();
	assert!(fit_header.ends_with(LABEL_COLUMN));
	assert_eq!(fit.lines().count(), 9);
	assert!(output_dir.join("validation.csv").exists());
	assert!(output_dir.join("eval.csv").exists());
}

#[test]
fn test_preprocess_with_renamed_label() {
	use crate::{split::SplitError, strategy::LABEL_COLUMN};
	let dir = tempfile::tempdir().unwrap();
	let (train_path, eval_path) = write_reference_paper_tables(dir.path(), "outcome");
	let config = Config {
		label_column: Some("outcome".to_owned()),
		..Config::default()
	};
	let output = preprocess(
		Strategy::ReferencePaper,
		Some(train_path.as_path()),
		Some(eval_path.as_path()),
		&config,
		&mut |_| {},
	)
	.unwrap();
	assert_eq!(output.fit.nrows() + output.validation.nrows(), 10);
	for labeled_set in [&output.fit, &output.validation].iter() {
		assert_eq!(labeled_set.labels.name(), "outcome");
		assert!(labeled_set.labels.as_number().is_some());
		assert!(labeled_set.features.column("outcome").is_none());
		assert_eq!(labeled_set.features.ncols(), 25);
	}
	let fit_labels = output.fit.labels.as_number().unwrap();
	for (row_id, label) in output.fit.row_ids.iter().zip(fit_labels.data.iter()) {
		assert_eq!(*label, (row_id % 2) as f32);
	}

	// The default label is not in these files, so the run fails at the split.
	let error = preprocess(
		Strategy::ReferencePaper,
		Some(train_path.as_path()),
		Some(eval_path.as_path()),
		&Config::default(),
		&mut |_| {},
	)
	.unwrap_err();
	assert_eq!(
		error.downcast_ref::<SplitError>(),
		Some(&SplitError::ColumnNotFound(LABEL_COLUMN.to_owned()))
	);
}

#[test]
fn test_preprocess_checks_val_size_before_loading() {
	use crate::split::SplitError;
	let dir = tempfile::tempdir().unwrap();
	let missing_path = dir.path().join("missing.csv");
	let config = Config {
		validation_fraction: Some(1.5),
		..Config::default()
	};
	let mut n_updates = 0;
	let error = preprocess(
		Strategy::Baseline,
		Some(missing_path.as_path()),
		Some(missing_path.as_path()),
		&config,
		&mut |_| n_updates += 1,
	)
	.unwrap_err();
	assert_eq!(
		error.downcast_ref::<SplitError>(),
		Some(&SplitError::InvalidValidationFraction(1.5))
	);
	assert_eq!(n_updates, 0);
}
