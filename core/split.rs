/*!
This module partitions a training table into a fit set and a validation set.
*/

use ivf_dataframe::{Column, DataFrame};
use ivf_features::canonical_values;
use num_traits::ToPrimitive;
use rand::{seq::SliceRandom, Rng};
use std::collections::BTreeMap;
use thiserror::Error;

/// How rows are assigned to the validation set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitPolicy {
	/// Shuffle all rows once and hold out a prefix of the permutation.
	Uniform,
	/// Hold out the same fraction of every group of rows sharing a value in `group_column`.
	GroupStratified { group_column: String },
}

impl Default for SplitPolicy {
	fn default() -> Self {
		SplitPolicy::Uniform
	}
}

#[derive(Debug, Error, PartialEq)]
pub enum SplitError {
	#[error("the validation fraction must be between 0 and 1 exclusive, got {0}")]
	InvalidValidationFraction(f64),
	#[error("column \"{0}\" was not found")]
	ColumnNotFound(String),
}

/// A feature table together with its aligned labels and the rows of the source table they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledSet {
	pub row_ids: Vec<usize>,
	pub features: DataFrame,
	pub labels: Column,
}

impl LabeledSet {
	pub fn nrows(&self) -> usize {
		self.row_ids.len()
	}

	/// Rejoin the features and the labels into a single table with the label as the last column.
	pub fn to_dataframe(&self) -> DataFrame {
		let mut dataframe = self.features.clone();
		dataframe.columns.push(self.labels.clone());
		dataframe
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct Split {
	pub fit: LabeledSet,
	pub validation: LabeledSet,
}

/// The number of rows out of `n` held out for validation.
pub fn validation_count(n: usize, val_size: f64) -> usize {
	(val_size * n.to_f64().unwrap()).round().to_usize().unwrap()
}

/// Check that `val_size` lies in the open interval `(0, 1)`.
pub fn validate_val_size(val_size: f64) -> Result<(), SplitError> {
	if val_size > 0.0 && val_size < 1.0 {
		Ok(())
	} else {
		Err(SplitError::InvalidValidationFraction(val_size))
	}
}

/**
Split `train` into a fit set and a validation set holding out `val_size` of the rows.

The label column is removed from the features of both sets and returned alongside them. All randomness is drawn from `rng`, so the same seed always produces the same split.
*/
pub fn split<R>(
	train: &DataFrame,
	label_column: &str,
	val_size: f64,
	policy: &SplitPolicy,
	rng: &mut R,
) -> Result<Split, SplitError>
where
	R: Rng + ?Sized,
{
	validate_val_size(val_size)?;
	let mut features = train.clone();
	let labels = features
		.remove_column(label_column)
		.ok_or_else(|| SplitError::ColumnNotFound(label_column.to_owned()))?;
	let (fit_row_ids, validation_row_ids) = match policy {
		SplitPolicy::Uniform => uniform_row_ids(train.nrows(), val_size, rng),
		SplitPolicy::GroupStratified { group_column } => {
			let column = train
				.column(group_column)
				.ok_or_else(|| SplitError::ColumnNotFound(group_column.clone()))?;
			group_stratified_row_ids(column, val_size, rng)
		}
	};
	tracing::info!(
		n_fit = fit_row_ids.len(),
		n_validation = validation_row_ids.len(),
		policy = ?policy,
		"split the train table"
	);
	let labeled_set = |row_ids: Vec<usize>| LabeledSet {
		features: features.take_rows(&row_ids),
		labels: labels.take_rows(&row_ids),
		row_ids,
	};
	Ok(Split {
		fit: labeled_set(fit_row_ids),
		validation: labeled_set(validation_row_ids),
	})
}

fn uniform_row_ids<R>(n: usize, val_size: f64, rng: &mut R) -> (Vec<usize>, Vec<usize>)
where
	R: Rng + ?Sized,
{
	let mut row_ids: Vec<usize> = (0..n).collect();
	row_ids.shuffle(rng);
	let fit_row_ids = row_ids.split_off(validation_count(n, val_size));
	(fit_row_ids, row_ids)
}

fn group_stratified_row_ids<R>(
	group_column: &Column,
	val_size: f64,
	rng: &mut R,
) -> (Vec<usize>, Vec<usize>)
where
	R: Rng + ?Sized,
{
	let mut fit_row_ids = Vec::new();
	let mut validation_row_ids = Vec::new();
	for (_, mut row_ids) in group_row_ids(group_column) {
		row_ids.shuffle(rng);
		let n_validation = validation_count(row_ids.len(), val_size);
		validation_row_ids.extend_from_slice(&row_ids[..n_validation]);
		fit_row_ids.extend_from_slice(&row_ids[n_validation..]);
	}
	fit_row_ids.sort_unstable();
	validation_row_ids.sort_unstable();
	(fit_row_ids, validation_row_ids)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum GroupKey {
	Code(usize),
	Value(String),
}

/// Group the row ids of `column` by value. Groups are ordered by key and each group's ids are ascending.
pub fn group_row_ids(column: &Column) -> BTreeMap<GroupKey, Vec<usize>> {
	let keys: Vec<GroupKey> = match column {
		Column::Enum(column) => column.data.iter().map(|code| GroupKey::Code(*code)).collect(),
		_ => canonical_values(column)
			.unwrap_or_default()
			.into_iter()
			.map(GroupKey::Value)
			.collect(),
	};
	let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
	for (row_id, key) in keys.into_iter().enumerate() {
		groups.entry(key).or_default().push(row_id);
	}
	groups
}

#[cfg(test)]
fn numbered_dataframe(n: usize) -> DataFrame {
	use ivf_dataframe::{EnumColumn, NumberColumn};
	DataFrame {
		columns: vec![
			Column::Number(NumberColumn {
				name: "x".to_owned(),
				data: (0..n).map(|i| i.to_f32().unwrap()).collect(),
			}),
			Column::Enum(EnumColumn {
				name: "group".to_owned(),
				options: vec!["a".to_owned(), "b".to_owned(), "c".to_owned()],
				data: (0..n).map(|i| if i % 10 < 5 { 0 } else if i % 10 < 8 { 1 } else { 2 }).collect(),
			}),
			Column::Number(NumberColumn {
				name: "label".to_owned(),
				data: (0..n).map(|i| (i % 2).to_f32().unwrap()).collect(),
			}),
		],
	}
}

#[cfg(test)]
fn seeded_rng(seed: u64) -> rand_xoshiro::Xoshiro256Plus {
	use rand::SeedableRng;
	rand_xoshiro::Xoshiro256Plus::seed_from_u64(seed)
}

#[test]
fn test_uniform_split() {
	use itertools::izip;
	let train = numbered_dataframe(1000);
	let split = split(&train, "label", 0.2, &SplitPolicy::Uniform, &mut seeded_rng(2025)).unwrap();
	assert_eq!(split.validation.nrows(), 200);
	assert_eq!(split.fit.nrows(), 800);
	let mut row_ids: Vec<usize> = split
		.fit
		.row_ids
		.iter()
		.chain(split.validation.row_ids.iter())
		.cloned()
		.collect();
	row_ids.sort_unstable();
	assert_eq!(row_ids, (0..1000).collect::<Vec<_>>());
	// The label is returned separately and aligned with the features.
	assert_eq!(split.fit.features.column_names(), vec!["x", "group"]);
	assert_eq!(split.fit.labels.name(), "label");
	let x = split.validation.features.column("x").unwrap().as_number().unwrap();
	let labels = split.validation.labels.as_number().unwrap();
	for (row_id, x, label) in itertools::izip!(&split.validation.row_ids, &x.data, &labels.data) {
		assert_eq!(*x, row_id.to_f32().unwrap());
		assert_eq!(*label, (row_id % 2).to_f32().unwrap());
	}
}

#[test]
fn test_uniform_split_is_reproducible() {
	let train = numbered_dataframe(1000);
	let first = split(&train, "label", 0.2, &SplitPolicy::Uniform, &mut seeded_rng(7)).unwrap();
	let second = split(&train, "label", 0.2, &SplitPolicy::Uniform, &mut seeded_rng(7)).unwrap();
	let other = split(&train, "label", 0.2, &SplitPolicy::Uniform, &mut seeded_rng(8)).unwrap();
	assert_eq!(first.validation.row_ids, second.validation.row_ids);
	assert_eq!(first.fit.row_ids, second.fit.row_ids);
	assert_ne!(first.validation.row_ids, other.validation.row_ids);
}

#[test]
fn test_group_stratified_split() {
	let train = numbered_dataframe(1000);
	let policy = SplitPolicy::GroupStratified {
		group_column: "group".to_owned(),
	};
	let split = split(&train, "label", 0.2, &policy, &mut seeded_rng(2025)).unwrap();
	let groups = group_row_ids(train.column("group").unwrap());
	assert_eq!(groups.len(), 3);
	for row_ids in groups.values() {
		let n_validation = row_ids
			.iter()
			.filter(|row_id| split.validation.row_ids.contains(row_id))
			.count();
		assert_eq!(n_validation, validation_count(row_ids.len(), 0.2));
	}
	assert_eq!(split.fit.nrows() + split.validation.nrows(), 1000);
	assert!(split.validation.row_ids.windows(2).all(|w| w[0] < w[1]));
	assert!(split.fit.row_ids.windows(2).all(|w| w[0] < w[1]));
	assert!(split
		.fit
		.row_ids
		.iter()
		.all(|row_id| !split.validation.row_ids.contains(row_id)));
}

#[test]
fn test_group_stratified_split_on_text_column() {
	use ivf_dataframe::{NumberColumn, TextColumn};
	let train = DataFrame {
		columns: vec![
			Column::Text(TextColumn {
				name: "code".to_owned(),
				data: vec!["A", "B", "A", "A", "B", "A", "", "A", "B", "A"]
					.into_iter()
					.map(|value| value.to_owned())
					.collect(),
			}),
			Column::Number(NumberColumn {
				name: "label".to_owned(),
				data: vec![0.0; 10],
			}),
		],
	};
	let policy = SplitPolicy::GroupStratified {
		group_column: "code".to_owned(),
	};
	let groups = group_row_ids(train.column("code").unwrap());
	assert_eq!(
		groups.keys().cloned().collect::<Vec<_>>(),
		vec![
			GroupKey::Value("A".to_owned()),
			GroupKey::Value("B".to_owned()),
			GroupKey::Value("nan".to_owned())
		]
	);
	let split = split(&train, "label", 0.5, &policy, &mut seeded_rng(1)).unwrap();
	// round(0.5 * 6) + round(0.5 * 3) + round(0.5 * 1)
	assert_eq!(split.validation.nrows(), 3 + 2 + 1);
}

#[test]
fn test_split_errors() {
	let train = numbered_dataframe(10);
	for val_size in &[0.0, 1.0, -0.5, 1.5, std::f64::NAN] {
		let result = split(&train, "label", *val_size, &SplitPolicy::Uniform, &mut seeded_rng(0));
		assert!(matches!(result, Err(SplitError::InvalidValidationFraction(_))));
	}
	assert_eq!(
		split(&train, "target", 0.2, &SplitPolicy::Uniform, &mut seeded_rng(0)),
		Err(SplitError::ColumnNotFound("target".to_owned()))
	);
	let policy = SplitPolicy::GroupStratified {
		group_column: "cycle".to_owned(),
	};
	assert_eq!(
		split(&train, "label", 0.2, &policy, &mut seeded_rng(0)),
		Err(SplitError::ColumnNotFound("cycle".to_owned()))
	);
}
