/*!
This module defines the `Config` struct, which is used to configure a preprocessing run with [`preprocess`](../pipeline/fn.preprocess.html). Every field is optional, and a missing field falls back to the default of the chosen strategy.

```yaml
seed: 42
validation_fraction: 0.25
split:
  type: group_stratified
  group_column: 시술 시기 코드
vocabulary: train_only
```
*/

use crate::split::SplitPolicy;
use anyhow::{Context, Result};
use ivf_features::Vocabulary;
use std::path::Path;

pub const DEFAULT_SEED: u64 = 2025;
pub const DEFAULT_VALIDATION_FRACTION: f64 = 0.2;

#[derive(Debug, Default, Clone, PartialEq, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
	pub seed: Option<u64>,
	pub validation_fraction: Option<f64>,
	pub split: Option<Split>,
	pub vocabulary: Option<VocabularyConfig>,
	pub label_column: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(tag = "type")]
pub enum Split {
	#[serde(rename = "uniform")]
	Uniform,
	#[serde(rename = "group_stratified")]
	GroupStratified { group_column: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Deserialize)]
pub enum VocabularyConfig {
	#[serde(rename = "joint")]
	Joint,
	#[serde(rename = "train_only")]
	TrainOnly,
}

impl From<VocabularyConfig> for Vocabulary {
	fn from(value: VocabularyConfig) -> Vocabulary {
		match value {
			VocabularyConfig::Joint => Vocabulary::Joint,
			VocabularyConfig::TrainOnly => Vocabulary::TrainOnly,
		}
	}
}

impl Config {
	pub fn seed(&self) -> u64 {
		self.seed.unwrap_or(DEFAULT_SEED)
	}

	pub fn validation_fraction(&self) -> f64 {
		self.validation_fraction
			.unwrap_or(DEFAULT_VALIDATION_FRACTION)
	}

	pub fn vocabulary(&self) -> Vocabulary {
		self.vocabulary.map(Vocabulary::from).unwrap_or_default()
	}

	/// The split policy to use, given the policy the strategy would use on its own.
	pub fn split_policy(&self, default_group_column: &str, strategy_default: SplitPolicy) -> SplitPolicy {
		match &self.split {
			None => strategy_default,
			Some(Split::Uniform) => SplitPolicy::Uniform,
			Some(Split::GroupStratified { group_column }) => SplitPolicy::GroupStratified {
				group_column: group_column
					.clone()
					.unwrap_or_else(|| default_group_column.to_owned()),
			},
		}
	}
}

/// Read and parse the config file at `config_path`, if one was given.
pub fn load_config(config_path: Option<&Path>) -> Result<Option<Config>> {
	if let Some(config_path) = config_path {
		let config = std::fs::read_to_string(config_path)
			.with_context(|| format!("failed to read config file {}", config_path.display()))?;
		let config = serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?;
		Ok(Some(config))
	} else {
		Ok(None)
	}
}

#[test]
fn test_parse_config() {
	let config: Config = serde_yaml::from_str(
		"
seed: 42
validation_fraction: 0.25
split:
  type: group_stratified
vocabulary: train_only
",
	)
	.unwrap();
	assert_eq!(config.seed(), 42);
	assert_eq!(config.validation_fraction(), 0.25);
	assert_eq!(config.vocabulary(), Vocabulary::TrainOnly);
	assert_eq!(
		config.split_policy("code", SplitPolicy::Uniform),
		SplitPolicy::GroupStratified {
			group_column: "code".to_owned()
		}
	);
	assert_eq!(config.label_column, None);
}

#[test]
fn test_config_defaults() {
	let config = Config::default();
	assert_eq!(config.seed(), DEFAULT_SEED);
	assert_eq!(config.validation_fraction(), DEFAULT_VALIDATION_FRACTION);
	assert_eq!(config.vocabulary(), Vocabulary::Joint);
	assert_eq!(
		config.split_policy("code", SplitPolicy::Uniform),
		SplitPolicy::Uniform
	);
}

#[test]
fn test_load_config() {
	assert_eq!(load_config(None).unwrap(), None);
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("config.yaml");
	std::fs::write(&path, "split:\n  type: uniform\n").unwrap();
	let config = load_config(Some(path.as_path())).unwrap().unwrap();
	assert_eq!(config.split, Some(Split::Uniform));
	std::fs::write(&path, "seeed: 1\n").unwrap();
	let error = load_config(Some(path.as_path())).unwrap_err();
	assert!(error.to_string().starts_with("failed to parse config file"));
}
