/*!
This module defines the preprocessing strategies. A strategy is a fixed feature list together with the split policy it uses by default.
*/

use crate::split::SplitPolicy;
use ivf_dataframe::ColumnType;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Whether the treatment resulted in a pregnancy. Present in the train table only.
pub const LABEL_COLUMN: &str = "임신 성공 여부";

/// The treatment cycle code, used to stratify the validation split.
pub const GROUP_COLUMN: &str = "시술 시기 코드";

const BASELINE_CATEGORICAL_FEATURES: &[&str] = &[
	"시술 시기 코드",
	"시술 당시 나이",
	"시술 유형",
	"특정 시술 유형",
	"배란 자극 여부",
	"배란 유도 유형",
	"단일 배아 이식 여부",
	"착상 전 유전 검사 사용 여부",
	"착상 전 유전 진단 사용 여부",
	"남성 주 불임 원인",
	"남성 부 불임 원인",
	"여성 주 불임 원인",
	"여성 부 불임 원인",
	"부부 주 불임 원인",
	"부부 부 불임 원인",
	"불명확 불임 원인",
	"불임 원인 - 난관 질환",
	"불임 원인 - 남성 요인",
	"불임 원인 - 배란 장애",
	"불임 원인 - 여성 요인",
	"불임 원인 - 자궁경부 문제",
	"불임 원인 - 자궁내막증",
	"불임 원인 - 정자 농도",
	"불임 원인 - 정자 면역학적 요인",
	"불임 원인 - 정자 운동성",
	"불임 원인 - 정자 형태",
	"배아 생성 주요 이유",
	"총 시술 횟수",
	"클리닉 내 총 시술 횟수",
	"IVF 시술 횟수",
	"DI 시술 횟수",
	"총 임신 횟수",
	"IVF 임신 횟수",
	"DI 임신 횟수",
	"총 출산 횟수",
	"IVF 출산 횟수",
	"DI 출산 횟수",
	"난자 출처",
	"정자 출처",
	"난자 기증자 나이",
	"정자 기증자 나이",
	"동결 배아 사용 여부",
	"신선 배아 사용 여부",
	"기증 배아 사용 여부",
	"대리모 여부",
	"PGD 시술 여부",
	"PGS 시술 여부",
];

const BASELINE_NUMERICAL_FEATURES: &[&str] = &[
	"임신 시도 또는 마지막 임신 경과 연수",
	"총 생성 배아 수",
	"미세주입된 난자 수",
	"미세주입에서 생성된 배아 수",
	"이식된 배아 수",
	"미세주입 배아 이식 수",
	"저장된 배아 수",
	"미세주입 후 저장된 배아 수",
	"해동된 배아 수",
	"해동 난자 수",
	"수집된 신선 난자 수",
	"저장된 신선 난자 수",
	"혼합된 난자 수",
	"파트너 정자와 혼합된 난자 수",
	"기증자 정자와 혼합된 난자 수",
	"난자 채취 경과일",
	"난자 해동 경과일",
	"난자 혼합 경과일",
	"배아 이식 경과일",
	"배아 해동 경과일",
];

// Features from "Machine learning predicts live-birth occurrence before in-vitro fertilization treatment", doi:10.1038/s41598-020-76928-z.
const REFERENCE_PAPER_CATEGORICAL_FEATURES: &[&str] =
	&["시술 당시 나이", "IVF 시술 횟수", "IVF 임신 횟수", "IVF 출산 횟수"];

const REFERENCE_PAPER_NUMERICAL_FEATURES: &[&str] = &[
	"남성 주 불임 원인",
	"남성 부 불임 원인",
	"여성 주 불임 원인",
	"여성 부 불임 원인",
	"부부 주 불임 원인",
	"부부 부 불임 원인",
	"불명확 불임 원인",
	"불임 원인 - 난관 질환",
	"불임 원인 - 남성 요인",
	"불임 원인 - 배란 장애",
	"불임 원인 - 자궁경부 문제",
	"불임 원인 - 자궁내막증",
	"불임 원인 - 정자 농도",
	"불임 원인 - 정자 운동성",
	"불임 원인 - 정자 형태",
	"이식된 배아 수",
	"해동 난자 수",
	"수집된 신선 난자 수",
	"파트너 정자와 혼합된 난자 수",
	"동결 배아 사용 여부",
	"신선 배아 사용 여부",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
	/// The feature set of the competition's baseline, split per treatment cycle code.
	Baseline,
	/// A smaller feature set taken from the literature, split uniformly.
	ReferencePaper,
}

impl Default for Strategy {
	fn default() -> Self {
		Strategy::Baseline
	}
}

impl std::fmt::Display for Strategy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Strategy::Baseline => write!(f, "baseline"),
			Strategy::ReferencePaper => write!(f, "reference-paper"),
		}
	}
}

#[derive(Debug, Error, PartialEq)]
#[error("unknown strategy \"{0}\", expected \"baseline\" or \"reference-paper\"")]
pub struct ParseStrategyError(String);

impl std::str::FromStr for Strategy {
	type Err = ParseStrategyError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"baseline" => Ok(Strategy::Baseline),
			"reference-paper" => Ok(Strategy::ReferencePaper),
			_ => Err(ParseStrategyError(s.to_owned())),
		}
	}
}

impl Strategy {
	pub fn feature_spec(self) -> FeatureSpec {
		let (categorical_features, numerical_features) = match self {
			Strategy::Baseline => (BASELINE_CATEGORICAL_FEATURES, BASELINE_NUMERICAL_FEATURES),
			Strategy::ReferencePaper => (
				REFERENCE_PAPER_CATEGORICAL_FEATURES,
				REFERENCE_PAPER_NUMERICAL_FEATURES,
			),
		};
		FeatureSpec {
			categorical_features: to_owned_names(categorical_features),
			numerical_features: to_owned_names(numerical_features),
			label_column: LABEL_COLUMN.to_owned(),
		}
	}

	pub fn default_split_policy(self) -> SplitPolicy {
		match self {
			Strategy::Baseline => SplitPolicy::GroupStratified {
				group_column: GROUP_COLUMN.to_owned(),
			},
			Strategy::ReferencePaper => SplitPolicy::Uniform,
		}
	}
}

fn to_owned_names(names: &[&str]) -> Vec<String> {
	names.iter().map(|name| (*name).to_owned()).collect()
}

/// The columns a pipeline keeps, and how each of them is treated.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
	pub categorical_features: Vec<String>,
	pub numerical_features: Vec<String>,
	pub label_column: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum FeatureSpecError {
	#[error("no features were listed")]
	Empty,
	#[error("feature \"{0}\" is listed more than once")]
	Duplicate(String),
	#[error("the label column \"{0}\" is listed as a feature")]
	LabelIsFeature(String),
}

impl FeatureSpec {
	/// Check that the two lists are disjoint, hold no duplicates, and do not mention the label.
	pub fn validate(&self) -> Result<(), FeatureSpecError> {
		if self.categorical_features.is_empty() && self.numerical_features.is_empty() {
			return Err(FeatureSpecError::Empty);
		}
		let mut seen = BTreeSet::new();
		for name in self.features() {
			if name == self.label_column {
				return Err(FeatureSpecError::LabelIsFeature(name.to_owned()));
			}
			if !seen.insert(name) {
				return Err(FeatureSpecError::Duplicate(name.to_owned()));
			}
		}
		Ok(())
	}

	/// The categorical features followed by the numerical features.
	pub fn features(&self) -> impl Iterator<Item = &str> {
		self.categorical_features
			.iter()
			.chain(self.numerical_features.iter())
			.map(|name| name.as_str())
	}

	/// The columns to keep in the train table: every feature and the label.
	pub fn train_allow_list(&self) -> Vec<&str> {
		self.features()
			.chain(std::iter::once(self.label_column.as_str()))
			.collect()
	}

	pub fn eval_allow_list(&self) -> Vec<&str> {
		self.features().collect()
	}

	pub fn categorical_names(&self) -> Vec<&str> {
		self.categorical_features.iter().map(|name| name.as_str()).collect()
	}

	pub fn numerical_names(&self) -> Vec<&str> {
		self.numerical_features.iter().map(|name| name.as_str()).collect()
	}

	/// The types the loader should read the columns with. Categorical values keep their raw text so that codes such as `"6 이상"` and `"1"` share one column, and numbers and the label are parsed as numbers.
	pub fn column_types(&self) -> BTreeMap<String, ColumnType> {
		let mut column_types = BTreeMap::new();
		for name in self.categorical_features.iter() {
			column_types.insert(name.clone(), ColumnType::Text);
		}
		for name in self
			.numerical_features
			.iter()
			.chain(std::iter::once(&self.label_column))
		{
			column_types.insert(name.clone(), ColumnType::Number);
		}
		column_types
	}
}

#[test]
fn test_feature_lists() {
	let baseline = Strategy::Baseline.feature_spec();
	assert_eq!(baseline.categorical_features.len(), 47);
	assert_eq!(baseline.numerical_features.len(), 20);
	assert_eq!(baseline.validate(), Ok(()));
	assert!(baseline.categorical_names().contains(&GROUP_COLUMN));
	let reference_paper = Strategy::ReferencePaper.feature_spec();
	assert_eq!(reference_paper.categorical_features.len(), 4);
	assert_eq!(reference_paper.numerical_features.len(), 21);
	assert_eq!(reference_paper.validate(), Ok(()));
	assert!(!reference_paper.features().any(|name| name == GROUP_COLUMN));
	assert_eq!(
		Strategy::ReferencePaper.default_split_policy(),
		SplitPolicy::Uniform
	);
}

#[test]
fn test_allow_lists() {
	let feature_spec = Strategy::ReferencePaper.feature_spec();
	let train_allow_list = feature_spec.train_allow_list();
	assert_eq!(train_allow_list.len(), 26);
	assert_eq!(train_allow_list.last(), Some(&LABEL_COLUMN));
	assert!(!feature_spec.eval_allow_list().contains(&LABEL_COLUMN));
	let column_types = feature_spec.column_types();
	assert_eq!(column_types.get("시술 당시 나이"), Some(&ColumnType::Text));
	assert_eq!(column_types.get(LABEL_COLUMN), Some(&ColumnType::Number));
}

#[test]
fn test_validate() {
	let feature_spec = FeatureSpec {
		categorical_features: vec!["a".to_owned(), "b".to_owned()],
		numerical_features: vec!["b".to_owned()],
		label_column: "label".to_owned(),
	};
	assert_eq!(feature_spec.validate(), Err(FeatureSpecError::Duplicate("b".to_owned())));
	let feature_spec = FeatureSpec {
		categorical_features: vec!["label".to_owned()],
		numerical_features: vec![],
		label_column: "label".to_owned(),
	};
	assert_eq!(
		feature_spec.validate(),
		Err(FeatureSpecError::LabelIsFeature("label".to_owned()))
	);
	let feature_spec = FeatureSpec {
		categorical_features: vec![],
		numerical_features: vec![],
		label_column: "label".to_owned(),
	};
	assert_eq!(feature_spec.validate(), Err(FeatureSpecError::Empty));
}

#[test]
fn test_parse_strategy() {
	assert_eq!("baseline".parse::<Strategy>(), Ok(Strategy::Baseline));
	assert_eq!("reference-paper".parse::<Strategy>(), Ok(Strategy::ReferencePaper));
	assert_eq!(
		"paper".parse::<Strategy>(),
		Err(ParseStrategyError("paper".to_owned()))
	);
	assert_eq!(Strategy::ReferencePaper.to_string(), "reference-paper");
}
