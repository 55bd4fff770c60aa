use fnv::FnvHashMap;
use ivf_dataframe::{Column, INVALID_VALUES};
use std::collections::BTreeSet;

/// The canonical form of a missing categorical value.
pub const MISSING_CATEGORY: &str = "nan";

/// The option name given to the reserved code for values outside a train only vocabulary.
pub const UNSEEN_CATEGORY: &str = "<unseen>";

/**
A `CodeMap` is a bijection from the distinct canonical values of a categorical column to the dense codes `0..len`. Codes are assigned in lexicographic order of the canonical values, so the same values always produce the same map.

# Example

| canonical value | code |
|-----------------|------|
| "A"             | 0    |
| "B"             | 1    |
| "C"             | 2    |
| "D"             | 3    |

A map built from train values alone can carry an extra reserved code, equal to `len`, that every value outside the vocabulary is mapped to.
*/
#[derive(Debug, Clone, PartialEq)]
pub struct CodeMap {
	options: Vec<String>,
	codes: FnvHashMap<String, usize>,
	unseen_code: Option<usize>,
}

impl CodeMap {
	/// Build a map over the distinct values of `values`. Looking up any other value fails.
	pub fn build<'a>(values: impl IntoIterator<Item = &'a str>) -> Self {
		let options: BTreeSet<&str> = values.into_iter().collect();
		let options: Vec<String> = options.into_iter().map(|option| option.to_owned()).collect();
		let codes = options
			.iter()
			.enumerate()
			.map(|(code, option)| (option.clone(), code))
			.collect();
		Self {
			options,
			codes,
			unseen_code: None,
		}
	}

	/// The joint vocabulary build. The map covers the union of the train and eval values, so encoding either table never meets an unknown value.
	pub fn build_joint<'a>(
		train_values: impl IntoIterator<Item = &'a str>,
		eval_values: impl IntoIterator<Item = &'a str>,
	) -> Self {
		Self::build(train_values.into_iter().chain(eval_values))
	}

	/// Build a map over the train values only. Values not seen in train are mapped to the reserved code `len`.
	pub fn build_train_only<'a>(train_values: impl IntoIterator<Item = &'a str>) -> Self {
		let mut code_map = Self::build(train_values);
		code_map.unseen_code = Some(code_map.options.len());
		code_map
	}

	/// The number of values in the vocabulary, not counting the reserved unseen code.
	pub fn len(&self) -> usize {
		self.options.len()
	}

	pub fn is_empty(&self) -> bool {
		self.options.is_empty()
	}

	pub fn options(&self) -> &[String] {
		&self.options
	}

	pub fn unseen_code(&self) -> Option<usize> {
		self.unseen_code
	}

	pub fn code(&self, value: &str) -> Option<usize> {
		self.codes.get(value).copied().or(self.unseen_code)
	}

	pub fn option(&self, code: usize) -> Option<&str> {
		self.options.get(code).map(|option| option.as_str())
	}

	/// The option names for an encoded column, one per possible code, including the reserved unseen code if there is one.
	pub fn encoded_options(&self) -> Vec<String> {
		let mut options = self.options.clone();
		if self.unseen_code.is_some() {
			options.push(UNSEEN_CATEGORY.to_owned());
		}
		options
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
		self.options
			.iter()
			.enumerate()
			.map(|(code, option)| (option.as_str(), code))
	}
}

impl std::fmt::Display for CodeMap {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{{")?;
		for (i, (option, code)) in self.iter().enumerate() {
			if i > 0 {
				write!(f, ", ")?;
			}
			write!(f, "{:?}: {}", option, code)?;
		}
		if let Some(unseen_code) = self.unseen_code {
			if !self.options.is_empty() {
				write!(f, ", ")?;
			}
			write!(f, "{}: {}", UNSEEN_CATEGORY, unseen_code)?;
		}
		write!(f, "}}")
	}
}

/// Compute the canonical string of a number. Integral values are written without a fractional part, so `1.0` and `1` share a category.
pub fn canonicalize_number(value: f64) -> String {
	if !value.is_finite() {
		MISSING_CATEGORY.to_owned()
	} else if value == 0.0 {
		"0".to_owned()
	} else {
		value.to_string()
	}
}

/// Compute the canonical string of a raw csv cell. Missing markers become `nan` and plain decimals are normalized like a number. Anything else, including spellings such as `007` that a number would not give back, is kept as is.
pub fn canonicalize_text(value: &str) -> String {
	let value = value.trim();
	if INVALID_VALUES.contains(&value) {
		return MISSING_CATEGORY.to_owned();
	}
	canonicalize_decimal(value).unwrap_or_else(|| value.to_owned())
}

/// Strip trailing fractional zeros and a negative sign on zero from a decimal such as `-12.50`. Returns `None` if `value` is not a plain decimal, has leading zeros, or does not survive the trip through `f64` unchanged.
fn canonicalize_decimal(value: &str) -> Option<String> {
	let (negative, digits) = match value.strip_prefix('-') {
		Some(digits) => (true, digits),
		None => (false, value),
	};
	let (integer, fraction) = match digits.find('.') {
		Some(index) => (&digits[..index], &digits[index + 1..]),
		None => (digits, ""),
	};
	let is_digits = |s: &str| s.bytes().all(|byte| byte.is_ascii_digit());
	if integer.is_empty() || !is_digits(integer) || !is_digits(fraction) {
		return None;
	}
	if integer.len() > 1 && integer.starts_with('0') {
		return None;
	}
	let fraction = fraction.trim_end_matches('0');
	let mut canonical = String::new();
	if negative && !(integer == "0" && fraction.is_empty()) {
		canonical.push('-');
	}
	canonical.push_str(integer);
	if !fraction.is_empty() {
		canonical.push('.');
		canonical.push_str(fraction);
	}
	let number = lexical::parse::<f64, _>(canonical.as_str()).ok()?;
	if canonicalize_number(number) == canonical {
		Some(canonical)
	} else {
		None
	}
}

/// Compute the canonical string of every value in a column. Returns `None` for an enum column, whose values are already codes.
pub fn canonical_values(column: &Column) -> Option<Vec<String>> {
	match column {
		Column::Unknown(column) => Some(vec![MISSING_CATEGORY.to_owned(); column.len]),
		// Go through the shortest decimal form of the f32 so that a number column and a text column holding the same digits agree.
		Column::Number(column) => Some(
			column
				.data
				.iter()
				.map(|value| canonicalize_text(&value.to_string()))
				.collect(),
		),
		Column::Text(column) => Some(
			column
				.data
				.iter()
				.map(|value| canonicalize_text(value))
				.collect(),
		),
		Column::Enum(_) => None,
	}
}

#[test]
fn test_canonicalize() {
	assert_eq!(canonicalize_text("1"), "1");
	assert_eq!(canonicalize_text("1.0"), "1");
	assert_eq!(canonicalize_text(" 2.50 "), "2.5");
	assert_eq!(canonicalize_text("-0"), "0");
	assert_eq!(canonicalize_text("만18-34세"), "만18-34세");
	assert_eq!(canonicalize_text(""), MISSING_CATEGORY);
	assert_eq!(canonicalize_text("NULL"), MISSING_CATEGORY);
	assert_eq!(canonicalize_number(1.0), "1");
	assert_eq!(canonicalize_number(f64::NAN), MISSING_CATEGORY);
}

#[test]
fn test_canonicalize_keeps_distinct_spellings() {
	assert_eq!(canonicalize_text("007"), "007");
	assert_eq!(canonicalize_text("7"), "7");
	assert_eq!(canonicalize_text("7.000"), "7");
	assert_eq!(canonicalize_text("-0.0"), "0");
	assert_eq!(canonicalize_text("9007199254740992"), "9007199254740992");
	assert_eq!(canonicalize_text("9007199254740993"), "9007199254740993");
	assert_eq!(canonicalize_text("1e3"), "1e3");
	let values: Vec<String> = ["007", "7", "7.0", "9007199254740993", "9007199254740992"]
		.iter()
		.map(|value| canonicalize_text(value))
		.collect();
	let code_map = CodeMap::build_joint(
		values[..3].iter().map(|value| value.as_str()),
		values[3..].iter().map(|value| value.as_str()),
	);
	assert_eq!(
		code_map.options(),
		["007", "7", "9007199254740992", "9007199254740993"]
	);
	assert_ne!(code_map.code("007"), code_map.code("7"));
	assert_ne!(
		code_map.code("9007199254740992"),
		code_map.code("9007199254740993")
	);
}

#[test]
fn test_canonical_values_agree_across_column_types() {
	use ivf_dataframe::{EnumColumn, NumberColumn, TextColumn};
	let number = Column::Number(NumberColumn {
		name: "a".to_owned(),
		data: vec![1.0, 1.1, std::f32::NAN],
	});
	let text = Column::Text(TextColumn {
		name: "a".to_owned(),
		data: vec!["1".to_owned(), "1.1".to_owned(), "".to_owned()],
	});
	assert_eq!(canonical_values(&number), canonical_values(&text));
	assert_eq!(
		canonical_values(&text).unwrap(),
		vec!["1", "1.1", MISSING_CATEGORY]
	);
	let encoded = Column::Enum(EnumColumn {
		name: "a".to_owned(),
		options: vec!["x".to_owned()],
		data: vec![0],
	});
	assert_eq!(canonical_values(&encoded), None);
}

#[test]
fn test_build_joint() {
	let code_map = CodeMap::build_joint(vec!["A", "B", "A", "C", "B"], vec!["B", "D"]);
	assert_eq!(code_map.len(), 4);
	assert_eq!(code_map.options(), ["A", "B", "C", "D"]);
	for (code, value) in ["A", "B", "C", "D"].iter().enumerate() {
		assert_eq!(code_map.code(value), Some(code));
		assert_eq!(code_map.option(code), Some(*value));
	}
	assert_eq!(code_map.code("E"), None);
	assert_eq!(code_map.to_string(), r#"{"A": 0, "B": 1, "C": 2, "D": 3}"#);
}

#[test]
fn test_build_is_order_independent() {
	let a = CodeMap::build(vec!["b", "a", "c"]);
	let b = CodeMap::build(vec!["c", "c", "a", "b"]);
	assert_eq!(a, b);
}

#[test]
fn test_build_train_only() {
	let code_map = CodeMap::build_train_only(vec!["B", "A"]);
	assert_eq!(code_map.len(), 2);
	assert_eq!(code_map.code("A"), Some(0));
	assert_eq!(code_map.code("D"), Some(2));
	assert_eq!(code_map.unseen_code(), Some(2));
	assert_eq!(code_map.encoded_options(), vec!["A", "B", UNSEEN_CATEGORY]);
	assert_eq!(code_map.to_string(), r#"{"A": 0, "B": 1, <unseen>: 2}"#);
}
