/*!
This crate turns loaded dataframes into model ready features. It restricts tables to a feature list, encodes categorical columns into dense integer codes with a [`CodeMap`](code_map/struct.CodeMap.html) shared between the train and eval tables, and fills in missing numbers.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod code_map;
pub mod encode;
pub mod impute;
pub mod select;

pub use self::{
	code_map::{canonical_values, CodeMap, MISSING_CATEGORY, UNSEEN_CATEGORY},
	encode::{
		encode_categorical, ColumnFailure, EncodeError, EncodeReport, EncodedColumn, Vocabulary,
	},
	impute::{impute_numeric, ImputeError, DEFAULT_FILL_VALUE},
	select::{select_columns, select_features, SelectError},
};
