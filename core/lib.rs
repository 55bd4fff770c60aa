/*!
This crate implements the preprocessing pipeline for the IVF pregnancy outcome task: loading the train and eval tables, selecting and encoding features, filling in missing numbers, splitting off a validation set, and writing submission files.
*/

#![allow(clippy::tabs_in_doc_comments)]

pub mod config;
pub mod load;
pub mod pipeline;
pub mod progress;
pub mod split;
pub mod strategy;
pub mod submission;

pub use self::{
	config::{load_config, Config},
	load::{load_tables, LoadError, TableKind},
	pipeline::{preprocess, preprocess_tables, PipelineOptions, PreprocessOutput},
	progress::Progress,
	split::{split, LabeledSet, Split, SplitError, SplitPolicy},
	strategy::{FeatureSpec, Strategy, GROUP_COLUMN, LABEL_COLUMN},
	submission::{
		read_predictions, submission_file_name, write_submission, SubmissionError,
		SubmissionOptions,
	},
};
