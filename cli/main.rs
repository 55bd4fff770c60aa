//! This module contains the main entrypoint to the ivf cli.

use anyhow::Result;
use clap::{Args, Parser};
use colored::Colorize;
use ivf_core::{
	load_config, preprocess, read_predictions, write_submission, Progress, Strategy,
	SubmissionOptions,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
	about = "Preprocess the IVF pregnancy outcome data and write submission files.",
	disable_help_subcommand = true
)]
enum Options {
	#[command(name = "preprocess")]
	Preprocess(PreprocessOptions),
	#[command(name = "submit")]
	Submit(SubmitOptions),
}

#[derive(Args, Debug)]
#[command(about = "preprocess the train and eval tables")]
#[command(
	long_about = "select, encode and fill in the features of the train and eval tables, split off a validation set, and write fit.csv, validation.csv and eval.csv"
)]
struct PreprocessOptions {
	#[arg(long, help = "the path to the train .csv file")]
	train: Option<PathBuf>,
	#[arg(long, help = "the path to the eval .csv file")]
	eval: Option<PathBuf>,
	#[arg(
		short,
		long,
		default_value = "baseline",
		help = "the feature set to use, baseline or reference-paper"
	)]
	strategy: Strategy,
	#[arg(short, long, help = "the path to a config file")]
	config: Option<PathBuf>,
	#[arg(short, long, help = "the directory to write the preprocessed tables to")]
	output: PathBuf,
}

#[derive(Args, Debug)]
#[command(about = "write a submission file")]
#[command(
	long_about = "fill in the prediction column of the submission template and write it to <results-root>/<dir-name>"
)]
struct SubmitOptions {
	#[arg(
		long,
		help = "a .csv file whose probability column, or else its first number column, holds the predictions"
	)]
	predictions: PathBuf,
	#[arg(long, help = "the directory under the results root to write to")]
	dir_name: String,
	#[arg(long, help = "the name of the model, used in the file name")]
	model_name: Option<String>,
	#[arg(long, help = "the validation ROC AUC, used in the file name")]
	score: Option<f64>,
	#[arg(long, default_value = ivf_core::submission::DEFAULT_TEMPLATE_PATH, help = "the path to the submission template")]
	template: PathBuf,
	#[arg(long, default_value = ivf_core::submission::DEFAULT_RESULTS_ROOT, help = "the directory submissions are written under")]
	results_root: PathBuf,
}

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| "ivf=info".into()),
		)
		.with_writer(std::io::stderr)
		.init();
	let options = Options::parse();
	let result = match options {
		Options::Preprocess(options) => cli_preprocess(options),
		Options::Submit(options) => cli_submit(options),
	};
	if let Err(error) = result {
		eprintln!("{}: {:#}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_preprocess(options: PreprocessOptions) -> Result<()> {
	let config = load_config(options.config.as_deref())?.unwrap_or_default();
	let output = preprocess(
		options.strategy,
		options.train.as_deref(),
		options.eval.as_deref(),
		&config,
		&mut |progress| match &progress {
			Progress::Loading(_, _) => eprintln!("{}", progress.to_string().dimmed()),
			_ => eprintln!("{}...", progress.to_string().dimmed()),
		},
	)?;
	output.write_csv(&options.output)?;
	eprintln!(
		"Wrote {} fit rows, {} validation rows and {} eval rows to {}.",
		output.fit.nrows(),
		output.validation.nrows(),
		output.eval.nrows(),
		options.output.display()
	);
	Ok(())
}

fn cli_submit(options: SubmitOptions) -> Result<()> {
	let predictions = read_predictions(&options.predictions)?;
	let submission_options = SubmissionOptions {
		dir_name: options.dir_name,
		model_name: options.model_name,
		score: options.score,
		template_path: options.template,
		results_root: options.results_root,
	};
	let today = chrono::Utc::now().naive_utc().date();
	let path = write_submission(&submission_options, &predictions, today)?;
	eprintln!("Your submission was written to {}.", path.display());
	Ok(())
}
