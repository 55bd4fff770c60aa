use crate::load::TableKind;
use ivf_util::progress_counter::ProgressCounter;

/// The stages of a preprocessing run, reported through the `update_progress` callback as each one begins.
#[derive(Debug)]
pub enum Progress {
	Loading(TableKind, ProgressCounter),
	Selecting,
	Encoding,
	Imputing,
	Splitting,
}

impl std::fmt::Display for Progress {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Progress::Loading(table, progress_counter) => write!(
				f,
				"loading the {} data ({} bytes)",
				table,
				progress_counter.total()
			),
			Progress::Selecting => write!(f, "selecting features"),
			Progress::Encoding => write!(f, "encoding categorical features"),
			Progress::Imputing => write!(f, "filling in missing numbers"),
			Progress::Splitting => write!(f, "splitting into fit and validation sets"),
		}
	}
}
