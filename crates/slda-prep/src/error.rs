use std::error::Error;
use std::fmt;
use std::path::PathBuf;

/// Failures raised by dataset preparation and estimator invocation.
///
/// I/O failures are not represented here; they travel as `std::io::Error`
/// wrapped with path context by `anyhow`.
#[derive(Debug, Clone, PartialEq)]
pub enum PrepError {
    /// Row-aligned inputs disagree in length (e.g. matrix rows vs labels).
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// A row has a different number of fields than the declared width.
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A matrix cell cannot be written as a count.
    InvalidValue { row: usize, col: usize, value: f64 },
    UnknownLabel(String),
    UnknownCode(usize),
    /// A stored label legend cannot be turned back into an encoder.
    InvalidLegend(String),
    InvalidFoldCount { k: usize, n_samples: usize },
    InvalidFoldAssignment(String),
    /// Inference was requested but no trained model file is available.
    MissingModel(PathBuf),
    /// The external estimator exited unsuccessfully.
    EstimatorFailed { mode: String, status: Option<i32> },
}

impl fmt::Display for PrepError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrepError::ShapeMismatch {
                what,
                expected,
                found,
            } => write!(
                f,
                "Shape mismatch for {}: expected {} rows, found {}",
                what, expected, found
            ),
            PrepError::MalformedRow {
                row,
                expected,
                found,
            } => write!(
                f,
                "Malformed row {}: expected {} fields, found {}",
                row, expected, found
            ),
            PrepError::InvalidValue { row, col, value } => write!(
                f,
                "Invalid count {} at row {}, column {}",
                value, row, col
            ),
            PrepError::UnknownLabel(label) => write!(f, "Label '{}' is not in the legend", label),
            PrepError::UnknownCode(code) => write!(f, "Code {} is not in the legend", code),
            PrepError::InvalidLegend(reason) => write!(f, "Invalid label legend: {}", reason),
            PrepError::InvalidFoldCount { k, n_samples } => write!(
                f,
                "Cannot split {} samples into {} folds (need 2 <= k <= n_samples)",
                n_samples, k
            ),
            PrepError::InvalidFoldAssignment(reason) => {
                write!(f, "Invalid fold assignment: {}", reason)
            }
            PrepError::MissingModel(path) => write!(
                f,
                "Attempt to use a model before training it: {} not found",
                path.display()
            ),
            PrepError::EstimatorFailed { mode, status } => match status {
                Some(code) => write!(f, "Estimator '{}' exited with status {}", mode, code),
                None => write!(f, "Estimator '{}' was terminated by a signal", mode),
            },
        }
    }
}

impl Error for PrepError {}
