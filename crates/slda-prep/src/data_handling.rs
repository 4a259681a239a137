//! Row-aligned dataset container.
//!
//! A `Dataset` keeps the feature matrix, encoded labels and optional sample
//! ids together so that subsetting for cross-validation can never desync
//! them.
use anyhow::Result;

use crate::error::PrepError;
use crate::math::Array2;

#[derive(Debug, Clone)]
pub struct Dataset {
    /// Samples x features count matrix.
    pub x: Array2<f64>,
    /// Integer label code per sample.
    pub labels: Vec<usize>,
    /// Original sample identifiers, when known.
    pub sample_ids: Option<Vec<String>>,
}

impl Dataset {
    /// Build a dataset, checking that every row-aligned field matches the
    /// matrix row count.
    pub fn new(x: Array2<f64>, labels: Vec<usize>, sample_ids: Option<Vec<String>>) -> Result<Self> {
        check_row_count("labels", x.nrows(), labels.len())?;
        if let Some(ids) = &sample_ids {
            check_row_count("sample ids", x.nrows(), ids.len())?;
        }
        Ok(Dataset {
            x,
            labels,
            sample_ids,
        })
    }

    pub fn n_samples(&self) -> usize {
        self.x.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.x.ncols()
    }

    /// Select the given rows from all row-aligned fields.
    ///
    /// # Arguments
    ///
    /// * `indices` - Row indices into this dataset; order is kept as given.
    ///
    /// # Returns
    ///
    /// A new `Dataset` with one row per index.
    pub fn filter_by_indices(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: self.x.select_rows(indices),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            sample_ids: self
                .sample_ids
                .as_ref()
                .map(|ids| indices.iter().map(|&i| ids[i].clone()).collect()),
        }
    }

    pub fn log_summary(&self) {
        let n_classes = self
            .labels
            .iter()
            .copied()
            .max()
            .map_or(0, |max_code| max_code + 1);
        log::info!(
            "Dataset: {} samples, {} features, {} label codes",
            self.n_samples(),
            self.n_features(),
            n_classes
        );
    }
}

pub(crate) fn check_row_count(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(PrepError::ShapeMismatch {
            what,
            expected,
            found,
        }
        .into());
    }
    Ok(())
}
