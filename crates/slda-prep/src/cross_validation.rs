//! Stratified k-fold splitting and per-fold dataset writing.
//!
//! Folds are represented as test-index sets. Fold `i` is held out once as the
//! test set and the remaining folds form its train set. Indices inside every
//! set are kept ascending, so an externally supplied partition and a computed
//! one produce identical files whenever they describe the same split.
use std::fmt::Display;
use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::data_handling::Dataset;
use crate::error::PrepError;
use crate::io::slda_format::{create_slda_dataset, write_label_legend, SldaFiles};
use crate::label_encoder::LabelEncoder;

pub const DEFAULT_N_FOLDS: usize = 10;

/// Parameters for computed (stratified) folds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossValidationConfig {
    pub n_folds: usize,
    /// Shuffle each class before dealing it into folds.
    pub shuffle: bool,
    /// Seed for the shuffle; ignored when `shuffle` is false.
    pub seed: u64,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self {
            n_folds: DEFAULT_N_FOLDS,
            shuffle: false,
            seed: 0,
        }
    }
}

/// A partition of `0..n_samples` into test folds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldAssignment {
    folds: Vec<Vec<usize>>,
    n_samples: usize,
}

/// Train/test row indices for one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl FoldAssignment {
    /// Validate that `test_folds` partitions `0..n_samples`.
    ///
    /// Stratification is not checked; any disjoint, complete partition is
    /// accepted as-is.
    pub fn new(test_folds: Vec<Vec<usize>>, n_samples: usize) -> Result<Self> {
        if test_folds.len() < 2 {
            return Err(PrepError::InvalidFoldAssignment(format!(
                "need at least 2 folds, found {}",
                test_folds.len()
            ))
            .into());
        }

        let mut seen = vec![false; n_samples];
        let mut folds = Vec::with_capacity(test_folds.len());
        for (fold_idx, mut fold) in test_folds.into_iter().enumerate() {
            for &idx in &fold {
                if idx >= n_samples {
                    return Err(PrepError::InvalidFoldAssignment(format!(
                        "fold {} references sample {} but there are only {} samples",
                        fold_idx, idx, n_samples
                    ))
                    .into());
                }
                if seen[idx] {
                    return Err(PrepError::InvalidFoldAssignment(format!(
                        "sample {} appears in more than one fold",
                        idx
                    ))
                    .into());
                }
                seen[idx] = true;
            }
            fold.sort_unstable();
            folds.push(fold);
        }

        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(PrepError::InvalidFoldAssignment(format!(
                "sample {} is not assigned to any fold",
                missing
            ))
            .into());
        }

        Ok(FoldAssignment { folds, n_samples })
    }

    pub fn n_folds(&self) -> usize {
        self.folds.len()
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Test-index sets, one per fold.
    pub fn folds(&self) -> &[Vec<usize>] {
        &self.folds
    }

    /// Train/test indices for fold `fold`. Panics if `fold >= n_folds()`.
    pub fn split(&self, fold: usize) -> TrainTestSplit {
        let test = self.folds[fold].clone();
        let mut train = self
            .folds
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != fold)
            .flat_map(|(_, f)| f.iter().copied())
            .collect::<Vec<_>>();
        train.sort_unstable();
        TrainTestSplit { train, test }
    }
}

/// Deal each class's indices round-robin into `k` folds.
///
/// Classes are visited in code order and a single fold cursor is carried
/// across classes, so both per-class and total fold sizes differ by at most
/// one.
///
/// # Arguments
///
/// * `codes` - Integer label code per sample.
/// * `k` - Number of folds, `2 <= k <= codes.len()`.
/// * `config` - Shuffle settings; `config.n_folds` is not consulted.
pub fn stratified_folds(
    codes: &[usize],
    k: usize,
    config: &CrossValidationConfig,
) -> Result<FoldAssignment> {
    let n_samples = codes.len();
    if k < 2 || k > n_samples {
        return Err(PrepError::InvalidFoldCount { k, n_samples }.into());
    }

    let n_classes = codes.iter().copied().max().map_or(0, |m| m + 1);
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (idx, &code) in codes.iter().enumerate() {
        by_class[code].push(idx);
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut folds: Vec<Vec<usize>> = vec![Vec::new(); k];
    let mut cursor = 0;
    for (code, members) in by_class.iter_mut().enumerate() {
        if members.is_empty() {
            continue;
        }
        if members.len() < k {
            log::warn!(
                "Class {} has only {} samples; some of the {} folds will not contain it",
                code,
                members.len(),
                k
            );
        }
        if config.shuffle {
            members.shuffle(&mut rng);
        }
        for &idx in members.iter() {
            folds[cursor].push(idx);
            cursor = (cursor + 1) % k;
        }
    }

    FoldAssignment::new(folds, n_samples)
}

/// Files written for one fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoldFiles {
    pub fold: usize,
    pub train: SldaFiles,
    pub test: SldaFiles,
}

/// Everything written by a cross-validation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CvOutput {
    pub folds: Vec<FoldFiles>,
    pub legend_file: Option<PathBuf>,
}

/// Prefix shared by the train and test files of fold `fold`.
pub fn fold_prefix(prefix: &str, fold: usize) -> String {
    format!("{}fold{}", prefix, fold)
}

/// Write train/test datasets for every fold, then the label legend.
///
/// Fold `i` lands under `<prefix>fold<i>_train_` and `<prefix>fold<i>_test_`.
/// The legend, when labels are present, is written next to the final fold as
/// `<prefix>fold<k-1>_label_info.txt`.
pub fn write_cv_datasets<T>(
    dataset: &Dataset,
    encoder: Option<&LabelEncoder<T>>,
    folds: &FoldAssignment,
    prefix: &str,
) -> Result<CvOutput>
where
    T: Ord + Clone + Display,
{
    if folds.n_samples() != dataset.n_samples() {
        return Err(PrepError::ShapeMismatch {
            what: "fold assignment",
            expected: dataset.n_samples(),
            found: folds.n_samples(),
        }
        .into());
    }

    let mut written = Vec::with_capacity(folds.n_folds());
    for fold in 0..folds.n_folds() {
        let split = folds.split(fold);
        let base = fold_prefix(prefix, fold);

        let train = create_slda_dataset(
            &dataset.filter_by_indices(&split.train),
            &format!("{}_train_", base),
        )
        .with_context(|| format!("Failed to write training data for fold {}", fold))?;
        let test = create_slda_dataset(
            &dataset.filter_by_indices(&split.test),
            &format!("{}_test_", base),
        )
        .with_context(|| format!("Failed to write test data for fold {}", fold))?;

        log::info!(
            "Fold {}/{}: {} train, {} test samples",
            fold + 1,
            folds.n_folds(),
            split.train.len(),
            split.test.len()
        );
        written.push(FoldFiles { fold, train, test });
    }

    let final_prefix = fold_prefix(prefix, folds.n_folds() - 1);
    let legend_file = match encoder {
        Some(encoder) => Some(write_label_legend(&final_prefix, encoder)?),
        None => None,
    };

    Ok(CvOutput {
        folds: written,
        legend_file,
    })
}
