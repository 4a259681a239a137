//! Reader for pre-computed fold assignments.
//!
//! One fold per line, holding the whitespace-separated 0-based sample indices
//! of that fold's test set. Blank lines and `#` comments are skipped.
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::cross_validation::FoldAssignment;

/// Parse fold lines without validating them against a sample count.
pub fn parse_folds(content: &str) -> Result<Vec<Vec<usize>>> {
    let mut folds = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fold = trimmed
            .split_whitespace()
            .map(|token| {
                token.parse::<usize>().with_context(|| {
                    format!("Invalid sample index '{}' on line {}", token, line_idx + 1)
                })
            })
            .collect::<Result<Vec<usize>>>()?;
        folds.push(fold);
    }
    Ok(folds)
}

/// Read a fold file and validate it as a partition of `0..n_samples`.
pub fn read_fold_file<P: AsRef<Path>>(path: P, n_samples: usize) -> Result<FoldAssignment> {
    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read fold file: {}", path.as_ref().display()))?;
    let folds = parse_folds(&content)?;
    log::debug!(
        "Loaded {} folds from {}",
        folds.len(),
        path.as_ref().display()
    );
    FoldAssignment::new(folds, n_samples)
        .with_context(|| format!("Fold file {} is not usable", path.as_ref().display()))
}
