//! Writer for the SLDA sparse bag-of-counts dataset layout.
//!
//! A dataset is three sibling text files sharing one prefix:
//!
//! * `<prefix>data.txt` - one sample per line, `<M> <idx>:<count> ...`
//! * `<prefix>labels.txt` - one integer code per line
//! * `<prefix>sample_ids.txt` - optional, one identifier per line
//!
//! The prefix is concatenated textually, so `./out_` gives `./out_data.txt`.
use std::fmt::{Display, Write as _};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data_handling::{check_row_count, Dataset};
use crate::error::PrepError;
use crate::label_encoder::LabelEncoder;
use crate::math::Array2;

pub const DATA_SUFFIX: &str = "data.txt";
pub const LABELS_SUFFIX: &str = "labels.txt";
pub const SAMPLE_IDS_SUFFIX: &str = "sample_ids.txt";
pub const LEGEND_SUFFIX: &str = "_label_info.txt";

/// Paths of one written dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SldaFiles {
    pub data_file: PathBuf,
    pub labels_file: PathBuf,
    pub sample_ids_file: Option<PathBuf>,
}

/// Append `suffix` to `prefix` without inserting a path separator.
pub fn prefixed_path(prefix: &str, suffix: &str) -> PathBuf {
    PathBuf::from(format!("{}{}", prefix, suffix))
}

/// Render one matrix row as a sparse line.
///
/// Cells are rounded to the nearest integer count; only strictly positive
/// counts are emitted, in ascending column order, behind the leading count.
///
/// ```
/// use slda_prep::io::slda_format::format_sparse_row;
/// assert_eq!(format_sparse_row(&[3.0, 0.0, 5.0, 0.0, 0.0, 7.0]).unwrap(), "3 0:3 2:5 5:7");
/// ```
pub fn format_sparse_row(row: &[f64]) -> Result<String> {
    format_row(0, row).map(|rendered| rendered.line)
}

/// One rendered row plus the number of positive cells that rounded to zero.
struct RenderedRow {
    line: String,
    rounded_away: usize,
}

fn format_row(row_idx: usize, row: &[f64]) -> Result<RenderedRow> {
    let mut entries = Vec::new();
    let mut rounded_away = 0;
    for (col, &value) in row.iter().enumerate() {
        if !value.is_finite() {
            return Err(PrepError::InvalidValue {
                row: row_idx,
                col,
                value,
            }
            .into());
        }
        let count = value.round() as i64;
        if count > 0 {
            entries.push((col, count));
        } else if value > 0.0 {
            rounded_away += 1;
        }
    }

    let mut line = entries.len().to_string();
    for (col, count) in entries {
        // Writing into a String cannot fail.
        let _ = write!(line, " {}:{}", col, count);
    }
    Ok(RenderedRow { line, rounded_away })
}

/// Write `x` and `labels` (and optionally `sample_ids`) under `prefix`.
///
/// All shapes are checked before any file is created, so a mismatch leaves
/// the filesystem untouched. I/O failures abort the conversion; sibling files
/// already written are not removed.
///
/// # Arguments
///
/// * `x` - Samples x features count matrix.
/// * `labels` - Integer code per row.
/// * `sample_ids` - Optional identifier per row.
/// * `prefix` - Output prefix shared by all files.
pub fn write_slda_dataset(
    x: &Array2<f64>,
    labels: &[usize],
    sample_ids: Option<&[String]>,
    prefix: &str,
) -> Result<SldaFiles> {
    check_row_count("labels", x.nrows(), labels.len())?;
    if let Some(ids) = sample_ids {
        check_row_count("sample ids", x.nrows(), ids.len())?;
    }

    // Render first so a bad cell also aborts before anything hits disk.
    let rendered = x
        .rows()
        .enumerate()
        .map(|(i, row)| format_row(i, row))
        .collect::<Result<Vec<RenderedRow>>>()?;
    let rounded_away: usize = rendered.iter().map(|r| r.rounded_away).sum();
    if rounded_away > 0 {
        log::warn!(
            "{} positive cells below 0.5 round to a zero count and are omitted from {}",
            rounded_away,
            prefixed_path(prefix, DATA_SUFFIX).display()
        );
    }
    let lines = rendered.into_iter().map(|r| r.line).collect::<Vec<_>>();

    let data_file = prefixed_path(prefix, DATA_SUFFIX);
    write_lines(&data_file, &lines)?;

    let labels_file = prefixed_path(prefix, LABELS_SUFFIX);
    write_lines(&labels_file, labels)?;

    let sample_ids_file = match sample_ids {
        Some(ids) => {
            let path = prefixed_path(prefix, SAMPLE_IDS_SUFFIX);
            write_lines(&path, ids)?;
            Some(path)
        }
        None => None,
    };

    log::debug!(
        "Wrote {} x {} dataset to {}",
        x.nrows(),
        x.ncols(),
        data_file.display()
    );

    Ok(SldaFiles {
        data_file,
        labels_file,
        sample_ids_file,
    })
}

/// Write a `Dataset` under `prefix`, including its sample ids when present.
pub fn create_slda_dataset(dataset: &Dataset, prefix: &str) -> Result<SldaFiles> {
    write_slda_dataset(
        &dataset.x,
        &dataset.labels,
        dataset.sample_ids.as_deref(),
        prefix,
    )
}

/// Write the `<code>: <label>` legend to `<prefix>_label_info.txt`.
pub fn write_label_legend<T>(prefix: &str, encoder: &LabelEncoder<T>) -> Result<PathBuf>
where
    T: Ord + Clone + Display,
{
    let path = prefixed_path(prefix, LEGEND_SUFFIX);
    let lines = encoder
        .legend()
        .map(|(code, label)| format!("{}: {}", code, label))
        .collect::<Vec<_>>();
    write_lines(&path, &lines)?;
    log::debug!("Wrote label legend to {}", path.display());
    Ok(path)
}

/// Read a legend written by `write_label_legend` back into an encoder.
///
/// Codes must run `0, 1, 2, ...` in file order.
pub fn read_label_legend<P: AsRef<Path>>(path: P) -> Result<LabelEncoder<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read label legend: {}", path.display()))?;

    let mut classes = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (code, label) = line
            .split_once(": ")
            .ok_or(PrepError::MalformedRow {
                row: line_idx + 1,
                expected: 2,
                found: 1,
            })
            .with_context(|| format!("Expected '<code>: <label>' in {}", path.display()))?;
        let code = code.trim().parse::<usize>().with_context(|| {
            format!("Invalid code '{}' on line {} of {}", code, line_idx + 1, path.display())
        })?;
        if code != classes.len() {
            return Err(PrepError::InvalidLegend(format!(
                "expected code {} on line {}, found {}",
                classes.len(),
                line_idx + 1,
                code
            )))
            .with_context(|| format!("Unusable label legend {}", path.display()));
        }
        classes.push(label.to_string());
    }

    LabelEncoder::from_classes(classes)
        .with_context(|| format!("Unusable label legend {}", path.display()))
}

fn write_lines<T: Display>(path: &Path, lines: &[T]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for line in lines {
        writeln!(writer, "{}", line)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}
