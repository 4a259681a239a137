//! Tab-separated input tables: OTU tables, distance matrices, mapping files
//! and labels files, plus the dense matrices the estimator writes back.
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;

use crate::error::PrepError;
use crate::math::Array2;

/// Label assigned to samples that do not match a requested metadata value.
pub const OTHER_LABEL: &str = "other";

const TRAILING_ANNOTATION_COLUMNS: [&str; 2] = ["taxonomy", "Consensus Lineage"];

/// Where to find the matrix and, optionally, its labels.
#[derive(Debug, Clone, Default)]
pub struct DatasetSource {
    /// OTU table (features x samples) or, with `distance_matrix`, a square
    /// samples x samples matrix.
    pub data_matrix: PathBuf,
    pub mapping_file: Option<PathBuf>,
    pub metadata_category: Option<String>,
    /// When set, labels are binarized to this value vs `other`.
    pub metadata_value: Option<String>,
    /// Two columns: sample id, label. Takes precedence over the mapping file.
    pub labels_file: Option<PathBuf>,
    pub distance_matrix: bool,
}

/// Loaded matrix with one row per sample.
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub x: Array2<f64>,
    pub sample_ids: Vec<String>,
    pub labels: Option<Vec<String>>,
}

/// Load the matrix and labels described by `source`.
pub fn load_dataset(source: &DatasetSource) -> Result<LoadedDataset> {
    let (x, sample_ids) = if source.distance_matrix {
        read_distance_matrix(&source.data_matrix)?
    } else {
        read_otu_table(&source.data_matrix)?
    };

    let labels = match (&source.labels_file, &source.mapping_file, &source.metadata_category) {
        (Some(labels_file), mapping, _) => {
            if mapping.is_some() {
                log::warn!("Both a labels file and a mapping file were given; using the labels file");
            }
            Some(read_labels_file(labels_file, &sample_ids)?)
        }
        (None, Some(mapping), Some(category)) => Some(read_mapping_labels(
            mapping,
            category,
            source.metadata_value.as_deref(),
            &sample_ids,
        )?),
        (None, Some(_), None) => bail!("A mapping file requires a metadata category"),
        (None, None, Some(_)) => bail!("A metadata category requires a mapping file"),
        (None, None, None) => None,
    };

    log::info!(
        "Loaded {} samples x {} features from {}{}",
        x.nrows(),
        x.ncols(),
        source.data_matrix.display(),
        if labels.is_some() { " with labels" } else { "" }
    );

    Ok(LoadedDataset {
        x,
        sample_ids,
        labels,
    })
}

fn read_tsv_records(path: &Path) -> Result<Vec<StringRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_path(path)
        .with_context(|| format!("Failed to open table: {}", path.display()))?;

    let mut records = Vec::new();
    for (row_idx, result) in reader.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to read row {} of {}", row_idx + 1, path.display()))?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        records.push(record);
    }
    Ok(records)
}

fn first_field(record: &StringRecord) -> &str {
    record.get(0).unwrap_or("").trim()
}

fn is_comment(record: &StringRecord) -> bool {
    first_field(record).starts_with('#')
}

fn find_column(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|header| header.trim().eq_ignore_ascii_case(name))
}

fn parse_cell(value: &str, row: usize, column: &str, path: &Path) -> Result<f64> {
    value.trim().parse::<f64>().with_context(|| {
        format!(
            "Invalid value '{}' at row {}, column '{}' of {}",
            value,
            row,
            column,
            path.display()
        )
    })
}

/// Read a classic tab-separated OTU table and transpose it to samples x OTUs.
pub fn read_otu_table(path: &Path) -> Result<(Array2<f64>, Vec<String>)> {
    let records = read_tsv_records(path)?;

    let header_pos = records
        .iter()
        .position(|r| {
            let first = first_field(r);
            !first.starts_with('#') || first.to_ascii_lowercase().starts_with("#otu")
        })
        .ok_or_else(|| anyhow!("No header row found in OTU table {}", path.display()))?;
    let header = &records[header_pos];

    let mut n_columns = header.len();
    if let Some(last) = header.get(n_columns - 1) {
        if n_columns > 1
            && TRAILING_ANNOTATION_COLUMNS
                .iter()
                .any(|name| last.trim().eq_ignore_ascii_case(name))
        {
            n_columns -= 1;
        }
    }
    let sample_ids = (1..n_columns)
        .map(|i| header.get(i).unwrap_or("").trim().to_string())
        .collect::<Vec<_>>();

    let mut feature_rows = Vec::new();
    for (offset, record) in records.iter().enumerate().skip(header_pos + 1) {
        if is_comment(record) {
            continue;
        }
        let row = offset + 1;
        if record.len() != header.len() {
            return Err(PrepError::MalformedRow {
                row,
                expected: header.len(),
                found: record.len(),
            })
            .with_context(|| format!("Ragged row in OTU table {}", path.display()));
        }
        let values = (1..n_columns)
            .map(|i| parse_cell(record.get(i).unwrap_or(""), row, &sample_ids[i - 1], path))
            .collect::<Result<Vec<f64>>>()?;
        feature_rows.push(values);
    }

    if feature_rows.is_empty() {
        bail!("OTU table {} contains no feature rows", path.display());
    }

    let features_by_samples = Array2::from_rows(feature_rows)?;
    Ok((features_by_samples.transpose(), sample_ids))
}

/// Read a square samples x samples distance matrix.
pub fn read_distance_matrix(path: &Path) -> Result<(Array2<f64>, Vec<String>)> {
    let records = read_tsv_records(path)?;
    let header = records
        .first()
        .ok_or_else(|| anyhow!("Distance matrix {} is empty", path.display()))?;
    let sample_ids = header
        .iter()
        .skip(1)
        .map(|id| id.trim().to_string())
        .collect::<Vec<_>>();
    let n = sample_ids.len();

    let mut rows = Vec::with_capacity(n);
    for (offset, record) in records.iter().enumerate().skip(1) {
        let row = offset + 1;
        if record.len() != n + 1 {
            return Err(PrepError::MalformedRow {
                row,
                expected: n + 1,
                found: record.len(),
            })
            .with_context(|| format!("Ragged row in distance matrix {}", path.display()));
        }
        let row_id = first_field(record);
        let expected_id = sample_ids.get(rows.len()).map(String::as_str).unwrap_or("");
        if row_id != expected_id {
            bail!(
                "Distance matrix {} row {} is '{}' but column {} is '{}'",
                path.display(),
                row,
                row_id,
                rows.len() + 1,
                expected_id
            );
        }
        let values = (1..=n)
            .map(|i| parse_cell(record.get(i).unwrap_or(""), row, &sample_ids[i - 1], path))
            .collect::<Result<Vec<f64>>>()?;
        rows.push(values);
    }

    if rows.len() != n {
        return Err(PrepError::ShapeMismatch {
            what: "distance matrix rows",
            expected: n,
            found: rows.len(),
        })
        .with_context(|| format!("Distance matrix {} is not square", path.display()));
    }

    Ok((Array2::from_rows(rows)?, sample_ids))
}

fn labels_in_sample_order(
    by_sample: &HashMap<String, String>,
    sample_ids: &[String],
    source: &Path,
) -> Result<Vec<String>> {
    sample_ids
        .iter()
        .map(|id| {
            by_sample.get(id).cloned().ok_or_else(|| {
                anyhow!("Sample '{}' has no label in {}", id, source.display())
            })
        })
        .collect()
}

/// Read a two-column `sample_id<TAB>label` file and align it to `sample_ids`.
pub fn read_labels_file(path: &Path, sample_ids: &[String]) -> Result<Vec<String>> {
    let mut by_sample = HashMap::new();
    for (row_idx, record) in read_tsv_records(path)?.iter().enumerate() {
        if is_comment(record) {
            continue;
        }
        if record.len() < 2 {
            return Err(PrepError::MalformedRow {
                row: row_idx + 1,
                expected: 2,
                found: record.len(),
            })
            .with_context(|| format!("Invalid labels file {}", path.display()));
        }
        by_sample.insert(
            first_field(record).to_string(),
            record.get(1).unwrap_or("").trim().to_string(),
        );
    }
    labels_in_sample_order(&by_sample, sample_ids, path)
}

/// Read one metadata category from a `#SampleID` mapping file.
///
/// With `value`, labels become `value` where the category matches and
/// `other` elsewhere.
pub fn read_mapping_labels(
    path: &Path,
    category: &str,
    value: Option<&str>,
    sample_ids: &[String],
) -> Result<Vec<String>> {
    let records = read_tsv_records(path)?;
    let header_pos = records
        .iter()
        .position(|r| first_field(r).eq_ignore_ascii_case("#SampleID"))
        .ok_or_else(|| anyhow!("Mapping file {} has no #SampleID header", path.display()))?;
    let category_idx = find_column(&records[header_pos], category).ok_or_else(|| {
        anyhow!(
            "Missing metadata category '{}' in {}",
            category,
            path.display()
        )
    })?;

    let mut by_sample = HashMap::new();
    for (offset, record) in records.iter().enumerate().skip(header_pos + 1) {
        if is_comment(record) {
            continue;
        }
        let raw = record
            .get(category_idx)
            .ok_or_else(|| {
                anyhow!(
                    "Missing '{}' value at row {} of {}",
                    category,
                    offset + 1,
                    path.display()
                )
            })?
            .trim();
        let label = match value {
            Some(wanted) if raw == wanted => wanted.to_string(),
            Some(_) => OTHER_LABEL.to_string(),
            None => raw.to_string(),
        };
        by_sample.insert(first_field(record).to_string(), label);
    }
    labels_in_sample_order(&by_sample, sample_ids, path)
}

/// Read a whitespace-separated dense matrix, one row per line.
pub fn read_dense_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<f64>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read matrix: {}", path.display()))?;
    let mut rows = Vec::new();
    for (line_idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row = line
            .split_whitespace()
            .map(|token| {
                token.parse::<f64>().with_context(|| {
                    format!(
                        "Invalid value '{}' on line {} of {}",
                        token,
                        line_idx + 1,
                        path.display()
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Array2::from_rows(rows).with_context(|| format!("Ragged matrix in {}", path.display()))
}

/// Write a dense matrix as TSV, one sample per row, with a header row.
pub fn write_dense_matrix_tsv<P: AsRef<Path>>(
    path: P,
    x: &Array2<f64>,
    sample_ids: Option<&[String]>,
    column_prefix: &str,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let mut header = vec!["sample_id".to_string()];
    header.extend((0..x.ncols()).map(|i| format!("{}{}", column_prefix, i)));
    writer.write_record(&header)?;

    for (i, row) in x.rows().enumerate() {
        let id = sample_ids
            .and_then(|ids| ids.get(i).cloned())
            .unwrap_or_else(|| i.to_string());
        let mut record = vec![id];
        record.extend(row.iter().map(|v| v.to_string()));
        writer.write_record(&record)?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;
    Ok(())
}
