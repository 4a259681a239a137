//! Integration tests for the sparse dataset writer.

use std::fs;

use slda_prep::data_handling::Dataset;
use slda_prep::error::PrepError;
use slda_prep::io::slda_format::{create_slda_dataset, write_label_legend, write_slda_dataset};
use slda_prep::label_encoder::encode_labels;
use slda_prep::math::Array2;

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

fn prefix_in(dir: &tempfile::TempDir, name: &str) -> String {
    dir.path().join(name).to_string_lossy().into_owned()
}

#[test]
fn data_file_has_one_sparse_line_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let x = Array2::from_shape_vec(
        (3, 6),
        vec![
            3.0, 0.0, 5.0, 0.0, 0.0, 7.0, //
            0.0, 0.0, 0.0, 0.0, 0.0, 0.0, //
            1.0, 2.0, 0.0, 0.0, 0.0, 9.0,
        ],
    )
    .unwrap();

    let files = write_slda_dataset(&x, &[1, 0, 1], None, &prefix_in(&dir, "out_")).unwrap();

    assert!(files.data_file.ends_with("out_data.txt"));
    assert!(files.sample_ids_file.is_none());
    assert_eq!(
        read_lines(&files.data_file),
        vec!["3 0:3 2:5 5:7", "0", "3 0:1 1:2 5:9"]
    );
    assert_eq!(read_lines(&files.labels_file), vec!["1", "0", "1"]);
}

#[test]
fn leading_count_matches_positive_entries() {
    let dir = tempfile::tempdir().unwrap();
    let rows: Vec<Vec<f64>> = (0..8)
        .map(|r| (0..5).map(|c| ((r * 3 + c * 7) % 4) as f64).collect())
        .collect();
    let x = Array2::from_rows(rows.clone()).unwrap();

    let files = write_slda_dataset(&x, &[0; 8], None, &prefix_in(&dir, "grid_")).unwrap();
    let lines = read_lines(&files.data_file);

    assert_eq!(lines.len(), rows.len());
    for (line, row) in lines.iter().zip(&rows) {
        let leading: usize = line.split(' ').next().unwrap().parse().unwrap();
        assert_eq!(leading, row.iter().filter(|&&v| v > 0.0).count());
        assert_eq!(line.split(' ').count(), leading + 1);
    }
}

#[test]
fn absent_labels_write_zero_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let x = Array2::from_shape_vec((4, 2), vec![1.0; 8]).unwrap();
    let encoded = encode_labels::<String>(None, x.nrows()).unwrap();

    let files = write_slda_dataset(&x, &encoded.codes, None, &prefix_in(&dir, "nolab_")).unwrap();
    assert_eq!(read_lines(&files.labels_file), vec!["0"; 4]);
}

#[test]
fn sample_ids_are_written_when_present() {
    let dir = tempfile::tempdir().unwrap();
    let x = Array2::from_shape_vec((2, 2), vec![1.0, 0.0, 0.0, 1.0]).unwrap();
    let dataset = Dataset::new(x, vec![0, 1], Some(vec!["PC.354".into(), "PC.607".into()])).unwrap();

    let files = create_slda_dataset(&dataset, &prefix_in(&dir, "ids_")).unwrap();
    let ids_file = files.sample_ids_file.unwrap();
    assert!(ids_file.ends_with("ids_sample_ids.txt"));
    assert_eq!(read_lines(&ids_file), vec!["PC.354", "PC.607"]);
}

#[test]
fn shape_mismatch_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();

    let err = write_slda_dataset(&x, &[0, 1], None, &prefix_in(&dir, "bad_")).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::ShapeMismatch {
            expected: 3,
            found: 2,
            ..
        })
    ));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn legend_lists_codes_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let labels: Vec<String> = ["Fast", "Control", "Fast"].iter().map(|s| s.to_string()).collect();
    let encoded = encode_labels(Some(&labels[..]), 3).unwrap();

    let path = write_label_legend(&prefix_in(&dir, "out"), encoded.encoder.as_ref().unwrap()).unwrap();
    assert!(path.ends_with("out_label_info.txt"));
    assert_eq!(read_lines(&path), vec!["0: Control", "1: Fast"]);
}

#[test]
fn unwritable_prefix_is_an_io_error() {
    let x = Array2::from_shape_vec((1, 1), vec![1.0]).unwrap();
    let err = write_slda_dataset(&x, &[0], None, "/nonexistent/dir/out_").unwrap_err();
    assert!(err.to_string().contains("/nonexistent/dir/out_data.txt"));
}
