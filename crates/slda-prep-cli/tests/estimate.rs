//! `est` followed by `inf` through the library API, with a scripted estimator.
#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use slda_prep::config::PrepConfig;
use slda_prep::error::PrepError;
use slda_prep::io::DatasetSource;
use slda_prep_cli::commands::estimate::{run_estimation, run_inference};

const OTU_TABLE: &str = "#OTU ID\tS1\tS2\tS3\tS4
OTU_1\t2\t0\t1\t0
OTU_2\t0\t3\t0\t5
";

// Keeps a copy of the labels file for each mode, then leaves the model or
// one gamma row per sample in the work dir (the last argument).
const FAKE_SLDA: &str = "#!/bin/sh
mode=$1
for last in \"$@\"; do :; done
cp \"$3\" \"$last/${mode}_seen_labels.txt\"
if [ \"$mode\" = est ]; then echo model > \"$last/final.model\"; fi
if [ \"$mode\" = inf ]; then while read -r line; do echo 0.5 0.5; done < \"$2\" > \"$last/inf-gamma.dat\"; fi
";

struct Fixture {
    _dir: tempfile::TempDir,
    root: PathBuf,
    config: PrepConfig,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().to_path_buf();
    fs::write(root.join("otu.txt"), OTU_TABLE).unwrap();

    let script = root.join("slda");
    fs::write(&script, FAKE_SLDA).unwrap();
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let work_dir = root.join("work");
    fs::create_dir(&work_dir).unwrap();

    let mut config = PrepConfig::default();
    config.estimator.executable = script;
    config.estimator.work_dir = work_dir;
    Fixture {
        _dir: dir,
        root,
        config,
    }
}

fn source_with_labels(root: &Path, name: &str, labels: &[&str]) -> DatasetSource {
    let path = root.join(name);
    let content: String = labels
        .iter()
        .enumerate()
        .map(|(i, label)| format!("S{}\t{}\n", i + 1, label))
        .collect();
    fs::write(&path, content).unwrap();
    DatasetSource {
        data_matrix: root.join("otu.txt"),
        labels_file: Some(path),
        ..DatasetSource::default()
    }
}

fn seen_labels(fixture: &Fixture, mode: &str) -> String {
    fs::read_to_string(
        fixture
            .config
            .estimator
            .work_dir
            .join(format!("{}_seen_labels.txt", mode)),
    )
    .unwrap()
}

#[test]
fn estimation_writes_legend_beside_model() {
    let fx = fixture();
    let source = source_with_labels(&fx.root, "train.txt", &["A", "B", "A", "B"]);

    let output = run_estimation(&source, &fx.config).unwrap();

    assert_eq!(output.model_file, fx.config.estimator.work_dir.join("final.model"));
    assert_eq!(
        output.legend_file,
        fx.config.estimator.work_dir.join("est_label_info.txt")
    );
    assert_eq!(fs::read_to_string(&output.legend_file).unwrap(), "0: A\n1: B\n");
}

#[test]
fn inference_reuses_training_codes() {
    let fx = fixture();
    let train = source_with_labels(&fx.root, "train.txt", &["A", "B", "A", "B"]);
    let output = run_estimation(&train, &fx.config).unwrap();
    assert_eq!(seen_labels(&fx, "est"), "0\n1\n0\n1\n");

    // Only B is present here; a fresh encoding would have made it code 0.
    let infer = source_with_labels(&fx.root, "infer.txt", &["B", "B", "B", "B"]);
    let gamma_out = fx.root.join("gamma.tsv");
    let gamma = run_inference(&infer, &fx.config, &output.model_file, &gamma_out).unwrap();

    assert_eq!(seen_labels(&fx, "inf"), "1\n1\n1\n1\n");
    assert_eq!(gamma.shape(), (4, 2));
}

#[test]
fn inference_rejects_labels_unseen_in_training() {
    let fx = fixture();
    let train = source_with_labels(&fx.root, "train.txt", &["A", "B", "A", "B"]);
    let output = run_estimation(&train, &fx.config).unwrap();

    let infer = source_with_labels(&fx.root, "infer.txt", &["A", "C", "A", "B"]);
    let err = run_inference(&infer, &fx.config, &output.model_file, &fx.root.join("gamma.tsv"))
        .unwrap_err();
    assert_eq!(
        err.downcast_ref::<PrepError>(),
        Some(&PrepError::UnknownLabel("C".to_string()))
    );
}

#[test]
fn labelled_inference_without_training_legend_fails() {
    let fx = fixture();
    let model_file = fx.config.estimator.work_dir.join("final.model");
    fs::write(&model_file, "model\n").unwrap();

    let infer = source_with_labels(&fx.root, "infer.txt", &["A", "B", "A", "B"]);
    let err = run_inference(&infer, &fx.config, &model_file, &fx.root.join("gamma.tsv"))
        .unwrap_err();
    assert!(format!("{:#}", err).contains("training legend"), "{:#}", err);

    // Unlabelled inference still runs with placeholder codes.
    let unlabelled = DatasetSource {
        data_matrix: fx.root.join("otu.txt"),
        ..DatasetSource::default()
    };
    run_inference(&unlabelled, &fx.config, &model_file, &fx.root.join("gamma.tsv")).unwrap();
    assert_eq!(seen_labels(&fx, "inf"), "0\n0\n0\n0\n");
}
