//! Estimator wrapper tests using a scripted stand-in for the `slda` binary.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use slda_prep::error::PrepError;
use slda_prep::estimator::{CommandRunner, Slda, SldaConfig, TrainedSlda};
use slda_prep::math::Array2;

type CallLog = Rc<RefCell<Vec<Vec<String>>>>;

/// Mimics the estimator: `est` leaves a model, `inf` leaves one gamma row per
/// line of the data file.
struct FakeSlda {
    calls: CallLog,
    exit_code: Option<i32>,
    write_model: bool,
}

impl CommandRunner for FakeSlda {
    fn run(&self, _program: &Path, args: &[OsString]) -> anyhow::Result<Option<i32>> {
        let args: Vec<String> = args.iter().map(|a| a.to_string_lossy().into_owned()).collect();
        self.calls.borrow_mut().push(args.clone());
        if self.exit_code != Some(0) {
            return Ok(self.exit_code);
        }
        let work_dir = PathBuf::from(args.last().unwrap());
        match args[0].as_str() {
            "est" if self.write_model => fs::write(work_dir.join("final.model"), "model")?,
            "inf" => {
                let n_rows = fs::read_to_string(&args[1])?.lines().count();
                let gamma = (0..n_rows)
                    .map(|i| format!("{} {}", i as f64 + 0.5, 1.5))
                    .collect::<Vec<_>>()
                    .join("\n");
                fs::write(work_dir.join("inf-gamma.dat"), gamma)?;
            }
            _ => {}
        }
        Ok(Some(0))
    }
}

fn fake(exit_code: Option<i32>, write_model: bool) -> (Box<FakeSlda>, CallLog) {
    let calls: CallLog = Rc::new(RefCell::new(Vec::new()));
    let runner = Box::new(FakeSlda {
        calls: Rc::clone(&calls),
        exit_code,
        write_model,
    });
    (runner, calls)
}

fn config_in(dir: &Path) -> SldaConfig {
    SldaConfig {
        settings_file: PathBuf::from("/opt/slda/settings.txt"),
        work_dir: dir.to_path_buf(),
        alpha: 0.1,
        num_topics: 4,
        ..SldaConfig::default()
    }
}

fn toy_matrix() -> Array2<f64> {
    Array2::from_shape_vec((3, 3), vec![1.0, 0.0, 2.0, 0.0, 3.0, 0.0, 4.0, 4.0, 0.0]).unwrap()
}

#[test]
fn fit_passes_estimation_arguments_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, calls) = fake(Some(0), true);

    let trained = Slda::with_runner(config_in(dir.path()), runner)
        .fit(&toy_matrix(), &[0, 1, 1])
        .unwrap();

    assert_eq!(trained.model_file(), dir.path().join("final.model"));
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    let args = &calls[0];
    assert_eq!(args[0], "est");
    assert!(args[1].ends_with("est_data.txt"));
    assert!(args[2].ends_with("est_labels.txt"));
    assert_eq!(args[3], "/opt/slda/settings.txt");
    assert_eq!(args[4], "0.1");
    assert_eq!(args[5], "4");
    assert_eq!(args[6], "random");
    assert_eq!(PathBuf::from(&args[7]), dir.path());
    assert_eq!(
        fs::read_to_string(dir.path().join("est_data.txt")).unwrap(),
        "2 0:1 2:2\n1 1:3\n2 0:4 1:4\n"
    );
}

#[test]
fn fit_transform_runs_estimation_then_inference() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, calls) = fake(Some(0), true);

    let (trained, gamma) = Slda::with_runner(config_in(dir.path()), runner)
        .fit_transform(&toy_matrix(), &[0, 1, 1])
        .unwrap();

    assert_eq!(gamma.shape(), (3, 2));
    assert_eq!(gamma.row_slice(2), &[2.5, 1.5]);
    let calls = calls.borrow();
    let modes: Vec<&str> = calls.iter().map(|c| c[0].as_str()).collect();
    assert_eq!(modes, vec!["est", "inf"]);
    assert_eq!(PathBuf::from(&calls[1][4]), trained.model_file());
}

#[test]
fn transform_without_model_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, calls) = fake(Some(0), true);
    let missing = dir.path().join("final.model");

    let err = TrainedSlda::from_model_file_with_runner(config_in(dir.path()), missing.clone(), runner)
        .err()
        .unwrap();

    assert_eq!(err.downcast_ref::<PrepError>(), Some(&PrepError::MissingModel(missing)));
    assert!(calls.borrow().is_empty());
}

#[test]
fn existing_model_file_enables_inference() {
    let dir = tempfile::tempdir().unwrap();
    let model = dir.path().join("pretrained.model");
    fs::write(&model, "model").unwrap();
    let (runner, calls) = fake(Some(0), false);

    let trained = TrainedSlda::from_model_file_with_runner(config_in(dir.path()), model.clone(), runner).unwrap();
    let gamma = trained.transform(&toy_matrix(), &[0, 0, 0]).unwrap();

    assert_eq!(gamma.nrows(), 3);
    assert_eq!(PathBuf::from(&calls.borrow()[0][4]), model);
}

#[test]
fn non_zero_exit_is_an_estimator_failure() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _calls) = fake(Some(2), true);

    let err = Slda::with_runner(config_in(dir.path()), runner)
        .fit(&toy_matrix(), &[0, 1, 1])
        .err()
        .unwrap();

    assert_eq!(
        err.downcast_ref::<PrepError>(),
        Some(&PrepError::EstimatorFailed {
            mode: "est".to_string(),
            status: Some(2)
        })
    );
}

#[test]
fn successful_run_without_model_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, _calls) = fake(Some(0), false);

    let err = Slda::with_runner(config_in(dir.path()), runner)
        .fit(&toy_matrix(), &[0, 1, 1])
        .err()
        .unwrap();

    assert!(matches!(
        err.downcast_ref::<PrepError>(),
        Some(PrepError::MissingModel(_))
    ));
}

#[test]
fn label_mismatch_fails_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let (runner, calls) = fake(Some(0), true);

    let result = Slda::with_runner(config_in(dir.path()), runner).fit(&toy_matrix(), &[0, 1]);

    assert!(result.is_err());
    assert!(calls.borrow().is_empty());
    assert!(!dir.path().join("est_data.txt").exists());
}
