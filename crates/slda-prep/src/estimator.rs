//! Wrapper around the external `slda` estimator binary.
//!
//! The estimator is stateful: estimation leaves a model file behind that
//! inference later reads. This is modelled as two types. `Slda` is the
//! untrained estimator and `TrainedSlda` holds a model file, so inference
//! cannot be requested before a model exists.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::PrepError;
use crate::io::slda_format::write_slda_dataset;
use crate::io::table::read_dense_matrix;
use crate::math::Array2;

/// File the estimator writes after estimation, relative to `work_dir`.
pub const MODEL_FILE_NAME: &str = "final.model";
/// File the estimator writes after inference, relative to `work_dir`.
pub const GAMMA_FILE_NAME: &str = "inf-gamma.dat";

/// Prefix of the label legend kept beside a model, giving
/// `<model_dir>/est_label_info.txt`.
pub fn training_legend_prefix(model_dir: &Path) -> String {
    model_dir
        .join(SldaMode::Estimate.as_str())
        .to_string_lossy()
        .into_owned()
}

/// Estimator location and hyper-parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SldaConfig {
    /// Executable name or path of the estimator.
    pub executable: PathBuf,
    /// Settings file passed through to the estimator.
    pub settings_file: PathBuf,
    /// Topic initialization passed to estimation.
    pub init: String,
    /// Directory for intermediate datasets and estimator output.
    pub work_dir: PathBuf,
    pub alpha: f64,
    pub num_topics: usize,
}

impl Default for SldaConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("slda"),
            settings_file: PathBuf::from("settings.txt"),
            init: "random".to_string(),
            work_dir: PathBuf::from("./"),
            alpha: 1.0,
            num_topics: 2,
        }
    }
}

/// Estimator sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SldaMode {
    Estimate,
    Infer,
}

impl SldaMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SldaMode::Estimate => "est",
            SldaMode::Infer => "inf",
        }
    }
}

/// Runs an external program to completion.
///
/// Returns the exit code, or `None` if the process was killed by a signal.
pub trait CommandRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>>;
}

/// Runs commands with `std::process::Command`, inheriting stdio.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<Option<i32>> {
        let status = Command::new(program)
            .args(args)
            .status()
            .with_context(|| format!("Failed to launch {}", program.display()))?;
        Ok(status.code())
    }
}

fn invoke(
    runner: &dyn CommandRunner,
    config: &SldaConfig,
    mode: SldaMode,
    args: Vec<OsString>,
) -> Result<()> {
    let mut full_args = vec![OsString::from(mode.as_str())];
    full_args.extend(args);
    log::debug!(
        "Running {} {}",
        config.executable.display(),
        full_args
            .iter()
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    );

    match runner.run(&config.executable, &full_args)? {
        Some(0) => Ok(()),
        status => Err(PrepError::EstimatorFailed {
            mode: mode.as_str().to_string(),
            status,
        }
        .into()),
    }
}

fn dataset_prefix(work_dir: &Path, mode: SldaMode) -> String {
    work_dir
        .join(format!("{}_", mode.as_str()))
        .to_string_lossy()
        .into_owned()
}

/// Untrained estimator.
pub struct Slda {
    config: SldaConfig,
    runner: Box<dyn CommandRunner>,
}

/// Estimator holding a fitted model file.
pub struct TrainedSlda {
    config: SldaConfig,
    runner: Box<dyn CommandRunner>,
    model_file: PathBuf,
}

impl Slda {
    pub fn new(config: SldaConfig) -> Self {
        Self::with_runner(config, Box::new(ProcessRunner))
    }

    pub fn with_runner(config: SldaConfig, runner: Box<dyn CommandRunner>) -> Self {
        Slda { config, runner }
    }

    pub fn config(&self) -> &SldaConfig {
        &self.config
    }

    /// Run estimation on `x` with integer `labels`.
    ///
    /// The dataset is written under `<work_dir>/est_`, the estimator is run
    /// and the resulting `<work_dir>/final.model` is captured.
    pub fn fit(self, x: &Array2<f64>, labels: &[usize]) -> Result<TrainedSlda> {
        let prefix = dataset_prefix(&self.config.work_dir, SldaMode::Estimate);
        let files = write_slda_dataset(x, labels, None, &prefix)?;

        invoke(
            self.runner.as_ref(),
            &self.config,
            SldaMode::Estimate,
            vec![
                files.data_file.into_os_string(),
                files.labels_file.into_os_string(),
                self.config.settings_file.clone().into_os_string(),
                OsString::from(self.config.alpha.to_string()),
                OsString::from(self.config.num_topics.to_string()),
                OsString::from(&self.config.init),
                self.config.work_dir.clone().into_os_string(),
            ],
        )?;

        let model_file = self.config.work_dir.join(MODEL_FILE_NAME);
        if !model_file.exists() {
            return Err(PrepError::MissingModel(model_file).into());
        }
        log::info!("Estimation finished; model at {}", model_file.display());

        Ok(TrainedSlda {
            config: self.config,
            runner: self.runner,
            model_file,
        })
    }

    /// Fit on `x`, then run inference on the same data.
    pub fn fit_transform(
        self,
        x: &Array2<f64>,
        labels: &[usize],
    ) -> Result<(TrainedSlda, Array2<f64>)> {
        let trained = self.fit(x, labels)?;
        let gamma = trained.transform(x, labels)?;
        Ok((trained, gamma))
    }
}

impl TrainedSlda {
    /// Resume from an existing model file.
    pub fn from_model_file(config: SldaConfig, model_file: PathBuf) -> Result<Self> {
        Self::from_model_file_with_runner(config, model_file, Box::new(ProcessRunner))
    }

    pub fn from_model_file_with_runner(
        config: SldaConfig,
        model_file: PathBuf,
        runner: Box<dyn CommandRunner>,
    ) -> Result<Self> {
        if !model_file.exists() {
            return Err(PrepError::MissingModel(model_file).into());
        }
        Ok(TrainedSlda {
            config,
            runner,
            model_file,
        })
    }

    pub fn model_file(&self) -> &Path {
        &self.model_file
    }

    pub fn config(&self) -> &SldaConfig {
        &self.config
    }

    /// Run inference and return the per-sample topic proportions (gamma).
    ///
    /// `labels` only fill the labels file the estimator expects; pass zeros
    /// when they are unknown.
    pub fn transform(&self, x: &Array2<f64>, labels: &[usize]) -> Result<Array2<f64>> {
        if !self.model_file.exists() {
            return Err(PrepError::MissingModel(self.model_file.clone()).into());
        }
        let prefix = dataset_prefix(&self.config.work_dir, SldaMode::Infer);
        let files = write_slda_dataset(x, labels, None, &prefix)?;

        invoke(
            self.runner.as_ref(),
            &self.config,
            SldaMode::Infer,
            vec![
                files.data_file.into_os_string(),
                files.labels_file.into_os_string(),
                self.config.settings_file.clone().into_os_string(),
                self.model_file.clone().into_os_string(),
                self.config.work_dir.clone().into_os_string(),
            ],
        )?;

        let gamma_file = self.config.work_dir.join(GAMMA_FILE_NAME);
        let gamma = read_dense_matrix(&gamma_file)?;
        if gamma.nrows() != x.nrows() {
            return Err(PrepError::ShapeMismatch {
                what: "inference output",
                expected: x.nrows(),
                found: gamma.nrows(),
            })
            .with_context(|| format!("Unexpected row count in {}", gamma_file.display()));
        }
        log::info!(
            "Inference finished; {} samples x {} topics",
            gamma.nrows(),
            gamma.ncols()
        );
        Ok(gamma)
    }
}
