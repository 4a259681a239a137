//! `convert`: write an SLDA dataset, or one per cross-validation fold.
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ValueHint};

use slda_prep::config::PrepConfig;
use slda_prep::cross_validation::{stratified_folds, write_cv_datasets, CvOutput};
use slda_prep::data_handling::Dataset;
use slda_prep::io::slda_format::{create_slda_dataset, write_label_legend, SldaFiles};
use slda_prep::io::{load_dataset, read_fold_file, DatasetSource};
use slda_prep::label_encoder::encode_labels;

/// What a `convert` run wrote.
#[derive(Debug)]
pub enum ConvertOutput {
    Single {
        files: SldaFiles,
        legend_file: Option<PathBuf>,
    },
    CrossValidated(CvOutput),
}

pub fn convert_args() -> Vec<Arg> {
    vec![
        Arg::new("output_prefix")
            .short('o')
            .long("output-prefix")
            .help("Prefix for output files (default: ./out_)")
            .value_parser(clap::builder::NonEmptyStringValueParser::new())
            .value_hint(ValueHint::AnyPath),
        Arg::new("folds")
            .short('k')
            .long("folds")
            .help("Write stratified k-fold cross-validation datasets with this many folds")
            .value_parser(clap::value_parser!(usize)),
        Arg::new("fold_file")
            .long("fold-file")
            .help("Pre-computed folds: one line of 0-based test indices per fold")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("shuffle")
            .long("shuffle")
            .help("Shuffle samples within each class before assigning folds")
            .action(ArgAction::SetTrue),
        Arg::new("seed")
            .long("seed")
            .help("Seed for --shuffle")
            .value_parser(clap::value_parser!(u64)),
    ]
}

/// Load, encode and write the dataset described by `source`.
///
/// A fold file takes precedence over computed folds; without either, a
/// single dataset is written under `config.output_prefix`.
pub fn run_convert(
    source: &DatasetSource,
    config: &PrepConfig,
    fold_file: Option<&Path>,
) -> Result<ConvertOutput> {
    let loaded = load_dataset(source)?;
    let n_samples = loaded.x.nrows();
    let encoded = encode_labels(loaded.labels.as_deref(), n_samples)?;
    let dataset = Dataset::new(loaded.x, encoded.codes.clone(), Some(loaded.sample_ids))?;
    dataset.log_summary();

    let prefix = config.output_prefix.as_str();
    let folds = match (fold_file, &config.cross_validation) {
        (Some(path), _) => Some(read_fold_file(path, n_samples)?),
        (None, Some(cv)) => Some(
            stratified_folds(&encoded.codes, cv.n_folds, cv)
                .context("Failed to assign cross-validation folds")?,
        ),
        (None, None) => None,
    };

    match folds {
        Some(folds) => {
            let output = write_cv_datasets(&dataset, encoded.encoder.as_ref(), &folds, prefix)?;
            log::info!(
                "Wrote {} cross-validation folds under {}",
                output.folds.len(),
                prefix
            );
            Ok(ConvertOutput::CrossValidated(output))
        }
        None => {
            let files = create_slda_dataset(&dataset, prefix)?;
            let legend_file = match &encoded.encoder {
                Some(encoder) => Some(write_label_legend(prefix, encoder)?),
                None => None,
            };
            log::info!("Wrote dataset to {}", files.data_file.display());
            Ok(ConvertOutput::Single { files, legend_file })
        }
    }
}
