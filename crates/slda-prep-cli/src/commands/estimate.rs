//! `est` and `inf`: run the external estimator on a loaded dataset.
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgMatches, ValueHint};

use slda_prep::config::PrepConfig;
use slda_prep::estimator::{training_legend_prefix, Slda, TrainedSlda};
use slda_prep::io::slda_format::{prefixed_path, LEGEND_SUFFIX};
use slda_prep::io::table::write_dense_matrix_tsv;
use slda_prep::io::{load_dataset, read_label_legend, write_label_legend, DatasetSource};
use slda_prep::label_encoder::LabelEncoder;
use slda_prep::math::Array2;

/// Files left behind by `est`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EstimationOutput {
    pub model_file: PathBuf,
    /// `<model_dir>/est_label_info.txt`, the codes the model was trained on.
    pub legend_file: PathBuf,
}

pub fn est_args() -> Vec<Arg> {
    vec![
        Arg::new("alpha")
            .long("alpha")
            .help("Dirichlet alpha passed to estimation")
            .value_parser(clap::value_parser!(f64)),
        Arg::new("num_topics")
            .short('t')
            .long("topics")
            .help("Number of topics")
            .value_parser(clap::value_parser!(usize)),
    ]
}

pub fn inf_args() -> Vec<Arg> {
    vec![
        Arg::new("model_file")
            .long("model")
            .help("Trained model file (final.model from `est`)")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("output_file")
            .short('o')
            .long("output")
            .help("Where to write per-sample topic proportions (TSV)")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
    ]
}

pub fn apply_est_overrides(config: &mut PrepConfig, matches: &ArgMatches) {
    if let Some(alpha) = matches.get_one::<f64>("alpha") {
        config.estimator.alpha = *alpha;
    }
    if let Some(k) = matches.get_one::<usize>("num_topics") {
        config.estimator.num_topics = *k;
    }
}

/// Fit the estimator on the labelled dataset.
///
/// The label legend is written beside the model so inference can reuse the
/// training codes.
pub fn run_estimation(source: &DatasetSource, config: &PrepConfig) -> Result<EstimationOutput> {
    let loaded = load_dataset(source)?;
    let Some(labels) = loaded.labels.as_deref() else {
        bail!("Estimation requires labels: pass --labels-file or --mapping-file with --metadata-category");
    };
    let encoder = LabelEncoder::fit(labels);
    let codes = encoder.transform(labels)?;

    let trained = Slda::new(config.estimator.clone()).fit(&loaded.x, &codes)?;
    let model_file = trained.model_file().to_path_buf();

    let legend_file =
        write_label_legend(&training_legend_prefix(&model_dir(&model_file)), &encoder)?;
    log::info!("Wrote training label legend to {}", legend_file.display());

    Ok(EstimationOutput {
        model_file,
        legend_file,
    })
}

fn model_dir(model_file: &Path) -> PathBuf {
    model_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// Run inference with an existing model and write gamma as TSV.
///
/// Unlabeled samples are passed as code 0. Labels, when given, are encoded
/// with the legend written by `est` beside the model; a label the model was
/// not trained on fails with `UnknownLabel`.
pub fn run_inference(
    source: &DatasetSource,
    config: &PrepConfig,
    model_file: &Path,
    output_file: &Path,
) -> Result<Array2<f64>> {
    // Check the model before touching any input.
    let trained = TrainedSlda::from_model_file(config.estimator.clone(), model_file.to_path_buf())?;

    let loaded = load_dataset(source)?;
    let codes = match loaded.labels.as_deref() {
        None => vec![0; loaded.x.nrows()],
        Some(labels) => {
            let legend_file =
                prefixed_path(&training_legend_prefix(&model_dir(model_file)), LEGEND_SUFFIX);
            let encoder = read_label_legend(&legend_file).with_context(|| {
                format!(
                    "Labels were given but the training legend for {} is unavailable; omit labels to infer without them",
                    model_file.display()
                )
            })?;
            encoder.transform(labels)?
        }
    };
    let gamma = trained.transform(&loaded.x, &codes)?;

    write_dense_matrix_tsv(output_file, &gamma, Some(&loaded.sample_ids), "topic_")?;
    log::info!("Wrote topic proportions to {}", output_file.display());
    Ok(gamma)
}
