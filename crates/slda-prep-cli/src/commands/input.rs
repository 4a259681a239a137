//! Shared arguments and config/CLI merging for every subcommand.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, ValueHint};

use slda_prep::config::{load_config, PrepConfig};
use slda_prep::cross_validation::CrossValidationConfig;
use slda_prep::io::DatasetSource;

/// Arguments describing where the matrix and labels come from.
pub fn input_args() -> Vec<Arg> {
    vec![
        Arg::new("data_matrix")
            .short('i')
            .long("data-matrix")
            .help("Input data matrix (tab-separated OTU table, or distance matrix with --dm)")
            .required(true)
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("mapping_file")
            .short('m')
            .long("mapping-file")
            .help("Mapping table (#SampleID header); requires --metadata-category")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("labels_file")
            .short('l')
            .long("labels-file")
            .help("Labels file: sample id and label per line. Takes precedence over the mapping file")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("metadata_category")
            .short('c')
            .long("metadata-category")
            .help("Metadata category (mapping file column) to use as labels")
            .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        Arg::new("metadata_value")
            .short('v')
            .long("metadata-value")
            .help("Metadata value; labels become this value vs 'other'")
            .value_parser(clap::builder::NonEmptyStringValueParser::new()),
        Arg::new("distance_matrix")
            .long("dm")
            .help("Input matrix is a distance matrix")
            .action(ArgAction::SetTrue),
        Arg::new("config")
            .long("config")
            .help("Path to a JSON configuration file")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
    ]
}

/// Arguments for the external estimator, shared by `est` and `inf`.
pub fn estimator_args() -> Vec<Arg> {
    vec![
        Arg::new("executable")
            .long("slda")
            .help("Path to the slda executable. Overrides the configuration file")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::ExecutablePath),
        Arg::new("settings_file")
            .short('s')
            .long("settings")
            .help("slda settings file. Overrides the configuration file")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::FilePath),
        Arg::new("work_dir")
            .short('w')
            .long("work-dir")
            .help("Directory for intermediate datasets and estimator output")
            .value_parser(clap::value_parser!(PathBuf))
            .value_hint(ValueHint::DirPath),
    ]
}

/// Build the dataset source from parsed input arguments.
pub fn dataset_source(matches: &ArgMatches) -> DatasetSource {
    DatasetSource {
        data_matrix: matches
            .get_one::<PathBuf>("data_matrix")
            .cloned()
            .unwrap_or_default(),
        mapping_file: matches.get_one::<PathBuf>("mapping_file").cloned(),
        labels_file: matches.get_one::<PathBuf>("labels_file").cloned(),
        metadata_category: matches.get_one::<String>("metadata_category").cloned(),
        metadata_value: matches.get_one::<String>("metadata_value").cloned(),
        distance_matrix: matches.get_flag("distance_matrix"),
    }
}

/// Load `--config` when given, otherwise start from defaults.
pub fn base_config(matches: &ArgMatches) -> Result<PrepConfig> {
    match matches.get_one::<PathBuf>("config") {
        Some(path) => {
            log::info!("Using config: {}", path.display());
            load_config(path)
        }
        None => {
            let config = PrepConfig::default();
            log::debug!(
                "No config provided; using defaults:\n{}",
                serde_json::to_string_pretty(&config).unwrap_or_default()
            );
            Ok(config)
        }
    }
}

/// Apply `convert` flags on top of `config`.
pub fn apply_convert_overrides(config: &mut PrepConfig, matches: &ArgMatches) {
    if let Some(prefix) = matches.get_one::<String>("output_prefix") {
        config.output_prefix = prefix.clone();
    }

    let folds = matches.get_one::<usize>("folds").copied();
    let shuffle = matches.get_flag("shuffle");
    let seed = matches.get_one::<u64>("seed").copied();
    if folds.is_some() || shuffle || seed.is_some() {
        let cv = config
            .cross_validation
            .get_or_insert_with(CrossValidationConfig::default);
        if let Some(k) = folds {
            cv.n_folds = k;
        }
        if shuffle {
            cv.shuffle = true;
        }
        if let Some(seed) = seed {
            cv.seed = seed;
        }
    }
}

/// Apply estimator flags on top of `config`.
pub fn apply_estimator_overrides(config: &mut PrepConfig, matches: &ArgMatches) {
    let estimator = &mut config.estimator;
    if let Some(exe) = matches.get_one::<PathBuf>("executable") {
        estimator.executable = exe.clone();
    }
    if let Some(settings) = matches.get_one::<PathBuf>("settings_file") {
        estimator.settings_file = settings.clone();
    }
    if let Some(work_dir) = matches.get_one::<PathBuf>("work_dir") {
        estimator.work_dir = work_dir.clone();
    }
}
