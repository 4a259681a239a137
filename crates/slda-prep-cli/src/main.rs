use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgMatches, Command};
use log::LevelFilter;

use slda_prep_cli::commands::convert::{convert_args, run_convert, ConvertOutput};
use slda_prep_cli::commands::estimate::{
    apply_est_overrides, est_args, inf_args, run_estimation, run_inference,
};
use slda_prep_cli::commands::input::{
    apply_convert_overrides, apply_estimator_overrides, base_config, dataset_source,
    estimator_args, input_args,
};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("SLDA_PREP_LOG", "error,slda_prep=info"))
        .init();

    let matches = Command::new("slda-prep-cli")
        .version(clap::crate_version!())
        .author("Justin Sing <justincsing@gmail.com>")
        .about("Prepare OTU tables for supervised LDA and run the slda estimator")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("convert")
                .about("Write an SLDA dataset, optionally split into stratified cross-validation folds")
                .args(input_args())
                .args(convert_args()),
        )
        .subcommand(
            Command::new("est")
                .about("Fit an SLDA model with the external estimator")
                .args(input_args())
                .args(estimator_args())
                .args(est_args()),
        )
        .subcommand(
            Command::new("inf")
                .about("Infer per-sample topic proportions with a trained model")
                .args(input_args())
                .args(estimator_args())
                .args(inf_args()),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Written by {author-with-newline}Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    let outcome = match matches.subcommand() {
        Some(("convert", sub_m)) => handle_convert(sub_m),
        Some(("est", sub_m)) => handle_est(sub_m),
        Some(("inf", sub_m)) => handle_inf(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    };

    if let Err(e) = outcome {
        log::error!("slda-prep-cli failed: {:#}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn handle_convert(matches: &ArgMatches) -> Result<()> {
    let mut config = base_config(matches)?;
    apply_convert_overrides(&mut config, matches);
    let source = dataset_source(matches);
    let fold_file = matches.get_one::<PathBuf>("fold_file");

    match run_convert(&source, &config, fold_file.map(PathBuf::as_path))? {
        ConvertOutput::Single { files, legend_file } => {
            println!("{}", files.data_file.display());
            println!("{}", files.labels_file.display());
            if let Some(legend) = legend_file {
                println!("{}", legend.display());
            }
        }
        ConvertOutput::CrossValidated(output) => {
            for fold in &output.folds {
                println!("{}", fold.train.data_file.display());
                println!("{}", fold.test.data_file.display());
            }
            if let Some(legend) = output.legend_file {
                println!("{}", legend.display());
            }
        }
    }
    Ok(())
}

fn handle_est(matches: &ArgMatches) -> Result<()> {
    let mut config = base_config(matches)?;
    apply_estimator_overrides(&mut config, matches);
    apply_est_overrides(&mut config, matches);

    let output = run_estimation(&dataset_source(matches), &config)?;
    println!("{}", output.model_file.display());
    println!("{}", output.legend_file.display());
    Ok(())
}

fn handle_inf(matches: &ArgMatches) -> Result<()> {
    let mut config = base_config(matches)?;
    apply_estimator_overrides(&mut config, matches);

    let model_file: &PathBuf = matches
        .get_one("model_file")
        .expect("--model is required by CLI configuration");
    let output_file = matches
        .get_one::<PathBuf>("output_file")
        .cloned()
        .unwrap_or_else(|| config.estimator.work_dir.join("inf-gamma.tsv"));

    run_inference(&dataset_source(matches), &config, model_file, &output_file)?;
    println!("{}", output_file.display());
    Ok(())
}
