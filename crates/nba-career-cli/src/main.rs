use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;

use nba_career_classifiers::config::ModelType;
use nba_career_classifiers::cross_validation::FoldPolicy;
use nba_career_cli::classifiers::evaluate::{self, load_evaluate_config, EvaluateConfig, TuningMode};
use nba_career_cli::classifiers::predict;

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Error)
        .parse_env(env_logger::Env::default().filter_or("NBA_CAREER_LOG", "error,nba_career=info"))
        .init();

    let matches = Command::new("nba-career")
        .version(clap::crate_version!())
        .about("\u{1F3C0} NBA career classifier - cross-validated evaluation and prediction")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("evaluate")
                .about("Cross-validate a classifier on a career CSV and refit it on all rows")
                .arg(
                    Arg::new("data")
                        .help("Path to the career CSV (19 features and TARGET_5Yrs)")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("config")
                        .help("Path to evaluation JSON configuration file")
                        .required(false)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("policy")
                        .long("policy")
                        .help("Fold policy. Overrides the configuration file.")
                        .value_parser(["kfold", "stratified"]),
                )
                .arg(
                    Arg::new("folds")
                        .short('k')
                        .long("folds")
                        .help("Number of folds. Overrides the configuration file.")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .help("Shuffle seed. Overrides the configuration file.")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("model_type")
                        .short('m')
                        .long("model-type")
                        .help("Classifier family, with its default parameters.")
                        .value_parser([
                            "svc",
                            "random_forest",
                            "balanced_random_forest",
                            "gradient_boosting",
                        ]),
                )
                .arg(
                    Arg::new("tuning")
                        .short('t')
                        .long("tuning")
                        .help("Hyperparameter tuning mode.")
                        .value_parser(["fixed", "grid", "adaptive"]),
                )
                .arg(
                    Arg::new("trials")
                        .long("trials")
                        .help("Adaptive search trial budget.")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    Arg::new("output_file")
                        .short('o')
                        .long("output")
                        .help("File path that the refit model (JSON) will be written to.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("report")
                        .long("report")
                        .help("HTML report path. Defaults to nba_career_<model>.html.")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("no_report")
                        .long("no-report")
                        .help("Disable HTML report generation.")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("predict")
                .about("Predict whether a player's career lasts 5+ years")
                .arg(
                    Arg::new("model")
                        .help("Path to a model written by `evaluate --output`")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath),
                )
                .arg(
                    Arg::new("player")
                        .short('p')
                        .long("player")
                        .help("JSON file with the player's statistics (GP, MIN, PTS, ...)")
                        .value_parser(clap::value_parser!(PathBuf))
                        .value_hint(ValueHint::FilePath)
                        .conflicts_with("features"),
                )
                .arg(
                    Arg::new("features")
                        .short('f')
                        .long("features")
                        .help("Comma separated feature values in column order")
                        .value_parser(clap::builder::NonEmptyStringValueParser::new())
                        .allow_hyphen_values(true),
                ),
        )
        .help_template(
            "{usage-heading} {usage}\n\n\
             {about-with-newline}\n\
             Version {version}\n\n\
             {all-args}{after-help}",
        )
        .get_matches();

    match matches.subcommand() {
        Some(("evaluate", sub_m)) => handle_evaluate(sub_m),
        Some(("predict", sub_m)) => handle_predict(sub_m),
        _ => unreachable!("Subcommand is required by CLI configuration"),
    }
}

fn handle_evaluate(matches: &ArgMatches) -> Result<()> {
    let data_path: &PathBuf = matches
        .get_one("data")
        .ok_or_else(|| anyhow::anyhow!("missing data path"))?;

    let mut config = if let Some(config_path) = matches.get_one::<PathBuf>("config") {
        log::info!("[NBA-Career::Evaluate] Using config: {:?}", config_path);
        load_evaluate_config(config_path)?
    } else {
        log::info!("[NBA-Career::Evaluate] No config provided; using defaults.");
        EvaluateConfig::default()
    };

    if let Some(policy) = matches.get_one::<String>("policy") {
        config.fold_policy = FoldPolicy::from_str(policy)?;
    }
    if let Some(&folds) = matches.get_one::<usize>("folds") {
        config.num_folds = folds;
    }
    if let Some(&seed) = matches.get_one::<u64>("seed") {
        config.seed = seed;
    }
    if let Some(model_type) = matches.get_one::<String>("model_type") {
        config.model.model_type = ModelType::from_str(model_type)?;
    }
    if let Some(tuning) = matches.get_one::<String>("tuning") {
        config.tuning = TuningMode::from_str(tuning)?;
    }
    if let Some(&trials) = matches.get_one::<usize>("trials") {
        config.n_trials = trials;
    }

    if matches.get_one::<PathBuf>("config").is_none() {
        let default_json = serde_json::to_string_pretty(&config).unwrap_or_default();
        eprintln!("[NBA-Career::Evaluate] Default config:\n{}", default_json);
    }

    let model_output = matches.get_one::<PathBuf>("output_file");
    let report_output = if matches.get_flag("no_report") {
        None
    } else {
        Some(
            matches
                .get_one::<PathBuf>("report")
                .cloned()
                .unwrap_or_else(|| {
                    PathBuf::from(format!("nba_career_{}.html", config.model.family()))
                }),
        )
    };

    match evaluate::run(
        data_path,
        &config,
        model_output.map(PathBuf::as_path),
        report_output.as_deref(),
    ) {
        Ok(outcome) => {
            println!("{}", outcome.report);
            Ok(())
        }
        Err(e) => {
            log::error!("Evaluation failed: {:#}", e);
            std::process::exit(1)
        }
    }
}

fn handle_predict(matches: &ArgMatches) -> Result<()> {
    let model_path: &PathBuf = matches
        .get_one("model")
        .ok_or_else(|| anyhow::anyhow!("missing model path"))?;

    let features = if let Some(player) = matches.get_one::<PathBuf>("player") {
        predict::load_player(player)
    } else if let Some(raw) = matches.get_one::<String>("features") {
        predict::parse_features(raw)
    } else {
        Err(anyhow::anyhow!("Provide either --player or --features"))
    };

    match features.and_then(|f| predict::run(model_path, &f)) {
        Ok(prediction) => {
            println!("Prediction: {}", prediction.label);
            println!("Probability: {:.4}", prediction.rounded_probability());
            Ok(())
        }
        Err(e) => {
            log::error!("Prediction failed: {:#}", e);
            std::process::exit(1)
        }
    }
}
