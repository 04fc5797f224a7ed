//! Train the heart disease classifier from a CSV file and write the artifact.

use std::path::PathBuf;

use heartrisk::config::{self, TrainerConfig};
use heartrisk::logging;
use heartrisk::train;
use tracing::info;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    let app_config = config::load(cli.config.as_deref()).map_err(|err| err.to_string())?;
    logging::init_or_stdout(&app_config.logging);
    let trainer = cli.apply(app_config.trainer);
    let options = trainer.train_options();

    info!(
        data = %options.data_path.display(),
        trees = options.forest.n_estimators,
        seed = options.forest.seed,
        "Training heart disease model"
    );
    let report = train::run(&options).map_err(|err| err.to_string())?;
    report
        .artifact
        .save(&trainer.model_out)
        .map_err(|err| err.to_string())?;
    info!(path = %trainer.model_out.display(), "Model artifact saved");

    println!(
        "Model and feature list saved to {} ({} features)",
        trainer.model_out.display(),
        report.artifact.features.len()
    );
    if let Some(evaluation) = &report.evaluation {
        println!("test accuracy: {:.4}", evaluation.accuracy);
        for (idx, stats) in evaluation.per_class.iter().enumerate() {
            println!(
                "class {:<12}  precision={:.3}  recall={:.3}  support={}",
                train::CLASSES[idx],
                stats.precision,
                stats.recall,
                stats.support
            );
        }
        println!("confusion matrix (rows=true, cols=pred):");
        for row in &evaluation.confusion {
            let line: String = row.iter().map(|count| format!("{count:6}")).collect();
            println!("{line}");
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    data_path: Option<PathBuf>,
    model_out: Option<PathBuf>,
    n_estimators: Option<usize>,
    max_depth: Option<usize>,
    min_samples_split: Option<usize>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
}

impl CliOptions {
    fn apply(&self, mut trainer: TrainerConfig) -> TrainerConfig {
        if let Some(path) = &self.data_path {
            trainer.data_path = path.clone();
        }
        if let Some(path) = &self.model_out {
            trainer.model_out = path.clone();
        }
        if let Some(value) = self.n_estimators {
            trainer.n_estimators = value;
        }
        if self.max_depth.is_some() {
            trainer.max_depth = self.max_depth;
        }
        if let Some(value) = self.min_samples_split {
            trainer.min_samples_split = value;
        }
        if let Some(value) = self.seed {
            trainer.seed = value;
        }
        if let Some(value) = self.test_fraction {
            trainer.test_fraction = value;
        }
        trainer
    }
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        let flag = args[idx].as_str();
        if matches!(flag, "-h" | "--help") {
            return Err(help_text());
        }
        idx += 1;
        let value = args
            .get(idx)
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag {
            "--config" => options.config = Some(PathBuf::from(value)),
            "--data" => options.data_path = Some(PathBuf::from(value)),
            "--out" => options.model_out = Some(PathBuf::from(value)),
            "--trees" => options.n_estimators = Some(parse_value(flag, value)?),
            "--max-depth" => options.max_depth = Some(parse_value(flag, value)?),
            "--min-samples-split" => options.min_samples_split = Some(parse_value(flag, value)?),
            "--seed" => options.seed = Some(parse_value(flag, value)?),
            "--test-fraction" => options.test_fraction = Some(parse_value(flag, value)?),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("Invalid {flag} value: {value}"))
}

fn help_text() -> String {
    [
        "heartrisk-train",
        "",
        "Trains a random forest on a heart disease CSV and saves the model with its feature list.",
        "",
        "Usage:",
        "  heartrisk-train [--data heart.csv] [--out heart_disease_model.json] [options]",
        "",
        "Options:",
        "  --config <file>            TOML config (default: heartrisk.toml in the app directory).",
        "  --data <file>              Training CSV (default: heart.csv).",
        "  --out <file>               Output artifact path (default: heart_disease_model.json).",
        "  --trees <n>                Number of trees (default: 100).",
        "  --max-depth <n>            Maximum tree depth (default: unlimited).",
        "  --min-samples-split <n>    Minimum rows to split a node (default: 2).",
        "  --seed <n>                 Seed for the split and the forest (default: 42).",
        "  --test-fraction <f64>      Held-out share for evaluation (default: 0.2).",
    ]
    .join("\n")
}
