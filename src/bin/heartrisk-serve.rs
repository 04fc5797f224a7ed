//! Serve the prediction form and endpoint for a trained artifact.

use std::path::PathBuf;

use heartrisk::config::{self, ServerConfig};
use heartrisk::logging;
use heartrisk::predict::Predictor;
use heartrisk::server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let cli = parse_args(std::env::args().skip(1).collect())?;
    let app_config = config::load(cli.config.as_deref()).map_err(|err| err.to_string())?;
    logging::init_or_stdout(&app_config.logging);
    let server_config = cli.apply(app_config.server);

    let predictor = Predictor::load(&server_config.artifact_path).map_err(|err| {
        error!("Failed to load model artifact: {err}");
        err.to_string()
    })?;
    info!(
        path = %server_config.artifact_path.display(),
        features = predictor.features().len(),
        "Model and feature list loaded"
    );
    server::serve(&server_config.listen_addr, predictor)
        .await
        .map_err(|err| err.to_string())
}

#[derive(Debug, Clone, Default)]
struct CliOptions {
    config: Option<PathBuf>,
    artifact_path: Option<PathBuf>,
    listen_addr: Option<String>,
}

impl CliOptions {
    fn apply(&self, mut server: ServerConfig) -> ServerConfig {
        if let Some(path) = &self.artifact_path {
            server.artifact_path = path.clone();
        }
        if let Some(addr) = &self.listen_addr {
            server.listen_addr = addr.clone();
        }
        server
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
            "--artifact" => options.artifact_path = Some(PathBuf::from(value)),
            "--listen" => options.listen_addr = Some(value.clone()),
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "heartrisk-serve",
        "",
        "Serves the heart disease prediction form for a trained model artifact.",
        "",
        "Usage:",
        "  heartrisk-serve [--artifact heart_disease_model.json] [--listen 127.0.0.1:5000]",
        "",
        "Options:",
        "  --config <file>     TOML config (default: heartrisk.toml in the app directory).",
        "  --artifact <file>   Model artifact written by heartrisk-train.",
        "  --listen <addr>     Listen address (default: 127.0.0.1:5000).",
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cli = parse_args(vec!["--listen".into(), "0.0.0.0:9000".into()]).unwrap();
        let server = cli.apply(ServerConfig::default());
        assert_eq!(server.listen_addr, "0.0.0.0:9000");
        assert_eq!(
            server.artifact_path,
            PathBuf::from("heart_disease_model.json")
        );
    }
}
