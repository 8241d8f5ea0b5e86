use std::sync::Arc;

use authwatch::config::{load_config, print_schema};
use authwatch::pairing::run_pairing;
use authwatch::startup::run;
use authwatch::utils::logger::init_logging;

const DEFAULT_CONFIG_PATH: &str = "./config.yaml";

// -- Entrypoint

#[tokio::main]
async fn main() {
    let arg = std::env::args().nth(1);

    if arg.as_deref() == Some("--print-schema") {
        if let Err(e) = print_schema() {
            eprintln!("Error printing schema: {}", e);
            std::process::exit(1);
        }
        return;
    }

    // `--pair [config]` pairs the roster once and prints the groups.
    let pair_mode = arg.as_deref() == Some("--pair");
    let arg = if pair_mode {
        std::env::args().nth(2)
    } else {
        arg
    };

    let path = arg.unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match load_config(&path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&config.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    if pair_mode {
        match run_pairing(&reqwest::Client::new(), &config.pairing).await {
            Ok(round) => match serde_json::to_string_pretty(&round) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    tracing::error!("Could not serialize pairs: {}", e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                tracing::error!("Pairing failed: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    if let Err(e) = run(Arc::new(config)).await {
        tracing::error!("Fatal error: {}", e);
        std::process::exit(1);
    }
}
