use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::connection::ConnectionConfig;
use super::logging::LoggingConfig;
use super::pairing::PairingConfig;

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0: provider connection, debug flag, logging and the
/// pairing roster.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub connection: ConnectionConfig,
    /// Raises the provider SDK's own log level to `debug` at startup.
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pairing: PairingConfig,
}

/// Load config from a YAML file, with `AUTHWATCH_`-prefixed environment
/// variables layered on top (`AUTHWATCH_CONNECTION__API_KEY=...`).
pub fn load_config(path: &str) -> Result<ConfigV1, figment::Error> {
    let figment = Figment::new()
        .merge(Yaml::file(path))
        .merge(Env::prefixed("AUTHWATCH_").split("__"));
    parse_config(figment)
}

/// Load config from an in-memory YAML document.
pub fn load_config_str(yaml: &str) -> Result<ConfigV1, figment::Error> {
    parse_config(Figment::new().merge(Yaml::string(yaml)))
}

fn parse_config(figment: Figment) -> Result<ConfigV1, figment::Error> {
    match figment.extract::<Config>()? {
        Config::ConfigV1(c) => Ok(c),
    }
    // handle configuration migration between versions here when necessary
}

/// Print the JSON schema for the configuration to stdout.
pub fn print_schema() -> Result<(), serde_json::Error> {
    let schema = schema_for!(Config);
    println!("{}", serde_json::to_string_pretty(&schema)?);
    Ok(())
}
