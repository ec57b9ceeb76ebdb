//! Process configuration, read once from the environment at startup.
//!
//! A `.env` file in the working directory, when present, supplies defaults
//! (`KEY=value` lines); real environment variables override it. Values are
//! validated into immutable structs; a missing or malformed value is an
//! [`Error::Config`] naming the variable.

use crate::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const INPUT_TOPIC_VAR: &str = "REDPANDA_INPUT_TOPIC";
pub const OUTPUT_TOPIC_VAR: &str = "REDPANDA_OUTPUT_TOPIC";
pub const SCHEMA_ID_VAR: &str = "DESTINATION_SCHEMA_ID";
pub const REGISTRY_URL_VAR: &str = "SCHEMA_REGISTRY_URL";
pub const SEED_URL_VAR: &str = "REDPANDA_SEED_URL";
pub const UNMASKED_CUSTOMERS_VAR: &str = "UNMASKED_CUSTOMERS";
pub const GROUP_ID_VAR: &str = "TRANSFORM_GROUP_ID";

/// Optional file of `KEY=value` defaults, read from the working directory.
pub const DOTENV_FILE: &str = ".env";

/// Timeout for schema registry requests.
pub const REGISTRY_TIMEOUT: Duration = Duration::from_secs(10);

/// Raw environment values, keyed by the lower-cased variable name.
#[derive(Debug, Clone, Default, Deserialize)]
struct EnvSettings {
    redpanda_input_topic: Option<String>,
    redpanda_output_topic: Option<String>,
    destination_schema_id: Option<String>,
    schema_registry_url: Option<String>,
    redpanda_seed_url: Option<String>,
    unmasked_customers: Option<String>,
    transform_group_id: Option<String>,
}

impl EnvSettings {
    /// Layers `dotenv` (if it exists) under the process environment, or
    /// under `vars` when given.
    fn load(dotenv: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = dotenv {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Ini)
                    .required(false),
            );
        }
        let settings = builder
            .add_source(config::Environment::default().source(vars))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))
    }
}

fn required(value: &Option<String>, var: &str) -> Result<String> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(Error::Config(format!("{} environment variable is required", var))),
    }
}

fn parse_schema_id(raw: &str) -> Result<u32> {
    raw.parse()
        .map_err(|_| Error::Config(format!("{} not an integer: {}", SCHEMA_ID_VAR, raw)))
}

fn parse_seeds(raw: &str) -> Result<Vec<String>> {
    let seeds: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if seeds.is_empty() {
        return Err(Error::Config(format!("{} contains no broker addresses", SEED_URL_VAR)));
    }
    Ok(seeds)
}

/// Settings for loading a JSON event file onto the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub destination_topic: String,
    pub destination_schema_id: u32,
    pub registry_url: String,
    pub seeds: Vec<String>,
}

impl LoaderConfig {
    /// Reads `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_sources(Some(Path::new(DOTENV_FILE)), None)
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_sources(None, Some(vars))
    }

    pub fn from_sources(dotenv: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        Self::from_settings(&EnvSettings::load(dotenv, vars)?)
    }

    fn from_settings(env: &EnvSettings) -> Result<Self> {
        Ok(Self {
            destination_topic: required(&env.redpanda_input_topic, INPUT_TOPIC_VAR)?,
            destination_schema_id: parse_schema_id(&required(
                &env.destination_schema_id,
                SCHEMA_ID_VAR,
            )?)?,
            registry_url: required(&env.schema_registry_url, REGISTRY_URL_VAR)?,
            seeds: parse_seeds(&required(&env.redpanda_seed_url, SEED_URL_VAR)?)?,
        })
    }
}

/// Settings for the masking transform and the host that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformConfig {
    pub destination_schema_id: u32,
    pub registry_url: String,
    /// JSON list of customers that stay unmasked.
    pub unmasked_customers: String,
    pub input_topic: String,
    pub output_topic: String,
    pub seeds: Vec<String>,
    pub group_id: String,
}

impl TransformConfig {
    /// Reads `.env` and the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_sources(Some(Path::new(DOTENV_FILE)), None)
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self> {
        Self::from_sources(None, Some(vars))
    }

    pub fn from_sources(dotenv: Option<&Path>, vars: Option<HashMap<String, String>>) -> Result<Self> {
        Self::from_settings(&EnvSettings::load(dotenv, vars)?)
    }

    fn from_settings(env: &EnvSettings) -> Result<Self> {
        Ok(Self {
            destination_schema_id: parse_schema_id(&required(
                &env.destination_schema_id,
                SCHEMA_ID_VAR,
            )?)?,
            registry_url: required(&env.schema_registry_url, REGISTRY_URL_VAR)?,
            unmasked_customers: required(&env.unmasked_customers, UNMASKED_CUSTOMERS_VAR)?,
            input_topic: required(&env.redpanda_input_topic, INPUT_TOPIC_VAR)?,
            output_topic: required(&env.redpanda_output_topic, OUTPUT_TOPIC_VAR)?,
            seeds: parse_seeds(&required(&env.redpanda_seed_url, SEED_URL_VAR)?)?,
            group_id: env
                .transform_group_id
                .clone()
                .filter(|g| !g.trim().is_empty())
                .unwrap_or_else(default_group_id),
        })
    }
}

fn default_group_id() -> String {
    "pii-transform".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn loader_vars() -> HashMap<String, String> {
        vars(&[
            (INPUT_TOPIC_VAR, "demo-events"),
            (SCHEMA_ID_VAR, "3"),
            (REGISTRY_URL_VAR, "http://localhost:8081"),
            (SEED_URL_VAR, "localhost:9092, localhost:9093"),
        ])
    }

    #[test]
    fn test_loader_config() {
        let config = LoaderConfig::from_vars(loader_vars()).unwrap();
        assert_eq!(config.destination_topic, "demo-events");
        assert_eq!(config.destination_schema_id, 3);
        assert_eq!(config.seeds, vec!["localhost:9092", "localhost:9093"]);
    }

    #[test]
    fn test_missing_variable_is_named() {
        let mut env = loader_vars();
        env.remove(REGISTRY_URL_VAR);

        let err = LoaderConfig::from_vars(env).unwrap_err();
        assert!(matches!(err, Error::Config(ref msg) if msg.contains(REGISTRY_URL_VAR)));
    }

    #[test]
    fn test_non_integer_schema_id() {
        let mut env = loader_vars();
        env.insert(SCHEMA_ID_VAR.to_string(), "three".to_string());

        let err = LoaderConfig::from_vars(env).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Configuration error: DESTINATION_SCHEMA_ID not an integer: three"
        );
    }

    #[test]
    fn test_transform_config_defaults_group() {
        let mut env = loader_vars();
        env.insert(OUTPUT_TOPIC_VAR.to_string(), "demo-events-masked".to_string());
        env.insert(
            UNMASKED_CUSTOMERS_VAR.to_string(),
            r#"[{"given_name": "Tom", "last_name": "Jones"}]"#.to_string(),
        );

        let config = TransformConfig::from_vars(env).unwrap();
        assert_eq!(config.group_id, "pii-transform");
        assert_eq!(config.output_topic, "demo-events-masked");
        assert!(config.unmasked_customers.contains("Jones"));
    }

    #[test]
    fn test_dotenv_file_supplies_defaults() {
        let mut dotenv = tempfile::NamedTempFile::new().unwrap();
        writeln!(dotenv, "REDPANDA_INPUT_TOPIC=from-file").unwrap();
        writeln!(dotenv, "DESTINATION_SCHEMA_ID=9").unwrap();
        writeln!(dotenv, "SCHEMA_REGISTRY_URL=http://registry:8081").unwrap();

        // the environment wins over the file
        let env = vars(&[
            (SCHEMA_ID_VAR, "4"),
            (SEED_URL_VAR, "broker:9092"),
        ]);
        let config = LoaderConfig::from_sources(Some(dotenv.path()), Some(env)).unwrap();

        assert_eq!(config.destination_topic, "from-file");
        assert_eq!(config.registry_url, "http://registry:8081");
        assert_eq!(config.destination_schema_id, 4);
        assert_eq!(config.seeds, vec!["broker:9092"]);
    }

    #[test]
    fn test_missing_dotenv_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            LoaderConfig::from_sources(Some(&dir.path().join(DOTENV_FILE)), Some(loader_vars())).unwrap();
        assert_eq!(config.destination_topic, "demo-events");
    }

    #[test]
    fn test_transform_requires_customers() {
        let mut env = loader_vars();
        env.insert(OUTPUT_TOPIC_VAR.to_string(), "out".to_string());

        let err = TransformConfig::from_vars(env).unwrap_err();
        assert!(err.to_string().contains(UNMASKED_CUSTOMERS_VAR));
    }
}
