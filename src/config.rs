/// manager configuration
///
use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

pub const DEFAULT_NAME: &str = "process-manager";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// the manager name, attached to every log record as the `manager` key
    pub name: String,
    /// console log level, ignored when `log_file` is set
    pub log_level: String,
    /// optional log4rs configuration file
    pub log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            name: DEFAULT_NAME.to_string(),
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

impl Config {
    pub fn with_name(mut self, name: &str) -> Config {
        self.name = name.to_string();
        self
    }

    pub fn from_json(js: &str) -> Result<Config> {
        let config: Config = serde_json::from_str(js).context("invalid manager config")?;
        if config.name.trim().is_empty() {
            return Err(anyhow!("manager name must not be empty"));
        }

        Ok(config)
    }

    /// read the config from a json file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config> {
        let path = path.as_ref();
        let js = std::fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        Config::from_json(&js)
    }

    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow!("unknown log level: {}", self.log_level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.name, DEFAULT_NAME);
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Info);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn from_json() {
        let config = Config::from_json(r#"{"name":"orders","log_level":"debug"}"#).unwrap();
        assert_eq!(config.name, "orders");
        assert_eq!(config.level_filter().unwrap(), LevelFilter::Debug);

        // missing fields fall back to the defaults
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn bad_config() {
        assert!(Config::from_json(r#"{"name":"  "}"#).is_err());
        assert!(Config::from_json("not json").is_err());

        let config = Config {
            log_level: "loud".to_string(),
            ..Config::default()
        };
        assert!(config.level_filter().is_err());
    }

    #[test]
    fn load_missing_file() {
        assert!(Config::load("/no/such/manager-config.json").is_err());
    }
}
