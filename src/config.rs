use crate::{
    checks::digest::DEFAULT_IGNORE_PATTERNS,
    deploy::script::DEFAULT_DEPLOY_COMMAND,
    poll::DeployStrategy,
    state::DEFAULT_HISTORY_LIMIT,
};
use dirs::{config_dir, data_dir, home_dir};
use duration_string::DurationString;
use log::debug;
use serde::Deserialize;
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};
use thiserror::Error;

const DEFAULT_PROBE_ADDRESS: &str = "api.netlify.com:443";
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// A custom error describing the error cases for the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists, but cannot be read.
    #[error("cannot read config {0}: {1}")]
    Unreadable(String, io::Error),
    /// The config file is not valid JSON or has invalid values.
    #[error("invalid config {0}: {1}")]
    Invalid(String, serde_json::Error),
    /// A required value is not given anywhere.
    #[error("missing {0}, set it in the config file or on the command line")]
    Missing(&'static str),
    /// A value is given, but cannot be used.
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    /// The token file cannot be read.
    #[error("cannot read credentials {0}: {1}")]
    UnreadableCredentials(String, io::Error),
    /// The token file has no token in it.
    #[error("credentials file {0} is empty")]
    EmptyCredentials(String),
}

/// The config file as it is written, every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    directory: Option<String>,
    site_id: Option<String>,
    ignore: Option<Vec<String>>,
    credentials_file: Option<String>,
    state_dir: Option<String>,
    deploy_command: Option<String>,
    history_limit: Option<usize>,
    strategy: Option<DeployStrategy>,
    probe_address: Option<String>,
    probe_timeout: Option<String>,
    site_url: Option<String>,
}

/// Values from the command line, they win over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<String>,
    pub site_id: Option<String>,
    /// Replaces the ignore list of the file, if not empty.
    pub ignore: Vec<String>,
    pub strategy: Option<DeployStrategy>,
}

/// The resolved configuration with every default filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub directory: PathBuf,
    pub site_id: String,
    pub ignore: Vec<String>,
    pub credentials_file: Option<PathBuf>,
    pub state_dir: PathBuf,
    pub deploy_command: String,
    pub history_limit: usize,
    pub strategy: DeployStrategy,
    pub probe_address: String,
    pub probe_timeout: Duration,
    pub site_url: Option<String>,
}

/// The config file used, if none is given: `<config dir>/syncbar/config.json`.
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("syncbar").join("config.json"))
}

fn default_state_dir() -> PathBuf {
    data_dir()
        .map(|dir| dir.join("syncbar"))
        .unwrap_or_else(|| expand_home("~/.syncbar"))
}

/// Expand the `~/` at the start of a path to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().unwrap_or(PathBuf::from("~")).join(rest),
        None if path == "~" => home_dir().unwrap_or(PathBuf::from("~")),
        None => PathBuf::from(path),
    }
}

impl Config {
    /// Read the config file and apply the overrides.
    ///
    /// If `path` is not given, the default path is used, but it doesn't have to exist.
    pub fn load(path: Option<&Path>, overrides: Overrides) -> Result<Config, ConfigError> {
        let file = match path {
            Some(path) => read_file(path)?,
            None => match default_config_path() {
                Some(path) if path.exists() => read_file(&path)?,
                _ => {
                    debug!("No config file found, using the command line only.");
                    ConfigFile::default()
                }
            },
        };

        Config::resolve(file, overrides)
    }

    fn resolve(file: ConfigFile, overrides: Overrides) -> Result<Config, ConfigError> {
        let directory = overrides
            .directory
            .or(file.directory)
            .ok_or(ConfigError::Missing("directory"))?;
        let site_id = overrides
            .site_id
            .or(file.site_id)
            .filter(|site_id| !site_id.trim().is_empty())
            .ok_or(ConfigError::Missing("site_id"))?;

        let ignore = if !overrides.ignore.is_empty() {
            overrides.ignore
        } else {
            file.ignore.unwrap_or_else(|| {
                DEFAULT_IGNORE_PATTERNS
                    .iter()
                    .map(|pattern| pattern.to_string())
                    .collect()
            })
        };

        let history_limit = file.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        if history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "history_limit",
                String::from("it has to be at least 1"),
            ));
        }

        let probe_timeout = match file.probe_timeout {
            Some(timeout) => timeout
                .parse::<DurationString>()
                .map(Duration::from)
                .map_err(|err| ConfigError::InvalidValue("probe_timeout", err.to_string()))?,
            None => DEFAULT_PROBE_TIMEOUT,
        };

        Ok(Config {
            directory: expand_home(&directory),
            site_id,
            ignore,
            credentials_file: file.credentials_file.as_deref().map(expand_home),
            state_dir: file
                .state_dir
                .as_deref()
                .map(expand_home)
                .unwrap_or_else(default_state_dir),
            deploy_command: file
                .deploy_command
                .unwrap_or_else(|| String::from(DEFAULT_DEPLOY_COMMAND)),
            history_limit,
            strategy: overrides.strategy.or(file.strategy).unwrap_or_default(),
            probe_address: file
                .probe_address
                .unwrap_or_else(|| String::from(DEFAULT_PROBE_ADDRESS)),
            probe_timeout,
            site_url: file.site_url,
        })
    }

    /// Read the deploy token from the credentials file, if there is one.
    pub fn read_token(&self) -> Result<Option<String>, ConfigError> {
        let Some(path) = &self.credentials_file else {
            return Ok(None);
        };

        let token = fs::read_to_string(path)
            .map_err(|err| ConfigError::UnreadableCredentials(path.display().to_string(), err))?;
        let token = token.trim();
        if token.is_empty() {
            return Err(ConfigError::EmptyCredentials(path.display().to_string()));
        }

        Ok(Some(token.to_string()))
    }
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    debug!("Reading config from {}.", path.display());
    let content = fs::read_to_string(path)
        .map_err(|err| ConfigError::Unreadable(path.display().to_string(), err))?;

    serde_json::from_str(&content)
        .map_err(|err| ConfigError::Invalid(path.display().to_string(), err))
}
