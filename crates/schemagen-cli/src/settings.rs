use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{CliError, CliResult};

/// Configuration file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG: &str = "schemagen.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schemas_dir: PathBuf,
    pub datasets_dir: PathBuf,
    pub dataset_delimiter: char,
    pub locale: String,
    pub out_dir: PathBuf,
    pub log_level: String,
    pub log_json: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schemas_dir: PathBuf::from("schemas"),
            datasets_dir: PathBuf::from("datasets"),
            dataset_delimiter: ';',
            locale: "en_US".to_string(),
            out_dir: PathBuf::from("out"),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Settings {
    /// Delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> CliResult<u8> {
        u8::try_from(self.dataset_delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| {
                CliError::InvalidConfig(format!(
                    "dataset_delimiter '{}' must be a single ASCII character",
                    self.dataset_delimiter
                ))
            })
    }
}

/// Reads settings from `explicit`, or from [`DEFAULT_CONFIG`] when present.
///
/// An explicit path that does not exist is an error; a missing default file
/// falls back to built-in defaults.
pub fn load_settings(explicit: Option<&Path>) -> CliResult<Settings> {
    let path = match explicit {
        Some(path) if !path.exists() => {
            return Err(CliError::InvalidConfig(format!(
                "config file {} not found",
                path.display()
            )));
        }
        Some(path) => path.to_path_buf(),
        None => PathBuf::from(DEFAULT_CONFIG),
    };
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&path)?;
    parse_settings(&content)
}

pub fn parse_settings(content: &str) -> CliResult<Settings> {
    Ok(toml::from_str(content)?)
}
