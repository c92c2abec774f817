//! core::config
//!
//! Service configuration: schema, loading, and validation.
//!
//! # Precedence
//!
//! Values are resolved in this order (later overrides earlier):
//! 1. Built-in defaults
//! 2. TOML config file (`--config` flag or `$GIT_JSON_API_CONFIG`)
//! 3. Environment variables (`REPO_URI`, `REPO_PATH`, `PORT`,
//!    `SIGNATURE_NAME`, `SIGNATURE_EMAIL`)
//!
//! Content variables (`GIT_JSON_API_VAR_*`) are collected from the
//! environment only.
//!
//! # Example
//!
//! ```toml
//! repo_uri = "https://example.com/content.git"
//! repo_path = "/var/lib/git-json-api/repo"
//! port = 3000
//!
//! [signature]
//! name = "Git JSON API"
//! email = "mail@example.com"
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use super::vars::ContentVars;

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("cannot read config file {path}: {source}")]
    ReadFailed {
        /// The file that failed to load.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML.
    #[error("cannot parse config file {path}: {message}")]
    ParseFailed {
        /// The file that failed to parse.
        path: PathBuf,
        /// The TOML error message.
        message: String,
    },

    /// A required value is missing.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A value is present but invalid.
    #[error("invalid configuration value: {0}")]
    InvalidValue(String),
}

/// Commit signature identity for service-authored commits.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Signature {
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

impl Default for Signature {
    fn default() -> Self {
        Self {
            name: "Git JSON API".to_string(),
            email: "mail@example.com".to_string(),
        }
    }
}

/// On-disk config file schema. All fields optional; absent fields fall
/// back to defaults or environment.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    repo_uri: Option<String>,
    repo_path: Option<PathBuf>,
    port: Option<u16>,
    signature: Option<Signature>,
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Remote repository URI to clone from and push to.
    pub repo_uri: String,
    /// Local path for the working clone.
    pub repo_path: PathBuf,
    /// HTTP listen port.
    pub port: u16,
    /// Service commit identity.
    pub signature: Signature,
    /// Content variables collected from the environment.
    pub vars: ContentVars,
}

impl Config {
    /// Load configuration with file + environment precedence.
    ///
    /// `file` overrides `$GIT_JSON_API_CONFIG`; when neither names a file,
    /// only defaults and environment variables apply.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::ReadFailed`] / [`ConfigError::ParseFailed`] for a
    ///   named but unreadable/invalid file
    /// - [`ConfigError::Missing`] if no repository URI is configured
    /// - [`ConfigError::InvalidValue`] for malformed environment values
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = file
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("GIT_JSON_API_CONFIG").map(PathBuf::from));

        let file_config = match file {
            Some(path) => Self::read_file(&path)?,
            None => FileConfig::default(),
        };

        Self::resolve(file_config, ContentVars::from_env())
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn resolve(file: FileConfig, vars: ContentVars) -> Result<Self, ConfigError> {
        let repo_uri = env_string("REPO_URI")
            .or(file.repo_uri)
            .ok_or(ConfigError::Missing("REPO_URI"))?;
        if repo_uri.is_empty() {
            return Err(ConfigError::Missing("REPO_URI"));
        }

        let repo_path = env_string("REPO_PATH")
            .map(PathBuf::from)
            .or(file.repo_path)
            .unwrap_or_else(|| PathBuf::from("./.repo"));

        let port = match env_string("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue(format!("PORT must be a port number, got '{raw}'")))?,
            None => file.port.unwrap_or(3000),
        };

        let mut signature = file.signature.unwrap_or_default();
        if let Some(name) = env_string("SIGNATURE_NAME") {
            signature.name = name;
        }
        if let Some(email) = env_string("SIGNATURE_EMAIL") {
            signature.email = email;
        }

        Ok(Self {
            repo_uri,
            repo_path,
            port,
            signature,
            vars,
        })
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
