//! Tracker configuration and the ordered chain of sources it is read from.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// One week.
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

const PLACEHOLDER_SENDER: &str = "your_email@gmail.com";
const PLACEHOLDER_PASSWORD: &str = "your_app_password";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error on {path:?}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Invalid JSON in {context}: {source}")]
    Json {
        context: String,
        source: serde_json::Error,
    },
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for {name}: {message}")]
    InvalidVar { name: &'static str, message: String },
    #[error("Created default config file {0:?}; update it with your email credentials")]
    TemplateCreated(PathBuf),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
    #[error("No configuration source available")]
    NoSource,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub email: EmailConfig,
    #[serde(default = "defaults::check_interval_minutes")]
    pub check_interval_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConfig {
    #[serde(default = "defaults::smtp_server")]
    pub smtp_server: String,
    #[serde(default = "defaults::smtp_port")]
    pub smtp_port: u16,
    pub sender_email: String,
    pub sender_password: String,
    #[serde(default)]
    pub recipient_emails: Vec<String>,
    /// Single-recipient key from older config files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_email: Option<String>,
}

mod defaults {
    pub fn check_interval_minutes() -> u64 {
        60
    }

    pub fn smtp_server() -> String {
        "smtp.gmail.com".to_string()
    }

    pub fn smtp_port() -> u16 {
        587
    }
}

impl Config {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_minutes.saturating_mul(60))
    }

    /// Starter config written when no config file exists yet.
    pub fn template() -> Self {
        Self {
            email: EmailConfig {
                smtp_server: defaults::smtp_server(),
                smtp_port: defaults::smtp_port(),
                sender_email: PLACEHOLDER_SENDER.to_string(),
                sender_password: PLACEHOLDER_PASSWORD.to_string(),
                recipient_emails: vec![
                    "recipient1@gmail.com".to_string(),
                    "recipient2@gmail.com".to_string(),
                ],
                recipient_email: None,
            },
            check_interval_minutes: defaults::check_interval_minutes(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let email = &self.email;
        if email.sender_email.trim().is_empty() {
            return Err(ConfigError::Invalid("email.sender_email is empty".into()));
        }
        if email.sender_password.is_empty() {
            return Err(ConfigError::Invalid("email.sender_password is empty".into()));
        }
        if email.sender_email == PLACEHOLDER_SENDER || email.sender_password == PLACEHOLDER_PASSWORD
        {
            return Err(ConfigError::Invalid(
                "email credentials still hold the template placeholders".into(),
            ));
        }
        if email.smtp_server.trim().is_empty() {
            return Err(ConfigError::Invalid("email.smtp_server is empty".into()));
        }
        if self.check_interval_minutes == 0 {
            return Err(ConfigError::Invalid(
                "check_interval_minutes must be > 0".into(),
            ));
        }
        if self.check_interval_minutes > MAX_CHECK_INTERVAL_MINUTES {
            return Err(ConfigError::Invalid(format!(
                "check_interval_minutes must be <= {MAX_CHECK_INTERVAL_MINUTES}"
            )));
        }
        if email.recipients().is_empty() {
            log::warn!("No recipient emails configured; notifications will fail");
        }
        Ok(())
    }
}

impl EmailConfig {
    /// `recipient_emails`, or the legacy single `recipient_email` when the
    /// list is empty.
    pub fn recipients(&self) -> Vec<String> {
        if !self.recipient_emails.is_empty() {
            return self.recipient_emails.clone();
        }
        self.recipient_email.iter().cloned().collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Process environment; only applies when `SENDER_EMAIL` is set.
    Environment,
    /// JSON config file; a template is created when it does not exist.
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Environment => write!(f, "environment variables"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

impl ConfigSource {
    /// `Ok(None)` means the source does not apply and the next one should be
    /// tried.
    pub fn load(&self) -> Result<Option<Config>, ConfigError> {
        match self {
            ConfigSource::Environment => from_vars(|name| std::env::var(name).ok()),
            ConfigSource::File(path) => from_file(path).map(Some),
        }
    }
}

/// Environment first, then the config file.
pub fn default_sources(config_path: impl Into<PathBuf>) -> Vec<ConfigSource> {
    vec![
        ConfigSource::Environment,
        ConfigSource::File(config_path.into()),
    ]
}

/// Loads and validates the first config any source produces.
pub fn load_config(sources: &[ConfigSource]) -> Result<Config, ConfigError> {
    let mut last_error = None;

    for source in sources {
        match source.load() {
            Ok(Some(config)) => {
                log::info!("Loading configuration from {}", source);
                config.validate()?;
                return Ok(config);
            }
            Ok(None) => continue,
            Err(e) => {
                log::error!("Error loading config from {}: {}", source, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or(ConfigError::NoSource))
}

fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Option<Config>, ConfigError> {
    let Some(sender_email) = var("SENDER_EMAIL") else {
        return Ok(None);
    };

    let sender_password =
        var("SENDER_PASSWORD").ok_or(ConfigError::MissingVar("SENDER_PASSWORD"))?;

    let recipient_emails = match var("RECIPIENT_EMAILS") {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| ConfigError::Json {
            context: "RECIPIENT_EMAILS".to_string(),
            source: e,
        })?,
        None => Vec::new(),
    };

    let smtp_port = match var("SMTP_PORT") {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidVar {
            name: "SMTP_PORT",
            message: format!("{e}"),
        })?,
        None => defaults::smtp_port(),
    };

    let check_interval_minutes = match var("CHECK_INTERVAL_MINUTES") {
        Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidVar {
            name: "CHECK_INTERVAL_MINUTES",
            message: format!("{e}"),
        })?,
        None => defaults::check_interval_minutes(),
    };

    Ok(Some(Config {
        email: EmailConfig {
            smtp_server: var("SMTP_SERVER").unwrap_or_else(defaults::smtp_server),
            smtp_port,
            sender_email,
            sender_password,
            recipient_emails,
            recipient_email: None,
        },
        check_interval_minutes,
    }))
}

fn from_file(path: &Path) -> Result<Config, ConfigError> {
    let io_error = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };

    if !path.exists() {
        let template = serde_json::to_string_pretty(&Config::template()).map_err(|e| {
            ConfigError::Json {
                context: "config template".to_string(),
                source: e,
            }
        })?;
        fs::write(path, template).map_err(io_error)?;
        log::warn!("Created default config file: {}", path.display());
        return Err(ConfigError::TemplateCreated(path.to_path_buf()));
    }

    let content = fs::read_to_string(path).map_err(io_error)?;
    serde_json::from_str(&content).map_err(|e| ConfigError::Json {
        context: path.display().to_string(),
        source: e,
    })
}
