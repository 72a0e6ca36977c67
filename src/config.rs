use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::email::{EmailAddress, EmailError};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to create config directory")]
    CreateDirError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmtpSecurity {
    None,
    StartTLS,
    SSL,
}

impl FromStr for SmtpSecurity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(SmtpSecurity::None),
            "starttls" => Ok(SmtpSecurity::StartTLS),
            "ssl" | "tls" => Ok(SmtpSecurity::SSL),
            other => Err(format!(
                "unknown SMTP security '{}' (expected None, StartTLS or SSL)",
                other
            )),
        }
    }
}

impl fmt::Display for SmtpSecurity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmtpSecurity::None => "None",
            SmtpSecurity::StartTLS => "StartTLS",
            SmtpSecurity::SSL => "SSL",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub security: SmtpSecurity,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: Option<u64>,
}

fn default_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            server: "localhost".to_string(),
            port: 25,
            security: SmtpSecurity::None,
            username: None,
            password: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SmtpSettings {
    /// Key under which the password is kept in the keyring.
    pub fn account_id(&self) -> String {
        match &self.username {
            Some(username) => format!("{}@{}", username, self.server),
            None => self.server.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SenderIdentity {
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
}

impl Default for SenderIdentity {
    fn default() -> Self {
        Self {
            name: None,
            email: "postmaster@localhost".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub smtp: SmtpSettings,
    #[serde(default)]
    pub sender: SenderIdentity,
}

impl Config {
    /// `~/.config/mailsend/config.json`, or a relative path when there is no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_default()
            .join("mailsend")
            .join("config.json")
    }

    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let path = Path::new(path);

        // A missing file means "use defaults"
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;

        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<(), ConfigError> {
        let path = Path::new(path);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|_| ConfigError::CreateDirError)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;

        Ok(())
    }

    pub fn sender_address(&self) -> Result<EmailAddress, EmailError> {
        EmailAddress::new(&self.sender.email, self.sender.name.as_deref())
    }
}
