use anyhow::{Context, Result};
use keyring::{Entry, Error as KeyringError};

use crate::config::SmtpSettings;

/// Environment variable consulted before the keyring.
pub const PASSWORD_ENV: &str = "MAILSEND_SMTP_PASSWORD";

/// SMTP password storage backed by the system keyring
#[derive(Clone)]
pub struct CredentialManager {
    service: String,
}

impl Default for CredentialManager {
    fn default() -> Self {
        Self {
            service: "mailsend-smtp".to_string(),
        }
    }
}

impl CredentialManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_password(&self, account_id: &str, password: &str) -> Result<()> {
        let entry = Entry::new(&self.service, account_id)
            .context("Failed to create keyring entry")?;

        entry.set_password(password)
            .context("Failed to store password in keyring")?;

        log::debug!("SMTP password stored for {}", account_id);
        Ok(())
    }

    pub fn get_password(&self, account_id: &str) -> Result<Option<String>> {
        let entry = Entry::new(&self.service, account_id)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(KeyringError::NoEntry) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("Failed to retrieve password: {}", e)),
        }
    }

    pub fn delete_password(&self, account_id: &str) -> Result<()> {
        let entry = Entry::new(&self.service, account_id)
            .context("Failed to create keyring entry")?;

        match entry.delete_password() {
            Ok(()) | Err(KeyringError::NoEntry) => {
                log::debug!("SMTP password deleted for {}", account_id);
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Failed to delete password: {}", e)),
        }
    }

    /// Config file first, then `MAILSEND_SMTP_PASSWORD`, then the keyring.
    ///
    /// Keyring failures are logged and treated as "no password".
    pub fn resolve_password(&self, settings: &SmtpSettings) -> Option<String> {
        if let Some(password) = &settings.password {
            return Some(password.clone());
        }

        if let Ok(password) = std::env::var(PASSWORD_ENV) {
            return Some(password);
        }

        // Anonymous relays have nothing stored
        if settings.username.is_none() {
            return None;
        }

        match self.get_password(&settings.account_id()) {
            Ok(password) => password,
            Err(e) => {
                log::warn!("Keyring lookup failed for {}: {:#}", settings.account_id(), e);
                None
            }
        }
    }
}
