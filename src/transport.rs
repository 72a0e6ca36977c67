use std::time::Duration;

use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::SmtpTransport;
use log::debug;

use crate::config::{SmtpSecurity, SmtpSettings};
use crate::credentials::PASSWORD_ENV;
use crate::email::EmailError;

/// Build a blocking SMTP transport for `settings`.
///
/// A configured username requires a password; without one the server would
/// reject AUTH, so that fails here as a [`EmailError::ConfigurationError`].
pub fn build_smtp_transport(
    settings: &SmtpSettings,
    password: Option<String>,
) -> Result<SmtpTransport, EmailError> {
    debug!(
        "Configuring SMTP transport for {}:{} ({})",
        settings.server, settings.port, settings.security
    );

    let mut builder = SmtpTransport::builder_dangerous(&settings.server)
        .port(settings.port)
        .timeout(settings.timeout_secs.map(Duration::from_secs));

    builder = match settings.security {
        SmtpSecurity::SSL => builder.tls(Tls::Wrapper(tls_parameters(&settings.server)?)),
        SmtpSecurity::StartTLS => builder.tls(Tls::Required(tls_parameters(&settings.server)?)),
        SmtpSecurity::None => builder.tls(Tls::None),
    };

    if let Some(username) = &settings.username {
        let password = password.ok_or_else(|| {
            EmailError::ConfigurationError(format!(
                "no SMTP password for {}; set it in the config, {} or the keyring",
                settings.account_id(),
                PASSWORD_ENV
            ))
        })?;
        builder = builder.credentials(Credentials::new(username.clone(), password));
    }

    Ok(builder.build())
}

fn tls_parameters(server: &str) -> Result<TlsParameters, EmailError> {
    TlsParameters::new(server.to_string()).map_err(|e| EmailError::TransportError(e.to_string()))
}
