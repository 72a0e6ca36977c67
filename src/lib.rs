pub mod config;
pub mod credentials;
pub mod email;
pub mod transport;

// Re-export commonly used types
pub use config::{Config, ConfigError, SenderIdentity, SmtpSecurity, SmtpSettings};
pub use credentials::CredentialManager;
pub use email::{EmailAddress, EmailAttachment, EmailError, Mailer};
pub use transport::build_smtp_transport;
