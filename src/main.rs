use std::fs;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::error;

use mailsend::{
    build_smtp_transport, Config, CredentialManager, EmailAddress, EmailAttachment, Mailer,
    SenderIdentity, SmtpSecurity, SmtpSettings,
};

/// Send plain-text email, with optional file attachments, over SMTP
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Path to config file
    #[clap(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a message
    Send {
        /// Recipient address
        #[clap(long)]
        to: String,

        /// Recipient display name
        #[clap(long)]
        to_name: Option<String>,

        /// Subject line
        #[clap(short, long)]
        subject: String,

        /// Message body (read from stdin when neither --body nor --body-file is given)
        #[clap(short, long, conflicts_with = "body_file")]
        body: Option<String>,

        /// Read the message body from a file
        #[clap(long)]
        body_file: Option<String>,

        /// File to attach, optionally as PATH=DISPLAYNAME (repeatable).
        /// An existing file is always taken whole; otherwise the first '=' splits off the name.
        #[clap(short, long)]
        attach: Vec<String>,
    },

    /// Write a config file
    InitConfig {
        /// SMTP server address
        #[clap(long)]
        server: String,

        /// SMTP server port
        #[clap(long, default_value = "587")]
        port: u16,

        /// SMTP security (None, StartTLS, SSL)
        #[clap(long, default_value = "StartTLS")]
        security: String,

        /// SMTP username
        #[clap(long)]
        username: Option<String>,

        /// Sender address
        #[clap(long)]
        sender_email: String,

        /// Sender display name
        #[clap(long)]
        sender_name: Option<String>,
    },

    /// Store the SMTP password in the system keyring
    SetPassword {
        #[clap(long)]
        password: String,
    },

    /// Remove the SMTP password from the system keyring
    DeletePassword,

    /// Print the effective configuration
    ShowConfig,
}

fn main() {
    let args = Args::parse();

    env_logger::Builder::new()
        .filter_level(if args.debug { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .init();

    if let Err(e) = run(args) {
        error!("{:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let config_path = match args.config {
        Some(path) => shellexpand::tilde(&path).into_owned(),
        None => Config::default_path().to_string_lossy().into_owned(),
    };

    match args.command {
        Commands::Send {
            to,
            to_name,
            subject,
            body,
            body_file,
            attach,
        } => {
            let config = Config::load(&config_path)
                .with_context(|| format!("Failed to load config from {}", config_path))?;

            let to = EmailAddress::new(&to, to_name.as_deref())?;
            let body = read_body(body, body_file)?;
            let attachments = attach
                .iter()
                .map(|spec| parse_attachment(spec))
                .collect::<Result<Vec<_>>>()?;

            let password = CredentialManager::new().resolve_password(&config.smtp);
            let transport = build_smtp_transport(&config.smtp, password)?;
            let sender = config.sender_address().context("Invalid sender in config")?;
            let mailer = Mailer::new(transport, sender);

            if attachments.is_empty() {
                mailer.send_simple(&to, &subject, &body)?;
            } else {
                mailer.send_with_attachments(&to, &subject, &body, &attachments)?;
            }

            println!("Message sent to {}", to);
        }
        Commands::InitConfig {
            server,
            port,
            security,
            username,
            sender_email,
            sender_name,
        } => {
            let security: SmtpSecurity = security.parse().map_err(anyhow::Error::msg)?;
            let config = Config {
                smtp: SmtpSettings {
                    server,
                    port,
                    security,
                    username,
                    ..SmtpSettings::default()
                },
                sender: SenderIdentity {
                    name: sender_name,
                    email: sender_email,
                },
            };

            config.sender_address().context("Invalid sender address")?;
            config.save(&config_path)
                .with_context(|| format!("Failed to save config to {}", config_path))?;

            println!("Config written to {}", config_path);
        }
        Commands::SetPassword { password } => {
            let config = Config::load(&config_path)?;
            if config.smtp.username.is_none() {
                bail!("No SMTP username configured; run init-config with --username first");
            }

            let account_id = config.smtp.account_id();
            CredentialManager::new().store_password(&account_id, &password)?;
            println!("Password stored for {}", account_id);
        }
        Commands::DeletePassword => {
            let config = Config::load(&config_path)?;
            let account_id = config.smtp.account_id();
            CredentialManager::new().delete_password(&account_id)?;
            println!("Password removed for {}", account_id);
        }
        Commands::ShowConfig => {
            let mut config = Config::load(&config_path)?;
            if config.smtp.password.is_some() {
                config.smtp.password = Some("********".to_string());
            }

            println!("# {}", config_path);
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

fn read_body(body: Option<String>, body_file: Option<String>) -> Result<String> {
    if let Some(body) = body {
        return Ok(body);
    }

    if let Some(path) = body_file {
        let path = shellexpand::tilde(&path).into_owned();
        return fs::read_to_string(&path).with_context(|| format!("Failed to read body from {}", path));
    }

    io::read_to_string(io::stdin()).context("Failed to read body from stdin")
}

/// `PATH` or `PATH=DISPLAYNAME`.
///
/// An argument naming an existing file is used as-is even if it contains '='.
/// Otherwise the first '=' separates the path from the display name.
fn parse_attachment(spec: &str) -> Result<EmailAttachment> {
    let whole = shellexpand::tilde(spec).into_owned();
    if Path::new(&whole).is_file() {
        return Ok(EmailAttachment::from_path(whole)?);
    }

    let attachment = match spec.split_once('=') {
        Some((path, name)) if !path.is_empty() && !name.is_empty() => {
            EmailAttachment::new(shellexpand::tilde(path).into_owned(), name)
        }
        _ => EmailAttachment::from_path(whole)?,
    };

    Ok(attachment)
}
