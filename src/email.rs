use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::{Address, Message, Transport};
use log::{debug, info};
use thiserror::Error;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum EmailError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Attachment error: cannot read {}: {source}", .path.display())]
    AttachmentError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Invalid address: {0}")]
    AddressError(String),

    #[error("Invalid content type: {0}")]
    ContentTypeError(String),
}

/// An email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    name: Option<String>,
    address: Address,
}

impl EmailAddress {
    /// Parse `address` and pair it with an optional display name.
    pub fn new(address: &str, name: Option<&str>) -> Result<Self, EmailError> {
        let address = address
            .trim()
            .parse::<Address>()
            .map_err(|e| EmailError::AddressError(format!("'{}': {}", address, e)))?;

        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);

        Ok(Self { name, address })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn address(&self) -> &str {
        self.address.as_ref()
    }
}

impl FromStr for EmailAddress {
    type Err = EmailError;

    /// Accepts `Name <user@host>`, `"Name" <user@host>`, `<user@host>` and `user@host`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mailbox = s
            .trim()
            .parse::<Mailbox>()
            .map_err(|e| EmailError::AddressError(format!("'{}': {}", s, e)))?;

        Ok(Self {
            name: mailbox.name.filter(|n| !n.is_empty()),
            address: mailbox.email,
        })
    }
}

impl From<EmailAddress> for Mailbox {
    fn from(addr: EmailAddress) -> Self {
        Mailbox::new(addr.name, addr.address)
    }
}

impl From<&EmailAddress> for Mailbox {
    fn from(addr: &EmailAddress) -> Self {
        addr.clone().into()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Mailbox::from(self))
    }
}

/// A file on disk to attach under a display filename.
///
/// Only the path is held; the file is read when the message is composed.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    path: PathBuf,
    filename: String,
    content_type: Option<String>,
}

impl EmailAttachment {
    pub fn new(path: impl Into<PathBuf>, filename: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            filename: filename.into(),
            content_type: None,
        }
    }

    /// Attach a file under its own file name.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self, EmailError> {
        let path = path.into();
        let filename = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => {
                return Err(EmailError::AttachmentError {
                    source: io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"),
                    path,
                })
            }
        };

        Ok(Self::new(path, filename))
    }

    /// Override the content type that would otherwise be guessed from the file extension.
    pub fn with_content_type(mut self, content_type: &str) -> Result<Self, EmailError> {
        ContentType::parse(content_type).map_err(|e| {
            EmailError::ContentTypeError(format!("'{}': {}", content_type, e))
        })?;
        self.content_type = Some(content_type.to_string());
        Ok(self)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// The explicit content type if one was set, else a guess from the file extension.
    pub fn content_type(&self) -> String {
        match &self.content_type {
            Some(content_type) => content_type.clone(),
            None => mime_guess::from_path(&self.path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }

    fn to_part(&self) -> Result<SinglePart, EmailError> {
        let data = fs::read(&self.path).map_err(|source| EmailError::AttachmentError {
            path: self.path.clone(),
            source,
        })?;
        let content_type = ContentType::parse(&self.content_type())
            .or_else(|_| ContentType::parse(OCTET_STREAM))
            .map_err(|e| EmailError::ContentTypeError(e.to_string()))?;

        debug!(
            "Attaching {} from {} ({} bytes, {})",
            self.filename,
            self.path.display(),
            data.len(),
            self.content_type()
        );

        Ok(Attachment::new(self.filename.clone()).body(data, content_type))
    }
}

/// Composes MIME messages and hands them to a transport.
///
/// Both collaborators are optional so an unwired mailer fails with
/// [`EmailError::ConfigurationError`] instead of panicking.
pub struct Mailer<T> {
    transport: Option<T>,
    sender: Option<EmailAddress>,
}

impl<T> Default for Mailer<T> {
    fn default() -> Self {
        Self {
            transport: None,
            sender: None,
        }
    }
}

impl<T> Mailer<T> {
    pub fn new(transport: T, sender: EmailAddress) -> Self {
        Self {
            transport: Some(transport),
            sender: Some(sender),
        }
    }

    pub fn set_transport(&mut self, transport: T) {
        self.transport = Some(transport);
    }

    pub fn set_sender(&mut self, sender: EmailAddress) {
        self.sender = Some(sender);
    }

    pub fn transport(&self) -> Option<&T> {
        self.transport.as_ref()
    }

    pub fn sender(&self) -> Option<&EmailAddress> {
        self.sender.as_ref()
    }

    /// Build the message without sending it.
    ///
    /// The body is always `multipart/mixed` holding a `multipart/related` with the
    /// single `text/plain` part, followed by one part per attachment in order.
    /// Every attachment is read here, so an unreadable file fails before delivery.
    pub fn compose(
        &self,
        to: &EmailAddress,
        subject: &str,
        text_body: &str,
        attachments: &[EmailAttachment],
    ) -> Result<Message, EmailError> {
        let sender = self.sender.as_ref().ok_or_else(|| {
            EmailError::ConfigurationError(missing_collaborator::<EmailAddress>())
        })?;

        let text_part = MultiPart::related().singlepart(SinglePart::plain(text_body.to_string()));
        let mut body = MultiPart::mixed().multipart(text_part);

        for attachment in attachments {
            body = body.singlepart(attachment.to_part()?);
        }

        Message::builder()
            .from(sender.into())
            .to(to.into())
            .subject(subject)
            .date_now()
            .multipart(body)
            .map_err(|e| EmailError::TransportError(e.to_string()))
    }
}

impl<T> Mailer<T>
where
    T: Transport,
    T::Error: fmt::Display,
{
    pub fn send_simple(
        &self,
        to: &EmailAddress,
        subject: &str,
        text_body: &str,
    ) -> Result<(), EmailError> {
        self.send_with_attachments(to, subject, text_body, &[])
    }

    pub fn send_with_attachments(
        &self,
        to: &EmailAddress,
        subject: &str,
        text_body: &str,
        attachments: &[EmailAttachment],
    ) -> Result<(), EmailError> {
        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| EmailError::ConfigurationError(missing_collaborator::<T>()))?;

        let message = self.compose(to, subject, text_body, attachments)?;

        transport
            .send(&message)
            .map_err(|e| EmailError::TransportError(e.to_string()))?;

        info!(
            "Sent '{}' to {} with {} attachment(s)",
            subject,
            to.address(),
            attachments.len()
        );
        Ok(())
    }
}

fn missing_collaborator<C>() -> String {
    format!(
        "Check your configuration, I need an instance of {}.",
        std::any::type_name::<C>()
    )
}
