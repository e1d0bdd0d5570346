//! Messaging Session Client
//!
//! The contract the HTTP layer sends through, independent of the protocol
//! engine behind it. [`whatsapp::WhatsAppEngine`] is the production
//! implementation.

pub mod whatsapp;

use crate::error::SendError;
use crate::phone::RecipientId;
use async_trait::async_trait;
use std::fmt;

/// Identifier the engine assigned to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An attachment with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaPayload {
    pub data: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub caption: String,
}

impl MediaPayload {
    /// Images go out as image messages, everything else as documents.
    pub fn kind(&self) -> MediaKind {
        if self.mime_type.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Document
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Document,
}

/// One outgoing message, built per request and never stored.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundMessage {
    Text(String),
    Media(MediaPayload),
}

/// Sends messages through an authenticated session.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingClient: Send + Sync {
    async fn send_text(&self, to: &RecipientId, text: &str) -> Result<MessageId, SendError>;

    async fn send_media(
        &self,
        to: &RecipientId,
        media: MediaPayload,
    ) -> Result<MessageId, SendError>;
}

/// Dispatch an [`OutboundMessage`] to the matching client operation.
pub async fn deliver(
    client: &dyn MessagingClient,
    to: &RecipientId,
    message: OutboundMessage,
) -> Result<MessageId, SendError> {
    match message {
        OutboundMessage::Text(text) => client.send_text(to, &text).await,
        OutboundMessage::Media(media) => {
            tracing::debug!(
                "WhatsApp: sending {:?} '{}' ({} bytes, {}) to {}",
                media.kind(),
                media.file_name,
                media.data.len(),
                media.mime_type,
                to
            );
            client.send_media(to, media).await
        }
    }
}
