//! WhatsApp Engine
//!
//! Runs a WhatsApp Web client (`whatsapp-rust`) in the background, feeds its
//! lifecycle events into the [`SessionTracker`], and implements
//! [`MessagingClient`] on top of the connected client. Credentials live in a
//! SQLite store inside the configured session directory; an existing paired
//! session reconnects silently, otherwise a QR code is issued.

use super::{MediaKind, MediaPayload, MessageId, MessagingClient};
use crate::error::SendError;
use crate::phone::RecipientId;
use crate::session::{SessionEvent, SessionTracker};
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use wacore::types::events::Event;
use wacore_binary::jid::Jid;
use whatsapp_rust::bot::Bot;
use whatsapp_rust::client::Client;
use whatsapp_rust::download::MediaType;
use whatsapp_rust::store::SqliteStore;
use whatsapp_rust_tokio_transport::TokioWebSocketTransportFactory;
use whatsapp_rust_ureq_http_client::UreqHttpClient;
use waproto::whatsapp::Message;
use waproto::whatsapp::message::{DocumentMessage, ImageMessage};

/// Protocol server for one-to-one user chats.
pub const USER_SERVER: &str = "s.whatsapp.net";

const SESSION_DB: &str = "session.db";

/// Background WhatsApp Web session.
#[derive(Clone)]
pub struct WhatsAppEngine {
    session_dir: PathBuf,
    /// Set on `Connected`, cleared whenever the session stops being ready
    client: Arc<RwLock<Option<Arc<Client>>>>,
}

impl WhatsAppEngine {
    pub fn new(session_dir: impl Into<PathBuf>) -> Self {
        Self {
            session_dir: session_dir.into(),
            client: Arc::new(RwLock::new(None)),
        }
    }

    /// Open the session store, build the bot and start it.
    ///
    /// Errors here are fatal for the service: without a session engine no
    /// message can ever be sent. The returned handle completes when the bot
    /// stops.
    pub async fn start(&self, tracker: SessionTracker) -> Result<JoinHandle<()>> {
        std::fs::create_dir_all(&self.session_dir).with_context(|| {
            format!(
                "Failed to create session directory: {}",
                self.session_dir.display()
            )
        })?;
        let db_path = self.session_dir.join(SESSION_DB);

        let backend = SqliteStore::new(db_path.to_string_lossy().as_ref())
            .await
            .map_err(|e| anyhow::anyhow!("failed to open session store: {}", e))?;

        tracing::info!("WhatsApp: starting client (session: {})", db_path.display());

        let client_slot = self.client.clone();
        let mut bot = Bot::builder()
            .with_backend(Arc::new(backend))
            .with_transport_factory(TokioWebSocketTransportFactory::new())
            .with_http_client(UreqHttpClient::new())
            .on_event(move |event, client| {
                let tracker = tracker.clone();
                let client_slot = client_slot.clone();
                async move {
                    let Some(transition) = session_event(&event) else {
                        return;
                    };
                    match &transition {
                        SessionEvent::Ready => *client_slot.write().await = Some(client),
                        SessionEvent::AuthFailure(_) | SessionEvent::Disconnected(_) => {
                            *client_slot.write().await = None
                        }
                        _ => {}
                    }
                    tracker.apply(transition);
                }
            })
            .build()
            .await
            .map_err(|e| anyhow::anyhow!("failed to build WhatsApp client: {}", e))?;

        let handle = bot
            .run()
            .await
            .map_err(|e| anyhow::anyhow!("failed to start WhatsApp client: {}", e))?;

        Ok(handle)
    }

    async fn connected_client(&self) -> Result<Arc<Client>, SendError> {
        self.client
            .read()
            .await
            .clone()
            .ok_or(SendError::NotConnected)
    }

    async fn send(&self, to: &RecipientId, message: Message) -> Result<MessageId, SendError> {
        let client = self.connected_client().await?;
        let jid = jid_for(to)?;
        let id = client
            .send_message(jid, message)
            .await
            .map_err(|e| SendError::Delivery(e.to_string()))?;
        tracing::info!("WhatsApp: message {} sent to {}", id, to);
        Ok(MessageId(id))
    }
}

/// Map an engine event onto a session transition.
///
/// Terminal engine events such as `StreamReplaced` are never followed by
/// `Event::Disconnected`, so they clear readiness themselves.
fn session_event(event: &Event) -> Option<SessionEvent> {
    let transition = match event {
        Event::PairingQrCode { code, .. } => SessionEvent::QrIssued(code.clone()),
        Event::PairSuccess(_) => SessionEvent::Authenticated,
        Event::Connected(_) => SessionEvent::Ready,
        Event::PairError(e) => {
            SessionEvent::AuthFailure(format!("pairing failed: {}", e.error))
        }
        Event::LoggedOut(e) => {
            SessionEvent::AuthFailure(format!("logged out ({:?})", e.reason))
        }
        Event::Disconnected(_) => SessionEvent::Disconnected("connection closed".to_string()),
        Event::StreamReplaced(_) => {
            SessionEvent::Disconnected("session replaced by another client".to_string())
        }
        Event::StreamError(e) => SessionEvent::Disconnected(format!("stream error {}", e.code)),
        Event::ConnectFailure(e) if e.message.is_empty() => {
            SessionEvent::Disconnected(format!("connect failure {}", e.reason.code()))
        }
        Event::ConnectFailure(e) => SessionEvent::Disconnected(format!(
            "connect failure {}: {}",
            e.reason.code(),
            e.message
        )),
        Event::TemporaryBan(e) => {
            SessionEvent::Disconnected(format!("temporarily banned: {}", e.code))
        }
        Event::ClientOutdated(_) => {
            SessionEvent::Disconnected("client version outdated".to_string())
        }
        _ => return None,
    };
    Some(transition)
}

/// Translate a canonical recipient into a protocol JID.
fn jid_for(to: &RecipientId) -> Result<Jid, SendError> {
    format!("{}@{}", to.user(), USER_SERVER)
        .parse()
        .map_err(|e| SendError::InvalidRecipient {
            recipient: to.to_string(),
            reason: format!("{}", e),
        })
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

#[async_trait]
impl MessagingClient for WhatsAppEngine {
    async fn send_text(&self, to: &RecipientId, text: &str) -> Result<MessageId, SendError> {
        let message = Message {
            conversation: Some(text.to_string()),
            ..Default::default()
        };
        self.send(to, message).await
    }

    async fn send_media(
        &self,
        to: &RecipientId,
        media: MediaPayload,
    ) -> Result<MessageId, SendError> {
        let client = self.connected_client().await?;
        let kind = media.kind();
        let media_type = match kind {
            MediaKind::Image => MediaType::Image,
            MediaKind::Document => MediaType::Document,
        };

        let upload = client
            .upload(media.data, media_type)
            .await
            .map_err(|e| SendError::Upload(e.to_string()))?;

        let message = match kind {
            MediaKind::Image => Message {
                image_message: Some(Box::new(ImageMessage {
                    mimetype: Some(media.mime_type),
                    caption: non_empty(media.caption),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            },
            MediaKind::Document => Message {
                document_message: Some(Box::new(DocumentMessage {
                    mimetype: Some(media.mime_type),
                    title: Some(media.file_name.clone()),
                    file_name: Some(media.file_name),
                    caption: non_empty(media.caption),
                    url: Some(upload.url),
                    direct_path: Some(upload.direct_path),
                    media_key: Some(upload.media_key),
                    file_enc_sha256: Some(upload.file_enc_sha256),
                    file_sha256: Some(upload.file_sha256),
                    file_length: Some(upload.file_length),
                    ..Default::default()
                })),
                ..Default::default()
            },
        };

        self.send(to, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use wacore::types::events::{
        ClientOutdated, ConnectFailure, ConnectFailureReason, Connected, Disconnected,
        LoggedOut, OfflineSyncCompleted, PairError, PairSuccess, QrScannedWithoutMultidevice,
        StreamError, StreamReplaced, TempBanReason, TemporaryBan,
    };

    fn pair_error(error: &str) -> Event {
        Event::PairError(PairError {
            id: Jid::default(),
            lid: Jid::default(),
            business_name: String::new(),
            platform: String::new(),
            error: error.to_string(),
        })
    }

    #[rstest]
    #[case::qr(
        Event::PairingQrCode { code: "2@abc".into(), timeout: std::time::Duration::from_secs(60) },
        SessionEvent::QrIssued("2@abc".into())
    )]
    #[case::paired(
        Event::PairSuccess(PairSuccess {
            id: Jid::default(),
            lid: Jid::default(),
            business_name: String::new(),
            platform: "android".into(),
        }),
        SessionEvent::Authenticated
    )]
    #[case::connected(Event::Connected(Connected), SessionEvent::Ready)]
    #[case::pair_error(
        pair_error("bad signature"),
        SessionEvent::AuthFailure("pairing failed: bad signature".into())
    )]
    #[case::logged_out(
        Event::LoggedOut(LoggedOut { on_connect: false, reason: ConnectFailureReason::LoggedOut }),
        SessionEvent::AuthFailure("logged out (LoggedOut)".into())
    )]
    #[case::disconnected(
        Event::Disconnected(Disconnected),
        SessionEvent::Disconnected("connection closed".into())
    )]
    #[case::replaced(
        Event::StreamReplaced(StreamReplaced),
        SessionEvent::Disconnected("session replaced by another client".into())
    )]
    #[case::stream_error(
        Event::StreamError(StreamError { code: "503".into(), raw: None }),
        SessionEvent::Disconnected("stream error 503".into())
    )]
    #[case::connect_failure(
        Event::ConnectFailure(ConnectFailure {
            reason: ConnectFailureReason::ServiceUnavailable,
            message: "try later".into(),
            raw: None,
        }),
        SessionEvent::Disconnected(format!(
            "connect failure {}: try later",
            ConnectFailureReason::ServiceUnavailable.code()
        ))
    )]
    #[case::connect_failure_no_message(
        Event::ConnectFailure(ConnectFailure {
            reason: ConnectFailureReason::Unknown(499),
            message: String::new(),
            raw: None,
        }),
        SessionEvent::Disconnected("connect failure 499".into())
    )]
    #[case::temporary_ban(
        Event::TemporaryBan(TemporaryBan {
            code: TempBanReason::BlockedByUsers,
            expire: Default::default(),
        }),
        SessionEvent::Disconnected(format!("temporarily banned: {}", TempBanReason::BlockedByUsers))
    )]
    #[case::outdated(
        Event::ClientOutdated(ClientOutdated),
        SessionEvent::Disconnected("client version outdated".into())
    )]
    fn test_session_event_mapping(#[case] event: Event, #[case] expected: SessionEvent) {
        assert_eq!(session_event(&event), Some(expected));
    }

    #[rstest]
    #[case::sync(Event::OfflineSyncCompleted(OfflineSyncCompleted { count: 3 }))]
    #[case::no_multidevice(Event::QrScannedWithoutMultidevice(QrScannedWithoutMultidevice))]
    fn test_untracked_events_are_ignored(#[case] event: Event) {
        assert_eq!(session_event(&event), None);
    }

    #[test]
    fn test_terminal_events_clear_readiness() {
        let (tracker, view) = crate::session::channel();
        for event in [
            Event::StreamReplaced(StreamReplaced),
            Event::StreamError(StreamError { code: "516".into(), raw: None }),
            Event::ClientOutdated(ClientOutdated),
            pair_error("rejected"),
        ] {
            tracker.apply(SessionEvent::Ready);
            assert!(view.is_ready());
            if let Some(transition) = session_event(&event) {
                tracker.apply(transition);
            }
            assert!(!view.is_ready(), "still ready after {:?}", event);
        }
    }

    #[test]
    fn test_jid_uses_user_server() {
        let jid = jid_for(&RecipientId::normalize("+1 234-567")).unwrap();
        assert_eq!(jid.to_string(), "1234567@s.whatsapp.net");
    }

    #[tokio::test]
    async fn test_send_before_connect_is_rejected() {
        let engine = WhatsAppEngine::new("./unused-session");
        let err = engine
            .send_text(&RecipientId::normalize("123"), "hi")
            .await
            .unwrap_err();
        assert!(matches!(err, SendError::NotConnected));
    }

    #[test]
    fn test_non_empty_caption() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("see attached".into()), Some("see attached".into()));
    }
}
