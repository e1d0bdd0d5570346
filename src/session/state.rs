//! Session lifecycle state machine.

use serde::Serialize;

/// Lifecycle events emitted by the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new pairing code is waiting to be scanned
    QrIssued(String),
    Authenticated,
    Ready,
    AuthFailure(String),
    Disconnected(String),
}

/// Where the messaging session currently is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Unpaired,
    AwaitingScan {
        code: String,
    },
    Authenticated,
    Ready,
}

impl SessionState {
    /// Apply one engine event. Every event is accepted from every state;
    /// the engine is the source of truth and may skip steps (a stored
    /// session goes straight to `Authenticated`/`Ready` without a QR).
    pub fn apply(self, event: SessionEvent) -> SessionState {
        match event {
            SessionEvent::QrIssued(code) => SessionState::AwaitingScan { code },
            SessionEvent::Authenticated => SessionState::Authenticated,
            SessionEvent::Ready => SessionState::Ready,
            SessionEvent::AuthFailure(_) | SessionEvent::Disconnected(_) => SessionState::Unpaired,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SessionState::Ready)
    }

    pub fn pending_pairing_code(&self) -> Option<&str> {
        match self {
            SessionState::AwaitingScan { code } => Some(code),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Unpaired => "unpaired",
            SessionState::AwaitingScan { .. } => "awaiting_scan",
            SessionState::Authenticated => "authenticated",
            SessionState::Ready => "ready",
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            ready: self.is_ready(),
            pending_pairing_code: self.pending_pairing_code().map(str::to_string),
        }
    }
}

/// Snapshot handed to API handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub ready: bool,
    pub pending_pairing_code: Option<String>,
}
