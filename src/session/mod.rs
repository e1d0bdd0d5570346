//! Session State Holder
//!
//! Tracks whether the messaging session is ready and which pairing code (if
//! any) is waiting to be scanned. The engine's event callback owns the only
//! [`SessionTracker`]; request handlers get cheap read-only [`SessionView`]s
//! that always observe the latest snapshot.

pub mod qr;
mod state;

pub use state::{SessionEvent, SessionState, SessionStatus};

use std::sync::Arc;
use tokio::sync::watch;

/// Sole writer of the session state.
#[derive(Clone)]
pub struct SessionTracker {
    tx: Arc<watch::Sender<SessionState>>,
}

/// Read-only handle to the current session state.
#[derive(Clone)]
pub struct SessionView {
    rx: watch::Receiver<SessionState>,
}

/// Create a tracker/view pair starting in [`SessionState::Unpaired`].
pub fn channel() -> (SessionTracker, SessionView) {
    let (tx, rx) = watch::channel(SessionState::default());
    (SessionTracker { tx: Arc::new(tx) }, SessionView { rx })
}

impl SessionTracker {
    /// Apply an engine event and publish the resulting state.
    pub fn apply(&self, event: SessionEvent) {
        match &event {
            SessionEvent::QrIssued(code) => {
                tracing::info!("WhatsApp: QR code received, scan it with your phone");
                match qr::render_terminal(code) {
                    Ok(art) => println!("{}", art),
                    Err(e) => tracing::warn!("WhatsApp: could not render QR code: {}", e),
                }
            }
            SessionEvent::Authenticated => tracing::info!("WhatsApp: authentication successful"),
            SessionEvent::Ready => tracing::info!("WhatsApp: client ready"),
            SessionEvent::AuthFailure(reason) => {
                tracing::error!("WhatsApp: authentication failed: {}", reason)
            }
            SessionEvent::Disconnected(reason) => {
                tracing::warn!("WhatsApp: disconnected: {}", reason)
            }
        }

        self.tx.send_modify(|state| {
            let previous = state.name();
            *state = std::mem::take(state).apply(event);
            tracing::debug!("WhatsApp: session {} -> {}", previous, state.name());
        });
    }

    #[cfg(test)]
    pub fn view(&self) -> SessionView {
        SessionView {
            rx: self.tx.subscribe(),
        }
    }
}

impl SessionView {
    #[cfg(test)]
    pub fn snapshot(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.rx.borrow().status()
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().is_ready()
    }
}
