use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// The authenticated identity as reported by the identity provider.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

/// A provider session: the bearer token plus the principal it belongs to.
/// The token never leaves the process, it is only replayed to the provider.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: SecretString,
    pub principal: Principal,
}

/// Session resolution state. `Unknown` until the initial provider query
/// answers, `Resolved` afterwards and on every subsequent change event.
#[derive(Debug, Clone, Default)]
pub enum SessionState {
    #[default]
    Unknown,
    Resolved(Option<Session>),
}

/// Events consumed by the store's owner task.
#[derive(Debug)]
pub enum SessionEvent {
    /// Result of the one-shot startup query. Applies only while the state
    /// is still `Unknown`, a change that arrived first must not be undone.
    Initial(Option<Session>),
    /// Sign-in, sign-out, refresh or user update. Always applies.
    Changed(Option<Session>),
}

impl SessionState {
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Changed(session) => *self = Self::Resolved(session),
            SessionEvent::Initial(session) => {
                if matches!(self, Self::Unknown) {
                    *self = Self::Resolved(session);
                }
            }
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    pub const fn session(&self) -> Option<&Session> {
        match self {
            Self::Resolved(Some(session)) => Some(session),
            _ => None,
        }
    }
}

/// Process-wide source of truth for "who is signed in".
///
/// All mutation goes through the event channel and is applied by a single
/// owner task, readers observe snapshots through a watch channel. Dropping
/// every handle closes the channel and ends the owner task.
#[derive(Debug, Clone)]
pub struct SessionStore {
    feed: mpsc::Sender<SessionEvent>,
    state: watch::Receiver<SessionState>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        let (feed, mut events) = mpsc::channel::<SessionEvent>(16);
        let (publish, state) = watch::channel(SessionState::Unknown);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                debug!("session event: {:?}", event);

                publish.send_modify(|state| state.apply(event));
            }

            debug!("session feed closed, store owner task ending");
        });

        Self { feed, state }
    }

    /// Sender half of the event channel, for the watcher and for handlers
    /// that complete a provider auth operation.
    #[must_use]
    pub fn feed(&self) -> mpsc::Sender<SessionEvent> {
        self.feed.clone()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.state.borrow().session().cloned()
    }

    #[must_use]
    pub fn current_principal(&self) -> Option<Principal> {
        self.state.borrow().session().map(|s| s.principal.clone())
    }

    /// Waits until the next state transition has been applied. Test helper,
    /// also used by the fallback route to avoid racing the initial query.
    pub async fn changed(&mut self) -> bool {
        self.state.changed().await.is_ok()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
