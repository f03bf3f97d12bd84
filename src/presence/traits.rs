use futures_util::future::BoxFuture;

use super::activity::ActivitySnapshot;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PresenceError {
    #[error("Presence service unavailable: {0}")]
    Unavailable(String),

    /// The connection will never recover and must be re-created
    #[error("Presence service is not running")]
    NotRunning,

    #[error("Presence update rejected: {0}")]
    Rejected(String),
}

impl PresenceError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::NotRunning)
    }
}

impl From<PresenceError> for String {
    fn from(e: PresenceError) -> Self {
        e.to_string()
    }
}

pub type PublishFuture = BoxFuture<'static, Result<(), PresenceError>>;

/// Factory for presence connections (Discord, test doubles)
pub trait PresenceBackend: Send {
    /// Returns the name of this presence backend (for logging)
    fn name(&self) -> &'static str;

    fn initialize(&mut self) -> Result<Box<dyn PresenceSession>, PresenceError>;
}

/// A live connection to a presence service
pub trait PresenceSession: Send {
    /// Whether the connection has finished its handshake and can accept updates
    fn is_ready(&self) -> bool {
        true
    }

    /// Start publishing an activity. Completion is reported through the future.
    fn publish(&mut self, activity: &ActivitySnapshot) -> PublishFuture;

    /// Process pending work. `PresenceError::NotRunning` means the session is dead.
    fn poll(&mut self) -> Result<(), PresenceError>;
}
