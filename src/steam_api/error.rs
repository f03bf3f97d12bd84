#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SteamApiError {
    #[error("The state does not contain any value.")]
    EmptyState,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Failed to parse response JSON: {0}")]
    JsonParse(String),

    #[error("Your Steam account does not have permission to access this information.")]
    InfoPrivate,

    #[error("The specified AppID is not owned by the specified account.")]
    GameNotOwned,

    #[error("The response from the Steam API was formatted in an unexpected and unsupported way: {0}")]
    UnexpectedDataFormat(String),

    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Steam API worker stopped before completing the request")]
    WorkerUnavailable,
}

impl SteamApiError {
    /// True for the "no value was computed" state, as opposed to a real failure
    pub fn is_empty_state(&self) -> bool {
        matches!(self, Self::EmptyState)
    }
}

impl From<serde_json::Error> for SteamApiError {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonParse(e.to_string())
    }
}

impl From<std::io::Error> for SteamApiError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<SteamApiError> for String {
    fn from(e: SteamApiError) -> Self {
        e.to_string()
    }
}
