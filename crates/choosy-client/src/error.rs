use choosy_core::StoreError;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The refresh credential is gone or was rejected. Local credentials have
    /// been cleared and the user has to log in again.
    #[error("authentication expired: {reason}")]
    AuthenticationExpired { reason: String },
    /// A freshly refreshed access credential was rejected again.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("{message}")]
    Request {
        status: Option<u16>,
        message: String,
        attempts: u32,
    },
    #[error("failed to decode response: {message}")]
    Decode { message: String },
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ClientError {
    pub fn is_authentication_expired(&self) -> bool {
        matches!(self, Self::AuthenticationExpired { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            Self::Unauthorized { .. } => Some(401),
            _ => None,
        }
    }
}
