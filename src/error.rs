use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Input rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// The server refused the request; carries its `detail` or a generic message.
    #[error("{0}")]
    Request(String),

    /// A success response whose body could not be turned into a poll.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ClientError {
    /// Text suitable for showing to the viewer.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(msg) | ClientError::Request(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
