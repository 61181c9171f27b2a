use std::time::Duration;

use crate::db::RoomId;

pub type GameResult<T> = Result<T, GameError>;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("room {0} not found")]
    RoomNotFound(RoomId),

    #[error("store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    #[error("store call timed out after {0:?}")]
    StoreTimeout(Duration),

    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("malformed `{event}` payload: {source}")]
    BadPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Invalid(&'static str),

    #[error("could not encode reply: {0}")]
    Encode(#[from] serde_json::Error),
}

impl GameError {
    /// Wire name of the error, sent as `kind` in the `error` event.
    pub fn kind(&self) -> &'static str {
        use GameError::*;
        match self {
            RoomNotFound(_) => "not-found",
            Store(_) => "store-unavailable",
            StoreTimeout(_) => "timeout",
            UnknownEvent(_) | BadPayload { .. } | Invalid(_) => "bad-request",
            Encode(_) => "internal",
        }
    }
}
