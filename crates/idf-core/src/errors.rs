use crate::domain::UserId;

/// Core error type.
///
/// Adapter crates map their specific errors (SQLite, Telegram) into this type
/// so handlers can tell user-facing failures from background ones.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("delivery to {recipient} failed: {cause}")]
    Delivery { recipient: UserId, cause: String },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
