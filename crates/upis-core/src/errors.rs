/// Core error type for the speaker service.
///
/// Adapter crates map their library errors into this type so the lifecycle
/// controller can log every collaborator failure the same way.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store error: {0}")]
    Store(String),

    #[error("speech error: {0}")]
    Speech(String),

    #[error("notification error: {0}")]
    Notification(String),

    #[error("subscription error: {0}")]
    Subscription(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
