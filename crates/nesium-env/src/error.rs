use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to load ROM: {0}")]
    Load(#[source] BoxError),

    #[error("buffer length mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("action code {code} is not in the legal action set")]
    InvalidAction { code: i32 },

    #[error("snapshot handle is not valid for this session: {reason}")]
    InvalidHandle { reason: &'static str },

    #[error("malformed serialized state: {0}")]
    Decode(String),

    #[error("failed to serialize state: {0}")]
    Encode(String),

    #[error("engine rejected the state: {0}")]
    Engine(#[source] BoxError),

    #[error("invalid session configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn size_mismatch(expected: usize, actual: usize) -> Self {
        Error::SizeMismatch { expected, actual }
    }

    pub(crate) fn invalid_handle(reason: &'static str) -> Self {
        Error::InvalidHandle { reason }
    }
}
