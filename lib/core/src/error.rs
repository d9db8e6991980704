use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Tab not found: {0}")]
    TabNotFound(String),

    #[error("Tab limit reached: at most {0} tabs can be open")]
    TabLimitReached(usize),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Node has no position: {0}")]
    MissingPosition(String),

    #[error("Unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("Graph data service error: {0}")]
    Service(String),

    #[error("No data: {0}")]
    NoData(String),

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
