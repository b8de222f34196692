use thiserror::Error;

use crate::model::OrderId;

#[derive(Debug, Error)]
pub enum Error {
    #[error("maintenance order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("render failed: {0}")]
    Render(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid record store: {0}")]
    Store(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Store(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
