use crate::registry::RegistryError;
use crate::validate::ValidationError;

use std::error;
use std::io;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("registry conflict: {0}")]
    Registry(#[from] RegistryError),
    /// The invocation context carried no message.
    #[error("invocation has no message")]
    MissingMessage,
    #[error("command `{0}` has no source location and cannot be reloaded")]
    NoSource(String),
    #[error("parent command `{0}` is not loaded")]
    UnknownParent(String),
    #[error("a command named `{0}` is already loaded")]
    DuplicateCommand(String),
    #[error("no definition found at `{0}`")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Boxed(Box<dyn error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps any error returned from inside a handler.
    pub fn boxed<E>(err: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        Self::Boxed(Box::new(err))
    }

    /// Creates an opaque error from a plain message.
    pub fn msg<T>(msg: T) -> Self
    where
        T: ToString,
    {
        Self::Boxed(msg.to_string().into())
    }
}
