use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Invalid constructor arguments (machine shape, activation parameters).
    Construction(String),
    /// Rank or extent mismatch between arrays, or broken layer chaining.
    ShapeMismatch(String),
    /// A stored value is not of the requested kind.
    TypeMismatch(String),
    /// Invalid argument to an otherwise well-formed call (e.g. random bounds).
    Validation(String),
    /// The storage handle lacks data or holds inconsistent data.
    Load(String),
    /// Failure reported by the storage backend itself.
    Storage {
        handle: String,
        group: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Construction(msg) => write!(f, "construction error: {msg}"),
            Error::ShapeMismatch(msg) => write!(f, "shape mismatch: {msg}"),
            Error::TypeMismatch(msg) => write!(f, "type mismatch: {msg}"),
            Error::Validation(msg) => write!(f, "invalid argument: {msg}"),
            Error::Load(msg) => write!(f, "load error: {msg}"),
            Error::Storage {
                handle,
                group,
                message,
            } => write!(
                f,
                "storage error in {handle} (at group {group}): {message}"
            ),
        }
    }
}

impl std::error::Error for Error {}
