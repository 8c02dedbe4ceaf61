//! Database storage layer using [`sled`](http://docs.rs/sled/) as backend
/// Node identity persistence
pub mod identity;

pub use identity::{IdentityKey, IdentityStore, SledIdentityStore};

#[derive(Debug)]
pub enum Error {
    Json(String),
    Sled(sled::Error),
    /// No identity is stored under the key
    NotFound(String),
    /// An identity is already stored under the key and will not be overwritten
    AlreadyExists(String),
    /// A stored identity whose peer list does not describe a tree
    Corrupt(String),
}

impl std::convert::From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json(format!("{:?}", error))
    }
}

impl std::convert::From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::Sled(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
