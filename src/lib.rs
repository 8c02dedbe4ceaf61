#[macro_use]
extern crate serde_derive;
extern crate colored;

pub mod channel;
pub mod client;
pub mod integration_test;
pub mod message;
pub mod node;
pub mod porter;
pub mod queue;
pub mod server;
pub mod storage;

use message::MessageType;

#[derive(Debug)]
pub enum Error {
    IO(std::io::Error),
    Actix(actix::MailboxError),
    Config(config::ConfigError),
    Storage(storage::Error),
    Porter(porter::Error),

    // queue errors
    QueueFull,

    // channel errors
    Framing(String),
    Network(String),
    Timeout,

    // message errors
    Decode(String),
    Encode(String),
    TypeMismatch { expected: MessageType, found: MessageType },
    UnknownMessageType(u8),
    /// A well-formed message that has no business on the dispatcher queue
    UnexpectedMessage(MessageType),

    // join errors
    AttachTargetNotFound(String),
    CapacityExceeded { username: String, capacity: u16 },
    SelfAnnouncement,

    // node construction errors
    InvalidIp(String),
    InvalidCapacity,

    // bootstrap errors
    PublicIpUnavailable,
    /// The dispatcher went away without reporting how it stopped
    DispatcherGone,
}

impl std::error::Error for Error {}

impl std::convert::From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::IO(error)
    }
}

impl std::convert::From<actix::MailboxError> for Error {
    fn from(error: actix::MailboxError) -> Self {
        Error::Actix(error)
    }
}

impl std::convert::From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Error::Config(error)
    }
}

impl std::convert::From<storage::Error> for Error {
    fn from(error: storage::Error) -> Self {
        Error::Storage(error)
    }
}

impl std::convert::From<porter::Error> for Error {
    fn from(error: porter::Error) -> Self {
        Error::Porter(error)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
