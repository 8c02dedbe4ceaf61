use super::{NodeJoin, QueryPublicIp, QueryPublicIpAck};
use crate::{Error, Result};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;

use std::fmt;

/// The tag naming the payload shape carried by an [Envelope].
///
/// Tags are encoded as a single unsigned byte. Bytes outside the catalog decode as
/// [MessageType::Unknown] so that the receiver can report them instead of failing the
/// whole frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum MessageType {
    NodeJoin,
    QueryPublicIp,
    QueryPublicIpAck,
    Unknown(u8),
}

impl From<u8> for MessageType {
    fn from(tag: u8) -> Self {
        match tag {
            0 => MessageType::NodeJoin,
            1 => MessageType::QueryPublicIp,
            2 => MessageType::QueryPublicIpAck,
            tag => MessageType::Unknown(tag),
        }
    }
}

impl From<MessageType> for u8 {
    fn from(message_type: MessageType) -> Self {
        match message_type {
            MessageType::NodeJoin => 0,
            MessageType::QueryPublicIp => 1,
            MessageType::QueryPublicIpAck => 2,
            MessageType::Unknown(tag) => tag,
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MessageType::NodeJoin => write!(f, "NodeJoin"),
            MessageType::QueryPublicIp => write!(f, "QueryPublicIp"),
            MessageType::QueryPublicIpAck => write!(f, "QueryPublicIpAck"),
            MessageType::Unknown(tag) => write!(f, "Unknown({})", tag),
        }
    }
}

/// A payload shape with a fixed tag in the message catalog.
pub trait Payload: Serialize + DeserializeOwned {
    const TYPE: MessageType;
}

/// The wire-level wrapper: `{ "Type": u8, "Data": <raw JSON> }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Type")]
    pub message_type: MessageType,
    #[serde(rename = "Data")]
    pub data: Box<RawValue>,
}

impl Envelope {
    /// Wraps a payload, tagging it with the payload's own type.
    pub fn wrap<P: Payload>(payload: &P) -> Result<Envelope> {
        let data =
            serde_json::value::to_raw_value(payload).map_err(|err| Error::Encode(err.to_string()))?;
        Ok(Envelope { message_type: P::TYPE, data })
    }

    /// Decodes the payload into `P`.
    ///
    /// The tag is checked before the bytes are parsed. A payload that would parse as `P`
    /// under a different tag is still rejected with [Error::TypeMismatch].
    pub fn extract_content<P: Payload>(&self) -> Result<P> {
        if self.message_type != P::TYPE {
            return Err(Error::TypeMismatch { expected: P::TYPE, found: self.message_type });
        }
        serde_json::from_str(self.data.get()).map_err(|err| Error::Decode(err.to_string()))
    }

    /// Like [Envelope::extract_content], but writes into an existing container. The
    /// container is only assigned once both checks have passed.
    pub fn extract_into<P: Payload>(&self, container: &mut P) -> Result<()> {
        *container = self.extract_content()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|err| Error::Encode(err.to_string()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Envelope> {
        serde_json::from_slice(bytes).map_err(|err| Error::Decode(err.to_string()))
    }
}

/// A decoded envelope.
#[derive(Debug, Clone)]
pub enum Message {
    NodeJoin(NodeJoin),
    QueryPublicIp(QueryPublicIp),
    QueryPublicIpAck(QueryPublicIpAck),
}

impl Message {
    /// Opens an envelope according to its tag. Unknown tags are an error the caller is
    /// expected to log and discard.
    pub fn open(envelope: &Envelope) -> Result<Message> {
        match envelope.message_type {
            MessageType::NodeJoin => envelope.extract_content().map(Message::NodeJoin),
            MessageType::QueryPublicIp => envelope.extract_content().map(Message::QueryPublicIp),
            MessageType::QueryPublicIpAck => {
                envelope.extract_content().map(Message::QueryPublicIpAck)
            }
            MessageType::Unknown(tag) => Err(Error::UnknownMessageType(tag)),
        }
    }

    pub fn message_type(&self) -> MessageType {
        match self {
            Message::NodeJoin(_) => MessageType::NodeJoin,
            Message::QueryPublicIp(_) => MessageType::QueryPublicIp,
            Message::QueryPublicIpAck(_) => MessageType::QueryPublicIpAck,
        }
    }
}
