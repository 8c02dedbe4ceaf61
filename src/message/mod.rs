//! Protocol message definitions.
//!
//! Every message crosses the wire as an [Envelope]: a small type tag and the JSON payload
//! that tag names. Payload shapes implement [Payload], and [Message] is the closed set the
//! node knows how to handle.
mod envelope;
mod node_join;
mod public_ip;

pub use envelope::{Envelope, Message, MessageType, Payload};
pub use node_join::NodeJoin;
pub use public_ip::{QueryPublicIp, QueryPublicIpAck};
