//! The public IP query: a peer asks what address its connection arrives from.
use super::{MessageType, Payload};

use std::net::IpAddr;

/// Asks the receiving peer for the address it sees this connection coming from.
///
/// Answered inline on the same connection with a [QueryPublicIpAck].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryPublicIp {}

impl Payload for QueryPublicIp {
    const TYPE: MessageType = MessageType::QueryPublicIp;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPublicIpAck {
    #[serde(rename = "PublicIP")]
    pub public_ip: IpAddr,
}

impl Payload for QueryPublicIpAck {
    const TYPE: MessageType = MessageType::QueryPublicIpAck;
}
