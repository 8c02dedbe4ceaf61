//! The serialized form of a node, as persisted and as carried in join announcements.
use serde::{Deserialize, Deserializer};

use std::net::{IpAddr, SocketAddr};

/// A node's static attributes and the subtree of peers known below it.
///
/// Queue, depth and stop state belong to a running node and are never serialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Connections", default, deserialize_with = "null_as_empty")]
    pub connections: Vec<NodeRecord>,
    #[serde(rename = "ConnectionsCapacity", default)]
    pub connections_capacity: u16,
    #[serde(rename = "IP")]
    pub ip: IpAddr,
    #[serde(rename = "Port", default)]
    pub port: u16,
    #[serde(rename = "IsAlive", default)]
    pub is_alive: bool,
    #[serde(rename = "NetworkName", default)]
    pub network_name: String,
}

// Peers written by other implementations send `"Connections": null` for an empty list.
fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<NodeRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<NodeRecord>>::deserialize(deserializer)?.unwrap_or_default())
}

impl NodeRecord {
    pub fn new(username: impl Into<String>, ip: IpAddr, port: u16, connections_capacity: u16) -> Self {
        NodeRecord {
            username: username.into(),
            connections: vec![],
            connections_capacity,
            ip,
            port,
            is_alive: true,
            network_name: String::new(),
        }
    }

    pub fn with_network(mut self, network_name: impl Into<String>) -> Self {
        self.network_name = network_name.into();
        self
    }

    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// Splits the record into its own attributes and the records below it.
    pub fn into_parts(self) -> (Peer, Vec<NodeRecord>) {
        let peer = Peer {
            username: self.username,
            ip: self.ip,
            port: self.port,
            connections_capacity: self.connections_capacity,
            is_alive: self.is_alive,
            network_name: self.network_name,
        };
        (peer, self.connections)
    }
}

/// The attributes of a peer, without its connections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Peer {
    pub username: String,
    pub ip: IpAddr,
    pub port: u16,
    pub connections_capacity: u16,
    pub is_alive: bool,
    pub network_name: String,
}

impl Peer {
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    pub fn to_record(&self, connections: Vec<NodeRecord>) -> NodeRecord {
        NodeRecord {
            username: self.username.clone(),
            connections,
            connections_capacity: self.connections_capacity,
            ip: self.ip,
            port: self.port,
            is_alive: self.is_alive,
            network_name: self.network_name.clone(),
        }
    }
}
