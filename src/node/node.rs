use super::graph::{Parent, PeerGraph, PeerId};
use super::record::{NodeRecord, Peer};
use crate::message::Envelope;
use crate::queue::Queue;
use crate::{Error, Result};

use colored::Colorize;
use tracing::warn;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

/// The node running in this process.
pub struct Node {
    /// This node's own attributes.
    identity: Peer,
    /// How many layers past the primary connections this node is willing to see.
    depth: u8,
    /// The locally known tree of peers.
    pub(super) graph: PeerGraph,
    /// The inbox shared with the listener.
    queue: Arc<Queue<Envelope>>,
}

impl Node {
    /// Creates a node. Fails if `ip` does not parse or either capacity is zero.
    pub fn create(
        username: &str,
        ip: &str,
        port: u16,
        connections_capacity: u16,
        queue_capacity: u16,
    ) -> Result<Node> {
        let ip: IpAddr = match ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!("IP used to create node is invalid: {}", ip);
                return Err(Error::InvalidIp(ip.to_owned()));
            }
        };
        Node::from_record(NodeRecord::new(username, ip, port, connections_capacity), queue_capacity)
    }

    /// Reattaches a persisted identity, with its known connections, to a fresh queue.
    pub fn from_record(record: NodeRecord, queue_capacity: u16) -> Result<Node> {
        if record.connections_capacity < 1 {
            warn!("connection capacity of {} is set to 0", record.username);
            return Err(Error::InvalidCapacity);
        }
        if queue_capacity < 1 {
            warn!("queue capacity of {} is set to 0", record.username);
            return Err(Error::InvalidCapacity);
        }
        let (identity, connections) = record.into_parts();
        Ok(Node {
            identity,
            depth: 0,
            graph: PeerGraph::from_records(connections),
            queue: Arc::new(Queue::new(queue_capacity)),
        })
    }

    pub fn with_depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_network(mut self, network_name: impl Into<String>) -> Self {
        self.identity.network_name = network_name.into();
        self
    }

    pub fn username(&self) -> &str {
        &self.identity.username
    }

    pub fn network_name(&self) -> &str {
        &self.identity.network_name
    }

    pub fn ip(&self) -> IpAddr {
        self.identity.ip
    }

    pub fn port(&self) -> u16 {
        self.identity.port
    }

    pub fn address(&self) -> SocketAddr {
        self.identity.address()
    }

    pub fn connections_capacity(&self) -> u16 {
        self.identity.connections_capacity
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn is_alive(&self) -> bool {
        self.identity.is_alive
    }

    pub fn identity(&self) -> &Peer {
        &self.identity
    }

    pub fn queue(&self) -> Arc<Queue<Envelope>> {
        self.queue.clone()
    }

    pub fn graph(&self) -> &PeerGraph {
        &self.graph
    }

    /// The primary connections of this node.
    pub fn connections(&self) -> &[PeerId] {
        self.graph.connections(Parent::Local)
    }

    /// Snapshots the node's static identity together with the tree it knows.
    pub fn to_record(&self) -> NodeRecord {
        self.identity.to_record(self.graph.records(Parent::Local))
    }

    fn fmt_connections(&self, f: &mut fmt::Formatter, parent: Parent, prefix: &str) -> fmt::Result {
        let connections = self.graph.connections(parent);
        for (i, id) in connections.iter().enumerate() {
            let last = i + 1 == connections.len();
            if let Some(peer) = self.graph.peer(*id) {
                let branch = if last { "└─" } else { "├─" };
                writeln!(
                    f,
                    "{}{} {} {}",
                    prefix,
                    branch.cyan(),
                    peer.username.yellow(),
                    peer.address().to_string().dimmed()
                )?;
                let child_prefix = format!("{}{}", prefix, if last { "   " } else { "│  " });
                self.fmt_connections(f, Parent::Peer(*id), &child_prefix)?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(
            f,
            "{} {} ({}/{})",
            self.identity.username.green(),
            self.address().to_string().dimmed(),
            self.connections().len(),
            self.identity.connections_capacity
        )?;
        self.fmt_connections(f, Parent::Local, "")
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Node")
            .field("identity", &self.identity)
            .field("depth", &self.depth)
            .field("known_peers", &self.graph.len())
            .field("queued", &self.queue.len())
            .finish()
    }
}
