//! The local node: its identity and its view of the network.
//!
//! The view is a rooted tree of peers kept in an arena ([PeerGraph]) and addressed by
//! [PeerId] handles. Only the dispatcher mutates it, by applying join announcements.
mod graph;
mod join;
mod node;
mod record;

pub use graph::{Parent, PeerGraph, PeerId};
pub use join::Attached;
pub use node::Node;
pub use record::{NodeRecord, Peer};
