use super::{Error, Result};
use crate::node::NodeRecord;

use std::fmt;
use std::path::Path;

/// Identifies a persisted node: usernames are only unique within a network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey {
    pub username: String,
    pub network_name: String,
}

impl IdentityKey {
    pub fn new(username: impl Into<String>, network_name: impl Into<String>) -> Self {
        IdentityKey { username: username.into(), network_name: network_name.into() }
    }

    pub fn of(record: &NodeRecord) -> Self {
        IdentityKey::new(record.username.clone(), record.network_name.clone())
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}_{}", self.username, self.network_name)
    }
}

/// Persists the static identity of a node, together with the tree it knows.
pub trait IdentityStore {
    /// Stores `record` under its own key, replacing any previous value.
    fn save_identity(&self, record: &NodeRecord) -> Result<()>;

    fn load_identity(&self, key: &IdentityKey) -> Result<NodeRecord>;

    fn contains_identity(&self, key: &IdentityKey) -> Result<bool>;
}

/// The stored form of an identity: the node's own attributes, then every peer it knows in
/// depth-first order, each pointing at the index of its parent (`None` for the node itself).
///
/// A parent always comes before its children. The list is flat so that loading never
/// recurses, however deep the known tree is.
#[derive(Debug, Serialize, Deserialize)]
struct StoredIdentity {
    #[serde(rename = "Node")]
    node: NodeRecord,
    #[serde(rename = "Peers", default)]
    peers: Vec<StoredPeer>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredPeer {
    #[serde(rename = "Parent")]
    parent: Option<usize>,
    #[serde(rename = "Peer")]
    peer: NodeRecord,
}

fn detached(record: &NodeRecord) -> NodeRecord {
    NodeRecord {
        username: record.username.clone(),
        connections: vec![],
        connections_capacity: record.connections_capacity,
        ip: record.ip,
        port: record.port,
        is_alive: record.is_alive,
        network_name: record.network_name.clone(),
    }
}

impl StoredIdentity {
    fn flatten(record: &NodeRecord) -> Self {
        let mut peers = vec![];
        let mut stack: Vec<(Option<usize>, &NodeRecord)> =
            record.connections.iter().rev().map(|peer| (None, peer)).collect();
        while let Some((parent, current)) = stack.pop() {
            let index = peers.len();
            peers.push(StoredPeer { parent, peer: detached(current) });
            stack.extend(current.connections.iter().rev().map(|peer| (Some(index), peer)));
        }
        StoredIdentity { node: detached(record), peers }
    }

    fn rebuild(self) -> Result<NodeRecord> {
        let mut root = self.node;
        root.connections.clear();

        let mut parents = Vec::with_capacity(self.peers.len());
        let mut slots = Vec::with_capacity(self.peers.len());
        for (index, StoredPeer { parent, mut peer }) in self.peers.into_iter().enumerate() {
            match parent {
                Some(parent) if parent >= index => {
                    return Err(Error::Corrupt(format!("peer {} is stored before its parent {}", index, parent)))
                }
                _ => (),
            }
            peer.connections.clear();
            parents.push(parent);
            slots.push(Some(peer));
        }

        // Children are visited last to first, so every list is reversed once its owner is reached.
        for index in (0..slots.len()).rev() {
            if let Some(mut peer) = slots[index].take() {
                peer.connections.reverse();
                match parents[index].and_then(|parent| slots[parent].as_mut()) {
                    Some(parent) => parent.connections.push(peer),
                    None => root.connections.push(peer),
                }
            }
        }
        root.connections.reverse();
        Ok(root)
    }
}

/// An [IdentityStore] keeping one JSON value per identity in a sled tree.
pub struct SledIdentityStore {
    db: sled::Db,
}

impl SledIdentityStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(SledIdentityStore { db: sled::open(path)? })
    }

    pub fn temporary() -> Result<Self> {
        Ok(SledIdentityStore { db: sled::Config::new().temporary(true).open()? })
    }
}

impl IdentityStore for SledIdentityStore {
    fn save_identity(&self, record: &NodeRecord) -> Result<()> {
        let key = IdentityKey::of(record);
        let encoded = serde_json::to_vec(&StoredIdentity::flatten(record))?;
        let _ = self.db.insert(key.to_string().as_bytes(), encoded)?;
        let _ = self.db.flush()?;
        Ok(())
    }

    fn load_identity(&self, key: &IdentityKey) -> Result<NodeRecord> {
        match self.db.get(key.to_string().as_bytes())? {
            Some(bytes) => serde_json::from_slice::<StoredIdentity>(&bytes)?.rebuild(),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    fn contains_identity(&self, key: &IdentityKey) -> Result<bool> {
        Ok(self.db.contains_key(key.to_string().as_bytes())?)
    }
}
