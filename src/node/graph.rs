use super::record::{NodeRecord, Peer};

/// A stable handle to a peer in a [PeerGraph].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(usize);

/// The point a peer hangs from: the local node itself, or a known peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Local,
    Peer(PeerId),
}

#[derive(Debug, Clone)]
struct Entry {
    peer: Peer,
    connections: Vec<PeerId>,
}

/// The locally known tree of peers, rooted at the local node.
///
/// Entries are only ever appended and each entry is attached under exactly one parent, so
/// the handles always form a tree.
#[derive(Debug, Clone, Default)]
pub struct PeerGraph {
    entries: Vec<Entry>,
    primary: Vec<PeerId>,
}

impl PeerGraph {
    pub fn new() -> Self {
        PeerGraph::default()
    }

    /// Builds a graph from the serialized connections of the local node.
    pub fn from_records(records: Vec<NodeRecord>) -> Self {
        let mut graph = PeerGraph::new();
        for record in records {
            let _ = graph.attach(Parent::Local, record);
        }
        graph
    }

    /// The number of peers known at any depth.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn peer(&self, id: PeerId) -> Option<&Peer> {
        self.entries.get(id.0).map(|entry| &entry.peer)
    }

    /// The direct connections below `parent`, in the order they were attached.
    pub fn connections(&self, parent: Parent) -> &[PeerId] {
        match parent {
            Parent::Local => &self.primary,
            Parent::Peer(id) => match self.entries.get(id.0) {
                Some(entry) => &entry.connections,
                None => &[],
            },
        }
    }

    /// Depth-first search below the local node for a peer named `username`.
    ///
    /// Children are visited in stored order and the first match wins.
    pub fn find(&self, username: &str) -> Option<PeerId> {
        self.find_in(&self.primary, username)
    }

    fn find_in(&self, ids: &[PeerId], username: &str) -> Option<PeerId> {
        for id in ids.iter().cloned() {
            let entry = &self.entries[id.0];
            if entry.peer.username == username {
                return Some(id);
            }
            if let Some(found) = self.find_in(&entry.connections, username) {
                return Some(found);
            }
        }
        None
    }

    /// Appends `record` (and any subtree it carries) below `parent`, returning the handle
    /// of the record itself.
    pub fn attach(&mut self, parent: Parent, record: NodeRecord) -> PeerId {
        let (peer, children) = record.into_parts();
        let id = PeerId(self.entries.len());
        self.entries.push(Entry { peer, connections: vec![] });
        match parent {
            Parent::Local => self.primary.push(id),
            Parent::Peer(parent_id) => self.entries[parent_id.0].connections.push(id),
        }
        for child in children {
            let _ = self.attach(Parent::Peer(id), child);
        }
        id
    }

    /// Serializes the subtree below `parent`.
    pub fn records(&self, parent: Parent) -> Vec<NodeRecord> {
        self.connections(parent)
            .iter()
            .map(|id| {
                let entry = &self.entries[id.0];
                entry.peer.to_record(self.records(Parent::Peer(*id)))
            })
            .collect()
    }
}
