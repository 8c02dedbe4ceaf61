//! Applying messages to the local view.
use super::graph::{Parent, PeerId};
use super::node::Node;
use super::record::NodeRecord;
use crate::message::{Envelope, Message, NodeJoin};
use crate::{Error, Result};

use tracing::{debug, info, warn};

/// Where a join announcement was attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attached {
    pub parent: Parent,
    pub peer: PeerId,
}

impl Node {
    /// Handles a single envelope taken from the queue.
    pub fn process_message(&mut self, envelope: &Envelope) -> Result<Option<Attached>> {
        debug!("processing next message of type: {}", envelope.message_type);
        match Message::open(envelope)? {
            Message::NodeJoin(join) => self.process_node_join(&join).map(Some),
            // Answered by the listener, never expected on the queue
            other => Err(Error::UnexpectedMessage(other.message_type())),
        }
    }

    /// Attaches the announced node below the peer it says it joined.
    ///
    /// The existing peer is either this node or the first peer with that username found by
    /// a depth-first search of the known tree. Nothing is mutated unless the announcement
    /// is attached.
    pub fn process_node_join(&mut self, join: &NodeJoin) -> Result<Attached> {
        let candidate = join.node_record()?;

        if candidate.username == self.username() {
            debug!("current node is the new node, skipping the update of the internal state");
            return Err(Error::SelfAnnouncement);
        }

        let parent = if join.existing_node_username == self.username() {
            Parent::Local
        } else {
            match self.graph.find(&join.existing_node_username) {
                Some(id) => Parent::Peer(id),
                None => return Err(Error::AttachTargetNotFound(join.existing_node_username.clone())),
            }
        };

        check_subtree(&candidate)?;

        let capacity = match parent {
            Parent::Local => self.connections_capacity(),
            Parent::Peer(id) => match self.graph.peer(id) {
                Some(peer) => peer.connections_capacity,
                None => return Err(Error::AttachTargetNotFound(join.existing_node_username.clone())),
            },
        };
        if self.graph.connections(parent).len() >= capacity as usize {
            return Err(Error::CapacityExceeded {
                username: join.existing_node_username.clone(),
                capacity,
            });
        }

        let username = candidate.username.clone();
        let peer = self.graph.attach(parent, candidate);
        info!("attached {} below {}", username, join.existing_node_username);
        Ok(Attached { parent, peer })
    }
}

/// Every record arriving in a candidate subtree must be able to hold at least one
/// connection and must not already hold more than its capacity.
fn check_subtree(record: &NodeRecord) -> Result<()> {
    if record.connections_capacity < 1 {
        warn!("connection capacity of announced node {} is set to 0", record.username);
        return Err(Error::InvalidCapacity);
    }
    if record.connections.len() > record.connections_capacity as usize {
        return Err(Error::CapacityExceeded {
            username: record.username.clone(),
            capacity: record.connections_capacity,
        });
    }
    record.connections.iter().try_for_each(check_subtree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{MessageType, QueryPublicIp};

    use serde_json::value::RawValue;

    fn node(username: &str, capacity: u16) -> Node {
        Node::create(username, "192.1.1.1", 8080, capacity, 4).unwrap()
    }

    fn record(username: &str, capacity: u16) -> NodeRecord {
        NodeRecord::new(username, "192.168.1.2".parse().unwrap(), 8080, capacity)
    }

    fn join_envelope(existing: &str, new_node: &NodeRecord) -> Envelope {
        Envelope::wrap(&NodeJoin::new(existing, new_node).unwrap()).unwrap()
    }

    fn usernames(node: &Node, parent: Parent) -> Vec<String> {
        node.graph()
            .connections(parent)
            .iter()
            .map(|id| node.graph().peer(*id).unwrap().username.clone())
            .collect()
    }

    #[test]
    fn test_join_where_current_node_is_the_one_attached_to() {
        let mut a = node("A", 2);
        let attached = a.process_message(&join_envelope("A", &record("B", 3))).unwrap().unwrap();
        assert_eq!(attached.parent, Parent::Local);
        assert_eq!(usernames(&a, Parent::Local), vec!["B"]);
    }

    #[test]
    fn test_join_where_connection_node_is_the_one_attached_to() {
        let mut a = node("A", 2);
        let c = a.graph.attach(Parent::Local, record("C", 4));

        let attached = a.process_message(&join_envelope("C", &record("B", 3))).unwrap().unwrap();
        assert_eq!(attached.parent, Parent::Peer(c));
        assert_eq!(usernames(&a, Parent::Local), vec!["C"]);
        assert_eq!(usernames(&a, Parent::Peer(c)), vec!["B"]);
    }

    #[test]
    fn test_join_attaches_at_depth() {
        let mut a = node("A", 2);
        let c1 = a.graph.attach(Parent::Local, record("C1", 2));
        let s1 = a.graph.attach(Parent::Local, record("S1", 2));
        let c2 = a.graph.attach(Parent::Peer(c1), record("C2", 2));
        let c3 = a.graph.attach(Parent::Peer(c2), record("C3", 2));

        a.process_node_join(&NodeJoin::new("C3", &record("B", 1)).unwrap()).unwrap();

        assert_eq!(usernames(&a, Parent::Peer(c3)), vec!["B"]);
        assert_eq!(usernames(&a, Parent::Local), vec!["C1", "S1"]);
        assert_eq!(usernames(&a, Parent::Peer(c1)), vec!["C2"]);
        assert_eq!(usernames(&a, Parent::Peer(c2)), vec!["C3"]);
        assert!(a.graph.connections(Parent::Peer(s1)).is_empty());
    }

    #[test]
    fn test_join_with_unknown_target_leaves_tree_unchanged() {
        let mut a = node("A", 2);
        let c = a.graph.attach(Parent::Local, record("C", 2));
        let _ = a.graph.attach(Parent::Peer(c), record("D", 2));
        let before = a.to_record();

        match a.process_node_join(&NodeJoin::new("Nobody", &record("B", 1)).unwrap()) {
            Err(Error::AttachTargetNotFound(username)) => assert_eq!(username, "Nobody"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(a.to_record(), before);
        assert_eq!(a.graph().len(), 2);
    }

    #[test]
    fn test_join_picks_first_match_in_dfs_order() {
        let mut a = node("A", 2);
        let first = a.graph.attach(Parent::Local, record("F", 2));
        let dup_second = a.graph.attach(Parent::Local, record("X", 2));
        let dup_first = a.graph.attach(Parent::Peer(first), record("X", 2));

        a.process_node_join(&NodeJoin::new("X", &record("B", 1)).unwrap()).unwrap();
        assert_eq!(usernames(&a, Parent::Peer(dup_first)), vec!["B"]);
        assert!(a.graph.connections(Parent::Peer(dup_second)).is_empty());
    }

    #[test]
    fn test_join_rejected_when_target_is_full() {
        let mut a = node("A", 1);
        a.process_node_join(&NodeJoin::new("A", &record("B", 1)).unwrap()).unwrap();
        match a.process_node_join(&NodeJoin::new("A", &record("C", 1)).unwrap()) {
            Err(Error::CapacityExceeded { username, capacity }) => {
                assert_eq!(username, "A");
                assert_eq!(capacity, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(usernames(&a, Parent::Local), vec!["B"]);

        // The capacity of a descendant comes from its own record.
        a.process_node_join(&NodeJoin::new("B", &record("D", 1)).unwrap()).unwrap();
        assert!(matches!(
            a.process_node_join(&NodeJoin::new("B", &record("E", 1)).unwrap()),
            Err(Error::CapacityExceeded { .. })
        ));
        assert_eq!(a.graph().len(), 2);
    }

    #[test]
    fn test_self_announcement_is_skipped() {
        let mut a = node("A", 2);
        let b = a.graph.attach(Parent::Local, record("B", 2));
        assert!(matches!(
            a.process_node_join(&NodeJoin::new("B", &record("A", 1)).unwrap()),
            Err(Error::SelfAnnouncement)
        ));
        assert!(a.graph.connections(Parent::Peer(b)).is_empty());
    }

    #[test]
    fn test_join_carrying_a_subtree() {
        let mut a = node("A", 2);
        let mut candidate = record("B", 2);
        candidate.connections.push(record("C", 2));
        let attached = a.process_node_join(&NodeJoin::new("A", &candidate).unwrap()).unwrap();
        assert_eq!(usernames(&a, Parent::Peer(attached.peer)), vec!["C"]);
        assert_eq!(a.graph().find("C").is_some(), true);
    }

    #[test]
    fn test_unknown_message_type() {
        let mut a = node("A", 2);
        let mut envelope = join_envelope("A", &record("B", 3));
        envelope.message_type = MessageType::Unknown(255);
        assert!(matches!(a.process_message(&envelope), Err(Error::UnknownMessageType(255))));
        assert!(a.connections().is_empty());
    }

    #[test]
    fn test_join_payload_under_wrong_tag() {
        let mut a = node("A", 2);
        let mut envelope = join_envelope("A", &record("B", 3));
        envelope.message_type = MessageType::QueryPublicIpAck;
        assert!(matches!(a.process_message(&envelope), Err(Error::Decode(_))));

        let wrapped = Envelope::wrap(&QueryPublicIp {}).unwrap();
        assert!(matches!(
            a.process_message(&wrapped),
            Err(Error::UnexpectedMessage(MessageType::QueryPublicIp))
        ));
        assert!(a.connections().is_empty());
    }

    #[test]
    fn test_undecodable_node_data() {
        let mut a = node("A", 2);
        let join = NodeJoin {
            existing_node_username: "A".to_owned(),
            node_data: RawValue::from_string("[1, 2, 3]".to_owned()).unwrap(),
        };
        assert!(matches!(a.process_node_join(&join), Err(Error::Decode(_))));
        assert!(a.connections().is_empty());
    }

    #[test]
    fn test_candidate_subtree_over_capacity_is_rejected() {
        let mut a = node("A", 2);
        let mut candidate = record("B", 1);
        for i in 0..5 {
            candidate.connections.push(record(&format!("C{}", i), 1));
        }
        match a.process_node_join(&NodeJoin::new("A", &candidate).unwrap()) {
            Err(Error::CapacityExceeded { username, capacity }) => {
                assert_eq!(username, "B");
                assert_eq!(capacity, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(a.graph().is_empty());

        // A violation deeper in the subtree rejects the whole candidate.
        let mut candidate = record("B", 2);
        let mut child = record("C", 1);
        child.connections.push(record("D", 1));
        child.connections.push(record("E", 1));
        candidate.connections.push(child);
        assert!(matches!(
            a.process_node_join(&NodeJoin::new("A", &candidate).unwrap()),
            Err(Error::CapacityExceeded { .. })
        ));
        assert!(a.graph().is_empty());
    }

    #[test]
    fn test_candidate_without_capacity_is_rejected() {
        let mut a = node("A", 2);
        assert!(matches!(
            a.process_node_join(&NodeJoin::new("A", &record("B", 0)).unwrap()),
            Err(Error::InvalidCapacity)
        ));

        // A missing capacity decodes as zero.
        let join = NodeJoin {
            existing_node_username: "A".to_owned(),
            node_data: RawValue::from_string(r#"{"Username":"B","IP":"10.0.0.2"}"#.to_owned()).unwrap(),
        };
        assert!(matches!(a.process_node_join(&join), Err(Error::InvalidCapacity)));

        let mut candidate = record("B", 2);
        candidate.connections.push(record("C", 0));
        assert!(matches!(
            a.process_node_join(&NodeJoin::new("A", &candidate).unwrap()),
            Err(Error::InvalidCapacity)
        ));
        assert!(a.graph().is_empty());
    }
}
