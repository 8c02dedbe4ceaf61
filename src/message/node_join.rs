//! The join announcement: a new peer has attached to an existing one.
use super::{MessageType, Payload};
use crate::node::NodeRecord;
use crate::{Error, Result};

use serde_json::value::RawValue;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeJoin {
    /// The username of the peer the new node attached to.
    #[serde(rename = "ExistingNodeUsername")]
    pub existing_node_username: String,
    /// The serialized [NodeRecord] of the new node, carried inline as JSON.
    #[serde(rename = "NodeData")]
    pub node_data: Box<RawValue>,
}

impl Payload for NodeJoin {
    const TYPE: MessageType = MessageType::NodeJoin;
}

impl NodeJoin {
    pub fn new(existing_node_username: impl Into<String>, node: &NodeRecord) -> Result<Self> {
        let node_data =
            serde_json::value::to_raw_value(node).map_err(|err| Error::Encode(err.to_string()))?;
        Ok(NodeJoin { existing_node_username: existing_node_username.into(), node_data })
    }

    /// Deserializes the announced node.
    pub fn node_record(&self) -> Result<NodeRecord> {
        serde_json::from_str(self.node_data.get()).map_err(|err| Error::Decode(err.to_string()))
    }
}
