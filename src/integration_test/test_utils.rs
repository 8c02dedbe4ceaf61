use crate::message::Envelope;
use crate::node::{Node, NodeRecord};
use crate::queue::Queue;
use crate::server::node::{self, NodeHandle};
use crate::server::{Shutdown, Stopped};

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

pub const DELTA: Duration = Duration::from_secs(2);

/// A node listening on an ephemeral local port.
pub struct TestNode {
    pub handle: NodeHandle,
    pub queue: Arc<Queue<Envelope>>,
}

pub fn localhost() -> IpAddr {
    "127.0.0.1".parse().unwrap()
}

pub fn record(username: &str, capacity: u16) -> NodeRecord {
    NodeRecord::new(username, localhost(), 0, capacity)
}

pub async fn start_node(node: Node) -> TestNode {
    let queue = node.queue();
    let handle = node::start(node, localhost(), DELTA, Shutdown::new()).await.unwrap();
    TestNode { handle, queue }
}

pub async fn start(username: &str, capacity: u16) -> TestNode {
    start_node(Node::create(username, "127.0.0.1", 0, capacity, 16).unwrap()).await
}

impl TestNode {
    /// Gives in-flight connections time to reach the queue, then waits for the dispatcher
    /// to drain it.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(100)).await;
        for _ in 0..200 {
            if self.queue.is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("queue was never drained");
    }

    pub async fn stop(self, cause: &str) -> Stopped {
        self.settle().await;
        self.handle.stop(cause);
        tokio::time::timeout(DELTA, self.handle.stopped()).await.unwrap().unwrap()
    }
}
