use super::Shutdown;
use crate::message::Envelope;
use crate::node::Node;
use crate::queue::Queue;
use crate::Error;

use tracing::{debug, info, warn};

use std::sync::Arc;

/// How a node's dispatcher ended: the cancellation cause and the node as it was left.
#[derive(Debug)]
pub struct Stopped {
    pub cause: String,
    pub node: Node,
}

/// The single writer of a node's peer tree.
///
/// Waits for the queue's wake signal, then drains the queue completely before waiting again.
/// Cancellation is checked first whenever the dispatcher is waiting, and never in the middle
/// of a drain pass.
pub struct Dispatcher {
    node: Node,
    queue: Arc<Queue<Envelope>>,
    shutdown: Shutdown,
}

impl Dispatcher {
    pub fn new(node: Node, shutdown: Shutdown) -> Dispatcher {
        let queue = node.queue();
        Dispatcher { node, queue, shutdown }
    }

    /// Runs until the shutdown signal is raised, then hands the node back exactly once.
    ///
    /// Envelopes still queued when cancellation is observed stay in the queue and are never
    /// applied to the returned node. A drain pass that has already started always completes.
    pub async fn run(mut self) -> Stopped {
        info!("dispatcher started for {}", self.node.username());
        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = self.queue.notified() => {
                    let processed = self.drain();
                    debug!("drained {} message(s)", processed);
                }
            }
        }
        let cause = self.shutdown.cause().unwrap_or_else(|| "cancelled".to_owned());
        info!("dispatcher for {} stopped: {}", self.node.username(), cause);
        Stopped { cause, node: self.node }
    }

    /// Processes queued envelopes until the queue reports empty. Returns how many were taken.
    pub fn drain(&mut self) -> usize {
        let mut processed = 0;
        while let Some(envelope) = self.queue.get_next() {
            processed += 1;
            match self.node.process_message(&envelope) {
                Ok(_) => (),
                Err(Error::AttachTargetNotFound(username)) => {
                    debug!("no known peer named {}, dropping join announcement", username)
                }
                Err(Error::SelfAnnouncement) => (),
                Err(err) => warn!("discarding {} message: {}", envelope.message_type, err),
            }
        }
        processed
    }
}
