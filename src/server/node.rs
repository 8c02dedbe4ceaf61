use super::{Dispatcher, Server, Shutdown, Stopped};
use crate::node::Node;
use crate::{Error, Result};

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

use std::net::{IpAddr, SocketAddr};

/// A running node: its listener and its dispatcher.
pub struct NodeHandle {
    local_addr: SocketAddr,
    shutdown: Shutdown,
    stopped: oneshot::Receiver<Stopped>,
    listener: JoinHandle<Result<()>>,
}

/// Binds the listener on `listener_ip` and the node's port, then starts the dispatcher.
///
/// Both stop when `shutdown` is raised. The node is handed back through
/// [NodeHandle::stopped] once the dispatcher has terminated.
pub async fn start(
    node: Node,
    listener_ip: IpAddr,
    receive_timeout: Duration,
    shutdown: Shutdown,
) -> Result<NodeHandle> {
    let username = node.username().to_owned();
    let address = SocketAddr::new(listener_ip, node.port());
    let server = Server::bind(address, node.queue(), receive_timeout, shutdown.clone()).await?;
    let local_addr = server.local_addr()?;
    info!("node {} is starting on {}", username, local_addr);

    let listener = tokio::spawn(server.listen().instrument(info_span!("listener", node = %username)));

    let (stop_tx, stop_rx) = oneshot::channel();
    let dispatcher = Dispatcher::new(node, shutdown.clone());
    tokio::spawn(
        async move {
            let stopped = dispatcher.run().await;
            if stop_tx.send(stopped).is_err() {
                debug!("nobody is waiting for the stop signal");
            }
        }
        .instrument(info_span!("dispatcher", node = %username)),
    );

    Ok(NodeHandle { local_addr, shutdown, stopped: stop_rx, listener })
}

impl NodeHandle {
    /// The address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.clone()
    }

    pub fn stop(&self, cause: impl Into<String>) {
        self.shutdown.cancel(cause)
    }

    /// Waits for the node to terminate. Resolves once, when the dispatcher has stopped and
    /// the listener has closed.
    pub async fn stopped(self) -> Result<Stopped> {
        let stopped = self.stopped.await.map_err(|_| Error::DispatcherGone)?;
        match self.listener.await {
            Ok(Ok(())) => (),
            Ok(Err(err)) => warn!("listener failed: {}", err),
            Err(err) => warn!("listener task failed: {}", err),
        }
        Ok(stopped)
    }
}
