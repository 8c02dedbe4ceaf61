use super::Shutdown;
use crate::channel::Channel;
use crate::message::{Envelope, MessageType, QueryPublicIp, QueryPublicIpAck};
use crate::queue::Queue;
use crate::Result;

use tokio::net::TcpListener;
use tokio::time::Duration;
use tracing::{debug, info, info_span, warn};
use tracing_futures::Instrument;

use std::net::SocketAddr;
use std::sync::Arc;

/// Accepts inbound connections and hands each one a single receive.
pub struct Server {
    listener: TcpListener,
    /// The inbox of the node this server listens for.
    queue: Arc<Queue<Envelope>>,
    receive_timeout: Duration,
    shutdown: Shutdown,
}

impl Server {
    pub async fn bind(
        ip: SocketAddr,
        queue: Arc<Queue<Envelope>>,
        receive_timeout: Duration,
        shutdown: Shutdown,
    ) -> Result<Server> {
        let listener = TcpListener::bind(ip).await?;
        Ok(Server { listener, queue, receive_timeout, shutdown })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop until the shutdown signal is raised. Accept failures are logged
    /// and never end the loop, but consecutive ones slow it down.
    pub async fn listen(self) -> Result<()> {
        info!("listening on {:?}", self.listener.local_addr()?);
        let mut backoff = AcceptBackoff::default();
        loop {
            let accepted = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                accepted = Channel::accept(&self.listener) => accepted,
            };
            match accepted {
                Ok(channel) => {
                    backoff.reset();
                    let span = info_span!("receive", peer = %channel.peer_addr());
                    let queue = self.queue.clone();
                    tokio::spawn(receive(channel, queue, self.receive_timeout).instrument(span));
                }
                Err(err) => {
                    let delay = backoff.next_delay();
                    warn!("failed to accept connection, retrying in {:?}: {}", delay, err);
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => (),
                    }
                }
            }
        }
        info!("listener stopped");
        Ok(())
    }
}

/// Delay between accept attempts after a failure, doubling up to a cap while failures persist.
#[derive(Debug)]
struct AcceptBackoff {
    initial: Duration,
    max: Duration,
    current: Option<Duration>,
}

impl Default for AcceptBackoff {
    fn default() -> Self {
        AcceptBackoff { initial: Duration::from_millis(5), max: Duration::from_secs(1), current: None }
    }
}

impl AcceptBackoff {
    fn next_delay(&mut self) -> Duration {
        let delay = match self.current {
            Some(current) => (current * 2).min(self.max),
            None => self.initial,
        };
        self.current = Some(delay);
        delay
    }

    fn reset(&mut self) {
        self.current = None;
    }
}

/// Receives exactly one envelope. IP queries are answered on the same connection, anything
/// else is queued for the dispatcher. Every failure is contained to this connection.
async fn receive(mut channel: Channel, queue: Arc<Queue<Envelope>>, receive_timeout: Duration) {
    let envelope = match channel.recv_timeout(receive_timeout).await {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!("dropping connection: {}", err);
            return;
        }
    };
    debug!("received {}", envelope.message_type);

    if envelope.message_type == MessageType::QueryPublicIp {
        if let Err(err) = reply_public_ip(&mut channel, &envelope).await {
            warn!("could not answer public IP query: {}", err);
        }
        return;
    }

    match queue.add(envelope) {
        Ok(()) => (),
        Err(err) => warn!("dropping message: {}", err),
    }
}

async fn reply_public_ip(channel: &mut Channel, envelope: &Envelope) -> Result<()> {
    let QueryPublicIp {} = envelope.extract_content()?;
    let ack = QueryPublicIpAck { public_ip: channel.peer_addr().ip() };
    channel.send(&Envelope::wrap(&ack)?).await
}
