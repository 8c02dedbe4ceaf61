use crate::channel::send_envelope;
use crate::message::{Envelope, NodeJoin, QueryPublicIp, QueryPublicIpAck};
use crate::node::NodeRecord;
use crate::Result;
use tracing::debug;

use actix::{Actor, Context, Handler, ResponseFuture};
use actix_derive::Message;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Outbound connections to other peers, bounded by a single timeout.
pub struct Client {
    delta: Duration,
}

impl Client {
    pub fn new(delta: Duration) -> Client {
        Client { delta }
    }
}

impl Actor for Client {
    type Context = Context<Self>;

    fn started(&mut self, _ctx: &mut Context<Self>) {
        debug!("started client");
    }
}

/// Sends a single envelope and waits for a response on the same connection.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<Envelope>")]
pub struct Oneshot {
    pub ip: SocketAddr,
    pub envelope: Envelope,
}

impl Handler<Oneshot> for Client {
    type Result = ResponseFuture<Result<Envelope>>;

    fn handle(&mut self, msg: Oneshot, _ctx: &mut Context<Self>) -> Self::Result {
        let delta = self.delta;
        Box::pin(async move { oneshot(msg.ip, &msg.envelope, delta).await })
    }
}

/// Announces to the peer at `ip` that `node` has attached below `existing_node_username`.
#[derive(Debug, Clone, Message)]
#[rtype(result = "Result<()>")]
pub struct Announce {
    pub ip: SocketAddr,
    pub existing_node_username: String,
    pub node: NodeRecord,
}

impl Handler<Announce> for Client {
    type Result = ResponseFuture<Result<()>>;

    fn handle(&mut self, msg: Announce, _ctx: &mut Context<Self>) -> Self::Result {
        let delta = self.delta;
        Box::pin(async move { announce_join(msg.ip, &msg.existing_node_username, &msg.node, delta).await })
    }
}

pub async fn oneshot(ip: SocketAddr, envelope: &Envelope, delta: Duration) -> Result<Envelope> {
    // send a message to a peer
    let mut channel = send_envelope(&ip, envelope, delta).await?;
    // await a response, then close the connection by dropping the channel
    let response = channel.recv_timeout(delta).await?;
    debug!("<-- {} from {}", response.message_type, ip);
    Ok(response)
}

/// Sends a single envelope without waiting for anything in return.
pub async fn send(ip: SocketAddr, envelope: &Envelope, delta: Duration) -> Result<()> {
    let _channel = send_envelope(&ip, envelope, delta).await?;
    Ok(())
}

/// Asks the peer at `ip` which address our connection arrives from.
pub async fn query_public_ip(ip: SocketAddr, delta: Duration) -> Result<IpAddr> {
    let request = Envelope::wrap(&QueryPublicIp {})?;
    let response = oneshot(ip, &request, delta).await?;
    let ack: QueryPublicIpAck = response.extract_content()?;
    Ok(ack.public_ip)
}

pub async fn announce_join(
    ip: SocketAddr,
    existing_node_username: &str,
    node: &NodeRecord,
    delta: Duration,
) -> Result<()> {
    let envelope = Envelope::wrap(&NodeJoin::new(existing_node_username, node)?)?;
    send(ip, &envelope, delta).await
}
