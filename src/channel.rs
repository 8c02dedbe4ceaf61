//! Length-prefixed transport for [Envelope]s.
//!
//! Each frame is a 4-byte big-endian length followed by exactly that many bytes of JSON.
//! A frame cut short by the peer is a [Error::Framing] failure; a complete frame that is not
//! a valid envelope is a [Error::Decode] failure.
use crate::message::Envelope;
use crate::{Error, Result};

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::trace;

use std::net::SocketAddr;

/// Largest frame accepted from a peer.
pub const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

fn codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .length_field_length(4)
        .big_endian()
        .max_frame_length(MAX_FRAME_LENGTH)
        .new_codec()
}

pub struct Channel {
    framed: Framed<TcpStream, LengthDelimitedCodec>,
    peer: SocketAddr,
}

impl Channel {
    /// Connects to `address`, giving up after `delta`.
    pub async fn connect(address: &SocketAddr, delta: Duration) -> Result<Channel> {
        match timeout(delta, TcpStream::connect(address)).await {
            Ok(Ok(socket)) => Channel::wrap(socket),
            Ok(Err(err)) => Err(Error::Network(format!("connecting to {}: {}", address, err))),
            Err(_) => Err(Error::Network(format!("connecting to {}: timed out", address))),
        }
    }

    pub async fn accept(listener: &TcpListener) -> Result<Channel> {
        let (socket, _) = listener.accept().await?;
        Channel::wrap(socket)
    }

    pub fn wrap(socket: TcpStream) -> Result<Channel> {
        let peer = socket.peer_addr()?;
        Ok(Channel { framed: Framed::new(socket, codec()), peer })
    }

    /// The remote address of the connection.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub async fn send(&mut self, envelope: &Envelope) -> Result<()> {
        let bytes = envelope.to_bytes()?;
        let len = bytes.len();
        self.framed
            .send(Bytes::from(bytes))
            .await
            .map_err(|err| Error::Network(format!("sending to {}: {}", self.peer, err)))?;
        trace!("sent {} bytes to {}", len + 4, self.peer);
        Ok(())
    }

    /// Reads exactly one frame and decodes it.
    pub async fn recv(&mut self) -> Result<Envelope> {
        match self.framed.next().await {
            Some(Ok(frame)) => Envelope::from_bytes(&frame),
            Some(Err(err)) => Err(Error::Framing(err.to_string())),
            None => Err(Error::Framing(format!("{} closed the connection before sending a frame", self.peer))),
        }
    }

    pub async fn recv_timeout(&mut self, delta: Duration) -> Result<Envelope> {
        match timeout(delta, self.recv()).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout),
        }
    }
}

/// Opens a connection to `address` and sends a single envelope on it.
///
/// The channel is handed back so that a response can be awaited on the same connection;
/// dropping it closes the connection.
pub async fn send_envelope(address: &SocketAddr, envelope: &Envelope, delta: Duration) -> Result<Channel> {
    let mut channel = Channel::connect(address, delta).await?;
    let () = channel.send(envelope).await?;
    Ok(channel)
}
