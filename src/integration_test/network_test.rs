use super::test_utils::*;
use crate::channel::send_envelope;
use crate::client::{self, Announce, Client, Oneshot};
use crate::message::{Envelope, MessageType, QueryPublicIp, QueryPublicIpAck};
use crate::node::{Node, NodeRecord, Parent};
use crate::server::bootstrap::{resolve_public_ip, IpSource};
use crate::Error;

use actix::Actor;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

fn usernames(node: &Node, parent: Parent) -> Vec<String> {
    node.graph()
        .connections(parent)
        .iter()
        .map(|id| node.graph().peer(*id).unwrap().username.clone())
        .collect()
}

#[actix_rt::test]
async fn test_join_over_the_wire() {
    let a = start("A", 2).await;
    client::announce_join(a.handle.local_addr(), "A", &record("B", 2), DELTA).await.unwrap();

    let stopped = a.stop("test is over").await;
    assert_eq!(stopped.cause, "test is over");
    assert_eq!(usernames(&stopped.node, Parent::Local), vec!["B"]);
}

#[actix_rt::test]
async fn test_join_below_known_peer() {
    let mut seed = NodeRecord::new("A", localhost(), 0, 2);
    seed.connections.push(record("C", 2));
    let a = start_node(Node::from_record(seed, 16).unwrap()).await;

    client::announce_join(a.handle.local_addr(), "C", &record("B", 2), DELTA).await.unwrap();
    a.settle().await;
    client::announce_join(a.handle.local_addr(), "B", &record("D", 2), DELTA).await.unwrap();

    let stopped = a.stop("test is over").await;
    let c = stopped.node.graph().find("C").unwrap();
    let b = stopped.node.graph().find("B").unwrap();
    assert_eq!(usernames(&stopped.node, Parent::Local), vec!["C"]);
    assert_eq!(usernames(&stopped.node, Parent::Peer(c)), vec!["B"]);
    assert_eq!(usernames(&stopped.node, Parent::Peer(b)), vec!["D"]);
}

#[actix_rt::test]
async fn test_unknown_target_is_dropped() {
    let a = start("A", 2).await;
    client::announce_join(a.handle.local_addr(), "Nobody", &record("B", 2), DELTA).await.unwrap();
    let stopped = a.stop("test is over").await;
    assert!(stopped.node.graph().is_empty());
}

#[actix_rt::test]
async fn test_public_ip_query() {
    let a = start("A", 2).await;
    let ip = client::query_public_ip(a.handle.local_addr(), DELTA).await.unwrap();
    assert_eq!(ip, localhost());

    let resolved = resolve_public_ip(&IpSource::Peer(a.handle.local_addr()), DELTA).await.unwrap();
    assert_eq!(resolved, localhost());

    let stopped = a.stop("test is over").await;
    assert!(stopped.node.graph().is_empty());
}

#[actix_rt::test]
async fn test_bad_input_is_not_fatal() {
    let a = start("A", 2).await;
    let address = a.handle.local_addr();

    // an unknown tag
    let mut unknown = Envelope::wrap(&QueryPublicIp {}).unwrap();
    unknown.message_type = MessageType::Unknown(200);
    client::send(address, &unknown, DELTA).await.unwrap();

    // a frame that is not JSON
    let mut socket = TcpStream::connect(address).await.unwrap();
    socket.write_u32(4).await.unwrap();
    socket.write_all(b"nope").await.unwrap();
    socket.shutdown().await.unwrap();

    // a frame cut short
    let mut socket = TcpStream::connect(address).await.unwrap();
    socket.write_u32(64).await.unwrap();
    socket.write_all(b"{").await.unwrap();
    socket.shutdown().await.unwrap();

    // a response type that never belongs on the queue
    let ack = Envelope::wrap(&QueryPublicIpAck { public_ip: localhost() }).unwrap();
    client::send(address, &ack, DELTA).await.unwrap();

    // an announcement of ourselves
    client::announce_join(address, "A", &record("A", 2), DELTA).await.unwrap();

    a.settle().await;
    client::announce_join(address, "A", &record("B", 2), DELTA).await.unwrap();

    let stopped = a.stop("test is over").await;
    assert_eq!(usernames(&stopped.node, Parent::Local), vec!["B"]);
}

#[actix_rt::test]
async fn test_capacity_is_enforced_over_the_wire() {
    let a = start("A", 1).await;
    client::announce_join(a.handle.local_addr(), "A", &record("B", 2), DELTA).await.unwrap();
    a.settle().await;
    client::announce_join(a.handle.local_addr(), "A", &record("C", 2), DELTA).await.unwrap();

    let stopped = a.stop("test is over").await;
    assert_eq!(usernames(&stopped.node, Parent::Local), vec!["B"]);
}

#[actix_rt::test]
async fn test_stopped_node_no_longer_listens() {
    let a = start("A", 2).await;
    let address = a.handle.local_addr();
    let shutdown = a.handle.shutdown();
    let stopped = a.stop("SIGINT has been sent to this node").await;
    assert_eq!(stopped.cause, "SIGINT has been sent to this node");
    assert!(shutdown.is_cancelled());

    let request = Envelope::wrap(&QueryPublicIp {}).unwrap();
    assert!(matches!(send_envelope(&address, &request, DELTA).await, Err(Error::Network(_))));
}

#[actix_rt::test]
async fn test_two_nodes_bootstrap() {
    // B learns its address from A, then announces itself below A.
    let a = start("A", 2).await;
    let ip = client::query_public_ip(a.handle.local_addr(), DELTA).await.unwrap();
    let b = start_node(Node::create("B", &ip.to_string(), 0, 2, 16).unwrap()).await;
    let mut b_record = NodeRecord::new("B", ip, b.handle.local_addr().port(), 2);
    client::announce_join(a.handle.local_addr(), "A", &b_record, DELTA).await.unwrap();

    // C joins below B, and both A and B hear about it.
    let c_record = record("C", 2);
    client::announce_join(b.handle.local_addr(), "B", &c_record, DELTA).await.unwrap();
    a.settle().await;
    client::announce_join(a.handle.local_addr(), "B", &c_record, DELTA).await.unwrap();

    let a_stopped = a.stop("test is over").await;
    let b_stopped = b.stop("test is over").await;

    b_record.connections.push(c_record.clone());
    assert_eq!(a_stopped.node.to_record().connections, vec![b_record]);
    assert_eq!(b_stopped.node.to_record().connections, vec![c_record]);
}

#[actix_rt::test]
async fn test_client_actor() {
    let a = start("A", 2).await;
    let address = a.handle.local_addr();
    let client = Client::new(DELTA).start();

    let request = Envelope::wrap(&QueryPublicIp {}).unwrap();
    let response = client.send(Oneshot { ip: address, envelope: request }).await.unwrap().unwrap();
    let ack: QueryPublicIpAck = response.extract_content().unwrap();
    assert_eq!(ack.public_ip, localhost());

    let announce =
        Announce { ip: address, existing_node_username: "A".to_owned(), node: record("B", 2) };
    client.send(announce).await.unwrap().unwrap();

    let stopped = a.stop("test is over").await;
    assert_eq!(usernames(&stopped.node, Parent::Local), vec!["B"]);
}
