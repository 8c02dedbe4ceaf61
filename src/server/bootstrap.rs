use crate::client;
use crate::node::NodeRecord;
use crate::porter::{self, RouterConfig};
use crate::storage::{self, IdentityKey, IdentityStore};
use crate::{Error, Result};

use tokio::time::Duration;
use tracing::info;

use std::net::{IpAddr, SocketAddr};

/// Where a starting node learns its own public address from.
#[derive(Debug, Clone, PartialEq)]
pub enum IpSource {
    /// A statically assigned public address.
    Static(IpAddr),
    /// Ask a running peer which address our connection arrives from.
    Peer(SocketAddr),
    /// Ask the local UPnP gateway for its external address.
    Gateway(RouterConfig),
}

pub async fn resolve_public_ip(source: &IpSource, delta: Duration) -> Result<IpAddr> {
    let ip = match source {
        IpSource::Static(ip) => *ip,
        IpSource::Peer(address) => {
            info!("querying {} for our public IP", address);
            client::query_public_ip(*address, delta).await?
        }
        IpSource::Gateway(config) => {
            info!("using the local gateway to get our public IP");
            porter::discover_public_ip(*config).await?
        }
    };
    info!("public IP is {}", ip);
    Ok(ip)
}

/// Persists a brand new identity. An identity already stored under the same key is never
/// overwritten.
pub fn create_identity<S: IdentityStore>(store: &S, record: NodeRecord) -> Result<NodeRecord> {
    let key = IdentityKey::of(&record);
    if store.contains_identity(&key)? {
        return Err(storage::Error::AlreadyExists(key.to_string()).into());
    }
    store.save_identity(&record)?;
    info!("saved new identity {}", key);
    Ok(record)
}

pub fn load_identity<S: IdentityStore>(store: &S, key: &IdentityKey) -> Result<NodeRecord> {
    info!("trying to get existent user: {} with network: {}", key.username, key.network_name);
    Ok(store.load_identity(key)?)
}

/// Start-up values given explicitly, layered over an identity loaded from the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityOverrides {
    pub ip: Option<IpAddr>,
    pub port: Option<u16>,
    pub connections_capacity: Option<u16>,
}

impl IdentityOverrides {
    /// Nothing is changed unless every override is valid for the loaded tree.
    pub fn apply(&self, record: &mut NodeRecord) -> Result<()> {
        if let Some(capacity) = self.connections_capacity {
            if capacity < 1 {
                return Err(Error::InvalidCapacity);
            }
            if record.connections.len() > capacity as usize {
                return Err(Error::CapacityExceeded { username: record.username.clone(), capacity });
            }
        }

        if let Some(ip) = self.ip {
            record.ip = ip;
        }
        if let Some(port) = self.port {
            if port != record.port {
                info!("listening port of {} changed from {} to {}", record.username, record.port, port);
            }
            record.port = port;
        }
        if let Some(capacity) = self.connections_capacity {
            if capacity != record.connections_capacity {
                info!(
                    "connection capacity of {} changed from {} to {}",
                    record.username, record.connections_capacity, capacity
                );
            }
            record.connections_capacity = capacity;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SledIdentityStore;

    #[actix_rt::test]
    async fn test_static_ip() {
        let ip: IpAddr = "203.0.113.9".parse().unwrap();
        assert_eq!(resolve_public_ip(&IpSource::Static(ip), Duration::from_secs(1)).await.unwrap(), ip);
    }

    #[test]
    fn test_create_never_overwrites() {
        let store = SledIdentityStore::temporary().unwrap();
        let record = NodeRecord::new("alice", "10.0.0.1".parse().unwrap(), 8080, 2).with_network("main");
        create_identity(&store, record.clone()).unwrap();

        let mut other = record.clone();
        other.port = 9999;
        match create_identity(&store, other) {
            Err(Error::Storage(storage::Error::AlreadyExists(key))) => assert_eq!(key, "alice_main"),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(load_identity(&store, &IdentityKey::new("alice", "main")).unwrap(), record);
    }

    #[test]
    fn test_load_missing_identity() {
        let store = SledIdentityStore::temporary().unwrap();
        assert!(matches!(
            load_identity(&store, &IdentityKey::new("alice", "main")),
            Err(Error::Storage(storage::Error::NotFound(_)))
        ));
    }

    #[test]
    fn test_overrides_apply_to_loaded_identity() {
        let store = SledIdentityStore::temporary().unwrap();
        let mut record = NodeRecord::new("alice", "10.0.0.1".parse().unwrap(), 8080, 2).with_network("main");
        record.connections.push(NodeRecord::new("bob", "10.0.0.2".parse().unwrap(), 8080, 2));
        create_identity(&store, record.clone()).unwrap();

        let mut loaded = load_identity(&store, &IdentityKey::new("alice", "main")).unwrap();
        IdentityOverrides::default().apply(&mut loaded).unwrap();
        assert_eq!(loaded, record);

        let overrides = IdentityOverrides {
            ip: Some("203.0.113.9".parse().unwrap()),
            port: Some(9090),
            connections_capacity: Some(5),
        };
        overrides.apply(&mut loaded).unwrap();
        assert_eq!(loaded.address(), "203.0.113.9:9090".parse().unwrap());
        assert_eq!(loaded.connections_capacity, 5);
        assert_eq!(loaded.connections, record.connections);
    }

    #[test]
    fn test_invalid_capacity_override_leaves_identity_unchanged() {
        let mut record = NodeRecord::new("alice", "10.0.0.1".parse().unwrap(), 8080, 2);
        record.connections.push(NodeRecord::new("bob", "10.0.0.2".parse().unwrap(), 8080, 2));
        record.connections.push(NodeRecord::new("carol", "10.0.0.3".parse().unwrap(), 8080, 2));
        let before = record.clone();

        let shrink = IdentityOverrides { port: Some(9090), connections_capacity: Some(1), ..Default::default() };
        assert!(matches!(shrink.apply(&mut record), Err(Error::CapacityExceeded { capacity: 1, .. })));
        let zero = IdentityOverrides { connections_capacity: Some(0), ..Default::default() };
        assert!(matches!(zero.apply(&mut record), Err(Error::InvalidCapacity)));
        assert_eq!(record, before);
    }
}
