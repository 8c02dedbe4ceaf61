//! Best-effort public IP discovery through the local UPnP/IGD gateway.
mod gateway;

pub use gateway::{discover_public_ip, Gateway};

use igd::SearchOptions;

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

#[derive(Debug)]
pub enum Error {
    GatewayRetrieve(igd::SearchError),
    ExternalIpRetrieve(igd::GetExternalIpError),
    /// The blocking gateway lookup did not run to completion
    Task(String),
}

impl std::convert::From<igd::SearchError> for Error {
    fn from(error: igd::SearchError) -> Error {
        Error::GatewayRetrieve(error)
    }
}

impl std::convert::From<igd::GetExternalIpError> for Error {
    fn from(error: igd::GetExternalIpError) -> Error {
        Error::ExternalIpRetrieve(error)
    }
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Contains the parameters for the IGD gateway search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterConfig {
    /// Bind address for UDP socket (defaults to all `0.0.0.0`)
    pub bind_addr: SocketAddrV4,
    /// Broadcast address for network discovery (defaults to '239.255.255.250:1900')
    pub broadcast_addr: SocketAddrV4,
    /// Timeout for gateway search
    pub search_timeout: Option<Duration>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0),
            broadcast_addr: SocketAddrV4::new(Ipv4Addr::new(239, 255, 255, 250), 1900),
            search_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl RouterConfig {
    pub fn with_timeout(mut self, search_timeout: Duration) -> Self {
        self.search_timeout = Some(search_timeout);
        self
    }
}

impl From<RouterConfig> for SearchOptions {
    fn from(options: RouterConfig) -> SearchOptions {
        SearchOptions {
            bind_addr: options.bind_addr.into(),
            broadcast_address: options.broadcast_addr.into(),
            timeout: options.search_timeout,
        }
    }
}
