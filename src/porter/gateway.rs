use super::{Error, RouterConfig};

use igd::SearchOptions;
use tracing::{debug, info};

use std::net::{IpAddr, Ipv4Addr};

pub struct Gateway {
    gw: igd::Gateway,
}

impl Gateway {
    /// Searches the local network for an IGD gateway. Blocks for up to the configured timeout.
    pub fn search(config: RouterConfig) -> Result<Gateway, Error> {
        let gw = igd::search_gateway(SearchOptions::from(config))?;
        debug!("found gateway at {}", gw.addr);
        Ok(Gateway { gw })
    }

    pub fn get_external_ip(&self) -> Result<Ipv4Addr, Error> {
        let ext_ip = self.gw.get_external_ip()?;

        Ok(ext_ip)
    }
}

/// Asks the local gateway for this host's external address, off the async executor.
pub async fn discover_public_ip(config: RouterConfig) -> Result<IpAddr, Error> {
    let lookup = tokio::task::spawn_blocking(move || {
        let gateway = Gateway::search(config)?;
        gateway.get_external_ip()
    });
    let ip = lookup.await.map_err(|err| Error::Task(err.to_string()))??;
    info!("gateway reports external address {}", ip);
    Ok(IpAddr::V4(ip))
}
