use tracing::{info, warn};
use tracing_subscriber;

use clap::{value_t, App, Arg, ArgMatches};

use overlay_node::client;
use overlay_node::node::{Node, NodeRecord};
use overlay_node::porter::RouterConfig;
use overlay_node::server::bootstrap::{self, IdentityOverrides, IpSource};
use overlay_node::server::{node, Settings, Shutdown};
use overlay_node::storage::{IdentityKey, IdentityStore, SledIdentityStore};
use overlay_node::{Error, Result};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_level(false)
        .with_target(false)
        .without_time()
        .compact()
        .with_max_level(tracing::Level::INFO)
        .init();

    let matches = App::new("overlay-node")
        .version("0.1")
        .about("Runs a node of the overlay network")
        .arg(
            Arg::with_name("user")
                .short("u")
                .long("user")
                .value_name("USERNAME")
                .help("The username of the node - unique for each node in each network")
                .takes_value(true)
                .required(true),
        )
        .arg(
            Arg::with_name("network")
                .short("n")
                .long("network")
                .value_name("NETWORK")
                .help("The name of the network the node belongs to")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("depth-vision")
                .short("d")
                .long("depth-vision")
                .value_name("DEPTH")
                .help("How many layers of nodes this node can see past its primary connections")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("ip")
                .long("ip")
                .value_name("IP")
                .help("The static public IP of this node")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("conn-ip")
                .long("conn-ip")
                .value_name("IP")
                .help("The public IP of the node to connect to")
                .takes_value(true)
                .requires("conn-port"),
        )
        .arg(
            Arg::with_name("conn-port")
                .long("conn-port")
                .value_name("PORT")
                .help("The port of the node to connect to")
                .takes_value(true)
                .requires("conn-ip"),
        )
        .arg(
            Arg::with_name("upnp")
                .long("upnp")
                .help("Ask the local UPnP gateway for the public IP"),
        )
        .arg(
            Arg::with_name("listener-ip")
                .short("a")
                .long("listener-ip")
                .value_name("LISTENER_IP")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("port")
                .short("p")
                .long("port")
                .value_name("PORT")
                .help("The port used to listen for incoming messages")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("conn-cap")
                .long("conn-cap")
                .value_name("CAPACITY")
                .help("The number of primary connections this node will store")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("msg-cap")
                .long("msg-cap")
                .value_name("CAPACITY")
                .help("The number of messages the queue can hold")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("new")
                .long("new")
                .help("Create a new node - an existing node is never overwritten"),
        )
        .arg(
            Arg::with_name("join-user")
                .long("join-user")
                .value_name("USERNAME")
                .help("Announce this node to the contact node as attached below USERNAME")
                .takes_value(true)
                .requires("conn-ip"),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("FILE")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("data-dir")
                .long("data-dir")
                .value_name("DIR")
                .takes_value(true),
        )
        .get_matches();

    let settings = settings(&matches)?;

    let sys = actix::System::new();
    sys.block_on(run(matches, settings))
}

/// Layers the command line over the settings file and environment.
fn settings(matches: &ArgMatches) -> Result<Settings> {
    let mut settings = Settings::new(matches.value_of("config").map(Path::new))?;
    if let Some(listener_ip) = matches.value_of("listener-ip") {
        settings.listener_ip = listener_ip.to_owned();
    }
    if matches.is_present("port") {
        settings.port = value_t!(matches, "port", u16).unwrap_or_else(|e| e.exit());
    }
    if matches.is_present("conn-cap") {
        settings.connections_capacity = value_t!(matches, "conn-cap", u16).unwrap_or_else(|e| e.exit());
    }
    if matches.is_present("msg-cap") {
        settings.queue_capacity = value_t!(matches, "msg-cap", u16).unwrap_or_else(|e| e.exit());
    }
    if matches.is_present("depth-vision") {
        settings.depth_vision = value_t!(matches, "depth-vision", u8).unwrap_or_else(|e| e.exit());
    }
    if let Some(network) = matches.value_of("network") {
        settings.network = network.to_owned();
    }
    if let Some(data_dir) = matches.value_of("data-dir") {
        settings.data_dir = Some(PathBuf::from(data_dir));
    }
    Ok(settings)
}

fn contact(matches: &ArgMatches) -> Option<SocketAddr> {
    if !matches.is_present("conn-ip") {
        return None;
    }
    let ip = value_t!(matches, "conn-ip", std::net::IpAddr).unwrap_or_else(|e| e.exit());
    let port = value_t!(matches, "conn-port", u16).unwrap_or_else(|e| e.exit());
    Some(SocketAddr::new(ip, port))
}

fn ip_source(matches: &ArgMatches) -> Option<IpSource> {
    if matches.is_present("upnp") {
        Some(IpSource::Gateway(RouterConfig::default()))
    } else if let Some(address) = contact(matches) {
        Some(IpSource::Peer(address))
    } else if matches.is_present("ip") {
        Some(IpSource::Static(value_t!(matches, "ip", std::net::IpAddr).unwrap_or_else(|e| e.exit())))
    } else {
        None
    }
}

async fn run(matches: ArgMatches<'static>, settings: Settings) -> Result<()> {
    let username = matches.value_of("user").unwrap_or_default().to_owned();
    let data_dir = settings.data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let store = SledIdentityStore::open(&data_dir)?;

    let public_ip = match ip_source(&matches) {
        Some(source) => Some(bootstrap::resolve_public_ip(&source, settings.send_timeout()).await?),
        None => None,
    };

    let record = if matches.is_present("new") {
        let ip = match public_ip {
            Some(ip) => ip,
            None => {
                warn!("insufficient information to get the public IP, use --ip, --conn-ip or --upnp");
                return Err(Error::PublicIpUnavailable);
            }
        };
        let record = NodeRecord::new(username, ip, settings.port, settings.connections_capacity)
            .with_network(settings.network.clone());
        bootstrap::create_identity(&store, record)?
    } else {
        let mut record =
            bootstrap::load_identity(&store, &IdentityKey::new(username, settings.network.clone()))?;
        let overrides = IdentityOverrides {
            ip: public_ip,
            port: matches.is_present("port").then(|| settings.port),
            connections_capacity: matches.is_present("conn-cap").then(|| settings.connections_capacity),
        };
        overrides.apply(&mut record)?;
        record
    };

    let node = Node::from_record(record, settings.queue_capacity)?.with_depth(settings.depth_vision);
    let announcement = node.identity().to_record(vec![]);
    let shutdown = Shutdown::new();
    let handle =
        node::start(node, settings.listener_ip()?, settings.receive_timeout(), shutdown.clone()).await?;

    if let (Some(existing), Some(address)) = (matches.value_of("join-user"), contact(&matches)) {
        match client::announce_join(address, existing, &announcement, settings.send_timeout()).await {
            Ok(()) => info!("announced ourselves to {} below {}", address, existing),
            Err(err) => warn!("could not announce ourselves to {}: {}", address, err),
        }
    }

    tokio::select! {
        sig = wait_for_signal() => shutdown.cancel(format!("{} has been sent to this node", sig?)),
        _ = shutdown.cancelled() => (),
    }

    let stopped = handle.stopped().await?;
    info!("node stopped - reason: {}", stopped.cause);

    store.save_identity(&stopped.node.to_record())?;
    println!("{}", stopped.node);

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() -> Result<&'static str> {
    use futures::future::FutureExt;
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(futures::select! {
        _ = sigint.recv().fuse() => "SIGINT",
        _ = sigterm.recv().fuse() => "SIGTERM"
    })
}

#[cfg(not(unix))]
async fn wait_for_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl+C")
}
