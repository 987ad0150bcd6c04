//! MUD world server entry point.
//!
//! Hosts one world on a TCP listener.  The world is either created fresh from
//! the three positional arguments or restored from a snapshot file.
//!
//! # Usage
//!
//! ```text
//! mud-server [OPTIONS] <WORLD> <ENTRANCE> <DESCRIPTION>
//! mud-server [OPTIONS] --restore <FILE>
//!
//! Options:
//!   --config    <FILE>  Config file [default: platform config dir]
//!   --bind      <ADDR>  Listen address [default: 0.0.0.0]
//!   --port      <PORT>  Listen port [default: 24900]
//!   --advertise <HOST>  Host name handed out in place addresses
//!   --password  <PW>    Password required by remote `dump` requests
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ load ServerConfig (TOML) and apply CLI overrides
//!  ├─ RpcServer::bind(WorldDirectory)
//!  ├─ MudServer::create / MudServer::restore_from
//!  ├─ serve until Ctrl-C
//!  └─ autosave snapshot (if configured)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use mud_rpc::RpcServer;
use mud_server::application::world::{MudServer, WorldServices, WorldSettings};
use mud_server::infrastructure::network::dispatcher::WorldDirectory;
use mud_server::infrastructure::network::remote_person::RpcPersonConnector;
use mud_server::infrastructure::network::remote_world::RpcWorldLink;
use mud_server::infrastructure::storage::config::{load_config, ServerConfig};
use mud_server::infrastructure::storage::snapshot::GzipSnapshotStore;

#[derive(Debug, Parser)]
#[command(name = "mud-server", about = "World server for the distributed MUD", version)]
struct Cli {
    /// Path to `server.toml`.  Defaults to the platform config directory.
    #[arg(long, value_name = "FILE", env = "MUD_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.
    #[arg(long, env = "MUD_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.  0 lets the OS choose.
    #[arg(long, env = "MUD_PORT")]
    port: Option<u16>,

    /// Host name other machines use to reach this server.
    #[arg(long, env = "MUD_ADVERTISE")]
    advertise: Option<String>,

    /// Password for remote `dump` requests on a fresh world.
    #[arg(long, env = "MUD_PASSWORD")]
    password: Option<String>,

    /// Restore the world from a snapshot instead of creating it.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["world", "entrance", "description"])]
    restore: Option<PathBuf>,

    /// Name of the new world.
    #[arg(required_unless_present = "restore")]
    world: Option<String>,

    /// Name of the entrance place.
    #[arg(required_unless_present = "restore")]
    entrance: Option<String>,

    /// Description of the entrance place.
    #[arg(required_unless_present = "restore")]
    description: Option<String>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(bind) = &self.bind {
            config.network.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        if let Some(host) = &self.advertise {
            config.network.advertise_host = Some(host.clone());
        }
    }

    fn world_settings(&self) -> Option<WorldSettings> {
        Some(WorldSettings {
            name: self.world.clone()?,
            password: self.password.clone(),
            entrance: self.entrance.clone()?,
            description: self.description.clone()?,
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);

    // `RUST_LOG` wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    // ── Listener ──────────────────────────────────────────────────────────────
    let directory = Arc::new(WorldDirectory::new());
    let listen_addr = config.network.listen_addr();
    let server = RpcServer::bind(&listen_addr, Arc::clone(&directory) as Arc<dyn mud_rpc::Binder>)
        .await
        .with_context(|| format!("cannot listen on {listen_addr}"))?;
    let port = server.local_addr()?.port();
    let host = format!("{}:{port}", config.network.advertised_host());

    // ── World ─────────────────────────────────────────────────────────────────
    let options = config.rpc.options();
    let services = WorldServices {
        host: host.clone(),
        persons: Arc::new(RpcPersonConnector::new(&host, options)),
        link: Arc::new(RpcWorldLink::new(&host, options)),
        store: Arc::new(GzipSnapshotStore::new()),
        delivery_timeout: config.broadcast.delivery_timeout(),
    };

    let world = match (&cli.restore, cli.world_settings()) {
        (Some(path), _) => {
            if cli.password.is_some() {
                warn!("--password is ignored when restoring; the snapshot's password applies");
            }
            MudServer::restore_from(path, services)
                .await
                .with_context(|| format!("cannot restore world from {}", path.display()))?
        }
        (None, Some(settings)) => MudServer::create(settings, services)
            .await
            .context("cannot create world")?,
        (None, None) => {
            bail!("either --restore <FILE> or <WORLD> <ENTRANCE> <DESCRIPTION> is required")
        }
    };
    let world = Arc::new(world);
    directory.insert(Arc::clone(&world));

    // ── Serve until Ctrl-C ────────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let listener = server.spawn(shutdown_rx);
    info!(
        "world '{}' ready at {host}, entrance '{}'.  Press Ctrl-C to exit.",
        world.name(),
        world.entrance().name()
    );

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => error!("failed to listen for Ctrl-C signal: {e}"),
    }
    let _ = shutdown_tx.send(true);
    if let Err(e) = listener.await {
        warn!("listener task ended abnormally: {e}");
    }

    // ── Autosave ──────────────────────────────────────────────────────────────
    if let Some(path) = &config.snapshot.autosave_path {
        world
            .save_to(path)
            .await
            .with_context(|| format!("autosave to {} failed", path.display()))?;
    }

    info!("world '{}' stopped", world.name());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
