//! MUD player client entry point.
//!
//! # Usage
//!
//! ```text
//! mud-client [OPTIONS] <HOST> <WORLD>
//!
//! Options:
//!   --name          <NAME>  Your name in the game (prompted for if absent)
//!   --description   <TEXT>  How others see you (prompted for if absent)
//!   --callback-bind <ADDR>  Where the person endpoint listens [default: 0.0.0.0:0]
//!   --callback-host <HOST>  Host servers use to reach you [default: 127.0.0.1]
//! ```
//!
//! # Architecture
//!
//! ```text
//! main()
//!  ├─ PersonEndpoint::start()   -- listener for Tell / Name / Description
//!  ├─ notice task               -- prints every Tell as it arrives
//!  ├─ MudSession::enter()       -- join the world's entrance
//!  └─ MudSession::run()         -- read commands until quit / end of input
//! ```

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::RwLock;
use tracing_subscriber::EnvFilter;

use mud_client::application::session::{MudSession, Profile};
use mud_client::infrastructure::console::StdConsole;
use mud_client::infrastructure::network::{PersonEndpoint, ServerPool};
use mud_rpc::RpcOptions;

const DEFAULT_PORT: u16 = 24900;
const DEFAULT_DESCRIPTION: &str = "An ordinary adventurer";

#[derive(Debug, Parser)]
#[command(name = "mud-client", about = "Player client for the distributed MUD", version)]
struct Cli {
    /// World server, as `host` or `host:port`.
    host: String,

    /// Name of the world to enter.
    world: String,

    /// Your name in the game.
    #[arg(long, env = "MUD_NAME")]
    name: Option<String>,

    /// How others see you when they `describe` you (prompted for if absent).
    #[arg(long, env = "MUD_DESCRIPTION")]
    description: Option<String>,

    /// Address the person endpoint listens on.
    #[arg(long, env = "MUD_CALLBACK_BIND", default_value = "0.0.0.0:0")]
    callback_bind: String,

    /// Host name world servers use to call back into this client.
    #[arg(long, env = "MUD_CALLBACK_HOST", default_value = "127.0.0.1")]
    callback_host: String,

    /// How long to wait for any single reply.
    #[arg(long, env = "MUD_CALL_TIMEOUT_MS", default_value_t = 10_000)]
    call_timeout_ms: u64,
}

impl Cli {
    fn server_addr(&self) -> String {
        with_default_port(&self.host)
    }

    fn options(&self) -> RpcOptions {
        RpcOptions {
            call_timeout: Duration::from_millis(self.call_timeout_ms),
            ..RpcOptions::default()
        }
    }
}

fn with_default_port(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_PORT}")
    }
}

/// Asks once on the terminal, before the async console takes over stdin.
fn ask(question: &str) -> anyhow::Result<Option<String>> {
    print!("{question} ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    if std::io::stdin().read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let answer = line.trim();
    Ok((!answer.is_empty()).then(|| answer.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Quiet by default: the terminal belongs to the game.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let name = match &cli.name {
        Some(name) => name.clone(),
        None => ask("What is your name?")?.context("a name is needed to play")?,
    };
    let description = match &cli.description {
        Some(description) => description.clone(),
        None => ask("Describe yourself for others:")?
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
    };
    let profile = Arc::new(RwLock::new(Profile {
        name: name.clone(),
        description,
    }));

    // ── Person endpoint ───────────────────────────────────────────────────────
    let (endpoint, mut notices) =
        PersonEndpoint::start(&cli.callback_bind, &cli.callback_host, Arc::clone(&profile))
            .await
            .with_context(|| format!("cannot listen on {}", cli.callback_bind))?;
    let me = endpoint.person().clone();

    tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            println!("{notice}");
        }
    });

    // ── Session ───────────────────────────────────────────────────────────────
    let gateway = Arc::new(ServerPool::new(&format!("client:{name}"), cli.options()));
    let session = MudSession::enter(
        StdConsole::new(),
        gateway,
        me,
        profile,
        &cli.server_addr(),
        &cli.world,
    )
    .await?;

    tokio::select! {
        _ = session.run() => {}
        _ = tokio::signal::ctrl_c() => {
            println!();
            tracing::info!("interrupted");
        }
    }

    endpoint.stop().await;
    Ok(())
}
