// live_chess - two players and any number of observers sharing one board
// over websockets.
//
// Start it with `live_chess --demo` to get two registered players and an
// open game printed to the console, then point any websocket client at
// ws://127.0.0.1:8000/ws and send CONNECT / MAKE_MOVE / RESIGN / LEAVE
// envelopes.

use anyhow::Context;
use colored::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use live_chess::config::{ConfigError, USAGE};
use live_chess::{start_server, Color, Dispatcher, MemoryStore, ServerConfig, SessionRegistry};

fn seed_demo(store: &MemoryStore) -> anyhow::Result<()> {
    let white = store.register("alice").context("registering alice")?;
    let black = store.register("bob").context("registering bob")?;
    let watcher = store.register("carol").context("registering carol")?;
    let game_id = store.create_game("demo").context("creating demo game")?;
    store.join_game(game_id, Color::White, "alice")?;
    store.join_game(game_id, Color::Black, "bob")?;

    println!("{}", "Demo game ready".green().bold());
    println!("  gameID: {}", game_id.to_string().yellow());
    println!("  alice (white): {}", white.cyan());
    println!("  bob   (black): {}", black.cyan());
    println!("  carol (observer): {}", watcher.cyan());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(ConfigError::Help) => {
            println!("{}", USAGE);
            return Ok(());
        }
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone())),
        )
        .with_target(false)
        .init();

    println!("{}", "Live Chess Server".bold());
    println!("  websocket: ws://{}/{}", config.bind, config.ws_path);

    let store = Arc::new(MemoryStore::new());
    if config.demo {
        seed_demo(&store)?;
    }

    let registry = Arc::new(SessionRegistry::new());
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), store, registry));

    start_server(config, dispatcher)
        .await
        .context("websocket server failed")?;
    Ok(())
}
