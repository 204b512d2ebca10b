//! `Taskboard` dev server -- in-memory stand-in for the Taskboard backend.
//!
//! Serves the task REST routes under `/api` and pushes a notification over
//! `/ws` whenever a task changes.
//!
//! # Usage
//!
//! ```bash
//! # Run on the default address 127.0.0.1:8000 with the sample board
//! cargo run --bin taskboard-devserver
//!
//! # Custom address, empty board, small pages
//! cargo run --bin taskboard-devserver -- --bind 127.0.0.1:8080 --empty --max-page-size 20
//!
//! # Point the client at it
//! cargo run --bin taskboard -- --api-url http://127.0.0.1:8000/api --token user-1 watch
//! ```

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use taskboard_devserver::config::{DevServerCliArgs, DevServerConfig};
use taskboard_devserver::server::{self, ServerState};
use taskboard_devserver::store::TaskTable;
use taskboard_proto::sample::sample_board;

#[tokio::main]
async fn main() {
    let cli = DevServerCliArgs::parse();

    let config = match DevServerConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            std::process::exit(1);
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    tracing::info!(
        addr = %config.bind_addr,
        seed = config.seed,
        max_page_size = config.max_page_size,
        "starting taskboard dev server"
    );

    let table = if config.seed {
        TaskTable::with_tasks(sample_board(Utc::now()))
    } else {
        TaskTable::new()
    };
    let state = Arc::new(ServerState::new(table).with_max_page_size(config.max_page_size));

    match server::start_server_with_state(&config.bind_addr, state).await {
        Ok((bound_addr, handle)) => {
            tracing::info!(addr = %bound_addr, "dev server listening");
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "dev server task failed");
            }
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to start dev server");
            std::process::exit(1);
        }
    }
}
