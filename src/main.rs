use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use stockledger::config::{self, load_config};
use stockledger::events::{self, EventSender};
use stockledger::{db, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(environment = %cfg.environment, "Starting stockledger");

    let pool = db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        db::run_migrations(&pool).await?;
    }
    db::check_connection(&pool).await?;

    let (tx, rx) = mpsc::channel(cfg.event_buffer_size);
    let event_task = tokio::spawn(events::process_events(rx));

    let state = AppState::new(Arc::new(pool), cfg, EventSender::new(tx));
    info!("Ledger ready; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    // Dropping the state drops every event sender, which lets the consumer
    // task drain and exit.
    let pool = state.db.clone();
    drop(state);
    event_task.await?;

    if let Ok(pool) = Arc::try_unwrap(pool) {
        db::close_pool(pool).await?;
    }

    Ok(())
}
