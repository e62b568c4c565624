//! stockledger
//!
//! Multi-location inventory ledger: durable stock-quantity records with an
//! append-only movement audit trail, a reservation engine whose operations are
//! atomic conditional writes (no oversell under concurrent load), and a
//! location-to-location transfer workflow. Consumed in-process by order,
//! fulfillment and admin surfaces; no wire protocol is owned here.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod migrator;
pub mod services;

use sea_orm::DatabaseConnection;
use std::sync::Arc;

pub use services::ledger::LedgerStore;
pub use services::reservation::ReservationEngine;
pub use services::transfer::TransferService;

/// Shared handles wired once at startup and cloned into callers.
///
/// The database pool is the single shared mutable resource; every quantity
/// write goes through the reservation engine or transfer service, never
/// directly through the pool.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub ledger: LedgerStore,
    pub reservations: ReservationEngine,
    pub transfers: TransferService,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let ledger = LedgerStore::new(db.clone());
        let reservations = ReservationEngine::new(db.clone(), event_sender.clone());
        let transfers = TransferService::new(db.clone(), event_sender.clone());

        Self {
            db,
            config,
            event_sender,
            ledger,
            reservations,
            transfers,
        }
    }
}
