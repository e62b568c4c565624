#![allow(dead_code)]

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use uuid::Uuid;

use stockledger::config::AppConfig;
use stockledger::entities::inventory_item;
use stockledger::events::{self, EventSender};
use stockledger::services::ledger::NewInventoryItem;
use stockledger::{db, AppState};

/// A fully wired application instance backed by a throwaway SQLite file.
///
/// The pool is capped at a single connection so transactions from concurrent
/// tasks serialize deterministically.
pub struct TestApp {
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
    _db_dir: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let db_dir = tempfile::tempdir().expect("failed to create temp dir");
        let db_path = db_dir.path().join("stockledger_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(database_url, "test".to_string());
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");

        let (tx, rx) = mpsc::channel(cfg.event_buffer_size);
        let event_task = tokio::spawn(events::process_events(rx));

        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(tx));

        Self {
            state,
            _event_task: event_task,
            _db_dir: db_dir,
        }
    }

    /// Provisions an item at a fresh location with the default thresholds
    /// (low: 2, out: 0) and a unit cost of 2.50.
    pub async fn seed_item(&self, quantity: i32) -> inventory_item::Model {
        self.seed_item_at(quantity, Uuid::new_v4()).await
    }

    pub async fn seed_item_at(
        &self,
        quantity: i32,
        location_id: Uuid,
    ) -> inventory_item::Model {
        self.seed_item_full(quantity, Uuid::new_v4(), Uuid::new_v4(), location_id)
            .await
    }

    pub async fn seed_item_full(
        &self,
        quantity: i32,
        product_id: Uuid,
        variant_id: Uuid,
        location_id: Uuid,
    ) -> inventory_item::Model {
        self.state
            .ledger
            .provision(NewInventoryItem {
                product_id,
                variant_id,
                location_id,
                sku: test_sku(),
                initial_quantity: quantity,
                low_stock_threshold: 2,
                out_of_stock_threshold: 0,
                unit_cost: Decimal::new(250, 2),
                created_by: None,
            })
            .await
            .expect("failed to provision test item")
    }
}

pub fn test_sku() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("SKU-{}", &simple[..8].to_uppercase())
}
