use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Events emitted by the ledger after a mutation commits.
///
/// Consumers (notification fan-out, reporting, cache invalidation) subscribe
/// through [`process_events`]; nothing in the ledger itself pushes
/// notifications. Alert consumers may equally poll
/// `LedgerStore::list_alerted_items`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StockAdjusted {
        item_id: Uuid,
        quantity: i32,
        reason: String,
        new_available: i32,
    },
    StockReserved {
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        new_available: i32,
    },
    ReservationReleased {
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        new_available: i32,
    },
    FulfillmentCommitted {
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
    },
    StockRestocked {
        item_id: Uuid,
        quantity: i32,
        reference_id: Uuid,
        restock_type: String,
    },
    LowStockDetected {
        item_id: Uuid,
        available: i32,
        threshold: i32,
    },
    OutOfStockDetected {
        item_id: Uuid,
        available: i32,
        threshold: i32,
    },
    TransferCreated(Uuid),
    TransferInTransit(Uuid),
    TransferCompleted(Uuid),
    TransferCancelled(Uuid),
}

impl Event {
    /// JSON form consumed by downstream log pipelines and webhook fan-out.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Spawn as a background task;
/// returns when all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    while let Some(event) = rx.recv().await {
        info!(event = %event.to_json(), "Processing event");
    }
}
