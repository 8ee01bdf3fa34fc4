use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;

/// Domain events emitted after successful commits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Client events
    ClientCreated(i32),
    ClientUpdated(i32),
    ClientDeleted {
        client_id: i32,
        cascaded_orders: u64,
    },

    // Product events
    ProductCreated(i32),
    ProductUpdated(i32),

    // Order events
    OrderCreated(i32),
    OrderDeleted(i32),
    OrderStatusChanged {
        order_id: i32,
        old_status: String,
        new_status: String,
    },
    OrderRevised {
        order_id: i32,
        inserted: usize,
        updated: usize,
        removed: usize,
    },
    ReceiptIssued {
        order_id: i32,
        receipt_number: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Background consumer: drains the event channel and logs each event.
/// Runs until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id, %old_status, %new_status, "Order status changed");
            }
            Event::OrderRevised {
                order_id,
                inserted,
                updated,
                removed,
            } => {
                info!(order_id, inserted, updated, removed, "Order lines reconciled");
            }
            Event::ReceiptIssued {
                order_id,
                receipt_number,
            } => {
                info!(order_id, %receipt_number, "Delivery receipt issued");
            }
            Event::ClientDeleted {
                client_id,
                cascaded_orders,
            } => {
                info!(client_id, cascaded_orders, "Client deleted");
            }
            other => info!(event = ?other, "Domain event"),
        }
    }
    info!("Event channel closed; event processor exiting");
}
