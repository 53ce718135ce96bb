use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

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

// Define the various events that can occur in the system.
//
// Events fire after a mutation has settled successfully; delivery is
// best-effort and never fails the mutation that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Collection events
    ItemsRefreshed { count: usize },

    // Mutation events
    ItemCreated,
    BulkImported { count: usize },
    ItemUpdated { id: String },
    ItemMoved { id: String },
    FlagSet { id: String, value: bool },
    ItemsDeleted { count: usize },
}
