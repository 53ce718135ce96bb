// Core services
pub mod import;
pub mod inventory_sync;
pub mod store_client;

pub use inventory_sync::InventorySyncService;
pub use store_client::{RemoteStore, SheetStoreClient, WriteAck};
