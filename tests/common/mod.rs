#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use stocksheet::errors::StoreError;
use stocksheet::models::{InventoryItem, NewItem};
use stocksheet::services::store_client::RemoteStore;
use tokio::sync::Notify;

/// One recorded call against the store double, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    FetchAll,
    Create(String),
    CreateBulk(usize),
    Update(InventoryItem),
    SetFlag(String, bool),
    Delete(Vec<String>),
}

/// In-memory stand-in for the remote spreadsheet store.
///
/// Keeps its own record collection so refetches observe completed writes,
/// logs every call, and can be told to fail or pause individual
/// operations. A paused operation signals `entered` and then blocks until
/// `release` is notified, which lets tests observe local state while a
/// remote call is mid-flight.
pub struct RecordingStore {
    items: Mutex<Vec<InventoryItem>>,
    next_id: Mutex<u32>,
    calls: Mutex<Vec<StoreCall>>,
    failing: Mutex<HashSet<&'static str>>,
    paused: Mutex<HashSet<&'static str>>,
    pub entered: Notify,
    pub release: Notify,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::seeded(Vec::new())
    }

    pub fn seeded(items: Vec<InventoryItem>) -> Self {
        let next_id = items
            .iter()
            .filter_map(|item| item.id.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        Self {
            items: Mutex::new(items),
            next_id: Mutex::new(next_id),
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            paused: Mutex::new(HashSet::new()),
            entered: Notify::new(),
            release: Notify::new(),
        }
    }

    /// Makes the named operation fail with HTTP 500 from now on.
    pub fn fail_on(&self, op: &'static str) {
        self.failing.lock().unwrap().insert(op);
    }

    /// Makes the named operation block until `release` is notified.
    pub fn pause_on(&self, op: &'static str) {
        self.paused.lock().unwrap().insert(op);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn remote_items(&self) -> Vec<InventoryItem> {
        self.items.lock().unwrap().clone()
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().unwrap().push(call);
    }

    async fn checkpoint(&self, op: &'static str) -> Result<(), StoreError> {
        let paused = self.paused.lock().unwrap().contains(op);
        if paused {
            self.entered.notify_one();
            self.release.notified().await;
        }
        if self.failing.lock().unwrap().contains(op) {
            return Err(StoreError::Status { status: 500 });
        }
        Ok(())
    }

    fn materialize(&self, draft: &NewItem) -> InventoryItem {
        let mut next_id = self.next_id.lock().unwrap();
        let id = next_id.to_string();
        *next_id += 1;
        InventoryItem {
            id,
            name: draft.name.clone(),
            category: draft.category.clone(),
            warehouse: draft.warehouse.clone(),
            rack_location: draft.rack_location.clone(),
            quantity: draft.quantity,
            pallet_count: draft.pallet_count,
            flagged: false,
        }
    }
}

#[async_trait]
impl RemoteStore for RecordingStore {
    async fn fetch_all(&self) -> Result<Vec<InventoryItem>, StoreError> {
        self.record(StoreCall::FetchAll);
        self.checkpoint("fetch_all").await?;
        Ok(self.remote_items())
    }

    async fn create(&self, item: &NewItem) -> Result<(), StoreError> {
        self.record(StoreCall::Create(item.name.clone()));
        self.checkpoint("create").await?;
        let record = self.materialize(item);
        self.items.lock().unwrap().push(record);
        Ok(())
    }

    async fn create_bulk(&self, items: &[NewItem]) -> Result<(), StoreError> {
        self.record(StoreCall::CreateBulk(items.len()));
        self.checkpoint("create_bulk").await?;
        let records: Vec<InventoryItem> = items.iter().map(|item| self.materialize(item)).collect();
        self.items.lock().unwrap().extend(records);
        Ok(())
    }

    async fn update(&self, item: &InventoryItem) -> Result<(), StoreError> {
        self.record(StoreCall::Update(item.clone()));
        self.checkpoint("update").await?;
        let mut items = self.items.lock().unwrap();
        if let Some(slot) = items.iter_mut().find(|existing| existing.id == item.id) {
            *slot = item.clone();
        }
        Ok(())
    }

    async fn set_flag(&self, id: &str, value: bool) -> Result<(), StoreError> {
        self.record(StoreCall::SetFlag(id.to_string(), value));
        self.checkpoint("set_flag").await?;
        let mut items = self.items.lock().unwrap();
        if let Some(slot) = items.iter_mut().find(|existing| existing.id == id) {
            slot.flagged = value;
        }
        Ok(())
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        self.record(StoreCall::Delete(ids.to_vec()));
        self.checkpoint("delete").await?;
        let mut items = self.items.lock().unwrap();
        items.retain(|existing| !ids.contains(&existing.id));
        Ok(())
    }
}

pub fn item(id: &str, name: &str, quantity: u32) -> InventoryItem {
    InventoryItem {
        id: id.to_string(),
        name: name.to_string(),
        category: "Tools".to_string(),
        warehouse: "W1".to_string(),
        rack_location: "A-01".to_string(),
        quantity,
        pallet_count: 5,
        flagged: false,
    }
}

pub fn new_item(name: &str) -> NewItem {
    NewItem {
        name: name.to_string(),
        category: "Tools".to_string(),
        warehouse: "W1".to_string(),
        rack_location: "A-01".to_string(),
        quantity: 50,
        pallet_count: 5,
    }
}
