use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{error, info, instrument, warn};
use validator::Validate;

use crate::{
    errors::{ServiceError, StoreError},
    events::{Event, EventSender},
    models::{InventoryItem, NewItem},
    services::store_client::RemoteStore,
};

/// In-memory state owned by the sync controller: the full item collection
/// and the load-in-progress flag. Constructed fresh per controller, never
/// shared globally.
#[derive(Debug, Default)]
struct InventoryState {
    items: Vec<InventoryItem>,
    loading: bool,
}

impl InventoryState {
    fn find(&self, id: &str) -> Option<&InventoryItem> {
        self.items.iter().find(|item| item.id == id)
    }

    fn find_mut(&mut self, id: &str) -> Option<&mut InventoryItem> {
        self.items.iter_mut().find(|item| item.id == id)
    }

    /// Puts a snapshot back in place. A miss means the collection was
    /// rebuilt by a full fetch while the mutation was in flight; the fetch
    /// already holds the remote truth, so there is nothing to restore.
    fn restore(&mut self, prior: InventoryItem) {
        if let Some(slot) = self.find_mut(&prior.id) {
            *slot = prior;
        }
    }
}

/// Synchronization controller that keeps the local item collection
/// coherent with best-effort remote mutation.
///
/// Update and flag mutations are optimistic: the local change lands
/// synchronously, the remote call follows, and a failure restores the
/// saved snapshot. Create and delete are pessimistic; see the per-method
/// docs for why.
#[derive(Clone)]
pub struct InventorySyncService {
    store: Arc<dyn RemoteStore>,
    state: Arc<Mutex<InventoryState>>,
    in_flight: Arc<DashMap<String, ()>>,
    event_sender: Option<EventSender>,
}

impl InventorySyncService {
    pub fn new(store: Arc<dyn RemoteStore>, event_sender: Option<EventSender>) -> Self {
        Self {
            store,
            state: Arc::new(Mutex::new(InventoryState::default())),
            in_flight: Arc::new(DashMap::new()),
            event_sender,
        }
    }

    /// Snapshot of the current item collection.
    pub fn items(&self) -> Vec<InventoryItem> {
        self.state.lock().unwrap().items.clone()
    }

    /// Looks up one item by id.
    pub fn item(&self, id: &str) -> Option<InventoryItem> {
        self.state.lock().unwrap().find(id).cloned()
    }

    /// True while a full fetch, create, or delete is running.
    pub fn is_loading(&self) -> bool {
        self.state.lock().unwrap().loading
    }

    /// Rebuilds the collection from the remote store and returns the item
    /// count.
    ///
    /// On failure the collection is cleared and the error returned, so a
    /// caller that ignores the result sees an empty collection - the same
    /// ambiguity the store protocol itself has between "no items" and
    /// "fetch failed".
    #[instrument(skip(self))]
    pub async fn load_all(&self) -> Result<usize, ServiceError> {
        self.set_loading(true);
        let result = self.store.fetch_all().await;

        let count = {
            let mut state = self.state.lock().unwrap();
            state.loading = false;
            match result {
                Ok(items) => {
                    let count = items.len();
                    state.items = items;
                    count
                }
                Err(err) => {
                    state.items.clear();
                    drop(state);
                    error!("Failed to fetch inventory: {}", err);
                    return Err(ServiceError::StoreError(err));
                }
            }
        };

        self.emit(Event::ItemsRefreshed { count }).await;
        info!("Loaded {} items", count);
        Ok(count)
    }

    /// Creates one item remotely, then refreshes the collection.
    ///
    /// Pessimistic: the store assigns the id, so there is no safe record
    /// to show locally until the refetch returns it.
    #[instrument(skip(self, item))]
    pub async fn create_item(&self, item: NewItem) -> Result<(), ServiceError> {
        item.validate()?;

        self.set_loading(true);
        if let Err(err) = self.store.create(&item).await {
            self.set_loading(false);
            error!("Failed to create item: {}", err);
            return Err(ServiceError::StoreError(err));
        }

        self.emit(Event::ItemCreated).await;
        info!("Created item {:?}", item.name);
        self.load_all().await?;
        Ok(())
    }

    /// Creates many items in one request, then refreshes the collection.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn create_bulk(&self, items: Vec<NewItem>) -> Result<usize, ServiceError> {
        if items.is_empty() {
            return Err(ServiceError::validation("No items to import"));
        }
        for (index, item) in items.iter().enumerate() {
            item.validate()
                .map_err(|e| ServiceError::ValidationError(format!("row {}: {}", index + 1, e)))?;
        }

        let count = items.len();
        self.set_loading(true);
        if let Err(err) = self.store.create_bulk(&items).await {
            self.set_loading(false);
            error!("Failed to import {} items: {}", count, err);
            return Err(ServiceError::StoreError(err));
        }

        self.emit(Event::BulkImported { count }).await;
        info!("Imported {} items", count);
        self.load_all().await?;
        Ok(count)
    }

    /// Replaces an item's descriptive fields and counts, keeping its flag.
    ///
    /// Optimistic: the local record changes before the remote call goes
    /// out and is restored from a snapshot if the call fails.
    #[instrument(skip(self, payload))]
    pub async fn update_item(&self, id: &str, payload: NewItem) -> Result<(), ServiceError> {
        payload.validate()?;

        let store = Arc::clone(&self.store);
        let prior = self
            .run_optimistic(
                id,
                |state| {
                    let slot = state
                        .find_mut(id)
                        .ok_or_else(|| ServiceError::item_not_found(id))?;
                    let snapshot = slot.clone();
                    *slot = payload.apply_to(&snapshot);
                    Ok((snapshot, slot.clone()))
                },
                InventoryState::restore,
                move |updated: InventoryItem| async move { store.update(&updated).await },
            )
            .await?;

        self.emit(Event::ItemUpdated { id: id.to_string() }).await;
        info!("Updated item {} ({:?})", id, prior.name);
        Ok(())
    }

    /// Moves an item to a new warehouse and rack location.
    #[instrument(skip(self))]
    pub async fn move_item(
        &self,
        id: &str,
        warehouse: &str,
        rack_location: &str,
    ) -> Result<(), ServiceError> {
        if warehouse.trim().is_empty() || rack_location.trim().is_empty() {
            return Err(ServiceError::validation(
                "Warehouse and rack location are required",
            ));
        }

        let store = Arc::clone(&self.store);
        self.run_optimistic(
            id,
            |state| {
                let slot = state
                    .find_mut(id)
                    .ok_or_else(|| ServiceError::item_not_found(id))?;
                let snapshot = slot.clone();
                slot.warehouse = warehouse.to_string();
                slot.rack_location = rack_location.to_string();
                Ok((snapshot, slot.clone()))
            },
            InventoryState::restore,
            move |updated: InventoryItem| async move { store.update(&updated).await },
        )
        .await?;

        self.emit(Event::ItemMoved { id: id.to_string() }).await;
        info!("Moved item {} to {}/{}", id, warehouse, rack_location);
        Ok(())
    }

    /// Flips an item's flag and returns the new value.
    #[instrument(skip(self))]
    pub async fn toggle_flag(&self, id: &str) -> Result<bool, ServiceError> {
        let store = Arc::clone(&self.store);
        let owned_id = id.to_string();
        let prior = self
            .run_optimistic(
                id,
                |state| {
                    let slot = state
                        .find_mut(id)
                        .ok_or_else(|| ServiceError::item_not_found(id))?;
                    let prior = slot.flagged;
                    slot.flagged = !prior;
                    Ok((prior, !prior))
                },
                |state, prior| {
                    if let Some(slot) = state.find_mut(id) {
                        slot.flagged = prior;
                    }
                },
                move |value: bool| async move { store.set_flag(&owned_id, value).await },
            )
            .await?;

        let value = !prior;
        self.emit(Event::FlagSet {
            id: id.to_string(),
            value,
        })
        .await;
        Ok(value)
    }

    /// Deletes items by id and removes them locally only after the store
    /// confirms.
    ///
    /// Pessimistic: a failed delete that was already reflected locally
    /// would silently resurrect data the user believes gone, so local
    /// removal waits for the remote outcome.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete_items(&self, ids: &[String]) -> Result<usize, ServiceError> {
        let ids = dedup_ids(ids);
        if ids.is_empty() {
            return Err(ServiceError::validation("No ids to delete"));
        }

        // Claim every id in the batch before touching state or network.
        // The entry guard holds a shard lock, so the rollback of earlier
        // claims must wait until it is dropped.
        let mut conflict = None;
        let mut claimed = 0;
        for id in &ids {
            match self.in_flight.entry(id.clone()) {
                Entry::Occupied(_) => {
                    conflict = Some(id.clone());
                    break;
                }
                Entry::Vacant(vacant) => {
                    vacant.insert(());
                    claimed += 1;
                }
            }
        }
        if let Some(id) = conflict {
            self.release(&ids[..claimed]);
            return Err(ServiceError::ConcurrentMutation(id));
        }

        let missing = {
            let state = self.state.lock().unwrap();
            ids.iter().find(|id| state.find(id).is_none()).cloned()
        };
        if let Some(id) = missing {
            self.release(&ids);
            return Err(ServiceError::item_not_found(&id));
        }

        self.set_loading(true);
        let result = self.store.delete(&ids).await;

        let outcome = match result {
            Ok(()) => {
                let mut state = self.state.lock().unwrap();
                state.loading = false;
                let before = state.items.len();
                state.items.retain(|item| !ids.contains(&item.id));
                Ok(before - state.items.len())
            }
            Err(err) => {
                self.set_loading(false);
                error!("Failed to delete {} items: {}", ids.len(), err);
                Err(ServiceError::StoreError(err))
            }
        };
        self.release(&ids);

        match outcome {
            Ok(count) => {
                self.emit(Event::ItemsDeleted { count }).await;
                info!("Deleted {} items", count);
                Ok(count)
            }
            Err(err) => Err(err),
        }
    }

    /// The one optimistic-mutation primitive.
    ///
    /// Claims the per-id in-flight guard, runs `apply` under the state
    /// lock (its local effects are visible to readers before the remote
    /// call is issued), then awaits the remote call built by `call`. On
    /// failure `revert` puts the snapshot back. Returns the snapshot on
    /// success so callers can derive what changed.
    async fn run_optimistic<S, T, A, R, C, Fut>(
        &self,
        id: &str,
        apply: A,
        revert: R,
        call: C,
    ) -> Result<S, ServiceError>
    where
        A: FnOnce(&mut InventoryState) -> Result<(S, T), ServiceError>,
        R: FnOnce(&mut InventoryState, S),
        C: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<(), StoreError>>,
    {
        match self.in_flight.entry(id.to_string()) {
            Entry::Occupied(_) => {
                return Err(ServiceError::ConcurrentMutation(id.to_string()));
            }
            Entry::Vacant(vacant) => {
                vacant.insert(());
            }
        }

        let applied = {
            let mut state = self.state.lock().unwrap();
            apply(&mut state)
        };
        let (snapshot, payload) = match applied {
            Ok(pair) => pair,
            Err(err) => {
                self.in_flight.remove(id);
                return Err(err);
            }
        };

        let result = call(payload).await;
        match result {
            Ok(()) => {
                self.in_flight.remove(id);
                Ok(snapshot)
            }
            Err(err) => {
                error!("Remote call failed for item {}: {}; reverting", id, err);
                {
                    let mut state = self.state.lock().unwrap();
                    revert(&mut state, snapshot);
                }
                self.in_flight.remove(id);
                Err(ServiceError::StoreError(err))
            }
        }
    }

    fn set_loading(&self, value: bool) {
        self.state.lock().unwrap().loading = value;
    }

    fn release(&self, ids: &[String]) {
        for id in ids {
            self.in_flight.remove(id);
        }
    }

    async fn emit(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(err) = sender.send(event).await {
                warn!("Failed to send event: {}", err);
            }
        }
    }
}

fn dedup_ids(ids: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(id.as_str()))
        .cloned()
        .collect()
}
