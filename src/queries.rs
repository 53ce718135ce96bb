use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::models::InventoryItem;

/// Rack prefix used when a rack location has no prefix to take.
pub const UNKNOWN_LINE: &str = "Unknown";

/// Conjunctive filter over the item collection. Every populated field
/// must match for an item to pass.
#[derive(Clone, Debug, Default)]
pub struct ItemFilter {
    /// Exact, case-sensitive warehouse name.
    pub warehouse: Option<String>,
    /// Exact line name as produced by [`line_of`].
    pub line: Option<String>,
    /// Case-insensitive substring over name, category, warehouse, and
    /// rack location. Trimmed before matching; blank means no constraint.
    pub search: Option<String>,
    /// Keep only flagged items.
    pub flagged_only: bool,
}

impl ItemFilter {
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(warehouse) = &self.warehouse {
            if &item.warehouse != warehouse {
                return false;
            }
        }
        if let Some(line) = &self.line {
            if line_of(&item.rack_location) != line {
                return false;
            }
        }
        if self.flagged_only && !item.flagged {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() && !text_matches(item, &needle) {
                return false;
            }
        }
        true
    }
}

fn text_matches(item: &InventoryItem, needle: &str) -> bool {
    item.name.to_lowercase().contains(needle)
        || item.category.to_lowercase().contains(needle)
        || item.warehouse.to_lowercase().contains(needle)
        || item.rack_location.to_lowercase().contains(needle)
}

/// Applies a filter, preserving collection order.
pub fn filter_items(items: &[InventoryItem], filter: &ItemFilter) -> Vec<InventoryItem> {
    items
        .iter()
        .filter(|item| filter.matches(item))
        .cloned()
        .collect()
}

/// Line an item belongs to: the rack location prefix before the first
/// `-`. A rack with nothing before the dash (or no rack at all) lands in
/// [`UNKNOWN_LINE`].
pub fn line_of(rack_location: &str) -> &str {
    match rack_location.split('-').next() {
        Some(prefix) if !prefix.is_empty() => prefix,
        _ => UNKNOWN_LINE,
    }
}

/// Distinct warehouse names, sorted.
pub fn warehouses(items: &[InventoryItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.warehouse.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Distinct line names, sorted.
pub fn lines(items: &[InventoryItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| line_of(&item.rack_location).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Per-warehouse totals for the summary view.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseSummary {
    pub warehouse: String,
    /// Sum of pallet counts across the warehouse's items.
    pub pallet_count: u64,
    pub item_count: usize,
}

/// Groups items by warehouse and totals their pallets, sorted by
/// warehouse name.
pub fn warehouse_summary(items: &[InventoryItem]) -> Vec<WarehouseSummary> {
    let mut totals: BTreeMap<&str, (u64, usize)> = BTreeMap::new();
    for item in items {
        let entry = totals.entry(item.warehouse.as_str()).or_insert((0, 0));
        entry.0 += u64::from(item.pallet_count);
        entry.1 += 1;
    }
    totals
        .into_iter()
        .map(|(warehouse, (pallet_count, item_count))| WarehouseSummary {
            warehouse: warehouse.to_string(),
            pallet_count,
            item_count,
        })
        .collect()
}
