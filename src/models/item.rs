use serde::{Deserialize, Serialize};
use validator::Validate;

/// One inventory record: product, location, quantity, pallet count, flag.
///
/// The serde renames match the remote store's wire shape (`rack`,
/// `palletCount`, `isGgadegi`), so the same struct serializes into write
/// payloads and out of `--json` CLI output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Opaque identifier assigned by the remote store, never by the client.
    pub id: String,
    pub name: String,
    pub category: String,
    pub warehouse: String,
    #[serde(rename = "rack")]
    pub rack_location: String,
    pub quantity: u32,
    pub pallet_count: u32,
    /// The "ggadegi" marker. Absent on the wire means false.
    #[serde(rename = "isGgadegi", default)]
    pub flagged: bool,
}

impl InventoryItem {
    /// Quantity carried per pallet, rounded to the nearest whole unit.
    /// `pallet_count >= 1` is a model invariant, so this never divides by
    /// zero.
    pub fn quantity_per_pallet(&self) -> u32 {
        (self.quantity as f64 / self.pallet_count as f64).round() as u32
    }
}

/// Payload for creating or replacing an item: every field but the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,

    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    #[validate(length(min = 1, message = "Warehouse is required"))]
    pub warehouse: String,

    #[serde(rename = "rack")]
    #[validate(length(min = 1, message = "Rack location is required"))]
    pub rack_location: String,

    pub quantity: u32,

    #[validate(range(min = 1, message = "Pallet count must be at least 1"))]
    pub pallet_count: u32,
}

impl NewItem {
    /// Applies this payload over an existing item, keeping its id and flag.
    pub fn apply_to(&self, item: &InventoryItem) -> InventoryItem {
        InventoryItem {
            id: item.id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            warehouse: self.warehouse.clone(),
            rack_location: self.rack_location.clone(),
            quantity: self.quantity,
            pallet_count: self.pallet_count,
            flagged: item.flagged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> InventoryItem {
        InventoryItem {
            id: "7".to_string(),
            name: "Widget".to_string(),
            category: "Tools".to_string(),
            warehouse: "W1".to_string(),
            rack_location: "A-01".to_string(),
            quantity: 50,
            pallet_count: 5,
            flagged: false,
        }
    }

    fn sample_new_item() -> NewItem {
        NewItem {
            name: "Widget".to_string(),
            category: "Tools".to_string(),
            warehouse: "W1".to_string(),
            rack_location: "A-01".to_string(),
            quantity: 50,
            pallet_count: 5,
        }
    }

    #[test]
    fn quantity_per_pallet_rounds_to_nearest() {
        let mut item = sample_item();
        assert_eq!(item.quantity_per_pallet(), 10);

        item.quantity = 7;
        item.pallet_count = 2;
        assert_eq!(item.quantity_per_pallet(), 4); // 3.5 rounds up

        item.quantity = 0;
        assert_eq!(item.quantity_per_pallet(), 0);
    }

    #[test]
    fn wire_field_names_match_store_shape() {
        let json = serde_json::to_value(sample_item()).expect("serialize");
        assert_eq!(json["rack"], "A-01");
        assert_eq!(json["palletCount"], 5);
        assert_eq!(json["isGgadegi"], false);
        assert!(json.get("rack_location").is_none());
    }

    #[test]
    fn missing_flag_deserializes_as_false() {
        let item: InventoryItem = serde_json::from_str(
            r#"{"id":"1","name":"n","category":"c","warehouse":"w","rack":"A-01","quantity":1,"palletCount":1}"#,
        )
        .expect("deserialize");
        assert!(!item.flagged);
    }

    #[test]
    fn valid_new_item_passes_validation() {
        assert!(sample_new_item().validate().is_ok());
    }

    #[test]
    fn empty_required_fields_fail_validation() {
        let mut payload = sample_new_item();
        payload.name = String::new();
        assert!(payload.validate().is_err());

        let mut payload = sample_new_item();
        payload.rack_location = String::new();
        assert!(payload.validate().is_err());
    }

    #[test]
    fn zero_pallet_count_fails_validation() {
        let mut payload = sample_new_item();
        payload.pallet_count = 0;
        assert!(payload.validate().is_err());
    }

    #[test]
    fn apply_to_keeps_id_and_flag() {
        let mut existing = sample_item();
        existing.flagged = true;

        let mut edit = sample_new_item();
        edit.quantity = 120;
        edit.warehouse = "W2".to_string();

        let updated = edit.apply_to(&existing);
        assert_eq!(updated.id, "7");
        assert!(updated.flagged);
        assert_eq!(updated.quantity, 120);
        assert_eq!(updated.warehouse, "W2");
    }
}
