use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::errors::StoreError;
use crate::models::{InventoryItem, NewItem};

/// Write bodies travel as plain text; the store's script endpoint only
/// accepts simple requests.
const WRITE_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// How write "success" is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteAck {
    /// Read the store's response and require a success status.
    #[default]
    Confirm,
    /// Report success once the request has been dispatched without a
    /// transport error. Preserves the legacy transport that could not read
    /// write responses; a reported success then means "sent", not
    /// "applied".
    Dispatch,
}

impl FromStr for WriteAck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "confirm" => Ok(WriteAck::Confirm),
            "dispatch" => Ok(WriteAck::Dispatch),
            other => Err(format!("unknown write ack mode: {}", other)),
        }
    }
}

/// Sole boundary between the application and the external record store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Retrieves every record. Each call defeats intermediate caching.
    async fn fetch_all(&self) -> Result<Vec<InventoryItem>, StoreError>;

    /// Submits one new record. The store assigns the id; callers must
    /// re-fetch to learn it.
    async fn create(&self, item: &NewItem) -> Result<(), StoreError>;

    /// Submits many new records in one request.
    async fn create_bulk(&self, items: &[NewItem]) -> Result<(), StoreError>;

    /// Full-record replace by id.
    async fn update(&self, item: &InventoryItem) -> Result<(), StoreError>;

    /// Single-field patch of the flag.
    async fn set_flag(&self, id: &str, value: bool) -> Result<(), StoreError>;

    /// Batch deletion by id list.
    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;
}

/// Write actions understood by the store endpoint, serialized into the
/// plain-text POST body as `{"action": ..., ...}`.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
enum StoreAction<'a> {
    Add {
        #[serde(flatten)]
        item: &'a NewItem,
    },
    AddBulk {
        items: &'a [NewItem],
    },
    Update {
        #[serde(flatten)]
        item: &'a InventoryItem,
    },
    ToggleGgadegi {
        id: &'a str,
        #[serde(rename = "isGgadegi")]
        is_ggadegi: bool,
    },
    Delete {
        ids: &'a [String],
    },
}

/// Production client for the spreadsheet-backed record store.
#[derive(Debug, Clone)]
pub struct SheetStoreClient {
    client: Client,
    endpoint: Url,
    write_ack: WriteAck,
}

impl SheetStoreClient {
    /// Build a client using a default reqwest client with sensible timeouts.
    pub fn new(endpoint: &str, write_ack: WriteAck) -> Result<Self, StoreError> {
        Self::with_timeout(
            endpoint,
            write_ack,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Build a client with an explicit request timeout.
    pub fn with_timeout(
        endpoint: &str,
        write_ack: WriteAck,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Self::with_client(endpoint, write_ack, client)
    }

    /// Build a client from an existing reqwest client (useful for testing).
    pub fn with_client(
        endpoint: &str,
        write_ack: WriteAck,
        client: Client,
    ) -> Result<Self, StoreError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| StoreError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        Ok(Self {
            client,
            endpoint,
            write_ack,
        })
    }

    async fn post_action(&self, action: &StoreAction<'_>) -> Result<(), StoreError> {
        let body = serde_json::to_string(action)?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, WRITE_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        match self.write_ack {
            WriteAck::Dispatch => Ok(()),
            WriteAck::Confirm => {
                let status = response.status();
                if !status.is_success() {
                    return Err(StoreError::Status {
                        status: status.as_u16(),
                    });
                }
                Ok(())
            }
        }
    }
}

#[async_trait]
impl RemoteStore for SheetStoreClient {
    async fn fetch_all(&self) -> Result<Vec<InventoryItem>, StoreError> {
        // Cache buster: each read is logically distinct.
        let cache_buster = Utc::now().timestamp_millis();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[("t", cache_buster.to_string())])
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            return Err(StoreError::Status {
                status: status.as_u16(),
            });
        }

        let raw: Vec<RawItem> = serde_json::from_slice(&body)?;
        let mut items = Vec::with_capacity(raw.len());
        for (index, record) in raw.into_iter().enumerate() {
            items.push(decode_record(index, record)?);
        }

        debug!("Fetched {} records from store", items.len());
        Ok(items)
    }

    async fn create(&self, item: &NewItem) -> Result<(), StoreError> {
        self.post_action(&StoreAction::Add { item }).await
    }

    async fn create_bulk(&self, items: &[NewItem]) -> Result<(), StoreError> {
        self.post_action(&StoreAction::AddBulk { items }).await
    }

    async fn update(&self, item: &InventoryItem) -> Result<(), StoreError> {
        self.post_action(&StoreAction::Update { item }).await
    }

    async fn set_flag(&self, id: &str, value: bool) -> Result<(), StoreError> {
        self.post_action(&StoreAction::ToggleGgadegi {
            id,
            is_ggadegi: value,
        })
        .await
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        self.post_action(&StoreAction::Delete { ids }).await
    }
}

/// Wire shape of one fetched record. Sheet cells arrive typed however the
/// store serialized them, so numerics may be numbers or strings and the
/// flag may be a boolean or a string.
#[derive(Debug, Deserialize)]
struct RawItem {
    id: Option<Value>,
    #[serde(default)]
    name: Value,
    #[serde(default)]
    category: Value,
    #[serde(default)]
    warehouse: Value,
    #[serde(default)]
    rack: Value,
    #[serde(default)]
    quantity: Value,
    #[serde(default, rename = "palletCount")]
    pallet_count: Value,
    #[serde(default, rename = "isGgadegi")]
    is_ggadegi: Value,
}

fn decode_record(index: usize, raw: RawItem) -> Result<InventoryItem, StoreError> {
    let id = match &raw.id {
        None | Some(Value::Null) => {
            return Err(StoreError::decode(format!("record {}: missing id", index)))
        }
        Some(value) => text_value(value),
    };

    let quantity = numeric_field(&id, "quantity", &raw.quantity)?;
    let quantity = if quantity < 0 {
        warn!("Record {} has negative quantity {}; reading as 0", id, quantity);
        0
    } else {
        clamp_to_u32(&id, "quantity", quantity)
    };

    let pallet_count = numeric_field(&id, "palletCount", &raw.pallet_count)?;
    let pallet_count = if pallet_count < 1 {
        warn!(
            "Record {} has pallet count {}; reading as 1",
            id, pallet_count
        );
        1
    } else {
        clamp_to_u32(&id, "palletCount", pallet_count)
    };

    Ok(InventoryItem {
        id,
        name: text_value(&raw.name),
        category: text_value(&raw.category),
        warehouse: text_value(&raw.warehouse),
        rack_location: text_value(&raw.rack),
        quantity,
        pallet_count,
        flagged: flag_value(&raw.is_ggadegi),
    })
}

/// Coerces a numeric-like cell. Numbers pass through, numeric strings
/// parse, an absent or empty cell reads as zero; anything else is a decode
/// error.
fn numeric_field(record_id: &str, field: &str, value: &Value) -> Result<i64, StoreError> {
    match value {
        Value::Null => Ok(0),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                Ok(f.round() as i64)
            } else {
                Err(StoreError::field_decode(record_id, field, &n.to_string()))
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(0);
            }
            trimmed
                .parse::<f64>()
                .map(|f| f.round() as i64)
                .map_err(|_| StoreError::field_decode(record_id, field, s))
        }
        other => Err(StoreError::field_decode(record_id, field, &other.to_string())),
    }
}

/// Caps a decoded count at the `u32` ceiling, with a warning. The floor
/// checks run first, so `value` is non-negative here.
fn clamp_to_u32(record_id: &str, field: &str, value: i64) -> u32 {
    u32::try_from(value).unwrap_or_else(|_| {
        warn!(
            "Record {} has oversized {} {}; reading as {}",
            record_id, field, value, u32::MAX
        );
        u32::MAX
    })
}

/// Flag cells arrive as native booleans or as strings; only a
/// case-insensitive "true" reads as set.
fn flag_value(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => s.to_lowercase() == "true",
        _ => false,
    }
}

fn text_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
