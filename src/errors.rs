use thiserror::Error;

/// Errors raised at the remote store boundary.
///
/// `Transport` covers request construction and network-level failures;
/// `Status` is the readable-response strengthening (a write that the store
/// rejected); `Decode` makes malformed upstream rows observable instead of
/// silently defaulted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Store returned status {status}")]
    Status { status: u16 },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid store endpoint: {0}")]
    InvalidEndpoint(String),
}

impl StoreError {
    pub fn decode(detail: impl Into<String>) -> Self {
        StoreError::Decode(detail.into())
    }

    /// Decode failure for one field of one fetched record.
    pub fn field_decode(record_id: &str, field: &str, value: &str) -> Self {
        StoreError::Decode(format!(
            "record {}: field {} has non-numeric value {:?}",
            record_id, field, value
        ))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Errors raised at the sync controller boundary.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Concurrent mutation: {0}")]
    ConcurrentMutation(String),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::ValidationError(message.into())
    }

    pub fn item_not_found(id: &str) -> Self {
        ServiceError::NotFound(format!("item {}", id))
    }

    /// True when the failure came from the remote store rather than from
    /// local validation or bookkeeping.
    pub fn is_store_error(&self) -> bool {
        matches!(self, ServiceError::StoreError(_))
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(err.to_string())
    }
}
