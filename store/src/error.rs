use std::sync::{PoisonError, RwLock};

use tracker_attributes::CodecError;
use tracker_client::ApiError;

/// Coarse failure class exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorCategory {
    /// No response from the server.
    Transport,
    /// The server (or local validation) refused the request.
    Rejected,
    /// The cache no longer matches, or cannot be proven to match, the server.
    Desync,
}

/// Error type for store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("entity {entity_id} is not cached; fetch its details first")]
    EntityNotCached { entity_id: String },

    #[error("attribute {attribute_id} is not cached under entity {entity_id}")]
    AttributeNotCached {
        entity_id: String,
        attribute_id: String,
    },

    #[error("attribute {attribute_id} does not accept options")]
    NotAnOptionHolder { attribute_id: String },

    /// The mutation failed and the resynchronising fetch failed too.
    #[error("{source}; resynchronisation also failed: {refetch}")]
    Diverged { source: ApiError, refetch: ApiError },
}

impl StoreError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            StoreError::Api(ApiError::Rejected { .. }) | StoreError::Codec(_) => {
                ErrorCategory::Rejected
            }
            StoreError::NotAnOptionHolder { .. } => ErrorCategory::Rejected,
            StoreError::Api(_) => ErrorCategory::Transport,
            StoreError::EntityNotCached { .. }
            | StoreError::AttributeNotCached { .. }
            | StoreError::Diverged { .. } => ErrorCategory::Desync,
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The most recent failure of a store, observable after the call settled.
#[derive(Debug, Default)]
pub(crate) struct ErrorSlot(RwLock<Option<StoreError>>);

impl ErrorSlot {
    pub(crate) fn get(&self) -> Option<StoreError> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn set(&self, err: &StoreError) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(err.clone());
    }

    pub(crate) fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Records the error of a failed result and passes the result through.
    pub(crate) fn record<T>(&self, operation: &'static str, result: StoreResult<T>) -> StoreResult<T> {
        if let Err(err) = &result {
            tracing::warn!(operation, category = %err.category(), error = %err, "store operation failed");
            self.set(err);
        }
        result
    }
}
