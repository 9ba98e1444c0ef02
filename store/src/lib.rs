//! Client-side caches for custom attributes.
//!
//! [`AttributeStores`] is the root object handed to views: it owns one
//! [`AttributeDefinitionStore`] and one [`AttributeValueStore`] sharing a
//! single [`AttributesApi`].
//!
//! Every operation returns a [`StoreResult`] and also records its failure
//! in the store's error slot (`last_error`). Cache writes are applied under
//! one lock each and announced on the store's [`StoreEvent`] channel.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod definitions;
mod error;
mod events;
mod loader;
pub mod optimistic;
mod values;

use std::sync::Arc;

use tracker_client::AttributesApi;

pub use definitions::AttributeDefinitionStore;
pub use error::{ErrorCategory, StoreError, StoreResult};
pub use events::StoreEvent;
pub use loader::LoaderKind;
pub use values::AttributeValueStore;

/// Definition and value stores over one API.
pub struct AttributeStores {
    pub definitions: AttributeDefinitionStore,
    pub values: AttributeValueStore,
}

impl AttributeStores {
    pub fn new(api: Arc<dyn AttributesApi>) -> Self {
        Self {
            definitions: AttributeDefinitionStore::new(api.clone()),
            values: AttributeValueStore::new(api),
        }
    }
}
