//! Cache of attribute values per record, with optimistic writes.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio::sync::broadcast;
use tracker_attributes::{
    AttributeDefinition, AttributeInput, AttributeValue, Encoded, PropValue, ValueChange,
    ValuesPayload, decode,
};
use tracker_client::AttributesApi;

use crate::error::{ErrorSlot, StoreError, StoreResult};
use crate::events::{EventBus, StoreEvent};
use crate::loader::{LoaderKind, Loaders};
use crate::optimistic::{Pending, Settled, reconcile};

/// Value store keyed by record id.
pub struct AttributeValueStore {
    api: Arc<dyn AttributesApi>,
    /// record id -> values, in server order.
    cache: RwLock<HashMap<String, Vec<AttributeValue>>>,
    error: ErrorSlot,
    loaders: Loaders,
    events: EventBus,
}

/// Rewrite matching entries' tuples and append the missing ones.
fn upsert(values: &mut Vec<AttributeValue>, payload: &ValuesPayload) {
    for (attribute_id, tuples) in payload {
        match values.iter_mut().find(|v| &v.id == attribute_id) {
            Some(existing) => existing.prop_value = tuples.clone(),
            None => values.push(AttributeValue::new(attribute_id.clone(), tuples.clone())),
        }
    }
}

impl AttributeValueStore {
    pub fn new(api: Arc<dyn AttributesApi>) -> Self {
        Self {
            api,
            cache: RwLock::new(HashMap::new()),
            error: ErrorSlot::default(),
            loaders: Loaders::default(),
            events: EventBus::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Vec<AttributeValue>>> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn commit<R>(
        &self,
        record_id: &str,
        update: impl FnOnce(&mut HashMap<String, Vec<AttributeValue>>) -> R,
    ) -> R {
        let out = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            update(&mut cache)
        };
        self.events.emit(StoreEvent::ValuesChanged {
            record_id: record_id.to_string(),
        });
        out
    }

    fn replace(&self, record_id: &str, values: Vec<AttributeValue>) {
        self.commit(record_id, |cache| {
            cache.insert(record_id.to_string(), values);
        });
    }

    /// Forget a record whose cached values are unverified; readers refetch.
    fn evict(&self, record_id: &str) {
        self.commit(record_id, |cache| {
            cache.remove(record_id);
        });
    }

    // ---- reads ----

    /// Cached values of a record; `None` until fetched.
    pub fn values(&self, record_id: &str) -> Option<Vec<AttributeValue>> {
        self.read().get(record_id).cloned()
    }

    /// Stored tuples of one attribute on a record.
    pub fn value(&self, record_id: &str, attribute_id: &str) -> Option<Vec<PropValue>> {
        self.read()
            .get(record_id)?
            .iter()
            .find(|v| v.id == attribute_id)
            .map(|v| v.prop_value.clone())
    }

    /// Typed value of `definition` on a record; the neutral value when
    /// nothing is stored.
    pub fn decoded(
        &self,
        record_id: &str,
        definition: &AttributeDefinition,
    ) -> StoreResult<AttributeInput> {
        let stored = self.value(record_id, &definition.id);
        Ok(decode(definition.attribute_type, stored.as_deref())?)
    }

    pub fn is_loading(&self, kind: LoaderKind) -> bool {
        self.loaders.is_loading(kind)
    }

    pub fn last_error(&self) -> Option<StoreError> {
        self.error.get()
    }

    pub fn clear_error(&self) {
        self.error.clear();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // ---- operations ----

    pub async fn fetch_issue_attribute_values(
        &self,
        workspace: &str,
        project_id: &str,
        record_id: &str,
    ) -> StoreResult<Vec<AttributeValue>> {
        tracing::debug!(workspace, project_id, record_id, "fetching attribute values");
        let _loading = self.loaders.start(LoaderKind::FetchValues);
        let result = self
            .api
            .list_values(workspace, project_id, record_id)
            .await
            .map_err(StoreError::from);
        let values = self.error.record("fetch_issue_attribute_values", result)?;
        self.replace(record_id, values.clone());
        Ok(values)
    }

    /// Write values for a record.
    ///
    /// The cache reflects `payload` as soon as this is called, before the
    /// returned future is polled. Once settled the cache holds the server
    /// response, or the refetched server state if the write failed. If the
    /// refetch fails too, or the future is dropped before it settles, the
    /// record is evicted.
    pub fn create_attribute_value<'a>(
        &'a self,
        workspace: &'a str,
        project_id: &'a str,
        record_id: &'a str,
        payload: ValuesPayload,
    ) -> impl Future<Output = StoreResult<()>> + Send + 'a {
        tracing::debug!(
            workspace,
            project_id,
            record_id,
            attributes = payload.len(),
            "writing attribute values"
        );
        let loading = self.loaders.start(LoaderKind::CreateValue);
        self.commit(record_id, |cache| {
            upsert(cache.entry(record_id.to_string()).or_default(), &payload);
        });
        let pending = Pending::new(move || {
            tracing::warn!(record_id, "value write dropped before settling, evicting record");
            self.evict(record_id);
        });

        async move {
            let _loading = loading;
            let remote = self
                .api
                .create_values(workspace, project_id, record_id, &payload);
            let settled = reconcile(remote, || {
                self.api.list_values(workspace, project_id, record_id)
            })
            .await;
            let result = self.settle(record_id, settled);
            pending.settled();
            self.error.record("create_attribute_value", result)
        }
    }

    /// Delete one attribute's value from a record.
    ///
    /// The local entry is removed only after the server confirms; a failed
    /// delete resynchronises the record from the server.
    pub async fn delete_attribute_value(
        &self,
        workspace: &str,
        project_id: &str,
        record_id: &str,
        attribute_id: &str,
    ) -> StoreResult<()> {
        tracing::debug!(workspace, project_id, record_id, attribute_id, "deleting attribute value");
        let remote = self
            .api
            .delete_value(workspace, project_id, record_id, attribute_id);
        let settled = reconcile(remote, || {
            self.api.list_values(workspace, project_id, record_id)
        })
        .await;

        let result = match settled {
            Settled::Confirmed(()) => {
                self.commit(record_id, |cache| {
                    if let Some(values) = cache.get_mut(record_id) {
                        values.retain(|v| v.id != attribute_id);
                    }
                });
                Ok(())
            }
            Settled::Resynced { error, state } => {
                self.replace(record_id, state);
                Err(StoreError::Api(error))
            }
            Settled::Diverged {
                error,
                refetch_error,
            } => {
                self.evict(record_id);
                Err(StoreError::Diverged {
                    source: error,
                    refetch: refetch_error,
                })
            }
        };
        self.error.record("delete_attribute_value", result)
    }

    /// Route a renderer change to a write or a delete.
    pub async fn apply_change(
        &self,
        workspace: &str,
        project_id: &str,
        record_id: &str,
        change: ValueChange,
    ) -> StoreResult<()> {
        match change.encoded {
            Encoded::Write(tuples) => {
                let mut payload = ValuesPayload::new();
                payload.insert(change.attribute_id, tuples);
                self.create_attribute_value(workspace, project_id, record_id, payload)
                    .await
            }
            Encoded::Delete => {
                self.delete_attribute_value(workspace, project_id, record_id, &change.attribute_id)
                    .await
            }
        }
    }

    /// Commit the authoritative state for a settled write.
    fn settle(
        &self,
        record_id: &str,
        settled: Settled<Vec<AttributeValue>, Vec<AttributeValue>>,
    ) -> StoreResult<()> {
        let error = settled.error();
        match settled {
            Settled::Confirmed(values) | Settled::Resynced { state: values, .. } => {
                self.replace(record_id, values);
            }
            Settled::Diverged { .. } => self.evict(record_id),
        }
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio_test::{assert_ready_err, assert_ready_ok};
    use tracker_client::ApiError;
    use tracker_client::mock::{MockAttributesApi, MockMethod};

    #[test]
    fn upsert_rewrites_and_appends() {
        let mut values = vec![
            AttributeValue::new("a", vec![PropValue::scalar("1")]),
            AttributeValue::new("b", vec![PropValue::scalar("2")]),
        ];
        let mut payload = ValuesPayload::new();
        payload.insert("b".to_string(), vec![PropValue::scalar("3")]);
        payload.insert("c".to_string(), vec![]);
        upsert(&mut values, &payload);
        assert_eq!(
            values,
            vec![
                AttributeValue::new("a", vec![PropValue::scalar("1")]),
                AttributeValue::new("b", vec![PropValue::scalar("3")]),
                AttributeValue::new("c", vec![]),
            ]
        );
    }

    #[test]
    fn optimistic_write_lands_before_first_poll() {
        let api = Arc::new(MockAttributesApi::new());
        let store = AttributeValueStore::new(api.clone());
        let mut payload = ValuesPayload::new();
        payload.insert("a".to_string(), vec![PropValue::scalar("x")]);

        let mut task = tokio_test::task::spawn(store.create_attribute_value("ws", "p", "i", payload));
        assert!(api.calls().is_empty());
        assert_eq!(store.value("i", "a"), Some(vec![PropValue::scalar("x")]));

        assert_ready_ok!(task.poll());
        assert_eq!(api.calls(), vec![MockMethod::CreateValues]);
    }

    #[test]
    fn dropped_write_evicts_record() {
        let api = Arc::new(MockAttributesApi::new());
        let store = AttributeValueStore::new(api.clone());
        let mut payload = ValuesPayload::new();
        payload.insert("a".to_string(), vec![PropValue::scalar("x")]);

        let write = store.create_attribute_value("ws", "p", "i", payload);
        assert_eq!(store.value("i", "a"), Some(vec![PropValue::scalar("x")]));
        drop(write);

        assert_eq!(store.values("i"), None);
        assert!(!store.is_loading(LoaderKind::CreateValue));
        assert!(api.calls().is_empty());
    }

    #[test]
    fn delete_waits_for_first_poll() {
        let api = Arc::new(MockAttributesApi::new());
        api.seed_values("p", "i", vec![AttributeValue::new("a", vec![PropValue::scalar("x")])]);
        api.fail_next(MockMethod::DeleteValue, ApiError::Transport("down".into()));
        let store = AttributeValueStore::new(api.clone());

        let mut task = tokio_test::task::spawn(store.delete_attribute_value("ws", "p", "i", "a"));
        assert!(api.calls().is_empty());

        assert_ready_err!(task.poll());
        assert_eq!(
            api.calls(),
            vec![MockMethod::DeleteValue, MockMethod::ListValues]
        );
        assert_eq!(store.value("i", "a"), Some(vec![PropValue::scalar("x")]));
    }
}
