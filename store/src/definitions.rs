//! Cache of entity definitions and their field attributes.
//!
//! Entities are listed per project without children; their field
//! attributes are indexed by id once `fetch_entity_details` has run.
//! Option children stay inside their select/multi-select attribute.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tokio::sync::broadcast;
use tracker_attributes::{AttributeDefinition, AttributePatch, AttributeType};
use tracker_client::{ApiResult, AttributesApi};

use crate::error::{ErrorSlot, StoreError, StoreResult};
use crate::events::{EventBus, StoreEvent};
use crate::loader::{LoaderKind, Loaders};
use crate::optimistic::{Pending, Settled, reconcile};

#[derive(Debug, Clone)]
struct EntityEntry {
    /// Root definition, children stripped.
    root: AttributeDefinition,
    attributes: BTreeMap<String, AttributeDefinition>,
    details_loaded: bool,
}

impl EntityEntry {
    fn from_root(mut root: AttributeDefinition) -> Self {
        root.children.clear();
        Self {
            root,
            attributes: BTreeMap::new(),
            details_loaded: false,
        }
    }

    fn from_details(mut root: AttributeDefinition) -> Self {
        let attributes = std::mem::take(&mut root.children)
            .into_iter()
            .map(|child| (child.id.clone(), child))
            .collect();
        Self {
            root,
            attributes,
            details_loaded: true,
        }
    }

    fn sorted_attributes(&self) -> Vec<AttributeDefinition> {
        let mut attributes: Vec<AttributeDefinition> = self.attributes.values().cloned().collect();
        attributes.sort_by(|a, b| a.sort_order.total_cmp(&b.sort_order));
        attributes
    }

    fn assemble(&self) -> AttributeDefinition {
        let mut definition = self.root.clone();
        definition.children = self.sorted_attributes();
        definition
    }
}

#[derive(Debug, Default)]
struct DefinitionCache {
    /// project id -> root entity ids, in server order.
    projects: HashMap<String, Vec<String>>,
    entities: HashMap<String, EntityEntry>,
}

impl DefinitionCache {
    fn option_holder_mut(
        &mut self,
        entity_id: &str,
        attribute_id: &str,
    ) -> StoreResult<&mut AttributeDefinition> {
        let entry = self
            .entities
            .get_mut(entity_id)
            .ok_or_else(|| StoreError::EntityNotCached {
                entity_id: entity_id.to_string(),
            })?;
        let attribute =
            entry
                .attributes
                .get_mut(attribute_id)
                .ok_or_else(|| StoreError::AttributeNotCached {
                    entity_id: entity_id.to_string(),
                    attribute_id: attribute_id.to_string(),
                })?;
        if !attribute.attribute_type.has_options() {
            return Err(StoreError::NotAnOptionHolder {
                attribute_id: attribute_id.to_string(),
            });
        }
        Ok(attribute)
    }
}

/// Definition store: entities, their attributes and attribute options.
pub struct AttributeDefinitionStore {
    api: Arc<dyn AttributesApi>,
    cache: RwLock<DefinitionCache>,
    error: ErrorSlot,
    loaders: Loaders,
    events: EventBus,
}

impl AttributeDefinitionStore {
    pub fn new(api: Arc<dyn AttributesApi>) -> Self {
        Self {
            api,
            cache: RwLock::new(DefinitionCache::default()),
            error: ErrorSlot::default(),
            loaders: Loaders::default(),
            events: EventBus::default(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, DefinitionCache> {
        self.cache.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `update` under one write lock, then notify.
    fn commit<R>(&self, event: StoreEvent, update: impl FnOnce(&mut DefinitionCache) -> R) -> R {
        let out = {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            update(&mut cache)
        };
        self.events.emit(event);
        out
    }

    fn require_entity(&self, entity_id: &str) -> StoreResult<()> {
        if self.read().entities.contains_key(entity_id) {
            Ok(())
        } else {
            Err(StoreError::EntityNotCached {
                entity_id: entity_id.to_string(),
            })
        }
    }

    fn require_attribute(&self, entity_id: &str, attribute_id: &str) -> StoreResult<()> {
        self.require_entity(entity_id)?;
        match self.attribute(entity_id, attribute_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::AttributeNotCached {
                entity_id: entity_id.to_string(),
                attribute_id: attribute_id.to_string(),
            }),
        }
    }

    fn require_option_holder(&self, entity_id: &str, attribute_id: &str) -> StoreResult<()> {
        self.require_attribute(entity_id, attribute_id)?;
        let holds_options = self
            .attribute(entity_id, attribute_id)
            .is_some_and(|attribute| attribute.attribute_type.has_options());
        if holds_options {
            Ok(())
        } else {
            Err(StoreError::NotAnOptionHolder {
                attribute_id: attribute_id.to_string(),
            })
        }
    }

    // ---- reads ----

    /// Root entities of a project, in server order.
    pub fn entities(&self, project_id: &str) -> Vec<AttributeDefinition> {
        let cache = self.read();
        cache
            .projects
            .get(project_id)
            .into_iter()
            .flatten()
            .filter_map(|id| cache.entities.get(id))
            .map(EntityEntry::assemble)
            .collect()
    }

    /// Entity with its cached attributes as children.
    pub fn entity(&self, entity_id: &str) -> Option<AttributeDefinition> {
        self.read().entities.get(entity_id).map(EntityEntry::assemble)
    }

    /// Whether `fetch_entity_details` has populated this entity's attributes.
    pub fn has_details(&self, entity_id: &str) -> bool {
        self.read()
            .entities
            .get(entity_id)
            .is_some_and(|entry| entry.details_loaded)
    }

    /// Field attributes of an entity ordered by `sort_order`.
    pub fn entity_attributes(&self, entity_id: &str) -> Vec<AttributeDefinition> {
        self.read()
            .entities
            .get(entity_id)
            .map(EntityEntry::sorted_attributes)
            .unwrap_or_default()
    }

    pub fn attribute(&self, entity_id: &str, attribute_id: &str) -> Option<AttributeDefinition> {
        self.read()
            .entities
            .get(entity_id)?
            .attributes
            .get(attribute_id)
            .cloned()
    }

    /// Option children of a select/multi-select attribute, ordered.
    pub fn options(&self, entity_id: &str, attribute_id: &str) -> Vec<AttributeDefinition> {
        self.attribute(entity_id, attribute_id)
            .map(|attribute| {
                attribute
                    .sorted_children()
                    .into_iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
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

    // ---- entities ----

    /// List the root entities of a project and replace the project's list.
    pub async fn fetch_entities_list(
        &self,
        workspace: &str,
        project_id: &str,
    ) -> StoreResult<Vec<AttributeDefinition>> {
        tracing::debug!(workspace, project_id, "fetching entity list");
        let _loading = self.loaders.start(LoaderKind::FetchObjects);
        let result = self
            .api
            .list_entities(workspace, project_id)
            .await
            .map_err(StoreError::from);
        let roots = self.error.record("fetch_entities_list", result)?;

        let event = StoreEvent::EntitiesChanged {
            project_id: project_id.to_string(),
        };
        self.commit(event, |cache| {
            let mut ids = Vec::with_capacity(roots.len());
            for root in &roots {
                ids.push(root.id.clone());
                match cache.entities.get_mut(&root.id) {
                    Some(entry) => {
                        let mut stripped = root.clone();
                        stripped.children.clear();
                        entry.root = stripped;
                    }
                    None => {
                        cache
                            .entities
                            .insert(root.id.clone(), EntityEntry::from_root(root.clone()));
                    }
                }
            }
            cache.projects.insert(project_id.to_string(), ids);
        });
        Ok(roots)
    }

    /// Fetch one entity with children expanded and index them by id.
    pub async fn fetch_entity_details(
        &self,
        workspace: &str,
        entity_id: &str,
    ) -> StoreResult<AttributeDefinition> {
        tracing::debug!(workspace, entity_id, "fetching entity details");
        let _loading = self.loaders.start(LoaderKind::FetchObjectDetails);
        let result = self
            .api
            .get_attribute(workspace, entity_id)
            .await
            .map_err(StoreError::from);
        let entity = self.error.record("fetch_entity_details", result)?;
        self.commit_details(entity_id, entity.clone());
        Ok(entity)
    }

    fn commit_details(&self, entity_id: &str, entity: AttributeDefinition) {
        let event = StoreEvent::EntityChanged {
            entity_id: entity_id.to_string(),
        };
        self.commit(event, |cache| {
            cache
                .entities
                .insert(entity_id.to_string(), EntityEntry::from_details(entity));
        });
    }

    /// Create a root entity and append it to its project's list.
    pub async fn create_entity(
        &self,
        workspace: &str,
        payload: &AttributePatch,
    ) -> StoreResult<AttributeDefinition> {
        let payload = payload.clone().with_type(AttributeType::Entity);
        tracing::debug!(workspace, project = ?payload.project, "creating entity");
        let result = self
            .api
            .create_attribute(workspace, &payload)
            .await
            .map_err(StoreError::from);
        let created = self.error.record("create_entity", result)?;

        let project_id = created.project.clone().or(payload.project);
        let event = match &project_id {
            Some(project_id) => StoreEvent::EntitiesChanged {
                project_id: project_id.clone(),
            },
            None => StoreEvent::EntityChanged {
                entity_id: created.id.clone(),
            },
        };
        self.commit(event, |cache| {
            if let Some(project_id) = project_id {
                cache
                    .projects
                    .entry(project_id)
                    .or_default()
                    .push(created.id.clone());
            }
            cache
                .entities
                .insert(created.id.clone(), EntityEntry::from_details(created.clone()));
        });
        Ok(created)
    }

    // ---- field attributes ----

    /// Create a field attribute under `entity_id`.
    ///
    /// The created attribute joins the entity's cached attributes. An entity
    /// that is not cached yet picks it up on its next details fetch.
    pub async fn create_entity_attribute(
        &self,
        workspace: &str,
        entity_id: &str,
        payload: &AttributePatch,
    ) -> StoreResult<AttributeDefinition> {
        let result = self
            .create_entity_attribute_inner(workspace, entity_id, payload)
            .await;
        self.error.record("create_entity_attribute", result)
    }

    async fn create_entity_attribute_inner(
        &self,
        workspace: &str,
        entity_id: &str,
        payload: &AttributePatch,
    ) -> StoreResult<AttributeDefinition> {
        tracing::debug!(workspace, entity_id, attribute_type = ?payload.attribute_type, "creating attribute");
        let _loading = self.loaders.start(LoaderKind::CreateObjectAttribute);
        let payload = payload.clone().with_parent(entity_id);
        let created = self.api.create_attribute(workspace, &payload).await?;

        let event = StoreEvent::EntityChanged {
            entity_id: entity_id.to_string(),
        };
        self.commit(event, |cache| match cache.entities.get_mut(entity_id) {
            Some(entry) => {
                entry.attributes.insert(created.id.clone(), created.clone());
            }
            None => tracing::debug!(entity_id, "entity not cached, attribute left for next fetch"),
        });
        Ok(created)
    }

    /// Update an attribute remotely, then shallow-merge `patch` locally.
    ///
    /// The server response is not used; the cache reflects the patch.
    pub async fn update_entity_attribute(
        &self,
        workspace: &str,
        entity_id: &str,
        attribute_id: &str,
        patch: &AttributePatch,
    ) -> StoreResult<()> {
        let result = async {
            self.require_attribute(entity_id, attribute_id)?;
            tracing::debug!(workspace, entity_id, attribute_id, "updating attribute");
            self.api
                .update_attribute(workspace, attribute_id, patch)
                .await?;
            let event = StoreEvent::EntityChanged {
                entity_id: entity_id.to_string(),
            };
            self.commit(event, |cache| {
                if let Some(attribute) = cache
                    .entities
                    .get_mut(entity_id)
                    .and_then(|entry| entry.attributes.get_mut(attribute_id))
                {
                    attribute.merge_patch(patch);
                }
            });
            Ok::<_, StoreError>(())
        }
        .await;
        self.error.record("update_entity_attribute", result)
    }

    pub async fn delete_entity_attribute(
        &self,
        workspace: &str,
        entity_id: &str,
        attribute_id: &str,
    ) -> StoreResult<()> {
        tracing::debug!(workspace, entity_id, attribute_id, "deleting attribute");
        let result = self
            .api
            .delete_attribute(workspace, attribute_id)
            .await
            .map_err(StoreError::from);
        self.error.record("delete_entity_attribute", result)?;

        let event = StoreEvent::EntityChanged {
            entity_id: entity_id.to_string(),
        };
        self.commit(event, |cache| {
            if let Some(entry) = cache.entities.get_mut(entity_id) {
                entry.attributes.remove(attribute_id);
            }
        });
        Ok(())
    }

    // ---- options ----

    /// Create an option under a select/multi-select attribute.
    pub async fn create_attribute_option(
        &self,
        workspace: &str,
        entity_id: &str,
        attribute_id: &str,
        payload: &AttributePatch,
    ) -> StoreResult<AttributeDefinition> {
        let result = async {
            self.require_option_holder(entity_id, attribute_id)?;
            tracing::debug!(workspace, entity_id, attribute_id, "creating option");
            let _loading = self.loaders.start(LoaderKind::CreateAttributeOption);
            let payload = payload
                .clone()
                .with_type(AttributeType::Option)
                .with_parent(attribute_id);
            let created = self.api.create_attribute(workspace, &payload).await?;

            let event = StoreEvent::EntityChanged {
                entity_id: entity_id.to_string(),
            };
            self.commit(event, |cache| {
                if let Ok(holder) = cache.option_holder_mut(entity_id, attribute_id) {
                    holder.children.retain(|option| option.id != created.id);
                    holder.children.push(created.clone());
                }
            });
            Ok::<_, StoreError>(created)
        }
        .await;
        self.error.record("create_attribute_option", result)
    }

    /// Merge `patch` into the cached option now, then update remotely.
    ///
    /// On failure the entity is refetched and replaces the cached one. Other
    /// options keep their `is_default` flag. Dropping the future before it
    /// settles evicts the entity.
    pub fn update_attribute_option<'a>(
        &'a self,
        workspace: &'a str,
        entity_id: &'a str,
        attribute_id: &'a str,
        option_id: &'a str,
        patch: &'a AttributePatch,
    ) -> impl Future<Output = StoreResult<()>> + Send + 'a {
        tracing::debug!(workspace, entity_id, attribute_id, option_id, "updating option");
        let applied = self.apply_to_options(entity_id, attribute_id, |options| {
            if let Some(option) = options.iter_mut().find(|o| o.id == option_id) {
                option.merge_patch(patch);
            }
        });
        let pending = applied.is_ok().then(|| self.evict_on_drop(entity_id));
        async move {
            let result = match applied {
                Ok(()) => {
                    let remote = self.api.update_attribute(workspace, option_id, patch);
                    self.settle_option_change(workspace, entity_id, remote).await
                }
                Err(err) => Err(err),
            };
            if let Some(pending) = pending {
                pending.settled();
            }
            self.error.record("update_attribute_option", result)
        }
    }

    /// Remove the cached option now, then delete remotely.
    ///
    /// On failure the entity is refetched and replaces the cached one.
    /// Dropping the future before it settles evicts the entity.
    pub fn delete_attribute_option<'a>(
        &'a self,
        workspace: &'a str,
        entity_id: &'a str,
        attribute_id: &'a str,
        option_id: &'a str,
    ) -> impl Future<Output = StoreResult<()>> + Send + 'a {
        tracing::debug!(workspace, entity_id, attribute_id, option_id, "deleting option");
        let applied = self.apply_to_options(entity_id, attribute_id, |options| {
            options.retain(|o| o.id != option_id);
        });
        let pending = applied.is_ok().then(|| self.evict_on_drop(entity_id));
        async move {
            let result = match applied {
                Ok(()) => {
                    let remote = self.api.delete_attribute(workspace, option_id);
                    self.settle_option_change(workspace, entity_id, remote).await
                }
                Err(err) => Err(err),
            };
            if let Some(pending) = pending {
                pending.settled();
            }
            self.error.record("delete_attribute_option", result)
        }
    }

    fn apply_to_options(
        &self,
        entity_id: &str,
        attribute_id: &str,
        change: impl FnOnce(&mut Vec<AttributeDefinition>),
    ) -> StoreResult<()> {
        let event = StoreEvent::EntityChanged {
            entity_id: entity_id.to_string(),
        };
        {
            let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
            let holder = cache.option_holder_mut(entity_id, attribute_id)?;
            change(&mut holder.children);
        }
        self.events.emit(event);
        Ok(())
    }

    /// Unverified state must not be served; readers refetch.
    fn evict_entity(&self, entity_id: &str) {
        let event = StoreEvent::EntityChanged {
            entity_id: entity_id.to_string(),
        };
        self.commit(event, |cache| {
            cache.entities.remove(entity_id);
        });
    }

    fn evict_on_drop<'a>(&'a self, entity_id: &'a str) -> Pending<impl FnOnce() + Send + 'a> {
        Pending::new(move || {
            tracing::warn!(entity_id, "option change dropped before settling, evicting entity");
            self.evict_entity(entity_id);
        })
    }

    async fn settle_option_change(
        &self,
        workspace: &str,
        entity_id: &str,
        remote: impl Future<Output = ApiResult<()>>,
    ) -> StoreResult<()> {
        let settled = reconcile(remote, || self.api.get_attribute(workspace, entity_id)).await;
        let Some(error) = settled.error() else {
            return Ok(());
        };
        match settled {
            Settled::Resynced { state, .. } => self.commit_details(entity_id, state),
            Settled::Diverged { .. } => self.evict_entity(entity_id),
            Settled::Confirmed(()) => {}
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracker_client::ApiError;
    use tracker_client::mock::{MockAttributesApi, MockMethod};

    fn seeded() -> (Arc<MockAttributesApi>, AttributeDefinitionStore) {
        let api = Arc::new(MockAttributesApi::new());
        let mut entity = AttributeDefinition::new("e1", AttributeType::Entity, "Bug");
        entity.project = Some("p1".to_string());
        let mut effort = AttributeDefinition::new("n1", AttributeType::Number, "Effort");
        effort.sort_order = 2.0;
        let mut done = AttributeDefinition::new("c1", AttributeType::Checkbox, "Done");
        done.sort_order = 1.0;
        entity.children = vec![effort, done];
        api.seed_definition(entity);
        let store = AttributeDefinitionStore::new(api.clone());
        (api, store)
    }

    #[tokio::test]
    async fn list_then_details_fills_attribute_index() {
        let (_api, store) = seeded();
        let roots = store.fetch_entities_list("ws", "p1").await.unwrap();
        assert_eq!(roots.len(), 1);
        assert!(!store.has_details("e1"));
        assert!(store.entity_attributes("e1").is_empty());

        store.fetch_entity_details("ws", "e1").await.unwrap();
        assert!(store.has_details("e1"));
        let ids: Vec<String> = store
            .entity_attributes("e1")
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(ids, vec!["c1".to_string(), "n1".to_string()]);
        assert_eq!(store.entities("p1")[0].children.len(), 2);
    }

    #[tokio::test]
    async fn refreshing_list_keeps_loaded_attributes() {
        let (_api, store) = seeded();
        store.fetch_entity_details("ws", "e1").await.unwrap();
        store.fetch_entities_list("ws", "p1").await.unwrap();
        assert!(store.has_details("e1"));
        assert_eq!(store.entity_attributes("e1").len(), 2);
    }

    #[tokio::test]
    async fn create_attribute_under_uncached_entity_reaches_server() {
        let (api, store) = seeded();
        let payload = AttributeType::Text.creation_payload("e1");
        let created = store
            .create_entity_attribute("ws", "e1", &payload)
            .await
            .unwrap();

        assert_eq!(api.call_count(MockMethod::CreateAttribute), 1);
        assert!(store.entity("e1").is_none());
        assert_eq!(store.last_error(), None);

        store.fetch_entity_details("ws", "e1").await.unwrap();
        assert_eq!(store.attribute("e1", &created.id), Some(created));
    }

    #[tokio::test]
    async fn update_merges_patch_without_refetch() {
        let (api, store) = seeded();
        store.fetch_entity_details("ws", "e1").await.unwrap();
        let patch = AttributePatch::default().with_display_name("Story points");
        store
            .update_entity_attribute("ws", "e1", "n1", &patch)
            .await
            .unwrap();
        assert_eq!(
            store.attribute("e1", "n1").unwrap().display_name,
            "Story points"
        );
        assert_eq!(api.call_count(MockMethod::GetAttribute), 1);
    }

    #[tokio::test]
    async fn failed_update_leaves_cache_and_sets_error() {
        let (api, store) = seeded();
        store.fetch_entity_details("ws", "e1").await.unwrap();
        api.fail_next(
            MockMethod::UpdateAttribute,
            ApiError::rejected(400, serde_json::json!({"display_name": ["too long"]})),
        );
        let patch = AttributePatch::default().with_display_name("x".repeat(300));
        let err = store
            .update_entity_attribute("ws", "e1", "n1", &patch)
            .await
            .unwrap_err();
        assert_eq!(err.category(), crate::ErrorCategory::Rejected);
        assert_eq!(store.attribute("e1", "n1").unwrap().display_name, "Effort");
        assert!(store.last_error().is_some());
        store.clear_error();
        assert!(store.last_error().is_none());
    }

    #[tokio::test]
    async fn delete_removes_attribute_after_success() {
        let (_api, store) = seeded();
        store.fetch_entity_details("ws", "e1").await.unwrap();
        store.delete_entity_attribute("ws", "e1", "c1").await.unwrap();
        assert!(store.attribute("e1", "c1").is_none());
        assert_eq!(store.entity_attributes("e1").len(), 1);
    }

    #[tokio::test]
    async fn options_require_select_holder() {
        let (_api, store) = seeded();
        store.fetch_entity_details("ws", "e1").await.unwrap();
        let err = store
            .create_attribute_option("ws", "e1", "n1", &AttributePatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotAnOptionHolder { .. }));
    }

    #[tokio::test]
    async fn create_entity_appends_to_project_list() {
        let (_api, store) = seeded();
        store.fetch_entities_list("ws", "p1").await.unwrap();
        let mut events = store.subscribe();
        let payload = AttributePatch::default()
            .with_display_name("Epic")
            .with_project("p1");
        let created = store.create_entity("ws", &payload).await.unwrap();

        assert_eq!(created.attribute_type, AttributeType::Entity);
        let names: Vec<String> = store
            .entities("p1")
            .into_iter()
            .map(|e| e.display_name)
            .collect();
        assert_eq!(names, vec!["Bug".to_string(), "Epic".to_string()]);
        assert_eq!(
            events.try_recv().unwrap(),
            StoreEvent::EntitiesChanged {
                project_id: "p1".to_string()
            }
        );
    }
}
