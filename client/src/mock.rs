//! In-memory [`AttributesApi`] for tests.
//!
//! Behaves like the server: assigns ids, expands children on
//! `get_attribute`, upserts values. Failures can be queued per method.

#![allow(clippy::unwrap_used)] // Mock code: panicking on poisoned lock is acceptable in tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use tracker_attributes::{AttributeDefinition, AttributePatch, AttributeValue, ValuesPayload};

use crate::AttributesApi;
use crate::error::{ApiError, ApiResult};

/// Which remote operation a call or programmed failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockMethod {
    ListEntities,
    GetAttribute,
    CreateAttribute,
    UpdateAttribute,
    DeleteAttribute,
    ListValues,
    CreateValues,
    DeleteValue,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    /// Every definition, flat, keyed by id. Children are derived from `parent`.
    definitions: Vec<AttributeDefinition>,
    /// (project, issue) -> values in insertion order.
    values: HashMap<(String, String), Vec<AttributeValue>>,
    failures: HashMap<MockMethod, VecDeque<ApiError>>,
    calls: Vec<MockMethod>,
}

impl MockState {
    fn enter(&mut self, method: MockMethod) -> ApiResult<()> {
        self.calls.push(method);
        match self.failures.get_mut(&method).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn find(&self, id: &str) -> Option<&AttributeDefinition> {
        self.definitions.iter().find(|d| d.id == id)
    }

    fn expand(&self, id: &str) -> Option<AttributeDefinition> {
        let mut def = self.find(id)?.clone();
        def.children = self
            .definitions
            .iter()
            .filter(|d| d.parent.as_deref() == Some(id))
            .filter_map(|d| self.expand(&d.id))
            .collect();
        Some(def)
    }

    fn remove_tree(&mut self, id: &str) {
        let children: Vec<String> = self
            .definitions
            .iter()
            .filter(|d| d.parent.as_deref() == Some(id))
            .map(|d| d.id.clone())
            .collect();
        for child in children {
            self.remove_tree(&child);
        }
        self.definitions.retain(|d| d.id != id);
    }
}

fn not_found(id: &str) -> ApiError {
    ApiError::rejected(404, serde_json::json!({ "error": format!("{id} not found") }))
}

#[derive(Debug, Default)]
pub struct MockAttributesApi {
    state: Mutex<MockState>,
}

impl MockAttributesApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a definition (and, flattened, all of its children).
    pub fn seed_definition(&self, definition: AttributeDefinition) {
        let mut state = self.state.lock().unwrap();
        let mut pending = vec![definition];
        while let Some(mut def) = pending.pop() {
            for mut child in std::mem::take(&mut def.children) {
                child.parent.get_or_insert_with(|| def.id.clone());
                pending.push(child);
            }
            state.definitions.retain(|d| d.id != def.id);
            state.definitions.push(def);
        }
    }

    pub fn seed_values(&self, project_id: &str, issue_id: &str, values: Vec<AttributeValue>) {
        self.state
            .lock()
            .unwrap()
            .values
            .insert((project_id.to_string(), issue_id.to_string()), values);
    }

    /// Make the next call of `method` fail with `error`.
    pub fn fail_next(&self, method: MockMethod, error: ApiError) {
        self.state
            .lock()
            .unwrap()
            .failures
            .entry(method)
            .or_default()
            .push_back(error);
    }

    pub fn calls(&self) -> Vec<MockMethod> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, method: MockMethod) -> usize {
        self.calls().into_iter().filter(|m| *m == method).count()
    }

    /// Server-side definition with children expanded.
    pub fn definition(&self, id: &str) -> Option<AttributeDefinition> {
        self.state.lock().unwrap().expand(id)
    }

    /// Server-side values for a record.
    pub fn server_values(&self, project_id: &str, issue_id: &str) -> Vec<AttributeValue> {
        self.state
            .lock()
            .unwrap()
            .values
            .get(&(project_id.to_string(), issue_id.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl AttributesApi for MockAttributesApi {
    async fn list_entities(
        &self,
        _workspace: &str,
        project_id: &str,
    ) -> ApiResult<Vec<AttributeDefinition>> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::ListEntities)?;
        Ok(state
            .definitions
            .iter()
            .filter(|d| d.attribute_type.is_container())
            .filter(|d| d.project.as_deref() == Some(project_id))
            .cloned()
            .collect())
    }

    async fn get_attribute(
        &self,
        _workspace: &str,
        attribute_id: &str,
    ) -> ApiResult<AttributeDefinition> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::GetAttribute)?;
        state.expand(attribute_id).ok_or_else(|| not_found(attribute_id))
    }

    async fn create_attribute(
        &self,
        workspace: &str,
        payload: &AttributePatch,
    ) -> ApiResult<AttributeDefinition> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::CreateAttribute)?;
        if payload.attribute_type.is_none() {
            return Err(ApiError::rejected(
                400,
                serde_json::json!({ "type": ["This field is required."] }),
            ));
        }
        if let Some(parent) = &payload.parent
            && state.find(parent).is_none()
        {
            return Err(not_found(parent));
        }
        state.next_id += 1;
        let id = format!("attr-{}", state.next_id);
        let mut def = payload.clone().into_definition(id);
        def.workspace = Some(workspace.to_string());
        state.definitions.push(def.clone());
        Ok(def)
    }

    async fn update_attribute(
        &self,
        _workspace: &str,
        attribute_id: &str,
        patch: &AttributePatch,
    ) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::UpdateAttribute)?;
        let def = state
            .definitions
            .iter_mut()
            .find(|d| d.id == attribute_id)
            .ok_or_else(|| not_found(attribute_id))?;
        def.merge_patch(patch);
        Ok(())
    }

    async fn delete_attribute(&self, _workspace: &str, attribute_id: &str) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::DeleteAttribute)?;
        if state.find(attribute_id).is_none() {
            return Err(not_found(attribute_id));
        }
        state.remove_tree(attribute_id);
        Ok(())
    }

    async fn list_values(
        &self,
        _workspace: &str,
        project_id: &str,
        issue_id: &str,
    ) -> ApiResult<Vec<AttributeValue>> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::ListValues)?;
        Ok(state
            .values
            .get(&(project_id.to_string(), issue_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn create_values(
        &self,
        _workspace: &str,
        project_id: &str,
        issue_id: &str,
        payload: &ValuesPayload,
    ) -> ApiResult<Vec<AttributeValue>> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::CreateValues)?;
        let values = state
            .values
            .entry((project_id.to_string(), issue_id.to_string()))
            .or_default();
        for (id, tuples) in payload {
            match values.iter_mut().find(|v| &v.id == id) {
                Some(existing) => existing.prop_value = tuples.clone(),
                None => values.push(AttributeValue::new(id.clone(), tuples.clone())),
            }
        }
        Ok(values.clone())
    }

    async fn delete_value(
        &self,
        _workspace: &str,
        project_id: &str,
        issue_id: &str,
        attribute_id: &str,
    ) -> ApiResult<()> {
        let mut state = self.state.lock().unwrap();
        state.enter(MockMethod::DeleteValue)?;
        if let Some(values) = state
            .values
            .get_mut(&(project_id.to_string(), issue_id.to_string()))
        {
            values.retain(|v| v.id != attribute_id);
        }
        Ok(())
    }
}
