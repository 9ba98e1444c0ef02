//! REST collaborator for custom attributes.
//!
//! All calls live under `/api/workspaces/{workspace}/`:
//!
//! - `GET  entity-properties/?project={id}` lists root entities
//! - `GET|POST|PATCH|DELETE properties/{id}/` handles entities, field
//!   attributes and options alike (the payload `type` discriminates)
//! - `GET|POST projects/{project}/issues/{issue}/property-values/`
//! - `DELETE projects/{project}/issues/{issue}/property-values/{attribute}/`
//!
//! [`AttributesApi`] is the seam the stores depend on;
//! [`HttpAttributesClient`] is the reqwest implementation and
//! `mock::MockAttributesApi` (feature `test-utils`) an in-memory one.

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod config;
mod error;
mod http;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use config::ClientConfig;
pub use error::{ApiError, ApiResult};
pub use http::HttpAttributesClient;

use async_trait::async_trait;
use tracker_attributes::{AttributeDefinition, AttributePatch, AttributeValue, ValuesPayload};

/// Remote operations consumed by the attribute stores.
#[async_trait]
pub trait AttributesApi: Send + Sync {
    /// Root entity definitions of a project, without children.
    async fn list_entities(
        &self,
        workspace: &str,
        project_id: &str,
    ) -> ApiResult<Vec<AttributeDefinition>>;

    /// One definition with its children expanded.
    async fn get_attribute(
        &self,
        workspace: &str,
        attribute_id: &str,
    ) -> ApiResult<AttributeDefinition>;

    async fn create_attribute(
        &self,
        workspace: &str,
        payload: &AttributePatch,
    ) -> ApiResult<AttributeDefinition>;

    /// The response body is ignored; callers merge `patch` locally.
    async fn update_attribute(
        &self,
        workspace: &str,
        attribute_id: &str,
        patch: &AttributePatch,
    ) -> ApiResult<()>;

    async fn delete_attribute(&self, workspace: &str, attribute_id: &str) -> ApiResult<()>;

    async fn list_values(
        &self,
        workspace: &str,
        project_id: &str,
        issue_id: &str,
    ) -> ApiResult<Vec<AttributeValue>>;

    /// Upsert: each attribute id in `payload` replaces its stored tuples.
    /// Returns every value of the record after the write.
    async fn create_values(
        &self,
        workspace: &str,
        project_id: &str,
        issue_id: &str,
        payload: &ValuesPayload,
    ) -> ApiResult<Vec<AttributeValue>>;

    async fn delete_value(
        &self,
        workspace: &str,
        project_id: &str,
        issue_id: &str,
        attribute_id: &str,
    ) -> ApiResult<()>;
}
