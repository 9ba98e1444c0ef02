//! reqwest implementation of [`AttributesApi`].

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracker_attributes::{AttributeDefinition, AttributePatch, AttributeValue, ValuesPayload};

use crate::AttributesApi;
use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};

const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client for the attribute endpoints.
#[derive(Clone, Debug)]
pub struct HttpAttributesClient {
    client: reqwest::Client,
    origin: String,
}

#[derive(Serialize)]
struct CreateValuesBody<'a> {
    issue_properties: &'a ValuesPayload,
}

impl HttpAttributesClient {
    pub fn new(config: &ClientConfig) -> ApiResult<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| ApiError::InvalidConfig(format!("api_key is not a header value: {e}")))?;
            headers.insert(API_KEY_HEADER, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ApiError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            origin: config.origin().to_string(),
        })
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let origin: String = base_url.into();
        Self {
            client,
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, workspace: &str, path: &str) -> String {
        format!("{}/api/workspaces/{workspace}/{path}", self.origin)
    }

    fn values_url(&self, workspace: &str, project_id: &str, issue_id: &str) -> String {
        self.url(
            workspace,
            &format!("projects/{project_id}/issues/{issue_id}/property-values/"),
        )
    }

    async fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        tracing::warn!(status = status.as_u16(), %body, "attribute API rejected request");
        Err(ApiError::rejected(status.as_u16(), body))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = self.send(request).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, request: RequestBuilder) -> ApiResult<()> {
        self.send(request).await.map(|_| ())
    }
}

#[async_trait]
impl AttributesApi for HttpAttributesClient {
    #[tracing::instrument(skip(self), err)]
    async fn list_entities(
        &self,
        workspace: &str,
        project_id: &str,
    ) -> ApiResult<Vec<AttributeDefinition>> {
        let request = self
            .client
            .get(self.url(workspace, "entity-properties/"))
            .query(&[("project", project_id)]);
        self.send_json(request).await
    }

    #[tracing::instrument(skip(self), err)]
    async fn get_attribute(
        &self,
        workspace: &str,
        attribute_id: &str,
    ) -> ApiResult<AttributeDefinition> {
        let request = self
            .client
            .get(self.url(workspace, &format!("properties/{attribute_id}/")));
        self.send_json(request).await
    }

    #[tracing::instrument(skip(self, payload), fields(attribute_type = ?payload.attribute_type), err)]
    async fn create_attribute(
        &self,
        workspace: &str,
        payload: &AttributePatch,
    ) -> ApiResult<AttributeDefinition> {
        let request = self
            .client
            .post(self.url(workspace, "properties/"))
            .json(payload);
        self.send_json(request).await
    }

    #[tracing::instrument(skip(self, patch), err)]
    async fn update_attribute(
        &self,
        workspace: &str,
        attribute_id: &str,
        patch: &AttributePatch,
    ) -> ApiResult<()> {
        let request = self
            .client
            .patch(self.url(workspace, &format!("properties/{attribute_id}/")))
            .json(patch);
        self.send_empty(request).await
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_attribute(&self, workspace: &str, attribute_id: &str) -> ApiResult<()> {
        let request = self
            .client
            .delete(self.url(workspace, &format!("properties/{attribute_id}/")));
        self.send_empty(request).await
    }

    #[tracing::instrument(skip(self), err)]
    async fn list_values(
        &self,
        workspace: &str,
        project_id: &str,
        issue_id: &str,
    ) -> ApiResult<Vec<AttributeValue>> {
        let request = self
            .client
            .get(self.values_url(workspace, project_id, issue_id));
        self.send_json(request).await
    }

    #[tracing::instrument(skip(self, payload), fields(attributes = payload.len()), err)]
    async fn create_values(
        &self,
        workspace: &str,
        project_id: &str,
        issue_id: &str,
        payload: &ValuesPayload,
    ) -> ApiResult<Vec<AttributeValue>> {
        let request = self
            .client
            .post(self.values_url(workspace, project_id, issue_id))
            .json(&CreateValuesBody {
                issue_properties: payload,
            });
        self.send_json(request).await
    }

    #[tracing::instrument(skip(self), err)]
    async fn delete_value(
        &self,
        workspace: &str,
        project_id: &str,
        issue_id: &str,
        attribute_id: &str,
    ) -> ApiResult<()> {
        let url = format!(
            "{}{attribute_id}/",
            self.values_url(workspace, project_id, issue_id)
        );
        self.send_empty(self.client.delete(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn builds_workspace_scoped_urls() {
        let client = HttpAttributesClient::with_client(reqwest::Client::new(), "http://host:1/");
        assert_eq!(
            client.url("acme", "properties/p1/"),
            "http://host:1/api/workspaces/acme/properties/p1/"
        );
        assert_eq!(
            client.values_url("acme", "proj", "iss"),
            "http://host:1/api/workspaces/acme/projects/proj/issues/iss/property-values/"
        );
    }

    #[test]
    fn rejects_api_key_with_newline() {
        let cfg = ClientConfig {
            api_key: Some("bad\nkey".to_string()),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpAttributesClient::new(&cfg),
            Err(ApiError::InvalidConfig(_))
        ));
    }
}
