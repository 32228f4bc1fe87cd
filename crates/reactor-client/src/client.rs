//! HTTP client for the Reactor API

use async_trait::async_trait;
use reqwest::{Client, StatusCode, header};
use serde_json::{Value, json};

use reactor_core::model::{Document, ExtensionPackage};
use reactor_core::{
    Endpoint, PageRequest, ReactorApi, RemoteResult, ResourceRecord, ResourceType,
    UpdateOperation,
};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};

const JSON_API: &str = "application/vnd.api+json";
const ACCEPT: &str = "application/vnd.api+json;revision=1";

/// HTTP client for the Reactor API
///
/// # Example
///
/// ```rust,no_run
/// use reactor_client::{ClientConfig, ReactorClient};
/// use reactor_core::ReactorApi;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = ClientConfig::new("https://reactor.adobe.io", "token");
/// config.api_key = "client-id".into();
/// let client = ReactorClient::new(config)?;
///
/// let property = client.get_property("PR123").await?;
/// # Ok(())
/// # }
/// ```
pub struct ReactorClient {
    config: ClientConfig,
    client: Client,
}

impl ReactorClient {
    /// Create a new client with authentication headers preset.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", config.access_token))
                .map_err(|_| ClientError::InvalidHeader("authorization"))?,
        );
        headers.insert(
            "x-api-key",
            header::HeaderValue::from_str(&config.api_key)
                .map_err(|_| ClientError::InvalidHeader("x-api-key"))?,
        );
        if let Some(ref org_id) = config.org_id {
            headers.insert(
                "x-gw-ims-org-id",
                header::HeaderValue::from_str(org_id)
                    .map_err(|_| ClientError::InvalidHeader("x-gw-ims-org-id"))?,
            );
        }
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(ACCEPT));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url, path)
    }

    async fn get_document<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Document<T>> {
        tracing::debug!(url, "GET");
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    async fn patch_document(&self, url: &str, body: &Value) -> Result<Document<ResourceRecord>> {
        tracing::debug!(url, "PATCH");
        let response = self
            .client
            .patch(url)
            .header(header::CONTENT_TYPE, JSON_API)
            .json(body)
            .send()
            .await?;
        self.handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Page query for a collection URL
pub fn page_query(page: PageRequest) -> String {
    format!("page[number]={}&page[size]={}", page.number, page.size)
}

/// JSON:API body for an update. Only extension updates carry relationships.
pub fn update_body(operation: UpdateOperation, record: &ResourceRecord) -> Value {
    let mut data = json!({
        "id": record.id,
        "type": record.kind.as_str(),
        "attributes": record.attributes,
    });
    if operation == UpdateOperation::Extension && !record.relationships.is_empty() {
        data["relationships"] = Value::Object(record.relationships.clone());
    }
    json!({ "data": data })
}

/// JSON:API body asking for a new draft revision.
pub fn revise_body(endpoint: Endpoint, id: &str) -> Value {
    json!({
        "data": {
            "id": id,
            "type": endpoint.path(),
            "meta": { "action": "revise" }
        }
    })
}

fn single<T>(document: Document<T>) -> Result<T> {
    document
        .data
        .into_vec()
        .into_iter()
        .next()
        .ok_or_else(|| ClientError::InvalidResponse("response has no data".to_string()))
}

/// First JSON:API error title or detail, falling back to the raw body.
fn error_message(status: StatusCode, body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    let first_error = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .and_then(|errors| errors.get(0));
    let text = first_error
        .and_then(|e| e.get("detail").or_else(|| e.get("title")))
        .and_then(Value::as_str);
    match text {
        Some(text) => text.to_string(),
        None if body.trim().is_empty() => status.to_string(),
        None => body.to_string(),
    }
}

#[async_trait]
impl ReactorApi for ReactorClient {
    async fn get_property(&self, property_id: &str) -> RemoteResult<Document<ResourceRecord>> {
        let url = self.url(&format!("properties/{property_id}"));
        Ok(self.get_document(&url).await?)
    }

    async fn list_for_property(
        &self,
        endpoint: Endpoint,
        property_id: &str,
        page: PageRequest,
    ) -> RemoteResult<Document<ResourceRecord>> {
        let url = self.url(&format!(
            "properties/{property_id}/{}?{}",
            endpoint.path(),
            page_query(page)
        ));
        Ok(self.get_document(&url).await?)
    }

    async fn list_rule_components_for_rule(
        &self,
        rule_id: &str,
        page: PageRequest,
    ) -> RemoteResult<Document<ResourceRecord>> {
        let url = self.url(&format!(
            "rules/{rule_id}/{}?{}",
            ResourceType::RuleComponent.as_str(),
            page_query(page)
        ));
        Ok(self.get_document(&url).await?)
    }

    async fn get(&self, endpoint: Endpoint, id: &str) -> RemoteResult<ResourceRecord> {
        let url = self.url(&format!("{}/{id}", endpoint.path()));
        Ok(single(self.get_document(&url).await?)?)
    }

    async fn update(
        &self,
        operation: UpdateOperation,
        record: &ResourceRecord,
    ) -> RemoteResult<ResourceRecord> {
        let collection = match operation {
            UpdateOperation::Resource(endpoint) => endpoint.path(),
            UpdateOperation::Extension => ResourceType::Extension.as_str(),
        };
        let url = self.url(&format!("{collection}/{}", record.id));
        let body = update_body(operation, record);
        Ok(single(self.patch_document(&url, &body).await?)?)
    }

    async fn revise(&self, endpoint: Endpoint, id: &str) -> RemoteResult<ResourceRecord> {
        let url = self.url(&format!("{}/{id}", endpoint.path()));
        Ok(single(self.patch_document(&url, &revise_body(endpoint, id)).await?)?)
    }

    async fn get_extension_package(&self, id: &str) -> RemoteResult<ExtensionPackage> {
        let url = self.url(&format!("extension_packages/{id}"));
        Ok(single(self.get_document(&url).await?)?)
    }
}
