//! HTTP client for the object metadata endpoint.
//!
//! Fetches `GET .../objects/{id}` documents using [`reqwest`]. The
//! [`ObjectMetadataSource`] trait is the seam the resolver depends on.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ResolveError;

/// Object metadata document returned by `GET /objects/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DrsObject {
    #[serde(default)]
    pub id: Option<String>,
    /// Ordered list of ways to retrieve the object's bytes.
    #[serde(default)]
    pub access_methods: Vec<AccessMethod>,
}

/// One retrieval option for an object.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccessMethod {
    /// Transport kind (`file`, `https`, `s3`, ...), informational only.
    #[serde(rename = "type", default)]
    pub method_type: Option<String>,
    /// Direct location, when the object can be fetched as-is.
    #[serde(default)]
    pub access_url: Option<AccessUrl>,
    /// Identifier for a streaming retrieval through the metadata service.
    #[serde(default)]
    pub access_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AccessUrl {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<String>,
}

/// Something that can fetch an object metadata document by URL.
#[async_trait]
pub trait ObjectMetadataSource: Send + Sync {
    async fn fetch_object(&self, objects_url: &str) -> Result<DrsObject, ResolveError>;
}

/// HTTP implementation of [`ObjectMetadataSource`].
pub struct DrsApi {
    client: reqwest::Client,
}

impl DrsApi {
    /// Create a client whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Reuse an existing [`reqwest::Client`] (shared connection pool).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectMetadataSource for DrsApi {
    async fn fetch_object(&self, objects_url: &str) -> Result<DrsObject, ResolveError> {
        tracing::debug!(url = %objects_url, "Fetching object metadata");

        let response = self
            .client
            .get(objects_url)
            .send()
            .await
            .map_err(|source| ResolveError::Unreachable {
                url: objects_url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ResolveError::Api {
                url: objects_url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<DrsObject>()
            .await
            .map_err(|e| ResolveError::InvalidMetadata {
                url: objects_url.to_string(),
                reason: e.to_string(),
            })
    }
}
