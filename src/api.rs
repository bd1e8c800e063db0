use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ErrorKind, Result};

// ============================================================================
// Listing Models
// ============================================================================

/// One installed model, as returned by `GET /api/tags`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelTag {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

/// One loaded model process, as returned by `GET /api/ps`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

// Both endpoints wrap their list in a `models` key; tolerate it missing.
// The explicit bound keeps the derive from demanding `T: Default` for the
// defaulted Vec.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: serde::de::DeserializeOwned"))]
struct ModelListing<T> {
    #[serde(default)]
    models: Vec<T>,
}

// ============================================================================
// Api Client
// ============================================================================

/// Request/response client for the non-streaming sibling endpoints. These
/// feed the model selection that goes into a generation request.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Reachability probe against `/api/tags`.
    pub async fn check(&self) -> bool {
        match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Installed models.
    pub async fn list_models(&self) -> Result<Vec<ModelTag>> {
        self.fetch_listing("/api/tags").await
    }

    /// Currently loaded model processes.
    pub async fn list_processes(&self) -> Result<Vec<ProcessEntry>> {
        self.fetch_listing("/api/ps").await
    }

    async fn fetch_listing<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
            .map_err(|e| ClientError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::http(status.as_u16(), body));
        }

        // MalformedRecord is reserved for stream-internal recovery; a listing
        // with an undecodable body is a bad response from the endpoint.
        let listing: ModelListing<T> = response.json().await.map_err(|e| {
            ClientError::new(ErrorKind::HttpError, format!("unreadable listing body: {}", e))
        })?;
        Ok(listing.models)
    }
}

// ============================================================================
// Tests
// ============================================================================
