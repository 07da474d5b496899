//! In-memory webhook endpoint registry
//!
//! Endpoints live for the lifetime of the process. Each one owns an
//! append-only list of captured requests in arrival order. The public base
//! URL is swappable at runtime so a tunnel coming up or going away changes
//! the URLs handed out for new endpoints.

mod capture;

pub use capture::{CapturedRequest, normalize_headers, parse_body, verification_challenge};

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Random bytes behind a webhook id (128 bits, hex encoded to 32 chars)
pub const WEBHOOK_ID_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("webhook not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEndpoint {
    pub id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub requests: Vec<CapturedRequest>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub id: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub request_count: usize,
}

impl From<&WebhookEndpoint> for EndpointSummary {
    fn from(endpoint: &WebhookEndpoint) -> Self {
        Self {
            id: endpoint.id.clone(),
            url: endpoint.url.clone(),
            created_at: endpoint.created_at,
            request_count: endpoint.requests.len(),
        }
    }
}

/// Generate an unguessable webhook id from the OS entropy source
pub fn generate_webhook_id() -> String {
    let mut bytes = [0u8; WEBHOOK_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub struct WebhookRegistry {
    endpoints: RwLock<HashMap<String, WebhookEndpoint>>,
    public_url: ArcSwapOption<String>,
}

impl WebhookRegistry {
    pub fn new(public_url: Option<String>) -> Self {
        Self {
            endpoints: RwLock::new(HashMap::new()),
            public_url: ArcSwapOption::from(public_url.map(|url| Arc::new(normalize_base(&url)))),
        }
    }

    /// Base URL of the live public tunnel, if one is up
    pub fn public_url(&self) -> Option<String> {
        self.public_url.load_full().map(|url| url.as_ref().clone())
    }

    pub fn set_public_url(&self, url: Option<String>) {
        info!(public_url = ?url, "Public URL changed");
        self.public_url
            .store(url.map(|url| Arc::new(normalize_base(&url))));
    }

    pub fn is_live(&self) -> bool {
        self.public_url.load().is_some()
    }

    /// Mint a fresh endpoint
    ///
    /// The URL is built on the public base when one is live, otherwise on
    /// `fallback_base` (typically derived from the inbound request's host).
    pub async fn create_endpoint(&self, fallback_base: &str) -> WebhookEndpoint {
        let base = self
            .public_url()
            .unwrap_or_else(|| normalize_base(fallback_base));

        let mut endpoints = self.endpoints.write().await;
        let id = loop {
            let candidate = generate_webhook_id();
            if !endpoints.contains_key(&candidate) {
                break candidate;
            }
        };

        let endpoint = WebhookEndpoint {
            url: format!("{base}/hooks/{id}"),
            id: id.clone(),
            created_at: Utc::now(),
            requests: Vec::new(),
        };
        endpoints.insert(id, endpoint.clone());

        info!(webhook_id = %endpoint.id, url = %endpoint.url, "Webhook endpoint created");
        endpoint
    }

    /// Append a captured request to the endpoint's history and return it
    pub async fn capture(
        &self,
        id: &str,
        request: CapturedRequest,
    ) -> Result<CapturedRequest, RegistryError> {
        let mut endpoints = self.endpoints.write().await;
        let endpoint = endpoints
            .get_mut(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        debug!(
            webhook_id = id,
            method = %request.method,
            position = endpoint.requests.len(),
            "Request captured"
        );
        endpoint.requests.push(request.clone());
        Ok(request)
    }

    pub async fn get(&self, id: &str) -> Result<WebhookEndpoint, RegistryError> {
        self.endpoints
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    pub async fn url_of(&self, id: &str) -> Option<String> {
        self.endpoints.read().await.get(id).map(|e| e.url.clone())
    }

    /// Summaries of all endpoints, oldest first
    pub async fn list(&self) -> Vec<EndpointSummary> {
        let endpoints = self.endpoints.read().await;
        let mut summaries: Vec<EndpointSummary> =
            endpoints.values().map(EndpointSummary::from).collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    pub async fn len(&self) -> usize {
        self.endpoints.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn normalize_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
