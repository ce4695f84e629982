//! HTTP client for the fuzzy card name endpoint

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::time::Duration;
use tracing::debug;

use super::{CardLookup, CardRecord};
use crate::config::LookupSettings;
use crate::error::{ScanError, ScanResult};

/// Fuzzy name lookup over HTTP
pub struct ScryfallClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ScryfallClient {
    pub fn new(settings: &LookupSettings) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
        })
    }
}

#[async_trait]
impl CardLookup for ScryfallClient {
    async fn lookup(&self, query: &str) -> ScanResult<CardRecord> {
        debug!("Looking up {:?}", query);

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("fuzzy", query)])
            .send()
            .await
            .map_err(|e| ScanError::LookupFailure(format!("request failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(ScanError::LookupFailure(format!(
                "no match for {:?} (status {})",
                query, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ScanError::LookupFailure(format!("failed to read body: {}", e)))?;

        serde_json::from_str(&body)
            .map_err(|e| ScanError::LookupFailure(format!("malformed response: {}", e)))
    }
}
