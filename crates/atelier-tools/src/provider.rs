// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: Apache-2.0
//! HTTP-backed image provider.
//!
//! Posts the prompt as JSON to a configured endpoint and expects raw image
//! bytes back.  The endpoint hides whichever vendor actually renders the
//! image; the server core only deals in PNG bytes.

use async_trait::async_trait;
use anyhow::Context;

use crate::context::ImageProvider;

pub struct HttpImageProvider {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpImageProvider {
    /// `api_key_env` names an environment variable read at construction
    /// time, so secrets never travel through config files.
    pub fn new(endpoint: String, api_key_env: Option<&str>) -> Self {
        let api_key = api_key_env.and_then(|var| std::env::var(var).ok());
        Self {
            endpoint,
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageProvider for HttpImageProvider {
    async fn generate(&self, prompt: &str) -> anyhow::Result<Vec<u8>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "prompt": prompt }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .context("image provider request failed")?
            .error_for_status()
            .context("image provider returned an error status")?;

        let bytes = response
            .bytes()
            .await
            .context("reading image provider response")?;
        Ok(bytes.to_vec())
    }
}
