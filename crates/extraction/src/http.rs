use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use dealdesk_core::config::ExtractionServiceConfig;
use secrecy::ExposeSecret;
use serde_json::{json, Value};

use crate::client::{DraftRequest, DraftingClient, ExtractionClient, ExtractionRequest};
use crate::schema::extraction_output_schema;

/// Reqwest-backed client for the hosted extraction service. Transient
/// failures (network errors and 5xx responses) are retried up to the
/// configured limit; 4xx responses are not, since resending the same
/// document cannot fix them.
pub struct HttpExtractionClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl HttpExtractionClient {
    pub fn new(config: &ExtractionServiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("building extraction http client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            max_retries: config.max_retries,
        })
    }

    async fn post_json(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{path}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let mut request = self.http.post(&url).json(body);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return response.json().await.context("decoding extraction response");
                }
                Ok(response) if response.status().is_server_error() => {
                    tracing::warn!(%url, status = %response.status(), attempt, "extraction service error, retrying");
                    last_error = Some(anyhow!("service returned {}", response.status()));
                }
                Ok(response) => {
                    let status = response.status();
                    let detail = response.text().await.unwrap_or_default();
                    return Err(anyhow!("extraction service rejected request: {status}: {detail}"));
                }
                Err(error) => {
                    tracing::warn!(%url, attempt, %error, "extraction request failed, retrying");
                    last_error = Some(error.into());
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("extraction request failed")))
    }
}

#[async_trait]
impl ExtractionClient for HttpExtractionClient {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Option<Value>> {
        let body = json!({
            "document": request.document,
            "correlationId": request.correlation_id,
            "outputSchema": extraction_output_schema(),
        });
        let response = self.post_json("/v1/extract", &body).await?;

        // The service signals "parsed the document, found nothing usable"
        // with a null output field.
        match response.get("output") {
            Some(Value::Null) | None => Ok(None),
            Some(output) => Ok(Some(output.clone())),
        }
    }
}

#[async_trait]
impl DraftingClient for HttpExtractionClient {
    async fn draft(&self, request: &DraftRequest) -> Result<String> {
        let response = self.post_json("/v1/draft", &json!(request)).await?;
        response
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| anyhow!("drafting response missing content"))
    }
}
