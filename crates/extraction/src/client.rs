use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A source document handed to the extraction service. Either a fetchable
/// location or inline content; the service decides how to parse it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentPayload {
    Uri { uri: String },
    Inline { base64: String, mime_type: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRequest {
    pub document: DocumentPayload,
    /// Echoed back by the service so long-running jobs stay attributable.
    pub correlation_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftRequest {
    pub section_title: String,
    pub client_name: String,
    pub product_names: Vec<String>,
    pub tone_hint: Option<String>,
    pub correlation_id: String,
}

/// Raw catalog extraction. `Ok(None)` means the service answered but
/// produced no structured output, which callers treat as a failed
/// extraction, not as an empty catalog.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn extract(&self, request: &ExtractionRequest) -> Result<Option<Value>>;
}

#[async_trait]
pub trait DraftingClient: Send + Sync {
    async fn draft(&self, request: &DraftRequest) -> Result<String>;
}
