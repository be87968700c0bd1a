//! Suggestion gateway.
//!
//! Asks the proxy server for a handful of short ideas for one framework
//! category. The gateway is stateless; folding the answer into a project is
//! [`crate::store::ProjectEditor::merge_suggestions`].

use crate::catalog::{Category, Framework};
use crate::error::{Result, StrategyError};
use crate::http;
use crate::model::DocumentRecord;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of ideas requested per call.
pub const SUGGESTION_COUNT: usize = 3;

/// Upper bound on a suggestion round trip.
pub const DEFAULT_SUGGEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionRequest {
    #[serde(default)]
    pub framework_key: String,
    #[serde(default)]
    pub item_title: String,
    #[serde(default)]
    pub business_context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_override: Option<String>,
}

impl SuggestionRequest {
    pub fn for_category(category: Category, business_context: String, focus: Option<String>) -> Self {
        Self {
            framework_key: category.framework().as_str().to_string(),
            item_title: category.title().to_string(),
            business_context,
            prompt_override: focus.filter(|f| !f.trim().is_empty()),
        }
    }

    /// Check the required fields before anything goes over the wire.
    pub fn validate(&self) -> Result<Framework> {
        if self.framework_key.trim().is_empty() {
            return Err(StrategyError::InvalidRequest("frameworkKey is required".into()));
        }
        if self.item_title.trim().is_empty() {
            return Err(StrategyError::InvalidRequest("itemTitle is required".into()));
        }
        self.framework_key.parse()
    }
}

/// Business description followed by the reference documents, as sent with
/// every suggestion request.
pub fn business_context(description: &str, documents: &[DocumentRecord]) -> String {
    let mut out = description.trim().to_string();
    for doc in documents {
        if doc.content.trim().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("Document: {}\n{}", doc.name, doc.content.trim()));
    }
    out
}

/// Read the `ideas` array out of a response body.
///
/// A body that is not JSON is an error. A missing `ideas` field, non-string
/// entries and blank strings all count as no suggestion.
pub fn parse_ideas(body: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| StrategyError::Suggestion(format!("response is not JSON: {e}")))?;
    let Some(entries) = value.get("ideas").and_then(|v| v.as_array()) else {
        tracing::warn!("suggestion response carried no ideas array");
        return Ok(Vec::new());
    };
    Ok(entries
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

// ---------------------------------------------------------------------------
// SuggestionGateway
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait SuggestionGateway: Send + Sync {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>>;
}

/// Posts to the proxy server's `/suggestions` endpoint.
pub struct HttpSuggestionGateway {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpSuggestionGateway {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = http::parse_base(base_url)?;
        Ok(Self {
            client: http::client(timeout)?,
            endpoint: http::join(&base, &["suggestions"]),
        })
    }
}

#[async_trait::async_trait]
impl SuggestionGateway for HttpSuggestionGateway {
    async fn suggest(&self, request: &SuggestionRequest) -> Result<Vec<String>> {
        request.validate()?;
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;
        let body = http::check(response).await?.text().await?;
        let ideas = parse_ideas(&body)?;
        tracing::debug!(
            framework = %request.framework_key,
            item = %request.item_title,
            count = ideas.len(),
            "received suggestions"
        );
        Ok(ideas)
    }
}
