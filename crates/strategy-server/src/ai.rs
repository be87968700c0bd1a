//! Generative backend behind `/suggestions`.

use crate::config::GeminiConfig;
use anyhow::Context;
use serde::Deserialize;
use std::time::Duration;
use strategy_core::suggest::{SuggestionRequest, SUGGESTION_COUNT};

const GENERATE_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait::async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Complete `prompt` and return the model's text.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// Prompt for one batch of ideas. `promptOverride` narrows the focus; it is
/// inserted into the template, never used as the whole prompt.
pub fn build_prompt(request: &SuggestionRequest) -> String {
    let context = match request.business_context.trim() {
        "" => "No business context was provided.",
        c => c,
    };
    let focus = match request.prompt_override.as_deref().map(str::trim) {
        Some(f) if !f.is_empty() => format!("\nFocus specifically on: {f}\n"),
        _ => String::new(),
    };
    format!(
        "You are a strategy consultant helping with a {framework} analysis.\n\
         \n\
         Business context:\n\
         {context}\n\
         {focus}\n\
         Suggest exactly {count} distinct ideas for the \"{item}\" category.\n\
         Each idea must be a professional, actionable statement of at most seven words.\n\
         Use British English spelling.\n\
         Respond with only a JSON array of {count} strings and nothing else.",
        framework = framework_label(&request.framework_key),
        item = request.item_title.trim(),
        count = SUGGESTION_COUNT,
    )
}

fn framework_label(key: &str) -> &str {
    match key.parse::<strategy_core::catalog::Framework>() {
        Ok(fw) => fw.title(),
        Err(_) => key,
    }
}

/// Pull the first JSON array out of model output, which is often wrapped in
/// prose or a Markdown fence. Keeps at most [`SUGGESTION_COUNT`] non-blank
/// strings; an array with none is an error.
pub fn extract_ideas(text: &str) -> anyhow::Result<Vec<String>> {
    let start = text
        .find('[')
        .context("model response contains no JSON array")?;
    let end = text
        .rfind(']')
        .filter(|&end| end > start)
        .context("model response contains no JSON array")?;
    let values: Vec<serde_json::Value> = serde_json::from_str(&text[start..=end])
        .context("model response array is not valid JSON")?;
    let ideas: Vec<String> = values
        .iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(SUGGESTION_COUNT)
        .map(str::to_string)
        .collect();
    if ideas.is_empty() {
        anyhow::bail!("model response contains no usable ideas");
    }
    Ok(ideas)
}

// ---------------------------------------------------------------------------
// GeminiBackend
// ---------------------------------------------------------------------------

pub struct GeminiBackend {
    client: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiBackend {
    pub fn new(config: GeminiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(GENERATE_TIMEOUT)
            .build()?;
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait::async_trait]
impl GenerativeBackend for GeminiBackend {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        let body = serde_json::json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
        });
        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .context("calling Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini returned {status}: {}", text.trim());
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .context("Gemini response is not JSON")?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            anyhow::bail!("Gemini returned no text");
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strategy_core::catalog::Category;

    fn request(focus: Option<&str>) -> SuggestionRequest {
        SuggestionRequest::for_category(
            Category::ThreatOfNewEntry,
            "Independent coffee roaster in Leeds".into(),
            focus.map(String::from),
        )
    }

    #[test]
    fn prompt_names_framework_item_and_constraints() {
        let prompt = build_prompt(&request(None));
        assert!(prompt.contains("Porter's Five Forces"));
        assert!(prompt.contains("\"Threat of New Entry\""));
        assert!(prompt.contains("Independent coffee roaster in Leeds"));
        assert!(prompt.contains("exactly 3"));
        assert!(prompt.contains("seven words"));
        assert!(prompt.contains("British English"));
        assert!(!prompt.contains("Focus specifically"));
    }

    #[test]
    fn prompt_includes_focus() {
        let prompt = build_prompt(&request(Some("online subscriptions")));
        assert!(prompt.contains("Focus specifically on: online subscriptions"));
    }

    #[test]
    fn extract_from_fenced_output() {
        let text = "Here you go:\n```json\n[\"Expand into EU\", \"Loyalty scheme\", \"Cut waste\", \"Extra\"]\n```";
        assert_eq!(
            extract_ideas(text).unwrap(),
            ["Expand into EU", "Loyalty scheme", "Cut waste"]
        );
    }

    #[test]
    fn extract_skips_non_strings_and_blanks() {
        assert_eq!(
            extract_ideas("[1, \" \", \"Only one\"]").unwrap(),
            ["Only one"]
        );
    }

    #[test]
    fn extract_without_array_fails() {
        assert!(extract_ideas("I cannot help with that.").is_err());
        assert!(extract_ideas("] nope [").is_err());
        assert!(extract_ideas("[not json]").is_err());
    }

    #[test]
    fn extract_with_no_usable_ideas_fails() {
        assert!(extract_ideas("[]").is_err());
        assert!(extract_ideas("Here you go: [\"  \", \"\", 7]").is_err());
    }

    #[tokio::test]
    async fn gemini_backend_joins_candidate_parts() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/test-model:generateContent")
            .match_header("x-goog-api-key", "k")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"candidates":[{"content":{"parts":[{"text":"[\"A\","},{"text":"\"B\",\"C\"]"}]}}]}"#,
            )
            .create_async()
            .await;

        let backend = GeminiBackend::new(GeminiConfig {
            api_key: "k".into(),
            model: "test-model".into(),
            endpoint: server.url(),
        })
        .unwrap();
        let text = backend.generate("prompt").await.unwrap();
        mock.assert_async().await;
        assert_eq!(extract_ideas(&text).unwrap(), ["A", "B", "C"]);
    }

    #[tokio::test]
    async fn gemini_error_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1beta/models/m:generateContent")
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let backend = GeminiBackend::new(GeminiConfig {
            api_key: "k".into(),
            model: "m".into(),
            endpoint: server.url(),
        })
        .unwrap();
        let err = backend.generate("prompt").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }
}
