use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::config::{Credential, Settings};
use crate::consts::{API_VERSION, DEFAULT_BASE_URL};

use super::{GenerateRequest, GenerateResponse, GenerativeModel, ModelProvider, TokenUsage};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Builds [`GeminiModel`] handles against a base URL.
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    base_url: String,
}

impl GeminiProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Point at a different host, e.g. a local mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for GeminiProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelProvider for GeminiProvider {
    fn create(&self, settings: &Settings) -> Result<Arc<dyn GenerativeModel>> {
        let model = GeminiModel::new(&self.base_url, settings)?;
        Ok(Arc::new(model))
    }
}

/// A model handle that calls the `generateContent` REST method.
pub struct GeminiModel {
    model: String,
    endpoint: Url,
    credential: Credential,
    client: reqwest::Client,
}

impl GeminiModel {
    pub fn new(base_url: &str, settings: &Settings) -> Result<Self> {
        let model = settings.model_name.trim();
        if model.is_empty() {
            bail!("model name is empty");
        }
        if model.contains(['/', '?', '#']) || model.chars().any(char::is_whitespace) {
            bail!("invalid model name: {model:?}");
        }

        let endpoint = endpoint_url(base_url, model)?;
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            model: model.to_string(),
            endpoint,
            credential: settings.credential.clone(),
            client,
        })
    }
}

/// `{base}/v1beta/models/{model}:generateContent`
fn endpoint_url(base_url: &str, model: &str) -> Result<Url> {
    let base = base_url.trim_end_matches('/');
    let raw = format!("{base}/{API_VERSION}/models/{model}:generateContent");
    let url = Url::parse(&raw).with_context(|| format!("invalid API base URL: {base_url}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("unsupported URL scheme: {}", url.scheme());
    }
    Ok(url)
}

#[async_trait]
impl GenerativeModel for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let body = ApiRequest::build(request);

        let resp = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.credential.expose())
            .json(&body)
            .send()
            .await
            .context("request to model service failed")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            bail!("model service error ({}): {}", status, text.trim());
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .context("failed to decode model service response")?;

        let response = api_resp.into_response();
        if let Some(usage) = response.usage {
            debug!(
                model = %self.model,
                input = usage.input_tokens,
                output = usage.output_tokens,
                total = usage.total(),
                "token usage"
            );
        }
        Ok(response)
    }
}

// --- API types ---

#[derive(Serialize)]
struct ApiRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

/// Text first, then each attachment as base64 inline data.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(InlineData<'a>),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

impl<'a> ApiRequest<'a> {
    fn build(request: &'a GenerateRequest) -> Self {
        let mut parts = Vec::with_capacity(request.attachments.len() + 1);
        if !request.prompt.is_empty() {
            parts.push(Part::Text(&request.prompt));
        }
        for attachment in &request.attachments {
            parts.push(Part::InlineData(InlineData {
                mime_type: &attachment.mime_type,
                data: STANDARD.encode(&attachment.data),
            }));
        }
        Self {
            contents: vec![Content { parts }],
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

impl ApiResponse {
    fn into_response(self) -> GenerateResponse {
        let first = self.candidates.into_iter().next();
        let finish_reason = first.as_ref().and_then(|c| c.finish_reason.clone());

        let text: String = first
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        GenerateResponse {
            text: if text.is_empty() { None } else { Some(text) },
            block_reason: self.prompt_feedback.and_then(|f| f.block_reason),
            finish_reason,
            usage: self.usage_metadata.map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            }),
        }
    }
}
