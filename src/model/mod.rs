pub mod gemini;
pub mod mock;

use anyhow::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::config::Settings;

/// Token usage reported by the model service for one call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Total tokens (input + output).
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// A file sent alongside the prompt, e.g. an image or a PDF.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
    pub file_name: Option<String>,
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.data.len())
            .field("file_name", &self.file_name)
            .finish()
    }
}

/// One generation call: prompt text (may be empty when attachments are
/// present) followed by any attachments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateRequest {
    pub prompt: String,
    pub attachments: Vec<Attachment>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachments: Vec::new(),
        }
    }
}

/// What the model service sent back for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateResponse {
    /// Generated text, if any.
    pub text: Option<String>,
    /// Prompt-level block reason from the service's feedback metadata.
    pub block_reason: Option<String>,
    /// Why the first candidate stopped, e.g. `"STOP"` or `"SAFETY"`.
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

impl GenerateResponse {
    /// A plain text response.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            finish_reason: Some("STOP".to_string()),
            ..Self::default()
        }
    }

    /// A response with no content, blocked for `reason`.
    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            block_reason: Some(reason.into()),
            ..Self::default()
        }
    }

    /// The generated text, or `None` if there is nothing to show.
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.is_empty())
    }

    /// Why the service withheld content. The prompt feedback wins; a
    /// candidate that finished for any reason other than `STOP` counts too.
    pub fn block_reason(&self) -> Option<&str> {
        if let Some(reason) = self.block_reason.as_deref().filter(|r| !r.is_empty()) {
            return Some(reason);
        }
        self.finish_reason
            .as_deref()
            .filter(|r| !r.is_empty() && *r != "STOP")
    }
}

/// A handle bound to one model. Shared read-only across requests.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// The model identifier this handle was built for.
    fn name(&self) -> &str;

    /// Issue one generation call.
    async fn generate_content(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

/// Builds model handles from settings. Injected into the runner so tests
/// can substitute a stub and observe construction attempts.
pub trait ModelProvider: Send + Sync {
    fn create(&self, settings: &Settings) -> Result<Arc<dyn GenerativeModel>>;
}
