//! The prompt runner: configuration state, a memoized model handle, and
//! the `generate` request path.

use std::sync::{Arc, OnceLock};

use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::error::{ConfigError, RunnerError};
use crate::model::{Attachment, GenerateRequest, GenerativeModel, ModelProvider};

/// Where the runner stands, for status displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// Configured; the model handle has not been built yet.
    Configured { model: String },
    /// Model handle built and ready.
    Ready { model: String },
    /// Generation is disabled for the rest of the process.
    Disabled { reason: String },
}

/// Owns the loaded configuration and the model handle built from it.
///
/// Construct once in the composition root and share behind an `Arc`. The
/// handle is built at most once, on first need; a failed build is cached
/// and never retried.
pub struct PromptRunner {
    configuration: Result<Settings, ConfigError>,
    provider: Arc<dyn ModelProvider>,
    handle: OnceLock<Result<Arc<dyn GenerativeModel>, String>>,
}

impl PromptRunner {
    pub fn new(
        configuration: Result<Settings, ConfigError>,
        provider: Arc<dyn ModelProvider>,
    ) -> Self {
        if let Err(e) = &configuration {
            error!("configuration failed, generation disabled: {e}");
        }
        Self {
            configuration,
            provider,
            handle: OnceLock::new(),
        }
    }

    /// Settings, if configuration succeeded.
    pub fn settings(&self) -> Option<&Settings> {
        self.configuration.as_ref().ok()
    }

    pub fn status(&self) -> Status {
        let settings = match &self.configuration {
            Ok(s) => s,
            Err(e) => {
                return Status::Disabled {
                    reason: e.to_string(),
                };
            }
        };
        match self.handle.get() {
            None => Status::Configured {
                model: settings.model_name.clone(),
            },
            Some(Ok(model)) => Status::Ready {
                model: model.name().to_string(),
            },
            Some(Err(cause)) => Status::Disabled {
                reason: format!("model initialization failed: {cause}"),
            },
        }
    }

    /// Build the model handle on first call; return the cached handle (or
    /// the cached failure) afterwards.
    pub fn load_model(&self) -> Result<Arc<dyn GenerativeModel>, RunnerError> {
        let settings = self
            .configuration
            .as_ref()
            .map_err(|e| RunnerError::Configuration(e.clone()))?;

        let cached = self.handle.get_or_init(|| {
            match self.provider.create(settings) {
                Ok(model) => {
                    info!(model = model.name(), "model handle ready");
                    Ok(model)
                }
                Err(e) => {
                    let cause = format!("{e:#}");
                    error!(model = %settings.model_name, "failed to load model: {cause}");
                    Err(cause)
                }
            }
        });

        match cached {
            Ok(model) => Ok(model.clone()),
            Err(cause) => {
                debug!("model unavailable (cached failure)");
                Err(RunnerError::Initialization(cause.clone()))
            }
        }
    }

    /// Submit one prompt and return the generated text.
    pub async fn generate(&self, prompt: &str) -> Result<String, RunnerError> {
        self.generate_with(prompt, Vec::new()).await
    }

    /// Submit a prompt plus attachments. The prompt may be blank when at
    /// least one attachment is given; every attachment needs a MIME type.
    pub async fn generate_with(
        &self,
        prompt: &str,
        attachments: Vec<Attachment>,
    ) -> Result<String, RunnerError> {
        let model = self.load_model()?;

        let prompt = prompt.trim();
        if prompt.is_empty() && attachments.is_empty() {
            return Err(RunnerError::Validation("prompt is empty"));
        }
        if attachments.iter().any(|a| a.mime_type.trim().is_empty()) {
            return Err(RunnerError::Validation(
                "cannot determine the MIME type of the uploaded file",
            ));
        }

        debug!(
            model = model.name(),
            chars = prompt.chars().count(),
            attachments = attachments.len(),
            "generating"
        );
        let request = GenerateRequest {
            prompt: prompt.to_string(),
            attachments,
        };
        let response = model
            .generate_content(&request)
            .await
            .map_err(RunnerError::Generation)?;

        if let Some(text) = response.content() {
            return Ok(text.to_string());
        }

        if let Some(reason) = response.block_reason() {
            warn!(reason, "content blocked");
            return Err(RunnerError::ContentBlocked {
                reason: reason.to_string(),
            });
        }

        error!("model returned no content and no block reason");
        Err(RunnerError::EmptyResponse)
    }
}
