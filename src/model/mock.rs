use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::Settings;

use super::{GenerateRequest, GenerateResponse, GenerativeModel, ModelProvider};

/// A scripted model for tests. Records every request it receives.
pub struct MockModel {
    name: String,
    behavior: Behavior,
    requests: Mutex<Vec<GenerateRequest>>,
}

enum Behavior {
    Echo,
    Fixed(GenerateResponse),
    Fail(String),
}

impl MockModel {
    /// Returns the prompt back as the generated text.
    pub fn echo() -> Self {
        Self::with(Behavior::Echo)
    }

    /// Always returns `response`.
    pub fn respond(response: GenerateResponse) -> Self {
        Self::with(Behavior::Fixed(response))
    }

    /// Always fails as a transport error with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with(Behavior::Fail(message.to_string()))
    }

    fn with(behavior: Behavior) -> Self {
        Self {
            name: "mock".to_string(),
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Prompt texts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    /// Full requests received so far, attachments included.
    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for MockModel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.behavior {
            Behavior::Echo => Ok(GenerateResponse::text(request.prompt.as_str())),
            Behavior::Fixed(response) => Ok(response.clone()),
            Behavior::Fail(message) => Err(anyhow!("{message}")),
        }
    }
}

/// A provider that hands out one shared [`MockModel`], or fails to build,
/// and counts how many times it was asked.
pub struct MockProvider {
    model: Option<Arc<MockModel>>,
    error: String,
    attempts: AtomicUsize,
    seen: Mutex<Option<Settings>>,
}

impl MockProvider {
    pub fn new(model: Arc<MockModel>) -> Self {
        Self {
            model: Some(model),
            error: String::new(),
            attempts: AtomicUsize::new(0),
            seen: Mutex::new(None),
        }
    }

    /// Every construction attempt fails with `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            model: None,
            error: message.to_string(),
            attempts: AtomicUsize::new(0),
            seen: Mutex::new(None),
        }
    }

    /// Number of times `create` was called.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Settings passed to the most recent `create` call.
    pub fn last_settings(&self) -> Option<Settings> {
        self.seen.lock().unwrap().clone()
    }
}

impl ModelProvider for MockProvider {
    fn create(&self, settings: &Settings) -> Result<Arc<dyn GenerativeModel>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        *self.seen.lock().unwrap() = Some(settings.clone());
        match &self.model {
            Some(model) => Ok(model.clone()),
            None => Err(anyhow!("{}", self.error)),
        }
    }
}
