//! Key-value configuration sources and the one-shot `configure` step.
//!
//! Sources are layered: the first source with a non-empty value for a key
//! wins. The result is either usable [`Settings`] or a [`ConfigError`]
//! that disables generation for the rest of the process.

mod secrets;

pub use secrets::SecretsFile;

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;
use tracing::{debug, info};

use crate::consts::{CREDENTIAL_ALIAS, CREDENTIAL_KEY, DEFAULT_MODEL, MODEL_ENV, MODEL_KEY};
use crate::error::ConfigError;

/// Anything that can answer "what is the value of this key?".
pub trait ConfigSource: Send + Sync {
    /// Short label for diagnostics, e.g. `"env"`.
    fn name(&self) -> &str;

    /// Look up a key. `Ok(None)` means the source has no value for it.
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Process environment. The model key is read from [`MODEL_ENV`]; every
/// other key is read from the variable of the same name.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvSource;

impl ConfigSource for EnvSource {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        let var = if key == MODEL_KEY { MODEL_ENV } else { key };
        Ok(std::env::var(var).ok())
    }
}

/// In-memory source.
#[derive(Debug, Default, Clone)]
pub struct MapSource {
    values: HashMap<String, String>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.values.insert(key.to_string(), value.to_string());
        self
    }
}

impl ConfigSource for MapSource {
    fn name(&self) -> &str {
        "map"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }
}

/// Ordered stack of sources. Earlier sources take priority.
#[derive(Default)]
pub struct Layered {
    sources: Vec<Box<dyn ConfigSource>>,
}

impl Layered {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, source: impl ConfigSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl ConfigSource for Layered {
    fn name(&self) -> &str {
        "layered"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        for source in &self.sources {
            if let Some(value) = source.get(key)?
                && !value.trim().is_empty()
            {
                debug!(key, source = source.name(), "config value resolved");
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

/// API credential. Never printed: `Debug` and `Display` are redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Validate and wrap a raw credential string.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let key = raw.trim();
        if key.is_empty() {
            return Err(ConfigError::MissingCredential {
                key: CREDENTIAL_KEY.to_string(),
            });
        }
        if key.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(ConfigError::MalformedCredential {
                reason: "contains whitespace or control characters".to_string(),
            });
        }
        Ok(Self(key.to_string()))
    }

    /// The raw secret, for placing in a request header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Loaded configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub credential: Credential,
    pub model_name: String,
}

impl Settings {
    /// Replace the model name (e.g. from a `--model` flag). Blank is ignored.
    pub fn with_model(mut self, model: Option<&str>) -> Self {
        if let Some(model) = model.map(str::trim).filter(|m| !m.is_empty()) {
            self.model_name = model.to_string();
        }
        self
    }
}

/// Read the credential and model name from `source`.
///
/// The credential is required. The model name falls back to
/// [`DEFAULT_MODEL`] when absent or blank.
pub fn configure(source: &dyn ConfigSource) -> Result<Settings, ConfigError> {
    let raw = match lookup(source, CREDENTIAL_KEY)? {
        Some(v) => Some(v),
        None => lookup(source, CREDENTIAL_ALIAS)?,
    };
    let credential = match raw {
        Some(raw) => Credential::parse(&raw)?,
        None => {
            return Err(ConfigError::MissingCredential {
                key: CREDENTIAL_KEY.to_string(),
            });
        }
    };

    let model_name = lookup(source, MODEL_KEY)?
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    info!(model = %model_name, "configuration loaded");
    Ok(Settings {
        credential,
        model_name,
    })
}

fn lookup(source: &dyn ConfigSource, key: &str) -> Result<Option<String>, ConfigError> {
    source
        .get(key)
        .map(|v| v.filter(|s| !s.trim().is_empty()))
        .map_err(|e| ConfigError::Source(format!("{}: {e:#}", source.name())))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingSource;

    impl ConfigSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn get(&self, _key: &str) -> Result<Option<String>> {
            anyhow::bail!("disk on fire")
        }
    }

    #[test]
    fn configure_reads_credential_and_model() {
        let source = MapSource::new()
            .with(CREDENTIAL_KEY, "k1")
            .with(MODEL_KEY, "test-model");
        let settings = configure(&source).unwrap();
        assert_eq!(settings.credential.expose(), "k1");
        assert_eq!(settings.model_name, "test-model");
    }

    #[test]
    fn configure_defaults_model_name() {
        let source = MapSource::new().with(CREDENTIAL_KEY, "k1");
        let settings = configure(&source).unwrap();
        assert_eq!(settings.model_name, DEFAULT_MODEL);
    }

    #[test]
    fn blank_model_name_uses_default() {
        let source = MapSource::new()
            .with(CREDENTIAL_KEY, "k1")
            .with(MODEL_KEY, "   ");
        assert_eq!(configure(&source).unwrap().model_name, DEFAULT_MODEL);
    }

    #[test]
    fn credential_alias_accepted() {
        let source = MapSource::new().with(CREDENTIAL_ALIAS, "k2");
        assert_eq!(configure(&source).unwrap().credential.expose(), "k2");
    }

    #[test]
    fn missing_credential_fails() {
        let err = configure(&MapSource::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn empty_credential_is_missing() {
        let source = MapSource::new().with(CREDENTIAL_KEY, "  ");
        let err = configure(&source).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn credential_with_inner_space_is_malformed() {
        let source = MapSource::new().with(CREDENTIAL_KEY, "abc def");
        let err = configure(&source).unwrap_err();
        assert!(matches!(err, ConfigError::MalformedCredential { .. }));
    }

    #[test]
    fn credential_is_trimmed() {
        let source = MapSource::new().with(CREDENTIAL_KEY, "  k1\n");
        assert_eq!(configure(&source).unwrap().credential.expose(), "k1");
    }

    #[test]
    fn source_failure_is_reported() {
        let err = configure(&FailingSource).unwrap_err();
        match err {
            ConfigError::Source(msg) => {
                assert!(msg.contains("failing"));
                assert!(msg.contains("disk on fire"));
            }
            other => panic!("expected Source, got {other:?}"),
        }
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = Credential::parse("super-secret").unwrap();
        assert!(!format!("{cred:?}").contains("super-secret"));
        assert!(!format!("{cred}").contains("super-secret"));

        let settings = Settings {
            credential: cred,
            model_name: "m".to_string(),
        };
        assert!(!format!("{settings:?}").contains("super-secret"));
    }

    #[test]
    fn layered_first_non_empty_wins() {
        let layered = Layered::new()
            .push(MapSource::new().with(MODEL_KEY, ""))
            .push(MapSource::new().with(MODEL_KEY, "second"))
            .push(MapSource::new().with(MODEL_KEY, "third"));
        assert_eq!(layered.get(MODEL_KEY).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn layered_missing_everywhere_is_none() {
        let layered = Layered::new().push(MapSource::new());
        assert!(layered.get("nope").unwrap().is_none());
    }

    #[test]
    fn layered_propagates_source_error() {
        let layered = Layered::new().push(FailingSource);
        assert!(layered.get(CREDENTIAL_KEY).is_err());
    }

    #[test]
    fn with_model_overrides_and_ignores_blank() {
        let settings = configure(&MapSource::new().with(CREDENTIAL_KEY, "k")).unwrap();
        let settings = settings.with_model(Some("override"));
        assert_eq!(settings.model_name, "override");
        let settings = settings.with_model(Some("  "));
        assert_eq!(settings.model_name, "override");
        let settings = settings.with_model(None);
        assert_eq!(settings.model_name, "override");
    }
}
