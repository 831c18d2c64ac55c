//! Startup wiring shared by the binary and the integration tests.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use crate::config::{ConfigSource, Layered, SecretsFile, Settings, configure};
use crate::error::ConfigError;
use crate::model::ModelProvider;
use crate::runner::PromptRunner;

/// Resolve settings from `env` layered over the secrets file at
/// `secrets_path`, then apply a `--model` override if one was given.
pub fn load_configuration(
    env: impl ConfigSource + 'static,
    secrets_path: &Path,
    model_override: Option<&str>,
) -> Result<Settings, ConfigError> {
    let secrets =
        SecretsFile::open(secrets_path).map_err(|e| ConfigError::Source(format!("{e:#}")))?;
    let source = Layered::new().push(env).push(secrets);
    configure(&source).map(|settings| settings.with_model(model_override))
}

/// Build the runner and load the model handle once, so a construction
/// failure is reported at startup rather than on the first request.
pub fn build_runner(
    configuration: Result<Settings, ConfigError>,
    provider: Arc<dyn ModelProvider>,
) -> PromptRunner {
    let runner = PromptRunner::new(configuration, provider);
    if let Err(e) = runner.load_model() {
        debug!(kind = e.kind().as_str(), "starting with generation disabled");
    }
    runner
}
