//! Project-wide constants.

use std::path::PathBuf;

/// Model used when the configuration does not name one.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Hosted generative-language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// REST API version segment.
pub const API_VERSION: &str = "v1beta";

/// Config key holding the API credential.
pub const CREDENTIAL_KEY: &str = "GOOGLE_API_KEY";

/// Alternative spelling accepted for the credential key.
pub const CREDENTIAL_ALIAS: &str = "credential";

/// Config key holding the model identifier.
pub const MODEL_KEY: &str = "model_name";

/// Environment variable consulted for the model identifier.
pub const MODEL_ENV: &str = "PROMPT_RUNNER_MODEL";

/// Default listen address for the web form.
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

/// Largest request body the web form accepts (uploads included).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Default secrets file: `~/.prompt-runner/secrets.toml`.
pub fn default_secrets_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".prompt-runner")
        .join("secrets.toml")
}
