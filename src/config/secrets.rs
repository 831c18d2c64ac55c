use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use tracing::debug;

use super::ConfigSource;

/// A TOML secrets file with top-level keys:
///
/// ```toml
/// GOOGLE_API_KEY = "..."
/// model_name = "gemini-1.5-flash"
/// ```
///
/// The file is read once when opened. A missing file is an empty source.
#[derive(Clone)]
pub struct SecretsFile {
    path: PathBuf,
    table: toml::Table,
}

impl SecretsFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            debug!(path = %path.display(), "no secrets file");
            return Ok(Self {
                path,
                table: toml::Table::new(),
            });
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::parse(path, &text)
    }

    fn parse(path: PathBuf, text: &str) -> Result<Self> {
        // The parser's own message quotes the offending line, which may be
        // a secret. Report the position only.
        let table: toml::Table = toml::from_str(text).map_err(|e| match e.span() {
            Some(span) => {
                let (line, column) = line_column(text, span.start);
                anyhow!(
                    "failed to parse {}: invalid TOML at line {line}, column {column}",
                    path.display()
                )
            }
            None => anyhow!("failed to parse {}: invalid TOML", path.display()),
        })?;
        Ok(Self { path, table })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// 1-based line and column of a byte offset.
fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let before = &text[..end];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}

// Values are secrets; only the path and key names are shown.
impl fmt::Debug for SecretsFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretsFile")
            .field("path", &self.path)
            .field("keys", &self.table.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ConfigSource for SecretsFile {
    fn name(&self) -> &str {
        "secrets"
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.table.get(key).map(|value| match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        }))
    }
}
