//! Startup banner for the terminal UI.

use std::path::Path;

use crate::runner::Status;

/// What the banner reports.
pub struct BannerInfo<'a> {
    pub status: &'a Status,
    pub secrets: &'a Path,
}

/// Render the banner text.
pub fn banner_text(info: &BannerInfo) -> String {
    let (model, generation) = match info.status {
        Status::Configured { model } => (model.as_str(), "enabled".to_string()),
        Status::Ready { model } => (model.as_str(), "enabled ✓".to_string()),
        Status::Disabled { reason } => ("—", format!("disabled ✗ ({reason})")),
    };
    format!(
        r#"
   prompt-runner {}

   model       {}
   generation  {}
   secrets     {}

   type a prompt and press enter; `quit` or Ctrl+D to leave
"#,
        env!("CARGO_PKG_VERSION"),
        model,
        generation,
        info.secrets.display(),
    )
}

pub fn print_banner(info: &BannerInfo) {
    println!("{}", banner_text(info));
}
