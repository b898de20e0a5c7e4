//! Terminal progress for a fetch run

use indicatif::{ProgressBar, ProgressStyle};

const TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

/// Progress bar advanced once per completed endpoint
///
/// Cheap to clone; clones share the same bar.
#[derive(Debug, Clone)]
pub struct FetchProgress {
    bar: ProgressBar,
}

impl FetchProgress {
    /// Visible bar over `total` endpoints
    pub fn new(total: usize, message: impl Into<String>) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(TEMPLATE)
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        bar.set_message(message.into());
        Self { bar }
    }

    /// Bar that draws nothing
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Mark one endpoint as done
    pub fn advance(&self, site: &str) {
        self.bar.set_message(site.to_string());
        self.bar.inc(1);
    }

    /// Endpoints done so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
