//! Terminal feedback for slow startup steps.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(80);

/// Spinner shown while a directory is being archived.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(template);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(TICK);
        Self { bar }
    }

    pub fn succeed(&self, message: &str) {
        self.finish(style("✓").green().bold(), message);
    }

    pub fn fail(&self, message: &str) {
        self.finish(style("✗").red().bold(), message);
    }

    fn finish(&self, mark: console::StyledObject<&str>, message: &str) {
        self.bar.finish_with_message(format!("{} {}", mark, message));
    }

    pub fn is_finished(&self) -> bool {
        self.bar.is_finished()
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
