use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown while a walk runs. Hidden when progress is disabled.
pub struct WalkSpinner {
    bar: ProgressBar,
}

impl WalkSpinner {
    pub fn start(message: impl Into<String>, enabled: bool) -> Self {
        let bar = if enabled {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };

        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "✓"]));
        }
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    pub fn finish(self, message: impl Into<String>) {
        self.bar.finish_with_message(message.into());
    }

    pub fn abandon(self) {
        self.bar.finish_and_clear();
    }
}
