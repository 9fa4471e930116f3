//! Progress reporting utilities

use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Progress reporter for a comparison run
#[derive(Debug)]
pub struct ProgressReporter {
    pub load_pb: Option<ProgressBar>,
    pub match_pb: Option<ProgressBar>,
    pub rules_pb: Option<ProgressBar>,
    show_progress: bool,
    start_time: Instant,
}

impl ProgressReporter {
    /// Create progress reporter for the compare command
    pub fn new_for_compare() -> Self {
        Self {
            load_pb: Some(create_spinner("Loading records...")),
            match_pb: None,
            rules_pb: None,
            show_progress: true,
            start_time: Instant::now(),
        }
    }

    /// Create minimal progress reporter (no progress bars)
    pub fn new_minimal() -> Self {
        Self {
            load_pb: None,
            match_pb: None,
            rules_pb: None,
            show_progress: false,
            start_time: Instant::now(),
        }
    }

    /// Finish loading and start the matching spinner
    pub fn finish_load(&mut self, message: &str) {
        if let Some(pb) = self.load_pb.take() {
            pb.finish_with_message(message.to_string());
        }
        if self.show_progress && self.match_pb.is_none() {
            self.match_pb = Some(create_spinner("Matching rows..."));
        }
    }

    /// Finish matching and start the rule spinner
    pub fn finish_match(&mut self, message: &str) {
        if let Some(pb) = self.match_pb.take() {
            pb.finish_with_message(message.to_string());
        }
        if self.show_progress && self.rules_pb.is_none() {
            self.rules_pb = Some(create_spinner("Applying rules..."));
        }
    }

    pub fn finish_rules(&mut self, message: &str) {
        if let Some(pb) = self.rules_pb.take() {
            pb.finish_with_message(message.to_string());
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        for pb in [self.load_pb.take(), self.match_pb.take(), self.rules_pb.take()]
            .into_iter()
            .flatten()
        {
            pb.finish_and_clear();
        }
    }
}

/// Create a spinner progress bar
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
