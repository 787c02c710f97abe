use std::sync::{Arc, Mutex};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;

/// Messages rotated while waiting for an answer.
static PHRASES: [&str; 12] = [
    "Thinking...",
    "Reading your documents...",
    "Looking for relevant passages...",
    "Ranking the context...",
    "Cross-checking the sources...",
    "Turning pages...",
    "Consulting the index...",
    "Following the citations...",
    "Skimming the footnotes...",
    "Asking the librarian...",
    "Connecting the dots...",
    "Drafting an answer...",
];

/// Loading indicator for an in-flight request.
pub struct Spinner {
    progress_bar: ProgressBar,
    state: State,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    Run,
    Stop,
    Error,
}

impl Spinner {
    /// Creates a new spinner drawing to stderr.
    pub fn new() -> Self {
        let progress_bar = ProgressBar::new_spinner();
        progress_bar.enable_steady_tick(Duration::from_millis(100));
        progress_bar.set_style(
            ProgressStyle::with_template("{spinner:.magenta} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );

        Self {
            progress_bar,
            state: State::Run,
        }
    }

    /// Creates a spinner that never draws. Used in quiet mode.
    pub fn hidden() -> Self {
        Self {
            progress_bar: ProgressBar::hidden(),
            state: State::Run,
        }
    }

    /// Creates a spinner that changes its message every `millis` until it is stopped.
    pub fn with_phrases(millis: u64) -> Arc<Mutex<Spinner>> {
        let spinner = Arc::new(Mutex::new(Spinner::new()));
        let handle = Arc::clone(&spinner);

        let mut phrases = PHRASES.to_vec();
        phrases.shuffle(&mut rand::thread_rng());

        tokio::spawn(async move {
            for phrase in phrases.iter().cycle() {
                let running = match handle.lock() {
                    Ok(mut spinner) => {
                        spinner.message(phrase);
                        spinner.is_running()
                    }
                    Err(_) => false,
                };
                if !running {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
        });

        spinner
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Run
    }

    /// Sets the message shown next to the spinner.
    pub fn message(&mut self, msg: &str) {
        if self.is_running() {
            self.progress_bar.set_message(msg.to_string());
        }
    }

    /// Stops and clears the spinner. Called when the first token or the full answer arrives.
    pub fn stop(&mut self) {
        if self.is_running() {
            self.state = State::Stop;
            self.progress_bar.finish_and_clear();
            tracing::event!(tracing::Level::DEBUG, "Spinner stopped");
        }
    }

    /// Stops the spinner leaving an error message behind.
    pub fn error(&mut self, msg: &str) {
        if self.is_running() {
            self.state = State::Error;
            self.progress_bar.abandon_with_message(msg.to_string());
            tracing::event!(tracing::Level::DEBUG, "Spinner failed: {}", msg);
        }
    }
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_idempotent_and_final() {
        let mut spinner = Spinner::hidden();
        assert!(spinner.is_running());

        spinner.stop();
        spinner.stop();
        spinner.error("late failure");

        assert_eq!(spinner.state, State::Stop);
        assert!(!spinner.is_running());
    }

    #[test]
    fn error_after_run() {
        let mut spinner = Spinner::hidden();

        spinner.error("request failed");
        spinner.message("ignored");

        assert_eq!(spinner.state, State::Error);
    }

    #[tokio::test]
    async fn phrases_stop_rotating_once_stopped() {
        let spinner = Spinner::with_phrases(5);
        tokio::time::sleep(Duration::from_millis(20)).await;

        spinner.lock().unwrap().stop();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(!spinner.lock().unwrap().is_running());
    }
}
