//! Progress spinner for the live cluster listing.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const FRAMES: &[&str] = &["◐ ", "◓ ", "◑ ", "◒ "];

/// A spinner that clears itself when dropped, on error paths too.
///
/// Hidden under `--no-color`; indicatif also hides it when stderr is not a
/// terminal.
pub struct Spinner(ProgressBar);

impl Spinner {
    pub fn start(msg: impl Into<String>) -> Self {
        if super::no_color() {
            return Self(ProgressBar::hidden());
        }

        let style = ProgressStyle::default_spinner()
            .tick_strings(FRAMES)
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        let pb = ProgressBar::new_spinner().with_style(style);
        pb.set_message(msg.into());
        pb.enable_steady_tick(Duration::from_millis(120));
        Self(pb)
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        self.0.finish_and_clear();
    }
}
