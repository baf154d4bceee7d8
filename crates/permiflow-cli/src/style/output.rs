//! Status lines.
//!
//! Always stderr, so a report piped from stdout never picks them up.

use super::colors::{SemanticStyle, Tone, paint};

#[derive(Clone, Copy)]
enum Mark {
    Done,
    Failed,
    Caution,
    Next,
}

impl Mark {
    fn render(self) -> String {
        match self {
            Mark::Done => paint(&"✓", Tone::Success),
            Mark::Failed => paint(&"✗", Tone::Error),
            Mark::Caution => paint(&"⚠", Tone::Warning),
            Mark::Next => paint(&"→", Tone::Muted),
        }
    }
}

fn status(mark: Mark, msg: &str) {
    eprintln!("{} {msg}", mark.render());
}

pub fn print_success(msg: &str) {
    status(Mark::Done, msg);
}

pub fn print_error(msg: &str) {
    status(Mark::Failed, msg);
}

/// Something was skipped or looks wrong, but the command carries on.
pub fn print_warn(msg: &str) {
    status(Mark::Caution, msg);
}

/// A suggested next step, dimmed.
pub fn print_hint(msg: &str) {
    status(Mark::Next, &msg.muted());
}

/// An indented `key: value` detail under the previous status line.
pub fn print_labeled(key: &str, value: &str) {
    eprintln!("  {}: {value}", key.muted());
}

pub fn print_spacer() {
    eprintln!();
}
