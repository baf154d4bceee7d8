//! Terminal presentation: colors, status lines, tables and the spinner.
//!
//! Everything here draws on stderr. Stdout belongs to reports.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod colors;
pub mod output;
pub mod spinner;
pub mod table;

pub use output::*;
pub use spinner::Spinner;
pub use table::*;

static PLAIN: AtomicBool = AtomicBool::new(false);

/// Turns all styling off (`--no-color` or `NO_COLOR`).
pub fn set_no_color(plain: bool) {
    PLAIN.store(plain, Ordering::Relaxed);
}

pub(crate) fn no_color() -> bool {
    PLAIN.load(Ordering::Relaxed)
}
