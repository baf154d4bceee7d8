//! Semantic color palette for terminal output.

use std::fmt::Display;

use owo_colors::{OwoColorize, Style};
use permiflow_rbac::RiskTier;

/// What a piece of text means, independent of how it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Success,
    Error,
    Warning,
    Muted,
    Header,
    /// Paths, commands and other literal input.
    Code,
    Risk(RiskTier),
}

impl Tone {
    fn style(self) -> Style {
        match self {
            Tone::Success => Style::new().green().bold(),
            Tone::Error | Tone::Risk(RiskTier::High) => Style::new().red().bold(),
            Tone::Warning | Tone::Risk(RiskTier::Medium) => Style::new().yellow(),
            Tone::Risk(RiskTier::Low) => Style::new().green(),
            Tone::Muted => Style::new().dimmed(),
            Tone::Header => Style::new().bold(),
            Tone::Code => Style::new().blue(),
        }
    }
}

/// Renders `value` in `tone`, or plainly under `--no-color`.
pub fn paint(value: &impl Display, tone: Tone) -> String {
    if super::no_color() {
        value.to_string()
    } else {
        value.style(tone.style()).to_string()
    }
}

/// Shorthands for [`paint`] on anything printable.
pub trait SemanticStyle: Display + Sized {
    fn muted(&self) -> String {
        paint(self, Tone::Muted)
    }

    fn header(&self) -> String {
        paint(self, Tone::Header)
    }

    fn code(&self) -> String {
        paint(self, Tone::Code)
    }
}

impl<T: Display> SemanticStyle for T {}

/// A tier label in its color: HIGH red, MEDIUM yellow, LOW green.
pub fn risk_label(tier: RiskTier) -> String {
    paint(&tier, Tone::Risk(tier))
}
