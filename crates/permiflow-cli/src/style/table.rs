//! Table formatting using comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use permiflow_rbac::{DriftSummary, RiskSummary, RiskTier};

fn base_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn header(columns: &[&str]) -> Vec<Cell> {
    columns
        .iter()
        .map(|col| {
            if super::no_color() {
                Cell::new(col)
            } else {
                Cell::new(col)
                    .add_attribute(Attribute::Bold)
                    .fg(Color::Cyan)
            }
        })
        .collect()
}

fn tier_cell(tier: RiskTier) -> Cell {
    let cell = Cell::new(tier.as_str());
    if super::no_color() {
        return cell;
    }
    match tier {
        RiskTier::High => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        RiskTier::Medium => cell.fg(Color::Yellow),
        RiskTier::Low => cell.fg(Color::Green),
    }
}

/// Creates a per-tier binding count table.
pub fn risk_summary_table(summary: &RiskSummary) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Risk", "Bindings"]));
    for tier in RiskTier::DESCENDING {
        table.add_row(vec![tier_cell(tier), Cell::new(summary.count(tier))]);
    }
    table.add_row(vec![
        Cell::new("TOTAL").add_attribute(Attribute::Bold),
        Cell::new(summary.total),
    ]);
    table
}

/// Creates a drift count table.
pub fn drift_summary_table(summary: &DriftSummary) -> Table {
    let mut table = base_table();
    table.set_header(header(&["Drift", "Bindings"]));
    table.add_row(vec![Cell::new("added"), Cell::new(summary.added)]);
    table.add_row(vec![Cell::new("removed"), Cell::new(summary.removed)]);
    table.add_row(vec![Cell::new("changed"), Cell::new(summary.changed)]);
    table
}

/// Creates a key-value info table (two columns: key and value).
pub fn info_table(entries: &[(&str, String)]) -> Table {
    let mut table = base_table();
    for (key, value) in entries {
        let key_cell = if super::no_color() {
            Cell::new(key)
        } else {
            Cell::new(key).fg(Color::DarkGrey)
        };
        table.add_row(vec![key_cell, Cell::new(value)]);
    }
    table
}

/// Prints a table to stderr.
pub fn print_table(table: &Table) {
    eprintln!("{table}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_summary_table_lists_every_tier() {
        let summary = RiskSummary {
            high: 1,
            medium: 2,
            low: 3,
            total: 6,
        };
        let rendered = risk_summary_table(&summary).to_string();
        for label in ["HIGH", "MEDIUM", "LOW", "TOTAL"] {
            assert!(rendered.contains(label), "{label}");
        }
    }

    #[test]
    fn test_drift_summary_table() {
        let rendered = drift_summary_table(&DriftSummary {
            added: 4,
            removed: 0,
            changed: 1,
            total: 5,
        })
        .to_string();
        assert!(rendered.contains("added"));
        assert!(rendered.contains('4'));
    }
}
