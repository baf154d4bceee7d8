//! Markdown reports for humans reading CI artifacts.

use std::fmt::Write;

use crate::binding::Binding;
use crate::diff::DiffResult;
use crate::risk::{self, RiskTier};
use crate::snapshot::Snapshot;

/// Escapes characters that would break a table cell.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn binding_label(binding: &Binding) -> String {
    if binding.binding_ref.namespace.is_empty() {
        binding.binding_ref.name.clone()
    } else {
        format!("{}/{}", binding.binding_ref.namespace, binding.binding_ref.name)
    }
}

fn explain(binding: &Binding) -> String {
    let found = risk::findings(&binding.rules, binding.scope());
    if found.is_empty() {
        return "-".to_string();
    }
    found
        .iter()
        .map(risk::RiskFinding::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

fn binding_table(out: &mut String, bindings: &[&Binding]) {
    if bindings.is_empty() {
        out.push_str("_None._\n\n");
        return;
    }
    out.push_str("| Subject | Role | Binding | Scope | Findings |\n");
    out.push_str("|---|---|---|---|---|\n");
    for binding in bindings {
        let _ = writeln!(
            out,
            "| `{}` | `{}` | `{}` | {} | {} |",
            cell(&binding.subject.to_string()),
            cell(&binding.role_ref.to_string()),
            cell(&binding_label(binding)),
            binding.scope(),
            cell(&explain(binding)),
        );
    }
    out.push('\n');
}

/// Renders a scan report with one table per risk tier, highest first.
pub fn snapshot_markdown(snapshot: &Snapshot) -> String {
    let summary = snapshot.risk_summary();
    let namespaces = if snapshot.namespace_filter().is_empty() {
        "all".to_string()
    } else {
        snapshot
            .namespace_filter()
            .iter()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    };
    let context = if snapshot.cluster_context().is_empty() {
        "(unknown)"
    } else {
        snapshot.cluster_context()
    };

    let mut out = String::from("# RBAC Scan Report\n\n");
    let _ = writeln!(out, "- **Cluster context:** `{}`", cell(context));
    let _ = writeln!(out, "- **Scanned at:** {}", snapshot.timestamp().to_rfc3339());
    let _ = writeln!(out, "- **Namespaces:** {namespaces}");
    let _ = writeln!(
        out,
        "- **Bindings:** {} (HIGH {}, MEDIUM {}, LOW {})\n",
        summary.total, summary.high, summary.medium, summary.low
    );

    for tier in RiskTier::DESCENDING {
        let in_tier: Vec<&Binding> = snapshot
            .bindings()
            .iter()
            .filter(|b| b.risk == tier)
            .collect();
        let _ = writeln!(out, "## {tier} risk ({})\n", in_tier.len());
        binding_table(&mut out, &in_tier);
    }

    if !snapshot.warnings().is_empty() {
        let _ = writeln!(out, "## Skipped bindings ({})\n", snapshot.warning_count());
        for warning in snapshot.warnings() {
            let _ = writeln!(out, "- {}", warning.reason);
        }
        out.push('\n');
    }

    out
}

fn drift_table(out: &mut String, bindings: &[Binding]) {
    if bindings.is_empty() {
        out.push_str("_None._\n\n");
        return;
    }
    out.push_str("| Subject | Role | Binding | Risk |\n");
    out.push_str("|---|---|---|---|\n");
    for binding in bindings {
        let _ = writeln!(
            out,
            "| `{}` | `{}` | `{}` | {} |",
            cell(&binding.subject.to_string()),
            cell(&binding.role_ref.to_string()),
            cell(&binding_label(binding)),
            binding.risk,
        );
    }
    out.push('\n');
}

/// Renders a drift report with Added, Removed and Changed sections.
pub fn diff_markdown(diff: &DiffResult) -> String {
    let summary = diff.summary();
    let mut out = String::from("# RBAC Drift Report\n\n");
    if diff.is_empty() {
        out.push_str("No drift detected.\n");
        return out;
    }
    let _ = writeln!(out, "**Summary:** {summary}\n");

    let _ = writeln!(out, "## Added ({})\n", summary.added);
    drift_table(&mut out, &diff.added);

    let _ = writeln!(out, "## Removed ({})\n", summary.removed);
    drift_table(&mut out, &diff.removed);

    let _ = writeln!(out, "## Changed ({})\n", summary.changed);
    if diff.changed.is_empty() {
        out.push_str("_None._\n\n");
        return out;
    }
    out.push_str("| Subject | Role | Binding | Fields | Risk | Granted | Revoked |\n");
    out.push_str("|---|---|---|---|---|---|---|\n");
    for change in &diff.changed {
        let fields = change
            .changed_fields
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let rules = |rules: &[crate::binding::PolicyRule]| {
            if rules.is_empty() {
                "-".to_string()
            } else {
                rules
                    .iter()
                    .map(|r| format!("`{}`", cell(&r.compact())))
                    .collect::<Vec<_>>()
                    .join("<br>")
            }
        };
        let risk = if change.before.risk == change.after.risk {
            change.after.risk.to_string()
        } else {
            format!("{} → {}", change.before.risk, change.after.risk)
        };
        let _ = writeln!(
            out,
            "| `{}` | `{}` | `{}` | {} | {} | {} | {} |",
            cell(&change.key.subject.to_string()),
            cell(&change.after.role_ref.to_string()),
            cell(&binding_label(&change.after)),
            fields,
            risk,
            rules(&change.rules_granted),
            rules(&change.rules_revoked),
        );
    }
    out.push('\n');
    out
}
