//! CSV reports: one row per binding or change.

use std::fmt::Write;

use crate::binding::{Binding, PolicyRule};
use crate::diff::DiffResult;
use crate::snapshot::Snapshot;

const SNAPSHOT_HEADER: &str = "subject_kind,subject_namespace,subject_name,role_kind,\
role_namespace,role,binding_namespace,binding,scope,risk,rules";

const DIFF_HEADER: &str = "change,subject_kind,subject_namespace,subject_name,role_kind,\
role,binding_namespace,binding,risk_before,risk_after,changed_fields,rules_granted,rules_revoked";

/// Quotes a field if it contains a separator, quote or newline.
fn csv_escape(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        let escaped = field.replace('"', "\"\"");
        format!("\"{escaped}\"")
    } else {
        field.to_string()
    }
}

fn rules_cell<'a>(rules: impl IntoIterator<Item = &'a PolicyRule>) -> String {
    rules
        .into_iter()
        .map(PolicyRule::compact)
        .collect::<Vec<_>>()
        .join(";")
}

fn identity_cells(binding: &Binding) -> [String; 4] {
    [
        binding.subject.kind.to_string(),
        csv_escape(&binding.subject.namespace),
        csv_escape(&binding.subject.name),
        binding.role_ref.kind.to_string(),
    ]
}

/// Renders every binding of a snapshot.
pub fn snapshot_csv(snapshot: &Snapshot) -> String {
    let mut out = String::new();
    out.push_str(SNAPSHOT_HEADER);
    out.push('\n');

    for binding in snapshot.bindings() {
        let [kind, ns, name, role_kind] = identity_cells(binding);
        let _ = writeln!(
            out,
            "{kind},{ns},{name},{role_kind},{},{},{},{},{},{},{}",
            csv_escape(&binding.role_ref.namespace),
            csv_escape(&binding.role_ref.name),
            csv_escape(&binding.binding_ref.namespace),
            csv_escape(&binding.binding_ref.name),
            binding.scope(),
            binding.risk,
            csv_escape(&rules_cell(&binding.rules)),
        );
    }
    out
}

fn binding_row(
    out: &mut String,
    change: &str,
    binding: &Binding,
    risk_before: &str,
    risk_after: &str,
) {
    let [kind, ns, name, role_kind] = identity_cells(binding);
    let _ = writeln!(
        out,
        "{change},{kind},{ns},{name},{role_kind},{},{},{},{risk_before},{risk_after},,,",
        csv_escape(&binding.role_ref.name),
        csv_escape(&binding.binding_ref.namespace),
        csv_escape(&binding.binding_ref.name),
    );
}

/// Renders added, removed and changed bindings, in that order.
pub fn diff_csv(diff: &DiffResult) -> String {
    let mut out = String::new();
    out.push_str(DIFF_HEADER);
    out.push('\n');

    for binding in &diff.added {
        binding_row(&mut out, "added", binding, "", binding.risk.as_str());
    }
    for binding in &diff.removed {
        binding_row(&mut out, "removed", binding, binding.risk.as_str(), "");
    }
    for change in &diff.changed {
        let [kind, ns, name, role_kind] = identity_cells(&change.after);
        let fields = change
            .changed_fields
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(";");
        let _ = writeln!(
            out,
            "changed,{kind},{ns},{name},{role_kind},{},{},{},{},{},{},{},{}",
            csv_escape(&change.key.role),
            csv_escape(&change.key.namespace),
            csv_escape(&change.key.binding),
            change.before.risk,
            change.after.risk,
            fields,
            csv_escape(&rules_cell(&change.rules_granted)),
            csv_escape(&rules_cell(&change.rules_revoked)),
        );
    }
    out
}
