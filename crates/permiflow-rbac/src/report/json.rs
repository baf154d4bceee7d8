//! JSON reports: pretty-printed, newline-terminated.

use serde::Serialize;

use super::Result;
use crate::diff::DiffResult;
use crate::snapshot::{RiskSummary, Snapshot};

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// Renders a snapshot as the scan report document.
pub fn snapshot_json(snapshot: &Snapshot) -> Result<String> {
    pretty(snapshot)
}

/// Renders a diff as the drift report document.
pub fn diff_json(diff: &DiffResult) -> Result<String> {
    pretty(diff)
}

/// Renders per-tier counts.
pub fn summary_json(summary: &RiskSummary) -> Result<String> {
    pretty(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};

    #[test]
    fn test_empty_arrays_are_present() {
        let snapshot = Snapshot::new(
            Utc.with_ymd_and_hms(2026, 10, 19, 6, 0, 0).unwrap(),
            "kind-dev",
            BTreeSet::new(),
            Vec::new(),
            Vec::new(),
        );
        let out = snapshot_json(&snapshot).unwrap();
        assert!(out.ends_with("}\n"));

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["timestamp"], "2026-10-19T06:00:00Z");
        assert_eq!(value["cluster_context"], "kind-dev");
        assert!(value["bindings"].as_array().unwrap().is_empty());
        assert!(value["warnings"].as_array().unwrap().is_empty());
        assert!(value["namespace_filter"].as_array().unwrap().is_empty());

        let out = diff_json(&DiffResult::default()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        for field in ["added", "removed", "changed"] {
            assert!(value[field].as_array().unwrap().is_empty(), "{field}");
        }
    }

    #[test]
    fn test_summary_fields() {
        let out = summary_json(&RiskSummary {
            high: 2,
            medium: 0,
            low: 5,
            total: 7,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["high"], 2);
        assert_eq!(value["total"], 7);
    }
}
