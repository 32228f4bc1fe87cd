//! Comparator: partition local and remote ids into five classes
//!
//! Classification is a pure function of the local snapshot, the remote
//! inventory and the sync ledger, so it can be exercised without I/O.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ledger::SyncLedger;
use crate::model::{ResourceRecord, ResourceType};

/// Server-managed attributes that never count as a difference
pub const VOLATILE_ATTRIBUTES: [&str; 3] = ["created_at", "updated_at", "dirty"];
const VOLATILE_PREFIXES: [&str; 2] = ["created_by_", "updated_by_"];

pub fn is_volatile(key: &str) -> bool {
    VOLATILE_ATTRIBUTES.contains(&key)
        || VOLATILE_PREFIXES
            .iter()
            .any(|prefix| key.starts_with(prefix))
}

/// Classification of one id. Variant order is the report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStatus {
    /// Remote has it, local does not
    Added,
    /// Local edits newer than the last sync; push
    Modified,
    /// Local has it, remote does not
    Deleted,
    /// Remote changed since the last sync; pull
    Behind,
    Unchanged,
}

impl ComparisonStatus {
    pub const ALL: [ComparisonStatus; 5] = [
        ComparisonStatus::Added,
        ComparisonStatus::Modified,
        ComparisonStatus::Deleted,
        ComparisonStatus::Behind,
        ComparisonStatus::Unchanged,
    ];
}

impl fmt::Display for ComparisonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ComparisonStatus::Added => "Added",
            ComparisonStatus::Modified => "Modified",
            ComparisonStatus::Deleted => "Deleted",
            ComparisonStatus::Behind => "Behind",
            ComparisonStatus::Unchanged => "Unchanged",
        };
        f.write_str(label)
    }
}

/// Stringified local and remote values of one differing attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDelta {
    pub local: Option<String>,
    pub remote: Option<String>,
}

/// The classification of a single id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    pub status: ComparisonStatus,
    /// Local resource directory, when the id exists locally
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Differing attributes (Modified and Behind only)
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, AttributeDelta>,
}

/// A local resource as read for comparison
#[derive(Debug, Clone)]
pub struct LocalSnapshot {
    pub record: ResourceRecord,
    pub path: String,
}

/// Every comparison of a run, grouped by status then ordered by id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub comparisons: Vec<Comparison>,
}

impl DiffReport {
    pub fn new(mut comparisons: Vec<Comparison>) -> Self {
        comparisons.sort_by(|a, b| a.status.cmp(&b.status).then_with(|| a.id.cmp(&b.id)));
        Self { comparisons }
    }

    pub fn with_status(&self, status: ComparisonStatus) -> Vec<&Comparison> {
        self.comparisons
            .iter()
            .filter(|c| c.status == status)
            .collect()
    }

    pub fn count(&self, status: ComparisonStatus) -> usize {
        self.comparisons.iter().filter(|c| c.status == status).count()
    }

    pub fn has_changes(&self) -> bool {
        self.comparisons
            .iter()
            .any(|c| c.status != ComparisonStatus::Unchanged)
    }
}

/// Partition the union of local and remote ids.
///
/// Ids on both sides compare every non-volatile attribute. When they differ,
/// a remote `updated_at` later than the last sync means Behind; anything
/// else, including equal timestamps, means Modified. The last sync comes
/// from the ledger, falling back to the `updated_at` stored locally; with
/// neither, the remote copy wins.
pub fn classify(
    local: &BTreeMap<String, LocalSnapshot>,
    remote: &BTreeMap<String, ResourceRecord>,
    ledger: &SyncLedger,
) -> DiffReport {
    let ids: BTreeSet<&String> = local.keys().chain(remote.keys()).collect();
    let mut comparisons = Vec::with_capacity(ids.len());

    for id in ids {
        let comparison = match (local.get(id), remote.get(id)) {
            (None, Some(remote)) => Comparison {
                id: id.clone(),
                kind: remote.kind,
                status: ComparisonStatus::Added,
                path: None,
                attributes: BTreeMap::new(),
            },
            (Some(local), None) => Comparison {
                id: id.clone(),
                kind: local.record.kind,
                status: ComparisonStatus::Deleted,
                path: Some(local.path.clone()),
                attributes: BTreeMap::new(),
            },
            (Some(local), Some(remote)) => {
                let attributes = attribute_deltas(&local.record.attributes, &remote.attributes);
                let status = if attributes.is_empty() {
                    ComparisonStatus::Unchanged
                } else {
                    direction(id, &local.record, remote, ledger)
                };
                Comparison {
                    id: id.clone(),
                    kind: remote.kind,
                    status,
                    path: Some(local.path.clone()),
                    attributes,
                }
            }
            (None, None) => continue,
        };
        comparisons.push(comparison);
    }

    DiffReport::new(comparisons)
}

fn direction(
    id: &str,
    local: &ResourceRecord,
    remote: &ResourceRecord,
    ledger: &SyncLedger,
) -> ComparisonStatus {
    let last_synced = ledger.last_synced(id).or_else(|| local.updated_at());
    match (remote.updated_at(), last_synced) {
        (Some(remote_at), Some(synced_at)) if remote_at > synced_at => ComparisonStatus::Behind,
        (_, Some(_)) => ComparisonStatus::Modified,
        (_, None) => ComparisonStatus::Behind,
    }
}

/// Differing non-volatile attributes. Absent and `null` are the same.
pub fn attribute_deltas(
    local: &Map<String, Value>,
    remote: &Map<String, Value>,
) -> BTreeMap<String, AttributeDelta> {
    let keys: BTreeSet<&String> = local
        .keys()
        .chain(remote.keys())
        .filter(|key| !is_volatile(key))
        .collect();

    let mut deltas = BTreeMap::new();
    for key in keys {
        let l = local.get(key).filter(|v| !v.is_null());
        let r = remote.get(key).filter(|v| !v.is_null());
        if values_equal(key, l, r) {
            continue;
        }
        deltas.insert(
            key.clone(),
            AttributeDelta {
                local: l.map(stringify),
                remote: r.map(stringify),
            },
        );
    }
    deltas
}

fn values_equal(key: &str, local: Option<&Value>, remote: Option<&Value>) -> bool {
    match (local, remote) {
        (Some(Value::String(l)), Some(Value::String(r))) if key == "settings" => {
            match (
                serde_json::from_str::<Value>(l),
                serde_json::from_str::<Value>(r),
            ) {
                (Ok(l), Ok(r)) => l == r,
                _ => l == r,
            }
        }
        _ => local == remote,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attrs(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_volatile_keys() {
        assert!(is_volatile("updated_at"));
        assert!(is_volatile("created_by_email"));
        assert!(is_volatile("updated_by_display_name"));
        assert!(is_volatile("dirty"));
        assert!(!is_volatile("name"));
        assert!(!is_volatile("published_at"));
    }

    #[test]
    fn test_deltas_ignore_volatile_and_settings_formatting() {
        let local = attrs(json!({
            "name": "A",
            "settings": "{\"a\":1,\"b\":[1,2]}",
            "updated_at": "2024-01-01T00:00:00Z",
            "enabled": null
        }));
        let remote = attrs(json!({
            "name": "A",
            "settings": "{\n  \"b\": [1, 2],\n  \"a\": 1\n}",
            "updated_at": "2024-06-01T00:00:00Z"
        }));
        assert!(attribute_deltas(&local, &remote).is_empty());
    }

    #[test]
    fn test_deltas_stringify_values() {
        let local = attrs(json!({"name": "A", "order": 2}));
        let remote = attrs(json!({"name": "B", "order": 3, "enabled": true}));
        let deltas = attribute_deltas(&local, &remote);

        assert_eq!(
            deltas["name"],
            AttributeDelta {
                local: Some("A".into()),
                remote: Some("B".into())
            }
        );
        assert_eq!(deltas["order"].remote.as_deref(), Some("3"));
        assert_eq!(
            deltas["enabled"],
            AttributeDelta {
                local: None,
                remote: Some("true".into())
            }
        );
    }

    #[test]
    fn test_report_orders_by_status_then_id() {
        let comparison = |id: &str, status| Comparison {
            id: id.into(),
            kind: ResourceType::Rule,
            status,
            path: None,
            attributes: BTreeMap::new(),
        };
        let report = DiffReport::new(vec![
            comparison("b", ComparisonStatus::Unchanged),
            comparison("c", ComparisonStatus::Added),
            comparison("a", ComparisonStatus::Behind),
            comparison("a2", ComparisonStatus::Added),
        ]);
        let order: Vec<&str> = report.comparisons.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(order, vec!["a2", "c", "a", "b"]);
    }
}
