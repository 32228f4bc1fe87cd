//! Comparator classification tests

use std::collections::{BTreeMap, BTreeSet};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use reactor_core::model::parse_timestamp;
use reactor_core::sync::{LocalSnapshot, classify};
use reactor_core::{ComparisonStatus, ResourceRecord, ResourceType, SyncLedger};
use reactor_test_utils::RecordBuilder;
use serde_json::json;

fn local(records: Vec<ResourceRecord>) -> BTreeMap<String, LocalSnapshot> {
    records
        .into_iter()
        .map(|record| {
            let path = format!("./PR1/{}/{}", record.kind, record.id);
            (record.id.clone(), LocalSnapshot { record, path })
        })
        .collect()
}

fn remote(records: Vec<ResourceRecord>) -> BTreeMap<String, ResourceRecord> {
    records.into_iter().map(|r| (r.id.clone(), r)).collect()
}

fn ledger(entries: &[(&str, &str)]) -> SyncLedger {
    let mut ledger = SyncLedger::new();
    for (id, at) in entries {
        ledger.record(*id, parse_timestamp(at).unwrap());
    }
    ledger
}

fn data_element(id: &str, name: &str, updated_at: &str) -> ResourceRecord {
    RecordBuilder::new(ResourceType::DataElement, id)
        .name(name)
        .updated_at(updated_at)
        .build()
}

#[test]
fn test_added_and_deleted() {
    let report = classify(
        &local(vec![data_element("DE_LOCAL", "a", "2024-01-01T00:00:00Z")]),
        &remote(vec![data_element("DE_REMOTE", "b", "2024-01-01T00:00:00Z")]),
        &SyncLedger::new(),
    );

    let added = report.with_status(ComparisonStatus::Added);
    let deleted = report.with_status(ComparisonStatus::Deleted);
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].id, "DE_REMOTE");
    assert_eq!(added[0].path, None);
    assert_eq!(deleted.len(), 1);
    assert_eq!(deleted[0].id, "DE_LOCAL");
    assert_eq!(deleted[0].path.as_deref(), Some("./PR1/data_elements/DE_LOCAL"));
}

#[test]
fn test_modified_when_remote_not_newer_than_last_sync() {
    let report = classify(
        &local(vec![data_element("X", "edited", "2024-01-01T00:00:00Z")]),
        &remote(vec![data_element("X", "original", "2024-01-01T00:00:00Z")]),
        &ledger(&[("X", "2024-01-01T00:00:00Z")]),
    );

    let modified = report.with_status(ComparisonStatus::Modified);
    assert_eq!(modified.len(), 1);
    let delta = &modified[0].attributes["name"];
    assert_eq!(delta.local.as_deref(), Some("edited"));
    assert_eq!(delta.remote.as_deref(), Some("original"));
}

#[test]
fn test_behind_when_remote_newer_than_last_sync() {
    let report = classify(
        &local(vec![data_element("X", "old", "2024-01-01T00:00:00Z")]),
        &remote(vec![data_element("X", "new", "2024-03-01T00:00:00Z")]),
        &ledger(&[("X", "2024-01-01T00:00:00Z")]),
    );

    assert_eq!(report.count(ComparisonStatus::Behind), 1);
    assert_eq!(report.count(ComparisonStatus::Modified), 0);
}

#[test]
fn test_local_updated_at_stands_in_for_missing_ledger_entry() {
    let report = classify(
        &local(vec![data_element("X", "edited", "2024-02-01T00:00:00Z")]),
        &remote(vec![data_element("X", "original", "2024-02-01T00:00:00Z")]),
        &SyncLedger::new(),
    );
    assert_eq!(report.count(ComparisonStatus::Modified), 1);
}

#[test]
fn test_no_sync_record_means_behind() {
    let local_record = RecordBuilder::new(ResourceType::Rule, "RL1").name("a").build();
    let report = classify(
        &local(vec![local_record]),
        &remote(vec![
            RecordBuilder::new(ResourceType::Rule, "RL1")
                .name("b")
                .updated_at("2024-01-01T00:00:00Z")
                .build(),
        ]),
        &SyncLedger::new(),
    );
    assert_eq!(report.count(ComparisonStatus::Behind), 1);
}

#[test]
fn test_volatile_only_difference_is_unchanged() {
    let local_record = RecordBuilder::new(ResourceType::Extension, "EX1")
        .name("Core")
        .updated_at("2024-01-01T00:00:00Z")
        .attr("dirty", json!(true))
        .attr("created_by_email", json!("a@example.com"))
        .build();
    let remote_record = RecordBuilder::new(ResourceType::Extension, "EX1")
        .name("Core")
        .updated_at("2024-05-01T00:00:00Z")
        .attr("dirty", json!(false))
        .attr("created_by_email", json!("b@example.com"))
        .build();

    let report = classify(
        &local(vec![local_record]),
        &remote(vec![remote_record]),
        &SyncLedger::new(),
    );
    assert_eq!(report.count(ComparisonStatus::Unchanged), 1);
    assert!(!report.has_changes());
}

#[test]
fn test_settings_compare_structurally() {
    let local_record = RecordBuilder::new(ResourceType::DataElement, "DE1")
        .attr("settings", json!("{\"path\": \"document.title\", \"n\": 1}"))
        .build();
    let remote_record = RecordBuilder::new(ResourceType::DataElement, "DE1")
        .attr("settings", json!("{\"n\":1,\"path\":\"document.title\"}"))
        .build();

    let report = classify(
        &local(vec![local_record]),
        &remote(vec![remote_record]),
        &SyncLedger::new(),
    );
    assert_eq!(report.count(ComparisonStatus::Unchanged), 1);
}

#[test]
fn test_report_is_grouped_then_sorted() {
    let stamp = "2024-01-01T00:00:00Z";
    let report = classify(
        &local(vec![
            data_element("b_unchanged", "same", stamp),
            data_element("a_unchanged", "same", stamp),
            data_element("z_deleted", "x", stamp),
        ]),
        &remote(vec![
            data_element("b_unchanged", "same", stamp),
            data_element("a_unchanged", "same", stamp),
            data_element("y_added", "x", stamp),
            data_element("c_added", "x", stamp),
        ]),
        &SyncLedger::new(),
    );

    let order: Vec<(&str, ComparisonStatus)> = report
        .comparisons
        .iter()
        .map(|c| (c.id.as_str(), c.status))
        .collect();
    assert_eq!(
        order,
        vec![
            ("c_added", ComparisonStatus::Added),
            ("y_added", ComparisonStatus::Added),
            ("z_deleted", ComparisonStatus::Deleted),
            ("a_unchanged", ComparisonStatus::Unchanged),
            ("b_unchanged", ComparisonStatus::Unchanged),
        ]
    );
}

fn arb_side() -> impl Strategy<Value = BTreeMap<String, (String, i64)>> {
    prop::collection::btree_map("[a-f]{1,2}", ("[xy]", 0i64..3), 0..12)
}

fn stamp(day: i64) -> String {
    format!("2024-01-{:02}T00:00:00Z", day + 1)
}

proptest! {
    #[test]
    fn prop_classes_partition_the_id_union(
        local_side in arb_side(),
        remote_side in arb_side(),
        synced_day in prop::option::of(0i64..3),
    ) {
        let local_records = local(
            local_side
                .iter()
                .map(|(id, (name, day))| data_element(id, name, &stamp(*day)))
                .collect(),
        );
        let remote_records = remote(
            remote_side
                .iter()
                .map(|(id, (name, day))| data_element(id, name, &stamp(*day)))
                .collect(),
        );
        let mut sync_ledger = SyncLedger::new();
        if let Some(day) = synced_day {
            for id in local_side.keys() {
                sync_ledger.record(id.clone(), parse_timestamp(&stamp(day)).unwrap());
            }
        }

        let report = classify(&local_records, &remote_records, &sync_ledger);

        let union: BTreeSet<&String> = local_side.keys().chain(remote_side.keys()).collect();
        let classified: Vec<&String> = report.comparisons.iter().map(|c| &c.id).collect();
        let unique: BTreeSet<&String> = classified.iter().copied().collect();
        prop_assert_eq!(classified.len(), unique.len());
        prop_assert_eq!(unique, union);

        for comparison in &report.comparisons {
            let in_local = local_side.contains_key(&comparison.id);
            let in_remote = remote_side.contains_key(&comparison.id);
            match comparison.status {
                ComparisonStatus::Added => prop_assert!(!in_local && in_remote),
                ComparisonStatus::Deleted => prop_assert!(in_local && !in_remote),
                ComparisonStatus::Unchanged => {
                    prop_assert!(in_local && in_remote);
                    prop_assert!(comparison.attributes.is_empty());
                }
                ComparisonStatus::Modified | ComparisonStatus::Behind => {
                    prop_assert!(in_local && in_remote);
                    prop_assert!(!comparison.attributes.is_empty());
                }
            }
        }

        let total: usize = ComparisonStatus::ALL.iter().map(|s| report.count(*s)).sum();
        prop_assert_eq!(total, report.comparisons.len());
    }
}
