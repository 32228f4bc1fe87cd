//! Sync orchestrator tests against the in-memory service

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use reactor_core::{
    ComparisonStatus, EngineOptions, FetchOptions, NoProgress, ReactorApi, ResourceRecord,
    ResourceType, SyncDirection, SyncEngine, SyncPhase, SyncProgress, UpdateOperation,
};
use reactor_test_utils::{
    Call, FakeReactor, RecordBuilder, TestProperty, package_with_configuration,
};
use serde_json::json;

const SYNCED: &str = "2024-01-01T00:00:00.000Z";
const REMOTE_EDIT: &str = "2024-02-01T00:00:00.000Z";

#[derive(Default)]
struct RecordingProgress {
    events: Mutex<Vec<(SyncPhase, &'static str, usize)>>,
}

impl RecordingProgress {
    fn advanced(&self, phase: SyncPhase) -> Vec<usize> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, event, _)| *p == phase && *event == "advanced")
            .map(|(_, _, n)| *n)
            .collect()
    }
}

impl SyncProgress for RecordingProgress {
    fn started(&self, phase: SyncPhase, total: usize) {
        self.events.lock().unwrap().push((phase, "started", total));
    }

    fn advanced(&self, phase: SyncPhase, completed: usize) {
        self.events.lock().unwrap().push((phase, "advanced", completed));
    }
}

fn data_element(id: &str, name: &str, updated_at: &str) -> ResourceRecord {
    RecordBuilder::new(ResourceType::DataElement, id)
        .name(name)
        .updated_at(updated_at)
        .build()
}

fn property_record() -> ResourceRecord {
    RecordBuilder::new(ResourceType::Property, "PR1")
        .name("Site")
        .updated_at(SYNCED)
        .build()
}

fn engine(property: &TestProperty, fake: &Arc<FakeReactor>, batch_size: usize) -> SyncEngine {
    let options = EngineOptions {
        batch_size,
        fetch: FetchOptions {
            retry_delay: Duration::from_millis(5),
            ..FetchOptions::default()
        },
    };
    let api: Arc<dyn ReactorApi> = fake.clone();
    SyncEngine::new(api, property.store(), "PR1", options)
}

/// Three data elements edited locally since their last sync.
fn modified_fixture() -> (TestProperty, Arc<FakeReactor>) {
    let property = TestProperty::new();
    property.write_local(&property_record());
    let mut remote = Vec::new();
    for id in ["DE1", "DE2", "DE3"] {
        property.write_local(&data_element(id, "edited", SYNCED));
        remote.push(data_element(id, "original", SYNCED));
        property.mark_synced(id, SYNCED);
    }
    let fake = FakeReactor::new()
        .with_property(property_record())
        .with_records(remote);
    (property, Arc::new(fake))
}

/// `count` data elements changed remotely since their last sync.
fn behind_fixture(count: usize) -> (TestProperty, Arc<FakeReactor>) {
    let property = TestProperty::new();
    property.write_local(&property_record());
    let mut remote = Vec::new();
    for i in 1..=count {
        let id = format!("DE{i:02}");
        property.write_local(&data_element(&id, "old", SYNCED));
        remote.push(data_element(&id, "new", REMOTE_EDIT));
    }
    let fake = FakeReactor::new()
        .with_latency(Duration::from_millis(2))
        .with_property(property_record())
        .with_records(remote);
    (property, Arc::new(fake))
}

#[tokio::test]
async fn test_push_failure_is_isolated() {
    let (property, fake) = modified_fixture();
    fake.fail_updates_of("DE2");
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    assert_eq!(report.count(ComparisonStatus::Modified), 3);

    let outcome = engine
        .sync(&report, SyncDirection::from_flags(true, false), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.pushed, vec!["DE1".to_string(), "DE3".to_string()]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].id, "DE2");
    assert_eq!(outcome.failures[0].phase, SyncPhase::Push);
    assert!(!outcome.success());

    // Successful pushes are re-materialized from the server's answer.
    let de1 = property.read_json("data_elements/DE1/data.json");
    assert_eq!(de1["attributes"]["updated_at"], FakeReactor::UPDATED_AT);
    let de2 = property.read_json("data_elements/DE2/data.json");
    assert_eq!(de2["attributes"]["updated_at"], SYNCED);
    assert_eq!(fake.stored("DE2").unwrap().name(), Some("original"));
}

#[tokio::test]
async fn test_failed_update_is_retried_once_then_revised() {
    let (property, fake) = modified_fixture();
    fake.reject_first_update_of("DE1");
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    let outcome = engine
        .sync(&report, SyncDirection::from_flags(true, false), &NoProgress)
        .await
        .unwrap();

    assert!(outcome.success());
    let calls = fake.calls_for("DE1");
    let updates = calls
        .iter()
        .filter(|call| matches!(call, Call::Update { .. }))
        .count();
    assert_eq!(updates, 2);
    assert!(matches!(calls.last(), Some(Call::Revise { .. })));
}

#[tokio::test]
async fn test_extension_push_falls_back_to_resource_update() {
    let property = TestProperty::new();
    let local = RecordBuilder::new(ResourceType::Extension, "EX1")
        .name("edited")
        .updated_at(SYNCED)
        .build();
    property.write_local(&local);
    let fake = Arc::new(
        FakeReactor::new().with_property(property_record()).with_record(
            RecordBuilder::new(ResourceType::Extension, "EX1")
                .name("original")
                .updated_at(SYNCED)
                .build(),
        ),
    );
    fake.reject_first_update_of("EX1");
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    let outcome = engine
        .sync(&report, SyncDirection::from_flags(true, false), &NoProgress)
        .await
        .unwrap();

    assert!(outcome.success());
    let operations: Vec<UpdateOperation> = fake
        .calls_for("EX1")
        .into_iter()
        .filter_map(|call| match call {
            Call::Update { operation, .. } => Some(operation),
            _ => None,
        })
        .collect();
    assert_eq!(operations.len(), 2);
    assert_eq!(operations[0], UpdateOperation::Extension);
    assert!(matches!(operations[1], UpdateOperation::Resource(_)));
}

#[tokio::test]
async fn test_revise_failure_is_an_item_failure() {
    let (property, fake) = modified_fixture();
    fake.fail_revisions_of("DE3");
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    let outcome = engine
        .sync(&report, SyncDirection::from_flags(true, false), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.pushed.len(), 2);
    assert_eq!(outcome.failures[0].id, "DE3");
    assert!(outcome.failures[0].message.contains("revise"));
}

#[tokio::test]
async fn test_pull_runs_bounded_sequential_batches() {
    let (property, fake) = behind_fixture(12);
    let engine = engine(&property, &fake, 5);
    let progress = RecordingProgress::default();

    let report = engine.diff().await.unwrap();
    assert_eq!(report.count(ComparisonStatus::Behind), 12);

    let outcome = engine
        .sync(&report, SyncDirection::from_flags(false, true), &progress)
        .await
        .unwrap();

    assert_eq!(outcome.pulled.len(), 12);
    assert_eq!(progress.advanced(SyncPhase::Pull), vec![5, 10, 12]);
    assert!(fake.max_in_flight("get") <= 5);

    let gets: Vec<String> = fake
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::Get { id, .. } => Some(id),
            _ => None,
        })
        .collect();
    // Order within a batch is unspecified; batches themselves are ordered.
    let mut first_batch = gets[..5].to_vec();
    first_batch.sort();
    let expected: Vec<String> = (1..=5).map(|i| format!("DE{i:02}")).collect();
    assert_eq!(first_batch, expected);

    let de01 = property.read_json("data_elements/DE01/data.json");
    assert_eq!(de01["attributes"]["name"], "new");
}

#[tokio::test]
async fn test_pull_then_diff_is_unchanged() {
    let (property, fake) = behind_fixture(3);
    let engine = engine(&property, &fake, 2);

    let report = engine.diff().await.unwrap();
    engine
        .sync(&report, SyncDirection::BOTH, &NoProgress)
        .await
        .unwrap();

    assert_eq!(property.ledger().len(), 3);
    let again = engine.diff().await.unwrap();
    assert_eq!(again.count(ComparisonStatus::Behind), 0);
    assert_eq!(again.count(ComparisonStatus::Unchanged), 4);
}

#[tokio::test]
async fn test_pull_fetch_failure_is_isolated() {
    let (property, fake) = behind_fixture(4);
    fake.fail_gets_of("DE03");
    let engine = engine(&property, &fake, 2);

    let report = engine.diff().await.unwrap();
    let outcome = engine
        .sync(&report, SyncDirection::from_flags(false, true), &NoProgress)
        .await
        .unwrap();

    assert_eq!(outcome.pulled, vec!["DE01", "DE02", "DE04"]);
    assert_eq!(outcome.failed(SyncPhase::Pull).count(), 1);
}

#[tokio::test]
async fn test_modified_only_skips_pull() {
    let (property, fake) = behind_fixture(2);
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    let outcome = engine
        .sync(&report, SyncDirection::from_flags(true, false), &NoProgress)
        .await
        .unwrap();

    assert!(outcome.pulled.is_empty());
    assert!(
        !fake
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Get { .. }))
    );
}

#[tokio::test]
async fn test_behind_only_skips_push() {
    let (property, fake) = modified_fixture();
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    let outcome = engine
        .sync(&report, SyncDirection::from_flags(false, true), &NoProgress)
        .await
        .unwrap();

    assert!(outcome.pushed.is_empty());
    assert!(
        !fake
            .calls()
            .iter()
            .any(|call| matches!(call, Call::Update { .. }))
    );
}

#[tokio::test]
async fn test_pull_all_checks_out_property() {
    let property = TestProperty::new();
    let fake = Arc::new(
        FakeReactor::new()
            .with_property(property_record())
            .with_records([
                data_element("DE1", "Page Name", SYNCED),
                RecordBuilder::new(ResourceType::Rule, "RL1")
                    .name("Page Load")
                    .updated_at(SYNCED)
                    .build(),
            ])
            .with_rule_component(
                "RL1",
                RecordBuilder::new(ResourceType::RuleComponent, "RC1")
                    .updated_at(SYNCED)
                    .build(),
            ),
    );
    let engine = engine(&property, &fake, 2);

    let outcome = engine.pull_all(&NoProgress).await.unwrap();

    assert_eq!(outcome.pulled.len(), 4);
    property.assert_file_exists("properties/PR1/data.json");
    property.assert_file_exists("data_elements/DE1/data.json");
    property.assert_file_exists("rules/RL1/data.json");
    property.assert_file_exists("rule_components/RC1/data.json");
    assert_eq!(property.ledger().len(), 4);

    let report = engine.diff().await.unwrap();
    assert_eq!(report.count(ComparisonStatus::Unchanged), 4);
}

fn extension(settings: serde_json::Value, updated_at: &str) -> ResourceRecord {
    RecordBuilder::new(ResourceType::Extension, "EX1")
        .name("Analytics")
        .relationship("extension_package", "EP1", "extension_packages")
        .settings(settings)
        .updated_at(updated_at)
        .build()
}

#[tokio::test]
async fn test_code_removed_remotely_stays_removed_after_pull() {
    let property = TestProperty::new();
    let fake = Arc::new(
        FakeReactor::new()
            .with_property(property_record())
            .with_package(package_with_configuration(
                "EP1",
                "customSetup.source",
                "customCode",
            ))
            .with_record(extension(
                json!({"customSetup": {"source": "alert(1);"}}),
                SYNCED,
            )),
    );
    let engine = engine(&property, &fake, 5);
    engine.pull_all(&NoProgress).await.unwrap();
    property.assert_file_exists("extensions/EX1/settings.customSetup.source.js");

    fake.put_record(extension(json!({"customSetup": {}}), REMOTE_EDIT));
    let report = engine.diff().await.unwrap();
    assert_eq!(report.count(ComparisonStatus::Behind), 1);

    let outcome = engine
        .sync(&report, SyncDirection::BOTH, &NoProgress)
        .await
        .unwrap();
    assert_eq!(outcome.pulled, vec!["EX1"]);
    assert!(outcome.success());
    property.assert_file_missing("extensions/EX1/settings.customSetup.source.js");

    let again = engine.diff().await.unwrap();
    assert!(!again.has_changes(), "{:?}", again.comparisons);
    assert_eq!(again.count(ComparisonStatus::Unchanged), 2);
}

#[tokio::test]
async fn test_push_write_failure_aborts_after_saving_ledger() {
    let (property, fake) = modified_fixture();
    // A directory where settings.json belongs cannot be removed as a file.
    property.write("data_elements/DE1/settings.json/keep", "");
    let engine = engine(&property, &fake, 5);

    let report = engine.diff().await.unwrap();
    assert_eq!(report.count(ComparisonStatus::Modified), 3);

    let err = engine
        .sync(&report, SyncDirection::from_flags(true, false), &NoProgress)
        .await
        .unwrap_err();
    assert!(matches!(err, reactor_core::Error::Fs(_)), "{err:?}");

    // The update itself reached the service before the write failed.
    assert_eq!(fake.stored("DE1").unwrap().name(), Some("edited"));

    let pushed_at = reactor_core::model::parse_timestamp(FakeReactor::UPDATED_AT).unwrap();
    let ledger = property.ledger();
    assert_eq!(ledger.last_synced("DE2"), Some(pushed_at));
    assert_eq!(ledger.last_synced("DE3"), Some(pushed_at));
    assert_eq!(
        ledger.last_synced("DE1"),
        reactor_core::model::parse_timestamp(SYNCED)
    );
}
