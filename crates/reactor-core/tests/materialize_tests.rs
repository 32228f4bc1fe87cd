//! Materializer tests: settings decomposition and transform extraction

use std::fs;

use pretty_assertions::assert_eq;
use reactor_core::{Materializer, ResourceRecord, ResourceType};
use reactor_test_utils::{
    FakeReactor, RecordBuilder, TestProperty, package_with_actions, package_with_configuration,
};
use serde_json::json;

fn custom_code_component(settings: serde_json::Value) -> ResourceRecord {
    RecordBuilder::new(ResourceType::RuleComponent, "RC1")
        .name("Run Custom Code")
        .delegate("core::actions::custom-code")
        .relationship("updated_with_extension_package", "EP_CORE", "extension_packages")
        .settings(settings)
        .build()
}

fn core_package() -> FakeReactor {
    FakeReactor::new().with_package(package_with_actions(
        "EP_CORE",
        "core::actions::custom-code",
        "source",
        "function",
        &["event", "target"],
    ))
}

#[tokio::test]
async fn test_function_transform_is_wrapped() {
    let property = TestProperty::new();
    let fake = core_package();
    let store = property.store();
    let record = custom_code_component(json!({"source": "return 1;", "language": "javascript"}));

    let materialized = Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    assert_eq!(materialized.artifacts, vec!["source".to_string()]);
    assert!(materialized.warnings.is_empty());
    assert_eq!(
        property.read("rule_components/RC1/settings.source.js"),
        "//==== START TRANSFORM CODE - DO NOT REMOVE ====\n\
         function(event, target) {\n\
         //==== END TRANSFORM CODE ====\n\
         return 1;\n\
         //==== START TRANSFORM CODE - DO NOT REMOVE ====\n\
         }\n\
         //==== END TRANSFORM CODE ===="
    );
    assert_eq!(
        property.read_json("rule_components/RC1/settings.json"),
        json!({"source": "return 1;", "language": "javascript"})
    );
}

#[tokio::test]
async fn test_rematerialize_is_byte_identical() {
    let property = TestProperty::new();
    let fake = core_package();
    let store = property.store();
    let record = custom_code_component(json!({"source": "return document.title;"}));
    let materializer = Materializer::new(&fake, &store);

    materializer.materialize(&record).await.unwrap();
    let first = [
        property.read("rule_components/RC1/data.json"),
        property.read("rule_components/RC1/settings.json"),
        property.read("rule_components/RC1/settings.source.js"),
    ];
    materializer.materialize(&record).await.unwrap();
    let second = [
        property.read("rule_components/RC1/data.json"),
        property.read("rule_components/RC1/settings.json"),
        property.read("rule_components/RC1/settings.source.js"),
    ];

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_falsy_value_is_not_extracted() {
    let property = TestProperty::new();
    let fake = core_package();
    let store = property.store();
    let record = custom_code_component(json!({"source": ""}));

    let materialized = Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    assert!(materialized.artifacts.is_empty());
    property.assert_file_exists("rule_components/RC1/settings.json");
    property.assert_file_missing("rule_components/RC1/settings.source.js");
}

#[tokio::test]
async fn test_unparsable_settings_write_only_data() {
    let property = TestProperty::new();
    let fake = core_package();
    let store = property.store();
    let record = RecordBuilder::new(ResourceType::RuleComponent, "RC1")
        .delegate("core::actions::custom-code")
        .relationship("updated_with_extension_package", "EP_CORE", "extension_packages")
        .attr("settings", json!("{not json"))
        .build();

    Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    property.assert_file_exists("rule_components/RC1/data.json");
    property.assert_file_missing("rule_components/RC1/settings.json");
}

#[tokio::test]
async fn test_extension_configuration_file_transform_is_verbatim() {
    let property = TestProperty::new();
    let fake = FakeReactor::new().with_package(package_with_configuration(
        "EP_ANALYTICS",
        "libraryCode.customSetup",
        "file",
    ));
    let store = property.store();
    let record = RecordBuilder::new(ResourceType::Extension, "EX1")
        .name("Analytics")
        .relationship("extension_package", "EP_ANALYTICS", "extension_packages")
        .settings(json!({"libraryCode": {"customSetup": "s.trackingServer = 'x';"}}))
        .build();

    Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    assert_eq!(
        property.read("extensions/EX1/settings.libraryCode.customSetup.js"),
        "s.trackingServer = 'x';"
    );
}

#[tokio::test]
async fn test_unrecognized_transform_is_a_warning() {
    let property = TestProperty::new();
    let fake = FakeReactor::new().with_package(package_with_actions(
        "EP_CORE",
        "core::actions::custom-code",
        "source",
        "binary",
        &[],
    ));
    let store = property.store();
    let record = custom_code_component(json!({"source": "AAAA"}));

    let materialized = Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    assert!(materialized.artifacts.is_empty());
    assert_eq!(materialized.warnings.len(), 1);
    assert!(materialized.warnings[0].contains("binary"));
}

#[tokio::test]
async fn test_missing_package_is_a_warning() {
    let property = TestProperty::new();
    let fake = FakeReactor::new();
    let store = property.store();
    let record = custom_code_component(json!({"source": "return 1;"}));

    let materialized = Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    assert_eq!(materialized.warnings.len(), 1);
    property.assert_file_exists("rule_components/RC1/settings.json");
}

#[cfg(unix)]
#[tokio::test]
async fn test_alias_link_points_at_id_directory() {
    let property = TestProperty::new();
    let fake = FakeReactor::new();
    let store = property.store();
    let record = RecordBuilder::new(ResourceType::DataElement, "DE1")
        .name("Page: Title")
        .build();

    Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    let link = property.root().join("data_elements/_Page_ Title");
    let target = fs::read_link(&link).unwrap();
    assert_eq!(target.to_str(), Some("DE1"));
}

#[tokio::test]
async fn test_edited_artifact_folds_back_into_record() {
    let property = TestProperty::new();
    let fake = core_package();
    let store = property.store();
    let record = custom_code_component(json!({"source": "return 1;"}));
    Materializer::new(&fake, &store)
        .materialize(&record)
        .await
        .unwrap();

    let path = "rule_components/RC1/settings.source.js";
    let edited = property.read(path).replace("return 1;", "return 2;");
    property.write(path, &edited);

    let entry = store.read_entry("rule_components", "RC1").unwrap();
    let settings: serde_json::Value =
        serde_json::from_str(entry.record["attributes"]["settings"].as_str().unwrap()).unwrap();
    assert_eq!(settings, json!({"source": "return 2;"}));
}

#[tokio::test]
async fn test_rematerialize_removes_files_of_previous_version() {
    let property = TestProperty::new();
    let fake = core_package();
    let store = property.store();
    let materializer = Materializer::new(&fake, &store);

    materializer
        .materialize(&custom_code_component(json!({"source": "return 1;"})))
        .await
        .unwrap();
    property.assert_file_exists("rule_components/RC1/settings.source.js");

    let emptied = materializer
        .materialize(&custom_code_component(json!({"language": "javascript"})))
        .await
        .unwrap();
    assert!(emptied.artifacts.is_empty());
    property.assert_file_missing("rule_components/RC1/settings.source.js");
    assert_eq!(
        property.read_json("rule_components/RC1/settings.json"),
        json!({"language": "javascript"})
    );

    let without_settings = RecordBuilder::new(ResourceType::RuleComponent, "RC1")
        .delegate("core::actions::custom-code")
        .relationship("updated_with_extension_package", "EP_CORE", "extension_packages")
        .build();
    materializer.materialize(&without_settings).await.unwrap();
    property.assert_file_missing("rule_components/RC1/settings.json");

    let entry = store.read_entry("rule_components", "RC1").unwrap();
    let reread: ResourceRecord = serde_json::from_value(entry.record).unwrap();
    assert_eq!(reread, without_settings);
}
