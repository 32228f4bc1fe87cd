//! Builders for resource records and extension packages.

use reactor_core::model::{
    DelegateDescriptor, ExtensionConfiguration, ExtensionPackage, ExtensionPackageAttributes,
    TransformSpec,
};
use reactor_core::{ResourceRecord, ResourceType};
use serde_json::{Value, json};

/// Fluent builder for a [`ResourceRecord`].
///
/// ```rust,no_run
/// use reactor_core::ResourceType;
/// use reactor_test_utils::RecordBuilder;
///
/// let record = RecordBuilder::new(ResourceType::DataElement, "DE1")
///     .name("Page Name")
///     .updated_at("2024-01-01T00:00:00.000Z")
///     .build();
/// ```
pub struct RecordBuilder {
    record: ResourceRecord,
}

impl RecordBuilder {
    pub fn new(kind: ResourceType, id: &str) -> Self {
        Self {
            record: ResourceRecord::new(id, kind),
        }
    }

    pub fn name(self, name: &str) -> Self {
        self.attr("name", json!(name))
    }

    pub fn attr(mut self, key: &str, value: Value) -> Self {
        self.record.attributes.insert(key.to_string(), value);
        self
    }

    /// Store `settings` as the JSON-encoded string the service uses.
    pub fn settings(self, settings: Value) -> Self {
        let encoded = settings.to_string();
        self.attr("settings", Value::String(encoded))
    }

    pub fn updated_at(self, timestamp: &str) -> Self {
        self.attr("updated_at", json!(timestamp))
    }

    pub fn delegate(self, descriptor_id: &str) -> Self {
        self.attr("delegate_descriptor_id", json!(descriptor_id))
    }

    /// Add a to-one relationship `{ "data": { "id", "type" } }`.
    pub fn relationship(mut self, name: &str, id: &str, kind: &str) -> Self {
        self.record.relationships.insert(
            name.to_string(),
            json!({ "data": { "id": id, "type": kind } }),
        );
        self
    }

    pub fn build(self) -> ResourceRecord {
        self.record
    }
}

fn transform(path: &str, kind: &str, parameters: &[&str]) -> TransformSpec {
    TransformSpec {
        property_path: path.to_string(),
        kind: kind.to_string(),
        parameters: if parameters.is_empty() {
            None
        } else {
            Some(parameters.iter().map(|p| p.to_string()).collect())
        },
    }
}

/// A package whose single action `descriptor` declares one transform.
pub fn package_with_actions(
    id: &str,
    descriptor: &str,
    path: &str,
    kind: &str,
    parameters: &[&str],
) -> ExtensionPackage {
    ExtensionPackage {
        id: id.to_string(),
        attributes: ExtensionPackageAttributes {
            name: Some(id.to_string()),
            actions: Some(vec![DelegateDescriptor {
                id: descriptor.to_string(),
                transforms: Some(vec![transform(path, kind, parameters)]),
            }]),
            ..Default::default()
        },
    }
}

/// A package whose extension configuration declares one transform.
pub fn package_with_configuration(id: &str, path: &str, kind: &str) -> ExtensionPackage {
    ExtensionPackage {
        id: id.to_string(),
        attributes: ExtensionPackageAttributes {
            name: Some(id.to_string()),
            configuration: Some(ExtensionConfiguration {
                transforms: Some(vec![transform(path, kind, &[])]),
            }),
            ..Default::default()
        },
    }
}
