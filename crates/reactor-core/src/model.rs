//! Data model shared by the comparator, materializer and orchestrator
//!
//! Records follow the remote service's JSON:API shape. Attribute maps keep
//! their insertion order so `data.json` reproduces the server's field order.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// The closed set of resource types under a property.
///
/// The serialized names are the remote `type` values, which are also the
/// directory names on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceType {
    #[serde(rename = "properties")]
    Property,
    #[serde(rename = "data_elements")]
    DataElement,
    #[serde(rename = "extensions")]
    Extension,
    #[serde(rename = "rules")]
    Rule,
    #[serde(rename = "rule_components")]
    RuleComponent,
    #[serde(rename = "environments")]
    Environment,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::Property,
        ResourceType::DataElement,
        ResourceType::Extension,
        ResourceType::Rule,
        ResourceType::RuleComponent,
        ResourceType::Environment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Property => "properties",
            ResourceType::DataElement => "data_elements",
            ResourceType::Extension => "extensions",
            ResourceType::Rule => "rules",
            ResourceType::RuleComponent => "rule_components",
            ResourceType::Environment => "environments",
        }
    }

    /// Directory names of every type, in declaration order.
    pub fn dir_names() -> Vec<&'static str> {
        Self::ALL.iter().map(ResourceType::as_str).collect()
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::config(format!("Unknown resource type: {}", s)))
    }
}

/// One resource as exchanged with the remote service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ResourceType,
    #[serde(default)]
    pub attributes: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub relationships: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub links: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, kind: ResourceType) -> Self {
        Self {
            id: id.into(),
            kind,
            attributes: Map::new(),
            relationships: Map::new(),
            links: Map::new(),
            meta: Map::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(Value::as_str)
    }

    /// The raw, serialized `settings` attribute.
    pub fn settings(&self) -> Option<&str> {
        self.attributes.get("settings").and_then(Value::as_str)
    }

    pub fn delegate_descriptor_id(&self) -> Option<&str> {
        self.attributes
            .get("delegate_descriptor_id")
            .and_then(Value::as_str)
    }

    /// Server-side modification time, when present and well formed.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.attributes
            .get("updated_at")
            .and_then(Value::as_str)
            .and_then(parse_timestamp)
    }

    /// Id of the resource a relationship points at (`relationships.<name>.data.id`).
    pub fn related_id(&self, relationship: &str) -> Option<&str> {
        self.relationships
            .get(relationship)?
            .get("data")?
            .get("id")?
            .as_str()
    }
}

/// Parse an RFC 3339 timestamp as sent by the remote service.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// A response's `data` member: one resource or a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => vec![item],
        }
    }
}

/// Pagination block of a paged collection response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Response envelope `{ data, meta.pagination? }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document<T> {
    pub data: OneOrMany<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DocumentMeta>,
}

impl<T> Document<T> {
    /// An unpaged single-resource response.
    pub fn single(item: T) -> Self {
        Self {
            data: OneOrMany::One(item),
            meta: None,
        }
    }

    /// One page of a paged collection.
    pub fn page(items: Vec<T>, current_page: u32, total_pages: u32) -> Self {
        Self {
            data: OneOrMany::Many(items),
            meta: Some(DocumentMeta {
                pagination: Some(Pagination {
                    current_page,
                    total_pages,
                }),
            }),
        }
    }

    pub fn pagination(&self) -> Option<Pagination> {
        self.meta.as_ref().and_then(|meta| meta.pagination)
    }
}

/// How a transform extracts its value from the settings document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformKind {
    /// Code wrapped as a function body with named parameters
    Function,
    /// Raw file contents
    File,
    /// Raw custom code
    CustomCode,
    Unrecognized,
}

/// One extraction rule declared by an extension package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformSpec {
    #[serde(rename = "propertyPath")]
    pub property_path: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<String>>,
}

impl TransformSpec {
    pub fn transform_kind(&self) -> TransformKind {
        match self.kind.as_str() {
            "function" => TransformKind::Function,
            "file" => TransformKind::File,
            "customCode" => TransformKind::CustomCode,
            _ => TransformKind::Unrecognized,
        }
    }

    pub fn parameters(&self) -> &[String] {
        self.parameters.as_deref().unwrap_or_default()
    }
}

/// A delegate (data element type, action, event or condition) offered by
/// an extension package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegateDescriptor {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<TransformSpec>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionConfiguration {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transforms: Option<Vec<TransformSpec>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPackageAttributes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_elements: Option<Vec<DelegateDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<DelegateDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<Vec<DelegateDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Vec<DelegateDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<ExtensionConfiguration>,
}

/// Remote metadata describing an extension's delegates and their transforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPackage {
    pub id: String,
    #[serde(default)]
    pub attributes: ExtensionPackageAttributes,
}
