//! Remote service seam and the per-type operation table
//!
//! The engine never builds operation names from strings: every resource type
//! resolves once to an [`Operations`] record naming the endpoints it uses.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::RemoteError;
use crate::model::{Document, ExtensionPackage, ResourceRecord, ResourceType};

/// Result of a single remote call
pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// A remote collection path segment, e.g. `data_elements`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint(&'static str);

impl Endpoint {
    pub const fn new(path: &'static str) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &'static str {
        self.0
    }
}

/// Page selection for a collection request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

/// How the full inventory of a type is listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOperation {
    /// The property record itself (unpaged)
    Property,
    /// A paged collection under the property
    ForProperty(Endpoint),
    /// A paged collection under every rule of the property
    ForEachRule,
}

/// Which update call applies to a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperation {
    /// Attribute-only update on a resource collection
    Resource(Endpoint),
    /// Extension update, which also carries relationships
    Extension,
}

/// Named remote operations for one resource type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operations {
    pub list: ListOperation,
    pub get: Endpoint,
    pub update: UpdateOperation,
    /// Alternate update used for the single retry after a failed update
    pub fallback_update: UpdateOperation,
    /// Draft revision call; edits only take effect after it
    pub revise: Option<Endpoint>,
}

/// Resource type to operation mapping, resolved once at startup.
#[derive(Debug, Clone)]
pub struct DispatchTable {
    operations: HashMap<ResourceType, Operations>,
}

impl Default for DispatchTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchTable {
    pub fn new() -> Self {
        let operations = ResourceType::ALL
            .into_iter()
            .map(|kind| (kind, operations_for(kind)))
            .collect();
        Self { operations }
    }

    pub fn operations(&self, kind: ResourceType) -> Operations {
        self.operations
            .get(&kind)
            .copied()
            .unwrap_or_else(|| operations_for(kind))
    }
}

fn operations_for(kind: ResourceType) -> Operations {
    let endpoint = Endpoint::new(kind.as_str());
    match kind {
        ResourceType::Property => Operations {
            list: ListOperation::Property,
            get: endpoint,
            update: UpdateOperation::Resource(endpoint),
            fallback_update: UpdateOperation::Resource(endpoint),
            revise: None,
        },
        ResourceType::Extension => Operations {
            list: ListOperation::ForProperty(endpoint),
            get: endpoint,
            update: UpdateOperation::Extension,
            fallback_update: UpdateOperation::Resource(endpoint),
            revise: Some(endpoint),
        },
        ResourceType::DataElement => Operations {
            list: ListOperation::ForProperty(endpoint),
            get: endpoint,
            update: UpdateOperation::Resource(endpoint),
            fallback_update: UpdateOperation::Resource(endpoint),
            revise: Some(endpoint),
        },
        ResourceType::RuleComponent => Operations {
            list: ListOperation::ForEachRule,
            get: endpoint,
            update: UpdateOperation::Resource(endpoint),
            fallback_update: UpdateOperation::Resource(endpoint),
            revise: None,
        },
        ResourceType::Rule | ResourceType::Environment => Operations {
            list: ListOperation::ForProperty(endpoint),
            get: endpoint,
            update: UpdateOperation::Resource(endpoint),
            fallback_update: UpdateOperation::Resource(endpoint),
            revise: None,
        },
    }
}

/// The remote configuration service, as seen by the engine.
///
/// Implementations turn these calls into authenticated HTTP requests;
/// tests substitute an in-memory fake.
#[async_trait]
pub trait ReactorApi: Send + Sync {
    /// Fetch the property record (unpaged).
    async fn get_property(&self, property_id: &str) -> RemoteResult<Document<ResourceRecord>>;

    /// One page of a collection under the property.
    async fn list_for_property(
        &self,
        endpoint: Endpoint,
        property_id: &str,
        page: PageRequest,
    ) -> RemoteResult<Document<ResourceRecord>>;

    /// One page of the rule components of a rule.
    async fn list_rule_components_for_rule(
        &self,
        rule_id: &str,
        page: PageRequest,
    ) -> RemoteResult<Document<ResourceRecord>>;

    /// Fetch a single resource by id.
    async fn get(&self, endpoint: Endpoint, id: &str) -> RemoteResult<ResourceRecord>;

    /// Push a record's attributes (and, for extensions, relationships).
    async fn update(
        &self,
        operation: UpdateOperation,
        record: &ResourceRecord,
    ) -> RemoteResult<ResourceRecord>;

    /// Create a new draft revision of a resource.
    async fn revise(&self, endpoint: Endpoint, id: &str) -> RemoteResult<ResourceRecord>;

    /// Transform metadata for an extension package.
    async fn get_extension_package(&self, id: &str) -> RemoteResult<ExtensionPackage>;
}
