//! Settings transform materializer
//!
//! Writes a record to its resource directory and extracts the code fields
//! that its extension package declares as transforms into separate files.

use serde_json::Value;

use reactor_fs::{LocalStore, NormalizedPath, alias_name, wrap_function_body};

use crate::Result;
use crate::model::{
    DelegateDescriptor, ExtensionPackage, ResourceRecord, ResourceType, TransformKind,
    TransformSpec,
};
use crate::remote::ReactorApi;

/// Relationship naming the package a data element or rule component was
/// last saved with.
const UPDATED_WITH_PACKAGE: &str = "updated_with_extension_package";
/// Relationship naming an extension's own package.
const EXTENSION_PACKAGE: &str = "extension_package";

/// Rule component delegate markers, in selection priority.
const RULE_COMPONENT_MARKERS: [&str; 3] = ["::actions::", "::events::", "::conditions::"];

/// Files written for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialized {
    /// The id-named resource directory
    pub dir: NormalizedPath,
    /// Property paths extracted to `settings.<path>.js`
    pub artifacts: Vec<String>,
    /// Non-fatal problems (unknown transform types, missing packages)
    pub warnings: Vec<String>,
}

/// Projects remote records onto the local store.
pub struct Materializer<'a> {
    api: &'a dyn ReactorApi,
    store: &'a LocalStore,
}

impl<'a> Materializer<'a> {
    pub fn new(api: &'a dyn ReactorApi, store: &'a LocalStore) -> Self {
        Self { api, store }
    }

    /// Write `data.json`, the alias link and every extracted settings file.
    ///
    /// Re-running on the same record rewrites byte-identical files.
    pub async fn materialize(&self, record: &ResourceRecord) -> Result<Materialized> {
        let alias = record.name().and_then(alias_name);
        let dir = self
            .store
            .write_record(record.kind.as_str(), &record.id, alias.as_deref(), record)?;
        self.materialize_settings(record, dir).await
    }

    /// Decompose `attributes.settings` into `settings.json` and transform
    /// artifacts inside `dir`.
    ///
    /// Files left by an earlier version of the record are removed, so the
    /// directory always folds back into exactly `record`.
    pub async fn materialize_settings(
        &self,
        record: &ResourceRecord,
        dir: NormalizedPath,
    ) -> Result<Materialized> {
        let mut result = Materialized {
            dir,
            artifacts: Vec::new(),
            warnings: Vec::new(),
        };

        match parse_settings(record) {
            Some(settings) => {
                self.store.write_settings(&result.dir, &settings)?;
                self.extract_transforms(record, &settings, &mut result)
                    .await?;
            }
            None => self.store.remove_settings(&result.dir)?,
        }

        let stale = self.store.prune_artifacts(&result.dir, &result.artifacts)?;
        if !stale.is_empty() {
            tracing::debug!(id = %record.id, ?stale, "Removed stale settings artifacts");
        }
        Ok(result)
    }

    async fn extract_transforms(
        &self,
        record: &ResourceRecord,
        settings: &Value,
        result: &mut Materialized,
    ) -> Result<()> {
        let Some(transforms) = self.resolve_transforms(record, &mut result.warnings).await else {
            return Ok(());
        };

        for transform in &transforms {
            let Some(value) = lookup_path(settings, &transform.property_path) else {
                continue;
            };
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };

            let content = match transform.transform_kind() {
                TransformKind::Function => wrap_function_body(transform.parameters(), &text),
                TransformKind::File | TransformKind::CustomCode => text,
                TransformKind::Unrecognized => {
                    tracing::warn!(
                        id = %record.id,
                        kind = %transform.kind,
                        path = %transform.property_path,
                        "Unrecognized transform"
                    );
                    result.warnings.push(format!(
                        "unrecognized transform '{}' for {}",
                        transform.kind, transform.property_path
                    ));
                    continue;
                }
            };

            self.store
                .write_artifact(&result.dir, &transform.property_path, &content)?;
            result.artifacts.push(transform.property_path.clone());
        }

        Ok(())
    }

    async fn resolve_transforms(
        &self,
        record: &ResourceRecord,
        warnings: &mut Vec<String>,
    ) -> Option<Vec<TransformSpec>> {
        let relationship = match record.kind {
            ResourceType::DataElement | ResourceType::RuleComponent => UPDATED_WITH_PACKAGE,
            ResourceType::Extension => EXTENSION_PACKAGE,
            _ => return None,
        };
        let package_id = record.related_id(relationship)?;

        let package = match self.api.get_extension_package(package_id).await {
            Ok(package) => package,
            Err(e) => {
                tracing::warn!(id = %record.id, package_id, error = %e, "Extension package lookup failed");
                warnings.push(format!("extension package {} unavailable: {}", package_id, e));
                return None;
            }
        };

        let transforms = select_transforms(record, &package);
        if transforms.is_none() && record.kind != ResourceType::Extension {
            tracing::debug!(
                id = %record.id,
                delegate = record.delegate_descriptor_id().unwrap_or_default(),
                "No transforms declared for delegate"
            );
        }
        transforms
    }
}

/// Pick the transform list governing `record` from its extension package.
pub fn select_transforms(
    record: &ResourceRecord,
    package: &ExtensionPackage,
) -> Option<Vec<TransformSpec>> {
    let attributes = &package.attributes;
    match record.kind {
        ResourceType::Extension => attributes.configuration.as_ref()?.transforms.clone(),
        ResourceType::DataElement => find_transforms(
            attributes.data_elements.as_deref(),
            record.delegate_descriptor_id()?,
        ),
        ResourceType::RuleComponent => {
            let delegate = record.delegate_descriptor_id()?;
            let candidates = [
                attributes.actions.as_deref(),
                attributes.events.as_deref(),
                attributes.conditions.as_deref(),
            ];
            let items = RULE_COMPONENT_MARKERS
                .iter()
                .zip(candidates)
                .find(|(marker, items)| {
                    delegate.contains(*marker) && items.is_some_and(|items| !items.is_empty())
                })
                .and_then(|(_, items)| items);
            find_transforms(items, delegate)
        }
        _ => None,
    }
}

fn find_transforms(
    items: Option<&[DelegateDescriptor]>,
    delegate: &str,
) -> Option<Vec<TransformSpec>> {
    items?
        .iter()
        .find(|item| item.id == delegate)?
        .transforms
        .clone()
}

fn parse_settings(record: &ResourceRecord) -> Option<Value> {
    let raw = record.settings()?;
    match serde_json::from_str::<Value>(raw) {
        Ok(settings) if is_truthy(&settings) => Some(settings),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!(id = %record.id, error = %e, "Settings are not valid JSON");
            None
        }
    }
}

/// Resolve a dotted path inside a settings document.
///
/// Missing segments short-circuit to `None`, and so do falsy values (`null`,
/// `false`, `0`, `""`) anywhere along the path.
pub fn lookup_path<'v>(settings: &'v Value, path: &str) -> Option<&'v Value> {
    let mut current = settings;
    for segment in path.split('.') {
        let next = match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }?;
        if !is_truthy(next) {
            return None;
        }
        current = next;
    }
    Some(current)
}

/// Truthiness of a JSON value as the settings documents treat it.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_none_or(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
