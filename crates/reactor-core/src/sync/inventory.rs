//! Remote inventory listing across resource types

use std::collections::BTreeSet;

use futures::future::join_all;
use futures::stream::{self, StreamExt};

use crate::model::{ResourceRecord, ResourceType};
use crate::paginate::{FetchOptions, fetch_all};
use crate::remote::{DispatchTable, ListOperation, ReactorApi};
use crate::{Error, Result};

/// List every remote resource of `kinds` under the property.
///
/// Types are listed concurrently, each through its own paginated fetch.
/// Rule components are listed per rule, with at most
/// `options.max_parallel_lists` rules in flight. Every listing runs to
/// completion before the first error, if any, is returned.
pub async fn fetch_inventory(
    api: &dyn ReactorApi,
    table: &DispatchTable,
    property_id: &str,
    options: FetchOptions,
    kinds: &[ResourceType],
) -> Result<Vec<ResourceRecord>> {
    let wanted: BTreeSet<ResourceType> = kinds.iter().copied().collect();
    let wants_components = wanted.contains(&ResourceType::RuleComponent);

    let mut listed: BTreeSet<ResourceType> = wanted
        .iter()
        .copied()
        .filter(|kind| table.operations(*kind).list != ListOperation::ForEachRule)
        .collect();
    if wants_components {
        listed.insert(ResourceType::Rule);
    }

    let results = join_all(
        listed
            .iter()
            .map(|kind| list_kind(api, table, property_id, options, *kind)),
    )
    .await;

    let mut records = Vec::new();
    let mut rule_ids = Vec::new();
    let mut first_error = None;
    for (kind, result) in listed.iter().zip(results) {
        match result {
            Ok(items) => {
                tracing::debug!(kind = %kind, count = items.len(), "Listed remote resources");
                if *kind == ResourceType::Rule {
                    rule_ids = items.iter().map(|rule| rule.id.clone()).collect();
                }
                if wanted.contains(kind) {
                    records.extend(items);
                }
            }
            Err(e) => {
                tracing::error!(kind = %kind, error = %e, "Listing failed");
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    if wants_components {
        records.extend(list_rule_components(api, options, rule_ids).await?);
    }

    tracing::info!(count = records.len(), "Fetched remote inventory");
    Ok(records)
}

async fn list_kind(
    api: &dyn ReactorApi,
    table: &DispatchTable,
    property_id: &str,
    options: FetchOptions,
    kind: ResourceType,
) -> Result<Vec<ResourceRecord>> {
    match table.operations(kind).list {
        ListOperation::Property => {
            fetch_all("get property", options, |_page| api.get_property(property_id)).await
        }
        ListOperation::ForProperty(endpoint) => {
            let operation = format!("list {}", endpoint.path());
            fetch_all(&operation, options, |page| {
                api.list_for_property(endpoint, property_id, page)
            })
            .await
        }
        ListOperation::ForEachRule => Err(Error::config(format!(
            "{kind} must be listed per rule"
        ))),
    }
}

async fn list_rule_components(
    api: &dyn ReactorApi,
    options: FetchOptions,
    rule_ids: Vec<String>,
) -> Result<Vec<ResourceRecord>> {
    let results: Vec<Result<Vec<ResourceRecord>>> = stream::iter(rule_ids)
        .map(|rule_id| async move {
            let operation = format!("list rule_components of {rule_id}");
            fetch_all(&operation, options, |page| {
                api.list_rule_components_for_rule(&rule_id, page)
            })
            .await
        })
        .buffered(options.max_parallel_lists.max(1))
        .collect()
        .await;

    let mut components = Vec::new();
    for result in results {
        components.extend(result?);
    }
    Ok(components)
}
