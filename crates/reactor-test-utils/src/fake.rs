//! [`FakeReactor`]: an in-memory stand-in for the remote service.
//!
//! Records every call, tracks how many calls of each group overlap, and can
//! be told to fail specific calls a fixed number of times or forever.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reactor_core::model::{Document, ExtensionPackage};
use reactor_core::{
    Endpoint, PageRequest, ReactorApi, RemoteError, RemoteResult, ResourceRecord, ResourceType,
    UpdateOperation,
};
use serde_json::Value;

/// A call observed by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetProperty,
    List { endpoint: &'static str, page: u32 },
    ListRuleComponents { rule_id: String, page: u32 },
    Get { endpoint: &'static str, id: String },
    Update { operation: UpdateOperation, id: String },
    Revise { endpoint: &'static str, id: String },
    GetExtensionPackage { id: String },
}

impl Call {
    /// Concurrency group: calls in one group are counted together.
    pub fn group(&self) -> String {
        match self {
            Call::GetProperty => "properties".to_string(),
            Call::List { endpoint, .. } => format!("list:{endpoint}"),
            Call::ListRuleComponents { rule_id, .. } => format!("rule:{rule_id}"),
            Call::Get { .. } => "get".to_string(),
            Call::Update { .. } | Call::Revise { .. } => "update".to_string(),
            Call::GetExtensionPackage { .. } => "packages".to_string(),
        }
    }

    fn id(&self) -> Option<&str> {
        match self {
            Call::Get { id, .. }
            | Call::Update { id, .. }
            | Call::Revise { id, .. }
            | Call::GetExtensionPackage { id } => Some(id.as_str()),
            _ => None,
        }
    }
}

type Matcher = Box<dyn Fn(&Call) -> bool + Send + Sync>;

struct Failure {
    matches: Matcher,
    error: RemoteError,
    /// `None` fails forever
    remaining: Option<usize>,
}

#[derive(Default)]
struct State {
    property: Option<ResourceRecord>,
    records: BTreeMap<String, ResourceRecord>,
    components: BTreeMap<String, Vec<String>>,
    packages: HashMap<String, ExtensionPackage>,
    failures: Vec<Failure>,
    calls: Vec<Call>,
    in_flight: HashMap<String, usize>,
    max_in_flight: HashMap<String, usize>,
}

/// In-memory remote service.
///
/// Collections are paged with the requested page size and carry
/// pagination metadata. Updates replace the stored attributes and stamp
/// `updated_at` with [`FakeReactor::UPDATED_AT`].
pub struct FakeReactor {
    state: Mutex<State>,
    latency: Duration,
}

impl Default for FakeReactor {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeReactor {
    /// Timestamp stamped on every updated record
    pub const UPDATED_AT: &'static str = "2030-01-01T00:00:00.000Z";

    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            latency: Duration::ZERO,
        }
    }

    /// Hold every call open for `latency` so overlap becomes observable.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn with_property(self, property: ResourceRecord) -> Self {
        self.lock().property = Some(property);
        self
    }

    /// Store a record. Rule components must name their rule.
    pub fn with_record(self, record: ResourceRecord) -> Self {
        self.insert(record);
        self
    }

    pub fn with_records(self, records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        for record in records {
            self.insert(record);
        }
        self
    }

    /// Replace (or add) a stored record, as an edit made on the service.
    pub fn put_record(&self, record: ResourceRecord) {
        self.lock().records.insert(record.id.clone(), record);
    }

    pub fn with_rule_component(self, rule_id: &str, component: ResourceRecord) -> Self {
        {
            let mut state = self.lock();
            state
                .components
                .entry(rule_id.to_string())
                .or_default()
                .push(component.id.clone());
            state.records.insert(component.id.clone(), component);
        }
        self
    }

    pub fn with_package(self, package: ExtensionPackage) -> Self {
        self.lock().packages.insert(package.id.clone(), package);
        self
    }

    /// Fail calls matching `matches` with `error`, `times` times (or forever).
    pub fn fail_when(
        &self,
        matches: impl Fn(&Call) -> bool + Send + Sync + 'static,
        error: RemoteError,
        times: Option<usize>,
    ) {
        self.lock().failures.push(Failure {
            matches: Box::new(matches),
            error,
            remaining: times,
        });
    }

    /// Every update of `id` fails with HTTP 500, whatever the operation.
    pub fn fail_updates_of(&self, id: &str) {
        let id = id.to_string();
        self.fail_when(
            move |call| matches!(call, Call::Update { id: target, .. } if *target == id),
            status(500, "update rejected"),
            None,
        );
    }

    /// The first update of `id` fails once with HTTP 400.
    pub fn reject_first_update_of(&self, id: &str) {
        let id = id.to_string();
        self.fail_when(
            move |call| matches!(call, Call::Update { id: target, .. } if *target == id),
            status(400, "wrong resource shape"),
            Some(1),
        );
    }

    pub fn fail_gets_of(&self, id: &str) {
        let id = id.to_string();
        self.fail_when(
            move |call| matches!(call, Call::Get { id: target, .. } if *target == id),
            status(404, "not found"),
            None,
        );
    }

    pub fn fail_revisions_of(&self, id: &str) {
        let id = id.to_string();
        self.fail_when(
            move |call| matches!(call, Call::Revise { id: target, .. } if *target == id),
            status(500, "revise failed"),
            None,
        );
    }

    /// Answer `times` requests for `page` of `endpoint` with 429.
    pub fn rate_limit_page(&self, endpoint: &'static str, page: u32, times: usize) {
        self.fail_when(
            move |call| *call == Call::List { endpoint, page },
            status(429, "Too Many Requests"),
            Some(times),
        );
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Calls made for `id`, in order.
    pub fn calls_for(&self, id: &str) -> Vec<Call> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.id() == Some(id))
            .cloned()
            .collect()
    }

    /// Highest number of simultaneously open calls seen in `group`.
    pub fn max_in_flight(&self, group: &str) -> usize {
        self.lock().max_in_flight.get(group).copied().unwrap_or(0)
    }

    pub fn stored(&self, id: &str) -> Option<ResourceRecord> {
        self.lock().records.get(id).cloned()
    }

    fn insert(&self, record: ResourceRecord) {
        if record.kind == ResourceType::RuleComponent {
            let rule_id = record.related_id("rule").map(str::to_string);
            if let Some(rule_id) = rule_id {
                self.lock()
                    .components
                    .entry(rule_id)
                    .or_default()
                    .push(record.id.clone());
            }
        }
        self.lock().records.insert(record.id.clone(), record);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Record `call`, hold it open for the configured latency and return
    /// the injected failure, if any.
    async fn enter(&self, call: Call) -> RemoteResult<()> {
        let group = call.group();
        let failure = {
            let mut state = self.lock();
            state.calls.push(call.clone());
            let open = state.in_flight.entry(group.clone()).or_default();
            *open += 1;
            let open = *open;
            let max = state.max_in_flight.entry(group.clone()).or_default();
            *max = (*max).max(open);

            let mut failure = None;
            for rule in state.failures.iter_mut() {
                if rule.remaining == Some(0) || !(rule.matches)(&call) {
                    continue;
                }
                if let Some(remaining) = rule.remaining.as_mut() {
                    *remaining -= 1;
                }
                failure = Some(rule.error.clone());
                break;
            }
            failure
        };

        if self.latency.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.latency).await;
        }

        if let Some(open) = self.lock().in_flight.get_mut(&group) {
            *open -= 1;
        }
        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn page_of(&self, ids: Vec<String>, page: PageRequest) -> Document<ResourceRecord> {
        let state = self.lock();
        let size = page.size.max(1) as usize;
        let total_pages = ids.len().div_ceil(size).max(1) as u32;
        let items = ids
            .iter()
            .skip((page.number.saturating_sub(1) as usize) * size)
            .take(size)
            .filter_map(|id| state.records.get(id).cloned())
            .collect();
        Document::page(items, page.number, total_pages)
    }
}

fn status(status: u16, message: &str) -> RemoteError {
    RemoteError::Status {
        status,
        message: message.to_string(),
    }
}

fn not_found(id: &str) -> RemoteError {
    status(404, &format!("{id} not found"))
}

#[async_trait]
impl ReactorApi for FakeReactor {
    async fn get_property(&self, property_id: &str) -> RemoteResult<Document<ResourceRecord>> {
        self.enter(Call::GetProperty).await?;
        self.lock()
            .property
            .clone()
            .map(Document::single)
            .ok_or_else(|| not_found(property_id))
    }

    async fn list_for_property(
        &self,
        endpoint: Endpoint,
        _property_id: &str,
        page: PageRequest,
    ) -> RemoteResult<Document<ResourceRecord>> {
        self.enter(Call::List {
            endpoint: endpoint.path(),
            page: page.number,
        })
        .await?;
        let ids = self
            .lock()
            .records
            .values()
            .filter(|record| record.kind.as_str() == endpoint.path())
            .map(|record| record.id.clone())
            .collect();
        Ok(self.page_of(ids, page))
    }

    async fn list_rule_components_for_rule(
        &self,
        rule_id: &str,
        page: PageRequest,
    ) -> RemoteResult<Document<ResourceRecord>> {
        self.enter(Call::ListRuleComponents {
            rule_id: rule_id.to_string(),
            page: page.number,
        })
        .await?;
        let ids = self
            .lock()
            .components
            .get(rule_id)
            .cloned()
            .unwrap_or_default();
        Ok(self.page_of(ids, page))
    }

    async fn get(&self, endpoint: Endpoint, id: &str) -> RemoteResult<ResourceRecord> {
        self.enter(Call::Get {
            endpoint: endpoint.path(),
            id: id.to_string(),
        })
        .await?;
        self.stored(id).ok_or_else(|| not_found(id))
    }

    async fn update(
        &self,
        operation: UpdateOperation,
        record: &ResourceRecord,
    ) -> RemoteResult<ResourceRecord> {
        self.enter(Call::Update {
            operation,
            id: record.id.clone(),
        })
        .await?;

        let mut state = self.lock();
        let stored = state
            .records
            .entry(record.id.clone())
            .or_insert_with(|| record.clone());
        stored.attributes = record.attributes.clone();
        stored.attributes.insert(
            "updated_at".to_string(),
            Value::String(Self::UPDATED_AT.to_string()),
        );
        if operation == UpdateOperation::Extension {
            stored.relationships = record.relationships.clone();
        }
        Ok(stored.clone())
    }

    async fn revise(&self, endpoint: Endpoint, id: &str) -> RemoteResult<ResourceRecord> {
        self.enter(Call::Revise {
            endpoint: endpoint.path(),
            id: id.to_string(),
        })
        .await?;
        self.stored(id).ok_or_else(|| not_found(id))
    }

    async fn get_extension_package(&self, id: &str) -> RemoteResult<ExtensionPackage> {
        self.enter(Call::GetExtensionPackage { id: id.to_string() })
            .await?;
        self.lock()
            .packages
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id))
    }
}
