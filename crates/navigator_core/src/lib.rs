use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use shared::{
    domain::{ContextId, Owner, RecordId},
    error::is_success,
    protocol::{
        priority_operation, summary_operation, PriorityRequest, Record, StatusResponse,
        SummaryRequest, SummaryResponse,
    },
};
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, info, info_span, warn, Instrument, Span};

pub mod config;
pub mod drag;
pub mod error;
pub mod events;
pub mod ordering;
mod remote;
pub mod route;
pub mod selection;
pub mod staff;
pub mod store;

pub use config::{load_settings, load_settings_from, CategoryRanks, NavigatorSettings};
pub use error::{ConfigError, FetchError, PersistError, ReorderError};
pub use events::{LifecycleEvent, NavigatorEvent, NavigatorInput};
pub use ordering::{OrderingEngine, PersistPolicy, PriorityChange, ReorderOutcome, StepPolicy};
pub use remote::StorageRemoteStore;
pub use route::{MemoryRouter, Route, RouteParam, RouteParams, Router};
pub use selection::{SelectionController, SelectionEffect};
pub use staff::{ContainerKey, GroupTotals, StaffDirectory, StaffHooks};
pub use store::{NoopHooks, RecordHooks, RecordStore};

#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn call(&self, operation: &str, payload: Value) -> Result<Value>;
}

pub struct MissingRemoteStore;

#[async_trait]
impl RemoteStore for MissingRemoteStore {
    async fn call(&self, operation: &str, _payload: Value) -> Result<Value> {
        Err(anyhow!("remote store is unavailable for operation {operation}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Populated { count: usize },
    AlreadyInFlight,
    /// The context changed while the fetch was outstanding.
    Discarded,
    /// Nothing needed fetching.
    Skipped,
}

enum Outbound {
    Notify(NavigatorEvent),
    Navigate(RouteParam),
}

impl From<SelectionEffect> for Outbound {
    fn from(effect: SelectionEffect) -> Self {
        match effect {
            SelectionEffect::Changed(id) => Self::Notify(NavigatorEvent::SelectionChanged(id)),
            SelectionEffect::Navigate(rid) => Self::Navigate(rid),
        }
    }
}

struct NavigatorState {
    selection: SelectionController,
    store: RecordStore,
    readonly: bool,
    owner: Owner,
}

impl NavigatorState {
    fn published(&self) -> Outbound {
        Outbound::Notify(NavigatorEvent::RecordsPublished {
            revision: self.store.revision(),
            records: self.store.records().to_vec(),
        })
    }
}

/// Keeps a summary collection, its selection and the route in step, and
/// persists drag-and-drop reorders.
///
/// All state sits behind one lock that is never held across a remote call, so
/// route changes and lifecycle events may interleave with outstanding fetches
/// and priority writes.
pub struct RecordNavigator {
    settings: NavigatorSettings,
    remote: Arc<dyn RemoteStore>,
    router: Arc<dyn Router>,
    hooks: Arc<dyn RecordHooks>,
    ordering: OrderingEngine,
    inner: Mutex<NavigatorState>,
    events: broadcast::Sender<NavigatorEvent>,
    span: Span,
}

impl RecordNavigator {
    pub fn new(
        settings: NavigatorSettings,
        remote: Arc<dyn RemoteStore>,
        router: Arc<dyn Router>,
        hooks: Arc<dyn RecordHooks>,
    ) -> Arc<Self> {
        let span = info_span!("recnav", domain = %settings.domain);
        Self::new_with_span(settings, remote, router, hooks, span)
    }

    pub fn new_with_span(
        settings: NavigatorSettings,
        remote: Arc<dyn RemoteStore>,
        router: Arc<dyn Router>,
        hooks: Arc<dyn RecordHooks>,
        span: Span,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        let ordering = OrderingEngine::new(settings.step_policy, settings.persist_policy);
        Arc::new(Self {
            settings,
            remote,
            router,
            hooks,
            ordering,
            inner: Mutex::new(NavigatorState {
                selection: SelectionController::new(),
                store: RecordStore::new(),
                readonly: false,
                owner: Owner::default(),
            }),
            events,
            span,
        })
    }

    pub fn settings(&self) -> &NavigatorSettings {
        &self.settings
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<NavigatorEvent> {
        self.events.subscribe()
    }

    pub async fn selected_id(&self) -> RecordId {
        self.inner.lock().await.selection.selected()
    }

    pub async fn context_id(&self) -> ContextId {
        self.inner.lock().await.selection.context()
    }

    pub async fn records(&self) -> Vec<Record> {
        self.inner.lock().await.store.records().to_vec()
    }

    pub async fn revision(&self) -> u64 {
        self.inner.lock().await.store.revision()
    }

    pub async fn is_fetched(&self) -> bool {
        self.inner.lock().await.store.is_fetched()
    }

    pub async fn readonly(&self) -> bool {
        self.inner.lock().await.readonly
    }

    pub async fn owner(&self) -> Owner {
        self.inner.lock().await.owner.clone()
    }

    fn deliver(&self, outbound: Vec<Outbound>) {
        for item in outbound {
            match item {
                Outbound::Notify(event) => {
                    if let NavigatorEvent::SelectionChanged(id) = &event {
                        debug!(parent: &self.span, record_id = id.0, "selection changed");
                    }
                    let _ = self.events.send(event);
                }
                Outbound::Navigate(rid) => {
                    debug!(parent: &self.span, rid = ?rid, "routing after selection change");
                    self.router.navigate(rid);
                }
            }
        }
    }

    /// Switches the parent context. A new non-zero context empties the
    /// collection, clears the selection and fetches the new summary.
    pub async fn on_context_change(&self, context_id: ContextId) -> Result<FetchOutcome, FetchError> {
        let changed = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state
                .selection
                .on_context_change(context_id, &mut state.store)
                .map(|effects| {
                    let mut outbound: Vec<Outbound> = effects.into_iter().map(Outbound::from).collect();
                    outbound.push(state.published());
                    outbound
                })
        };

        let Some(outbound) = changed else {
            return Ok(FetchOutcome::Skipped);
        };
        info!(parent: &self.span, context_id = context_id.0, "context changed");
        self.deliver(outbound);
        self.fetch_summary(context_id).await
    }

    pub async fn on_route_change(&self, route: &Route) -> Result<FetchOutcome, FetchError> {
        let decision = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state
                .selection
                .on_route_change(route, self.router.as_ref(), &state.store)
        };
        self.deliver(decision.effects.into_iter().map(Outbound::from).collect());

        match decision.fetch {
            Some(context_id) => self.fetch_summary(context_id).await,
            None => Ok(FetchOutcome::Skipped),
        }
    }

    pub async fn select(&self, id: RecordId) {
        let effects = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state.selection.select(id, &state.store)
        };
        self.deliver(effects.into_iter().map(Outbound::from).collect());
    }

    pub async fn fetch_summary(&self, context_id: ContextId) -> Result<FetchOutcome, FetchError> {
        async move {
            if !self.inner.lock().await.store.begin_fetch(context_id) {
                debug!(context_id = context_id.0, "summary fetch already in flight");
                return Ok(FetchOutcome::AlreadyInFlight);
            }

            debug!(context_id = context_id.0, "about to read record summary");
            let result = self.request_summary(context_id).await;

            let mut outbound = Vec::new();
            let outcome = {
                let mut guard = self.inner.lock().await;
                let state = &mut *guard;

                let records = match result {
                    Ok(records) => records,
                    Err(err) => {
                        state.store.abandon_fetch(context_id);
                        warn!(context_id = context_id.0, error = %err, "summary fetch failed");
                        return Err(err);
                    }
                };

                if self.settings.discard_stale_fetches && state.selection.context() != context_id {
                    state.store.abandon_fetch(context_id);
                    info!(
                        context_id = context_id.0,
                        active_context_id = state.selection.context().0,
                        "discarding summary for a context that is no longer active"
                    );
                    outbound.push(Outbound::Notify(NavigatorEvent::FetchDiscarded { context_id }));
                    FetchOutcome::Discarded
                } else {
                    let count = records.len();
                    state
                        .store
                        .complete_fetch(context_id, records, self.hooks.as_ref());
                    outbound.push(state.published());

                    let current = state.selection.selected();
                    let next = if state.store.is_empty() {
                        RecordId::NONE
                    } else if current.is_none()
                        || (!current.is_create() && !state.store.contains(current))
                    {
                        state.store.first_id()
                    } else {
                        current
                    };
                    if next != current {
                        debug!(record_id = next.0, "selecting first record of summary");
                    }
                    outbound.extend(
                        state
                            .selection
                            .select(next, &state.store)
                            .into_iter()
                            .map(Outbound::from),
                    );
                    FetchOutcome::Populated { count }
                }
            };

            self.deliver(outbound);
            Ok(outcome)
        }
        .instrument(self.span.clone())
        .await
    }

    async fn request_summary(&self, context_id: ContextId) -> Result<Vec<Record>, FetchError> {
        let operation = summary_operation(&self.settings.domain);
        let payload = serde_json::to_value(SummaryRequest { context_id })?;
        let reply = self
            .remote
            .call(&operation, payload)
            .await
            .map_err(|source| FetchError::Transport { context_id, source })?;
        let response: SummaryResponse = serde_json::from_value(reply)?;
        if !is_success(&response.status) {
            return Err(FetchError::Status {
                context_id,
                status: response.status,
            });
        }
        Ok(response.records)
    }

    async fn persist_priority(&self, record_id: RecordId, priority: i64) -> Result<(), PersistError> {
        let operation = priority_operation(&self.settings.domain);
        let payload = serde_json::to_value(PriorityRequest {
            id: record_id,
            priority,
        })
        .map_err(|source| PersistError::Decode { record_id, source })?;
        let reply = self
            .remote
            .call(&operation, payload)
            .await
            .map_err(|source| PersistError::Transport {
                record_id,
                priority,
                source,
            })?;
        let response: StatusResponse = serde_json::from_value(reply)
            .map_err(|source| PersistError::Decode { record_id, source })?;
        if !is_success(&response.status) {
            return Err(PersistError::Status {
                record_id,
                priority,
                status: response.status,
            });
        }
        Ok(())
    }

    pub async fn handle_event(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::CreateRecord => self.create_record(),
            LifecycleEvent::RecordChanged(record) => {
                self.apply_update(record).await;
            }
            LifecycleEvent::RecordCreated(record) => {
                self.apply_create(record).await;
            }
            LifecycleEvent::RecordDelete => {
                self.apply_delete().await;
            }
            LifecycleEvent::ReadonlyChanged { readonly, owner } => {
                self.readonly_changed(readonly, owner).await;
            }
        }
    }

    pub fn create_record(&self) {
        debug!(parent: &self.span, "routing to new record");
        self.router.navigate(RouteParam::record(RecordId::CREATE));
    }

    /// Returns true when the update replaced a record.
    pub async fn apply_update(&self, record: Record) -> bool {
        let record_id = record.id;
        let outbound = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let selected = state.selection.selected();
            if !state.store.apply_update(selected, record, self.hooks.as_ref()) {
                None
            } else {
                Some(vec![state.published()])
            }
        };

        match outbound {
            Some(outbound) => {
                debug!(parent: &self.span, record_id = record_id.0, "record changed");
                self.deliver(outbound);
                true
            }
            None => {
                debug!(
                    parent: &self.span,
                    record_id = record_id.0,
                    "ignoring change for a record that is not selected"
                );
                false
            }
        }
    }

    /// Prepends the new record and selects it before the collection is resorted.
    pub async fn apply_create(&self, record: Record) -> RecordId {
        let (id, outbound) = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let id = state.store.prepend(record, self.hooks.as_ref());
            let mut outbound: Vec<Outbound> = state
                .selection
                .select(id, &state.store)
                .into_iter()
                .map(Outbound::from)
                .collect();
            state.store.refresh(self.hooks.as_ref());
            outbound.push(state.published());
            (id, outbound)
        };
        debug!(parent: &self.span, record_id = id.0, "record created");
        self.deliver(outbound);
        id
    }

    /// Removes the selected record and moves to the first remaining one.
    /// Returns the new selection.
    pub async fn apply_delete(&self) -> RecordId {
        let (next, outbound) = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let selected = state.selection.selected();
            let outcome = state.store.apply_delete(selected, self.hooks.as_ref());
            if !outcome.removed {
                debug!(parent: &self.span, record_id = selected.0, "delete matched no record");
            }

            let mut outbound = vec![state.published()];
            let effects = state.selection.select(outcome.next, &state.store);
            let routed = effects
                .iter()
                .any(|effect| matches!(effect, SelectionEffect::Navigate(_)));
            outbound.extend(effects.into_iter().map(Outbound::from));
            if !routed {
                let rid = if outcome.next.is_none() {
                    RouteParam::empty()
                } else {
                    RouteParam::record(outcome.next)
                };
                outbound.push(Outbound::Navigate(rid));
            }
            (outcome.next, outbound)
        };
        self.deliver(outbound);
        next
    }

    pub async fn readonly_changed(&self, readonly: bool, owner: Owner) {
        {
            let mut state = self.inner.lock().await;
            state.readonly = readonly;
            state.owner = owner.clone();
        }
        debug!(
            parent: &self.span,
            readonly,
            owner = %owner.name,
            ip = %owner.ip,
            "record navigator read-only changed"
        );
        self.deliver(vec![Outbound::Notify(NavigatorEvent::ReadonlyChanged {
            readonly,
            owner,
        })]);
    }

    /// Persists the priorities implied by `container`, the ids of one drop
    /// container in their new visual order.
    ///
    /// Writes are issued one at a time. Ids deleted while the loop runs are
    /// skipped. When anything was written the collection is resorted.
    pub async fn complete_reorder(
        &self,
        container: &[RecordId],
    ) -> Result<ReorderOutcome, ReorderError> {
        async move {
            let (plan, changes) = {
                let state = self.inner.lock().await;
                let records = state.store.records();
                match self.ordering.plan(records, container) {
                    Some(plan) => {
                        let changes = plan.changes(records);
                        (plan, changes)
                    }
                    None => {
                        debug!("no priority plan for reorder container");
                        return Ok(ReorderOutcome::default());
                    }
                }
            };
            debug!(
                min_priority = plan.min_priority,
                max_priority = plan.max_priority,
                step = plan.step,
                changes = changes.len(),
                "planned reorder"
            );

            let mut persisted = Vec::new();
            let mut failures = Vec::new();
            for change in changes {
                // Earlier writes may have yielded to a delete or update of this record.
                let current = self.inner.lock().await.store.priority_of(change.id);
                let Some(current) = current else {
                    continue;
                };
                if current == change.to {
                    continue;
                }
                let change = PriorityChange {
                    from: current,
                    ..change
                };

                match self.persist_priority(change.id, change.to).await {
                    Ok(()) => {
                        self.inner
                            .lock()
                            .await
                            .store
                            .set_priority(change.id, change.to);
                        debug!(record_id = change.id.0, from = change.from, to = change.to, "priority persisted");
                        persisted.push(change);
                    }
                    Err(err) => {
                        warn!(record_id = change.id.0, error = %err, "priority update failed");
                        failures.push(err);
                        if self.ordering.persist_policy() == PersistPolicy::StopOnFailure {
                            break;
                        }
                    }
                }
            }

            let resorted = !persisted.is_empty();
            if resorted {
                let outbound = {
                    let mut guard = self.inner.lock().await;
                    let state = &mut *guard;
                    state.store.resort(self.hooks.as_ref());
                    state.store.publish();
                    vec![state.published()]
                };
                self.deliver(outbound);
            }

            if failures.is_empty() {
                return Ok(ReorderOutcome {
                    step: plan.step,
                    persisted,
                    resorted,
                });
            }
            match self.ordering.persist_policy() {
                PersistPolicy::StopOnFailure => Err(ReorderError::Aborted {
                    failure: failures.remove(0),
                    persisted,
                }),
                PersistPolicy::BestEffort => Err(ReorderError::Partial { failures, persisted }),
            }
        }
        .instrument(self.span.clone())
        .await
    }

    pub async fn detach(&self) {
        let outbound = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let mut outbound: Vec<Outbound> = state
                .selection
                .detach(&mut state.store)
                .into_iter()
                .map(Outbound::from)
                .collect();
            outbound.push(state.published());
            outbound
        };
        self.deliver(outbound);
    }

    /// Processes inputs one at a time, each to completion, until every sender
    /// is dropped. Failures are reported as events.
    pub async fn run(self: Arc<Self>, mut inputs: mpsc::Receiver<NavigatorInput>) {
        while let Some(input) = inputs.recv().await {
            match input {
                NavigatorInput::Context(context_id) => {
                    let result = self.on_context_change(context_id).await;
                    self.report_fetch(context_id, result).await;
                }
                NavigatorInput::Route(route) => {
                    let context_id = self.context_id().await;
                    let result = self.on_route_change(&route).await;
                    self.report_fetch(context_id, result).await;
                }
                NavigatorInput::Select(id) => self.select(id).await,
                NavigatorInput::Lifecycle(event) => self.handle_event(event).await,
                NavigatorInput::Reorder(container) => {
                    if let Err(err) = self.complete_reorder(&container).await {
                        let _ = self.events.send(NavigatorEvent::ReorderFailed {
                            message: err.to_string(),
                        });
                    }
                }
            }
        }
        debug!(parent: &self.span, "navigator input channel closed");
    }

    async fn report_fetch(&self, context_id: ContextId, result: Result<FetchOutcome, FetchError>) {
        if let Err(err) = result {
            let _ = self.events.send(NavigatorEvent::FetchFailed {
                context_id,
                message: err.to_string(),
            });
        }
    }
}

#[async_trait]
pub trait RecordNavigable: Send + Sync {
    fn navigator(&self) -> &Arc<RecordNavigator>;

    async fn on_context_change(&self, context_id: ContextId) -> Result<FetchOutcome, FetchError> {
        self.navigator().on_context_change(context_id).await
    }

    async fn on_route_change(&self, route: &Route) -> Result<FetchOutcome, FetchError> {
        self.navigator().on_route_change(route).await
    }

    async fn select(&self, id: RecordId) {
        self.navigator().select(id).await
    }

    async fn handle_event(&self, event: LifecycleEvent) {
        self.navigator().handle_event(event).await
    }

    async fn complete_reorder(
        &self,
        container: &[RecordId],
    ) -> Result<ReorderOutcome, ReorderError> {
        self.navigator().complete_reorder(container).await
    }

    async fn selected_id(&self) -> RecordId {
        self.navigator().selected_id().await
    }

    async fn records(&self) -> Vec<Record> {
        self.navigator().records().await
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
