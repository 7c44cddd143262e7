use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use shared::{
    domain::{ContextId, RecordId},
    protocol::Record,
};
use tracing::{debug, Span};

use crate::{
    config::{CategoryRanks, NavigatorSettings},
    error::FetchError,
    ordering::resort_by_rank,
    route::Router,
    store::RecordHooks,
    FetchOutcome, RecordNavigable, RecordNavigator, RemoteStore,
};

const SUMMARY_ATTRIBUTES: &[&str] = &[
    "firstname",
    "lastname",
    "haspassword",
    "has2factor",
    "accesskey",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerKey {
    pub valid: bool,
    /// `None` for occupations missing from the rank table.
    pub rank: Option<i64>,
}

pub type GroupTotals = BTreeMap<ContainerKey, usize>;

pub struct StaffHooks {
    ranks: CategoryRanks,
    totals: Mutex<GroupTotals>,
    span: Span,
}

impl StaffHooks {
    pub fn new(ranks: CategoryRanks) -> Self {
        Self::with_span(ranks, Span::none())
    }

    pub fn with_span(ranks: CategoryRanks, span: Span) -> Self {
        Self {
            ranks,
            totals: Mutex::new(GroupTotals::new()),
            span,
        }
    }

    pub fn container_of(&self, record: &Record) -> ContainerKey {
        ContainerKey {
            valid: record.valid,
            rank: self.ranks.rank(&record.category),
        }
    }

    pub fn totals(&self) -> GroupTotals {
        self.lock_totals().clone()
    }

    fn lock_totals(&self) -> MutexGuard<'_, GroupTotals> {
        match self.totals.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl RecordHooks for StaffHooks {
    fn summarize(&self, mut record: Record) -> Record {
        record
            .attributes
            .retain(|key, _| SUMMARY_ATTRIBUTES.contains(&key.as_str()));
        record
    }

    fn new_records(&self, records: &[Record]) {
        let mut totals = GroupTotals::new();
        for record in records {
            *totals.entry(self.container_of(record)).or_default() += 1;
        }
        debug!(parent: &self.span, groups = totals.len(), records = records.len(), "staff totals recomputed");
        *self.lock_totals() = totals;
    }

    fn resort(&self, records: Vec<Record>) -> Vec<Record> {
        resort_by_rank(records, &self.ranks, &self.span)
    }
}

pub struct StaffDirectory {
    navigator: Arc<RecordNavigator>,
    hooks: Arc<StaffHooks>,
}

impl StaffDirectory {
    /// Staff are not scoped to a parent entity.
    pub const CONTEXT: ContextId = ContextId(-1);

    pub fn new(
        settings: NavigatorSettings,
        remote: Arc<dyn RemoteStore>,
        router: Arc<dyn Router>,
    ) -> Self {
        let span = tracing::info_span!("recnav", domain = %settings.domain);
        let hooks = Arc::new(StaffHooks::with_span(
            settings.category_ranks.clone(),
            span.clone(),
        ));
        let navigator =
            RecordNavigator::new_with_span(settings, remote, router, hooks.clone(), span);
        Self { navigator, hooks }
    }

    pub async fn attach(&self) -> Result<FetchOutcome, FetchError> {
        self.navigator.on_context_change(Self::CONTEXT).await
    }

    pub fn hooks(&self) -> &StaffHooks {
        &self.hooks
    }

    pub fn totals(&self) -> GroupTotals {
        self.hooks.totals()
    }

    pub async fn container(&self, key: ContainerKey) -> Vec<RecordId> {
        self.navigator
            .records()
            .await
            .iter()
            .filter(|record| self.hooks.container_of(record) == key)
            .map(|record| record.id)
            .collect()
    }

    pub async fn container_for(&self, id: RecordId) -> Option<ContainerKey> {
        self.navigator
            .records()
            .await
            .iter()
            .find(|record| record.id == id)
            .map(|record| self.hooks.container_of(record))
    }
}

#[async_trait]
impl RecordNavigable for StaffDirectory {
    fn navigator(&self) -> &Arc<RecordNavigator> {
        &self.navigator
    }
}

#[cfg(test)]
#[path = "tests/staff_tests.rs"]
mod tests;
