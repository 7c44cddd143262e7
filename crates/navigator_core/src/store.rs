use shared::{
    domain::{ContextId, RecordId},
    protocol::Record,
};

pub trait RecordHooks: Send + Sync {
    fn summarize(&self, record: Record) -> Record {
        record
    }

    /// Called after every mutation, before resorting.
    fn new_records(&self, _records: &[Record]) {}

    fn resort(&self, records: Vec<Record>) -> Vec<Record> {
        records
    }
}

pub struct NoopHooks;

impl RecordHooks for NoopHooks {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub removed: bool,
    pub next: RecordId,
}

#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<Record>,
    fetched: bool,
    in_flight: Option<ContextId>,
    revision: u64,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_fetched(&self) -> bool {
        self.fetched
    }

    pub fn in_flight(&self) -> Option<ContextId> {
        self.in_flight
    }

    pub fn contains(&self, id: RecordId) -> bool {
        self.records.iter().any(|r| r.id == id)
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn priority_of(&self, id: RecordId) -> Option<i64> {
        self.get(id).map(|r| r.priority)
    }

    pub fn first_id(&self) -> RecordId {
        self.records.first().map_or(RecordId::NONE, |r| r.id)
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.fetched = false;
        self.in_flight = None;
        self.publish();
    }

    /// Claims the in-flight marker. False when a fetch for this exact context
    /// is already outstanding; a pending fetch for another context does not block.
    pub fn begin_fetch(&mut self, context_id: ContextId) -> bool {
        if self.in_flight == Some(context_id) {
            return false;
        }
        self.in_flight = Some(context_id);
        true
    }

    /// Releases the marker if it still belongs to `context_id`.
    pub fn abandon_fetch(&mut self, context_id: ContextId) {
        if self.in_flight == Some(context_id) {
            self.in_flight = None;
        }
    }

    pub fn complete_fetch(
        &mut self,
        context_id: ContextId,
        records: Vec<Record>,
        hooks: &dyn RecordHooks,
    ) {
        self.records = records;
        self.abandon_fetch(context_id);
        self.fetched = true;
        self.refresh(hooks);
    }

    /// Replaces the record named by `selected` with the summary of `record`.
    ///
    /// Updates for anything but the current selection are ignored: they are the
    /// detail surface resetting a record it is leaving.
    pub fn apply_update(
        &mut self,
        selected: RecordId,
        record: Record,
        hooks: &dyn RecordHooks,
    ) -> bool {
        if record.id != selected {
            return false;
        }
        let Some(index) = self.records.iter().position(|r| r.id == selected) else {
            return false;
        };
        self.records[index] = hooks.summarize(record);
        self.refresh(hooks);
        true
    }

    /// Puts the summary of a newly created record at the front. Call
    /// [`RecordStore::refresh`] once the selection has moved to it.
    pub fn prepend(&mut self, record: Record, hooks: &dyn RecordHooks) -> RecordId {
        let summary = hooks.summarize(record);
        let id = summary.id;
        self.records.insert(0, summary);
        id
    }

    pub fn apply_delete(&mut self, selected: RecordId, hooks: &dyn RecordHooks) -> DeleteOutcome {
        let before = self.records.len();
        self.records.retain(|r| r.id != selected);
        let removed = self.records.len() != before;
        self.refresh(hooks);
        DeleteOutcome {
            removed,
            next: self.first_id(),
        }
    }

    /// Returns false when the record is no longer present.
    pub fn set_priority(&mut self, id: RecordId, priority: i64) -> bool {
        match self.records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.priority = priority;
                true
            }
            None => false,
        }
    }

    pub fn resort(&mut self, hooks: &dyn RecordHooks) {
        let records = std::mem::take(&mut self.records);
        self.records = hooks.resort(records);
    }

    /// `new_records`, `resort`, publish.
    pub fn refresh(&mut self, hooks: &dyn RecordHooks) {
        hooks.new_records(&self.records);
        self.resort(hooks);
        self.publish();
    }

    /// Observers treat every new revision as a new collection identity.
    pub fn publish(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
