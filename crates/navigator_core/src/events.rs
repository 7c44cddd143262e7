use shared::{
    domain::{ContextId, Owner, RecordId},
    protocol::Record,
};

use crate::route::Route;

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    CreateRecord,
    RecordChanged(Record),
    RecordCreated(Record),
    RecordDelete,
    ReadonlyChanged { readonly: bool, owner: Owner },
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigatorInput {
    Context(ContextId),
    Route(Route),
    Select(RecordId),
    Lifecycle(LifecycleEvent),
    Reorder(Vec<RecordId>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum NavigatorEvent {
    SelectionChanged(RecordId),
    RecordsPublished { revision: u64, records: Vec<Record> },
    ReadonlyChanged { readonly: bool, owner: Owner },
    FetchDiscarded { context_id: ContextId },
    FetchFailed { context_id: ContextId, message: String },
    ReorderFailed { message: String },
}
