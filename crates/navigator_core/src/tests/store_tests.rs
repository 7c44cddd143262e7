use super::*;

use std::sync::Mutex;

/// Records hook invocations and sorts by descending id so resort is observable.
#[derive(Default)]
struct TracingHooks {
    calls: Mutex<Vec<String>>,
}

impl TracingHooks {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls").clone()
    }
}

impl RecordHooks for TracingHooks {
    fn summarize(&self, mut record: Record) -> Record {
        self.calls.lock().expect("calls").push("summarize".into());
        record.attributes.remove("notes");
        record
    }

    fn new_records(&self, records: &[Record]) {
        self.calls
            .lock()
            .expect("calls")
            .push(format!("new_records:{}", records.len()));
    }

    fn resort(&self, mut records: Vec<Record>) -> Vec<Record> {
        self.calls.lock().expect("calls").push("resort".into());
        records.sort_by(|a, b| b.id.cmp(&a.id));
        records
    }
}

fn populated(hooks: &TracingHooks) -> RecordStore {
    let mut store = RecordStore::new();
    assert!(store.begin_fetch(ContextId(5)));
    store.complete_fetch(
        ContextId(5),
        vec![
            Record::new(1, 10, "admin", true),
            Record::new(2, 20, "admin", true),
            Record::new(3, 30, "admin", true),
        ],
        hooks,
    );
    store
}

fn ids(store: &RecordStore) -> Vec<i64> {
    store.records().iter().map(|r| r.id.0).collect()
}

#[test]
fn in_flight_marker_is_per_context() {
    let mut store = RecordStore::new();
    assert!(store.begin_fetch(ContextId(5)));
    assert!(!store.begin_fetch(ContextId(5)));
    assert!(store.begin_fetch(ContextId(6)));

    store.abandon_fetch(ContextId(5));
    assert_eq!(store.in_flight(), Some(ContextId(6)));
    store.abandon_fetch(ContextId(6));
    assert_eq!(store.in_flight(), None);
}

#[test]
fn completed_fetch_runs_hooks_in_order_and_publishes() {
    let hooks = TracingHooks::default();
    let store = populated(&hooks);

    assert!(store.is_fetched());
    assert_eq!(store.in_flight(), None);
    assert_eq!(store.revision(), 1);
    assert_eq!(ids(&store), vec![3, 2, 1]);
    assert_eq!(hooks.calls(), vec!["new_records:3", "resort"]);
}

#[test]
fn update_of_non_selected_record_is_ignored() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);
    let revision = store.revision();

    let changed = Record::new(2, 99, "tech", false);
    assert!(!store.apply_update(RecordId(3), changed, &hooks));
    assert_eq!(store.revision(), revision);
    assert_eq!(store.priority_of(RecordId(2)), Some(20));
}

#[test]
fn update_of_selected_record_replaces_summary() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);

    let changed = Record::new(2, 99, "tech", false).with_attribute("notes", "long text");
    assert!(store.apply_update(RecordId(2), changed, &hooks));

    let stored = store.get(RecordId(2)).expect("record");
    assert_eq!(stored.priority, 99);
    assert!(!stored.attributes.contains_key("notes"));
    assert_eq!(store.revision(), 2);
}

#[test]
fn update_for_missing_selected_record_is_ignored() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);
    assert!(!store.apply_update(RecordId(9), Record::new(9, 1, "admin", true), &hooks));
}

#[test]
fn prepend_then_refresh_resorts_after_insert() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);

    let id = store.prepend(Record::new(7, 0, "admin", true), &hooks);
    assert_eq!(id, RecordId(7));
    assert_eq!(ids(&store), vec![7, 3, 2, 1]);

    store.refresh(&hooks);
    assert_eq!(
        hooks.calls()[2..],
        ["summarize", "new_records:4", "resort"]
    );
}

#[test]
fn delete_removes_selected_and_reports_next_first() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);

    let outcome = store.apply_delete(RecordId(3), &hooks);
    assert_eq!(
        outcome,
        DeleteOutcome {
            removed: true,
            next: RecordId(2)
        }
    );

    store.apply_delete(RecordId(2), &hooks);
    let last = store.apply_delete(RecordId(1), &hooks);
    assert_eq!(last.next, RecordId::NONE);
    assert!(store.is_empty());
}

#[test]
fn reset_clears_population_and_markers() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);
    store.begin_fetch(ContextId(8));

    store.reset();
    assert!(store.is_empty());
    assert!(!store.is_fetched());
    assert_eq!(store.in_flight(), None);
}

#[test]
fn set_priority_reports_missing_records() {
    let hooks = TracingHooks::default();
    let mut store = populated(&hooks);
    assert!(store.set_priority(RecordId(1), 40));
    assert!(!store.set_priority(RecordId(40), 1));
    assert_eq!(store.priority_of(RecordId(1)), Some(40));
}
