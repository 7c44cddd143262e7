use std::sync::Arc;

use navigator_core::{
    drag::{insertion_target, move_before, DropTarget},
    ContainerKey, LifecycleEvent, MemoryRouter, NavigatorSettings, RecordNavigable, StaffDirectory,
    StorageRemoteStore,
};
use shared::domain::RecordId;
use storage::NewRecord;

const ROW_HEIGHT: f64 = 30.0;

fn admins() -> ContainerKey {
    ContainerKey {
        valid: true,
        rank: Some(1),
    }
}

async fn open_directory(database_url: &str) -> StaffDirectory {
    let remote = StorageRemoteStore::connect(database_url, "staff")
        .await
        .expect("remote");
    let directory = StaffDirectory::new(
        NavigatorSettings::default(),
        Arc::new(remote),
        Arc::new(MemoryRouter::new()),
    );
    directory.attach().await.expect("attach");
    directory
}

#[tokio::test]
async fn dragged_order_survives_reopening_the_directory() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("staff.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let seed = StorageRemoteStore::connect(&database_url, "staff")
        .await
        .expect("seed remote");
    let mut ids = Vec::new();
    for (name, occupation, priority) in [
        ("ann", "admin", 10),
        ("amy", "admin", 20),
        ("al", "admin", 30),
        ("tess", "tech", 0),
    ] {
        let id = seed
            .storage()
            .insert_record(
                StaffDirectory::CONTEXT,
                &NewRecord::new(occupation, true, priority).with_attribute("firstname", name),
            )
            .await
            .expect("insert");
        ids.push(id);
    }
    let (ann, amy, al) = (ids[0], ids[1], ids[2]);
    drop(seed);

    let directory = open_directory(&database_url).await;
    let order = directory.container(admins()).await;
    assert_eq!(order, vec![ann, amy, al]);

    let targets: Vec<DropTarget> = order
        .iter()
        .enumerate()
        .filter(|(_, id)| **id != al)
        .map(|(row, id)| DropTarget {
            id: *id,
            top: row as f64 * ROW_HEIGHT,
            height: ROW_HEIGHT,
        })
        .collect();
    let before = insertion_target(&targets, 5.0);
    assert_eq!(before, Some(ann));

    let reordered = move_before(&order, al, before);
    let outcome = directory
        .complete_reorder(&reordered)
        .await
        .expect("reorder");
    assert_eq!(outcome.step, 10);
    assert_eq!(outcome.persisted.len(), 3);
    assert_eq!(directory.container(admins()).await, vec![al, ann, amy]);
    drop(directory);

    let reopened = open_directory(&database_url).await;
    assert_eq!(reopened.container(admins()).await, vec![al, ann, amy]);
    let priorities: Vec<i64> = reopened
        .records()
        .await
        .iter()
        .filter(|record| record.category == "admin")
        .map(|record| record.priority)
        .collect();
    assert_eq!(priorities, vec![10, 20, 30]);
    assert_eq!(reopened.selected_id().await, al);
}

#[tokio::test]
async fn unknown_drop_ids_leave_storage_untouched() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("staff.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let directory = open_directory(&database_url).await;
    assert!(directory.records().await.is_empty());
    assert_eq!(directory.selected_id().await, RecordId::NONE);

    let outcome = directory
        .complete_reorder(&[RecordId(7), RecordId(8)])
        .await
        .expect("no-op");
    assert!(outcome.persisted.is_empty());
}

#[tokio::test]
async fn edited_and_deleted_staff_follow_storage() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("staff.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let backing = StorageRemoteStore::connect(&database_url, "staff")
        .await
        .expect("backing remote");
    let storage = backing.storage();
    let mut ids = Vec::new();
    for (name, occupation, priority) in [
        ("ann", "admin", 10),
        ("amy", "admin", 20),
        ("al", "admin", 30),
        ("tess", "tech", 0),
    ] {
        let id = storage
            .insert_record(
                StaffDirectory::CONTEXT,
                &NewRecord::new(occupation, true, priority).with_attribute("firstname", name),
            )
            .await
            .expect("insert");
        ids.push(id);
    }
    let (ann, amy, al, tess) = (ids[0], ids[1], ids[2], ids[3]);
    let invalid_admins = ContainerKey {
        valid: false,
        rank: Some(1),
    };

    let directory = open_directory(&database_url).await;
    assert_eq!(directory.selected_id().await, ann);

    let mut record = storage.get_record(ann).await.expect("get").expect("row");
    record.valid = false;
    assert!(storage.update_record(&record).await.expect("update"));
    directory
        .handle_event(LifecycleEvent::RecordChanged(record))
        .await;
    assert_eq!(directory.container(invalid_admins).await, vec![ann]);
    assert_eq!(directory.container(admins()).await, vec![amy, al]);

    assert!(storage.delete_record(amy).await.expect("delete"));
    directory.select(amy).await;
    directory.handle_event(LifecycleEvent::RecordDelete).await;
    assert_eq!(directory.selected_id().await, al);
    let remaining: Vec<RecordId> = directory.records().await.iter().map(|r| r.id).collect();
    assert_eq!(remaining, vec![al, tess, ann]);
    drop(directory);

    let reopened = open_directory(&database_url).await;
    assert_eq!(reopened.container(admins()).await, vec![al]);
    assert_eq!(reopened.container(invalid_admins).await, vec![ann]);
    assert!(!storage.delete_record(amy).await.expect("delete twice"));
}
