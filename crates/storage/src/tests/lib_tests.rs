use super::*;

async fn staff_storage() -> (Storage, ContextId, Vec<RecordId>) {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let context = ContextId(-1);
    let mut ids = Vec::new();
    for (category, priority) in [("admin", 20), ("office", 10), ("tech", 30)] {
        let id = storage
            .insert_record(
                context,
                &NewRecord::new(category, true, priority).with_attribute("firstname", category),
            )
            .await
            .expect("insert");
        ids.push(id);
    }
    (storage, context, ids)
}

#[tokio::test]
async fn lists_summary_in_priority_order() {
    let (storage, context, ids) = staff_storage().await;
    let records = storage.list_summary(context).await.expect("summary");

    let listed: Vec<RecordId> = records.iter().map(|r| r.id).collect();
    assert_eq!(listed, vec![ids[1], ids[0], ids[2]]);
    assert_eq!(
        records[0].attributes.get("firstname"),
        Some(&Value::from("office"))
    );
}

#[tokio::test]
async fn summary_is_scoped_to_context() {
    let (storage, _context, _ids) = staff_storage().await;
    storage
        .insert_record(ContextId(42), &NewRecord::new("optom", true, 0))
        .await
        .expect("insert");

    assert_eq!(storage.list_summary(ContextId(42)).await.expect("list").len(), 1);
    assert!(storage.list_summary(ContextId(7)).await.expect("list").is_empty());
}

#[tokio::test]
async fn update_priority_reports_missing_rows() {
    let (storage, _context, ids) = staff_storage().await;

    assert!(storage.update_priority(ids[2], 1).await.expect("update"));
    assert!(!storage.update_priority(RecordId(9_999), 1).await.expect("update"));

    let record = storage.get_record(ids[2]).await.expect("get").expect("row");
    assert_eq!(record.priority, 1);
}

#[tokio::test]
async fn update_and_delete_record() {
    let (storage, context, ids) = staff_storage().await;
    let mut record = storage.get_record(ids[0]).await.expect("get").expect("row");
    record.valid = false;
    record.category = "consultant".into();
    assert!(storage.update_record(&record).await.expect("update"));

    let reread = storage.get_record(ids[0]).await.expect("get").expect("row");
    assert!(!reread.valid);
    assert_eq!(reread.category, "consultant");

    assert!(storage.delete_record(ids[0]).await.expect("delete"));
    assert!(!storage.delete_record(ids[0]).await.expect("delete twice"));
    assert_eq!(storage.list_summary(context).await.expect("list").len(), 2);
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("records.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}
