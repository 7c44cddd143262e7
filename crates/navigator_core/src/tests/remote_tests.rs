use super::*;

use serde_json::json;
use shared::domain::{ContextId, RecordId};
use storage::NewRecord;

async fn remote_with_staff() -> (StorageRemoteStore, Vec<RecordId>) {
    let remote = StorageRemoteStore::connect("sqlite::memory:", "staff")
        .await
        .expect("remote");
    let mut ids = Vec::new();
    for (category, priority) in [("tech", 5), ("admin", 1)] {
        ids.push(
            remote
                .storage()
                .insert_record(ContextId(-1), &NewRecord::new(category, true, priority))
                .await
                .expect("insert"),
        );
    }
    (remote, ids)
}

#[tokio::test]
async fn summary_operation_returns_ok_with_records() {
    let (remote, ids) = remote_with_staff().await;
    let reply = remote
        .call("staff_summary", json!({ "contextId": -1 }))
        .await
        .expect("call");

    let response: SummaryResponse = serde_json::from_value(reply).expect("decode");
    assert_eq!(response.status, STATUS_OK);
    let listed: Vec<RecordId> = response.records.iter().map(|r| r.id).collect();
    assert_eq!(listed, vec![ids[1], ids[0]]);
}

#[tokio::test]
async fn priority_operation_updates_storage() {
    let (remote, ids) = remote_with_staff().await;
    let reply = remote
        .call("staff_priority", json!({ "id": ids[0].0, "priority": 0 }))
        .await
        .expect("call");

    let response: StatusResponse = serde_json::from_value(reply).expect("decode");
    assert_eq!(response.status, STATUS_OK);
    let stored = remote.storage().get_record(ids[0]).await.expect("get").expect("row");
    assert_eq!(stored.priority, 0);
}

#[tokio::test]
async fn priority_for_missing_record_is_not_found() {
    let (remote, _ids) = remote_with_staff().await;
    let reply = remote
        .call("staff_priority", json!({ "id": 404, "priority": 3 }))
        .await
        .expect("call");

    let response: StatusResponse = serde_json::from_value(reply).expect("decode");
    assert_eq!(response.status, "NOT_FOUND");
}

#[tokio::test]
async fn malformed_and_unknown_operations_fail_with_status() {
    let (remote, _ids) = remote_with_staff().await;

    let reply = remote
        .call("staff_priority", json!({ "priority": 3 }))
        .await
        .expect("call");
    assert_eq!(reply["status"], "VALIDATION");

    let reply = remote
        .call("patient_summary", json!({ "context_id": 1 }))
        .await
        .expect("call");
    assert_eq!(reply["status"], "UNKNOWN_OPERATION");
}
