use crate::db::*;
use crate::store::RecordStore;
use serde_json::json;
use tempfile::NamedTempFile;

#[tokio::test]
async fn test_record_insert_and_get() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.record_upsert("BG1", json!({"regNo": "BG1", "name": "Acme"}))
        .await
        .unwrap();

    let record = db.record_get("BG1").await.unwrap().unwrap();
    assert_eq!(record["name"], json!("Acme"));
    assert_eq!(db.record_count().await.unwrap(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_record_upsert_merges_new_fields_win() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.record_upsert("BG1", json!({"regNo": "BG1", "name": "Acme", "city": "Sofia"}))
        .await
        .unwrap();
    db.record_upsert("BG1", json!({"regNo": "BG1", "name": "Acme Ltd"}))
        .await
        .unwrap();

    let record = db.record_get("BG1").await.unwrap().unwrap();
    assert_eq!(record["name"], json!("Acme Ltd"));
    assert_eq!(record["city"], json!("Sofia"));
    assert_eq!(db.record_count().await.unwrap(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_record_upsert_equal_payload_short_circuits() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    db.record_upsert("BG1", json!({"name": "Acme"})).await.unwrap();

    let updated_at_before: i64 =
        sqlx::query_scalar("SELECT updated_at FROM records WHERE record_id = 'BG1'")
            .fetch_one(&db.pool)
            .await
            .unwrap();

    // Redelivery of the same payload must not touch the row
    tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    db.record_upsert("BG1", json!({"name": "Acme"})).await.unwrap();

    let updated_at_after: i64 =
        sqlx::query_scalar("SELECT updated_at FROM records WHERE record_id = 'BG1'")
            .fetch_one(&db.pool)
            .await
            .unwrap();

    assert_eq!(
        updated_at_before, updated_at_after,
        "equal payload should skip the write entirely"
    );

    db.close().await;
}

#[tokio::test]
async fn test_database_implements_record_store() {
    let temp_file = NamedTempFile::new().unwrap();
    let db = Database::new(temp_file.path()).await.unwrap();

    let store: &dyn RecordStore = &db;
    store.upsert("BG2", json!({"regNo": "BG2"})).await.unwrap();

    assert!(db.record_get("BG2").await.unwrap().is_some());

    db.close().await;
}
