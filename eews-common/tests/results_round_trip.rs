//! Results file persistence against the in-memory store

use eews_common::config::StorageLayout;
use eews_common::results::{load_results, save_results, JSON_CONTENT_TYPE};
use eews_common::storage::InMemoryStore;
use eews_common::{AnnotationRecord, FieldValue, ResultsMapping};
use serde_json::json;

fn sample_mapping() -> ResultsMapping {
    let mut first = AnnotationRecord::new();
    first.insert("username", "@cinnamonjemur");
    first.insert("post_datetime", "2025-04-23T12:59");
    first.insert("magnitude_on_alert_screenshot", "5.3");
    first.insert(
        "alert_info_recall",
        vec!["ESTIMATED_MAGNITUDE", "ESTIMATED_DISTANCE", "ALERT_SOURCE"],
    );

    let mut second = AnnotationRecord::new();
    second.insert("username", "@yigitech");
    second.insert("warning_time_seconds", FieldValue::Other(json!(21)));
    second.insert("alert_time", FieldValue::Other(json!(null)));

    let mut mapping = ResultsMapping::new();
    mapping.insert("Screenshot 1.png", first);
    mapping.insert("Screenshot 2.png", second);
    mapping
}

#[tokio::test]
async fn test_missing_results_is_none() {
    let store = InMemoryStore::new("bucket");
    let layout = StorageLayout::default();

    let loaded = load_results(&store, &layout).await.unwrap();
    assert!(loaded.is_none());
}

#[tokio::test]
async fn test_save_then_load_reproduces_mapping() {
    let store = InMemoryStore::new("bucket");
    let layout = StorageLayout::default();
    let mapping = sample_mapping();

    save_results(&store, &layout, &mapping).await.unwrap();
    let loaded = load_results(&store, &layout).await.unwrap().unwrap();

    assert_eq!(loaded, mapping);
    assert_eq!(
        loaded.filenames().collect::<Vec<_>>(),
        vec!["Screenshot 1.png", "Screenshot 2.png"]
    );
    assert_eq!(
        store.content_type(&layout.results_path()).as_deref(),
        Some(JSON_CONTENT_TYPE)
    );
}

#[tokio::test]
async fn test_results_file_is_single_json_object() {
    let store = InMemoryStore::new("bucket");
    let layout = StorageLayout::default();
    save_results(&store, &layout, &sample_mapping()).await.unwrap();

    let raw: serde_json::Value =
        serde_json::from_slice(&store.get(&layout.results_path()).unwrap()).unwrap();
    let object = raw.as_object().unwrap();
    assert_eq!(object.len(), 2);
    assert_eq!(object["Screenshot 2.png"]["warning_time_seconds"], json!(21));
    assert_eq!(
        object["Screenshot 1.png"]["alert_info_recall"],
        json!(["ESTIMATED_MAGNITUDE", "ESTIMATED_DISTANCE", "ALERT_SOURCE"])
    );
}

#[tokio::test]
async fn test_corrupt_results_is_error() {
    let store = InMemoryStore::new("bucket");
    let layout = StorageLayout::default();
    store.put(&layout.results_path(), "not json", JSON_CONTENT_TYPE);

    assert!(load_results(&store, &layout).await.is_err());
}
