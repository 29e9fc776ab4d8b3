//! Whole extraction runs against the in-memory store and a scripted model

use async_trait::async_trait;
use eews_common::config::PipelineConfig;
use eews_common::outcome::FailureKind;
use eews_common::results::load_results;
use eews_common::storage::InMemoryStore;
use eews_common::{AnnotationRecord, ResultsMapping};
use eews_extract::model::{AnnotationModel, AnnotationRequest, ModelError, PromptPart};
use eews_extract::Extractor;
use std::collections::HashMap;
use std::sync::Mutex;

// ============================================================================
// Helpers
// ============================================================================

/// Model answering from a table keyed by target image URI
struct ScriptedModel {
    responses: HashMap<String, Result<String, u16>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedModel {
    fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn answer(mut self, uri: &str, text: &str) -> Self {
        self.responses.insert(uri.to_string(), Ok(text.to_string()));
        self
    }

    fn fail(mut self, uri: &str, status: u16) -> Self {
        self.responses.insert(uri.to_string(), Err(status));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnnotationModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &AnnotationRequest) -> Result<String, ModelError> {
        let target = match request.parts.last() {
            Some(PromptPart::Image { uri, .. }) => uri.clone(),
            other => panic!("last part must be the target image, got {:?}", other),
        };
        self.calls.lock().unwrap().push(target.clone());
        match self.responses.get(&target) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(status)) => Err(ModelError::ApiError(*status, "scripted failure".to_string())),
            None => Err(ModelError::EmptyResponse("no script".to_string())),
        }
    }
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.model.request_delay_ms = 0;
    config
}

fn uri(path: &str) -> String {
    format!("gs://turkey_tweets_0/{}", path)
}

fn annotation(username: &str, magnitude: &str) -> String {
    format!(
        "```json\n{{\"username\": \"{}\", \"magnitude_on_alert_screenshot\": \"{}\", \"alert_info_recall\": [\"ALERT_SOURCE\"]}}\n```",
        username, magnitude
    )
}

fn seeded_store() -> InMemoryStore {
    let store = InMemoryStore::new("turkey_tweets_0");
    store.put("INPUTS_1/a.png", "png", "image/png");
    store.put("INPUTS_1/notes.txt", "txt", "text/plain");
    store.put("INPUTS_2/b.PNG", "png", "image/png");
    store.put("INPUTS_10/stray.png", "png", "image/png");
    store
}

async fn stored_results(store: &InMemoryStore, config: &PipelineConfig) -> ResultsMapping {
    load_results(store, &config.storage).await.unwrap().unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_annotates_every_png_in_both_inputs() {
    let config = config();
    let store = seeded_store();
    let model = ScriptedModel::new()
        .answer(&uri("INPUTS_1/a.png"), &annotation("@a", "5.3"))
        .answer(&uri("INPUTS_2/b.PNG"), &annotation("@b", "4.6"));

    let report = Extractor::new(&config, &store, &model).run().await.unwrap();

    assert_eq!(report.discovered, 2);
    assert_eq!(report.annotated, 2);
    assert!(report.failures.is_empty());
    assert!(report.persisted);
    assert_eq!(model.calls(), vec![uri("INPUTS_1/a.png"), uri("INPUTS_2/b.PNG")]);

    let results = stored_results(&store, &config).await;
    assert_eq!(results.filenames().collect::<Vec<_>>(), vec!["a.png", "b.PNG"]);
    let a = results.get("a.png").unwrap();
    assert_eq!(a.scalar("username").as_deref(), Some("@a"));
    assert_eq!(a.tags("alert_info_recall"), vec!["ALERT_SOURCE"]);
}

#[tokio::test]
async fn test_second_run_makes_no_model_calls() {
    let config = config();
    let store = seeded_store();
    let model = ScriptedModel::new()
        .answer(&uri("INPUTS_1/a.png"), &annotation("@a", "5.3"))
        .answer(&uri("INPUTS_2/b.PNG"), &annotation("@b", "4.6"));

    Extractor::new(&config, &store, &model).run().await.unwrap();
    let after_first = stored_results(&store, &config).await;

    let rerun_model = ScriptedModel::new();
    let report = Extractor::new(&config, &store, &rerun_model).run().await.unwrap();

    assert!(rerun_model.calls().is_empty());
    assert_eq!(report.skipped_existing, 2);
    assert_eq!(report.annotated, 0);
    assert_eq!(stored_results(&store, &config).await, after_first);
}

#[tokio::test]
async fn test_failed_images_are_skipped_and_retried_next_run() {
    let config = config();
    let store = InMemoryStore::new("turkey_tweets_0");
    store.put("INPUTS_1/good.png", "png", "image/png");
    store.put("INPUTS_1/garbled.png", "png", "image/png");
    store.put("INPUTS_2/quota.png", "png", "image/png");

    let model = ScriptedModel::new()
        .answer(&uri("INPUTS_1/good.png"), &annotation("@good", "5.0"))
        .answer(&uri("INPUTS_1/garbled.png"), "Sorry, I cannot help with that.")
        .fail(&uri("INPUTS_2/quota.png"), 429);

    let report = Extractor::new(&config, &store, &model).run().await.unwrap();

    assert_eq!(report.annotated, 1);
    assert_eq!(report.failures.len(), 2);
    let kind_of = |unit: &str| report.failures.iter().find(|f| f.unit == unit).map(|f| f.kind);
    assert_eq!(kind_of("garbled.png"), Some(FailureKind::Parse));
    assert_eq!(kind_of("quota.png"), Some(FailureKind::Remote));

    let results = stored_results(&store, &config).await;
    assert_eq!(results.len(), 1);
    assert!(results.contains("good.png"));

    // Failed images are attempted again; the good one is not
    let retry_model = ScriptedModel::new()
        .answer(&uri("INPUTS_1/garbled.png"), &annotation("@garbled", "5.1"))
        .answer(&uri("INPUTS_2/quota.png"), &annotation("@quota", "5.2"));
    let report = Extractor::new(&config, &store, &retry_model).run().await.unwrap();

    assert_eq!(retry_model.calls().len(), 2);
    assert!(!retry_model.calls().contains(&uri("INPUTS_1/good.png")));
    assert_eq!(report.annotated, 2);
    assert_eq!(stored_results(&store, &config).await.len(), 3);
}

#[tokio::test]
async fn test_unreadable_prior_results_start_fresh() {
    let config = config();
    let store = seeded_store();
    store.put(&config.storage.results_path(), "{ truncated", "application/json");
    let model = ScriptedModel::new()
        .answer(&uri("INPUTS_1/a.png"), &annotation("@a", "5.3"))
        .answer(&uri("INPUTS_2/b.PNG"), &annotation("@b", "4.6"));

    let report = Extractor::new(&config, &store, &model).run().await.unwrap();

    assert_eq!(report.annotated, 2);
    assert_eq!(stored_results(&store, &config).await.len(), 2);
}

#[tokio::test]
async fn test_prior_records_are_kept() {
    let config = config();
    let store = seeded_store();
    let mut prior = ResultsMapping::new();
    let mut old = AnnotationRecord::new();
    old.insert("username", "@old");
    prior.insert("a.png", old.clone());
    prior.insert("gone.png", old);
    store.put(
        &config.storage.results_path(),
        prior.to_json_bytes().unwrap(),
        "application/json",
    );
    let model = ScriptedModel::new().answer(&uri("INPUTS_2/b.PNG"), &annotation("@b", "4.6"));

    let report = Extractor::new(&config, &store, &model).run().await.unwrap();

    assert_eq!(report.skipped_existing, 1);
    assert_eq!(report.annotated, 1);
    assert_eq!(report.total_records, 3);
    let results = stored_results(&store, &config).await;
    assert_eq!(results.get("a.png").unwrap().scalar("username").as_deref(), Some("@old"));
    assert!(results.contains("gone.png"));
}

#[tokio::test]
async fn test_same_filename_in_both_inputs_annotated_once() {
    let config = config();
    let store = InMemoryStore::new("turkey_tweets_0");
    store.put("INPUTS_1/dup.png", "png", "image/png");
    store.put("INPUTS_2/dup.png", "png", "image/png");
    let model = ScriptedModel::new().answer(&uri("INPUTS_1/dup.png"), &annotation("@dup", "5.0"));

    let report = Extractor::new(&config, &store, &model).run().await.unwrap();

    assert_eq!(model.calls(), vec![uri("INPUTS_1/dup.png")]);
    assert_eq!(report.annotated, 1);
    assert_eq!(report.skipped_existing, 1);
}

#[tokio::test]
async fn test_nothing_to_persist_writes_nothing() {
    let config = config();
    let store = InMemoryStore::new("turkey_tweets_0");
    let model = ScriptedModel::new();

    let report = Extractor::new(&config, &store, &model).run().await.unwrap();

    assert_eq!(report.discovered, 0);
    assert!(!report.persisted);
    assert!(!store.contains(&config.storage.results_path()));
}

#[tokio::test(start_paused = true)]
async fn test_fixed_delay_after_each_model_call() {
    let mut config = config();
    config.model.request_delay_ms = 1000;
    let store = seeded_store();
    let model = ScriptedModel::new()
        .answer(&uri("INPUTS_1/a.png"), &annotation("@a", "5.3"))
        .fail(&uri("INPUTS_2/b.PNG"), 500);

    let start = tokio::time::Instant::now();
    Extractor::new(&config, &store, &model).run().await.unwrap();

    // Both attempts pause, including the failed one
    assert!(start.elapsed() >= std::time::Duration::from_millis(2000));
}
