use std::collections::BTreeSet;
use std::sync::Arc;

use aven_core::{Config, RagService};
use aven_llm::mock::MockProvider;
use aven_memory::{
    DocumentError, InMemoryVectorStore, SplitterConfig, TextSplitter, VectorStore,
};
use aven_sources::StaticSource;

// -- Helpers --

const INDEX: &str = "aven-content";

fn test_config(sources: &[&str]) -> Config {
    let mut config = Config::default();
    config.ingest.sources = sources.iter().map(|s| (*s).to_owned()).collect();
    config.ingest.retry_backoff_ms = 1;
    config
}

fn build(
    mock: &MockProvider,
    store: &Arc<InMemoryVectorStore>,
    source: StaticSource,
    config: &Config,
) -> RagService<MockProvider, MockProvider> {
    let splitter = TextSplitter::new(SplitterConfig {
        max_tokens: config.chunking.max_tokens,
        overlap: config.chunking.overlap,
    })
    .unwrap();
    RagService::new(
        Arc::new(mock.clone()),
        Arc::new(mock.clone()),
        Arc::clone(store) as Arc<dyn VectorStore>,
        Arc::new(source),
        splitter,
        config,
    )
}

async fn url_chunk_pairs(store: &InMemoryVectorStore) -> BTreeSet<(String, String)> {
    store
        .scroll(INDEX, 1_000)
        .await
        .unwrap()
        .into_iter()
        .map(|p| {
            (
                p.payload["url"].as_str().unwrap().to_owned(),
                p.payload["chunk"].as_str().unwrap().to_owned(),
            )
        })
        .collect()
}

// -- End to end --

#[tokio::test]
async fn single_page_is_indexed_and_grounds_the_answer() {
    let mock = MockProvider::with_responses(vec!["Aven offers round-the-clock support.".into()]);
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/a"]);
    let source =
        StaticSource::new().with_page("https://example.com/a", "Aven offers 24/7 support.");
    let service = build(&mock, &store, source, &config);

    assert_eq!(service.run_ingestion().await.unwrap(), 1);

    let records = store.scroll(INDEX, 10).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "aven-0");
    assert_eq!(records[0].payload["url"], "https://example.com/a");
    assert_eq!(records[0].payload["chunk"], "Aven offers 24/7 support.");
    assert_eq!(records[0].payload["placeholder"], false);

    let answer = service.answer_query("What support does Aven offer?").await;
    assert_eq!(answer, "Aven offers round-the-clock support.");

    let prompts = mock.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0][1].content.contains("24/7 support"));
    assert!(prompts[0][1].content.contains("What support does Aven offer?"));
}

#[tokio::test]
async fn query_before_ingestion_gets_no_information_message() {
    let mock = MockProvider::default();
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/a"]);
    let service = build(&mock, &store, StaticSource::new(), &config);

    service.initialize().await.unwrap();
    let answer = service.answer_query("What is Aven?").await;
    assert_eq!(answer, config.answer.no_results_message);
    assert!(mock.prompts().is_empty());
}

// -- Placeholder fallback --

#[tokio::test]
async fn unreachable_sources_index_placeholders() {
    let mock = MockProvider::default();
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/missing", "https://example.com/gone"]);
    let service = build(&mock, &store, StaticSource::new(), &config);

    let report = service.ingest_with_report().await.unwrap();
    assert!(report.placeholder);
    assert_eq!(report.sources_unavailable, 2);
    assert_eq!(report.record_count, 3);

    let records = store.scroll(INDEX, 10).await.unwrap();
    assert_eq!(records.len(), 3);
    assert!(records.iter().all(|r| r.payload["placeholder"] == true));

    let answer = service.answer_query("Does Aven have customer support?").await;
    assert_ne!(answer, config.answer.no_results_message);
    assert!(mock.prompts()[0][1].content.contains("24/7 customer support"));
}

#[tokio::test]
async fn blank_pages_count_as_empty_and_fall_back() {
    let mock = MockProvider::default();
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/blank"]);
    let source = StaticSource::new().with_page("https://example.com/blank", "   \n  ");
    let service = build(&mock, &store, source, &config);

    let report = service.ingest_with_report().await.unwrap();
    assert_eq!(report.sources_empty, 1);
    assert!(report.placeholder);
}

// -- Re-ingestion --

#[tokio::test]
async fn reingestion_is_idempotent_with_new_generation() {
    let mock = MockProvider::default();
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/a", "https://example.com/b"]);
    let body: String = (0..300).map(|i| format!("word{i} ")).collect();
    let source = StaticSource::new()
        .with_page("https://example.com/a", body.as_str())
        .with_page("https://example.com/b", "Aven offers 24/7 support.");
    let service = build(&mock, &store, source, &config);

    let first = service.ingest_with_report().await.unwrap();
    let first_pairs = url_chunk_pairs(&store).await;
    let second = service.ingest_with_report().await.unwrap();
    let second_pairs = url_chunk_pairs(&store).await;

    assert_eq!(first.record_count, second.record_count);
    assert_eq!(first_pairs, second_pairs);
    assert!(second.generation > first.generation);
    assert_eq!(first_pairs.len(), first.record_count);
}

#[tokio::test]
async fn transient_embedding_failure_is_retried() {
    let mock = MockProvider::default().with_embed_failures(1);
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/a"]);
    let source =
        StaticSource::new().with_page("https://example.com/a", "Aven offers 24/7 support.");
    let service = build(&mock, &store, source, &config);

    assert_eq!(service.run_ingestion().await.unwrap(), 1);
    assert!(mock.embed_calls() >= 2);
}

#[tokio::test]
async fn concurrent_ingestion_is_rejected() {
    let mock = MockProvider::default().with_delay(50);
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/a"]);
    let source =
        StaticSource::new().with_page("https://example.com/a", "Aven offers 24/7 support.");
    let service = build(&mock, &store, source, &config);

    let (a, b) = tokio::join!(service.run_ingestion(), service.run_ingestion());
    let rejected = [&a, &b]
        .iter()
        .filter(|r| matches!(r, Err(DocumentError::IngestionInProgress)))
        .count();
    assert_eq!(rejected, 1);
    assert!(a.is_ok() || b.is_ok());
}

// -- Generation fallback --

#[tokio::test]
async fn generation_failure_answers_with_context_excerpt() {
    let mock = MockProvider::failing();
    let store = Arc::new(InMemoryVectorStore::new());
    let config = test_config(&["https://example.com/a"]);
    let source =
        StaticSource::new().with_page("https://example.com/a", "Aven offers 24/7 support.");
    let service = build(&mock, &store, source, &config);

    service.run_ingestion().await.unwrap();
    let answer = service.answer_query("support").await;
    assert!(answer.starts_with("Based on Aven's information: Aven offers 24/7 support...."));
    assert!(answer.ends_with("please contact Aven support for personalized assistance."));
}
