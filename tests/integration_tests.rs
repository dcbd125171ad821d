//! Integration tests for the morning brief workflows.
//!
//! These tests run generation and feedback end to end against a real
//! on-disk store, a mock embedding and a canned chat model.

use std::sync::Arc;

use async_trait::async_trait;
use tempfile::{tempdir, TempDir};

use morningbrief::{
    parse_interests, Article, BriefRequest, ChatClient, DocumentKind, DomainError,
    EmbeddingConfig, EmbeddingService, Feedback, FileRagStore, GenerateBriefUseCase,
    GenerationSettings, MetadataValue, MockChatClient, MockEmbedding, RagStore, RecordFeedbackUseCase,
    RetrieveContextUseCase, StoreConfig, SummaryArchive,
};

struct TestEnv {
    dir: TempDir,
    store: Arc<FileRagStore>,
}

fn setup_test_env() -> TestEnv {
    let dir = tempdir().expect("Failed to create temp dir");
    let store = Arc::new(open_store(&dir));
    TestEnv { dir, store }
}

fn open_store(dir: &TempDir) -> FileRagStore {
    let embedder: Arc<dyn EmbeddingService> = Arc::new(MockEmbedding::new());
    FileRagStore::new(&StoreConfig::new(dir.path()), embedder).expect("Failed to open store")
}

/// Embedding provider that is always down.
struct UnavailableEmbedding {
    config: EmbeddingConfig,
}

#[async_trait]
impl EmbeddingService for UnavailableEmbedding {
    async fn embed_texts(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        Err(DomainError::embedding("service unavailable"))
    }

    async fn embed_query(&self, _query: &str) -> Result<Vec<f32>, DomainError> {
        Err(DomainError::embedding("service unavailable"))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}

fn sample_articles() -> Vec<Article> {
    vec![
        Article::new("Fed signals pause", "Rates unchanged for now")
            .with_source("Reuters")
            .with_url("https://example.com/fed"),
        Article::new("Chipmaker beats estimates", "AI demand lifts revenue").with_source("AP"),
    ]
}

#[tokio::test]
async fn test_generate_brief_archives_summary() {
    let env = setup_test_env();
    let chat = Arc::new(MockChatClient::new());
    let use_case =
        GenerateBriefUseCase::new(env.store.clone(), chat.clone(), &GenerationSettings::default());

    let brief = use_case
        .execute(BriefRequest {
            articles: sample_articles(),
            interests: parse_interests("markets, tech"),
            target_words: None,
        })
        .await
        .expect("Failed to generate brief");

    assert_eq!(brief.summary_id().len(), 32);
    assert!(brief.summary_id().chars().all(|c| c.is_ascii_hexdigit()));
    assert_eq!(
        brief.sections(),
        &["Top Stories".to_string(), "What to Watch".to_string()]
    );

    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("markets, tech"));
    assert!(prompts[0].contains("Fed signals pause"));

    let reopened = open_store(&env.dir);
    let documents = reopened.retrieve("markets, tech", 6).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].kind(), Some(DocumentKind::Summary));
    assert_eq!(documents[0].summary_id(), Some(brief.summary_id()));
    assert_eq!(documents[0].content(), brief.text());
    assert!(documents[0].metadata().timestamp.is_some());
}

#[tokio::test]
async fn test_second_brief_sees_prior_context() {
    let env = setup_test_env();
    let chat = Arc::new(MockChatClient::new());
    let use_case =
        GenerateBriefUseCase::new(env.store.clone(), chat.clone(), &GenerationSettings::default());
    let request = BriefRequest {
        articles: sample_articles(),
        interests: vec!["markets".to_string()],
        target_words: Some(600),
    };

    use_case.execute(request.clone()).await.unwrap();
    use_case.execute(request).await.unwrap();

    let prompts = chat.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(!prompts[0].contains("Nothing unusual happened overnight."));
    assert!(prompts[1].contains("Nothing unusual happened overnight."));
    assert!(prompts[1].contains("about 600 words"));
    assert_eq!(env.store.document_count().await, 2);
}

#[tokio::test]
async fn test_empty_generation_is_an_error() {
    let env = setup_test_env();
    let chat: Arc<dyn ChatClient> = Arc::new(MockChatClient::with_response("   \n"));
    let use_case = GenerateBriefUseCase::new(env.store.clone(), chat, &GenerationSettings::default());

    let err = use_case
        .execute(BriefRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, DomainError::GenerationError(_)));
    assert_eq!(env.store.document_count().await, 0);
}

#[tokio::test]
async fn test_articles_are_capped() {
    let env = setup_test_env();
    let chat = Arc::new(MockChatClient::new());
    let settings = GenerationSettings {
        max_articles: 1,
        ..GenerationSettings::default()
    };
    let use_case = GenerateBriefUseCase::new(env.store.clone(), chat.clone(), &settings);

    use_case
        .execute(BriefRequest {
            articles: sample_articles(),
            ..BriefRequest::default()
        })
        .await
        .unwrap();

    let prompt = &chat.prompts()[0];
    assert!(prompt.contains("Fed signals pause"));
    assert!(!prompt.contains("Chipmaker beats estimates"));
}

#[tokio::test]
async fn test_brief_text_is_written_to_summaries_dir() {
    let env = setup_test_env();
    let summaries = tempdir().unwrap();
    let summaries_dir = summaries.path().join("summaries");
    let use_case = GenerateBriefUseCase::new(
        env.store.clone(),
        Arc::new(MockChatClient::new()),
        &GenerationSettings::default(),
    )
    .with_archive(Arc::new(SummaryArchive::new(&summaries_dir)));

    let brief = use_case
        .execute(BriefRequest {
            articles: sample_articles(),
            ..BriefRequest::default()
        })
        .await
        .unwrap();

    let names: Vec<String> = std::fs::read_dir(&summaries_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names.len(), 1);
    assert!(names[0].starts_with("brief_"));
    assert!(names[0].ends_with(&format!("_{}.txt", brief.summary_id())));

    let saved = std::fs::read_to_string(summaries_dir.join(&names[0])).unwrap();
    assert_eq!(saved, brief.text());
    assert_eq!(env.store.document_count().await, 1);
}

#[tokio::test]
async fn test_unwritable_summaries_dir_stores_nothing() {
    let env = setup_test_env();
    let blocked = env.dir.path().join("summaries");
    std::fs::write(&blocked, b"occupied").unwrap();
    let use_case = GenerateBriefUseCase::new(
        env.store.clone(),
        Arc::new(MockChatClient::new()),
        &GenerationSettings::default(),
    )
    .with_archive(Arc::new(SummaryArchive::new(&blocked)));

    let err = use_case.execute(BriefRequest::default()).await.unwrap_err();

    assert!(matches!(err, DomainError::StorageError(_)));
    assert_eq!(env.store.document_count().await, 0);
}

#[tokio::test]
async fn test_retrieval_outage_fails_archiving_not_prompting() {
    let dir = tempdir().unwrap();
    // A non-empty store so retrieval actually reaches the provider.
    seed_store(&dir).await;

    let embedder: Arc<dyn EmbeddingService> = Arc::new(UnavailableEmbedding {
        config: EmbeddingConfig::new("down".to_string(), 8, 128),
    });
    let store = Arc::new(FileRagStore::new(&StoreConfig::new(dir.path()), embedder).unwrap());

    let chat = Arc::new(MockChatClient::new());
    let use_case = GenerateBriefUseCase::new(store, chat.clone(), &GenerationSettings::default());

    let err = use_case
        .execute(BriefRequest {
            interests: vec!["markets".to_string()],
            ..BriefRequest::default()
        })
        .await
        .unwrap_err();

    // Retrieval degraded to empty context, so the model was still asked.
    assert_eq!(chat.prompts().len(), 1);
    assert!(err.is_transient());
}

async fn seed_store(dir: &TempDir) {
    let embedder: Arc<dyn EmbeddingService> = Arc::new(MockEmbedding::with_model("down", 8));
    let store = FileRagStore::new(&StoreConfig::new(dir.path()), embedder).unwrap();
    store
        .add_texts(&["Prior brief".to_string()], None)
        .await
        .unwrap();
    store.save().await.unwrap();
}

#[tokio::test]
async fn test_record_feedback_stores_likes_and_dislikes() {
    let env = setup_test_env();
    let use_case = RecordFeedbackUseCase::new(env.store.clone());
    let feedback = Feedback::new("abc")
        .with_rating(4)
        .with_likes("more climate coverage")
        .with_dislikes("less celebrity news");

    let added = use_case.execute(&feedback).await.unwrap();
    assert_eq!(added, 2);

    let reopened = open_store(&env.dir);
    reopened.load().await.unwrap();
    assert_eq!(reopened.document_count().await, 2);

    let documents = reopened.retrieve("USER_FEEDBACK_LIKES: more climate coverage", 2).await.unwrap();
    assert_eq!(documents[0].content(), "USER_FEEDBACK_LIKES: more climate coverage");
    assert_eq!(documents[0].metadata().extra("rating"), Some(&MetadataValue::Int(4)));
    assert!(documents
        .iter()
        .all(|d| d.kind() == Some(DocumentKind::Feedback) && d.summary_id() == Some("abc")));
}

#[tokio::test]
async fn test_unrated_feedback_is_still_stored() {
    let env = setup_test_env();
    let use_case = RecordFeedbackUseCase::new(env.store.clone());

    let added = use_case
        .execute(&Feedback::new("abc").with_likes("more local news"))
        .await
        .unwrap();
    assert_eq!(added, 1);

    let reopened = open_store(&env.dir);
    let documents = reopened.retrieve("USER_FEEDBACK_LIKES: more local news", 1).await.unwrap();
    assert_eq!(documents[0].content(), "USER_FEEDBACK_LIKES: more local news");
    assert_eq!(documents[0].kind(), Some(DocumentKind::Feedback));
    assert!(documents[0].metadata().extra("rating").is_none());
}

#[tokio::test]
async fn test_feedback_without_text_writes_nothing() {
    let env = setup_test_env();
    let use_case = RecordFeedbackUseCase::new(env.store.clone());

    let added = use_case.execute(&Feedback::new("abc").with_rating(5)).await.unwrap();

    assert_eq!(added, 0);
    assert!(!env.store.is_loaded().await);
    assert!(!env.store.index_path().exists());
}

#[tokio::test]
async fn test_feedback_rating_out_of_range() {
    let env = setup_test_env();
    let use_case = RecordFeedbackUseCase::new(env.store.clone());

    for rating in [0, 6] {
        let err = use_case
            .execute(&Feedback::new("abc").with_rating(rating).with_likes("anything"))
            .await
            .unwrap_err();
        assert!(err.is_invalid_input(), "rating {} should be rejected", rating);
    }
    assert_eq!(env.store.document_count().await, 0);
}

#[tokio::test]
async fn test_retrieve_context_uses_joined_interests() {
    let env = setup_test_env();
    env.store
        .add_texts(&["Markets, energy".to_string(), "sports".to_string()], None)
        .await
        .unwrap();

    let context = RetrieveContextUseCase::new(env.store.clone())
        .execute(&parse_interests("Markets\nenergy, markets"), 1)
        .await
        .unwrap();

    assert_eq!(context.documents().len(), 1);
    assert_eq!(context.text(), "Markets, energy");
}

#[tokio::test]
async fn test_retrieve_context_without_interests_is_empty() {
    let env = setup_test_env();

    let context = RetrieveContextUseCase::new(env.store.clone())
        .execute(&[], 6)
        .await
        .unwrap();

    assert!(context.is_empty());
    assert!(!env.store.is_loaded().await);
}
