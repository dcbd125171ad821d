mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use cli::Commands;
use morningbrief::config::{DEFAULT_APP_NAME, DEFAULT_CHAT_MODEL};
use morningbrief::{
    parse_interests, AppConfig, Article, BriefRequest, ChatClient, DistanceMetric,
    DocumentMetadata, EmbeddingProvider, EmbeddingService, EmbeddingSettings, Feedback,
    FileRagStore, GeminiClient, GeminiEmbedding, GenerateBriefUseCase, MockChatClient,
    MockEmbedding, OrtEmbedding, RagStore, RecordFeedbackUseCase, SearchQuery, StoreConfig,
    SummaryArchive,
};

#[derive(Parser)]
#[command(name = "morningbrief")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(short, long, global = true, env = "DATA_DIR", default_value = "~/.morningbrief")]
    data_dir: String,

    /// Store location; defaults to <data-dir>/vectorstore
    #[arg(long, global = true, env = "VECTORSTORE_DIR")]
    vectorstore_dir: Option<String>,

    /// Brief text archive; defaults to <data-dir>/summaries
    #[arg(long, global = true, env = "SUMMARIES_DIR")]
    summaries_dir: Option<String>,

    #[arg(long, global = true, default_value = "l2")]
    metric: DistanceMetric,

    #[arg(long, global = true, env = "EMBEDDING_PROVIDER", default_value = "gemini")]
    embedding_provider: EmbeddingProvider,

    #[arg(long, global = true, env = "EMBEDDING_MODEL")]
    embedding_model: Option<String>,

    /// Embedding size for hosted models without a known default
    #[arg(long, global = true, env = "EMBEDDING_DIMENSIONS")]
    embedding_dimensions: Option<usize>,

    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, env = "MODEL_NAME", default_value = DEFAULT_CHAT_MODEL)]
    chat_model: String,

    #[arg(long, global = true, env = "APP_NAME", default_value = DEFAULT_APP_NAME)]
    app_name: String,

    #[arg(long, global = true, env = "BRIEF_TARGET_WORDS", default_value = "1200")]
    brief_target_words: usize,

    #[arg(long, global = true, env = "MAX_ARTICLES", default_value = "30")]
    max_articles: usize,

    /// Use offline mock embeddings and a canned chat model
    #[arg(long, global = true)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = build_config(&cli);
    std::fs::create_dir_all(&config.data_dir)?;

    let embedding_service = build_embedding_service(&config.embedding)?;
    let model_name = embedding_service.config().model_name().to_string();
    let dimensions = embedding_service.config().dimensions();
    let store = Arc::new(FileRagStore::new(&config.store, embedding_service)?);

    match cli.command {
        Commands::Add {
            texts,
            kind,
            summary_id,
        } => {
            let mut metadata = DocumentMetadata::new();
            if let Some(kind) = kind {
                metadata = metadata.with_kind(kind);
            }
            if let Some(id) = summary_id {
                metadata = metadata.with_summary_id(id);
            }

            let added = store
                .add_texts(&texts, Some(vec![metadata; texts.len()]))
                .await?;
            store.save().await?;
            println!(
                "Added {} documents ({} total).",
                added,
                store.document_count().await
            );
        }

        Commands::Retrieve {
            query,
            num,
            min_score,
            kind,
        } => {
            let mut search_query = SearchQuery::new(&query).with_limit(num as usize);

            if let Some(score) = min_score {
                search_query = search_query.with_min_score(score);
            }

            if let Some(kinds) = kind {
                search_query = search_query.with_kinds(kinds);
            }

            let results = store.retrieve_scored(&search_query).await?;

            if results.is_empty() {
                println!("No documents found.");
            } else {
                println!("Found {} documents:\n", results.len());

                for (i, result) in results.iter().enumerate() {
                    println!("{}. {}", i + 1, result.display_line());
                    if let Some(id) = result.document().summary_id() {
                        println!("   Summary: {}", id);
                    }

                    let preview: String = result
                        .document()
                        .content()
                        .lines()
                        .take(10)
                        .map(|l| format!("   | {}", l))
                        .collect::<Vec<_>>()
                        .join("\n");
                    println!("{}", preview);
                    println!();
                }
            }
        }

        Commands::Brief {
            articles,
            interests,
            target_words,
        } => {
            let raw = std::fs::read_to_string(&articles)
                .with_context(|| format!("Failed to read articles from {}", articles.display()))?;
            let articles: Vec<Article> = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a JSON array of articles", articles.display()))?;

            let chat: Arc<dyn ChatClient> = if cli.mock {
                info!("Using mock chat client");
                Arc::new(MockChatClient::new())
            } else {
                Arc::new(GeminiClient::new(&config.chat)?)
            };

            let use_case = GenerateBriefUseCase::new(store.clone(), chat, &config.generation)
                .with_archive(Arc::new(SummaryArchive::new(&config.summaries_dir)));
            let brief = use_case
                .execute(BriefRequest {
                    articles,
                    interests: parse_interests(&interests),
                    target_words,
                })
                .await?;

            println!("{}\n", brief.text());
            println!("Summary ID: {}", brief.summary_id());
            println!("Words:      {}", brief.word_count());
            if !brief.sections().is_empty() {
                println!("Sections:   {}", brief.sections().join(", "));
            }
        }

        Commands::Feedback {
            summary_id,
            rating,
            likes,
            dislikes,
        } => {
            let mut feedback = Feedback::new(summary_id)
                .with_likes(likes)
                .with_dislikes(dislikes);
            if let Some(rating) = rating {
                feedback = feedback.with_rating(rating);
            }

            let use_case = RecordFeedbackUseCase::new(store.clone());
            let added = use_case.execute(&feedback).await?;
            println!(
                "Feedback recorded for {} ({} documents stored).",
                feedback.summary_id, added
            );
        }

        Commands::Stats => {
            store.load().await?;
            let index_size = std::fs::metadata(store.index_path())
                .map(|m| m.len())
                .unwrap_or(0);

            println!("Morning Brief Store");
            println!("===================");
            println!("Documents:  {}", store.document_count().await);
            println!("Model:      {} ({} dims)", model_name, dimensions);
            println!("Provider:   {}", config.embedding.provider.as_str());
            println!("Metric:     {}", config.store.metric());
            println!("Index Size: {} bytes", index_size);
            println!("Store Dir:  {}", store.dir().display());
            println!("Briefs Dir: {}", config.summaries_dir.display());
            println!("Data Dir:   {}", config.data_dir.display());
        }
    }

    Ok(())
}

fn build_config(cli: &Cli) -> AppConfig {
    let data_dir = PathBuf::from(expand_tilde(&cli.data_dir));
    let store_dir = cli
        .vectorstore_dir
        .as_deref()
        .map(|dir| PathBuf::from(expand_tilde(dir)))
        .unwrap_or_else(|| data_dir.join("vectorstore"));

    let mut config = AppConfig::new(data_dir)
        .with_store(StoreConfig::new(store_dir).with_metric(cli.metric));
    if let Some(dir) = cli.summaries_dir.as_deref() {
        config.summaries_dir = PathBuf::from(expand_tilde(dir));
    }

    config.embedding.provider = if cli.mock {
        EmbeddingProvider::Mock
    } else {
        cli.embedding_provider
    };
    config.embedding.model = cli.embedding_model.clone();
    config.embedding.dimensions = cli.embedding_dimensions;
    config.embedding.api_key = cli.api_key.clone();

    config.chat.model = cli.chat_model.clone();
    config.chat.api_key = cli.api_key.clone();

    config.generation.app_name = cli.app_name.clone();
    config.generation.target_words = cli.brief_target_words;
    config.generation.max_articles = cli.max_articles;

    config
}

fn build_embedding_service(settings: &EmbeddingSettings) -> Result<Arc<dyn EmbeddingService>> {
    let service: Arc<dyn EmbeddingService> = match settings.provider {
        EmbeddingProvider::Mock => {
            info!("Using mock embedding service");
            Arc::new(MockEmbedding::new())
        }
        EmbeddingProvider::Ort => {
            info!("Initializing ONNX embedding service...");
            Arc::new(OrtEmbedding::new(settings.model.as_deref())?)
        }
        EmbeddingProvider::Gemini => Arc::new(GeminiEmbedding::new(settings)?),
    };
    Ok(service)
}

fn expand_tilde(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            if path == "~" {
                return home.to_string_lossy().to_string();
            }
            return path.replacen("~", &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
