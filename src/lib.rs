pub mod application;
pub mod config;
pub mod connector;
pub mod domain;

pub use application::{
    BriefArchive, BriefRequest, ChatClient, EmbeddingService, GenerateBriefUseCase, RagStore,
    RecordFeedbackUseCase, RetrievalContext, RetrieveContextUseCase,
};

pub use config::{
    AppConfig, ChatSettings, EmbeddingProvider, EmbeddingSettings, GenerationSettings, StoreConfig,
};

pub use connector::{
    FileRagStore, FlatIndex, GeminiApi, GeminiClient, GeminiEmbedding, MockChatClient,
    MockEmbedding, OrtEmbedding, SummaryArchive,
};

pub use domain::{
    parse_interests, Article, Brief, DistanceMetric, Document, DocumentKind, DocumentMetadata,
    DomainError, EmbeddingConfig, Feedback, MetadataValue, SearchQuery, SearchResult,
};
