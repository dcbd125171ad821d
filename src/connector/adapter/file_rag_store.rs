use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::index_file::{self, INDEX_FILE_NAME};
use super::FlatIndex;
use crate::application::{EmbeddingService, RagStore};
use crate::config::StoreConfig;
use crate::domain::{
    DistanceMetric, Document, DocumentMetadata, DomainError, SearchQuery, SearchResult,
};

/// In-memory view of a loaded store: `documents[i]` belongs to vector `i` of `index`.
struct LoadedState {
    documents: Vec<Document>,
    index: FlatIndex,
}

/// [`RagStore`] persisted as a single `index.bin` file inside a directory.
///
/// State is guarded by a mutex, so one instance can be shared across tasks.
/// Separate instances, or separate processes, bound to the same directory are
/// not coordinated: the last `save` wins.
pub struct FileRagStore {
    dir: PathBuf,
    metric: DistanceMetric,
    embedder: Arc<dyn EmbeddingService>,
    state: Mutex<Option<LoadedState>>,
}

impl FileRagStore {
    /// Binds a store to `config.path()`, creating the directory if needed.
    ///
    /// Nothing is read until the first `load`, `add_texts` or `retrieve`.
    pub fn new(
        config: &StoreConfig,
        embedder: Arc<dyn EmbeddingService>,
    ) -> Result<Self, DomainError> {
        if embedder.config().dimensions() == 0 {
            return Err(DomainError::configuration(format!(
                "embedding model {} reports zero dimensions",
                embedder.config().model_name()
            )));
        }

        std::fs::create_dir_all(config.path()).map_err(|e| {
            DomainError::storage(format!(
                "Failed to create store directory {}: {}",
                config.path().display(),
                e
            ))
        })?;

        debug!(
            "Bound RAG store at {:?} (model {}, metric {})",
            config.path(),
            embedder.config().model_name(),
            config.metric()
        );

        Ok(Self {
            dir: config.path().to_path_buf(),
            metric: config.metric(),
            embedder,
            state: Mutex::new(None),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE_NAME)
    }

    async fn read_state(&self) -> Result<LoadedState, DomainError> {
        let path = self.index_path();
        let config = self.embedder.config();

        let Some(bytes) = index_file::read_index_file(&path).await? else {
            info!("No saved index at {:?}; starting with an empty store", path);
            return Ok(LoadedState {
                documents: Vec::new(),
                index: FlatIndex::new(config.dimensions(), self.metric)?,
            });
        };

        let snapshot = index_file::decode(&bytes)?;

        if snapshot.index.dimension() != config.dimensions() {
            return Err(DomainError::corrupted(format!(
                "index at {:?} holds {}-dimensional vectors but {} produces {}",
                path,
                snapshot.index.dimension(),
                config.model_name(),
                config.dimensions()
            )));
        }
        if snapshot.model != config.model_name() {
            return Err(DomainError::corrupted(format!(
                "index at {:?} was built with {} but the store is bound to {}",
                path,
                snapshot.model,
                config.model_name()
            )));
        }
        if snapshot.index.metric() != self.metric {
            return Err(DomainError::corrupted(format!(
                "index at {:?} uses the {} metric but the store is configured for {}",
                path,
                snapshot.index.metric(),
                self.metric
            )));
        }

        info!("Loaded {} documents from {:?}", snapshot.documents.len(), path);

        Ok(LoadedState {
            documents: snapshot.documents,
            index: snapshot.index,
        })
    }

    async fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<LoadedState>,
    ) -> Result<&'a mut LoadedState, DomainError> {
        if slot.is_none() {
            *slot = Some(self.read_state().await?);
        }
        slot.as_mut()
            .ok_or_else(|| DomainError::internal("store state missing after load"))
    }
}

#[async_trait]
impl RagStore for FileRagStore {
    async fn load(&self) -> Result<(), DomainError> {
        let fresh = self.read_state().await?;
        let mut state = self.state.lock().await;
        if let Some(previous) = state.as_ref() {
            let discarded = previous.documents.len().saturating_sub(fresh.documents.len());
            if discarded > 0 {
                debug!("Reload discarded {} unsaved documents", discarded);
            }
        }
        *state = Some(fresh);
        Ok(())
    }

    async fn add_texts(
        &self,
        texts: &[String],
        metadatas: Option<Vec<DocumentMetadata>>,
    ) -> Result<usize, DomainError> {
        if let Some(ref metadatas) = metadatas {
            if metadatas.len() != texts.len() {
                return Err(DomainError::invalid_input(format!(
                    "{} texts but {} metadata entries",
                    texts.len(),
                    metadatas.len()
                )));
            }
            for metadata in metadatas {
                metadata.validate()?;
            }
        }
        if let Some(position) = texts.iter().position(|t| t.is_empty()) {
            return Err(DomainError::invalid_input(format!(
                "text at position {} is empty",
                position
            )));
        }
        if texts.is_empty() {
            return Ok(0);
        }

        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await?;

        let vectors = self.embedder.embed_texts(texts).await?;
        if vectors.len() != texts.len() {
            return Err(DomainError::embedding(format!(
                "requested {} embeddings, received {}",
                texts.len(),
                vectors.len()
            )));
        }
        for vector in &vectors {
            state.index.validate(vector)?;
        }

        let metadatas = metadatas.unwrap_or_else(|| vec![DocumentMetadata::default(); texts.len()]);
        for ((text, metadata), vector) in texts.iter().zip(metadatas).zip(&vectors) {
            state.index.add(vector)?;
            state.documents.push(Document::new(text.clone(), metadata));
        }

        debug!(
            "Added {} documents; {} now in memory",
            texts.len(),
            state.documents.len()
        );
        Ok(texts.len())
    }

    async fn save(&self) -> Result<(), DomainError> {
        let state = self.state.lock().await;
        let Some(state) = state.as_ref() else {
            debug!("Store at {:?} was never loaded; nothing to save", self.dir);
            return Ok(());
        };

        let bytes = index_file::encode(
            self.embedder.config().model_name(),
            &state.documents,
            &state.index,
        )?;
        index_file::write_atomic(&self.index_path(), &bytes).await?;

        info!(
            "Saved {} documents to {:?}",
            state.documents.len(),
            self.index_path()
        );
        Ok(())
    }

    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Document>, DomainError> {
        if k == 0 {
            return Err(DomainError::invalid_input("k must be at least 1"));
        }
        let query = SearchQuery::new(query).with_limit(k);
        let results = self.retrieve_scored(&query).await?;
        Ok(results.into_iter().map(SearchResult::into_document).collect())
    }

    async fn retrieve_scored(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, DomainError> {
        if query.query().trim().is_empty() {
            return Err(DomainError::invalid_input("query must not be empty"));
        }

        let mut guard = self.state.lock().await;
        let state = self.ensure_loaded(&mut guard).await?;

        if state.documents.is_empty() {
            debug!("Store is empty; nothing to retrieve");
            return Ok(Vec::new());
        }

        let query_vector = self.embedder.embed_query(query.query()).await?;

        // Rank everything when filters may drop candidates; otherwise the limit is enough.
        let fetch = if query.has_filters() {
            state.index.len()
        } else {
            query.limit()
        };
        let ranked = state.index.search(&query_vector, fetch)?;

        let results: Vec<SearchResult> = ranked
            .into_iter()
            .filter_map(|(position, score)| {
                let document = state.documents.get(position)?;
                query
                    .accepts(document, score)
                    .then(|| SearchResult::new(document.clone(), score, position))
            })
            .take(query.limit())
            .collect();

        debug!("Retrieved {} documents for {}", results.len(), query.summary());
        Ok(results)
    }

    async fn document_count(&self) -> usize {
        self.state
            .lock()
            .await
            .as_ref()
            .map_or(0, |state| state.documents.len())
    }

    async fn is_loaded(&self) -> bool {
        self.state.lock().await.is_some()
    }
}
