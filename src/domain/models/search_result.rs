use serde::{Deserialize, Serialize};

use super::{Document, DocumentKind};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    document: Document,
    score: f32,
    position: usize,
}

impl SearchResult {
    pub fn new(document: Document, score: f32, position: usize) -> Self {
        Self {
            document,
            score,
            position,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn into_document(self) -> Document {
        self.document
    }

    /// Higher is closer, whatever the store's metric.
    pub fn score(&self) -> f32 {
        self.score
    }

    /// Insertion position of the document within its store.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_relevant(&self, threshold: f32) -> bool {
        self.score >= threshold
    }

    pub fn display_line(&self) -> String {
        let kind = self
            .document
            .kind()
            .map(|k| k.as_str())
            .unwrap_or("untyped");
        format!("#{} [{}] (score: {:.3})", self.position, kind, self.score)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchQuery {
    query: String,
    limit: usize,
    min_score: Option<f32>,
    kinds: Option<Vec<DocumentKind>>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            limit: 6,
            min_score: None,
            kinds: None,
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        // Ensure at least 1 result is requested
        self.limit = limit.max(1);
        self
    }

    pub fn with_min_score(mut self, score: f32) -> Self {
        self.min_score = Some(score);
        self
    }

    pub fn with_kinds(mut self, kinds: Vec<DocumentKind>) -> Self {
        self.kinds = Some(kinds);
        self
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn min_score(&self) -> Option<f32> {
        self.min_score
    }

    pub fn kinds(&self) -> Option<&[DocumentKind]> {
        self.kinds.as_deref()
    }

    pub fn has_filters(&self) -> bool {
        self.min_score.is_some() || self.kinds.is_some()
    }

    /// Whether a scored document passes this query's filters.
    pub fn accepts(&self, document: &Document, score: f32) -> bool {
        if let Some(min_score) = self.min_score {
            if score < min_score {
                return false;
            }
        }

        match self.kinds {
            Some(ref kinds) => document.kind().is_some_and(|k| kinds.contains(&k)),
            None => true,
        }
    }

    pub fn summary(&self) -> String {
        let mut parts = vec![format!("query=\"{}\"", self.query)];
        parts.push(format!("limit={}", self.limit));

        if let Some(score) = self.min_score {
            parts.push(format!("min_score={:.2}", score));
        }
        if let Some(ref kinds) = self.kinds {
            parts.push(format!("kinds={:?}", kinds));
        }

        parts.join(", ")
    }
}
