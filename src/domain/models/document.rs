use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

/// A unit of retrievable text: a prior brief summary or a piece of listener feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    content: String,
    #[serde(default)]
    metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<String>, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        self.metadata.kind
    }

    pub fn summary_id(&self) -> Option<&str> {
        self.metadata.summary_id.as_deref()
    }

    pub fn preview(&self, max_chars: usize) -> String {
        let mut preview: String = self.content.chars().take(max_chars).collect();
        if self.content.chars().count() > max_chars {
            preview.push_str("...");
        }
        preview
    }
}

/// What a stored document records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Summary,
    Feedback,
}

impl DocumentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Summary => "summary",
            DocumentKind::Feedback => "feedback",
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(DocumentKind::Summary),
            "feedback" => Ok(DocumentKind::Feedback),
            other => Err(format!(
                "unknown document type '{}', expected 'summary' or 'feedback'",
                other
            )),
        }
    }
}

/// Scalar metadata value. Unrecognized keys keep whatever scalar they were given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    String(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::String(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::String(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        MetadataValue::Bool(value)
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Int(i) => write!(f, "{}", i),
            MetadataValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// Document metadata with the recognized keys typed and everything else kept in `extra`.
///
/// Serializes to a flat JSON object, so `{"type": "summary", "summary_id": "s1", "lang": "en"}`
/// round-trips with `lang` landing in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DocumentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_id: Option<String>,
    /// Unix seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, MetadataValue>,
}

impl DocumentMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(summary_id: impl Into<String>) -> Self {
        Self {
            kind: Some(DocumentKind::Summary),
            summary_id: Some(summary_id.into()),
            ..Self::default()
        }
    }

    pub fn feedback(summary_id: impl Into<String>) -> Self {
        Self {
            kind: Some(DocumentKind::Feedback),
            summary_id: Some(summary_id.into()),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: DocumentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_summary_id(mut self, summary_id: impl Into<String>) -> Self {
        self.summary_id = Some(summary_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    pub fn extra(&self, key: &str) -> Option<&MetadataValue> {
        self.extra.get(key)
    }

    /// Rejects `extra` entries that would shadow a typed key once flattened.
    pub fn validate(&self) -> Result<(), DomainError> {
        match self.extra.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
            Some(key) => Err(DomainError::invalid_input(format!(
                "metadata key '{}' is reserved; set it through its typed field",
                key
            ))),
            None => Ok(()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
            && self.summary_id.is_none()
            && self.timestamp.is_none()
            && self.extra.is_empty()
    }
}

/// Keys owned by the typed fields of [`DocumentMetadata`].
pub const RESERVED_KEYS: [&str; 3] = ["type", "summary_id", "timestamp"];

pub(crate) fn current_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_serializes_flat() {
        let metadata = DocumentMetadata::summary("s1")
            .with_timestamp(1_700_000_000)
            .with_extra("lang", "en");

        let json = serde_json::to_value(&metadata).unwrap();

        assert_eq!(json["type"], "summary");
        assert_eq!(json["summary_id"], "s1");
        assert_eq!(json["timestamp"], 1_700_000_000i64);
        assert_eq!(json["lang"], "en");
    }

    #[test]
    fn test_metadata_unknown_keys_land_in_extra() {
        let json = r#"{"type":"feedback","summary_id":"abc","seed":true,"rating":4}"#;
        let metadata: DocumentMetadata = serde_json::from_str(json).unwrap();

        assert_eq!(metadata.kind, Some(DocumentKind::Feedback));
        assert_eq!(metadata.summary_id.as_deref(), Some("abc"));
        assert_eq!(metadata.extra("seed"), Some(&MetadataValue::Bool(true)));
        assert_eq!(metadata.extra("rating"), Some(&MetadataValue::Int(4)));
    }

    #[test]
    fn test_reserved_extra_keys_are_rejected() {
        for key in RESERVED_KEYS {
            let err = DocumentMetadata::new().with_extra(key, "x").validate().unwrap_err();
            assert!(err.is_invalid_input(), "{} should be reserved", key);
        }
        assert!(DocumentMetadata::summary("s1").with_extra("lang", "en").validate().is_ok());
    }

    #[test]
    fn test_empty_metadata() {
        assert!(DocumentMetadata::new().is_empty());
        assert!(!DocumentMetadata::new().with_extra("k", 1i64).is_empty());
    }

    #[test]
    fn test_document_kind_from_str() {
        assert_eq!("Summary".parse::<DocumentKind>(), Ok(DocumentKind::Summary));
        assert_eq!(" feedback ".parse::<DocumentKind>(), Ok(DocumentKind::Feedback));
        assert!("note".parse::<DocumentKind>().is_err());
    }

    #[test]
    fn test_document_preview() {
        let doc = Document::new("Markets rallied on rate-cut hopes.", DocumentMetadata::new());
        assert_eq!(doc.preview(7), "Markets...");
        assert_eq!(doc.preview(100), "Markets rallied on rate-cut hopes.");
    }
}
