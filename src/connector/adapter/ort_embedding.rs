use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tokenizers::{Encoding, Tokenizer};
use tracing::{debug, info};

use crate::application::EmbeddingService;
use crate::domain::{DomainError, EmbeddingConfig};

pub const DEFAULT_ORT_MODEL_ID: &str = "sentence-transformers/all-MiniLM-L6-v2";
const DEFAULT_MAX_SEQ_LENGTH: usize = 256;
const BATCH_SIZE: usize = 32;

/// Local sentence embeddings through ONNX Runtime.
///
/// Token embeddings are mean-pooled over the attention mask and L2-normalized.
/// The vector length is read from the model itself when it is loaded.
pub struct OrtEmbedding {
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
    config: EmbeddingConfig,
}

impl OrtEmbedding {
    /// Downloads (or reuses the cached) tokenizer and ONNX model from the Hugging Face hub.
    pub fn new(model_id: Option<&str>) -> Result<Self, DomainError> {
        let model_id = model_id.unwrap_or(DEFAULT_ORT_MODEL_ID);
        info!("Initializing ORT embedding service with model: {}", model_id);

        let api = hf_hub::api::sync::ApiBuilder::new()
            .with_progress(true)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to create HF API: {}", e)))?;

        let repo = api.model(model_id.to_string());

        let tokenizer_path = repo.get("tokenizer.json").map_err(|e| {
            DomainError::configuration(format!("Failed to download tokenizer: {}", e))
        })?;

        let model_path = repo
            .get("model.onnx")
            .or_else(|_| repo.get("onnx/model.onnx"))
            .map_err(|e| {
                DomainError::configuration(format!("Failed to download ONNX model: {}", e))
            })?;

        Self::from_paths(model_path, tokenizer_path, model_id)
    }

    pub fn from_paths(
        model_path: PathBuf,
        tokenizer_path: PathBuf,
        model_name: &str,
    ) -> Result<Self, DomainError> {
        info!("Loading ONNX model from: {:?}", model_path);

        let session = Session::builder()
            .map_err(|e| DomainError::configuration(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| DomainError::configuration(format!("Failed to set optimization level: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| DomainError::configuration(format!("Failed to load ONNX model: {}", e)))?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| DomainError::configuration(format!("Failed to load tokenizer: {}", e)))?;

        let mut service = Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
            config: EmbeddingConfig::new(model_name.to_string(), 0, DEFAULT_MAX_SEQ_LENGTH),
        };

        let sample = service.run_batch(&["dimension check"])?;
        let dimensions = sample.first().map(Vec::len).unwrap_or(0);
        if dimensions == 0 {
            return Err(DomainError::configuration(format!(
                "model {} produced an empty embedding",
                model_name
            )));
        }
        service.config = EmbeddingConfig::new(model_name.to_string(), dimensions, DEFAULT_MAX_SEQ_LENGTH);
        info!("ORT model {} produces {}-dimensional vectors", model_name, dimensions);

        Ok(service)
    }

    fn run_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, DomainError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| DomainError::embedding(format!("Tokenization failed: {}", e)))?;

        let batch_size = encodings.len();
        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.config.max_sequence_length());

        let input_ids = padded(&encodings, max_len, Encoding::get_ids);
        let attention_mask = padded(&encodings, max_len, Encoding::get_attention_mask);
        let token_type_ids = padded(&encodings, max_len, Encoding::get_type_ids);

        let shape = [batch_size, max_len];
        let to_tensor = |values: Vec<i64>, name: &str| {
            Tensor::from_array((shape, values)).map_err(|e| {
                DomainError::internal(format!("Failed to create {} tensor: {}", name, e))
            })
        };
        let input_ids_tensor = to_tensor(input_ids, "input_ids")?;
        let attention_mask_tensor = to_tensor(attention_mask, "attention_mask")?;
        let token_type_ids_tensor = to_tensor(token_type_ids, "token_type_ids")?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| DomainError::internal(format!("Failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![
                "input_ids" => input_ids_tensor,
                "attention_mask" => attention_mask_tensor,
                "token_type_ids" => token_type_ids_tensor,
            ])
            .map_err(|e| DomainError::embedding(format!("Inference failed: {}", e)))?;

        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or_else(|| DomainError::internal("No output tensor found"))?;

        let (shape, data) = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| DomainError::internal(format!("Failed to extract output tensor: {}", e)))?;

        let shape: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
        debug!("Output tensor shape: {:?}", shape);

        match shape.as_slice() {
            [_, seq_len, hidden] => Ok(encodings
                .iter()
                .enumerate()
                .map(|(i, encoding)| {
                    let tokens = &data[i * seq_len * hidden..(i + 1) * seq_len * hidden];
                    let mut pooled = mean_pool(tokens, *hidden, encoding.get_attention_mask());
                    l2_normalize(&mut pooled);
                    pooled
                })
                .collect()),
            [_, hidden] => Ok((0..batch_size)
                .map(|i| {
                    let mut vector = data[i * hidden..(i + 1) * hidden].to_vec();
                    l2_normalize(&mut vector);
                    vector
                })
                .collect()),
            other => Err(DomainError::internal(format!(
                "Unexpected output tensor shape: {:?}",
                other
            ))),
        }
    }
}

fn padded(encodings: &[Encoding], max_len: usize, field: fn(&Encoding) -> &[u32]) -> Vec<i64> {
    let mut values = Vec::with_capacity(encodings.len() * max_len);
    for encoding in encodings {
        let row = field(encoding);
        let len = row.len().min(max_len);
        values.extend(row[..len].iter().map(|&x| x as i64));
        values.extend(std::iter::repeat_n(0i64, max_len - len));
    }
    values
}

/// Averages token rows of width `hidden` whose attention mask is set.
fn mean_pool(tokens: &[f32], hidden: usize, mask: &[u32]) -> Vec<f32> {
    let mut pooled = vec![0.0f32; hidden];
    let mut count = 0.0f32;

    for (row, &m) in tokens.chunks_exact(hidden).zip(mask.iter()) {
        if m == 0 {
            continue;
        }
        for (acc, v) in pooled.iter_mut().zip(row) {
            *acc += v;
        }
        count += 1.0;
    }

    if count > 0.0 {
        for v in &mut pooled {
            *v /= count;
        }
    }
    pooled
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

#[async_trait]
impl EmbeddingService for OrtEmbedding {
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, DomainError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(BATCH_SIZE) {
            let refs: Vec<&str> = batch.iter().map(String::as_str).collect();
            vectors.extend(self.run_batch(&refs)?);
        }
        debug!("Embedded {} texts with {}", vectors.len(), self.config.model_name());
        Ok(vectors)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, DomainError> {
        self.run_batch(&[query])?
            .into_iter()
            .next()
            .ok_or_else(|| DomainError::embedding("Failed to generate query embedding"))
    }

    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }
}
