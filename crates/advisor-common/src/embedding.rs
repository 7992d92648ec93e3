/// Embedding wrapper around fastembed.
///
/// `TextEmbedding` is synchronous and CPU-bound, so every call is dispatched through
/// `tokio::task::spawn_blocking`. The model sits behind an `Arc` and is only touched
/// from blocking tasks.
///
/// The nomic-embed-text-v1.5 model uses task-prefixed inputs:
/// - Recipe descriptions: "search_document: {text}"
/// - Synthesized queries: "search_query: {text}"
use std::sync::Arc;

use crate::error::CommonError;

/// Width of the vectors produced by nomic-embed-text-v1.5.
pub const EMBEDDING_DIMENSIONS: usize = 768;

/// Upper bound on texts handed to a single ONNX inference call.
const INFERENCE_BATCH: usize = 8;

pub struct Embedder {
    model: Arc<fastembed::TextEmbedding>,
}

impl Embedder {
    /// Load the embedding model, downloading it on first run (~300MB).
    pub async fn new() -> Result<Self, CommonError> {
        let model = tokio::task::spawn_blocking(|| {
            let options = fastembed::InitOptions::new(fastembed::EmbeddingModel::NomicEmbedTextV15)
                .with_show_download_progress(true);
            fastembed::TextEmbedding::try_new(options)
        })
        .await
        .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
        .map_err(|e| CommonError::Embedding(format!("model initialization failed: {e}")))?;

        Ok(Self {
            model: Arc::new(model),
        })
    }

    /// Embed recipe descriptions for indexing. One vector per input, in input order.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CommonError> {
        let prefixed: Vec<String> = texts
            .iter()
            .map(|t| format!("search_document: {t}"))
            .collect();
        let expected = prefixed.len();
        let model = Arc::clone(&self.model);
        let vectors = tokio::task::spawn_blocking(move || model.embed(prefixed, Some(INFERENCE_BATCH)))
            .await
            .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
            .map_err(|e| CommonError::Embedding(format!("document embedding failed: {e}")))?;

        if vectors.len() != expected {
            return Err(CommonError::Embedding(format!(
                "embedding count mismatch: expected {expected}, got {}",
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    /// Embed a synthesized search query.
    pub async fn embed_query(&self, query: &str) -> Result<Vec<f32>, CommonError> {
        let prefixed = vec![format!("search_query: {query}")];
        let model = Arc::clone(&self.model);
        let mut results =
            tokio::task::spawn_blocking(move || model.embed(prefixed, None))
                .await
                .map_err(|e| CommonError::Embedding(format!("spawn_blocking join error: {e}")))?
                .map_err(|e| CommonError::Embedding(format!("query embedding failed: {e}")))?;
        results
            .pop()
            .ok_or_else(|| CommonError::Embedding("empty embedding result".to_string()))
    }
}
