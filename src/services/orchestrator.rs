//! Embedding orchestrator service.
//!
//! Owns the process-wide model client and decides when it may be called.
//! The client is installed exactly once, after which requests read it without
//! locking. Encode calls are blocking, so they are dispatched to tokio's
//! blocking pool, and a semaphore caps how many run at the same time.

use anyhow::{anyhow, bail, Context, Result};
use std::sync::{Arc, OnceLock};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::clients::StaticEmbeddingClient;
use crate::config::Config;
use crate::error::EmbeddingError;
use crate::services::EmbeddingCache;
use crate::traits::{EmbeddingClient, EmbeddingInput, EmbeddingOutput};

/// The main orchestrator that manages the embedding model.
pub struct EmbeddingOrchestrator {
    client: OnceLock<Arc<dyn EmbeddingClient>>,
    workers: Arc<Semaphore>,
    cache: Option<EmbeddingCache>,
    config: Config,
}

impl EmbeddingOrchestrator {
    /// Create an orchestrator with no model installed yet.
    pub fn new(config: &Config) -> Self {
        info!(
            "Initializing embedding orchestrator ({} workers, cache size {})",
            config.max_concurrency, config.cache_size
        );

        Self {
            client: OnceLock::new(),
            workers: Arc::new(Semaphore::new(config.max_concurrency)),
            cache: EmbeddingCache::new(config.cache_size),
            config: config.clone(),
        }
    }

    /// Load the configured model on a blocking thread and install it.
    pub async fn load(&self) -> Result<()> {
        let model_name = self.config.model_name.clone();
        let model_path = self.config.model_path.clone();
        let dimension = self.config.dimension.get();

        info!("Loading model '{}' with DIM={}", model_name, dimension);

        let client = tokio::task::spawn_blocking(move || match model_path {
            Some(path) => StaticEmbeddingClient::from_dir(&model_name, &path, dimension),
            None => StaticEmbeddingClient::from_pretrained(&model_name, dimension),
        })
        .await
        .context("Model loading task panicked")??;

        self.install(Arc::new(client))
    }

    /// Make `client` the model for the rest of the process lifetime.
    pub fn install(&self, client: Arc<dyn EmbeddingClient>) -> Result<()> {
        let expected = self.config.dimension.get();
        if client.dimension() != expected {
            bail!(
                "Model {} produces {}D vectors, configured DIM is {}",
                client.model_name(),
                client.dimension(),
                expected
            );
        }

        self.client
            .set(client)
            .map_err(|_| anyhow!("An embedding model is already installed"))?;

        info!("✅ Embedding model ready: {}", self.config.model_name);
        Ok(())
    }

    /// Whether a model has been installed.
    pub fn is_ready(&self) -> bool {
        self.client.get().is_some()
    }

    /// Get the model name reported in responses.
    pub fn model_name(&self) -> &str {
        &self.config.model_name
    }

    /// Get the embedding dimension.
    pub fn dimension(&self) -> usize {
        self.config.dimension.get()
    }

    /// Generate embeddings for validated input.
    pub async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, EmbeddingError> {
        let client = self
            .client
            .get()
            .cloned()
            .ok_or(EmbeddingError::ModelNotReady)?;

        match input {
            EmbeddingInput::Single(text) => {
                let mut vectors = self.encode_texts(client, vec![text]).await?;
                let vector = vectors
                    .pop()
                    .ok_or_else(|| EmbeddingError::Encoding("model returned no vector".into()))?;
                Ok(EmbeddingOutput::Single(vector))
            }
            EmbeddingInput::Batch(texts) if texts.is_empty() => Ok(EmbeddingOutput::Batch(vec![])),
            EmbeddingInput::Batch(texts) => {
                Ok(EmbeddingOutput::Batch(self.encode_texts(client, texts).await?))
            }
        }
    }

    /// Encode `texts` in order, serving what it can from the cache.
    async fn encode_texts(
        &self,
        client: Arc<dyn EmbeddingClient>,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let dimension = self.dimension();
        let model = self.model_name().to_string();

        // Check cache and separate cached/uncached
        let mut resolved: Vec<Option<Vec<f32>>> = vec![None; texts.len()];
        let mut uncached: Vec<(usize, String)> = Vec::new();

        for (i, text) in texts.into_iter().enumerate() {
            let cached = self.cache.as_ref().and_then(|cache| {
                cache.get(&EmbeddingCache::generate_key(&text, &model, dimension))
            });
            match cached {
                Some(embedding) => resolved[i] = Some(embedding),
                None => uncached.push((i, text)),
            }
        }

        debug!(
            "Embedding {} texts: {} cached, {} to generate",
            resolved.len(),
            resolved.len() - uncached.len(),
            uncached.len()
        );

        if !uncached.is_empty() {
            let pending: Vec<String> = uncached.iter().map(|(_, t)| t.clone()).collect();
            let generated = self.dispatch(client, pending).await?;

            if generated.len() != uncached.len() {
                return Err(EmbeddingError::Encoding(format!(
                    "model returned {} vectors for {} texts",
                    generated.len(),
                    uncached.len()
                )));
            }

            for ((i, text), embedding) in uncached.into_iter().zip(generated) {
                if embedding.len() != dimension {
                    return Err(EmbeddingError::Encoding(format!(
                        "model returned a {}D vector, expected {}D",
                        embedding.len(),
                        dimension
                    )));
                }
                if let Some(cache) = &self.cache {
                    cache.insert(
                        EmbeddingCache::generate_key(&text, &model, dimension),
                        embedding.clone(),
                    );
                }
                resolved[i] = Some(embedding);
            }
        }

        resolved
            .into_iter()
            .map(|embedding| {
                embedding.ok_or_else(|| EmbeddingError::Encoding("missing embedding".into()))
            })
            .collect()
    }

    /// Run the blocking encode call on the worker pool.
    async fn dispatch(
        &self,
        client: Arc<dyn EmbeddingClient>,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let permit = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| EmbeddingError::WorkerPool(e.to_string()))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            match texts.as_slice() {
                [text] => client.encode(text).map(|vector| vec![vector]),
                _ => client.encode_batch(&texts),
            }
        })
        .await
        .map_err(|e| EmbeddingError::WorkerPool(format!("task join: {}", e)))?
        .map_err(|e| EmbeddingError::Encoding(e.to_string()))
    }

    /// Get cache statistics as `(entries, capacity)`.
    pub fn cache_stats(&self) -> (usize, usize) {
        self.cache.as_ref().map(|c| c.stats()).unwrap_or((0, 0))
    }

    /// Clear the cache.
    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Dimension;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic client that counts how many texts it encodes.
    struct CountingClient {
        dimension: usize,
        encoded: AtomicUsize,
    }

    impl CountingClient {
        fn new(dimension: usize) -> Arc<Self> {
            Arc::new(Self {
                dimension,
                encoded: AtomicUsize::new(0),
            })
        }

        fn vector_for(&self, text: &str) -> Vec<f32> {
            let seed = text.bytes().map(|b| b as f32).sum::<f32>() + text.len() as f32;
            (0..self.dimension).map(|i| seed + i as f32).collect()
        }
    }

    impl EmbeddingClient for CountingClient {
        fn encode(&self, text: &str) -> Result<Vec<f32>> {
            self.encoded.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector_for(text))
        }

        fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.encoded.fetch_add(texts.len(), Ordering::SeqCst);
            Ok(texts.iter().map(|t| self.vector_for(t)).collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "counting"
        }
    }

    fn config(cache_size: usize) -> Config {
        Config {
            dimension: Dimension::try_from(32).unwrap(),
            cache_size,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_not_ready_before_install() {
        let orchestrator = EmbeddingOrchestrator::new(&config(0));
        assert!(!orchestrator.is_ready());

        let result = orchestrator
            .embed(EmbeddingInput::Single("hello".to_string()))
            .await;
        assert!(matches!(result, Err(EmbeddingError::ModelNotReady)));
    }

    #[tokio::test]
    async fn test_install_is_once_and_checks_dimension() {
        let orchestrator = EmbeddingOrchestrator::new(&config(0));

        assert!(orchestrator.install(CountingClient::new(64)).is_err());
        assert!(!orchestrator.is_ready());

        orchestrator.install(CountingClient::new(32)).unwrap();
        assert!(orchestrator.is_ready());
        assert!(orchestrator.install(CountingClient::new(32)).is_err());
    }

    #[tokio::test]
    async fn test_single_and_batch() {
        let orchestrator = EmbeddingOrchestrator::new(&config(0));
        let client = CountingClient::new(32);
        orchestrator.install(client.clone()).unwrap();

        let single = orchestrator
            .embed(EmbeddingInput::Single("hello".to_string()))
            .await
            .unwrap();
        assert_eq!(single, EmbeddingOutput::Single(client.vector_for("hello")));

        let texts = vec!["a".to_string(), "bb".to_string(), "ccc".to_string()];
        let EmbeddingOutput::Batch(batch) = orchestrator
            .embed(EmbeddingInput::Batch(texts.clone()))
            .await
            .unwrap()
        else {
            panic!("expected batch output");
        };
        assert_eq!(batch.len(), 3);
        for (text, vector) in texts.iter().zip(&batch) {
            assert_eq!(vector, &client.vector_for(text));
        }
    }

    #[tokio::test]
    async fn test_zero_concurrency_setting_still_serves() {
        let config = Config::from_lookup(|key| match key {
            "DIM" => Some("32".to_string()),
            "EMBEDDING_MAX_CONCURRENCY" => Some("0".to_string()),
            _ => None,
        })
        .unwrap();
        let orchestrator = EmbeddingOrchestrator::new(&config);
        orchestrator.install(CountingClient::new(32)).unwrap();

        let output = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            orchestrator.embed(EmbeddingInput::Single("hello".to_string())),
        )
        .await
        .expect("a worker permit should be available");
        assert!(output.is_ok());
    }

    #[tokio::test]
    async fn test_empty_batch_skips_model() {
        let orchestrator = EmbeddingOrchestrator::new(&config(0));
        let client = CountingClient::new(32);
        orchestrator.install(client.clone()).unwrap();

        let output = orchestrator.embed(EmbeddingInput::Batch(vec![])).await.unwrap();
        assert_eq!(output, EmbeddingOutput::Batch(vec![]));
        assert_eq!(client.encoded.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_serves_repeats_in_order() {
        let orchestrator = EmbeddingOrchestrator::new(&config(100));
        let client = CountingClient::new(32);
        orchestrator.install(client.clone()).unwrap();

        orchestrator
            .embed(EmbeddingInput::Single("b".to_string()))
            .await
            .unwrap();
        assert_eq!(client.encoded.load(Ordering::SeqCst), 1);

        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let output = orchestrator
            .embed(EmbeddingInput::Batch(texts.clone()))
            .await
            .unwrap();

        // Only "a" and "c" reach the model
        assert_eq!(client.encoded.load(Ordering::SeqCst), 3);
        assert_eq!(
            output,
            EmbeddingOutput::Batch(texts.iter().map(|t| client.vector_for(t)).collect())
        );
        assert_eq!(orchestrator.cache_stats(), (3, 100));

        orchestrator.clear_cache();
        assert_eq!(orchestrator.cache_stats(), (0, 100));
    }

    #[tokio::test]
    async fn test_wrong_vector_length_is_an_error() {
        struct ShortClient;

        impl EmbeddingClient for ShortClient {
            fn encode(&self, _text: &str) -> Result<Vec<f32>> {
                Ok(vec![0.0; 8])
            }
            fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
                Ok(vec![vec![0.0; 8]; texts.len()])
            }
            fn dimension(&self) -> usize {
                32
            }
            fn model_name(&self) -> &str {
                "short"
            }
        }

        let orchestrator = EmbeddingOrchestrator::new(&config(0));
        orchestrator.install(Arc::new(ShortClient)).unwrap();

        let result = orchestrator
            .embed(EmbeddingInput::Single("x".to_string()))
            .await;
        assert!(matches!(result, Err(EmbeddingError::Encoding(_))));
    }
}
