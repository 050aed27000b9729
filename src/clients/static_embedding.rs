//! Static embedding model client.
//!
//! Runs a sentence-transformers `StaticEmbedding` model entirely on-device: the
//! text is tokenized, the matching rows of a token-embedding matrix are averaged,
//! and the result is truncated to the configured output dimension. There is no
//! neural network to run, so encoding is cheap and the client is immutable once
//! built, which makes it safe to call from many threads at once.

use anyhow::{anyhow, bail, Context, Result};
use safetensors::{Dtype, SafeTensors};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::traits::EmbeddingClient;

/// Name of the token-embedding matrix inside `model.safetensors`.
const WEIGHT_TENSOR: &str = "embedding.weight";
const MODULES_FILE: &str = "modules.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";
const DEFAULT_MODULE_DIR: &str = "0_StaticEmbedding";

/// Entry of a sentence-transformers `modules.json`.
#[derive(Debug, Deserialize)]
struct ModuleEntry {
    #[serde(default)]
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

/// Where the embedding module lives in a snapshot and whether outputs get normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SnapshotLayout {
    module_dir: String,
    normalize: bool,
}

impl Default for SnapshotLayout {
    fn default() -> Self {
        Self {
            module_dir: DEFAULT_MODULE_DIR.to_string(),
            normalize: false,
        }
    }
}

impl SnapshotLayout {
    fn parse(modules_json: &str) -> Result<Self> {
        let modules: Vec<ModuleEntry> =
            serde_json::from_str(modules_json).context("Malformed modules.json")?;

        let embedding = modules
            .iter()
            .find(|m| m.kind.ends_with("StaticEmbedding"))
            .ok_or_else(|| anyhow!("modules.json does not declare a StaticEmbedding module"))?;

        Ok(Self {
            module_dir: embedding.path.clone(),
            normalize: modules.iter().any(|m| m.kind.ends_with("Normalize")),
        })
    }

    fn file(&self, name: &str) -> String {
        if self.module_dir.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.module_dir, name)
        }
    }
}

/// Local embedding client for static (lookup-table) embedding models.
pub struct StaticEmbeddingClient {
    tokenizer: Tokenizer,
    /// Row-major `[vocab_size, hidden_size]` token embeddings.
    weights: Vec<f32>,
    vocab_size: usize,
    hidden_size: usize,
    dimension: usize,
    normalize: bool,
    model_name: String,
}

impl StaticEmbeddingClient {
    /// Download (or reuse the Hugging Face cache for) `repo_id` and load it.
    ///
    /// Blocking: performs network and disk I/O.
    pub fn from_pretrained(repo_id: &str, dimension: usize) -> Result<Self> {
        info!("Fetching model snapshot {} from the Hugging Face Hub", repo_id);

        let api = hf_hub::api::sync::Api::new().context("Failed to initialise Hub client")?;
        let repo = api.model(repo_id.to_string());

        let layout = match repo.get(MODULES_FILE) {
            Ok(path) => SnapshotLayout::parse(&fs::read_to_string(path)?)?,
            Err(e) => {
                warn!("No usable {} in {} ({}), assuming defaults", MODULES_FILE, repo_id, e);
                SnapshotLayout::default()
            }
        };

        let tokenizer_path = repo
            .get(&layout.file(TOKENIZER_FILE))
            .with_context(|| format!("Failed to fetch tokenizer for {}", repo_id))?;
        let weights_path = repo
            .get(&layout.file(WEIGHTS_FILE))
            .with_context(|| format!("Failed to fetch weights for {}", repo_id))?;

        Self::from_files(
            repo_id,
            &tokenizer_path,
            &weights_path,
            dimension,
            layout.normalize,
        )
    }

    /// Load a sentence-transformers snapshot from a local directory.
    pub fn from_dir(model_name: &str, dir: &Path, dimension: usize) -> Result<Self> {
        info!("Loading model snapshot from {}", dir.display());

        let modules_path = dir.join(MODULES_FILE);
        let layout = if modules_path.exists() {
            SnapshotLayout::parse(&fs::read_to_string(&modules_path)?)?
        } else {
            SnapshotLayout::default()
        };

        let tokenizer_path: PathBuf = dir.join(layout.file(TOKENIZER_FILE));
        let weights_path: PathBuf = dir.join(layout.file(WEIGHTS_FILE));

        if !weights_path.exists() {
            bail!(
                "Model file not found: {}. Please download the model first.",
                weights_path.display()
            );
        }
        if !tokenizer_path.exists() {
            bail!(
                "Tokenizer file not found: {}. Please download the tokenizer first.",
                tokenizer_path.display()
            );
        }

        Self::from_files(
            model_name,
            &tokenizer_path,
            &weights_path,
            dimension,
            layout.normalize,
        )
    }

    fn from_files(
        model_name: &str,
        tokenizer_path: &Path,
        weights_path: &Path,
        dimension: usize,
        normalize: bool,
    ) -> Result<Self> {
        let tokenizer = Tokenizer::from_file(tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer: {}", e))?;
        debug!("Tokenizer loaded from {}", tokenizer_path.display());

        let bytes = fs::read(weights_path)
            .with_context(|| format!("Failed to read {}", weights_path.display()))?;
        let (weights, hidden_size) = read_embedding_matrix(&bytes)?;

        Self::from_parts(model_name, tokenizer, weights, hidden_size, dimension, normalize)
    }

    /// Build a client from an in-memory tokenizer and embedding matrix.
    ///
    /// Any padding configured in the tokenizer is dropped: pad tokens would
    /// otherwise be pooled into the shorter texts of a batch.
    pub fn from_parts(
        model_name: &str,
        mut tokenizer: Tokenizer,
        weights: Vec<f32>,
        hidden_size: usize,
        dimension: usize,
        normalize: bool,
    ) -> Result<Self> {
        if hidden_size == 0 || weights.is_empty() || weights.len() % hidden_size != 0 {
            bail!(
                "Embedding matrix of {} values does not split into rows of {}",
                weights.len(),
                hidden_size
            );
        }
        if dimension == 0 || dimension > hidden_size {
            bail!(
                "Requested dimension {} is not available, {} produces at most {} dimensions",
                dimension,
                model_name,
                hidden_size
            );
        }

        tokenizer.with_padding(None);

        let vocab_size = weights.len() / hidden_size;
        info!(
            "✓ Static embedding model ready: {} ({} tokens x {}D, serving {}D{})",
            model_name,
            vocab_size,
            hidden_size,
            dimension,
            if normalize { ", normalized" } else { "" }
        );

        Ok(Self {
            tokenizer,
            weights,
            vocab_size,
            hidden_size,
            dimension,
            normalize,
            model_name: model_name.to_string(),
        })
    }

    /// Mean-pool the embedding rows of `ids`, then normalize and truncate.
    fn pool(&self, ids: &[u32]) -> Result<Vec<f32>> {
        let mut pooled = vec![0.0f32; self.hidden_size];

        for &id in ids {
            let row = id as usize;
            if row >= self.vocab_size {
                bail!(
                    "Token id {} is outside the embedding matrix ({} rows)",
                    id,
                    self.vocab_size
                );
            }
            let start = row * self.hidden_size;
            let weights = &self.weights[start..start + self.hidden_size];
            for (acc, w) in pooled.iter_mut().zip(weights) {
                *acc += w;
            }
        }

        if !ids.is_empty() {
            let count = ids.len() as f32;
            pooled.iter_mut().for_each(|x| *x /= count);
        }

        if self.normalize {
            let norm: f32 = pooled.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm > 0.0 {
                pooled.iter_mut().for_each(|x| *x /= norm);
            }
        }

        pooled.truncate(self.dimension);
        Ok(pooled)
    }
}

impl EmbeddingClient for StaticEmbeddingClient {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, false)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;
        self.pool(encoding.get_ids())
    }

    fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs: Vec<&str> = texts.iter().map(String::as_str).collect();
        let encodings = self
            .tokenizer
            .encode_batch(inputs, false)
            .map_err(|e| anyhow!("Tokenization failed: {}", e))?;

        encodings
            .iter()
            .map(|encoding| self.pool(encoding.get_ids()))
            .collect()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// Read the F32 `[vocab, hidden]` token-embedding matrix from safetensors bytes.
fn read_embedding_matrix(bytes: &[u8]) -> Result<(Vec<f32>, usize)> {
    let tensors = SafeTensors::deserialize(bytes).context("Malformed safetensors file")?;
    let view = tensors
        .tensor(WEIGHT_TENSOR)
        .with_context(|| format!("Tensor {} not found", WEIGHT_TENSOR))?;

    if view.dtype() != Dtype::F32 {
        bail!(
            "Unsupported dtype {:?} for {}, expected F32",
            view.dtype(),
            WEIGHT_TENSOR
        );
    }

    let shape = view.shape();
    if shape.len() != 2 {
        bail!("Expected a 2D embedding matrix, got shape {:?}", shape);
    }

    let weights: Vec<f32> = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    Ok((weights, shape[1]))
}
