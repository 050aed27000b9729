//! Configuration module for the embeddings service.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// The one model this service exposes.
pub const MODEL_NAME: &str = "hotchpotch/static-embedding-japanese";

/// Output dimensionalities the model supports (Matryoshka truncation points).
pub const SUPPORTED_DIMENSIONS: [usize; 6] = [32, 64, 128, 256, 512, 1024];

const DEFAULT_DIMENSION: usize = 1024;

const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Fatal startup configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid DIM={raw:?}. Must be an integer. Supported values: {:?}", SUPPORTED_DIMENSIONS)]
    NotAnInteger { raw: String },

    #[error("Invalid DIM={dim}. Supported values: {:?}", SUPPORTED_DIMENSIONS)]
    UnsupportedDimension { dim: usize },
}

/// An output dimensionality that is guaranteed to be one of [`SUPPORTED_DIMENSIONS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimension(usize);

impl Dimension {
    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self(DEFAULT_DIMENSION)
    }
}

impl TryFrom<usize> for Dimension {
    type Error = ConfigError;

    fn try_from(dim: usize) -> Result<Self, Self::Error> {
        if SUPPORTED_DIMENSIONS.contains(&dim) {
            Ok(Self(dim))
        } else {
            Err(ConfigError::UnsupportedDimension { dim })
        }
    }
}

impl FromStr for Dimension {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let dim: usize = raw.trim().parse().map_err(|_| ConfigError::NotAnInteger {
            raw: raw.to_string(),
        })?;
        Self::try_from(dim)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Main service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub model_name: String,
    pub dimension: Dimension,
    /// Local sentence-transformers snapshot; the Hub is used when unset.
    pub model_path: Option<PathBuf>,
    /// Embedding cache entries, `0` disables the cache.
    pub cache_size: usize,
    /// Number of encode calls allowed to run at once, at least 1.
    pub max_concurrency: usize,
    /// Largest accepted request body; bigger bodies get `413`.
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_name: MODEL_NAME.to_string(),
            dimension: Dimension::default(),
            model_path: None,
            cache_size: 10000,
            max_concurrency: 4,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// `DIM` is strict: anything outside [`SUPPORTED_DIMENSIONS`] is an error.
    /// The remaining numeric settings fall back to their defaults when unparseable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let dimension = match lookup("DIM") {
            Some(raw) => raw.parse()?,
            None => defaults.dimension,
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            model_name: defaults.model_name,
            dimension,
            model_path: lookup("MODEL_PATH")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            cache_size: lookup("EMBEDDING_CACHE_SIZE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_size),
            max_concurrency: lookup("EMBEDDING_MAX_CONCURRENCY")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_concurrency)
                .max(1),
            max_body_bytes: lookup("MAX_REQUEST_BODY_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_body_bytes),
        })
    }

    /// Socket address string for the listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
