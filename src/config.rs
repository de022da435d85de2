//! Configuration types for the hybrid index: distance metric, HNSW
//! parameters, and the top-level `HybridIndexConfig` used by `create`.
//!
//! Mirrors the teacher's `engine::config::{IndexConfig, FieldConfig}`
//! builder style, narrowed to the parameters this spec actually needs
//! (dimension, distance, HNSW tuning) since field-level lexical/vector
//! options are instead declared once via `HybridDocument::schema()`.

use serde::{Deserialize, Serialize};

/// Distance metric used by the ANN index. Mirrors the four string
/// constants persisted in `hybrid.meta.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceType {
    L2,
    Cosine,
    Dot,
    L1,
}

impl Default for DistanceType {
    fn default() -> Self {
        DistanceType::Cosine
    }
}

/// HNSW build/search tuning parameters, persisted verbatim in the sidecar
/// so the index can be reopened and, if needed, rebuilt exactly as
/// configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HnswConfig {
    pub max_connections: usize,
    pub max_elements: usize,
    pub max_layers: usize,
    pub ef_construction: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            max_connections: 16,
            max_elements: 1_000_000,
            max_layers: 16,
            ef_construction: 200,
        }
    }
}

/// Configuration supplied to `HybridIndex::create`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridIndexConfig {
    pub dimension: usize,
    pub distance: DistanceType,
    pub hnsw: HnswConfig,
}

impl HybridIndexConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            distance: DistanceType::default(),
            hnsw: HnswConfig::default(),
        }
    }

    pub fn builder(dimension: usize) -> HybridIndexConfigBuilder {
        HybridIndexConfigBuilder {
            config: Self::new(dimension),
        }
    }
}

pub struct HybridIndexConfigBuilder {
    config: HybridIndexConfig,
}

impl HybridIndexConfigBuilder {
    pub fn distance(mut self, distance: DistanceType) -> Self {
        self.config.distance = distance;
        self
    }

    pub fn hnsw(mut self, hnsw: HnswConfig) -> Self {
        self.config.hnsw = hnsw;
        self
    }

    pub fn build(self) -> HybridIndexConfig {
        self.config
    }
}
