//! Thin wrapper over `hnsw_rs` implementing the ANN engine contract of §6:
//! a constructor taking the full config, `insert`/`insert_batch`,
//! `delete`/`delete_batch`, `save`/`load`, `set_searching_mode`, `search`,
//! and `compact`.
//!
//! `hnsw_rs`'s graph has no native delete (grounded on the `draco28-PulseDB`
//! HNSW wrapper in the retrieval pack, which soft-deletes via a tombstone
//! set and a filtered search), and reloading a dumped graph directly runs
//! into the self-referential lifetime issue that wrapper's author called
//! out — so, like that wrapper, we never call `HnswIo::load_hnsw`. Instead
//! we durably keep the raw embeddings next to the graph and rebuild the
//! graph by reinserting them on `load`/`compact`. This is recorded as the
//! resolution of the corresponding Open Question in DESIGN.md.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use hnsw_rs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{DistanceType, HnswConfig};
use crate::error::{HybridError, Result};

/// One ranked neighbour returned by `VectorEngine::search`.
#[derive(Debug, Clone, Copy)]
pub struct VectorHit {
    pub id: u64,
    pub distance: f32,
}

enum HnswBackend {
    L2(Hnsw<'static, f32, DistL2>),
    Cosine(Hnsw<'static, f32, DistCosine>),
    Dot(Hnsw<'static, f32, DistDot>),
    L1(Hnsw<'static, f32, DistL1>),
}

impl HnswBackend {
    fn build(distance: DistanceType, config: &HnswConfig) -> Self {
        let (m, n, layers, ef_c) = (
            config.max_connections,
            config.max_elements,
            config.max_layers,
            config.ef_construction,
        );
        match distance {
            DistanceType::L2 => HnswBackend::L2(Hnsw::new(m, n, layers, ef_c, DistL2 {})),
            DistanceType::Cosine => {
                HnswBackend::Cosine(Hnsw::new(m, n, layers, ef_c, DistCosine {}))
            }
            DistanceType::Dot => HnswBackend::Dot(Hnsw::new(m, n, layers, ef_c, DistDot {})),
            DistanceType::L1 => HnswBackend::L1(Hnsw::new(m, n, layers, ef_c, DistL1 {})),
        }
    }

    fn insert(&self, vector: &[f32], id: usize) {
        match self {
            HnswBackend::L2(h) => h.insert((vector, id)),
            HnswBackend::Cosine(h) => h.insert((vector, id)),
            HnswBackend::Dot(h) => h.insert((vector, id)),
            HnswBackend::L1(h) => h.insert((vector, id)),
        }
    }

    fn parallel_insert(&self, data: &[(&Vec<f32>, usize)]) {
        match self {
            HnswBackend::L2(h) => h.parallel_insert(data),
            HnswBackend::Cosine(h) => h.parallel_insert(data),
            HnswBackend::Dot(h) => h.parallel_insert(data),
            HnswBackend::L1(h) => h.parallel_insert(data),
        }
    }

    fn set_searching_mode(&self, mode: bool) {
        match self {
            HnswBackend::L2(h) => h.set_searching_mode(mode),
            HnswBackend::Cosine(h) => h.set_searching_mode(mode),
            HnswBackend::Dot(h) => h.set_searching_mode(mode),
            HnswBackend::L1(h) => h.set_searching_mode(mode),
        }
    }

    fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Vec<Neighbour> {
        match self {
            HnswBackend::L2(h) => h.search(query, k, ef_search),
            HnswBackend::Cosine(h) => h.search(query, k, ef_search),
            HnswBackend::Dot(h) => h.search(query, k, ef_search),
            HnswBackend::L1(h) => h.search(query, k, ef_search),
        }
    }

    fn search_filter(
        &self,
        query: &[f32],
        k: usize,
        ef_search: usize,
        filter: &dyn Fn(&usize) -> bool,
    ) -> Vec<Neighbour> {
        let bridge = FilterBridge(filter);
        match self {
            HnswBackend::L2(h) => h.search_filter(query, k, ef_search, Some(&bridge)),
            HnswBackend::Cosine(h) => h.search_filter(query, k, ef_search, Some(&bridge)),
            HnswBackend::Dot(h) => h.search_filter(query, k, ef_search, Some(&bridge)),
            HnswBackend::L1(h) => h.search_filter(query, k, ef_search, Some(&bridge)),
        }
    }
}

/// Bridges a `&dyn Fn(&usize) -> bool` to `hnsw_rs`'s `FilterT`. The
/// blanket `impl<F: Fn(&DataId) -> bool> FilterT for F` only applies to
/// concrete closure types, not type-erased trait objects — grounded on
/// the same bridge in the `draco28-PulseDB` HNSW wrapper.
struct FilterBridge<'a>(&'a dyn Fn(&usize) -> bool);

impl FilterT for FilterBridge<'_> {
    fn hnsw_filter(&self, id: &DataId) -> bool {
        (self.0)(id)
    }
}

/// Persisted embeddings, written to `<dir>/<basename>.data`.
#[derive(Serialize, Deserialize)]
struct PersistedEmbeddings {
    entries: Vec<(u64, Vec<f32>)>,
}

/// Persisted graph-construction parameters, written to
/// `<dir>/<basename>.graph`.
#[derive(Serialize, Deserialize)]
struct PersistedGraphMeta {
    dimension: usize,
    distance: DistanceType,
    config: HnswConfig,
}

/// The ANN (HNSW) half of a `HybridIndex`.
pub struct VectorEngine {
    dimension: usize,
    distance: DistanceType,
    config: HnswConfig,
    backend: HnswBackend,
    embeddings: HashMap<u64, Vec<f32>>,
    deleted: HashSet<u64>,
}

impl VectorEngine {
    pub fn new(dimension: usize, distance: DistanceType, config: HnswConfig) -> Self {
        let backend = HnswBackend::build(distance, &config);
        Self {
            dimension,
            distance,
            config,
            backend,
            embeddings: HashMap::new(),
            deleted: HashSet::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    fn validate_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(HybridError::DimensionMismatch {
                expected: self.dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }

    pub fn insert(&mut self, id: u64, vector: &[f32]) -> Result<()> {
        self.validate_dimension(vector)?;
        self.backend.insert(vector, id as usize);
        self.embeddings.insert(id, vector.to_vec());
        self.deleted.remove(&id);
        Ok(())
    }

    pub fn insert_batch(&mut self, items: &[(u64, Vec<f32>)]) -> Result<()> {
        for (_, v) in items {
            self.validate_dimension(v)?;
        }
        let data: Vec<(&Vec<f32>, usize)> = items.iter().map(|(id, v)| (v, *id as usize)).collect();
        self.backend.parallel_insert(&data);
        for (id, v) in items {
            self.embeddings.insert(*id, v.clone());
            self.deleted.remove(id);
        }
        Ok(())
    }

    /// Soft-deletes `id`: the underlying graph keeps the point (hnsw_rs
    /// has no real delete) but it is excluded from `search` and dropped
    /// from the embedding arena that `compact`/`save` rebuild from.
    pub fn delete(&mut self, id: u64) {
        if self.embeddings.remove(&id).is_some() {
            self.deleted.insert(id);
        }
    }

    pub fn delete_batch(&mut self, ids: &[u64]) {
        for id in ids {
            self.delete(*id);
        }
    }

    pub fn set_searching_mode(&mut self, mode: bool) {
        self.backend.set_searching_mode(mode);
    }

    pub fn search(&self, query: &[f32], k: usize, ef_search: usize) -> Result<Vec<VectorHit>> {
        self.validate_dimension(query)?;
        let neighbours = if self.deleted.is_empty() {
            self.backend.search(query, k, ef_search)
        } else {
            let deleted = &self.deleted;
            let filter = move |id: &usize| !deleted.contains(&(*id as u64));
            self.backend.search_filter(query, k, ef_search, &filter)
        };
        Ok(neighbours
            .into_iter()
            .map(|n| VectorHit {
                id: n.d_id as u64,
                distance: n.distance,
            })
            .collect())
    }

    /// Rebuilds the graph from scratch over the live embedding arena,
    /// physically dropping every tombstoned point. Uses the HNSW config
    /// this engine was constructed or loaded with.
    pub fn compact(&mut self) -> Result<()> {
        let backend = HnswBackend::build(self.distance, &self.config);
        if !self.embeddings.is_empty() {
            let data: Vec<(&Vec<f32>, usize)> =
                self.embeddings.iter().map(|(id, v)| (v, *id as usize)).collect();
            backend.parallel_insert(&data);
        }
        self.backend = backend;
        self.deleted.clear();
        Ok(())
    }

    /// Writes `<dir>/<basename>.data` (embeddings) and
    /// `<dir>/<basename>.graph` (construction parameters).
    pub fn save(&self, dir: &Path, basename: &str) -> Result<()> {
        std::fs::create_dir_all(dir)?;
        let data = PersistedEmbeddings {
            entries: self.embeddings.iter().map(|(id, v)| (*id, v.clone())).collect(),
        };
        let meta = PersistedGraphMeta {
            dimension: self.dimension,
            distance: self.distance,
            config: self.config,
        };
        write_json(&dir.join(format!("{basename}.data")), &data)?;
        write_json(&dir.join(format!("{basename}.graph")), &meta)?;
        log::info!(
            "saved vector engine to {} ({} live vectors)",
            dir.display(),
            self.embeddings.len()
        );
        Ok(())
    }

    /// Reopens an engine previously written by `save`, rebuilding the
    /// graph by reinserting every persisted embedding.
    pub fn load(dir: &Path, basename: &str) -> Result<Self> {
        let meta: PersistedGraphMeta = read_json(&dir.join(format!("{basename}.graph")))?;
        let data: PersistedEmbeddings = read_json(&dir.join(format!("{basename}.data")))?;

        let mut engine = Self::new(meta.dimension, meta.distance, meta.config);
        if !data.entries.is_empty() {
            engine.insert_batch(&data.entries)?;
        }
        Ok(engine)
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = std::fs::read(path)?;
    let value = serde_json::from_slice(&bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    Ok(value)
}
