//! The JSON sidecar that persists everything needed to reopen a
//! `HybridIndex`: schema fingerprint, HNSW tuning, distance metric, the
//! next docId to allocate, and the designated primary ID field.
//!
//! `save` follows the teacher's atomic-replace convention for small
//! metadata files (write to a `.tmp` sibling, then `rename` over the
//! target) so a crash mid-write never leaves a half-written sidecar.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::{DistanceType, HnswConfig};
use crate::error::{HybridError, Result};

pub const META_FILENAME: &str = "hybrid.meta.json";
pub const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridIndexMeta {
    pub version: u32,
    pub embedding_dimension: u32,
    pub distance_type: DistanceType,
    pub hnsw_config: HnswConfig,
    pub next_doc_id: u64,
    pub primary_id_field: String,
    pub schema_fingerprint: String,
}

impl HybridIndexMeta {
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(META_FILENAME)
    }

    /// Atomically writes `meta` as JSON to `<dir>/hybrid.meta.json`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let final_path = Self::path(dir);
        let tmp_path = dir.join(format!("{META_FILENAME}.tmp"));
        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| HybridError::MetadataCorrupt(e.to_string()))?;
        std::fs::write(&tmp_path, json)?;
        std::fs::rename(&tmp_path, &final_path)?;
        log::debug!(
            "persisted hybrid index metadata at {} (next_doc_id={})",
            final_path.display(),
            self.next_doc_id
        );
        Ok(())
    }

    /// Reads and decodes the sidecar. `MetadataMissing` if absent,
    /// `MetadataCorrupt` on decode failure or version mismatch.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::path(dir);
        if !path.exists() {
            return Err(HybridError::MetadataMissing(path));
        }
        let bytes = std::fs::read(&path)?;
        let meta: HybridIndexMeta = serde_json::from_slice(&bytes)
            .map_err(|e| HybridError::MetadataCorrupt(e.to_string()))?;
        if meta.version != CURRENT_VERSION {
            return Err(HybridError::MetadataCorrupt(format!(
                "unsupported metadata version {} (expected {})",
                meta.version, CURRENT_VERSION
            )));
        }
        Ok(meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HnswConfig;

    fn sample_meta() -> HybridIndexMeta {
        HybridIndexMeta {
            version: CURRENT_VERSION,
            embedding_dimension: 128,
            distance_type: DistanceType::Cosine,
            hnsw_config: HnswConfig::default(),
            next_doc_id: 4,
            primary_id_field: "id".to_string(),
            schema_fingerprint: "id:id|title:text".to_string(),
        }
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let meta = sample_meta();
        meta.save(dir.path()).unwrap();
        let loaded = HybridIndexMeta::load(dir.path()).unwrap();
        assert_eq!(loaded.next_doc_id, meta.next_doc_id);
        assert_eq!(loaded.schema_fingerprint, meta.schema_fingerprint);
    }

    #[test]
    fn missing_sidecar_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = HybridIndexMeta::load(dir.path()).unwrap_err();
        assert!(matches!(err, HybridError::MetadataMissing(_)));
    }

    #[test]
    fn corrupt_sidecar_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(HybridIndexMeta::path(dir.path()), b"not json").unwrap();
        let err = HybridIndexMeta::load(dir.path()).unwrap_err();
        assert!(matches!(err, HybridError::MetadataCorrupt(_)));
    }

    #[test]
    fn version_mismatch_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = sample_meta();
        meta.version = 99;
        meta.save(dir.path()).unwrap();
        let err = HybridIndexMeta::load(dir.path()).unwrap_err();
        assert!(matches!(err, HybridError::MetadataCorrupt(_)));
    }
}
