//! `HybridIndex`: the public facade coordinating the lexical and vector
//! engines per §4.3. All mutation and search is serialized through a
//! single `tokio::sync::Mutex`, following the teacher's actor-style
//! serialization of its unified `Engine` — see §5.

use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use tokio::sync::Mutex;

use crate::config::HybridIndexConfig;
use crate::document::{DataValue, HybridDocument};
use crate::error::{HybridError, Result};
use crate::lexical::dsl::DslQuery;
use crate::lexical::engine::LexicalEngine;
use crate::meta::{CURRENT_VERSION, HybridIndexMeta};
use crate::query::{self, HybridTextQuery};
use crate::result::HybridSearchResult;
use crate::rrf::{self, RankedList};
use crate::schema::DOC_ID_FIELD;
use crate::vector::VectorEngine;

const VECTOR_BASENAME: &str = "hnsw";
const DEFAULT_OVERFETCH_MULTIPLIER: usize = 3;
const DEFAULT_RRF_K: f64 = 60.0;
const DEFAULT_WEIGHT: f64 = 1.0;

struct Inner {
    dir: PathBuf,
    lexical: LexicalEngine,
    vector: VectorEngine,
    meta: HybridIndexMeta,
}

/// A hybrid lexical + vector index over documents of type `D`.
pub struct HybridIndex<D: HybridDocument> {
    inner: Mutex<Inner>,
    _marker: PhantomData<fn() -> D>,
}

impl<D: HybridDocument> HybridIndex<D> {
    /// Creates a brand-new index at `dir`. Fails `IndexAlreadyExists` if a
    /// metadata sidecar is already present there.
    pub fn create(
        dir: &Path,
        config: HybridIndexConfig,
        primary_id_field: Option<&str>,
    ) -> Result<Self> {
        let meta_path = HybridIndexMeta::path(dir);
        if meta_path.exists() {
            return Err(HybridError::IndexAlreadyExists(meta_path));
        }

        let schema = D::schema();
        let id_fields = schema.id_field_names();
        if id_fields.is_empty() {
            return Err(HybridError::MissingIdField);
        }
        let primary = resolve_primary_id_field(&id_fields, primary_id_field)?;

        std::fs::create_dir_all(dir)?;
        let lexical = LexicalEngine::create(dir, schema.build_lexical_schema())?;
        let vector = VectorEngine::new(config.dimension, config.distance, config.hnsw);

        let meta = HybridIndexMeta {
            version: CURRENT_VERSION,
            embedding_dimension: config.dimension as u32,
            distance_type: config.distance,
            hnsw_config: config.hnsw,
            next_doc_id: 0,
            primary_id_field: primary.to_string(),
            schema_fingerprint: schema.fingerprint(),
        };
        meta.save(dir)?;
        log::info!("created hybrid index at {} (0 docs)", dir.display());

        Ok(Self {
            inner: Mutex::new(Inner {
                dir: dir.to_path_buf(),
                lexical,
                vector,
                meta,
            }),
            _marker: PhantomData,
        })
    }

    /// Reopens an index previously written by `create`/`commit`.
    pub fn load(dir: &Path, primary_id_field: Option<&str>) -> Result<Self> {
        let mut meta = HybridIndexMeta::load(dir)?;
        let schema = D::schema();
        if meta.schema_fingerprint != schema.fingerprint() {
            return Err(HybridError::MetadataCorrupt(
                "schema fingerprint does not match the stored index".to_string(),
            ));
        }

        if let Some(primary) = primary_id_field {
            let id_fields = schema.id_field_names();
            if !id_fields.contains(&primary) {
                return Err(HybridError::InvalidPrimaryIdField(primary.to_string()));
            }
            meta.primary_id_field = primary.to_string();
        }

        let lexical = LexicalEngine::open(dir)?;
        let vector = VectorEngine::load(dir, VECTOR_BASENAME)?;
        log::info!(
            "loaded hybrid index from {} ({} docs)",
            dir.display(),
            lexical.docs_count()
        );

        Ok(Self {
            inner: Mutex::new(Inner {
                dir: dir.to_path_buf(),
                lexical,
                vector,
                meta,
            }),
            _marker: PhantomData,
        })
    }

    /// Inserts `doc` with its `embedding`, returning the allocated docId.
    /// Not durable until the next `commit`.
    pub async fn add(&self, doc: &D, embedding: &[f32]) -> Result<u64> {
        let mut inner = self.inner.lock().await;
        inner.validate_embedding(embedding)?;
        let doc_id = inner.meta.next_doc_id;
        inner.meta.next_doc_id += 1;

        inner.vector.insert(doc_id, embedding)?;
        if let Err(err) = inner.index_lexical_doc(doc_id, doc) {
            inner.vector.delete(doc_id);
            return Err(err);
        }
        log::debug!("added doc_id={doc_id}");
        Ok(doc_id)
    }

    /// Inserts a batch of `(doc, embedding)` pairs, allocating a
    /// contiguous docId range. Empty input is a no-op.
    pub async fn add_batch(&self, items: &[(D, Vec<f32>)]) -> Result<Vec<u64>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut inner = self.inner.lock().await;
        for (_, embedding) in items {
            inner.validate_embedding(embedding)?;
        }

        let start = inner.meta.next_doc_id;
        let doc_ids: Vec<u64> = (start..start + items.len() as u64).collect();
        inner.meta.next_doc_id += items.len() as u64;

        let vectors: Vec<(u64, Vec<f32>)> = doc_ids
            .iter()
            .zip(items.iter())
            .map(|(id, (_, embedding))| (*id, embedding.clone()))
            .collect();
        inner.vector.insert_batch(&vectors)?;

        let docs: Vec<Vec<(String, DataValue)>> = doc_ids
            .iter()
            .zip(items.iter())
            .map(|(id, (doc, _))| to_lexical_fields(*id, doc))
            .collect();
        if let Err(err) = inner.lexical.index_docs(&docs) {
            inner.vector.delete_batch(&doc_ids);
            return Err(err);
        }

        log::debug!(
            "added {} docs, doc_ids={}..={}",
            doc_ids.len(),
            doc_ids[0],
            doc_ids[doc_ids.len() - 1]
        );
        Ok(doc_ids)
    }

    /// `add` immediately followed by `commit`.
    pub async fn index(&self, doc: &D, embedding: &[f32]) -> Result<u64> {
        let doc_id = self.add(doc, embedding).await?;
        self.commit().await?;
        Ok(doc_id)
    }

    /// `add_batch` immediately followed by `commit`.
    pub async fn index_batch(&self, items: &[(D, Vec<f32>)]) -> Result<Vec<u64>> {
        let doc_ids = self.add_batch(items).await?;
        self.commit().await?;
        Ok(doc_ids)
    }

    /// Commits the lexical index, saves the ANN index, switches it into
    /// searching mode, and persists metadata.
    pub async fn commit(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.lexical.commit()?;
        inner.vector.save(&inner.dir, VECTOR_BASENAME)?;
        inner.vector.set_searching_mode(true);
        inner.meta.save(&inner.dir)?;
        log::info!(
            "committed hybrid index at {} ({} docs)",
            inner.dir.display(),
            inner.lexical.docs_count()
        );
        Ok(())
    }

    /// Deletes a document by its internal docId.
    pub async fn delete(&self, doc_id: u64, persist: bool) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.delete_doc_id(doc_id, persist)
    }

    /// Deletes a document by looking it up via `(field, value)`. Silently
    /// returns if no document matches; fails `MissingDocId` if a match is
    /// found but its internal docId is unexpectedly absent.
    pub async fn delete_by_field(
        &self,
        field: D::Field,
        value: impl Into<DataValue>,
        persist: bool,
    ) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let name = D::field_name(field);
        let value = value.into();
        let Some((doc_id, _)) = inner.lexical.get_doc(name, &value)? else {
            return Ok(());
        };
        inner.delete_doc_id(doc_id, persist)
    }

    /// Point lookup by internal docId.
    pub async fn get(&self, doc_id: u64) -> Result<Option<D>> {
        let inner = self.inner.lock().await;
        let Some(fields) = inner.lexical.get_doc_by_doc_id(doc_id)? else {
            return Ok(None);
        };
        Ok(D::from_fields(&fields))
    }

    /// Point lookup by `(field, value)`.
    pub async fn get_by_field(&self, field: D::Field, value: impl Into<DataValue>) -> Result<Option<D>> {
        let inner = self.inner.lock().await;
        let name = D::field_name(field);
        let Some((_, fields)) = inner.lexical.get_doc(name, &value.into())? else {
            return Ok(None);
        };
        Ok(D::from_fields(&fields))
    }

    /// Full-text search over the lexical engine.
    pub async fn search_text(
        &self,
        text_query: &HybridTextQuery<D::Field>,
        filter: Option<DslQuery>,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<HybridSearchResult<D>>> {
        let inner = self.inner.lock().await;
        let base = query::translate::<D>(text_query);
        let dsl = query::compose_with_filter(base, filter);
        let hits = inner.lexical.search_dsl(&dsl, limit, offset)?;
        Ok(hydrate(hits.into_iter().map(|h| (h.doc_id, h.score, h.fields))))
    }

    /// ANN search over the vector engine, optionally intersected with a
    /// lexical filter.
    pub async fn search_vector(
        &self,
        embedding: &[f32],
        filter: Option<DslQuery>,
        limit: usize,
        offset: usize,
        ef_search: usize,
        overfetch_multiplier: usize,
    ) -> Result<Vec<HybridSearchResult<D>>> {
        let mut inner = self.inner.lock().await;
        inner.validate_embedding(embedding)?;

        let overfetch = overfetch_multiplier.max(1);
        let desired = limit.saturating_add(offset).max(1);
        let fetch_limit = desired.saturating_mul(overfetch).max(1);
        let effective_ef = ef_search.max(fetch_limit);

        inner.vector.set_searching_mode(true);
        let candidates = inner.vector.search(embedding, fetch_limit, effective_ef)?;
        let candidate_ids: Vec<u64> = candidates.iter().map(|h| h.id).collect();
        let distances: std::collections::HashMap<u64, f32> =
            candidates.iter().map(|h| (h.id, h.distance)).collect();

        let ordered_ids: Vec<u64> = if let Some(filter) = filter {
            let dsl = DslQuery::TermSet {
                field: DOC_ID_FIELD.to_string(),
                values: candidate_ids.clone(),
            }
            .and(filter);
            let hits = inner.lexical.search_dsl(&dsl, candidate_ids.len().max(1), 0)?;
            let allowed: std::collections::HashSet<u64> = hits.iter().map(|h| h.doc_id).collect();
            candidate_ids
                .into_iter()
                .filter(|id| allowed.contains(id))
                .collect()
        } else {
            candidate_ids
        };

        let page: Vec<u64> = ordered_ids.into_iter().skip(offset).take(limit).collect();
        let fields = inner.lexical.get_docs_by_ids(&page)?;
        let mut results = Vec::with_capacity(page.len());
        for (doc_id, doc_fields) in page.into_iter().zip(fields.into_iter()) {
            if let Some(document) = D::from_fields(&doc_fields) {
                let distance = distances.get(&doc_id).copied().unwrap_or(f32::MAX);
                results.push(HybridSearchResult::new(doc_id, 1.0 / (1.0 + distance), document));
            } else {
                log::warn!("dropping unhydratable hit doc_id={doc_id} in search_vector");
            }
        }
        Ok(results)
    }

    /// Fuses lexical and vector search via Reciprocal Rank Fusion.
    #[allow(clippy::too_many_arguments)]
    pub async fn search_hybrid(
        &self,
        text_query: &HybridTextQuery<D::Field>,
        embedding: &[f32],
        filter: Option<DslQuery>,
        limit: usize,
        offset: usize,
        ef_search: usize,
        rrf_k: f64,
        text_weight: f64,
        vector_weight: f64,
        overfetch_multiplier: usize,
    ) -> Result<Vec<HybridSearchResult<D>>> {
        let mut inner = self.inner.lock().await;
        inner.validate_embedding(embedding)?;

        let overfetch = overfetch_multiplier.max(1);
        let fetch_limit = limit.saturating_add(offset).max(1).saturating_mul(overfetch).max(1);

        let base = query::translate::<D>(text_query);
        let text_dsl = query::compose_with_filter(base, filter.clone());
        let text_hits = inner.lexical.search_dsl(&text_dsl, fetch_limit, 0)?;
        let text_ids: Vec<u64> = text_hits.iter().map(|h| h.doc_id).collect();

        inner.vector.set_searching_mode(true);
        let vector_candidates = inner
            .vector
            .search(embedding, fetch_limit, ef_search.max(fetch_limit))?;
        let vector_ids: Vec<u64> = if let Some(filter) = filter {
            let candidate_ids: Vec<u64> = vector_candidates.iter().map(|h| h.id).collect();
            let dsl = DslQuery::TermSet {
                field: DOC_ID_FIELD.to_string(),
                values: candidate_ids.clone(),
            }
            .and(filter);
            let hits = inner.lexical.search_dsl(&dsl, candidate_ids.len().max(1), 0)?;
            let allowed: std::collections::HashSet<u64> = hits.iter().map(|h| h.doc_id).collect();
            candidate_ids.into_iter().filter(|id| allowed.contains(id)).collect()
        } else {
            vector_candidates.iter().map(|h| h.id).collect()
        };

        let fused = rrf::reciprocal_rank_fusion(
            &[
                RankedList {
                    doc_ids: &text_ids,
                    weight: text_weight,
                },
                RankedList {
                    doc_ids: &vector_ids,
                    weight: vector_weight,
                },
            ],
            rrf_k,
        );

        let page: Vec<_> = fused.into_iter().skip(offset).take(limit).collect();
        let ids: Vec<u64> = page.iter().map(|h| h.doc_id).collect();
        let fields = inner.lexical.get_docs_by_ids(&ids)?;
        let field_map: std::collections::HashMap<u64, Vec<(String, DataValue)>> = ids
            .iter()
            .copied()
            .zip(fields)
            .collect();

        let mut results = Vec::with_capacity(page.len());
        for hit in page {
            match field_map.get(&hit.doc_id).map(|f| D::from_fields(f)) {
                Some(Some(document)) => {
                    results.push(HybridSearchResult::new(hit.doc_id, hit.score as f32, document));
                }
                _ => {
                    log::warn!("dropping unhydratable hit doc_id={} in search_hybrid", hit.doc_id);
                }
            }
        }
        Ok(results)
    }

    /// ANN-side compaction, followed by save. The lexical segment merger
    /// is left to `tantivy`.
    pub async fn compact(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.vector.compact()?;
        inner.vector.save(&inner.dir, VECTOR_BASENAME)?;
        log::info!(
            "compacted hybrid index at {} ({} live vectors)",
            inner.dir.display(),
            inner.vector.len()
        );
        Ok(())
    }

    /// Truncates both engines and resets `nextDocId`.
    pub async fn clear(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.lexical.clear_index()?;
        inner.vector = VectorEngine::new(
            inner.meta.embedding_dimension as usize,
            inner.meta.distance_type,
            inner.meta.hnsw_config,
        );
        inner.meta.next_doc_id = 0;
        let dir = inner.dir.clone();
        inner.meta.save(&dir)?;
        log::info!("cleared hybrid index at {} (0 docs)", dir.display());
        Ok(())
    }

    /// Number of documents currently visible in the lexical index.
    pub async fn count(&self) -> u64 {
        let inner = self.inner.lock().await;
        inner.lexical.docs_count()
    }
}

impl Inner {
    fn validate_embedding(&self, embedding: &[f32]) -> Result<()> {
        let expected = self.meta.embedding_dimension as usize;
        if embedding.len() != expected {
            return Err(HybridError::DimensionMismatch {
                expected,
                got: embedding.len(),
            });
        }
        Ok(())
    }

    fn index_lexical_doc<D: HybridDocument>(&mut self, doc_id: u64, doc: &D) -> Result<()> {
        self.lexical.index_doc(&to_lexical_fields(doc_id, doc))
    }

    fn delete_doc_id(&mut self, doc_id: u64, persist: bool) -> Result<()> {
        self.lexical.delete_doc(doc_id)?;
        self.vector.delete(doc_id);
        if persist {
            self.vector.save(&self.dir, VECTOR_BASENAME)?;
            self.meta.save(&self.dir)?;
        }
        log::debug!("deleted doc_id={doc_id}");
        Ok(())
    }
}

fn to_lexical_fields<D: HybridDocument>(doc_id: u64, doc: &D) -> Vec<(String, DataValue)> {
    let mut fields: Vec<(String, DataValue)> = doc
        .to_fields()
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect();
    fields.push((DOC_ID_FIELD.to_string(), DataValue::U64(doc_id)));
    fields
}

fn hydrate<D: HybridDocument>(
    hits: impl Iterator<Item = (u64, f32, Vec<(String, DataValue)>)>,
) -> Vec<HybridSearchResult<D>> {
    hits.filter_map(|(doc_id, score, fields)| match D::from_fields(&fields) {
        Some(document) => Some(HybridSearchResult::new(doc_id, score, document)),
        None => {
            log::warn!("dropping unhydratable hit doc_id={doc_id} in search_text");
            None
        }
    })
    .collect()
}

fn resolve_primary_id_field<'a>(
    id_fields: &[&'a str],
    requested: Option<&str>,
) -> Result<&'a str> {
    match requested {
        Some(requested) => id_fields
            .iter()
            .find(|name| **name == requested)
            .copied()
            .ok_or_else(|| HybridError::InvalidPrimaryIdField(requested.to_string())),
        None => {
            if id_fields.len() > 1 {
                Err(HybridError::AmbiguousIdField(
                    id_fields.iter().map(|s| s.to_string()).collect(),
                ))
            } else {
                Ok(id_fields[0])
            }
        }
    }
}

/// Defaults mirroring the spec's named default arguments, for callers that
/// want `searchHybrid`'s defaults without spelling them out.
pub struct HybridSearchDefaults;

impl HybridSearchDefaults {
    pub const RRF_K: f64 = DEFAULT_RRF_K;
    pub const TEXT_WEIGHT: f64 = DEFAULT_WEIGHT;
    pub const VECTOR_WEIGHT: f64 = DEFAULT_WEIGHT;
    pub const OVERFETCH_MULTIPLIER: usize = DEFAULT_OVERFETCH_MULTIPLIER;
}
