//! Thin wrapper over a `tantivy` index implementing the lexical engine
//! contract of §6: `new_with_schema`/`open`, `index_doc(s)`, `commit`,
//! `delete_doc`, `get_doc`, `get_docs_by_ids`, `search_dsl`, `docs_count`,
//! `clear_index`.
//!
//! Segment layout, BM25 scoring, and tokenization are `tantivy`'s problem
//! (out of scope per §1); this module only adapts between `DataValue`
//! field lists and `tantivy::TantivyDocument`.

use std::path::{Path, PathBuf};

use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::{FieldType, IndexRecordOption, Schema as TantivySchema, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument, Term};

use crate::document::DataValue;
use crate::error::{HybridError, Result};
use crate::lexical::dsl::{DslQuery, extract_doc_id};
use crate::schema::DOC_ID_FIELD;

pub const LEXICAL_DIR: &str = "tantivy";

/// A single scored hit from `search_dsl`.
#[derive(Debug, Clone)]
pub struct LexicalHit {
    pub doc_id: u64,
    pub score: f32,
    pub fields: Vec<(String, DataValue)>,
}

/// The lexical (BM25) half of a `HybridIndex`.
pub struct LexicalEngine {
    index: Index,
    writer: IndexWriter,
    reader: IndexReader,
    schema: TantivySchema,
}

impl LexicalEngine {
    const WRITER_HEAP_BYTES: usize = 50_000_000;

    /// Creates a brand-new lexical index at `<dir>/tantivy` from `schema`.
    pub fn create(dir: &Path, schema: TantivySchema) -> Result<Self> {
        let lexical_dir = Self::prepare_dir(dir)?;
        let index = Index::create_in_dir(&lexical_dir, schema.clone())?;
        Self::from_index(index, schema)
    }

    /// Reopens an existing lexical index at `<dir>/tantivy`.
    pub fn open(dir: &Path) -> Result<Self> {
        let lexical_dir = dir.join(LEXICAL_DIR);
        let index = Index::open_in_dir(&lexical_dir)?;
        let schema = index.schema();
        Self::from_index(index, schema)
    }

    fn prepare_dir(dir: &Path) -> Result<PathBuf> {
        let lexical_dir = dir.join(LEXICAL_DIR);
        std::fs::create_dir_all(&lexical_dir)?;
        Ok(lexical_dir)
    }

    fn from_index(index: Index, schema: TantivySchema) -> Result<Self> {
        let writer = index.writer(Self::WRITER_HEAP_BYTES)?;
        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(Self {
            index,
            writer,
            reader,
            schema,
        })
    }

    pub fn schema(&self) -> &TantivySchema {
        &self.schema
    }

    /// Indexes one document. `fields` must already include `(__doc_id,
    /// U64(docId))`, per the core's insert protocol (§4.3 step 3).
    pub fn index_doc(&mut self, fields: &[(String, DataValue)]) -> Result<()> {
        let doc = self.to_tantivy_doc(fields)?;
        self.writer.add_document(doc)?;
        Ok(())
    }

    pub fn index_docs(&mut self, docs: &[Vec<(String, DataValue)>]) -> Result<()> {
        for fields in docs {
            self.index_doc(fields)?;
        }
        Ok(())
    }

    /// Commits pending writes and makes them visible to the reader.
    pub fn commit(&mut self) -> Result<()> {
        self.writer.commit()?;
        self.reader.reload()?;
        Ok(())
    }

    /// Deletes every document whose `__doc_id` matches `doc_id`, and
    /// commits immediately so the deletion is visible to subsequent
    /// `get`/`search` calls regardless of whether the caller persists the
    /// ANN side — see DESIGN.md's resolution of the delete/persist
    /// asymmetry in §7.
    pub fn delete_doc(&mut self, doc_id: u64) -> Result<()> {
        let field = self.schema.get_field(DOC_ID_FIELD)?;
        let term = Term::from_field_u64(field, doc_id);
        self.writer.delete_term(term);
        self.commit()
    }

    /// Looks up a document by an exact term match on `field = value`,
    /// returning its `__doc_id` alongside its decoded fields.
    ///
    /// Distinguishes "no document matches" (`Ok(None)`) from "a document
    /// matches but its `__doc_id` is unexpectedly absent", which fails with
    /// `MissingDocId` rather than being treated as a miss (§4.3/§7).
    pub fn get_doc(
        &self,
        field: &str,
        value: &DataValue,
    ) -> Result<Option<(u64, Vec<(String, DataValue)>)>> {
        let f = self.schema.get_field(field)?;
        let term = match value {
            DataValue::Text(s) => Term::from_field_text(f, s),
            DataValue::U64(v) => Term::from_field_u64(f, *v),
            DataValue::I64(v) => Term::from_field_i64(f, *v),
            DataValue::Bool(b) => Term::from_field_bool(f, *b),
            _ => return Ok(None),
        };
        let query = TermQuery::new(term, IndexRecordOption::Basic);
        let searcher = self.reader.searcher();
        let top = searcher.search(&query, &TopDocs::with_limit(1))?;
        match top.first() {
            Some((_score, addr)) => {
                let doc: TantivyDocument = searcher.doc(*addr)?;
                let doc_id = extract_doc_id(&self.schema, &doc).ok_or(HybridError::MissingDocId)?;
                Ok(Some((doc_id, self.from_tantivy_doc(&doc))))
            }
            None => Ok(None),
        }
    }

    /// Looks up a document by its internal `__doc_id`.
    pub fn get_doc_by_doc_id(&self, doc_id: u64) -> Result<Option<Vec<(String, DataValue)>>> {
        let hits = self.search_dsl(
            &DslQuery::TermSet {
                field: DOC_ID_FIELD.to_string(),
                values: vec![doc_id],
            },
            1,
            0,
        )?;
        Ok(hits.into_iter().next().map(|h| h.fields))
    }

    /// Fetches a batch of documents by their `__doc_id`s, in no particular
    /// order. Missing ids are simply absent from the result.
    pub fn get_docs_by_ids(&self, ids: &[u64]) -> Result<Vec<Vec<(String, DataValue)>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let dsl = DslQuery::TermSet {
            field: DOC_ID_FIELD.to_string(),
            values: ids.to_vec(),
        };
        let hits = self.search_dsl(&dsl, ids.len(), 0)?;
        Ok(hits.into_iter().map(|h| h.fields).collect())
    }

    /// Executes a compiled DSL query and hydrates the top `limit` hits
    /// after skipping `offset`.
    pub fn search_dsl(&self, dsl: &DslQuery, limit: usize, offset: usize) -> Result<Vec<LexicalHit>> {
        let query = dsl.compile(&self.schema)?;
        let searcher = self.reader.searcher();
        let fetch = limit.saturating_add(offset).max(1);
        let top = searcher.search(&*query, &TopDocs::with_limit(fetch))?;
        let mut hits = Vec::with_capacity(top.len().saturating_sub(offset));
        for (score, addr) in top.into_iter().skip(offset) {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let Some(doc_id) = extract_doc_id(&self.schema, &doc) else {
                continue;
            };
            hits.push(LexicalHit {
                doc_id,
                score,
                fields: self.from_tantivy_doc(&doc),
            });
        }
        Ok(hits)
    }

    pub fn docs_count(&self) -> u64 {
        self.reader.searcher().num_docs()
    }

    /// Truncates the lexical index. The ANN side is reset separately by
    /// the core (§4.3 `clear`).
    pub fn clear_index(&mut self) -> Result<()> {
        self.writer.delete_all_documents()?;
        self.commit()
    }

    fn to_tantivy_doc(&self, fields: &[(String, DataValue)]) -> Result<TantivyDocument> {
        let mut doc = TantivyDocument::default();
        for (name, value) in fields {
            let field = self.schema.get_field(name)?;
            match value {
                DataValue::Text(s) => doc.add_text(field, s),
                DataValue::Bool(b) => doc.add_bool(field, *b),
                DataValue::U64(v) => doc.add_u64(field, *v),
                DataValue::I64(v) => doc.add_i64(field, *v),
                DataValue::F64(v) => doc.add_f64(field, *v),
                DataValue::Date(d) => {
                    doc.add_date(field, tantivy::DateTime::from_timestamp_secs(d.timestamp()))
                }
                DataValue::Bytes(b) => doc.add_bytes(field, b.clone()),
                DataValue::Facet(path) => {
                    doc.add_facet(field, tantivy::schema::Facet::from(path))
                }
            }
        }
        Ok(doc)
    }

    fn from_tantivy_doc(&self, doc: &TantivyDocument) -> Vec<(String, DataValue)> {
        let mut fields = Vec::new();
        for (field, entry) in self.schema.fields() {
            let name = entry.name();
            if name == DOC_ID_FIELD {
                continue;
            }
            let Some(value) = doc.get_first(field) else {
                continue;
            };
            let data_value = match entry.field_type() {
                FieldType::Str(_) => value.as_str().map(|s| DataValue::Text(s.to_string())),
                FieldType::Bool(_) => value.as_bool().map(DataValue::Bool),
                FieldType::U64(_) => value.as_u64().map(DataValue::U64),
                FieldType::I64(_) => value.as_i64().map(DataValue::I64),
                FieldType::F64(_) => value.as_f64().map(DataValue::F64),
                FieldType::Date(_) => value
                    .as_datetime()
                    .map(|d| DataValue::Date(chrono::DateTime::from_timestamp_micros(d.into_timestamp_micros()).unwrap_or_default())),
                FieldType::Bytes(_) => value.as_bytes().map(|b| DataValue::Bytes(b.to_vec())),
                FieldType::Facet(_) => value.as_facet().map(|f| DataValue::Facet(f.to_path_string())),
                _ => None,
            };
            if let Some(v) = data_value {
                fields.push((name.to_string(), v));
            }
        }
        fields
    }
}
