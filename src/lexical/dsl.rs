//! A small query DSL that the core builds and the lexical engine compiles
//! to a `tantivy` query. This stands in for the "DSL compiler" the spec
//! treats as an external collaborator (§1) — the DSL shape (constructors
//! for `Term`, `TermSet`, `Boolean`, `QueryString`, `All`, plus `to_json`)
//! is the contract; compiling it to `tantivy::query` types is the minimal
//! adapter code this crate owns.

use serde::Serialize;
use serde_json::json;
use tantivy::Index;
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, QueryParser, TermSetQuery};
use tantivy::schema::{Field, Schema as TantivySchema, Value};
use tantivy::{Term, TantivyDocument};

use crate::document::DataValue;
use crate::error::{HybridError, Result};

/// A typed term value, used by `DslQuery::Term`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum TermValue {
    Text(String),
    Bool(bool),
    U64(u64),
    I64(i64),
}

impl From<&DataValue> for Option<TermValue> {
    fn from(value: &DataValue) -> Self {
        match value {
            DataValue::Text(s) => Some(TermValue::Text(s.clone())),
            DataValue::Bool(b) => Some(TermValue::Bool(*b)),
            DataValue::U64(v) => Some(TermValue::U64(*v)),
            DataValue::I64(v) => Some(TermValue::I64(*v)),
            _ => None,
        }
    }
}

/// A fuzzy-matchable default field for `QueryString`.
#[derive(Debug, Clone, Serialize)]
pub struct FuzzyField {
    pub field: String,
    pub prefix: bool,
    pub distance: u8,
    pub transpose_cost_one: bool,
}

/// The query DSL consumed by `LexicalEngine::search_dsl`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op")]
pub enum DslQuery {
    /// Matches every document. The translator's identity element.
    All,
    /// Exact-match a single field against a typed value.
    Term { field: String, value: TermValue },
    /// Matches `__doc_id` against any id in `values` — used to intersect
    /// ANN candidates with a lexical filter (§4.3 searchVector step 4).
    TermSet { field: String, values: Vec<u64> },
    /// Conjunction of sub-clauses, all of which must match.
    Boolean { must: Vec<DslQuery> },
    /// A free-text query string parsed against `default_fields`, with
    /// optional fuzzy matching on a subset of fields.
    QueryString {
        query: String,
        default_fields: Vec<String>,
        fuzzy_fields: Vec<FuzzyField>,
    },
}

impl DslQuery {
    pub fn is_match_all(&self) -> bool {
        matches!(self, DslQuery::All)
    }

    /// `MUST(self) AND MUST(other)`, collapsing to `other` if `self` is
    /// the identity (`All`) — the filter composition rule of §4.4.
    pub fn and(self, other: DslQuery) -> DslQuery {
        if self.is_match_all() {
            return other;
        }
        if other.is_match_all() {
            return self;
        }
        DslQuery::Boolean {
            must: vec![self, other],
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({"op": "All"}))
    }

    /// Compiles this DSL node into a `tantivy` query against `schema`.
    pub fn compile(&self, schema: &TantivySchema) -> Result<Box<dyn Query>> {
        match self {
            DslQuery::All => Ok(Box::new(AllQuery)),
            DslQuery::Term { field, value } => {
                let f = resolve_field(schema, field)?;
                let term = match value {
                    TermValue::Text(s) => Term::from_field_text(f, s),
                    TermValue::Bool(b) => Term::from_field_bool(f, *b),
                    TermValue::U64(v) => Term::from_field_u64(f, *v),
                    TermValue::I64(v) => Term::from_field_i64(f, *v),
                };
                Ok(Box::new(tantivy::query::TermQuery::new(
                    term,
                    tantivy::schema::IndexRecordOption::Basic,
                )))
            }
            DslQuery::TermSet { field, values } => {
                let f = resolve_field(schema, field)?;
                let terms = values.iter().map(|v| Term::from_field_u64(f, *v));
                Ok(Box::new(TermSetQuery::new(terms)))
            }
            DslQuery::Boolean { must } => {
                let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(must.len());
                for clause in must {
                    clauses.push((Occur::Must, clause.compile(schema)?));
                }
                Ok(Box::new(BooleanQuery::new(clauses)))
            }
            DslQuery::QueryString {
                query,
                default_fields,
                fuzzy_fields,
            } => {
                let fields: Vec<Field> = default_fields
                    .iter()
                    .map(|name| resolve_field(schema, name))
                    .collect::<Result<_>>()?;
                // QueryParser needs an Index handle only for its default
                // tokenizer manager lookups; building one in-memory over
                // the same schema is the documented way to parse queries
                // without a live index (e.g. for filter pre-composition).
                let index = Index::create_in_ram(schema.clone());
                let mut parser = QueryParser::for_index(&index, fields);
                for fuzzy in fuzzy_fields {
                    let f = resolve_field(schema, &fuzzy.field)?;
                    parser.set_field_fuzzy(f, fuzzy.prefix, fuzzy.distance, fuzzy.transpose_cost_one);
                }
                let parsed = parser.parse_query(query).map_err(|e| {
                    HybridError::Lexical(tantivy::TantivyError::InvalidArgument(e.to_string()))
                })?;
                Ok(parsed)
            }
        }
    }
}

fn resolve_field(schema: &TantivySchema, name: &str) -> Result<Field> {
    schema
        .get_field(name)
        .map_err(|_| HybridError::Lexical(tantivy::TantivyError::FieldNotFound(name.to_string())))
}

/// Extracts the `__doc_id` value from a stored tantivy document.
pub fn extract_doc_id(schema: &TantivySchema, doc: &TantivyDocument) -> Option<u64> {
    let field = schema.get_field(super::super::schema::DOC_ID_FIELD).ok()?;
    doc.get_first(field).and_then(|v| v.as_u64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tantivy::schema::{FAST, INDEXED, STORED, STRING, TEXT};

    fn test_schema() -> TantivySchema {
        let mut builder = TantivySchema::builder();
        builder.add_text_field("id", STRING | STORED);
        builder.add_text_field("title", TEXT | STORED);
        builder.add_bool_field("published", INDEXED | STORED | FAST);
        builder.add_u64_field(super::super::super::schema::DOC_ID_FIELD, INDEXED | STORED | FAST);
        builder.build()
    }

    #[test]
    fn and_with_match_all_collapses() {
        let filter = DslQuery::Term {
            field: "published".into(),
            value: TermValue::Bool(true),
        };
        let combined = DslQuery::All.and(filter.clone());
        assert!(matches!(combined, DslQuery::Term { .. }));
    }

    #[test]
    fn and_with_two_real_queries_wraps_boolean() {
        let a = DslQuery::Term {
            field: "published".into(),
            value: TermValue::Bool(true),
        };
        let b = DslQuery::TermSet {
            field: "__doc_id".into(),
            values: vec![1, 2, 3],
        };
        let combined = a.and(b);
        match combined {
            DslQuery::Boolean { must } => assert_eq!(must.len(), 2),
            _ => panic!("expected Boolean"),
        }
    }

    #[test]
    fn compiles_term_query_against_schema() {
        let schema = test_schema();
        let dsl = DslQuery::Term {
            field: "id".into(),
            value: TermValue::Text("swift-1".into()),
        };
        assert!(dsl.compile(&schema).is_ok());
    }

    #[test]
    fn compile_unknown_field_errors() {
        let schema = test_schema();
        let dsl = DslQuery::Term {
            field: "nope".into(),
            value: TermValue::Text("x".into()),
        };
        assert!(dsl.compile(&schema).is_err());
    }
}
