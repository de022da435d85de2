//! Query Translator: turns a user-facing [`HybridTextQuery`] into the
//! lexical DSL, and implements the filter composition rule shared by all
//! three `HybridIndex` search modes.

use std::collections::HashSet;

use crate::document::HybridDocument;
use crate::lexical::dsl::{DslQuery, FuzzyField};

/// One fuzzy-matchable default field, keyed by a document's typed field
/// tag rather than its string name.
#[derive(Debug, Clone)]
pub struct FuzzyFieldSpec<F> {
    pub field: F,
    pub prefix: bool,
    pub distance: u8,
    pub transpose_cost_one: bool,
}

/// A user-facing free-text query against a `HybridDocument` type `D`.
#[derive(Debug, Clone)]
pub struct HybridTextQuery<F> {
    pub query: String,
    pub default_fields: Vec<F>,
    pub fuzzy_fields: Vec<FuzzyFieldSpec<F>>,
}

impl<F> HybridTextQuery<F> {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            default_fields: Vec::new(),
            fuzzy_fields: Vec::new(),
        }
    }
}

/// Translates `query` into a DSL node per §4.4: an empty (after trimming)
/// query string becomes `MATCH_ALL`; otherwise a `QueryString` node is
/// emitted against `default_fields` (or, if empty, every text field of
/// `D` minus its id fields).
pub fn translate<D: HybridDocument>(query: &HybridTextQuery<D::Field>) -> DslQuery {
    let trimmed = query.query.trim();
    if trimmed.is_empty() {
        return DslQuery::All;
    }

    let default_fields = if !query.default_fields.is_empty() {
        query
            .default_fields
            .iter()
            .map(|f| D::field_name(*f).to_string())
            .collect()
    } else {
        fallback_text_fields::<D>()
    };

    let fuzzy_fields = query
        .fuzzy_fields
        .iter()
        .map(|f| FuzzyField {
            field: D::field_name(f.field).to_string(),
            prefix: f.prefix,
            distance: f.distance,
            transpose_cost_one: f.transpose_cost_one,
        })
        .collect();

    DslQuery::QueryString {
        query: trimmed.to_string(),
        default_fields,
        fuzzy_fields,
    }
}

fn fallback_text_fields<D: HybridDocument>() -> Vec<String> {
    let schema = D::schema();
    let id_fields: HashSet<&str> = schema.id_field_names().into_iter().collect();
    schema
        .text_field_names()
        .into_iter()
        .filter(|name| !id_fields.contains(name))
        .map(str::to_string)
        .collect()
}

/// The filter composition rule shared by `searchText`, `searchVector`,
/// and `searchHybrid`: `MUST(base) AND MUST(filter)`, collapsing to
/// whichever side is `MATCH_ALL`.
pub fn compose_with_filter(base: DslQuery, filter: Option<DslQuery>) -> DslQuery {
    match filter {
        Some(f) => base.and(f),
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DataValue;
    use crate::schema::{FieldRole, Schema};
    use std::sync::OnceLock;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum TestField {
        Id,
        Title,
        Body,
    }

    struct TestDoc;

    impl HybridDocument for TestDoc {
        type Field = TestField;

        fn schema() -> &'static Schema {
            static SCHEMA: OnceLock<Schema> = OnceLock::new();
            SCHEMA.get_or_init(|| {
                Schema::builder()
                    .field("id", FieldRole::Id)
                    .field("title", FieldRole::Text)
                    .field("body", FieldRole::Text)
                    .build()
            })
        }

        fn field_name(field: Self::Field) -> &'static str {
            match field {
                TestField::Id => "id",
                TestField::Title => "title",
                TestField::Body => "body",
            }
        }

        fn to_fields(&self) -> Vec<(&'static str, DataValue)> {
            Vec::new()
        }

        fn from_fields(_fields: &[(String, DataValue)]) -> Option<Self> {
            None
        }
    }

    #[test]
    fn blank_query_is_match_all() {
        let q = HybridTextQuery::<TestField>::new("   ");
        assert!(translate::<TestDoc>(&q).is_match_all());
    }

    #[test]
    fn falls_back_to_all_text_fields_minus_id() {
        let q = HybridTextQuery::<TestField>::new("swift actors");
        match translate::<TestDoc>(&q) {
            DslQuery::QueryString { default_fields, .. } => {
                assert_eq!(default_fields, vec!["title".to_string(), "body".to_string()]);
            }
            other => panic!("expected QueryString, got {other:?}"),
        }
    }

    #[test]
    fn explicit_default_fields_are_honored() {
        let q = HybridTextQuery {
            query: "swift".to_string(),
            default_fields: vec![TestField::Title],
            fuzzy_fields: Vec::new(),
        };
        match translate::<TestDoc>(&q) {
            DslQuery::QueryString { default_fields, .. } => {
                assert_eq!(default_fields, vec!["title".to_string()]);
            }
            other => panic!("expected QueryString, got {other:?}"),
        }
    }

    #[test]
    fn compose_with_filter_collapses_match_all_base() {
        let filter = DslQuery::Term {
            field: "published".into(),
            value: crate::lexical::dsl::TermValue::Bool(true),
        };
        let composed = compose_with_filter(DslQuery::All, Some(filter.clone()));
        assert!(matches!(composed, DslQuery::Term { .. }));
    }

    #[test]
    fn compose_with_filter_wraps_boolean_when_both_present() {
        let base = DslQuery::QueryString {
            query: "swift".into(),
            default_fields: vec!["title".into()],
            fuzzy_fields: Vec::new(),
        };
        let filter = DslQuery::Term {
            field: "published".into(),
            value: crate::lexical::dsl::TermValue::Bool(true),
        };
        let composed = compose_with_filter(base, Some(filter));
        assert!(matches!(composed, DslQuery::Boolean { .. }));
    }
}
