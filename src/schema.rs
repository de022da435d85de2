//! Schema derivation for user document types.
//!
//! The teacher's `Schema`/`FieldOption` pair (`engine/schema.rs`) is built at
//! runtime from a dynamic field map. Here the schema is still a runtime value
//! (we need it to build a `tantivy::schema::Schema` and to fingerprint it),
//! but it is derived from a compile-time known type `D: HybridDocument`
//! instead of reflection over a loosely-typed document — see the design
//! note on tagged document roles.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tantivy::schema::{
    FAST, INDEXED, STORED, STRING, Schema as TantivySchema, SchemaBuilder as TantivySchemaBuilder,
    TEXT,
};

/// The reserved lexical field that joins a lexical document to its ANN
/// counterpart. Never appears in a user `HybridDocument::schema()`.
pub const DOC_ID_FIELD: &str = "__doc_id";

/// Closed set of field roles a `HybridDocument` field can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldRole {
    Id,
    Text,
    Bool,
    U64,
    I64,
    F64,
    Date,
    Bytes,
    Facet,
}

impl FieldRole {
    fn tag(self) -> &'static str {
        match self {
            FieldRole::Id => "id",
            FieldRole::Text => "text",
            FieldRole::Bool => "bool",
            FieldRole::U64 => "u64",
            FieldRole::I64 => "i64",
            FieldRole::F64 => "f64",
            FieldRole::Date => "date",
            FieldRole::Bytes => "bytes",
            FieldRole::Facet => "facet",
        }
    }
}

/// One declared field of a `HybridDocument`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    pub role: FieldRole,
}

impl SchemaField {
    pub fn new(name: impl Into<String>, role: FieldRole) -> Self {
        Self {
            name: name.into(),
            role,
        }
    }
}

/// The ordered field list declared by a `HybridDocument`.
///
/// Order matters for `build_lexical_schema` (tantivy schemas are built by
/// appending fields in order) but not for the fingerprint, which sorts
/// before hashing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<SchemaField>,
}

impl Schema {
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    pub fn id_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.role == FieldRole::Id)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn text_field_names(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.role == FieldRole::Text)
            .map(|f| f.name.as_str())
            .collect()
    }

    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Stable, order-independent fingerprint over `(name, role)` pairs.
    ///
    /// Sensitive to field renames, role changes, and additions/removals;
    /// insensitive to declaration order.
    pub fn fingerprint(&self) -> String {
        let mut pairs: BTreeSet<String> = BTreeSet::new();
        for field in &self.fields {
            pairs.insert(format!("{}:{}", field.name, field.role.tag()));
        }
        pairs.into_iter().collect::<Vec<_>>().join("|")
    }

    /// Builds the tantivy schema for this document shape, appending the
    /// reserved `__doc_id` field (indexed, stored, fast, no fieldnorms).
    pub fn build_lexical_schema(&self) -> TantivySchema {
        let mut builder: TantivySchemaBuilder = TantivySchema::builder();
        for field in &self.fields {
            match field.role {
                FieldRole::Id => {
                    builder.add_text_field(&field.name, STRING | STORED | FAST);
                }
                FieldRole::Text => {
                    builder.add_text_field(&field.name, TEXT | STORED);
                }
                FieldRole::Bool => {
                    builder.add_bool_field(&field.name, INDEXED | STORED | FAST);
                }
                FieldRole::U64 => {
                    builder.add_u64_field(&field.name, INDEXED | STORED | FAST);
                }
                FieldRole::I64 => {
                    builder.add_i64_field(&field.name, INDEXED | STORED | FAST);
                }
                FieldRole::F64 => {
                    builder.add_f64_field(&field.name, INDEXED | STORED | FAST);
                }
                FieldRole::Date => {
                    builder.add_date_field(&field.name, INDEXED | STORED | FAST);
                }
                FieldRole::Bytes => {
                    builder.add_bytes_field(&field.name, STORED);
                }
                FieldRole::Facet => {
                    builder.add_facet_field(&field.name, INDEXED | STORED);
                }
            };
        }
        // __doc_id is indexed + stored + fast, with fieldnorms disabled — it
        // never participates in BM25 scoring.
        let doc_id_options = tantivy::schema::NumericOptions::default()
            .set_indexed()
            .set_fieldnorm(false)
            .set_stored()
            .set_fast();
        builder.add_u64_field(DOC_ID_FIELD, doc_id_options);
        builder.build()
    }
}

#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<SchemaField>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: impl Into<String>, role: FieldRole) -> Self {
        self.fields.push(SchemaField::new(name, role));
        self
    }

    pub fn build(self) -> Schema {
        Schema {
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_order_independent() {
        let a = Schema::builder()
            .field("id", FieldRole::Id)
            .field("title", FieldRole::Text)
            .build();
        let b = Schema::builder()
            .field("title", FieldRole::Text)
            .field("id", FieldRole::Id)
            .build();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_detects_rename() {
        let a = Schema::builder().field("id", FieldRole::Id).build();
        let b = Schema::builder().field("ident", FieldRole::Id).build();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_detects_role_change() {
        let a = Schema::builder().field("flag", FieldRole::Bool).build();
        let b = Schema::builder().field("flag", FieldRole::U64).build();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_detects_addition() {
        let a = Schema::builder().field("id", FieldRole::Id).build();
        let b = Schema::builder()
            .field("id", FieldRole::Id)
            .field("title", FieldRole::Text)
            .build();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn id_and_text_field_names() {
        let schema = Schema::builder()
            .field("id", FieldRole::Id)
            .field("title", FieldRole::Text)
            .field("body", FieldRole::Text)
            .field("published", FieldRole::Bool)
            .build();
        assert_eq!(schema.id_field_names(), vec!["id"]);
        assert_eq!(schema.text_field_names(), vec!["title", "body"]);
    }
}
