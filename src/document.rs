//! The `HybridDocument` trait and the value type used to move field data
//! between a caller's struct and the lexical/vector engines.
//!
//! Grounded on the teacher's `data::DataValue`/`data::Document` pair, but
//! narrowed to the roles `Schema` actually declares (no `Vector`/`Geo`/`List`
//! variants — embeddings are passed to `HybridIndex` separately, and facets
//! are carried as a dedicated variant rather than overloaded onto `Text`).

use chrono::{DateTime, Utc};

use crate::schema::Schema;

/// A single field's value, tagged to match a `FieldRole`.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Text(String),
    Bool(bool),
    U64(u64),
    I64(i64),
    F64(f64),
    Date(DateTime<Utc>),
    Bytes(Vec<u8>),
    Facet(String),
}

impl DataValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            DataValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::F64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            DataValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            DataValue::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::Text(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::Text(v.to_string())
    }
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<u64> for DataValue {
    fn from(v: u64) -> Self {
        DataValue::U64(v)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::I64(v)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::F64(v)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(v: DateTime<Utc>) -> Self {
        DataValue::Date(v)
    }
}

/// A compile-time known document shape usable with `HybridIndex<D>`.
///
/// This replaces the source's reflection-based field-role inspection (see
/// the "Tagged document roles instead of reflection" design note): the
/// caller implements this trait once for their struct, and the core derives
/// everything else (schema fingerprint, lexical field list, default search
/// fields) from `schema()`.
///
/// `Field` plays the role of a per-document `CodingKeys` enumeration: one
/// variant per declared field, whose `as_str()` form must match the name
/// passed to `Schema::builder().field(name, role)` for that field.
pub trait HybridDocument: Sized + Send + Sync + 'static {
    type Field: Copy + Eq + Send + Sync + 'static;

    /// The field schema for this document shape. Implementations typically
    /// build this once behind a `std::sync::OnceLock`.
    fn schema() -> &'static Schema;

    /// The lexical schema field name for a `Field` variant.
    fn field_name(field: Self::Field) -> &'static str;

    /// Decompose `self` into `(field name, value)` pairs for indexing.
    fn to_fields(&self) -> Vec<(&'static str, DataValue)>;

    /// Reconstruct `Self` from stored field values. Returns `None` if a
    /// required field is missing or has an unexpected value kind — the
    /// core treats this as an unhydratable hit, not a hard error (§7).
    fn from_fields(fields: &[(String, DataValue)]) -> Option<Self>;
}
