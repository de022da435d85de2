//! Lexical (BM25) half of the hybrid index, backed by `tantivy`.

pub mod dsl;
pub mod engine;

pub use dsl::{DslQuery, FuzzyField, TermValue};
pub use engine::{LEXICAL_DIR, LexicalEngine, LexicalHit};
