//! Closed error taxonomy for the hybrid index, following the teacher's
//! `thiserror`-derived `IrisError` pattern (referenced from `lib.rs` but not
//! present in the retrieved sources; the shape below follows the same
//! `thiserror` idiom the teacher's `Cargo.toml` stack commits to).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HybridError {
    #[error("metadata file missing at {0}")]
    MetadataMissing(std::path::PathBuf),

    #[error("metadata corrupt: {0}")]
    MetadataCorrupt(String),

    #[error("index already exists at {0}")]
    IndexAlreadyExists(std::path::PathBuf),

    #[error("document type declares no ID field")]
    MissingIdField,

    #[error("multiple ID fields declared ({0:?}) and no primary ID field was given")]
    AmbiguousIdField(Vec<String>),

    #[error("primary ID field '{0}' is not an ID field of this document type")]
    InvalidPrimaryIdField(String),

    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("lexical document is missing its internal doc id")]
    MissingDocId,

    #[error("lexical engine error: {0}")]
    Lexical(#[from] tantivy::TantivyError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HybridError>;
