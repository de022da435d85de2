//! # hybridx
//!
//! A hybrid document search index fusing a lexical BM25 engine (`tantivy`)
//! and an approximate nearest-neighbor vector engine (`hnsw_rs`) through
//! Reciprocal Rank Fusion.
//!
//! ## Features
//!
//! - Typed document shapes via [`HybridDocument`] instead of runtime
//!   reflection
//! - Crash-safe metadata sidecar with atomic replace
//! - A small filter DSL pushed down to both engines
//! - Cooperative, single-writer-at-a-time serialization over `tokio`

pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod lexical;
pub mod meta;
pub mod query;
pub mod result;
pub mod rrf;
pub mod schema;
pub mod vector;

pub use config::{DistanceType, HnswConfig, HybridIndexConfig};
pub use document::{DataValue, HybridDocument};
pub use error::{HybridError, Result};
pub use index::HybridIndex;
pub use lexical::{DslQuery, FuzzyField, TermValue};
pub use query::{FuzzyFieldSpec, HybridTextQuery};
pub use result::HybridSearchResult;
pub use schema::{FieldRole, Schema};

/// Crate version, exposed for diagnostics.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
