//! Vector (ANN) half of the hybrid index, backed by `hnsw_rs`.

pub mod engine;

pub use engine::{VectorEngine, VectorHit};
