//! The hydrated hit type returned by all three `HybridIndex` search modes.

/// A single scored, hydrated search result.
#[derive(Debug, Clone)]
pub struct HybridSearchResult<D> {
    pub doc_id: u64,
    pub score: f32,
    pub document: D,
}

impl<D> HybridSearchResult<D> {
    pub fn new(doc_id: u64, score: f32, document: D) -> Self {
        Self {
            doc_id,
            score,
            document,
        }
    }
}
