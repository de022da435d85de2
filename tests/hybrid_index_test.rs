//! End-to-end scenarios over `HybridIndex<Article>`: index+fetch, text
//! search, filtered vector search, hybrid RRF, delete, and dimension
//! validation.

use std::sync::OnceLock;

use tempfile::TempDir;

use hybridx::lexical::{DslQuery, TermValue};
use hybridx::{DataValue, HybridDocument, HybridIndex, HybridIndexConfig, HybridTextQuery, Schema};
use hybridx::schema::FieldRole;

const DIM: usize = 4;

#[derive(Debug, Clone, PartialEq)]
struct Article {
    id: String,
    title: String,
    body: String,
    is_published: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArticleField {
    Id,
    Title,
    Body,
    IsPublished,
}

impl HybridDocument for Article {
    type Field = ArticleField;

    fn schema() -> &'static Schema {
        static SCHEMA: OnceLock<Schema> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::builder()
                .field("id", FieldRole::Id)
                .field("title", FieldRole::Text)
                .field("body", FieldRole::Text)
                .field("is_published", FieldRole::Bool)
                .build()
        })
    }

    fn field_name(field: Self::Field) -> &'static str {
        match field {
            ArticleField::Id => "id",
            ArticleField::Title => "title",
            ArticleField::Body => "body",
            ArticleField::IsPublished => "is_published",
        }
    }

    fn to_fields(&self) -> Vec<(&'static str, DataValue)> {
        vec![
            ("id", DataValue::Text(self.id.clone())),
            ("title", DataValue::Text(self.title.clone())),
            ("body", DataValue::Text(self.body.clone())),
            ("is_published", DataValue::Bool(self.is_published)),
        ]
    }

    fn from_fields(fields: &[(String, DataValue)]) -> Option<Self> {
        let mut id = None;
        let mut title = None;
        let mut body = None;
        let mut is_published = None;
        for (name, value) in fields {
            match name.as_str() {
                "id" => id = value.as_text().map(str::to_string),
                "title" => title = value.as_text().map(str::to_string),
                "body" => body = value.as_text().map(str::to_string),
                "is_published" => is_published = value.as_bool(),
                _ => {}
            }
        }
        Some(Article {
            id: id?,
            title: title?,
            body: body?,
            is_published: is_published?,
        })
    }
}

fn one_hot(axis: usize) -> Vec<f32> {
    (0..DIM).map(|i| if i == axis { 1.0 } else { 0.0 }).collect()
}

async fn seeded_index(dir: &std::path::Path) -> HybridIndex<Article> {
    let index = HybridIndex::<Article>::create(dir, HybridIndexConfig::new(DIM), None).unwrap();

    let docs = [
        (
            Article {
                id: "swift-1".into(),
                title: "Swift Concurrency".into(),
                body: "swift actors and structured concurrency".into(),
                is_published: true,
            },
            one_hot(0),
        ),
        (
            Article {
                id: "rust-1".into(),
                title: "Rust Ownership".into(),
                body: "borrow checker and lifetimes in rust".into(),
                is_published: true,
            },
            one_hot(1),
        ),
        (
            Article {
                id: "vector-1".into(),
                title: "Vector Embeddings".into(),
                body: "dense embeddings for semantic search".into(),
                is_published: false,
            },
            one_hot(2),
        ),
        (
            Article {
                id: "tantivy-1".into(),
                title: "Tantivy Full Text".into(),
                body: "bm25 scoring over inverted indexes".into(),
                is_published: true,
            },
            one_hot(3),
        ),
    ];

    for (doc, embedding) in &docs {
        index.add(doc, embedding).await.unwrap();
    }
    index.commit().await.unwrap();
    index
}

#[tokio::test(flavor = "multi_thread")]
async fn s1_index_and_fetch() {
    let dir = TempDir::new().unwrap();
    let index = seeded_index(dir.path()).await;

    let by_id = index
        .get_by_field(ArticleField::Id, "swift-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_id.title, "Swift Concurrency");

    let by_doc_id = index.get(0).await.unwrap().unwrap();
    assert_eq!(by_doc_id.id, "swift-1");

    assert_eq!(index.count().await, 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn s2_text_search_ranks_matching_doc_first() {
    let dir = TempDir::new().unwrap();
    let index = seeded_index(dir.path()).await;

    let query = HybridTextQuery {
        query: "swift actors".to_string(),
        default_fields: vec![ArticleField::Title, ArticleField::Body],
        fuzzy_fields: Vec::new(),
    };
    let hits = index.search_text(&query, None, 3, 0).await.unwrap();
    assert_eq!(hits.first().map(|h| h.document.id.clone()), Some("swift-1".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn s3_filtered_vector_search_excludes_unpublished() {
    let dir = TempDir::new().unwrap();
    let index = seeded_index(dir.path()).await;

    let filter = DslQuery::Term {
        field: "is_published".to_string(),
        value: TermValue::Bool(true),
    };
    let hits = index
        .search_vector(&one_hot(2), Some(filter), 3, 0, 32, 3)
        .await
        .unwrap();

    assert!(!hits.is_empty());
    assert!(hits.iter().all(|h| h.document.is_published));
    assert!(hits.first().map(|h| h.document.id.as_str()) != Some("vector-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn s4_hybrid_search_ranks_matching_doc_first() {
    let dir = TempDir::new().unwrap();
    let index = seeded_index(dir.path()).await;

    let query = HybridTextQuery {
        query: "swift concurrency actors".to_string(),
        default_fields: vec![ArticleField::Title, ArticleField::Body],
        fuzzy_fields: Vec::new(),
    };
    let hits = index
        .search_hybrid(&query, &one_hot(0), None, 3, 0, 32, 60.0, 1.0, 1.0, 3)
        .await
        .unwrap();
    assert_eq!(hits.first().map(|h| h.document.id.clone()), Some("swift-1".to_string()));
}

#[tokio::test(flavor = "multi_thread")]
async fn s5_delete_by_field_removes_from_fetch_and_search() {
    let dir = TempDir::new().unwrap();
    let index = seeded_index(dir.path()).await;

    index
        .delete_by_field(ArticleField::Id, "rust-1", true)
        .await
        .unwrap();

    assert!(index.get_by_field(ArticleField::Id, "rust-1").await.unwrap().is_none());

    let query = HybridTextQuery {
        query: "Rust".to_string(),
        default_fields: vec![ArticleField::Title, ArticleField::Body],
        fuzzy_fields: Vec::new(),
    };
    let hits = index.search_text(&query, None, 5, 0).await.unwrap();
    assert!(hits.iter().all(|h| h.document.id != "rust-1"));
}

#[tokio::test(flavor = "multi_thread")]
async fn s6_dimension_mismatch_leaves_count_unchanged() {
    let dir = TempDir::new().unwrap();
    let index = seeded_index(dir.path()).await;

    let before = index.count().await;
    let doc = Article {
        id: "bad-dim".into(),
        title: "x".into(),
        body: "y".into(),
        is_published: true,
    };
    let err = index.add(&doc, &[0.0, 0.0, 0.0]).await.unwrap_err();
    assert!(matches!(
        err,
        hybridx::HybridError::DimensionMismatch {
            expected: DIM,
            got: 3
        }
    ));
    assert_eq!(index.count().await, before);
}
