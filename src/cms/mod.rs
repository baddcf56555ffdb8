//! Headless CMS access
//!
//! [`ContentRepository`] is the narrow interface the renderers depend on:
//! predicate queries with paging, ordering and an `after` cursor, lookups
//! by uid or id, and following an opaque `next_page` cursor.
//! [`PrismicClient`] talks to the Prismic REST API and [`MemoryRepository`]
//! serves the same contract from a local fixtures file.

mod memory;
mod prismic;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use memory::{Fixtures, MemoryRepository};
pub use prismic::PrismicClient;

#[cfg(test)]
pub(crate) use memory::tests as fixtures;

/// Data fetch failures
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("CMS request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("CMS returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode CMS response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("No {kind} document with uid {uid:?}")]
    NotFound { kind: String, uid: String },

    #[error("CMS API exposes no master ref")]
    NoMasterRef,

    #[error("Invalid page cursor: {0}")]
    InvalidCursor(String),

    #[error("Failed to read fixtures: {0}")]
    Fixtures(#[from] std::io::Error),
}

/// A raw CMS document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub first_publication_date: Option<String>,
    #[serde(default)]
    pub last_publication_date: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// One page of query results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub total_pages: u32,
    /// Cursor of the following page; `None` at the end of the sequence
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default)]
    pub results: Vec<Document>,
}

/// Query predicate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Predicate {
    /// Equality on a document path, e.g. `document.type == "posts"`
    At { path: String, value: String },
}

impl Predicate {
    pub fn at(path: &str, value: &str) -> Self {
        Predicate::At {
            path: path.to_string(),
            value: value.to_string(),
        }
    }

    /// Filter on document type
    pub fn document_type(kind: &str) -> Self {
        Self::at("document.type", kind)
    }

    /// Render in Prismic query syntax
    pub fn to_query(&self) -> String {
        match self {
            Predicate::At { path, value } => {
                format!("[at({}, \"{}\")]", path, value.replace('"', "\\\""))
            }
        }
    }
}

/// Render a predicate list as the `q` parameter
pub fn predicates_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(Predicate::to_query).collect();
    format!("[{}]", inner)
}

/// Sort key for a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ordering {
    pub field: String,
    pub descending: bool,
}

impl Ordering {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            descending: true,
        }
    }
}

/// Render orderings as `[document.first_publication_date desc]`
pub fn orderings_query(orderings: &[Ordering]) -> String {
    let inner: Vec<String> = orderings
        .iter()
        .map(|o| {
            if o.descending {
                format!("{} desc", o.field)
            } else {
                o.field.clone()
            }
        })
        .collect();
    format!("[{}]", inner.join(","))
}

/// Options for [`ContentRepository::query`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    /// Restrict `data` to these `type.field` paths
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
    pub page: Option<u32>,
    /// Only return documents positioned after this document id
    pub after: Option<String>,
    pub orderings: Vec<Ordering>,
    /// Content release or preview ref; master when `None`
    pub reference: Option<String>,
}

/// Read access to the CMS
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Query documents matching every predicate
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<ApiPage, CmsError>;

    /// Fetch one document of `kind` by uid
    async fn get_by_uid(
        &self,
        kind: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Document, CmsError>;

    /// Fetch one document by its internal id
    async fn get_by_id(
        &self,
        id: &str,
        reference: Option<&str>,
    ) -> Result<Option<Document>, CmsError>;

    /// Follow a `next_page` cursor
    async fn fetch_page(&self, cursor: &str) -> Result<ApiPage, CmsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_query() {
        let q = predicates_query(&[Predicate::document_type("posts")]);
        assert_eq!(q, r#"[[at(document.type, "posts")]]"#);
    }

    #[test]
    fn test_orderings_query() {
        assert_eq!(
            orderings_query(&[Ordering::desc("document.first_publication_date")]),
            "[document.first_publication_date desc]"
        );
        assert_eq!(
            orderings_query(&[
                Ordering::asc("document.first_publication_date"),
                Ordering::desc("my.posts.title")
            ]),
            "[document.first_publication_date,my.posts.title desc]"
        );
    }

    #[test]
    fn test_document_deserialize() {
        let json = r#"{
            "id": "YF1",
            "uid": "como-utilizar-hooks",
            "type": "posts",
            "first_publication_date": "2021-03-15T19:25:28+0000",
            "last_publication_date": null,
            "data": { "title": "Como utilizar Hooks" }
        }"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.kind, "posts");
        assert_eq!(doc.uid.as_deref(), Some("como-utilizar-hooks"));
        assert_eq!(doc.last_publication_date, None);
        assert_eq!(doc.data["title"], "Como utilizar Hooks");
    }
}
