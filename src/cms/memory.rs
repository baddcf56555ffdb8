//! In-process content repository backed by a fixtures file
//!
//! Implements the same query contract as the HTTP client: predicate
//! filtering, orderings, `after` positioning, paging with opaque
//! `memory://` cursors and ref-scoped preview documents.

use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::{ApiPage, CmsError, ContentRepository, Document, Ordering, Predicate, QueryOptions};
use crate::helpers::parse_timestamp;

const DEFAULT_PAGE_SIZE: usize = 20;
const CURSOR_PREFIX: &str = "memory://search/";

/// On-disk fixtures layout
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fixtures {
    /// Published documents in repository order
    #[serde(default)]
    pub documents: Vec<Document>,
    /// Draft documents visible under a preview ref
    #[serde(default)]
    pub previews: HashMap<String, Vec<Document>>,
}

/// A query as carried inside a page cursor
#[derive(Debug, Serialize, Deserialize)]
struct CursorQuery {
    predicates: Vec<Predicate>,
    options: QueryOptions,
}

/// Serves documents from memory
pub struct MemoryRepository {
    fixtures: Fixtures,
}

impl MemoryRepository {
    pub fn new(documents: Vec<Document>) -> Self {
        Self::from_fixtures(Fixtures {
            documents,
            previews: HashMap::new(),
        })
    }

    pub fn from_fixtures(fixtures: Fixtures) -> Self {
        Self { fixtures }
    }

    /// Load fixtures from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CmsError> {
        let content = fs::read_to_string(path.as_ref())?;
        let fixtures: Fixtures = serde_json::from_str(&content)?;
        tracing::debug!(
            "Loaded {} fixture documents from {:?}",
            fixtures.documents.len(),
            path.as_ref()
        );
        Ok(Self::from_fixtures(fixtures))
    }

    /// Register a preview ref with its draft documents
    pub fn with_preview(mut self, reference: &str, drafts: Vec<Document>) -> Self {
        self.fixtures.previews.insert(reference.to_string(), drafts);
        self
    }

    /// Documents visible under a ref, drafts shadowing published versions
    fn visible(&self, reference: Option<&str>) -> Result<Vec<Document>, CmsError> {
        let drafts = match reference {
            None => return Ok(self.fixtures.documents.clone()),
            Some(r) => self.fixtures.previews.get(r).ok_or_else(|| CmsError::Status {
                status: 404,
                body: format!("unknown ref {:?}", r),
            })?,
        };

        let mut docs: Vec<Document> = self
            .fixtures
            .documents
            .iter()
            .map(|doc| {
                drafts
                    .iter()
                    .find(|d| d.id == doc.id)
                    .cloned()
                    .unwrap_or_else(|| doc.clone())
            })
            .collect();
        for draft in drafts {
            if !docs.iter().any(|d| d.id == draft.id) {
                docs.push(draft.clone());
            }
        }

        Ok(docs)
    }

    fn run_query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<ApiPage, CmsError> {
        let mut docs: Vec<Document> = self
            .visible(options.reference.as_deref())?
            .into_iter()
            .filter(|doc| predicates.iter().all(|p| matches(doc, p)))
            .collect();

        if !options.orderings.is_empty() {
            docs.sort_by(|a, b| compare(a, b, &options.orderings));
        }

        // Nothing follows an id the query does not see, e.g. an unpublished draft
        if let Some(after) = &options.after {
            docs = match docs.iter().position(|d| &d.id == after) {
                Some(pos) => docs.split_off(pos + 1),
                None => Vec::new(),
            };
        }

        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = options.page.unwrap_or(1).max(1);
        let total_pages = docs.len().div_ceil(page_size) as u32;

        let start = (page as usize - 1) * page_size;
        let results: Vec<Document> = docs
            .into_iter()
            .skip(start)
            .take(page_size)
            .map(|doc| project(doc, &options.fetch))
            .collect();

        let next_page = if page < total_pages {
            Some(encode_cursor(predicates, options, page + 1)?)
        } else {
            None
        };

        Ok(ApiPage {
            page,
            total_pages,
            next_page,
            results,
        })
    }
}

/// Cursors carry the whole query, so nothing is kept between requests
fn encode_cursor(
    predicates: &[Predicate],
    options: &QueryOptions,
    page: u32,
) -> Result<String, CmsError> {
    let query = CursorQuery {
        predicates: predicates.to_vec(),
        options: QueryOptions {
            page: Some(page),
            ..options.clone()
        },
    };
    let json = serde_json::to_string(&query)?;
    Ok(format!(
        "{}{}",
        CURSOR_PREFIX,
        utf8_percent_encode(&json, NON_ALPHANUMERIC)
    ))
}

fn decode_cursor(cursor: &str) -> Option<CursorQuery> {
    let encoded = cursor.strip_prefix(CURSOR_PREFIX)?;
    let json = percent_decode_str(encoded).decode_utf8().ok()?;
    serde_json::from_str(&json).ok()
}

/// Predicate match on `document.*` or `my.<type>.<field>` paths
fn matches(doc: &Document, predicate: &Predicate) -> bool {
    let Predicate::At { path, value } = predicate;

    match path.as_str() {
        "document.type" => &doc.kind == value,
        "document.id" => &doc.id == value,
        _ => {
            let mut parts = path.splitn(3, '.');
            match (parts.next(), parts.next(), parts.next()) {
                (Some("my"), Some(kind), Some("uid")) => {
                    doc.kind == kind && doc.uid.as_deref() == Some(value.as_str())
                }
                (Some("my"), Some(kind), Some(field)) => {
                    doc.kind == kind
                        && doc.data.get(field).and_then(|v| v.as_str()) == Some(value.as_str())
                }
                _ => false,
            }
        }
    }
}

fn compare(a: &Document, b: &Document, orderings: &[Ordering]) -> std::cmp::Ordering {
    for ordering in orderings {
        let ord = match ordering.field.as_str() {
            "document.first_publication_date" => {
                timestamp_key(&a.first_publication_date).cmp(&timestamp_key(&b.first_publication_date))
            }
            "document.last_publication_date" => {
                timestamp_key(&a.last_publication_date).cmp(&timestamp_key(&b.last_publication_date))
            }
            field => {
                let name = field.rsplit('.').next().unwrap_or(field);
                let a = a.data.get(name).and_then(|v| v.as_str());
                let b = b.data.get(name).and_then(|v| v.as_str());
                a.cmp(&b)
            }
        };
        let ord = if ordering.descending { ord.reverse() } else { ord };
        if ord != std::cmp::Ordering::Equal {
            return ord;
        }
    }
    std::cmp::Ordering::Equal
}

fn timestamp_key(value: &Option<String>) -> Option<chrono::DateTime<chrono::FixedOffset>> {
    value.as_deref().and_then(|v| parse_timestamp(v).ok())
}

/// Apply a `fetch` list of `type.field` paths to a document's data
fn project(mut doc: Document, fetch: &[String]) -> Document {
    if fetch.is_empty() {
        return doc;
    }

    if let serde_json::Value::Object(data) = &mut doc.data {
        let keep: Vec<&str> = fetch
            .iter()
            .filter_map(|path| path.split_once('.'))
            .filter(|(kind, _)| *kind == doc.kind)
            .map(|(_, field)| field)
            .collect();
        data.retain(|key, _| keep.contains(&key.as_str()));
    }

    doc
}

#[async_trait]
impl ContentRepository for MemoryRepository {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<ApiPage, CmsError> {
        self.run_query(predicates, options)
    }

    async fn get_by_uid(
        &self,
        kind: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Document, CmsError> {
        self.visible(reference)?
            .into_iter()
            .find(|d| d.kind == kind && d.uid.as_deref() == Some(uid))
            .ok_or_else(|| CmsError::NotFound {
                kind: kind.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn get_by_id(
        &self,
        id: &str,
        reference: Option<&str>,
    ) -> Result<Option<Document>, CmsError> {
        Ok(self.visible(reference)?.into_iter().find(|d| d.id == id))
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiPage, CmsError> {
        let query =
            decode_cursor(cursor).ok_or_else(|| CmsError::InvalidCursor(cursor.to_string()))?;
        self.run_query(&query.predicates, &query.options)
    }
}
