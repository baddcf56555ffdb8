//! Post list and article models
//!
//! Read-only projections of CMS documents. Timestamps stay exactly as the
//! CMS sent them; formatting happens at render time.

use serde::{Deserialize, Serialize};

use super::RichText;
use crate::cms::{ApiPage, CmsError, Document};

/// A post as shown in the list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    /// List key and route segment
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryFields {
    title: Option<String>,
    subtitle: Option<String>,
    author: Option<String>,
}

impl PostSummary {
    pub fn from_document(doc: &Document) -> Result<Self, CmsError> {
        let fields: SummaryFields = decode_data(doc)?;
        Ok(Self {
            uid: doc.uid.clone().unwrap_or_default(),
            first_publication_date: doc.first_publication_date.clone(),
            title: fields.title.unwrap_or_default(),
            subtitle: fields.subtitle.unwrap_or_default(),
            author: fields.author.unwrap_or_default(),
        })
    }

    /// Route of the post page
    pub fn path(&self) -> String {
        format!("/post/{}", self.uid)
    }
}

/// One page of post summaries
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostPage {
    pub results: Vec<PostSummary>,
    /// `None` iff nothing follows upstream
    pub next_page: Option<String>,
}

impl PostPage {
    pub fn from_api_page(page: &ApiPage) -> Result<Self, CmsError> {
        let results = page
            .results
            .iter()
            .map(PostSummary::from_document)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            results,
            next_page: page.next_page.clone(),
        })
    }
}

/// Article banner image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    #[serde(default)]
    pub url: String,
}

/// A titled section of an article
///
/// `heading` doubles as the section's render key; uniqueness within an
/// article is assumed, not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub heading: String,
    pub body: RichText,
}

/// A full article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Internal CMS id, used for neighbor lookups
    pub id: String,
    pub uid: String,
    pub first_publication_date: Option<String>,
    pub last_publication_date: Option<String>,
    pub title: String,
    pub author: String,
    pub banner: Banner,
    pub content: Vec<Section>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArticleFields {
    title: Option<String>,
    author: Option<String>,
    banner: Option<Banner>,
    content: Vec<SectionFields>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SectionFields {
    heading: Option<String>,
    body: RichText,
}

impl Article {
    pub fn from_document(doc: &Document) -> Result<Self, CmsError> {
        let fields: ArticleFields = decode_data(doc)?;
        Ok(Self {
            id: doc.id.clone(),
            uid: doc.uid.clone().unwrap_or_default(),
            first_publication_date: doc.first_publication_date.clone(),
            last_publication_date: doc.last_publication_date.clone(),
            title: fields.title.unwrap_or_default(),
            author: fields.author.unwrap_or_default(),
            banner: fields.banner.unwrap_or_default(),
            content: fields
                .content
                .into_iter()
                .map(|s| Section {
                    heading: s.heading.unwrap_or_default(),
                    body: s.body,
                })
                .collect(),
        })
    }
}

/// Link to a chronologically adjacent article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighborRef {
    pub uid: String,
    pub title: String,
}

impl NeighborRef {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            uid: doc.uid.clone().unwrap_or_default(),
            title: doc
                .data
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
        }
    }

    pub fn path(&self) -> String {
        format!("/post/{}", self.uid)
    }
}

fn decode_data<T: serde::de::DeserializeOwned + Default>(doc: &Document) -> Result<T, CmsError> {
    if doc.data.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(doc.data.clone())?)
}
