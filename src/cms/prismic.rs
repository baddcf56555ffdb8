//! REST client for the Prismic content API
//!
//! Wraps the v2 API (`/api/v2`, `/documents/search`) using [`reqwest`].

use async_trait::async_trait;
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::{
    orderings_query, predicates_query, ApiPage, CmsError, ContentRepository, Document, Predicate,
    QueryOptions,
};

/// HTTP client for one Prismic repository
#[derive(Clone)]
pub struct PrismicClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master_ref: bool,
}

impl PrismicClient {
    /// Create a client for an API root such as `https://repo.cdn.prismic.io/api/v2`
    pub fn new(endpoint: &str, access_token: Option<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint, access_token)
    }

    /// Create a client reusing an existing [`reqwest::Client`]
    pub fn with_client(client: reqwest::Client, endpoint: &str, access_token: Option<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            access_token,
        }
    }

    /// Resolve the master ref published by the API root
    pub async fn master_ref(&self) -> Result<String, CmsError> {
        let url = self.with_token(self.endpoint.clone());
        let info: ApiInfo = self.get_json(&url).await?;
        info.refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or(CmsError::NoMasterRef)
    }

    /// Build the `/documents/search` URL for a query
    pub fn search_url(&self, reference: &str, predicates: &[Predicate], options: &QueryOptions) -> String {
        let mut params: Vec<(&str, String)> = vec![
            ("ref", reference.to_string()),
            ("q", predicates_query(predicates)),
        ];

        if let Some(page_size) = options.page_size {
            params.push(("pageSize", page_size.to_string()));
        }
        if let Some(page) = options.page {
            params.push(("page", page.to_string()));
        }
        if let Some(after) = &options.after {
            params.push(("after", after.clone()));
        }
        if !options.orderings.is_empty() {
            params.push(("orderings", orderings_query(&options.orderings)));
        }
        if !options.fetch.is_empty() {
            params.push(("fetch", options.fetch.join(",")));
        }

        let query: Vec<String> = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, encode(v)))
            .collect();

        self.with_token(format!(
            "{}/documents/search?{}",
            self.endpoint,
            query.join("&")
        ))
    }

    /// Whether `cursor` points under the configured endpoint
    ///
    /// Scheme, host and port must match and the path must continue the
    /// endpoint's path on a segment boundary.
    fn owns(&self, cursor: &str) -> bool {
        let (Ok(endpoint), Ok(cursor)) = (Url::parse(&self.endpoint), Url::parse(cursor)) else {
            return false;
        };
        if endpoint.origin() != cursor.origin() {
            return false;
        }
        let base = endpoint.path().trim_end_matches('/');
        match cursor.path().strip_prefix(base) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Append the access token unless the URL already carries one
    fn with_token(&self, url: String) -> String {
        match &self.access_token {
            Some(token) if !url.contains("access_token=") => {
                let sep = if url.contains('?') { '&' } else { '?' };
                format!("{}{}access_token={}", url, sep, encode(token))
            }
            _ => url,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CmsError> {
        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CmsError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn reference(&self, reference: Option<&str>) -> Result<String, CmsError> {
        match reference {
            Some(r) => Ok(r.to_string()),
            None => self.master_ref().await,
        }
    }
}

fn encode(value: &str) -> String {
    utf8_percent_encode(value, NON_ALPHANUMERIC).to_string()
}

#[async_trait]
impl ContentRepository for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<ApiPage, CmsError> {
        let reference = self.reference(options.reference.as_deref()).await?;
        let url = self.search_url(&reference, predicates, options);
        self.get_json(&url).await
    }

    async fn get_by_uid(
        &self,
        kind: &str,
        uid: &str,
        reference: Option<&str>,
    ) -> Result<Document, CmsError> {
        let options = QueryOptions {
            page_size: Some(1),
            reference: reference.map(str::to_string),
            ..QueryOptions::default()
        };
        let predicates = [Predicate::at(&format!("my.{}.uid", kind), uid)];

        self.query(&predicates, &options)
            .await?
            .results
            .into_iter()
            .next()
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
        let options = QueryOptions {
            page_size: Some(1),
            reference: reference.map(str::to_string),
            ..QueryOptions::default()
        };
        let predicates = [Predicate::at("document.id", id)];
        Ok(self.query(&predicates, &options).await?.results.into_iter().next())
    }

    async fn fetch_page(&self, cursor: &str) -> Result<ApiPage, CmsError> {
        if !self.owns(cursor) {
            return Err(CmsError::InvalidCursor(cursor.to_string()));
        }
        let url = self.with_token(cursor.to_string());
        self.get_json(&url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::Ordering;

    #[test]
    fn test_search_url() {
        let client = PrismicClient::new("https://blog.cdn.prismic.io/api/v2/", None);
        let options = QueryOptions {
            fetch: vec!["posts.title".to_string()],
            page_size: Some(1),
            after: Some("YF1".to_string()),
            orderings: vec![Ordering::desc("document.first_publication_date")],
            ..QueryOptions::default()
        };
        let url = client.search_url("master", &[Predicate::document_type("posts")], &options);

        assert!(url.starts_with("https://blog.cdn.prismic.io/api/v2/documents/search?ref=master&q="));
        assert!(url.contains("&pageSize=1"));
        assert!(url.contains("&after=YF1"));
        assert!(url.contains("&orderings=%5Bdocument%2Efirst%5Fpublication%5Fdate%20desc%5D"));
        assert!(url.contains("&fetch=posts%2Etitle"));
        assert!(!url.contains("access_token"));
    }

    #[test]
    fn test_access_token_appended_once() {
        let client = PrismicClient::new("https://blog.cdn.prismic.io/api/v2", Some("s3cr3t".into()));
        assert_eq!(
            client.with_token("https://blog.cdn.prismic.io/api/v2".to_string()),
            "https://blog.cdn.prismic.io/api/v2?access_token=s3cr3t"
        );
        let cursor = "https://blog.cdn.prismic.io/api/v2/documents/search?page=2&access_token=s3cr3t";
        assert_eq!(client.with_token(cursor.to_string()), cursor);
    }

    #[tokio::test]
    async fn test_foreign_cursor_rejected() {
        let client = PrismicClient::new("https://blog.cdn.prismic.io/api/v2", None);
        let err = client
            .fetch_page("https://evil.example.com/documents/search?page=2")
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::InvalidCursor(_)));
    }

    #[test]
    fn test_cursor_must_share_origin_and_path() {
        let bare = PrismicClient::new("https://repo.cdn.prismic.io", None);
        assert!(bare.owns("https://repo.cdn.prismic.io/api/v2/documents/search?page=2"));
        assert!(!bare.owns("https://repo.cdn.prismic.io.evil.com/api/v2/documents/search"));
        assert!(!bare.owns("http://repo.cdn.prismic.io/api/v2/documents/search"));
        assert!(!bare.owns("https://repo.cdn.prismic.io:8443/api/v2/documents/search"));
        assert!(!bare.owns("not a url"));

        let api = PrismicClient::new("https://repo.cdn.prismic.io/api/v2/", None);
        assert!(api.owns("https://repo.cdn.prismic.io/api/v2/documents/search?page=2"));
        assert!(!api.owns("https://repo.cdn.prismic.io/api/v2-admin/documents/search"));
        assert!(!api.owns("https://repo.cdn.prismic.io/other/documents/search"));
    }

    #[tokio::test]
    async fn test_lookalike_host_cursor_rejected() {
        let client = PrismicClient::new("https://repo.cdn.prismic.io", None);
        let err = client
            .fetch_page("https://repo.cdn.prismic.io.evil.com/api/v2/documents/search?page=2")
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::InvalidCursor(_)));
    }
}
