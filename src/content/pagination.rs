//! Post list pagination
//!
//! The first page comes from a type query; later pages are fetched by
//! following the opaque `next_page` cursor and appended to the list.

use super::{PostPage, PostSummary};
use crate::cms::{CmsError, ContentRepository, Predicate, QueryOptions};

/// Errors from [`Paginator::load_more`]
#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("No more pages to load")]
    Exhausted,

    #[error(transparent)]
    Fetch(#[from] CmsError),
}

/// Fetch the first page of post summaries, restricted to list fields
pub async fn fetch_first_page(
    repo: &dyn ContentRepository,
    document_type: &str,
    page_size: usize,
    reference: Option<&str>,
) -> Result<PostPage, CmsError> {
    let options = QueryOptions {
        fetch: ["title", "subtitle", "author"]
            .iter()
            .map(|field| format!("{}.{}", document_type, field))
            .collect(),
        page_size: Some(page_size),
        reference: reference.map(str::to_string),
        ..QueryOptions::default()
    };

    let page = repo
        .query(&[Predicate::document_type(document_type)], &options)
        .await?;
    PostPage::from_api_page(&page)
}

/// Growing list of posts plus the cursor of the next page
#[derive(Debug, Clone, Default)]
pub struct Paginator {
    posts: Vec<PostSummary>,
    next_page: Option<String>,
}

impl Paginator {
    /// Start from an already fetched first page
    pub fn initialize(page: PostPage) -> Self {
        Self {
            posts: page.results,
            next_page: page.next_page,
        }
    }

    /// Start from a bare cursor with nothing loaded yet
    pub fn resume(cursor: &str) -> Self {
        Self {
            posts: Vec::new(),
            next_page: Some(cursor.to_string()),
        }
    }

    pub fn posts(&self) -> &[PostSummary] {
        &self.posts
    }

    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    pub fn into_posts(self) -> Vec<PostSummary> {
        self.posts
    }

    /// Fetch the page at the cursor and append it
    ///
    /// Results are appended in order without de-duplication. The list
    /// never shrinks: on error the state is left untouched.
    pub async fn load_more(
        &mut self,
        repo: &dyn ContentRepository,
    ) -> Result<PostPage, PaginationError> {
        let cursor = self.next_page.as_deref().ok_or(PaginationError::Exhausted)?;

        let page = PostPage::from_api_page(&repo.fetch_page(cursor).await?)?;
        tracing::debug!(
            "Loaded {} more posts (more: {})",
            page.results.len(),
            page.next_page.is_some()
        );

        self.posts.extend(page.results.iter().cloned());
        self.next_page = page.next_page.clone();

        Ok(page)
    }

    /// Keep loading until the cursor runs out
    pub async fn load_all(&mut self, repo: &dyn ContentRepository) -> Result<(), PaginationError> {
        while self.has_more() {
            self.load_more(repo).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::{post, sample_repository};
    use crate::cms::{ApiPage, MemoryRepository};
    use async_trait::async_trait;

    fn summary(uid: &str) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: None,
            title: uid.to_uppercase(),
            subtitle: String::new(),
            author: String::new(),
        }
    }

    /// Serves a fixed page for any cursor
    struct FixedPage(ApiPage);

    #[async_trait]
    impl ContentRepository for FixedPage {
        async fn query(&self, _: &[Predicate], _: &QueryOptions) -> Result<ApiPage, CmsError> {
            Ok(self.0.clone())
        }
        async fn get_by_uid(
            &self,
            kind: &str,
            uid: &str,
            _: Option<&str>,
        ) -> Result<crate::cms::Document, CmsError> {
            Err(CmsError::NotFound {
                kind: kind.to_string(),
                uid: uid.to_string(),
            })
        }
        async fn get_by_id(
            &self,
            _: &str,
            _: Option<&str>,
        ) -> Result<Option<crate::cms::Document>, CmsError> {
            Ok(None)
        }
        async fn fetch_page(&self, _: &str) -> Result<ApiPage, CmsError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_load_more_appends_and_ends() {
        let repo = FixedPage(ApiPage {
            page: 2,
            total_pages: 2,
            next_page: None,
            results: vec![post("C", "c", "2021-03-03T10:00:00+0000", "C")],
        });

        let mut paginator = Paginator::initialize(PostPage {
            results: vec![summary("a"), summary("b")],
            next_page: Some("p2".to_string()),
        });
        paginator.load_more(&repo).await.unwrap();

        let uids: Vec<_> = paginator.posts().iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b", "c"]);
        assert!(!paginator.has_more());
        assert!(matches!(
            paginator.load_more(&repo).await,
            Err(PaginationError::Exhausted)
        ));
        assert_eq!(paginator.posts().len(), 3);
    }

    #[tokio::test]
    async fn test_duplicates_are_kept() {
        let repo = FixedPage(ApiPage {
            page: 2,
            total_pages: 3,
            next_page: Some("p3".to_string()),
            results: vec![post("B", "b", "2021-03-02T10:00:00+0000", "B")],
        });
        let mut paginator = Paginator::initialize(PostPage {
            results: vec![summary("a"), summary("b")],
            next_page: Some("p2".to_string()),
        });
        paginator.load_more(&repo).await.unwrap();
        paginator.load_more(&repo).await.unwrap();

        let uids: Vec<_> = paginator.posts().iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["a", "b", "b", "b"]);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_state() {
        let repo = MemoryRepository::new(Vec::new());
        let mut paginator = Paginator::initialize(PostPage {
            results: vec![summary("a")],
            next_page: Some("memory://search/7?page=2".to_string()),
        });
        assert!(matches!(
            paginator.load_more(&repo).await,
            Err(PaginationError::Fetch(CmsError::InvalidCursor(_)))
        ));
        assert_eq!(paginator.posts().len(), 1);
        assert_eq!(paginator.next_page(), Some("memory://search/7?page=2"));
    }

    #[tokio::test]
    async fn test_walk_all_pages() {
        let repo = sample_repository();
        let first = fetch_first_page(&repo, "posts", 2, None).await.unwrap();
        assert_eq!(first.results.len(), 2);
        assert!(first.next_page.is_some());

        let mut paginator = Paginator::initialize(first);
        paginator.load_all(&repo).await.unwrap();
        let uids: Vec<_> = paginator.posts().iter().map(|p| p.uid.as_str()).collect();
        assert_eq!(uids, vec!["post-a", "post-b", "post-c"]);
    }
}
