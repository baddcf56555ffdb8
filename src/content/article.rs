//! Article assembly
//!
//! Turns one article plus its two chronological neighbors into the view
//! model the post page renders: reading time, edited flag and navigation.

use super::{Article, NeighborRef};
use crate::cms::{CmsError, ContentRepository, Ordering, Predicate, QueryOptions};
use crate::helpers::{count_words, reading_time};

/// Everything the post page needs
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleView {
    pub article: Article,
    pub word_count: usize,
    /// Minutes, rounded up
    pub reading_time: usize,
    pub is_edited: bool,
    pub prev_post: Option<NeighborRef>,
    pub next_post: Option<NeighborRef>,
}

/// Previous and next articles around one article
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Neighbors {
    pub prev_post: Option<NeighborRef>,
    pub next_post: Option<NeighborRef>,
}

/// Route parameter of a post page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArticleRoute {
    /// The page has not been built yet and its uid is still unresolved
    Fallback,
    Resolved(String),
}

/// Outcome of loading a post page
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleState {
    Loading,
    Ready(Box<ArticleView>),
}

/// Derives article metadata
#[derive(Debug, Clone)]
pub struct ArticleAssembler {
    words_per_minute: usize,
}

impl Default for ArticleAssembler {
    fn default() -> Self {
        Self::new(200)
    }
}

impl ArticleAssembler {
    pub fn new(words_per_minute: usize) -> Self {
        Self { words_per_minute }
    }

    pub fn assemble(&self, article: Article, neighbors: Neighbors) -> ArticleView {
        let word_count = word_count(&article);
        let is_edited = is_edited(&article);

        ArticleView {
            reading_time: reading_time(word_count, self.words_per_minute),
            word_count,
            is_edited,
            article,
            prev_post: neighbors.prev_post,
            next_post: neighbors.next_post,
        }
    }
}

/// Words in every section heading and body
pub fn word_count(article: &Article) -> usize {
    let headings: usize = article
        .content
        .iter()
        .map(|section| count_words(&section.heading))
        .sum();
    let bodies: usize = article
        .content
        .iter()
        .map(|section| count_words(&section.body.as_text(" ")))
        .sum();
    headings + bodies
}

/// Raw timestamps differ, regardless of how they would render
pub fn is_edited(article: &Article) -> bool {
    article.first_publication_date != article.last_publication_date
}

/// Look up the neighbors of the document with `id`
///
/// Both lookups ask for the single document `after` the current one: by
/// first publication date descending for the previous post and ascending
/// for the next. Each runs as an independent query.
pub async fn resolve_neighbors(
    repo: &dyn ContentRepository,
    document_type: &str,
    id: &str,
) -> Result<Neighbors, CmsError> {
    let predicates = [Predicate::document_type(document_type)];
    let neighbor_query = |ordering: Ordering| QueryOptions {
        fetch: vec![format!("{}.title", document_type)],
        page_size: Some(1),
        after: Some(id.to_string()),
        orderings: vec![ordering],
        ..QueryOptions::default()
    };
    let prev_options = neighbor_query(Ordering::desc("document.first_publication_date"));
    let next_options = neighbor_query(Ordering::asc("document.first_publication_date"));

    let (prev, next) = tokio::join!(
        repo.query(&predicates, &prev_options),
        repo.query(&predicates, &next_options)
    );

    Ok(Neighbors {
        prev_post: prev?.results.first().map(NeighborRef::from_document),
        next_post: next?.results.first().map(NeighborRef::from_document),
    })
}

/// Fetch an article by uid and assemble its view
///
/// `reference` selects a preview ref for the article itself; neighbors
/// always come from the published content.
pub async fn load_article(
    repo: &dyn ContentRepository,
    assembler: &ArticleAssembler,
    document_type: &str,
    route: &ArticleRoute,
    reference: Option<&str>,
) -> Result<ArticleState, CmsError> {
    let uid = match route {
        ArticleRoute::Fallback => return Ok(ArticleState::Loading),
        ArticleRoute::Resolved(uid) => uid,
    };

    let doc = repo.get_by_uid(document_type, uid, reference).await?;
    let article = Article::from_document(&doc)?;
    let neighbors = resolve_neighbors(repo, document_type, &article.id).await?;
    tracing::debug!(
        "Assembled {} (prev: {:?}, next: {:?})",
        uid,
        neighbors.prev_post.as_ref().map(|n| &n.uid),
        neighbors.next_post.as_ref().map(|n| &n.uid)
    );

    Ok(ArticleState::Ready(Box::new(assembler.assemble(article, neighbors))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::{post, sample_repository};
    use crate::cms::{ApiPage, Document, MemoryRepository};
    use crate::content::{Banner, RichText, Section};
    use crate::content::rich_text::Block;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn article(first: Option<&str>, last: Option<&str>, sections: Vec<Section>) -> Article {
        Article {
            id: "A".to_string(),
            uid: "a".to_string(),
            first_publication_date: first.map(str::to_string),
            last_publication_date: last.map(str::to_string),
            title: "A".to_string(),
            author: "Autor".to_string(),
            banner: Banner::default(),
            content: sections,
        }
    }

    fn section(heading: &str, body: &str) -> Section {
        Section {
            heading: heading.to_string(),
            body: RichText(vec![Block::paragraph(body)]),
        }
    }

    #[test]
    fn test_reading_time() {
        let body = vec!["palavra"; 399].join(" ");
        // 1 heading word + 399 body words
        let view = ArticleAssembler::default().assemble(
            article(None, None, vec![section("Título", &body)]),
            Neighbors::default(),
        );
        assert_eq!(view.word_count, 400);
        assert_eq!(view.reading_time, 2);

        let view = ArticleAssembler::default().assemble(
            article(None, None, vec![section("Dois títulos", &body)]),
            Neighbors::default(),
        );
        assert_eq!(view.reading_time, 3);
    }

    #[test]
    fn test_empty_article_reads_in_zero_minutes() {
        let view = ArticleAssembler::default().assemble(article(None, None, vec![]), Neighbors::default());
        assert_eq!(view.word_count, 0);
        assert_eq!(view.reading_time, 0);
    }

    #[test]
    fn test_edited_flag_uses_raw_timestamps() {
        let same = article(
            Some("2021-03-25T19:25:28+0000"),
            Some("2021-03-25T19:25:28+0000"),
            vec![],
        );
        assert!(!is_edited(&same));

        // Same minute, different seconds: renders identically, still edited
        let edited = article(
            Some("2021-03-25T19:25:28+0000"),
            Some("2021-03-25T19:25:59+0000"),
            vec![],
        );
        assert!(is_edited(&edited));

        let never_published = article(None, None, vec![]);
        assert!(!is_edited(&never_published));
    }

    #[tokio::test]
    async fn test_resolve_neighbors() {
        let repo = sample_repository();

        let middle = resolve_neighbors(&repo, "posts", "B").await.unwrap();
        assert_eq!(middle.prev_post.as_ref().map(|n| n.uid.as_str()), Some("post-a"));
        assert_eq!(middle.prev_post.as_ref().map(|n| n.title.as_str()), Some("Post A"));
        assert_eq!(middle.next_post.as_ref().map(|n| n.uid.as_str()), Some("post-c"));

        let oldest = resolve_neighbors(&repo, "posts", "A").await.unwrap();
        assert_eq!(oldest.prev_post, None);
        assert_eq!(oldest.next_post.map(|n| n.uid), Some("post-b".to_string()));

        let newest = resolve_neighbors(&repo, "posts", "C").await.unwrap();
        assert_eq!(newest.next_post, None);
    }

    /// Counts calls and fails every query
    struct Unreachable(AtomicUsize);

    #[async_trait]
    impl ContentRepository for Unreachable {
        async fn query(&self, _: &[Predicate], _: &QueryOptions) -> Result<ApiPage, CmsError> {
            self.0.fetch_add(1, AtomicOrdering::SeqCst);
            Err(CmsError::NoMasterRef)
        }
        async fn get_by_uid(&self, _: &str, _: &str, _: Option<&str>) -> Result<Document, CmsError> {
            self.0.fetch_add(1, AtomicOrdering::SeqCst);
            Err(CmsError::NoMasterRef)
        }
        async fn get_by_id(&self, _: &str, _: Option<&str>) -> Result<Option<Document>, CmsError> {
            self.0.fetch_add(1, AtomicOrdering::SeqCst);
            Err(CmsError::NoMasterRef)
        }
        async fn fetch_page(&self, _: &str) -> Result<ApiPage, CmsError> {
            self.0.fetch_add(1, AtomicOrdering::SeqCst);
            Err(CmsError::NoMasterRef)
        }
    }

    #[tokio::test]
    async fn test_fallback_route_does_no_work() {
        let repo = Unreachable(AtomicUsize::new(0));
        let state = load_article(
            &repo,
            &ArticleAssembler::default(),
            "posts",
            &ArticleRoute::Fallback,
            None,
        )
        .await
        .unwrap();
        assert_eq!(state, ArticleState::Loading);
        assert_eq!(repo.0.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_load_article_with_preview_ref() {
        let mut draft = post("B", "post-b", "2021-03-02T10:00:00+0000", "Rascunho");
        draft.last_publication_date = Some("2021-03-09T10:00:00+0000".to_string());
        let repo = sample_repository().with_preview("tok", vec![draft]);

        let route = ArticleRoute::Resolved("post-b".to_string());
        let state = load_article(&repo, &ArticleAssembler::default(), "posts", &route, Some("tok"))
            .await
            .unwrap();

        let ArticleState::Ready(view) = state else {
            panic!("expected a ready article");
        };
        assert_eq!(view.article.title, "Rascunho");
        assert!(view.is_edited);
        assert_eq!(view.prev_post.map(|n| n.title), Some("Post A".to_string()));
    }

    #[tokio::test]
    async fn test_unpublished_draft_has_no_neighbors() {
        let draft = post("D", "post-d", "2021-03-04T10:00:00+0000", "Rascunho");
        let repo = sample_repository().with_preview("tok", vec![draft]);

        let route = ArticleRoute::Resolved("post-d".to_string());
        let state = load_article(&repo, &ArticleAssembler::default(), "posts", &route, Some("tok"))
            .await
            .unwrap();

        let ArticleState::Ready(view) = state else {
            panic!("expected a ready article");
        };
        assert_eq!(view.article.title, "Rascunho");
        assert!(view.prev_post.is_none());
        assert!(view.next_post.is_none());
    }

    #[tokio::test]
    async fn test_missing_article_propagates() {
        let repo = MemoryRepository::new(Vec::new());
        let route = ArticleRoute::Resolved("nope".to_string());
        let err = load_article(&repo, &ArticleAssembler::default(), "posts", &route, None)
            .await
            .unwrap_err();
        assert!(matches!(err, CmsError::NotFound { .. }));
    }
}
