//! Generator module - renders pages from CMS content
//!
//! The same render paths back the static build and the server's
//! on-demand revalidation.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::cms::ContentRepository;
use crate::content::pagination::fetch_first_page;
use crate::content::{
    article::load_article, ArticleAssembler, ArticleRoute, ArticleState, PostPage, PostSummary,
    Paginator,
};
use crate::templates::Renderer;
use crate::Blog;

/// Outcome of a full build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub posts: usize,
    pub assets: usize,
}

/// Renders the home page and articles
pub struct Generator {
    blog: Blog,
    repo: Arc<dyn ContentRepository>,
    renderer: Renderer,
    assembler: ArticleAssembler,
}

impl Generator {
    /// Create a generator for the configured content source
    pub fn new(blog: &Blog) -> Result<Self> {
        Self::with_repository(blog, blog.repository()?)
    }

    pub fn with_repository(blog: &Blog, repo: Arc<dyn ContentRepository>) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            repo,
            renderer: Renderer::new(&blog.config)?,
            assembler: ArticleAssembler::new(blog.config.words_per_minute),
        })
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn repository(&self) -> &dyn ContentRepository {
        self.repo.as_ref()
    }

    fn document_type(&self) -> &str {
        &self.blog.config.cms.document_type
    }

    /// Fetch the first page of posts
    pub async fn first_page(&self, reference: Option<&str>) -> crate::Result<PostPage> {
        let page = fetch_first_page(
            self.repo.as_ref(),
            self.document_type(),
            self.blog.config.cms.page_size,
            reference,
        )
        .await?;
        Ok(page)
    }

    /// Render the home page
    pub async fn render_home(&self, reference: Option<&str>) -> crate::Result<String> {
        let page = self.first_page(reference).await?;
        let html = self
            .renderer
            .home(&page.results, page.next_page.as_deref(), reference.is_some())?;
        Ok(html)
    }

    /// Render an article page, or the loading placeholder for a fallback route
    pub async fn render_article(
        &self,
        route: &ArticleRoute,
        reference: Option<&str>,
    ) -> crate::Result<String> {
        let preview = reference.is_some();
        let state = load_article(
            self.repo.as_ref(),
            &self.assembler,
            self.document_type(),
            route,
            reference,
        )
        .await?;

        match state {
            ArticleState::Loading => Ok(self.renderer.loading(preview)),
            ArticleState::Ready(view) => Ok(self.renderer.article(&view, preview)?),
        }
    }

    /// Fetch the page behind a cursor and render its list entries
    pub async fn render_more(&self, cursor: &str) -> crate::Result<(PostPage, String)> {
        let page = Paginator::resume(cursor).load_more(self.repo.as_ref()).await?;
        let html = self.renderer.post_items(&page.results)?;
        Ok((page, html))
    }

    /// Walk every page of the post list
    pub async fn all_posts(&self) -> crate::Result<Vec<PostSummary>> {
        let mut paginator = Paginator::initialize(self.first_page(None).await?);
        paginator.load_all(self.repo.as_ref()).await?;
        Ok(paginator.into_posts())
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        let public_dir = &self.blog.public_dir;
        fs::create_dir_all(public_dir)
            .with_context(|| format!("Failed to create {:?}", public_dir))?;

        let assets = self.copy_static_assets()?;

        let home = self.render_home(None).await?;
        self.write_page("index.html", &home)?;

        let posts = self.all_posts().await?;
        tracing::info!("Found {} posts", posts.len());

        let count = self.generate_post_pages(&posts).await?;
        self.generate_posts_index(&posts)?;

        Ok(GenerateReport {
            posts: count,
            assets,
        })
    }

    /// Render `post/<uid>/index.html` once per distinct uid
    async fn generate_post_pages(&self, posts: &[PostSummary]) -> Result<usize> {
        let mut seen = HashSet::new();
        for post in posts {
            if !seen.insert(post.uid.as_str()) {
                tracing::debug!("Skipping repeated uid {}", post.uid);
                continue;
            }

            let route = ArticleRoute::Resolved(post.uid.clone());
            let html = self
                .render_article(&route, None)
                .await
                .with_context(|| format!("Failed to render post {:?}", post.uid))?;
            self.write_page(&format!("post/{}/index.html", post.uid), &html)?;
        }
        Ok(seen.len())
    }

    /// Write posts.json, the index of every post summary
    fn generate_posts_index(&self, posts: &[PostSummary]) -> Result<()> {
        let output_path = self.blog.public_dir.join("posts.json");
        let json = serde_json::to_string_pretty(posts)?;
        fs::write(&output_path, json)?;
        tracing::info!("Generated posts.json");
        Ok(())
    }

    /// Copy static assets to the public directory
    fn copy_static_assets(&self) -> Result<usize> {
        let static_dir = &self.blog.static_dir;
        if !static_dir.exists() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(static_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(static_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        tracing::debug!("Copied {} static files", copied);
        Ok(copied)
    }

    fn write_page(&self, relative: &str, html: &str) -> Result<PathBuf> {
        let output_path = self.blog.public_dir.join(relative);
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
        }
        fs::write(&output_path, html)
            .map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", output_path, e))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(output_path)
    }
}
