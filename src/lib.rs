//! spacetraveling: a Prismic-backed blog
//!
//! Posts are fetched from a headless CMS, rendered to static HTML and
//! served with on-demand revalidation, preview mode and utterances
//! comments.

pub mod cache;
pub mod cms;
pub mod commands;
pub mod comments;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod preview;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use cms::{ContentRepository, MemoryRepository, PrismicClient};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Static assets copied verbatim into the output
    pub static_dir: PathBuf,
}

impl Blog {
    /// Create a new Blog instance from a directory
    ///
    /// `_config.yml` is optional; environment overrides are applied on top.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            config::SiteConfig::default()
        };
        config.apply_env();
        config.tz()?;

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Blog from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        let static_dir = base_dir.join(&config.static_dir);

        Self {
            config,
            base_dir,
            public_dir,
            static_dir,
        }
    }

    /// The configured content source
    ///
    /// A fixtures file takes precedence over the HTTP endpoint.
    pub fn repository(&self) -> anyhow::Result<Arc<dyn ContentRepository>> {
        if let Some(path) = self.config.fixtures_path(&self.base_dir) {
            tracing::info!("Serving content from fixtures {:?}", path);
            return Ok(Arc::new(MemoryRepository::load(&path)?));
        }

        if self.config.cms.endpoint.is_empty() {
            anyhow::bail!(
                "No CMS configured: set cms.endpoint in _config.yml or PRISMIC_API_ENDPOINT"
            );
        }
        Ok(Arc::new(PrismicClient::new(
            &self.config.cms.endpoint,
            self.config.cms.access_token.clone(),
        )))
    }

    /// Generate the static site
    pub async fn generate(&self) -> anyhow::Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> anyhow::Result<()> {
        commands::clean::run(self)
    }
}
