//! Site configuration (_config.yml)

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::helpers::{DEFAULT_DATE_FORMAT, EDITED_DATE_FORMAT};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub language: String,
    pub timezone: String,

    // Directory
    pub public_dir: String,
    pub static_dir: String,

    // Date / Time format
    pub date_format: String,
    pub edited_format: String,

    // Reading time
    pub words_per_minute: usize,

    #[serde(default)]
    pub cms: CmsConfig,
    #[serde(default)]
    pub comments: CommentsConfig,
    #[serde(default)]
    pub revalidate: RevalidateConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            language: "pt-BR".to_string(),
            timezone: "America/Sao_Paulo".to_string(),

            public_dir: "public".to_string(),
            static_dir: "static".to_string(),

            date_format: DEFAULT_DATE_FORMAT.to_string(),
            edited_format: EDITED_DATE_FORMAT.to_string(),

            words_per_minute: 200,

            cms: CmsConfig::default(),
            comments: CommentsConfig::default(),
            revalidate: RevalidateConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config {:?}", path.as_ref()))?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Override settings from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override settings from a key lookup
    ///
    /// Recognized keys: `PRISMIC_API_ENDPOINT`, `PRISMIC_ACCESS_TOKEN`,
    /// `UTTERANCES_REPO`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = lookup("PRISMIC_API_ENDPOINT") {
            tracing::debug!("CMS endpoint taken from environment");
            self.cms.endpoint = endpoint;
        }
        if let Some(token) = lookup("PRISMIC_ACCESS_TOKEN") {
            self.cms.access_token = Some(token);
        }
        if let Some(repository) = lookup("UTTERANCES_REPO") {
            self.comments.repository = repository;
        }
    }

    /// Parse the configured timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone {:?}: {}", self.timezone, e))
    }

    /// Resolve the fixtures path against the site directory
    pub fn fixtures_path(&self, base_dir: &Path) -> Option<PathBuf> {
        self.cms.fixtures.as_ref().map(|p| {
            if p.is_absolute() {
                p.clone()
            } else {
                base_dir.join(p)
            }
        })
    }
}

/// Headless CMS connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CmsConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: Option<String>,
    pub document_type: String,
    /// Posts per list page
    pub page_size: usize,
    /// Serve documents from a local JSON file instead of the API
    pub fixtures: Option<PathBuf>,
}

impl Default for CmsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: None,
            document_type: "posts".to_string(),
            page_size: 2,
            fixtures: None,
        }
    }
}

/// utterances comment widget
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    /// GitHub repository backing the comments, `owner/name`
    pub repository: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
    pub script_src: String,
    pub anchor_id: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            issue_term: "pathname".to_string(),
            label: "Comment".to_string(),
            theme: "dark-blue".to_string(),
            script_src: "https://utteranc.es/client.js".to_string(),
            anchor_id: "comments".to_string(),
        }
    }
}

/// How long rendered pages stay fresh, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RevalidateConfig {
    pub list_secs: u64,
    pub post_secs: u64,
}

impl Default for RevalidateConfig {
    fn default() -> Self {
        Self {
            list_secs: 60,
            post_secs: 60 * 5,
        }
    }
}
