//! HTTP server with on-demand revalidation
//!
//! Pages are rendered from the CMS and cached per route. Stale pages are
//! served while they re-render in the background. On a cache miss an
//! article is served from the static build when one exists; otherwise it
//! answers with the loading placeholder until its first render lands.
//! Preview requests always render fresh.

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::cache::{Lookup, RenderCache};
use crate::cms::CmsError;
use crate::config::RevalidateConfig;
use crate::content::{ArticleRoute, PaginationError, PostSummary};
use crate::generator::Generator;
use crate::preview::{
    clear_preview_cookie, preview_cookie, preview_ref_from_headers, redirect_html,
    resolve_preview, PreviewError,
};
use crate::{Blog, Error};

/// Seconds a client waits before retrying a page still being built
const LOADING_RETRY_SECS: &str = "1";

/// Shared server state
pub struct AppState {
    generator: Generator,
    cache: RenderCache,
    revalidate: RevalidateConfig,
    document_type: String,
    public_dir: PathBuf,
}

impl AppState {
    pub fn new(blog: &Blog, generator: Generator) -> Self {
        Self {
            generator,
            cache: RenderCache::new(),
            revalidate: blog.config.revalidate.clone(),
            document_type: blog.config.cms.document_type.clone(),
            public_dir: blog.public_dir.clone(),
        }
    }

    pub fn cache(&self) -> &RenderCache {
        &self.cache
    }
}

/// A cacheable page
#[derive(Debug, Clone, PartialEq, Eq)]
enum Page {
    Home,
    Post(String),
}

impl Page {
    fn route(&self) -> String {
        match self {
            Page::Home => "/".to_string(),
            Page::Post(uid) => format!("/post/{}", uid),
        }
    }

    /// File written for this page by the static build
    fn built_path(&self, public_dir: &std::path::Path) -> Option<PathBuf> {
        match self {
            Page::Home => Some(public_dir.join("index.html")),
            Page::Post(uid) => {
                let plain = !uid.is_empty()
                    && !uid.starts_with('.')
                    && !uid.contains(['/', '\\']);
                plain.then(|| public_dir.join("post").join(uid).join("index.html"))
            }
        }
    }

    fn ttl(&self, revalidate: &RevalidateConfig) -> Duration {
        match self {
            Page::Home => Duration::from_secs(revalidate.list_secs),
            Page::Post(_) => Duration::from_secs(revalidate.post_secs),
        }
    }
}

/// Start the server
pub async fn start(blog: &Blog, ip: &str, port: u16) -> Result<()> {
    let generator = Generator::new(blog)?;
    let state = Arc::new(AppState::new(blog, generator));
    let app = router(state, blog);

    // Parse address - handle "localhost" specially
    let bind_ip = if ip == "localhost" { "127.0.0.1" } else { ip };
    let addr: SocketAddr = format!("{}:{}", bind_ip, port).parse()?;

    println!("Server running at http://{}:{}", ip, port);
    println!("Press Ctrl+C to stop.");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the application router
pub fn router(state: Arc<AppState>, blog: &Blog) -> Router {
    let files = ServeDir::new(&blog.public_dir)
        .append_index_html_on_directories(true)
        .fallback(ServeDir::new(&blog.static_dir));

    Router::new()
        .route("/", get(home_handler))
        .route("/post/:uid", get(post_handler))
        .route("/api/posts", get(more_handler))
        .route("/api/preview", get(preview_handler))
        .route("/api/exit-preview", get(exit_preview_handler))
        .fallback_service(files)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Auth(PreviewError::Unauthorized) => (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "message": "Invalid token" })),
            )
                .into_response(),
            Error::Pagination(PaginationError::Exhausted)
            | Error::Pagination(PaginationError::Fetch(CmsError::InvalidCursor(_))) => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            _ if self.is_not_found() => (StatusCode::NOT_FOUND, self.to_string()).into_response(),
            _ => {
                tracing::error!("Request failed: {}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
            }
        }
    }
}

async fn render(state: &AppState, page: &Page, reference: Option<&str>) -> crate::Result<String> {
    match page {
        Page::Home => state.generator.render_home(reference).await,
        Page::Post(uid) => {
            let route = ArticleRoute::Resolved(uid.clone());
            state.generator.render_article(&route, reference).await
        }
    }
}

/// Render `page` and record the outcome in the cache
async fn render_into_cache(state: &AppState, page: &Page) -> crate::Result<String> {
    let route = page.route();
    match render(state, page, None).await {
        Ok(html) => {
            tracing::debug!("Rendered {}", route);
            state.cache.store(&route, html.clone());
            Ok(html)
        }
        Err(e) => {
            state.cache.fail(&route, e.is_not_found(), &e.to_string());
            Err(e)
        }
    }
}

/// Re-render `page` off the request path, unless a render is running
fn spawn_render(state: &Arc<AppState>, page: Page) {
    if !state.cache.begin(&page.route()) {
        return;
    }
    let state = Arc::clone(state);
    tokio::spawn(async move {
        if let Err(e) = render_into_cache(&state, &page).await {
            tracing::warn!("Background render of {} failed: {}", page.route(), e);
        }
    });
}

/// Serve the static build of `page`, seeding the cache with it
async fn built_page(state: &AppState, page: &Page) -> Option<String> {
    let path = page.built_path(&state.public_dir)?;
    let html = tokio::fs::read_to_string(&path).await.ok()?;
    tracing::debug!("Serving {} from {:?}", page.route(), path);
    if state.cache.begin(&page.route()) {
        state.cache.store(&page.route(), html.clone());
    }
    Some(html)
}

fn failed_page(state: &AppState, not_found: bool, message: &str) -> Response {
    let status = if not_found {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    let html = state.generator.renderer().error(status.as_u16(), message);
    (status, Html(html)).into_response()
}

async fn home_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    if let Some(reference) = preview_ref_from_headers(&headers) {
        return match render(&state, &Page::Home, Some(&reference)).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => e.into_response(),
        };
    }

    let page = Page::Home;
    match state.cache.lookup(&page.route(), page.ttl(&state.revalidate)) {
        Lookup::Fresh(html) => Html(html).into_response(),
        Lookup::Stale(html) => {
            spawn_render(&state, page);
            Html(html).into_response()
        }
        Lookup::Failed { not_found, message } => failed_page(&state, not_found, &message),
        Lookup::Missing | Lookup::Pending => {
            if let Some(html) = built_page(&state, &page).await {
                return Html(html).into_response();
            }
            // The list has no placeholder; render on the request path
            let result = if state.cache.begin(&page.route()) {
                render_into_cache(&state, &page).await
            } else {
                render(&state, &page, None).await
            };
            match result {
                Ok(html) => Html(html).into_response(),
                Err(e) => e.into_response(),
            }
        }
    }
}

async fn post_handler(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    headers: HeaderMap,
) -> Response {
    let page = Page::Post(uid);

    if let Some(reference) = preview_ref_from_headers(&headers) {
        return match render(&state, &page, Some(&reference)).await {
            Ok(html) => Html(html).into_response(),
            Err(e) => e.into_response(),
        };
    }

    match state.cache.lookup(&page.route(), page.ttl(&state.revalidate)) {
        Lookup::Fresh(html) => Html(html).into_response(),
        Lookup::Stale(html) => {
            spawn_render(&state, page);
            Html(html).into_response()
        }
        Lookup::Failed { not_found, message } => failed_page(&state, not_found, &message),
        Lookup::Missing | Lookup::Pending => {
            if let Some(html) = built_page(&state, &page).await {
                return Html(html).into_response();
            }
            spawn_render(&state, page);
            let html = state.generator.renderer().loading(false);
            (
                [(header::REFRESH, HeaderValue::from_static(LOADING_RETRY_SECS))],
                Html(html),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct MoreQuery {
    cursor: Option<String>,
}

/// Response of the load-more endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct MorePosts {
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
    /// Rendered list entries
    pub html: String,
}

async fn more_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MoreQuery>,
) -> Response {
    let Some(cursor) = query.cursor.filter(|c| !c.is_empty()) else {
        return Error::from(PaginationError::Exhausted).into_response();
    };

    match state.generator.render_more(&cursor).await {
        Ok((page, html)) => Json(MorePosts {
            next_page: page.next_page,
            results: page.results,
            html,
        })
        .into_response(),
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct PreviewQuery {
    #[serde(default)]
    token: String,
    #[serde(rename = "documentId", default)]
    document_id: String,
}

async fn preview_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PreviewQuery>,
) -> Response {
    let target = match resolve_preview(
        state.generator.repository(),
        &query.token,
        &query.document_id,
        &state.document_type,
    )
    .await
    {
        Ok(target) => target,
        Err(e) => return Error::from(e).into_response(),
    };

    let cookie = match HeaderValue::from_str(&preview_cookie(&query.token)) {
        Ok(cookie) => cookie,
        Err(_) => return Error::from(PreviewError::Unauthorized).into_response(),
    };
    tracing::info!("Preview session opened on {}", target);

    ([(header::SET_COOKIE, cookie)], Html(redirect_html(&target))).into_response()
}

async fn exit_preview_handler() -> Response {
    let mut response = Redirect::temporary("/").into_response();
    if let Ok(cookie) = HeaderValue::from_str(&clear_preview_cookie()) {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }
    response
}
