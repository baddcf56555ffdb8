//! Preview mode
//!
//! A preview session is opened by exchanging a CMS preview token for a
//! redirect target. The token is then kept in the `preview_ref` cookie and
//! used as the content ref for every page rendered in that session.

use axum::http::{header, HeaderMap};
use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};

use crate::cms::{CmsError, ContentRepository};
use crate::helpers::{html_escape, js_string_escape, link_to};

/// Cookie carrying the preview ref
pub const PREVIEW_COOKIE: &str = "preview_ref";

/// Route that leaves preview mode
pub const EXIT_PREVIEW_PATH: &str = "/api/exit-preview";

/// Errors from the preview token exchange
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("Invalid token")]
    Unauthorized,

    #[error(transparent)]
    Fetch(CmsError),
}

impl From<CmsError> for PreviewError {
    fn from(err: CmsError) -> Self {
        match err {
            // The CMS rejects unknown or expired refs with a client error
            CmsError::Status { status, .. } if (400..500).contains(&status) => {
                PreviewError::Unauthorized
            }
            other => PreviewError::Fetch(other),
        }
    }
}

/// Map a document to the route that displays it
pub fn link_resolver(document_type: &str, kind: &str, uid: Option<&str>) -> String {
    match uid {
        Some(uid) if kind == document_type => format!("/post/{}", uid),
        _ => "/".to_string(),
    }
}

/// Resolve the page a preview session should open on
///
/// Looks up `document_id` under the preview `token`. A document that does
/// not exist under the ref redirects to the home page.
pub async fn resolve_preview(
    repo: &dyn ContentRepository,
    token: &str,
    document_id: &str,
    document_type: &str,
) -> Result<String, PreviewError> {
    if token.trim().is_empty() {
        return Err(PreviewError::Unauthorized);
    }

    let doc = repo.get_by_id(document_id, Some(token)).await?;
    let target = match doc {
        Some(doc) => link_resolver(document_type, &doc.kind, doc.uid.as_deref()),
        None => "/".to_string(),
    };
    tracing::debug!("Preview of {:?} resolved to {}", document_id, target);
    Ok(target)
}

/// Read the preview ref from a request's cookies
pub fn preview_ref_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .and_then(|(_, value)| percent_decode_str(value.trim()).decode_utf8().ok())
        .map(|value| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value opening a preview session
///
/// Refs are URLs, so the value is percent-encoded.
pub fn preview_cookie(reference: &str) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        PREVIEW_COOKIE,
        utf8_percent_encode(reference, NON_ALPHANUMERIC)
    )
}

/// `Set-Cookie` value ending a preview session
pub fn clear_preview_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", PREVIEW_COOKIE)
}

/// Body that sends the browser to `url`
pub fn redirect_html(url: &str) -> String {
    format!(
        r#"<!DOCTYPE html><html><head><meta http-equiv="Refresh" content="0; url={}" /><script>window.location.href = '{}'</script></head></html>"#,
        html_escape(url),
        js_string_escape(url)
    )
}

/// Exit affordance, rendered only in preview mode
pub fn exit_preview_button(preview: bool) -> String {
    if !preview {
        return String::new();
    }
    format!(
        r#"<aside class="preview">{}</aside>"#,
        link_to(EXIT_PREVIEW_PATH, "Sair do modo Preview", None)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cms::fixtures::{post, sample_repository};
    use axum::http::HeaderValue;

    #[test]
    fn test_gate_renders_affordance_only_in_preview() {
        assert_eq!(exit_preview_button(false), "");

        let html = exit_preview_button(true);
        assert_eq!(html.matches("Sair do modo Preview").count(), 1);
        assert!(html.contains(r#"href="/api/exit-preview""#));
    }

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(preview_ref_from_headers(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; preview_ref=abc123; other=1"),
        );
        assert_eq!(preview_ref_from_headers(&headers), Some("abc123".to_string()));

        headers.insert(header::COOKIE, HeaderValue::from_static("preview_ref="));
        assert_eq!(preview_ref_from_headers(&headers), None);
    }

    #[test]
    fn test_cookie_keeps_url_refs_intact() {
        let reference = "https://repo.prismic.io/previews/abc?websitePreviewId=x;y";
        let cookie = preview_cookie(reference);
        let value = cookie.split(';').next().unwrap();
        assert!(!value.contains('?'));

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(value).unwrap());
        assert_eq!(preview_ref_from_headers(&headers), Some(reference.to_string()));
    }

    #[test]
    fn test_link_resolver() {
        assert_eq!(link_resolver("posts", "posts", Some("hello")), "/post/hello");
        assert_eq!(link_resolver("posts", "page", Some("about")), "/");
        assert_eq!(link_resolver("posts", "posts", None), "/");
    }

    #[tokio::test]
    async fn test_resolve_preview() {
        let draft = post("B", "post-b", "2021-03-02T10:00:00+0000", "Rascunho");
        let repo = sample_repository().with_preview("tok", vec![draft]);

        let target = resolve_preview(&repo, "tok", "B", "posts").await.unwrap();
        assert_eq!(target, "/post/post-b");

        let missing = resolve_preview(&repo, "tok", "Z", "posts").await.unwrap();
        assert_eq!(missing, "/");
    }

    #[tokio::test]
    async fn test_invalid_token_is_unauthorized() {
        let repo = sample_repository();
        assert!(matches!(
            resolve_preview(&repo, "", "B", "posts").await,
            Err(PreviewError::Unauthorized)
        ));
        assert!(matches!(
            resolve_preview(&repo, "expired", "B", "posts").await,
            Err(PreviewError::Unauthorized)
        ));
    }

    #[test]
    fn test_redirect_html() {
        let html = redirect_html("/post/hello");
        assert!(html.contains(r#"content="0; url=/post/hello""#));
        assert!(html.contains("window.location.href = '/post/hello'"));
    }
}
