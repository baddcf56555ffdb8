//! HTML helper functions

/// Generate an anchor tag; `inner` is inserted as-is
///
/// # Examples
/// ```ignore
/// link_to("/post/hello", "<strong>Hello</strong>", None) // -> <a href="/post/hello">...</a>
/// ```
pub fn link_to(href: &str, inner: &str, class: Option<&str>) -> String {
    match class {
        Some(class) => format!(
            r#"<a href="{}" class="{}">{}</a>"#,
            html_escape(href),
            html_escape(class),
            inner
        ),
        None => format!(r#"<a href="{}">{}</a>"#, html_escape(href), inner),
    }
}

/// Generate an image tag
pub fn image_tag(src: &str, alt: &str) -> String {
    format!(
        r#"<img src="{}" alt="{}" />"#,
        html_escape(src),
        html_escape(alt)
    )
}

/// Generate a <time> element keeping the raw timestamp as `datetime`
pub fn time_tag(datetime: &str, display: &str, class: Option<&str>) -> String {
    let class_attr = class
        .map(|c| format!(r#" class="{}""#, html_escape(c)))
        .unwrap_or_default();
    format!(
        r#"<time datetime="{}"{}>{}</time>"#,
        html_escape(datetime),
        class_attr,
        html_escape(display)
    )
}

/// Generate a meta generator tag
pub fn meta_generator() -> String {
    format!(
        r#"<meta name="generator" content="spacetraveling {}">"#,
        env!("CARGO_PKG_VERSION")
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Escape a string for use inside a single-quoted JavaScript literal
pub fn js_string_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            _ => out.push(c),
        }
    }
    out
}
