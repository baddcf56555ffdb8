//! Structured rich text as delivered by the CMS
//!
//! A rich text field is a list of blocks (paragraphs, headings, list
//! items, images, embeds), each carrying plain text plus formatting spans
//! given as character offsets.

use serde::{Deserialize, Serialize};

use crate::helpers::html_escape;

/// An ordered sequence of rich text blocks
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RichText(pub Vec<Block>);

/// One rich text block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub spans: Vec<Span>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<serde_json::Value>,
}

impl Block {
    pub fn paragraph(text: &str) -> Self {
        Self {
            kind: "paragraph".to_string(),
            text: text.to_string(),
            spans: Vec::new(),
            url: None,
            alt: None,
            oembed: None,
        }
    }
}

/// Inline formatting over `[start, end)` character offsets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

#[derive(PartialEq)]
enum ListKind {
    Unordered,
    Ordered,
}

impl RichText {
    pub fn blocks(&self) -> &[Block] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flatten to plain text, joining non-empty blocks with `separator`
    pub fn as_text(&self, separator: &str) -> String {
        self.0
            .iter()
            .filter(|b| !b.text.is_empty())
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Render to HTML
    pub fn as_html(&self) -> String {
        let mut html = String::new();
        let mut list: Option<ListKind> = None;

        for block in &self.0 {
            let item_kind = match block.kind.as_str() {
                "list-item" => Some(ListKind::Unordered),
                "o-list-item" => Some(ListKind::Ordered),
                _ => None,
            };

            if list.is_some() && list != item_kind {
                html.push_str(close_list(list.take()));
            }
            if let Some(kind) = item_kind {
                if list.is_none() {
                    html.push_str(match kind {
                        ListKind::Unordered => "<ul>",
                        ListKind::Ordered => "<ol>",
                    });
                    list = Some(kind);
                }
                html.push_str(&format!("<li>{}</li>", render_spans(&block.text, &block.spans)));
                continue;
            }

            html.push_str(&render_block(block));
        }

        if list.is_some() {
            html.push_str(close_list(list));
        }

        html
    }
}

fn close_list(kind: Option<ListKind>) -> &'static str {
    match kind {
        Some(ListKind::Ordered) => "</ol>",
        Some(ListKind::Unordered) => "</ul>",
        None => "",
    }
}

fn render_block(block: &Block) -> String {
    let inner = || render_spans(&block.text, &block.spans);

    match block.kind.as_str() {
        "heading1" | "heading2" | "heading3" | "heading4" | "heading5" | "heading6" => {
            let level = &block.kind["heading".len()..];
            format!("<h{}>{}</h{}>", level, inner(), level)
        }
        "preformatted" => format!("<pre>{}</pre>", inner()),
        "image" => format!(
            r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
            html_escape(block.url.as_deref().unwrap_or_default()),
            html_escape(block.alt.as_deref().unwrap_or_default())
        ),
        "embed" => {
            let oembed = block.oembed.as_ref();
            let field = |name: &str| {
                oembed
                    .and_then(|o| o.get(name))
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string()
            };
            // oEmbed markup is trusted CMS output
            format!(
                r#"<div data-oembed="{}" data-oembed-type="{}">{}</div>"#,
                html_escape(&field("embed_url")),
                html_escape(&field("type")),
                field("html")
            )
        }
        _ => format!("<p>{}</p>", inner()),
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind.as_str() {
        "strong" => "<strong>".to_string(),
        "em" => "<em>".to_string(),
        "hyperlink" => {
            let url = span
                .data
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let target = span
                .data
                .get("target")
                .and_then(|v| v.as_str())
                .map(|t| format!(r#" target="{}" rel="noopener noreferrer""#, html_escape(t)))
                .unwrap_or_default();
            format!(r#"<a href="{}"{}>"#, html_escape(url), target)
        }
        "label" => {
            let label = span
                .data
                .get("label")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            format!(r#"<span class="{}">"#, html_escape(label))
        }
        _ => String::new(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind.as_str() {
        "strong" => "</strong>",
        "em" => "</em>",
        "hyperlink" => "</a>",
        "label" => "</span>",
        _ => "",
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        '"' => out.push_str("&quot;"),
        '\'' => out.push_str("&#39;"),
        '\n' => out.push_str("<br />"),
        _ => out.push(c),
    }
}

/// Render text with its spans, closing and reopening tags where spans overlap
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();

    let mut pending: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len)
        .collect();
    // Outer (longer) spans open first
    pending.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut next = 0;

    for i in 0..=len {
        if let Some(k) = open.iter().position(|s| s.end.min(len) <= i) {
            let mut reopen = Vec::new();
            while open.len() > k {
                if let Some(span) = open.pop() {
                    out.push_str(close_tag(span));
                    if span.end.min(len) > i {
                        reopen.push(span);
                    }
                }
            }
            for span in reopen.into_iter().rev() {
                out.push_str(&open_tag(span));
                open.push(span);
            }
        }

        while next < pending.len() && pending[next].start == i {
            out.push_str(&open_tag(pending[next]));
            open.push(pending[next]);
            next += 1;
        }

        if i < len {
            push_escaped(&mut out, chars[i]);
        }
    }

    out
}
