//! Page templates
//!
//! Pages are assembled from small escaped fragments. Every date goes
//! through [`DateFormatter`], so a malformed timestamp fails the render
//! instead of printing a placeholder.

use anyhow::Result;

use crate::comments::CommentEmbed;
use crate::config::SiteConfig;
use crate::content::{ArticleView, NeighborRef, PostSummary};
use crate::helpers::{html_escape, image_tag, link_to, meta_generator, time_tag, DateFormatter, FormatError};
use crate::preview::exit_preview_button;

/// Placeholder shown while an article is being built
pub const LOADING_TEXT: &str = "Carregando...";

/// Client side of the "load more" button
///
/// The button is disabled while a request is in flight, so repeated
/// clicks cannot append the same page twice.
const LOAD_MORE_SCRIPT: &str = r#"<script>
(function() {
    var button = document.getElementById('load-more');
    if (!button) return;
    var list = document.getElementById('posts');
    button.addEventListener('click', function() {
        var cursor = button.getAttribute('data-cursor');
        if (button.disabled || !cursor) return;
        button.disabled = true;
        fetch('/api/posts?cursor=' + encodeURIComponent(cursor))
            .then(function(res) {
                if (!res.ok) throw new Error('HTTP ' + res.status);
                return res.json();
            })
            .then(function(page) {
                list.insertAdjacentHTML('beforeend', page.html);
                if (page.next_page) {
                    button.setAttribute('data-cursor', page.next_page);
                    button.disabled = false;
                } else {
                    button.remove();
                }
            })
            .catch(function(err) {
                console.error(err);
                button.disabled = false;
            });
    });
})();
</script>"#;

/// Renders site pages
#[derive(Debug, Clone)]
pub struct Renderer {
    site_title: String,
    language: String,
    dates: DateFormatter,
    edited_format: String,
    comments: CommentEmbed,
}

impl Renderer {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        Ok(Self {
            site_title: config.title.clone(),
            language: config.language.clone(),
            dates: DateFormatter::new(config.tz()?, &config.date_format),
            edited_format: config.edited_format.clone(),
            comments: CommentEmbed::new(config.comments.clone()),
        })
    }

    /// Document shell around `body`
    pub fn layout(&self, title: &str, body: &str, preview: bool) -> String {
        format!(
            r#"<!DOCTYPE html>
<html lang="{lang}">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
{generator}
<title>{title}</title>
<link rel="stylesheet" href="/css/style.css">
</head>
<body>
<header class="header">{logo}</header>
<main class="container">
{body}
</main>
{preview}
</body>
</html>
"#,
            lang = html_escape(&self.language),
            generator = meta_generator(),
            title = html_escape(title),
            logo = link_to("/", &image_tag("/images/logo.svg", "logo"), None),
            body = body,
            preview = exit_preview_button(preview),
        )
    }

    /// Home page: the first page of posts plus the load-more control
    pub fn home(
        &self,
        posts: &[PostSummary],
        next_page: Option<&str>,
        preview: bool,
    ) -> Result<String, FormatError> {
        let mut body = format!(r#"<div class="posts" id="posts">{}</div>"#, self.post_items(posts)?);

        if let Some(cursor) = next_page {
            body.push_str(&format!(
                r#"<button type="button" id="load-more" class="load-more" data-cursor="{}">Carregar mais posts</button>"#,
                html_escape(cursor)
            ));
            body.push_str(LOAD_MORE_SCRIPT);
        }

        Ok(self.layout(&format!("Posts | {}", self.site_title), &body, preview))
    }

    /// List entries, also served as the load-more fragment
    pub fn post_items(&self, posts: &[PostSummary]) -> Result<String, FormatError> {
        let mut html = String::new();
        for post in posts {
            html.push_str(&self.post_item(post)?);
        }
        Ok(html)
    }

    fn post_item(&self, post: &PostSummary) -> Result<String, FormatError> {
        let badge = match &post.first_publication_date {
            Some(date) => time_tag(date, &self.dates.format(date, None)?, Some("calendar")),
            None => String::new(),
        };
        let inner = format!(
            r#"<strong>{}</strong><p>{}</p><div class="info">{}<span class="author">{}</span></div>"#,
            html_escape(&post.title),
            html_escape(&post.subtitle),
            badge,
            html_escape(&post.author)
        );
        Ok(format!(
            r#"<article class="post" data-uid="{}">{}</article>"#,
            html_escape(&post.uid),
            link_to(&post.path(), &inner, None)
        ))
    }

    /// Full article page
    pub fn article(&self, view: &ArticleView, preview: bool) -> Result<String, FormatError> {
        let article = &view.article;

        let mut info = String::new();
        if let Some(date) = &article.first_publication_date {
            info.push_str(&time_tag(date, &self.dates.format(date, None)?, Some("calendar")));
        }
        info.push_str(&format!(r#"<span class="author">{}</span>"#, html_escape(&article.author)));
        info.push_str(&format!(r#"<span class="reading-time">{} min</span>"#, view.reading_time));

        let edited = match (&article.last_publication_date, view.is_edited) {
            (Some(date), true) => format!(
                r#"<p class="edited">{}</p>"#,
                html_escape(&self.dates.format(date, Some(&self.edited_format))?)
            ),
            _ => String::new(),
        };

        let banner = if article.banner.url.is_empty() {
            String::new()
        } else {
            format!(r#"<div class="banner">{}</div>"#, image_tag(&article.banner.url, &article.title))
        };

        let sections: String = article
            .content
            .iter()
            .map(|section| {
                format!(
                    r#"<section id="{}"><h2>{}</h2><div class="body">{}</div></section>"#,
                    html_escape(&slug::slugify(&section.heading)),
                    html_escape(&section.heading),
                    section.body.as_html()
                )
            })
            .collect();

        let body = format!(
            r#"{banner}<article class="article"><h1>{title}</h1><div class="info">{info}</div>{edited}{sections}</article>{navigation}{comments}"#,
            banner = banner,
            title = html_escape(&article.title),
            info = info,
            edited = edited,
            sections = sections,
            navigation = navigation(view.prev_post.as_ref(), view.next_post.as_ref()),
            comments = self.comments.render(),
        );

        Ok(self.layout(&format!("{} | {}", article.title, self.site_title), &body, preview))
    }

    /// Placeholder for an article that is not built yet
    pub fn loading(&self, preview: bool) -> String {
        self.layout(
            &self.site_title,
            &format!(r#"<div class="loading">{}</div>"#, LOADING_TEXT),
            preview,
        )
    }

    /// Error page
    pub fn error(&self, status: u16, message: &str) -> String {
        self.layout(
            &format!("{} | {}", status, self.site_title),
            &format!(
                r#"<div class="error"><h1>{}</h1><p>{}</p></div>"#,
                status,
                html_escape(message)
            ),
            false,
        )
    }
}

/// Previous/next links; an absent neighbor renders nothing
fn navigation(prev: Option<&NeighborRef>, next: Option<&NeighborRef>) -> String {
    if prev.is_none() && next.is_none() {
        return String::new();
    }

    let link = |neighbor: Option<&NeighborRef>, label: &str, class: &str| match neighbor {
        Some(n) => format!(
            r#"<div class="{}"><span>{}</span>{}</div>"#,
            class,
            html_escape(&n.title),
            link_to(&n.path(), label, None)
        ),
        None => String::new(),
    };

    format!(
        r#"<nav class="navigation">{}{}</nav>"#,
        link(prev, "Post anterior", "prev"),
        link(next, "Próximo post", "next")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::rich_text::Block;
    use crate::content::{Article, ArticleAssembler, Banner, Neighbors, RichText, Section};

    fn renderer() -> Renderer {
        let mut config = SiteConfig::default();
        config.timezone = "UTC".to_string();
        config.comments.repository = "owner/comments".to_string();
        Renderer::new(&config).unwrap()
    }

    fn summary(uid: &str, date: Option<&str>) -> PostSummary {
        PostSummary {
            uid: uid.to_string(),
            first_publication_date: date.map(str::to_string),
            title: "Como utilizar Hooks".to_string(),
            subtitle: "Pensando em sincronização".to_string(),
            author: "Joseph Oliveira".to_string(),
        }
    }

    fn view(first: &str, last: &str, neighbors: Neighbors) -> ArticleView {
        let article = Article {
            id: "A".to_string(),
            uid: "hooks".to_string(),
            first_publication_date: Some(first.to_string()),
            last_publication_date: Some(last.to_string()),
            title: "Como utilizar Hooks".to_string(),
            author: "Joseph Oliveira".to_string(),
            banner: Banner {
                url: "https://images.example/banner.png".to_string(),
            },
            content: vec![Section {
                heading: "Proin et varius".to_string(),
                body: RichText(vec![Block::paragraph("Lorem ipsum dolor")]),
            }],
        };
        ArticleAssembler::default().assemble(article, neighbors)
    }

    #[test]
    fn test_home_lists_posts() {
        let html = renderer()
            .home(&[summary("hooks", Some("2021-03-15T19:25:28+0000"))], Some("https://cms/p2"), false)
            .unwrap();
        assert!(html.contains("<title>Posts | spacetraveling</title>"));
        assert!(html.contains(r#"<html lang="pt-BR">"#));
        assert!(html.contains(r#"href="/post/hooks""#));
        assert!(html.contains("15 mar 2021"));
        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains(r#"data-cursor="https://cms/p2""#));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_missing_date_omits_badge() {
        let html = renderer().post_items(&[summary("draft", None)]).unwrap();
        assert!(!html.contains("<time"));
        assert!(!html.contains("Invalid"));
        assert!(html.contains("Joseph Oliveira"));
    }

    #[test]
    fn test_last_page_has_no_load_more() {
        let html = renderer().home(&[summary("hooks", None)], None, true).unwrap();
        assert!(!html.contains("load-more"));
        assert_eq!(html.matches("Sair do modo Preview").count(), 1);
    }

    #[test]
    fn test_malformed_date_fails_render() {
        let err = renderer()
            .post_items(&[summary("bad", Some("yesterday"))])
            .unwrap_err();
        assert!(matches!(err, FormatError::InvalidTimestamp { .. }));
    }

    #[test]
    fn test_article_page() {
        let neighbors = Neighbors {
            prev_post: Some(NeighborRef {
                uid: "older".to_string(),
                title: "Post antigo".to_string(),
            }),
            next_post: None,
        };
        let html = renderer()
            .article(
                &view("2021-03-15T19:25:28+0000", "2021-03-25T19:25:28+0000", neighbors),
                false,
            )
            .unwrap();

        assert!(html.contains("<title>Como utilizar Hooks | spacetraveling</title>"));
        assert!(html.contains("1 min"));
        assert!(html.contains("* editado em 25 mar 2021, às 19:25"));
        assert!(html.contains(r#"<section id="proin-et-varius">"#));
        assert!(html.contains("Post anterior"));
        assert!(!html.contains("Próximo post"));
        assert!(html.contains(r#"<div id="comments"><script"#));
    }

    #[test]
    fn test_unedited_article_has_no_edited_line() {
        let html = renderer()
            .article(
                &view("2021-03-15T19:25:28+0000", "2021-03-15T19:25:28+0000", Neighbors::default()),
                false,
            )
            .unwrap();
        assert!(!html.contains("editado em"));
        assert!(!html.contains("navigation"));
    }

    #[test]
    fn test_loading_placeholder() {
        let html = renderer().loading(false);
        assert!(html.contains("Carregando..."));
    }
}
