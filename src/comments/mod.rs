//! utterances comment widget
//!
//! The widget is a third-party script mounted into an anchor element. The
//! controller keeps at most one managed script under its anchor across
//! attach/detach cycles.

use crate::config::CommentsConfig;
use crate::helpers::html_escape;

/// A `<script>` element to inject
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptElement {
    pub src: String,
    pub is_async: bool,
    /// Attributes in insertion order
    pub attributes: Vec<(String, String)>,
}

impl ScriptElement {
    pub fn new(src: &str) -> Self {
        Self {
            src: src.to_string(),
            is_async: false,
            attributes: Vec::new(),
        }
    }

    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn to_html(&self) -> String {
        let mut html = format!(r#"<script src="{}""#, html_escape(&self.src));
        if self.is_async {
            html.push_str(" async");
        }
        for (name, value) in &self.attributes {
            html.push_str(&format!(r#" {}="{}""#, name, html_escape(value)));
        }
        html.push_str("></script>");
        html
    }
}

/// Element the widget mounts into
pub trait Anchor {
    fn append_child(&mut self, child: ScriptElement);

    /// Remove and return the first child, if any
    fn remove_first_child(&mut self) -> Option<ScriptElement>;

    fn child_count(&self) -> usize;
}

/// An anchor kept in memory, rendered as `<div id="...">`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryAnchor {
    pub id: String,
    pub children: Vec<ScriptElement>,
}

impl MemoryAnchor {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            children: Vec::new(),
        }
    }

    pub fn to_html(&self) -> String {
        let inner: String = self.children.iter().map(ScriptElement::to_html).collect();
        format!(r#"<div id="{}">{}</div>"#, html_escape(&self.id), inner)
    }
}

impl Anchor for MemoryAnchor {
    fn append_child(&mut self, child: ScriptElement) {
        self.children.push(child);
    }

    fn remove_first_child(&mut self) -> Option<ScriptElement> {
        if self.children.is_empty() {
            None
        } else {
            Some(self.children.remove(0))
        }
    }

    fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Mounts and unmounts the comment script
#[derive(Debug, Clone)]
pub struct CommentEmbed {
    config: CommentsConfig,
    mounted: bool,
}

impl CommentEmbed {
    pub fn new(config: CommentsConfig) -> Self {
        Self {
            config,
            mounted: false,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// The configured widget script
    pub fn script(&self) -> ScriptElement {
        let mut script = ScriptElement::new(&self.config.script_src);
        script.is_async = true;
        script.set_attribute("repo", &self.config.repository);
        script.set_attribute("issue-term", &self.config.issue_term);
        script.set_attribute("label", &self.config.label);
        script.set_attribute("theme", &self.config.theme);
        script.set_attribute("crossorigin", "anonymous");
        script
    }

    /// Inject the script into the anchor
    ///
    /// Returns whether a script was injected. A missing anchor or an
    /// already mounted widget is a no-op.
    pub fn attach(&mut self, anchor: Option<&mut dyn Anchor>) -> bool {
        let Some(anchor) = anchor else {
            tracing::warn!("Comment anchor is not attached; skipping widget");
            return false;
        };
        if self.mounted {
            return false;
        }

        anchor.append_child(self.script());
        self.mounted = true;
        true
    }

    /// Remove the first child of the anchor, undoing [`attach`](Self::attach)
    pub fn detach(&mut self, anchor: Option<&mut dyn Anchor>) -> bool {
        let Some(anchor) = anchor else {
            return false;
        };
        if !self.mounted {
            return false;
        }

        anchor.remove_first_child();
        self.mounted = false;
        true
    }

    /// Server-side markup: the anchor with the script mounted
    ///
    /// Without a configured repository the anchor is rendered empty.
    pub fn render(&self) -> String {
        let mut anchor = MemoryAnchor::new(&self.config.anchor_id);
        if self.config.repository.is_empty() {
            tracing::debug!("No comments repository configured");
            return anchor.to_html();
        }

        let mut embed = CommentEmbed::new(self.config.clone());
        embed.attach(Some(&mut anchor));
        anchor.to_html()
    }
}
