//! Builds the display fragment for a single order.

use std::fmt::Write as _;

use crate::config::FALLBACK_ACTION;
use crate::payload::{EngineConfig, Product};

use super::choice::{Chooser, choose};

pub const ROOT_CLASS: &str = "woo-notification";
pub const CONTENT_CLASS: &str = "woo-notif-content";
pub const IMAGE_WRAPPER_CLASS: &str = "woo-notif-image-wrapper";
pub const IMAGE_LINK_CLASS: &str = "woo-notif-image-link";
pub const IMAGE_CLASS: &str = "woo-notif-product-image";
pub const PRODUCT_LINK_CLASS: &str = "woo-notif-product-link";
pub const SCREEN_READER_CLASS: &str = "woo-notif-sr-only";

const NAME_TOKEN: &str = "{name}";
const ACTION_TOKEN: &str = "{action}";
const PRODUCT_TOKEN: &str = "{product}";
const ADDITIONAL_TOKEN: &str = "{additional_items}";

const QUALIFIERS: [&str; 2] = ["other", "more"];
const NOUNS: [&str; 2] = ["item", "product"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attributes: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

/// A ready-to-attach notification plus the sentence announced to assistive
/// technology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub root: Element,
    pub announcement: String,
}

impl From<Element> for Node {
    fn from(element: Element) -> Self {
        Self::Element(element)
    }
}

impl Element {
    pub const fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attributes.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.attribute("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.attributes.iter_mut().find(|(key, _)| *key == "class") {
            Some((_, classes)) if classes.is_empty() => classes.push_str(class),
            Some((_, classes)) => {
                classes.push(' ');
                classes.push_str(class);
            }
            None => self.attributes.push(("class", class.to_string())),
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        if let Some((_, classes)) = self.attributes.iter_mut().find(|(key, _)| *key == "class") {
            *classes = classes
                .split_whitespace()
                .filter(|c| *c != class)
                .collect::<Vec<_>>()
                .join(" ");
        }
    }

    /// Depth-first search for the first descendant (or self) with `class`.
    pub fn find_by_class(&self, class: &str) -> Option<&Self> {
        if self.has_class(class) {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            Node::Element(element) => element.find_by_class(class),
            Node::Text(_) => None,
        })
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(text),
                Node::Element(element) => element.collect_text(out),
            }
        }
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attributes {
            let _ = write!(out, " {name}=\"{}\"", escape(value));
        }
        out.push('>');
        if is_void(self.tag) {
            return;
        }
        for child in &self.children {
            match child {
                Node::Text(text) => out.push_str(&escape(text)),
                Node::Element(element) => element.write_html(out),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

impl Fragment {
    /// The visible sentence container.
    pub fn content(&self) -> Option<&Element> {
        self.root.find_by_class(CONTENT_CLASS)
    }

    /// The embedded product link inside the sentence, if the template had a
    /// `{product}` slot.
    pub fn product_link(&self) -> Option<&Element> {
        self.content()?.find_by_class(PRODUCT_LINK_CLASS)
    }
}

/// Renders one order into a fragment. Random picks happen in a fixed order:
/// action word, then the qualifier and noun of the additional-items phrase.
pub fn build_notification<C>(
    config: &EngineConfig,
    name: &str,
    product: &Product,
    additional_items: i64,
    chooser: &mut C,
) -> Fragment
where
    C: Chooser + ?Sized,
{
    let mut root = Element::new("div")
        .attr(
            "class",
            format!("{ROOT_CLASS} {}", config.position.class()),
        )
        .attr("role", "status")
        .attr("aria-live", "polite")
        .attr("aria-atomic", "true");

    if config.show_product_image {
        if let Some(image_url) = product.image_url.as_deref().filter(|url| !url.is_empty()) {
            root = root.child(product_image(product, image_url));
        }
    }

    let action = choose(chooser, &config.action_variations)
        .map_or(FALLBACK_ACTION, String::as_str);
    let additional = additional_items_phrase(config.show_additional_items, additional_items, chooser);

    let expanded = config
        .template
        .replacen(NAME_TOKEN, name, 1)
        .replacen(ACTION_TOKEN, action, 1)
        .replacen(ADDITIONAL_TOKEN, &additional, 1);
    let announcement = expanded.replacen(PRODUCT_TOKEN, &product.title, 1);

    let content = sentence_with_link(&expanded, product);
    root = root.child(content).child(
        Element::new("span")
            .attr("class", SCREEN_READER_CLASS)
            .text(announcement.clone()),
    );

    Fragment { root, announcement }
}

/// Trailing phrase for the items beyond the featured one. Empty when disabled
/// or when there is nothing extra to mention.
pub fn additional_items_phrase<C>(enabled: bool, count: i64, chooser: &mut C) -> String
where
    C: Chooser + ?Sized,
{
    if !enabled || count <= 0 {
        return String::new();
    }
    let qualifier = choose(chooser, &QUALIFIERS).copied().unwrap_or(QUALIFIERS[0]);
    let noun = choose(chooser, &NOUNS).copied().unwrap_or(NOUNS[0]);
    if count == 1 {
        format!(" and 1 {qualifier} {noun}")
    } else {
        format!(" and {count} {qualifier} {noun}s")
    }
}

fn product_image(product: &Product, image_url: &str) -> Element {
    Element::new("div").attr("class", IMAGE_WRAPPER_CLASS).child(
        Element::new("a")
            .attr("href", product.url.clone())
            .attr("class", IMAGE_LINK_CLASS)
            .child(
                Element::new("img")
                    .attr("src", image_url)
                    .attr("alt", product.title.clone())
                    .attr("class", IMAGE_CLASS),
            ),
    )
}

/// Splits the expanded template at the first `{product}` and puts a link
/// there. Surrounding text is kept byte for byte; empty segments are dropped.
fn sentence_with_link(expanded: &str, product: &Product) -> Element {
    let mut content = Element::new("div").attr("class", CONTENT_CLASS);
    let Some(at) = expanded.find(PRODUCT_TOKEN) else {
        if !expanded.is_empty() {
            content = content.text(expanded);
        }
        return content;
    };

    let (before, rest) = expanded.split_at(at);
    let after = &rest[PRODUCT_TOKEN.len()..];
    if !before.is_empty() {
        content = content.text(before);
    }
    content = content.child(
        Element::new("a")
            .attr("href", product.url.clone())
            .attr("class", PRODUCT_LINK_CLASS)
            .text(product.title.clone()),
    );
    if !after.is_empty() {
        content = content.text(after);
    }
    content
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn is_void(tag: &str) -> bool {
    matches!(tag, "img" | "br" | "hr" | "input")
}
