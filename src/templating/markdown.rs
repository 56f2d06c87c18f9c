//! The `markdown` filter.
//!
//! Converts Markdown text into OpenDocument markup. Each construct is named by
//! the HTML tag it would render as (`p`, `strong`, `li`, ...), and a
//! [`MarkdownMap`] says which ODF element, with which attributes, replaces
//! that tag. Constructs without an entry contribute only their content.
//!
//! ```toml
//! [markdown.strong]
//! replace_with = "text:span"
//! attributes = { "text:style-name" = "Bold" }
//! ```
//!
//! The filter output is marked safe. Since ODF list items cannot hold bare
//! text, inline content directly inside a list item is wrapped in the `p`
//! element.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tera::Value;

use super::filters::escape_odf;

/// ODF element standing in for one HTML tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownElement {
    pub replace_with: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl MarkdownElement {
    pub fn new(replace_with: impl Into<String>) -> Self {
        Self {
            replace_with: replace_with.into(),
            attributes: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Mapping from HTML tag names to ODF elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownMap {
    elements: HashMap<String, MarkdownElement>,
}

impl Default for MarkdownMap {
    fn default() -> Self {
        let style = |element: &str, name: &str| MarkdownElement::new(element).with_attribute("text:style-name", name);

        let mut elements = HashMap::from([
            ("p".to_string(), style("text:p", "Standard")),
            ("strong".to_string(), style("text:span", "Strong_20_Emphasis")),
            ("em".to_string(), style("text:span", "Emphasis")),
            ("del".to_string(), style("text:span", "Strikethrough")),
            ("code".to_string(), style("text:span", "Source_20_Text")),
            ("pre".to_string(), style("text:p", "Preformatted_20_Text")),
            ("ul".to_string(), MarkdownElement::new("text:list")),
            ("ol".to_string(), MarkdownElement::new("text:list")),
            ("li".to_string(), MarkdownElement::new("text:list-item")),
            ("a".to_string(), MarkdownElement::new("text:a").with_attribute("xlink:type", "simple")),
            ("br".to_string(), MarkdownElement::new("text:line-break")),
        ]);
        for level in 1..=6 {
            elements.insert(
                format!("h{level}"),
                MarkdownElement::new("text:h").with_attribute("text:outline-level", level.to_string()),
            );
        }
        Self {
            elements,
        }
    }
}

impl MarkdownMap {
    /// A map holding exactly `elements`.
    pub fn new(elements: HashMap<String, MarkdownElement>) -> Self {
        Self {
            elements,
        }
    }

    /// The default map with `extra` entries added or replacing defaults.
    pub fn with_entries(extra: &HashMap<String, MarkdownElement>) -> Self {
        let mut map = Self::default();
        for (tag, element) in extra {
            map.elements.insert(tag.to_lowercase(), element.clone());
        }
        map
    }

    pub fn get(&self, tag: &str) -> Option<&MarkdownElement> {
        self.elements.get(tag)
    }

    /// Convert `markdown` to ODF markup.
    pub fn to_odf(&self, markdown: &str) -> String {
        let options = Options::ENABLE_STRIKETHROUGH;
        let mut writer = OdfWriter::new(self);
        for event in Parser::new_ext(markdown, options) {
            writer.event(event);
        }
        writer.out
    }
}

/// List item being written.
struct OpenItem {
    /// Depth of the element stack just inside the item.
    depth: usize,
    /// Whether a wrapping paragraph is open.
    wrapped: bool,
}

struct OdfWriter<'a> {
    map: &'a MarkdownMap,
    out: String,
    /// Element written for each open construct, `None` when unmapped.
    open: Vec<Option<String>>,
    items: Vec<OpenItem>,
    code_block: Option<String>,
}

impl<'a> OdfWriter<'a> {
    fn new(map: &'a MarkdownMap) -> Self {
        Self {
            map,
            out: String::new(),
            open: Vec::new(),
            items: Vec::new(),
            code_block: None,
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => {
                self.end_item_paragraph();
                self.start("pre", &[]);
                self.start("code", &[]);
                self.code_block = Some(String::new());
            }
            Event::End(TagEnd::CodeBlock) => {
                let code = self.code_block.take().unwrap_or_default();
                self.out.push_str(&escape_odf(code.trim_end_matches('\n')));
                self.end();
                self.end();
            }
            Event::Start(Tag::Item) => {
                self.start("li", &[]);
                self.items.push(OpenItem {
                    depth: self.open.len(),
                    wrapped: false,
                });
            }
            Event::End(TagEnd::Item) => {
                self.end_item_paragraph();
                self.items.pop();
                self.end();
            }
            Event::Start(tag) => self.start_tag(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => match self.code_block.as_mut() {
                Some(code) => code.push_str(&text),
                None => self.inline_text(&text),
            },
            Event::Code(text) => {
                self.begin_inline();
                self.start("code", &[]);
                self.out.push_str(&escape_odf(&text));
                self.end();
            }
            Event::Html(html) | Event::InlineHtml(html) => self.inline_text(&html),
            Event::SoftBreak => self.inline_text(" "),
            Event::HardBreak => {
                self.begin_inline();
                self.empty("br", " ");
            }
            Event::Rule => {
                self.end_item_paragraph();
                self.empty("hr", "");
            }
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.start_block("p"),
            Tag::Heading {
                level,
                ..
            } => self.start_block(heading_tag(level)),
            Tag::BlockQuote(_) => self.start_block("blockquote"),
            Tag::List(Some(_)) => self.start_block("ol"),
            Tag::List(None) => self.start_block("ul"),
            Tag::Emphasis => self.start_inline("em", &[]),
            Tag::Strong => self.start_inline("strong", &[]),
            Tag::Strikethrough => self.start_inline("del", &[]),
            Tag::Link {
                dest_url,
                ..
            } => self.start_inline("a", &[("xlink:href", &*dest_url)]),
            Tag::Image {
                ..
            } => self.start_inline("img", &[]),
            _ => self.open.push(None),
        }
    }

    fn start_block(&mut self, tag: &str) {
        self.end_item_paragraph();
        self.start(tag, &[]);
    }

    fn start_inline(&mut self, tag: &str, extra: &[(&str, &str)]) {
        self.begin_inline();
        self.start(tag, extra);
    }

    fn inline_text(&mut self, text: &str) {
        self.begin_inline();
        self.out.push_str(&escape_odf(text));
    }

    /// Open the wrapping paragraph when inline content lands directly in an item.
    fn begin_inline(&mut self) {
        let depth = self.open.len();
        let needs_paragraph = self.items.last().is_some_and(|item| !item.wrapped && item.depth == depth);
        if needs_paragraph {
            self.start("p", &[]);
            if let Some(item) = self.items.last_mut() {
                item.wrapped = true;
            }
        }
    }

    /// Close the wrapping paragraph of the innermost item, if open.
    fn end_item_paragraph(&mut self) {
        let depth = self.open.len();
        let wrapped = self.items.last().is_some_and(|item| item.wrapped && item.depth + 1 == depth);
        if wrapped {
            self.end();
            if let Some(item) = self.items.last_mut() {
                item.wrapped = false;
            }
        }
    }

    fn start(&mut self, tag: &str, extra: &[(&str, &str)]) {
        match self.map.get(tag) {
            Some(element) => {
                self.open_element(element, extra, false);
                self.open.push(Some(element.replace_with.clone()));
            }
            None => self.open.push(None),
        }
    }

    fn end(&mut self) {
        if let Some(Some(name)) = self.open.pop() {
            self.out.push_str("</");
            self.out.push_str(&name);
            self.out.push('>');
        }
    }

    /// Write an element without content, or `fallback` when `tag` is unmapped.
    fn empty(&mut self, tag: &str, fallback: &str) {
        match self.map.get(tag) {
            Some(element) => self.open_element(element, &[], true),
            None => self.out.push_str(fallback),
        }
    }

    fn open_element(&mut self, element: &MarkdownElement, extra: &[(&str, &str)], empty: bool) {
        self.out.push('<');
        self.out.push_str(&element.replace_with);
        for (name, value) in &element.attributes {
            push_attribute(&mut self.out, name, value);
        }
        for (name, value) in extra {
            if !element.attributes.contains_key(*name) {
                push_attribute(&mut self.out, name, value);
            }
        }
        self.out.push_str(if empty { "/>" } else { ">" });
    }
}

fn push_attribute(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape(value));
    out.push('"');
}

fn heading_tag(level: HeadingLevel) -> &'static str {
    match level {
        HeadingLevel::H1 => "h1",
        HeadingLevel::H2 => "h2",
        HeadingLevel::H3 => "h3",
        HeadingLevel::H4 => "h4",
        HeadingLevel::H5 => "h5",
        HeadingLevel::H6 => "h6",
    }
}

/// The `markdown` Tera filter.
///
/// Values that are not strings render empty.
#[derive(Debug, Clone, Default)]
pub struct MarkdownFilter {
    map: MarkdownMap,
}

impl MarkdownFilter {
    pub fn new(map: MarkdownMap) -> Self {
        Self {
            map,
        }
    }
}

impl tera::Filter for MarkdownFilter {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let markup = value.as_str().map(|text| self.map.to_odf(text)).unwrap_or_default();
        Ok(Value::String(markup))
    }

    fn is_safe(&self) -> bool {
        true
    }
}
