//! The render pipeline.
//!
//! [`OdtRenderer`] drives one document part through every stage:
//!
//! 1. scan the fields holding template syntax and take the tag census;
//! 2. resolve each tag's scope and rewrite the tree so the tag's literal text
//!    sits where its block or value belongs;
//! 3. serialize, undo escaping inside tags, and rewrite private-scheme links;
//! 4. expand the text with the [`ExpansionDelegate`];
//! 5. parse the result into a fresh tree;
//! 6. embed images referenced by frames through a [`MediaWriter`].
//!
//! Steps 1 to 5 run on a clone of the input tree, so a failed render never
//! leaves the caller's document partially rewritten.

use serde::Serialize;
use serde_json::Value;

use super::delegate::{ExpansionDelegate, TeraDelegate};
use super::markdown::MarkdownMap;
use super::escape::EscapeNormalizer;
use super::media::{MediaReport, MediaWriter, resolve_media};
use super::patterns::{TagKind, TagPatterns};
use super::reparse::reparse;
use super::rewriter;
use super::scanner::{Census, TemplateTag, tags_in_document};
use super::scope::{Placement, ScopeResolver, ScopeTable};
use crate::config::RenderConfig;
use crate::core::OdtError;
use crate::package::OdtPackage;
use crate::xml::Document;

/// Rendered content and styles trees plus the media outcome.
#[derive(Debug)]
pub struct RenderedParts {
    pub content: Document,
    pub styles: Document,
    pub media: MediaReport,
}

/// How one tag would be rewritten, as reported by [`OdtRenderer::inspect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagReport {
    pub content: String,
    pub kind: TagKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    /// Element name of the placeholder (`text:text-input` for print tags)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Why the tag cannot be placed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Renders OpenDocument XML parts through an expansion backend.
///
/// The renderer holds no per-render state; one instance can render any number
/// of documents, from several threads when the delegate allows it.
#[derive(Debug, Clone)]
pub struct OdtRenderer<D = TeraDelegate> {
    patterns: TagPatterns,
    scopes: ScopeTable,
    normalizer: EscapeNormalizer,
    markdown_marker: String,
    delegate: D,
}

impl OdtRenderer<TeraDelegate> {
    /// Create a renderer backed by [`TeraDelegate`].
    ///
    /// # Errors
    ///
    /// Returns [`OdtError::Config`] when the configured delimiters differ from
    /// Tera's.
    pub fn with_config(config: &RenderConfig) -> Result<Self, OdtError> {
        let mut delegate = TeraDelegate::new().with_markdown_map(MarkdownMap::with_entries(&config.markdown));
        if let Some(media_dir) = &config.media_dir {
            delegate = delegate.with_media_dir(media_dir.clone());
        }
        Self::new(config, delegate)
    }
}

impl<D: ExpansionDelegate> OdtRenderer<D> {
    /// Create a renderer for `delegate`.
    ///
    /// # Errors
    ///
    /// Returns [`OdtError::Config`] when the configured delimiters are not the
    /// delegate's, or when a delimiter or the link scheme does not compile into
    /// a pattern.
    pub fn new(config: &RenderConfig, delegate: D) -> Result<Self, OdtError> {
        let delimiters = delegate.delimiters();
        if delimiters != config.delimiters {
            return Err(OdtError::Config(format!(
                "configured delimiters {:?} do not match the expansion backend's {:?}",
                config.delimiters, delimiters
            )));
        }

        let patterns = TagPatterns::new(&config.delimiters)?;
        let normalizer =
            EscapeNormalizer::new(&patterns, &config.link_scheme, config.max_unescape_passes)?;

        Ok(Self {
            patterns,
            scopes: ScopeTable::with_entries(&config.scopes),
            normalizer,
            markdown_marker: config.markdown_marker.clone(),
            delegate,
        })
    }

    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    pub fn scopes(&self) -> &ScopeTable {
        &self.scopes
    }

    /// Template tags of `document` in document order.
    pub fn scan<'a>(&'a self, document: &'a Document) -> impl Iterator<Item = TemplateTag> + 'a {
        tags_in_document(document, &self.patterns)
    }

    fn resolver<'a>(&'a self, census: &'a Census) -> ScopeResolver<'a> {
        ScopeResolver::new(&self.scopes, census, &self.markdown_marker)
    }

    /// Rewrite every template tag of `document` in place and return how many
    /// were rewritten.
    ///
    /// Tags are processed in document order against a census taken up front.
    /// A tag whose field was removed together with an earlier tag's
    /// placeholder is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`OdtError::StructuralTag`] for a tag that cannot be placed. The
    /// document may then be partially rewritten; [`render_xml`](Self::render_xml)
    /// works on a copy for that reason.
    pub fn prepare(&self, document: &mut Document) -> Result<usize, OdtError> {
        let tags: Vec<TemplateTag> = self.scan(document).collect();
        let census = Census::take(document, &tags);
        let resolver = self.resolver(&census);

        let mut rewritten = 0;
        for tag in &tags {
            if !document.is_attached(tag.node) {
                tracing::debug!("Skipping tag '{}' removed with an earlier placeholder", tag.content);
                continue;
            }
            let resolution = resolver.resolve(document, tag)?;
            rewriter::apply(document, tag, &resolution)?;
            rewritten += 1;
        }

        tracing::debug!("Rewrote {} of {} template tag(s)", rewritten, tags.len());
        Ok(rewritten)
    }

    /// Render one XML part into a new document.
    ///
    /// # Errors
    ///
    /// - [`OdtError::StructuralTag`] when a tag cannot be placed
    /// - [`OdtError::MalformedOutput`] when unescaping does not settle or the
    ///   expanded text is not well-formed XML
    /// - [`OdtError::Expansion`] when the delegate fails
    pub fn render_xml(&self, document: &Document, context: &Value) -> Result<Document, OdtError> {
        let mut working = document.clone();
        self.prepare(&mut working)?;

        let serialized = working.to_xml()?;
        let source = self.normalizer.normalize(&serialized, |expr| self.delegate.mark_safe(expr))?;

        let expanded = self.delegate.render(&source, context).map_err(|err| {
            tracing::error!("Template expansion failed: {}", err);
            tracing::debug!("Template source:\n{}", source);
            err
        })?;

        reparse(&expanded)
    }

    /// Render the content and styles parts and embed their media.
    ///
    /// Both parts are expanded before any media is written, so an expansion
    /// failure leaves `media` untouched.
    pub fn render(
        &self,
        content: &Document,
        styles: &Document,
        context: &Value,
        media: &mut dyn MediaWriter,
    ) -> Result<RenderedParts, OdtError> {
        let mut content = self.render_xml(content, context)?;
        let mut styles = self.render_xml(styles, context)?;

        let mut report = resolve_media(&mut content, media);
        report.extend(resolve_media(&mut styles, media));

        Ok(RenderedParts {
            content,
            styles,
            media: report,
        })
    }

    /// Render a whole package in place, storing embedded media inside it.
    pub fn render_package(&self, package: &mut OdtPackage, context: &Value) -> Result<MediaReport, OdtError> {
        let mut content = self.render_xml(package.content(), context)?;
        let mut styles = self.render_xml(package.styles(), context)?;

        let mut report = resolve_media(&mut content, package);
        report.extend(resolve_media(&mut styles, package));

        package.set_content(content);
        package.set_styles(styles);
        tracing::debug!(
            "Rendered package: {} image(s) embedded, {} failed",
            report.resolved.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Describe how each tag of `document` would be rewritten, without
    /// changing anything.
    pub fn inspect(&self, document: &Document) -> Vec<TagReport> {
        let tags: Vec<TemplateTag> = self.scan(document).collect();
        let census = Census::take(document, &tags);
        let resolver = self.resolver(&census);

        tags.iter()
            .map(|tag| {
                let hint = tag.hint.trim();
                let mut report = TagReport {
                    content: tag.content.clone(),
                    kind: tag.kind,
                    hint: (!hint.is_empty()).then(|| hint.to_string()),
                    placement: None,
                    placeholder: None,
                    error: None,
                };
                match resolver.resolve(document, tag) {
                    Ok(resolution) => {
                        report.placement = Some(resolution.placement);
                        report.placeholder =
                            document.name(resolution.placeholder).map(ToString::to_string);
                    }
                    Err(err) => report.error = Some(err.to_string()),
                }
                report
            })
            .collect()
    }
}
