//! Rendering XML parts end to end with the Tera backend.

use anyhow::Result;
use odtmerge::config::RenderConfig;
use odtmerge::core::{ExpansionError, MalformedOutput, OdtError};
use odtmerge::templating::{ExpansionDelegate, MarkdownElement, OdtRenderer, Placement, TagKind};
use odtmerge::test_utils::fixtures::content_xml;
use odtmerge::xml::Document;
use serde_json::{Value, json};

use crate::common::text_of;

fn field(content: &str) -> String {
    format!("<text:text-input>{content}</text:text-input>")
}

fn hinted(hint: &str, content: &str) -> String {
    format!(r#"<text:text-input text:description="{hint}">{content}</text:text-input>"#)
}

fn cell(inner: &str) -> String {
    format!("<table:table-cell><text:p>{inner}</text:p></table:table-cell>")
}

fn row(cells: &[String]) -> String {
    format!("<table:table-row>{}</table:table-row>", cells.concat())
}

fn render_with(config: &RenderConfig, body: &str, context: Value) -> Result<Document> {
    let document = Document::parse(&content_xml(body))?;
    let renderer = OdtRenderer::with_config(config)?;
    Ok(renderer.render_xml(&document, &context)?)
}

fn render(body: &str, context: Value) -> Result<Document> {
    render_with(&RenderConfig::default(), body, context)
}

#[test]
fn test_print_tag_keeps_its_paragraph() -> Result<()> {
    let body = format!("<text:p>Dear {},</text:p>", field("{{ customer.name }}"));
    let doc = render(&body, json!({"customer": {"name": "Ada"}}))?;

    assert_eq!(text_of(&doc), "Dear Ada,");
    assert_eq!(doc.elements_named("text:text-input").count(), 0);
    let span = doc.elements_named("text:span").next().expect("print tag becomes a span");
    assert_eq!(doc.text_content(span), "Ada");
    Ok(())
}

#[test]
fn test_undefined_values_render_empty() -> Result<()> {
    let body = format!(
        "<text:p>Hi {}!</text:p><text:p>{}</text:p>",
        field("{{ customer.name }}"),
        field("{{ missing }}")
    );
    let doc = render(&body, json!({}))?;
    assert_eq!(text_of(&doc), "Hi !");
    Ok(())
}

#[test]
fn test_values_are_escaped_for_xml() -> Result<()> {
    let body = format!("<text:p>{}</text:p>", field("{{ note }}"));
    let doc = render(&body, json!({"note": "Tom & Jerry <3>\n\"quoted\" Zoë"}))?;

    assert_eq!(text_of(&doc), "Tom & Jerry <3>\"quoted\" Zoë");
    assert_eq!(doc.elements_named("text:line-break").count(), 1);
    Ok(())
}

#[test]
fn test_block_pair_expands_over_paragraphs() -> Result<()> {
    let body = format!(
        "<text:p>{}</text:p><text:p>{}</text:p><text:p>{}</text:p>",
        field("{% for item in items %}"),
        field("{{ item }}"),
        field("{% endfor %}")
    );
    let doc = render(&body, json!({"items": ["x", "y", "z"]}))?;

    assert_eq!(doc.elements_named("text:p").count(), 3);
    assert_eq!(text_of(&doc), "xyz");

    let empty = render(&body, json!({"items": []}))?;
    assert_eq!(empty.elements_named("text:p").count(), 0);
    Ok(())
}

#[test]
fn test_row_scope_repeats_table_rows() -> Result<()> {
    let body = format!(
        r#"<table:table table:name="Items">{}{}{}</table:table>"#,
        row(&[cell(&hinted("row", "{% for r in rows %}"))]),
        row(&[cell(&field("{{ r.name }}")), cell(&field("{{ r.qty }}"))]),
        row(&[cell(&hinted("Row", "{% endfor %}"))]),
    );
    let doc = render(&body, json!({"rows": [{"name": "Bolt", "qty": 4}, {"name": "Nut", "qty": 7}]}))?;

    assert_eq!(doc.elements_named("table:table-row").count(), 2);
    assert_eq!(doc.elements_named("table:table-cell").count(), 4);
    assert_eq!(text_of(&doc), "Bolt4Nut7");
    Ok(())
}

#[test]
fn test_before_and_after_row_wrap_a_single_row() -> Result<()> {
    let body = format!(
        "<table:table>{}</table:table>",
        row(&[
            cell(&hinted("before::row", "{% for r in rows %}")),
            cell(&field("{{ r }}")),
            cell(&hinted("after::row", "{% endfor %}")),
        ])
    );
    let doc = render(&body, json!({"rows": ["a", "b"]}))?;

    assert_eq!(doc.elements_named("table:table-row").count(), 2);
    // Only the fields are removed; every row keeps its three cells.
    assert_eq!(doc.elements_named("table:table-cell").count(), 6);
    assert_eq!(doc.elements_named("text:text-input").count(), 0);
    assert_eq!(text_of(&doc), "ab");
    Ok(())
}

#[test]
fn test_escaped_comparison_inside_tags_only() -> Result<()> {
    let body = format!(
        "<text:p>a &gt; b: {}big{}</text:p>",
        field("{% if total &gt; 10 %}"),
        field("{% endif %}")
    );

    let doc = render(&body, json!({"total": 42}))?;
    assert_eq!(text_of(&doc), "a > b: big");

    let doc = render(&body, json!({"total": 3}))?;
    assert_eq!(text_of(&doc), "a > b: ");
    Ok(())
}

#[test]
fn test_string_literals_survive_quote_escaping() -> Result<()> {
    let body = format!("<text:p>{}</text:p>", field(r#"{{ name | default(value="n/a") }}"#));
    let doc = render(&body, json!({}))?;
    assert_eq!(text_of(&doc), "n/a");
    Ok(())
}

#[test]
fn test_markdown_replaces_its_paragraph() -> Result<()> {
    let body = format!("<text:p>{}</text:p>", field("{{ body|markdown }}"));
    let doc = render(&body, json!({"body": "**hi**\n\n- one\n- two"}))?;

    assert_eq!(doc.elements_named("text:list").count(), 1);
    assert_eq!(doc.elements_named("text:list-item").count(), 2);
    // One paragraph for "hi", one wrapping each list item.
    assert_eq!(doc.elements_named("text:p").count(), 3);
    assert_eq!(doc.elements_named("text:text-input").count(), 0);
    let strong = doc.elements_named("text:span").next().expect("strong span");
    assert_eq!(doc.attribute(strong, "text:style-name"), Some("Strong_20_Emphasis"));
    assert_eq!(text_of(&doc), "hionetwo");
    Ok(())
}

#[test]
fn test_markdown_elements_from_config() -> Result<()> {
    let mut config = RenderConfig::default();
    config.markdown.insert(
        "strong".to_string(),
        MarkdownElement::new("text:span").with_attribute("text:style-name", "Bold"),
    );

    let body = format!("<text:p>{}</text:p>", field("{{ note|markdown }}"));
    let doc = render_with(&config, &body, json!({"note": "a **b** & c"}))?;

    let span = doc.elements_named("text:span").next().expect("strong span");
    assert_eq!(doc.attribute(span, "text:style-name"), Some("Bold"));
    assert_eq!(text_of(&doc), "a b & c");

    let empty = render_with(&config, &body, json!({}))?;
    assert_eq!(empty.elements_named("text:p").count(), 0);
    Ok(())
}

#[test]
fn test_subscripts_past_the_end_render_empty() -> Result<()> {
    let body = format!(
        "<text:p>{}|{}|{}</text:p>",
        field("{{ rows[0] }}"),
        field("{{ items[3] }}"),
        field("{{ user.name }}")
    );
    let doc = render(&body, json!({"items": ["a"], "user": "bob"}))?;
    assert_eq!(text_of(&doc), "||");
    Ok(())
}

#[test]
fn test_private_scheme_links_are_expanded() -> Result<()> {
    let body = r#"<text:p><text:a xlink:href="secretary:%7B%7B%20user.url%20%7D%7D">profile</text:a></text:p>"#;
    let doc = render(body, json!({"user": {"url": "https://example.com/u/1"}}))?;

    let link = doc.elements_named("text:a").next().expect("link kept");
    assert_eq!(doc.attribute(link, "xlink:href"), Some("https://example.com/u/1"));
    Ok(())
}

#[test]
fn test_custom_scope_from_config() -> Result<()> {
    let mut config = RenderConfig::default();
    config.scopes.insert("section".to_string(), "text:section".to_string());

    let section = |name: &str, inner: &str| {
        format!(r#"<text:section text:name="{name}"><text:p>{inner}</text:p></text:section>"#)
    };
    let body = [
        section("Open", &hinted("section", "{% if show %}")),
        section("Secret", "Classified"),
        section("Close", &hinted("section", "{% endif %}")),
    ]
    .concat();

    let shown = render_with(&config, &body, json!({"show": true}))?;
    assert_eq!(shown.elements_named("text:section").count(), 1);
    assert_eq!(text_of(&shown), "Classified");

    let hidden = render_with(&config, &body, json!({"show": false}))?;
    assert_eq!(hidden.elements_named("text:section").count(), 0);
    Ok(())
}

#[test]
fn test_document_without_tags_is_unchanged() -> Result<()> {
    let document = Document::parse(&content_xml(
        r#"<text:p text:style-name="P1">Plain &amp; simple</text:p><text:p/>"#,
    ))?;
    let renderer = OdtRenderer::with_config(&RenderConfig::default())?;

    let rendered = renderer.render_xml(&document, &json!({}))?;
    assert_eq!(rendered.to_xml()?, document.to_xml()?);
    Ok(())
}

#[test]
fn test_render_leaves_input_untouched_and_repeats() -> Result<()> {
    let body = format!(
        "<text:p>{}</text:p><text:p>{}</text:p><text:p>{}</text:p>",
        field("{% for item in items %}"),
        field("{{ item }}"),
        field("{% endfor %}")
    );
    let document = Document::parse(&content_xml(&body))?;
    let before = document.to_xml()?;
    let renderer = OdtRenderer::with_config(&RenderConfig::default())?;
    let context = json!({"items": [1, 2]});

    let first = renderer.render_xml(&document, &context)?;
    let second = renderer.render_xml(&document, &context)?;

    assert_eq!(document.to_xml()?, before);
    assert_eq!(first.to_xml()?, second.to_xml()?);
    Ok(())
}

#[test]
fn test_unclosed_block_is_structural_error() -> Result<()> {
    let body = format!("<text:p>{}</text:p>", field("{% if x %}"));
    let err = render(&body, json!({})).expect_err("unbalanced block");

    match err.downcast_ref::<OdtError>() {
        Some(OdtError::StructuralTag {
            tag,
            ..
        }) => assert_eq!(tag, "{% if x %}"),
        other => panic!("expected a structural error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_hint_without_enclosing_element_is_structural_error() {
    let body = format!(
        "<text:p>{}</text:p><text:p>{}</text:p>",
        hinted("row", "{% for r in rows %}"),
        hinted("row", "{% endfor %}")
    );
    let err = render(&body, json!({"rows": []})).expect_err("no table row");
    assert!(matches!(
        err.downcast_ref::<OdtError>(),
        Some(OdtError::StructuralTag {
            ..
        })
    ));
}

#[test]
fn test_backend_failures_are_expansion_errors() {
    let body = format!("<text:p>{}</text:p>", field("{{ name | no_such_filter }}"));
    let err = render(&body, json!({"name": "x"})).expect_err("unknown filter");
    assert!(matches!(err.downcast_ref::<OdtError>(), Some(OdtError::Expansion(_))));
}

#[test]
fn test_delimiters_must_match_backend() {
    let mut config = RenderConfig::default();
    config.delimiters.variable_start = "[[".to_string();
    config.delimiters.variable_end = "]]".to_string();

    let err = OdtRenderer::with_config(&config).expect_err("Tera uses {{ }}");
    assert!(matches!(err, OdtError::Config(_)));
}

/// Backend that returns a fixed text regardless of its input.
struct FixedOutput(&'static str);

impl ExpansionDelegate for FixedOutput {
    fn render(&self, _source: &str, _context: &Value) -> Result<String, ExpansionError> {
        Ok(self.0.to_string())
    }

    fn mark_safe(&self, expression: &str) -> String {
        expression.to_string()
    }
}

#[test]
fn test_malformed_output_reports_position() -> Result<()> {
    let renderer = OdtRenderer::new(&RenderConfig::default(), FixedOutput("<text:p>unterminated"))?;
    let document = Document::parse(&content_xml("<text:p/>"))?;

    match renderer.render_xml(&document, &json!({})) {
        Err(OdtError::MalformedOutput(MalformedOutput::InvalidXml(diagnostic))) => {
            assert_eq!(diagnostic.line, 1);
            assert!(diagnostic.excerpt.contains("unterminated"));
            assert!(diagnostic.marker.ends_with('^'));
        }
        other => panic!("expected malformed output, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_inspect_reports_placements() -> Result<()> {
    let body = format!(
        "<text:p>{}</text:p><text:p>{}</text:p><text:p>{}</text:p><text:p>{}</text:p>",
        field("{% for item in items %}"),
        field("{{ item }}"),
        field("{% endfor %}"),
        hinted("before::paragraph", "{% if done %}")
    );
    let document = Document::parse(&content_xml(&body))?;
    let renderer = OdtRenderer::with_config(&RenderConfig::default())?;

    let reports = renderer.inspect(&document);
    assert_eq!(reports.len(), 4);

    assert_eq!(reports[0].kind, TagKind::Block);
    assert_eq!(reports[0].placeholder.as_deref(), Some("text:p"));
    assert_eq!(reports[0].placement, Some(Placement::Replace));

    assert_eq!(reports[1].kind, TagKind::Print);
    assert_eq!(reports[1].placeholder.as_deref(), Some("text:text-input"));

    assert_eq!(reports[3].hint.as_deref(), Some("before::paragraph"));
    assert_eq!(reports[3].placement, Some(Placement::Before));
    assert!(reports.iter().all(|report| report.error.is_none()));

    // Inspection never rewrites the tree.
    assert_eq!(renderer.scan(&document).count(), 4);
    Ok(())
}
