//! The `odtmerge` binary.

use anyhow::Result;
use odtmerge::test_utils::OdtFixture;
use predicates::prelude::*;
use serde_json::{Value, json};

use crate::common::{TestProject, text_of};

fn letter() -> OdtFixture {
    OdtFixture::with_body(concat!(
        "<text:p>Dear <text:text-input>{{ name }}</text:text-input>,</text:p>",
        "<text:p><text:text-input>{% for line in lines %}</text:text-input></text:p>",
        "<text:p><text:text-input>{{ line }}</text:text-input></text:p>",
        "<text:p><text:text-input>{% endfor %}</text:text-input></text:p>",
    ))
}

#[test]
fn test_render_writes_output() -> Result<()> {
    let project = TestProject::new()?;
    project.write_template("letter.odt", &letter())?;
    project.write_context("data.json", &json!({"name": "Ada", "lines": ["one", "two"]}))?;

    project
        .odtmerge()
        .args(["render", "letter.odt", "out.odt", "--context", "data.json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rendered"));

    let rendered = project.open("out.odt")?;
    assert_eq!(text_of(rendered.content()), "Dear Ada,onetwo");
    Ok(())
}

#[test]
fn test_render_quiet_prints_nothing() -> Result<()> {
    let project = TestProject::new()?;
    let greeting = OdtFixture::with_body("<text:p>Dear <text:text-input>{{ name }}</text:text-input>,</text:p>");
    project.write_template("letter.odt", &greeting)?;

    project
        .odtmerge()
        .args(["--quiet", "render", "letter.odt", "out.odt"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    // Without a context every value renders empty.
    let rendered = project.open("out.odt")?;
    assert_eq!(text_of(rendered.content()), "Dear ,");
    Ok(())
}

#[test]
fn test_render_reports_structural_errors() -> Result<()> {
    let project = TestProject::new()?;
    let broken = OdtFixture::with_body("<text:p><text:text-input>{% if x %}</text:text-input></text:p>");
    project.write_template("broken.odt", &broken)?;

    project
        .odtmerge()
        .args(["render", "broken.odt", "out.odt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot place template tag"))
        .stderr(predicate::str::contains("suggestion"));

    assert!(!project.path().join("out.odt").exists());
    Ok(())
}

#[test]
fn test_render_rejects_non_object_context() -> Result<()> {
    let project = TestProject::new()?;
    project.write_template("letter.odt", &letter())?;
    project.write_context("data.json", &json!(["not", "an", "object"]))?;

    project
        .odtmerge()
        .args(["render", "letter.odt", "out.odt", "-x", "data.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must contain a JSON object"));
    Ok(())
}

#[test]
fn test_missing_template_fails() -> Result<()> {
    let project = TestProject::new()?;
    project
        .odtmerge()
        .args(["render", "nope.odt", "out.odt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope.odt"));
    Ok(())
}

#[test]
fn test_tags_lists_placements() -> Result<()> {
    let project = TestProject::new()?;
    project.write_template("letter.odt", &letter())?;

    project
        .odtmerge()
        .args(["tags", "letter.odt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("content.xml"))
        .stdout(predicate::str::contains("{% for line in lines %}"))
        .stdout(predicate::str::contains("<text:p>"));
    Ok(())
}

#[test]
fn test_tags_json_output() -> Result<()> {
    let project = TestProject::new()?;
    project.write_template("letter.odt", &letter())?;

    let output = project.odtmerge().args(["tags", "letter.odt", "--format", "json"]).assert().success();
    let parts: Value = serde_json::from_slice(&output.get_output().stdout)?;

    assert_eq!(parts[0]["part"], "content.xml");
    let tags = parts[0]["tags"].as_array().expect("tag list");
    assert_eq!(tags.len(), 4);
    assert_eq!(tags[0]["content"], "{{ name }}");
    assert_eq!(tags[0]["kind"], "print");
    assert_eq!(tags[1]["kind"], "block");
    assert_eq!(tags[1]["placement"], "replace");
    assert_eq!(tags[1]["placeholder"], "text:p");
    assert_eq!(parts[1]["part"], "styles.xml");
    assert_eq!(parts[1]["tags"].as_array().map(Vec::len), Some(0));
    Ok(())
}

#[test]
fn test_config_file_adds_scopes() -> Result<()> {
    let project = TestProject::new()?;
    let template = OdtFixture::with_body(concat!(
        r#"<text:section text:name="A"><text:p><text:text-input text:description="section">{% if show %}</text:text-input></text:p></text:section>"#,
        r#"<text:section text:name="B"><text:p>Hidden</text:p></text:section>"#,
        r#"<text:section text:name="C"><text:p><text:text-input text:description="section">{% endif %}</text:text-input></text:p></text:section>"#,
    ));
    project.write_template("sections.odt", &template)?;
    project.write_file("odtmerge.toml", b"[scopes]\nsection = \"text:section\"\n")?;

    project.odtmerge().args(["render", "sections.odt", "out.odt"]).assert().success();

    let rendered = project.open("out.odt")?;
    assert_eq!(rendered.content().elements_named("text:section").count(), 0);
    Ok(())
}
