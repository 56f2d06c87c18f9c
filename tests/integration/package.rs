//! Rendering whole `.odt` packages: parts, media, and the zip container.

use anyhow::Result;
use odtmerge::config::RenderConfig;
use odtmerge::core::OdtError;
use odtmerge::package::{CONTENT_ENTRY, MANIFEST_ENTRY, MIMETYPE_ENTRY, OdtPackage, TEXT_MIMETYPE};
use odtmerge::templating::OdtRenderer;
use odtmerge::test_utils::OdtFixture;
use serde_json::json;
use std::io::{Cursor, Read};
use zip::{CompressionMethod, ZipArchive};

use crate::common::{TestProject, text_of};

const HEADER: &str = r#"<style:master-page style:name="Standard"><style:header><text:p><text:text-input>{{ title }}</text:text-input></text:p></style:header></style:master-page>"#;

fn logo_frame(expression: &str) -> String {
    format!(
        r#"<text:p><draw:frame draw:name="{expression}" svg:width="2cm"><draw:image xlink:href="Pictures/placeholder.png"/></draw:frame></text:p>"#
    )
}

#[test]
fn test_renders_content_and_styles() -> Result<()> {
    let fixture = OdtFixture::with_body("<text:p>Total: <text:text-input>{{ total }}</text:text-input></text:p>")
        .with_master_styles(HEADER);
    let mut package = OdtPackage::from_bytes(&fixture.to_bytes()?)?;

    let renderer = OdtRenderer::with_config(&RenderConfig::default())?;
    let report = renderer.render_package(&mut package, &json!({"title": "Invoice 42", "total": "9.50"}))?;

    assert!(report.resolved.is_empty());
    assert_eq!(text_of(package.content()), "Total: 9.50");
    assert_eq!(text_of(package.styles()), "Invoice 42");
    Ok(())
}

#[test]
fn test_embeds_images_named_by_frames() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("writer.png", b"\x89PNG\r\n")?;

    let fixture = OdtFixture::with_body(&logo_frame("{{ logo | image }}"));
    let mut package = OdtPackage::from_bytes(&fixture.to_bytes()?)?;
    let config = RenderConfig {
        media_dir: Some(project.path().to_path_buf()),
        ..RenderConfig::default()
    };

    let renderer = OdtRenderer::with_config(&config)?;
    let report = renderer.render_package(&mut package, &json!({"logo": "writer.png"}))?;

    assert_eq!(report.resolved, vec!["Pictures/writer.png".to_string()]);
    assert!(report.failures.is_empty());
    assert_eq!(package.entry("Pictures/writer.png"), Some(&b"\x89PNG\r\n"[..]));

    let content = package.content();
    let frame = content.elements_named("draw:frame").next().expect("frame");
    assert_eq!(content.attribute(frame, "draw:name"), Some("writer"));
    let image = content.elements_named("draw:image").next().expect("image");
    assert_eq!(content.attribute(image, "xlink:href"), Some("Pictures/writer.png"));

    let manifest = package.manifest();
    let listed: Vec<_> = manifest
        .elements_named("manifest:file-entry")
        .filter(|&entry| manifest.attribute(entry, "manifest:full-path") == Some("Pictures/writer.png"))
        .collect();
    assert_eq!(listed.len(), 1);
    assert_eq!(manifest.attribute(listed[0], "manifest:media-type"), Some("image/png"));
    Ok(())
}

#[test]
fn test_same_image_twice_is_listed_once() -> Result<()> {
    let project = TestProject::new()?;
    project.write_file("logo.png", b"png")?;

    let body = [logo_frame("{{ logo | image }}"), logo_frame("{{ logo | image }}")].concat();
    let mut package = OdtPackage::from_bytes(&OdtFixture::with_body(&body).to_bytes()?)?;
    let config = RenderConfig {
        media_dir: Some(project.path().to_path_buf()),
        ..RenderConfig::default()
    };

    let report = OdtRenderer::with_config(&config)?.render_package(&mut package, &json!({"logo": "logo.png"}))?;

    assert_eq!(report.resolved.len(), 2);
    assert_eq!(package.entry_names().filter(|name| *name == "Pictures/logo.png").count(), 1);
    let manifest = package.manifest();
    let listed = manifest
        .elements_named("manifest:file-entry")
        .filter(|&entry| manifest.attribute(entry, "manifest:full-path") == Some("Pictures/logo.png"))
        .count();
    assert_eq!(listed, 1);
    Ok(())
}

#[test]
fn test_frames_without_files_are_left_alone() -> Result<()> {
    let fixture = OdtFixture::with_body(&logo_frame("Logo"));
    let mut package = OdtPackage::from_bytes(&fixture.to_bytes()?)?;

    let report = OdtRenderer::with_config(&RenderConfig::default())?.render_package(&mut package, &json!({}))?;

    assert!(report.resolved.is_empty());
    assert!(report.failures.is_empty());
    let image = package.content().elements_named("draw:image").next().expect("image");
    assert_eq!(package.content().attribute(image, "xlink:href"), Some("Pictures/placeholder.png"));
    Ok(())
}

#[test]
fn test_saved_package_keeps_container_layout() -> Result<()> {
    let project = TestProject::new()?;
    let fixture = OdtFixture::with_body("<text:p><text:text-input>{{ name }}</text:text-input></text:p>")
        .with_entry("Thumbnails/thumbnail.png", b"thumb");
    let mut package = OdtPackage::from_bytes(&fixture.to_bytes()?)?;
    OdtRenderer::with_config(&RenderConfig::default())?.render_package(&mut package, &json!({"name": "Ada"}))?;

    let output = project.path().join("out.odt");
    package.save(&output)?;

    let bytes = std::fs::read(&output)?;
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    {
        let mut first = archive.by_index(0)?;
        assert_eq!(first.name(), MIMETYPE_ENTRY);
        assert_eq!(first.compression(), CompressionMethod::Stored);
        let mut mimetype = String::new();
        first.read_to_string(&mut mimetype)?;
        assert_eq!(mimetype, TEXT_MIMETYPE);
    }
    let mut thumbnail = Vec::new();
    archive.by_name("Thumbnails/thumbnail.png")?.read_to_end(&mut thumbnail)?;
    assert_eq!(thumbnail, b"thumb");

    let reopened = project.open("out.odt")?;
    assert_eq!(text_of(reopened.content()), "Ada");
    assert!(reopened.entry_names().any(|name| name == MANIFEST_ENTRY));
    Ok(())
}

#[test]
fn test_rejects_archives_without_content() -> Result<()> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(MIMETYPE_ENTRY, zip::write::SimpleFileOptions::default())?;
    std::io::Write::write_all(&mut writer, TEXT_MIMETYPE.as_bytes())?;
    let bytes = writer.finish()?.into_inner();

    match OdtPackage::from_bytes(&bytes) {
        Err(OdtError::Package(message)) => assert!(message.contains(CONTENT_ENTRY)),
        other => panic!("expected a package error, got {other:?}"),
    }

    assert!(matches!(OdtPackage::from_bytes(b"not a zip"), Err(OdtError::Zip(_))));
    Ok(())
}
