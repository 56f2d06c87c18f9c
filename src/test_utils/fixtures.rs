//! Builders for `.odt` test packages.

use anyhow::{Context, Result};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::package::{CONTENT_ENTRY, MANIFEST_ENTRY, MIMETYPE_ENTRY, STYLES_ENTRY, TEXT_MIMETYPE};

const CONTENT_NAMESPACES: &str = r#"xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" xmlns:xlink="http://www.w3.org/1999/xlink" xmlns:svg="urn:oasis:names:tc:opendocument:xmlns:svg-compatible:1.0""#;

const MANIFEST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2"><manifest:file-entry manifest:full-path="/" manifest:media-type="application/vnd.oasis.opendocument.text"/><manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/><manifest:file-entry manifest:full-path="styles.xml" manifest:media-type="text/xml"/></manifest:manifest>"#;

/// A minimal OpenDocument text package.
#[derive(Clone, Debug)]
pub struct OdtFixture {
    pub content: String,
    pub styles: String,
    pub extra: Vec<(String, Vec<u8>)>,
}

impl OdtFixture {
    /// Package whose `office:text` body holds `body`.
    pub fn with_body(body: &str) -> Self {
        Self {
            content: content_xml(body),
            styles: styles_xml(""),
            extra: Vec::new(),
        }
    }

    /// Replace the master styles (headers, footers) with `master`.
    #[must_use]
    pub fn with_master_styles(mut self, master: &str) -> Self {
        self.styles = styles_xml(master);
        self
    }

    #[must_use]
    pub fn with_entry(mut self, name: &str, data: &[u8]) -> Self {
        self.extra.push((name.to_string(), data.to_vec()));
        self
    }

    /// Zip bytes of the package.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let stored = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default();
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer.start_file(MIMETYPE_ENTRY, stored)?;
        writer.write_all(TEXT_MIMETYPE.as_bytes())?;
        for (name, data) in [
            (CONTENT_ENTRY, self.content.as_bytes()),
            (STYLES_ENTRY, self.styles.as_bytes()),
            (MANIFEST_ENTRY, MANIFEST.as_bytes()),
        ] {
            writer.start_file(name, deflated)?;
            writer.write_all(data)?;
        }
        for (name, data) in &self.extra {
            writer.start_file(name.as_str(), deflated)?;
            writer.write_all(data)?;
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write the package as `dir/name` and return its path.
    pub fn write_to(&self, dir: &Path, name: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()?)
            .with_context(|| format!("Failed to write fixture {}", path.display()))?;
        Ok(path)
    }
}

/// `content.xml` text wrapping `body` in `office:body/office:text`.
pub fn content_xml(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-content {CONTENT_NAMESPACES} office:version="1.2"><office:body><office:text>{body}</office:text></office:body></office:document-content>"#
    )
}

/// `styles.xml` text with `master` inside `office:master-styles`.
pub fn styles_xml(master: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<office:document-styles {CONTENT_NAMESPACES} xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" office:version="1.2"><office:master-styles>{master}</office:master-styles></office:document-styles>"#
    )
}
