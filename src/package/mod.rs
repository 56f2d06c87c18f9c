//! OpenDocument package (the zip container of an `.odt` file).
//!
//! An `.odt` file is a zip archive whose first entry, `mimetype`, is stored
//! uncompressed. The parts the renderer works on are parsed into trees:
//!
//! - `content.xml` - the document body
//! - `styles.xml` - styles, headers and footers
//! - `META-INF/manifest.xml` - the list of entries and their media types
//!
//! Every other entry is kept as raw bytes, in archive order, and written back
//! unchanged.

use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::core::{MediaError, OdtError};
use crate::templating::MediaWriter;
use crate::xml::Document;

pub const MIMETYPE_ENTRY: &str = "mimetype";
pub const CONTENT_ENTRY: &str = "content.xml";
pub const STYLES_ENTRY: &str = "styles.xml";
pub const MANIFEST_ENTRY: &str = "META-INF/manifest.xml";

/// Directory embedded images are stored under.
pub const PICTURES_DIR: &str = "Pictures";

/// Media type of an OpenDocument text.
pub const TEXT_MIMETYPE: &str = "application/vnd.oasis.opendocument.text";

const MANIFEST_ROOT: &str = "manifest:manifest";
const MANIFEST_ENTRY_ELEMENT: &str = "manifest:file-entry";
const FULL_PATH_ATTRIBUTE: &str = "manifest:full-path";
const MEDIA_TYPE_ATTRIBUTE: &str = "manifest:media-type";

/// Media type assumed for images with an unknown extension.
pub const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// An opened `.odt` package.
#[derive(Debug, Clone)]
pub struct OdtPackage {
    entries: Vec<(String, Vec<u8>)>,
    content: Document,
    styles: Document,
    manifest: Document,
}

impl OdtPackage {
    /// Read a package from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid package
    /// (see [`from_bytes`](Self::from_bytes)).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OdtError> {
        let path = path.as_ref();
        tracing::debug!("Opening package {}", path.display());
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Read a package from the bytes of a zip archive.
    ///
    /// # Errors
    ///
    /// Returns [`OdtError::Zip`] for a damaged archive, [`OdtError::Package`]
    /// when `content.xml`, `styles.xml` or the manifest is missing, and
    /// [`OdtError::Xml`] when one of them is not well-formed.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, OdtError> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(usize::try_from(file.size()).unwrap_or_default());
            file.read_to_end(&mut data)?;
            entries.push((file.name().to_string(), data));
        }
        tracing::debug!("Read {} package entries", entries.len());

        let content = parse_part(&entries, CONTENT_ENTRY)?;
        let styles = parse_part(&entries, STYLES_ENTRY)?;
        let manifest = parse_part(&entries, MANIFEST_ENTRY)?;

        Ok(Self {
            entries,
            content,
            styles,
            manifest,
        })
    }

    pub fn content(&self) -> &Document {
        &self.content
    }

    pub fn styles(&self) -> &Document {
        &self.styles
    }

    pub fn manifest(&self) -> &Document {
        &self.manifest
    }

    pub fn set_content(&mut self, content: Document) {
        self.content = content;
    }

    pub fn set_styles(&mut self, styles: Document) {
        self.styles = styles;
    }

    /// Entry names in archive order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Raw bytes of an entry as read or added.
    ///
    /// The parsed parts are returned as they were read; use
    /// [`content`](Self::content) and friends for their current state.
    pub fn entry(&self, name: &str) -> Option<&[u8]> {
        self.entries.iter().find(|(entry, _)| entry == name).map(|(_, data)| data.as_slice())
    }

    /// Store an image as `Pictures/<stem><ext>` and list it in the manifest.
    ///
    /// Storing the same name twice replaces the data and keeps one manifest
    /// entry. Returns the entry path.
    ///
    /// # Errors
    ///
    /// Returns [`MediaError::Read`] when the file cannot be read, and
    /// [`MediaError::Rejected`] when the manifest has no root element.
    pub fn add_media(&mut self, path: &Path, stem: &str) -> Result<String, MediaError> {
        let data = std::fs::read(path).map_err(|source| MediaError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path.extension().map(|ext| ext.to_string_lossy().to_lowercase());
        let media_type = extension.as_deref().and_then(media_type_for).unwrap_or(DEFAULT_IMAGE_TYPE);
        let suffix = extension.unwrap_or_else(|| "png".to_string());
        let entry_path = format!("{PICTURES_DIR}/{stem}.{suffix}");

        self.register_in_manifest(&entry_path, media_type)?;

        match self.entries.iter_mut().find(|(name, _)| *name == entry_path) {
            Some((_, existing)) => *existing = data,
            None => self.entries.push((entry_path.clone(), data)),
        }
        tracing::debug!("Stored {} as {} ({})", path.display(), entry_path, media_type);
        Ok(entry_path)
    }

    fn register_in_manifest(&mut self, entry_path: &str, media_type: &str) -> Result<(), MediaError> {
        let root = self
            .manifest
            .elements_named(MANIFEST_ROOT)
            .next()
            .ok_or_else(|| MediaError::Rejected(format!("{MANIFEST_ENTRY} has no <{MANIFEST_ROOT}>")))?;

        let listed = self
            .manifest
            .children(root)
            .any(|child| self.manifest.attribute(child, FULL_PATH_ATTRIBUTE) == Some(entry_path));
        if listed {
            return Ok(());
        }

        let entry = self.manifest.create_element(MANIFEST_ENTRY_ELEMENT);
        self.manifest.set_attribute(entry, FULL_PATH_ATTRIBUTE, entry_path);
        self.manifest.set_attribute(entry, MEDIA_TYPE_ATTRIBUTE, media_type);
        self.manifest.append_child(root, entry).map_err(|e| MediaError::Rejected(e.to_string()))
    }

    /// Serialize the package into zip bytes.
    ///
    /// `mimetype` is written first and stored; the parsed parts are serialized
    /// from their current trees; everything else is deflated as read.
    pub fn to_bytes(&self) -> Result<Vec<u8>, OdtError> {
        let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));

        writer.start_file(MIMETYPE_ENTRY, stored)?;
        writer.write_all(self.entry(MIMETYPE_ENTRY).unwrap_or(TEXT_MIMETYPE.as_bytes()))?;

        for (name, data) in &self.entries {
            let part = match name.as_str() {
                MIMETYPE_ENTRY => continue,
                CONTENT_ENTRY => Some(&self.content),
                STYLES_ENTRY => Some(&self.styles),
                MANIFEST_ENTRY => Some(&self.manifest),
                _ => None,
            };
            writer.start_file(name.as_str(), deflated)?;
            match part {
                Some(document) => writer.write_all(document.to_xml()?.as_bytes())?,
                None => writer.write_all(data)?,
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Write the package to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), OdtError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?)?;
        tracing::debug!("Saved package to {}", path.display());
        Ok(())
    }
}

impl MediaWriter for OdtPackage {
    fn write_media(&mut self, path: &Path, stem: &str) -> Result<String, MediaError> {
        self.add_media(path, stem)
    }
}

fn parse_part(entries: &[(String, Vec<u8>)], name: &str) -> Result<Document, OdtError> {
    let (_, data) = entries
        .iter()
        .find(|(entry, _)| entry == name)
        .ok_or_else(|| OdtError::Package(format!("missing {name}")))?;
    let text = std::str::from_utf8(data)
        .map_err(|e| OdtError::Package(format!("{name} is not UTF-8: {e}")))?;
    Ok(Document::parse(text)?)
}

/// Media type of an image file extension (lower case, without the dot).
pub fn media_type_for(extension: &str) -> Option<&'static str> {
    let media_type = match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(media_type)
}
