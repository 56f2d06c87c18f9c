//! Media resolution: embedding images referenced by rendered frames.
//!
//! After expansion a frame's `draw:name` may hold a filesystem path (typically
//! produced by the `image` filter). When that path names a regular file, the
//! file is handed to a [`MediaWriter`], and the frame is pointed at the stored
//! copy. Frames whose name is not a file are ordinary document frames and are
//! left alone.

use indextree::NodeId;
use std::path::{Path, PathBuf};

use crate::core::{MediaError, MediaResolutionError};
use crate::xml::Document;

pub const FRAME_ELEMENT: &str = "draw:frame";
pub const IMAGE_ELEMENT: &str = "draw:image";
pub const NAME_ATTRIBUTE: &str = "draw:name";
pub const LINK_ATTRIBUTE: &str = "xlink:href";

/// Stores media files and returns the reference used to link them.
pub trait MediaWriter {
    /// Store the file at `path` under the name `stem`.
    ///
    /// # Errors
    ///
    /// Returns a [`MediaError`] when the file cannot be read or stored. The
    /// frame is then left unchanged.
    fn write_media(&mut self, path: &Path, stem: &str) -> Result<String, MediaError>;
}

impl<F> MediaWriter for F
where
    F: FnMut(&Path, &str) -> Result<String, MediaError>,
{
    fn write_media(&mut self, path: &Path, stem: &str) -> Result<String, MediaError> {
        self(path, stem)
    }
}

/// Outcome of a media pass.
#[derive(Debug, Default)]
pub struct MediaReport {
    /// References returned by the writer, in document order
    pub resolved: Vec<String>,
    pub failures: Vec<MediaResolutionError>,
}

impl MediaReport {
    pub fn extend(&mut self, other: MediaReport) {
        self.resolved.extend(other.resolved);
        self.failures.extend(other.failures);
    }
}

/// Embed the media of every frame in `document` through `writer`.
///
/// Writer failures are logged and collected; they never abort the pass.
pub fn resolve_media(document: &mut Document, writer: &mut dyn MediaWriter) -> MediaReport {
    let mut report = MediaReport::default();
    let frames: Vec<NodeId> = document.elements_named(FRAME_ELEMENT).collect();

    for frame in frames {
        let Some(image) = image_node(document, frame) else {
            continue;
        };
        let name = document.attribute(frame, NAME_ATTRIBUTE).unwrap_or_default().to_string();
        let path = PathBuf::from(&name);
        if name.is_empty() || !path.is_file() {
            continue;
        }
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

        match writer.write_media(&path, &stem) {
            Ok(reference) => {
                tracing::debug!("Embedded {} as {}", path.display(), reference);
                document.set_attribute(frame, NAME_ATTRIBUTE, stem);
                document.set_attribute(image, LINK_ATTRIBUTE, reference.as_str());
                report.resolved.push(reference);
            }
            Err(source) => {
                tracing::warn!("Could not embed image {}: {}", path.display(), source);
                report.failures.push(MediaResolutionError {
                    frame: name,
                    source,
                });
            }
        }
    }

    report
}

/// The frame's `draw:image` child, else its first element child.
fn image_node(document: &Document, frame: NodeId) -> Option<NodeId> {
    document
        .children(frame)
        .find(|&child| document.name(child) == Some(IMAGE_ELEMENT))
        .or_else(|| document.children(frame).find(|&child| document.element(child).is_some()))
}
