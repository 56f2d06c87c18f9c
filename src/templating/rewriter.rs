//! Tree rewriting: swapping resolved placeholders for literal tag text.

use super::scanner::TemplateTag;
use super::scope::{Placement, Resolution, Substitute};
use crate::core::OdtError;
use crate::xml::Document;

/// Inline element wrapping print tags so they keep their character styling.
pub const SPAN_ELEMENT: &str = "text:span";

/// Insert the substitute for `tag` and remove what it stands in for.
///
/// With [`Placement::Replace`] the placeholder is removed. With `Before` or
/// `After` the placeholder stays and only the field is removed, so the
/// enclosing row, cell, or paragraph survives around the inserted text.
pub fn apply(document: &mut Document, tag: &TemplateTag, resolution: &Resolution) -> Result<(), OdtError> {
    let placeholder = resolution.placeholder;
    if document.parent(placeholder).is_none() {
        return Err(OdtError::StructuralTag {
            tag: tag.content.clone(),
            reason: "placeholder has no parent to insert into".to_string(),
        });
    }

    let substitute = match resolution.substitute {
        Substitute::RawText => document.create_text(tag.content.as_str()),
        Substitute::Span => {
            let span = document.create_element(SPAN_ELEMENT);
            let text = document.create_text(tag.content.as_str());
            document.append_child(span, text)?;
            span
        }
    };

    match resolution.placement {
        Placement::After => document.insert_after(placeholder, substitute)?,
        Placement::Replace | Placement::Before => document.insert_before(placeholder, substitute)?,
    }

    let removed = match resolution.placement {
        Placement::Replace => placeholder,
        Placement::Before | Placement::After => tag.node,
    };
    document.remove(removed);
    Ok(())
}
