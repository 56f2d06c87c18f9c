//! Builds a [`Document`] from XML text with `quick-xml`.

use indextree::NodeId;
use quick_xml::Reader;
use quick_xml::events::attributes::AttrError;
use quick_xml::events::{BytesDecl, BytesStart, Event};

use super::XmlError;
use super::tree::{Document, Element, XmlDeclaration, XmlNode};

impl Document {
    /// Parse a complete XML document.
    ///
    /// Text is stored decoded (predefined entities and character references
    /// resolved). Whitespace outside the root element is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`XmlError::Syntax`] with the byte offset of the failure when the
    /// input is not well-formed: syntax errors, mismatched or unmatched end
    /// tags, elements left open at end of input, content outside the root
    /// element, or a missing root element.
    pub fn parse(source: &str) -> Result<Self, XmlError> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(false);

        let mut document = Document::new();
        let mut open: Vec<NodeId> = Vec::new();
        let mut seen_root = false;

        loop {
            let position = reader.buffer_position() as usize;
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    return Err(XmlError::syntax(err.to_string(), reader.error_position() as usize));
                }
            };

            match event {
                Event::Decl(decl) => {
                    document.set_declaration(Some(read_declaration(&decl, position)?));
                }
                Event::Start(start) => {
                    let id = document.create(XmlNode::Element(read_element(&start, position)?));
                    attach_element(&mut document, &open, &mut seen_root, id, position)?;
                    open.push(id);
                }
                Event::Empty(start) => {
                    let id = document.create(XmlNode::Element(read_element(&start, position)?));
                    attach_element(&mut document, &open, &mut seen_root, id, position)?;
                }
                Event::End(_) => {
                    if open.pop().is_none() {
                        return Err(XmlError::syntax("end tag without matching start tag", position));
                    }
                }
                Event::Text(text) => {
                    let content =
                        text.unescape().map_err(|e| XmlError::syntax(e.to_string(), position))?;
                    match open.last() {
                        Some(&parent) => {
                            let id = document.create_text(content.into_owned());
                            document.append_child(parent, id)?;
                        }
                        None if content.trim().is_empty() => {}
                        None => {
                            return Err(XmlError::syntax(
                                "text content outside of the root element",
                                position,
                            ));
                        }
                    }
                }
                Event::CData(data) => {
                    let Some(&parent) = open.last() else {
                        return Err(XmlError::syntax("CDATA outside of the root element", position));
                    };
                    let content = utf8(&data, position)?;
                    let id = document.create(XmlNode::CData(content));
                    document.append_child(parent, id)?;
                }
                Event::Comment(comment) => {
                    let parent = open.last().copied().unwrap_or(document.root());
                    let id = document.create(XmlNode::Comment(utf8(&comment, position)?));
                    document.append_child(parent, id)?;
                }
                Event::PI(pi) => {
                    let parent = open.last().copied().unwrap_or(document.root());
                    let id = document.create(XmlNode::ProcessingInstruction(utf8(&pi, position)?));
                    document.append_child(parent, id)?;
                }
                Event::DocType(doctype) => {
                    if seen_root || !open.is_empty() {
                        return Err(XmlError::syntax("DOCTYPE after the root element", position));
                    }
                    let id = document.create(XmlNode::DocType(utf8(&doctype, position)?));
                    document.append_child(document.root(), id)?;
                }
                Event::Eof => break,
            }
        }

        if let Some(&unclosed) = open.last() {
            let name = document.name(unclosed).unwrap_or_default().to_string();
            return Err(XmlError::syntax(format!("unclosed element <{name}>"), source.len()));
        }
        if !seen_root {
            return Err(XmlError::syntax("no root element found", source.len()));
        }

        Ok(document)
    }
}

fn attach_element(
    document: &mut Document,
    open: &[NodeId],
    seen_root: &mut bool,
    id: NodeId,
    position: usize,
) -> Result<(), XmlError> {
    match open.last() {
        Some(&parent) => document.append_child(parent, id),
        None if *seen_root => {
            Err(XmlError::syntax("junk after document element", position))
        }
        None => {
            *seen_root = true;
            document.append_child(document.root(), id)
        }
    }
}

fn read_element(start: &BytesStart<'_>, position: usize) -> Result<Element, XmlError> {
    let mut element = Element::new(utf8(start.name().as_ref(), position)?);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::syntax(e.to_string(), position))?;
        let key = utf8(attribute.key.as_ref(), position)?;
        let value =
            attribute.unescape_value().map_err(|e| XmlError::syntax(e.to_string(), position))?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn read_declaration(decl: &BytesDecl<'_>, position: usize) -> Result<XmlDeclaration, XmlError> {
    let version = decl.version().map_err(|e| XmlError::syntax(e.to_string(), position))?;
    let version = utf8(&version, position)?;
    // encoding and standalone report attribute errors, not reader errors
    let attribute = |e: AttrError| XmlError::syntax(e.to_string(), position);
    let encoding = match decl.encoding() {
        Some(encoding) => Some(utf8(&encoding.map_err(attribute)?, position)?),
        None => None,
    };
    let standalone = match decl.standalone() {
        Some(standalone) => Some(utf8(&standalone.map_err(attribute)?, position)?),
        None => None,
    };
    Ok(XmlDeclaration {
        version,
        encoding,
        standalone,
    })
}

fn utf8(bytes: &[u8], position: usize) -> Result<String, XmlError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| XmlError::syntax(e.to_string(), position))
}
