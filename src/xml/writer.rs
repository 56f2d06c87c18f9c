//! Serializes a [`Document`] back to XML text.

use indextree::{NodeEdge, NodeId};
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesPI, BytesStart, BytesText, Event};

use super::XmlError;
use super::tree::{Document, XmlNode};

impl Document {
    /// Serialize the document, declaration included.
    ///
    /// Text and attribute values are escaped; elements without children are
    /// written in self-closing form. The walk is iterative, so arbitrarily
    /// deep documents do not grow the stack.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Vec::new());

        if let Some(decl) = self.declaration() {
            writer.write_event(Event::Decl(BytesDecl::new(
                &decl.version,
                decl.encoding.as_deref(),
                decl.standalone.as_deref(),
            )))?;
        }

        for edge in self.traverse() {
            match edge {
                NodeEdge::Start(id) => self.write_open(&mut writer, id)?,
                NodeEdge::End(id) => self.write_close(&mut writer, id)?,
            }
        }

        Ok(String::from_utf8(writer.into_inner())?)
    }

    fn write_open(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), XmlError> {
        match self.node(id) {
            XmlNode::Document => {}
            XmlNode::Element(element) => {
                let mut start = BytesStart::new(element.name.as_str());
                for (key, value) in &element.attributes {
                    start.push_attribute((key.as_str(), value.as_str()));
                }
                if self.first_child(id).is_some() {
                    writer.write_event(Event::Start(start))?;
                } else {
                    writer.write_event(Event::Empty(start))?;
                }
            }
            XmlNode::Text(text) => writer.write_event(Event::Text(BytesText::new(text)))?,
            XmlNode::CData(text) => writer.write_event(Event::CData(BytesCData::new(text.as_str())))?,
            XmlNode::Comment(text) => {
                writer.write_event(Event::Comment(BytesText::from_escaped(text.as_str())))?;
            }
            XmlNode::ProcessingInstruction(text) => {
                writer.write_event(Event::PI(BytesPI::new(text.as_str())))?;
            }
            XmlNode::DocType(text) => {
                writer.write_event(Event::DocType(BytesText::from_escaped(text.as_str())))?;
            }
        }
        Ok(())
    }

    fn write_close(&self, writer: &mut Writer<Vec<u8>>, id: NodeId) -> Result<(), XmlError> {
        if let XmlNode::Element(element) = self.node(id) {
            if self.first_child(id).is_some() {
                writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
            }
        }
        Ok(())
    }
}
