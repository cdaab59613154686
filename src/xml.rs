//! XML as the other concrete syntax of a hierarchical stream.
//!
//! [`stream_xml`] replays XML text into any [`HierarchicalStreamWriter`],
//! asking a [`CollectionHints`] source for each element's array hint.
//! [`write_xml`] renders a [`Document`] back as XML; array hints have no XML
//! representation and are dropped.
use crate::err::{MappedJsonError, Result};
use crate::hints::CollectionHints;
use crate::model::{Document, Node, NodePath};
use crate::tree_sink::HierarchicalStreamWriter;

use log::trace;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::borrow::Cow;
use std::fmt::Display;
use std::io::{BufRead, Write};

fn xml_error(position: u64, err: impl Display) -> MappedJsonError {
    MappedJsonError::Xml {
        position,
        message: err.to_string(),
    }
}

fn utf8<'a>(bytes: &'a [u8], position: u64) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| xml_error(position, e))
}

/// Reads XML from `reader` and replays it into `writer`.
///
/// Whitespace around text is trimmed and whitespace-only text is ignored.
/// CDATA sections are appended to the element's text. Comments, declarations,
/// processing instructions and doctypes are skipped.
///
/// Returns the number of elements started.
pub fn stream_xml<R, H, W>(mut reader: Reader<R>, hints: &H, writer: &mut W) -> Result<usize>
where
    R: BufRead,
    H: CollectionHints + ?Sized,
    W: HierarchicalStreamWriter + ?Sized,
{
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut parent = NodePath::root();
    let mut started = 0usize;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| xml_error(position, e))?;

        match event {
            Event::Start(start) => {
                start_element(&start, &mut parent, hints, writer, position)?;
                started += 1;
            }
            Event::Empty(empty) => {
                start_element(&empty, &mut parent, hints, writer, position)?;
                writer.end_node()?;
                parent.pop();
                started += 1;
            }
            Event::End(_) => {
                writer.end_node()?;
                parent.pop();
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| xml_error(position, e))?;
                if !text.trim().is_empty() {
                    writer.set_value(&text)?;
                }
            }
            Event::CData(cdata) => {
                let bytes = cdata.into_inner();
                writer.set_value(utf8(&bytes, position)?)?;
            }
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
            Event::Eof => break,
        }
        buf.clear();
    }

    trace!("streamed {} element(s) from XML", started);
    Ok(started)
}

fn start_element<H, W>(
    element: &BytesStart<'_>,
    parent: &mut NodePath,
    hints: &H,
    writer: &mut W,
    position: u64,
) -> Result<()>
where
    H: CollectionHints + ?Sized,
    W: HierarchicalStreamWriter + ?Sized,
{
    let name = utf8(element.name().into_inner(), position)?;
    writer.start_node(name, hints.hint_for(parent, name))?;
    parent.push(name);

    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_error(position, e))?;
        let key = utf8(attribute.key.into_inner(), position)?;
        let value = attribute
            .unescape_value()
            .map_err(|e| xml_error(position, e))?;
        writer.add_attribute(key, &value)?;
    }
    Ok(())
}

/// Writes `document` as XML into `target` and hands the target back.
pub fn write_xml<W: Write>(document: &Document, target: W, indent: bool) -> Result<W> {
    let mut writer = if indent {
        Writer::new_with_indent(target, b' ', 2)
    } else {
        Writer::new(target)
    };
    write_element(&mut writer, document.root())?;
    Ok(writer.into_inner())
}

fn write_element<W: Write>(writer: &mut Writer<W>, node: &Node) -> Result<()> {
    let mut start = BytesStart::new(node.name());
    for attribute in node.attributes() {
        start.push_attribute((attribute.name.as_str(), attribute.value.as_str()));
    }

    let text: Option<Cow<'_, str>> = node.value().map(|v| match v.as_text() {
        Some(s) => Cow::Borrowed(s),
        None => Cow::Owned(v.to_text()),
    });

    if node.children().is_empty() && text.is_none() {
        return writer
            .write_event(Event::Empty(start))
            .map_err(|e| xml_error(0, e));
    }

    writer
        .write_event(Event::Start(start))
        .map_err(|e| xml_error(0, e))?;
    if let Some(text) = text {
        writer
            .write_event(Event::Text(BytesText::new(&text)))
            .map_err(|e| xml_error(0, e))?;
    }
    for child in node.children() {
        write_element(writer, child)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(node.name())))
        .map_err(|e| xml_error(0, e))
}
