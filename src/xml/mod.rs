//! XML utilities and raw element preservation for round-trip support

mod namespace;
mod raw;

pub use namespace::*;
pub use raw::{RawXmlElement, RawXmlNode};

use crate::error::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Collect all attributes of an element as unescaped `(name, value)` pairs
pub fn attributes_of(element: &BytesStart) -> Vec<(String, String)> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
            let value = a
                .unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).to_string());
            (key, value)
        })
        .collect()
}

/// Full (prefixed) element name
pub fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).to_string()
}

/// Helper to get attribute value from BytesStart
pub fn get_attr(element: &BytesStart, name: &str) -> Option<String> {
    element
        .attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.as_ref() == name.as_bytes())
        .map(|a| {
            a.unescape_value()
                .map(|v| v.to_string())
                .unwrap_or_else(|_| String::from_utf8_lossy(&a.value).to_string())
        })
}

/// Get a `w:`-prefixed attribute, accepting the unprefixed spelling too
pub fn get_w_attr(element: &BytesStart, local: &str) -> Option<String> {
    get_attr(element, &format!("w:{}", local)).or_else(|| get_attr(element, local))
}

/// Helper to get w:val attribute (common in OOXML)
pub fn get_w_val(element: &BytesStart) -> Option<String> {
    get_w_attr(element, "val")
}

/// Parse a numeric `w:` attribute
pub fn get_w_num<T: std::str::FromStr>(element: &BytesStart, local: &str) -> Option<T> {
    get_w_attr(element, local).and_then(|v| v.trim().parse().ok())
}

/// Parse a boolean value from OOXML (handles "1", "true", "on", or missing val)
pub fn parse_bool(element: &BytesStart) -> bool {
    match get_w_val(element) {
        None => true, // No val attribute means true (e.g., <w:b/>)
        Some(v) => matches!(v.as_str(), "1" | "true" | "on"),
    }
}

/// Error for an element that was never closed
pub(crate) fn unexpected_eof(element: &str) -> Error {
    Error::parse(element, "unexpected end of input")
}

/// Write `<name w:val="value"/>`
pub(crate) fn write_val<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: &str,
) -> Result<()> {
    let mut elem = BytesStart::new(name);
    elem.push_attribute(("w:val", value));
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// Write a toggle property: `<name/>` for true, `<name w:val="0"/>` for false
pub(crate) fn write_toggle<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: bool,
) -> Result<()> {
    let mut elem = BytesStart::new(name);
    if !value {
        elem.push_attribute(("w:val", "0"));
    }
    writer.write_event(Event::Empty(elem))?;
    Ok(())
}

/// Write `<name>text</name>`
pub(crate) fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    start: BytesStart,
    text: &str,
) -> Result<()> {
    let end = BytesEnd::new(element_name(&start));
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

/// Read the text content of the current element up to its end tag
pub(crate) fn read_text<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<String> {
    let name = element_name(start);
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Text(t) => text.push_str(&t.unescape().map_err(quick_xml::Error::from)?),
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(e) if e.name().as_ref() == name.as_bytes() => break,
            Event::Eof => return Err(unexpected_eof(&name)),
            _ => {}
        }
        buf.clear();
    }

    Ok(text)
}

/// Skip an element and all its children
pub(crate) fn skip_element<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<()> {
    let name = element_name(start);
    let mut depth = 1;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == name.as_bytes() => depth += 1,
            Event::End(e) if e.name().as_ref() == name.as_bytes() => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            Event::Eof => return Err(unexpected_eof(&name)),
            _ => {}
        }
        buf.clear();
    }

    Ok(())
}

/// Local part of a possibly prefixed name
pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit(':').next().unwrap_or(name)
}

/// Read an unrecognized element into an opaque node
pub(crate) fn read_raw<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
    empty: bool,
) -> Result<RawXmlNode> {
    if empty {
        Ok(RawXmlElement::from_empty(start).into())
    } else {
        Ok(RawXmlElement::from_reader(reader, start)?.into())
    }
}

/// Consume the rest of a recognized element whose content is not needed
pub(crate) fn finish_element<R: BufRead>(
    reader: &mut Reader<R>,
    start: &BytesStart,
    empty: bool,
) -> Result<()> {
    if empty {
        Ok(())
    } else {
        skip_element(reader, start)
    }
}

/// Write the children of a property container in schema order.
///
/// For every slot in `order`, `typed` writes the modeled element for that slot
/// (if any), followed by preserved unknown children with the same local name.
/// Unknown children whose name is not in `order` are written last.
pub(crate) fn write_in_order<W, F>(
    writer: &mut Writer<W>,
    order: &[&str],
    unknown: &[RawXmlNode],
    mut typed: F,
) -> Result<()>
where
    W: std::io::Write,
    F: FnMut(&mut Writer<W>, &str) -> Result<()>,
{
    for slot in order {
        typed(writer, slot)?;
        for node in unknown {
            if let RawXmlNode::Element(e) = node {
                if e.local_name() == *slot {
                    node.write_to(writer)?;
                }
            }
        }
    }
    for node in unknown {
        let ranked = node
            .as_element()
            .map(|e| order.contains(&e.local_name()))
            .unwrap_or(false);
        if !ranked {
            node.write_to(writer)?;
        }
    }
    Ok(())
}

/// Start tag carrying the given attributes
pub(crate) fn start_with_attrs<'a>(name: &'a str, attrs: &'a [(String, String)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for (key, value) in attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }
    start
}

/// Create a reader that keeps whitespace exactly as written
pub(crate) fn reader_from_str(xml: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);
    reader
}
