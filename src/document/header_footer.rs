//! Header and footer parts (w:hdr, w:ftr)

use crate::document::body::{read_blocks, write_blocks, walk_blocks, Block, Visit};
use crate::document::Paragraph;
use crate::error::{Error, Result};
use crate::opc::PartUri;
use crate::xml::{self, reader_from_str, start_with_attrs};
use quick_xml::events::{BytesEnd, Event};
use quick_xml::Writer;

/// Which pages of a section a header or footer applies to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HeaderFooterType {
    #[default]
    Default,
    First,
    Even,
}

impl HeaderFooterType {
    /// Parse a `w:type` value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "default" => Some(HeaderFooterType::Default),
            "first" => Some(HeaderFooterType::First),
            "even" => Some(HeaderFooterType::Even),
            _ => None,
        }
    }

    /// Value written to `w:type`
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderFooterType::Default => "default",
            HeaderFooterType::First => "first",
            HeaderFooterType::Even => "even",
        }
    }
}

/// Header or footer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderFooterKind {
    Header,
    Footer,
}

impl HeaderFooterKind {
    /// Root element name of the part
    pub(crate) fn root_name(&self) -> &'static str {
        match self {
            HeaderFooterKind::Header => "w:hdr",
            HeaderFooterKind::Footer => "w:ftr",
        }
    }

    fn local_root(&self) -> &'static str {
        match self {
            HeaderFooterKind::Header => "hdr",
            HeaderFooterKind::Footer => "ftr",
        }
    }
}

/// A header or footer part and its content
#[derive(Clone, Debug, PartialEq)]
pub struct HeaderFooter {
    kind: HeaderFooterKind,
    part: PartUri,
    rel_id: String,
    blocks: Vec<Block>,
    root_attrs: Vec<(String, String)>,
}

impl HeaderFooter {
    pub(crate) fn new(kind: HeaderFooterKind, part: PartUri, rel_id: String) -> Self {
        HeaderFooter {
            kind,
            part,
            rel_id,
            blocks: Vec::new(),
            root_attrs: Vec::new(),
        }
    }

    /// Parse a header or footer part
    pub fn parse(kind: HeaderFooterKind, part: PartUri, rel_id: String, xml: &str) -> Result<Self> {
        let mut hf = Self::new(kind, part, rel_id);
        let mut reader = reader_from_str(xml);
        let mut buf = Vec::new();
        let mut found = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == kind.local_root().as_bytes() => {
                    hf.root_attrs = xml::attributes_of(&e);
                    hf.blocks = read_blocks(&mut reader, kind.local_root())?;
                    found = true;
                }
                Event::Empty(e) if e.name().local_name().as_ref() == kind.local_root().as_bytes() => {
                    hf.root_attrs = xml::attributes_of(&e);
                    found = true;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !found {
            return Err(Error::parse(
                hf.part.to_string(),
                format!("missing {} root element", kind.root_name()),
            ));
        }
        Ok(hf)
    }

    /// Header or footer
    pub fn kind(&self) -> HeaderFooterKind {
        self.kind
    }

    /// Part name, e.g. `/word/header1.xml`
    pub fn part(&self) -> &PartUri {
        &self.part
    }

    /// Relationship ID from the main document part
    pub fn rel_id(&self) -> &str {
        &self.rel_id
    }

    /// Block-level content
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterate over paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Add a paragraph
    pub fn add_paragraph(&mut self, para: Paragraph) -> &mut Paragraph {
        self.blocks.push(Block::Paragraph(para));
        match self.blocks.last_mut() {
            Some(Block::Paragraph(p)) => p,
            _ => unreachable!("just pushed a paragraph"),
        }
    }

    /// Text of all paragraphs joined by newlines
    pub fn text(&self) -> String {
        self.paragraphs()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub(crate) fn walk<'a>(&'a self, f: &mut dyn FnMut(Visit<'a>)) {
        walk_blocks(&self.blocks, f);
    }

    /// Write the part root and its content
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let attrs = xml::merge_root_attributes(&self.root_attrs, &xml::document_namespaces());
        let name = self.kind.root_name();
        writer.write_event(Event::Start(start_with_attrs(name, &attrs)))?;
        write_blocks(writer, &self.blocks)?;
        // A header or footer must contain at least one paragraph
        if self.blocks.is_empty() {
            Paragraph::default().write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(name)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::well_known;
    use pretty_assertions::assert_eq;

    fn write(hf: &HeaderFooter) -> String {
        let mut out = Vec::new();
        hf.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_type_values() {
        for t in [HeaderFooterType::Default, HeaderFooterType::First, HeaderFooterType::Even] {
            assert_eq!(HeaderFooterType::parse(t.as_str()), Some(t));
        }
        assert_eq!(HeaderFooterType::parse("odd"), None);
    }

    #[test]
    fn test_new_footer_has_paragraph() {
        let footer = HeaderFooter::new(HeaderFooterKind::Footer, well_known::footer(1), "rId9".into());
        let xml = write(&footer);
        assert!(xml.starts_with("<w:ftr xmlns:w="));
        assert!(xml.ends_with("<w:p/></w:ftr>"));
    }

    #[test]
    fn test_parse_keeps_root_attributes() {
        let xml = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" mc:Ignorable="w14">"#,
            r#"<w:p><w:r><w:t>Top</w:t></w:r></w:p></w:hdr>"#
        );
        let hf = HeaderFooter::parse(HeaderFooterKind::Header, well_known::header(1), "rId7".into(), xml)
            .unwrap();
        assert_eq!(hf.text(), "Top");
        let out = write(&hf);
        assert!(out.contains(r#"mc:Ignorable="w14""#));
        assert!(out.contains(r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#));
    }

    #[test]
    fn test_wrong_root_is_a_parse_error() {
        let err = HeaderFooter::parse(
            HeaderFooterKind::Footer,
            well_known::footer(1),
            "rId1".into(),
            "<w:hdr/>",
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Parse);
    }
}
