//! Main document part (word/document.xml)

use crate::document::body::Body;
use crate::error::{Error, Result};
use crate::xml::{self, read_raw, reader_from_str, start_with_attrs, unexpected_eof, RawXmlNode};
use quick_xml::events::{BytesEnd, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Root element of word/document.xml: its attributes, the body, and any
/// sibling elements such as w:background
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DocumentPart {
    pub(crate) root_attrs: Vec<(String, String)>,
    pub(crate) before_body: Vec<RawXmlNode>,
    pub(crate) body: Body,
    pub(crate) after_body: Vec<RawXmlNode>,
}

impl DocumentPart {
    /// Parse word/document.xml
    pub fn parse(xml_text: &str) -> Result<Self> {
        let mut reader = reader_from_str(xml_text);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"document" => {
                    let mut part = DocumentPart {
                        root_attrs: xml::attributes_of(&e),
                        ..Default::default()
                    };
                    part.read_children(&mut reader)?;
                    return Ok(part);
                }
                Event::Start(e) | Event::Empty(e) => {
                    return Err(Error::parse(
                        "word/document.xml",
                        format!("unexpected root element {}", xml::element_name(&e)),
                    ));
                }
                Event::Eof => {
                    return Err(Error::parse("word/document.xml", "missing w:document root element"))
                }
                _ => {}
            }
            buf.clear();
        }
    }

    fn read_children<R: BufRead>(&mut self, reader: &mut Reader<R>) -> Result<()> {
        let mut buf = Vec::new();
        let mut body = None;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"body" => {
                    body = Some(Body::from_reader(reader)?);
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"body" => {
                    body = Some(Body::default());
                }
                Event::Start(e) => {
                    let node = read_raw(reader, &e, false)?;
                    self.sibling(body.is_some()).push(node);
                }
                Event::Empty(e) => {
                    let node = read_raw(reader, &e, true)?;
                    self.sibling(body.is_some()).push(node);
                }
                Event::End(e) if e.name().local_name().as_ref() == b"document" => break,
                Event::Eof => return Err(unexpected_eof("w:document")),
                _ => {}
            }
            buf.clear();
        }

        self.body = body.ok_or_else(|| Error::parse("word/document.xml", "missing w:body element"))?;
        Ok(())
    }

    fn sibling(&mut self, after: bool) -> &mut Vec<RawXmlNode> {
        if after {
            &mut self.after_body
        } else {
            &mut self.before_body
        }
    }

    /// Write the w:document root element.
    ///
    /// Original root attributes (namespace declarations, `mc:Ignorable`) are
    /// kept; required declarations missing from them are added.
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let attrs = xml::merge_root_attributes(&self.root_attrs, &xml::document_namespaces());
        writer.write_event(Event::Start(start_with_attrs("w:document", &attrs)))?;
        for node in &self.before_body {
            node.write_to(writer)?;
        }
        self.body.write_to(writer)?;
        for node in &self.after_body {
            node.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:document")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const SIMPLE_DOC: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:background w:color="FFFFFF"/>
  <w:body>
    <w:p>
      <w:r>
        <w:t>Hello, World!</w:t>
      </w:r>
    </w:p>
    <w:p>
      <w:pPr>
        <w:pStyle w:val="Heading1"/>
      </w:pPr>
      <w:r>
        <w:rPr>
          <w:b/>
        </w:rPr>
        <w:t>This is a heading</w:t>
      </w:r>
    </w:p>
  </w:body>
</w:document>"#;

    fn write(part: &DocumentPart) -> String {
        let mut out = Vec::new();
        part.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_simple_document() {
        let part = DocumentPart::parse(SIMPLE_DOC).unwrap();
        let paras: Vec<_> = part.body.paragraphs().collect();
        assert_eq!(paras.len(), 2);
        assert_eq!(paras[0].text(), "Hello, World!");
        assert_eq!(paras[1].text(), "This is a heading");
        assert_eq!(paras[1].style(), Some("Heading1"));

        let runs: Vec<_> = paras[1].runs().collect();
        assert_eq!(runs.len(), 1);
        assert!(runs[0].bold());
        assert_eq!(part.before_body.len(), 1);
    }

    #[test]
    fn test_written_part_declares_namespaces() {
        let part = DocumentPart::parse(SIMPLE_DOC).unwrap();
        let xml = write(&part);
        assert!(xml.starts_with(concat!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships""#
        )));
        assert!(xml.contains(r#"<w:background w:color="FFFFFF"/><w:body>"#));
        // Second pass is stable
        assert_eq!(write(&DocumentPart::parse(&xml).unwrap()), xml);
    }

    #[test]
    fn test_parse_errors() {
        let missing_body = r#"<w:document xmlns:w="x"></w:document>"#;
        assert_eq!(
            DocumentPart::parse(missing_body).unwrap_err().kind(),
            ErrorKind::Parse
        );

        let truncated = r#"<w:document xmlns:w="x"><w:body><w:p><w:r><w:t>cut"#;
        assert_eq!(DocumentPart::parse(truncated).unwrap_err().kind(), ErrorKind::Parse);

        let mismatched = r#"<w:document xmlns:w="x"><w:body><w:p></w:r></w:body></w:document>"#;
        assert_eq!(DocumentPart::parse(mismatched).unwrap_err().kind(), ErrorKind::Parse);
    }
}
