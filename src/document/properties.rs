//! Package metadata parts (docProps/core.xml, docProps/app.xml)

use crate::document::validate::check_text;
use crate::error::{Error, Result};
use crate::xml::{
    self, read_raw, read_text, reader_from_str, start_with_attrs, unexpected_eof, write_in_order,
    write_text_element, RawXmlNode, CP, DC, DCMITYPE, DCTERMS, EP, VT, XSI,
};
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

const W3CDTF: &str = "%Y-%m-%dT%H:%M:%SZ";

const CORE_ORDER: &[&str] = &[
    "title", "subject", "creator", "keywords", "description", "lastModifiedBy", "revision",
    "lastPrinted", "created", "modified", "category", "contentStatus", "identifier",
    "language", "version",
];

/// Core document properties (Dublin Core metadata in docProps/core.xml)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CoreProperties {
    title: Option<String>,
    subject: Option<String>,
    creator: Option<String>,
    keywords: Option<String>,
    description: Option<String>,
    last_modified_by: Option<String>,
    revision: Option<u32>,
    created: Option<DateTime<Utc>>,
    modified: Option<DateTime<Utc>>,
    root_attrs: Vec<(String, String)>,
    unknown_children: Vec<RawXmlNode>,
}

impl CoreProperties {
    /// Properties of a new document, stamped with the current time
    pub fn new() -> Self {
        let now = Utc::now();
        CoreProperties {
            revision: Some(1),
            created: Some(now),
            modified: Some(now),
            ..Default::default()
        }
    }

    /// Parse docProps/core.xml
    pub fn parse(xml_text: &str) -> Result<Self> {
        let mut props = CoreProperties::default();
        let mut reader = reader_from_str(xml_text);
        let mut buf = Vec::new();
        let mut found = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"coreProperties" => {
                    props.root_attrs = xml::attributes_of(&e);
                    props.read_children(&mut reader)?;
                    found = true;
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"coreProperties" => {
                    props.root_attrs = xml::attributes_of(&e);
                    found = true;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !found {
            return Err(Error::parse("docProps/core.xml", "missing cp:coreProperties root element"));
        }
        Ok(props)
    }

    fn read_children<R: BufRead>(&mut self, reader: &mut Reader<R>) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => self.read_child(reader, &e)?,
                Event::Empty(e) => self.unknown_children.push(read_raw(reader, &e, true)?),
                Event::End(e) if e.name().local_name().as_ref() == b"coreProperties" => break,
                Event::Eof => return Err(unexpected_eof("cp:coreProperties")),
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn read_child<R: BufRead>(&mut self, reader: &mut Reader<R>, e: &BytesStart) -> Result<()> {
        let slot = match e.name().local_name().as_ref() {
            b"title" => &mut self.title,
            b"subject" => &mut self.subject,
            b"creator" => &mut self.creator,
            b"keywords" if xml::attributes_of(e).is_empty() => &mut self.keywords,
            b"description" => &mut self.description,
            b"lastModifiedBy" => &mut self.last_modified_by,
            b"revision" | b"created" | b"modified" => {
                // Values that do not parse are kept verbatim
                let raw = read_raw(reader, e, false)?;
                if !self.read_typed(&raw) {
                    self.unknown_children.push(raw);
                }
                return Ok(());
            }
            _ => {
                self.unknown_children.push(read_raw(reader, e, false)?);
                return Ok(());
            }
        };
        *slot = Some(read_text(reader, e)?);
        Ok(())
    }

    fn read_typed(&mut self, raw: &RawXmlNode) -> bool {
        let elem = match raw.as_element() {
            Some(elem) => elem,
            None => return false,
        };
        let text: String = elem
            .children
            .iter()
            .filter_map(|c| match c {
                RawXmlNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect();
        let text = text.trim();

        match elem.local_name() {
            "revision" => match text.parse() {
                Ok(rev) => {
                    self.revision = Some(rev);
                    true
                }
                Err(_) => false,
            },
            "created" | "modified" => {
                let parsed = match DateTime::parse_from_rfc3339(text) {
                    Ok(dt) => dt.with_timezone(&Utc),
                    Err(_) => return false,
                };
                if elem.local_name() == "created" {
                    self.created = Some(parsed);
                } else {
                    self.modified = Some(parsed);
                }
                true
            }
            _ => false,
        }
    }

    /// Document title (`dc:title`)
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the document title
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    /// Subject (`dc:subject`)
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Set the subject
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// Author
    pub fn creator(&self) -> Option<&str> {
        self.creator.as_deref()
    }

    /// Set the author
    pub fn set_creator(&mut self, creator: impl Into<String>) {
        self.creator = Some(creator.into());
    }

    /// Keywords (`cp:keywords`)
    pub fn keywords(&self) -> Option<&str> {
        self.keywords.as_deref()
    }

    /// Set the keywords
    pub fn set_keywords(&mut self, keywords: impl Into<String>) {
        self.keywords = Some(keywords.into());
    }

    /// Description (`dc:description`)
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Set the description
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Who saved the document last
    pub fn last_modified_by(&self) -> Option<&str> {
        self.last_modified_by.as_deref()
    }

    /// Set who saved the document last
    pub fn set_last_modified_by(&mut self, name: impl Into<String>) {
        self.last_modified_by = Some(name.into());
    }

    /// Revision number
    pub fn revision(&self) -> Option<u32> {
        self.revision
    }

    /// Set the revision number
    pub fn set_revision(&mut self, revision: u32) {
        self.revision = Some(revision);
    }

    /// Creation time (`dcterms:created`)
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Set the creation time
    pub fn set_created(&mut self, created: DateTime<Utc>) {
        self.created = Some(created);
    }

    /// Last modification time (`dcterms:modified`)
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// Set the last modification time
    pub fn set_modified(&mut self, modified: DateTime<Utc>) {
        self.modified = Some(modified);
    }

    /// Text values must be encodable as XML
    pub(crate) fn validate(&self) -> Result<()> {
        let values = [
            &self.title,
            &self.subject,
            &self.creator,
            &self.keywords,
            &self.description,
            &self.last_modified_by,
        ];
        for value in values.into_iter().flatten() {
            check_text("core properties", value)?;
        }
        Ok(())
    }

    /// Write the cp:coreProperties root element
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let required = [
            ("xmlns:cp", CP),
            ("xmlns:dc", DC),
            ("xmlns:dcterms", DCTERMS),
            ("xmlns:dcmitype", DCMITYPE),
            ("xmlns:xsi", XSI),
        ];
        let attrs = xml::merge_root_attributes(&self.root_attrs, &required);
        writer.write_event(Event::Start(start_with_attrs("cp:coreProperties", &attrs)))?;

        write_in_order(writer, CORE_ORDER, &self.unknown_children, |w, slot| {
            let (name, value) = match slot {
                "title" => ("dc:title", self.title.clone()),
                "subject" => ("dc:subject", self.subject.clone()),
                "creator" => ("dc:creator", self.creator.clone()),
                "keywords" => ("cp:keywords", self.keywords.clone()),
                "description" => ("dc:description", self.description.clone()),
                "lastModifiedBy" => ("cp:lastModifiedBy", self.last_modified_by.clone()),
                "revision" => ("cp:revision", self.revision.map(|r| r.to_string())),
                "created" => return write_date(w, "dcterms:created", self.created),
                "modified" => return write_date(w, "dcterms:modified", self.modified),
                _ => return Ok(()),
            };
            if let Some(value) = value {
                write_text_element(w, BytesStart::new(name), &value)?;
            }
            Ok(())
        })?;

        writer.write_event(Event::End(BytesEnd::new("cp:coreProperties")))?;
        Ok(())
    }
}

fn write_date<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    value: Option<DateTime<Utc>>,
) -> Result<()> {
    if let Some(dt) = value {
        let mut start = BytesStart::new(name);
        start.push_attribute(("xsi:type", "dcterms:W3CDTF"));
        write_text_element(writer, start, &dt.format(W3CDTF).to_string())?;
    }
    Ok(())
}

/// Write a minimal docProps/app.xml for documents that have none
pub(crate) fn write_app_properties<W: std::io::Write>(writer: &mut Writer<W>) -> Result<()> {
    let mut start = BytesStart::new("Properties");
    start.push_attribute(("xmlns", EP));
    start.push_attribute(("xmlns:vt", VT));
    writer.write_event(Event::Start(start))?;
    write_text_element(writer, BytesStart::new("Application"), "wordpack")?;
    write_text_element(writer, BytesStart::new("DocSecurity"), "0")?;
    write_text_element(writer, BytesStart::new("ScaleCrop"), "false")?;
    write_text_element(writer, BytesStart::new("LinksUpToDate"), "false")?;
    write_text_element(writer, BytesStart::new("SharedDoc"), "false")?;
    write_text_element(writer, BytesStart::new("HyperlinksChanged"), "false")?;
    writer.write_event(Event::End(BytesEnd::new("Properties")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn write(props: &CoreProperties) -> String {
        let mut out = Vec::new();
        props.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_new_properties_are_stamped() {
        let props = CoreProperties::new();
        assert!(props.created().is_some());
        assert_eq!(props.created(), props.modified());
        assert_eq!(props.revision(), Some(1));
    }

    #[test]
    fn test_write_dates_in_w3cdtf() {
        let mut props = CoreProperties::default();
        props.set_title("Report & Summary");
        props.set_created(Utc.with_ymd_and_hms(2024, 3, 5, 14, 30, 0).unwrap());
        let xml = write(&props);
        assert!(xml.contains("<dc:title>Report &amp; Summary</dc:title>"));
        assert!(xml.contains(
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">2024-03-05T14:30:00Z</dcterms:created>"#
        ));
        assert!(!xml.contains("dcterms:modified"));
    }

    #[test]
    fn test_parse_round_trip_keeps_unknown_elements() {
        let xml = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            r#"<dc:title>Quarterly</dc:title><dc:creator>Ana</dc:creator><cp:revision>4</cp:revision>"#,
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">2023-01-02T03:04:05Z</dcterms:created>"#,
            r#"<cp:category>Finance</cp:category></cp:coreProperties>"#
        );
        let props = CoreProperties::parse(xml).unwrap();
        assert_eq!(props.title(), Some("Quarterly"));
        assert_eq!(props.creator(), Some("Ana"));
        assert_eq!(props.revision(), Some(4));
        assert_eq!(
            props.created(),
            Some(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap())
        );

        let out = write(&props);
        assert!(out.contains("<cp:category>Finance</cp:category>"));
        assert_eq!(CoreProperties::parse(&out).unwrap(), props);
    }

    #[test]
    fn test_unparseable_date_is_preserved() {
        let xml = concat!(
            r#"<cp:coreProperties xmlns:cp="x" xmlns:dcterms="y">"#,
            r#"<dcterms:modified>yesterday</dcterms:modified></cp:coreProperties>"#
        );
        let props = CoreProperties::parse(xml).unwrap();
        assert_eq!(props.modified(), None);
        assert!(write(&props).contains("<dcterms:modified>yesterday</dcterms:modified>"));
    }
}
