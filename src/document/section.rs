//! Section properties (w:sectPr)

use crate::document::validate::{
    check_columns, check_page_dimension, check_signed_twips, check_twips,
};
use crate::document::{HeaderFooterKind, HeaderFooterType};
use crate::error::Result;
use crate::xml::{
    self, finish_element, get_attr, get_w_attr, get_w_val, parse_bool, read_raw,
    start_with_attrs, unexpected_eof, write_in_order, write_val, RawXmlElement, RawXmlNode,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// US Letter width in twips
pub const LETTER_WIDTH: u32 = 12240;
/// US Letter height in twips
pub const LETTER_HEIGHT: u32 = 15840;

const SECTPR_ORDER: &[&str] = &[
    "headerReference", "footerReference", "footnotePr", "endnotePr", "type", "pgSz", "pgMar",
    "paperSrc", "pgBorders", "lnNumType", "pgNumType", "cols", "formProt", "vAlign",
    "noEndnote", "titlePg", "textDirection", "bidi", "rtlGutter", "docGrid",
    "printerSettings", "sectPrChange",
];

/// How a section starts relative to the previous one
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SectionBreak {
    #[default]
    NextPage,
    Continuous,
    EvenPage,
    OddPage,
    NextColumn,
}

impl SectionBreak {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "nextPage" => Some(Self::NextPage),
            "continuous" => Some(Self::Continuous),
            "evenPage" => Some(Self::EvenPage),
            "oddPage" => Some(Self::OddPage),
            "nextColumn" => Some(Self::NextColumn),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::NextPage => "nextPage",
            Self::Continuous => "continuous",
            Self::EvenPage => "evenPage",
            Self::OddPage => "oddPage",
            Self::NextColumn => "nextColumn",
        }
    }
}

/// Page orientation
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Page margins in twips
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageMargins {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
    pub header: u32,
    pub footer: u32,
    pub gutter: u32,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            top: 1440,
            right: 1440,
            bottom: 1440,
            left: 1440,
            header: 720,
            footer: 720,
            gutter: 0,
        }
    }
}

/// A header or footer attached to a section
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderFooterRef {
    pub kind: HeaderFooterKind,
    pub hf_type: HeaderFooterType,
    pub rel_id: String,
}

/// Section properties: page geometry, columns and header/footer references
#[derive(Clone, Debug, PartialEq)]
pub struct Section {
    page_width: u32,
    page_height: u32,
    orientation: Orientation,
    margins: PageMargins,
    column_count: u32,
    column_space: u32,
    break_type: SectionBreak,
    title_page: bool,
    references: Vec<HeaderFooterRef>,
    /// Attributes of w:sectPr (rsids)
    attrs: Vec<(String, String)>,
    page_size_extra: Vec<(String, String)>,
    margins_extra: Vec<(String, String)>,
    /// Unmodeled attributes and w:col children of w:cols
    columns_extra: Vec<(String, String)>,
    columns_children: Vec<RawXmlNode>,
    unknown_children: Vec<RawXmlNode>,
    /// Index one past the last body block of this section; `None` for the final section
    pub(crate) end: Option<usize>,
}

impl Default for Section {
    fn default() -> Self {
        Self {
            page_width: LETTER_WIDTH,
            page_height: LETTER_HEIGHT,
            orientation: Orientation::Portrait,
            margins: PageMargins::default(),
            column_count: 1,
            column_space: 720,
            break_type: SectionBreak::NextPage,
            title_page: false,
            references: Vec::new(),
            attrs: Vec::new(),
            page_size_extra: Vec::new(),
            margins_extra: Vec::new(),
            columns_extra: Vec::new(),
            columns_children: Vec::new(),
            unknown_children: Vec::new(),
            end: None,
        }
    }
}

impl Section {
    /// A Letter-sized portrait section with one-inch margins
    pub fn new() -> Self {
        Self::default()
    }

    /// Page width and height in twips
    pub fn page_size(&self) -> (u32, u32) {
        (self.page_width, self.page_height)
    }

    /// Set page width and height in twips (1..=31680 each)
    pub fn set_page_size(&mut self, width: u32, height: u32) -> Result<()> {
        check_page_dimension("set_page_size", width)?;
        check_page_dimension("set_page_size", height)?;
        self.page_width = width;
        self.page_height = height;
        self.page_size_extra.retain(|(k, _)| k != "w:w" && k != "w:h");
        Ok(())
    }

    /// Page orientation
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Set orientation, swapping width and height when they disagree with it
    pub fn set_orientation(&mut self, orientation: Orientation) {
        self.orientation = orientation;
        let landscape_dims = self.page_width > self.page_height;
        let wants_landscape = orientation == Orientation::Landscape;
        if landscape_dims != wants_landscape && self.page_width != self.page_height {
            std::mem::swap(&mut self.page_width, &mut self.page_height);
            for (key, _) in &mut self.page_size_extra {
                match key.as_str() {
                    "w:w" => *key = "w:h".to_string(),
                    "w:h" => *key = "w:w".to_string(),
                    _ => {}
                }
            }
        }
    }

    /// Page margins in twips
    pub fn margins(&self) -> &PageMargins {
        &self.margins
    }

    /// Set page margins (each within ±31680 twips)
    pub fn set_margins(&mut self, margins: PageMargins) -> Result<()> {
        check_margins("set_margins", &margins)?;
        self.margins = margins;
        self.margins_extra.retain(|(k, _)| !MARGIN_KEYS.contains(&k.as_str()));
        Ok(())
    }

    /// Number of text columns and the space between them in twips
    pub fn columns(&self) -> (u32, u32) {
        (self.column_count, self.column_space)
    }

    /// Set equal-width columns (1..=45)
    pub fn set_columns(&mut self, count: u32, space: u32) -> Result<()> {
        check_columns("set_columns", count)?;
        check_twips("set_columns", "column space", space)?;
        self.column_count = count;
        self.column_space = space;
        // Explicit w:col widths no longer match the new count
        self.columns_children.clear();
        self.columns_extra
            .retain(|(k, _)| k != "w:equalWidth" && k != "w:num" && k != "w:space");
        Ok(())
    }

    /// How this section starts relative to the previous one
    pub fn break_type(&self) -> SectionBreak {
        self.break_type
    }

    /// Set how this section starts
    pub fn set_break_type(&mut self, break_type: SectionBreak) {
        self.break_type = break_type;
    }

    /// Whether the first page uses the `First` header and footer
    pub fn title_page(&self) -> bool {
        self.title_page || self.references.iter().any(|r| r.hf_type == HeaderFooterType::First)
    }

    /// Set whether the first page has its own header and footer
    pub fn set_title_page(&mut self, title_page: bool) {
        self.title_page = title_page;
    }

    /// Header and footer references of this section
    pub fn references(&self) -> &[HeaderFooterRef] {
        &self.references
    }

    /// Relationship ID of the header of the given type
    pub fn header_reference(&self, hf_type: HeaderFooterType) -> Option<&str> {
        self.reference(HeaderFooterKind::Header, hf_type)
    }

    /// Relationship ID of the footer of the given type
    pub fn footer_reference(&self, hf_type: HeaderFooterType) -> Option<&str> {
        self.reference(HeaderFooterKind::Footer, hf_type)
    }

    fn reference(&self, kind: HeaderFooterKind, hf_type: HeaderFooterType) -> Option<&str> {
        self.references
            .iter()
            .find(|r| r.kind == kind && r.hf_type == hf_type)
            .map(|r| r.rel_id.as_str())
    }

    /// Attach a header or footer, replacing any of the same kind and type
    pub(crate) fn set_reference(
        &mut self,
        kind: HeaderFooterKind,
        hf_type: HeaderFooterType,
        rel_id: String,
    ) {
        self.references
            .retain(|r| !(r.kind == kind && r.hf_type == hf_type));
        self.references.push(HeaderFooterRef {
            kind,
            hf_type,
            rel_id,
        });
    }

    /// Drop header/footer references and preserved children that point at
    /// relationships of the owning part
    pub(crate) fn clear_references(&mut self) {
        self.references.clear();
        self.unknown_children.retain(|node| match node.as_element() {
            Some(elem) => !elem.attributes.iter().any(|(k, _)| k.starts_with("r:")),
            None => true,
        });
    }

    /// Preserved children (w:pgNumType, w:printerSettings, ...)
    pub(crate) fn unknown_nodes(&self) -> &[RawXmlNode] {
        &self.unknown_children
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_page_dimension("validate", self.page_width)?;
        check_page_dimension("validate", self.page_height)?;
        check_margins("validate", &self.margins)?;
        check_columns("validate", self.column_count)?;
        check_twips("validate", "column space", self.column_space)
    }

    /// Parse from reader (after w:sectPr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut section = Self::from_empty(start);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => section.read_child(reader, &e, false)?,
                Event::Empty(e) => section.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"sectPr" => break,
                Event::Eof => return Err(unexpected_eof("w:sectPr")),
                _ => {}
            }
            buf.clear();
        }

        Ok(section)
    }

    /// Create from an empty `<w:sectPr/>`
    pub fn from_empty(start: &BytesStart) -> Self {
        Self {
            attrs: xml::attributes_of(start),
            ..Default::default()
        }
    }

    fn read_child<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        e: &BytesStart,
        empty: bool,
    ) -> Result<()> {
        match e.name().local_name().as_ref() {
            name @ (b"headerReference" | b"footerReference") => {
                let kind = if name == b"headerReference" {
                    HeaderFooterKind::Header
                } else {
                    HeaderFooterKind::Footer
                };
                let hf_type = get_w_attr(e, "type").and_then(|t| HeaderFooterType::parse(&t));
                match (hf_type, get_attr(e, "r:id")) {
                    (Some(hf_type), Some(rel_id)) => {
                        self.references.push(HeaderFooterRef {
                            kind,
                            hf_type,
                            rel_id,
                        });
                        finish_element(reader, e, empty)
                    }
                    _ => self.keep(reader, e, empty),
                }
            }
            b"type" => match get_w_val(e).and_then(|v| SectionBreak::parse(&v)) {
                Some(break_type) => {
                    self.break_type = break_type;
                    finish_element(reader, e, empty)
                }
                None => self.keep(reader, e, empty),
            },
            b"pgSz" => {
                for (key, value) in xml::attributes_of(e) {
                    match key.as_str() {
                        "w:w" => match value.trim().parse() {
                            Ok(width) => self.page_width = width,
                            Err(_) => self.page_size_extra.push((key, value)),
                        },
                        "w:h" => match value.trim().parse() {
                            Ok(height) => self.page_height = height,
                            Err(_) => self.page_size_extra.push((key, value)),
                        },
                        "w:orient" if value == "landscape" => {
                            self.orientation = Orientation::Landscape
                        }
                        "w:orient" => self.orientation = Orientation::Portrait,
                        _ => self.page_size_extra.push((key, value)),
                    }
                }
                finish_element(reader, e, empty)
            }
            b"pgMar" => {
                let m = &mut self.margins;
                for (key, value) in xml::attributes_of(e) {
                    let slot: Option<&mut i32> = match key.as_str() {
                        "w:top" => Some(&mut m.top),
                        "w:right" => Some(&mut m.right),
                        "w:bottom" => Some(&mut m.bottom),
                        "w:left" => Some(&mut m.left),
                        _ => None,
                    };
                    if let Some(slot) = slot {
                        match value.trim().parse() {
                            Ok(v) => *slot = v,
                            Err(_) => self.margins_extra.push((key, value)),
                        }
                        continue;
                    }
                    let slot: Option<&mut u32> = match key.as_str() {
                        "w:header" => Some(&mut m.header),
                        "w:footer" => Some(&mut m.footer),
                        "w:gutter" => Some(&mut m.gutter),
                        _ => None,
                    };
                    match slot.map(|slot| (slot, value.trim().parse())) {
                        Some((slot, Ok(v))) => *slot = v,
                        _ => self.margins_extra.push((key, value)),
                    }
                }
                finish_element(reader, e, empty)
            }
            b"cols" => {
                self.column_count = 1;
                self.column_space = 720;
                self.columns_extra.clear();
                for (key, value) in xml::attributes_of(e) {
                    let slot = match key.as_str() {
                        "w:num" => Some(&mut self.column_count),
                        "w:space" => Some(&mut self.column_space),
                        _ => None,
                    };
                    match slot.map(|slot| (slot, value.trim().parse())) {
                        Some((slot, Ok(v))) => *slot = v,
                        _ => self.columns_extra.push((key, value)),
                    }
                }
                if !empty {
                    let raw = RawXmlElement::from_reader(reader, e)?;
                    self.columns_children = raw.children;
                }
                Ok(())
            }
            b"titlePg" => {
                self.title_page = parse_bool(e);
                finish_element(reader, e, empty)
            }
            _ => self.keep(reader, e, empty),
        }
    }

    fn keep<R: BufRead>(&mut self, reader: &mut Reader<R>, e: &BytesStart, empty: bool) -> Result<()> {
        self.unknown_children.push(read_raw(reader, e, empty)?);
        Ok(())
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(start_with_attrs("w:sectPr", &self.attrs)))?;
        write_in_order(writer, SECTPR_ORDER, &self.unknown_children, |w, slot| {
            match slot {
                "headerReference" => self.write_references(w, HeaderFooterKind::Header)?,
                "footerReference" => self.write_references(w, HeaderFooterKind::Footer)?,
                "type" => write_val(w, "w:type", self.break_type.as_str())?,
                "pgSz" => {
                    let width = self.page_width.to_string();
                    let height = self.page_height.to_string();
                    let mut elem = BytesStart::new("w:pgSz");
                    for (key, value) in [("w:w", &width), ("w:h", &height)] {
                        if !kept(&self.page_size_extra, key) {
                            elem.push_attribute((key, value.as_str()));
                        }
                    }
                    if self.orientation == Orientation::Landscape {
                        elem.push_attribute(("w:orient", "landscape"));
                    }
                    for (key, value) in &self.page_size_extra {
                        elem.push_attribute((key.as_str(), value.as_str()));
                    }
                    w.write_event(Event::Empty(elem))?;
                }
                "pgMar" => {
                    let m = &self.margins;
                    let values = [
                        ("w:top", m.top.to_string()),
                        ("w:right", m.right.to_string()),
                        ("w:bottom", m.bottom.to_string()),
                        ("w:left", m.left.to_string()),
                        ("w:header", m.header.to_string()),
                        ("w:footer", m.footer.to_string()),
                        ("w:gutter", m.gutter.to_string()),
                    ];
                    let mut elem = BytesStart::new("w:pgMar");
                    for (key, value) in &values {
                        if !kept(&self.margins_extra, key) {
                            elem.push_attribute((*key, value.as_str()));
                        }
                    }
                    for (key, value) in &self.margins_extra {
                        elem.push_attribute((key.as_str(), value.as_str()));
                    }
                    w.write_event(Event::Empty(elem))?;
                }
                "cols" => {
                    let space = self.column_space.to_string();
                    let num = self.column_count.to_string();
                    let mut elem = BytesStart::new("w:cols");
                    if !kept(&self.columns_extra, "w:space") {
                        elem.push_attribute(("w:space", space.as_str()));
                    }
                    if self.column_count > 1 && !kept(&self.columns_extra, "w:num") {
                        elem.push_attribute(("w:num", num.as_str()));
                    }
                    for (key, value) in &self.columns_extra {
                        elem.push_attribute((key.as_str(), value.as_str()));
                    }
                    if self.columns_children.is_empty() {
                        w.write_event(Event::Empty(elem))?;
                    } else {
                        w.write_event(Event::Start(elem))?;
                        for child in &self.columns_children {
                            child.write_to(w)?;
                        }
                        w.write_event(Event::End(BytesEnd::new("w:cols")))?;
                    }
                }
                "titlePg" => {
                    if self.title_page() {
                        w.write_event(Event::Empty(BytesStart::new("w:titlePg")))?;
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        writer.write_event(Event::End(BytesEnd::new("w:sectPr")))?;
        Ok(())
    }

    fn write_references<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        kind: HeaderFooterKind,
    ) -> Result<()> {
        let name = match kind {
            HeaderFooterKind::Header => "w:headerReference",
            HeaderFooterKind::Footer => "w:footerReference",
        };
        for reference in self.references.iter().filter(|r| r.kind == kind) {
            let mut elem = BytesStart::new(name);
            elem.push_attribute(("w:type", reference.hf_type.as_str()));
            elem.push_attribute(("r:id", reference.rel_id.as_str()));
            writer.write_event(Event::Empty(elem))?;
        }
        Ok(())
    }
}

const MARGIN_KEYS: &[&str] = &[
    "w:top", "w:right", "w:bottom", "w:left", "w:header", "w:footer", "w:gutter",
];

/// An attribute whose original text could not be parsed is written back as is
fn kept(extra: &[(String, String)], key: &str) -> bool {
    extra.iter().any(|(k, _)| k == key)
}

fn check_margins(operation: &str, margins: &PageMargins) -> Result<()> {
    check_signed_twips(operation, "top margin", margins.top)?;
    check_signed_twips(operation, "right margin", margins.right)?;
    check_signed_twips(operation, "bottom margin", margins.bottom)?;
    check_signed_twips(operation, "left margin", margins.left)?;
    check_twips(operation, "header margin", margins.header)?;
    check_twips(operation, "footer margin", margins.footer)?;
    check_twips(operation, "gutter", margins.gutter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::reader_from_str;
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> Section {
        let mut reader = reader_from_str(xml);
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf).unwrap() {
                Event::Start(e) => {
                    let e = e.into_owned();
                    return Section::from_reader(&mut reader, &e).unwrap();
                }
                Event::Empty(e) => return Section::from_empty(&e),
                Event::Eof => panic!("no sectPr"),
                _ => {}
            }
            buf.clear();
        }
    }

    fn write(section: &Section) -> String {
        let mut out = Vec::new();
        section.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_default_section_markup() {
        assert_eq!(
            write(&Section::new()),
            concat!(
                r#"<w:sectPr><w:type w:val="nextPage"/>"#,
                r#"<w:pgSz w:w="12240" w:h="15840"/>"#,
                r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#,
                r#"<w:cols w:space="720"/></w:sectPr>"#
            )
        );
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        let mut section = Section::new();
        section.set_orientation(Orientation::Landscape);
        assert_eq!(section.page_size(), (15840, 12240));
        section.set_orientation(Orientation::Portrait);
        assert_eq!(section.page_size(), (12240, 15840));
    }

    #[test]
    fn test_references_and_unknown_children_survive() {
        let xml = concat!(
            r#"<w:sectPr w:rsidR="00112233">"#,
            r#"<w:headerReference w:type="default" r:id="rId8"/>"#,
            r#"<w:footerReference w:type="first" r:id="rId9"/>"#,
            r#"<w:type w:val="continuous"/>"#,
            r#"<w:pgSz w:w="16838" w:h="11906" w:orient="landscape" w:code="9"/>"#,
            r#"<w:pgMar w:top="720" w:right="720" w:bottom="720" w:left="720" w:header="360" w:footer="360" w:gutter="0"/>"#,
            r#"<w:cols w:space="425"/>"#,
            r#"<w:titlePg/>"#,
            r#"<w:docGrid w:linePitch="312"/>"#,
            r#"</w:sectPr>"#
        );
        let section = parse(xml);
        assert_eq!(section.header_reference(HeaderFooterType::Default), Some("rId8"));
        assert_eq!(section.footer_reference(HeaderFooterType::First), Some("rId9"));
        assert_eq!(section.break_type(), SectionBreak::Continuous);
        assert_eq!(section.orientation(), Orientation::Landscape);
        assert_eq!(write(&section), xml);
    }

    #[test]
    fn test_setters_validate_ranges() {
        let mut section = Section::new();
        assert!(section.set_page_size(0, 100).is_err());
        assert!(section.set_page_size(40000, 100).is_err());
        assert!(section.set_columns(0, 720).is_err());
        assert!(section.set_columns(46, 720).is_err());
        section.set_columns(2, 360).unwrap();
        assert_eq!(section.columns(), (2, 360));

        let margins = PageMargins {
            left: -40000,
            ..Default::default()
        };
        assert!(section.set_margins(margins).is_err());
    }

    #[test]
    fn test_unparseable_values_are_written_back() {
        let xml = concat!(
            r#"<w:sectPr><w:type w:val="nextPage"/>"#,
            r#"<w:pgSz w:w="12240" w:h="11.5in"/>"#,
            r#"<w:pgMar w:top="1440" w:right="1440" w:bottom="1440" w:left="1440" w:header="720" w:footer="720" w:gutter="half"/>"#,
            r#"<w:cols w:space="wide"/></w:sectPr>"#
        );
        let section = parse(xml);
        assert_eq!(section.page_size(), (12240, 15840));
        assert_eq!(section.margins().gutter, 0);
        section.validate().unwrap();

        let out = write(&section);
        assert!(out.contains(r#"<w:pgSz w:w="12240" w:h="11.5in"/>"#), "{}", out);
        assert!(out.contains(r#"w:footer="720" w:gutter="half"/>"#), "{}", out);
        assert!(out.contains(r#"<w:cols w:space="wide"/>"#), "{}", out);
        assert_eq!(out.matches("w:h=").count(), 1);

        // A typed value set later replaces the original text
        let mut section = section;
        section.set_page_size(12240, 15840).unwrap();
        section.set_columns(1, 720).unwrap();
        let out = write(&section);
        assert!(out.contains(r#"<w:pgSz w:w="12240" w:h="15840"/>"#), "{}", out);
        assert!(out.contains(r#"<w:cols w:space="720"/>"#), "{}", out);
    }
}
