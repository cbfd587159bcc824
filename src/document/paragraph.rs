//! Paragraph element (w:p)

use crate::document::validate::{check_signed_twips, check_twips};
use crate::document::{Field, Run, Section};
use crate::error::{Error, Result};
use crate::xml::{
    self, finish_element, get_attr, get_w_attr, get_w_val, read_raw, start_with_attrs,
    unexpected_eof, write_in_order, write_val, RawXmlElement, RawXmlNode,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Paragraph element (w:p)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Paragraph {
    properties: ParagraphProperties,
    content: Vec<ParagraphContent>,
    /// Attributes of w:p (rsids, paraId)
    attrs: Vec<(String, String)>,
    /// Section break carried in w:pPr, lifted out by the body parser
    pub(crate) section: Option<Section>,
}

/// Content within a paragraph
#[derive(Clone, Debug, PartialEq)]
pub enum ParagraphContent {
    /// Text run
    Run(Run),
    /// Complex field spanning several runs
    Field(Field),
    /// Hyperlink
    Hyperlink(Hyperlink),
    /// Bookmark start
    BookmarkStart { id: u64, name: String },
    /// Bookmark end
    BookmarkEnd { id: u64 },
    /// Unknown element (preserved)
    Unknown(RawXmlNode),
}

/// Hyperlink element (w:hyperlink)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Hyperlink {
    rel_id: Option<String>,
    anchor: Option<String>,
    attrs: Vec<(String, String)>,
    content: Vec<ParagraphContent>,
}

/// Paragraph alignment (w:jc)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Both,
    Distribute,
    Start,
    End,
}

impl Alignment {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(Self::Left),
            "center" => Some(Self::Center),
            "right" => Some(Self::Right),
            "both" => Some(Self::Both),
            "distribute" => Some(Self::Distribute),
            "start" => Some(Self::Start),
            "end" => Some(Self::End),
            _ => None,
        }
    }

    /// Value written to `w:jc`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Both => "both",
            Self::Distribute => "distribute",
            Self::Start => "start",
            Self::End => "end",
        }
    }
}

/// Paragraph indentation in twips
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Indentation {
    pub left: Option<i32>,
    pub right: Option<i32>,
    /// Positive for a first-line indent, negative for a hanging indent
    pub first_line: Option<i32>,
}

/// How `Spacing::line` is interpreted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineRule {
    /// 240ths of a line
    Auto,
    /// Exact height in twips
    Exact,
    /// Minimum height in twips
    AtLeast,
}

impl LineRule {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "auto" => Some(Self::Auto),
            "exact" => Some(Self::Exact),
            "atLeast" => Some(Self::AtLeast),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Exact => "exact",
            Self::AtLeast => "atLeast",
        }
    }
}

/// Paragraph spacing in twips
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Spacing {
    pub before: Option<u32>,
    pub after: Option<u32>,
    pub line: Option<u32>,
    pub line_rule: Option<LineRule>,
}

/// Paragraph properties (w:pPr)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParagraphProperties {
    pub(crate) style: Option<String>,
    pub(crate) alignment: Option<Alignment>,
    pub(crate) indentation: Option<Indentation>,
    pub(crate) spacing: Option<Spacing>,
    pub(crate) num_id: Option<u32>,
    pub(crate) num_level: Option<u32>,
    pub(crate) outline_level: Option<u8>,
    pub(crate) unknown_children: Vec<RawXmlNode>,
}

const PPR_ORDER: &[&str] = &[
    "pStyle", "keepNext", "keepLines", "pageBreakBefore", "framePr", "widowControl", "numPr",
    "suppressLineNumbers", "pBdr", "shd", "tabs", "suppressAutoHyphens", "kinsoku",
    "wordWrap", "overflowPunct", "topLinePunct", "autoSpaceDE", "autoSpaceDN", "bidi",
    "adjustRightInd", "snapToGrid", "spacing", "ind", "contextualSpacing", "mirrorIndents",
    "suppressOverlap", "jc", "textDirection", "textAlignment", "textboxTightWrap",
    "outlineLvl", "divId", "cnfStyle", "rPr", "sectPr", "pPrChange",
];

impl Paragraph {
    /// Create a paragraph holding one run of text
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut para = Paragraph::default();
        if !text.is_empty() {
            para.add_run(Run::new(text));
        }
        para
    }

    /// Parse paragraph from reader (after w:p start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut para = Self::from_empty(start);
        let mut content = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"pPr" => {
                    let (props, section) = ParagraphProperties::from_reader(reader)?;
                    para.properties = props;
                    para.section = section;
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"pPr" => {}
                Event::Start(e) => read_inline(reader, &e, false, &mut content)?,
                Event::Empty(e) => read_inline(reader, &e, true, &mut content)?,
                Event::End(e) if e.name().local_name().as_ref() == b"p" => break,
                Event::Eof => return Err(unexpected_eof("w:p")),
                _ => {}
            }
            buf.clear();
        }

        para.content = collapse_fields(content);
        Ok(para)
    }

    /// Create from empty element
    pub fn from_empty(start: &BytesStart) -> Self {
        Paragraph {
            attrs: xml::attributes_of(start),
            ..Default::default()
        }
    }

    /// Get paragraph text, including field results and hyperlink text
    pub fn text(&self) -> String {
        inline_text(&self.content)
    }

    /// Get paragraph style ID
    pub fn style(&self) -> Option<&str> {
        self.properties.style.as_deref()
    }

    /// Set paragraph style
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.properties.style = Some(style.into());
    }

    /// Paragraph properties
    pub fn properties(&self) -> &ParagraphProperties {
        &self.properties
    }

    /// Mutable paragraph properties
    pub fn properties_mut(&mut self) -> &mut ParagraphProperties {
        &mut self.properties
    }

    /// Get all direct runs (fields and hyperlinks excluded)
    pub fn runs(&self) -> impl Iterator<Item = &Run> {
        self.content.iter().filter_map(|c| match c {
            ParagraphContent::Run(r) => Some(r),
            _ => None,
        })
    }

    /// Get all direct runs mutably
    pub fn runs_mut(&mut self) -> impl Iterator<Item = &mut Run> {
        self.content.iter_mut().filter_map(|c| match c {
            ParagraphContent::Run(r) => Some(r),
            _ => None,
        })
    }

    /// Paragraph content in document order
    pub fn content(&self) -> &[ParagraphContent] {
        &self.content
    }

    /// Mutable paragraph content
    pub fn content_mut(&mut self) -> &mut Vec<ParagraphContent> {
        &mut self.content
    }

    /// Add a run
    pub fn add_run(&mut self, run: Run) -> &mut Run {
        self.content.push(ParagraphContent::Run(run));
        match self.content.last_mut() {
            Some(ParagraphContent::Run(run)) => run,
            _ => unreachable!("just pushed a run"),
        }
    }

    /// Add a run of plain text
    pub fn add_text(&mut self, text: impl Into<String>) -> &mut Run {
        self.add_run(Run::new(text))
    }

    /// Add a field
    pub fn add_field(&mut self, field: Field) {
        self.content.push(ParagraphContent::Field(field));
    }

    /// Add a hyperlink
    pub fn add_hyperlink(&mut self, hyperlink: Hyperlink) {
        self.content.push(ParagraphContent::Hyperlink(hyperlink));
    }

    /// Open a bookmark
    pub fn add_bookmark_start(&mut self, id: u64, name: impl Into<String>) {
        self.content.push(ParagraphContent::BookmarkStart {
            id,
            name: name.into(),
        });
    }

    /// Close a bookmark
    pub fn add_bookmark_end(&mut self, id: u64) {
        self.content.push(ParagraphContent::BookmarkEnd { id });
    }

    /// Paragraph alignment
    pub fn alignment(&self) -> Option<Alignment> {
        self.properties.alignment
    }

    /// Set paragraph alignment
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.properties.alignment = Some(alignment);
    }

    /// Set indentation in twips
    pub fn set_indentation(&mut self, indentation: Indentation) -> Result<()> {
        self.properties.set_indentation(indentation)
    }

    /// Set spacing in twips
    pub fn set_spacing(&mut self, spacing: Spacing) -> Result<()> {
        self.properties.set_spacing(spacing)
    }

    /// Check if this paragraph is a heading
    pub fn is_heading(&self) -> bool {
        self.style()
            .map(|s| s.starts_with("Heading") || s == "Title")
            .unwrap_or(false)
            || self.properties.outline_level.is_some()
    }

    /// Preserved attributes of the `w:p` element
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        self.write_with_section(writer, self.section.as_ref())
    }

    /// Write to XML writer, ending a section at this paragraph
    /// Nothing but a place to hang a `w:sectPr`
    pub(crate) fn is_bare(&self) -> bool {
        self.content.is_empty() && self.attrs.is_empty() && self.properties.is_empty()
    }

    pub(crate) fn write_with_section<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        section: Option<&Section>,
    ) -> Result<()> {
        let start = start_with_attrs("w:p", &self.attrs);

        if self.properties.is_empty() && section.is_none() && self.content.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        self.properties.write_with_section(writer, section)?;
        write_inline(writer, &self.content)?;
        writer.write_event(Event::End(BytesEnd::new("w:p")))?;
        Ok(())
    }
}

impl Hyperlink {
    /// External hyperlink through a relationship ID
    pub fn external(rel_id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut run = Run::new(text);
        run.set_style("Hyperlink");
        Self {
            rel_id: Some(rel_id.into()),
            content: vec![ParagraphContent::Run(run)],
            ..Default::default()
        }
    }

    /// Internal hyperlink to a bookmark
    pub fn internal(anchor: impl Into<String>, text: impl Into<String>) -> Self {
        let mut run = Run::new(text);
        run.set_style("Hyperlink");
        Self {
            anchor: Some(anchor.into()),
            content: vec![ParagraphContent::Run(run)],
            ..Default::default()
        }
    }

    /// Relationship ID of an external target
    pub fn rel_id(&self) -> Option<&str> {
        self.rel_id.as_deref()
    }

    /// Bookmark name of an internal target
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    /// Content inside the hyperlink
    pub fn content(&self) -> &[ParagraphContent] {
        &self.content
    }

    /// Visible text
    pub fn text(&self) -> String {
        inline_text(&self.content)
    }

    fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut link = Self::from_empty(start);
        let mut content = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => read_inline(reader, &e, false, &mut content)?,
                Event::Empty(e) => read_inline(reader, &e, true, &mut content)?,
                Event::End(e) if e.name().local_name().as_ref() == b"hyperlink" => break,
                Event::Eof => return Err(unexpected_eof("w:hyperlink")),
                _ => {}
            }
            buf.clear();
        }

        link.content = collapse_fields(content);
        Ok(link)
    }

    fn from_empty(start: &BytesStart) -> Self {
        let mut link = Hyperlink::default();
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "r:id" => link.rel_id = Some(value),
                "w:anchor" => link.anchor = Some(value),
                _ => link.attrs.push((key, value)),
            }
        }
        link
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:hyperlink");
        if let Some(rel_id) = &self.rel_id {
            start.push_attribute(("r:id", rel_id.as_str()));
        }
        if let Some(anchor) = &self.anchor {
            start.push_attribute(("w:anchor", anchor.as_str()));
        }
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start))?;
        write_inline(writer, &self.content)?;
        writer.write_event(Event::End(BytesEnd::new("w:hyperlink")))?;
        Ok(())
    }
}

/// Parse one child of a paragraph or hyperlink
fn read_inline<R: BufRead>(
    reader: &mut Reader<R>,
    e: &BytesStart,
    empty: bool,
    content: &mut Vec<ParagraphContent>,
) -> Result<()> {
    let item = match e.name().local_name().as_ref() {
        b"r" if empty => ParagraphContent::Run(Run::from_empty(e)),
        b"r" => ParagraphContent::Run(Run::from_reader(reader, e)?),
        b"hyperlink" if empty => ParagraphContent::Hyperlink(Hyperlink::from_empty(e)),
        b"hyperlink" => ParagraphContent::Hyperlink(Hyperlink::from_reader(reader, e)?),
        b"bookmarkStart" if xml::attributes_of(e).len() == 2 => {
            let id = get_w_attr(e, "id").and_then(|v| v.parse().ok());
            match (id, get_w_attr(e, "name")) {
                (Some(id), Some(name)) => {
                    finish_element(reader, e, empty)?;
                    ParagraphContent::BookmarkStart { id, name }
                }
                _ => ParagraphContent::Unknown(read_raw(reader, e, empty)?),
            }
        }
        b"bookmarkEnd" if xml::attributes_of(e).len() == 1 => {
            match get_w_attr(e, "id").and_then(|v| v.parse().ok()) {
                Some(id) => {
                    finish_element(reader, e, empty)?;
                    ParagraphContent::BookmarkEnd { id }
                }
                None => ParagraphContent::Unknown(read_raw(reader, e, empty)?),
            }
        }
        _ => ParagraphContent::Unknown(read_raw(reader, e, empty)?),
    };
    content.push(item);
    Ok(())
}

/// Replace simple begin/instr/separate/result/end run sequences with fields
fn collapse_fields(content: Vec<ParagraphContent>) -> Vec<ParagraphContent> {
    // (first index, one past the last index, field)
    let mut fields = Vec::new();
    let mut i = 0;
    while i < content.len() {
        let runs = content[i..].iter().map_while(|c| match c {
            ParagraphContent::Run(r) => Some(r),
            _ => None,
        });
        match Field::from_runs(runs) {
            Some((field, consumed)) => {
                fields.push((i, i + consumed, field));
                i += consumed;
            }
            None => i += 1,
        }
    }
    if fields.is_empty() {
        return content;
    }

    let mut out = Vec::with_capacity(content.len());
    let mut fields = fields.into_iter().peekable();
    for (i, item) in content.into_iter().enumerate() {
        let span = fields.peek().map(|(start, end, _)| (*start, *end));
        match span {
            Some((start, end)) if (start..end).contains(&i) => {
                if i + 1 == end {
                    if let Some((_, _, field)) = fields.next() {
                        out.push(ParagraphContent::Field(field));
                    }
                }
            }
            _ => out.push(item),
        }
    }
    out
}

fn inline_text(content: &[ParagraphContent]) -> String {
    let mut text = String::new();
    for item in content {
        match item {
            ParagraphContent::Run(run) => text.push_str(&run.text()),
            ParagraphContent::Field(field) => text.push_str(field.result()),
            ParagraphContent::Hyperlink(link) => text.push_str(&link.text()),
            _ => {}
        }
    }
    text
}

fn write_inline<W: std::io::Write>(
    writer: &mut Writer<W>,
    content: &[ParagraphContent],
) -> Result<()> {
    for item in content {
        match item {
            ParagraphContent::Run(run) => run.write_to(writer)?,
            ParagraphContent::Field(field) => field.write_to(writer)?,
            ParagraphContent::Hyperlink(link) => link.write_to(writer)?,
            ParagraphContent::BookmarkStart { id, name } => {
                let id = id.to_string();
                let mut elem = BytesStart::new("w:bookmarkStart");
                elem.push_attribute(("w:id", id.as_str()));
                elem.push_attribute(("w:name", name.as_str()));
                writer.write_event(Event::Empty(elem))?;
            }
            ParagraphContent::BookmarkEnd { id } => {
                let id = id.to_string();
                let mut elem = BytesStart::new("w:bookmarkEnd");
                elem.push_attribute(("w:id", id.as_str()));
                writer.write_event(Event::Empty(elem))?;
            }
            ParagraphContent::Unknown(node) => node.write_to(writer)?,
        }
    }
    Ok(())
}

impl ParagraphProperties {
    /// Whether no property is set
    pub fn is_empty(&self) -> bool {
        self.style.is_none()
            && self.alignment.is_none()
            && self.indentation.is_none()
            && self.spacing.is_none()
            && self.num_id.is_none()
            && self.num_level.is_none()
            && self.outline_level.is_none()
            && self.unknown_children.is_empty()
    }

    /// Paragraph style ID (`w:pStyle`)
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// Alignment (`w:jc`)
    pub fn alignment(&self) -> Option<Alignment> {
        self.alignment
    }

    /// Indentation (`w:ind`)
    pub fn indentation(&self) -> Option<Indentation> {
        self.indentation
    }

    /// Spacing (`w:spacing`)
    pub fn spacing(&self) -> Option<Spacing> {
        self.spacing
    }

    /// Numbering instance and level
    pub fn numbering(&self) -> Option<(u32, u32)> {
        Some((self.num_id?, self.num_level.unwrap_or(0)))
    }

    /// Outline level (`w:outlineLvl`)
    pub fn outline_level(&self) -> Option<u8> {
        self.outline_level
    }

    /// Set the paragraph style ID
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style = Some(style.into());
    }

    /// Set alignment
    pub fn set_alignment(&mut self, alignment: Alignment) {
        self.alignment = Some(alignment);
    }

    /// Set indentation; values must stay within ±31680 twips
    pub fn set_indentation(&mut self, indentation: Indentation) -> Result<()> {
        check_indentation("set_indentation", &indentation)?;
        self.indentation = Some(indentation);
        Ok(())
    }

    /// Set spacing; values must stay within 0..=31680 twips
    pub fn set_spacing(&mut self, spacing: Spacing) -> Result<()> {
        check_spacing("set_spacing", &spacing)?;
        self.spacing = Some(spacing);
        Ok(())
    }

    /// Reference a numbering instance defined in numbering.xml
    pub fn set_numbering(&mut self, num_id: u32, level: u32) {
        self.num_id = Some(num_id);
        self.num_level = Some(level);
    }

    /// Set outline level (0..=9)
    pub fn set_outline_level(&mut self, level: u8) -> Result<()> {
        if level > 9 {
            return Err(Error::validation("set_outline_level", "outline level", level));
        }
        self.outline_level = Some(level);
        Ok(())
    }

    /// Overlay every property set on `other` onto `self`
    pub(crate) fn apply(&mut self, other: &ParagraphProperties) {
        fn over<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        over(&mut self.style, &other.style);
        over(&mut self.alignment, &other.alignment);
        over(&mut self.num_id, &other.num_id);
        over(&mut self.num_level, &other.num_level);
        over(&mut self.outline_level, &other.outline_level);

        if let Some(ind) = other.indentation {
            let base = self.indentation.get_or_insert_with(Indentation::default);
            over(&mut base.left, &ind.left);
            over(&mut base.right, &ind.right);
            over(&mut base.first_line, &ind.first_line);
        }
        if let Some(sp) = other.spacing {
            let base = self.spacing.get_or_insert_with(Spacing::default);
            over(&mut base.before, &sp.before);
            over(&mut base.after, &sp.after);
            over(&mut base.line, &sp.line);
            over(&mut base.line_rule, &sp.line_rule);
        }
    }

    pub(crate) fn validate(&self, operation: &str) -> Result<()> {
        if let Some(ind) = &self.indentation {
            check_indentation(operation, ind)?;
        }
        if let Some(sp) = &self.spacing {
            check_spacing(operation, sp)?;
        }
        if let Some(level) = self.outline_level {
            if level > 9 {
                return Err(Error::validation(operation, "outline level", level));
            }
        }
        Ok(())
    }

    /// Parse from reader (after w:pPr start tag), returning any section break it carries
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<(Self, Option<Section>)> {
        let mut props = ParagraphProperties::default();
        let mut section = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"sectPr" => {
                    section = Some(Section::from_reader(reader, &e)?);
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"sectPr" => {
                    section = Some(Section::from_empty(&e));
                }
                Event::Start(e) => props.read_child(reader, &e, false)?,
                Event::Empty(e) => props.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"pPr" => break,
                Event::Eof => return Err(unexpected_eof("w:pPr")),
                _ => {}
            }
            buf.clear();
        }

        Ok((props, section))
    }

    fn read_child<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        e: &BytesStart,
        empty: bool,
    ) -> Result<()> {
        let parsed = match e.name().local_name().as_ref() {
            b"pStyle" => get_w_val(e).map(|v| self.style = Some(v)).is_some(),
            b"jc" => get_w_val(e)
                .and_then(|v| Alignment::parse(&v))
                .map(|v| self.alignment = Some(v))
                .is_some(),
            b"ind" => parse_indentation(e)
                .map(|v| self.indentation = Some(v))
                .is_some(),
            b"spacing" => parse_spacing(e).map(|v| self.spacing = Some(v)).is_some(),
            b"outlineLvl" => get_w_val(e)
                .and_then(|v| v.parse().ok())
                .map(|v| self.outline_level = Some(v))
                .is_some(),
            b"numPr" if !empty => {
                let raw = RawXmlElement::from_reader(reader, e)?;
                match parse_numbering(&raw) {
                    Some((num_id, level)) => {
                        self.num_id = Some(num_id);
                        self.num_level = level;
                    }
                    None => self.unknown_children.push(raw.into()),
                }
                return Ok(());
            }
            _ => false,
        };

        if parsed {
            finish_element(reader, e, empty)
        } else {
            self.unknown_children.push(read_raw(reader, e, empty)?);
            Ok(())
        }
    }

    /// Write to XML writer; nothing is written when no property is set
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        self.write_with_section(writer, None)
    }

    pub(crate) fn write_with_section<W: std::io::Write>(
        &self,
        writer: &mut Writer<W>,
        section: Option<&Section>,
    ) -> Result<()> {
        if self.is_empty() && section.is_none() {
            return Ok(());
        }

        writer.write_event(Event::Start(BytesStart::new("w:pPr")))?;
        write_in_order(writer, PPR_ORDER, &self.unknown_children, |w, slot| {
            match slot {
                "pStyle" => {
                    if let Some(style) = &self.style {
                        write_val(w, "w:pStyle", style)?;
                    }
                }
                "numPr" => {
                    if let Some(num_id) = self.num_id {
                        w.write_event(Event::Start(BytesStart::new("w:numPr")))?;
                        if let Some(level) = self.num_level {
                            write_val(w, "w:ilvl", &level.to_string())?;
                        }
                        write_val(w, "w:numId", &num_id.to_string())?;
                        w.write_event(Event::End(BytesEnd::new("w:numPr")))?;
                    }
                }
                "spacing" => {
                    if let Some(sp) = &self.spacing {
                        let mut elem = BytesStart::new("w:spacing");
                        let values = [
                            ("w:before", sp.before.map(|v| v.to_string())),
                            ("w:after", sp.after.map(|v| v.to_string())),
                            ("w:line", sp.line.map(|v| v.to_string())),
                            ("w:lineRule", sp.line_rule.map(|v| v.as_str().to_string())),
                        ];
                        for (key, value) in &values {
                            if let Some(value) = value {
                                elem.push_attribute((*key, value.as_str()));
                            }
                        }
                        w.write_event(Event::Empty(elem))?;
                    }
                }
                "ind" => {
                    if let Some(ind) = &self.indentation {
                        let mut elem = BytesStart::new("w:ind");
                        let first = match ind.first_line {
                            Some(v) if v < 0 => Some(("w:hanging", (-v).to_string())),
                            Some(v) => Some(("w:firstLine", v.to_string())),
                            None => None,
                        };
                        let values = [
                            ("w:left", ind.left.map(|v| v.to_string())),
                            ("w:right", ind.right.map(|v| v.to_string())),
                        ];
                        for (key, value) in &values {
                            if let Some(value) = value {
                                elem.push_attribute((*key, value.as_str()));
                            }
                        }
                        if let Some((key, value)) = &first {
                            elem.push_attribute((*key, value.as_str()));
                        }
                        w.write_event(Event::Empty(elem))?;
                    }
                }
                "jc" => {
                    if let Some(alignment) = self.alignment {
                        write_val(w, "w:jc", alignment.as_str())?;
                    }
                }
                "outlineLvl" => {
                    if let Some(level) = self.outline_level {
                        write_val(w, "w:outlineLvl", &level.to_string())?;
                    }
                }
                "sectPr" => {
                    if let Some(section) = section {
                        section.write_to(w)?;
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        writer.write_event(Event::End(BytesEnd::new("w:pPr")))?;
        Ok(())
    }
}

fn only_attrs(e: &BytesStart, allowed: &[&str]) -> bool {
    xml::attributes_of(e)
        .iter()
        .all(|(k, _)| allowed.contains(&k.as_str()))
}

fn parse_indentation(e: &BytesStart) -> Option<Indentation> {
    if !only_attrs(e, &["w:left", "w:right", "w:firstLine", "w:hanging"]) {
        return None;
    }
    let num = |name: &str| -> Option<Option<i32>> {
        match get_attr(e, name) {
            Some(v) => v.parse().ok().map(Some),
            None => Some(None),
        }
    };
    let first_line = match (num("w:firstLine")?, num("w:hanging")?) {
        (Some(_), Some(_)) => return None,
        (Some(v), None) => Some(v),
        (None, Some(v)) if v > 0 => Some(-v),
        (None, Some(_)) => return None,
        (None, None) => None,
    };
    Some(Indentation {
        left: num("w:left")?,
        right: num("w:right")?,
        first_line,
    })
}

fn parse_spacing(e: &BytesStart) -> Option<Spacing> {
    if !only_attrs(e, &["w:before", "w:after", "w:line", "w:lineRule"]) {
        return None;
    }
    let num = |name: &str| -> Option<Option<u32>> {
        match get_attr(e, name) {
            Some(v) => v.parse().ok().map(Some),
            None => Some(None),
        }
    };
    let line_rule = match get_attr(e, "w:lineRule") {
        Some(v) => Some(LineRule::parse(&v)?),
        None => None,
    };
    Some(Spacing {
        before: num("w:before")?,
        after: num("w:after")?,
        line: num("w:line")?,
        line_rule,
    })
}

/// `(numId, ilvl)` of a numPr holding nothing else
fn parse_numbering(raw: &RawXmlElement) -> Option<(u32, Option<u32>)> {
    let mut num_id = None;
    let mut level = None;
    for child in &raw.children {
        match child {
            RawXmlNode::Element(e) if e.attributes.len() == 1 && e.children.is_empty() => {
                let value = e.attr("w:val")?.parse().ok()?;
                match e.local_name() {
                    "numId" => num_id = Some(value),
                    "ilvl" => level = Some(value),
                    _ => return None,
                }
            }
            RawXmlNode::Text(t) if t.trim().is_empty() => {}
            _ => return None,
        }
    }
    Some((num_id?, level))
}

fn check_indentation(operation: &str, ind: &Indentation) -> Result<()> {
    if let Some(v) = ind.left {
        check_signed_twips(operation, "left indent", v)?;
    }
    if let Some(v) = ind.right {
        check_signed_twips(operation, "right indent", v)?;
    }
    if let Some(v) = ind.first_line {
        check_signed_twips(operation, "first line indent", v)?;
    }
    Ok(())
}

fn check_spacing(operation: &str, sp: &Spacing) -> Result<()> {
    if let Some(v) = sp.before {
        check_twips(operation, "spacing before", v)?;
    }
    if let Some(v) = sp.after {
        check_twips(operation, "spacing after", v)?;
    }
    if let Some(v) = sp.line {
        check_twips(operation, "line spacing", v)?;
    }
    Ok(())
}
