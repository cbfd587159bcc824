//! Run element (w:r) - a contiguous run of text with uniform formatting

use crate::document::validate::{check_color, check_half_points, check_highlight, check_underline};
use crate::document::Drawing;
use crate::error::Result;
use crate::xml::{
    self, finish_element, get_w_attr, get_w_val, parse_bool, read_raw, read_text,
    start_with_attrs, unexpected_eof, write_in_order, write_text_element, write_toggle, write_val,
    RawXmlNode,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Run element (w:r)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Run {
    properties: RunProperties,
    content: Vec<RunContent>,
    attrs: Vec<(String, String)>,
}

/// Content within a run
#[derive(Clone, Debug, PartialEq)]
pub enum RunContent {
    /// Text (w:t)
    Text(String),
    /// Tab (w:tab)
    Tab,
    /// Break (w:br)
    Break(BreakType),
    /// Carriage return (w:cr)
    CarriageReturn,
    /// Soft hyphen
    SoftHyphen,
    /// Non-breaking hyphen
    NoBreakHyphen,
    /// Inline picture (w:drawing)
    Drawing(Drawing),
    /// Complex field character (w:fldChar)
    FieldChar(FieldCharType),
    /// Field instruction text (w:instrText)
    InstrText(String),
    /// Unknown (preserved)
    Unknown(RawXmlNode),
}

/// Break type
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BreakType {
    #[default]
    TextWrapping,
    Page,
    Column,
}

/// `w:fldCharType` of a field character
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldCharType {
    /// Start of a field; `dirty` asks the consumer to recompute it
    Begin { dirty: bool },
    /// End of the instruction, start of the cached result
    Separate,
    /// End of the field
    End,
}

/// Vertical alignment of run text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerticalAlign {
    Baseline,
    Superscript,
    Subscript,
}

impl VerticalAlign {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "baseline" => Some(Self::Baseline),
            "superscript" => Some(Self::Superscript),
            "subscript" => Some(Self::Subscript),
            _ => None,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Superscript => "superscript",
            Self::Subscript => "subscript",
        }
    }
}

/// Run properties (w:rPr)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunProperties {
    pub(crate) style: Option<String>,
    pub(crate) font_ascii: Option<String>,
    pub(crate) font_east_asia: Option<String>,
    pub(crate) bold: Option<bool>,
    pub(crate) italic: Option<bool>,
    pub(crate) strike: Option<bool>,
    pub(crate) double_strike: Option<bool>,
    pub(crate) color: Option<String>,
    /// Font size in half-points (24 = 12pt)
    pub(crate) size: Option<u32>,
    pub(crate) highlight: Option<String>,
    pub(crate) underline: Option<String>,
    pub(crate) vertical_align: Option<VerticalAlign>,
    pub(crate) unknown_children: Vec<RawXmlNode>,
}

const RPR_ORDER: &[&str] = &[
    "rStyle", "rFonts", "b", "bCs", "i", "iCs", "caps", "smallCaps", "strike", "dstrike",
    "outline", "shadow", "emboss", "imprint", "noProof", "snapToGrid", "vanish", "webHidden",
    "color", "spacing", "w", "kern", "position", "sz", "szCs", "highlight", "u", "effect",
    "bdr", "shd", "fitText", "vertAlign", "rtl", "cs", "em", "lang", "eastAsianLayout",
    "specVanish", "oMath",
];

impl Run {
    /// Create a new run with text
    pub fn new(text: impl Into<String>) -> Self {
        Run {
            content: vec![RunContent::Text(text.into())],
            ..Default::default()
        }
    }

    /// Create a run holding a single content item
    pub fn with_content(content: RunContent) -> Self {
        Run {
            content: vec![content],
            ..Default::default()
        }
    }

    /// Parse from reader (after w:r start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut run = Self::from_empty(start);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => run.read_child(reader, &e, false)?,
                Event::Empty(e) => run.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"r" => break,
                Event::Eof => return Err(unexpected_eof("w:r")),
                _ => {}
            }
            buf.clear();
        }

        Ok(run)
    }

    /// Create from empty element
    pub fn from_empty(start: &BytesStart) -> Self {
        Run {
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
        let item = match e.name().local_name().as_ref() {
            b"rPr" if !empty => {
                self.properties = RunProperties::from_reader(reader)?;
                return Ok(());
            }
            b"rPr" => return Ok(()),
            b"t" if empty => RunContent::Text(String::new()),
            b"t" => RunContent::Text(read_text(reader, e)?),
            b"instrText" if empty => RunContent::InstrText(String::new()),
            b"instrText" => RunContent::InstrText(read_text(reader, e)?),
            b"tab" => {
                finish_element(reader, e, empty)?;
                RunContent::Tab
            }
            b"br" => {
                let break_type = match get_w_attr(e, "type").as_deref() {
                    Some("page") => BreakType::Page,
                    Some("column") => BreakType::Column,
                    _ => BreakType::TextWrapping,
                };
                finish_element(reader, e, empty)?;
                RunContent::Break(break_type)
            }
            b"cr" => {
                finish_element(reader, e, empty)?;
                RunContent::CarriageReturn
            }
            b"softHyphen" => {
                finish_element(reader, e, empty)?;
                RunContent::SoftHyphen
            }
            b"noBreakHyphen" => {
                finish_element(reader, e, empty)?;
                RunContent::NoBreakHyphen
            }
            b"fldChar" if empty => match parse_field_char(e) {
                Some(kind) => RunContent::FieldChar(kind),
                None => RunContent::Unknown(read_raw(reader, e, empty)?),
            },
            _ => RunContent::Unknown(read_raw(reader, e, empty)?),
        };
        self.content.push(item);
        Ok(())
    }

    /// Get all text in this run
    pub fn text(&self) -> String {
        let mut result = String::new();
        for content in &self.content {
            match content {
                RunContent::Text(t) => result.push_str(t),
                RunContent::Tab => result.push('\t'),
                RunContent::Break(BreakType::TextWrapping) => result.push('\n'),
                RunContent::CarriageReturn => result.push('\n'),
                _ => {}
            }
        }
        result
    }

    /// Run content in document order
    pub fn content(&self) -> &[RunContent] {
        &self.content
    }

    /// Mutable run content
    pub fn content_mut(&mut self) -> &mut Vec<RunContent> {
        &mut self.content
    }

    /// Append content to the run
    pub fn push(&mut self, content: RunContent) {
        self.content.push(content);
    }

    /// Formatting of this run
    pub fn properties(&self) -> &RunProperties {
        &self.properties
    }

    /// Mutable formatting of this run
    pub fn properties_mut(&mut self) -> &mut RunProperties {
        &mut self.properties
    }

    /// Replace the formatting of this run
    pub fn set_properties(&mut self, properties: RunProperties) {
        self.properties = properties;
    }

    /// Preserved attributes of the `w:r` element (rsids and the like)
    pub fn attributes(&self) -> &[(String, String)] {
        &self.attrs
    }

    /// Check if bold
    pub fn bold(&self) -> bool {
        self.properties.bold.unwrap_or(false)
    }

    /// Check if italic
    pub fn italic(&self) -> bool {
        self.properties.italic.unwrap_or(false)
    }

    /// Check if has strike-through
    pub fn strike(&self) -> bool {
        self.properties.strike.unwrap_or(false)
    }

    /// Font size in half-points
    pub fn size(&self) -> Option<u32> {
        self.properties.size
    }

    /// Get color (RGB hex string)
    pub fn color(&self) -> Option<&str> {
        self.properties.color.as_deref()
    }

    /// Get underline type
    pub fn underline(&self) -> Option<&str> {
        self.properties.underline.as_deref()
    }

    /// Character style ID
    pub fn style(&self) -> Option<&str> {
        self.properties.style.as_deref()
    }

    /// Set bold
    pub fn set_bold(&mut self, bold: bool) {
        self.properties.set_bold(bold);
    }

    /// Set italic
    pub fn set_italic(&mut self, italic: bool) {
        self.properties.set_italic(italic);
    }

    /// Set strike-through
    pub fn set_strike(&mut self, strike: bool) {
        self.properties.set_strike(strike);
    }

    /// Set font size in half-points
    pub fn set_size(&mut self, half_points: u32) -> Result<()> {
        self.properties.set_size(half_points)
    }

    /// Set color (`RRGGBB` or `auto`)
    pub fn set_color(&mut self, color: &str) -> Result<()> {
        self.properties.set_color(color)
    }

    /// Set highlight color by name
    pub fn set_highlight(&mut self, highlight: &str) -> Result<()> {
        self.properties.set_highlight(highlight)
    }

    /// Set underline type
    pub fn set_underline(&mut self, underline: &str) -> Result<()> {
        self.properties.set_underline(underline)
    }

    /// Set font
    pub fn set_font(&mut self, font: impl Into<String>) {
        self.properties.set_font(font);
    }

    /// Set character style
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.properties.set_style(style);
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let start = start_with_attrs("w:r", &self.attrs);

        if self.properties.is_empty() && self.content.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        self.properties.write_to(writer)?;
        for content in &self.content {
            content.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:r")))?;
        Ok(())
    }
}

impl RunContent {
    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            RunContent::Text(text) => write_text_element(writer, text_start("w:t", text), text)?,
            RunContent::InstrText(text) => {
                write_text_element(writer, text_start("w:instrText", text), text)?
            }
            RunContent::Tab => {
                writer.write_event(Event::Empty(BytesStart::new("w:tab")))?;
            }
            RunContent::Break(break_type) => {
                let mut start = BytesStart::new("w:br");
                match break_type {
                    BreakType::Page => start.push_attribute(("w:type", "page")),
                    BreakType::Column => start.push_attribute(("w:type", "column")),
                    BreakType::TextWrapping => {}
                }
                writer.write_event(Event::Empty(start))?;
            }
            RunContent::CarriageReturn => {
                writer.write_event(Event::Empty(BytesStart::new("w:cr")))?;
            }
            RunContent::SoftHyphen => {
                writer.write_event(Event::Empty(BytesStart::new("w:softHyphen")))?;
            }
            RunContent::NoBreakHyphen => {
                writer.write_event(Event::Empty(BytesStart::new("w:noBreakHyphen")))?;
            }
            RunContent::Drawing(drawing) => drawing.write_to(writer)?,
            RunContent::FieldChar(kind) => {
                let mut start = BytesStart::new("w:fldChar");
                match kind {
                    FieldCharType::Begin { dirty } => {
                        start.push_attribute(("w:fldCharType", "begin"));
                        if *dirty {
                            start.push_attribute(("w:dirty", "true"));
                        }
                    }
                    FieldCharType::Separate => start.push_attribute(("w:fldCharType", "separate")),
                    FieldCharType::End => start.push_attribute(("w:fldCharType", "end")),
                }
                writer.write_event(Event::Empty(start))?;
            }
            RunContent::Unknown(node) => node.write_to(writer)?,
        }
        Ok(())
    }
}

/// Start tag for a text element, preserving leading/trailing whitespace
fn text_start<'a>(name: &'a str, text: &str) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    if text.starts_with(char::is_whitespace)
        || text.ends_with(char::is_whitespace)
        || text.contains("  ")
    {
        start.push_attribute(("xml:space", "preserve"));
    }
    start
}

/// Typed field character, if the element carries nothing beyond type and dirty flag
fn parse_field_char(e: &BytesStart) -> Option<FieldCharType> {
    let attrs = xml::attributes_of(e);
    let known = attrs
        .iter()
        .all(|(k, _)| matches!(k.as_str(), "w:fldCharType" | "w:dirty"));
    if !known {
        return None;
    }
    match get_w_attr(e, "fldCharType")?.as_str() {
        "begin" => {
            let dirty = matches!(
                get_w_attr(e, "dirty").as_deref(),
                Some("true") | Some("1") | Some("on")
            );
            Some(FieldCharType::Begin { dirty })
        }
        "separate" => Some(FieldCharType::Separate),
        "end" => Some(FieldCharType::End),
        _ => None,
    }
}

impl RunProperties {
    /// Whether no property is set
    pub fn is_empty(&self) -> bool {
        self.style.is_none()
            && self.font_ascii.is_none()
            && self.font_east_asia.is_none()
            && self.bold.is_none()
            && self.italic.is_none()
            && self.strike.is_none()
            && self.double_strike.is_none()
            && self.color.is_none()
            && self.size.is_none()
            && self.highlight.is_none()
            && self.underline.is_none()
            && self.vertical_align.is_none()
            && self.unknown_children.is_empty()
    }

    /// Bold (`w:b`), if set
    pub fn bold(&self) -> Option<bool> {
        self.bold
    }

    /// Italic (`w:i`), if set
    pub fn italic(&self) -> Option<bool> {
        self.italic
    }

    /// Strikethrough (`w:strike`), if set
    pub fn strike(&self) -> Option<bool> {
        self.strike
    }

    /// Double strikethrough (`w:dstrike`), if set
    pub fn double_strike(&self) -> Option<bool> {
        self.double_strike
    }

    /// Font size in half-points
    pub fn size(&self) -> Option<u32> {
        self.size
    }

    /// Text color as `RRGGBB` or `auto`
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }

    /// Highlight color name
    pub fn highlight(&self) -> Option<&str> {
        self.highlight.as_deref()
    }

    /// Underline style
    pub fn underline(&self) -> Option<&str> {
        self.underline.as_deref()
    }

    /// ASCII font name (`w:rFonts`)
    pub fn font(&self) -> Option<&str> {
        self.font_ascii.as_deref()
    }

    /// Character style ID (`w:rStyle`)
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// Superscript or subscript
    pub fn vertical_align(&self) -> Option<VerticalAlign> {
        self.vertical_align
    }

    /// Set bold
    pub fn set_bold(&mut self, bold: bool) {
        self.bold = Some(bold);
    }

    /// Set italic
    pub fn set_italic(&mut self, italic: bool) {
        self.italic = Some(italic);
    }

    /// Set strikethrough
    pub fn set_strike(&mut self, strike: bool) {
        self.strike = Some(strike);
    }

    /// Set double strikethrough
    pub fn set_double_strike(&mut self, double_strike: bool) {
        self.double_strike = Some(double_strike);
    }

    /// Set font size in half-points (1..=3276)
    pub fn set_size(&mut self, half_points: u32) -> Result<()> {
        check_half_points("set_size", half_points)?;
        self.size = Some(half_points);
        Ok(())
    }

    /// Set color (`RRGGBB` or `auto`)
    pub fn set_color(&mut self, color: &str) -> Result<()> {
        check_color("set_color", color)?;
        self.color = Some(color.to_string());
        Ok(())
    }

    /// Set highlight color by name (`yellow`, `green`, ...)
    pub fn set_highlight(&mut self, highlight: &str) -> Result<()> {
        check_highlight("set_highlight", highlight)?;
        self.highlight = Some(highlight.to_string());
        Ok(())
    }

    /// Set underline type (`single`, `double`, `none`, ...)
    pub fn set_underline(&mut self, underline: &str) -> Result<()> {
        check_underline("set_underline", underline)?;
        self.underline = Some(underline.to_string());
        Ok(())
    }

    /// Set the font used for ASCII and East Asian text
    pub fn set_font(&mut self, font: impl Into<String>) {
        let font = font.into();
        self.font_east_asia = Some(font.clone());
        self.font_ascii = Some(font);
    }

    /// Set the character style ID
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.style = Some(style.into());
    }

    /// Set superscript or subscript
    pub fn set_vertical_align(&mut self, align: VerticalAlign) {
        self.vertical_align = Some(align);
    }

    /// Overlay every property set on `other` onto `self`
    pub(crate) fn apply(&mut self, other: &RunProperties) {
        fn over<T: Clone>(dst: &mut Option<T>, src: &Option<T>) {
            if src.is_some() {
                dst.clone_from(src);
            }
        }
        over(&mut self.style, &other.style);
        over(&mut self.font_ascii, &other.font_ascii);
        over(&mut self.font_east_asia, &other.font_east_asia);
        over(&mut self.bold, &other.bold);
        over(&mut self.italic, &other.italic);
        over(&mut self.strike, &other.strike);
        over(&mut self.double_strike, &other.double_strike);
        over(&mut self.color, &other.color);
        over(&mut self.size, &other.size);
        over(&mut self.highlight, &other.highlight);
        over(&mut self.underline, &other.underline);
        over(&mut self.vertical_align, &other.vertical_align);
    }

    /// Range-check values that may have come from a parsed file
    pub(crate) fn validate(&self, operation: &str) -> Result<()> {
        if let Some(size) = self.size {
            check_half_points(operation, size)?;
        }
        if let Some(color) = &self.color {
            check_color(operation, color)?;
        }
        if let Some(highlight) = &self.highlight {
            check_highlight(operation, highlight)?;
        }
        if let Some(underline) = &self.underline {
            check_underline(operation, underline)?;
        }
        Ok(())
    }

    /// Parse from reader (after w:rPr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut props = RunProperties::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => props.read_child(reader, &e, false)?,
                Event::Empty(e) => props.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"rPr" => break,
                Event::Eof => return Err(unexpected_eof("w:rPr")),
                _ => {}
            }
            buf.clear();
        }

        Ok(props)
    }

    fn read_child<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        e: &BytesStart,
        empty: bool,
    ) -> Result<()> {
        let parsed = match e.name().local_name().as_ref() {
            b"rStyle" => get_w_val(e).map(|v| self.style = Some(v)).is_some(),
            b"b" => {
                self.bold = Some(parse_bool(e));
                true
            }
            b"i" => {
                self.italic = Some(parse_bool(e));
                true
            }
            b"strike" => {
                self.strike = Some(parse_bool(e));
                true
            }
            b"dstrike" => {
                self.double_strike = Some(parse_bool(e));
                true
            }
            b"sz" => get_w_val(e)
                .and_then(|v| v.parse().ok())
                .map(|v| self.size = Some(v))
                .is_some(),
            b"color" if xml::attributes_of(e).len() == 1 => {
                get_w_val(e).map(|v| self.color = Some(v)).is_some()
            }
            b"highlight" => get_w_val(e).map(|v| self.highlight = Some(v)).is_some(),
            b"u" if xml::attributes_of(e).len() <= 1 => {
                self.underline = Some(get_w_val(e).unwrap_or_else(|| "single".into()));
                true
            }
            b"vertAlign" => get_w_val(e)
                .and_then(|v| VerticalAlign::parse(&v))
                .map(|v| self.vertical_align = Some(v))
                .is_some(),
            b"rFonts" if only_font_attrs(e) => {
                self.font_ascii = get_w_attr(e, "ascii");
                self.font_east_asia = get_w_attr(e, "eastAsia");
                true
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
        if self.is_empty() {
            return Ok(());
        }

        writer.write_event(Event::Start(BytesStart::new("w:rPr")))?;
        write_in_order(writer, RPR_ORDER, &self.unknown_children, |w, slot| {
            match slot {
                "rStyle" => {
                    if let Some(style) = &self.style {
                        write_val(w, "w:rStyle", style)?;
                    }
                }
                "rFonts" => {
                    if self.font_ascii.is_some() || self.font_east_asia.is_some() {
                        let mut elem = BytesStart::new("w:rFonts");
                        if let Some(font) = &self.font_ascii {
                            elem.push_attribute(("w:ascii", font.as_str()));
                            elem.push_attribute(("w:hAnsi", font.as_str()));
                        }
                        if let Some(font) = &self.font_east_asia {
                            elem.push_attribute(("w:eastAsia", font.as_str()));
                        }
                        w.write_event(Event::Empty(elem))?;
                    }
                }
                "b" => {
                    if let Some(bold) = self.bold {
                        write_toggle(w, "w:b", bold)?;
                    }
                }
                "i" => {
                    if let Some(italic) = self.italic {
                        write_toggle(w, "w:i", italic)?;
                    }
                }
                "strike" => {
                    if let Some(strike) = self.strike {
                        write_toggle(w, "w:strike", strike)?;
                    }
                }
                "dstrike" => {
                    if let Some(dstrike) = self.double_strike {
                        write_toggle(w, "w:dstrike", dstrike)?;
                    }
                }
                "color" => {
                    if let Some(color) = &self.color {
                        write_val(w, "w:color", color)?;
                    }
                }
                "sz" => {
                    if let Some(size) = self.size {
                        write_val(w, "w:sz", &size.to_string())?;
                    }
                }
                "highlight" => {
                    if let Some(highlight) = &self.highlight {
                        write_val(w, "w:highlight", highlight)?;
                    }
                }
                "u" => {
                    if let Some(underline) = &self.underline {
                        write_val(w, "w:u", underline)?;
                    }
                }
                "vertAlign" => {
                    if let Some(align) = self.vertical_align {
                        write_val(w, "w:vertAlign", align.as_str())?;
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        writer.write_event(Event::End(BytesEnd::new("w:rPr")))?;
        Ok(())
    }
}

/// `w:rFonts` carrying only the attributes modeled here
fn only_font_attrs(e: &BytesStart) -> bool {
    let attrs = xml::attributes_of(e);
    let ascii = get_w_attr(e, "ascii");
    let h_ansi = get_w_attr(e, "hAnsi");
    attrs
        .iter()
        .all(|(k, _)| matches!(k.as_str(), "w:ascii" | "w:hAnsi" | "w:eastAsia"))
        && (h_ansi.is_none() || h_ansi == ascii)
}
