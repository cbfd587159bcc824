//! Style definitions part (word/styles.xml)

use crate::document::{LineRule, ParagraphProperties, RunProperties, Spacing};
use crate::error::{Error, Result};
use crate::xml::{
    self, finish_element, get_attr, get_w_attr, get_w_val, read_raw, reader_from_str,
    start_with_attrs, unexpected_eof, write_in_order, write_val, RawXmlElement, RawXmlNode,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::collections::HashSet;
use std::io::BufRead;

const STYLE_ORDER: &[&str] = &[
    "name", "aliases", "basedOn", "next", "link", "autoRedefine", "hidden", "uiPriority",
    "semiHidden", "unhideWhenUsed", "qFormat", "locked", "personal", "personalCompose",
    "personalReply", "rsid", "pPr", "rPr", "tblPr", "trPr", "tcPr", "tblStylePr",
];

/// Kind of style (`w:type`)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StyleType {
    Paragraph,
    Character,
    Table,
    Numbering,
}

impl StyleType {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "paragraph" => Some(StyleType::Paragraph),
            "character" => Some(StyleType::Character),
            "table" => Some(StyleType::Table),
            "numbering" => Some(StyleType::Numbering),
            _ => None,
        }
    }

    /// Value written to `w:type`
    pub fn as_str(&self) -> &'static str {
        match self {
            StyleType::Paragraph => "paragraph",
            StyleType::Character => "character",
            StyleType::Table => "table",
            StyleType::Numbering => "numbering",
        }
    }
}

/// One style definition (w:style)
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    id: String,
    name: Option<String>,
    style_type: StyleType,
    based_on: Option<String>,
    next: Option<String>,
    default: bool,
    custom: bool,
    ui_priority: Option<u32>,
    quick_format: bool,
    paragraph: ParagraphProperties,
    run: RunProperties,
    attrs: Vec<(String, String)>,
    unknown_children: Vec<RawXmlNode>,
}

/// Properties of a style after walking its `basedOn` chain
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EffectiveProperties {
    pub run: RunProperties,
    pub paragraph: ParagraphProperties,
}

impl Style {
    /// Create a custom style
    pub fn new(id: impl Into<String>, style_type: StyleType) -> Self {
        Style {
            id: id.into(),
            name: None,
            style_type,
            based_on: None,
            next: None,
            default: false,
            custom: true,
            ui_priority: None,
            quick_format: false,
            paragraph: ParagraphProperties::default(),
            run: RunProperties::default(),
            attrs: Vec::new(),
            unknown_children: Vec::new(),
        }
    }

    /// Custom paragraph style
    pub fn paragraph(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, StyleType::Paragraph).with_name(name)
    }

    /// Custom character style
    pub fn character(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, StyleType::Character).with_name(name)
    }

    /// Custom table style
    pub fn table(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, StyleType::Table).with_name(name)
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Inherit from the style with ID `parent`
    pub fn based_on(mut self, parent: impl Into<String>) -> Self {
        self.based_on = Some(parent.into());
        self
    }

    /// Style applied to the paragraph that follows
    pub fn with_next(mut self, next: impl Into<String>) -> Self {
        self.next = Some(next.into());
        self
    }

    /// Replace the run properties
    pub fn with_run_properties(mut self, run: RunProperties) -> Self {
        self.run = run;
        self
    }

    /// Replace the paragraph properties
    pub fn with_paragraph_properties(mut self, paragraph: ParagraphProperties) -> Self {
        self.paragraph = paragraph;
        self
    }

    /// Show in the quick style gallery with the given priority
    pub fn with_ui_priority(mut self, priority: u32) -> Self {
        self.ui_priority = Some(priority);
        self
    }

    /// Show the style in the quick style gallery
    pub fn with_quick_format(mut self) -> Self {
        self.quick_format = true;
        self
    }

    fn builtin(mut self) -> Self {
        self.custom = false;
        self
    }

    fn as_default(mut self) -> Self {
        self.default = true;
        self
    }

    fn with_unknown(mut self, child: RawXmlElement) -> Self {
        self.unknown_children.push(child.into());
        self
    }

    /// Style ID (`w:styleId`)
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Kind of style
    pub fn style_type(&self) -> StyleType {
        self.style_type
    }

    /// ID of the parent style
    pub fn parent(&self) -> Option<&str> {
        self.based_on.as_deref()
    }

    /// Style used for the next paragraph
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// Whether this is the default style for its type
    pub fn is_default(&self) -> bool {
        self.default
    }

    /// Whether the style is user-defined
    pub fn is_custom(&self) -> bool {
        self.custom
    }

    /// Run properties defined by this style
    pub fn run_properties(&self) -> &RunProperties {
        &self.run
    }

    /// Mutable run properties
    pub fn run_properties_mut(&mut self) -> &mut RunProperties {
        &mut self.run
    }

    /// Paragraph properties defined by this style
    pub fn paragraph_properties(&self) -> &ParagraphProperties {
        &self.paragraph
    }

    /// Mutable paragraph properties
    pub fn paragraph_properties_mut(&mut self) -> &mut ParagraphProperties {
        &mut self.paragraph
    }

    /// Parse from reader (after w:style start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut style = Self::from_start(start)?;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => style.read_child(reader, &e, false)?,
                Event::Empty(e) => style.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"style" => break,
                Event::Eof => return Err(unexpected_eof("w:style")),
                _ => {}
            }
            buf.clear();
        }

        Ok(style)
    }

    fn from_start(start: &BytesStart) -> Result<Self> {
        let id = get_w_attr(start, "styleId").ok_or_else(|| Error::MissingAttribute {
            element: "w:style".into(),
            attr: "w:styleId".into(),
        })?;
        // A missing w:type means paragraph
        let type_value = get_w_attr(start, "type");
        let style_type = match type_value.as_deref() {
            None => StyleType::Paragraph,
            Some(v) => StyleType::parse(v)
                .ok_or_else(|| Error::parse("w:style", format!("unknown style type '{}'", v)))?,
        };

        let mut style = Style::new(id, style_type);
        style.custom = false;
        for (key, value) in xml::attributes_of(start) {
            match key.as_str() {
                "w:styleId" => {}
                "w:type" if type_value.is_some() => {}
                "w:default" if value == "1" || value == "true" => style.default = true,
                "w:customStyle" if value == "1" || value == "true" => style.custom = true,
                _ => style.attrs.push((key, value)),
            }
        }
        Ok(style)
    }

    fn read_child<R: BufRead>(
        &mut self,
        reader: &mut Reader<R>,
        e: &BytesStart,
        empty: bool,
    ) -> Result<()> {
        let plain = xml::attributes_of(e).len() <= 1;
        let parsed = match e.name().local_name().as_ref() {
            b"name" if plain => get_w_val(e).map(|v| self.name = Some(v)).is_some(),
            b"basedOn" if plain => get_w_val(e).map(|v| self.based_on = Some(v)).is_some(),
            b"next" if plain => get_w_val(e).map(|v| self.next = Some(v)).is_some(),
            b"uiPriority" if plain => get_w_val(e)
                .and_then(|v| v.parse().ok())
                .map(|v| self.ui_priority = Some(v))
                .is_some(),
            b"qFormat" if get_attr(e, "w:val").is_none() => {
                self.quick_format = true;
                true
            }
            b"pPr" if !empty => {
                let (props, _) = ParagraphProperties::from_reader(reader)?;
                self.paragraph = props;
                return Ok(());
            }
            b"rPr" if !empty => {
                self.run = RunProperties::from_reader(reader)?;
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

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new("w:style");
        start.push_attribute(("w:type", self.style_type.as_str()));
        if self.default {
            start.push_attribute(("w:default", "1"));
        }
        if self.custom {
            start.push_attribute(("w:customStyle", "1"));
        }
        start.push_attribute(("w:styleId", self.id.as_str()));
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        writer.write_event(Event::Start(start))?;

        write_in_order(writer, STYLE_ORDER, &self.unknown_children, |w, slot| {
            match slot {
                "name" => {
                    if let Some(name) = &self.name {
                        write_val(w, "w:name", name)?;
                    }
                }
                "basedOn" => {
                    if let Some(parent) = &self.based_on {
                        write_val(w, "w:basedOn", parent)?;
                    }
                }
                "next" => {
                    if let Some(next) = &self.next {
                        write_val(w, "w:next", next)?;
                    }
                }
                "uiPriority" => {
                    if let Some(priority) = self.ui_priority {
                        write_val(w, "w:uiPriority", &priority.to_string())?;
                    }
                }
                "qFormat" => {
                    if self.quick_format {
                        w.write_event(Event::Empty(BytesStart::new("w:qFormat")))?;
                    }
                }
                "pPr" => self.paragraph.write_to(w)?,
                "rPr" => self.run.write_to(w)?,
                _ => {}
            }
            Ok(())
        })?;

        writer.write_event(Event::End(BytesEnd::new("w:style")))?;
        Ok(())
    }
}

/// Styles of one document, keyed by style ID
#[derive(Clone, Debug, PartialEq)]
pub struct StyleManager {
    styles: Vec<Style>,
    /// w:docDefaults, w:latentStyles and other non-style children, in order
    preamble: Vec<RawXmlNode>,
    root_attrs: Vec<(String, String)>,
}

impl Default for StyleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl StyleManager {
    /// Style set of a new document: document defaults plus the built-in styles
    pub fn new() -> Self {
        StyleManager {
            styles: builtin_styles(),
            preamble: vec![doc_defaults().into(), latent_styles().into()],
            root_attrs: Vec::new(),
        }
    }

    /// Parse word/styles.xml
    pub fn parse(xml_text: &str) -> Result<Self> {
        let mut manager = StyleManager {
            styles: Vec::new(),
            preamble: Vec::new(),
            root_attrs: Vec::new(),
        };
        let mut reader = reader_from_str(xml_text);
        let mut buf = Vec::new();
        let mut found = false;

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"styles" => {
                    manager.root_attrs = xml::attributes_of(&e);
                    manager.read_children(&mut reader)?;
                    found = true;
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"styles" => {
                    manager.root_attrs = xml::attributes_of(&e);
                    found = true;
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !found {
            return Err(Error::parse("word/styles.xml", "missing w:styles root element"));
        }
        log::debug!("parsed {} styles", manager.styles.len());
        Ok(manager)
    }

    fn read_children<R: BufRead>(&mut self, reader: &mut Reader<R>) -> Result<()> {
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"style" => {
                    self.styles.push(Style::from_reader(reader, &e)?);
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"style" => {
                    self.styles.push(Style::from_start(&e)?);
                }
                Event::Start(e) => self.preamble.push(read_raw(reader, &e, false)?),
                Event::Empty(e) => self.preamble.push(read_raw(reader, &e, true)?),
                Event::End(e) if e.name().local_name().as_ref() == b"styles" => break,
                Event::Eof => return Err(unexpected_eof("w:styles")),
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    /// Iterate over all styles
    pub fn styles(&self) -> impl Iterator<Item = &Style> {
        self.styles.iter()
    }

    /// Whether a style with this ID exists
    pub fn contains(&self, id: &str) -> bool {
        self.styles.iter().any(|s| s.id == id)
    }

    /// Look up a style by ID
    pub fn get_style(&self, id: &str) -> Result<&Style> {
        self.styles
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("style '{}'", id)))
    }

    /// Mutable style by ID
    pub fn get_style_mut(&mut self, id: &str) -> Result<&mut Style> {
        self.styles
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::NotFound(format!("style '{}'", id)))
    }

    /// Default style for a style type (`w:default="1"`)
    pub fn default_style(&self, style_type: StyleType) -> Option<&Style> {
        self.styles
            .iter()
            .find(|s| s.style_type == style_type && s.default)
    }

    /// Add a style; its parent must already exist and no cycle may result
    pub fn add_style(&mut self, style: Style) -> Result<()> {
        if self.contains(&style.id) {
            return Err(Error::validation("add_style", "style id", &style.id));
        }
        if let Some(parent) = &style.based_on {
            if !self.contains(parent) {
                return Err(Error::validation("add_style", "basedOn", parent));
            }
        }
        let id = style.id.clone();
        self.styles.push(style);
        // Opened files may already refer to the new ID from another style
        let check = self.ancestry(&id).map(|_| ());
        if let Err(err) = check {
            self.styles.pop();
            return Err(err);
        }
        log::trace!("added style {}", id);
        Ok(())
    }

    /// The style and its ancestors, leaf first
    fn ancestry(&self, id: &str) -> Result<Vec<&Style>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = self.get_style(id)?;

        loop {
            if !seen.insert(current.id.as_str()) || chain.len() >= self.styles.len() {
                return Err(Error::validation("resolve_style", "basedOn cycle", id));
            }
            chain.push(current);
            match &current.based_on {
                Some(parent) => {
                    current = self.styles.iter().find(|s| &s.id == parent).ok_or_else(|| {
                        Error::validation("resolve_style", "basedOn", parent)
                    })?;
                }
                None => break,
            }
        }

        Ok(chain)
    }

    /// Merge a style's properties with its ancestors; the most derived value wins
    pub fn resolve(&self, id: &str) -> Result<EffectiveProperties> {
        let mut effective = EffectiveProperties::default();
        for style in self.ancestry(id)?.into_iter().rev() {
            effective.run.apply(&style.run);
            effective.paragraph.apply(&style.paragraph);
        }
        Ok(effective)
    }

    /// Check that every `basedOn` resolves and that no chain loops
    pub fn validate(&self) -> Result<()> {
        for style in &self.styles {
            self.ancestry(&style.id)?;
            style.run.validate("validate")?;
            style.paragraph.validate("validate")?;
        }
        Ok(())
    }

    /// Write the w:styles root element
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let attrs = xml::merge_root_attributes(&self.root_attrs, &xml::minimal_document_namespaces());
        writer.write_event(Event::Start(start_with_attrs("w:styles", &attrs)))?;
        for node in &self.preamble {
            node.write_to(writer)?;
        }
        for style in &self.styles {
            style.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:styles")))?;
        Ok(())
    }
}

fn doc_defaults() -> RawXmlElement {
    let fonts = RawXmlElement::new("w:rFonts")
        .with_attr("w:asciiTheme", "minorHAnsi")
        .with_attr("w:eastAsiaTheme", "minorEastAsia")
        .with_attr("w:hAnsiTheme", "minorHAnsi")
        .with_attr("w:cstheme", "minorBidi");
    let run = RawXmlElement::new("w:rPr")
        .with_child(fonts)
        .with_child(RawXmlElement::new("w:sz").with_attr("w:val", "22"))
        .with_child(RawXmlElement::new("w:szCs").with_attr("w:val", "22"))
        .with_child(
            RawXmlElement::new("w:lang")
                .with_attr("w:val", "en-US")
                .with_attr("w:eastAsia", "en-US")
                .with_attr("w:bidi", "ar-SA"),
        );
    let paragraph = RawXmlElement::new("w:pPr").with_child(
        RawXmlElement::new("w:spacing")
            .with_attr("w:after", "160")
            .with_attr("w:line", "259")
            .with_attr("w:lineRule", "auto"),
    );
    RawXmlElement::new("w:docDefaults")
        .with_child(RawXmlElement::new("w:rPrDefault").with_child(run))
        .with_child(RawXmlElement::new("w:pPrDefault").with_child(paragraph))
}

fn latent_styles() -> RawXmlElement {
    RawXmlElement::new("w:latentStyles")
        .with_attr("w:defLockedState", "0")
        .with_attr("w:defUIPriority", "99")
        .with_attr("w:defSemiHidden", "0")
        .with_attr("w:defUnhideWhenUsed", "0")
        .with_attr("w:defQFormat", "0")
        .with_attr("w:count", "376")
}

fn heading(level: u8, size: u32, color: &str, before: u32) -> Style {
    let mut run = RunProperties::default();
    run.font_ascii = Some("Calibri Light".into());
    run.size = Some(size);
    run.color = Some(color.into());

    let mut paragraph = ParagraphProperties::default();
    paragraph.spacing = Some(Spacing {
        before: Some(before),
        after: Some(0),
        ..Default::default()
    });
    paragraph.outline_level = Some(level - 1);
    paragraph.unknown_children.push(RawXmlElement::new("w:keepNext").into());
    paragraph.unknown_children.push(RawXmlElement::new("w:keepLines").into());

    Style::paragraph(format!("Heading{}", level), format!("heading {}", level))
        .builtin()
        .based_on("Normal")
        .with_next("Normal")
        .with_ui_priority(9)
        .with_quick_format()
        .with_paragraph_properties(paragraph)
        .with_run_properties(run)
}

fn builtin_styles() -> Vec<Style> {
    let semi_hidden = || RawXmlElement::new("w:semiHidden");
    let unhide = || RawXmlElement::new("w:unhideWhenUsed");

    let cell_margin = |side: &str, w: &str| {
        RawXmlElement::new(side).with_attr("w:w", w).with_attr("w:type", "dxa")
    };
    let table_props = RawXmlElement::new("w:tblPr")
        .with_child(RawXmlElement::new("w:tblInd").with_attr("w:w", "0").with_attr("w:type", "dxa"))
        .with_child(
            RawXmlElement::new("w:tblCellMar")
                .with_child(cell_margin("w:top", "0"))
                .with_child(cell_margin("w:left", "108"))
                .with_child(cell_margin("w:bottom", "0"))
                .with_child(cell_margin("w:right", "108")),
        );

    let mut title_run = RunProperties::default();
    title_run.font_ascii = Some("Calibri Light".into());
    title_run.size = Some(56);
    let mut title_para = ParagraphProperties::default();
    title_para.spacing = Some(Spacing {
        after: Some(0),
        line: Some(240),
        line_rule: Some(LineRule::Auto),
        ..Default::default()
    });

    let mut link_run = RunProperties::default();
    link_run.color = Some("0563C1".into());
    link_run.underline = Some("single".into());

    vec![
        Style::paragraph("Normal", "Normal")
            .builtin()
            .as_default()
            .with_quick_format(),
        Style::character("DefaultParagraphFont", "Default Paragraph Font")
            .builtin()
            .as_default()
            .with_ui_priority(1)
            .with_unknown(semi_hidden())
            .with_unknown(unhide()),
        Style::table("TableNormal", "Normal Table")
            .builtin()
            .as_default()
            .with_ui_priority(99)
            .with_unknown(semi_hidden())
            .with_unknown(unhide())
            .with_unknown(table_props),
        Style::paragraph("Title", "Title")
            .builtin()
            .based_on("Normal")
            .with_next("Normal")
            .with_ui_priority(10)
            .with_quick_format()
            .with_paragraph_properties(title_para)
            .with_run_properties(title_run),
        heading(1, 32, "2F5496", 240),
        heading(2, 26, "2F5496", 40),
        heading(3, 24, "1F3763", 40),
        Style::character("Hyperlink", "Hyperlink")
            .builtin()
            .based_on("DefaultParagraphFont")
            .with_ui_priority(99)
            .with_unknown(unhide())
            .with_run_properties(link_run),
    ]
}
