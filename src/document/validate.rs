//! Document validation
//!
//! Range checks shared by the validated setters, plus the pre-save pass that
//! walks the whole model.

use crate::document::body::{walk_blocks, Visit};
use crate::document::{Document, FieldCharType, RunContent};
use crate::error::{Error, Result};
use crate::opc::PartUri;

/// Largest font size in half-points
pub const MAX_HALF_POINTS: u32 = 3276;
/// Largest page dimension, margin or indent in twips (22 inches)
pub const MAX_TWIPS: i32 = 31680;
/// Largest number of text columns in a section
pub const MAX_COLUMNS: u32 = 45;
/// Largest drawing extent in EMUs
pub const MAX_EMU: u64 = 27_273_042_316_900;

const HIGHLIGHTS: &[&str] = &[
    "black", "blue", "cyan", "green", "magenta", "red", "yellow", "white", "darkBlue",
    "darkCyan", "darkGreen", "darkMagenta", "darkRed", "darkYellow", "darkGray", "lightGray",
    "none",
];

const UNDERLINES: &[&str] = &[
    "single", "words", "double", "thick", "dotted", "dottedHeavy", "dash", "dashedHeavy",
    "dashLong", "dashLongHeavy", "dotDash", "dashDotHeavy", "dotDotDash", "dashDotDotHeavy",
    "wave", "wavyHeavy", "wavyDouble", "none",
];

pub(crate) fn check_half_points(operation: &str, value: u32) -> Result<()> {
    if (1..=MAX_HALF_POINTS).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, "half-points", value))
    }
}

pub(crate) fn check_page_dimension(operation: &str, value: u32) -> Result<()> {
    if (1..=MAX_TWIPS as u32).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, "page dimension", value))
    }
}

/// Margins and indents may be negative
pub(crate) fn check_signed_twips(operation: &str, field: &str, value: i32) -> Result<()> {
    if (-MAX_TWIPS..=MAX_TWIPS).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, field, value))
    }
}

pub(crate) fn check_twips(operation: &str, field: &str, value: u32) -> Result<()> {
    if value <= MAX_TWIPS as u32 {
        Ok(())
    } else {
        Err(Error::validation(operation, field, value))
    }
}

pub(crate) fn check_columns(operation: &str, value: u32) -> Result<()> {
    if (1..=MAX_COLUMNS).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, "columns", value))
    }
}

pub(crate) fn check_emu(operation: &str, field: &str, value: u64) -> Result<()> {
    if (1..=MAX_EMU).contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, field, value))
    }
}

/// `RRGGBB` hex or `auto`
pub(crate) fn check_color(operation: &str, value: &str) -> Result<()> {
    let hex = value.len() == 6 && value.chars().all(|c| c.is_ascii_hexdigit());
    if hex || value == "auto" {
        Ok(())
    } else {
        Err(Error::validation(operation, "color", value))
    }
}

pub(crate) fn check_highlight(operation: &str, value: &str) -> Result<()> {
    if HIGHLIGHTS.contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, "highlight", value))
    }
}

pub(crate) fn check_underline(operation: &str, value: &str) -> Result<()> {
    if UNDERLINES.contains(&value) {
        Ok(())
    } else {
        Err(Error::validation(operation, "underline", value))
    }
}

/// Characters XML 1.0 allows in character data
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Text must not carry control characters the XML writer cannot encode
pub(crate) fn check_text(operation: &str, value: &str) -> Result<()> {
    match value.chars().find(|&c| !is_xml_char(c)) {
        None => Ok(()),
        Some(c) => Err(Error::validation(operation, "text", format!("U+{:04X}", c as u32))),
    }
}

/// Check the whole model before anything is written; the first violation wins
pub(crate) fn validate_document(doc: &Document) -> Result<()> {
    doc.styles.validate()?;
    doc.core.validate()?;

    let body = &doc.part.body;
    let mut previous_end = 0;
    for section in body.sections() {
        section.validate()?;
        if let Some(end) = section.end {
            if end < previous_end || end > body.blocks().len() {
                return Err(Error::validation("validate", "section end", end));
            }
            previous_end = end;
        }
        for reference in section.references() {
            if !doc.registry.contains_id(&doc.main_part, &reference.rel_id) {
                return Err(Error::Relationship(format!(
                    "section references missing {} in {}",
                    reference.rel_id, doc.main_part
                )));
            }
        }
    }

    let mut main = PartChecker::new(doc, &doc.main_part);
    for section in body.sections() {
        for node in section.unknown_nodes() {
            main.visit(Visit::Raw(node));
        }
    }
    for node in doc.part.before_body.iter().chain(&doc.part.after_body) {
        main.visit(Visit::Raw(node));
    }
    walk_blocks(body.blocks(), &mut |v| main.visit(v));
    main.finish()?;

    for hf in &doc.headers_footers {
        let mut checker = PartChecker::new(doc, hf.part());
        hf.walk(&mut |v| checker.visit(v));
        checker.finish()?;
    }
    Ok(())
}

/// Walks the content of one part, tracking open fields and relationship references
struct PartChecker<'a> {
    doc: &'a Document,
    part: &'a PartUri,
    /// One entry per open field: whether its separator was seen
    fields: Vec<bool>,
    error: Option<Error>,
}

impl<'a> PartChecker<'a> {
    fn new(doc: &'a Document, part: &'a PartUri) -> Self {
        PartChecker {
            doc,
            part,
            fields: Vec::new(),
            error: None,
        }
    }

    fn visit(&mut self, visit: Visit<'_>) {
        if self.error.is_none() {
            if let Err(err) = self.check(visit) {
                self.error = Some(err);
            }
        }
    }

    fn finish(self) -> Result<()> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if !self.fields.is_empty() {
            return Err(Error::validation("validate", "fldChar", format!("unterminated field in {}", self.part)));
        }
        Ok(())
    }

    fn check(&mut self, visit: Visit<'_>) -> Result<()> {
        match visit {
            Visit::Paragraph(p) => {
                p.properties().validate("validate")?;
                if let Some(style) = p.style() {
                    if !self.doc.styles.contains(style) {
                        log::warn!("paragraph style '{}' is not defined in {}", style, self.part);
                    }
                }
            }
            Visit::Run(run) => {
                run.properties().validate("validate")?;
                for content in run.content() {
                    match content {
                        RunContent::Drawing(drawing) => {
                            drawing.validate()?;
                            self.reference("a:blip", drawing.rel_id())?;
                        }
                        RunContent::Text(text) | RunContent::InstrText(text) => {
                            check_text("validate", text)?
                        }
                        RunContent::FieldChar(kind) => self.field_char(match kind {
                            FieldCharType::Begin { .. } => "begin",
                            FieldCharType::Separate => "separate",
                            FieldCharType::End => "end",
                        })?,
                        _ => {}
                    }
                }
            }
            Visit::Field(field) => {
                field.validate()?;
                check_text("validate", &field.kind().instruction())?;
                check_text("validate", field.result())?;
            }
            Visit::Hyperlink(link) => {
                if let Some(id) = link.rel_id() {
                    self.reference("w:hyperlink", id)?;
                }
            }
            Visit::Table(table) => table.validate()?,
            Visit::Raw(node) => {
                let elem = match node.as_element() {
                    Some(elem) => elem,
                    None => return Ok(()),
                };
                let mut references = Vec::new();
                let mut field_chars = Vec::new();
                elem.visit(&mut |e| {
                    for (key, value) in &e.attributes {
                        if key.starts_with("r:") {
                            references.push((e.name.as_str(), value.as_str()));
                        }
                    }
                    if e.local_name() == "fldChar" {
                        if let Some(kind) = e.attr("w:fldCharType") {
                            field_chars.push(kind);
                        }
                    }
                });
                for (element, id) in references {
                    self.reference(element, id)?;
                }
                for kind in field_chars {
                    self.field_char(kind)?;
                }
            }
        }
        Ok(())
    }

    fn reference(&self, element: &str, id: &str) -> Result<()> {
        if self.doc.registry.contains_id(self.part, id) {
            Ok(())
        } else {
            Err(Error::Relationship(format!(
                "{} references missing {} in {}",
                element, id, self.part
            )))
        }
    }

    fn field_char(&mut self, kind: &str) -> Result<()> {
        match kind {
            "begin" => self.fields.push(false),
            "separate" => match self.fields.last_mut() {
                Some(separated) if !*separated => *separated = true,
                _ => return Err(Error::validation("validate", "fldChar", "separate outside a field")),
            },
            "end" => {
                if self.fields.pop().is_none() {
                    return Err(Error::validation("validate", "fldChar", "end without begin"));
                }
            }
            other => return Err(Error::validation("validate", "fldChar", other)),
        }
        Ok(())
    }
}
