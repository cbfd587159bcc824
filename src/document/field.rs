//! Complex fields (w:fldChar begin / instrText / separate / end)

use crate::document::{FieldCharType, Run, RunContent, RunProperties};
use crate::error::{Error, Result};
use quick_xml::Writer;

/// Options of a TOC field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TocField {
    /// Heading levels included, as in `\o "1-3"`
    pub levels: (u8, u8),
    /// `\h`: entries are hyperlinks
    pub hyperlinks: bool,
    /// `\z`: hide tab leader and page numbers in web view
    pub hide_in_web: bool,
    /// `\u`: use applied paragraph outline level
    pub outline_levels: bool,
}

impl Default for TocField {
    fn default() -> Self {
        Self {
            levels: (1, 3),
            hyperlinks: true,
            hide_in_web: true,
            outline_levels: true,
        }
    }
}

/// Options of a HYPERLINK field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HyperlinkField {
    pub target: String,
    /// `\l`: the target is a bookmark in this document
    pub bookmark: bool,
}

/// Options of a STYLEREF field
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRefField {
    pub style: String,
    /// `\l`: search from the bottom of the page
    pub from_bottom: bool,
}

/// What a field computes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// `PAGE`
    PageNumber,
    /// `NUMPAGES`
    PageCount,
    /// `TOC`
    Toc(TocField),
    /// `HYPERLINK`
    Hyperlink(HyperlinkField),
    /// `STYLEREF`
    StyleRef(StyleRefField),
    /// Any other instruction, kept verbatim
    Custom(String),
}

impl FieldKind {
    /// Instruction text, without the surrounding spaces
    pub fn instruction(&self) -> String {
        match self {
            FieldKind::PageNumber => "PAGE".to_string(),
            FieldKind::PageCount => "NUMPAGES".to_string(),
            FieldKind::Toc(toc) => {
                let mut s = format!("TOC \\o \"{}-{}\"", toc.levels.0, toc.levels.1);
                if toc.hyperlinks {
                    s.push_str(" \\h");
                }
                if toc.hide_in_web {
                    s.push_str(" \\z");
                }
                if toc.outline_levels {
                    s.push_str(" \\u");
                }
                s
            }
            FieldKind::Hyperlink(link) => {
                if link.bookmark {
                    format!("HYPERLINK \\l \"{}\"", link.target)
                } else {
                    format!("HYPERLINK \"{}\"", link.target)
                }
            }
            FieldKind::StyleRef(style_ref) => {
                if style_ref.from_bottom {
                    format!("STYLEREF \"{}\" \\l", style_ref.style)
                } else {
                    format!("STYLEREF \"{}\"", style_ref.style)
                }
            }
            FieldKind::Custom(instr) => instr.trim().to_string(),
        }
    }

    /// Recognize an instruction.
    ///
    /// Only instructions that would be written back identically are given a
    /// typed kind; everything else becomes [`FieldKind::Custom`].
    pub fn parse(instruction: &str) -> FieldKind {
        let normalized = instruction.split_whitespace().collect::<Vec<_>>().join(" ");
        let typed = Self::parse_normalized(&normalized);
        match typed {
            Some(kind) if kind.instruction() == normalized => kind,
            _ => FieldKind::Custom(instruction.trim().to_string()),
        }
    }

    fn parse_normalized(instr: &str) -> Option<FieldKind> {
        let mut words = instr.split(' ');
        match words.next()? {
            "PAGE" => Some(FieldKind::PageNumber),
            "NUMPAGES" => Some(FieldKind::PageCount),
            "TOC" => {
                let mut toc = TocField {
                    levels: (1, 9),
                    hyperlinks: false,
                    hide_in_web: false,
                    outline_levels: false,
                };
                while let Some(word) = words.next() {
                    match word {
                        "\\o" => {
                            let range = words.next()?.trim_matches('"');
                            let (from, to) = range.split_once('-')?;
                            toc.levels = (from.parse().ok()?, to.parse().ok()?);
                        }
                        "\\h" => toc.hyperlinks = true,
                        "\\z" => toc.hide_in_web = true,
                        "\\u" => toc.outline_levels = true,
                        _ => return None,
                    }
                }
                Some(FieldKind::Toc(toc))
            }
            "HYPERLINK" => {
                let rest: Vec<&str> = words.collect();
                let (bookmark, target) = match rest.as_slice() {
                    ["\\l", target] => (true, *target),
                    [target] => (false, *target),
                    _ => return None,
                };
                Some(FieldKind::Hyperlink(HyperlinkField {
                    target: unquote(target)?,
                    bookmark,
                }))
            }
            "STYLEREF" => {
                let rest: Vec<&str> = words.collect();
                let (style, from_bottom) = match rest.as_slice() {
                    [style, "\\l"] => (*style, true),
                    [style] => (*style, false),
                    _ => return None,
                };
                Some(FieldKind::StyleRef(StyleRefField {
                    style: unquote(style)?,
                    from_bottom,
                }))
            }
            _ => None,
        }
    }
}

fn unquote(s: &str) -> Option<String> {
    let inner = s.strip_prefix('"')?.strip_suffix('"')?;
    Some(inner.to_string())
}

/// A complex field with its cached result
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    kind: FieldKind,
    result: String,
    dirty: bool,
    properties: RunProperties,
}

impl Field {
    /// Create a field; it is marked dirty so consumers recompute it
    pub fn new(kind: FieldKind) -> Self {
        let result = match &kind {
            FieldKind::PageNumber | FieldKind::PageCount => "1".to_string(),
            _ => String::new(),
        };
        Self {
            kind,
            result,
            dirty: true,
            properties: RunProperties::default(),
        }
    }

    /// `PAGE`
    pub fn page_number() -> Self {
        Self::new(FieldKind::PageNumber)
    }

    /// `NUMPAGES`
    pub fn page_count() -> Self {
        Self::new(FieldKind::PageCount)
    }

    /// Table of contents
    pub fn toc(toc: TocField) -> Self {
        Self::new(FieldKind::Toc(toc))
    }

    /// Set the cached result shown until the field is updated
    pub fn with_result(mut self, result: impl Into<String>) -> Self {
        self.result = result.into();
        self
    }

    /// Formatting applied to every run of the field
    pub fn with_properties(mut self, properties: RunProperties) -> Self {
        self.properties = properties;
        self
    }

    /// What the field computes
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Cached result text
    pub fn result(&self) -> &str {
        &self.result
    }

    /// Whether consumers should recompute the field on open
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Set the `w:dirty` flag on the begin marker
    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Formatting of the field runs
    pub fn properties(&self) -> &RunProperties {
        &self.properties
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.kind.instruction().trim().is_empty() {
            return Err(Error::validation("validate", "field instruction", ""));
        }
        if let FieldKind::Toc(toc) = &self.kind {
            let (from, to) = toc.levels;
            if from == 0 || to > 9 || from > to {
                return Err(Error::validation(
                    "validate",
                    "TOC levels",
                    format!("{}-{}", from, to),
                ));
            }
        }
        self.properties.validate("validate")
    }

    /// The runs making up this field: begin, instruction, separate, result, end
    pub fn to_runs(&self) -> Vec<Run> {
        let run = |content: RunContent| {
            let mut run = Run::with_content(content);
            run.set_properties(self.properties.clone());
            run
        };
        vec![
            run(RunContent::FieldChar(FieldCharType::Begin { dirty: self.dirty })),
            run(RunContent::InstrText(format!(" {} ", self.kind.instruction()))),
            run(RunContent::FieldChar(FieldCharType::Separate)),
            run(RunContent::Text(self.result.clone())),
            run(RunContent::FieldChar(FieldCharType::End)),
        ]
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        for run in self.to_runs() {
            run.write_to(writer)?;
        }
        Ok(())
    }

    /// Collapse a field from the front of `runs`.
    ///
    /// Returns the field and the number of runs consumed. Only simple fields
    /// are recognized: every run carries a single item, no attributes and the
    /// same formatting, and the result is plain text. Runs are pulled one at
    /// a time, so a non-field run is rejected without looking further.
    pub(crate) fn from_runs<'a>(runs: impl IntoIterator<Item = &'a Run>) -> Option<(Field, usize)> {
        let mut runs = runs.into_iter();
        let first = runs.next()?;
        let properties = first.properties();
        let single = |run: &Run| -> Option<RunContent> {
            if run.content().len() == 1
                && run.attributes().is_empty()
                && run.properties() == properties
            {
                run.content().first().cloned()
            } else {
                None
            }
        };

        let dirty = match single(first)? {
            RunContent::FieldChar(FieldCharType::Begin { dirty }) => dirty,
            _ => return None,
        };

        let mut consumed = 1;
        let mut next = || {
            consumed += 1;
            runs.next().and_then(|run| single(run))
        };

        let mut instruction = String::new();
        let mut item = next()?;
        while let RunContent::InstrText(text) = &item {
            instruction.push_str(text);
            item = next()?;
        }
        if instruction.trim().is_empty() {
            return None;
        }
        if item != RunContent::FieldChar(FieldCharType::Separate) {
            return None;
        }

        let mut result = String::new();
        loop {
            match next()? {
                RunContent::Text(text) => result.push_str(&text),
                RunContent::FieldChar(FieldCharType::End) => break,
                _ => return None,
            }
        }

        let field = Field {
            kind: FieldKind::parse(&instruction),
            result,
            dirty,
            properties: properties.clone(),
        };
        Some((field, consumed))
    }
}
