//! Document body and block-level content

use crate::document::{Field, Hyperlink, Paragraph, ParagraphContent, Run, RunContent, Section, Table};
use crate::error::Result;
use crate::xml::{read_raw, unexpected_eof, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Block-level content of a body, cell, header or footer
#[derive(Clone, Debug, PartialEq)]
pub enum Block {
    /// Paragraph
    Paragraph(Paragraph),
    /// Table
    Table(Table),
    /// Unknown element (preserved for round-trip)
    Unknown(RawXmlNode),
}

impl Block {
    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            Block::Paragraph(p) => p.write_to(writer),
            Block::Table(t) => t.write_to(writer),
            Block::Unknown(node) => node.write_to(writer),
        }
    }
}

/// Parse one block-level element
pub(crate) fn read_block<R: BufRead>(
    reader: &mut Reader<R>,
    e: &BytesStart,
    empty: bool,
) -> Result<Block> {
    match e.name().local_name().as_ref() {
        b"p" if empty => Ok(Block::Paragraph(Paragraph::from_empty(e))),
        b"p" => Ok(Block::Paragraph(Paragraph::from_reader(reader, e)?)),
        b"tbl" if !empty => Ok(Block::Table(Table::from_reader(reader, e)?)),
        _ => Ok(Block::Unknown(read_raw(reader, e, empty)?)),
    }
}

/// Parse blocks up to the end tag named `end`
pub(crate) fn read_blocks<R: BufRead>(reader: &mut Reader<R>, end: &str) -> Result<Vec<Block>> {
    let mut blocks = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => blocks.push(read_block(reader, &e, false)?),
            Event::Empty(e) => blocks.push(read_block(reader, &e, true)?),
            Event::End(e) if e.name().local_name().as_ref() == end.as_bytes() => break,
            Event::Eof => return Err(unexpected_eof(end)),
            _ => {}
        }
        buf.clear();
    }

    Ok(blocks)
}

pub(crate) fn write_blocks<W: std::io::Write>(writer: &mut Writer<W>, blocks: &[Block]) -> Result<()> {
    for block in blocks {
        block.write_to(writer)?;
    }
    Ok(())
}

/// Document body (w:body): blocks plus the sections that partition them.
///
/// The last section is the body-level `w:sectPr`; every other section ends
/// after the block at index `end - 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
    pub(crate) blocks: Vec<Block>,
    pub(crate) sections: Vec<Section>,
}

impl Default for Body {
    fn default() -> Self {
        Body {
            blocks: Vec::new(),
            sections: vec![Section::default()],
        }
    }
}

impl Body {
    /// Parse body from XML reader (after w:body start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut blocks = Vec::new();
        let mut sections = Vec::new();
        let mut last_section = None;
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"sectPr" => {
                    last_section = Some(Section::from_reader(reader, &e)?);
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"sectPr" => {
                    last_section = Some(Section::from_empty(&e));
                }
                Event::Start(e) => blocks.push(read_block(reader, &e, false)?),
                Event::Empty(e) => blocks.push(read_block(reader, &e, true)?),
                Event::End(e) if e.name().local_name().as_ref() == b"body" => break,
                Event::Eof => return Err(unexpected_eof("w:body")),
                _ => {}
            }

            // A paragraph carrying w:sectPr closes a section
            if let Some(Block::Paragraph(p)) = blocks.last_mut() {
                if let Some(mut section) = p.section.take() {
                    if is_carrier(&blocks, &sections) {
                        blocks.pop();
                    }
                    section.end = Some(blocks.len());
                    sections.push(section);
                }
            }
            buf.clear();
        }

        let mut last = last_section.unwrap_or_else(|| {
            log::warn!("document body has no final w:sectPr, using Letter defaults");
            Section::default()
        });
        last.end = None;
        sections.push(last);

        Ok(Body { blocks, sections })
    }

    /// Iterate over all paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|c| match c {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Iterate over all paragraphs mutably
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.blocks.iter_mut().filter_map(|c| match c {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Iterate over all tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|c| match c {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Iterate over all tables mutably
    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut Table> {
        self.blocks.iter_mut().filter_map(|c| match c {
            Block::Table(t) => Some(t),
            _ => None,
        })
    }

    /// Block-level content in document order
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Sections in document order; the last one is always present
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Add a paragraph
    pub fn add_paragraph(&mut self, para: Paragraph) -> &mut Paragraph {
        self.blocks.push(Block::Paragraph(para));
        match self.blocks.last_mut() {
            Some(Block::Paragraph(p)) => p,
            _ => unreachable!("just pushed a paragraph"),
        }
    }

    /// Add a table
    pub fn add_table(&mut self, table: Table) -> &mut Table {
        self.blocks.push(Block::Table(table));
        match self.blocks.last_mut() {
            Some(Block::Table(t)) => t,
            _ => unreachable!("just pushed a table"),
        }
    }

    /// Close the current section after the last block and start a new one.
    ///
    /// The new section copies the page setup of the one it follows.
    pub fn add_section(&mut self, break_type: crate::document::SectionBreak) -> &mut Section {
        let end = self.blocks.len();
        let mut next = Section::new();
        if let Some(current) = self.sections.last_mut() {
            current.end = Some(end);
            next = current.clone();
            next.end = None;
            next.clear_references();
            next.set_title_page(false);
        }
        next.set_break_type(break_type);
        self.sections.push(next);
        match self.sections.last_mut() {
            Some(section) => section,
            None => unreachable!("just pushed a section"),
        }
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("w:body")))?;

        let fallback = Section::default();
        let (last, breaks) = self.sections.split_last().unwrap_or((&fallback, &[]));

        // Sections closed before any block need a carrier paragraph
        for section in breaks.iter().filter(|s| s.end == Some(0)) {
            Paragraph::default().write_with_section(writer, Some(section))?;
        }

        for (i, block) in self.blocks.iter().enumerate() {
            let mut ending = breaks.iter().filter(|s| s.end == Some(i + 1));
            match block {
                Block::Paragraph(p) => p.write_with_section(writer, ending.next())?,
                other => other.write_to(writer)?,
            }
            for section in ending {
                Paragraph::default().write_with_section(writer, Some(section))?;
            }
        }

        last.write_to(writer)?;
        writer.write_event(Event::End(BytesEnd::new("w:body")))?;
        Ok(())
    }
}

/// Whether the last block is a bare paragraph that only exists to carry a
/// section break: one at the very start, right after a non-paragraph block,
/// or right after another section break
fn is_carrier(blocks: &[Block], sections: &[Section]) -> bool {
    let Some((Block::Paragraph(p), before)) = blocks.split_last() else {
        return false;
    };
    if !p.is_bare() {
        return false;
    }
    let previous_end = sections.last().and_then(|s| s.end).unwrap_or(0);
    before.len() == previous_end || !matches!(before.last(), Some(Block::Paragraph(_)))
}

/// One node reached by [`walk_blocks`]
pub(crate) enum Visit<'a> {
    Paragraph(&'a Paragraph),
    Run(&'a Run),
    Field(&'a Field),
    Hyperlink(&'a Hyperlink),
    Table(&'a Table),
    /// Preserved markup at any depth
    Raw(&'a RawXmlNode),
}

/// Visit every block, inline item and preserved node, depth first
pub(crate) fn walk_blocks<'a>(blocks: &'a [Block], f: &mut dyn FnMut(Visit<'a>)) {
    for block in blocks {
        match block {
            Block::Paragraph(p) => {
                f(Visit::Paragraph(p));
                for node in &p.properties().unknown_children {
                    f(Visit::Raw(node));
                }
                walk_inline(p.content(), f);
            }
            Block::Table(t) => {
                f(Visit::Table(t));
                for node in t.unknown_nodes() {
                    f(Visit::Raw(node));
                }
                for row in t.rows() {
                    for node in row.unknown_nodes() {
                        f(Visit::Raw(node));
                    }
                    for cell in row.cells() {
                        walk_blocks(cell.blocks(), f);
                    }
                }
            }
            Block::Unknown(node) => f(Visit::Raw(node)),
        }
    }
}

fn walk_inline<'a>(content: &'a [ParagraphContent], f: &mut dyn FnMut(Visit<'a>)) {
    for item in content {
        match item {
            ParagraphContent::Run(run) => {
                f(Visit::Run(run));
                for content in run.content() {
                    if let RunContent::Unknown(node) = content {
                        f(Visit::Raw(node));
                    }
                }
            }
            ParagraphContent::Field(field) => f(Visit::Field(field)),
            ParagraphContent::Hyperlink(link) => {
                f(Visit::Hyperlink(link));
                walk_inline(link.content(), f);
            }
            ParagraphContent::Unknown(node) => f(Visit::Raw(node)),
            ParagraphContent::BookmarkStart { .. } | ParagraphContent::BookmarkEnd { .. } => {}
        }
    }
}
