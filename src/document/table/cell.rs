//! Table cell elements (w:tc, w:tcPr)

use crate::document::body::{read_block, write_blocks, Block};
use crate::document::Paragraph;
use crate::error::Result;
use crate::xml::{
    self, finish_element, get_w_val, read_raw, start_with_attrs, unexpected_eof, write_in_order,
    write_val, RawXmlNode,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

use super::types::{CellSpan, TableWidth, VMerge, VerticalAlignment};

const TCPR_ORDER: &[&str] = &[
    "cnfStyle", "tcW", "gridSpan", "hMerge", "vMerge", "tcBorders", "shd", "noWrap", "tcMar",
    "textDirection", "tcFitText", "vAlign", "hideMark", "headers", "cellIns", "cellDel",
    "cellMerge", "tcPrChange",
];

/// Table cell (w:tc)
#[derive(Clone, Debug, PartialEq)]
pub struct TableCell {
    properties: TableCellProperties,
    /// Cell content: paragraphs, nested tables and preserved elements
    blocks: Vec<Block>,
    attrs: Vec<(String, String)>,
    /// Rows covered by a vertical merge starting here, computed by the table
    pub(crate) rowspan: usize,
}

/// Table cell properties
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableCellProperties {
    pub(crate) width: Option<TableWidth>,
    pub(crate) grid_span: Option<u32>,
    pub(crate) v_merge: Option<VMerge>,
    pub(crate) v_align: Option<VerticalAlignment>,
    pub(crate) unknown_children: Vec<RawXmlNode>,
}

impl Default for TableCell {
    fn default() -> Self {
        TableCell {
            properties: TableCellProperties::default(),
            blocks: Vec::new(),
            attrs: Vec::new(),
            rowspan: 1,
        }
    }
}

impl TableCell {
    /// Create a new cell with text
    pub fn new(text: impl Into<String>) -> Self {
        TableCell {
            blocks: vec![Block::Paragraph(Paragraph::new(text))],
            ..Default::default()
        }
    }

    /// Set the cell text (replaces all content with a single paragraph)
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.blocks.clear();
        self.blocks.push(Block::Paragraph(Paragraph::new(text)));
    }

    /// Add a paragraph to the cell
    pub fn add_paragraph(&mut self, para: Paragraph) -> &mut Paragraph {
        self.blocks.push(Block::Paragraph(para));
        match self.blocks.last_mut() {
            Some(Block::Paragraph(p)) => p,
            _ => unreachable!("just pushed a paragraph"),
        }
    }

    /// Add a nested table
    pub fn add_table(&mut self, table: super::Table) {
        self.blocks.push(Block::Table(table));
    }

    /// Set cell width
    pub fn set_width(&mut self, width: TableWidth) {
        self.properties.width = Some(width);
    }

    /// Set vertical alignment
    pub fn set_vertical_alignment(&mut self, align: VerticalAlignment) {
        self.properties.v_align = Some(align);
    }

    pub(crate) fn set_grid_span(&mut self, span: u32) {
        self.properties.grid_span = if span > 1 { Some(span) } else { None };
    }

    pub(crate) fn set_v_merge(&mut self, v_merge: Option<VMerge>) {
        self.properties.v_merge = v_merge;
    }

    /// Parse from reader (after w:tc start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut cell = Self::from_empty(start);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"tcPr" => {
                    cell.properties = TableCellProperties::from_reader(reader)?;
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"tcPr" => {}
                Event::Start(e) => cell.blocks.push(read_block(reader, &e, false)?),
                Event::Empty(e) => cell.blocks.push(read_block(reader, &e, true)?),
                Event::End(e) if e.name().local_name().as_ref() == b"tc" => break,
                Event::Eof => return Err(unexpected_eof("w:tc")),
                _ => {}
            }
            buf.clear();
        }

        Ok(cell)
    }

    /// Create from an empty `<w:tc/>`
    pub fn from_empty(start: &BytesStart) -> Self {
        TableCell {
            attrs: xml::attributes_of(start),
            ..Default::default()
        }
    }

    /// Get cell text (paragraphs joined by newlines)
    pub fn text(&self) -> String {
        self.paragraphs()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Content blocks
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Iterate over paragraphs directly inside the cell
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Get mutable paragraphs iterator
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.blocks.iter_mut().filter_map(|b| match b {
            Block::Paragraph(p) => Some(p),
            _ => None,
        })
    }

    /// Cell properties
    pub fn properties(&self) -> &TableCellProperties {
        &self.properties
    }

    /// Get cell width
    pub fn width(&self) -> Option<TableWidth> {
        self.properties.width
    }

    /// Get vertical alignment
    pub fn vertical_alignment(&self) -> Option<VerticalAlignment> {
        self.properties.v_align
    }

    /// Number of grid columns this cell spans
    pub fn grid_span(&self) -> usize {
        self.properties.grid_span.unwrap_or(1).max(1) as usize
    }

    /// Get vertical merge status
    pub fn v_merge(&self) -> Option<VMerge> {
        self.properties.v_merge
    }

    /// Column and row extent of this cell
    pub fn span(&self) -> CellSpan {
        CellSpan {
            colspan: self.grid_span(),
            rowspan: self.rowspan,
        }
    }

    /// Check if this cell is the start of a vertical merge
    pub fn is_v_merge_start(&self) -> bool {
        self.properties.v_merge == Some(VMerge::Restart)
    }

    /// Check if this cell continues a vertical merge
    pub fn is_v_merge_continue(&self) -> bool {
        self.properties.v_merge == Some(VMerge::Continue)
    }

    /// Clear cell content
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.blocks.push(Block::Paragraph(Paragraph::default()));
    }

    /// Move the content out, leaving a single empty paragraph
    pub(crate) fn take_blocks(&mut self) -> Vec<Block> {
        let blocks = std::mem::take(&mut self.blocks);
        self.clear();
        blocks
    }

    /// Append blocks that carry content; empty paragraphs are dropped
    pub(crate) fn absorb(&mut self, blocks: Vec<Block>) {
        for block in blocks {
            let empty = matches!(&block, Block::Paragraph(p) if p.content().is_empty());
            if !empty {
                self.blocks.push(block);
            }
        }
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(start_with_attrs("w:tc", &self.attrs)))?;
        self.properties.write_to(writer)?;
        write_blocks(writer, &self.blocks)?;

        // A cell must end with a paragraph
        if !matches!(self.blocks.last(), Some(Block::Paragraph(_))) {
            writer.write_event(Event::Empty(BytesStart::new("w:p")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("w:tc")))?;
        Ok(())
    }
}

impl TableCellProperties {
    /// Whether no property is set
    pub fn is_empty(&self) -> bool {
        self.width.is_none()
            && self.grid_span.is_none()
            && self.v_merge.is_none()
            && self.v_align.is_none()
            && self.unknown_children.is_empty()
    }

    /// Parse from reader (after w:tcPr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut props = TableCellProperties::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => props.read_child(reader, &e, false)?,
                Event::Empty(e) => props.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"tcPr" => break,
                Event::Eof => return Err(unexpected_eof("w:tcPr")),
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
            b"tcW" => TableWidth::parse(e).map(|w| self.width = Some(w)).is_some(),
            b"gridSpan" => get_w_val(e)
                .and_then(|v| v.parse().ok())
                .map(|v| self.grid_span = Some(v))
                .is_some(),
            b"vMerge" => match get_w_val(e).as_deref() {
                Some("restart") => {
                    self.v_merge = Some(VMerge::Restart);
                    true
                }
                None | Some("continue") => {
                    self.v_merge = Some(VMerge::Continue);
                    true
                }
                _ => false,
            },
            b"vAlign" => get_w_val(e)
                .and_then(|v| VerticalAlignment::parse(&v))
                .map(|v| self.v_align = Some(v))
                .is_some(),
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

        writer.write_event(Event::Start(BytesStart::new("w:tcPr")))?;
        write_in_order(writer, TCPR_ORDER, &self.unknown_children, |w, slot| {
            match slot {
                "tcW" => {
                    if let Some(width) = &self.width {
                        let (value, kind) = width.attributes();
                        let mut elem = BytesStart::new("w:tcW");
                        elem.push_attribute(("w:w", value.as_str()));
                        elem.push_attribute(("w:type", kind));
                        w.write_event(Event::Empty(elem))?;
                    }
                }
                "gridSpan" => {
                    if let Some(span) = self.grid_span {
                        write_val(w, "w:gridSpan", &span.to_string())?;
                    }
                }
                "vMerge" => match self.v_merge {
                    Some(VMerge::Restart) => write_val(w, "w:vMerge", "restart")?,
                    Some(VMerge::Continue) => {
                        w.write_event(Event::Empty(BytesStart::new("w:vMerge")))?;
                    }
                    None => {}
                },
                "vAlign" => {
                    if let Some(align) = self.v_align {
                        write_val(w, "w:vAlign", align.as_str())?;
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        writer.write_event(Event::End(BytesEnd::new("w:tcPr")))?;
        Ok(())
    }
}
