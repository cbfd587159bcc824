//! Table row elements (w:tr)

use crate::error::Result;
use crate::xml::{self, read_raw, start_with_attrs, unexpected_eof, RawXmlNode};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

use super::cell::TableCell;

/// Table row (w:tr)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableRow {
    pub(crate) cells: Vec<TableCell>,
    attrs: Vec<(String, String)>,
    /// Preserved children (w:trPr, w:tblPrEx, ...) keyed by the number of
    /// cells that preceded them
    unknown: Vec<(usize, RawXmlNode)>,
}

impl TableRow {
    /// Create a new row with empty cells
    pub fn new(cell_count: usize) -> Self {
        let cells = (0..cell_count).map(|_| TableCell::new("")).collect();
        TableRow {
            cells,
            ..Default::default()
        }
    }

    /// Create a row from cell texts
    pub fn from_texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::from_cells(texts.into_iter().map(TableCell::new).collect())
    }

    /// Create a row holding the given cells
    pub fn from_cells(cells: Vec<TableCell>) -> Self {
        TableRow {
            cells,
            ..Default::default()
        }
    }

    /// Create from an empty `<w:tr/>`
    pub fn from_empty(start: &BytesStart) -> Self {
        TableRow {
            attrs: xml::attributes_of(start),
            ..Default::default()
        }
    }

    /// Parse from reader (after w:tr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, start: &BytesStart) -> Result<Self> {
        let mut row = Self::from_empty(start);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) if e.name().local_name().as_ref() == b"tc" => {
                    row.cells.push(TableCell::from_reader(reader, &e)?);
                }
                Event::Empty(e) if e.name().local_name().as_ref() == b"tc" => {
                    row.cells.push(TableCell::from_empty(&e));
                }
                Event::Start(e) => {
                    let node = read_raw(reader, &e, false)?;
                    row.unknown.push((row.cells.len(), node));
                }
                Event::Empty(e) => {
                    let node = read_raw(reader, &e, true)?;
                    row.unknown.push((row.cells.len(), node));
                }
                Event::End(e) if e.name().local_name().as_ref() == b"tr" => break,
                Event::Eof => return Err(unexpected_eof("w:tr")),
                _ => {}
            }
            buf.clear();
        }

        Ok(row)
    }

    /// Get cell count
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate over cells
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.cells.iter()
    }

    /// Get cell at index
    pub fn cell(&self, index: usize) -> Option<&TableCell> {
        self.cells.get(index)
    }

    /// Get mutable cell at index
    pub fn cell_mut(&mut self, index: usize) -> Option<&mut TableCell> {
        self.cells.get_mut(index)
    }

    /// Add a cell to the row
    pub fn add_cell(&mut self, cell: TableCell) {
        self.cells.push(cell);
    }

    /// Insert a cell at the specified index
    pub fn insert_cell(&mut self, index: usize, cell: TableCell) {
        if index <= self.cells.len() {
            self.cells.insert(index, cell);
            for (pos, _) in &mut self.unknown {
                if *pos > index {
                    *pos += 1;
                }
            }
        }
    }

    /// Remove a cell at the specified index
    pub fn remove_cell(&mut self, index: usize) -> Option<TableCell> {
        if index < self.cells.len() {
            for (pos, _) in &mut self.unknown {
                if *pos > index {
                    *pos -= 1;
                }
            }
            Some(self.cells.remove(index))
        } else {
            None
        }
    }

    /// Grid columns skipped before the first cell (`w:trPr/w:gridBefore`)
    pub fn grid_before(&self) -> usize {
        self.row_property_count("gridBefore")
    }

    /// Grid columns left empty after the last cell (`w:trPr/w:gridAfter`)
    pub fn grid_after(&self) -> usize {
        self.row_property_count("gridAfter")
    }

    fn row_property_count(&self, name: &str) -> usize {
        self.unknown
            .iter()
            .filter_map(|(_, node)| node.as_element())
            .filter(|e| e.local_name() == "trPr")
            .flat_map(|e| e.child_elements())
            .find(|e| e.local_name() == name)
            .and_then(|e| e.attr("w:val"))
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }

    /// Grid column at which each cell starts
    pub(crate) fn grid_starts(&self) -> Vec<usize> {
        let mut col = self.grid_before();
        self.cells
            .iter()
            .map(|cell| {
                let start = col;
                col += cell.grid_span();
                start
            })
            .collect()
    }

    /// Number of grid columns covered by the row, skipped columns included
    pub(crate) fn grid_width(&self) -> usize {
        let cells: usize = self.cells.iter().map(|c| c.grid_span()).sum();
        self.grid_before() + cells + self.grid_after()
    }

    /// Index of the cell starting exactly at `grid_col`
    pub(crate) fn cell_at_grid(&self, grid_col: usize) -> Option<usize> {
        self.grid_starts().iter().position(|&start| start == grid_col)
    }

    /// Preserved nodes between cells
    pub(crate) fn unknown_nodes(&self) -> impl Iterator<Item = &RawXmlNode> {
        self.unknown.iter().map(|(_, node)| node)
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(start_with_attrs("w:tr", &self.attrs)))?;

        for (i, cell) in self.cells.iter().enumerate() {
            self.write_unknown_at(writer, i)?;
            cell.write_to(writer)?;
        }
        // Trailing nodes, plus any whose position is past the last cell
        for (pos, node) in &self.unknown {
            if *pos >= self.cells.len() {
                node.write_to(writer)?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("w:tr")))?;
        Ok(())
    }

    fn write_unknown_at<W: std::io::Write>(&self, writer: &mut Writer<W>, index: usize) -> Result<()> {
        for (pos, node) in &self.unknown {
            if *pos == index {
                node.write_to(writer)?;
            }
        }
        Ok(())
    }
}
