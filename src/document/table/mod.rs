//! Table elements (w:tbl, w:tr, w:tc)

mod cell;
mod row;
mod types;

pub use cell::{TableCell, TableCellProperties};
pub use row::TableRow;
pub use types::{CellSpan, GridColumn, TableAlignment, TableWidth, VMerge, VerticalAlignment};

use crate::error::{Error, Result};
use crate::xml::{
    self, finish_element, get_w_attr, get_w_val, read_raw, start_with_attrs, unexpected_eof,
    write_in_order, write_val, RawXmlNode,
};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

/// Usable width of a Letter page with one-inch margins, in twips
const DEFAULT_TABLE_WIDTH: u32 = 9360;

const TBLPR_ORDER: &[&str] = &[
    "tblStyle", "tblpPr", "tblOverlap", "bidiVisual", "tblStyleRowBandSize",
    "tblStyleColBandSize", "tblW", "jc", "tblCellSpacing", "tblInd", "tblBorders", "shd",
    "tblLayout", "tblCellMar", "tblLook", "tblCaption", "tblDescription", "tblPrChange",
];

/// Table element (w:tbl)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    properties: TableProperties,
    grid: Vec<GridColumn>,
    rows: Vec<TableRow>,
    /// Preserved children keyed by the number of rows that preceded them
    unknown: Vec<(usize, RawXmlNode)>,
}

/// Table properties (w:tblPr)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TableProperties {
    pub(crate) style: Option<String>,
    pub(crate) width: Option<TableWidth>,
    pub(crate) alignment: Option<TableAlignment>,
    pub(crate) unknown_children: Vec<RawXmlNode>,
}

impl Table {
    /// Create a new table with the specified number of rows and columns
    pub fn new(rows: usize, cols: usize) -> Self {
        let table_rows = (0..rows).map(|_| TableRow::new(cols)).collect();
        let width = if cols > 0 {
            Some(DEFAULT_TABLE_WIDTH / cols as u32)
        } else {
            None
        };
        let grid = (0..cols).map(|_| GridColumn { width }).collect();

        Table {
            properties: TableProperties {
                width: Some(TableWidth::Auto),
                ..Default::default()
            },
            grid,
            rows: table_rows,
            ..Default::default()
        }
    }

    /// Create a table from a 2D array of strings
    pub fn from_data<S: Into<String> + Clone>(data: &[&[S]]) -> Self {
        let cols = data.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut table = Table::new(0, cols);
        for row in data {
            let mut cells: Vec<TableCell> =
                row.iter().map(|text| TableCell::new(text.clone())).collect();
            cells.resize_with(cols, || TableCell::new(""));
            table.rows.push(TableRow::from_cells(cells));
        }
        table
    }

    /// Parse from reader (after w:tbl start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>, _start: &BytesStart) -> Result<Self> {
        let mut table = Table::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => match e.name().local_name().as_ref() {
                    b"tblPr" => table.properties = TableProperties::from_reader(reader)?,
                    b"tblGrid" => table.grid = parse_table_grid(reader)?,
                    b"tr" => table.rows.push(TableRow::from_reader(reader, &e)?),
                    _ => {
                        let node = read_raw(reader, &e, false)?;
                        table.unknown.push((table.rows.len(), node));
                    }
                },
                Event::Empty(e) => match e.name().local_name().as_ref() {
                    b"tblPr" | b"tblGrid" => {}
                    b"tr" => table.rows.push(TableRow::from_empty(&e)),
                    _ => {
                        let node = read_raw(reader, &e, true)?;
                        table.unknown.push((table.rows.len(), node));
                    }
                },
                Event::End(e) if e.name().local_name().as_ref() == b"tbl" => break,
                Event::Eof => return Err(unexpected_eof("w:tbl")),
                _ => {}
            }
            buf.clear();
        }

        table.refresh_spans();
        Ok(table)
    }

    /// Get row count
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of grid columns
    pub fn column_count(&self) -> usize {
        if self.grid.is_empty() {
            self.rows.first().map(|r| r.grid_width()).unwrap_or(0)
        } else {
            self.grid.len()
        }
    }

    /// Grid column definitions
    pub fn grid(&self) -> &[GridColumn] {
        &self.grid
    }

    /// Table-level properties
    pub fn properties(&self) -> &TableProperties {
        &self.properties
    }

    /// Table style ID
    pub fn style(&self) -> Option<&str> {
        self.properties.style.as_deref()
    }

    /// Set the table style ID
    pub fn set_style(&mut self, style: impl Into<String>) {
        self.properties.style = Some(style.into());
    }

    /// Set the preferred table width
    pub fn set_width(&mut self, width: TableWidth) {
        self.properties.width = Some(width);
    }

    /// Set horizontal alignment on the page
    pub fn set_alignment(&mut self, alignment: TableAlignment) {
        self.properties.alignment = Some(alignment);
    }

    /// Get cell by row and cell index
    pub fn cell(&self, row: usize, col: usize) -> Option<&TableCell> {
        self.rows.get(row)?.cells.get(col)
    }

    /// Iterate over rows
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.rows.iter()
    }

    /// Get row by index
    pub fn row(&self, index: usize) -> Option<&TableRow> {
        self.rows.get(index)
    }

    /// Get mutable cell by row and cell index
    pub fn cell_mut(&mut self, row: usize, col: usize) -> Option<&mut TableCell> {
        self.rows.get_mut(row)?.cells.get_mut(col)
    }

    /// Get mutable row
    pub fn row_mut(&mut self, index: usize) -> Option<&mut TableRow> {
        self.rows.get_mut(index)
    }

    /// Add a row to the table
    pub fn add_row(&mut self, row: TableRow) {
        self.rows.push(row);
        self.refresh_spans();
    }

    /// Add a new empty row with the same column count as the table
    pub fn add_empty_row(&mut self) -> &mut TableRow {
        let cols = self.column_count();
        self.rows.push(TableRow::new(cols));
        match self.rows.last_mut() {
            Some(row) => row,
            None => unreachable!("just pushed a row"),
        }
    }

    /// Insert a row at the specified index
    pub fn insert_row(&mut self, index: usize, row: TableRow) -> Result<()> {
        if index > self.rows.len() {
            return Err(Error::NotFound(format!("row {}", index)));
        }
        let continues_merge = self
            .rows
            .get(index)
            .map(|r| r.cells.iter().any(|c| c.is_v_merge_continue()))
            .unwrap_or(false);
        if continues_merge {
            return Err(Error::validation("insert_row", "row", index));
        }
        self.rows.insert(index, row);
        for (pos, _) in &mut self.unknown {
            if *pos > index {
                *pos += 1;
            }
        }
        self.refresh_spans();
        Ok(())
    }

    /// Remove a row at the specified index
    pub fn remove_row(&mut self, index: usize) -> Option<TableRow> {
        if index >= self.rows.len() {
            return None;
        }
        for (pos, _) in &mut self.unknown {
            if *pos > index {
                *pos -= 1;
            }
        }
        let row = self.rows.remove(index);

        // A merge that started in the removed row now starts in the next one
        if row.cells.iter().any(|c| c.is_v_merge_start()) {
            if let Some(next) = self.rows.get_mut(index) {
                for (pos, start) in row.grid_starts().into_iter().enumerate() {
                    if !row.cells[pos].is_v_merge_start() {
                        continue;
                    }
                    if let Some(i) = next.cell_at_grid(start) {
                        if next.cells[i].is_v_merge_continue() {
                            next.cells[i].set_v_merge(Some(VMerge::Restart));
                        }
                    }
                }
            }
        }
        self.refresh_spans();
        Some(row)
    }

    /// Whether any cell is not exactly one grid column of one row
    fn has_merges(&self) -> bool {
        self.rows.iter().any(|r| r.grid_before() > 0 || r.grid_after() > 0)
            || self
                .rows
                .iter()
                .flat_map(|r| r.cells.iter())
                .any(|c| c.grid_span() > 1 || c.v_merge().is_some())
    }

    /// Add a column to the table (adds an empty cell to each row)
    pub fn add_column(&mut self) -> Result<()> {
        self.insert_column(self.column_count())
    }

    /// Insert a column at the specified grid index
    pub fn insert_column(&mut self, index: usize) -> Result<()> {
        if index > self.column_count() {
            return Err(Error::NotFound(format!("column {}", index)));
        }
        if self.has_merges() {
            return Err(Error::validation("insert_column", "merged table", index));
        }
        self.grid.insert(index.min(self.grid.len()), GridColumn { width: None });
        for row in &mut self.rows {
            row.insert_cell(index, TableCell::new(""));
        }
        Ok(())
    }

    /// Remove a column at the specified grid index
    pub fn remove_column(&mut self, index: usize) -> Result<()> {
        if index >= self.column_count() {
            return Err(Error::NotFound(format!("column {}", index)));
        }
        if self.has_merges() {
            return Err(Error::validation("remove_column", "merged table", index));
        }
        if index < self.grid.len() {
            self.grid.remove(index);
        }
        for row in &mut self.rows {
            row.remove_cell(index);
        }
        Ok(())
    }

    /// Set cell text at position
    pub fn set_cell_text(&mut self, row: usize, col: usize, text: impl Into<String>) {
        if let Some(cell) = self.cell_mut(row, col) {
            cell.set_text(text);
        }
    }

    /// Set column width (in twips)
    pub fn set_column_width(&mut self, col: usize, width: u32) {
        if let Some(column) = self.grid.get_mut(col) {
            column.width = Some(width);
        }
    }

    /// Merge the block of grid cells starting at (`row`, `col`).
    ///
    /// `col` is a grid column. Every covered cell must currently be unmerged;
    /// content of covered cells is appended to the top-left cell.
    pub fn merge(&mut self, row: usize, col: usize, colspan: usize, rowspan: usize) -> Result<()> {
        if colspan == 0 || rowspan == 0 {
            return Err(Error::validation("merge", "span", format!("{}x{}", colspan, rowspan)));
        }
        if row + rowspan > self.rows.len() {
            return Err(Error::validation("merge", "rowspan", rowspan));
        }
        if col + colspan > self.column_count() {
            return Err(Error::validation("merge", "colspan", colspan));
        }

        // Locate the first covered cell in each row and check the region is unmerged
        let mut anchors = Vec::with_capacity(rowspan);
        for r in row..row + rowspan {
            let table_row = &self.rows[r];
            let first = table_row
                .cell_at_grid(col)
                .ok_or_else(|| Error::validation("merge", "column", col))?;
            for offset in 0..colspan {
                let cell = table_row
                    .cells
                    .get(first + offset)
                    .ok_or_else(|| Error::validation("merge", "colspan", colspan))?;
                if cell.grid_span() != 1 || cell.v_merge().is_some() {
                    return Err(Error::validation("merge", "cell", format!("({}, {})", r, col + offset)));
                }
            }
            anchors.push(first);
        }

        let mut moved = Vec::new();
        for (i, r) in (row..row + rowspan).enumerate() {
            let first = anchors[i];
            let table_row = &mut self.rows[r];
            if i > 0 {
                moved.extend(table_row.cells[first].take_blocks());
            }
            for _ in 1..colspan {
                if let Some(mut covered) = table_row.remove_cell(first + 1) {
                    moved.extend(covered.take_blocks());
                }
            }
            let cell = &mut table_row.cells[first];
            cell.set_grid_span(colspan as u32);
            if rowspan > 1 {
                let marker = if i == 0 { VMerge::Restart } else { VMerge::Continue };
                cell.set_v_merge(Some(marker));
            }
        }
        self.rows[row].cells[anchors[0]].absorb(moved);

        self.refresh_spans();
        log::debug!("merged {}x{} cells at ({}, {})", colspan, rowspan, row, col);
        Ok(())
    }

    /// Recompute the row span of every cell from its vertical merge markers
    pub(crate) fn refresh_spans(&mut self) {
        let starts: Vec<Vec<usize>> = self.rows.iter().map(|r| r.grid_starts()).collect();

        for r in 0..self.rows.len() {
            for c in 0..self.rows[r].cells.len() {
                let rowspan = match self.rows[r].cells[c].v_merge() {
                    None => 1,
                    Some(VMerge::Continue) => 0,
                    Some(VMerge::Restart) => {
                        let grid_col = starts[r][c];
                        1 + (r + 1..self.rows.len())
                            .take_while(|&below| {
                                starts[below]
                                    .iter()
                                    .position(|&s| s == grid_col)
                                    .map(|i| self.rows[below].cells[i].is_v_merge_continue())
                                    .unwrap_or(false)
                            })
                            .count()
                    }
                };
                self.rows[r].cells[c].rowspan = rowspan;
            }
        }
    }

    /// Check that every row fills the grid and every merge continuation has an origin
    pub(crate) fn validate(&self) -> Result<()> {
        let width = self.column_count();
        for (r, row) in self.rows.iter().enumerate() {
            if row.cells.is_empty() {
                return Err(Error::validation("validate", "table row without cells", r));
            }
            if !self.grid.is_empty() && row.grid_width() != width {
                return Err(Error::validation(
                    "validate",
                    "row grid width",
                    format!("row {} spans {} of {} columns", r, row.grid_width(), width),
                ));
            }
            for (c, start) in row.grid_starts().into_iter().enumerate() {
                if !row.cells[c].is_v_merge_continue() {
                    continue;
                }
                let origin = r
                    .checked_sub(1)
                    .and_then(|above| self.rows[above].cell_at_grid(start).map(|i| (above, i)))
                    .map(|(above, i)| self.rows[above].cells[i].v_merge().is_some())
                    .unwrap_or(false);
                if !origin {
                    return Err(Error::validation(
                        "validate",
                        "vertical merge",
                        format!("row {} cell {} continues nothing", r, c),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Preserved nodes between rows
    pub(crate) fn unknown_nodes(&self) -> impl Iterator<Item = &RawXmlNode> {
        self.unknown.iter().map(|(_, node)| node)
    }

    /// Write to XML writer
    pub fn write_to<W: std::io::Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        writer.write_event(Event::Start(BytesStart::new("w:tbl")))?;

        self.properties.write_to(writer)?;

        writer.write_event(Event::Start(BytesStart::new("w:tblGrid")))?;
        for col in &self.grid {
            let mut elem = BytesStart::new("w:gridCol");
            if let Some(w) = col.width {
                elem.push_attribute(("w:w", w.to_string().as_str()));
            }
            writer.write_event(Event::Empty(elem))?;
        }
        writer.write_event(Event::End(BytesEnd::new("w:tblGrid")))?;

        for (i, row) in self.rows.iter().enumerate() {
            for (pos, node) in &self.unknown {
                if *pos == i {
                    node.write_to(writer)?;
                }
            }
            row.write_to(writer)?;
        }
        for (pos, node) in &self.unknown {
            if *pos >= self.rows.len() {
                node.write_to(writer)?;
            }
        }

        writer.write_event(Event::End(BytesEnd::new("w:tbl")))?;
        Ok(())
    }
}

impl TableProperties {
    /// Whether no property is set
    pub fn is_empty(&self) -> bool {
        self.style.is_none()
            && self.width.is_none()
            && self.alignment.is_none()
            && self.unknown_children.is_empty()
    }

    /// Table style ID (`w:tblStyle`)
    pub fn style(&self) -> Option<&str> {
        self.style.as_deref()
    }

    /// Preferred width (`w:tblW`)
    pub fn width(&self) -> Option<TableWidth> {
        self.width
    }

    /// Alignment (`w:jc`)
    pub fn alignment(&self) -> Option<TableAlignment> {
        self.alignment
    }

    /// Parse from reader (after w:tblPr start tag)
    pub fn from_reader<R: BufRead>(reader: &mut Reader<R>) -> Result<Self> {
        let mut props = TableProperties::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => props.read_child(reader, &e, false)?,
                Event::Empty(e) => props.read_child(reader, &e, true)?,
                Event::End(e) if e.name().local_name().as_ref() == b"tblPr" => break,
                Event::Eof => return Err(unexpected_eof("w:tblPr")),
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
            b"tblStyle" => get_w_val(e).map(|v| self.style = Some(v)).is_some(),
            b"tblW" => TableWidth::parse(e).map(|w| self.width = Some(w)).is_some(),
            b"jc" => get_w_val(e)
                .and_then(|v| TableAlignment::parse(&v))
                .map(|v| self.alignment = Some(v))
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

        writer.write_event(Event::Start(BytesStart::new("w:tblPr")))?;
        write_in_order(writer, TBLPR_ORDER, &self.unknown_children, |w, slot| {
            match slot {
                "tblStyle" => {
                    if let Some(style) = &self.style {
                        write_val(w, "w:tblStyle", style)?;
                    }
                }
                "tblW" => {
                    if let Some(width) = &self.width {
                        let (value, kind) = width.attributes();
                        let mut elem = BytesStart::new("w:tblW");
                        elem.push_attribute(("w:w", value.as_str()));
                        elem.push_attribute(("w:type", kind));
                        w.write_event(Event::Empty(elem))?;
                    }
                }
                "jc" => {
                    if let Some(alignment) = self.alignment {
                        write_val(w, "w:jc", alignment.as_str())?;
                    }
                }
                _ => {}
            }
            Ok(())
        })?;
        writer.write_event(Event::End(BytesEnd::new("w:tblPr")))?;
        Ok(())
    }
}

/// Parse table grid
fn parse_table_grid<R: BufRead>(reader: &mut Reader<R>) -> Result<Vec<GridColumn>> {
    let mut columns = Vec::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Empty(e) if e.name().local_name().as_ref() == b"gridCol" => {
                let width = get_w_attr(&e, "w").and_then(|v| v.parse().ok());
                columns.push(GridColumn { width });
            }
            Event::Start(e) if e.name().local_name().as_ref() == b"gridCol" => {
                let width = get_w_attr(&e, "w").and_then(|v| v.parse().ok());
                finish_element(reader, &e, false)?;
                columns.push(GridColumn { width });
            }
            Event::Start(e) => {
                log::warn!("dropping unexpected {} in w:tblGrid", xml::element_name(&e));
                finish_element(reader, &e, false)?;
            }
            Event::End(e) if e.name().local_name().as_ref() == b"tblGrid" => break,
            Event::Eof => return Err(unexpected_eof("w:tblGrid")),
            _ => {}
        }
        buf.clear();
    }

    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::reader_from_str;
    use pretty_assertions::assert_eq;

    fn parse(xml: &str) -> Table {
        let mut reader = reader_from_str(xml);
        let mut buf = Vec::new();
        loop {
            if let Event::Start(e) = reader.read_event_into(&mut buf).unwrap() {
                let e = e.into_owned();
                return Table::from_reader(&mut reader, &e).unwrap();
            }
            buf.clear();
        }
    }

    fn write(table: &Table) -> String {
        let mut out = Vec::new();
        table.write_to(&mut Writer::new(&mut out)).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_new_table_markup() {
        let table = Table::new(1, 2);
        assert_eq!(
            write(&table),
            concat!(
                r#"<w:tbl><w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr>"#,
                r#"<w:tblGrid><w:gridCol w:w="4680"/><w:gridCol w:w="4680"/></w:tblGrid>"#,
                r#"<w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr></w:tbl>"#
            )
        );
    }

    #[test]
    fn test_merge_sets_spans() {
        let mut table = Table::from_data(&[
            &["a", "b", "c"][..],
            &["d", "e", "f"][..],
            &["g", "h", "i"][..],
        ]);
        table.merge(0, 0, 2, 2).unwrap();

        let anchor = table.cell(0, 0).unwrap();
        assert_eq!(anchor.span(), CellSpan { colspan: 2, rowspan: 2 });
        assert_eq!(anchor.text(), "a\nb\nd\ne");
        assert_eq!(table.row(0).unwrap().cell_count(), 2);
        assert!(table.cell(1, 0).unwrap().is_v_merge_continue());
        assert_eq!(table.cell(1, 0).unwrap().span().rowspan, 0);
        table.validate().unwrap();

        // Re-reading computes the same spans
        let reparsed = parse(&write(&table));
        assert_eq!(reparsed.cell(0, 0).unwrap().span().rowspan, 2);
    }

    #[test]
    fn test_merge_rejects_out_of_bounds_and_overlap() {
        let mut table = Table::new(2, 2);
        assert!(table.merge(1, 0, 1, 2).is_err());
        assert!(table.merge(0, 1, 2, 1).is_err());
        table.merge(0, 0, 2, 1).unwrap();
        let err = table.merge(0, 0, 1, 2).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
    }

    #[test]
    fn test_column_ops_refuse_merged_tables() {
        let mut table = Table::new(2, 3);
        table.add_column().unwrap();
        assert_eq!(table.column_count(), 4);
        table.remove_column(0).unwrap();
        assert_eq!(table.column_count(), 3);

        table.merge(0, 0, 2, 1).unwrap();
        assert!(table.add_column().is_err());
        assert!(table.remove_column(0).is_err());
    }

    #[test]
    fn test_grid_mismatch_fails_validation() {
        let table = parse(concat!(
            r#"<w:tbl><w:tblGrid><w:gridCol w:w="100"/><w:gridCol w:w="100"/></w:tblGrid>"#,
            r#"<w:tr><w:tc><w:p/></w:tc></w:tr></w:tbl>"#
        ));
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_skipped_grid_columns_count_toward_row_width() {
        let table = parse(concat!(
            r#"<w:tbl><w:tblGrid><w:gridCol w:w="100"/><w:gridCol w:w="100"/><w:gridCol w:w="100"/></w:tblGrid>"#,
            r#"<w:tr><w:tc><w:p/></w:tc><w:tc><w:tcPr><w:vMerge w:val="restart"/></w:tcPr><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>"#,
            r#"<w:tr><w:trPr><w:gridBefore w:val="1"/></w:trPr>"#,
            r#"<w:tc><w:tcPr><w:vMerge/></w:tcPr><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>"#,
            r#"<w:tr><w:trPr><w:gridAfter w:val="2"/></w:trPr><w:tc><w:p/></w:tc></w:tr>"#,
            r#"</w:tbl>"#
        ));
        let row = table.row(1).unwrap();
        assert_eq!(row.grid_before(), 1);
        assert_eq!(table.row(2).unwrap().grid_after(), 2);
        table.validate().unwrap();

        // The continuation in row 1 sits under the merge origin in column 1
        assert_eq!(table.cell(0, 1).unwrap().span().rowspan, 2);
        assert_eq!(table.cell(0, 0).unwrap().span().rowspan, 1);
    }

    #[test]
    fn test_column_ops_refuse_rows_with_skipped_columns() {
        let mut table = parse(concat!(
            r#"<w:tbl><w:tblGrid><w:gridCol w:w="100"/><w:gridCol w:w="100"/></w:tblGrid>"#,
            r#"<w:tr><w:tc><w:p/></w:tc><w:tc><w:p/></w:tc></w:tr>"#,
            r#"<w:tr><w:trPr><w:gridBefore w:val="1"/></w:trPr><w:tc><w:p/></w:tc></w:tr>"#,
            r#"</w:tbl>"#
        ));
        assert!(table.add_column().is_err());
        assert!(table.remove_column(0).is_err());
    }

    #[test]
    fn test_unknown_table_content_round_trips() {
        let xml = concat!(
            r#"<w:tbl><w:tblPr><w:tblStyle w:val="TableGrid"/><w:tblW w:w="5000" w:type="pct"/><w:tblLook w:val="04A0"/></w:tblPr>"#,
            r#"<w:tblGrid><w:gridCol w:w="9360"/></w:tblGrid>"#,
            r#"<w:tr w:rsidR="001"><w:trPr><w:tblHeader/></w:trPr><w:tc><w:tcPr><w:tcW w:w="9360" w:type="dxa"/><w:shd w:val="clear" w:fill="EEEEEE"/></w:tcPr><w:p><w:r><w:t>x</w:t></w:r></w:p></w:tc></w:tr>"#,
            r#"<w:bookmarkEnd w:id="0"/></w:tbl>"#
        );
        assert_eq!(write(&parse(xml)), xml);
    }
}
