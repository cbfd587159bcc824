//! Document model - high-level API for DOCX documents

mod body;
mod drawing;
mod field;
mod header_footer;
mod media;
mod paragraph;
mod properties;
mod reader;
mod run;
mod section;
mod serialize;
mod styles;
mod table;
mod validate;
mod writer;

pub use body::{Block, Body};
pub use drawing::{Drawing, EMU_PER_INCH, EMU_PER_PIXEL};
pub use field::{Field, FieldKind, HyperlinkField, StyleRefField, TocField};
pub use header_footer::{HeaderFooter, HeaderFooterKind, HeaderFooterType};
pub use media::{ImageFormat, MediaAsset, MediaManager};
pub use paragraph::{
    Alignment, Hyperlink, Indentation, LineRule, Paragraph, ParagraphContent, ParagraphProperties,
    Spacing,
};
pub use properties::CoreProperties;
pub use run::{BreakType, FieldCharType, Run, RunContent, RunProperties, VerticalAlign};
pub use section::{HeaderFooterRef, Orientation, PageMargins, Section, SectionBreak};
pub use serialize::DocumentPart;
pub use styles::{EffectiveProperties, Style, StyleManager, StyleType};
pub use table::{
    CellSpan, GridColumn, Table, TableAlignment, TableCell, TableCellProperties, TableProperties,
    TableRow, TableWidth, VMerge, VerticalAlignment,
};

use crate::error::{Error, Result};
use crate::ids::{IdManager, IdNamespace};
use crate::opc::{
    rel_types, well_known, Package, PackageLimits, Part, PartUri, RelationshipRegistry,
    SaveOptions, TargetMode,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use std::sync::Arc;

/// A DOCX document
///
/// Owns the content model together with every manager that hands out IDs,
/// relationships, media and styles for it. Nothing is shared between
/// documents.
#[derive(Debug)]
pub struct Document {
    ids: Arc<IdManager>,
    registry: RelationshipRegistry,
    media: MediaManager,
    styles: StyleManager,
    core: CoreProperties,
    /// word/document.xml content
    part: DocumentPart,
    headers_footers: Vec<HeaderFooter>,
    main_part: PartUri,
    styles_part: PartUri,
    core_part: PartUri,
    /// Where a generated docProps/app.xml goes; `None` when the package
    /// brought its own (kept in `preserved`)
    app_part: Option<PartUri>,
    /// Parts read from a package that the model does not interpret
    preserved: BTreeMap<PartUri, Part>,
}

impl Document {
    /// Create a new empty document with the built-in styles and one section
    pub fn new() -> Self {
        let ids = Arc::new(IdManager::new());
        let mut doc = Self::empty(ids, well_known::document(), StyleManager::new(), CoreProperties::new());
        doc.link_required_parts();
        doc
    }

    /// Shell shared by [`Document::new`] and the reader
    fn empty(
        ids: Arc<IdManager>,
        main_part: PartUri,
        styles: StyleManager,
        core: CoreProperties,
    ) -> Self {
        let mut registry = RelationshipRegistry::new(Arc::clone(&ids));
        registry.declare_part(PartUri::package_root());
        registry.declare_part(main_part.clone());
        Self {
            media: MediaManager::new(Arc::clone(&ids)),
            registry,
            ids,
            styles,
            core,
            part: DocumentPart::default(),
            headers_footers: Vec::new(),
            main_part,
            styles_part: well_known::styles(),
            core_part: well_known::core_props(),
            app_part: Some(well_known::app_props()),
            preserved: BTreeMap::new(),
        }
    }

    /// Register the fixed relationships of a new package
    fn link_required_parts(&mut self) {
        let root = PartUri::package_root();
        let fixed = [
            (&root, well_known::document(), rel_types::OFFICE_DOCUMENT),
            (&root, well_known::core_props(), rel_types::CORE_PROPERTIES),
            (&root, well_known::app_props(), rel_types::EXTENDED_PROPERTIES),
            (&self.main_part, well_known::styles(), rel_types::STYLES),
        ];
        for (source, target, rel_type) in fixed {
            let target = source.relative_target(&target);
            if let Err(err) = self.registry.register(source, &target, rel_type, TargetMode::Internal) {
                unreachable!("fixed relationship {} rejected: {}", target, err);
            }
        }
    }

    /// Open a document from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        reader::load(Package::open(path)?)
    }

    /// Open a document from a file path with explicit size limits
    pub fn open_with<P: AsRef<Path>>(path: P, limits: &PackageLimits) -> Result<Self> {
        reader::load(Package::open_with(path, limits)?)
    }

    /// Open a document from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        reader::load(Package::from_bytes(bytes)?)
    }

    /// Open a document from any seekable reader
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        reader::load(Package::from_reader_with(reader, &PackageLimits::default())?)
    }

    /// Save the document to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with(path, &SaveOptions::default())
    }

    /// Save the document to a file with explicit options
    pub fn save_with<P: AsRef<Path>>(&self, path: P, options: &SaveOptions) -> Result<()> {
        // A failed check leaves nothing behind
        writer::check(self)?;
        let path = path.as_ref();
        let file = File::create(path)?;
        let written = writer::write_checked(self, BufWriter::new(file), options)
            .and_then(|mut out| out.flush().map_err(Error::from));
        if let Err(err) = written {
            log::warn!("removing partially written {}: {}", path.display(), err);
            let _ = std::fs::remove_file(path);
            return Err(err);
        }
        Ok(())
    }

    /// Write the package to any seekable sink
    pub fn write_to<W: Write + Seek>(&self, sink: W) -> Result<W> {
        writer::write(self, sink, &SaveOptions::default())
    }

    /// Save the document to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Check every invariant the writer relies on; the first violation is returned
    pub fn validate(&self) -> Result<()> {
        validate::validate_document(self)
    }

    /// Get all paragraphs
    pub fn paragraphs(&self) -> impl Iterator<Item = &Paragraph> {
        self.part.body.paragraphs()
    }

    /// Get all paragraphs mutably
    pub fn paragraphs_mut(&mut self) -> impl Iterator<Item = &mut Paragraph> {
        self.part.body.paragraphs_mut()
    }

    /// Get paragraph count
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs().count()
    }

    /// Get paragraph by index
    pub fn paragraph(&self, index: usize) -> Option<&Paragraph> {
        self.part.body.paragraphs().nth(index)
    }

    /// Get paragraph by index, mutably
    pub fn paragraph_mut(&mut self, index: usize) -> Option<&mut Paragraph> {
        self.part.body.paragraphs_mut().nth(index)
    }

    /// Get all tables
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.part.body.tables()
    }

    /// Get table count
    pub fn table_count(&self) -> usize {
        self.tables().count()
    }

    /// Get table by index
    pub fn table(&self, index: usize) -> Option<&Table> {
        self.part.body.tables().nth(index)
    }

    /// Get table by index, mutably
    pub fn table_mut(&mut self, index: usize) -> Option<&mut Table> {
        self.part.body.tables_mut().nth(index)
    }

    /// Block-level content in document order
    pub fn blocks(&self) -> &[Block] {
        self.part.body.blocks()
    }

    /// Get all text in the document
    pub fn text(&self) -> String {
        self.paragraphs()
            .map(|p| p.text())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Add a paragraph with text
    pub fn add_paragraph(&mut self, text: impl Into<String>) -> &mut Paragraph {
        self.part.body.add_paragraph(Paragraph::new(text))
    }

    /// Add an empty paragraph
    pub fn add_empty_paragraph(&mut self) -> &mut Paragraph {
        self.part.body.add_paragraph(Paragraph::default())
    }

    /// Append an already built paragraph
    pub fn push_paragraph(&mut self, paragraph: Paragraph) -> &mut Paragraph {
        self.part.body.add_paragraph(paragraph)
    }

    /// Add a table with `rows` x `cols` empty cells
    pub fn add_table(&mut self, rows: usize, cols: usize) -> &mut Table {
        self.part.body.add_table(Table::new(rows, cols))
    }

    /// Append an already built table
    pub fn push_table(&mut self, table: Table) -> &mut Table {
        self.part.body.add_table(table)
    }

    /// Sections in document order
    pub fn sections(&self) -> &[Section] {
        self.part.body.sections()
    }

    /// Section by index, mutably
    pub fn section_mut(&mut self, index: usize) -> Option<&mut Section> {
        self.part.body.sections.get_mut(index)
    }

    /// End the current section after the last block and start a new one
    pub fn add_section(&mut self, break_type: SectionBreak) -> &mut Section {
        self.part.body.add_section(break_type)
    }

    /// Header and footer parts
    pub fn headers_footers(&self) -> &[HeaderFooter] {
        &self.headers_footers
    }

    /// Header of a section, if one of the given type is attached
    pub fn header(&self, section: usize, hf_type: HeaderFooterType) -> Option<&HeaderFooter> {
        let rel_id = self.sections().get(section)?.header_reference(hf_type)?;
        self.find_header_footer(HeaderFooterKind::Header, rel_id)
    }

    /// Footer of a section, if one of the given type is attached
    pub fn footer(&self, section: usize, hf_type: HeaderFooterType) -> Option<&HeaderFooter> {
        let rel_id = self.sections().get(section)?.footer_reference(hf_type)?;
        self.find_header_footer(HeaderFooterKind::Footer, rel_id)
    }

    fn find_header_footer(&self, kind: HeaderFooterKind, rel_id: &str) -> Option<&HeaderFooter> {
        self.headers_footers
            .iter()
            .find(|hf| hf.kind() == kind && hf.rel_id() == rel_id)
    }

    /// Attach a header to a section, creating its part.
    ///
    /// Returns the existing header when the section already has one of this type.
    pub fn add_header(&mut self, section: usize, hf_type: HeaderFooterType) -> Result<&mut HeaderFooter> {
        self.add_header_footer(HeaderFooterKind::Header, section, hf_type)
    }

    /// Attach a footer to a section, creating its part.
    ///
    /// Returns the existing footer when the section already has one of this type.
    pub fn add_footer(&mut self, section: usize, hf_type: HeaderFooterType) -> Result<&mut HeaderFooter> {
        self.add_header_footer(HeaderFooterKind::Footer, section, hf_type)
    }

    fn add_header_footer(
        &mut self,
        kind: HeaderFooterKind,
        section: usize,
        hf_type: HeaderFooterType,
    ) -> Result<&mut HeaderFooter> {
        let current = self
            .sections()
            .get(section)
            .ok_or_else(|| Error::NotFound(format!("section {}", section)))?;
        let existing = current
            .references()
            .iter()
            .find(|r| r.kind == kind && r.hf_type == hf_type)
            .map(|r| r.rel_id.clone());
        if let Some(index) = existing.and_then(|rel_id| {
            self.headers_footers
                .iter()
                .position(|hf| hf.kind() == kind && hf.rel_id() == rel_id)
        }) {
            return Ok(&mut self.headers_footers[index]);
        }

        let (namespace, rel_type) = match kind {
            HeaderFooterKind::Header => (IdNamespace::Header, rel_types::HEADER),
            HeaderFooterKind::Footer => (IdNamespace::Footer, rel_types::FOOTER),
        };
        let part = loop {
            let n = self.ids.next_id(&namespace);
            let candidate = match kind {
                HeaderFooterKind::Header => well_known::header(n),
                HeaderFooterKind::Footer => well_known::footer(n),
            };
            if !self.preserved.contains_key(&candidate) {
                break candidate;
            }
        };

        let target = self.main_part.relative_target(&part);
        let rel_id = self
            .registry
            .register(&self.main_part, &target, rel_type, TargetMode::Internal)?;
        self.registry.declare_part(part.clone());

        let sect = &mut self.part.body.sections[section];
        sect.set_reference(kind, hf_type, rel_id.clone());
        if hf_type == HeaderFooterType::First {
            sect.set_title_page(true);
        }
        log::debug!("added {} as {}", part, rel_id);

        self.headers_footers.push(HeaderFooter::new(kind, part, rel_id));
        match self.headers_footers.last_mut() {
            Some(hf) => Ok(hf),
            None => unreachable!("just pushed a header or footer"),
        }
    }

    /// Embed an image for use in `part` and build an inline drawing of
    /// `cx` x `cy` EMUs for it.
    ///
    /// The drawing still has to be placed in a run of that part.
    pub fn new_picture(
        &mut self,
        part: &PartUri,
        data: Vec<u8>,
        filename: &str,
        cx: u64,
        cy: u64,
    ) -> Result<Drawing> {
        validate::check_emu("new_picture", "cx", cx)?;
        validate::check_emu("new_picture", "cy", cy)?;
        let (_, rel_id) = self.media.embed(&mut self.registry, part, data, filename)?;
        let id = self.ids.next_id(&IdNamespace::Drawing);
        Ok(Drawing::new(rel_id, id, cx, cy)?.with_description(filename))
    }

    /// Add a paragraph holding one inline picture
    pub fn add_picture(
        &mut self,
        data: Vec<u8>,
        filename: &str,
        cx: u64,
        cy: u64,
    ) -> Result<&mut Paragraph> {
        let main = self.main_part.clone();
        let drawing = self.new_picture(&main, data, filename, cx, cy)?;
        let para = self.add_empty_paragraph();
        para.add_run(Run::with_content(RunContent::Drawing(drawing)));
        Ok(para)
    }

    /// Register an external link from `part` and build a hyperlink for it
    pub fn new_hyperlink(
        &mut self,
        part: &PartUri,
        url: &str,
        text: impl Into<String>,
    ) -> Result<Hyperlink> {
        let rel_id = self
            .registry
            .register(part, url, rel_types::HYPERLINK, TargetMode::External)?;
        Ok(Hyperlink::external(rel_id, text))
    }

    /// Wrap the content of a body paragraph in a bookmark, returning its ID
    pub fn add_bookmark(&mut self, paragraph: usize, name: impl Into<String>) -> Result<u64> {
        let id = self.ids.next_id(&IdNamespace::Bookmark);
        let para = self
            .part
            .body
            .paragraphs_mut()
            .nth(paragraph)
            .ok_or_else(|| Error::NotFound(format!("paragraph {}", paragraph)))?;
        para.content_mut().insert(
            0,
            ParagraphContent::BookmarkStart {
                id,
                name: name.into(),
            },
        );
        para.add_bookmark_end(id);
        Ok(id)
    }

    /// Name of the main document part (normally `/word/document.xml`)
    pub fn main_part(&self) -> &PartUri {
        &self.main_part
    }

    /// The shared ID allocator
    pub fn ids(&self) -> &Arc<IdManager> {
        &self.ids
    }

    /// Relationship tables of every part
    pub fn relationships(&self) -> &RelationshipRegistry {
        &self.registry
    }

    /// Register a relationship from a declared part
    pub fn register_relationship(
        &mut self,
        part: &PartUri,
        target: &str,
        rel_type: &str,
        mode: TargetMode,
    ) -> Result<String> {
        self.registry.register(part, target, rel_type, mode)
    }

    /// Embedded media
    pub fn media(&self) -> &MediaManager {
        &self.media
    }

    /// Style definitions
    pub fn styles(&self) -> &StyleManager {
        &self.styles
    }

    /// Mutable style definitions
    pub fn styles_mut(&mut self) -> &mut StyleManager {
        &mut self.styles
    }

    /// Core properties (`docProps/core.xml`)
    pub fn core_properties(&self) -> &CoreProperties {
        &self.core
    }

    /// Mutable core properties
    pub fn core_properties_mut(&mut self) -> &mut CoreProperties {
        &mut self.core
    }

    /// Parts kept verbatim from the package this document was opened from
    pub fn preserved_parts(&self) -> impl Iterator<Item = &Part> {
        self.preserved.values()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];

    #[test]
    fn test_new_document_links_required_parts() {
        let doc = Document::new();
        let root = doc.relationships().get(&PartUri::package_root()).unwrap();
        assert_eq!(root.by_type(rel_types::OFFICE_DOCUMENT).unwrap().target, "word/document.xml");
        assert_eq!(root.by_type(rel_types::CORE_PROPERTIES).unwrap().target, "docProps/core.xml");
        let main = doc.relationships().get(doc.main_part()).unwrap();
        assert_eq!(main.by_type(rel_types::STYLES).unwrap().target, "styles.xml");
        assert_eq!(doc.sections().len(), 1);
        assert!(doc.styles().contains("Normal"));
        doc.validate().unwrap();
    }

    #[test]
    fn test_add_paragraph() {
        let mut doc = Document::new();
        doc.add_paragraph("Hello").add_text(" World");
        doc.add_empty_paragraph();
        assert_eq!(doc.paragraph_count(), 2);
        assert_eq!(doc.text(), "Hello World\n");
    }

    #[test]
    fn test_first_header_sets_title_page() {
        let mut doc = Document::new();
        doc.add_header(0, HeaderFooterType::First)
            .unwrap()
            .add_paragraph(Paragraph::new("Cover"));
        let rel_id = doc.sections()[0].header_reference(HeaderFooterType::First).unwrap().to_string();
        assert!(doc.sections()[0].title_page());
        assert_eq!(doc.header(0, HeaderFooterType::First).unwrap().text(), "Cover");

        // Same slot again returns the same part
        let again = doc.add_header(0, HeaderFooterType::First).unwrap();
        assert_eq!(again.rel_id(), rel_id);
        assert_eq!(doc.headers_footers().len(), 1);

        let err = doc.add_footer(3, HeaderFooterType::Default).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_header_and_footer_parts_are_numbered_separately() {
        let mut doc = Document::new();
        let header = doc.add_header(0, HeaderFooterType::Default).unwrap().part().clone();
        let footer = doc.add_footer(0, HeaderFooterType::Default).unwrap().part().clone();
        assert_eq!(header, well_known::header(1));
        assert_eq!(footer, well_known::footer(1));
    }

    #[test]
    fn test_picture_dedup_reuses_relationship() {
        let mut doc = Document::new();
        doc.add_picture(PNG.to_vec(), "a.png", 914_400, 914_400).unwrap();
        doc.add_picture(PNG.to_vec(), "b.png", 457_200, 457_200).unwrap();
        assert_eq!(doc.media().assets().len(), 1);

        let drawings: Vec<_> = doc
            .paragraphs()
            .flat_map(|p| p.runs())
            .flat_map(|r| r.content())
            .filter_map(|c| match c {
                RunContent::Drawing(d) => Some(d),
                _ => None,
            })
            .collect();
        assert_eq!(drawings.len(), 2);
        assert_eq!(drawings[0].rel_id(), drawings[1].rel_id());
        assert!(drawings[0].id() < drawings[1].id());
    }

    #[test]
    fn test_picture_rejects_bad_extent_and_format() {
        let mut doc = Document::new();
        let err = doc.add_picture(PNG.to_vec(), "a.png", 0, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(doc.media().assets().is_empty());

        let err = doc.add_picture(b"plain text".to_vec(), "a.txt", 10, 10).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_bookmark_ids_are_distinct() {
        let mut doc = Document::new();
        doc.add_paragraph("one");
        doc.add_paragraph("two");
        let a = doc.add_bookmark(0, "first").unwrap();
        let b = doc.add_bookmark(1, "second").unwrap();
        assert!(b > a);
        assert!(matches!(
            doc.paragraph(0).unwrap().content().first(),
            Some(ParagraphContent::BookmarkStart { id, .. }) if *id == a
        ));
        assert_eq!(doc.add_bookmark(5, "x").unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_hyperlink_is_external() {
        let mut doc = Document::new();
        let main = doc.main_part().clone();
        let link = doc.new_hyperlink(&main, "https://example.com/", "site").unwrap();
        let rel = doc.relationships().resolve(&main, link.rel_id().unwrap()).unwrap();
        assert_eq!(rel.target_mode, TargetMode::External);
        doc.add_empty_paragraph().add_hyperlink(link);
        doc.validate().unwrap();
    }
}
