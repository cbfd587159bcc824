//! Streaming ZIP writer for OPC packages

use crate::error::{Error, Result};
use crate::opc::{well_known, ContentTypes, PartUri, Relationships};
use quick_xml::events::{BytesDecl, Event};
use quick_xml::Writer;
use std::collections::BTreeSet;
use std::io::{Seek, Write};
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Options applied when saving a package
#[derive(Clone, Debug)]
pub struct SaveOptions {
    /// Compression used for every entry
    pub compression: CompressionMethod,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            compression: CompressionMethod::Deflated,
        }
    }
}

/// Writes parts one at a time straight into ZIP entries
pub struct PackageWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    written: BTreeSet<PartUri>,
}

impl<W: Write + Seek> PackageWriter<W> {
    /// Start a new archive
    pub fn new(inner: W, options: &SaveOptions) -> Self {
        Self {
            zip: ZipWriter::new(inner),
            options: SimpleFileOptions::default().compression_method(options.compression),
            written: BTreeSet::new(),
        }
    }

    fn start(&mut self, uri: &PartUri) -> Result<()> {
        if !self.written.insert(uri.clone()) {
            return Err(Error::Structure(format!("part {} written twice", uri)));
        }
        log::debug!("writing {}", uri);
        self.zip.start_file(uri.zip_name(), self.options)?;
        Ok(())
    }

    /// Write an XML part: the declaration is emitted, then `body` streams the root element
    pub fn write_xml_part<F>(&mut self, uri: &PartUri, body: F) -> Result<()>
    where
        F: FnOnce(&mut Writer<&mut ZipWriter<W>>) -> Result<()>,
    {
        self.start(uri)?;
        let mut xml = Writer::new(&mut self.zip);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        body(&mut xml)
    }

    /// Write a part verbatim
    pub fn write_bytes(&mut self, uri: &PartUri, data: &[u8]) -> Result<()> {
        self.start(uri)?;
        self.zip.write_all(data)?;
        Ok(())
    }

    /// Write the `.rels` part of `source`
    pub fn write_relationships(&mut self, source: &PartUri, rels: &Relationships) -> Result<()> {
        let uri = source.relationships_uri();
        self.start(&uri)?;
        rels.write_to(&mut self.zip)
    }

    /// Write `[Content_Types].xml`
    pub fn write_content_types(&mut self, content_types: &ContentTypes) -> Result<()> {
        self.start(&well_known::content_types())?;
        content_types.write_to(&mut self.zip)
    }

    /// Entries written so far
    pub fn written(&self) -> &BTreeSet<PartUri> {
        &self.written
    }

    /// Finish the central directory and hand back the sink
    pub fn finish(self) -> Result<W> {
        Ok(self.zip.finish()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opc::{rel_types, TargetMode};
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    #[test]
    fn test_entries_are_streamed() {
        let mut writer = PackageWriter::new(Cursor::new(Vec::new()), &SaveOptions::default());
        let doc = well_known::document();
        writer
            .write_xml_part(&doc, |xml| {
                xml.write_event(Event::Empty(quick_xml::events::BytesStart::new("w:document")))?;
                Ok(())
            })
            .unwrap();

        let mut rels = Relationships::new();
        rels.add_with_id("rId1", rel_types::OFFICE_DOCUMENT, "word/document.xml", TargetMode::Internal)
            .unwrap();
        writer
            .write_relationships(&PartUri::package_root(), &rels)
            .unwrap();
        assert_eq!(writer.written().len(), 2);

        let bytes = writer.finish().unwrap().into_inner();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert!(content.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>"));
        assert!(content.ends_with("<w:document/>"));
        assert!(archive.by_name("_rels/.rels").is_ok());
    }

    #[test]
    fn test_duplicate_entry_is_rejected() {
        let mut writer = PackageWriter::new(Cursor::new(Vec::new()), &SaveOptions::default());
        let uri = well_known::media(1, "png");
        writer.write_bytes(&uri, b"abc").unwrap();
        assert!(writer.write_bytes(&uri, b"abc").is_err());
    }
}
