//! OPC Package implementation
//!
//! Loads a DOCX file as a ZIP package: every entry is read (within the
//! configured limits), the manifest and package relationships are parsed, and
//! each part is paired with its `.rels` table.

use crate::error::{Error, Result};
use crate::opc::relationships::rel_types;
use crate::opc::{ContentTypes, Part, PartUri, Relationships};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use zip::read::ZipArchive;

/// Largest single part accepted when reading
pub const MAX_PART_BYTES: u64 = 256 * 1024 * 1024; // 256 MiB

/// Largest total uncompressed size accepted when reading
pub const MAX_TOTAL_BYTES: u64 = 512 * 1024 * 1024; // 512 MiB

/// Size limits enforced while loading a package
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackageLimits {
    /// Maximum uncompressed size of one entry
    pub max_part_bytes: u64,
    /// Maximum uncompressed size of all entries together
    pub max_total_bytes: u64,
}

impl Default for PackageLimits {
    fn default() -> Self {
        Self {
            max_part_bytes: MAX_PART_BYTES,
            max_total_bytes: MAX_TOTAL_BYTES,
        }
    }
}

/// A loaded OPC package (ZIP-based container)
#[derive(Debug)]
pub struct Package {
    /// All parts except the manifest and `.rels` files
    parts: BTreeMap<PartUri, Part>,
    /// Package-level relationships (/_rels/.rels)
    relationships: Relationships,
    /// Content types ([Content_Types].xml)
    content_types: ContentTypes,
}

impl Package {
    /// Open a package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, &PackageLimits::default())
    }

    /// Open a package from a file path with explicit limits
    pub fn open_with<P: AsRef<Path>>(path: P, limits: &PackageLimits) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader_with(BufReader::new(file), limits)
    }

    /// Open a package from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::from_reader_with(Cursor::new(bytes), &PackageLimits::default())
    }

    /// Open a package from a reader
    pub fn from_reader_with<R: Read + Seek>(reader: R, limits: &PackageLimits) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;
        let entries = read_entries(&mut archive, limits)?;
        Self::from_entries(entries)
    }

    fn from_entries(mut entries: BTreeMap<String, Vec<u8>>) -> Result<Self> {
        let content_types = match entries.remove("[Content_Types].xml") {
            Some(data) => ContentTypes::from_xml(std::str::from_utf8(&data)?)?,
            None => return Err(Error::Structure("[Content_Types].xml".into())),
        };

        let relationships = match entries.remove("_rels/.rels") {
            Some(data) => Relationships::from_xml(std::str::from_utf8(&data)?)?,
            None => return Err(Error::Structure("_rels/.rels".into())),
        };

        let mut rels_entries = BTreeMap::new();
        let mut parts = BTreeMap::new();
        for (name, data) in entries {
            let uri = PartUri::new(&name)?;
            if uri.is_relationships() {
                rels_entries.insert(uri, data);
                continue;
            }
            let content_type = content_types
                .get(&uri)
                .unwrap_or("application/octet-stream")
                .to_string();
            parts.insert(uri.clone(), Part::new(uri, content_type, data));
        }

        for (uri, part) in parts.iter_mut() {
            if let Some(data) = rels_entries.remove(&uri.relationships_uri()) {
                let rels = Relationships::from_xml(std::str::from_utf8(&data)?)?;
                part.set_relationships(rels);
            }
        }
        for orphan in rels_entries.keys() {
            log::warn!("dropping relationships {} with no source part", orphan);
        }

        let package = Self {
            parts,
            relationships,
            content_types,
        };

        let main = package.main_document_uri()?;
        if !package.parts.contains_key(&main) {
            return Err(Error::Structure(format!("main document part {}", main)));
        }

        log::debug!("loaded package with {} parts", package.parts.len());
        Ok(package)
    }

    /// URI of the main document part, from the officeDocument relationship
    pub fn main_document_uri(&self) -> Result<PartUri> {
        let rel = self
            .relationships
            .by_type(rel_types::OFFICE_DOCUMENT)
            .ok_or_else(|| Error::Structure("officeDocument relationship".into()))?;
        PartUri::package_root().resolve(&rel.target)
    }

    /// Get a part by URI
    pub fn part(&self, uri: &PartUri) -> Option<&Part> {
        self.parts.get(uri)
    }

    /// Remove a part, handing over ownership
    pub fn take_part(&mut self, uri: &PartUri) -> Option<Part> {
        self.parts.remove(uri)
    }

    /// Get all parts
    pub fn parts(&self) -> impl Iterator<Item = (&PartUri, &Part)> {
        self.parts.iter()
    }

    /// Consume the package, yielding its remaining parts
    pub fn into_parts(self) -> BTreeMap<PartUri, Part> {
        self.parts
    }

    /// Get package-level relationships
    pub fn relationships(&self) -> &Relationships {
        &self.relationships
    }

    /// Get content types
    pub fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }
}

/// Read every file entry, enforcing the per-part and total budgets
fn read_entries<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    limits: &PackageLimits,
) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut entries = BTreeMap::new();
    let mut total: u64 = 0;

    for i in 0..archive.len() {
        let file = archive.by_index(i)?;
        if file.is_dir() {
            continue;
        }
        let name = file.name().to_string();

        if file.size() > limits.max_part_bytes {
            return Err(Error::PackageLimit(format!(
                "{} is {} bytes (limit {})",
                name,
                file.size(),
                limits.max_part_bytes
            )));
        }

        // The declared size can lie, so never read past the limit
        let mut data = Vec::with_capacity(file.size() as usize);
        file.take(limits.max_part_bytes + 1).read_to_end(&mut data)?;
        let len = data.len() as u64;
        if len > limits.max_part_bytes {
            return Err(Error::PackageLimit(format!(
                "{} exceeds {} bytes",
                name, limits.max_part_bytes
            )));
        }

        total += len;
        if total > limits.max_total_bytes {
            return Err(Error::PackageLimit(format!(
                "package exceeds {} bytes",
                limits.max_total_bytes
            )));
        }

        entries.insert(name, data);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::opc::well_known;
    use std::io::Write;
    use zip::write::{SimpleFileOptions, ZipWriter};

    const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>
</Types>"#;

    const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>
</Relationships>"#;

    const DOCUMENT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>
</Relationships>"#;

    fn zip_of(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_load_minimal_package() {
        let bytes = zip_of(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", b"<w:document/>"),
            ("word/_rels/document.xml.rels", DOCUMENT_RELS.as_bytes()),
        ]);
        let pkg = Package::from_bytes(&bytes).unwrap();

        let main = pkg.main_document_uri().unwrap();
        assert_eq!(main, well_known::document());
        let part = pkg.part(&main).unwrap();
        assert_eq!(part.content_type(), crate::opc::MAIN_DOCUMENT);
        assert_eq!(part.relationships().unwrap().max_numeric_id(), 4);
    }

    #[test]
    fn test_missing_content_types_is_structure_error() {
        let bytes = zip_of(&[
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", b"<w:document/>"),
        ]);
        let err = Package::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_missing_main_document_is_structure_error() {
        let bytes = zip_of(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ]);
        let err = Package::from_bytes(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_not_a_zip_is_package_error() {
        let err = Package::from_bytes(b"definitely not a zip file").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Package);
    }

    #[test]
    fn test_part_limit_is_enforced() {
        let big = vec![b'x'; 4096];
        let bytes = zip_of(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", &big),
        ]);
        let limits = PackageLimits {
            max_part_bytes: 2048,
            max_total_bytes: MAX_TOTAL_BYTES,
        };
        let err = Package::from_reader_with(Cursor::new(bytes), &limits).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Package);
    }
}
