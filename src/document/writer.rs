//! Write a [`Document`] as a package
//!
//! Every entry is planned first, then each internal relationship target is
//! checked against the plan, and only then are parts streamed into the
//! archive.

use crate::document::properties::write_app_properties;
use crate::document::{Document, HeaderFooterKind};
use crate::error::{Error, Result};
use crate::opc::{
    ContentTypes, PackageWriter, PartUri, Relationships, SaveOptions, TargetMode,
    CORE_PROPERTIES, EXTENDED_PROPERTIES, FOOTER, HEADER, MAIN_DOCUMENT, STYLES,
};
use std::collections::BTreeSet;
use std::io::{Seek, Write};

/// One part the archive will contain
struct Entry<'a> {
    uri: &'a PartUri,
    content_type: &'a str,
}

/// Validate, plan and write `doc` into `sink`
pub(crate) fn write<W: Write + Seek>(doc: &Document, sink: W, options: &SaveOptions) -> Result<W> {
    check(doc)?;
    write_checked(doc, sink, options)
}

/// Every check that can fail before the first byte is written
pub(crate) fn check(doc: &Document) -> Result<()> {
    doc.validate()?;
    check_targets(doc, &plan(doc))
}

/// Write a document that already passed [`check`]
pub(crate) fn write_checked<W: Write + Seek>(doc: &Document, sink: W, options: &SaveOptions) -> Result<W> {
    let plan = plan(doc);
    let manifest = manifest(doc, &plan);

    let mut out = PackageWriter::new(sink, options);
    out.write_content_types(&manifest)?;
    write_rels(&mut out, doc, &PartUri::package_root())?;

    out.write_xml_part(&doc.main_part, |w| doc.part.write_to(w))?;
    write_rels(&mut out, doc, &doc.main_part)?;

    out.write_xml_part(&doc.styles_part, |w| doc.styles.write_to(w))?;
    write_rels(&mut out, doc, &doc.styles_part)?;

    for hf in &doc.headers_footers {
        out.write_xml_part(hf.part(), |w| hf.write_to(w))?;
        write_rels(&mut out, doc, hf.part())?;
    }

    for asset in doc.media.assets() {
        out.write_bytes(asset.part(), asset.data())?;
    }

    out.write_xml_part(&doc.core_part, |w| doc.core.write_to(w))?;
    if let Some(app) = &doc.app_part {
        out.write_xml_part(app, |w| write_app_properties(w))?;
    }

    for part in doc.preserved.values() {
        out.write_bytes(part.uri(), part.data())?;
        if let Some(rels) = part.relationships().filter(|r| !r.is_empty()) {
            out.write_relationships(part.uri(), rels)?;
        }
    }

    log::debug!("wrote {} entries", out.written().len());
    out.finish()
}

fn write_rels<W: Write + Seek>(out: &mut PackageWriter<W>, doc: &Document, source: &PartUri) -> Result<()> {
    match doc.registry.get(source) {
        Some(rels) if !rels.is_empty() => out.write_relationships(source, rels),
        _ => Ok(()),
    }
}

/// Every part in write order, `.rels` and the manifest excluded
fn plan(doc: &Document) -> Vec<Entry<'_>> {
    let mut plan = vec![
        Entry {
            uri: &doc.main_part,
            content_type: MAIN_DOCUMENT,
        },
        Entry {
            uri: &doc.styles_part,
            content_type: STYLES,
        },
    ];
    plan.extend(doc.headers_footers.iter().map(|hf| Entry {
        uri: hf.part(),
        content_type: match hf.kind() {
            HeaderFooterKind::Header => HEADER,
            HeaderFooterKind::Footer => FOOTER,
        },
    }));
    plan.extend(doc.media.assets().iter().map(|asset| Entry {
        uri: asset.part(),
        content_type: asset.format().mime_type(),
    }));
    plan.push(Entry {
        uri: &doc.core_part,
        content_type: CORE_PROPERTIES,
    });
    if let Some(app) = &doc.app_part {
        plan.push(Entry {
            uri: app,
            content_type: EXTENDED_PROPERTIES,
        });
    }
    plan.extend(doc.preserved.values().map(|part| Entry {
        uri: part.uri(),
        content_type: part.content_type(),
    }));
    plan
}

/// Every internal relationship of every written `.rels` must land on a planned part
fn check_targets(doc: &Document, plan: &[Entry<'_>]) -> Result<()> {
    let planned: BTreeSet<&PartUri> = plan.iter().map(|e| e.uri).collect();

    let mut sources = vec![PartUri::package_root(), doc.main_part.clone(), doc.styles_part.clone()];
    sources.extend(doc.headers_footers.iter().map(|hf| hf.part().clone()));
    for source in &sources {
        if let Some(rels) = doc.registry.get(source) {
            check_table(source, rels, &planned)?;
        }
    }
    for part in doc.preserved.values() {
        if let Some(rels) = part.relationships() {
            check_table(part.uri(), rels, &planned)?;
        }
    }
    Ok(())
}

fn check_table(source: &PartUri, rels: &Relationships, planned: &BTreeSet<&PartUri>) -> Result<()> {
    for rel in rels.iter().filter(|r| r.target_mode == TargetMode::Internal) {
        let target = source.resolve(&rel.target)?;
        if !planned.contains(&target) {
            return Err(Error::Relationship(format!(
                "{} in {} targets {}, which is not part of the package",
                rel.id, source, target
            )));
        }
    }
    Ok(())
}

/// Manifest for exactly the planned parts: one default per media extension,
/// overrides for everything the defaults do not already describe
fn manifest(doc: &Document, plan: &[Entry<'_>]) -> ContentTypes {
    let mut manifest = ContentTypes::new();
    for (ext, content_type) in doc.media.extensions() {
        manifest.add_default(&ext, content_type);
    }

    for entry in plan {
        if manifest.get(entry.uri) == Some(entry.content_type) {
            continue;
        }
        match entry.uri.extension() {
            Some(ext) if manifest.default_for(ext).is_none() => {
                manifest.add_default(ext, entry.content_type)
            }
            _ => manifest.add_override(entry.uri, entry.content_type),
        }
    }
    manifest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Drawing, HeaderFooterType, Paragraph, Run, RunContent};
    use crate::error::ErrorKind;
    use crate::opc::{rel_types, well_known, Package};
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Read};
    use zip::ZipArchive;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3, 4];

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_new_document_entries_in_order() {
        let mut doc = Document::new();
        doc.add_paragraph("Hello");
        let names = entry_names(doc.to_bytes().unwrap());
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "word/document.xml",
                "word/_rels/document.xml.rels",
                "word/styles.xml",
                "docProps/core.xml",
                "docProps/app.xml",
            ]
        );
    }

    #[test]
    fn test_manifest_covers_written_parts() {
        let mut doc = Document::new();
        doc.add_picture(PNG.to_vec(), "logo.png", 100, 100).unwrap();
        doc.add_footer(0, HeaderFooterType::Default)
            .unwrap()
            .add_paragraph(Paragraph::new("page"));
        let bytes = doc.to_bytes().unwrap();

        let manifest = ContentTypes::from_xml(&read_entry(&bytes, "[Content_Types].xml")).unwrap();
        assert_eq!(manifest.default_for("png"), Some("image/png"));
        assert!(!manifest.has_override(&well_known::media(1, "png")));
        assert_eq!(manifest.get(&well_known::footer(1)), Some(FOOTER));
        assert_eq!(manifest.get(&well_known::document()), Some(MAIN_DOCUMENT));
        assert_eq!(manifest.get(&well_known::core_props()), Some(CORE_PROPERTIES));
        // Nothing that was not written
        assert!(!manifest.has_override(&well_known::header(1)));
    }

    #[test]
    fn test_unregistered_drawing_fails_before_writing() {
        let mut doc = Document::new();
        let drawing = Drawing::new("rId99", 1, 914_400, 914_400).unwrap();
        doc.add_empty_paragraph()
            .add_run(Run::with_content(RunContent::Drawing(drawing)));

        let err = doc.to_bytes().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Relationship);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        assert_eq!(doc.save(&path).unwrap_err().kind(), ErrorKind::Relationship);
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_internal_target_is_rejected() {
        let mut doc = Document::new();
        let main = doc.main_part().clone();
        doc.register_relationship(&main, "theme/theme1.xml", rel_types::STYLES, TargetMode::Internal)
            .unwrap();
        let err = doc.to_bytes().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Relationship);
        assert!(err.to_string().contains("/word/theme/theme1.xml"));

        // Saving to a path fails the same way without creating the file
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dangling.docx");
        assert_eq!(doc.save(&path).unwrap_err().kind(), ErrorKind::Relationship);
        assert!(!path.exists());
    }

    #[test]
    fn test_saved_package_reloads() {
        let mut doc = Document::new();
        doc.add_paragraph("Hello");
        let bytes = doc.to_bytes().unwrap();
        let package = Package::from_bytes(&bytes).unwrap();
        assert_eq!(package.main_document_uri().unwrap(), well_known::document());
        let rels = package.part(&well_known::document()).unwrap().relationships().unwrap();
        assert!(rels.by_type(rel_types::STYLES).is_some());
    }
}
