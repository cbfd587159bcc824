//! Rebuild a [`Document`] from a loaded package
//!
//! The package has already been checked for its manifest, package
//! relationships and main document part. Here every part the model
//! understands is parsed, the managers are filled and every ID counter is
//! moved past the highest value found, so new content never collides with
//! what the file already holds.

use crate::document::body::{walk_blocks, Visit};
use crate::document::{
    CoreProperties, Document, DocumentPart, HeaderFooter, HeaderFooterKind, ParagraphContent,
    RunContent, StyleManager,
};
use crate::error::{Error, Result};
use crate::ids::{IdManager, IdNamespace};
use crate::opc::{rel_types, well_known, Package, Part, PartUri, Relationships, TargetMode};
use crate::xml::RawXmlNode;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Turn a package into a live document; any failure discards everything
pub(crate) fn load(mut package: Package) -> Result<Document> {
    let root = PartUri::package_root();
    let root_rels = package.relationships().clone();
    let main_part = package.main_document_uri()?;

    log::debug!("parsing {}", main_part);
    let main = package
        .take_part(&main_part)
        .ok_or_else(|| Error::Structure(format!("main document part {}", main_part)))?;
    let part = DocumentPart::parse(main.data_as_str()?)?;
    let (_, main_rels) = main.into_data();
    let main_rels = main_rels.unwrap_or_default();

    let styles_part = target_of(&main_rels, &main_part, rel_types::STYLES);
    let styles = match styles_part.as_ref().and_then(|uri| package.take_part(uri)) {
        Some(styles) => {
            log::debug!("parsing {}", styles.uri());
            StyleManager::parse(styles.data_as_str()?)?
        }
        None => {
            log::warn!("package has no styles part, using built-in styles");
            StyleManager::new()
        }
    };

    let core_part = target_of(&root_rels, &root, rel_types::CORE_PROPERTIES);
    let core = match core_part.as_ref().and_then(|uri| package.take_part(uri)) {
        Some(core) => {
            log::debug!("parsing {}", core.uri());
            CoreProperties::parse(core.data_as_str()?)?
        }
        None => CoreProperties::new(),
    };

    let ids = Arc::new(IdManager::new());
    let mut doc = Document::empty(Arc::clone(&ids), main_part.clone(), styles, core);
    doc.part = part;
    doc.registry.load(root.clone(), root_rels);
    doc.registry.load(main_part.clone(), main_rels);

    match styles_part {
        Some(uri) => doc.styles_part = uri,
        None => link(&mut doc, &main_part, well_known::styles(), rel_types::STYLES)?,
    }
    match core_part {
        Some(uri) => doc.core_part = uri,
        None => link(&mut doc, &root, well_known::core_props(), rel_types::CORE_PROPERTIES)?,
    }
    load_app_properties(&mut doc, &package)?;

    load_headers_footers(&mut doc, &mut package)?;
    load_media(&mut doc, &mut package);

    doc.preserved = package.into_parts();
    for uri in doc.preserved.keys() {
        if let Some(n) = media_number(uri) {
            ids.initialize_from(&IdNamespace::Media, n);
        }
    }

    reseed_content_ids(&doc);
    warn_dangling(&doc);
    log::debug!(
        "document ready: {} blocks, {} sections, {} preserved parts",
        doc.blocks().len(),
        doc.sections().len(),
        doc.preserved.len()
    );
    Ok(doc)
}

/// Part behind the first internal relationship of a type
fn target_of(rels: &Relationships, source: &PartUri, rel_type: &str) -> Option<PartUri> {
    let rel = rels.by_type(rel_type)?;
    if rel.target_mode == TargetMode::External {
        return None;
    }
    source.resolve(&rel.target).ok()
}

/// Relationship to a part the package was missing and that will be generated
fn link(doc: &mut Document, source: &PartUri, target: PartUri, rel_type: &str) -> Result<()> {
    let relative = source.relative_target(&target);
    doc.registry
        .register(source, &relative, rel_type, TargetMode::Internal)?;
    Ok(())
}

/// Keep an existing docProps/app.xml as a preserved part, or plan a generated one
fn load_app_properties(doc: &mut Document, package: &Package) -> Result<()> {
    let root = PartUri::package_root();
    let existing = doc
        .registry
        .get(&root)
        .and_then(|rels| target_of(rels, &root, rel_types::EXTENDED_PROPERTIES));

    match existing {
        Some(uri) if package.part(&uri).is_some() => doc.app_part = None,
        Some(uri) => {
            log::warn!("extended properties part {} is missing, generating one", uri);
            doc.app_part = Some(uri);
        }
        None => link(doc, &root, well_known::app_props(), rel_types::EXTENDED_PROPERTIES)?,
    }
    Ok(())
}

fn load_headers_footers(doc: &mut Document, package: &mut Package) -> Result<()> {
    let rels: Vec<_> = match doc.registry.get(&doc.main_part) {
        Some(table) => table
            .iter()
            .filter(|rel| rel.target_mode == TargetMode::Internal)
            .filter_map(|rel| {
                let kind = match rel.rel_type.as_str() {
                    rel_types::HEADER => HeaderFooterKind::Header,
                    rel_types::FOOTER => HeaderFooterKind::Footer,
                    _ => return None,
                };
                Some((kind, rel.id.clone(), rel.target.clone()))
            })
            .collect(),
        None => Vec::new(),
    };

    for (kind, rel_id, target) in rels {
        let uri = doc.main_part.resolve(&target)?;
        let part = match package.take_part(&uri) {
            Some(part) => part,
            None => continue,
        };
        log::debug!("parsing {}", uri);
        let hf = HeaderFooter::parse(kind, uri.clone(), rel_id, part.data_as_str()?)?;
        let (_, rels) = part.into_data();

        doc.registry.declare_part(uri.clone());
        if let Some(rels) = rels {
            doc.registry.load(uri.clone(), rels);
        }
        let (namespace, prefix) = match kind {
            HeaderFooterKind::Header => (IdNamespace::Header, "header"),
            HeaderFooterKind::Footer => (IdNamespace::Footer, "footer"),
        };
        if let Some(n) = part_number(&uri, prefix) {
            doc.ids.initialize_from(&namespace, n);
        }
        doc.headers_footers.push(hf);
    }
    Ok(())
}

/// Hand every image referenced from the document or its headers and footers
/// to the media manager
fn load_media(doc: &mut Document, package: &mut Package) {
    let mut sources = vec![doc.main_part.clone()];
    sources.extend(doc.headers_footers.iter().map(|hf| hf.part().clone()));

    for source in sources {
        let images: Vec<_> = match doc.registry.get(&source) {
            Some(table) => table
                .all_by_type(rel_types::IMAGE)
                .into_iter()
                .filter(|rel| rel.target_mode == TargetMode::Internal)
                .map(|rel| (rel.id.clone(), rel.target.clone()))
                .collect(),
            None => continue,
        };

        for (rel_id, target) in images {
            let uri = match source.resolve(&target) {
                Ok(uri) => uri,
                Err(_) => continue,
            };
            if doc.media.bind(&uri, &source, &rel_id) {
                continue;
            }
            let part = match package.take_part(&uri) {
                Some(part) => part,
                None => continue,
            };
            let content_type = part.content_type().to_string();
            let (data, rels) = part.into_data();
            match doc.media.load(uri.clone(), data) {
                Ok(id) => {
                    log::debug!("loaded media {} as {}", uri, id);
                    doc.media.bind(&uri, &source, &rel_id);
                }
                Err(data) => {
                    // Not an image format we manage; keep it verbatim
                    let mut part = Part::new(uri.clone(), content_type, data);
                    if let Some(rels) = rels {
                        part.set_relationships(rels);
                    }
                    doc.preserved.insert(uri, part);
                }
            }
        }
    }
}

/// `N` of `{prefix}N.ext`
fn part_number(uri: &PartUri, prefix: &str) -> Option<u64> {
    let stem = uri.file_name()?.split('.').next()?;
    stem.strip_prefix(prefix)?.parse().ok()
}

fn media_number(uri: &PartUri) -> Option<u64> {
    if uri.as_str().starts_with("/word/media/") {
        part_number(uri, "image")
    } else {
        None
    }
}

/// Move the bookmark and drawing counters past every ID in the content
fn reseed_content_ids(doc: &Document) {
    let mut bookmarks = 0;
    let mut drawings = 0;

    let mut observe = |visit: Visit<'_>| {
        let inline = match visit {
            Visit::Paragraph(p) => p.content(),
            Visit::Hyperlink(link) => link.content(),
            Visit::Run(run) => {
                for content in run.content() {
                    if let RunContent::Drawing(drawing) = content {
                        drawings = drawings.max(drawing.id());
                    }
                }
                return;
            }
            Visit::Raw(node) => {
                scan_raw(node, &mut bookmarks, &mut drawings);
                return;
            }
            Visit::Field(_) | Visit::Table(_) => return,
        };
        for item in inline {
            if let ParagraphContent::BookmarkStart { id, .. } = item {
                bookmarks = bookmarks.max(*id);
            }
        }
    };

    walk_blocks(doc.part.body.blocks(), &mut observe);
    for hf in &doc.headers_footers {
        hf.walk(&mut observe);
    }

    doc.ids.initialize_from(&IdNamespace::Bookmark, bookmarks);
    doc.ids.initialize_from(&IdNamespace::Drawing, drawings);
    log::debug!("reseeded bookmark ids to {}, drawing ids to {}", bookmarks, drawings);
}

fn scan_raw(node: &RawXmlNode, bookmarks: &mut u64, drawings: &mut u64) {
    let elem = match node.as_element() {
        Some(elem) => elem,
        None => return,
    };
    elem.visit(&mut |e| {
        let (counter, attr) = match e.local_name() {
            "bookmarkStart" => (&mut *bookmarks, "w:id"),
            "docPr" => (&mut *drawings, "id"),
            _ => return,
        };
        if let Some(id) = e.attr(attr).and_then(|v| v.parse::<u64>().ok()) {
            *counter = (*counter).max(id);
        }
    });
}

/// Internal relationships whose target is not in the package survive the
/// open but will make the next save fail
fn warn_dangling(doc: &Document) {
    let mut present: BTreeSet<&PartUri> = doc.preserved.keys().collect();
    present.insert(&doc.main_part);
    present.insert(&doc.styles_part);
    present.insert(&doc.core_part);
    present.extend(doc.app_part.as_ref());
    present.extend(doc.headers_footers.iter().map(|hf| hf.part()));
    present.extend(doc.media.assets().iter().map(|a| a.part()));

    for (source, table) in doc.registry.parts() {
        for rel in table.iter().filter(|r| r.target_mode == TargetMode::Internal) {
            let found = source
                .resolve(&rel.target)
                .map(|uri| present.contains(&uri))
                .unwrap_or(false);
            if !found {
                log::warn!(
                    "{} in {} points at missing part {}",
                    rel.id,
                    source,
                    rel.target
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const CONTENT_TYPES: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Default Extension="png" ContentType="image/png"/>"#,
        r#"<Override PartName="/word/document.xml" "#,
        r#"ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"</Types>"#
    );

    const PACKAGE_RELS: &str = concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId1" "#,
        r#"Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" "#,
        r#"Target="word/document.xml"/>"#,
        r#"</Relationships>"#
    );

    fn package(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn document_xml(body: &str) -> String {
        format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
                r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
                r#"<w:body>{}</w:body></w:document>"#
            ),
            body
        )
    }

    fn minimal(body: &str) -> Vec<u8> {
        let doc = document_xml(body);
        package(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", doc.as_bytes()),
        ])
    }

    #[test]
    fn test_minimal_package_gets_generated_parts() {
        let doc = Document::from_bytes(&minimal("<w:p><w:r><w:t>Hi</w:t></w:r></w:p>")).unwrap();
        assert_eq!(doc.text(), "Hi");
        assert!(doc.styles().contains("Normal"));
        assert!(doc.core_properties().created().is_some());
        assert_eq!(doc.app_part, Some(well_known::app_props()));

        let root = doc.relationships().get(&PartUri::package_root()).unwrap();
        assert!(root.by_type(rel_types::CORE_PROPERTIES).is_some());
        let main = doc.relationships().get(doc.main_part()).unwrap();
        assert_eq!(main.by_type(rel_types::STYLES).unwrap().target, "styles.xml");
    }

    #[test]
    fn test_counters_are_reseeded() {
        let body = concat!(
            r#"<w:p><w:bookmarkStart w:id="7" w:name="a"/><w:r><w:t>x</w:t></w:r><w:bookmarkEnd w:id="7"/></w:p>"#,
            r#"<w:p><w:r><w:drawing><wp:inline><wp:docPr id="12" name="Picture 12"/></wp:inline></w:drawing></w:r></w:p>"#,
            r#"<w:p><w:ins w:id="1"><w:bookmarkStart w:id="9" w:name="b"/></w:ins></w:p>"#
        );
        let doc = Document::from_bytes(&minimal(body)).unwrap();
        assert_eq!(doc.ids().next_id(&IdNamespace::Bookmark), 10);
        assert_eq!(doc.ids().next_id(&IdNamespace::Drawing), 13);

        // rId1 is the generated styles relationship
        let main = doc.main_part().clone();
        assert_eq!(doc.ids().next_id(&IdNamespace::Relationship(main)), 2);
    }

    #[test]
    fn test_missing_parts_are_structure_errors() {
        let doc = document_xml("<w:p/>");
        let no_manifest = package(&[
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
            ("word/document.xml", doc.as_bytes()),
        ]);
        assert_eq!(Document::from_bytes(&no_manifest).unwrap_err().kind(), ErrorKind::Structure);

        let no_main = package(&[
            ("[Content_Types].xml", CONTENT_TYPES.as_bytes()),
            ("_rels/.rels", PACKAGE_RELS.as_bytes()),
        ]);
        assert_eq!(Document::from_bytes(&no_main).unwrap_err().kind(), ErrorKind::Structure);
    }

    #[test]
    fn test_malformed_document_is_a_parse_error() {
        let bad = minimal("<w:p><w:r><w:t>unclosed</w:r></w:p>");
        assert_eq!(Document::from_bytes(&bad).unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_not_a_zip_is_a_package_error() {
        let err = Document::from_bytes(b"definitely not a zip archive").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Package);
    }

    #[test]
    fn test_part_number() {
        assert_eq!(part_number(&well_known::header(3), "header"), Some(3));
        assert_eq!(part_number(&well_known::footer(2), "header"), None);
        assert_eq!(media_number(&well_known::media(4, "png")), Some(4));
    }
}
