//! Integration test: open DOCX packages assembled in memory

use pretty_assertions::assert_eq;
use std::io::{Cursor, Read, Write};
use wordpack::document::{HeaderFooterType, RunContent};
use wordpack::opc::{rel_types, well_known, ContentTypes, Package, PackageLimits, TargetMode};
use wordpack::{Document, ErrorKind, IdNamespace, PartUri};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const SETTINGS_TYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";

const SETTINGS_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\r\n",
    r#"<w:settings xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
    r#"<w:zoom w:percent="120"/><w:defaultTabStop w:val="720"/></w:settings>"#
);

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 9, 9, 9, 9];

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn rels(items: &[(&str, &str, &str)]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="{}">"#,
        REL_NS
    );
    for (id, rel_type, target) in items {
        xml.push_str(&format!(
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id, rel_type, target
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types() -> String {
    concat!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
        r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
        r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
        r#"<Default Extension="xml" ContentType="application/xml"/>"#,
        r#"<Default Extension="png" ContentType="image/png"/>"#,
        r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
        r#"<Override PartName="/word/settings.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml"/>"#,
        r#"<Override PartName="/word/header3.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.header+xml"/>"#,
        r#"</Types>"#
    )
    .to_string()
}

/// A package the way a word processor would write it: settings, a header,
/// an image, a custom style reference and markup the model does not know
fn sample_package() -> Vec<u8> {
    let document = format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="{w}" xmlns:r="{r}" "#,
            r#"xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" "#,
            r#"xmlns:w14="http://schemas.microsoft.com/office/word/2010/wordml" mc:Ignorable="w14">"#,
            r#"<w:body>"#,
            r#"<w:p w14:paraId="1A2B3C4D"><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>"#,
            r#"<w:r><w:t>Chapter</w:t></w:r></w:p>"#,
            r#"<w:p><w:proofErr w:type="spellStart"/><w:r><w:t xml:space="preserve">Body </w:t></w:r>"#,
            r#"<w:proofErr w:type="spellEnd"/></w:p>"#,
            r#"<w:p><w:r><w:drawing><wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
            r#"<wp:extent cx="100" cy="100"/><wp:docPr id="5" name="Picture 5"/>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:blipFill><a:blip r:embed="rId4"/></pic:blipFill></pic:pic>"#,
            r#"</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"#,
            r#"<w:sectPr><w:headerReference w:type="default" r:id="rId3"/>"#,
            r#"<w:pgSz w:w="12240" w:h="15840"/><w:pgMar w:top="1440" w:right="1440" w:bottom="1440" "#,
            r#"w:left="1440" w:header="720" w:footer="720" w:gutter="0"/>"#,
            r#"<w:docGrid w:linePitch="360"/></w:sectPr>"#,
            r#"</w:body></w:document>"#
        ),
        w = W_NS,
        r = R_NS
    );
    let header = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="{}"><w:p><w:r><w:t>Running head</w:t></w:r></w:p></w:hdr>"#,
        W_NS
    );
    let package_rels = rels(&[(
        "rId1",
        rel_types::OFFICE_DOCUMENT,
        "word/document.xml",
    )]);
    let document_rels = rels(&[
        ("rId2", SETTINGS_TYPE, "settings.xml"),
        ("rId3", rel_types::HEADER, "header3.xml"),
        ("rId4", rel_types::IMAGE, "media/image2.png"),
    ]);

    zip(&[
        ("[Content_Types].xml", content_types().as_bytes()),
        ("_rels/.rels", package_rels.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("word/_rels/document.xml.rels", document_rels.as_bytes()),
        ("word/settings.xml", SETTINGS_XML.as_bytes()),
        ("word/header3.xml", header.as_bytes()),
        ("word/media/image2.png", PNG),
    ])
}

fn read_entry(bytes: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut out = Vec::new();
    archive.by_name(name).unwrap().read_to_end(&mut out).unwrap();
    out
}

#[test]
fn test_open_sample_package() {
    init_logging();
    let doc = Document::from_bytes(&sample_package()).unwrap();

    assert_eq!(doc.paragraph_count(), 3);
    assert_eq!(doc.paragraph(0).unwrap().text(), "Chapter");
    assert_eq!(doc.paragraph(1).unwrap().text(), "Body ");
    assert_eq!(doc.headers_footers().len(), 1);
    assert_eq!(
        doc.header(0, HeaderFooterType::Default).unwrap().text(),
        "Running head"
    );
    assert_eq!(doc.media().assets().len(), 1);
    assert_eq!(doc.preserved_parts().count(), 1);
    doc.validate().unwrap();
}

#[test]
fn test_paragraph_style_is_applied_on_open() {
    let doc = Document::from_bytes(&sample_package()).unwrap();
    let heading = doc.paragraph(0).unwrap();
    assert_eq!(heading.style(), Some("Heading1"));
    assert_eq!(heading.properties().style(), Some("Heading1"));
    assert!(heading.is_heading());

    // And it is still there after another save
    let doc2 = Document::from_bytes(&doc.to_bytes().unwrap()).unwrap();
    assert_eq!(doc2.paragraph(0).unwrap().style(), Some("Heading1"));
}

#[test]
fn test_unknown_content_is_preserved() {
    init_logging();
    let mut doc = Document::from_bytes(&sample_package()).unwrap();
    doc.paragraph_mut(1).unwrap().add_text("edited");
    let bytes = doc.to_bytes().unwrap();

    // Unmodeled part comes back byte for byte
    assert_eq!(read_entry(&bytes, "word/settings.xml"), SETTINGS_XML.as_bytes());
    assert_eq!(read_entry(&bytes, "word/media/image2.png"), PNG);

    let xml = String::from_utf8(read_entry(&bytes, "word/document.xml")).unwrap();
    assert!(xml.contains(r#"<w:proofErr w:type="spellStart"/>"#));
    assert!(xml.contains(r#"w14:paraId="1A2B3C4D""#));
    assert!(xml.contains(r#"mc:Ignorable="w14""#));
    assert!(xml.contains(r#"<a:blip r:embed="rId4"/>"#));
    assert!(xml.contains(r#"<w:docGrid w:linePitch="360"/>"#));

    let rels = String::from_utf8(read_entry(&bytes, "word/_rels/document.xml.rels")).unwrap();
    assert!(rels.contains(r#"Target="settings.xml""#));

    let doc2 = Document::from_bytes(&bytes).unwrap();
    assert_eq!(doc2.paragraph(1).unwrap().text(), "Body edited");
}

#[test]
fn test_counters_reseeded_after_open() {
    let mut doc = Document::from_bytes(&sample_package()).unwrap();
    assert!(doc.ids().current(&IdNamespace::Drawing) >= 5);
    assert!(doc.ids().current(&IdNamespace::Media) >= 2);

    let footer = doc.add_footer(0, HeaderFooterType::Default).unwrap().part().clone();
    assert_eq!(footer, well_known::footer(1));
    let header = doc.add_header(0, HeaderFooterType::Even).unwrap().part().clone();
    assert_eq!(header, well_known::header(4));

    // New relationships continue after rId4
    let main = doc.main_part().clone();
    let rel_id = doc
        .register_relationship(&main, "https://example.com", rel_types::HYPERLINK, TargetMode::External)
        .unwrap();
    let n: u64 = rel_id.trim_start_matches("rId").parse().unwrap();
    assert!(n > 4);

    let para = doc.add_picture(vec![0xFF, 0xD8, 0xFF, 0xE0, 1, 2], "photo.jpg", 200, 200).unwrap();
    let drawing = para
        .runs()
        .flat_map(|r| r.content())
        .find_map(|c| match c {
            RunContent::Drawing(d) => Some(d.clone()),
            _ => None,
        })
        .unwrap();
    assert!(drawing.id() > 5);
    let asset = doc.media().assets().last().unwrap();
    assert_eq!(asset.part(), &well_known::media(3, "jpg"));
    doc.validate().unwrap();
}

#[test]
fn test_same_image_is_stored_once() {
    let mut doc = Document::from_bytes(&sample_package()).unwrap();
    doc.add_picture(PNG.to_vec(), "again.png", 100, 100).unwrap();
    assert_eq!(doc.media().assets().len(), 1);
    let bindings = doc.media().assets()[0].bindings();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings[0].1, "rId4");
}

#[test]
fn test_manifest_is_generated_from_written_parts() {
    let mut doc = Document::from_bytes(&sample_package()).unwrap();
    doc.add_picture(vec![b'G', b'I', b'F', b'8', b'9', b'a', 0, 0], "anim.gif", 50, 50)
        .unwrap();
    let bytes = doc.to_bytes().unwrap();
    let manifest =
        ContentTypes::from_xml(std::str::from_utf8(&read_entry(&bytes, "[Content_Types].xml")).unwrap())
            .unwrap();

    assert_eq!(manifest.default_for("png"), Some("image/png"));
    assert_eq!(manifest.default_for("gif"), Some("image/gif"));
    assert_eq!(
        manifest.get(&PartUri::new("/word/settings.xml").unwrap()),
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml")
    );
    assert!(manifest.has_override(&well_known::header(3)));
    assert!(manifest.has_override(&well_known::styles()));
    assert!(manifest.has_override(&well_known::core_props()));
    assert!(manifest.has_override(&well_known::app_props()));
}

#[test]
fn test_dangling_relationship_fails_on_save() {
    init_logging();
    let document = format!(
        r#"<w:document xmlns:w="{}"><w:body><w:p/></w:body></w:document>"#,
        W_NS
    );
    let package_rels = rels(&[("rId1", rel_types::OFFICE_DOCUMENT, "word/document.xml")]);
    let document_rels = rels(&[("rId7", SETTINGS_TYPE, "settings.xml")]);
    let bytes = zip(&[
        ("[Content_Types].xml", content_types().as_bytes()),
        ("_rels/.rels", package_rels.as_bytes()),
        ("word/document.xml", document.as_bytes()),
        ("word/_rels/document.xml.rels", document_rels.as_bytes()),
    ]);

    let doc = Document::from_bytes(&bytes).expect("opens with a warning");
    assert_eq!(doc.to_bytes().unwrap_err().kind(), ErrorKind::Relationship);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dangling.docx");
    assert_eq!(doc.save(&path).unwrap_err().kind(), ErrorKind::Relationship);
    assert!(!path.exists());
}

/// A package holding only a main document with the given body markup
fn package_with_body(body: &str) -> Vec<u8> {
    let document = format!(
        r#"<w:document xmlns:w="{}"><w:body>{}</w:body></w:document>"#,
        W_NS, body
    );
    let package_rels = rels(&[("rId1", rel_types::OFFICE_DOCUMENT, "word/document.xml")]);
    zip(&[
        ("[Content_Types].xml", content_types().as_bytes()),
        ("_rels/.rels", package_rels.as_bytes()),
        ("word/document.xml", document.as_bytes()),
    ])
}

#[test]
fn test_rows_with_grid_before_save_again() {
    init_logging();
    let bytes = package_with_body(concat!(
        r#"<w:tbl><w:tblGrid><w:gridCol w:w="2000"/><w:gridCol w:w="2000"/></w:tblGrid>"#,
        r#"<w:tr><w:tc><w:p><w:r><w:t>a</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>b</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"<w:tr><w:trPr><w:gridBefore w:val="1"/></w:trPr><w:tc><w:p><w:r><w:t>c</w:t></w:r></w:p></w:tc></w:tr>"#,
        r#"</w:tbl><w:p/>"#
    ));

    let mut doc = Document::from_bytes(&bytes).unwrap();
    doc.add_paragraph("edited");
    let saved = doc.to_bytes().expect("row with gridBefore is valid");

    let xml = String::from_utf8(read_entry(&saved, "word/document.xml")).unwrap();
    assert!(xml.contains(r#"<w:gridBefore w:val="1"/>"#));
    let reopened = Document::from_bytes(&saved).unwrap();
    assert_eq!(reopened.table(0).unwrap().row(1).unwrap().grid_before(), 1);
}

#[test]
fn test_bad_packages() {
    let doc_xml = format!(
        r#"<w:document xmlns:w="{}"><w:body><w:p/></w:body></w:document>"#,
        W_NS
    );
    let package_rels = rels(&[("rId1", rel_types::OFFICE_DOCUMENT, "word/document.xml")]);

    // Not a ZIP at all
    assert_eq!(
        Document::from_bytes(b"PK but not really").unwrap_err().kind(),
        ErrorKind::Package
    );

    // No package relationships
    let bytes = zip(&[
        ("[Content_Types].xml", content_types().as_bytes()),
        ("word/document.xml", doc_xml.as_bytes()),
    ]);
    assert_eq!(Document::from_bytes(&bytes).unwrap_err().kind(), ErrorKind::Structure);

    // Truncated main document
    let bytes = zip(&[
        ("[Content_Types].xml", content_types().as_bytes()),
        ("_rels/.rels", package_rels.as_bytes()),
        ("word/document.xml", &doc_xml.as_bytes()[..40]),
    ]);
    assert_eq!(Document::from_bytes(&bytes).unwrap_err().kind(), ErrorKind::Parse);

    // Malformed header
    let document_rels = rels(&[("rId3", rel_types::HEADER, "header1.xml")]);
    let bytes = zip(&[
        ("[Content_Types].xml", content_types().as_bytes()),
        ("_rels/.rels", package_rels.as_bytes()),
        ("word/document.xml", doc_xml.as_bytes()),
        ("word/_rels/document.xml.rels", document_rels.as_bytes()),
        ("word/header1.xml", b"<w:hdr><w:p></w:hdr>"),
    ]);
    assert_eq!(Document::from_bytes(&bytes).unwrap_err().kind(), ErrorKind::Parse);
}

#[test]
fn test_part_size_limit() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.docx");
    std::fs::write(&path, sample_package()).unwrap();

    let limits = PackageLimits {
        max_part_bytes: 64,
        ..PackageLimits::default()
    };
    let err = Document::open_with(&path, &limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Package);

    assert!(Document::open(&path).is_ok());
}

#[test]
fn test_package_level_access() {
    let package = Package::from_bytes(&sample_package()).unwrap();
    assert_eq!(package.main_document_uri().unwrap(), well_known::document());
    let rels = package
        .part(&well_known::document())
        .unwrap()
        .relationships()
        .unwrap();
    assert_eq!(rels.len(), 3);
    assert!(package.part(&PartUri::new("/word/settings.xml").unwrap()).is_some());
}
