//! Integration test: Document API

use pretty_assertions::assert_eq;
use wordpack::document::{
    Drawing, Field, HeaderFooterType, Orientation, ParagraphContent, RunContent, SectionBreak,
    Style, StyleType,
};
use wordpack::{Document, ErrorKind, IdNamespace, Run};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn reopen(doc: &Document) -> Document {
    let bytes = doc.to_bytes().expect("Should serialize");
    Document::from_bytes(&bytes).expect("Should deserialize")
}

#[test]
fn test_bold_run_survives_save() {
    init_logging();
    let mut doc = Document::new();
    let mut run = Run::new("Hello");
    run.set_bold(true);
    doc.add_empty_paragraph().add_run(run);

    let doc2 = reopen(&doc);
    let run = doc2.paragraph(0).unwrap().runs().next().unwrap();
    assert_eq!(run.text(), "Hello");
    assert!(run.bold());
}

#[test]
fn test_table_cell_text_survives_save() {
    let mut doc = Document::new();
    doc.add_table(2, 2).set_cell_text(1, 1, "X");

    let doc2 = reopen(&doc);
    let table = doc2.table(0).unwrap();
    assert_eq!(table.row_count(), 2);
    let cell = table.row(1).unwrap().cell(1).unwrap();
    assert_eq!(cell.paragraphs().next().unwrap().text(), "X");
}

#[test]
fn test_style_resolution_through_parent() {
    let mut doc = Document::new();
    doc.styles_mut()
        .get_style_mut("Normal")
        .unwrap()
        .run_properties_mut()
        .set_bold(false);

    let mut style = Style::paragraph("MyStyle", "My Style").based_on("Normal");
    style.run_properties_mut().set_bold(true);
    doc.styles_mut().add_style(style).unwrap();

    let effective = doc.styles().resolve("MyStyle").unwrap();
    assert_eq!(effective.run.bold(), Some(true));
}

#[test]
fn test_style_chain_inherits_from_root() {
    let mut doc = Document::new();
    let styles = doc.styles_mut();

    let mut a = Style::paragraph("A", "A");
    a.run_properties_mut().set_italic(true);
    styles.add_style(a).unwrap();
    styles.add_style(Style::paragraph("B", "B").based_on("A")).unwrap();
    styles.add_style(Style::paragraph("C", "C").based_on("B")).unwrap();

    assert_eq!(doc.styles().resolve("C").unwrap().run.italic(), Some(true));

    // And after a round trip
    let doc2 = reopen(&doc);
    assert_eq!(doc2.styles().resolve("C").unwrap().run.italic(), Some(true));
    assert_eq!(doc2.styles().get_style("C").unwrap().parent(), Some("B"));
}

#[test]
fn test_style_errors() {
    let mut doc = Document::new();
    let styles = doc.styles_mut();

    let err = styles
        .add_style(Style::paragraph("Orphan", "Orphan").based_on("Missing"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = styles.add_style(Style::paragraph("Normal", "Normal")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(styles.get_style("Nope").unwrap_err().kind(), ErrorKind::NotFound);
    assert!(styles.default_style(StyleType::Paragraph).is_some());
}

#[test]
fn test_two_sections_keep_orientation() {
    let mut doc = Document::new();
    doc.add_paragraph("Portrait page");
    doc.add_section(SectionBreak::NextPage)
        .set_orientation(Orientation::Landscape);
    doc.add_paragraph("Landscape page");

    let doc2 = reopen(&doc);
    let sections = doc2.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].orientation(), Orientation::Portrait);
    assert_eq!(sections[1].orientation(), Orientation::Landscape);
    assert_eq!(sections[1].break_type(), SectionBreak::NextPage);
    let (width, height) = sections[1].page_size();
    assert!(width > height);
    assert_eq!(doc2.text(), "Portrait page\nLandscape page");
}

#[test]
fn test_section_after_table_keeps_paragraph_list() {
    let mut doc = Document::new();
    doc.add_table(1, 2).set_cell_text(0, 0, "cell");
    doc.add_section(SectionBreak::NextPage);
    doc.add_paragraph("after");

    let doc2 = reopen(&doc);
    let texts = |d: &Document| d.paragraphs().map(|p| p.text()).collect::<Vec<_>>();
    assert_eq!(texts(&doc2), vec!["after".to_string()]);
    assert_eq!(texts(&doc2), texts(&doc));
    assert_eq!(doc2.blocks().len(), 2);
    assert_eq!(doc2.sections().len(), 2);
    assert_eq!(reopen(&doc2).blocks().len(), 2);
}

#[test]
fn test_unregistered_drawing_is_a_relationship_error() {
    let mut doc = Document::new();
    let drawing = Drawing::new("rId42", 1, 914_400, 914_400).unwrap();
    doc.add_empty_paragraph()
        .add_run(Run::with_content(RunContent::Drawing(drawing)));

    assert_eq!(doc.validate().unwrap_err().kind(), ErrorKind::Relationship);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.docx");
    assert_eq!(doc.save(&path).unwrap_err().kind(), ErrorKind::Relationship);
    assert!(!path.exists());
}

#[test]
fn test_roundtrip_is_idempotent() {
    init_logging();
    let mut doc = Document::new();
    doc.add_paragraph("Title").set_style("Title");
    doc.add_paragraph("Heading").set_style("Heading1");
    let para = doc.add_empty_paragraph();
    let mut run = Run::new("red ");
    run.set_color("FF0000").unwrap();
    run.set_size(28).unwrap();
    para.add_run(run);
    para.add_field(Field::page_number().with_result("1"));
    doc.add_table(2, 3).set_cell_text(0, 2, "corner");
    doc.add_footer(0, HeaderFooterType::Default)
        .unwrap()
        .add_paragraph(wordpack::Paragraph::new("footer"));

    let first = doc.to_bytes().unwrap();
    let doc2 = Document::from_bytes(&first).unwrap();

    let summary = |d: &Document| -> Vec<(String, Option<String>, Vec<(Option<bool>, Option<u32>, Option<String>)>)> {
        d.paragraphs()
            .map(|p| {
                let runs = p
                    .runs()
                    .map(|r| {
                        let props = r.properties();
                        (props.bold(), props.size(), props.color().map(String::from))
                    })
                    .collect();
                (p.text(), p.style().map(String::from), runs)
            })
            .collect()
    };
    assert_eq!(summary(&doc2), summary(&doc));

    // Saving the reopened document again changes nothing in the body
    let doc3 = reopen(&doc2);
    assert_eq!(summary(&doc3), summary(&doc2));
    assert_eq!(doc3.headers_footers().len(), 1);
    assert_eq!(
        doc3.footer(0, HeaderFooterType::Default).unwrap().text(),
        "footer"
    );
}

#[test]
fn test_ids_are_strictly_increasing() {
    let doc = Document::new();
    let ids: Vec<u64> = (0..100)
        .map(|_| doc.ids().next_id(&IdNamespace::Bookmark))
        .collect();
    assert!(ids.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn test_ids_from_many_threads_are_distinct() {
    let doc = Document::new();
    let ids = doc.ids().clone();
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let ids = ids.clone();
            std::thread::spawn(move || {
                (0..250)
                    .map(|_| ids.next_id(&IdNamespace::Drawing))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut all: Vec<u64> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), 1000);
}

#[test]
fn test_unformatted_content_has_no_empty_properties() {
    let mut doc = Document::new();
    doc.add_paragraph("plain");
    doc.add_table(1, 1);
    let bytes = doc.to_bytes().unwrap();

    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let mut xml = String::new();
    std::io::Read::read_to_string(&mut archive.by_name("word/document.xml").unwrap(), &mut xml)
        .unwrap();
    for empty in ["<w:rPr/>", "<w:rPr></w:rPr>", "<w:pPr/>", "<w:pPr></w:pPr>", "<w:tcPr/>", "<w:trPr/>"] {
        assert!(!xml.contains(empty), "found {} in {}", empty, xml);
    }
}

#[test]
fn test_field_is_five_runs() {
    let mut doc = Document::new();
    doc.add_empty_paragraph().add_field(Field::page_count().with_result("3"));

    let doc2 = reopen(&doc);
    let para = doc2.paragraph(0).unwrap();
    let field = para
        .content()
        .iter()
        .find_map(|c| match c {
            ParagraphContent::Field(f) => Some(f),
            _ => None,
        })
        .expect("field collapsed on read");
    assert_eq!(field.kind().instruction().trim(), "NUMPAGES");
    assert_eq!(field.result(), "3");
    assert_eq!(field.to_runs().len(), 5);
}

#[test]
fn test_save_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("test_output.docx");

    let mut doc = Document::new();
    doc.core_properties_mut().set_title("Test document");
    doc.add_paragraph("Test document created by wordpack");
    doc.add_paragraph("This is a test paragraph.");
    doc.save(&output_path).expect("Should save to file");

    let doc2 = Document::open(&output_path).expect("Should reopen");
    assert_eq!(doc2.paragraph_count(), 2);
    assert!(doc2.text().contains("Test document"));
    assert_eq!(doc2.core_properties().title(), Some("Test document"));
}
