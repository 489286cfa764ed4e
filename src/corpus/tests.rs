use super::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn detects_supported_formats() {
    assert_eq!(
        detect_format(Path::new("ch01.txt")),
        Some(DocumentFormat::Text)
    );
    assert_eq!(
        detect_format(Path::new("ch01.md")),
        Some(DocumentFormat::Text)
    );
    assert_eq!(
        detect_format(Path::new("ch01.PDF")),
        Some(DocumentFormat::Pdf)
    );
    assert_eq!(
        detect_format(Path::new("ch01.docx")),
        Some(DocumentFormat::Docx)
    );
    assert_eq!(detect_format(Path::new("ch01.html")), None);
    assert_eq!(detect_format(Path::new("no_extension")), None);
}

#[test]
fn collects_supported_files_sorted() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let chapter_dir = temp_dir.path().join("part_two");
    fs::create_dir_all(&chapter_dir).expect("can create chapter dir");

    fs::write(temp_dir.path().join("b_chapter.txt"), "text").expect("can write");
    fs::write(temp_dir.path().join("a_chapter.md"), "text").expect("can write");
    fs::write(chapter_dir.join("c_chapter.txt"), "text").expect("can write");
    fs::write(temp_dir.path().join("notes.html"), "skip me").expect("can write");

    let files = collect_source_files(temp_dir.path()).expect("can collect files");
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().expect("has name").to_string_lossy().into_owned())
        .collect();

    assert_eq!(names, ["a_chapter.md", "b_chapter.txt", "c_chapter.txt"]);
}

#[test]
fn reads_text_document_with_source_identity() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let chapter_dir = temp_dir.path().join("part_one");
    fs::create_dir_all(&chapter_dir).expect("can create chapter dir");

    let path = chapter_dir.join("chapter_01.txt");
    fs::write(&path, "Chapter 1\nKinematics of rigid bodies.").expect("can write");

    let document = read_document(&path).expect("can read document");
    assert_eq!(document.format, DocumentFormat::Text);
    assert_eq!(document.file_name, "chapter_01.txt");
    assert_eq!(document.dir_name, "part_one");
    assert!(document.full_path.ends_with("chapter_01.txt"));
    assert!(document.text.starts_with("Chapter 1"));
}

#[test]
fn rejects_unsupported_extension() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let path = temp_dir.path().join("notes.html");
    fs::write(&path, "<html></html>").expect("can write");

    let result = read_document(&path);
    assert!(matches!(
        result,
        Err(crate::BookragError::InvalidInput(_))
    ));
}

#[test]
fn tolerates_invalid_utf8_in_text_files() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let path = temp_dir.path().join("mangled.txt");
    fs::write(&path, [b'C', b'h', 0xFF, b'p', b'1']).expect("can write");

    let document = read_document(&path).expect("lossy decode should succeed");
    assert!(document.text.contains('\u{FFFD}'));
}

#[test]
fn docx_paragraphs_become_blank_line_separated_text() {
    let xml = r#"<?xml version="1.0"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:body>
    <w:p><w:r><w:t>Chapter 1</w:t></w:r></w:p>
    <w:p><w:r><w:t>Robots move through </w:t></w:r><w:r><w:t>configuration space.</w:t></w:r></w:p>
    <w:p><w:r><w:t></w:t></w:r></w:p>
  </w:body>
</w:document>"#;

    let text = docx_xml_to_text(xml, Path::new("sample.docx")).expect("can parse docx xml");
    assert_eq!(
        text,
        "Chapter 1\n\nRobots move through configuration space."
    );
}

#[test]
fn malformed_docx_is_invalid_input() {
    let temp_dir = TempDir::new().expect("can create temp dir");
    let path = temp_dir.path().join("broken.docx");
    fs::write(&path, b"not a zip archive").expect("can write");

    let result = read_document(&path);
    assert!(matches!(
        result,
        Err(crate::BookragError::InvalidInput(_))
    ));
}
