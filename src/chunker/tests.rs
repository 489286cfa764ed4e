use super::*;

fn test_document(text: &str, format: DocumentFormat) -> Document {
    Document {
        text: text.to_string(),
        file_name: "chapter_01.txt".to_string(),
        dir_name: "part_one".to_string(),
        full_path: "/books/robotics/part_one/chapter_01.txt".to_string(),
        format,
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[test]
fn empty_input_produces_no_parts() {
    let patterns = boundary_patterns(DocumentFormat::Text);
    assert!(split_into_structural_parts("", &patterns).is_empty());
    assert!(split_into_structural_parts("   \n\n\t  ", &patterns).is_empty());
}

#[test]
fn empty_input_produces_no_chunks() {
    assert!(pack_by_structure("", 1000).is_empty());
    assert!(pack_by_structure("  \n \n ", 1000).is_empty());
}

#[test]
fn split_keeps_marker_with_following_text() {
    let text = "Chapter 1\nIntroduction to robot kinematics.\n\nChapter 2\nSensors and actuators.";
    let patterns = boundary_patterns(DocumentFormat::Text);

    let parts = split_into_structural_parts(text, &patterns);
    assert_eq!(parts.len(), 2);
    assert!(parts[0].starts_with("Chapter 1"));
    assert!(parts[1].starts_with("Chapter 2"));
}

#[test]
fn split_respects_pattern_priority() {
    // The markdown heading inside chapter 2 sub-divides only that chapter.
    let text = "Chapter 1\nFirst chapter body text.\n\nChapter 2\nSecond chapter intro.\n\n# Dynamics\nHeading-level body text.";
    let patterns = boundary_patterns(DocumentFormat::Text);

    let parts = split_into_structural_parts(text, &patterns);
    assert_eq!(parts.len(), 3);
    assert!(parts[0].starts_with("Chapter 1"));
    assert!(parts[1].starts_with("Chapter 2"));
    assert!(parts[2].starts_with("# Dynamics"));
}

#[test]
fn markdown_boundaries_excluded_for_extracted_text() {
    let text = "Chapter 1\nBody text.\n\n# Not a heading in extracted pdf text\nMore body.";

    let pdf_parts =
        split_into_structural_parts(text, &boundary_patterns(DocumentFormat::Pdf));
    assert_eq!(pdf_parts.len(), 1);

    let text_parts =
        split_into_structural_parts(text, &boundary_patterns(DocumentFormat::Text));
    assert_eq!(text_parts.len(), 2);
}

#[test]
fn pack_produces_only_nonempty_bounded_chunks() {
    let paragraph = "Forward kinematics maps joint angles to end effector pose. ";
    let text = paragraph.repeat(60);
    let max = 500;

    let chunks = pack_by_structure(&text, max);
    assert!(!chunks.is_empty());
    for chunk in &chunks {
        assert!(!chunk.trim().is_empty());
        let within_soft_bound = char_len(chunk.trim()) <= max * 3 / 2;
        let single_paragraph = !chunk.contains("\n\n");
        assert!(within_soft_bound || single_paragraph);
    }
}

#[test]
fn pack_flushes_before_heading_once_buffer_is_substantial() {
    let filler = "A paragraph of body text long enough to push the buffer well past the heading flush threshold of one hundred characters.";
    let text = format!("# Title\n\n{filler}\n\n# Title2\n\nAnother short paragraph.");

    // Size never the limiting factor.
    let chunks = pack_by_structure(&text, 100_000);
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].starts_with("# Title"));
    assert!(chunks[1].starts_with("# Title2"));
}

#[test]
fn pack_merges_heading_into_small_buffer() {
    let text = "# Title\n\nShort.\n\n# Title2\n\nAnother short paragraph.";

    // First buffer never exceeds 100 chars, so the second heading merges.
    let chunks = pack_by_structure(&text, 100_000);
    assert_eq!(chunks.len(), 1);
}

#[test]
fn pack_does_not_split_single_oversize_paragraph() {
    let text = "word ".repeat(500);
    let chunks = pack_by_structure(text.trim(), 100);

    assert_eq!(chunks.len(), 1);
    assert!(char_len(&chunks[0]) > 150);
}

#[test]
fn repack_oversize_is_idempotent_on_compliant_chunks() {
    let paragraph = "Inverse kinematics solves for joint angles given a target pose. ";
    let text = paragraph.repeat(40);
    let chunks = pack_by_structure(&text, 400);

    let repacked = repack_oversize(chunks.clone(), 400, 1.5);
    assert_eq!(chunks, repacked);
}

#[test]
fn repack_oversize_splits_on_paragraph_boundaries() {
    let paragraph = "Each paragraph here is around eighty characters of text about robot control. ";
    let oversize = vec![[paragraph; 8].join("\n\n")];

    let repacked = repack_oversize(oversize, 160, 1.5);
    assert!(repacked.len() > 1);
    for chunk in &repacked {
        assert!(char_len(chunk) <= 240 || !chunk.contains("\n\n"));
    }
}

#[test]
fn heading_predicates() {
    assert!(is_markdown_heading("# Overview"));
    assert!(is_markdown_heading("### Sub-section"));
    assert!(!is_markdown_heading("#no space"));
    assert!(!is_markdown_heading("plain text"));

    assert!(is_numbered_section("1.2 Forward Kinematics"));
    assert!(is_numbered_section("3 Actuators"));
    assert!(!is_numbered_section("1.2"));

    assert!(is_emphasis_wrapped_title("**Safety Considerations**"));
    assert!(is_emphasis_wrapped_title("__Terminology__"));
    assert!(!is_emphasis_wrapped_title("**unbalanced"));

    assert!(is_short_title_line("Learning objectives:"));
    assert!(!is_short_title_line("A normal sentence."));
    let long_line = format!("{}:", "x".repeat(120));
    assert!(!is_short_title_line(&long_line));
}

#[test]
fn build_chunks_end_to_end() {
    let text = "Chapter 1\nIntro text here that is definitely over fifty characters long.\n\nChapter 2\nMore intro text here that is also over fifty characters long.";
    let document = test_document(text, DocumentFormat::Text);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());

    assert_eq!(chunks.len(), 2);

    assert_eq!(chunks[0].part_index, 0);
    assert_eq!(chunks[0].sub_part_index, 0);
    assert_eq!(chunks[0].metadata.chapter, "1");
    assert_eq!(chunks[0].metadata.section, UNKNOWN_LABEL);

    assert_eq!(chunks[1].part_index, 1);
    assert_eq!(chunks[1].sub_part_index, 0);
    assert_eq!(chunks[1].metadata.chapter, "2");
    assert_eq!(chunks[1].metadata.section, UNKNOWN_LABEL);
}

#[test]
fn build_chunks_is_reproducible_modulo_ids() {
    let body = "The dynamics of a rigid body manipulator follow from the Euler-Lagrange equations. ";
    let text = format!(
        "Chapter 3\n{}\n\nSection 3.1\n{}",
        body.repeat(20),
        body.repeat(25)
    );
    let document = test_document(&text, DocumentFormat::Text);
    let config = ChunkerConfig::default();

    let first = build_chunks_for_document(&document, &config);
    let second = build_chunks_for_document(&document, &config);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.text, b.text);
        assert_eq!((a.part_index, a.sub_part_index), (b.part_index, b.sub_part_index));
        assert_eq!(a.metadata, b.metadata);
        assert_ne!(a.id, b.id, "ids carry a fresh random component");
    }
}

#[test]
fn build_chunks_drops_short_fragments() {
    let text = "Chapter 1\nTiny.\n\nChapter 2\nThis second chapter has enough text to clear the fifty character minimum.";
    let document = test_document(text, DocumentFormat::Text);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());

    assert_eq!(chunks.len(), 1);
    // Dropped parts still consume their part index.
    assert_eq!(chunks[0].part_index, 1);
    assert_eq!(chunks[0].metadata.chapter, "2");
}

#[test]
fn build_chunks_ordering_is_monotone() {
    let body = "Trajectory planning interpolates between configurations subject to velocity limits. ";
    let text = format!(
        "Chapter 1\n{}\n\nChapter 2\n{}",
        body.repeat(60),
        body.repeat(60)
    );
    let document = test_document(&text, DocumentFormat::Text);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());
    assert!(chunks.len() > 2);

    let pairs: Vec<(usize, usize)> = chunks
        .iter()
        .map(|c| (c.part_index, c.sub_part_index))
        .collect();
    let mut sorted = pairs.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(pairs, sorted);
}

#[test]
fn sub_chunks_inherit_part_labels() {
    let paragraph = "A long passage on control theory that pads out the structural part well past the repack budget. "
        .repeat(4);
    let paragraphs = vec![paragraph; 10].join("\n\n");
    // Both markers sit in the same part head, so every sub-chunk inherits them.
    let text = format!("Chapter 4 Section 4.2\n{paragraphs}");
    let document = test_document(&text, DocumentFormat::Pdf);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());
    assert!(chunks.len() > 1);

    for chunk in &chunks {
        assert_eq!(chunk.metadata.chapter, "4");
        assert_eq!(chunk.metadata.section, "4.2");
    }
}

#[test]
fn labels_unknown_when_marker_outside_window() {
    let body = "Plain text without any marker near the head of the part. ";
    let text = format!("{}Chapter 9 appears far too late to count.", body.repeat(10));
    let document = test_document(&text, DocumentFormat::Pdf);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());
    assert!(!chunks.is_empty());
    assert_eq!(chunks[0].metadata.chapter, UNKNOWN_LABEL);
    assert_eq!(chunks[0].metadata.section, UNKNOWN_LABEL);
}

#[test]
fn chunk_metadata_carries_source_identity() {
    let text = "Chapter 1\nIntro text here that is definitely over fifty characters long.";
    let document = test_document(text, DocumentFormat::Text);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());
    assert_eq!(chunks.len(), 1);

    let meta = &chunks[0].metadata;
    assert_eq!(meta.chapter_dir, "part_one");
    assert_eq!(meta.file, "chapter_01.txt");
    assert_eq!(meta.full_path, "/books/robotics/part_one/chapter_01.txt");
    assert_eq!(meta.kind, CHUNK_KIND);
    assert_eq!(meta.part, 0);
    assert_eq!(meta.sub_part, 0);

    assert!(chunks[0].id.starts_with("part_one-ch1-p0-s0-"));
}

#[test]
fn chunk_metadata_serializes_all_source_fields() {
    let metadata = ChunkMetadata {
        chapter_dir: "part_one".to_string(),
        chapter: "1".to_string(),
        section: "unknown".to_string(),
        part: 0,
        sub_part: 1,
        file: "chapter_01.txt".to_string(),
        full_path: "/books/part_one/chapter_01.txt".to_string(),
        kind: "book_chapter".to_string(),
    };

    let json = serde_json::to_value(&metadata).expect("can serialize metadata");
    for field in [
        "chapter_dir",
        "chapter",
        "section",
        "part",
        "sub_part",
        "file",
        "full_path",
        "kind",
    ] {
        assert!(json.get(field).is_some(), "missing field {field}");
    }
}

#[test]
fn concatenation_approximately_reconstructs_document() {
    let body = "Every robot needs a well tuned controller to track its reference trajectory. ";
    let text = format!(
        "Chapter 1\n{}\n\nChapter 2\n{}",
        body.repeat(30),
        body.repeat(30)
    );
    let document = test_document(&text, DocumentFormat::Text);

    let chunks = build_chunks_for_document(&document, &ChunkerConfig::default());

    let reconstructed: String = chunks
        .iter()
        .map(|c| c.text.split_whitespace().collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(" ");
    let normalized: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(reconstructed, normalized);
}
