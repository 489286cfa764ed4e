//! Structure-aware chunking of textbook source documents.
//!
//! Splits raw chapter text into bounded-size chunks aligned to heading and
//! chapter/section boundaries, attaching positional and structural metadata
//! to each chunk. The whole module is a pure, deterministic transform: the
//! only non-deterministic output is the random component of chunk ids.

#[cfg(test)]
mod tests;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;
use uuid::Uuid;

/// Sentinel used when no chapter/section marker is found. Distinguishes
/// "searched and not found" from "not searched".
pub const UNKNOWN_LABEL: &str = "unknown";

/// Chunk-type tag attached to every chunk's metadata.
pub const CHUNK_KIND: &str = "book_chapter";

/// How far into a structural part the chapter/section label search looks.
const LABEL_SEARCH_WINDOW: usize = 200;

/// A buffer holding more than this many characters is flushed before a
/// heading starts a new one.
const HEADING_FLUSH_THRESHOLD: usize = 100;

/// Lines at least this long are never classified as headings.
const MAX_HEADING_LEN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Text,
    Pdf,
    Docx,
}

impl std::fmt::Display for DocumentFormat {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DocumentFormat::Text => write!(f, "text"),
            DocumentFormat::Pdf => write!(f, "pdf"),
            DocumentFormat::Docx => write!(f, "docx"),
        }
    }
}

/// Raw input document: extracted text plus its source identity.
#[derive(Debug, Clone)]
pub struct Document {
    pub text: String,
    pub file_name: String,
    /// Name of the containing directory, used as a coarse chapter grouping.
    pub dir_name: String,
    pub full_path: String,
    pub format: DocumentFormat,
}

/// Configuration for the structural chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Character budget for the first packing pass.
    pub max_chunk_size: usize,
    /// Character budget for the per-part repack pass. Larger than
    /// `max_chunk_size` since it operates on structurally isolated text.
    pub repack_chunk_size: usize,
    /// Parts and sub-chunks with a stripped length below this are dropped.
    pub min_fragment_len: usize,
    /// Chunks exceeding `max_chunk_size * oversize_factor` are re-split on
    /// paragraph boundaries.
    pub oversize_factor: f64,
}

impl Default for ChunkerConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_chunk_size: 1000,
            repack_chunk_size: 1200,
            min_fragment_len: 50,
            oversize_factor: 1.5,
        }
    }
}

/// A final, size-bounded unit of text ready for embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: String,
    pub text: String,
    /// Index of the structural part this chunk came from.
    pub part_index: usize,
    /// Index of this chunk within its part's packing result.
    pub sub_part_index: usize,
    pub metadata: ChunkMetadata,
}

/// Source and structural metadata carried alongside each chunk. Every field
/// must round-trip unchanged into the persisted embedding record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub chapter_dir: String,
    pub chapter: String,
    pub section: String,
    pub part: u32,
    pub sub_part: u32,
    pub file: String,
    pub full_path: String,
    pub kind: String,
}

static CHAPTER_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^chapter\s+\d+\b").expect("chapter boundary pattern is valid")
});

static SECTION_BOUNDARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?mi)^section\s+\d+(?:\.\d+)*\b").expect("section boundary pattern is valid")
});

static MD_HEADING_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,3}\s+\S").expect("heading boundary pattern is valid"));

static NUMBERED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d+(?:\.\d+)*[.)]?\s+\S").expect("numbered line pattern is valid")
});

static CHAPTER_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)chapter\s+(\d+)").expect("chapter label pattern is valid")
});

static SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)section\s+(\d+(?:\.\d+)*)").expect("section label pattern is valid")
});

/// Boundary patterns for a document format, ordered most significant first.
///
/// Markdown heading boundaries only apply to plain-text sources; text
/// extracted from PDF or docx carries no markdown markup.
#[inline]
pub fn boundary_patterns(format: DocumentFormat) -> Vec<&'static Regex> {
    match format {
        DocumentFormat::Text => vec![&CHAPTER_BOUNDARY, &SECTION_BOUNDARY, &MD_HEADING_BOUNDARY],
        DocumentFormat::Pdf | DocumentFormat::Docx => vec![&CHAPTER_BOUNDARY, &SECTION_BOUNDARY],
    }
}

/// Split text into structural parts by applying each boundary pattern in
/// turn, so higher-priority boundaries are respected before lower-priority
/// ones sub-divide within the result.
///
/// Each boundary match starts a new fragment; the marker line stays at the
/// head of the fragment it opens. Empty and whitespace-only fragments are
/// dropped after each round. Filtering out fragments below the minimum
/// length threshold is the caller's responsibility, not this function's.
#[inline]
pub fn split_into_structural_parts(text: &str, patterns: &[&Regex]) -> Vec<String> {
    let mut parts: Vec<String> = if text.trim().is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    };

    for pattern in patterns {
        parts = parts
            .iter()
            .flat_map(|part| split_at_matches(part, pattern))
            .filter(|part| !part.trim().is_empty())
            .collect();
    }

    parts
}

/// Split `text` at the start offset of every match, keeping each marker
/// with the text that follows it.
fn split_at_matches(text: &str, pattern: &Regex) -> Vec<String> {
    let mut boundaries: Vec<usize> = pattern.find_iter(text).map(|m| m.start()).collect();
    boundaries.retain(|&offset| offset != 0);

    if boundaries.is_empty() {
        return vec![text.to_string()];
    }

    let mut fragments = Vec::with_capacity(boundaries.len() + 1);
    let mut start = 0;
    for boundary in boundaries {
        fragments.push(text[start..boundary].to_string());
        start = boundary;
    }
    fragments.push(text[start..].to_string());
    fragments
}

/// Markdown `#`-prefixed heading line.
fn is_markdown_heading(line: &str) -> bool {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|&c| c == '#').count();
    (1..=6).contains(&hashes)
        && trimmed
            .chars()
            .nth(hashes)
            .is_some_and(|c| c == ' ' || c == '\t')
}

/// Numeric-prefixed heading line like "1.2 Kinematics".
fn is_numbered_section(line: &str) -> bool {
    let trimmed = line.trim();
    char_len(trimmed) < MAX_HEADING_LEN && NUMBERED_LINE.is_match(trimmed)
}

/// Short line wrapped entirely in bold/emphasis markers.
fn is_emphasis_wrapped_title(line: &str) -> bool {
    let trimmed = line.trim();
    if char_len(trimmed) >= MAX_HEADING_LEN {
        return false;
    }
    for marker in ["**", "__", "*"] {
        if trimmed.len() > 2 * marker.len()
            && trimmed.starts_with(marker)
            && trimmed.ends_with(marker)
        {
            return true;
        }
    }
    false
}

/// Short standalone line ending in a colon that reads like a title.
fn is_short_title_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && char_len(trimmed) < MAX_HEADING_LEN && trimmed.ends_with(':')
}

/// Heading classification, first match wins.
fn is_heading_line(line: &str) -> bool {
    [
        is_markdown_heading,
        is_numbered_section,
        is_emphasis_wrapped_title,
        is_short_title_line,
    ]
    .iter()
    .any(|predicate| predicate(line))
}

enum Piece {
    Heading(String),
    Body(String),
}

impl Piece {
    fn text(&self) -> &str {
        match self {
            Piece::Heading(text) | Piece::Body(text) => text,
        }
    }
}

/// Tokenize a fragment into alternating heading-like and body-like pieces.
/// Body pieces are blank-line separated paragraphs; heading lines always
/// terminate the paragraph they follow.
fn segment_pieces(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut body = String::new();

    let mut flush_body = |body: &mut String, pieces: &mut Vec<Piece>| {
        if !body.trim().is_empty() {
            pieces.push(Piece::Body(body.trim_end().to_string()));
        }
        body.clear();
    };

    for line in text.lines() {
        if is_heading_line(line) {
            flush_body(&mut body, &mut pieces);
            pieces.push(Piece::Heading(line.trim_end().to_string()));
        } else if line.trim().is_empty() {
            flush_body(&mut body, &mut pieces);
        } else {
            body.push_str(line);
            body.push('\n');
        }
    }
    flush_body(&mut body, &mut pieces);

    pieces
}

/// Greedily pack structural segments (headings + paragraphs) into chunks
/// close to but not exceeding `max_chunk_size` characters, without splitting
/// mid-paragraph.
///
/// Heading classification takes priority over size-based flushing: a heading
/// never merges into a buffer that already holds a substantial amount of
/// text, even when the buffer is under the size budget. Empty and
/// whitespace-only input yields zero chunks.
#[inline]
pub fn pack_by_structure(text: &str, max_chunk_size: usize) -> Vec<String> {
    pack_with_factor(text, max_chunk_size, ChunkerConfig::default().oversize_factor)
}

fn pack_with_factor(text: &str, max_chunk_size: usize, oversize_factor: f64) -> Vec<String> {
    let pieces = segment_pieces(text);

    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for piece in &pieces {
        match piece {
            Piece::Heading(_) => {
                if char_len(buffer.trim()) > HEADING_FLUSH_THRESHOLD {
                    flush_buffer(&mut buffer, &mut chunks);
                }
                append_piece(&mut buffer, piece.text());
            }
            Piece::Body(_) => {
                let combined = char_len(&buffer) + char_len(piece.text());
                if combined > max_chunk_size && !buffer.trim().is_empty() {
                    flush_buffer(&mut buffer, &mut chunks);
                }
                append_piece(&mut buffer, piece.text());
            }
        }
    }
    flush_buffer(&mut buffer, &mut chunks);

    repack_oversize(chunks, max_chunk_size, oversize_factor)
}

/// Re-split any chunk exceeding `max_chunk_size * oversize_factor` on
/// blank-line paragraph boundaries. A single paragraph exceeding the bound
/// is left intact; text is never split mid-paragraph by character count.
/// Running this pass on an already-compliant chunk set is a no-op.
#[inline]
pub fn repack_oversize(
    chunks: Vec<String>,
    max_chunk_size: usize,
    oversize_factor: f64,
) -> Vec<String> {
    let soft_bound = (max_chunk_size as f64 * oversize_factor) as usize;

    let mut result = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if char_len(chunk.trim()) <= soft_bound {
            result.push(chunk);
            continue;
        }

        debug!(
            "Re-splitting oversize chunk of {} chars on paragraph boundaries",
            char_len(&chunk)
        );

        let mut buffer = String::new();
        for paragraph in chunk.split("\n\n") {
            if paragraph.trim().is_empty() {
                continue;
            }
            let combined = char_len(&buffer) + char_len(paragraph);
            if combined > max_chunk_size && !buffer.trim().is_empty() {
                flush_buffer(&mut buffer, &mut result);
            }
            append_piece(&mut buffer, paragraph);
        }
        flush_buffer(&mut buffer, &mut result);
    }

    result
}

fn append_piece(buffer: &mut String, piece: &str) {
    if !buffer.is_empty() {
        buffer.push_str("\n\n");
    }
    buffer.push_str(piece);
}

fn flush_buffer(buffer: &mut String, chunks: &mut Vec<String>) {
    if !buffer.trim().is_empty() {
        chunks.push(buffer.trim().to_string());
    }
    buffer.clear();
}

/// Convert one document into an ordered sequence of chunks.
///
/// The document text is split into structural parts with format-appropriate
/// boundary patterns; each surviving part is packed into size-bounded
/// sub-chunks with the repack budget. Parts and sub-chunks whose stripped
/// length falls below `min_fragment_len` are silently dropped, so part and
/// sub-part indices may skip values while remaining monotonically
/// increasing.
///
/// Chapter and section labels are inferred from the first 200 characters of
/// the containing part, not the sub-chunk, so every sub-chunk of one part
/// carries the same labels. This function never fails on malformed text; it
/// degrades to fewer or larger chunks.
#[inline]
pub fn build_chunks_for_document(document: &Document, config: &ChunkerConfig) -> Vec<Chunk> {
    let patterns = boundary_patterns(document.format);
    let parts = split_into_structural_parts(&document.text, &patterns);

    let mut chunks = Vec::new();
    for (part_index, part) in parts.iter().enumerate() {
        if char_len(part.trim()) < config.min_fragment_len {
            continue;
        }

        let (chapter, section) = infer_labels(part);

        let sub_chunks = pack_with_factor(part, config.repack_chunk_size, config.oversize_factor);
        for (sub_part_index, text) in sub_chunks.into_iter().enumerate() {
            if char_len(text.trim()) < config.min_fragment_len {
                continue;
            }

            chunks.push(Chunk {
                id: chunk_id(&document.dir_name, &chapter, part_index, sub_part_index),
                text,
                part_index,
                sub_part_index,
                metadata: ChunkMetadata {
                    chapter_dir: document.dir_name.clone(),
                    chapter: chapter.clone(),
                    section: section.clone(),
                    part: part_index as u32,
                    sub_part: sub_part_index as u32,
                    file: document.file_name.clone(),
                    full_path: document.full_path.clone(),
                    kind: CHUNK_KIND.to_string(),
                },
            });
        }
    }

    debug!(
        "Chunked {} into {} chunks across {} structural parts",
        document.file_name,
        chunks.len(),
        parts.len()
    );

    chunks
}

/// Best-effort chapter/section labels from the head of a structural part.
/// Either label independently falls back to the `"unknown"` sentinel.
fn infer_labels(part: &str) -> (String, String) {
    let window: String = part.chars().take(LABEL_SEARCH_WINDOW).collect();

    let chapter = CHAPTER_LABEL
        .captures(&window)
        .map_or_else(|| UNKNOWN_LABEL.to_string(), |c| c[1].to_string());
    let section = SECTION_LABEL
        .captures(&window)
        .map_or_else(|| UNKNOWN_LABEL.to_string(), |c| c[1].to_string());

    (chapter, section)
}

/// Chunk id: readable prefix from source identity plus a random component.
/// Uniqueness is guaranteed by the random component alone.
fn chunk_id(dir_name: &str, chapter: &str, part: usize, sub_part: usize) -> String {
    let dir: String = dir_name
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    let nonce = Uuid::new_v4().simple().to_string();
    format!(
        "{}-ch{}-p{}-s{}-{}",
        dir,
        chapter,
        part,
        sub_part,
        &nonce[..8]
    )
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
