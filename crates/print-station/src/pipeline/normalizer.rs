//! Renders text and source submissions into printable PDF documents.
//!
//! Pre-formed documents pass the pipeline untouched; everything here is
//! about the text path: decode with encoding fallbacks, clamp oversized
//! content, and lay the result out in a fixed-width style under a header
//! that identifies the submitting team.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream, StringFormat};

use crate::roster::TeamSeat;

/// Character ceiling applied before rendering.
pub const MAX_TEXT_CHARS: usize = 100_000;

const TRUNCATION_NOTICE: &str = "\n\n[Content truncated - file too large]\n";

// US-letter geometry, integer points. The body is 8pt Courier on a 10pt
// leading; 97 columns of 4.8pt glyphs fit the 468pt text width.
const PAGE_WIDTH: i64 = 612;
const PAGE_HEIGHT: i64 = 792;
const MARGIN: i64 = 72;
const BODY_LEADING: i64 = 10;
const MAX_COLUMNS: usize = 97;

const HEADER_BOX_BOTTOM: i64 = 664;
const EVENT_BASELINE: i64 = 700;
const SEAT_BASELINE: i64 = 682;
const FILENAME_BASELINE: i64 = 644;
const FIRST_BODY_TOP: i64 = 620;
const BODY_TOP: i64 = PAGE_HEIGHT - MARGIN;

/// Identity block stamped on every generated document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrintHeader {
    pub event: String,
    pub room: String,
    pub desk: String,
    pub team: String,
}

impl PrintHeader {
    pub fn for_seat(event: &str, seat: &TeamSeat) -> Self {
        Self {
            event: event.to_string(),
            room: seat.room.clone(),
            desk: seat.desk.clone(),
            team: seat.team.clone(),
        }
    }

    /// "Room: .. | Desk: .. | Team: .." with empty fields omitted.
    fn seat_line(&self) -> String {
        let mut parts = Vec::new();
        if !self.room.is_empty() {
            parts.push(format!("Room: {}", self.room));
        }
        if !self.desk.is_empty() {
            parts.push(format!("Desk: {}", self.desk));
        }
        parts.push(format!("Team: {}", self.team));
        parts.join(" | ")
    }
}

/// Decode an uploaded byte stream using the ordered fallback list.
///
/// Strict UTF-8 first. The WHATWG registry folds the latin-1, cp1252, and
/// iso-8859-1 labels into windows-1252, so the remaining fallbacks collapse
/// into one decoder; a lossy UTF-8 pass stays as the permissive last resort.
pub fn decode_submission_text(bytes: &[u8]) -> String {
    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
    if !had_errors {
        return decoded.into_owned();
    }

    String::from_utf8_lossy(bytes).into_owned()
}

/// Decode, clamp, and render an uploaded text submission to `output`.
pub fn normalize_text_submission(
    bytes: &[u8],
    original_name: &str,
    header: &PrintHeader,
    output: &Path,
) -> Result<(), NormalizeError> {
    let mut content = decode_submission_text(bytes);
    if let Some((boundary, _)) = content.char_indices().nth(MAX_TEXT_CHARS) {
        content.truncate(boundary);
        content.push_str(TRUNCATION_NOTICE);
    }
    render_text_document(&content, original_name, header, output)
}

/// Lay `content` out as a paginated fixed-width document and write it.
///
/// Output is deterministic for identical content and header.
pub fn render_text_document(
    content: &str,
    original_name: &str,
    header: &PrintHeader,
    output: &Path,
) -> Result<(), NormalizeError> {
    let lines = wrap_lines(content);
    let pages = paginate(&lines);

    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let body_font = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let header_font = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let meta_font = document.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = document.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => body_font,
            "F2" => header_font,
            "F3" => meta_font,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (index, page_lines) in pages.iter().enumerate() {
        let operations = if index == 0 {
            first_page_operations(header, original_name, page_lines)
        } else {
            body_operations(BODY_TOP, page_lines)
        };
        let encoded = Content { operations }.encode()?;
        let content_id = document.add_object(Stream::new(dictionary! {}, encoded));
        let page_id = document.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            "Resources" => resources_id,
        }),
    );

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    document.compress();
    document.save(output)?;
    Ok(())
}

/// Split into display lines, hard-wrapping anything wider than the page.
fn wrap_lines(content: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in content.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        let chars: Vec<char> = raw.chars().collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(MAX_COLUMNS) {
            lines.push(chunk.iter().collect());
        }
    }
    lines
}

fn lines_on_page(body_top: i64) -> usize {
    ((body_top - MARGIN) / BODY_LEADING) as usize + 1
}

/// Group wrapped lines into pages; always at least one page.
fn paginate(lines: &[String]) -> Vec<Vec<String>> {
    let mut pages: Vec<Vec<String>> = Vec::new();
    let mut remaining = lines;
    let mut capacity = lines_on_page(FIRST_BODY_TOP);

    loop {
        let take = remaining.len().min(capacity);
        pages.push(remaining[..take].to_vec());
        remaining = &remaining[take..];
        if remaining.is_empty() {
            break;
        }
        capacity = lines_on_page(BODY_TOP);
    }

    pages
}

fn first_page_operations(
    header: &PrintHeader,
    original_name: &str,
    lines: &[String],
) -> Vec<Operation> {
    let mut operations = vec![
        // Header border.
        Operation::new("q", vec![]),
        Operation::new("w", vec![1.into()]),
        Operation::new(
            "re",
            vec![
                MARGIN.into(),
                HEADER_BOX_BOTTOM.into(),
                (PAGE_WIDTH - 2 * MARGIN).into(),
                (BODY_TOP - HEADER_BOX_BOTTOM).into(),
            ],
        ),
        Operation::new("S", vec![]),
        Operation::new("Q", vec![]),
        // Event title and seat line.
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F2".into(), 12.into()]),
        Operation::new("Td", vec![(MARGIN + 10).into(), EVENT_BASELINE.into()]),
        Operation::new("Tj", vec![pdf_text(&header.event)]),
        Operation::new("ET", vec![]),
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F3".into(), 10.into()]),
        Operation::new("Td", vec![(MARGIN + 10).into(), SEAT_BASELINE.into()]),
        Operation::new("Tj", vec![pdf_text(&header.seat_line())]),
        Operation::new("ET", vec![]),
        // Original filename.
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F3".into(), 10.into()]),
        Operation::new("Td", vec![MARGIN.into(), FILENAME_BASELINE.into()]),
        Operation::new("Tj", vec![pdf_text(&format!("File: {original_name}"))]),
        Operation::new("ET", vec![]),
    ];
    operations.extend(body_operations(FIRST_BODY_TOP, lines));
    operations
}

fn body_operations(body_top: i64, lines: &[String]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 8.into()]),
        Operation::new("TL", vec![BODY_LEADING.into()]),
        Operation::new("Td", vec![MARGIN.into(), body_top.into()]),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![pdf_text(line)]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

/// Encode for the WinAnsi fonts; characters outside windows-1252 print as '?'.
fn pdf_text(text: &str) -> Object {
    let mut bytes = Vec::with_capacity(text.len());
    let mut buffer = [0u8; 4];
    for ch in text.chars() {
        let encoded = ch.encode_utf8(&mut buffer);
        let (mapped, _, unmappable) = encoding_rs::WINDOWS_1252.encode(encoded);
        if !unmappable && mapped.len() == 1 {
            bytes.push(mapped[0]);
        } else {
            bytes.push(b'?');
        }
    }
    Object::String(bytes, StringFormat::Literal)
}

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("failed to build printable document: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("failed to write printable document: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn header() -> PrintHeader {
        PrintHeader {
            event: "Spring Qualifier".to_string(),
            room: "Lab 2".to_string(),
            desk: "14".to_string(),
            team: "Borrow Checkers".to_string(),
        }
    }

    #[test]
    fn decodes_utf8_directly() {
        assert_eq!(decode_submission_text("héllo".as_bytes()), "héllo");
    }

    #[test]
    fn falls_back_to_windows_1252() {
        // Curly quotes in cp1252; invalid as UTF-8.
        let bytes = [0x93, 0x68, 0x69, 0x94];
        assert_eq!(decode_submission_text(&bytes), "\u{201c}hi\u{201d}");
    }

    #[test]
    fn seat_line_omits_empty_fields() {
        let full = header();
        assert_eq!(full.seat_line(), "Room: Lab 2 | Desk: 14 | Team: Borrow Checkers");

        let bare = PrintHeader {
            event: "Spring Qualifier".to_string(),
            room: String::new(),
            desk: String::new(),
            team: "Borrow Checkers".to_string(),
        };
        assert_eq!(bare.seat_line(), "Team: Borrow Checkers");
    }

    #[test]
    fn truncates_oversized_content_with_notice() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("big.pdf");
        let oversized = "x".repeat(MAX_TEXT_CHARS + 500);
        normalize_text_submission(oversized.as_bytes(), "big.txt", &header(), &path)
            .expect("render succeeds");

        let document = lopdf::Document::load(&path).expect("output parses");
        let pages = document.get_pages().len() as u32;
        let text = document
            .extract_text(&[pages])
            .expect("last page text extractable");
        assert!(text.contains("Content truncated"));
    }

    #[test]
    fn renders_at_least_one_page_with_team_header() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("out.pdf");
        render_text_document("fn main() {}\n", "main.rs", &header(), &path)
            .expect("render succeeds");

        let document = lopdf::Document::load(&path).expect("output parses");
        assert_eq!(document.get_pages().len(), 1);
        let text = document.extract_text(&[1]).expect("text extractable");
        assert!(text.contains("Borrow Checkers"));
        assert!(text.contains("main.rs"));
    }

    #[test]
    fn long_submissions_flow_onto_further_pages() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("long.pdf");
        let content = (0..200)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        render_text_document(&content, "long.txt", &header(), &path).expect("render succeeds");

        let document = lopdf::Document::load(&path).expect("output parses");
        assert!(document.get_pages().len() >= 2);
    }

    #[test]
    fn rendering_is_deterministic_for_identical_input() {
        let dir = tempdir().expect("tempdir");
        let first = dir.path().join("a.pdf");
        let second = dir.path().join("b.pdf");
        let content = "int main() { return 0; }\n";
        render_text_document(content, "main.c", &header(), &first).expect("render");
        render_text_document(content, "main.c", &header(), &second).expect("render");

        let a = fs::read(&first).expect("read a");
        let b = fs::read(&second).expect("read b");
        assert_eq!(a, b);
    }

    #[test]
    fn wraps_lines_wider_than_the_page() {
        let wide = "y".repeat(MAX_COLUMNS * 2 + 5);
        let lines = wrap_lines(&wide);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].chars().count(), MAX_COLUMNS);
        assert_eq!(lines[2].chars().count(), 5);
    }
}
