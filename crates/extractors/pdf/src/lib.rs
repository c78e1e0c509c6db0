use std::path::Path;

use docscribe_common::api::{ExtractError, ExtractResult};
use tracing::warn;

/// Extract text content from a PDF file.
///
/// Pages are concatenated in order, each followed by a newline; pages with
/// no text layer contribute an empty line.  Leading and trailing whitespace
/// of the whole document is trimmed.
pub fn extract(path: &Path) -> ExtractResult {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::extract(path, e))?;
    extract_from_bytes(&bytes, path)
}

/// Extract text content from PDF bytes; `path` is only used in error messages.
pub fn extract_from_bytes(bytes: &[u8], path: &Path) -> ExtractResult {
    // pdf-extract can panic on malformed PDFs; catch_unwind turns that into
    // an ordinary extraction error.
    let result = catch_quietly(path, || pdf_extract::extract_text_from_mem_by_pages(bytes));

    match result {
        Ok(Ok(pages)) => Ok(join_pages(pages)),
        Ok(Err(e)) => Err(ExtractError::extract(path, e)),
        Err(_) => Err(ExtractError::extract(path, "PDF parser panicked on malformed input")),
    }
}

/// Run `f`, catching a panic.  While it runs, a panic hook reports the file
/// being processed through `tracing` instead of the default stderr dump.
/// The previous hook is reinstalled afterwards.
fn catch_quietly<T>(path: &Path, f: impl FnOnce() -> T + std::panic::UnwindSafe) -> std::thread::Result<T> {
    let name = path.display().to_string();
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        warn!("pdf-extract panicked while processing {name}: {info}");
    }));
    let result = std::panic::catch_unwind(f);
    let _ = std::panic::take_hook();
    std::panic::set_hook(prev_hook);
    result
}

fn join_pages(pages: Vec<String>) -> String {
    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    text.trim().to_string()
}

/// Check if a file is a PDF based on extension.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_pages() {
        let pages = vec!["Page one".to_string(), String::new(), "Page three\n".to_string()];
        assert_eq!(join_pages(pages), "Page one\n\nPage three");
    }

    #[test]
    fn test_join_no_pages() {
        assert_eq!(join_pages(vec![]), "");
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pdf");

        let msg = extract(&path).unwrap_err().to_string();
        assert!(msg.starts_with("Error extracting text from"));
        assert!(msg.contains(&path.display().to_string()));
    }

    #[test]
    fn test_garbage_bytes_are_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.pdf");
        std::fs::write(&path, b"this is not a pdf at all").unwrap();

        assert!(matches!(extract(&path), Err(ExtractError::Extract { .. })));
    }

    /// Minimal PDF with one Helvetica text line per page; an empty string
    /// gives a page with no text.
    fn pdf_bytes(pages: &[&str]) -> Vec<u8> {
        let kids: Vec<String> = (0..pages.len()).map(|i| format!("{} 0 R", 4 + 2 * i)).collect();
        let mut objects = vec![
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages.len()),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
        ];
        for (i, text) in pages.iter().enumerate() {
            let content = if text.is_empty() {
                String::new()
            } else {
                format!("BT /F1 24 Tf 72 700 Td ({text}) Tj ET")
            };
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                5 + 2 * i
            ));
            objects.push(format!("<< /Length {} >>\nstream\n{content}\nendstream", content.len()));
        }

        let mut out = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, obj) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{obj}\nendobj\n", i + 1).as_bytes());
        }
        let xref = out.len();
        out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for off in offsets {
            out.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
        }
        out.extend_from_slice(
            format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref}\n%EOF\n", objects.len() + 1).as_bytes(),
        );
        out
    }

    #[test]
    fn test_extract_pages_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, pdf_bytes(&["Hello", "", "World"])).unwrap();

        let text = extract(&path).unwrap();

        let hello = text.find("Hello").expect("first page text");
        let world = text.find("World").expect("last page text");
        assert!(hello < world, "{text:?}");
        assert!(text[hello..world].contains('\n'), "{text:?}");
        assert_eq!(text, text.trim());
    }

    #[test]
    fn test_single_page_from_bytes() {
        let text = extract_from_bytes(&pdf_bytes(&["Invoice"]), Path::new("mem.pdf")).unwrap();
        assert_eq!(text, "Invoice");
    }

    #[test]
    fn test_empty_pages_give_empty_text() {
        let text = extract_from_bytes(&pdf_bytes(&["", ""]), Path::new("blank.pdf")).unwrap();
        assert_eq!(text, "");
    }

    #[test]
    fn test_catch_quietly() {
        assert_eq!(catch_quietly(Path::new("ok.pdf"), || 7).unwrap(), 7);
        assert!(catch_quietly(Path::new("bad.pdf"), || -> u8 { panic!("malformed") }).is_err());
    }

    #[test]
    fn test_accepts() {
        assert!(accepts(Path::new("paper.pdf")));
        assert!(accepts(Path::new("PAPER.PDF")));
        assert!(!accepts(Path::new("paper.docx")));
    }
}
