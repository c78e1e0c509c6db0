use std::io::Read;
use std::path::Path;

use anyhow::Context;
use docscribe_common::api::{ExtractError, ExtractResult};
use quick_xml::events::Event;

/// Accept Word documents.
pub fn accepts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("docx"))
        .unwrap_or(false)
}

/// Extract the body text of a DOCX file.
///
/// Paragraphs come from `word/document.xml`.  Blank paragraphs are dropped
/// and the rest are joined with newlines.
pub fn extract(path: &Path) -> ExtractResult {
    read_document_xml(path)
        .and_then(|xml| parse_docx_paragraphs(&xml))
        .map(|paragraphs| paragraphs.join("\n"))
        .map_err(|e| ExtractError::extract(path, format!("{e:#}")))
}

fn read_document_xml(path: &Path) -> anyhow::Result<String> {
    let file = std::fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file).context("not a DOCX container")?;
    let mut entry = archive
        .by_name("word/document.xml")
        .context("missing word/document.xml")?;
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(xml)
}

/// Collect the text of each top-level `w:p` paragraph, skipping blank ones.
///
/// Runs (`w:t`) are concatenated; `w:tab` becomes a tab and `w:br`/`w:cr`
/// a line break.  Paragraphs nested inside another one (text boxes) are
/// ignored and leave the outer paragraph's text intact.
fn parse_docx_paragraphs(xml: &str) -> anyhow::Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current_para = String::new();
    // Number of open `w:p` elements.
    let mut depth = 0usize;
    let mut in_t = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).context("parsing word/document.xml")? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:t" => in_t = true,
                b"w:p" => {
                    if depth == 0 {
                        current_para.clear();
                    }
                    depth += 1;
                }
                _ => {}
            },
            Event::Empty(e) if depth == 1 => match e.name().as_ref() {
                b"w:tab" => current_para.push('\t'),
                b"w:br" | b"w:cr" => current_para.push('\n'),
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_t = false,
                b"w:p" => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && !current_para.trim().is_empty() {
                        paragraphs.push(std::mem::take(&mut current_para));
                    }
                }
                _ => {}
            },
            Event::Text(e) if in_t && depth == 1 => {
                current_para.push_str(&e.unescape().context("decoding text run")?);
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(paragraphs)
}
