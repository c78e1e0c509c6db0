use std::io::Write;
use std::path::{Component, Path, PathBuf};

use chrono::Local;

/// Suffix of every output text file.
pub const OUTPUT_SUFFIX: &str = "txt";

/// Flatten a path relative to an extraction root into an output file name:
/// directory separators become `_`, the final extension is dropped and
/// `.txt` is appended.
///
/// `docs/2024/minutes.pdf` -> `docs_2024_minutes.txt`
pub fn flat_output_name(rel_path: &Path) -> String {
    let flat = rel_path
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("_");
    let stem = Path::new(&flat)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(flat);
    format!("{stem}.{OUTPUT_SUFFIX}")
}

/// Output path for a file found at `rel_path` under an extraction root.
pub fn output_path_for(output_dir: &Path, rel_path: &Path) -> PathBuf {
    output_dir.join(flat_output_name(rel_path))
}

/// Current local time as `YYYY-MM-DD HH:MM:SS`.
pub fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Write `text` to `output_file` as a single `[timestamp] text` record,
/// creating parent directories and replacing any previous content.
pub fn write_to_text_file(text: &str, output_file: &Path) -> std::io::Result<()> {
    if let Some(parent) = output_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut f = std::fs::File::create(output_file)?;
    writeln!(f, "[{}] {}", timestamp(), text)?;
    f.flush()
}

/// Split a record written by [`write_to_text_file`] into its timestamp and
/// body.  Returns `None` if the content does not start with a bracketed
/// timestamp.
pub fn parse_record(content: &str) -> Option<(&str, &str)> {
    let rest = content.strip_prefix('[')?;
    let (ts, body) = rest.split_once("] ")?;
    Some((ts, body.strip_suffix('\n').unwrap_or(body)))
}
