//! ZIP batch processing.
//!
//! [`process_zip_file`] unpacks an archive into a private scratch directory,
//! converts every supported member to a `[timestamp] text` record in the
//! output directory, and removes the scratch directory again.  Members are
//! isolated from each other: a member that fails still gets an output file
//! holding its error message, and the batch moves on.

use std::fs::File;
use std::io::{self, Read, Seek};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use docscribe_common::api::{ext_of, FileKind};
use docscribe_common::output::{output_path_for, write_to_text_file};
use docscribe_extract_audio::{transcribe_and_save, SpeechToText, Transcript};
use docscribe_extract_dispatch::dispatch_from_path;

/// Prefix of the per-call scratch directory created under the scratch root.
pub const SCRATCH_PREFIX: &str = "temp_extracted";

/// What happened to the archive as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum ArchiveStatus {
    /// Unpacked and walked; see the member counts.
    Processed,
    /// No file at the given path.  Nothing was created.
    Missing,
    /// Not a ZIP, or an entry failed its integrity check.  No outputs.
    Unreadable(String),
    /// The output directory or the scratch directory could not be created.
    OutputUnavailable(String),
}

/// Outcome of one [`process_zip_file`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub status: ArchiveStatus,
    /// Members whose extracted text was written.
    pub written: usize,
    /// Members that failed; their output file holds the error message.
    pub failed: usize,
    /// Members with an unsupported extension.  No output.
    pub skipped: usize,
    /// Members for which not even an error record could be written.
    pub write_errors: usize,
    /// Set when the scratch directory could not be removed.
    pub cleanup_error: Option<String>,
}

impl BatchReport {
    fn new(status: ArchiveStatus) -> Self {
        Self {
            status,
            written: 0,
            failed: 0,
            skipped: 0,
            write_errors: 0,
            cleanup_error: None,
        }
    }

    /// Number of output files produced.
    pub fn outputs(&self) -> usize {
        self.written + self.failed
    }
}

/// Process every supported member of the ZIP at `zip_path`.
///
/// Each call unpacks into its own directory under `scratch_root`, so
/// concurrent calls never see each other's members.  Output files are named
/// after the member's path inside the archive, flattened with `_`; a rerun
/// overwrites them.
///
/// Never fails: every problem is reflected in the returned report.
pub fn process_zip_file(
    zip_path: &Path,
    output_dir: &Path,
    scratch_root: &Path,
    model: &dyn SpeechToText,
) -> BatchReport {
    if !zip_path.is_file() {
        info!("archive not found: {}", zip_path.display());
        return BatchReport::new(ArchiveStatus::Missing);
    }

    if let Err(e) = std::fs::create_dir_all(output_dir) {
        warn!("cannot create output dir {}: {e}", output_dir.display());
        return BatchReport::new(ArchiveStatus::OutputUnavailable(e.to_string()));
    }
    let scratch = match create_scratch(scratch_root) {
        Ok(dir) => dir,
        Err(e) => {
            warn!("{e:#}");
            return BatchReport::new(ArchiveStatus::OutputUnavailable(format!("{e:#}")));
        }
    };

    let mut report = BatchReport::new(ArchiveStatus::Processed);
    match unpack(zip_path, scratch.path()) {
        Ok(entries) => {
            debug!("unpacked {entries} entries from {} into {}", zip_path.display(), scratch.path().display());
            process_members(scratch.path(), output_dir, model, &mut report);
        }
        Err(e) => {
            warn!("skipping unreadable archive {}: {e:#}", zip_path.display());
            report.status = ArchiveStatus::Unreadable(format!("{e:#}"));
        }
    }

    let scratch_path = scratch.path().to_path_buf();
    if let Err(e) = scratch.close() {
        warn!("failed to remove scratch dir {}: {e}", scratch_path.display());
        report.cleanup_error = Some(e.to_string());
    }

    info!(
        "processed {}: {} written, {} failed, {} skipped",
        zip_path.display(),
        report.written,
        report.failed,
        report.skipped
    );
    report
}

fn create_scratch(scratch_root: &Path) -> Result<tempfile::TempDir> {
    std::fs::create_dir_all(scratch_root)
        .with_context(|| format!("creating scratch root {}", scratch_root.display()))?;
    tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(scratch_root)
        .with_context(|| format!("creating scratch dir in {}", scratch_root.display()))
}

/// Verify every entry, then unpack the whole archive into `dest`.
/// Nothing is unpacked if any entry fails verification.
fn unpack(zip_path: &Path, dest: &Path) -> Result<usize> {
    let file = File::open(zip_path)?;
    let mut archive = zip::ZipArchive::new(file).context("opening zip")?;
    verify_entries(&mut archive)?;
    archive.extract(dest).context("extracting zip")?;
    Ok(archive.len())
}

/// Read every entry to the end so the stored CRC-32 gets checked.
fn verify_entries<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> Result<()> {
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).with_context(|| format!("reading entry {i}"))?;
        if entry.is_dir() {
            continue;
        }
        let name = entry.name().to_string();
        io::copy(&mut entry, &mut io::sink()).with_context(|| format!("corrupt entry '{name}'"))?;
    }
    Ok(())
}

/// Walk the unpacked tree in a stable order and process each regular file.
fn process_members(root: &Path, output_dir: &Path, model: &dyn SpeechToText, report: &mut BatchReport) {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("walk error under {}: {e}", root.display());
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel = path.strip_prefix(root).unwrap_or(path);
        let name = entry.file_name().to_string_lossy();
        let Some(kind) = member_kind(&name) else {
            debug!("skipping unsupported member {}", rel.display());
            report.skipped += 1;
            continue;
        };

        let output_file = output_path_for(output_dir, rel);
        let outcome = catch_unwind(AssertUnwindSafe(|| process_member(path, kind, &output_file, model)))
            .unwrap_or_else(|_| Err(anyhow::anyhow!("extractor panicked")));

        match outcome {
            Ok(MemberOutcome::Written) => report.written += 1,
            Ok(MemberOutcome::Failed) => report.failed += 1,
            Err(e) => {
                warn!("error processing {}: {e:#}", rel.display());
                let msg = format!("Error processing {name}: {e:#}");
                match write_to_text_file(&msg, &output_file) {
                    Ok(()) => report.failed += 1,
                    Err(write_err) => {
                        warn!("cannot write {}: {write_err}", output_file.display());
                        report.write_errors += 1;
                    }
                }
            }
        }
    }
}

/// Kind of a member that gets an output file.  Nested archives are not
/// descended into.
fn member_kind(file_name: &str) -> Option<FileKind> {
    match FileKind::from_ext(ext_of(file_name)?) {
        Some(FileKind::Archive) | None => None,
        kind => kind,
    }
}

enum MemberOutcome {
    Written,
    Failed,
}

/// Extract one member and write its record.  `Err` means the record itself
/// could not be written.
fn process_member(
    path: &Path,
    kind: FileKind,
    output_file: &Path,
    model: &dyn SpeechToText,
) -> Result<MemberOutcome> {
    if kind == FileKind::Audio {
        return match transcribe_and_save(path, output_file, model) {
            Ok(Transcript { save_error: None, .. }) => Ok(MemberOutcome::Written),
            Ok(Transcript { save_error: Some(e), .. }) => {
                Err(anyhow::Error::new(e).context(format!("saving transcript to {}", output_file.display())))
            }
            Err(e) => {
                write_to_text_file(&e.to_string(), output_file)?;
                Ok(MemberOutcome::Failed)
            }
        };
    }

    match dispatch_from_path(path, kind) {
        Ok(text) => {
            write_to_text_file(&text, output_file)?;
            Ok(MemberOutcome::Written)
        }
        Err(e) => {
            write_to_text_file(&e.to_string(), output_file)?;
            Ok(MemberOutcome::Failed)
        }
    }
}
