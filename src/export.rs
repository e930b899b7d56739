//! Batch export orchestration.
//!
//! One `export` call processes the caller's file list in order, writing
//! each recovered file as a Markdown block. Per-file failures are
//! recorded as strings and never interrupt the batch; only a destination
//! failure aborts it.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::warn;

use crate::document::{BlockWriter, LanguageMap};
use crate::encoding::{FileReader, ReadError};
use crate::paths;

// Error-entry prefixes, kept stable for callers that match on them.
pub const ERR_INVALID_FILE: &str = "无效文件";
pub const ERR_ENCODING: &str = "编码错误";
pub const ERR_PROCESSING: &str = "处理失败";
pub const ERR_WRITE: &str = "写入失败";

/// One batch run's inputs. Read-only once constructed.
#[derive(Debug, Clone)]
pub struct ExportRequest {
    /// Destination document path; overwritten if present.
    pub output: PathBuf,
    /// Project root for header paths; `None` shows bare file names.
    pub project_root: Option<PathBuf>,
    /// Emit start/end marker comments around each file.
    pub include_markers: bool,
    /// Emit the decoding encoding as a comment under each heading.
    pub show_encoding: bool,
}

/// What one batch run produced.
///
/// Every input file lands in exactly one of the two buckets: the success
/// count or a single error entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    /// Files serialized into the document.
    pub processed: usize,
    /// Failures in processing order, plus any fatal destination error.
    pub errors: Vec<String>,
}

/// Why one file was skipped.
enum FileFailure {
    /// Not a regular readable file.
    Invalid,
    /// No encoding could decode it.
    Encoding,
    /// Unexpected I/O or serialization failure.
    Processing(String),
}

impl FileFailure {
    fn entry(&self, path: &Path) -> String {
        match self {
            FileFailure::Invalid => format!("{}: {}", ERR_INVALID_FILE, path.display()),
            FileFailure::Encoding => format!("{}: {}", ERR_ENCODING, path.display()),
            FileFailure::Processing(message) => {
                format!("{} ({}): {}", ERR_PROCESSING, path.display(), message)
            }
        }
    }
}

/// Serializes a batch of files into one UTF-8 Markdown document.
pub struct Exporter {
    request: ExportRequest,
    languages: LanguageMap,
    reader: FileReader,
}

impl Exporter {
    /// Exporter with the built-in extension table.
    pub fn new(request: ExportRequest) -> Self {
        Self::with_languages(request, LanguageMap::new())
    }

    /// Exporter with a caller-provided extension table.
    pub fn with_languages(request: ExportRequest, languages: LanguageMap) -> Self {
        Self {
            request,
            languages,
            reader: FileReader::new(),
        }
    }

    /// Export `files` in the given order and write the document.
    ///
    /// Ordering is the caller's responsibility; the list is processed
    /// as-is, so the outcome is deterministic for a fixed input order.
    /// Failure to create the destination aborts immediately with a single
    /// top-level error; partial output is left in place if a later write
    /// fails.
    pub fn export(&self, files: &[PathBuf]) -> ExportOutcome {
        let mut outcome = ExportOutcome::default();

        let destination = match File::create(&self.request.output) {
            Ok(file) => file,
            Err(err) => {
                outcome.errors.push(format!("{}: {}", ERR_WRITE, err));
                return outcome;
            }
        };
        let mut writer = BufWriter::new(destination);
        let blocks = BlockWriter::new(self.request.include_markers, self.request.show_encoding);

        for path in files {
            match self.export_one(&mut writer, &blocks, path) {
                Ok(()) => outcome.processed += 1,
                Err(failure) => {
                    let entry = failure.entry(path);
                    warn!("{}", entry);
                    outcome.errors.push(entry);
                }
            }
        }

        if let Err(err) = writer.flush() {
            outcome.errors.push(format!("{}: {}", ERR_WRITE, err));
        }
        outcome
    }

    fn export_one<W: Write>(
        &self,
        writer: &mut W,
        blocks: &BlockWriter,
        path: &Path,
    ) -> Result<(), FileFailure> {
        if !is_readable_file(path) {
            return Err(FileFailure::Invalid);
        }

        let decoded = match self.reader.read(path) {
            Ok(decoded) => decoded,
            Err(ReadError::EncodingExhausted) => return Err(FileFailure::Encoding),
            Err(ReadError::Io(err)) => {
                return Err(FileFailure::Processing(err.to_string()))
            }
        };
        if decoded.lossy {
            warn!("{}: decoded as {}", path.display(), decoded.label());
        }

        let display = paths::display_path(path, self.request.project_root.as_deref());
        blocks
            .write_block(
                writer,
                &display,
                &paths::base_name(path),
                self.languages.tag_for(path),
                &decoded.text,
                Some(decoded.encoding.name()),
            )
            .map_err(|err| FileFailure::Processing(err.to_string()))
    }
}

/// A path qualifies only as an existing, regular, openable file.
fn is_readable_file(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(metadata) if metadata.is_file() => File::open(path).is_ok(),
        _ => false,
    }
}
