//! # ctxmd
//!
//! Bundle source files into a single Markdown document, e.g. to feed a
//! code base into an LLM context window.
//!
//! ## Document Format
//!
//! Each exported file becomes one self-contained block:
//!
//! ````text
//! ### src/app.py
//! <!-- 文件编码: GBK -->
//! <!-- [START OF FILE: app.py] -->
//! ```python
//! print("hello")
//! ```
//!
//! <!-- [END OF FILE: app.py] -->
//! ````
//!
//! The encoding comment and the start/end markers are optional; the
//! fence language tag comes from the file's extension. Output is always
//! UTF-8 regardless of the input encodings.
//!
//! ## Encoding Recovery
//!
//! Input files may use legacy encodings, notably the Chinese multi-byte
//! family (GBK, GB18030) that statistical detectors confuse with each
//! other and with windows-1252. Recovery per file, in order:
//!
//! 1. Exact-decode probe of the Chinese family over a byte sample
//! 2. Statistical detection, accepted only above a confidence threshold
//! 3. Ordered fallbacks (UTF-8, GBK, windows-1252), each validated
//!    against the file's first lines before a full strict decode
//! 4. Lenient UTF-8/GBK decoding with replacement characters
//!
//! A batch never aborts because one file failed: every input ends up in
//! the success count or as exactly one descriptive error entry.
//!
//! ```no_run
//! use ctxmd::{Exporter, ExportRequest};
//! use std::path::PathBuf;
//!
//! let request = ExportRequest {
//!     output: PathBuf::from("export.md"),
//!     project_root: Some(PathBuf::from("/proj")),
//!     include_markers: true,
//!     show_encoding: false,
//! };
//! let outcome = Exporter::new(request)
//!     .export(&[PathBuf::from("/proj/a.py"), PathBuf::from("/proj/b.md")]);
//! println!("exported {} files, {} errors", outcome.processed, outcome.errors.len());
//! ```

pub mod document;
pub mod encoding;
pub mod export;
pub mod paths;

pub use document::{BlockWriter, LanguageMap};
pub use encoding::{DecodedText, DetectorConfig, FileReader, ReadError, REPLACEMENT_NOTE};
pub use export::{
    ExportOutcome, ExportRequest, Exporter, ERR_ENCODING, ERR_INVALID_FILE, ERR_PROCESSING,
    ERR_WRITE,
};
