//! Encoding detection and resilient text reading.
//!
//! Source trees that grew up on Windows routinely mix UTF-8 with legacy
//! Chinese encodings (GBK, GB18030), which statistical detectors confuse
//! with each other and with windows-1252. Detection therefore runs an
//! exact-decode probe of the Chinese family first and only then consults
//! the statistical detector; an encoding that survives a bounded
//! validation read is used for the full strict decode, with lenient
//! replacement decoding as the last resort.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use encoding_rs::{Encoding, GB18030, GBK, UTF_8, WINDOWS_1252};
use log::debug;

/// Chinese-family probe order: GBK first, then its GB18030 superset.
const CHINESE_CANDIDATES: &[&Encoding] = &[GBK, GB18030];

/// Fallbacks tried when the detected encoding fails validation.
/// windows-1252 decodes every byte sequence, so this list is a floor.
const FALLBACK_ENCODINGS: &[&Encoding] = &[UTF_8, GBK, WINDOWS_1252];

/// Encodings retried with replacement characters as the last resort.
const LENIENT_ENCODINGS: &[&Encoding] = &[UTF_8, GBK];

/// Lines read during validation. Bounds validation cost independent of
/// file size.
const VALIDATE_LINES: usize = 10;

/// Suffix appended to a [`DecodedText`] label when replacement characters
/// were substituted.
pub const REPLACEMENT_NOTE: &str = " (替换错误字符)";

/// Tuning constants for sample-based detection.
///
/// Files below `whole_file_limit` are sampled in full; larger files are
/// probed with up to three `chunk_size` slices (head, middle, tail) so
/// broad coverage never requires reading the whole file. The thresholds
/// are tuning values, not semantics.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Files smaller than this are sampled in full.
    pub whole_file_limit: u64,
    /// Size of each sampled chunk for large files.
    pub chunk_size: u64,
    /// A middle chunk is sampled once the file exceeds this size.
    pub middle_chunk_threshold: u64,
    /// Minimum confidence accepted from the statistical detector (0-1).
    pub min_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            whole_file_limit: 100_000,
            chunk_size: 50_000,
            middle_chunk_threshold: 200_000,
            min_confidence: 0.7,
        }
    }
}

/// Text recovered from a file, together with the encoding that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    /// The decoded content.
    pub text: String,
    /// The encoding that produced `text`.
    pub encoding: &'static Encoding,
    /// True when lenient decoding substituted replacement characters.
    pub lossy: bool,
}

impl DecodedText {
    /// Label for logs and error reporting. Notes replacement loss; the
    /// document serializer uses the bare encoding name instead.
    pub fn label(&self) -> String {
        if self.lossy {
            format!("{}{}", self.encoding.name(), REPLACEMENT_NOTE)
        } else {
            self.encoding.name().to_string()
        }
    }
}

/// Why a file's text could not be recovered.
#[derive(Debug)]
pub enum ReadError {
    /// Every candidate failed, including the lenient last resort.
    EncodingExhausted,
    /// The file could not be read at all.
    Io(io::Error),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::EncodingExhausted => {
                write!(f, "no encoding could decode the file")
            }
            ReadError::Io(err) => write!(f, "read failed: {}", err),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::EncodingExhausted => None,
            ReadError::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for ReadError {
    fn from(err: io::Error) -> Self {
        ReadError::Io(err)
    }
}

/// Reads files of unknown encoding, trying candidates in a fixed order.
pub struct FileReader {
    config: DetectorConfig,
}

impl FileReader {
    /// Reader with the default detection tuning.
    pub fn new() -> Self {
        Self::with_config(DetectorConfig::default())
    }

    /// Reader with custom detection tuning.
    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Decode the file at `path`, returning the text and the encoding
    /// that produced it.
    ///
    /// Strategy, in order: validate and strict-decode the detected
    /// encoding, then each fixed fallback not already tried, then retry
    /// UTF-8 and GBK leniently. A strict decode that fails past the
    /// validated prefix sends the search on to the next candidate.
    pub fn read(&self, path: &Path) -> Result<DecodedText, ReadError> {
        let sample = read_sample(path, &self.config)?;
        let mut tried: Vec<&'static Encoding> = Vec::new();

        let detected = detect_encoding(&sample, &self.config);
        if let Some(decoded) = self.try_strict(path, detected)? {
            return Ok(decoded);
        }
        tried.push(detected);

        for &encoding in FALLBACK_ENCODINGS {
            if tried.contains(&encoding) {
                continue;
            }
            debug!(
                "{}: {} failed, falling back to {}",
                path.display(),
                detected.name(),
                encoding.name()
            );
            if let Some(decoded) = self.try_strict(path, encoding)? {
                return Ok(decoded);
            }
            tried.push(encoding);
        }

        let mut last_io = None;
        for &encoding in LENIENT_ENCODINGS {
            match fs::read(path) {
                Ok(bytes) => {
                    let (text, had_errors) =
                        encoding.decode_without_bom_handling(&bytes);
                    let decoded = DecodedText {
                        text: text.into_owned(),
                        encoding,
                        lossy: had_errors,
                    };
                    debug!("{}: lenient decode as {}", path.display(), decoded.label());
                    return Ok(decoded);
                }
                Err(err) => last_io = Some(err),
            }
        }

        Err(match last_io {
            Some(err) => ReadError::Io(err),
            None => ReadError::EncodingExhausted,
        })
    }

    /// Validate `encoding` against the file's prefix, then strict-decode
    /// the whole file. `Ok(None)` means the candidate was rejected.
    fn try_strict(
        &self,
        path: &Path,
        encoding: &'static Encoding,
    ) -> Result<Option<DecodedText>, ReadError> {
        if !validate_encoding(path, encoding) {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        match encoding.decode_without_bom_handling_and_without_replacement(&bytes) {
            Some(text) => Ok(Some(DecodedText {
                text: text.into_owned(),
                encoding,
                lossy: false,
            })),
            // Validation only saw a prefix; a failure deeper in the file
            // rejects the candidate like any other.
            None => Ok(None),
        }
    }
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new()
    }
}

/// Best-guess encoding for the sampled bytes.
///
/// The Chinese family is probed by exact decode before the statistical
/// detector runs: a full clean decode is a stronger signal than byte
/// statistics for encodings the detector habitually mistakes for
/// windows-1252. The statistical guess is accepted only above the
/// configured confidence; UTF-8 is the floor, so detection never fails.
pub fn detect_encoding(sample: &[u8], config: &DetectorConfig) -> &'static Encoding {
    for &encoding in CHINESE_CANDIDATES {
        if encoding
            .decode_without_bom_handling_and_without_replacement(sample)
            .is_some()
        {
            return encoding;
        }
    }

    let (label, confidence, _) = chardet::detect(sample);
    if confidence > config.min_confidence {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            debug!(
                "statistical detector chose {} (confidence {:.2})",
                encoding.name(),
                confidence
            );
            return encoding;
        }
        debug!("statistical detector returned unknown label {:?}", label);
    }
    UTF_8
}

/// Confirm `encoding` strictly decodes the first few lines of the file.
///
/// The prefix is cut at line boundaries, so a multi-byte sequence can be
/// split at the very end of the read; the streaming decoder leaves such a
/// trailing sequence pending rather than counting it as an error.
pub fn validate_encoding(path: &Path, encoding: &'static Encoding) -> bool {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(_) => return false,
    };
    let mut reader = BufReader::new(file);
    let mut prefix = Vec::new();
    for _ in 0..VALIDATE_LINES {
        match reader.read_until(b'\n', &mut prefix) {
            Ok(0) => break,
            Ok(_) => {}
            Err(_) => return false,
        }
    }

    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length(prefix.len())
        .unwrap_or(prefix.len().saturating_mul(4));
    let mut out = String::with_capacity(capacity);
    let (_, _, had_errors) = decoder.decode_to_string(&prefix, &mut out, false);
    !had_errors
}

/// Capture detection input: the whole file below the size limit, or
/// head/middle/tail chunks above it.
fn read_sample(path: &Path, config: &DetectorConfig) -> io::Result<Vec<u8>> {
    let size = fs::metadata(path)?.len();
    let mut file = File::open(path)?;

    if size < config.whole_file_limit {
        let mut sample = Vec::with_capacity(size as usize);
        file.read_to_end(&mut sample)?;
        return Ok(sample);
    }

    let mut sample = Vec::with_capacity((config.chunk_size * 3) as usize);
    read_chunk(&mut file, &mut sample, config.chunk_size)?;
    if size > config.middle_chunk_threshold {
        file.seek(SeekFrom::Start(size / 2))?;
        read_chunk(&mut file, &mut sample, config.chunk_size)?;
    }
    if size > config.whole_file_limit {
        file.seek(SeekFrom::End(-(config.chunk_size as i64)))?;
        read_chunk(&mut file, &mut sample, config.chunk_size)?;
    }
    Ok(sample)
}

fn read_chunk(file: &mut File, out: &mut Vec<u8>, len: u64) -> io::Result<()> {
    file.take(len).read_to_end(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn temp_file_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    fn gbk_bytes(text: &str) -> Vec<u8> {
        let (bytes, _, had_errors) = GBK.encode(text);
        assert!(!had_errors);
        bytes.into_owned()
    }

    #[test]
    fn test_detect_gbk_chinese() {
        let sample = gbk_bytes("项目配置文件，包含数据库连接信息。\n");
        let config = DetectorConfig::default();
        assert_eq!(detect_encoding(&sample, &config), GBK);
    }

    #[test]
    fn test_detect_defaults_to_utf8_when_chinese_probe_fails() {
        // "值: " in UTF-8 leaves a high byte paired with ':' (0x3A),
        // which no GBK/GB18030 sequence allows; detection must land on
        // UTF-8 either via the statistical pass or the floor.
        let sample = "配置值: 数据库\n连接值: 本地主机\n".repeat(8);
        let config = DetectorConfig::default();
        assert_eq!(detect_encoding(sample.as_bytes(), &config), UTF_8);
    }

    #[test]
    fn test_detect_ascii_accepted_by_chinese_probe() {
        // ASCII decodes cleanly under GBK, an ASCII superset; the decoded
        // text is identical either way.
        let config = DetectorConfig::default();
        assert_eq!(detect_encoding(b"fn main() {}\n", &config), GBK);
    }

    #[test]
    fn test_validate_accepts_matching_encoding() {
        let file = temp_file_with(&gbk_bytes("第一行\n第二行\n第三行\n"));
        assert!(validate_encoding(file.path(), GBK));
    }

    #[test]
    fn test_validate_rejects_wrong_encoding() {
        let file = temp_file_with(&gbk_bytes("中文内容第一行\n中文内容第二行\n"));
        assert!(!validate_encoding(file.path(), UTF_8));
    }

    #[test]
    fn test_validate_missing_file() {
        assert!(!validate_encoding(Path::new("/no/such/file"), UTF_8));
    }

    #[test]
    fn test_read_round_trips_gbk_content() {
        let original = "配置说明\n第一节：基础设置\n第二节：高级设置\n";
        let file = temp_file_with(&gbk_bytes(original));

        let decoded = FileReader::new().read(file.path()).unwrap();
        assert_eq!(decoded.text, original);
        assert!(!decoded.lossy);
        // GBK shares a decoder with its GB18030 superset; either label is
        // a correct answer for this content.
        assert!(matches!(decoded.encoding.name(), "GBK" | "gb18030"));
    }

    #[test]
    fn test_read_round_trips_utf8_content() {
        let original = "print(\"ready\")\n";
        let file = temp_file_with(original.as_bytes());

        let decoded = FileReader::new().read(file.path()).unwrap();
        assert_eq!(decoded.text, original);
        assert!(!decoded.lossy);
    }

    #[test]
    fn test_read_never_fails_on_garbage_bytes() {
        let garbage = [0x00, 0xFF, 0xFE, 0x81, 0x00, 0xFF, 0x30, 0x9D];
        let file = temp_file_with(&garbage);

        // Garbage must come back as some text (replacement-laden or
        // mojibake), never as a fault.
        let decoded = FileReader::new().read(file.path()).unwrap();
        assert!(!decoded.text.is_empty());
    }

    #[test]
    fn test_read_missing_file_is_io_error() {
        let err = FileReader::new().read(Path::new("/no/such/file")).unwrap_err();
        assert!(matches!(err, ReadError::Io(_)));
    }

    #[test]
    fn test_lossy_label_carries_annotation() {
        let decoded = DecodedText {
            text: String::new(),
            encoding: UTF_8,
            lossy: true,
        };
        assert_eq!(decoded.label(), format!("UTF-8{}", REPLACEMENT_NOTE));

        let clean = DecodedText { lossy: false, ..decoded };
        assert_eq!(clean.label(), "UTF-8");
    }

    #[test]
    fn test_sample_reads_small_file_whole() {
        let content = vec![b'a'; 1_000];
        let file = temp_file_with(&content);
        let sample = read_sample(file.path(), &DetectorConfig::default()).unwrap();
        assert_eq!(sample, content);
    }

    #[test]
    fn test_sample_chunks_large_file() {
        let config = DetectorConfig::default();
        let content = vec![b'x'; 250_000];
        let file = temp_file_with(&content);

        // Head, middle and tail chunks for a file past every threshold.
        let sample = read_sample(file.path(), &config).unwrap();
        assert_eq!(sample.len() as u64, config.chunk_size * 3);
    }

    #[test]
    fn test_sample_skips_middle_chunk_below_threshold() {
        let config = DetectorConfig::default();
        let content = vec![b'x'; 150_000];
        let file = temp_file_with(&content);

        let sample = read_sample(file.path(), &config).unwrap();
        assert_eq!(sample.len() as u64, config.chunk_size * 2);
    }
}
