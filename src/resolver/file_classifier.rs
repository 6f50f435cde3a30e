use super::encoding::TextEncoding;
use super::firmware::{self, FirmwareThresholds};
use crate::config::{CollectorConfig, ALWAYS_EXCLUDED_EXTENSIONS};
use crate::types::RejectReason;
use std::fs::File;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Safe text in the detected encoding
    Accept(TextEncoding),
    Reject(RejectReason),
}

impl Classification {
    pub fn is_accept(&self) -> bool {
        matches!(self, Classification::Accept(_))
    }
}

/// Result of reading a file from disk and classifying it.
#[derive(Debug, Clone)]
pub struct Inspection {
    pub classification: Classification,
    pub size: u64,
    /// Whole file content, present only for accepted files when requested.
    pub content: Option<Vec<u8>>,
}

impl Inspection {
    fn rejected(reason: RejectReason, size: u64) -> Self {
        Self {
            classification: Classification::Reject(reason),
            size,
            content: None,
        }
    }
}

pub struct FileClassifier {
    sample_size: usize,
    binary_ratio_threshold: f64,
    firmware: FirmwareThresholds,
    max_file_bytes: Option<u64>,
}

impl Default for FileClassifier {
    fn default() -> Self {
        Self::from_config(&CollectorConfig::default())
    }
}

impl FileClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &CollectorConfig) -> Self {
        Self {
            sample_size: config.sample_size.max(1),
            binary_ratio_threshold: config.binary_ratio_threshold,
            firmware: FirmwareThresholds {
                sample_lines: config.firmware_sample_lines,
                min_lines: config.firmware_min_lines,
                match_ratio: config.firmware_match_ratio,
            },
            max_file_bytes: config.max_file_bytes,
        }
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn has_excluded_extension(path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .is_some_and(|ext| ALWAYS_EXCLUDED_EXTENSIONS.contains(&ext.as_str()))
    }

    /// Classify a file from its path and (optionally) its bytes.
    ///
    /// `None` content means the file could not be read. Only the first
    /// `sample_size` bytes are inspected, so callers may pass whole files.
    pub fn classify(&self, path: &Path, content: Option<&[u8]>) -> Classification {
        if Self::has_excluded_extension(path) {
            return Classification::Reject(RejectReason::ExcludedExtension);
        }

        let Some(content) = content else {
            return Classification::Reject(RejectReason::Unreadable);
        };

        let truncated = content.len() > self.sample_size;
        let sample = &content[..content.len().min(self.sample_size)];
        self.classify_sample(sample, truncated)
    }

    fn classify_sample(&self, sample: &[u8], truncated: bool) -> Classification {
        if sample.contains(&0) {
            return Classification::Reject(RejectReason::BinaryContent);
        }

        if firmware::detect(sample, &self.firmware).is_some() {
            return Classification::Reject(RejectReason::FirmwareSignature);
        }

        let encoding = TextEncoding::probe(sample, truncated);
        if self.control_ratio(sample, encoding) > self.binary_ratio_threshold {
            return Classification::Reject(RejectReason::BinaryContent);
        }

        Classification::Accept(encoding)
    }

    /// Fraction of the sample that is neither printable nor whitespace.
    fn control_ratio(&self, sample: &[u8], encoding: TextEncoding) -> f64 {
        if sample.is_empty() {
            return 0.0;
        }

        match encoding {
            TextEncoding::Utf8 | TextEncoding::Utf8Bom => {
                let text = encoding.decode(sample);
                let (mut total, mut control) = (0usize, 0usize);
                for c in text.chars() {
                    total += 1;
                    if c.is_control() && !is_text_whitespace(c) {
                        control += 1;
                    }
                }
                control as f64 / total.max(1) as f64
            }
            // Without a valid multi-byte decoding, high bytes count against the sample.
            TextEncoding::Windows1252 => {
                let control = sample
                    .iter()
                    .filter(|&&b| !(0x20..0x7F).contains(&b) && !is_text_whitespace(b as char))
                    .count();
                control as f64 / sample.len() as f64
            }
        }
    }

    /// Read a bounded prefix of `path` and classify it. With `read_full`, an
    /// accepted file's complete content is returned as well.
    pub fn inspect(&self, path: &Path, read_full: bool) -> Inspection {
        if Self::has_excluded_extension(path) {
            return Inspection::rejected(RejectReason::ExcludedExtension, 0);
        }

        let metadata = match std::fs::metadata(path) {
            Ok(m) if m.is_file() => m,
            _ => return Inspection::rejected(RejectReason::Unreadable, 0),
        };
        let size = metadata.len();

        if let Some(max) = self.max_file_bytes {
            if size > max {
                return Inspection::rejected(RejectReason::LimitExceeded, size);
            }
        }

        let mut file = match File::open(path) {
            Ok(f) => f,
            Err(_) => return Inspection::rejected(RejectReason::Unreadable, size),
        };

        let mut data = Vec::with_capacity((size as usize).min(self.sample_size));
        if (&mut file).take(self.sample_size as u64).read_to_end(&mut data).is_err() {
            return Inspection::rejected(RejectReason::Unreadable, size);
        }

        let truncated = size > data.len() as u64;
        let classification = self.classify_sample(&data, truncated);

        if !classification.is_accept() || !read_full {
            return Inspection {
                classification,
                size,
                content: None,
            };
        }

        if truncated && file.read_to_end(&mut data).is_err() {
            return Inspection::rejected(RejectReason::Unreadable, size);
        }

        Inspection {
            classification,
            size: data.len() as u64,
            content: Some(data),
        }
    }
}

fn is_text_whitespace(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\x0C')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_excluded_extensions_ignore_content() {
        let classifier = FileClassifier::new();

        let paths = vec!["image.hex", "FW.BIN", "boot.s19", "app.srec", "x.Mot", "y.ihex"];

        for path in paths {
            let info = classifier.classify(Path::new(path), Some(b"perfectly fine text\n"));
            assert_eq!(info, Classification::Reject(RejectReason::ExcludedExtension), "{}", path);
            let info = classifier.classify(Path::new(path), Some(b""));
            assert_eq!(info, Classification::Reject(RejectReason::ExcludedExtension), "{}", path);
        }
    }

    #[test]
    fn test_unreadable() {
        let classifier = FileClassifier::new();
        assert_eq!(
            classifier.classify(Path::new("main.py"), None),
            Classification::Reject(RejectReason::Unreadable)
        );
    }

    #[test]
    fn test_null_byte_anywhere_in_sample() {
        let classifier = FileClassifier::new();
        let mut content = b"echo hello\n".repeat(100);
        content.push(0);

        assert_eq!(
            classifier.classify(Path::new("run.sh"), Some(&content)),
            Classification::Reject(RejectReason::BinaryContent)
        );
    }

    #[test]
    fn test_null_byte_past_sample_is_not_seen() {
        let config = CollectorConfig {
            sample_size: 16,
            ..CollectorConfig::default()
        };
        let classifier = FileClassifier::from_config(&config);
        let mut content = b"echo hello world here\n".to_vec();
        content.push(0);

        assert!(classifier.classify(Path::new("run.sh"), Some(&content)).is_accept());
    }

    #[test]
    fn test_control_heavy_sample_is_binary() {
        let classifier = FileClassifier::new();
        let content: Vec<u8> = (1u8..32).filter(|b| !matches!(b, 9 | 10 | 12 | 13)).cycle().take(400).collect();

        assert_eq!(
            classifier.classify(Path::new("blob.dat"), Some(&content)),
            Classification::Reject(RejectReason::BinaryContent)
        );
    }

    #[test]
    fn test_text_encodings() {
        let classifier = FileClassifier::new();

        assert_eq!(
            classifier.classify(Path::new("a.py"), Some("print('h\u{e9}')\n".as_bytes())),
            Classification::Accept(TextEncoding::Utf8)
        );
        assert_eq!(
            classifier.classify(Path::new("a.vbs"), Some(b"MsgBox \"caf\xE9\"\r\n")),
            Classification::Accept(TextEncoding::Windows1252)
        );
        assert_eq!(
            classifier.classify(Path::new("empty.txt"), Some(b"")),
            Classification::Accept(TextEncoding::Utf8)
        );
    }

    #[test]
    fn test_classify_is_idempotent() {
        let classifier = FileClassifier::new();
        let content = b"S1 is not a record\n:neither is this\n";

        let first = classifier.classify(Path::new("notes.txt"), Some(content));
        let second = classifier.classify(Path::new("notes.txt"), Some(content));
        assert_eq!(first, second);
        assert!(first.is_accept());
    }
}
