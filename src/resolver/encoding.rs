use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Text encodings the classifier can report, in probing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8-sig")]
    Utf8Bom,
    #[serde(rename = "utf-8")]
    Utf8,
    /// Single-byte fallback; every byte sequence decodes.
    #[serde(rename = "cp1252")]
    Windows1252,
}

impl TextEncoding {
    /// Probe a sample. `truncated` says the sample stops before the end of
    /// the file, in which case a multi-byte sequence cut at the boundary is
    /// not held against UTF-8.
    pub fn probe(sample: &[u8], truncated: bool) -> Self {
        if let Some(rest) = sample.strip_prefix(UTF8_BOM) {
            if is_utf8(rest, truncated) {
                return TextEncoding::Utf8Bom;
            }
        } else if is_utf8(sample, truncated) {
            return TextEncoding::Utf8;
        }
        TextEncoding::Windows1252
    }

    pub fn name(&self) -> &'static str {
        match self {
            TextEncoding::Utf8Bom => "utf-8-sig",
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "cp1252",
        }
    }

    /// Decode a whole file. Invalid sequences past the probed sample become U+FFFD.
    pub fn decode<'a>(&self, data: &'a [u8]) -> Cow<'a, str> {
        match self {
            TextEncoding::Utf8Bom | TextEncoding::Utf8 => {
                encoding_rs::UTF_8.decode_with_bom_removal(data).0
            }
            TextEncoding::Windows1252 => encoding_rs::WINDOWS_1252.decode_without_bom_handling(data).0,
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_utf8(bytes: &[u8], truncated: bool) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        // error_len() == None means the input ended mid-sequence
        Err(e) => truncated && e.error_len().is_none(),
    }
}

/// Convert CRLF and lone CR line endings to LF.
pub fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}
