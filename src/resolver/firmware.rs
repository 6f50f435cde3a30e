//! Line grammars for ASCII firmware images.
//!
//! A line only counts as a record when every field parses and the checksum
//! adds up, so prose that happens to start with `:` or `S` never matches.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareFormat {
    IntelHex,
    MotorolaSRecord,
}

/// How much of a sample the signature test looks at and how many records it needs.
#[derive(Debug, Clone, Copy)]
pub struct FirmwareThresholds {
    pub sample_lines: usize,
    pub min_lines: usize,
    pub match_ratio: f64,
}

impl Default for FirmwareThresholds {
    fn default() -> Self {
        Self {
            sample_lines: 200,
            min_lines: 5,
            match_ratio: 0.6,
        }
    }
}

/// Returns the dominant format when enough sampled lines are valid records.
pub fn detect(sample: &[u8], thresholds: &FirmwareThresholds) -> Option<FirmwareFormat> {
    let mut total = 0usize;
    let mut ihex = 0usize;
    let mut srec = 0usize;

    let lines = sample
        .split(|&b| b == b'\n')
        .map(trim_ascii)
        .filter(|line| !line.is_empty())
        .take(thresholds.sample_lines);

    for line in lines {
        total += 1;
        if is_intel_hex_record(line) {
            ihex += 1;
        } else if is_srecord(line) {
            srec += 1;
        }
    }

    if total == 0 || total < thresholds.min_lines {
        return None;
    }

    let matched = ihex + srec;
    if (matched as f64) < thresholds.match_ratio * total as f64 {
        return None;
    }

    if ihex >= srec {
        Some(FirmwareFormat::IntelHex)
    } else {
        Some(FirmwareFormat::MotorolaSRecord)
    }
}

/// `:LLAAAATT<data>CC` where the byte sum including the checksum is 0 mod 256.
pub fn is_intel_hex_record(line: &[u8]) -> bool {
    let Some(body) = line.strip_prefix(b":") else {
        return false;
    };
    let Some(bytes) = decode_hex_pairs(body) else {
        return false;
    };

    // length, 2 address bytes, type, checksum
    if bytes.len() < 5 {
        return false;
    }
    let data_len = bytes[0] as usize;
    if bytes.len() != data_len + 5 {
        return false;
    }
    if bytes[3] > 0x05 {
        return false;
    }

    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0
}

/// `S<type><count><address><data><checksum>`; the checksum is the ones'
/// complement of the low byte of the sum of count, address and data.
pub fn is_srecord(line: &[u8]) -> bool {
    if line.len() < 4 || line[0] != b'S' {
        return false;
    }

    let address_len = match line[1] {
        b'0' | b'1' | b'5' | b'9' => 2,
        b'2' | b'6' | b'8' => 3,
        b'3' | b'7' => 4,
        _ => return false,
    };

    let Some(bytes) = decode_hex_pairs(&line[2..]) else {
        return false;
    };
    let count = bytes[0] as usize;
    if bytes.len() != count + 1 || count < address_len + 1 {
        return false;
    }

    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) == 0xFF
}

fn decode_hex_pairs(hex: &[u8]) -> Option<Vec<u8>> {
    if hex.is_empty() || hex.len() % 2 != 0 {
        return None;
    }
    hex.chunks(2)
        .map(|pair| Some(hex_value(pair[0])? << 4 | hex_value(pair[1])?))
        .collect()
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &line[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intel_hex_records() {
        assert!(is_intel_hex_record(b":10010000214601360121470136007EFE09D2190140"));
        assert!(is_intel_hex_record(b":00000001FF"));
        assert!(is_intel_hex_record(b":020000040800F2"));

        // bad checksum
        assert!(!is_intel_hex_record(b":10010000214601360121470136007EFE09D2190141"));
        // length byte disagrees with payload
        assert!(!is_intel_hex_record(b":0F010000214601360121470136007EFE09D2190140"));
        // unknown record type
        assert!(!is_intel_hex_record(b":00000009F7"));
        assert!(!is_intel_hex_record(b":"));
        assert!(!is_intel_hex_record(b":deadbeef"));
        assert!(!is_intel_hex_record(b": not a record"));
    }

    #[test]
    fn test_srecords() {
        assert!(is_srecord(b"S00F000068656C6C6F202020202000003C"));
        assert!(is_srecord(b"S11F00007C0802A6900100049421FFF07C6C1B787C8C23783C6000003863000026"));
        assert!(is_srecord(b"S5030003F9"));
        assert!(is_srecord(b"S9030000FC"));

        assert!(!is_srecord(b"S9030000FD"));
        assert!(!is_srecord(b"S4030000FC"));
        assert!(!is_srecord(b"Some text starting with S"));
        assert!(!is_srecord(b"S1"));
    }

    #[test]
    fn test_detect_threshold() {
        let thresholds = FirmwareThresholds::default();
        let image = b":10010000214601360121470136007EFE09D2190140\n\
                      :100110002146017E17C20001FF5F16002148011928\n\
                      :10012000194E79234623965778239EDA3F01B2CAA7\n\
                      :100130003F0156702B5E712B722B732146013421C7\n\
                      :00000001FF\n";
        assert_eq!(detect(image, &thresholds), Some(FirmwareFormat::IntelHex));

        // colon-prefixed prose never reaches the threshold
        let notes = b":note one\n:note two\n:note three\n:note four\n:note five\n";
        assert_eq!(detect(notes, &thresholds), None);

        // too few lines to decide
        assert_eq!(detect(b":00000001FF\n", &thresholds), None);
    }

    #[test]
    fn test_detect_srecord_with_crlf_and_blank_lines() {
        let image = b"S00F000068656C6C6F202020202000003C\r\n\r\n\
                      S5030003F9\r\n\
                      S9030000FC\r\n\
                      S5030003F9\r\n\
                      S9030000FC\r\n";
        assert_eq!(
            detect(image, &FirmwareThresholds::default()),
            Some(FirmwareFormat::MotorolaSRecord)
        );
    }
}
