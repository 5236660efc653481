use crate::steps::model::{LogEntry, Severity};
use chrono::{Local, NaiveDateTime, TimeZone};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";
const FIELD_DELIMITER: &str = " - ";

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum LogEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Latin1,
}

/// Tried in order; the first decoder that accepts the bytes wins.
pub const FALLBACK_ENCODINGS: [LogEncoding; 4] = [
    LogEncoding::Utf8,
    LogEncoding::Utf16Le,
    LogEncoding::Utf16Be,
    LogEncoding::Latin1,
];

impl LogEncoding {
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            LogEncoding::Utf8 => {
                let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
                std::str::from_utf8(bytes).ok().map(str::to_string)
            }
            LogEncoding::Utf16Le => bytes
                .strip_prefix(&[0xFF, 0xFE])
                .and_then(|rest| decode_utf16(rest, u16::from_le_bytes)),
            LogEncoding::Utf16Be => bytes
                .strip_prefix(&[0xFE, 0xFF])
                .and_then(|rest| decode_utf16(rest, u16::from_be_bytes)),
            LogEncoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

pub fn decode_log(bytes: &[u8]) -> Option<(String, LogEncoding)> {
    FALLBACK_ENCODINGS
        .iter()
        .find_map(|encoding| encoding.decode(bytes).map(|text| (text, *encoding)))
}

/// Parses `<timestamp> - <logger> - <LEVEL> - <message>`. Lines with any other
/// shape, an unknown level or an unparseable timestamp yield `None`.
pub fn parse_line(line: &str) -> Option<LogEntry> {
    let mut fields = line.trim_end_matches(['\r', '\n']).splitn(4, FIELD_DELIMITER);
    let timestamp = parse_timestamp(fields.next()?)?;
    let logger = fields.next()?.trim().to_string();
    let severity = fields.next()?.parse::<Severity>().ok()?;
    let message = fields.next()?.trim().to_string();
    Some(LogEntry {
        timestamp,
        logger,
        severity,
        message,
    })
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).ok()
}

/// Log timestamps are written in local wall-clock time.
pub fn to_epoch_millis(timestamp: &NaiveDateTime) -> Option<i64> {
    Local
        .from_local_datetime(timestamp)
        .earliest()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_framework_line() {
        let entry = parse_line(
            "2025-01-03 16:21:53,123 - automation_framework - INFO - Searching for project: XTM Test Automation team 20251010_185850",
        )
        .unwrap();
        assert_eq!(entry.logger, "automation_framework");
        assert_eq!(entry.severity, Severity::Info);
        assert_eq!(
            entry.message,
            "Searching for project: XTM Test Automation team 20251010_185850"
        );
        assert_eq!(
            entry.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            "2025-01-03 16:21:53,123"
        );
    }

    #[test]
    fn message_may_contain_the_delimiter() {
        let entry =
            parse_line("2025-01-03 16:21:53,123 - automation_framework - INFO - a - b - c").unwrap();
        assert_eq!(entry.message, "a - b - c");
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(parse_line("Traceback (most recent call last):"), None);
        assert_eq!(
            parse_line("2025-13-45 16:21:53,123 - automation_framework - INFO - bad month"),
            None
        );
        assert_eq!(
            parse_line("2025-01-03 16:21:53,123 - automation_framework - NOTICE - odd level"),
            None
        );
    }

    #[test]
    fn decodes_utf8_with_bom() {
        let (text, encoding) = decode_log(b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(text, "hello");
        assert_eq!(encoding, LogEncoding::Utf8);
    }

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "héllo".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let (text, encoding) = decode_log(&bytes).unwrap();
        assert_eq!(text, "héllo");
        assert_eq!(encoding, LogEncoding::Utf16Le);
    }

    #[test]
    fn falls_back_to_latin1() {
        let (text, encoding) = decode_log(b"caf\xE9").unwrap();
        assert_eq!(text, "café");
        assert_eq!(encoding, LogEncoding::Latin1);
    }
}
