//! Service references and buffered EPG events.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::identity::normalize_namespace;

/// Titles longer than this are truncated before buffering.
pub const MAX_TITLE_CHARS: usize = 240;

/// Minimum number of `:`-separated fields in a usable service reference.
const MIN_FIELDS: usize = 7;

/// Canonical broadcast service identity parsed from a service reference
/// such as `1:0:19:2B66:3F3:1:C00000:0:0:0:`.
///
/// Fields 3 to 6 carry SID, TSID, ONID and the DVB namespace in hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServiceRef {
    /// Service ID.
    pub sid: u16,
    /// Transport Stream ID.
    pub tsid: u16,
    /// Original Network ID.
    pub onid: u16,
    /// Raw (unnormalized) DVB namespace.
    pub namespace: u32,
    raw: String,
}

impl ServiceRef {
    /// Parse a composite service reference.
    pub fn parse(reference: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = reference.split(':').collect();
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                expected: MIN_FIELDS,
                actual: fields.len(),
            });
        }

        Ok(Self {
            sid: parse_hex_u16("sid", fields[3])?,
            tsid: parse_hex_u16("tsid", fields[4])?,
            onid: parse_hex_u16("onid", fields[5])?,
            namespace: u32::from_str_radix(fields[6], 16).map_err(|_| ParseError::InvalidHex {
                field: "namespace",
                value: fields[6].to_string(),
            })?,
            raw: reference.to_string(),
        })
    }

    /// Namespace as stored in `T_Service.dvbnamespace`.
    pub fn dvb_namespace(&self) -> i64 {
        normalize_namespace(self.namespace)
    }

    /// The reference string this identity was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ServiceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_hex_u16(field: &'static str, value: &str) -> Result<u16, ParseError> {
    u16::from_str_radix(value, 16).map_err(|_| ParseError::InvalidHex {
        field,
        value: value.to_string(),
    })
}

/// One broadcast airing as delivered by an EPG source collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpgEvent {
    /// Start time (unix seconds).
    pub begin_time: i64,
    /// Duration in seconds.
    pub duration: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// ISO 639 language code.
    #[serde(default)]
    pub language: String,
}

impl EpgEvent {
    /// Create an event, truncating the title to [`MAX_TITLE_CHARS`] characters.
    pub fn new(
        begin_time: i64,
        duration: i64,
        title: &str,
        description: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            begin_time,
            duration,
            title: title.chars().take(MAX_TITLE_CHARS).collect(),
            description: description.into(),
            language: language.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_service_ref() {
        let service = ServiceRef::parse("1:0:1:1A2B:3:4:1FFFF").unwrap();
        assert_eq!(service.sid, 0x1A2B);
        assert_eq!(service.tsid, 3);
        assert_eq!(service.onid, 4);
        assert_eq!(service.namespace, 0x1FFFF);
        assert_eq!(service.dvb_namespace(), 0x1FFFF);
        assert_eq!(service.to_string(), "1:0:1:1A2B:3:4:1FFFF");
    }

    #[test]
    fn test_parse_service_ref_with_trailing_fields() {
        let service = ServiceRef::parse("1:0:19:2B66:3F3:1:C00000:0:0:0:").unwrap();
        assert_eq!(service.sid, 0x2B66);
        assert_eq!(service.tsid, 0x3F3);
        assert_eq!(service.onid, 1);
        assert_eq!(service.namespace, 0xC00000);
    }

    #[test]
    fn test_parse_too_few_fields() {
        let err = ServiceRef::parse("1:0:1:1A2B:3:4").unwrap_err();
        assert_eq!(
            err,
            ParseError::TooFewFields {
                expected: 7,
                actual: 6
            }
        );
    }

    #[test]
    fn test_parse_invalid_hex() {
        let err = ServiceRef::parse("1:0:1:XYZ:3:4:1FFFF").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHex { field: "sid", .. }));
    }

    #[test]
    fn test_negative_namespace_after_wrap() {
        let service = ServiceRef::parse("1:0:1:1:1:1:FFFF0000").unwrap();
        assert_eq!(service.dvb_namespace(), 0xFFFF0000_i64 - 4_294_967_296);
    }

    #[test]
    fn test_event_title_truncated() {
        let long_title = "ä".repeat(300);
        let event = EpgEvent::new(0, 60, &long_title, "", "deu");
        assert_eq!(event.title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_event_from_json() {
        let event: EpgEvent = serde_json::from_str(
            r#"{"begin_time": 100, "duration": 0, "title": "News"}"#,
        )
        .unwrap();
        assert_eq!(event.description, "");
        assert_eq!(event.duration, 0);
    }
}
