//! Adapter for carriers that answer with a `print_r`-style text dump.
//!
//! Scans are listed oldest first, each under a `[ScanDetail]` header; the
//! latest scan is the last such section.

use trackfill_shared::{Outcome, Result};
use url::Url;

use super::CarrierAdapter;
use crate::endpoint::EndpointTemplate;

const SECTION_MARKER: &str = "[ScanDetail]";
const INSTRUCTIONS_KEY: &str = "[Instructions] => ";
const STATUS_DATETIME_KEY: &str = "[StatusDateTime] => ";

/// Scan-log adapter (Delhivery-style key/value dumps).
pub struct ScanLogAdapter {
    family: String,
    endpoint: EndpointTemplate,
}

impl ScanLogAdapter {
    pub fn new(family: &str, endpoint: EndpointTemplate) -> Self {
        Self {
            family: family.to_string(),
            endpoint,
        }
    }
}

impl CarrierAdapter for ScanLogAdapter {
    fn family(&self) -> &str {
        &self.family
    }

    fn request_url(&self, tracking_id: &str) -> Result<Url> {
        self.endpoint.url_for(tracking_id)
    }

    fn parse(&self, body: &str) -> Outcome {
        parse_scan_log(body)
    }
}

/// Read `Instructions` and `StatusDateTime` from the last `[ScanDetail]` section.
pub fn parse_scan_log(body: &str) -> Outcome {
    let Some(start) = body.rfind(SECTION_MARKER) else {
        return Outcome::NotFound;
    };
    let section = &body[start..];

    match (
        value_after(section, INSTRUCTIONS_KEY),
        value_after(section, STATUS_DATETIME_KEY),
    ) {
        (Some(instructions), Some(status_datetime)) => {
            Outcome::from_parts(instructions, status_datetime)
        }
        _ => Outcome::NotFound,
    }
}

/// Text following `key` up to the end of its line.
fn value_after<'a>(section: &'a str, key: &str) -> Option<&'a str> {
    let start = section.find(key)? + key.len();
    section[start..].lines().next().or(Some(""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_fixture(name: &str) -> String {
        let path = format!("../../../fixtures/delhivery/{name}");
        std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("missing fixture: {path}"))
    }

    #[test]
    fn reads_last_scan_section() {
        let outcome = parse_scan_log(&load_fixture("in_transit.txt"));
        assert_eq!(
            outcome,
            Outcome::Found {
                status_text: "Shipment arrived at destination hub".into(),
                status_timestamp: "2024-01-03T18:42:10".into(),
            }
        );
    }

    #[test]
    fn missing_marker_is_not_found() {
        assert_eq!(
            parse_scan_log(&load_fixture("no_scans.txt")),
            Outcome::NotFound
        );
    }

    #[test]
    fn section_without_keys_is_not_found() {
        let body = "Array\n(\n    [ScanDetail] => Array\n        (\n            [ScanType] => UD\n        )\n)\n";
        assert_eq!(parse_scan_log(body), Outcome::NotFound);
    }

    #[test]
    fn keys_before_last_marker_are_not_used() {
        let body = "[ScanDetail]\n[Instructions] => Picked up\n[StatusDateTime] => 2024-01-01T09:00:00\n[ScanDetail]\n[ScanType] => UD\n";
        assert_eq!(parse_scan_log(body), Outcome::NotFound);
    }

    #[test]
    fn value_at_end_of_body_without_newline() {
        let body = "[ScanDetail]\n[StatusDateTime] => 2024-01-02T11:00:00\n[Instructions] => Delivered";
        assert_eq!(
            parse_scan_log(body),
            Outcome::Found {
                status_text: "Delivered".into(),
                status_timestamp: "2024-01-02T11:00:00".into(),
            }
        );
    }

    #[test]
    fn crlf_line_endings_are_trimmed() {
        let body = "[ScanDetail]\r\n[Instructions] => Out for delivery\r\n[StatusDateTime] => 2024-01-02T07:00:00\r\n";
        assert_eq!(
            parse_scan_log(body),
            Outcome::Found {
                status_text: "Out for delivery".into(),
                status_timestamp: "2024-01-02T07:00:00".into(),
            }
        );
    }
}
