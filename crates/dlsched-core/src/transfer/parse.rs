//! Parse HTTP response header lines into a ProbeResult.

use super::ProbeResult;

/// Only the last header block counts: every status line (one per redirect hop)
/// starts a fresh result.
pub(crate) fn parse_headers(lines: &[String]) -> ProbeResult {
    let mut result = ProbeResult::default();

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with("HTTP/") {
            result = ProbeResult::default();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                if let Ok(n) = value.parse::<u64>() {
                    result.content_length = Some(n);
                }
            }
            if name.eq_ignore_ascii_case("content-type") && !value.is_empty() {
                result.content_type = Some(value.to_string());
            }
        }
    }

    result
}
