//! Calendar byte sniffing
//!
//! Decides whether a response body is an iCalendar export without trusting
//! the content type, which the portal does not set reliably.

use encoding_rs::UTF_16LE;

const MARKER: &[u8] = b"BEGIN:VCALENDAR";
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Check whether `bytes` contain an iCalendar marker
///
/// Checks in order: the raw bytes as ASCII, then UTF-16LE after an `FF FE`
/// BOM, then UTF-16BE after an `FE FF` BOM (byte-swapped to LE first). The
/// marker match is case-insensitive.
pub fn looks_like_calendar(bytes: &[u8]) -> bool {
    if contains_marker(bytes) {
        return true;
    }

    if let Some(body) = bytes.strip_prefix(&UTF16_LE_BOM) {
        return utf16le_contains_marker(body);
    }

    if let Some(body) = bytes.strip_prefix(&UTF16_BE_BOM) {
        return utf16le_contains_marker(&swap_byte_pairs(body));
    }

    false
}

fn contains_marker(bytes: &[u8]) -> bool {
    bytes
        .windows(MARKER.len())
        .any(|window| window.eq_ignore_ascii_case(MARKER))
}

fn utf16le_contains_marker(bytes: &[u8]) -> bool {
    let (text, _) = UTF_16LE.decode_without_bom_handling(bytes);
    contains_marker(text.as_bytes())
}

fn swap_byte_pairs(bytes: &[u8]) -> Vec<u8> {
    let mut swapped = Vec::with_capacity(bytes.len());
    for pair in bytes.chunks(2) {
        match pair {
            [hi, lo] => {
                swapped.push(*lo);
                swapped.push(*hi);
            },
            [odd] => swapped.push(*odd),
            _ => {},
        }
    }
    swapped
}
