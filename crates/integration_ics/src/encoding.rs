//! Text decode boundary for export bytes
//!
//! The portal serves exports in whatever encoding its backend happens to use.
//! Byte order marks win; otherwise UTF-8 is tried and rejected when it shows
//! the artifacts of a wrong guess.

use std::{borrow::Cow, fmt, sync::LazyLock};

use aho_corasick::{AhoCorasick, MatchKind};
use encoding_rs::{UTF_16BE, UTF_16LE, WINDOWS_1252};
use tracing::debug;

/// UTF-8 sequences that appear when UTF-8 text was decoded as Windows-1252
/// and re-encoded as UTF-8.
const MOJIBAKE_PAIRS: &[&str] = &[
    "Ã¤", "Ã¶", "Ã¼", "Ã„", "Ã–", "Ãœ", "ÃŸ", "Ã©", "Ã¨", "Ã¡", "â€",
];

static MOJIBAKE_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    #[allow(clippy::expect_used)] // Infallible with valid static patterns
    AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostFirst)
        .build(MOJIBAKE_PAIRS)
        .expect("Failed to build mojibake matcher")
});

/// Encoding chosen for a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// UTF-16 little endian, signalled by `FF FE`
    Utf16Le,
    /// UTF-16 big endian, signalled by `FE FF`
    Utf16Be,
    /// UTF-8 with a leading `EF BB BF`
    Utf8Bom,
    /// Plain UTF-8
    Utf8,
    /// UTF-8 that had been double-encoded and was repaired
    Utf8Repaired,
    /// Windows-1252 fallback
    Windows1252,
}

impl TextEncoding {
    /// Conventional label
    pub const fn label(self) -> &'static str {
        match self {
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf8Bom => "UTF-8 (BOM)",
            Self::Utf8 => "UTF-8",
            Self::Utf8Repaired => "UTF-8 (repaired)",
            Self::Windows1252 => "windows-1252",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Decoded export text with the encoding that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedText {
    pub text: String,
    pub encoding: TextEncoding,
}

impl DecodedText {
    fn new(text: impl Into<String>, encoding: TextEncoding) -> Self {
        Self {
            text: text.into(),
            encoding,
        }
    }
}

/// Decode export bytes to text, choosing the most plausible encoding
///
/// Never fails: undecodable sequences become replacement characters under the
/// Windows-1252 fallback, which maps every byte.
pub fn decode_calendar_bytes(bytes: &[u8]) -> DecodedText {
    if let Some(body) = bytes.strip_prefix(&[0xFF, 0xFE]) {
        let (text, _) = UTF_16LE.decode_without_bom_handling(body);
        return DecodedText::new(text, TextEncoding::Utf16Le);
    }
    if let Some(body) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let (text, _) = UTF_16BE.decode_without_bom_handling(body);
        return DecodedText::new(text, TextEncoding::Utf16Be);
    }
    if let Some(text) = bytes
        .strip_prefix(&[0xEF, 0xBB, 0xBF])
        .and_then(|body| std::str::from_utf8(body).ok())
    {
        return DecodedText::new(text, TextEncoding::Utf8Bom);
    }

    let decoded = match std::str::from_utf8(bytes) {
        Ok(text) if !text.contains('\u{FFFD}') => {
            if MOJIBAKE_MATCHER.is_match(text) {
                repair_double_encoding(text).map_or_else(
                    || DecodedText::new(windows_1252(bytes), TextEncoding::Windows1252),
                    |repaired| DecodedText::new(repaired, TextEncoding::Utf8Repaired),
                )
            } else {
                DecodedText::new(text, TextEncoding::Utf8)
            }
        },
        _ => DecodedText::new(windows_1252(bytes), TextEncoding::Windows1252),
    };

    debug!(encoding = %decoded.encoding, bytes = bytes.len(), "Decoded export bytes");
    decoded
}

fn windows_1252(bytes: &[u8]) -> Cow<'_, str> {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text
}

/// Undo one round of UTF-8 → Windows-1252 → UTF-8
fn repair_double_encoding(text: &str) -> Option<String> {
    let (raw, _, unmappable) = WINDOWS_1252.encode(text);
    if unmappable {
        return None;
    }
    String::from_utf8(raw.into_owned()).ok()
}
