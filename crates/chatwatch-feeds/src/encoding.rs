//! Legacy code page decoding.
//!
//! The client writes its chat log in the Japanese Windows code page (cp932,
//! a.k.a. windows-31j), not UTF-8. `encoding_rs`'s `SHIFT_JIS` decoder is the
//! WHATWG definition of that code page. Malformed or truncated sequences are
//! replaced with U+FFFD; decoding never fails.

use encoding_rs::{Encoding, SHIFT_JIS};

/// Encoding of the chat log files.
pub static LEGACY_ENCODING: &Encoding = SHIFT_JIS;

/// Text decoded from one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    /// At least one byte sequence was replaced.
    pub had_substitutions: bool,
}

/// Decode `bytes` with [`LEGACY_ENCODING`]. A BOM is not expected and is not
/// sniffed.
pub fn decode_legacy(bytes: &[u8]) -> Decoded {
    let (text, had_substitutions) = LEGACY_ENCODING.decode_without_bom_handling(bytes);
    Decoded {
        text: text.into_owned(),
        had_substitutions,
    }
}
