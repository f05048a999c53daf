//! Percent-encoder and percent-decoder (§4.1): RFC 3986 and RFC 1738
//! variants, UTF-8 and ISO-8859-1 charsets.
//!
//! The UTF-8/RFC3986 path is built on the `percent-encoding` crate (the
//! same crate the query-string deserializer in the retrieval pack
//! depends on for this exact job); ISO-8859-1 and the numeric-entity
//! overflow path have no crate support and are hand-rolled byte
//! scanners, matching the tokenizer's own two-mode-scanner style
//! (`key/tokenizer.rs`).

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::QsError;
use crate::options::{Charset, Format};

/// RFC 3986 unreserved set, expressed as "everything NOT in this set
/// gets percent-encoded" (the `percent-encoding` crate's `AsciiSet`
/// convention): letters, digits, `-_.~` pass through.
const RFC3986_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Percent-encode `s` per §4.1.
///
/// Commas are restored unescaped after encoding in both charsets —
/// the reference codec never re-encodes `,` back to `%2C`, so array
/// values joined with `,` (the `comma` array format) round-trip
/// without double escaping.
pub fn encode(s: &str, charset: Charset, format: Format) -> String {
    let raw = match charset {
        Charset::Utf8 => utf8_percent_encode(s, RFC3986_ENCODE_SET).to_string(),
        Charset::Iso8859_1 => encode_iso8859_1(s),
    };
    let with_commas = raw.replace("%2C", ",").replace("%2c", ",");
    match format {
        Format::Rfc3986 => with_commas,
        Format::Rfc1738 => with_commas.replace("%20", "+"),
    }
}

fn encode_iso8859_1(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        let cp = ch as u32;
        if is_unreserved(ch) {
            out.push(ch);
        } else if cp <= 0xFF {
            out.push('%');
            out.push_str(&format!("{:02X}", cp));
        } else {
            // Above Latin-1: HTML numeric entity, itself percent-encoded.
            let entity = format!("&#{};", cp);
            out.push_str(&utf8_percent_encode(&entity, RFC3986_ENCODE_SET).to_string());
        }
    }
    out
}

fn is_unreserved(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '~')
}

/// Percent-decode `s` per §4.1. `+` always decodes to space, in either
/// charset, ahead of `%HH` processing.
///
/// In lax mode (`strict = false`) invalid `%HH` sequences and
/// otherwise-invalid byte sequences are recovered best-effort rather
/// than rejected, keeping `parse` infallible on arbitrary input (§7).
/// In strict mode any malformed escape is `QsError::InvalidPercentEncoding`.
pub fn decode(s: &str, charset: Charset, strict: bool) -> Result<String, QsError> {
    let with_spaces = s.replace('+', " ");
    match charset {
        Charset::Utf8 => decode_utf8(&with_spaces, strict),
        Charset::Iso8859_1 => Ok(decode_iso8859_1(&with_spaces, strict)?),
    }
}

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_utf8(s: &str, strict: bool) -> Result<String, QsError> {
    let bytes = s.as_bytes();
    let mut out: Vec<u8> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 < bytes.len() {
                if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    out.push((h << 4) | l);
                    i += 3;
                    continue;
                }
            }
            if strict {
                return Err(QsError::InvalidPercentEncoding);
            }
            out.push(b'%');
            i += 1;
            continue;
        }
        out.push(bytes[i]);
        i += 1;
    }
    match String::from_utf8(out) {
        Ok(decoded) => Ok(decoded),
        Err(e) if strict => {
            let _ = e;
            Err(QsError::InvalidPercentEncoding)
        }
        Err(e) => Ok(String::from_utf8_lossy(e.as_bytes()).into_owned()),
    }
}

fn decode_iso8859_1(s: &str, strict: bool) -> Result<String, QsError> {
    let bytes = s.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 < bytes.len() {
                if let (Some(h), Some(l)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                    out.push(((h << 4) | l) as char);
                    i += 3;
                    continue;
                }
            }
            if strict {
                return Err(QsError::InvalidPercentEncoding);
            }
            out.push('%');
            i += 1;
            continue;
        }
        let ch = s[i..].chars().next().expect("i is a char boundary");
        out.push(ch);
        i += ch.len_utf8();
    }
    Ok(out)
}
