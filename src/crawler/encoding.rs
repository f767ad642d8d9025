//! Body decoding
//!
//! Order of precedence: a charset declared in Content-Type, then a byte
//! order mark, then statistical detection for bodies containing non-ASCII
//! bytes, then UTF-8. Decoding is lossy and never fails.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

/// Where the encoding used for a body came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingSource {
    Declared,
    Bom,
    Detected,
    Default,
}

/// Decoded page text
#[derive(Debug, Clone)]
pub struct DecodedBody {
    pub text: String,
    pub encoding: &'static Encoding,
    pub source: EncodingSource,
    /// Whether malformed sequences were replaced with U+FFFD
    pub had_errors: bool,
}

impl DecodedBody {
    pub fn encoding_name(&self) -> &'static str {
        self.encoding.name()
    }
}

/// Decodes a response body to text
///
/// # Arguments
///
/// * `body` - Raw response bytes
/// * `declared` - Charset label from the Content-Type header, if any
/// * `tld_hint` - Top-level domain of the page, used to bias detection
pub fn decode_body(body: &[u8], declared: Option<&str>, tld_hint: Option<&str>) -> DecodedBody {
    let declared_encoding =
        declared.and_then(|label| Encoding::for_label(label.trim().as_bytes()));
    if let Some(encoding) = declared_encoding {
        let (text, had_errors) = encoding.decode_with_bom_removal(body);
        return finish(text.into_owned(), encoding, EncodingSource::Declared, had_errors);
    }

    if let Some((encoding, bom_len)) = Encoding::for_bom(body) {
        let (text, had_errors) = encoding.decode_without_bom_handling(&body[bom_len..]);
        return finish(text.into_owned(), encoding, EncodingSource::Bom, had_errors);
    }

    let mut detector = EncodingDetector::new();
    let saw_non_ascii = detector.feed(body, true);
    if saw_non_ascii {
        let tld = tld_hint.filter(|tld| is_detector_tld(tld)).map(str::as_bytes);
        let encoding = detector.guess(tld, true);
        let (text, had_errors) = encoding.decode_without_bom_handling(body);
        return finish(text.into_owned(), encoding, EncodingSource::Detected, had_errors);
    }

    let (text, had_errors) = UTF_8.decode_without_bom_handling(body);
    finish(text.into_owned(), UTF_8, EncodingSource::Default, had_errors)
}

fn finish(
    text: String,
    encoding: &'static Encoding,
    source: EncodingSource,
    had_errors: bool,
) -> DecodedBody {
    if had_errors {
        tracing::debug!(
            "Replaced malformed {} sequences while decoding ({:?})",
            encoding.name(),
            source
        );
    }

    DecodedBody {
        text,
        encoding,
        source,
        had_errors,
    }
}

/// The detector accepts a single lowercase ASCII label only
fn is_detector_tld(tld: &str) -> bool {
    !tld.is_empty()
        && tld
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
