//! Lenient base64 handling for images embedded in provider responses.
//!
//! The validity check is a cheap shape test, not a full decode: it rejects
//! obvious garbage before `decode_image` does the real work.

use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::Lazy;
use regex::Regex;

use docgate_core::DocgateError;

static DATA_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^data:image/(?:jpeg|png|jpg);base64,(.*)$").unwrap());

static BASE64_SHAPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9+/=\s]+$").unwrap());

/// Shortest payload accepted as an image.
pub const MIN_BASE64_LEN: usize = 8;

/// Strip a `data:image/<jpeg|png|jpg>;base64,` prefix if present.
pub fn strip_data_url_prefix(s: &str) -> &str {
    match DATA_URL_RE.captures(s).and_then(|c| c.get(1)) {
        Some(m) => m.as_str(),
        None => s,
    }
}

/// Non-empty, at least `MIN_BASE64_LEN` long, and only base64 alphabet or
/// whitespace characters.
pub fn is_valid_base64(s: &str) -> bool {
    s.len() >= MIN_BASE64_LEN && BASE64_SHAPE_RE.is_match(s)
}

/// Strip, shape-check, and decode an embedded image.
pub fn decode_image(raw: &str) -> Result<Vec<u8>, DocgateError> {
    let payload = strip_data_url_prefix(raw);
    if !is_valid_base64(payload) {
        let preview: String = payload.chars().take(32).collect();
        return Err(DocgateError::Decode(format!("not base64: {preview}...")));
    }
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| DocgateError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_known_data_url_prefixes() {
        assert_eq!(strip_data_url_prefix("data:image/jpeg;base64,QUJDRA=="), "QUJDRA==");
        assert_eq!(strip_data_url_prefix("data:image/png;base64,QUJDRA=="), "QUJDRA==");
        assert_eq!(strip_data_url_prefix("QUJDRA=="), "QUJDRA==");
        // Unknown media types are left alone.
        assert_eq!(
            strip_data_url_prefix("data:image/gif;base64,QUJDRA=="),
            "data:image/gif;base64,QUJDRA=="
        );
    }

    #[test]
    fn shape_check() {
        assert!(is_valid_base64("QUJDREVGR0g="));
        assert!(is_valid_base64("QUJD REVG\nR0g="));
        assert!(!is_valid_base64(""));
        assert!(!is_valid_base64("QUJD"));
        assert!(!is_valid_base64("not*base64!!"));
    }

    #[test]
    fn decodes_with_prefix_and_whitespace() {
        let bytes = decode_image("data:image/jpeg;base64,QUJD\nREVG").unwrap();
        assert_eq!(bytes, b"ABCDEF");
    }

    #[test]
    fn shape_valid_but_undecodable_is_decode_error() {
        // Passes the shape test, fails real decoding (bad padding).
        let err = decode_image("QUJDRA=QUJDRA").unwrap_err();
        assert!(matches!(err, DocgateError::Decode(_)));
    }

    #[test]
    fn rejects_garbage_before_decoding() {
        let err = decode_image("<<<definitely not an image>>>").unwrap_err();
        assert!(err.to_string().contains("not base64"));
    }
}
