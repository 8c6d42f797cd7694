//! Base64 and data-URI helpers for images travelling through JSON.
//!
//! `/analyze` hands the uploaded image back as `data:<mime>;base64,<payload>`
//! and `/download` receives it again. Only a `data:image/<word>;base64,`
//! prefix is stripped before decoding; anything else is decoded unmodified.

use std::sync::LazyLock;

use base64::{
    Engine as _, alphabet,
    engine::{
        DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig, general_purpose::STANDARD,
    },
};
use regex::Regex;

use crate::error::{Error, Result};

/// Standard alphabet, padding optional.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// URL-safe alphabet (`-` and `_`), padding optional.
const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[allow(clippy::expect_used)]
static IMAGE_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/\w+;base64,").expect("image prefix pattern is valid")
});

/// Encode raw bytes as standard (padded) base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Build a data URI from a MIME type and an already-encoded payload.
pub fn to_data_uri(mime_type: &str, base64: &str) -> String {
    format!("data:{mime_type};base64,{base64}")
}

/// Remove a leading `data:image/<word>;base64,` if present.
pub fn strip_image_prefix(input: &str) -> &str {
    IMAGE_PREFIX
        .find(input)
        .map_or(input, |m| &input[m.end()..])
}

/// Decode an image field from a `/download` body into raw bytes.
///
/// Padding is optional and the URL-safe alphabet is accepted as well.
pub fn decode_image_payload(input: &str) -> Result<Vec<u8>> {
    let payload = strip_image_prefix(input.trim());
    // Clients sometimes wrap long base64 lines
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();

    LENIENT
        .decode(compact.as_bytes())
        .or_else(|e| LENIENT_URL_SAFE.decode(compact.as_bytes()).map_err(|_| e))
        .map_err(|e| Error::ImageDecode(format!("invalid base64 image data: {e}")))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_payload_decodes_to_original() {
        let bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];
        let uri = to_data_uri("image/jpeg", &encode_base64(&bytes));

        assert!(uri.starts_with("data:image/jpeg;base64,"));
        assert_eq!(decode_image_payload(&uri).unwrap(), bytes);
    }

    #[test]
    fn test_strip_only_image_prefix() {
        assert_eq!(strip_image_prefix("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_image_prefix("data:image/webp;base64,QQ=="), "QQ==");
        // Not an image MIME type: left alone
        assert_eq!(
            strip_image_prefix("data:application/pdf;base64,AAAA"),
            "data:application/pdf;base64,AAAA"
        );
        // `svg+xml` is not a single word, so the prefix stays too
        assert_eq!(
            strip_image_prefix("data:image/svg+xml;base64,AAAA"),
            "data:image/svg+xml;base64,AAAA"
        );
        assert_eq!(strip_image_prefix("AAAA"), "AAAA");
    }

    #[test]
    fn test_bare_base64_is_decoded_as_is() {
        assert_eq!(decode_image_payload("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn test_unrecognised_prefix_fails_decoding() {
        let err = decode_image_payload("data:application/pdf;base64,aGVsbG8=").unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn test_unpadded_payload_is_accepted() {
        let bytes = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A];
        let padded = to_data_uri("image/png", &encode_base64(&bytes));
        assert!(padded.ends_with('='));

        let unpadded = padded.trim_end_matches('=');
        assert_eq!(decode_image_payload(unpadded).unwrap(), bytes);
        assert_eq!(decode_image_payload("aGVsbG8").unwrap(), b"hello");
    }

    #[test]
    fn test_url_safe_payload_is_accepted() {
        // 0xFB 0xFF encodes to `+/8=` in the standard alphabet
        assert_eq!(decode_image_payload("-_8=").unwrap(), [0xFB, 0xFF]);
        assert_eq!(decode_image_payload("-_8").unwrap(), [0xFB, 0xFF]);
        assert_eq!(decode_image_payload("+/8=").unwrap(), [0xFB, 0xFF]);
    }

    #[test]
    fn test_wrapped_base64_is_accepted() {
        assert_eq!(decode_image_payload("aGVs\nbG8=").unwrap(), b"hello");
    }
}
