use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

const BASE64_MARKER: &str = "base64,";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 image data: {0}")]
    InvalidBase64(String),
}

/// Decodes base64 image text, with or without a `data:` URL header.
///
/// Everything up to and including the first `base64,` is discarded. Line
/// wrapping inside the payload is ignored. Empty text decodes to an empty
/// buffer; rejecting it is left to `probe_image`.
pub fn decode_image_text(text: &str) -> Result<Vec<u8>, DecodeError> {
    let payload = strip_data_url_prefix(text.trim());
    let compact: String = payload
        .chars()
        .filter(|ch| !ch.is_ascii_whitespace())
        .collect();
    BASE64
        .decode(compact.as_bytes())
        .map_err(|err| DecodeError::InvalidBase64(err.to_string()))
}

/// Bare base64 text, no prefix.
pub fn encode_image_bytes(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

pub fn data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{mime_type};base64,{}", encode_image_bytes(bytes))
}

fn strip_data_url_prefix(text: &str) -> &str {
    if let Some((_, payload)) = text.split_once(BASE64_MARKER) {
        return payload;
    }
    if text.starts_with("data:") {
        if let Some((_, payload)) = text.split_once(',') {
            return payload;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &[u8] = b"\x89PNG\r\n\x1a\n not really a png \x00\xff";

    #[test]
    fn decode_reverses_encode() {
        let encoded = encode_image_bytes(SAMPLE);
        assert!(!encoded.starts_with("data:"));
        assert_eq!(decode_image_text(&encoded).unwrap(), SAMPLE);
    }

    #[test]
    fn data_url_prefix_is_discarded() {
        let encoded = encode_image_bytes(SAMPLE);
        let prefixed = format!("data:image/png;base64,{encoded}");
        assert_eq!(decode_image_text(&prefixed).unwrap(), SAMPLE);
        assert_eq!(decode_image_text(&data_url("image/jpeg", SAMPLE)).unwrap(), SAMPLE);
    }

    #[test]
    fn data_url_without_base64_marker_splits_on_comma() {
        let prefixed = format!("data:image/png,{}", encode_image_bytes(SAMPLE));
        assert_eq!(decode_image_text(&prefixed).unwrap(), SAMPLE);
    }

    #[test]
    fn wrapped_and_padded_text_decodes() {
        let encoded = encode_image_bytes(SAMPLE);
        let (head, tail) = encoded.split_at(8);
        let wrapped = format!("  {head}\n{tail}\r\n");
        assert_eq!(decode_image_text(&wrapped).unwrap(), SAMPLE);
    }

    #[test]
    fn empty_buffer_survives_encode_and_decode() {
        assert_eq!(encode_image_bytes(&[]), "");
        assert_eq!(decode_image_text(&encode_image_bytes(&[])).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_image_text(&data_url("image/png", &[])).unwrap(), Vec::<u8>::new());
        assert_eq!(decode_image_text(" \n ").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn invalid_payload_is_rejected() {
        let err = decode_image_text("data:image/png;base64,***not base64***").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidBase64(_)));
    }
}
