use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

/// Encode raw bytes for the content API
pub fn encode_content(content: &[u8]) -> String {
    BASE64.encode(content)
}

/// Decode content returned by the content API.
/// Forges wrap long base64 payloads, so whitespace is stripped first.
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    BASE64.decode(compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_wrapped_payload() {
        let decoded = decode_content("aGVsbG8g\nd29ybGQ=\n").unwrap();
        assert_eq!(decoded, b"hello world");
    }

    #[test]
    fn test_encode_content() {
        assert_eq!(encode_content(b"hello world"), "aGVsbG8gd29ybGQ=");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_content("not base64!").is_err());
    }
}
