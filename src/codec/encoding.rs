//! Base64 handling for cluster secret values.
//!
//! Clusters keep secret `data` values base64-encoded. Decoding is lenient:
//! anything that does not decode to UTF-8 text is kept as it was, so a
//! single hand-edited or already-decoded entry never aborts a fetch.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};

pub fn encode(value: &str) -> String {
    STANDARD.encode(value.as_bytes())
}

/// Strict decode, `None` when the value is not base64 of UTF-8 text.
pub fn try_decode(value: &str) -> Option<String> {
    let bytes = STANDARD.decode(value.trim()).ok()?;
    String::from_utf8(bytes).ok()
}

/// Decode a value, falling back to the original text on failure.
pub fn decode_lenient(value: &str) -> String {
    match try_decode(value) {
        Some(decoded) => decoded,
        None => {
            tracing::debug!("secret value is not base64, keeping it as is");
            value.to_string()
        }
    }
}

pub fn encode_map(data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.iter().map(|(k, v)| (k.clone(), encode(v))).collect()
}

pub fn decode_map(data: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    data.iter()
        .map(|(k, v)| (k.clone(), decode_lenient(v)))
        .collect()
}

/// Decode a token that may carry line breaks, as produced by MIME-style
/// encoders that wrap at 60 characters.
pub fn decode_wrapped(value: &str) -> Option<String> {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    try_decode(&compact)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_then_decode_map() {
        let mut data = BTreeMap::new();
        data.insert("password".to_string(), "very-secret-password".to_string());
        data.insert("token".to_string(), "very secret token".to_string());
        data.insert("empty".to_string(), String::new());

        assert_eq!(decode_map(&encode_map(&data)), data);
    }

    #[test]
    fn test_non_base64_passes_through() {
        assert_eq!(decode_lenient("very secret token"), "very secret token");
        assert_eq!(decode_lenient("not*base64!"), "not*base64!");
    }

    #[test]
    fn test_invalid_utf8_passes_through() {
        // "/w==" decodes to 0xFF which is not UTF-8
        assert_eq!(decode_lenient("/w=="), "/w==");
    }

    #[test]
    fn test_decodes_cluster_value() {
        assert_eq!(decode_lenient("aHVudGVyMg=="), "hunter2");
        assert_eq!(decode_lenient("aHVudGVyMg==\n"), "hunter2");
    }

    #[test]
    fn test_decode_wrapped() {
        assert_eq!(decode_wrapped("Ym9iOzEy\nMzQ=\n").as_deref(), Some("bob;1234"));
        assert_eq!(decode_wrapped("###"), None);
    }
}
