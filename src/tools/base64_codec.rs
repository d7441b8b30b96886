use super::ToolError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Base64Mode {
    Encode,
    Decode,
}

/// Standard alphabet, padded.
pub fn encode(text: &str) -> String {
    STANDARD.encode(text.as_bytes())
}

/// Strict decode. The decoded bytes must be UTF-8 text.
pub fn decode(input: &str) -> Result<String, ToolError> {
    let bytes = STANDARD
        .decode(input.trim())
        .map_err(|e| ToolError::invalid(format!("Failed to decode. Invalid Base64: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|_| ToolError::invalid("Failed to decode. Decoded bytes are not UTF-8 text"))
}

pub fn run(mode: Base64Mode, input: &str) -> Result<String, ToolError> {
    match mode {
        Base64Mode::Encode => Ok(encode(input)),
        Base64Mode::Decode => decode(input),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_utf8_with_padding() {
        assert_eq!(encode("hi"), "aGk=");
        assert_eq!(encode("héllo"), "aMOpbGxv");
        assert_eq!(encode(""), "");
    }

    #[test]
    fn decode_ignores_surrounding_whitespace() {
        assert_eq!(decode("  aGk=\n").unwrap(), "hi");
    }

    #[test]
    fn decode_rejects_bad_alphabet_and_padding() {
        assert!(decode("not base64!").is_err());
        assert!(decode("aGk").is_err());
    }

    #[test]
    fn decode_rejects_binary_payloads() {
        // 0xff 0xfe
        let err = decode("//4=").unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[test]
    fn mode_parses_from_lowercase() {
        let mode: Base64Mode = serde_json::from_str("\"decode\"").unwrap();
        assert_eq!(run(mode, "aGk=").unwrap(), "hi");
    }
}
