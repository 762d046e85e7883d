//! JSON text encoding with configurable escaping

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::core::error::ApiError;

/// Formatting options of the encoded body
///
/// Slashes and non-ASCII characters are left unescaped unless asked for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JsonOptions {
    pub pretty: bool,
    pub escape_slashes: bool,
    pub escape_unicode: bool,
}

/// Encode a document to response bytes
pub fn encode(value: &Value, options: &JsonOptions) -> Result<Bytes, ApiError> {
    let mut buffer = Vec::new();
    let written = if options.pretty {
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"    "));
        value.serialize(&mut serializer)
    } else {
        serde_json::to_writer(&mut buffer, value)
    };
    written.map_err(|e| ApiError::Internal(format!("JSON encoding failed: {}", e)))?;

    if !options.escape_slashes && !options.escape_unicode {
        return Ok(Bytes::from(buffer));
    }

    // both characters can only occur inside string literals
    let text = String::from_utf8(buffer)
        .map_err(|e| ApiError::Internal(format!("JSON encoding failed: {}", e)))?;
    let mut out = String::with_capacity(text.len());
    let mut units = [0u16; 2];
    for ch in text.chars() {
        match ch {
            '/' if options.escape_slashes => out.push_str("\\/"),
            ch if options.escape_unicode && !ch.is_ascii() => {
                for unit in ch.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
            ch => out.push(ch),
        }
    }

    Ok(Bytes::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn text(value: &Value, options: JsonOptions) -> String {
        String::from_utf8(encode(value, &options).unwrap().to_vec()).unwrap()
    }

    #[test]
    fn test_defaults_leave_slashes_and_unicode() {
        let value = json!({"url": "https://x.io/a", "name": "Zoë"});
        assert_eq!(
            text(&value, JsonOptions::default()),
            r#"{"url":"https://x.io/a","name":"Zoë"}"#
        );
    }

    #[test]
    fn test_escaping() {
        let value = json!({"url": "a/b", "name": "é😀"});
        let options = JsonOptions {
            escape_slashes: true,
            escape_unicode: true,
            ..Default::default()
        };
        assert_eq!(
            text(&value, options),
            r#"{"url":"a\/b","name":"\u00e9\ud83d\ude00"}"#
        );

        // escaped output still decodes to the same document
        let decoded: Value = serde_json::from_str(&text(&value, options)).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_pretty_uses_four_spaces() {
        let options = JsonOptions {
            pretty: true,
            ..Default::default()
        };
        assert_eq!(text(&json!({"a": 1}), options), "{\n    \"a\": 1\n}");
    }

    #[test]
    fn test_options_from_yaml() {
        let options: JsonOptions = serde_yaml::from_str("pretty: true\nescapeSlashes: true").unwrap();
        assert!(options.pretty && options.escape_slashes && !options.escape_unicode);
    }
}
