//! Text sanitizer for hosts whose native encoding is the Windows-31J code page.
//!
//! On such hosts every string is NFC-composed and any character that does not
//! survive a CP932 round trip is dropped. Everywhere else text passes through
//! untouched. Non-text values are always returned as-is. Nothing here fails;
//! dropped characters are lost silently.

use encoding_rs::SHIFT_JIS;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;

use crate::document::Document;

/// Applies the per-platform text adjustment to strings, JSON values and documents.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sanitizer {
    legacy: bool,
}

impl Sanitizer {
    /// Sanitizer matching the current build target (`legacy` on Windows).
    pub fn for_host() -> Self {
        Self {
            legacy: cfg!(windows),
        }
    }

    /// Always applies NFC + CP932 filtering.
    pub fn legacy() -> Self {
        Self { legacy: true }
    }

    /// Never changes anything.
    pub fn passthrough() -> Self {
        Self { legacy: false }
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    pub fn sanitize_str(&self, s: &str) -> String {
        if !self.legacy {
            return s.to_string();
        }
        s.nfc().filter(|ch| representable(*ch)).collect()
    }

    /// Strings are sanitized; numbers, booleans, null, arrays and objects are
    /// returned unchanged.
    pub fn sanitize_value(&self, value: Value) -> Value {
        match value {
            Value::String(s) => Value::String(self.sanitize_str(&s)),
            other => other,
        }
    }

    /// Sanitizes the page body and every metadata value.
    pub fn sanitize_document(&self, mut doc: Document) -> Document {
        if !self.legacy {
            return doc;
        }
        doc.page_content = self.sanitize_str(&doc.page_content);
        for value in doc.metadata.values_mut() {
            *value = self.sanitize_value(std::mem::take(value));
        }
        doc
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::for_host()
    }
}

/// A character is kept only if it encodes to CP932 and decodes back to itself.
/// Characters the encoder folds onto a different code point (`¥`, `‾`, `−`)
/// count as unrepresentable.
fn representable(ch: char) -> bool {
    if ch.is_ascii() {
        return true;
    }
    let mut buf = [0u8; 4];
    let (bytes, _, unmappable) = SHIFT_JIS.encode(ch.encode_utf8(&mut buf));
    if unmappable {
        return false;
    }
    let (decoded, malformed) = SHIFT_JIS.decode_without_bom_handling(&bytes);
    if malformed {
        return false;
    }
    let mut chars = decoded.chars();
    chars.next() == Some(ch) && chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn non_text_values_are_identity() {
        for s in [Sanitizer::legacy(), Sanitizer::passthrough()] {
            for v in [json!(42), json!(1.5), json!(true), json!(null), json!([1, "a"]), json!({"k": "ü"})] {
                assert_eq!(s.sanitize_value(v.clone()), v);
            }
        }
    }

    #[test]
    fn passthrough_leaves_text_alone() {
        let s = Sanitizer::passthrough();
        let text = "café ¥100 😀 か\u{3099}";
        assert_eq!(s.sanitize_str(text), text);
        assert_eq!(s.sanitize_value(json!(text)), json!(text));
    }

    #[test]
    fn legacy_composes_before_encoding() {
        let s = Sanitizer::legacy();
        assert_eq!(s.sanitize_str("か\u{3099}"), "が");
    }

    #[test]
    fn legacy_drops_unrepresentable_characters() {
        let s = Sanitizer::legacy();
        assert_eq!(s.sanitize_str("Widget😀"), "Widget");
        assert_eq!(s.sanitize_str("café"), "caf");
        assert_eq!(s.sanitize_str("¥100"), "100");
        assert_eq!(s.sanitize_str("在庫あり"), "在庫あり");
    }

    #[test]
    fn document_metadata_is_sanitized_value_by_value() {
        let doc = Document::new("name: Widget😀")
            .with_metadata("name", "Widget😀")
            .with_metadata("row", 3);
        let out = Sanitizer::legacy().sanitize_document(doc);
        assert_eq!(out.page_content, "name: Widget");
        assert_eq!(out.metadata["name"], json!("Widget"));
        assert_eq!(out.metadata["row"], json!(3));
    }
}
