use crate::error::CodecError;
use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Joins `key`, `nv_sep` and `value`.
pub fn encode_entry(key: &str, value: &str, nv_sep: &str) -> String {
    format!("{}{}{}", key, nv_sep, value)
}

/// Encodes entries in iteration order. No separator trails the last entry, and an empty
/// mapping encodes to the empty string.
pub fn encode<I, K, V>(entries: I, nv_sep: &str, entry_sep: &str) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    entries
        .into_iter()
        .map(|(k, v)| encode_entry(k.as_ref(), v.as_ref(), nv_sep))
        .join(entry_sep)
}

/// Decodes `text`, splitting entries on the literal `entry_sep`.
///
/// Keys and values are trimmed, an entry without `nv_sep` is a key with an empty value,
/// trailing blank entries are dropped and the last of several equal keys wins.
pub fn decode(text: &str, nv_sep: &str, entry_sep: &str) -> Result<HashMap<String, String>, CodecError> {
    check_separators(nv_sep, entry_sep)?;
    Ok(collect_entries(text.split(entry_sep), nv_sep))
}

fn check_separators(nv_sep: &str, entry_sep: &str) -> Result<(), CodecError> {
    if nv_sep.is_empty() {
        return Err(CodecError::Format("the name/value separator is empty".to_string()));
    }
    if entry_sep.is_empty() {
        return Err(CodecError::Format("the entry separator is empty".to_string()));
    }
    Ok(())
}

fn split_entry<'t>(entry: &'t str, nv_sep: &str) -> (&'t str, &'t str) {
    match entry.split_once(nv_sep) {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (entry.trim(), ""),
    }
}

/// Trailing blank entries are dropped, so blank text and a trailing separator add nothing.
/// A blank entry between two others is an empty key with an empty value.
fn collect_entries<'t>(entries: impl Iterator<Item = &'t str>, nv_sep: &str) -> HashMap<String, String> {
    let mut entries: Vec<&str> = entries.collect();
    while entries.last().is_some_and(|e| e.trim().is_empty()) {
        entries.pop();
    }
    let mut map = HashMap::new();
    for entry in entries {
        let (key, value) = split_entry(entry, nv_sep);
        if map.insert(key.to_string(), value.to_string()).is_some() {
            log::warn!("Duplicate key '{}' in delimited map, keeping the last value", key);
        }
    }
    log::debug!("Decoded {} entries from delimited map", map.len());
    map
}

/// How the entry separator is matched when decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// The separator is matched as plain text.
    #[default]
    Literal,
    /// The separator is a regular expression.
    Pattern,
}

/// A configured pair of separators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapCodec {
    pub nv_sep: String,
    pub entry_sep: String,
    pub delimiter: Delimiter,
}

impl Default for MapCodec {
    /// One `name:value` pair per line, as in HTTP headers.
    fn default() -> Self {
        Self {
            nv_sep: ":".to_string(),
            entry_sep: "\n".to_string(),
            delimiter: Delimiter::Literal,
        }
    }
}

impl MapCodec {
    pub fn new(nv_sep: impl Into<String>, entry_sep: impl Into<String>) -> Self {
        Self {
            nv_sep: nv_sep.into(),
            entry_sep: entry_sep.into(),
            delimiter: Delimiter::Literal,
        }
    }

    /// Treat the entry separator as a regular expression when decoding.
    pub fn with_pattern(mut self) -> Self {
        self.delimiter = Delimiter::Pattern;
        self
    }

    /// Encodes with the entry separator as written, whatever the delimiter mode.
    pub fn encode<I, K, V>(&self, entries: I) -> String
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        encode(entries, &self.nv_sep, &self.entry_sep)
    }

    pub fn decode(&self, text: &str) -> Result<HashMap<String, String>, CodecError> {
        match self.delimiter {
            Delimiter::Literal => decode(text, &self.nv_sep, &self.entry_sep),
            Delimiter::Pattern => {
                check_separators(&self.nv_sep, &self.entry_sep)?;
                let pattern = Regex::new(&self.entry_sep).map_err(|e| {
                    CodecError::Format(format!(
                        "invalid entry separator pattern '{}': {}",
                        self.entry_sep, e
                    ))
                })?;
                Ok(collect_entries(pattern.split(text), &self.nv_sep))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_encode_has_no_trailing_separator() {
        let entries = vec![("a", "1"), ("b", "2")];
        assert_eq!(encode(entries, "=", ";"), "a=1;b=2");
        assert_eq!(encode(vec![("only", "x")], "=", ";"), "only=x");
    }

    #[test]
    fn test_encode_empty_mapping() {
        assert_eq!(encode(HashMap::<String, String>::new(), "=", ";"), "");
        assert_eq!(encode(&BTreeMap::<String, String>::new(), "=", ";"), "");
    }

    #[test]
    fn test_encode_entry() {
        assert_eq!(encode_entry("Content-Type", "text/xml", ": "), "Content-Type: text/xml");
    }

    #[test]
    fn test_round_trip() {
        let original = map(&[("x", "1"), ("y", "2")]);
        let decoded = decode(&encode(&original, "=", ";"), "=", ";").unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_decode_missing_separator_is_an_empty_value() {
        assert_eq!(decode("onlykey", "=", ";").unwrap(), map(&[("onlykey", "")]));
        assert_eq!(decode(" spaced ;k=v", "=", ";").unwrap(), map(&[("spaced", ""), ("k", "v")]));
    }

    #[test]
    fn test_decode_splits_on_first_separator_and_trims() {
        let decoded = decode(" url = http://h/?a=b ; n=1", "=", ";").unwrap();
        assert_eq!(decoded, map(&[("url", "http://h/?a=b"), ("n", "1")]));
    }

    #[test]
    fn test_decode_drops_trailing_blank_entries() {
        assert_eq!(decode("", "=", ";").unwrap(), HashMap::new());
        assert_eq!(decode("  ", "=", ";").unwrap(), HashMap::new());
        assert_eq!(decode("a=1;b=2;;", "=", ";").unwrap(), map(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_decode_keeps_interior_blank_entry_as_empty_key() {
        assert_eq!(
            decode("a=1;;b=2", "=", ";").unwrap(),
            map(&[("a", "1"), ("", ""), ("b", "2")])
        );
    }

    #[test]
    fn test_decode_last_duplicate_wins() {
        assert_eq!(decode("a=1;a=2", "=", ";").unwrap(), map(&[("a", "2")]));
    }

    #[test]
    fn test_separators_are_literal() {
        assert_eq!(decode("a=1.b=2", "=", ".").unwrap(), map(&[("a", "1"), ("b", "2")]));
        assert_eq!(decode("a=1|b=2", "=", "|").unwrap(), map(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn test_empty_separators_are_rejected() {
        assert!(matches!(decode("a=1", "", ";"), Err(CodecError::Format(_))));
        assert!(matches!(decode("a=1", "=", ""), Err(CodecError::Format(_))));
    }

    #[test]
    fn test_pattern_delimiter() {
        let codec = MapCodec::new("=", r"\s*[;,]\s*").with_pattern();
        assert_eq!(codec.decode("a=1 ; b=2,c=3").unwrap(), map(&[("a", "1"), ("b", "2"), ("c", "3")]));

        let broken = MapCodec::new("=", "(").with_pattern();
        match broken.decode("a=1") {
            Err(CodecError::Format(reason)) => assert!(reason.contains("'('")),
            other => panic!("expected a format error, got {:?}", other),
        }
    }

    #[test]
    fn test_default_codec_reads_header_lines() {
        let codec = MapCodec::default();
        let headers = codec.decode("Content-Type: text/xml\r\nX-Id: 42\r\n").unwrap();
        assert_eq!(headers, map(&[("Content-Type", "text/xml"), ("X-Id", "42")]));
        assert_eq!(codec.encode(vec![("Accept", "*/*")]), "Accept:*/*");
    }

    #[test]
    fn test_codec_config() {
        let codec: MapCodec = serde_json::from_str(r#"{"entry_sep": "&", "delimiter": "pattern"}"#).unwrap();
        assert_eq!(codec.nv_sep, ":");
        assert_eq!(codec.entry_sep, "&");
        assert_eq!(codec.delimiter, Delimiter::Pattern);
    }
}
