use restkit::{Delimiter, ErrorKind, MapCodec, decode, encode};
use std::collections::{BTreeMap, HashMap};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn owned(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_round_trip_ignores_insertion_order() -> TestResult {
    let forward = vec![("x", "1"), ("y", "2")];
    let backward = vec![("y", "2"), ("x", "1")];
    let expected = owned(&[("x", "1"), ("y", "2")]);

    assert_eq!(decode(&encode(forward, "=", ";"), "=", ";")?, expected);
    assert_eq!(decode(&encode(backward, "=", ";"), "=", ";")?, expected);
    Ok(())
}

#[test]
fn test_missing_separator_yields_empty_value() -> TestResult {
    assert_eq!(decode("onlykey", "=", ";")?, owned(&[("onlykey", "")]));
    Ok(())
}

#[test]
fn test_blank_entries() -> TestResult {
    assert_eq!(decode("", "=", ";")?, owned(&[]));
    assert_eq!(decode("a=1;b=2;", "=", ";")?, owned(&[("a", "1"), ("b", "2")]));
    assert_eq!(decode("a=1;;b=2", "=", ";")?, owned(&[("a", "1"), ("", ""), ("b", "2")]));
    Ok(())
}

#[test]
fn test_header_block() -> TestResult {
    let headers = BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Authorization".to_string(), "Bearer a:b:c".to_string()),
    ]);
    let codec = MapCodec::default();
    let text = codec.encode(&headers);
    assert_eq!(text, "Authorization:Bearer a:b:c\nContent-Type:application/json");

    let decoded: BTreeMap<_, _> = codec.decode(&text)?.into_iter().collect();
    assert_eq!(decoded, headers);
    Ok(())
}

#[test]
fn test_configured_pattern_codec() -> TestResult {
    let config = restkit::Config::from_json(
        r#"{"codec": {"nv_sep": "=", "entry_sep": "[&;]", "delimiter": "pattern"}}"#,
    )?;
    assert_eq!(config.codec.delimiter, Delimiter::Pattern);
    assert_eq!(
        config.codec.decode("q=rust&page=2;sort=")?,
        owned(&[("q", "rust"), ("page", "2"), ("sort", "")])
    );
    Ok(())
}

#[test]
fn test_bad_separators_are_format_errors() {
    let empty = restkit::Error::from(decode("a=1", "", ";").unwrap_err());
    assert_eq!(empty.kind(), ErrorKind::Format);

    let bad_pattern = MapCodec::new("=", "[").with_pattern().decode("a=1").unwrap_err();
    assert_eq!(restkit::Error::from(bad_pattern).kind(), ErrorKind::Format);
}
