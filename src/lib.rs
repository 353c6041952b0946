//! Bridges between JSON, XML and flat delimited strings.
//!
//! - [`xml`]: parse XML and run XPath 1.0 queries over it.
//! - [`convert`]: turn JSON objects and arrays into XML.
//! - [`codec`]: encode and decode `key<nv>value<entry>...` strings.
//!
//! ```
//! use restkit::{Config, ResultKind};
//!
//! let xml = restkit::json_to_xml(r#"{"users":[{"name":"ann"},{"name":"bob"}]}"#)
//!     .unwrap()
//!     .unwrap();
//! let names = restkit::query("//name", &xml, ResultKind::NodeSet, &Config::default()).unwrap();
//! assert_eq!(names.to_string(), "ann\nbob");
//! ```

pub mod config;
pub mod error;

pub use restkit_codec as codec;
pub use restkit_convert as convert;
pub use restkit_xml as xml;
pub use restkit_xpath1 as xpath1;

pub use config::Config;
pub use error::{Error, ErrorKind};
pub use restkit_codec::{CodecError, Delimiter, MapCodec, decode, encode, encode_entry};
pub use restkit_convert::{ConvertError, ConvertOptions, json_to_xml, json_to_xml_with, json_value_to_xml};
pub use restkit_xml::{
    CompiledQuery, NodeSnapshot, ParseOptions, QueryError, QueryResult, ResultKind, XmlDocument,
    compile, evaluate, extract, extract_as, extract_count, extract_strings, parse, parse_bytes,
    parse_with_options,
};

use regex::Regex;

/// True when `pattern` matches anywhere in `text`.
pub fn regex_find(text: &str, pattern: &str) -> Result<bool, Error> {
    let regex = Regex::new(pattern).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })?;
    Ok(regex.is_match(text))
}

/// Parses `xml` and evaluates `expression` with the parse options and namespace bindings
/// from `config`. Matched nodes are copied out of the document.
pub fn query(
    expression: &str,
    xml: &str,
    kind: ResultKind,
    config: &Config,
) -> Result<QueryResult<NodeSnapshot>, Error> {
    let doc = parse_with_options(xml, &config.xml)?;
    let compiled = compile(expression)?.with_namespaces(&config.namespaces);
    let result = evaluate(&compiled, &doc, kind)?;
    Ok(result.map_nodes(NodeSnapshot::from))
}
