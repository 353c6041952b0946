//! XML documents backed by roxmltree and the XPath 1.0 query API over them.
//!
//! ```
//! use restkit_xml::{ResultKind, compile, evaluate, parse};
//!
//! let doc = parse("<list><item>1</item><item>2</item></list>").unwrap();
//! let query = compile("count(//item)").unwrap();
//! let result = evaluate(&query, &doc, ResultKind::Number).unwrap();
//! assert_eq!(result.as_number(), Some(2.0));
//! ```

pub mod document;
pub mod error;
pub mod options;
pub mod query;

pub use document::{Node, XmlDocument, XmlNode};
pub use error::QueryError;
pub use options::ParseOptions;
pub use query::{
    CompiledQuery, NodeSnapshot, QueryResult, ResultKind, compile, evaluate, extract, extract_as,
    extract_count, extract_strings, extract_with, parse, parse_bytes, parse_with_options,
};
pub use restkit_xpath1::{DataSourceNode, NodeType};
