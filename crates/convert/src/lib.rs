//! JSON to XML conversion with fixed structural wrapping rules.
//!
//! - A root array becomes `<list><item>…</item></list>`, its entries named `array`.
//! - An object with a single key whose value is an array is wrapped in `<list>`.
//! - Every other object is emitted directly: keys become elements, arrays repeat
//!   their key once per entry.

pub mod converter;
pub mod error;
pub mod options;

pub use converter::{json_to_xml, json_to_xml_with, json_value_to_xml};
pub use error::ConvertError;
pub use options::ConvertOptions;
