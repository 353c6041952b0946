//! A codec for `key<nv>value<entry>key<nv>value` strings.
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! let headers = BTreeMap::from([("Accept", "text/xml"), ("Host", "example.org")]);
//! let text = restkit_codec::encode(&headers, ":", "\n");
//! assert_eq!(text, "Accept:text/xml\nHost:example.org");
//!
//! let decoded = restkit_codec::decode(&text, ":", "\n").unwrap();
//! assert_eq!(decoded["Host"], "example.org");
//! ```

pub mod codec;
pub mod error;

pub use codec::{Delimiter, MapCodec, decode, encode, encode_entry};
pub use error::CodecError;
