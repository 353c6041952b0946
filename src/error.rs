use restkit_codec::CodecError;
use restkit_convert::ConvertError;
use restkit_xml::QueryError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Invalid regular expression '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration in '{}': {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// The failure categories shared by every component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed XML.
    Parse,
    /// An XPath expression that does not compile.
    InvalidQuery,
    /// A compiled query that cannot produce the requested result.
    Evaluation,
    /// Malformed JSON, a bad separator or pattern, or an unusable configuration.
    Format,
    /// Input that cannot be read.
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Query(QueryError::Parse(_)) => ErrorKind::Parse,
            Error::Query(QueryError::Io(_)) | Error::Io(_) => ErrorKind::Io,
            Error::Query(QueryError::InvalidQuery { .. }) => ErrorKind::InvalidQuery,
            Error::Query(QueryError::Evaluation { .. }) => ErrorKind::Evaluation,
            Error::Convert(_) | Error::Codec(_) | Error::Pattern { .. } | Error::Config { .. } => {
                ErrorKind::Format
            }
        }
    }
}
