use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("XML parse error: {0}")]
    Parse(#[from] roxmltree::Error),

    #[error("Cannot read XML input: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid XPath expression '{expression}': {reason}")]
    InvalidQuery { expression: String, reason: String },

    #[error("Failed to evaluate '{expression}': {reason}")]
    Evaluation { expression: String, reason: String },
}
