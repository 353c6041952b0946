use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Malformed JSON: {0}")]
    Format(#[from] serde_json::Error),

    #[error("Cannot convert to XML: {0}")]
    Unsupported(String),

    #[error("Failed to render XML: {0}")]
    Render(String),
}
