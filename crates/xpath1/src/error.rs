use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum XPathError {
    #[error("XPath syntax error in '{expression}': {reason}")]
    Syntax { expression: String, reason: String },

    #[error("Unknown XPath function '{0}'")]
    UnknownFunction(String),

    #[error("Function '{function}' error: {message}")]
    FunctionError { function: String, message: String },

    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Variable '${0}' is not bound")]
    UnboundVariable(String),
}
