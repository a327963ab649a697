//! Theme engine error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThemeError {
    /// A template failed to parse or render
    #[error("Template error: {0}")]
    TemplateError(String),

    /// An embedded template is not valid UTF-8
    #[error("Template '{0}' is not valid UTF-8")]
    InvalidEncoding(String),

    /// Reading an override template failed
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
