use crate::doc_processor::DocumentError;
use crate::llm::LlmError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{key} {message}")]
    Config { key: String, message: String },
    #[error("{0}")]
    Input(String),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        AppError::Config {
            key: key.to_string(),
            message: message.into(),
        }
    }

    /// Non-fatal input problems: shown as a warning, nothing is sent.
    pub fn is_warning(&self) -> bool {
        match self {
            AppError::Input(_) => true,
            AppError::Document(e) => e.is_warning(),
            _ => false,
        }
    }

    /// Errors that end the session rather than a single interaction.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::Config { .. } | AppError::Document(DocumentError::PdfUnavailable)
        )
    }
}
