use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid mapping: {0}")]
    Config(#[from] serde_json::Error),

    #[error("xml error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("xml write error: {0}")]
    Write(#[from] quick_xml::Error),

    #[error("invalid path expression {expr:?}: {reason}")]
    InvalidPath { expr: String, reason: String },

    #[error("no questions found; check 'question_xpath' in the mapping")]
    NoQuestionsFound,
}

impl ConvertError {
    pub(crate) fn invalid_path(expr: &str, reason: impl Into<String>) -> Self {
        ConvertError::InvalidPath {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
