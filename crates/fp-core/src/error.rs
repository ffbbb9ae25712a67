use crate::span::Span;
use std::result;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A broken assumption about earlier phases, e.g. an operator overload
    /// that resolution promised but the member scope does not contain.
    #[error("internal compiler error: {message}")]
    Internal { message: String, span: Option<Span> },
    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
            span: None,
        }
    }

    pub fn internal_with_span(message: impl Into<String>, span: Span) -> Self {
        Error::Internal {
            message: message.into(),
            span: Some(span),
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Error::Internal { .. })
    }
}

pub type Result<T> = result::Result<T, Error>;

// Convert from eyre::Report to our Error type
impl From<eyre::Report> for Error {
    fn from(err: eyre::Report) -> Self {
        Error::Generic(err.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Generic(s)
    }
}
