//! Error and warning types shared by the algebra and the checker.

use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::span::Span;

/// Result alias used across the workspace.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised while building or checking an expression.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Structurally invalid use of a combinator, detectable without types.
    #[error("syntax error: {message}")]
    #[diagnostic(code(relspec::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: Span,
    },

    /// Arity or shape mismatch, ambiguity, or an exhausted unroll budget.
    #[error("type error: {message}")]
    #[diagnostic(code(relspec::type_error))]
    Type {
        message: String,
        #[label("here")]
        span: Span,
    },

    /// An internal inconsistency that user input should never trigger.
    #[error("fatal error: {message}")]
    #[diagnostic(code(relspec::fatal))]
    Fatal {
        message: String,
        #[label("here")]
        span: Span,
    },
}

impl Error {
    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Error::Syntax {
            message: message.into(),
            span,
        }
    }

    pub fn type_error(span: Span, message: impl Into<String>) -> Self {
        Error::Type {
            message: message.into(),
            span,
        }
    }

    pub fn fatal(span: Span, message: impl Into<String>) -> Self {
        Error::Fatal {
            message: message.into(),
            span,
        }
    }

    /// Get the source span of this error.
    pub fn span(&self) -> Span {
        match self {
            Error::Syntax { span, .. } => *span,
            Error::Type { span, .. } => *span,
            Error::Fatal { span, .. } => *span,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::Syntax { message, .. } => message,
            Error::Type { message, .. } => message,
            Error::Fatal { message, .. } => message,
        }
    }

    pub fn is_syntax(&self) -> bool {
        matches!(self, Error::Syntax { .. })
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Error::Type { .. })
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Fatal { .. })
    }
}

/// An advisory notice that does not stop checking.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Warning {
    pub message: String,
    pub span: Span,
}

impl Warning {
    pub fn new(span: Span, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "warning: {}", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_kind() {
        let err = Error::type_error(Span::new(0, 3), "arity mismatch");
        assert_eq!(err.to_string(), "type error: arity mismatch");
        assert!(err.is_type());
        assert_eq!(err.span(), Span::new(0, 3));
    }

    #[test]
    fn test_warning_display() {
        let warning = Warning::new(Span::UNKNOWN, "redundant comparison");
        assert_eq!(warning.to_string(), "warning: redundant comparison");
    }
}
