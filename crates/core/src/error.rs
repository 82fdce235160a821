//! Error types for the tidal query core.

use thiserror::Error;

/// Result type alias for tidal operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors raised by the store, the change detector and the incremental operators.
///
/// Precondition violations (`UnknownRetraction`, `StoreEnded`, `MissingOrder`,
/// `EmptyAggregateRemoval`) are fatal to the operator instance that raised them.
/// `Evaluation` errors are per-item and are normally recovered by dropping the item.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A retraction arrived for something that was never added.
    #[error("Retraction of {what} that was never added: {item}")]
    UnknownRetraction { what: &'static str, item: String },

    /// A mutation was attempted after the store ended.
    #[error("Store has ended, rejected {operation} of {quad}")]
    StoreEnded { operation: &'static str, quad: String },

    /// An ordered operator received a binding without order metadata.
    #[error("Binding is missing order metadata: {binding}")]
    MissingOrder { binding: String },

    /// A term was removed from an aggregate that holds nothing.
    #[error("Cannot remove {term} from empty {aggregate} aggregate")]
    EmptyAggregateRemoval { aggregate: &'static str, term: String },

    /// A term-level function failed for one item.
    #[error("Evaluation error: {message}")]
    Evaluation { message: String },

    /// The fetch boundary failed.
    #[error("Fetch of {url} failed: {message}")]
    Fetch { url: String, message: String },

    /// The parse boundary failed.
    #[error("Parse of {url} failed: {message}")]
    Parse { url: String, message: String },

    /// A malformed request reached an operator or the mediator.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates an unknown retraction error.
    pub fn unknown_retraction(what: &'static str, item: impl ToString) -> Self {
        Error::UnknownRetraction {
            what,
            item: item.to_string(),
        }
    }

    /// Creates a store ended error.
    pub fn store_ended(operation: &'static str, quad: impl ToString) -> Self {
        Error::StoreEnded {
            operation,
            quad: quad.to_string(),
        }
    }

    /// Creates a missing order metadata error.
    pub fn missing_order(binding: impl ToString) -> Self {
        Error::MissingOrder {
            binding: binding.to_string(),
        }
    }

    /// Creates an empty aggregate removal error.
    pub fn empty_aggregate_removal(aggregate: &'static str, term: impl ToString) -> Self {
        Error::EmptyAggregateRemoval {
            aggregate,
            term: term.to_string(),
        }
    }

    /// Creates an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Error::Evaluation {
            message: message.into(),
        }
    }

    /// Creates a fetch error.
    pub fn fetch(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Fetch {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(url: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }

    /// Returns true for per-item evaluation errors, which are recoverable.
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Error::Evaluation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::evaluation("not a number");
        assert!(err.to_string().contains("not a number"));

        let err = Error::store_ended("add", "<s> <p> <o> .");
        assert!(err.to_string().contains("add"));

        let err = Error::fetch("http://example.org/", "connection refused");
        assert!(err.to_string().contains("http://example.org/"));
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::unknown_retraction("binding", "{?x=1}");
        match err {
            Error::UnknownRetraction { what, .. } => assert_eq!(what, "binding"),
            _ => panic!("Wrong error type"),
        }
        assert!(Error::evaluation("x").is_evaluation());
        assert!(!Error::invalid_operation("x").is_evaluation());
    }
}
