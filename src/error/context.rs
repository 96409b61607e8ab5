//! Context helpers for attaching messages to foreign errors.

use super::{AriaError, Result};

/// Attach context to any error convertible into a boxed error.
pub trait ResultExt<T> {
    /// Wrap the error with a static message.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::WithContext` when `self` is an error.
    fn context(self, context: &str) -> Result<T>;

    /// Wrap the error with a lazily built message.
    ///
    /// # Errors
    ///
    /// Returns `AriaError::WithContext` when `self` is an error.
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: &str) -> Result<T> {
        self.map_err(|source| AriaError::WithContext {
            context: context.to_string(),
            source: Box::new(source),
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|source| AriaError::WithContext {
            context: f(),
            source: Box::new(source),
        })
    }
}

/// Turn a missing lookup into a typed not-found error.
pub trait OptionExt<T> {
    /// # Errors
    ///
    /// Returns `AriaError::NotFound` when `self` is `None`.
    fn or_not_found(self, kind: &'static str, id: impl ToString) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn or_not_found(self, kind: &'static str, id: impl ToString) -> Result<T> {
        self.ok_or_else(|| AriaError::not_found(kind, id))
    }
}
