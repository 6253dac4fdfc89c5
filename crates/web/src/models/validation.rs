//! Form validation failures.

use thiserror::Error;

/// One or more human-readable validation messages.
///
/// Each message is shown to the user as its own flash, so they are kept in
/// the order the fields appear on the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", .0.join("; "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    /// A single validation message.
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }

    /// Record another message.
    pub fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded messages.
    #[must_use]
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    /// `Ok(value)` when nothing was recorded, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if at least one message was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}
