//! Field-level validation errors.
//!
//! Every write that comes from a form (checkout, registration, admin
//! product edits) is checked field by field. Errors are collected rather
//! than returned on the first failure so a client can highlight every bad
//! field at once.

use std::fmt;

use serde::Serialize;

/// A single failed field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Dotted path of the offending field (e.g. `shippingAddress.city`).
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl ValidationError {
    /// Create a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A non-empty collection of field errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Start an empty collector.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// A collection holding a single error.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self(vec![ValidationError::new(field, message)])
    }

    /// Record a failure.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationError::new(field, message));
    }

    /// Record a failure when `failed` is true.
    pub fn check(&mut self, failed: bool, field: &str, message: &str) {
        if failed {
            self.add(field, message);
        }
    }

    /// Require a non-blank string.
    pub fn require(&mut self, value: &str, field: &str, message: &str) {
        self.check(value.trim().is_empty(), field, message);
    }

    /// Require a string whose trimmed length (in chars) lies in `min..=max`.
    pub fn length(&mut self, value: &str, field: &str, min: usize, max: usize, message: &str) {
        let len = value.trim().chars().count();
        self.check(len < min || len > max, field, message);
    }

    /// Whether no errors were recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded errors.
    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// The first error's message, used as the headline of a response.
    #[must_use]
    pub fn first_message(&self) -> &str {
        self.0.first().map_or("Invalid input", |e| e.message.as_str())
    }

    /// Convert into a `Result`, failing if anything was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one error was recorded.
    pub fn finish(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.first_message())
    }
}

impl std::error::Error for ValidationErrors {}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_all_failures() {
        let mut errors = ValidationErrors::new();
        errors.require("", "fullName", "Full name is required");
        errors.require("  ", "city", "City is required");
        errors.require("Lisbon", "country", "Country is required");

        let err = errors.finish().unwrap_err();
        assert_eq!(err.errors().len(), 2);
        assert_eq!(err.first_message(), "Full name is required");
        assert_eq!(err.to_string(), "Full name is required");
    }

    #[test]
    fn test_length_bounds() {
        let mut errors = ValidationErrors::new();
        errors.length("ok", "name", 1, 100, "bad");
        assert!(errors.is_empty());
        errors.length(&"x".repeat(101), "name", 1, 100, "too long");
        assert_eq!(errors.errors()[0].field, "name");
    }

    #[test]
    fn test_serializes_as_list() {
        let errors = ValidationErrors::single("email", "Invalid email");
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"field": "email", "message": "Invalid email"}])
        );
    }
}
