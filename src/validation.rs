//! Validation support for create/update payloads.
//!
//! Repositories run [`Validatable::validate`] before persisting. Implement it on
//! your create/update models to reject bad input with a structured error map:
//!
//! ```rust
//! use repokit::validation::{Validatable, ValidationError, ValidationErrors};
//!
//! pub struct ProductCreate {
//!     pub name: String,
//!     pub price: i64,
//! }
//!
//! impl Validatable for ProductCreate {
//!     fn validate(&self) -> Result<(), ValidationErrors> {
//!         let mut errors = ValidationErrors::new();
//!         if self.name.len() < 3 {
//!             errors.add(ValidationError::new("name", "must be at least 3 characters"));
//!         }
//!         if self.price <= 0 {
//!             errors.add(ValidationError::new("price", "must be positive"));
//!         }
//!         errors.into_result()
//!     }
//! }
//! ```

use serde::Serialize;
use std::fmt;

/// A single validation failure: the offending field plus a human-readable message.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Collection of validation errors, surfaced together so clients see every
/// failing field in one response.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// Consume the collection, returning `Err(self)` if any error was recorded.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        let mut errors = Self::new();
        errors.add(error);
        errors
    }
}

/// Trait for payloads that carry their own validation rules.
///
/// The default implementation accepts everything, so models without rules can
/// be used directly.
pub trait Validatable {
    /// # Errors
    ///
    /// Returns every failing field as a [`ValidationErrors`] collection.
    fn validate(&self) -> Result<(), ValidationErrors> {
        Ok(())
    }
}
