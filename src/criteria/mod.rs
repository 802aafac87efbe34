//! Composable query criteria.
//!
//! A [`Criterion`] is a reusable constraint applied to a base query before
//! execution. Repositories own an ordered stack of criteria, applied in
//! insertion order; [`RequestCriteria`] is the request-driven implementation
//! and the usual entry point.

pub mod request;

pub use request::RequestCriteria;

use sea_orm::Select;

use crate::errors::RepoError;
use crate::repository::RepoResource;

/// A composable query constraint.
///
/// Implementations must be pure with respect to the select they receive:
/// return the constrained select, never execute it.
pub trait Criterion<R: RepoResource>: Send + Sync {
    /// Add this criterion's constraints to the query.
    ///
    /// # Errors
    ///
    /// Returns [`RepoError::BadRequest`] for malformed directive input.
    fn apply(&self, select: Select<R::Entity>) -> Result<Select<R::Entity>, RepoError>;

    /// Stable identity folded into cache keys: two criteria with the same
    /// fingerprint must constrain queries identically.
    fn fingerprint(&self) -> String;
}

/// Criterion built from a closure, for ad-hoc scopes.
pub struct FnCriterion<F> {
    label: String,
    func: F,
}

impl<F> FnCriterion<F> {
    pub fn new(label: impl Into<String>, func: F) -> Self {
        Self {
            label: label.into(),
            func,
        }
    }
}

impl<R, F> Criterion<R> for FnCriterion<F>
where
    R: RepoResource,
    F: Fn(Select<R::Entity>) -> Select<R::Entity> + Send + Sync,
{
    fn apply(&self, select: Select<R::Entity>) -> Result<Select<R::Entity>, RepoError> {
        Ok((self.func)(select))
    }

    fn fingerprint(&self) -> String {
        format!("fn:{}", self.label)
    }
}
