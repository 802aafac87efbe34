//! Request-driven filtering: the search mini-language parser, the condition
//! translator, sort parsing, and relation traversal.
//!
//! The flow: request parameters are parsed into directives
//! ([`parser`]), each directive resolves an operator against the resource's
//! searchable-field whitelist, and the translator ([`conditions`]) turns each
//! `(field, operator, value)` triple into one query constraint. Dot-notation
//! fields route through [`relations`] as sub-query constraints.

pub mod conditions;
pub mod parser;
pub mod relations;
pub mod sort;

pub use conditions::{ConditionOp, coerce_value, is_identifier_field, translate};
pub use parser::{SearchDirective, SearchInput, parse_search, parse_search_fields, parse_segments};
pub use relations::{RelationDef, relation_condition, split_relation_field};
pub use sort::{OrderDirective, parse_ordering};

/// Ordered whitelist of searchable fields and their default operators.
///
/// Declaration order matters: directives are applied in whitelist order.
/// Fields absent from the whitelist are silently ignored by search and filter
/// application (fail-open), unless strict mode is enabled on the config.
#[derive(Debug, Clone, Default)]
pub struct FieldWhitelist {
    entries: Vec<(String, ConditionOp)>,
}

impl FieldWhitelist {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a searchable field with its default operator. Re-declaring a
    /// field replaces its operator but keeps its original position.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, default_op: ConditionOp) -> Self {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = default_op;
        } else {
            self.entries.push((name, default_op));
        }
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    #[must_use]
    pub fn default_op(&self, name: &str) -> Option<ConditionOp> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, op)| *op)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ConditionOp)> {
        self.entries.iter().map(|(n, op)| (n.as_str(), *op))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a resource declares about request-driven querying: the field
/// whitelist plus the relation registry consulted for dot-notation fields and
/// the `with` parameter.
#[derive(Debug, Clone, Default)]
pub struct Searchable {
    pub fields: FieldWhitelist,
    pub relations: Vec<RelationDef>,
}

impl Searchable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, default_op: ConditionOp) -> Self {
        self.fields = self.fields.field(name, default_op);
        self
    }

    #[must_use]
    pub fn relation(mut self, def: RelationDef) -> Self {
        self.relations.push(def);
        self
    }

    /// Whether `name` is a declared relation (by last path segment), used to
    /// validate the `with` parameter.
    #[must_use]
    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.iter().any(|def| def.name() == name)
    }
}
