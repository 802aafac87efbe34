//! Request-driven criteria: the core applier.
//!
//! Translates parsed search/filter/order/include directives into query
//! constraints against a resource's searchable-field whitelist. Unknown
//! fields are dropped (fail-open) unless strict mode is enabled; search
//! clauses group under OR by default and AND when forced; filter clauses
//! always AND.

use sea_orm::sea_query::{Alias, IntoColumnRef, SimpleExpr};
use sea_orm::{Condition, QueryFilter, QueryOrder, Select};

use crate::config::CriteriaConfig;
use crate::criteria::Criterion;
use crate::errors::RepoError;
use crate::filtering::conditions::{ConditionOp, is_valid_field_name, translate};
use crate::filtering::parser::{
    SearchDirective, SearchInput, parse_search, parse_search_fields, parse_segments,
};
use crate::filtering::relations::{relation_condition, split_relation_field};
use crate::filtering::sort::{OrderDirective, parse_ordering};
use crate::filtering::Searchable;
use crate::models::RequestParams;
use crate::repository::RepoResource;

/// Criterion translating request parameters into query constraints.
pub struct RequestCriteria {
    params: RequestParams,
    schema: Searchable,
    config: CriteriaConfig,
}

impl RequestCriteria {
    #[must_use]
    pub fn new(params: RequestParams, schema: Searchable, config: CriteriaConfig) -> Self {
        Self {
            params,
            schema,
            config,
        }
    }

    /// Build one constraint for a whitelisted field, routing dot-notation
    /// fields through the relation registry.
    fn field_condition(
        &self,
        field: &str,
        op: ConditionOp,
        value: &str,
    ) -> Result<Option<SimpleExpr>, RepoError> {
        if let Some((path, leaf)) = split_relation_field(field) {
            return relation_condition(&self.schema.relations, path, leaf, op, value);
        }
        if !is_valid_field_name(field) {
            return Ok(None);
        }
        translate(field, op, value).map(Some)
    }

    /// Build the search clause group, or `None` when no search applies.
    ///
    /// # Errors
    ///
    /// Fails on a fully rejected `searchFields` string, malformed range
    /// values, or (in strict mode) directives on unknown fields.
    pub fn search_condition(&self) -> Result<Option<Condition>, RepoError> {
        let overrides =
            parse_search_fields(self.params.search_fields.as_deref(), &self.config)?;
        let input = parse_search(self.params.search.as_deref());

        let mut clauses: Vec<SimpleExpr> = Vec::new();

        match input {
            SearchInput::Empty => return Ok(None),
            SearchInput::FreeText(term) => {
                // Free text matches every participating field with its
                // default (or overridden) operator.
                for (field, default_op) in self.schema.fields.iter() {
                    if !overrides.is_empty() && !overrides.contains_key(field) {
                        continue;
                    }
                    let op = overrides.get(field).copied().unwrap_or(default_op);
                    if let Some(expr) = self.field_condition(field, op, &term)? {
                        clauses.push(expr);
                    }
                }
            }
            SearchInput::Structured(directives) => {
                if self.config.strict_fields {
                    self.reject_unknown_fields(&directives)?;
                }
                // Whitelist order governs clause order.
                for (field, default_op) in self.schema.fields.iter() {
                    if !overrides.is_empty() && !overrides.contains_key(field) {
                        continue;
                    }
                    for directive in directives.iter().filter(|d| d.field == field) {
                        let op = self.resolve_operator(directive, &overrides, default_op);
                        let Some(op) = op else { continue };
                        if let Some(expr) = self.field_condition(field, op, &directive.value)? {
                            clauses.push(expr);
                        }
                    }
                }
            }
        }

        if clauses.is_empty() {
            return Ok(None);
        }

        let and_join = self.config.force_and_where || self.params.wants_and_join();
        let mut group = if and_join {
            Condition::all()
        } else {
            Condition::any()
        };
        for clause in clauses {
            group = group.add(clause);
        }
        Ok(Some(group))
    }

    /// Operator precedence: inline directive operator, then `searchFields`
    /// override, then the whitelist default. Inline operators outside the
    /// accepted set drop the directive.
    fn resolve_operator(
        &self,
        directive: &SearchDirective,
        overrides: &std::collections::HashMap<String, ConditionOp>,
        default_op: ConditionOp,
    ) -> Option<ConditionOp> {
        match directive.operator {
            Some(op) if self.config.accepts(op) => Some(op),
            Some(_) => None,
            None => Some(
                overrides
                    .get(&directive.field)
                    .copied()
                    .unwrap_or(default_op),
            ),
        }
    }

    fn reject_unknown_fields(&self, directives: &[SearchDirective]) -> Result<(), RepoError> {
        for directive in directives {
            if !self.schema.fields.contains(&directive.field) {
                return Err(RepoError::bad_request(format!(
                    "Field '{}' is not searchable",
                    directive.field
                )));
            }
        }
        Ok(())
    }

    /// Build the filter clause group: always AND, independent of the search
    /// join mode.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::search_condition`], minus the
    /// `searchFields` path.
    pub fn filter_condition(&self) -> Result<Option<Condition>, RepoError> {
        let Some(raw) = self.params.filter.as_deref() else {
            return Ok(None);
        };
        let directives = parse_segments(raw);
        if self.config.strict_fields {
            self.reject_unknown_fields(&directives)?;
        }

        let mut group = Condition::all();
        let mut any = false;
        for (field, default_op) in self.schema.fields.iter() {
            for directive in directives.iter().filter(|d| d.field == field) {
                let op = match directive.operator {
                    Some(op) if self.config.accepts(op) => op,
                    Some(_) => continue,
                    None => default_op,
                };
                if let Some(expr) = self.field_condition(field, op, &directive.value)? {
                    group = group.add(expr);
                    any = true;
                }
            }
        }

        Ok(any.then_some(group))
    }

    /// Resolved sort instructions. Dot-notation sort fields are dropped.
    #[must_use]
    pub fn order_directives(&self) -> Vec<OrderDirective> {
        parse_ordering(
            self.params.order_by.as_deref(),
            self.params.sorted_by.as_deref(),
        )
        .into_iter()
        .filter(|directive| !directive.field.contains('.'))
        .collect()
    }

    /// Relations requested via `with`, filtered to those the resource
    /// declares.
    #[must_use]
    pub fn includes(&self) -> Vec<String> {
        self.params
            .with
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|name| self.schema.has_relation(name))
                    .map(ToString::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl<R: RepoResource> Criterion<R> for RequestCriteria {
    fn apply(&self, mut select: Select<R::Entity>) -> Result<Select<R::Entity>, RepoError> {
        if let Some(condition) = self.search_condition()? {
            select = select.filter(condition);
        }
        if let Some(condition) = self.filter_condition()? {
            select = select.filter(condition);
        }
        for directive in self.order_directives() {
            select = select.order_by(
                SimpleExpr::Column(Alias::new(&directive.field).into_column_ref()),
                directive.direction,
            );
        }
        for relation in self.includes() {
            select = R::eager_load(select, &relation);
        }
        Ok(select)
    }

    fn fingerprint(&self) -> String {
        format!("request:{}", self.params.fingerprint())
    }
}
