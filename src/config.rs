//! Criteria configuration.
//!
//! All knobs the parser and applier consult are carried explicitly in a
//! [`CriteriaConfig`] handed in at construction time; nothing reads global
//! state from inside the translation code.

use crate::filtering::conditions::ConditionOp;

/// Names of the recognized request parameters. Hosts that expose the
/// mini-language under different parameter names override these when calling
/// [`crate::models::RequestParams::from_query_map`].
#[derive(Debug, Clone)]
pub struct ParamNames {
    pub search: &'static str,
    pub search_fields: &'static str,
    pub filter: &'static str,
    pub order_by: &'static str,
    pub sorted_by: &'static str,
    pub with: &'static str,
    pub search_join: &'static str,
}

impl Default for ParamNames {
    fn default() -> Self {
        Self {
            search: "search",
            search_fields: "searchFields",
            filter: "filter",
            order_by: "orderBy",
            sorted_by: "sortedBy",
            with: "with",
            search_join: "searchJoin",
        }
    }
}

/// Configuration consulted by the search parser and the criteria applier.
#[derive(Debug, Clone)]
pub struct CriteriaConfig {
    /// Server-side whitelist of operators clients may request.
    pub accepted_conditions: Vec<ConditionOp>,
    /// Recognized request parameter names.
    pub params: ParamNames,
    /// Join every search clause with AND regardless of the `searchJoin`
    /// parameter.
    pub force_and_where: bool,
    /// Reject directives on fields missing from the searchable whitelist
    /// instead of silently dropping them. Off by default for compatibility
    /// with clients that send extra parameters.
    pub strict_fields: bool,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            accepted_conditions: vec![
                ConditionOp::Eq,
                ConditionOp::Ne,
                ConditionOp::Gt,
                ConditionOp::Gte,
                ConditionOp::Lt,
                ConditionOp::Lte,
                ConditionOp::Like,
                ConditionOp::Ilike,
                ConditionOp::In,
                ConditionOp::NotIn,
                ConditionOp::Between,
                ConditionOp::NotBetween,
                ConditionOp::DateEquals,
                ConditionOp::DateBetween,
            ],
            params: ParamNames::default(),
            force_and_where: false,
            strict_fields: false,
        }
    }
}

impl CriteriaConfig {
    #[must_use]
    pub fn accepts(&self, op: ConditionOp) -> bool {
        self.accepted_conditions.contains(&op)
    }

    /// Human-readable list of accepted operators for error messages.
    #[must_use]
    pub fn accepted_list(&self) -> String {
        self.accepted_conditions
            .iter()
            .map(|op| op.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    #[must_use]
    pub fn with_force_and(mut self, force: bool) -> Self {
        self.force_and_where = force;
        self
    }

    #[must_use]
    pub fn with_strict_fields(mut self, strict: bool) -> Self {
        self.strict_fields = strict;
        self
    }
}
