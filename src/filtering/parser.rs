//! Search-string parser.
//!
//! Turns the `search`/`filter` mini-language (`field:value;field2:op:value2`)
//! into structured directives, and `searchFields` into per-field operator
//! overrides. The parser never raises on partial input: malformed segments are
//! skipped. The only hard failure is a `searchFields` string whose every pair
//! was rejected by the accepted-conditions whitelist.

use std::collections::HashMap;

use crate::config::CriteriaConfig;
use crate::errors::RepoError;
use crate::filtering::conditions::ConditionOp;

/// One parsed `(field, operator, value)` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDirective {
    pub field: String,
    /// Explicit operator from a three-part segment, if any.
    pub operator: Option<ConditionOp>,
    pub value: String,
}

/// A raw search string is either field-scoped directives or a single free-text
/// term, resolved by the presence of `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchInput {
    Structured(Vec<SearchDirective>),
    FreeText(String),
    Empty,
}

/// Parse the `search` parameter.
#[must_use]
pub fn parse_search(raw: Option<&str>) -> SearchInput {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return SearchInput::Empty;
    };
    if raw.contains(':') {
        SearchInput::Structured(parse_segments(raw))
    } else {
        SearchInput::FreeText(raw.to_string())
    }
}

/// Parse a `;`-separated list of `field:value` / `field:op:value` segments.
/// Segments without a `:`, or with an empty field or value, are skipped.
#[must_use]
pub fn parse_segments(raw: &str) -> Vec<SearchDirective> {
    raw.split(';').filter_map(parse_segment).collect()
}

fn parse_segment(segment: &str) -> Option<SearchDirective> {
    let segment = segment.trim();
    let mut parts = segment.splitn(3, ':');
    let field = parts.next()?.trim();
    let second = parts.next()?.trim();
    let third = parts.next().map(str::trim);

    if field.is_empty() {
        return None;
    }

    let (operator, value) = match third {
        // field:op:value, but only when the middle token is a known operator;
        // otherwise the remainder is a value that happens to contain a colon.
        Some(third) => match ConditionOp::parse(second) {
            Some(op) => (Some(op), third.to_string()),
            None => (None, format!("{second}:{third}")),
        },
        None => (None, second.to_string()),
    };

    let needs_value = !matches!(operator, Some(ConditionOp::IsNull | ConditionOp::NotNull));
    if needs_value && value.is_empty() {
        return None;
    }

    Some(SearchDirective {
        field: field.to_string(),
        operator,
        value,
    })
}

/// Parse the `searchFields` parameter into field → operator overrides.
///
/// Pairs whose operator is not in the accepted-conditions whitelist are
/// dropped.
///
/// # Errors
///
/// If the parameter was supplied but every pair was rejected, returns
/// [`RepoError::BadRequest`] listing the accepted conditions.
pub fn parse_search_fields(
    raw: Option<&str>,
    config: &CriteriaConfig,
) -> Result<HashMap<String, ConditionOp>, RepoError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(HashMap::new());
    };

    let mut overrides = HashMap::new();
    for pair in raw.split(';') {
        let mut parts = pair.splitn(2, ':');
        let (Some(field), Some(op_raw)) = (parts.next(), parts.next()) else {
            continue;
        };
        let field = field.trim();
        if field.is_empty() {
            continue;
        }
        let Some(op) = ConditionOp::parse(op_raw) else {
            continue;
        };
        if config.accepts(op) {
            overrides.insert(field.to_string(), op);
        }
    }

    if overrides.is_empty() {
        return Err(RepoError::bad_request(format!(
            "No search fields were accepted. Accepted conditions are: {}",
            config.accepted_list()
        )));
    }

    Ok(overrides)
}
