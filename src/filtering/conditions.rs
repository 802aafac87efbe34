//! Condition operators and the single-constraint translator.
//!
//! Every operator the request mini-language accepts is one [`ConditionOp`]
//! variant mapped to one constraint-building arm, so the supported set is
//! enumerable and testable.

use chrono::NaiveDate;
use sea_orm::Value;
use sea_orm::sea_query::{Alias, Expr, SimpleExpr};
use uuid::Uuid;

use crate::errors::RepoError;

const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// Basic field name validation for dynamically named columns.
#[must_use]
pub fn is_valid_field_name(field_name: &str) -> bool {
    !field_name.is_empty()
        && field_name.len() <= 100
        && !field_name.starts_with('_')
        && !field_name.contains("..")
        && field_name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// Identifier fields are matched exactly, never by substring.
#[must_use]
pub fn is_identifier_field(field_name: &str) -> bool {
    let leaf = field_name.rsplit('.').next().unwrap_or(field_name);
    leaf == "id" || leaf.ends_with("_id")
}

/// Escape LIKE wildcards to prevent wildcard injection.
fn escape_like_wildcards(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Comparison operators accepted by the search/filter mini-language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    NotLike,
    In,
    NotIn,
    Between,
    NotBetween,
    DateEquals,
    DateBetween,
    IsNull,
    NotNull,
}

impl ConditionOp {
    /// Parse the wire form used in `searchFields` and three-part search
    /// segments. Unknown strings yield `None` and the pair is dropped.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "=" | "eq" => Some(Self::Eq),
            "!=" | "<>" | "ne" => Some(Self::Ne),
            ">" | "gt" => Some(Self::Gt),
            ">=" | "gte" => Some(Self::Gte),
            "<" | "lt" => Some(Self::Lt),
            "<=" | "lte" => Some(Self::Lte),
            "like" => Some(Self::Like),
            "ilike" => Some(Self::Ilike),
            "not_like" => Some(Self::NotLike),
            "in" => Some(Self::In),
            "not_in" => Some(Self::NotIn),
            "between" => Some(Self::Between),
            "not_between" => Some(Self::NotBetween),
            "date_equals" | "date" => Some(Self::DateEquals),
            "date_between" => Some(Self::DateBetween),
            "null" | "is_null" => Some(Self::IsNull),
            "not_null" | "is_not_null" => Some(Self::NotNull),
            _ => None,
        }
    }

    /// Wire form, used in error messages listing accepted conditions.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::NotLike => "not_like",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::DateEquals => "date_equals",
            Self::DateBetween => "date_between",
            Self::IsNull => "null",
            Self::NotNull => "not_null",
        }
    }
}

/// Coerce a raw request value into a typed bind value: uuid, integer, float,
/// bool, then plain string.
#[must_use]
pub fn coerce_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    if let Ok(uuid) = Uuid::parse_str(trimmed) {
        return uuid.into();
    }
    if let Ok(int) = trimmed.parse::<i64>() {
        return int.into();
    }
    if let Ok(float) = trimmed.parse::<f64>() {
        return float.into();
    }
    if trimmed.eq_ignore_ascii_case("true") {
        return true.into();
    }
    if trimmed.eq_ignore_ascii_case("false") {
        return false.into();
    }
    trimmed.to_owned().into()
}

fn split_pair(field: &str, value: &str) -> Result<(String, String), RepoError> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
        Ok((parts[0].to_string(), parts[1].to_string()))
    } else {
        Err(RepoError::bad_request(format!(
            "Range value for field '{field}' must contain exactly two comma-separated parts"
        )))
    }
}

fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, RepoError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
        RepoError::bad_request(format!(
            "Value for field '{field}' must be a date in YYYY-MM-DD format"
        ))
    })
}

fn day_range(date: NaiveDate) -> (chrono::NaiveDateTime, chrono::NaiveDateTime) {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default();
    let end = date.and_hms_opt(23, 59, 59).unwrap_or_default();
    (start, end)
}

/// Translate one `(field, operator, value)` triple into a query constraint.
///
/// `like`/`ilike` against identifier fields (`id`, `*_id`) is rewritten to an
/// exact match on the opaque token instead of a wildcarded substring search.
///
/// # Errors
///
/// Rejects oversized values, malformed range arity, and unparseable dates with
/// [`RepoError::BadRequest`].
pub fn translate(field: &str, op: ConditionOp, value: &str) -> Result<SimpleExpr, RepoError> {
    if value.len() > MAX_FIELD_VALUE_LENGTH {
        return Err(RepoError::bad_request(format!(
            "Value for field '{field}' exceeds the maximum length"
        )));
    }

    let op = match op {
        ConditionOp::Like | ConditionOp::Ilike if is_identifier_field(field) => ConditionOp::Eq,
        other => other,
    };

    let column = || Expr::col(Alias::new(field));

    let expr = match op {
        ConditionOp::Eq => column().eq(coerce_value(value)),
        ConditionOp::Ne => column().ne(coerce_value(value)),
        ConditionOp::Gt => column().gt(coerce_value(value)),
        ConditionOp::Gte => column().gte(coerce_value(value)),
        ConditionOp::Lt => column().lt(coerce_value(value)),
        ConditionOp::Lte => column().lte(coerce_value(value)),
        ConditionOp::Like => column().like(format!("%{}%", escape_like_wildcards(value.trim()))),
        ConditionOp::NotLike => {
            column().not_like(format!("%{}%", escape_like_wildcards(value.trim())))
        }
        ConditionOp::Ilike => {
            // Case-insensitive LIKE portable across backends.
            let escaped = escape_like_wildcards(value.trim()).replace('\'', "''");
            SimpleExpr::Custom(format!("UPPER({field}) LIKE UPPER('%{escaped}%')"))
        }
        ConditionOp::In => {
            let values: Vec<Value> = value.split(',').map(coerce_value).collect();
            column().is_in(values)
        }
        ConditionOp::NotIn => {
            let values: Vec<Value> = value.split(',').map(coerce_value).collect();
            column().is_not_in(values)
        }
        ConditionOp::Between => {
            let (low, high) = split_pair(field, value)?;
            column().between(coerce_value(&low), coerce_value(&high))
        }
        ConditionOp::NotBetween => {
            let (low, high) = split_pair(field, value)?;
            column().not_between(coerce_value(&low), coerce_value(&high))
        }
        ConditionOp::DateEquals => {
            let (start, end) = day_range(parse_date(field, value)?);
            column().between(start, end)
        }
        ConditionOp::DateBetween => {
            let (low, high) = split_pair(field, value)?;
            let (start, _) = day_range(parse_date(field, &low)?);
            let (_, end) = day_range(parse_date(field, &high)?);
            column().between(start, end)
        }
        ConditionOp::IsNull => column().is_null(),
        ConditionOp::NotNull => column().is_not_null(),
    };

    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::{Query, SqliteQueryBuilder};

    fn render(expr: SimpleExpr) -> String {
        let mut select = Query::select();
        select
            .column(Alias::new("id"))
            .from(Alias::new("t"))
            .and_where(expr);
        select.to_string(SqliteQueryBuilder)
    }

    #[test]
    fn parses_every_accepted_operator() {
        for raw in [
            "=",
            "!=",
            ">",
            ">=",
            "<",
            "<=",
            "like",
            "ilike",
            "in",
            "between",
            "date_between",
            "null",
            "not_null",
        ] {
            assert!(ConditionOp::parse(raw).is_some(), "operator {raw} rejected");
        }
        assert!(ConditionOp::parse("regexp").is_none());
    }

    #[test]
    fn equality_coerces_numbers() {
        let sql = render(translate("age", ConditionOp::Eq, "18").unwrap());
        assert!(sql.contains(r#""age" = 18"#), "{sql}");
    }

    #[test]
    fn equality_keeps_strings() {
        let sql = render(translate("status", ConditionOp::Eq, "active").unwrap());
        assert!(sql.contains(r#""status" = 'active'"#), "{sql}");
    }

    #[test]
    fn like_wraps_in_wildcards() {
        let sql = render(translate("name", ConditionOp::Like, "john").unwrap());
        assert!(sql.contains("'%john%'"), "{sql}");
    }

    #[test]
    fn like_on_identifier_field_rewrites_to_exact_match() {
        let sql = render(translate("role_id", ConditionOp::Like, "abc123").unwrap());
        assert!(sql.contains(r#""role_id" = 'abc123'"#), "{sql}");
        assert!(!sql.contains('%'), "{sql}");

        let sql = render(translate("id", ConditionOp::Ilike, "42").unwrap());
        assert!(sql.contains(r#""id" = 42"#), "{sql}");
    }

    #[test]
    fn between_is_inclusive_range() {
        let sql = render(translate("age", ConditionOp::Between, "18,30").unwrap());
        assert!(sql.contains(r#""age" BETWEEN 18 AND 30"#), "{sql}");
    }

    #[test]
    fn between_rejects_wrong_arity() {
        assert!(translate("age", ConditionOp::Between, "18").is_err());
        assert!(translate("age", ConditionOp::Between, "18,20,30").is_err());
        assert!(translate("age", ConditionOp::Between, "18,").is_err());
    }

    #[test]
    fn date_between_expands_to_day_bounds() {
        let sql = render(
            translate("created_at", ConditionOp::DateBetween, "2024-01-01,2024-01-31").unwrap(),
        );
        assert!(sql.contains("2024-01-01 00:00:00"), "{sql}");
        assert!(sql.contains("2024-01-31 23:59:59"), "{sql}");
    }

    #[test]
    fn date_equals_rejects_garbage() {
        assert!(translate("created_at", ConditionOp::DateEquals, "not-a-date").is_err());
    }

    #[test]
    fn in_splits_on_commas() {
        let sql = render(translate("priority", ConditionOp::In, "1,2,3").unwrap());
        assert!(sql.contains(r#""priority" IN (1, 2, 3)"#), "{sql}");
    }

    #[test]
    fn like_escapes_wildcards_in_value() {
        let sql = render(translate("name", ConditionOp::Like, "50%").unwrap());
        assert!(sql.contains("%50\\%%"), "{sql}");
    }

    #[test]
    fn field_name_validation() {
        assert!(is_valid_field_name("name"));
        assert!(is_valid_field_name("comments.body"));
        assert!(!is_valid_field_name("_hidden"));
        assert!(!is_valid_field_name("a..b"));
        assert!(!is_valid_field_name("drop table"));
        assert!(!is_valid_field_name(""));
    }

    #[test]
    fn identifier_detection_covers_dot_paths() {
        assert!(is_identifier_field("id"));
        assert!(is_identifier_field("role_id"));
        assert!(is_identifier_field("comments.author_id"));
        assert!(!is_identifier_field("identity"));
        assert!(!is_identifier_field("idea"));
    }
}
