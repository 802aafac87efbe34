//! Multi-column sort parsing.
//!
//! `orderBy` and `sortedBy` are comma-separated lists paired positionally.
//! When there are more fields than directions, the last direction is reused
//! for the remaining fields.

use sea_orm::Order;

use crate::filtering::conditions::is_valid_field_name;

const DEFAULT_SORT_ORDER: Order = Order::Asc;

/// One resolved sort instruction.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDirective {
    pub field: String,
    pub direction: Order,
}

fn parse_direction(raw: &str) -> Order {
    if raw.trim().eq_ignore_ascii_case("desc") {
        Order::Desc
    } else {
        Order::Asc
    }
}

/// Pair `orderBy` fields with `sortedBy` directions.
///
/// Fields that fail basic name validation are dropped; an empty or missing
/// `orderBy` yields no directives.
#[must_use]
pub fn parse_ordering(order_by: Option<&str>, sorted_by: Option<&str>) -> Vec<OrderDirective> {
    let Some(order_by) = order_by.map(str::trim).filter(|s| !s.is_empty()) else {
        return Vec::new();
    };

    let directions: Vec<Order> = sorted_by
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|raw| raw.split(',').map(parse_direction).collect())
        .unwrap_or_default();

    let last_direction = directions.last().cloned().unwrap_or(DEFAULT_SORT_ORDER);

    order_by
        .split(',')
        .map(str::trim)
        .filter(|field| is_valid_field_name(field))
        .enumerate()
        .map(|(index, field)| OrderDirective {
            field: field.to_string(),
            direction: directions.get(index).cloned().unwrap_or_else(|| last_direction.clone()),
        })
        .collect()
}
