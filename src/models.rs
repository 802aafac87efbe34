//! Request parameter model for the search/filter/sort mini-language.
//!
//! # Searching
//! The `search` parameter accepts either a structured string or free text:
//! - **Structured:** `field:value` pairs separated by `;`, with an optional
//!   operator as a middle segment: `name:john;age:>=:18`
//! - **Free text:** a value with no `:` is matched against every searchable
//!   field using each field's default operator.
//!
//! `searchFields` restricts or overrides the operator used per field for the
//! current request: `name:like;status:=`.
//!
//! # Filtering
//! `filter` uses the same syntax as `search` but its constraints are always
//! AND-joined, independent of the search join mode.
//!
//! # Sorting
//! `orderBy` and `sortedBy` are comma-separated lists paired positionally:
//! `orderBy=created_at,title&sortedBy=desc,asc`. A single direction broadcasts
//! to all fields.
//!
//! # Eager loading
//! `with=comments,author` requests declared relations.
//!
//! # Join mode
//! `searchJoin=and` forces AND between all search clauses (default is OR).

use serde::Deserialize;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};

use crate::config::ParamNames;

/// Query parameters driving criteria composition and pagination.
#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema, Default, PartialEq, Eq)]
#[into_params(parameter_in = Query)]
pub struct RequestParams {
    /// Structured search string or free text.
    ///
    /// Example: `name:john;role_id:abc123`
    #[param(example = "name:john;status:active")]
    pub search: Option<String>,

    /// Per-field operator overrides for the current search.
    ///
    /// Example: `name:like;status:=`
    #[serde(rename = "searchFields")]
    #[param(example = "name:like;status:=")]
    pub search_fields: Option<String>,

    /// Same syntax as `search`; constraints always AND-join.
    #[param(example = "status:active")]
    pub filter: Option<String>,

    /// Comma-separated sort fields.
    ///
    /// Example: `created_at,title`
    #[serde(rename = "orderBy")]
    #[param(example = "created_at,title")]
    pub order_by: Option<String>,

    /// Comma-separated sort directions, paired positionally with `orderBy`.
    ///
    /// Example: `desc,asc`
    #[serde(rename = "sortedBy")]
    #[param(example = "desc")]
    pub sorted_by: Option<String>,

    /// Comma-separated relation names to eager-load.
    #[param(example = "comments")]
    pub with: Option<String>,

    /// `and` forces AND between search clauses; anything else keeps OR.
    #[serde(rename = "searchJoin")]
    #[param(example = "and")]
    pub search_join: Option<String>,

    /// Page number (1-based).
    #[param(example = 1)]
    pub page: Option<u64>,

    /// Items per page.
    #[serde(rename = "perPage")]
    #[param(example = 15)]
    pub per_page: Option<u64>,
}

impl RequestParams {
    /// Build params from a raw query map using configurable parameter names.
    ///
    /// Hosts that mount the mini-language under different names pass their own
    /// [`ParamNames`]; unknown map entries are ignored.
    #[must_use]
    pub fn from_query_map(map: &HashMap<String, String>, names: &ParamNames) -> Self {
        let take = |key: &str| map.get(key).filter(|v| !v.is_empty()).cloned();
        Self {
            search: take(names.search),
            search_fields: take(names.search_fields),
            filter: take(names.filter),
            order_by: take(names.order_by),
            sorted_by: take(names.sorted_by),
            with: take(names.with),
            search_join: take(names.search_join),
            page: take("page").and_then(|v| v.parse().ok()),
            per_page: take("perPage").and_then(|v| v.parse().ok()),
        }
    }

    /// Whether the client asked for AND-joined search clauses.
    #[must_use]
    pub fn wants_and_join(&self) -> bool {
        self.search_join
            .as_deref()
            .is_some_and(|join| join.eq_ignore_ascii_case("and"))
    }

    /// Stable fingerprint of every criteria-relevant parameter, used in cache
    /// keys: same params produce the same fingerprint.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "s={};sf={};f={};ob={};sb={};w={};sj={}",
            self.search.as_deref().unwrap_or(""),
            self.search_fields.as_deref().unwrap_or(""),
            self.filter.as_deref().unwrap_or(""),
            self.order_by.as_deref().unwrap_or(""),
            self.sorted_by.as_deref().unwrap_or(""),
            self.with.as_deref().unwrap_or(""),
            self.search_join.as_deref().unwrap_or(""),
        )
    }
}
