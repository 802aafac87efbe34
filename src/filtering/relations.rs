//! Relation-scoped constraints for dot-notation fields.
//!
//! A directive on `comments.body` constrains the owning row through a
//! sub-query on the related table. Multi-level paths
//! (`comments.author.name`) nest one sub-query per dot, resolved one level at
//! a time against the declared relation registry. Paths with no matching
//! declaration are dropped, the same fail-open policy as unknown fields.

use sea_orm::sea_query::{Alias, Expr, IntoColumnRef, Query, SimpleExpr};

use crate::errors::RepoError;
use crate::filtering::conditions::{ConditionOp, translate};

/// One declared relation hop, keyed by its full dot path from the root
/// resource (`"comments"`, `"comments.author"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationDef {
    /// Full dot path from the root resource to this relation.
    pub path: &'static str,
    /// Table the relation points at.
    pub table: &'static str,
    /// Column on the parent side compared against the sub-query.
    pub local_key: &'static str,
    /// Column on the related table referencing the parent.
    pub foreign_key: &'static str,
}

impl RelationDef {
    #[must_use]
    pub fn new(
        path: &'static str,
        table: &'static str,
        local_key: &'static str,
        foreign_key: &'static str,
    ) -> Self {
        Self {
            path,
            table,
            local_key,
            foreign_key,
        }
    }

    /// Last path segment, the name used by the `with` parameter.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.path.rsplit('.').next().unwrap_or(self.path)
    }
}

/// Split a dot-notation field into its relation path and leaf column.
/// Returns `None` for plain fields.
#[must_use]
pub fn split_relation_field(field: &str) -> Option<(&str, &str)> {
    let (path, leaf) = field.rsplit_once('.')?;
    if path.is_empty() || leaf.is_empty() {
        return None;
    }
    Some((path, leaf))
}

/// Build the nested sub-query constraint for a dot-notation directive.
///
/// Returns `Ok(None)` when any hop along the path is not declared in the
/// registry.
///
/// # Errors
///
/// Propagates translation failures from the leaf condition (malformed range
/// values, oversized input).
pub fn relation_condition(
    relations: &[RelationDef],
    path: &str,
    leaf: &str,
    op: ConditionOp,
    value: &str,
) -> Result<Option<SimpleExpr>, RepoError> {
    let segments: Vec<&str> = path.split('.').collect();

    // Resolve every hop up front: "a.b.c" needs defs for "a", "a.b", "a.b.c".
    let mut hops = Vec::with_capacity(segments.len());
    let mut prefix = String::new();
    for segment in &segments {
        if !prefix.is_empty() {
            prefix.push('.');
        }
        prefix.push_str(segment);
        match relations.iter().find(|def| def.path == prefix) {
            Some(def) => hops.push(def),
            None => return Ok(None),
        }
    }

    // Innermost condition on the deepest table, then wrap outward:
    // local_key IN (SELECT foreign_key FROM table WHERE ..)
    let mut expr = translate(leaf, op, value)?;
    for def in hops.iter().rev() {
        let mut sub = Query::select();
        sub.column(Alias::new(def.foreign_key))
            .from(Alias::new(def.table))
            .and_where(expr);
        expr = Expr::col(Alias::new(def.local_key).into_column_ref()).in_subquery(sub);
    }

    Ok(Some(expr))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::sea_query::SqliteQueryBuilder;

    fn render(expr: SimpleExpr) -> String {
        let mut select = Query::select();
        select
            .column(Alias::new("id"))
            .from(Alias::new("tasks"))
            .and_where(expr);
        select.to_string(SqliteQueryBuilder)
    }

    fn registry() -> Vec<RelationDef> {
        vec![
            RelationDef::new("comments", "comments", "id", "task_id"),
            RelationDef::new("comments.author", "users", "author_id", "id"),
        ]
    }

    #[test]
    fn splits_dot_fields() {
        assert_eq!(split_relation_field("comments.body"), Some(("comments", "body")));
        assert_eq!(
            split_relation_field("comments.author.name"),
            Some(("comments.author", "name"))
        );
        assert_eq!(split_relation_field("name"), None);
        assert_eq!(split_relation_field(".name"), None);
    }

    #[test]
    fn single_level_builds_in_subquery() {
        let expr = relation_condition(&registry(), "comments", "body", ConditionOp::Like, "hi")
            .unwrap()
            .expect("relation is declared");
        let sql = render(expr);
        assert!(
            sql.contains(r#""id" IN (SELECT "task_id" FROM "comments" WHERE "body" LIKE '%hi%')"#),
            "{sql}"
        );
    }

    #[test]
    fn nested_path_nests_subqueries() {
        let expr = relation_condition(
            &registry(),
            "comments.author",
            "name",
            ConditionOp::Eq,
            "ada",
        )
        .unwrap()
        .expect("both hops are declared");
        let sql = render(expr);
        assert!(
            sql.contains(r#""id" IN (SELECT "task_id" FROM "comments" WHERE "author_id" IN"#),
            "{sql}"
        );
        assert!(sql.contains(r#"(SELECT "id" FROM "users" WHERE "name" = 'ada')"#), "{sql}");
    }

    #[test]
    fn undeclared_path_is_dropped() {
        let expr =
            relation_condition(&registry(), "likes", "count", ConditionOp::Gt, "3").unwrap();
        assert!(expr.is_none());
    }

    #[test]
    fn identifier_rewrite_applies_to_relation_leaf() {
        let expr = relation_condition(
            &registry(),
            "comments",
            "author_id",
            ConditionOp::Like,
            "abc",
        )
        .unwrap()
        .expect("relation is declared");
        let sql = render(expr);
        assert!(sql.contains(r#""author_id" = 'abc'"#), "{sql}");
        assert!(!sql.contains('%'), "{sql}");
    }
}
