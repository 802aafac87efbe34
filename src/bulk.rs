//! Bulk insert/update/upsert/delete for a repository's entity.
//!
//! Inserts are batched through `insert_many` (default batch of 1000 rows).
//! Upsert classifies incoming records as insert-vs-update with a single
//! OR-of-ANDs probe query over the unique-column tuples, then inserts in
//! batches and updates one row at a time. The row-at-a-time update leg is a
//! known performance limitation of this scheme, kept deliberately.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, IdenStatic, Iterable, ModelTrait,
    PrimaryKeyToColumn, QueryFilter, Value,
};
use std::collections::HashSet;

use crate::errors::RepoError;
use crate::repository::{Repo, RepoResource};

pub const DEFAULT_BATCH_SIZE: usize = 1000;

type Col<R> = <<R as RepoResource>::Entity as EntityTrait>::Column;

/// Outcome of a [`Repo::bulk_upsert`] call.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct BulkReport {
    pub inserted: u64,
    pub updated: u64,
}

impl<R: RepoResource> Repo<R> {
    /// Insert all records in batches of [`DEFAULT_BATCH_SIZE`].
    ///
    /// # Errors
    ///
    /// Database errors from any batch.
    pub async fn bulk_insert(&self, records: Vec<R::ActiveModel>) -> Result<u64, RepoError> {
        self.bulk_insert_batched(records, DEFAULT_BATCH_SIZE).await
    }

    /// Insert all records in batches of `batch_size` rows.
    ///
    /// # Errors
    ///
    /// Database errors from any batch. Earlier batches stay committed.
    pub async fn bulk_insert_batched(
        &self,
        records: Vec<R::ActiveModel>,
        batch_size: usize,
    ) -> Result<u64, RepoError> {
        if records.is_empty() {
            return Ok(0);
        }
        let batch_size = batch_size.max(1);
        let total = records.len() as u64;
        let mut batch = Vec::with_capacity(batch_size.min(records.len()));
        for record in records {
            batch.push(record);
            if batch.len() == batch_size {
                R::Entity::insert_many(std::mem::take(&mut batch))
                    .exec_without_returning(self.db())
                    .await?;
            }
        }
        if !batch.is_empty() {
            R::Entity::insert_many(batch)
                .exec_without_returning(self.db())
                .await?;
        }
        Ok(total)
    }

    /// Insert-or-update on the unique-column tuple.
    ///
    /// Classification runs as one probe query: an OR of per-record AND groups
    /// over `unique_columns`. Records whose tuple already exists become
    /// updates, the rest become batched inserts. `update_columns` restricts
    /// which columns the update leg writes; `None` writes every set column
    /// except the unique ones. Calling twice with the same tuples inserts
    /// nothing the second time.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `unique_columns` is empty or a record carries no
    /// value for a unique column; database errors otherwise.
    pub async fn bulk_upsert(
        &self,
        records: Vec<R::ActiveModel>,
        unique_columns: &[Col<R>],
        update_columns: Option<&[Col<R>]>,
    ) -> Result<BulkReport, RepoError> {
        if records.is_empty() {
            return Ok(BulkReport::default());
        }
        if unique_columns.is_empty() {
            return Err(RepoError::bad_request(
                "bulk_upsert requires at least one unique column",
            ));
        }

        let mut probe = Condition::any();
        let mut tuples = Vec::with_capacity(records.len());
        for record in &records {
            let tuple = active_values(record, unique_columns)?;
            probe = probe.add(tuple_condition::<R::Entity>(unique_columns, &tuple));
            tuples.push(tuple);
        }

        let existing: HashSet<String> = R::Entity::find()
            .filter(probe)
            .all(self.db())
            .await?
            .iter()
            .map(|model| tuple_key(&model_values::<R::Entity>(model, unique_columns)))
            .collect();

        let mut inserts = Vec::new();
        let mut updates = Vec::new();
        for (record, tuple) in records.into_iter().zip(tuples) {
            if existing.contains(&tuple_key(&tuple)) {
                updates.push((record, tuple));
            } else {
                inserts.push(record);
            }
        }
        tracing::debug!(
            resource = R::RESOURCE_NAME,
            inserts = inserts.len(),
            updates = updates.len(),
            "bulk_upsert classified records"
        );

        let inserted = self.bulk_insert(inserts).await?;

        let mut updated = 0;
        for (record, tuple) in updates {
            updated += self
                .update_by_tuple(record, unique_columns, update_columns, &tuple)
                .await?;
        }

        Ok(BulkReport { inserted, updated })
    }

    /// Update each record's row, matched on the unique-column tuple. Rows
    /// without a match count zero; no classification probe runs.
    ///
    /// # Errors
    ///
    /// `BadRequest` on missing unique-column values; database errors
    /// otherwise.
    pub async fn bulk_update(
        &self,
        records: Vec<R::ActiveModel>,
        unique_columns: &[Col<R>],
        update_columns: Option<&[Col<R>]>,
    ) -> Result<u64, RepoError> {
        if unique_columns.is_empty() {
            return Err(RepoError::bad_request(
                "bulk_update requires at least one unique column",
            ));
        }
        let mut updated = 0;
        for record in records {
            let tuple = active_values(&record, unique_columns)?;
            updated += self
                .update_by_tuple(record, unique_columns, update_columns, &tuple)
                .await?;
        }
        Ok(updated)
    }

    /// Delete every row matching one of the unique-column tuples, as a single
    /// OR-of-ANDs statement.
    ///
    /// # Errors
    ///
    /// `BadRequest` when `unique_columns` is empty or a tuple's arity does
    /// not match it; database errors otherwise.
    pub async fn bulk_delete(
        &self,
        tuples: Vec<Vec<Value>>,
        unique_columns: &[Col<R>],
    ) -> Result<u64, RepoError> {
        if tuples.is_empty() {
            return Ok(0);
        }
        let condition = delete_condition::<R::Entity>(unique_columns, &tuples)?;
        let result = R::Entity::delete_many()
            .filter(condition)
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }

    async fn update_by_tuple(
        &self,
        record: R::ActiveModel,
        unique_columns: &[Col<R>],
        update_columns: Option<&[Col<R>]>,
        tuple: &[Value],
    ) -> Result<u64, RepoError> {
        let patch = update_patch(record, unique_columns, update_columns);
        let result = R::Entity::update_many()
            .set(patch)
            .filter(tuple_condition::<R::Entity>(unique_columns, tuple))
            .exec(self.db())
            .await?;
        Ok(result.rows_affected)
    }
}

/// AND group pinning each unique column to its tuple value.
fn tuple_condition<E: EntityTrait>(columns: &[E::Column], values: &[Value]) -> Condition {
    let mut group = Condition::all();
    for (col, value) in columns.iter().zip(values) {
        group = group.add(col.eq(value.clone()));
    }
    group
}

/// OR-of-ANDs over all tuples, rejecting arity mismatches up front.
fn delete_condition<E: EntityTrait>(
    columns: &[E::Column],
    tuples: &[Vec<Value>],
) -> Result<Condition, RepoError> {
    if columns.is_empty() {
        return Err(RepoError::bad_request(
            "bulk_delete requires at least one unique column",
        ));
    }
    let mut condition = Condition::any();
    for tuple in tuples {
        if tuple.len() != columns.len() {
            return Err(RepoError::bad_request(format!(
                "bulk_delete tuple has {} values but {} unique columns were given",
                tuple.len(),
                columns.len()
            )));
        }
        condition = condition.add(tuple_condition::<E>(columns, tuple));
    }
    Ok(condition)
}

fn active_values<A: ActiveModelTrait>(
    record: &A,
    columns: &[<A::Entity as EntityTrait>::Column],
) -> Result<Vec<Value>, RepoError> {
    columns
        .iter()
        .map(|col| {
            record.get(*col).into_value().ok_or_else(|| {
                RepoError::bad_request(format!(
                    "bulk record is missing a value for unique column '{}'",
                    col.as_str()
                ))
            })
        })
        .collect()
}

fn model_values<E: EntityTrait>(model: &E::Model, columns: &[E::Column]) -> Vec<Value> {
    columns.iter().map(|col| model.get(*col)).collect()
}

/// Composite key used to match incoming tuples against probed rows.
fn tuple_key(values: &[Value]) -> String {
    format!("{values:?}")
}

/// Strip primary-key and unique columns (and, when `update_columns` is
/// given, everything outside it) so the UPDATE never rewrites the match key
/// or the row identity.
fn update_patch<A: ActiveModelTrait>(
    mut record: A,
    unique_columns: &[<A::Entity as EntityTrait>::Column],
    update_columns: Option<&[<A::Entity as EntityTrait>::Column]>,
) -> A {
    for pk in <A::Entity as EntityTrait>::PrimaryKey::iter() {
        record.not_set(pk.into_column());
    }
    for col in <A::Entity as EntityTrait>::Column::iter() {
        let is_unique = unique_columns.iter().any(|c| c.as_str() == col.as_str());
        let allowed = update_columns
            .is_none_or(|allowed| allowed.iter().any(|c| c.as_str() == col.as_str()));
        if is_unique || !allowed {
            record.not_set(col);
        }
    }
    record
}
