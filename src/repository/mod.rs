//! Repository façade over Sea-ORM entities.
//!
//! [`RepoResource`] binds an entity to its searchable declaration and
//! lifecycle hooks; [`Repo`] is the per-instance façade carrying the criteria
//! stack. Every query method builds a fresh select, applies pending criteria,
//! executes, and returns — transient query state never leaks between calls.
//! Criteria themselves survive until [`Repo::clear_criteria`]; the
//! skip-criteria flag is an explicit override that stays set until turned off.

use async_trait::async_trait;
use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, DatabaseConnection, EntityTrait,
    IntoActiveModel, PaginatorTrait, QueryFilter, Select, entity::prelude::*,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::config::CriteriaConfig;
use crate::criteria::{Criterion, RequestCriteria};
use crate::errors::RepoError;
use crate::filtering::Searchable;
use crate::filtering::conditions::{ConditionOp, translate};
use crate::models::RequestParams;
use crate::presenter::Transformer;
use crate::validation::Validatable;

/// Apply an update payload onto an existing active model.
pub trait ApplyToActiveModel<A> {
    /// # Errors
    ///
    /// Returns a [`RepoError`] if the payload cannot be applied.
    fn apply_to(self, existing: A) -> Result<A, RepoError>;
}

/// Binds an entity to the repository machinery: searchable declaration,
/// create/update payload types, and lifecycle hooks.
#[async_trait]
pub trait RepoResource: Sized + Send + Sync + 'static
where
    <Self::Entity as EntityTrait>::Model:
        Sync + Serialize + IntoActiveModel<Self::ActiveModel>,
    <<Self::Entity as EntityTrait>::PrimaryKey as PrimaryKeyTrait>::ValueType: From<Uuid>,
{
    type Entity: EntityTrait;
    type ActiveModel: ActiveModelTrait<Entity = Self::Entity>
        + ActiveModelBehavior
        + Default
        + Send
        + Sync;
    type Create: Validatable + Into<Self::ActiveModel> + Send;
    type Update: Validatable + ApplyToActiveModel<Self::ActiveModel> + Send;

    /// Name used in errors and as the cache tag.
    const RESOURCE_NAME: &'static str;
    const TABLE_NAME: &'static str;

    /// Searchable-field whitelist and relation registry.
    fn searchable() -> Searchable;

    fn criteria_config() -> CriteriaConfig {
        CriteriaConfig::default()
    }

    /// Resolve a `with` include. The default ignores the request; resources
    /// with eager-loadable relations match on the name and add their joins.
    fn eager_load(select: Select<Self::Entity>, relation: &str) -> Select<Self::Entity> {
        let _ = relation;
        select
    }

    async fn before_create(
        _db: &DatabaseConnection,
        model: Self::ActiveModel,
    ) -> Result<Self::ActiveModel, RepoError> {
        Ok(model)
    }

    async fn after_create(
        _db: &DatabaseConnection,
        _model: &<Self::Entity as EntityTrait>::Model,
    ) -> Result<(), RepoError> {
        Ok(())
    }

    async fn before_update(
        _db: &DatabaseConnection,
        model: Self::ActiveModel,
    ) -> Result<Self::ActiveModel, RepoError> {
        Ok(model)
    }

    async fn after_update(
        _db: &DatabaseConnection,
        _model: &<Self::Entity as EntityTrait>::Model,
    ) -> Result<(), RepoError> {
        Ok(())
    }

    async fn before_delete(_db: &DatabaseConnection, _id: Uuid) -> Result<(), RepoError> {
        Ok(())
    }

    async fn after_delete(_db: &DatabaseConnection, _id: Uuid) -> Result<(), RepoError> {
        Ok(())
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<M> {
    pub data: Vec<M>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

const DEFAULT_PER_PAGE: u64 = 15;

/// Repository instance: owns the connection handle, a criteria stack, and an
/// optional presenter.
pub struct Repo<R: RepoResource> {
    db: DatabaseConnection,
    criteria: Vec<Arc<dyn Criterion<R>>>,
    skip_criteria: bool,
    presenter: Option<Arc<dyn Transformer<<R::Entity as EntityTrait>::Model>>>,
}

impl<R: RepoResource> Repo<R> {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            criteria: Vec::new(),
            skip_criteria: false,
            presenter: None,
        }
    }

    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    // ---- criteria stack ----------------------------------------------------

    pub fn push_criterion(&mut self, criterion: Arc<dyn Criterion<R>>) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    /// Convenience: build a [`RequestCriteria`] from request parameters using
    /// the resource's searchable declaration and config.
    pub fn push_request(&mut self, params: RequestParams) -> &mut Self {
        self.push_criterion(Arc::new(RequestCriteria::new(
            params,
            R::searchable(),
            R::criteria_config(),
        )))
    }

    pub fn pop_criterion(&mut self) -> Option<Arc<dyn Criterion<R>>> {
        self.criteria.pop()
    }

    pub fn clear_criteria(&mut self) -> &mut Self {
        self.criteria.clear();
        self
    }

    /// Toggle criteria application. Stays set until turned off again.
    pub fn skip_criteria(&mut self, skip: bool) -> &mut Self {
        self.skip_criteria = skip;
        self
    }

    /// Fingerprint of the currently effective criteria, folded into cache
    /// keys. Empty when the stack is empty or skipped.
    #[must_use]
    pub fn criteria_fingerprint(&self) -> String {
        if self.skip_criteria || self.criteria.is_empty() {
            return String::new();
        }
        self.criteria
            .iter()
            .map(|criterion| criterion.fingerprint())
            .collect::<Vec<_>>()
            .join("|")
    }

    /// Fresh select with pending criteria applied in insertion order.
    fn base_query(&self) -> Result<Select<R::Entity>, RepoError> {
        let mut select = R::Entity::find();
        if !self.skip_criteria {
            for criterion in &self.criteria {
                select = criterion.apply(select)?;
            }
        }
        Ok(select)
    }

    fn conditions_to_filter(
        conditions: &[(&str, ConditionOp, &str)],
    ) -> Result<Condition, RepoError> {
        let mut group = Condition::all();
        for (field, op, value) in conditions {
            group = group.add(translate(field, *op, value)?);
        }
        Ok(group)
    }

    // ---- reads -------------------------------------------------------------

    /// All records matching the pending criteria.
    ///
    /// # Errors
    ///
    /// Criteria translation failures and database errors.
    pub async fn all(&self) -> Result<Vec<<R::Entity as EntityTrait>::Model>, RepoError> {
        Ok(self.base_query()?.all(&self.db).await?)
    }

    /// First record matching the pending criteria, if any.
    pub async fn first(&self) -> Result<Option<<R::Entity as EntityTrait>::Model>, RepoError> {
        Ok(self.base_query()?.one(&self.db).await?)
    }

    /// Find by primary key; pending criteria still apply.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when no row matches.
    pub async fn find(&self, id: Uuid) -> Result<<R::Entity as EntityTrait>::Model, RepoError> {
        let mut select = R::Entity::find_by_id(id);
        if !self.skip_criteria {
            for criterion in &self.criteria {
                select = criterion.apply(select)?;
            }
        }
        select
            .one(&self.db)
            .await?
            .ok_or_else(|| RepoError::not_found(R::RESOURCE_NAME, Some(id.to_string())))
    }

    /// Records matching ad-hoc conditions on top of pending criteria.
    pub async fn find_where(
        &self,
        conditions: &[(&str, ConditionOp, &str)],
    ) -> Result<Vec<<R::Entity as EntityTrait>::Model>, RepoError> {
        let filter = Self::conditions_to_filter(conditions)?;
        Ok(self.base_query()?.filter(filter).all(&self.db).await?)
    }

    pub async fn find_where_in(
        &self,
        field: &str,
        values: &[&str],
    ) -> Result<Vec<<R::Entity as EntityTrait>::Model>, RepoError> {
        let expr = translate(field, ConditionOp::In, &values.join(","))?;
        Ok(self.base_query()?.filter(expr).all(&self.db).await?)
    }

    /// Inclusive range lookup: `field BETWEEN low AND high`.
    pub async fn find_where_between(
        &self,
        field: &str,
        low: &str,
        high: &str,
    ) -> Result<Vec<<R::Entity as EntityTrait>::Model>, RepoError> {
        let expr = translate(field, ConditionOp::Between, &format!("{low},{high}"))?;
        Ok(self.base_query()?.filter(expr).all(&self.db).await?)
    }

    /// Count of records matching the pending criteria.
    pub async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.base_query()?.count(&self.db).await?)
    }

    /// One page of results (1-based page numbers).
    pub async fn paginate(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<Page<<R::Entity as EntityTrait>::Model>, RepoError> {
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };
        let page = page.max(1);

        let paginator = self.base_query()?.paginate(&self.db, per_page);
        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page - 1).await?;
        Ok(Page {
            data,
            total,
            page,
            per_page,
        })
    }

    // ---- writes ------------------------------------------------------------

    /// Validate and insert.
    ///
    /// # Errors
    ///
    /// [`RepoError::ValidationFailed`] on rule violations, database errors
    /// otherwise.
    pub async fn create(
        &self,
        input: R::Create,
    ) -> Result<<R::Entity as EntityTrait>::Model, RepoError> {
        input.validate()?;
        let model: R::ActiveModel = input.into();
        let model = R::before_create(&self.db, model).await?;
        let created = model.insert(&self.db).await?;
        R::after_create(&self.db, &created).await?;
        Ok(created)
    }

    /// Validate and apply an update payload to an existing record.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when the record does not exist,
    /// [`RepoError::ValidationFailed`] on rule violations.
    pub async fn update(
        &self,
        id: Uuid,
        input: R::Update,
    ) -> Result<<R::Entity as EntityTrait>::Model, RepoError> {
        input.validate()?;
        let existing = R::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or_else(|| RepoError::not_found(R::RESOURCE_NAME, Some(id.to_string())))?;
        let active = input.apply_to(existing.into_active_model())?;
        let active = R::before_update(&self.db, active).await?;
        let updated = active.update(&self.db).await?;
        R::after_update(&self.db, &updated).await?;
        Ok(updated)
    }

    /// Find the first record matching `attributes`; update it when found,
    /// create otherwise. Returns the model and whether it was created.
    pub async fn update_or_create(
        &self,
        attributes: &[(&str, ConditionOp, &str)],
        create: R::Create,
        update: R::Update,
    ) -> Result<(<R::Entity as EntityTrait>::Model, bool), RepoError> {
        let filter = Self::conditions_to_filter(attributes)?;
        let existing = R::Entity::find().filter(filter).one(&self.db).await?;
        match existing {
            Some(model) => {
                update.validate()?;
                let active = update.apply_to(model.into_active_model())?;
                let active = R::before_update(&self.db, active).await?;
                let updated = active.update(&self.db).await?;
                R::after_update(&self.db, &updated).await?;
                Ok((updated, false))
            }
            None => Ok((self.create(create).await?, true)),
        }
    }

    /// Delete by primary key.
    ///
    /// # Errors
    ///
    /// [`RepoError::NotFound`] when nothing was deleted.
    pub async fn delete(&self, id: Uuid) -> Result<Uuid, RepoError> {
        R::before_delete(&self.db, id).await?;
        let result = R::Entity::delete_by_id(id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(RepoError::not_found(R::RESOURCE_NAME, Some(id.to_string())));
        }
        R::after_delete(&self.db, id).await?;
        Ok(id)
    }

    /// Delete everything matching the conditions, returning the row count.
    pub async fn delete_where(
        &self,
        conditions: &[(&str, ConditionOp, &str)],
    ) -> Result<u64, RepoError> {
        let filter = Self::conditions_to_filter(conditions)?;
        let result = R::Entity::delete_many()
            .filter(filter)
            .exec(&self.db)
            .await?;
        Ok(result.rows_affected)
    }

    // ---- presentation ------------------------------------------------------

    pub fn set_presenter(
        &mut self,
        presenter: Arc<dyn Transformer<<R::Entity as EntityTrait>::Model>>,
    ) -> &mut Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn clear_presenter(&mut self) -> &mut Self {
        self.presenter = None;
        self
    }

    fn present_collection(
        &self,
        models: &[<R::Entity as EntityTrait>::Model],
    ) -> Result<serde_json::Value, RepoError> {
        match &self.presenter {
            Some(presenter) => Ok(presenter.collection(models)),
            None => serde_json::to_value(models)
                .map(|data| serde_json::json!({ "data": data }))
                .map_err(|e| RepoError::internal("Serialization failed", Some(e.to_string()))),
        }
    }

    fn present_item(
        &self,
        model: &<R::Entity as EntityTrait>::Model,
    ) -> Result<serde_json::Value, RepoError> {
        match &self.presenter {
            Some(presenter) => Ok(presenter.item(model)),
            None => serde_json::to_value(model)
                .map(|data| serde_json::json!({ "data": data }))
                .map_err(|e| RepoError::internal("Serialization failed", Some(e.to_string()))),
        }
    }

    /// Like [`Repo::all`], re-wrapped through the presenter.
    pub async fn all_presented(&self) -> Result<serde_json::Value, RepoError> {
        let models = self.all().await?;
        self.present_collection(&models)
    }

    /// Like [`Repo::find`], re-wrapped through the presenter.
    pub async fn find_presented(&self, id: Uuid) -> Result<serde_json::Value, RepoError> {
        let model = self.find(id).await?;
        self.present_item(&model)
    }
}
