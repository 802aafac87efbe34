use repokit::{
    ApplyToActiveModel, ConditionOp, CriteriaConfig, RelationDef, RepoError, RepoResource,
    Searchable, Validatable, ValidationError, ValidationErrors,
};
use sea_orm::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "tasks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    pub status: String,
    pub priority: i32,
    pub owner_id: String,
    pub completed: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Clone, Debug, Deserialize)]
pub struct TaskCreate {
    pub title: String,
    pub status: String,
    pub priority: i32,
    pub owner_id: String,
    pub completed: bool,
}

impl Validatable for TaskCreate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.title.trim().is_empty() {
            errors.add(ValidationError::new("title", "must not be empty"));
        }
        if self.priority < 0 {
            errors.add(ValidationError::new("priority", "must not be negative"));
        }
        errors.into_result()
    }
}

impl From<TaskCreate> for ActiveModel {
    fn from(input: TaskCreate) -> Self {
        Self {
            id: Set(Uuid::new_v4()),
            title: Set(input.title),
            status: Set(input.status),
            priority: Set(input.priority),
            owner_id: Set(input.owner_id),
            completed: Set(input.completed),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i32>,
    pub completed: Option<bool>,
}

impl Validatable for TaskUpdate {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
            errors.add(ValidationError::new("title", "must not be empty"));
        }
        errors.into_result()
    }
}

impl ApplyToActiveModel<ActiveModel> for TaskUpdate {
    fn apply_to(self, mut existing: ActiveModel) -> Result<ActiveModel, RepoError> {
        if let Some(title) = self.title {
            existing.title = Set(title);
        }
        if let Some(status) = self.status {
            existing.status = Set(status);
        }
        if let Some(priority) = self.priority {
            existing.priority = Set(priority);
        }
        if let Some(completed) = self.completed {
            existing.completed = Set(completed);
        }
        Ok(existing)
    }
}

fn task_searchable() -> Searchable {
    Searchable::new()
        .field("title", ConditionOp::Like)
        .field("status", ConditionOp::Eq)
        .field("priority", ConditionOp::Eq)
        .field("completed", ConditionOp::Eq)
        .field("owner_id", ConditionOp::Like)
        .field("comments.body", ConditionOp::Like)
        .relation(RelationDef::new("comments", "comments", "id", "task_id"))
}

pub struct TaskResource;

impl RepoResource for TaskResource {
    type Entity = Entity;
    type ActiveModel = ActiveModel;
    type Create = TaskCreate;
    type Update = TaskUpdate;

    const RESOURCE_NAME: &'static str = "Task";
    const TABLE_NAME: &'static str = "tasks";

    fn searchable() -> Searchable {
        task_searchable()
    }
}

/// Same binding with fail-closed field handling.
pub struct StrictTaskResource;

impl RepoResource for StrictTaskResource {
    type Entity = Entity;
    type ActiveModel = ActiveModel;
    type Create = TaskCreate;
    type Update = TaskUpdate;

    const RESOURCE_NAME: &'static str = "Task";
    const TABLE_NAME: &'static str = "tasks";

    fn searchable() -> Searchable {
        task_searchable()
    }

    fn criteria_config() -> CriteriaConfig {
        CriteriaConfig::default().with_strict_fields(true)
    }
}
