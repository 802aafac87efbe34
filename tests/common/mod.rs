use sea_orm::{ConnectionTrait, Database, DatabaseConnection, DbErr, EntityTrait, Set};
use uuid::Uuid;

pub mod comment_entity;
pub mod task_entity;

pub async fn setup_db() -> Result<DatabaseConnection, DbErr> {
    let db = Database::connect("sqlite::memory:").await?;

    db.execute_unprepared(
        "CREATE TABLE tasks (
            id blob NOT NULL PRIMARY KEY,
            title text NOT NULL,
            status text NOT NULL,
            priority integer NOT NULL,
            owner_id text NOT NULL,
            completed integer NOT NULL
        )",
    )
    .await?;
    db.execute_unprepared(
        "CREATE TABLE comments (
            id blob NOT NULL PRIMARY KEY,
            task_id blob NOT NULL,
            body text NOT NULL
        )",
    )
    .await?;

    Ok(db)
}

/// Four tasks with two comments, covering every status and a priority spread.
pub async fn seed(db: &DatabaseConnection) -> Result<Vec<Uuid>, DbErr> {
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let rows = [
        ("Write launch checklist", "active", 1, "u-100", false),
        ("Review admin access", "active", 3, "u-200", true),
        ("Archive old reports", "archived", 2, "u-100", true),
        ("Draft urgent memo", "pending", 5, "u-300", false),
    ];

    let tasks = ids.iter().zip(rows).map(|(id, (title, status, priority, owner, completed))| {
        task_entity::ActiveModel {
            id: Set(*id),
            title: Set(title.to_string()),
            status: Set(status.to_string()),
            priority: Set(priority),
            owner_id: Set(owner.to_string()),
            completed: Set(completed),
        }
    });
    task_entity::Entity::insert_many(tasks).exec(db).await?;

    let comments = [
        (ids[0], "urgent follow-up needed"),
        (ids[2], "routine cleanup"),
    ]
    .map(|(task_id, body)| comment_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        task_id: Set(task_id),
        body: Set(body.to_string()),
    });
    comment_entity::Entity::insert_many(comments).exec(db).await?;

    Ok(ids)
}
