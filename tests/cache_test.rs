mod common;

use common::task_entity::{TaskCreate, TaskResource, TaskUpdate};
use repokit::{CacheConfig, CachedRepo, MemoryCache, Repo};
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use std::sync::Arc;
use uuid::Uuid;

fn cached(db: DatabaseConnection) -> CachedRepo<TaskResource> {
    CachedRepo::new(
        Repo::new(db),
        Arc::new(MemoryCache::new()),
        CacheConfig::default(),
    )
}

fn new_task(title: &str) -> TaskCreate {
    TaskCreate {
        title: title.to_string(),
        status: "active".to_string(),
        priority: 1,
        owner_id: "u-900".to_string(),
        completed: false,
    }
}

/// Insert a row behind the cache's back, so staleness is observable.
async fn insert_out_of_band(db: &DatabaseConnection) {
    let row = common::task_entity::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set("Out of band".to_string()),
        status: Set("active".to_string()),
        priority: Set(1),
        owner_id: Set("u-999".to_string()),
        completed: Set(false),
    };
    common::task_entity::Entity::insert(row).exec(db).await.unwrap();
}

#[tokio::test]
async fn reads_are_memoized_until_invalidated() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();
    let repo = cached(db.clone());

    assert_eq!(repo.all().await.unwrap().len(), 4);

    insert_out_of_band(&db).await;
    // Cache hit: the out-of-band row is invisible.
    assert_eq!(repo.all().await.unwrap().len(), 4);
}

#[tokio::test]
async fn writes_invalidate_cached_reads() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();
    let mut repo = cached(db.clone());

    assert_eq!(repo.all().await.unwrap().len(), 4);
    insert_out_of_band(&db).await;
    assert_eq!(repo.all().await.unwrap().len(), 4);

    repo.create(new_task("Invalidator")).await.unwrap();
    // 4 seeded + 1 out-of-band + 1 created.
    assert_eq!(repo.all().await.unwrap().len(), 6);
}

#[tokio::test]
async fn update_and_delete_also_invalidate() {
    let db = common::setup_db().await.unwrap();
    let ids = common::seed(&db).await.unwrap();
    let mut repo = cached(db.clone());

    let before = repo.find(ids[0]).await.unwrap();
    assert_eq!(before.priority, 1);

    repo.update(
        ids[0],
        TaskUpdate {
            priority: Some(8),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(repo.find(ids[0]).await.unwrap().priority, 8);

    repo.delete(ids[1]).await.unwrap();
    assert_eq!(repo.all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn skip_cache_bypasses_one_read() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();
    let mut repo = cached(db.clone());

    assert_eq!(repo.all().await.unwrap().len(), 4);
    insert_out_of_band(&db).await;
    assert_eq!(repo.all().await.unwrap().len(), 4);

    // Bypass refreshes the stored value too.
    repo.skip_cache();
    assert_eq!(repo.all().await.unwrap().len(), 5);
    assert_eq!(repo.all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn disabled_cache_always_reads_through() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();
    let repo = CachedRepo::<TaskResource>::new(
        Repo::new(db.clone()),
        Arc::new(MemoryCache::new()),
        CacheConfig {
            enabled: false,
            ..Default::default()
        },
    );

    assert_eq!(repo.all().await.unwrap().len(), 4);
    insert_out_of_band(&db).await;
    assert_eq!(repo.all().await.unwrap().len(), 5);
}

#[tokio::test]
async fn paginate_and_find_where_are_cacheable() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();
    let repo = cached(db.clone());

    let page = repo.paginate(1, 2).await.unwrap();
    assert_eq!(page.total, 4);

    insert_out_of_band(&db).await;
    // Same call shape: served from cache with the old total.
    assert_eq!(repo.paginate(1, 2).await.unwrap().total, 4);
    // Different arguments miss the cache and see the new row.
    assert_eq!(repo.paginate(1, 3).await.unwrap().total, 5);
}
