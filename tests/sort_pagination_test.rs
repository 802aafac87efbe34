mod common;

use common::task_entity::TaskResource;
use repokit::{Repo, RequestParams};

fn ordering(order_by: &str, sorted_by: &str) -> RequestParams {
    RequestParams {
        order_by: Some(order_by.to_string()),
        sorted_by: Some(sorted_by.to_string()),
        ..Default::default()
    }
}

async fn titles(repo: &Repo<TaskResource>) -> Vec<String> {
    repo.all()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect()
}

#[tokio::test]
async fn single_direction_broadcasts_to_all_fields() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();

    let mut repo: Repo<TaskResource> = Repo::new(db);
    repo.push_request(ordering("status,priority", "desc"));

    assert_eq!(
        titles(&repo).await,
        vec![
            "Draft urgent memo",     // pending
            "Archive old reports",   // archived
            "Review admin access",   // active, priority 3
            "Write launch checklist" // active, priority 1
        ]
    );
}

#[tokio::test]
async fn directions_pair_positionally() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();

    let mut repo: Repo<TaskResource> = Repo::new(db);
    repo.push_request(ordering("status,priority", "asc,desc"));

    assert_eq!(
        titles(&repo).await,
        vec![
            "Review admin access",    // active, priority 3
            "Write launch checklist", // active, priority 1
            "Archive old reports",    // archived
            "Draft urgent memo"       // pending
        ]
    );
}

#[tokio::test]
async fn paginate_returns_pages_and_total() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();

    let mut repo: Repo<TaskResource> = Repo::new(db);
    repo.push_request(ordering("priority", "asc"));

    let page1 = repo.paginate(1, 2).await.unwrap();
    assert_eq!(page1.total, 4);
    assert_eq!(page1.page, 1);
    assert_eq!(page1.per_page, 2);
    assert_eq!(
        page1.data.iter().map(|t| t.priority).collect::<Vec<_>>(),
        vec![1, 2]
    );

    let page2 = repo.paginate(2, 2).await.unwrap();
    assert_eq!(
        page2.data.iter().map(|t| t.priority).collect::<Vec<_>>(),
        vec![3, 5]
    );
}

#[tokio::test]
async fn paginate_defaults_per_page_and_floors_page() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();

    let repo: Repo<TaskResource> = Repo::new(db);

    let page = repo.paginate(0, 0).await.unwrap();
    assert_eq!(page.page, 1);
    assert_eq!(page.per_page, 15);
    assert_eq!(page.data.len(), 4);
}

#[tokio::test]
async fn count_respects_criteria() {
    let db = common::setup_db().await.unwrap();
    common::seed(&db).await.unwrap();

    let mut repo: Repo<TaskResource> = Repo::new(db);
    assert_eq!(repo.count().await.unwrap(), 4);

    repo.push_request(RequestParams {
        filter: Some("status:active".to_string()),
        ..Default::default()
    });
    assert_eq!(repo.count().await.unwrap(), 2);
}
