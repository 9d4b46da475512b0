//! Tests for the published_at backfill applied to legacy rows

use chrono::{TimeZone, Utc};
use portfolio_backend::db::{BlogStatus, Database};
use portfolio_backend::services::blogs::{
    author_index, backfill_published_at, new_post, BlogRequest,
};

async fn legacy_post(db: &Database, title: &str, status: &str) -> String {
    let fields = BlogRequest {
        title: Some(title.to_string()),
        content: Some("<p>legacy</p>".to_string()),
        status: Some(status.to_string()),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let created = Utc.with_ymd_and_hms(2023, 3, 14, 9, 26, 53).unwrap();
    let mut post = new_post("author-1", fields, created);
    post.published_at = None;
    post.author_index = None;
    db.insert_blog(&post).await.unwrap();
    post.id
}

#[tokio::test]
async fn test_backfill_fills_missing_keys() {
    let db = Database::in_memory().await.unwrap();
    let published = legacy_post(&db, "Old published", "published").await;
    let draft = legacy_post(&db, "Old draft", "draft").await;

    let missing = db.blogs_missing_published_at().await.unwrap();
    assert_eq!(missing.len(), 2);

    for post in &missing {
        let published_at = backfill_published_at(post);
        db.set_published_at(&post.id, &published_at, &author_index(&post.author, &published_at))
            .await
            .unwrap();
    }
    assert!(db.blogs_missing_published_at().await.unwrap().is_empty());

    let post = db.get_blog(&published).await.unwrap().unwrap();
    assert_eq!(post.published_at.as_deref(), Some(post.created_at.as_str()));
    assert_eq!(
        post.author_index,
        Some(format!("author-1_{}", post.created_at))
    );

    let post = db.get_blog(&draft).await.unwrap().unwrap();
    assert_eq!(post.status_enum(), Some(BlogStatus::Draft));
    assert_eq!(
        post.published_at,
        Some(format!("draft_{}", post.created_at))
    );

    // Backfilled published rows are listed again
    let (page, _) = db.list_published_blogs(10, None).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id, published);
}
