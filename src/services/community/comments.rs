use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::{Comment, Post};
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at"];

#[derive(Debug, Deserialize)]
pub struct CommentCreate {
    pub body: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CommentUpdate {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentSearch {
    pub search: Option<String>,
    pub author_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    /// Only top-level entries (`true`) or only answers (`false`)
    pub root_only: Option<bool>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn search(pool: &SqlitePool, post_id: Uuid, input: CommentSearch) -> Result<Page<Comment>, ApiError> {
    let window = input.page.resolve()?;
    Repository::<Post>::new(pool).find_404(post_id).await?;

    let repo = Repository::<Comment>::new(pool);
    let mut filter = repo.filter()?;
    filter
        .eq("post_id", post_id)
        .eq_opt("author_id", input.author_id)
        .eq_opt("parent_id", input.parent_id)
        .null_opt("parent_id", input.root_only)
        .contains_opt(&["body"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at asc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn create(pool: &SqlitePool, author: &Principal, post_id: Uuid, input: CommentCreate) -> Result<Comment, ApiError> {
    let post = Repository::<Post>::new(pool).find_404(post_id).await?;

    if let Some(parent_id) = input.parent_id {
        let parent = Repository::<Comment>::new(pool)
            .find(parent_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Parent comment not found"))?;
        if parent.post_id != post.id {
            return Err(ApiError::invalid_field("parent_id", "Parent comment belongs to a different post"));
        }
    }

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        post_id: post.id,
        author_id: author.id,
        parent_id: input.parent_id,
        body: required_text("body", &input.body, 10_000)?,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    };

    sqlx::query(
        "INSERT INTO community_comments (id, post_id, author_id, parent_id, body, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
    )
    .bind(comment.id)
    .bind(comment.post_id)
    .bind(comment.author_id)
    .bind(comment.parent_id)
    .bind(&comment.body)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(comment)
}

pub async fn update(pool: &SqlitePool, author: &Principal, id: Uuid, input: CommentUpdate) -> Result<Comment, ApiError> {
    let mut comment = Repository::<Comment>::new(pool).find_404(id).await?;
    ensure_owner(comment.author_id, author, "comment")?;

    comment.body = required_text("body", &input.body, 10_000)?;
    comment.updated_at = Utc::now();

    sqlx::query("UPDATE community_comments SET body = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(&comment.body)
        .bind(comment.updated_at)
        .bind(comment.id)
        .execute(pool)
        .await?;
    Ok(comment)
}

pub async fn remove(pool: &SqlitePool, author: &Principal, id: Uuid) -> Result<(), ApiError> {
    let repo = Repository::<Comment>::new(pool);
    let comment = repo.find_404(id).await?;
    ensure_owner(comment.author_id, author, "comment")?;
    repo.soft_delete(id).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use crate::services::community::fixtures;
    use crate::services::test_support;

    #[tokio::test]
    async fn threads_stay_under_one_post() {
        let pool = test_support::pool().await;
        let member = test_support::principal(&pool, Role::Member, "member").await;
        let community = fixtures::community(&pool, &member, "chess").await;
        let first = fixtures::post(&pool, &member, &community, "Openings").await;
        let second = fixtures::post(&pool, &member, &community, "Endgames").await;

        let root = create(&pool, &member, first.id, CommentCreate { body: "e4".into(), parent_id: None })
            .await
            .unwrap();
        create(&pool, &member, first.id, CommentCreate { body: "e5".into(), parent_id: Some(root.id) })
            .await
            .unwrap();

        let err = create(&pool, &member, second.id, CommentCreate { body: "?".into(), parent_id: Some(root.id) })
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::ValidationError { .. }));

        let page = search(&pool, first.id, CommentSearch::default()).await.unwrap();
        assert_eq!(page.pagination.records, 2);
        assert_eq!(page.data[0].body, "e4");
    }

    #[tokio::test]
    async fn only_author_edits_comment() {
        let pool = test_support::pool().await;
        let author = test_support::principal(&pool, Role::Member, "author").await;
        let other = test_support::principal(&pool, Role::Member, "other").await;
        let community = fixtures::community(&pool, &author, "poetry").await;
        let post = fixtures::post(&pool, &author, &community, "Haiku").await;
        let comment = create(&pool, &author, post.id, CommentCreate { body: "old pond".into(), parent_id: None })
            .await
            .unwrap();

        let err = update(&pool, &other, comment.id, CommentUpdate { body: "frog".into() }).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(matches!(remove(&pool, &other, comment.id).await.unwrap_err(), ApiError::Forbidden(_)));

        remove(&pool, &author, comment.id).await.unwrap();
        let page = search(&pool, post.id, CommentSearch::default()).await.unwrap();
        assert_eq!(page.pagination.records, 0);
    }
}
