//! Personal todo lists. Every todo belongs to one `user` account and is
//! invisible to everyone else.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::database::models::Todo;
use crate::database::{Page, PageRequest, Repository};
use crate::error::ApiError;
use crate::middleware::Principal;
use crate::services::{ensure_owner, optional_text, required_text, CreatedRange};

const SORTABLE: &[&str] = &["created_at", "updated_at", "title", "due_at", "completed_at"];

#[derive(Debug, Deserialize)]
pub struct TodoCreate {
    pub title: String,
    pub description: Option<String>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoUpdate {
    pub title: Option<String>,
    /// Blank clears the description
    pub description: Option<String>,
    pub is_completed: Option<bool>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TodoSearch {
    pub search: Option<String>,
    pub is_completed: Option<bool>,
    pub due_from: Option<DateTime<Utc>>,
    pub due_to: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub created: CreatedRange,
    pub sort: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub async fn create(pool: &SqlitePool, owner: &Principal, input: TodoCreate) -> Result<Todo, ApiError> {
    let now = Utc::now();
    let todo = Todo {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        title: required_text("title", &input.title, 200)?,
        description: optional_text("description", input.description.as_deref(), 5_000)?,
        is_completed: false,
        due_at: input.due_at,
        completed_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        "INSERT INTO todo_todos (id, owner_id, title, description, is_completed, due_at, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?6)",
    )
    .bind(todo.id)
    .bind(todo.owner_id)
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.due_at)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(todo)
}

pub async fn search(pool: &SqlitePool, owner: &Principal, input: TodoSearch) -> Result<Page<Todo>, ApiError> {
    let window = input.page.resolve()?;
    let repo = Repository::<Todo>::new(pool);

    let mut filter = repo.filter()?;
    filter
        .eq("owner_id", owner.id)
        .eq_opt("is_completed", input.is_completed)
        .gte_opt("due_at", input.due_from)
        .lte_opt("due_at", input.due_to)
        .contains_opt(&["title", "description"], input.search.as_deref());
    input.created.apply(&mut filter);
    filter.order(input.sort.as_deref(), SORTABLE, "created_at desc")?;

    Ok(repo.paginate(filter, window).await?)
}

pub async fn get(pool: &SqlitePool, owner: &Principal, id: Uuid) -> Result<Todo, ApiError> {
    let todo = Repository::<Todo>::new(pool).find_404(id).await?;
    ensure_owner(todo.owner_id, owner, "todo")?;
    Ok(todo)
}

/// Completing stamps `completed_at`; reopening clears it.
pub async fn update(pool: &SqlitePool, owner: &Principal, id: Uuid, input: TodoUpdate) -> Result<Todo, ApiError> {
    let mut todo = get(pool, owner, id).await?;
    let now = Utc::now();

    if let Some(title) = input.title.as_deref() {
        todo.title = required_text("title", title, 200)?;
    }
    if input.description.is_some() {
        todo.description = optional_text("description", input.description.as_deref(), 5_000)?;
    }
    if let Some(due_at) = input.due_at {
        todo.due_at = Some(due_at);
    }
    match input.is_completed {
        Some(true) if !todo.is_completed => {
            todo.is_completed = true;
            todo.completed_at = Some(now);
        }
        Some(false) => {
            todo.is_completed = false;
            todo.completed_at = None;
        }
        _ => {}
    }
    todo.updated_at = now;

    sqlx::query(
        "UPDATE todo_todos SET title = ?1, description = ?2, is_completed = ?3, due_at = ?4, completed_at = ?5, \
         updated_at = ?6 WHERE id = ?7",
    )
    .bind(&todo.title)
    .bind(&todo.description)
    .bind(todo.is_completed)
    .bind(todo.due_at)
    .bind(todo.completed_at)
    .bind(todo.updated_at)
    .bind(todo.id)
    .execute(pool)
    .await?;
    Ok(todo)
}

pub async fn delete(pool: &SqlitePool, owner: &Principal, id: Uuid) -> Result<(), ApiError> {
    get(pool, owner, id).await?;
    Repository::<Todo>::new(pool).hard_delete(id).await?;
    Ok(())
}
