use chrono::Utc;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Executor, FromRow, Sqlite};
use uuid::Uuid;

use crate::database::manager::DatabaseError;
use crate::database::pagination::{Page, PageWindow, Pagination};
use crate::database::query_builder::QueryBuilder;
use crate::filter::Filter;

/// A row type backed by one table.
pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Human readable name used in "not found" messages
    const LABEL: &'static str;
    /// Table carries `deleted_at`; deleted rows are hidden from every read
    const SOFT_DELETE: bool = false;
}

pub struct Repository<'a, T> {
    pool: &'a SqlitePool,
    _phantom: std::marker::PhantomData<T>,
}

impl<'a, T> Repository<'a, T>
where
    T: Entity,
{
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self {
            pool,
            _phantom: std::marker::PhantomData,
        }
    }

    /// A fresh filter over this table with soft-delete visibility applied.
    pub fn filter(&self) -> Result<Filter, DatabaseError> {
        let mut filter = Filter::new(T::TABLE)?;
        filter.soft_delete(T::SOFT_DELETE);
        Ok(filter)
    }

    /// One COUNT over the filter's conditions, then the requested page.
    pub async fn paginate(&self, mut filter: Filter, window: PageWindow) -> Result<Page<T>, DatabaseError> {
        let records = QueryBuilder::<T>::new(filter.clone()).count(self.pool).await?;

        filter.limit(window.limit, window.offset())?;
        let data = QueryBuilder::<T>::new(filter).select_all(self.pool).await?;

        Ok(Page {
            pagination: Pagination::new(window, records),
            data,
        })
    }

    pub async fn select_all(&self, filter: Filter) -> Result<Vec<T>, DatabaseError> {
        QueryBuilder::<T>::new(filter).select_all(self.pool).await
    }

    pub async fn select_one(&self, filter: Filter) -> Result<Option<T>, DatabaseError> {
        QueryBuilder::<T>::new(filter).select_optional(self.pool).await
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<T>, DatabaseError> {
        find_in::<T, _>(self.pool, id).await
    }

    pub async fn find_404(&self, id: Uuid) -> Result<T, DatabaseError> {
        self.find(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
    }

    /// Stamp `deleted_at`. Already-deleted rows count as missing.
    pub async fn soft_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let now = Utc::now();
        let sql = format!(
            "UPDATE \"{}\" SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
            T::TABLE
        );
        let result = sqlx::query(&sql).bind(now).bind(id).execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} not found", T::LABEL)));
        }
        Ok(())
    }

    pub async fn hard_delete(&self, id: Uuid) -> Result<(), DatabaseError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = ?1", T::TABLE);
        let result = sqlx::query(&sql).bind(id).execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("{} not found", T::LABEL)));
        }
        Ok(())
    }
}

/// Look a row up by id on any executor, typically an open transaction.
pub async fn find_in<'c, T, E>(executor: E, id: Uuid) -> Result<Option<T>, DatabaseError>
where
    T: Entity,
    E: Executor<'c, Database = Sqlite>,
{
    let mut filter = Filter::new(T::TABLE)?;
    filter.soft_delete(T::SOFT_DELETE).eq("id", id);
    QueryBuilder::<T>::new(filter).select_optional(executor).await
}

/// `find_in`, with a miss reported as `NotFound`.
pub async fn find_in_404<'c, T, E>(executor: E, id: Uuid) -> Result<T, DatabaseError>
where
    T: Entity,
    E: Executor<'c, Database = Sqlite>,
{
    find_in::<T, E>(executor, id)
        .await?
        .ok_or_else(|| DatabaseError::NotFound(format!("{} not found", T::LABEL)))
}
