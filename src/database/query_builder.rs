use std::time::Instant;

use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Executor, FromRow, Row, Sqlite};
use tracing::warn;

use crate::config::config;
use crate::database::manager::DatabaseError;
use crate::filter::{Filter, SqlResult, SqlValue};

/// Executes the SQL produced by a [`Filter`] and maps rows onto `T`.
pub struct QueryBuilder<T> {
    filter: Filter,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
{
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_all<'c, E>(self, executor: E) -> Result<Vec<T>, DatabaseError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let started = Instant::now();
        let rows = q.fetch_all(executor).await?;
        warn_if_slow(&sql_result, started);
        Ok(rows)
    }

    pub async fn select_optional<'c, E>(self, executor: E) -> Result<Option<T>, DatabaseError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let sql_result = self.filter.to_sql()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        let started = Instant::now();
        let row = q.fetch_optional(executor).await?;
        warn_if_slow(&sql_result, started);
        Ok(row)
    }

    pub async fn count<'c, E>(self, executor: E) -> Result<i64, DatabaseError>
    where
        E: Executor<'c, Database = Sqlite>,
    {
        let sql_result = self.filter.to_count_sql()?;
        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let started = Instant::now();
        let row = q.fetch_one(executor).await?;
        warn_if_slow(&sql_result, started);
        let count: i64 = row.try_get("count")?;
        Ok(count)
    }
}

fn warn_if_slow(sql_result: &SqlResult, started: Instant) {
    let database = &config().database;
    if !database.enable_slow_query_warning {
        return;
    }
    let elapsed = started.elapsed();
    if elapsed.as_millis() as u64 >= database.slow_query_threshold_ms {
        warn!("Slow query ({} ms): {}", elapsed.as_millis(), sql_result.query);
    }
}

pub(crate) fn bind_param_query<'q>(
    q: Query<'q, Sqlite, SqliteArguments<'q>>,
    v: &'q SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match v {
        SqlValue::Null => q.bind(None::<String>),
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Real(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.as_str()),
        SqlValue::Uuid(u) => q.bind(*u),
        SqlValue::Timestamp(t) => q.bind(*t),
    }
}

pub(crate) fn bind_param_query_as<'q, O>(
    q: QueryAs<'q, Sqlite, O, SqliteArguments<'q>>,
    v: &'q SqlValue,
) -> QueryAs<'q, Sqlite, O, SqliteArguments<'q>>
where
    O: for<'r> FromRow<'r, SqliteRow>,
{
    match v {
        SqlValue::Null => q.bind(None::<String>),
        SqlValue::Bool(b) => q.bind(*b),
        SqlValue::Int(i) => q.bind(*i),
        SqlValue::Real(f) => q.bind(*f),
        SqlValue::Text(s) => q.bind(s.as_str()),
        SqlValue::Uuid(u) => q.bind(*u),
        SqlValue::Timestamp(t) => q.bind(*t),
    }
}
