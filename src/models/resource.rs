use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

use crate::errors::AppError;
use crate::models::predicate::SqlValue;
use crate::models::query::SelectQuery;

fn bind_scalar<'q, O>(
    query: QueryScalar<'q, Postgres, O, PgArguments>,
    value: SqlValue,
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    match value {
        SqlValue::Null => query.bind(None::<i64>),
        SqlValue::Int(n) => query.bind(n),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Text(s) => query.bind(s),
    }
}

fn bind_row<'q, O>(
    query: QueryAs<'q, Postgres, O, PgArguments>,
    value: SqlValue,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    match value {
        SqlValue::Null => query.bind(None::<i64>),
        SqlValue::Int(n) => query.bind(n),
        SqlValue::Bool(b) => query.bind(b),
        SqlValue::Text(s) => query.bind(s),
    }
}

/// One page of rows as JSON objects.
pub async fn fetch_page(pool: &PgPool, query: &SelectQuery) -> Result<Vec<Value>, AppError> {
    if query.filter().is_false() {
        return Ok(vec![]);
    }
    let (sql, params) = query.to_sql()?;
    log::debug!("{sql}");
    let mut q = sqlx::query_as::<_, (Value,)>(&sql);
    for value in params {
        q = bind_row(q, value);
    }
    let rows = q.fetch_all(pool).await?;
    Ok(rows.into_iter().map(|(row,)| row).collect())
}

pub async fn count(pool: &PgPool, query: &SelectQuery) -> Result<i64, AppError> {
    if query.filter().is_false() {
        return Ok(0);
    }
    let (sql, params) = query.count_sql()?;
    let mut q = sqlx::query_scalar::<_, i64>(&sql);
    for value in params {
        q = bind_scalar(q, value);
    }
    Ok(q.fetch_one(pool).await?)
}
