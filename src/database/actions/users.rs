use crate::{
    error::QueryError,
    schema::{Id, User},
};

use sqlx::{Pool, Postgres};

pub async fn list_users_by_ids(
    user_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<User>, potion::Error> {
    let rows: Vec<User> = sqlx::query_as(
        "SELECT id, email, username, first_name, last_name FROM users WHERE id = ANY($1)",
    )
    .bind(user_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
