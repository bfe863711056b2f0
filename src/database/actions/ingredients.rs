use sqlx::{Pool, Postgres};

use crate::{constants::INGREDIENT_SEARCH_LIMIT, error::QueryError, schema::Id, view::IngredientView};

/// Case-insensitive prefix search over ingredient names.
pub async fn list_ingredients(
    search: &str,
    pool: &Pool<Postgres>,
) -> Result<Vec<IngredientView>, potion::Error> {
    let pattern = format!("{}%", escape_like(search.trim()));

    let rows: Vec<IngredientView> = sqlx::query_as(
        "SELECT id, name, measurement_unit FROM ingredients WHERE name ILIKE $1 ORDER BY name LIMIT $2",
    )
    .bind(pattern)
    .bind(INGREDIENT_SEARCH_LIMIT)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<IngredientView>, potion::Error> {
    let row: Option<IngredientView> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Returns the subset of `ids` that exist in the catalog.
pub async fn resolve_ingredients(
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Id>, potion::Error> {
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let rows: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}

fn escape_like(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_are_escaped() {
        assert_eq!(escape_like("sug"), "sug");
        assert_eq!(escape_like("50%_"), "50\\%\\_");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
