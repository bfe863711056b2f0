use potion::HtmlError;
use sqlx::{Pool, Postgres};

use crate::{
    error::QueryError,
    schema::{Id, ShoppingListItem},
};

use super::get_recipe;

/// Per-user recipe collections behind the `is_favorited` and
/// `is_in_shopping_cart` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeCollection {
    Favorites,
    ShoppingCart,
}

impl RecipeCollection {
    fn table(&self) -> &'static str {
        match self {
            RecipeCollection::Favorites => "favorites",
            RecipeCollection::ShoppingCart => "shopping_carts",
        }
    }

    fn already_added(&self) -> &'static str {
        match self {
            RecipeCollection::Favorites => "Recipe is already in favorites",
            RecipeCollection::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn not_added(&self) -> &'static str {
        match self {
            RecipeCollection::Favorites => "Recipe is not in favorites",
            RecipeCollection::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

pub async fn add_to_collection(
    collection: RecipeCollection,
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    if get_recipe(recipe_id, pool).await?.is_none() {
        return Err(HtmlError::InvalidRequest.new("No recipe exists with specified id"));
    }

    let result = sqlx::query(&format!(
        "INSERT INTO {} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(collection.already_added()));
    }

    Ok(())
}

pub async fn remove_from_collection(
    collection: RecipeCollection,
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE user_id = $1 AND recipe_id = $2",
        collection.table()
    ))
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    if result.rows_affected() == 0 {
        return Err(HtmlError::InvalidRequest.new(collection.not_added()));
    }

    Ok(())
}

pub async fn add_to_favorites(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    add_to_collection(RecipeCollection::Favorites, recipe_id, user_id, pool).await
}

pub async fn remove_from_favorites(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_from_collection(RecipeCollection::Favorites, recipe_id, user_id, pool).await
}

pub async fn add_to_shopping_cart(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    add_to_collection(RecipeCollection::ShoppingCart, recipe_id, user_id, pool).await
}

pub async fn remove_from_shopping_cart(
    recipe_id: Id,
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    remove_from_collection(RecipeCollection::ShoppingCart, recipe_id, user_id, pool).await
}

/// Total amount of every ingredient over the recipes in the user's cart.
pub async fn shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListItem>, potion::Error> {
    let rows: Vec<ShoppingListItem> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ri.amount) AS amount
        FROM shopping_carts c
        INNER JOIN recipe_ingredients ri ON ri.recipe_id = c.recipe_id
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE c.user_id = $1
        GROUP BY i.id, i.name, i.measurement_unit
        ORDER BY i.name
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}
