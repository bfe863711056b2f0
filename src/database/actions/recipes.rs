use std::collections::BTreeSet;

use potion::HtmlError;
use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    constants::RECIPE_COUNT_PER_PAGE,
    error::QueryError,
    form::Form,
    image::MediaStorage,
    jwt::SessionData,
    pagination::PageContext,
    schema::{Id, Recipe, RecipePart, RecipeRow, ViewerFlags},
    validation::{Catalog, FormMode, IngredientAmount, NewRecipe, RecipeForm},
    view::{RecipeGraph, RecipeView},
};

use super::{
    insert_recipe_tags, list_recipe_tags, list_users_by_ids, replace_recipe_tags,
    resolve_ingredients, resolve_tags,
};

#[derive(Debug, Clone, Default)]
pub struct RecipeFilter {
    pub author: Option<Id>,
    /// Matches recipes carrying any of these tag slugs
    pub tags: Vec<String>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> = sqlx::query_as(
        "SELECT id, author_id, name, image, text, cooking_time FROM recipes WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Loads a recipe the session user is allowed to change.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    match get_recipe(id, pool).await? {
        Some(recipe) if recipe.author_id == session.user_id => Ok(recipe),
        Some(_) => Err(HtmlError::Unauthorized.new("Only the author can change this recipe")),
        None => Err(HtmlError::InvalidRequest.new("No recipe exists with specified id")),
    }
}

pub async fn list_recipe_parts(
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipePart>, potion::Error> {
    let rows: Vec<RecipePart> = sqlx::query_as(
        "
        SELECT ri.recipe_id AS recipe_id, i.id AS ingredient_id, i.name AS name, i.measurement_unit AS measurement_unit, ri.amount AS amount
        FROM recipe_ingredients ri
        INNER JOIN ingredients i ON i.id = ri.ingredient_id
        WHERE ri.recipe_id = ANY($1)
        ORDER BY ri.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Favorite, cart and subscription lookups keyed by (viewer, recipe).
/// Anonymous viewers get no rows, which projects as all flags unset.
pub async fn list_viewer_flags(
    recipe_ids: &[Id],
    viewer: Option<&SessionData>,
    pool: &Pool<Postgres>,
) -> Result<Vec<ViewerFlags>, potion::Error> {
    let Some(viewer) = viewer else {
        return Ok(vec![]);
    };

    let rows: Vec<ViewerFlags> = sqlx::query_as(
        "
        SELECT r.id AS recipe_id,
            EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = $2) AS is_favorited,
            EXISTS (SELECT 1 FROM shopping_carts c WHERE c.recipe_id = r.id AND c.user_id = $2) AS is_in_shopping_cart,
            EXISTS (SELECT 1 FROM subscriptions s WHERE s.author_id = r.author_id AND s.user_id = $2) AS is_subscribed
        FROM recipes r
        WHERE r.id = ANY($1)
    ",
    )
    .bind(recipe_ids)
    .bind(viewer.user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Batch-loads everything the projection needs and renders `recipes` in order.
pub async fn load_recipe_views(
    recipes: Vec<Recipe>,
    viewer: Option<&SessionData>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeView>, potion::Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let author_ids: Vec<Id> = recipes
        .iter()
        .map(|recipe| recipe.author_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let graph = RecipeGraph {
        authors: list_users_by_ids(&author_ids, pool).await?,
        tags: list_recipe_tags(&recipe_ids, pool).await?,
        parts: list_recipe_parts(&recipe_ids, pool).await?,
        flags: list_viewer_flags(&recipe_ids, viewer, pool).await?,
    };

    Ok(graph.assemble(recipes, media))
}

pub async fn get_recipe_view(
    id: Id,
    viewer: Option<&SessionData>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeView>, potion::Error> {
    let Some(recipe) = get_recipe(id, pool).await? else {
        return Ok(None);
    };

    let views = load_recipe_views(vec![recipe], viewer, media, pool).await?;
    Ok(views.into_iter().next())
}

pub async fn fetch_recipes(
    filter: &RecipeFilter,
    offset: i64,
    viewer: Option<&SessionData>,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<PageContext<RecipeView>, potion::Error> {
    // an anonymous viewer has neither favorites nor a cart
    if (filter.is_favorited || filter.is_in_shopping_cart) && viewer.is_none() {
        return Ok(PageContext::no_rows(0));
    }
    let viewer_id = viewer.map(|viewer| viewer.user_id);
    let offset = offset.max(0);

    let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT r.id, r.author_id, r.name, r.image, r.text, r.cooking_time, COUNT(*) OVER() AS count FROM recipes r WHERE TRUE",
    );
    push_recipe_filter(&mut query_builder, filter, viewer_id);

    query_builder
        .push(" ORDER BY r.id DESC LIMIT ")
        .push_bind(RECIPE_COUNT_PER_PAGE)
        .push(" OFFSET ")
        .push_bind(offset);

    let rows: Vec<RecipeRow> = query_builder
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    // the window count is only present on returned rows
    let total_count = match rows.first() {
        Some(row) => row.count,
        None if offset > 0 => count_recipes(filter, viewer_id, pool).await?,
        None => 0,
    };
    let recipes = rows.into_iter().map(|row| row.recipe).collect();
    let views = load_recipe_views(recipes, viewer, media, pool).await?;

    Ok(PageContext::from_rows(
        views,
        total_count,
        RECIPE_COUNT_PER_PAGE,
        offset,
    ))
}

async fn count_recipes(
    filter: &RecipeFilter,
    viewer_id: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<i64, potion::Error> {
    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM recipes r WHERE TRUE");
    push_recipe_filter(&mut query_builder, filter, viewer_id);

    let count: (i64,) = query_builder
        .build_query_as()
        .fetch_one(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(count.0)
}

/// Appends the `WHERE` conditions of `filter`. Collection filters need a viewer.
fn push_recipe_filter(
    query_builder: &mut QueryBuilder<Postgres>,
    filter: &RecipeFilter,
    viewer_id: Option<Id>,
) {
    if let Some(author) = filter.author {
        query_builder.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
            .push_bind(filter.tags.to_owned())
            .push("))");
    }

    let Some(viewer_id) = viewer_id else {
        return;
    };

    if filter.is_favorited {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM favorites f WHERE f.recipe_id = r.id AND f.user_id = ")
            .push_bind(viewer_id)
            .push(")");
    }
    if filter.is_in_shopping_cart {
        query_builder
            .push(" AND EXISTS (SELECT 1 FROM shopping_carts c WHERE c.recipe_id = r.id AND c.user_id = ")
            .push_bind(viewer_id)
            .push(")");
    }
}

/// Looks up every ingredient and tag id the form references.
pub async fn resolve_catalog(
    recipe: &RecipeForm,
    pool: &Pool<Postgres>,
) -> Result<Catalog, potion::Error> {
    let ingredients = resolve_ingredients(&recipe.ingredient_ids(), pool).await?;
    let tags = resolve_tags(&recipe.tag_ids(), pool).await?;

    Ok(Catalog::new(ingredients, tags))
}

/// Parses and validates a payload. Nothing is written.
pub async fn validate_recipe_form(
    form: &Form,
    mode: FormMode,
    pool: &Pool<Postgres>,
) -> Result<RecipeForm, potion::Error> {
    let recipe = RecipeForm::parse(form, mode)?;
    let catalog = resolve_catalog(&recipe, pool).await?;
    let recipe = recipe.validate(&catalog)?;

    log::trace!("> Validated recipe form ({mode:?})");
    Ok(recipe)
}

pub async fn create_recipe(
    form: &Form,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let recipe = NewRecipe::try_from(validate_recipe_form(form, FormMode::Create, pool).await?)?;

    let image = media.save(&recipe.image).await?;
    let id = match insert_recipe(session.user_id, &recipe, &image, pool).await {
        Ok(id) => id,
        Err(e) => {
            media.remove(&image).await;
            return Err(e);
        }
    };

    log::trace!("> Created recipe {id} for user {}", session.user_id);
    render_recipe(id, session, media, pool).await
}

pub async fn update_recipe(
    id: Id,
    form: &Form,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    let current = get_recipe_mut(id, session, pool).await?;
    let recipe = validate_recipe_form(form, FormMode::Update, pool).await?;

    let image = match &recipe.image {
        Some(upload) => Some(media.save(upload).await?),
        None => None,
    };

    if let Err(e) = apply_recipe_update(id, &recipe, image.as_deref(), pool).await {
        if let Some(image) = &image {
            media.remove(image).await;
        }
        return Err(e);
    }

    if image.is_some() {
        media.remove(&current.image).await;
    }

    log::trace!("> Updated recipe {id}");
    render_recipe(id, session, media, pool).await
}

pub async fn delete_recipe(
    id: Id,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let recipe = get_recipe_mut(id, session, pool).await?;

    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(recipe.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    media.remove(&recipe.image).await;

    log::trace!("> Deleted recipe {id}");
    Ok(())
}

/// Write results are always rendered through the read projection.
async fn render_recipe(
    id: Id,
    session: &SessionData,
    media: &MediaStorage,
    pool: &Pool<Postgres>,
) -> Result<RecipeView, potion::Error> {
    get_recipe_view(id, Some(session), media, pool)
        .await?
        .ok_or_else(|| HtmlError::InvalidRequest.new("No recipe exists with specified id"))
}

async fn insert_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    image: &str,
    pool: &Pool<Postgres>,
) -> Result<Id, potion::Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    insert_recipe_ingredients(id.0, &recipe.ingredients, &mut tx).await?;
    insert_recipe_tags(id.0, &recipe.tags, &mut tx).await?;

    tx.commit().await.map_err(QueryError::from)?;

    Ok(id.0)
}

async fn apply_recipe_update(
    id: Id,
    recipe: &RecipeForm,
    image: Option<&str>,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut tx = pool.begin().await.map_err(QueryError::from)?;

    sqlx::query(
        "
        UPDATE recipes SET
        name = COALESCE($1, name),
        text = COALESCE($2, text),
        cooking_time = COALESCE($3, cooking_time),
        image = COALESCE($4, image)
        WHERE id = $5
    ",
    )
    .bind(recipe.name.as_deref())
    .bind(recipe.text.as_deref())
    .bind(recipe.cooking_time)
    .bind(image)
    .bind(id)
    .execute(&mut *tx)
    .await
    .map_err(QueryError::from)?;

    if let Some(ingredients) = &recipe.ingredients {
        replace_recipe_ingredients(id, ingredients, &mut tx).await?;
    }

    if let Some(tags) = &recipe.tags {
        replace_recipe_tags(id, tags, &mut tx).await?;
    }

    tx.commit().await.map_err(QueryError::from)?;

    Ok(())
}

/// Inserts the whole ingredient list of a recipe as one statement.
pub async fn insert_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_ingredients (recipe_id, ingredient_id, amount) ");

    query_builder.push_values(ingredients.iter(), |mut b, ingredient| {
        b.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    log::trace!("> Linked {} ingredients to recipe {recipe_id}", ingredients.len());
    Ok(())
}

/// Drops every link of the recipe and inserts the new list. Runs inside the
/// caller's transaction so readers never see the recipe without links.
pub async fn replace_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientAmount],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    insert_recipe_ingredients(recipe_id, ingredients, conn).await
}
