use std::collections::HashMap;

use serde::Serialize;

use super::{
    image::MediaStorage,
    schema::{
        Id, Ingredient, LinkedRecipeTag, Recipe, RecipePart, ShoppingListItem, Tag, User,
        ViewerFlags,
    },
};

pub type TagView = Tag;
pub type IngredientView = Ingredient;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct AuthorView {
    pub email: String,
    pub id: Id,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeIngredientView {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

/// Response shape of a recipe, shared by reads and writes.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecipeView {
    pub id: Id,
    pub tags: Vec<TagView>,
    pub author: AuthorView,
    pub ingredients: Vec<RecipeIngredientView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

impl AuthorView {
    pub fn project(user: User, is_subscribed: bool) -> Self {
        Self {
            email: user.email,
            id: user.id,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

impl From<RecipePart> for RecipeIngredientView {
    fn from(part: RecipePart) -> Self {
        Self {
            id: part.ingredient_id,
            name: part.name,
            measurement_unit: part.measurement_unit,
            amount: part.amount,
        }
    }
}

impl RecipeView {
    /// `flags` is `ViewerFlags::default()` for anonymous viewers.
    pub fn project(
        recipe: Recipe,
        author: User,
        tags: Vec<Tag>,
        parts: Vec<RecipePart>,
        flags: ViewerFlags,
        media: &MediaStorage,
    ) -> Self {
        Self {
            id: recipe.id,
            tags,
            author: AuthorView::project(author, flags.is_subscribed),
            ingredients: parts.into_iter().map(RecipeIngredientView::from).collect(),
            is_favorited: flags.is_favorited,
            is_in_shopping_cart: flags.is_in_shopping_cart,
            name: recipe.name,
            image: media.url_for(&recipe.image),
            text: recipe.text,
            cooking_time: recipe.cooking_time,
        }
    }
}

/// Batch-loaded rows for a set of recipes.
#[derive(Debug, Default)]
pub struct RecipeGraph {
    pub authors: Vec<User>,
    pub tags: Vec<LinkedRecipeTag>,
    pub parts: Vec<RecipePart>,
    pub flags: Vec<ViewerFlags>,
}

impl RecipeGraph {
    /// Projects `recipes` in their given order. Recipes whose author is
    /// missing from the graph are skipped.
    pub fn assemble(self, recipes: Vec<Recipe>, media: &MediaStorage) -> Vec<RecipeView> {
        let authors: HashMap<Id, User> = self
            .authors
            .into_iter()
            .map(|user| (user.id, user))
            .collect();

        let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
        self.tags.into_iter().for_each(|linked| {
            tags.entry(linked.recipe_id).or_default().push(linked.tag);
        });

        let mut parts: HashMap<Id, Vec<RecipePart>> = HashMap::new();
        self.parts.into_iter().for_each(|part| {
            parts.entry(part.recipe_id).or_default().push(part);
        });

        let flags: HashMap<Id, ViewerFlags> = self
            .flags
            .into_iter()
            .map(|flags| (flags.recipe_id, flags))
            .collect();

        recipes
            .into_iter()
            .filter_map(|recipe| {
                let Some(author) = authors.get(&recipe.author_id) else {
                    log::error!("Recipe {} has no author row", recipe.id);
                    return None;
                };

                let id = recipe.id;
                Some(RecipeView::project(
                    recipe,
                    author.to_owned(),
                    tags.remove(&id).unwrap_or_default(),
                    parts.remove(&id).unwrap_or_default(),
                    flags.get(&id).copied().unwrap_or_default(),
                    media,
                ))
            })
            .collect()
    }
}

pub fn render_shopping_list(items: &[ShoppingListItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} ({}) — {}\n", item.name, item.measurement_unit, item.amount))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn media() -> MediaStorage {
        MediaStorage::new("media", "/media/")
    }

    fn author() -> User {
        User {
            id: 7,
            email: "cook@example.com".to_string(),
            username: "cook".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Cook".to_string(),
        }
    }

    fn recipe(id: Id) -> Recipe {
        Recipe {
            id,
            author_id: 7,
            name: "Tea".to_string(),
            image: "recipes/images/tea.png".to_string(),
            text: "Boil water".to_string(),
            cooking_time: 5,
        }
    }

    fn breakfast() -> Tag {
        Tag {
            id: 1,
            name: "Breakfast".to_string(),
            color: "#E26C2D".to_string(),
            slug: "breakfast".to_string(),
        }
    }

    fn sugar(recipe_id: Id, amount: i32) -> RecipePart {
        RecipePart {
            recipe_id,
            ingredient_id: 3,
            name: "Sugar".to_string(),
            measurement_unit: "g".to_string(),
            amount,
        }
    }

    #[test]
    fn anonymous_projection_matches_wire_shape() {
        let view = RecipeView::project(
            recipe(1),
            author(),
            vec![breakfast()],
            vec![sugar(1, 2)],
            ViewerFlags::default(),
            &media(),
        );

        assert_eq!(
            serde_json::to_value(&view).unwrap(),
            json!({
                "id": 1,
                "tags": [{"id": 1, "name": "Breakfast", "color": "#E26C2D", "slug": "breakfast"}],
                "author": {
                    "email": "cook@example.com",
                    "id": 7,
                    "username": "cook",
                    "first_name": "Ada",
                    "last_name": "Cook",
                    "is_subscribed": false,
                },
                "ingredients": [{"id": 3, "name": "Sugar", "measurement_unit": "g", "amount": 2}],
                "is_favorited": false,
                "is_in_shopping_cart": false,
                "name": "Tea",
                "image": "/media/recipes/images/tea.png",
                "text": "Boil water",
                "cooking_time": 5,
            })
        );
    }

    #[test]
    fn viewer_flags_are_carried() {
        let flags = ViewerFlags {
            recipe_id: 1,
            is_favorited: true,
            is_in_shopping_cart: false,
            is_subscribed: true,
        };
        let view = RecipeView::project(recipe(1), author(), vec![], vec![], flags, &media());

        assert!(view.is_favorited);
        assert!(!view.is_in_shopping_cart);
        assert!(view.author.is_subscribed);
    }

    #[test]
    fn graph_assembles_each_recipe_from_its_own_rows() {
        let graph = RecipeGraph {
            authors: vec![author()],
            tags: vec![LinkedRecipeTag {
                recipe_id: 2,
                tag: breakfast(),
            }],
            parts: vec![sugar(1, 2), sugar(2, 9)],
            flags: vec![ViewerFlags {
                recipe_id: 2,
                is_favorited: false,
                is_in_shopping_cart: true,
                is_subscribed: false,
            }],
        };

        let views = graph.assemble(vec![recipe(2), recipe(1)], &media());

        assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![2, 1]);
        assert_eq!(views[0].tags, vec![breakfast()]);
        assert_eq!(views[0].ingredients[0].amount, 9);
        assert!(views[0].is_in_shopping_cart);
        assert!(views[1].tags.is_empty());
        assert_eq!(views[1].ingredients[0].amount, 2);
        assert!(!views[1].is_in_shopping_cart);
    }

    #[test]
    fn recipes_without_author_are_skipped() {
        let views = RecipeGraph::default().assemble(vec![recipe(1)], &media());

        assert!(views.is_empty());
    }

    #[test]
    fn shopping_list_has_one_line_per_item() {
        let items = vec![
            ShoppingListItem {
                name: "Flour".to_string(),
                measurement_unit: "g".to_string(),
                amount: 500,
            },
            ShoppingListItem {
                name: "Milk".to_string(),
                measurement_unit: "ml".to_string(),
                amount: 250,
            },
        ];

        assert_eq!(
            render_shopping_list(&items),
            "Flour (g) — 500\nMilk (ml) — 250\n"
        );
    }
}
