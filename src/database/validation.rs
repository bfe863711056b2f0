use std::collections::HashSet;

use serde_json::Value;

use crate::constants::{MAX_RECIPE_NAME_LENGTH, MIN_COOKING_TIME, MIN_INGREDIENT_AMOUNT};

use super::{
    error::{TypeError, ValidationErrors},
    form::{value_as_integer, Form, NOT_AN_OBJECT, NOT_NULL, REQUIRED},
    image::ImageUpload,
    schema::Id,
};

pub const DUPLICATE_INGREDIENT: &str = "Ингредиенты повторяется!";
pub const INVALID_AMOUNT: &str = "Количество ингредиентов не может быть меньше 1";
pub const INVALID_COOKING_TIME: &str = "Время приготовления должно быть больше 0!";

pub fn too_long(max_length: usize) -> String {
    format!("Убедитесь, что это значение содержит не более {max_length} символов.")
}

pub fn not_found(id: Id) -> String {
    format!("Недопустимый первичный ключ \"{id}\" - объект не существует.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    /// Every field is required.
    Create,
    /// Absent fields keep their stored value.
    Update,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientAmount {
    pub id: Id,
    pub amount: i32,
}

/// Recipe payload after type checks. `None` means the key was not sent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub image: Option<ImageUpload>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<IngredientAmount>>,
}

/// A create payload with every field present.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub name: String,
    pub image: ImageUpload,
    pub text: String,
    pub cooking_time: i32,
    pub tags: Vec<Id>,
    pub ingredients: Vec<IngredientAmount>,
}

/// Ids known to the ingredient and tag catalogs.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    ingredients: HashSet<Id>,
    tags: HashSet<Id>,
}

impl Catalog {
    pub fn new(
        ingredients: impl IntoIterator<Item = Id>,
        tags: impl IntoIterator<Item = Id>,
    ) -> Self {
        Self {
            ingredients: ingredients.into_iter().collect(),
            tags: tags.into_iter().collect(),
        }
    }

    pub fn has_ingredient(&self, id: Id) -> bool {
        self.ingredients.contains(&id)
    }

    pub fn has_tag(&self, id: Id) -> bool {
        self.tags.contains(&id)
    }
}

impl RecipeForm {
    pub fn parse(form: &Form, mode: FormMode) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let name = read_field(form, "name", mode, &mut errors, |form, key| {
            at_most(non_blank(form.get_str(key)?)?, MAX_RECIPE_NAME_LENGTH)
        });
        let text = read_field(form, "text", mode, &mut errors, |form, key| {
            non_blank(form.get_str(key)?)
        });
        let cooking_time = read_field(form, "cooking_time", mode, &mut errors, |form, key| {
            form.get_integer(key)
        });
        let image = read_field(form, "image", mode, &mut errors, |form, key| {
            ImageUpload::decode(&form.get_str(key)?)
        });
        let tags = read_field(form, "tags", mode, &mut errors, |form, key| {
            parse_tags(form.get_list(key)?)
        });
        let ingredients = read_field(form, "ingredients", mode, &mut errors, |form, key| {
            parse_ingredients(form.get_list(key)?)
        });

        errors.into_result()?;

        Ok(Self {
            name,
            image,
            text,
            cooking_time,
            tags,
            ingredients,
        })
    }

    pub fn ingredient_ids(&self) -> Vec<Id> {
        self.ingredients
            .iter()
            .flatten()
            .map(|ingredient| ingredient.id)
            .collect()
    }

    pub fn tag_ids(&self) -> Vec<Id> {
        self.tags.iter().flatten().copied().collect()
    }

    /// Runs every rule and reports all violations at once.
    pub fn validate(self, catalog: &Catalog) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if let Some(ingredients) = &self.ingredients {
            let mut seen = HashSet::new();

            for ingredient in ingredients {
                if !catalog.has_ingredient(ingredient.id) {
                    errors.add("ingredients", not_found(ingredient.id));
                }
                if !seen.insert(ingredient.id) {
                    errors.add("ingredients", DUPLICATE_INGREDIENT);
                }
                if ingredient.amount < MIN_INGREDIENT_AMOUNT {
                    errors.add("ingredients", INVALID_AMOUNT);
                }
            }
        }

        if let Some(cooking_time) = self.cooking_time {
            if cooking_time < MIN_COOKING_TIME {
                errors.add("cooking_time", INVALID_COOKING_TIME);
            }
        }

        for tag in self.tags.iter().flatten() {
            if !catalog.has_tag(*tag) {
                errors.add("tags", not_found(*tag));
            }
        }

        errors.into_result()?;
        Ok(self)
    }
}

impl TryFrom<RecipeForm> for NewRecipe {
    type Error = ValidationErrors;

    fn try_from(form: RecipeForm) -> Result<Self, Self::Error> {
        match form {
            RecipeForm {
                name: Some(name),
                image: Some(image),
                text: Some(text),
                cooking_time: Some(cooking_time),
                tags: Some(tags),
                ingredients: Some(ingredients),
            } => Ok(Self {
                name,
                image,
                text,
                cooking_time,
                tags,
                ingredients,
            }),
            form => {
                let mut errors = ValidationErrors::default();
                let fields = [
                    ("name", form.name.is_some()),
                    ("image", form.image.is_some()),
                    ("text", form.text.is_some()),
                    ("cooking_time", form.cooking_time.is_some()),
                    ("tags", form.tags.is_some()),
                    ("ingredients", form.ingredients.is_some()),
                ];
                for (field, present) in fields {
                    if !present {
                        errors.add(field, REQUIRED);
                    }
                }
                Err(errors)
            }
        }
    }
}

fn read_field<T, F>(
    form: &Form,
    key: &str,
    mode: FormMode,
    errors: &mut ValidationErrors,
    read: F,
) -> Option<T>
where
    F: FnOnce(&Form, &str) -> Result<T, TypeError>,
{
    if !form.contains(key) {
        if mode == FormMode::Create {
            errors.add(key, REQUIRED);
        }
        return None;
    }

    match read(form, key) {
        Ok(value) => Some(value),
        Err(e) => {
            errors.add(key, e.info());
            None
        }
    }
}

fn non_blank(value: String) -> Result<String, TypeError> {
    match value.trim().is_empty() {
        true => Err(TypeError::new(NOT_NULL)),
        false => Ok(value),
    }
}

fn at_most(value: String, max_length: usize) -> Result<String, TypeError> {
    match value.chars().count() > max_length {
        true => Err(TypeError::new(&too_long(max_length))),
        false => Ok(value),
    }
}

fn parse_tags(values: Vec<Value>) -> Result<Vec<Id>, TypeError> {
    let mut tags: Vec<Id> = Vec::with_capacity(values.len());

    for value in values.iter() {
        let id = value_as_integer(value)?;
        // tag association is a set
        if !tags.contains(&id) {
            tags.push(id);
        }
    }

    Ok(tags)
}

fn parse_ingredients(values: Vec<Value>) -> Result<Vec<IngredientAmount>, TypeError> {
    values
        .iter()
        .map(|value| match value.as_object() {
            Some(object) => {
                let id = object.get("id").ok_or_else(|| TypeError::new(REQUIRED))?;
                let amount = object
                    .get("amount")
                    .ok_or_else(|| TypeError::new(REQUIRED))?;

                Ok(IngredientAmount {
                    id: value_as_integer(id)?,
                    amount: value_as_integer(amount)?,
                })
            }
            None => Err(TypeError::new(NOT_AN_OBJECT)),
        })
        .collect()
}
