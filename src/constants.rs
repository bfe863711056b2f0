pub const RECIPE_COUNT_PER_PAGE: i64 = 6;
pub const INGREDIENT_SEARCH_LIMIT: i64 = 50;

pub const MIN_INGREDIENT_AMOUNT: i32 = 1;
pub const MIN_COOKING_TIME: i32 = 1;
pub const MAX_RECIPE_NAME_LENGTH: usize = 200;

/// Directory under the media root where recipe images are written.
pub const RECIPE_IMAGE_DIR: &str = "recipes/images";

/// Upper bound for a JSON recipe body, base64 image included.
pub const MAX_FORM_BYTES: u64 = 10 * 1024 * 1024;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_LIFETIME_HOURS: i64 = 24;
