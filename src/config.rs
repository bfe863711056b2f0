use std::fmt::{self, Display};

use sqlx::{postgres::PgPoolOptions, Pool, Postgres};

use crate::{error::QueryError, image::MediaStorage, jwt::JwtKey};

#[derive(Debug)]
pub struct ConfigError {
    info: String,
}

impl ConfigError {
    pub fn new(info: &str) -> Self {
        Self {
            info: info.to_string(),
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid configuration: {}", self.info)
    }
}

impl std::error::Error for ConfigError {}

/// Runtime settings read from the environment (and `.env`, when present).
#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub media: MediaStorage,
    pub jwt_key: JwtKey,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            log::trace!("> No .env loaded ({e})");
        }

        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |key: &str| var(key).ok_or_else(|| ConfigError::new(&format!("{key} is not set")));

        let database_max_connections = match var("DATABASE_MAX_CONNECTIONS") {
            Some(value) => value.parse().map_err(|_| {
                ConfigError::new("DATABASE_MAX_CONNECTIONS must be a positive integer")
            })?,
            None => 5,
        };

        let jwt_key = JwtKey::new(required("JWT_SECRET")?.as_bytes())
            .map_err(|_| ConfigError::new("JWT_SECRET is not a valid key"))?;

        let media = MediaStorage::new(
            var("MEDIA_ROOT").unwrap_or_else(|| String::from("media")),
            &var("MEDIA_URL").unwrap_or_else(|| String::from("/media/")),
        );

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            database_max_connections,
            media,
            jwt_key,
        })
    }

    /// Opens the pool and brings the schema up to date.
    pub async fn connect(&self) -> Result<Pool<Postgres>, potion::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(self.database_max_connections)
            .connect(&self.database_url)
            .await
            .map_err(QueryError::from)?;

        sqlx::migrate!()
            .run(&pool)
            .await
            .map_err(|e| QueryError::new(format!("{e}")))?;

        log::trace!("> Connected to database");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn reads_required_and_default_values() {
        let env = vars(&[
            ("DATABASE_URL", "postgres://localhost/recipes"),
            ("JWT_SECRET", "secret"),
        ]);
        let Ok(config) = Config::from_vars(|key| env.get(key).cloned()) else {
            panic!("config should load");
        };

        assert_eq!(config.database_url, "postgres://localhost/recipes");
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.media.root().to_str(), Some("media"));
        assert_eq!(config.media.url_for("a.png"), "/media/a.png");
    }

    #[test]
    fn overrides_defaults() {
        let env = vars(&[
            ("DATABASE_URL", "postgres://db/recipes"),
            ("JWT_SECRET", "secret"),
            ("DATABASE_MAX_CONNECTIONS", "20"),
            ("MEDIA_ROOT", "/srv/media"),
            ("MEDIA_URL", "https://cdn.example.com/m"),
        ]);
        let Ok(config) = Config::from_vars(|key| env.get(key).cloned()) else {
            panic!("config should load");
        };

        assert_eq!(config.database_max_connections, 20);
        assert_eq!(config.media.root().to_str(), Some("/srv/media"));
        assert_eq!(
            config.media.url_for("a.png"),
            "https://cdn.example.com/m/a.png"
        );
    }

    #[test]
    fn missing_or_malformed_values_fail() {
        let no_secret = vars(&[("DATABASE_URL", "postgres://db/recipes")]);
        assert!(Config::from_vars(|key| no_secret.get(key).cloned()).is_err());

        let no_database = vars(&[("JWT_SECRET", "secret")]);
        assert!(Config::from_vars(|key| no_database.get(key).cloned()).is_err());

        let bad_pool = vars(&[
            ("DATABASE_URL", "postgres://db/recipes"),
            ("JWT_SECRET", "secret"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]);
        assert!(Config::from_vars(|key| bad_pool.get(key).cloned()).is_err());
    }
}
