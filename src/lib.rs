mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod image;
    pub mod pagination;
    pub mod schema;
    pub mod validation;
    pub mod view;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
}
mod config;
mod constants;

pub use authentication::*;
pub use config::*;
pub use constants::*;
pub use database::*;
pub use actions::*;
