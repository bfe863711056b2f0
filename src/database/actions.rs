mod favorites;
mod ingredients;
mod recipes;
mod tags;
mod users;

pub use favorites::*;
pub use ingredients::*;
pub use recipes::*;
pub use tags::*;
pub use users::*;
