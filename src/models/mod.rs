//! Data models
//!
//! Database entities (User, AuthToken, Recipe, Tag, Post) and the input
//! types the services accept.

mod post;
mod recipe;
mod tag;
mod token;
mod user;

pub use post::Post;
pub use recipe::{Price, PriceError, PriceInput, Recipe, RecipeInput, MAX_PRICE_CENTS};
pub use tag::{Tag, TagInput};
pub use token::AuthToken;
pub use user::{normalize_email, CreateUserInput, UpdateUserInput, User};
