//! Services layer - Business logic
//!
//! Services validate input, enforce per-user ownership and translate
//! repository failures into their own error types.

pub mod password;
pub mod post;
pub mod recipe;
pub mod tag;
pub mod user;
pub mod validation;

pub use password::{hash_password, verify_password};
pub use post::PostService;
pub use recipe::{RecipeService, RecipeServiceError};
pub use tag::{TagService, TagServiceError};
pub use user::{UserService, UserServiceError};
pub use validation::FieldErrors;
