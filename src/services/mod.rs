//! Services layer
//!
//! Business rules sitting between the HTTP handlers and the repositories.

pub mod article;
pub mod password;
pub mod user;

pub use article::{ArticleService, ArticleServiceError};
pub use password::{hash_password, verify_password};
pub use user::{UserService, UserServiceError};
