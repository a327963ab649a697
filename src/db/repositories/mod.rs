//! Database repositories
//!
//! Each repository owns the SQL for one table, in both dialects.

pub mod article;
pub mod session;
pub mod user;

pub use article::{ArticleRepository, SqlxArticleRepository};
pub use session::{SessionRecord, SessionRepository, SqlxSessionRepository};
pub use user::{SqlxUserRepository, UserRepository};
