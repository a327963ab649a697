//! Data models
//!
//! Plain data carried between the repositories, services and templates:
//! - Database entities (`User`, `Article`)
//! - Per-client session state (`SessionData`, `Flash`)

mod article;
mod session;
mod user;

pub use article::Article;
pub use session::{Flash, FlashCategory, SessionData};
pub use user::User;
