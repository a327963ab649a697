//! Article model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A blog article. `author` holds the username of the account that wrote it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Article {
    /// Check whether `username` owns this article
    pub fn is_owned_by(&self, username: &str) -> bool {
        self.author == username
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_owned_by() {
        let article = Article {
            id: 7,
            title: "Hello world".to_string(),
            author: "alice".to_string(),
            content: "First post on the blog".to_string(),
            created_at: Utc::now(),
        };

        assert!(article.is_owned_by("alice"));
        assert!(!article.is_owned_by("bob"));
        assert!(!article.is_owned_by("Alice"));
    }
}
