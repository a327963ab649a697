//! Session model
//!
//! `SessionData` is what a browser's session cookie resolves to. It is stored
//! as JSON by the session stores and exposed to every rendered page.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a flash message, used as the CSS class in templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Info,
    Success,
    Warning,
    Danger,
}

impl fmt::Display for FlashCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlashCategory::Info => write!(f, "info"),
            FlashCategory::Success => write!(f, "success"),
            FlashCategory::Warning => write!(f, "warning"),
            FlashCategory::Danger => write!(f, "danger"),
        }
    }
}

/// One-shot notice shown on the next rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn new(category: FlashCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
        }
    }
}

/// Per-client session state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub logged_in: bool,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

impl SessionData {
    /// Record a successful login.
    pub fn log_in(&mut self, username: impl Into<String>, name: impl Into<String>) {
        self.logged_in = true;
        self.username = Some(username.into());
        self.name = Some(name.into());
    }

    /// Forget the identity and any pending flashes.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Username of the logged-in account, if any
    pub fn current_user(&self) -> Option<&str> {
        if self.logged_in {
            self.username.as_deref()
        } else {
            None
        }
    }

    pub fn flash(&mut self, category: FlashCategory, message: impl Into<String>) {
        self.flashes.push(Flash::new(category, message));
    }

    /// Drain pending flashes for rendering
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.flashes)
    }

    /// True when nothing is worth persisting
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_in_and_clear() {
        let mut session = SessionData::default();
        assert!(session.is_empty());
        assert_eq!(session.current_user(), None);

        session.log_in("alice", "Alice Liddell");
        assert!(session.logged_in);
        assert_eq!(session.current_user(), Some("alice"));
        assert_eq!(session.name.as_deref(), Some("Alice Liddell"));
        assert!(!session.is_empty());

        session.clear();
        assert!(session.is_empty());
    }

    #[test]
    fn test_current_user_requires_logged_in_flag() {
        let session = SessionData {
            logged_in: false,
            username: Some("alice".to_string()),
            ..Default::default()
        };
        assert_eq!(session.current_user(), None);
    }

    #[test]
    fn test_flashes_are_consumed_once() {
        let mut session = SessionData::default();
        session.flash(FlashCategory::Success, "Saved");
        session.flash(FlashCategory::Warning, "Careful");
        assert!(!session.is_empty());

        let flashes = session.take_flashes();
        assert_eq!(flashes.len(), 2);
        assert_eq!(flashes[0].category, FlashCategory::Success);
        assert_eq!(flashes[1].message, "Careful");

        assert!(session.take_flashes().is_empty());
        assert!(session.is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut session = SessionData::default();
        session.flash(FlashCategory::Danger, "Boom");

        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["flashes"][0]["category"], "danger");
        assert_eq!(FlashCategory::Danger.to_string(), "danger");

        let parsed: SessionData = serde_json::from_str(r#"{"logged_in":true}"#).unwrap();
        assert!(parsed.logged_in);
        assert!(parsed.flashes.is_empty());
    }
}
