//! HTML form submissions
//!
//! Each form deserializes from an `application/x-www-form-urlencoded` body,
//! validates against its rule table and either yields a typed value for the
//! handler or the per-field messages to show when re-rendering. Password
//! fields are never serialized back into a page.

mod validator;

pub use validator::{check, FieldErrors, FieldRules, Rule, Validate};

use serde::{Deserialize, Serialize};

/// Validated registration data
#[derive(Debug, Clone)]
pub struct Registration {
    pub name: String,
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Validated login data
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Validated article title and content
#[derive(Debug, Clone)]
pub struct ArticleDraft {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[serde(skip_serializing)]
    pub passconfirm: String,
}

impl Validate for RegisterForm {
    fn rules() -> &'static [FieldRules] {
        &[
            FieldRules {
                name: "name",
                rules: &[
                    Rule::Required("Name is required."),
                    Rule::Length {
                        min: 4,
                        max: Some(25),
                        message: "Name must be between 4 and 25 characters.",
                    },
                ],
            },
            FieldRules {
                name: "username",
                rules: &[
                    Rule::Required("Username is required."),
                    Rule::Length {
                        min: 3,
                        max: Some(25),
                        message: "Username must be between 3 and 25 characters.",
                    },
                ],
            },
            FieldRules {
                name: "email",
                rules: &[
                    Rule::Required("Email is required."),
                    Rule::Length {
                        min: 8,
                        max: Some(25),
                        message: "Email must be between 8 and 25 characters.",
                    },
                    Rule::Email("Please enter a valid email address."),
                ],
            },
            FieldRules {
                name: "password",
                rules: &[
                    Rule::Required("Please enter a password."),
                    Rule::EqualTo {
                        field: "passconfirm",
                        message: "Passwords do not match.",
                    },
                ],
            },
            FieldRules {
                name: "passconfirm",
                rules: &[Rule::Required("Please confirm your password.")],
            },
        ]
    }

    fn field(&self, name: &str) -> &str {
        match name {
            "name" => &self.name,
            "username" => &self.username,
            "email" => &self.email,
            "password" => &self.password,
            "passconfirm" => &self.passconfirm,
            _ => "",
        }
    }
}

impl RegisterForm {
    pub fn validate(&self) -> Result<Registration, FieldErrors> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Registration {
            name: self.name.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip_serializing)]
    pub password: String,
}

impl Validate for LoginForm {
    fn rules() -> &'static [FieldRules] {
        &[
            FieldRules {
                name: "username",
                rules: &[Rule::Required("Username is required.")],
            },
            FieldRules {
                name: "password",
                rules: &[Rule::Required("Password is required.")],
            },
        ]
    }

    fn field(&self, name: &str) -> &str {
        match name {
            "username" => &self.username,
            "password" => &self.password,
            _ => "",
        }
    }
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FieldErrors> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        })
    }
}

/// Add and edit article form
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
}

impl Validate for ArticleForm {
    fn rules() -> &'static [FieldRules] {
        &[
            FieldRules {
                name: "title",
                rules: &[
                    Rule::Required("Title is required."),
                    Rule::Length {
                        min: 5,
                        max: Some(50),
                        message: "Title must be between 5 and 50 characters.",
                    },
                ],
            },
            FieldRules {
                name: "content",
                rules: &[
                    Rule::Required("Content is required."),
                    Rule::Length {
                        min: 10,
                        max: None,
                        message: "Content must be at least 10 characters.",
                    },
                ],
            },
        ]
    }

    fn field(&self, name: &str) -> &str {
        match name {
            "title" => &self.title,
            "content" => &self.content,
            _ => "",
        }
    }
}

impl ArticleForm {
    pub fn validate(&self) -> Result<ArticleDraft, FieldErrors> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ArticleDraft {
            title: self.title.clone(),
            content: self.content.clone(),
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchForm {
    pub keyword: String,
}

impl Validate for SearchForm {
    fn rules() -> &'static [FieldRules] {
        &[FieldRules {
            name: "keyword",
            rules: &[Rule::Required("Enter something to search for.")],
        }]
    }

    fn field(&self, name: &str) -> &str {
        match name {
            "keyword" => &self.keyword,
            _ => "",
        }
    }
}

impl SearchForm {
    /// The trimmed keyword
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let errors = self.errors();
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(self.keyword.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> RegisterForm {
        RegisterForm {
            name: "Alice Liddell".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "secret1".to_string(),
            passconfirm: "secret1".to_string(),
        }
    }

    #[test]
    fn test_valid_registration() {
        let registration = alice().validate().expect("Form should be valid");
        assert_eq!(registration.username, "alice");
        assert_eq!(registration.password, "secret1");
    }

    #[test]
    fn test_password_mismatch() {
        let form = RegisterForm {
            passconfirm: "secret2".to_string(),
            ..alice()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("password"), ["Passwords do not match."]);
        assert!(!errors.has("passconfirm"));
    }

    #[test]
    fn test_empty_registration_reports_only_required() {
        let errors = RegisterForm::default().validate().unwrap_err();
        assert_eq!(errors.get("name"), ["Name is required."]);
        assert_eq!(errors.get("username"), ["Username is required."]);
        assert_eq!(errors.get("email"), ["Email is required."]);
        assert_eq!(errors.get("password"), ["Please enter a password."]);
        assert_eq!(errors.get("passconfirm"), ["Please confirm your password."]);
    }

    #[test]
    fn test_registration_lengths() {
        let form = RegisterForm {
            name: "Bob".to_string(),
            username: "al".to_string(),
            email: "a@b.io".to_string(),
            ..alice()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("name"), ["Name must be between 4 and 25 characters."]);
        assert_eq!(errors.get("username"), ["Username must be between 3 and 25 characters."]);
        assert_eq!(errors.get("email"), ["Email must be between 8 and 25 characters."]);

        let form = RegisterForm {
            email: "a.very.long.address@example.com".to_string(),
            ..alice()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("email"), ["Email must be between 8 and 25 characters."]);
    }

    #[test]
    fn test_registration_invalid_email() {
        let form = RegisterForm {
            email: "not-an-email".to_string(),
            ..alice()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("email"), ["Please enter a valid email address."]);
    }

    #[test]
    fn test_register_form_never_serializes_passwords() {
        let json = serde_json::to_value(alice()).unwrap();
        assert_eq!(json["username"], "alice");
        assert!(json.get("password").is_none());
        assert!(json.get("passconfirm").is_none());
    }

    #[test]
    fn test_login_form() {
        let credentials = LoginForm {
            username: "alice".to_string(),
            password: "secret1".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(credentials.username, "alice");

        let errors = LoginForm::default().validate().unwrap_err();
        assert_eq!(errors.get("username"), ["Username is required."]);
        assert_eq!(errors.get("password"), ["Password is required."]);
    }

    #[test]
    fn test_article_form() {
        let draft = ArticleForm {
            title: "Hello".to_string(),
            content: "0123456789".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(draft.title, "Hello");

        let errors = ArticleForm {
            title: "Hi".to_string(),
            content: "short".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(errors.get("title"), ["Title must be between 5 and 50 characters."]);
        assert_eq!(errors.get("content"), ["Content must be at least 10 characters."]);

        let errors = ArticleForm {
            title: "x".repeat(51),
            content: "y".repeat(10_000),
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("title"));
        assert!(!errors.has("content"));
    }

    #[test]
    fn test_search_form() {
        let keyword = SearchForm {
            keyword: "  rust ".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(keyword, "rust");

        let errors = SearchForm {
            keyword: "   ".to_string(),
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("keyword"));
    }

    #[test]
    fn test_missing_fields_deserialize_as_empty() {
        let form: ArticleForm = serde_json::from_str(r#"{"title":"Only a title"}"#).unwrap();
        assert_eq!(form.content, "");
        assert!(form.validate().unwrap_err().has("content"));
    }
}
