//! Declarative field validation
//!
//! A form is described as a table of fields, each with a list of [`Rule`]s.
//! `Required` is checked first and, when it fails, hides every other rule for
//! that field. Otherwise every failing rule contributes a message.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$",
    )
    .expect("email pattern is valid")
});

/// A single constraint on a field value
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Value must contain something other than whitespace
    Required(&'static str),
    /// Character count must lie in `min..=max`
    Length {
        min: usize,
        max: Option<usize>,
        message: &'static str,
    },
    /// Value must look like an email address
    Email(&'static str),
    /// Value must equal another field of the same form
    EqualTo {
        field: &'static str,
        message: &'static str,
    },
}

/// One entry of a form's validation table
#[derive(Debug, Clone, Copy)]
pub struct FieldRules {
    pub name: &'static str,
    pub rules: &'static [Rule],
}

/// A submitted form that can be checked against its rule table
pub trait Validate {
    /// The validation table
    fn rules() -> &'static [FieldRules];

    /// Raw value of a field by name; unknown names read as empty
    fn field(&self, name: &str) -> &str;

    /// Run every rule, collecting per-field messages
    fn errors(&self) -> FieldErrors {
        let mut errors = FieldErrors::default();
        for field in Self::rules() {
            for message in check(field.rules, self.field(field.name), |other| self.field(other)) {
                errors.add(field.name, message);
            }
        }
        errors
    }
}

/// Messages for every field that failed, keyed by field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, Vec<String>>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

/// Check one value against its rules. `lookup` resolves sibling fields for `EqualTo`.
pub fn check<'a>(
    rules: &[Rule],
    value: &str,
    lookup: impl Fn(&'static str) -> &'a str,
) -> Vec<&'static str> {
    for rule in rules {
        if let Rule::Required(message) = *rule {
            if value.trim().is_empty() {
                return vec![message];
            }
        }
    }

    rules
        .iter()
        .filter_map(|rule| match *rule {
            Rule::Required(_) => None,
            Rule::Length { min, max, message } => {
                let len = value.chars().count();
                let too_long = max.map(|max| len > max).unwrap_or(false);
                (len < min || too_long).then_some(message)
            }
            Rule::Email(message) => (!EMAIL_RE.is_match(value)).then_some(message),
            Rule::EqualTo { field, message } => (value != lookup(field)).then_some(message),
        })
        .collect()
}
