//! Form Validation
//!
//! Rules are pipe-separated strings per field:
//!
//! ```
//! use std::collections::HashMap;
//! use web::validation::Validator;
//!
//! let data = HashMap::from([("email".to_string(), "nope".to_string())]);
//! let mut validator = Validator::new(data);
//!
//! assert!(!validator.validate(&[("email", "required|email")]));
//! assert_eq!(validator.errors()["email"], "Email is not a valid email address");
//! ```
//!
//! | rule              | fails when                                          |
//! |-------------------|-----------------------------------------------------|
//! | `required`        | empty or whitespace only                            |
//! | `email`           | non-empty and not an email address                  |
//! | `min:N` / `max:N` | non-empty and shorter / longer than N characters    |
//! | `numeric`         | non-empty and not a number                          |
//! | `confirmed`       | differs from `<field>_confirmation`                 |
//! | `confirmed:other` | differs from `other`                                |
//! | `match:other`     | differs from `other`                                |
//!
//! Only the first failing rule of each field is reported. There is no
//! `unique` rule; controllers check uniqueness against the `UserRepository`.

use std::collections::{BTreeMap, HashMap};

use auth::models::Email;

#[derive(Debug, Clone, Default)]
pub struct Validator {
    data: HashMap<String, String>,
    errors: BTreeMap<String, String>,
}

impl Validator {
    pub fn new(data: HashMap<String, String>) -> Self {
        Self {
            data,
            errors: BTreeMap::new(),
        }
    }

    /// Apply `rules` in order; `true` when no field has an error
    pub fn validate(&mut self, rules: &[(&str, &str)]) -> bool {
        for (field, field_rules) in rules {
            for rule in field_rules.split('|').map(str::trim).filter(|r| !r.is_empty()) {
                if self.errors.contains_key(*field) {
                    break;
                }
                if let Some(message) = self.check(field, rule) {
                    self.errors.insert(field.to_string(), message);
                }
            }
        }
        self.errors.is_empty()
    }

    fn value(&self, field: &str) -> &str {
        self.data.get(field).map(String::as_str).unwrap_or_default()
    }

    fn check(&self, field: &str, rule: &str) -> Option<String> {
        let (name, param) = match rule.split_once(':') {
            Some((name, param)) => (name, Some(param)),
            None => (rule, None),
        };
        let value = self.value(field);
        let name_label = label(field);

        match name {
            "required" => value
                .trim()
                .is_empty()
                .then(|| format!("{} is required", name_label)),

            "email" => (!value.is_empty() && !Email::is_valid_format(&Email::normalize(value)))
                .then(|| format!("{} is not a valid email address", name_label)),

            "min" | "max" => {
                let Some(limit) = param.and_then(|p| p.parse::<usize>().ok()) else {
                    tracing::warn!(field, rule, "Length rule without a numeric limit");
                    return None;
                };
                let length = value.chars().count();
                if value.is_empty() {
                    None
                } else if name == "min" && length < limit {
                    Some(format!("{} must be at least {} characters", name_label, limit))
                } else if name == "max" && length > limit {
                    Some(format!("{} may not be longer than {} characters", name_label, limit))
                } else {
                    None
                }
            }

            "numeric" => (!value.is_empty() && value.trim().parse::<f64>().is_err())
                .then(|| format!("{} must be a number", name_label)),

            "confirmed" => {
                let other = match param {
                    Some(other) => other.to_string(),
                    None => format!("{}_confirmation", field),
                };
                (value != self.value(&other)).then(|| format!("{} does not match", name_label))
            }

            "match" => {
                let other = param.unwrap_or_default();
                (value != self.value(other))
                    .then(|| format!("{} does not match {}", name_label, label(other)))
            }

            unknown => {
                tracing::warn!(field, rule = unknown, "Unknown validation rule ignored");
                None
            }
        }
    }

    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    pub fn into_errors(self) -> BTreeMap<String, String> {
        self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// `password_confirm` -> `Password confirm`
fn label(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(pairs: &[(&str, &str)]) -> Validator {
        Validator::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_required() {
        let mut v = validator(&[("name", "  ")]);
        assert!(!v.validate(&[("name", "required")]));
        assert_eq!(v.errors()["name"], "Name is required");

        let mut v = validator(&[]);
        assert!(!v.validate(&[("name", "required")]));
    }

    #[test]
    fn test_email() {
        let mut v = validator(&[("email", "invalid-email")]);
        assert!(!v.validate(&[("email", "email")]));

        let mut v = validator(&[("email", "test@example.com")]);
        assert!(v.validate(&[("email", "email")]));

        // Optional unless also required
        let mut v = validator(&[("email", "")]);
        assert!(v.validate(&[("email", "email")]));
    }

    #[test]
    fn test_min_max_count_characters() {
        let mut v = validator(&[("password", "123")]);
        assert!(!v.validate(&[("password", "min:6")]));
        assert_eq!(v.errors()["password"], "Password must be at least 6 characters");

        let mut v = validator(&[("name", "This is a very long string")]);
        assert!(!v.validate(&[("name", "max:10")]));

        let mut v = validator(&[("name", "éééééé")]);
        assert!(v.validate(&[("name", "min:6|max:6")]));
    }

    #[test]
    fn test_numeric() {
        let mut v = validator(&[("age", "abc")]);
        assert!(!v.validate(&[("age", "numeric")]));

        let mut v = validator(&[("age", "42.5")]);
        assert!(v.validate(&[("age", "numeric")]));
    }

    #[test]
    fn test_confirmed_default_field() {
        let mut v = validator(&[("password", "secret1"), ("password_confirmation", "secret2")]);
        assert!(!v.validate(&[("password", "confirmed")]));

        let mut v = validator(&[("password", "secret1"), ("password_confirmation", "secret1")]);
        assert!(v.validate(&[("password", "confirmed")]));
    }

    #[test]
    fn test_confirmed_named_field() {
        let mut v = validator(&[("password", "secret1"), ("password_confirm", "secret1")]);
        assert!(v.validate(&[("password_confirm", "required|confirmed:password")]));

        let mut v = validator(&[("password", "secret1"), ("password_confirm", "other")]);
        assert!(!v.validate(&[("password_confirm", "required|confirmed:password")]));
        assert_eq!(v.errors()["password_confirm"], "Password confirm does not match");
    }

    #[test]
    fn test_match() {
        let mut v = validator(&[("new_password", "a"), ("repeat", "b")]);
        assert!(!v.validate(&[("repeat", "match:new_password")]));
        assert_eq!(v.errors()["repeat"], "Repeat does not match New password");
    }

    #[test]
    fn test_first_error_per_field() {
        let mut v = validator(&[("email", "")]);
        assert!(!v.validate(&[("email", "required|email|min:50")]));
        assert_eq!(v.errors().len(), 1);
        assert_eq!(v.errors()["email"], "Email is required");
    }

    #[test]
    fn test_unknown_rule_is_ignored() {
        let mut v = validator(&[("name", "x")]);
        assert!(v.validate(&[("name", "unique:users,name")]));
    }
}
