//! Data-annotation style model validation.
//!
//! `#[derive(Reflect)]` turns `#[validate(...)]` field attributes into calls
//! on [`ValidationContext`]; nested fields are validated recursively with a
//! dotted key prefix (`Address.City`, `Items[0].Name`).

use super::model_state::ModelStateDictionary;
use crate::reflection::{Reflect, Reflection};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use tracing::debug;

static PATTERNS: Lazy<DashMap<String, Option<Regex>>> = Lazy::new(DashMap::new);

/// Validation state for one object graph.
#[derive(Debug)]
pub struct ValidationContext<'a> {
    model_state: &'a mut ModelStateDictionary,
    prefix: Vec<String>,
    visited: HashSet<usize>,
}

impl<'a> ValidationContext<'a> {
    /// Validate into a model state with no key prefix
    pub fn new(model_state: &'a mut ModelStateDictionary) -> Self {
        Self {
            model_state,
            prefix: Vec::new(),
            visited: HashSet::new(),
        }
    }

    /// Model key of a member under the current prefix
    #[must_use]
    pub fn key_for(&self, member: &str) -> String {
        let mut key = String::new();
        for segment in self.prefix.iter().map(String::as_str).chain(std::iter::once(member)) {
            if segment.is_empty() {
                continue;
            }
            if !key.is_empty() && !segment.starts_with('[') {
                key.push('.');
            }
            key.push_str(segment);
        }
        key
    }

    /// Record an error for a member
    pub fn add_error(&mut self, member: &str, message: impl Into<String>) {
        let key = self.key_for(member);
        self.model_state.add_model_error(key, message);
    }

    /// Mark a shared node as visited; `false` when it was seen before.
    pub fn enter(&mut self, address: usize) -> bool {
        self.visited.insert(address)
    }

    /// Validate a member value under the member's key prefix
    pub fn nested(&mut self, member: &str, value: &dyn Reflect) {
        self.prefix.push(member.to_string());
        value.validate(self);
        self.prefix.pop();
    }

    /// Validate a collection element under `[index]`
    pub fn nested_index(&mut self, index: usize, value: &dyn Reflect) {
        self.nested(&format!("[{index}]"), value);
    }

    /// `[Required]`: not null and not blank text
    pub fn required(&mut self, member: &str, value: &dyn Reflect) {
        let missing = match text_of(value) {
            Some(text) => text.trim().is_empty(),
            None => crate::reflection::is_null(value),
        };
        if missing {
            self.add_error(member, format!("The {member} field is required."));
        }
    }

    /// `[Range(min, max)]` for numeric values; null passes
    pub fn range(&mut self, member: &str, value: &dyn Reflect, min: f64, max: f64) {
        if let Some(number) = number_of(value) {
            if number < min || number > max {
                self.add_error(member, format!("The field {member} must be between {min} and {max}."));
            }
        }
    }

    /// `[StringLength]` / `[MinLength]` for text and collections; null passes
    pub fn length(&mut self, member: &str, value: &dyn Reflect, min: Option<usize>, max: Option<usize>) {
        let Some(length) = length_of(value) else {
            return;
        };
        let too_short = min.is_some_and(|min| length < min);
        let too_long = max.is_some_and(|max| length > max);
        if !too_short && !too_long {
            return;
        }
        let message = match (min, max) {
            (Some(min), Some(max)) => format!(
                "The field {member} must be a string with a minimum length of {min} and a maximum length of {max}."
            ),
            (None, Some(max)) => {
                format!("The field {member} must be a string with a maximum length of {max}.")
            }
            (Some(min), None) => format!(
                "The field {member} must be a string or array type with a minimum length of '{min}'."
            ),
            (None, None) => return,
        };
        self.add_error(member, message);
    }

    /// `[EmailAddress]`: exactly one `@`, not at either end; null passes
    pub fn email(&mut self, member: &str, value: &dyn Reflect) {
        let Some(text) = text_of(value) else {
            return;
        };
        let valid = text.matches('@').count() == 1 && !text.starts_with('@') && !text.ends_with('@');
        if !valid {
            self.add_error(member, format!("The {member} field is not a valid e-mail address."));
        }
    }

    /// `[RegularExpression]`: the whole text must match; null and empty pass
    pub fn regex(&mut self, member: &str, value: &dyn Reflect, pattern: &str) {
        let Some(text) = text_of(value).filter(|text| !text.is_empty()) else {
            return;
        };
        let compiled = PATTERNS
            .entry(pattern.to_string())
            .or_insert_with(|| Regex::new(&format!("^(?:{pattern})$")).ok())
            .value()
            .clone();
        match compiled {
            Some(regex) if regex.is_match(&text) => {}
            Some(_) => self.add_error(
                member,
                format!("The field {member} must match the regular expression '{pattern}'."),
            ),
            None => self.add_error(
                member,
                format!("The field {member} has an invalid regular expression '{pattern}'."),
            ),
        }
    }
}

fn text_of(value: &dyn Reflect) -> Option<String> {
    match value.reflect() {
        Reflection::Text(text) => Some(text.to_string()),
        Reflection::Transparent(inner) | Reflection::Shared { target: inner, .. } => text_of(inner),
        Reflection::Borrowed(inner) => text_of(&*inner),
        _ => None,
    }
}

fn number_of(value: &dyn Reflect) -> Option<f64> {
    match value.reflect() {
        Reflection::Primitive(text) => text.parse().ok(),
        Reflection::Transparent(inner) | Reflection::Shared { target: inner, .. } => number_of(inner),
        Reflection::Borrowed(inner) => number_of(&*inner),
        _ => None,
    }
}

fn length_of(value: &dyn Reflect) -> Option<usize> {
    match value.reflect() {
        Reflection::Text(text) => Some(text.chars().count()),
        Reflection::Sequence(items) => Some(items.len()),
        Reflection::Map(entries) => Some(entries.len()),
        Reflection::Transparent(inner) | Reflection::Shared { target: inner, .. } => length_of(inner),
        Reflection::Borrowed(inner) => length_of(&*inner),
        _ => None,
    }
}

/// Run validation over a value, writing errors into the model state.
///
/// Returns whether the model state is valid afterwards.
pub fn validate_object(value: &dyn Reflect, model_state: &mut ModelStateDictionary) -> bool {
    let before = model_state.error_count();
    let mut context = ValidationContext::new(model_state);
    value.validate(&mut context);
    let added = model_state.error_count() - before;
    debug!(errors = added, "validated {}", value.type_name());
    model_state.is_valid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflection::Property;
    use std::any::Any;

    struct Address {
        city: Option<String>,
    }

    impl Reflect for Address {
        fn reflect(&self) -> Reflection<'_> {
            Reflection::record(vec![Property::new("City", &self.city)])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn validate(&self, context: &mut ValidationContext<'_>) {
            context.required("City", &self.city);
        }
    }

    struct Customer {
        name: String,
        age: u32,
        email: String,
        code: String,
        addresses: Vec<Address>,
    }

    impl Reflect for Customer {
        fn reflect(&self) -> Reflection<'_> {
            Reflection::record(vec![Property::new("Name", &self.name)])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn validate(&self, context: &mut ValidationContext<'_>) {
            context.required("Name", &self.name);
            context.length("Name", &self.name, None, Some(5));
            context.range("Age", &self.age, 18.0, 99.0);
            context.email("Email", &self.email);
            context.regex("Code", &self.code, "[A-Z]{3}");
            context.nested("Addresses", &self.addresses);
        }
    }

    fn valid_customer() -> Customer {
        Customer {
            name: "Ivo".to_string(),
            age: 30,
            email: "ivo@example.com".to_string(),
            code: "ABC".to_string(),
            addresses: vec![Address {
                city: Some("Sofia".to_string()),
            }],
        }
    }

    #[test]
    fn test_valid_model() {
        let mut state = ModelStateDictionary::new();
        assert!(validate_object(&valid_customer(), &mut state));
    }

    #[test]
    fn test_messages() {
        let customer = Customer {
            name: "  ".to_string(),
            age: 5,
            email: "nope".to_string(),
            code: "abcd".to_string(),
            addresses: vec![],
        };
        let mut state = ModelStateDictionary::new();
        assert!(!validate_object(&customer, &mut state));
        assert_eq!(state.errors("Name"), ["The Name field is required."]);
        assert_eq!(state.errors("Age"), ["The field Age must be between 18 and 99."]);
        assert_eq!(state.errors("Email"), ["The Email field is not a valid e-mail address."]);
        assert_eq!(
            state.errors("Code"),
            ["The field Code must match the regular expression '[A-Z]{3}'."]
        );
    }

    #[test]
    fn test_string_length() {
        let mut customer = valid_customer();
        customer.name = "Ivaylo".to_string();
        let mut state = ModelStateDictionary::new();
        validate_object(&customer, &mut state);
        assert_eq!(
            state.errors("Name"),
            ["The field Name must be a string with a maximum length of 5."]
        );
    }

    #[test]
    fn test_nested_keys() {
        let mut customer = valid_customer();
        customer.addresses.push(Address { city: None });
        let mut state = ModelStateDictionary::new();
        validate_object(&customer, &mut state);
        assert_eq!(state.errors("Addresses[1].City"), ["The City field is required."]);
    }

    #[test]
    fn test_invalid_pattern_reported() {
        let mut state = ModelStateDictionary::new();
        let mut context = ValidationContext::new(&mut state);
        context.regex("Code", &"x".to_string(), "(");
        assert_eq!(state.error_count(), 1);
    }

    #[test]
    fn test_key_for() {
        let mut state = ModelStateDictionary::new();
        let mut context = ValidationContext::new(&mut state);
        assert_eq!(context.key_for("Name"), "Name");
        context.prefix.push("Items".to_string());
        context.prefix.push("[0]".to_string());
        assert_eq!(context.key_for("Name"), "Items[0].Name");
    }
}
