//! Deep structural equality with failure paths.
//!
//! Expected and actual graphs are walked together through [`Reflection`].
//! The first divergence freezes the path and records both values, so a
//! failure message points at where the graphs first differ:
//!
//! ```text
//! Difference occurs at 'Orders[2].Total'. Expected a value of '10', but in fact it was '12'.
//! ```

use super::{describe, friendly_name_of, MapEntry, Property, Reflect, Reflection};
use std::any::{Any, TypeId};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

const EQUALITY_OPERATOR: &str = "== (Equality Operator)";
const EQUALS_OVERRIDE: &str = "Equals()";
const COUNT: &str = "Count";

/// Outcome of a deep comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeepEqualityResult {
    failed: bool,
    path: Vec<String>,
    expected: Option<String>,
    actual: Option<String>,
}

impl DeepEqualityResult {
    /// A successful comparison
    #[must_use]
    pub fn success() -> Self {
        Self::default()
    }

    /// Whether both graphs were equal
    #[must_use]
    pub fn are_equal(&self) -> bool {
        !self.failed
    }

    /// Path to the first divergence, e.g. `Items[2].Name`
    #[must_use]
    pub fn path(&self) -> String {
        let mut rendered = String::new();
        for segment in &self.path {
            if !rendered.is_empty() && !segment.starts_with('[') {
                rendered.push('.');
            }
            rendered.push_str(segment);
        }
        rendered
    }

    /// Path segments to the first divergence
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.path
    }

    /// Expected value at the divergence
    #[must_use]
    pub fn expected_value(&self) -> Option<&str> {
        self.expected.as_deref()
    }

    /// Actual value at the divergence
    #[must_use]
    pub fn actual_value(&self) -> Option<&str> {
        self.actual.as_deref()
    }

    /// Human-readable description of the divergence, `None` when equal
    #[must_use]
    pub fn failure_message(&self) -> Option<String> {
        self.failed.then(|| {
            format!(
                "Difference occurs at '{}'. Expected a value of '{}', but in fact it was '{}'.",
                self.path(),
                self.expected.as_deref().unwrap_or("null"),
                self.actual.as_deref().unwrap_or("null"),
            )
        })
    }
}

impl fmt::Display for DeepEqualityResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failure_message() {
            Some(message) => f.write_str(&message),
            None => f.write_str("Values are deeply equal."),
        }
    }
}

/// Whether two values are structurally equal.
#[must_use]
pub fn are_deeply_equal(expected: &dyn Reflect, actual: &dyn Reflect) -> bool {
    deep_equality(expected, actual).are_equal()
}

/// Compare two values and report where they first differ.
#[must_use]
pub fn deep_equality(expected: &dyn Reflect, actual: &dyn Reflect) -> DeepEqualityResult {
    let mut comparer = Comparer::default();
    comparer.compare(expected, actual);
    if comparer.result.failed {
        trace!(path = %comparer.result.path(), "deep equality diverged");
    }
    comparer.result
}

#[derive(Default)]
struct Comparer {
    visited: HashSet<(usize, usize, TypeId)>,
    path: Vec<String>,
    result: DeepEqualityResult,
}

fn address_of(value: &dyn Reflect) -> usize {
    (value as *const dyn Reflect).cast::<()>() as usize
}

impl Comparer {
    fn fail(&mut self, expected: String, actual: String) -> bool {
        if !self.result.failed {
            self.result = DeepEqualityResult {
                failed: true,
                path: self.path.clone(),
                expected: Some(expected),
                actual: Some(actual),
            };
        }
        false
    }

    fn fail_values(&mut self, expected: &dyn Reflect, actual: &dyn Reflect) -> bool {
        self.fail(describe(expected), describe(actual))
    }

    fn fail_at(&mut self, segment: impl Into<String>, expected: String, actual: String) -> bool {
        self.path.push(segment.into());
        self.fail(expected, actual)
    }

    fn nested(&mut self, segment: impl Into<String>, expected: &dyn Reflect, actual: &dyn Reflect) -> bool {
        self.path.push(segment.into());
        let equal = self.compare(expected, actual);
        if equal {
            self.path.pop();
        }
        equal
    }

    /// Unwrap indirections on the expected side, then on the actual side.
    fn compare(&mut self, expected: &dyn Reflect, actual: &dyn Reflect) -> bool {
        match expected.reflect() {
            Reflection::Shared { target, .. } | Reflection::Transparent(target) => {
                self.compare(target, actual)
            }
            Reflection::Borrowed(inner) => self.compare(&*inner, actual),
            _ => self.compare_actual(expected, actual),
        }
    }

    fn compare_actual(&mut self, expected: &dyn Reflect, actual: &dyn Reflect) -> bool {
        match actual.reflect() {
            Reflection::Shared { target, .. } | Reflection::Transparent(target) => {
                self.compare_actual(expected, target)
            }
            Reflection::Borrowed(inner) => self.compare_actual(expected, &*inner),
            _ => self.compare_nodes(expected, actual),
        }
    }

    fn compare_nodes(&mut self, expected: &dyn Reflect, actual: &dyn Reflect) -> bool {
        let expected_shape = expected.reflect();
        let actual_shape = actual.reflect();

        match (&expected_shape, &actual_shape) {
            (Reflection::Null, Reflection::Null) => return true,
            (Reflection::Null, _) | (_, Reflection::Null) => {
                return self.fail_values(expected, actual)
            }
            _ => {}
        }

        let expected_type = Any::type_id(expected.as_any());
        let actual_type = Any::type_id(actual.as_any());

        let is_opaque = |shape: &Reflection<'_>| matches!(shape, Reflection::Opaque);
        if is_opaque(&expected_shape) != is_opaque(&actual_shape) {
            return self.fail(friendly_name_of(expected), friendly_name_of(actual));
        }

        if is_composite(&expected_shape) {
            let key = (address_of(expected), address_of(actual), expected_type);
            if !self.visited.insert(key) {
                return true;
            }
        }

        if expected_shape.is_enumerable() {
            return self.compare_collections(expected, actual, expected_shape, actual_shape);
        }

        if let Reflection::Anonymous(expected_properties) = expected_shape {
            return match actual_shape {
                Reflection::Anonymous(actual_properties) => {
                    self.compare_properties(&expected_properties, &actual_properties)
                }
                _ => self.fail_values(expected, actual),
            };
        }

        if expected_type != actual_type {
            return self.fail(
                format!("{} ({})", describe(expected), friendly_name_of(expected)),
                format!("{} ({})", describe(actual), friendly_name_of(actual)),
            );
        }

        match (expected_shape, actual_shape) {
            (Reflection::Opaque, Reflection::Opaque) => true,
            (Reflection::Primitive(left), Reflection::Primitive(right))
            | (Reflection::Enumeration(left), Reflection::Enumeration(right)) => {
                left == right || self.fail(left, right)
            }
            (Reflection::Text(left), Reflection::Text(right)) => {
                left == right || self.fail(left.to_string(), right.to_string())
            }
            (Reflection::Operator(operator), Reflection::Operator(other)) => {
                if operator.equals_operator(&other) {
                    true
                } else if operator.is_temporal() {
                    self.fail(operator.describe(), other.describe())
                } else {
                    self.fail_at(EQUALITY_OPERATOR, operator.describe(), other.describe())
                }
            }
            (Reflection::Equals(equality), Reflection::Equals(other)) => {
                equality.equals(other.target()) || {
                    let (left, right) = (describe(expected), describe(actual));
                    self.fail_at(EQUALS_OVERRIDE, left, right)
                }
            }
            (Reflection::Comparable(ordering), Reflection::Comparable(other)) => {
                ordering.dyn_cmp(other.ord_target()) == Some(Ordering::Equal)
                    || self.fail_values(expected, actual)
            }
            (Reflection::Record(left), Reflection::Record(right)) => {
                self.compare_properties(&left, &right)
            }
            (
                Reflection::Variant {
                    name: left_name,
                    fields: left,
                },
                Reflection::Variant {
                    name: right_name,
                    fields: right,
                },
            ) => {
                if left_name == right_name {
                    self.compare_properties(&left, &right)
                } else {
                    self.fail(left_name.to_string(), right_name.to_string())
                }
            }
            (Reflection::Variant { name, .. }, Reflection::Enumeration(other)) => {
                self.fail(name.to_string(), other)
            }
            (Reflection::Enumeration(name), Reflection::Variant { name: other, .. }) => {
                self.fail(name, other.to_string())
            }
            _ => self.fail_values(expected, actual),
        }
    }

    fn compare_properties(&mut self, expected: &[Property<'_>], actual: &[Property<'_>]) -> bool {
        for property in expected {
            let Some(other) = actual.iter().find(|other| other.name == property.name) else {
                let expected_value = describe(property.value);
                return self.fail_at(property.name.to_string(), expected_value, "null".to_string());
            };
            if !self.nested(property.name.to_string(), property.value, other.value) {
                return false;
            }
        }
        true
    }

    fn compare_collections(
        &mut self,
        expected: &dyn Reflect,
        actual: &dyn Reflect,
        expected_shape: Reflection<'_>,
        actual_shape: Reflection<'_>,
    ) -> bool {
        match (expected_shape, actual_shape) {
            (Reflection::Sequence(left), Reflection::Sequence(right)) => {
                if left.len() != right.len() {
                    return self.fail_at(COUNT, left.len().to_string(), right.len().to_string());
                }
                left.iter()
                    .zip(&right)
                    .enumerate()
                    .all(|(index, (left, right))| self.nested(format!("[{index}]"), *left, *right))
            }
            (Reflection::Map(left), Reflection::Map(right)) => self.compare_maps(&left, &right),
            _ => self.fail_values(expected, actual),
        }
    }

    fn compare_maps(&mut self, expected: &[MapEntry<'_>], actual: &[MapEntry<'_>]) -> bool {
        if expected.len() != actual.len() {
            return self.fail_at(COUNT, expected.len().to_string(), actual.len().to_string());
        }
        for entry in expected {
            let segment = format!("[{}]", entry.key);
            let Some(other) = actual.iter().find(|other| other.key == entry.key) else {
                let expected_value = describe(entry.value);
                return self.fail_at(segment, expected_value, "null".to_string());
            };
            if !self.nested(segment, entry.value, other.value) {
                return false;
            }
        }
        true
    }
}

fn is_composite(shape: &Reflection<'_>) -> bool {
    matches!(
        shape,
        Reflection::Sequence(_)
            | Reflection::Map(_)
            | Reflection::Record(_)
            | Reflection::Variant { .. }
            | Reflection::Anonymous(_)
    )
}
