//! Reflection Utility Layer
//!
//! Rust has no runtime reflection, so types opt in through [`Reflect`]
//! (usually via `#[derive(Reflect)]`). A [`Reflection`] is the shape view of a
//! value: deep equality, failure-message rendering and model validation all
//! walk values through it.
//!
//! ## Shapes
//!
//! ```text
//! Null | Opaque | Primitive | Enumeration | Text      leaves
//! Operator | Equals | Comparable                     type-defined equality
//! Sequence | Map | Record | Variant | Anonymous      structural
//! Shared | Borrowed | Transparent                    indirection
//! ```

pub mod activation;
pub mod cache;
pub mod equality;
mod impls;
pub mod names;

use crate::mvc::validation::ValidationContext;
use std::any::Any;
use std::borrow::Cow;
use std::cell::Ref;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;

pub use activation::{
    create_instance, find_constructor, Constructor, DependencyBag, DependencyResolver,
    ParameterInfo,
};
pub use equality::{are_deeply_equal, deep_equality, DeepEqualityResult};
pub use impls::format_time_span;
pub use names::{friendly_name_of, friendly_type_name, prettify_type_name};

/// A value whose shape can be inspected at runtime.
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect)]
/// struct Person {
///     #[validate(required)]
///     name: String,
///     age: u32,
/// }
///
/// assert!(are_deeply_equal(&person, &person.clone()));
/// ```
pub trait Reflect: Any {
    /// Shape view of this value
    fn reflect(&self) -> Reflection<'_>;

    /// Upcast for downcasting and type identity
    fn as_any(&self) -> &dyn Any;

    /// Full compiler type name
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Run data-annotation validation, writing errors into the context
    fn validate(&self, _context: &mut ValidationContext<'_>) {}
}

impl fmt::Debug for dyn Reflect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self))
    }
}

impl fmt::Debug for dyn Reflect + Send {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self))
    }
}

/// A named member of a record, variant or anonymous value
pub struct Property<'a> {
    /// Member name
    pub name: Cow<'a, str>,
    /// Member value
    pub value: &'a dyn Reflect,
}

impl<'a> Property<'a> {
    /// Create a property over a borrowed value
    #[must_use]
    pub fn new<T: Reflect>(name: impl Into<Cow<'a, str>>, value: &'a T) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Create a property over an already erased value
    #[must_use]
    pub fn erased(name: impl Into<Cow<'a, str>>, value: &'a dyn Reflect) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A keyed entry of a map value
pub struct MapEntry<'a> {
    /// Rendered key
    pub key: String,
    /// Entry value
    pub value: &'a dyn Reflect,
}

/// Equality through a type-defined `==` operator
pub struct Operator<'a> {
    value: &'a dyn DynEq,
    literal: Option<String>,
}

impl<'a> Operator<'a> {
    /// Operator equality for a type implementing `PartialEq`
    #[must_use]
    pub fn new<T: PartialEq + fmt::Debug + 'static>(value: &'a T) -> Self {
        Self {
            value,
            literal: None,
        }
    }

    /// Operator equality for a date/time type; `literal` is what failure
    /// messages show instead of drilling into sub-fields.
    #[must_use]
    pub fn temporal<T: PartialEq + fmt::Debug + 'static>(
        value: &'a T,
        literal: impl Into<String>,
    ) -> Self {
        Self {
            value,
            literal: Some(literal.into()),
        }
    }

    /// Whether the type is date/time related
    #[must_use]
    pub const fn is_temporal(&self) -> bool {
        self.literal.is_some()
    }

    /// Evaluate `self == other`
    #[must_use]
    pub fn equals(&self, other: &dyn Any) -> bool {
        self.value.dyn_eq(other)
    }

    /// Evaluate `==` against the operand of another operator shape
    #[must_use]
    pub fn equals_operator(&self, other: &Operator<'_>) -> bool {
        self.value.dyn_eq(other.value.eq_target())
    }

    /// Rendered value for failure messages
    #[must_use]
    pub fn describe(&self) -> String {
        self.literal
            .clone()
            .unwrap_or_else(|| self.value.describe())
    }
}

/// Type-specific `Equals()` override
pub struct CustomEquality<'a> {
    target: &'a dyn Any,
    compare: Box<dyn Fn(&dyn Any) -> bool + 'a>,
}

impl<'a> CustomEquality<'a> {
    /// Wrap an equality function for values of `T`
    #[must_use]
    pub fn new<T: Any>(value: &'a T, equals: fn(&T, &T) -> bool) -> Self {
        Self {
            target: value,
            compare: Box::new(move |other| {
                other
                    .downcast_ref::<T>()
                    .is_some_and(|other| equals(value, other))
            }),
        }
    }

    /// Evaluate the override against another value
    #[must_use]
    pub fn equals(&self, other: &dyn Any) -> bool {
        (self.compare)(other)
    }

    /// Value the override was declared on
    #[must_use]
    pub fn target(&self) -> &'a dyn Any {
        self.target
    }
}

/// Object-safe `PartialEq`
pub trait DynEq {
    /// Compare against a value of (possibly) the same type
    fn dyn_eq(&self, other: &dyn Any) -> bool;
    /// Debug rendering
    fn describe(&self) -> String;
    /// Operand as `Any`
    fn eq_target(&self) -> &dyn Any;
}

impl<T: PartialEq + fmt::Debug + 'static> DynEq for T {
    fn dyn_eq(&self, other: &dyn Any) -> bool {
        other.downcast_ref::<T>().is_some_and(|other| self == other)
    }

    fn describe(&self) -> String {
        format!("{self:?}")
    }

    fn eq_target(&self) -> &dyn Any {
        self
    }
}

/// Object-safe `PartialOrd`
pub trait DynOrd {
    /// Compare against a value of (possibly) the same type
    fn dyn_cmp(&self, other: &dyn Any) -> Option<Ordering>;
    /// Operand as `Any`
    fn ord_target(&self) -> &dyn Any;
}

impl<T: PartialOrd + 'static> DynOrd for T {
    fn dyn_cmp(&self, other: &dyn Any) -> Option<Ordering> {
        other
            .downcast_ref::<T>()
            .and_then(|other| self.partial_cmp(other))
    }

    fn ord_target(&self) -> &dyn Any {
        self
    }
}

/// Shape view of a reflected value
pub enum Reflection<'a> {
    /// Absent value
    Null,
    /// The universal base object: no inspectable shape
    Opaque,
    /// Numbers, booleans and characters, compared by string form
    Primitive(String),
    /// Fieldless enum variant, compared by name
    Enumeration(String),
    /// String data
    Text(&'a str),
    /// Type-defined `==`
    Operator(Operator<'a>),
    /// Type-specific `Equals()` override
    Equals(CustomEquality<'a>),
    /// Ordering capability; zero comparison means equal
    Comparable(&'a dyn DynOrd),
    /// Ordered collection
    Sequence(Vec<&'a dyn Reflect>),
    /// Keyed collection
    Map(Vec<MapEntry<'a>>),
    /// Public readable properties
    Record(Vec<Property<'a>>),
    /// Data-carrying enum variant
    Variant {
        /// Variant name
        name: &'static str,
        /// Variant fields
        fields: Vec<Property<'a>>,
    },
    /// Compiler-generated shape (tuples, JSON objects)
    Anonymous(Vec<Property<'a>>),
    /// Reference-identity node (`Rc`, `Arc`)
    Shared {
        /// Pointer address used for identity
        address: usize,
        /// Pointee
        target: &'a dyn Reflect,
    },
    /// Interior-mutable node (`RefCell`)
    Borrowed(Ref<'a, dyn Reflect>),
    /// Transparent wrapper (`Box`, `Option::Some`)
    Transparent(&'a dyn Reflect),
}

impl<'a> Reflection<'a> {
    /// Record shape
    #[must_use]
    pub fn record(properties: Vec<Property<'a>>) -> Self {
        Self::Record(properties)
    }

    /// Operator shape for a `PartialEq` type
    #[must_use]
    pub fn operator<T: PartialEq + fmt::Debug + 'static>(value: &'a T) -> Self {
        Self::Operator(Operator::new(value))
    }

    /// Comparable shape for a `PartialOrd` type
    #[must_use]
    pub fn comparable<T: PartialOrd + 'static>(value: &'a T) -> Self {
        Self::Comparable(value)
    }

    /// Custom `Equals()` shape
    #[must_use]
    pub fn custom_equality<T: Any>(value: &'a T, equals: fn(&T, &T) -> bool) -> Self {
        Self::Equals(CustomEquality::new(value, equals))
    }

    /// Short name of the shape
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Opaque => "opaque",
            Self::Primitive(_) => "primitive",
            Self::Enumeration(_) => "enumeration",
            Self::Text(_) => "text",
            Self::Operator(_) => "operator",
            Self::Equals(_) => "equals",
            Self::Comparable(_) => "comparable",
            Self::Sequence(_) => "sequence",
            Self::Map(_) => "map",
            Self::Record(_) => "record",
            Self::Variant { .. } => "variant",
            Self::Anonymous(_) => "anonymous",
            Self::Shared { .. } => "shared",
            Self::Borrowed(_) => "borrowed",
            Self::Transparent(_) => "transparent",
        }
    }

    /// Whether the shape is a collection
    #[must_use]
    pub const fn is_enumerable(&self) -> bool {
        matches!(self, Self::Sequence(_) | Self::Map(_))
    }
}

impl fmt::Debug for Reflection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive(value) | Self::Enumeration(value) => {
                write!(f, "{}({value})", self.kind())
            }
            Self::Text(value) => write!(f, "text({value:?})"),
            Self::Sequence(items) => write!(f, "sequence(len = {})", items.len()),
            Self::Map(entries) => write!(f, "map(len = {})", entries.len()),
            Self::Shared { address, .. } => write!(f, "shared({address:#x})"),
            other => f.write_str(other.kind()),
        }
    }
}

/// Whether a value reflects as absent
#[must_use]
pub fn is_null(value: &dyn Reflect) -> bool {
    match value.reflect() {
        Reflection::Null => true,
        Reflection::Transparent(inner) => is_null(inner),
        _ => false,
    }
}

const MAX_DESCRIBE_DEPTH: usize = 8;

/// Render a value for failure messages.
#[must_use]
pub fn describe(value: &dyn Reflect) -> String {
    let mut visited = HashSet::new();
    let mut out = String::new();
    describe_into(value, &mut out, &mut visited, 0, false);
    out
}

fn describe_into(
    value: &dyn Reflect,
    out: &mut String,
    visited: &mut HashSet<usize>,
    depth: usize,
    nested: bool,
) {
    if depth > MAX_DESCRIBE_DEPTH {
        out.push('…');
        return;
    }
    match value.reflect() {
        Reflection::Null => out.push_str("null"),
        Reflection::Opaque | Reflection::Comparable(_) | Reflection::Equals(_) => {
            out.push_str(&friendly_name_of(value));
        }
        Reflection::Primitive(text) | Reflection::Enumeration(text) => out.push_str(&text),
        Reflection::Text(text) => {
            if nested {
                out.push_str(&format!("{text:?}"));
            } else {
                out.push_str(text);
            }
        }
        Reflection::Operator(operator) => out.push_str(&operator.describe()),
        Reflection::Sequence(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                describe_into(*item, out, visited, depth + 1, true);
            }
            out.push(']');
        }
        Reflection::Map(entries) => {
            out.push('{');
            for (index, entry) in entries.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&entry.key);
                out.push_str(": ");
                describe_into(entry.value, out, visited, depth + 1, true);
            }
            out.push('}');
        }
        Reflection::Record(properties) => {
            out.push_str(&friendly_name_of(value));
            describe_properties(&properties, out, visited, depth);
        }
        Reflection::Variant { name, fields } => {
            out.push_str(&friendly_name_of(value));
            out.push_str("::");
            out.push_str(name);
            describe_properties(&fields, out, visited, depth);
        }
        Reflection::Anonymous(properties) => {
            out.push_str("{ ");
            for (index, property) in properties.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                out.push_str(&property.name);
                out.push_str(" = ");
                describe_into(property.value, out, visited, depth + 1, true);
            }
            out.push_str(" }");
        }
        Reflection::Shared { address, target } => {
            if visited.insert(address) {
                describe_into(target, out, visited, depth, nested);
            } else {
                out.push_str("<cycle>");
            }
        }
        Reflection::Borrowed(inner) => describe_into(&*inner, out, visited, depth, nested),
        Reflection::Transparent(inner) => describe_into(inner, out, visited, depth, nested),
    }
}

fn describe_properties(
    properties: &[Property<'_>],
    out: &mut String,
    visited: &mut HashSet<usize>,
    depth: usize,
) {
    if properties.is_empty() {
        return;
    }
    out.push_str(" { ");
    for (index, property) in properties.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        out.push_str(&property.name);
        out.push_str(": ");
        describe_into(property.value, out, visited, depth + 1, true);
    }
    out.push_str(" }");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    struct Point {
        x: i32,
        y: i32,
    }

    impl Reflect for Point {
        fn reflect(&self) -> Reflection<'_> {
            Reflection::record(vec![Property::new("x", &self.x), Property::new("y", &self.y)])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct Node {
        name: String,
        next: Option<Rc<RefCell<Node>>>,
    }

    impl Reflect for Node {
        fn reflect(&self) -> Reflection<'_> {
            Reflection::record(vec![
                Property::new("name", &self.name),
                Property::new("next", &self.next),
            ])
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_describe_record() {
        let point = Point { x: 1, y: 2 };
        assert_eq!(describe(&point), "Point { x: 1, y: 2 }");
    }

    #[test]
    fn test_describe_text_quotes_only_when_nested() {
        assert_eq!(describe(&"value".to_string()), "value");
        assert_eq!(describe(&vec!["a".to_string()]), "[\"a\"]");
    }

    #[test]
    fn test_describe_null() {
        let value: Option<i32> = None;
        assert_eq!(describe(&value), "null");
        assert!(is_null(&value));
        assert!(!is_null(&Some(3)));
    }

    #[test]
    fn test_describe_terminates_on_cycle() {
        let node = Rc::new(RefCell::new(Node {
            name: "a".to_string(),
            next: None,
        }));
        node.borrow_mut().next = Some(Rc::clone(&node));
        let rendered = describe(&node);
        assert!(rendered.contains("<cycle>"));
        node.borrow_mut().next = None;
    }

    #[test]
    fn test_operator_describe_prefers_literal() {
        let value = 5_i32;
        assert_eq!(Operator::new(&value).describe(), "5");
        assert_eq!(Operator::temporal(&value, "00:00:05").describe(), "00:00:05");
        assert!(Operator::temporal(&value, "x").is_temporal());
    }

    #[test]
    fn test_custom_equality_downcasts() {
        let a = Point { x: 1, y: 2 };
        let b = Point { x: 1, y: 9 };
        let equality = CustomEquality::new(&a, |left: &Point, right: &Point| left.x == right.x);
        assert!(equality.equals(&b));
        assert!(!equality.equals(&5_i32));
    }
}
