//! [`Reflect`] for standard library and ecosystem types.

use super::{describe, MapEntry, Operator, Property, Reflect, Reflection};
use crate::mvc::validation::ValidationContext;
use std::any::Any;
use std::borrow::Cow;
use std::cell::{Ref, RefCell};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::hash::BuildHasher;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

macro_rules! reflect_primitive {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn reflect(&self) -> Reflection<'_> {
                    Reflection::Primitive(self.to_string())
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

reflect_primitive!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char);

impl Reflect for () {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Primitive("()".to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for String {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Text(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for &'static str {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Text(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for Cow<'static, str> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Text(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Reflect> Reflect for Option<T> {
    fn reflect(&self) -> Reflection<'_> {
        match self {
            Some(value) => Reflection::Transparent(value),
            None => Reflection::Null,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        if let Some(value) = self {
            value.validate(context);
        }
    }
}

impl<T: Reflect, E: Reflect> Reflect for Result<T, E> {
    fn reflect(&self) -> Reflection<'_> {
        match self {
            Ok(value) => Reflection::Variant {
                name: "Ok",
                fields: vec![Property::new("0", value)],
            },
            Err(error) => Reflection::Variant {
                name: "Err",
                fields: vec![Property::new("0", error)],
            },
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<T: Reflect> Reflect for Box<T> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Transparent(&**self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        (**self).validate(context);
    }
}

impl Reflect for Box<dyn Reflect> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Transparent(&**self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        (**self).validate(context);
    }
}

impl<T: Reflect> Reflect for Rc<T> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Shared {
            address: Rc::as_ptr(self).cast::<()>() as usize,
            target: &**self,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        if context.enter(Rc::as_ptr(self).cast::<()>() as usize) {
            (**self).validate(context);
        }
    }
}

impl<T: Reflect> Reflect for Arc<T> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Shared {
            address: Arc::as_ptr(self).cast::<()>() as usize,
            target: &**self,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        if context.enter(Arc::as_ptr(self).cast::<()>() as usize) {
            (**self).validate(context);
        }
    }
}

impl<T: Reflect> Reflect for RefCell<T> {
    fn reflect(&self) -> Reflection<'_> {
        // A value mutably borrowed elsewhere cannot be inspected.
        self.try_borrow().map_or(Reflection::Opaque, |value| {
            Reflection::Borrowed(Ref::map(value, |inner| inner as &dyn Reflect))
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        if let Ok(value) = self.try_borrow() {
            value.validate(context);
        }
    }
}

fn validate_items<'a, T: Reflect>(
    items: impl Iterator<Item = &'a T>,
    context: &mut ValidationContext<'_>,
) {
    for (index, item) in items.enumerate() {
        context.nested_index(index, item);
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Sequence(self.iter().map(|item| item as &dyn Reflect).collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        validate_items(self.iter(), context);
    }
}

impl<T: Reflect> Reflect for VecDeque<T> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Sequence(self.iter().map(|item| item as &dyn Reflect).collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        validate_items(self.iter(), context);
    }
}

impl<T: Reflect, const N: usize> Reflect for [T; N] {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Sequence(self.iter().map(|item| item as &dyn Reflect).collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn validate(&self, context: &mut ValidationContext<'_>) {
        validate_items(self.iter(), context);
    }
}

impl<T: Reflect> Reflect for BTreeSet<T> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Sequence(self.iter().map(|item| item as &dyn Reflect).collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn map_entries<'a, K, V>(entries: impl Iterator<Item = (&'a K, &'a V)>) -> Vec<MapEntry<'a>>
where
    K: Reflect,
    V: Reflect,
{
    let mut entries: Vec<MapEntry<'a>> = entries
        .map(|(key, value)| MapEntry {
            key: describe(key),
            value,
        })
        .collect();
    entries.sort_by(|left, right| left.key.cmp(&right.key));
    entries
}

impl<K: Reflect, V: Reflect, S: BuildHasher + 'static> Reflect for HashMap<K, V, S> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Map(map_entries(self.iter()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<K: Reflect, V: Reflect> Reflect for BTreeMap<K, V> {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Map(map_entries(self.iter()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! reflect_tuple {
    ($(($($name:ident : $index:tt),+)),* $(,)?) => {
        $(
            impl<$($name: Reflect),+> Reflect for ($($name,)+) {
                fn reflect(&self) -> Reflection<'_> {
                    Reflection::Anonymous(vec![
                        $(Property::new(stringify!($index), &self.$index)),+
                    ])
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

reflect_tuple!(
    (A: 0),
    (A: 0, B: 1),
    (A: 0, B: 1, C: 2),
    (A: 0, B: 1, C: 2, D: 3),
    (A: 0, B: 1, C: 2, D: 3, E: 4),
    (A: 0, B: 1, C: 2, D: 3, E: 4, F: 5),
);

impl Reflect for serde_json::Value {
    fn reflect(&self) -> Reflection<'_> {
        use serde_json::Value;
        match self {
            Value::Null => Reflection::Null,
            Value::Bool(value) => Reflection::Primitive(value.to_string()),
            Value::Number(value) => Reflection::Primitive(value.to_string()),
            Value::String(value) => Reflection::Text(value),
            Value::Array(items) => {
                Reflection::Sequence(items.iter().map(|item| item as &dyn Reflect).collect())
            }
            Value::Object(properties) => Reflection::Anonymous(
                properties
                    .iter()
                    .map(|(name, value)| Property::new(name.as_str(), value))
                    .collect(),
            ),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Render a duration the way .NET renders a `TimeSpan`: `[d.]hh:mm:ss[.fffffff]`.
#[must_use]
pub fn format_time_span(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    let ticks = duration.subsec_nanos() / 100;

    let mut out = String::new();
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if ticks > 0 {
        out.push_str(&format!(".{ticks:07}"));
    }
    out
}

impl Reflect for Duration {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Operator(Operator::temporal(self, format_time_span(*self)))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for SystemTime {
    fn reflect(&self) -> Reflection<'_> {
        let rendered = chrono::DateTime::<chrono::Utc>::from(*self).to_rfc3339();
        Reflection::Operator(Operator::temporal(self, rendered))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for chrono::TimeDelta {
    fn reflect(&self) -> Reflection<'_> {
        let rendered = match self.abs().to_std() {
            Ok(duration) if *self < Self::zero() => format!("-{}", format_time_span(duration)),
            Ok(duration) => format_time_span(duration),
            Err(_) => self.to_string(),
        };
        Reflection::Operator(Operator::temporal(self, rendered))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

macro_rules! reflect_temporal_display {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn reflect(&self) -> Reflection<'_> {
                    Reflection::Operator(Operator::temporal(self, self.to_string()))
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }
            }
        )*
    };
}

reflect_temporal_display!(
    chrono::DateTime<chrono::Utc>,
    chrono::DateTime<chrono::FixedOffset>,
    chrono::DateTime<chrono::Local>,
    chrono::NaiveDate,
    chrono::NaiveDateTime,
    chrono::NaiveTime,
);

impl Reflect for uuid::Uuid {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::operator(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for http::StatusCode {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Primitive(self.as_u16().to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Reflect for http::Method {
    fn reflect(&self) -> Reflection<'_> {
        Reflection::Enumeration(self.as_str().to_string())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_span_formatting() {
        assert_eq!(format_time_span(Duration::from_secs(300)), "00:05:00");
        assert_eq!(format_time_span(Duration::from_secs(60)), "00:01:00");
        assert_eq!(format_time_span(Duration::from_secs(90_061)), "1.01:01:01");
        assert_eq!(format_time_span(Duration::from_millis(1_500)), "00:00:01.5000000");
    }

    #[test]
    fn test_chrono_delta_negative() {
        let delta = chrono::TimeDelta::seconds(-60);
        match delta.reflect() {
            Reflection::Operator(operator) => assert_eq!(operator.describe(), "-00:01:00"),
            other => panic!("unexpected shape {other:?}"),
        };
    }

    #[test]
    fn test_option_shapes() {
        assert!(matches!(None::<i32>.reflect(), Reflection::Null));
        assert!(matches!(Some(1).reflect(), Reflection::Transparent(_)));
    }

    #[test]
    fn test_map_entries_sorted_by_key() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), 2);
        map.insert("a".to_string(), 1);
        match map.reflect() {
            Reflection::Map(entries) => {
                let keys: Vec<_> = entries.iter().map(|entry| entry.key.as_str()).collect();
                assert_eq!(keys, ["a", "b"]);
            }
            other => panic!("unexpected shape {other:?}"),
        };
    }

    #[test]
    fn test_json_object_is_anonymous() {
        let value = serde_json::json!({ "id": 1 });
        assert!(matches!(value.reflect(), Reflection::Anonymous(_)));
        assert!(matches!(serde_json::json!([1]).reflect(), Reflection::Sequence(_)));
    }

    #[test]
    fn test_refcell_mutably_borrowed_is_opaque() {
        let cell = RefCell::new(5);
        let _guard = cell.borrow_mut();
        assert!(matches!(cell.reflect(), Reflection::Opaque));
    }

    #[test]
    fn test_status_code_and_method() {
        assert_eq!(describe(&http::StatusCode::NOT_FOUND), "404");
        assert_eq!(describe(&http::Method::POST), "POST");
    }
}
