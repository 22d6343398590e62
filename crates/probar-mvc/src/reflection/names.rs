//! Friendly type names.
//!
//! `std::any::type_name` yields fully qualified paths such as
//! `alloc::vec::Vec<my_app::models::Person>`. Failure messages use the short
//! form `Vec<Person>`.

use super::{cache, Reflect};
use std::any::{Any, TypeId};

const CLOSURE_MARKER: &str = "{{closure}}";

/// Strip module paths from a compiler type name.
///
/// Generic arguments, tuples, references, arrays and trait objects are
/// handled recursively since every path segment is cut at its last `::`.
#[must_use]
pub fn prettify_type_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut segment_start = 0;
    let mut chars = raw.char_indices().peekable();

    while let Some((_, ch)) = chars.next() {
        match ch {
            ':' if chars.peek().is_some_and(|(_, next)| *next == ':') => {
                chars.next();
                out.truncate(segment_start);
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' | ';' | '*' => {
                out.push(ch);
                segment_start = out.len();
            }
            _ => out.push(ch),
        }
    }

    out.replace(CLOSURE_MARKER, "closure")
}

/// Friendly name of `T`, cached per type.
#[must_use]
pub fn friendly_type_name<T: ?Sized + 'static>() -> String {
    cache::friendly_name(TypeId::of::<T>(), std::any::type_name::<T>())
}

/// Friendly name of the runtime type behind a reflected value.
#[must_use]
pub fn friendly_name_of(value: &dyn Reflect) -> String {
    cache::friendly_name(Any::type_id(value.as_any()), value.type_name())
}

/// Controller name as used by routing: the friendly name without the
/// `Controller` suffix.
#[must_use]
pub fn controller_route_name(friendly: &str) -> &str {
    friendly
        .strip_suffix("Controller")
        .filter(|name| !name.is_empty())
        .unwrap_or(friendly)
}
