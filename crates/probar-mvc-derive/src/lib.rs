//! Probar MVC Derive Macros: reflection, controller metadata and call capture
//!
//! Rust has no runtime reflection, so the shape information the test
//! framework needs is generated at compile time:
//!
//! - [`Reflect`] - property view used by deep equality and validation
//! - [`controller`] - `Controller` impl from an inherent impl block
//! - [`calling!`] / [`calling_void!`] - capture an action call as an
//!   expression tree, then invoke it
//!
//! # Example
//!
//! ```ignore
//! use probar_mvc::prelude::*;
//!
//! #[derive(Debug, Clone, PartialEq, Reflect)]
//! struct Article {
//!     id: u32,
//!     #[validate(required, length(max = 100))]
//!     title: String,
//! }
//!
//! #[derive(Debug, Default)]
//! struct ArticlesController {
//!     context: ControllerContext,
//! }
//!
//! #[controller(route = "api/[controller]")]
//! impl ArticlesController {
//!     #[mvc(http_post)]
//!     pub fn create(&mut self, article: Article) -> ActionResult {
//!         if !self.model_state().is_valid() {
//!             return self.bad_request_with_model_state();
//!         }
//!         self.ok_with(article)
//!     }
//! }
//!
//! let article = Article { id: 1, title: "Rust".to_string() };
//! calling!(for_controller::<ArticlesController>(), |c| c.create(article))?
//!     .should_return()?
//!     .ok()?;
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput, ItemImpl};

mod calling;
mod controller;
mod reflect;

/// Derive `probar_mvc::reflection::Reflect`.
///
/// Structs reflect as records of their fields, enums with only unit variants
/// as enumerations, other enums as variants carrying their fields.
///
/// # Attributes
///
/// - `#[reflect(eq)]` - compare with `PartialEq`
/// - `#[reflect(ord)]` - compare with `PartialOrd`
/// - `#[reflect(equals = "path::to_fn")]` - compare with `fn(&T, &T) -> bool`
/// - `#[reflect(opaque)]` - no inspectable shape
/// - `#[reflect(skip)]` / `#[reflect(rename = "Name")]` on fields
/// - `#[validate(required, range(min = 1, max = 9), length(min = 1, max = 9), email, regex = "..")]`
///   on fields
///
/// # Example
///
/// ```ignore
/// #[derive(Reflect)]
/// struct Customer {
///     #[validate(required)]
///     #[reflect(rename = "Name")]
///     name: String,
///     #[validate(range(min = 18, max = 99))]
///     age: u32,
///     #[reflect(skip)]
///     cache: Vec<u8>,
/// }
/// ```
#[proc_macro_derive(Reflect, attributes(reflect, validate))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    reflect::expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implement `probar_mvc::mvc::Controller` from an inherent impl block.
///
/// Public methods taking `self` become actions. The constructor is the
/// method marked `#[mvc(constructor)]`, else `new`, else `Default`. Its
/// parameters are resolved as dependencies; `Option<T>` parameters may be
/// absent.
///
/// # Attributes
///
/// - `#[controller(context = field)]` - field holding the `ControllerContext`
///   (defaults to `context`)
/// - `#[controller(..)]` / `#[mvc(..)]` - `http_get`, `http_post`, `http_put`,
///   `http_delete`, `http_patch`, `http_head`, `http_options`,
///   `route = ".."`, `route(template = "..", name = "..")`,
///   `action_name = ".."`, `authorize`, `authorize(roles = "..", policy = "..")`,
///   `allow_anonymous`, `non_action`, `validate_anti_forgery_token`,
///   `area = ".."`, `custom = ".."`
#[proc_macro_attribute]
pub fn controller(args: TokenStream, input: TokenStream) -> TokenStream {
    let item = parse_macro_input!(input as ItemImpl);
    controller::expand(args.into(), item)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Capture and invoke an action call.
///
/// ```ignore
/// calling!(builder, |c| c.details(id))
/// calling!(builder, |c| c.details_async(id).await)
/// ```
///
/// Evaluates to `MvcTestResult<ActionTestBuilder<C, R>>`.
#[proc_macro]
pub fn calling(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as calling::CallingInput);
    calling::expand(input, calling::Returns::Value)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// [`calling!`] for actions without a return value.
///
/// Evaluates to `MvcTestResult<VoidActionTestBuilder<C>>`.
#[proc_macro]
pub fn calling_void(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as calling::CallingInput);
    calling::expand(input, calling::Returns::Void)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Source text of tokens without the spacing `to_string` inserts
pub(crate) fn tidy(tokens: &proc_macro2::TokenStream) -> String {
    let spaced = tokens.to_string();
    let chars: Vec<char> = spaced.chars().collect();
    let word = |c: char| c.is_alphanumeric() || c == '_' || c == '\'' || c == '"';
    let mut tidied = String::with_capacity(spaced.len());
    for (index, &c) in chars.iter().enumerate() {
        if c == ' ' {
            let before = index.checked_sub(1).map(|i| chars[i]);
            let after = chars.get(index + 1).copied();
            match (before, after) {
                (Some(before), Some(after)) if word(before) && word(after) => tidied.push(' '),
                (Some(','), Some(_)) => tidied.push(' '),
                _ => {}
            }
            continue;
        }
        tidied.push(c);
    }
    tidied
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    #[test]
    fn test_tidy_type_names() {
        assert_eq!(tidy(&quote!(Option<String>)), "Option<String>");
        assert_eq!(tidy(&quote!(&'static str)), "&'static str");
        assert_eq!(tidy(&quote!(HashMap<String, Vec<u32>>)), "HashMap<String, Vec<u32>>");
        assert_eq!(tidy(&quote!(&mut dyn Fn(u32) -> bool)), "&mut dyn Fn(u32)->bool");
    }

    #[test]
    fn test_tidy_expressions() {
        assert_eq!(tidy(&quote!(c.current_id())), "c.current_id()");
        assert_eq!(tidy(&quote!(lookup(id, 2))), "lookup(id, 2)");
        assert_eq!(tidy(&quote!(page as i64)), "page as i64");
    }
}
