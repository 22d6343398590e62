//! `#[controller]` on an inherent impl block.

use crate::tidy;
use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::meta::ParseNestedMeta;
use syn::parse::Parser;
use syn::{
    Attribute, FnArg, GenericArgument, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Pat, PathArguments,
    ReturnType, Type, Visibility,
};

struct ControllerOptions {
    context: Ident,
    attributes: Vec<TokenStream>,
}

#[derive(Default)]
struct MethodOptions {
    constructor: bool,
    attributes: Vec<TokenStream>,
}

pub fn expand(args: TokenStream, mut item: ItemImpl) -> syn::Result<TokenStream> {
    if let Some((_, path, _)) = &item.trait_ {
        return Err(syn::Error::new_spanned(
            path,
            "#[controller] goes on the inherent impl block of the controller",
        ));
    }

    let mut options = ControllerOptions {
        context: Ident::new("context", proc_macro2::Span::call_site()),
        attributes: Vec::new(),
    };
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("context") {
            options.context = meta.value()?.parse()?;
            Ok(())
        } else {
            options.attributes.push(parse_attribute(&meta)?);
            Ok(())
        }
    });
    parser.parse2(args)?;

    let mut explicit_constructors = Vec::new();
    let mut new_function = None;
    let mut actions = Vec::new();
    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let method_options = take_method_options(&mut method.attrs)?;
        let has_receiver = method.sig.receiver().is_some();
        if method_options.constructor {
            if has_receiver {
                return Err(syn::Error::new_spanned(
                    &method.sig,
                    "a constructor cannot take `self`",
                ));
            }
            explicit_constructors.push(constructor(method)?);
        } else if !has_receiver && method.sig.ident == "new" && returns_self(&method.sig.output) {
            new_function = Some(constructor(method)?);
        } else if has_receiver && matches!(method.vis, Visibility::Public(_)) {
            actions.push(action(method, &method_options.attributes));
        }
    }

    let constructors = if !explicit_constructors.is_empty() {
        explicit_constructors
    } else if let Some(new_function) = new_function {
        vec![new_function]
    } else {
        vec![quote! {
            ::probar_mvc::reflection::Constructor::new(::std::vec::Vec::new(), |_| {
                ::std::option::Option::Some(<Self as ::std::default::Default>::default())
            })
        }]
    };

    let self_type = &item.self_ty;
    let (impl_generics, _, where_clause) = item.generics.split_for_impl();
    let context = &options.context;
    let controller_attributes = &options.attributes;

    Ok(quote! {
        #item

        impl #impl_generics ::probar_mvc::mvc::Controller for #self_type #where_clause {
            fn controller_context(&self) -> &::probar_mvc::mvc::ControllerContext {
                &self.#context
            }

            fn controller_context_mut(&mut self) -> &mut ::probar_mvc::mvc::ControllerContext {
                &mut self.#context
            }

            fn constructors() -> ::std::vec::Vec<::probar_mvc::reflection::Constructor<Self>> {
                ::std::vec![#(#constructors),*]
            }

            fn attributes() -> ::std::vec::Vec<::probar_mvc::mvc::ActionAttribute> {
                ::std::vec![#(#controller_attributes),*]
            }

            fn actions() -> ::std::vec::Vec<::probar_mvc::mvc::ActionDescriptor> {
                ::std::vec![#(#actions),*]
            }
        }
    })
}

/// Remove the `#[mvc(..)]` attributes of a method and parse them
fn take_method_options(attrs: &mut Vec<Attribute>) -> syn::Result<MethodOptions> {
    let mut options = MethodOptions::default();
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("mvc") {
            kept.push(attr);
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("constructor") {
                options.constructor = true;
            } else {
                options.attributes.push(parse_attribute(&meta)?);
            }
            Ok(())
        })?;
    }
    *attrs = kept;
    Ok(options)
}

fn string_value(meta: &ParseNestedMeta<'_>) -> syn::Result<String> {
    let value: LitStr = meta.value()?.parse()?;
    Ok(value.value())
}

/// One attribute of the `#[mvc(..)]` / `#[controller(..)]` vocabulary
fn parse_attribute(meta: &ParseNestedMeta<'_>) -> syn::Result<TokenStream> {
    let attribute = quote!(::probar_mvc::mvc::ActionAttribute);
    let Some(ident) = meta.path.get_ident() else {
        return Err(meta.error("expected an attribute name"));
    };
    let name = ident.to_string();
    if let Some(method) = name.strip_prefix("http_") {
        let method = Ident::new(&method.to_ascii_uppercase(), ident.span());
        return match method.to_string().as_str() {
            "GET" | "POST" | "PUT" | "DELETE" | "PATCH" | "HEAD" | "OPTIONS" => {
                Ok(quote!(#attribute::HttpMethod(::probar_mvc::http::Method::#method)))
            }
            _ => Err(meta.error("unknown HTTP method")),
        };
    }
    match name.as_str() {
        "route" => {
            if meta.input.peek(syn::Token![=]) {
                let template = string_value(meta)?;
                return Ok(quote!(#attribute::route(#template)));
            }
            let mut template = None;
            let mut route_name = None;
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("template") {
                    template = Some(string_value(&inner)?);
                } else if inner.path.is_ident("name") {
                    route_name = Some(string_value(&inner)?);
                } else {
                    return Err(inner.error("expected `template` or `name`"));
                }
                Ok(())
            })?;
            let template = template.unwrap_or_default();
            let route_name = optional_string(route_name);
            Ok(quote! {
                #attribute::Route {
                    template: ::std::string::String::from(#template),
                    name: #route_name,
                }
            })
        }
        "authorize" => {
            if !meta.input.peek(syn::token::Paren) {
                return Ok(quote!(#attribute::authorize()));
            }
            let mut roles = None;
            let mut policy = None;
            meta.parse_nested_meta(|inner| {
                if inner.path.is_ident("roles") {
                    roles = Some(string_value(&inner)?);
                } else if inner.path.is_ident("policy") {
                    policy = Some(string_value(&inner)?);
                } else {
                    return Err(inner.error("expected `roles` or `policy`"));
                }
                Ok(())
            })?;
            let roles = optional_string(roles);
            let policy = optional_string(policy);
            Ok(quote!(#attribute::Authorize { roles: #roles, policy: #policy }))
        }
        "action_name" => {
            let value = string_value(meta)?;
            Ok(quote!(#attribute::ActionName(::std::string::String::from(#value))))
        }
        "area" => {
            let value = string_value(meta)?;
            Ok(quote!(#attribute::Area(::std::string::String::from(#value))))
        }
        "custom" => {
            let value = string_value(meta)?;
            Ok(quote!(#attribute::Custom(::std::string::String::from(#value))))
        }
        "allow_anonymous" => Ok(quote!(#attribute::AllowAnonymous)),
        "non_action" => Ok(quote!(#attribute::NonAction)),
        "validate_anti_forgery_token" => Ok(quote!(#attribute::ValidateAntiForgeryToken)),
        _ => Err(meta.error("unknown controller attribute")),
    }
}

fn optional_string(value: Option<String>) -> TokenStream {
    value.map_or(quote!(::std::option::Option::None), |value| {
        quote!(::std::option::Option::Some(::std::string::String::from(#value)))
    })
}

fn returns_self(output: &ReturnType) -> bool {
    match output {
        ReturnType::Default => false,
        ReturnType::Type(_, ty) => match &**ty {
            Type::Path(path) => path.qself.is_none() && path.path.segments.len() == 1,
            _ => false,
        },
    }
}

/// Inner type of `Option<T>`
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return None;
    };
    match arguments.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn constructor(method: &ImplItemFn) -> syn::Result<TokenStream> {
    let name = &method.sig.ident;
    let mut parameters = Vec::new();
    let mut arguments = Vec::new();
    for input in &method.sig.inputs {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let ty = &*typed.ty;
        if let Some(inner) = option_inner(ty) {
            parameters.push(quote!(::probar_mvc::reflection::ParameterInfo::optional::<#inner>()));
            arguments.push(quote!(resolver.resolve_optional::<#inner>()));
        } else {
            parameters.push(quote!(::probar_mvc::reflection::ParameterInfo::of::<#ty>()));
            arguments.push(quote!(resolver.resolve::<#ty>()?));
        }
    }
    let resolver = if arguments.is_empty() {
        quote!(_)
    } else {
        quote!(resolver)
    };
    Ok(quote! {
        ::probar_mvc::reflection::Constructor::new(::std::vec![#(#parameters),*], |#resolver| {
            ::std::option::Option::Some(Self::#name(#(#arguments),*))
        })
    })
}

fn parameter_name(pat: &Pat) -> String {
    match pat {
        Pat::Ident(ident) => ident.ident.to_string(),
        Pat::Type(typed) => parameter_name(&typed.pat),
        Pat::Reference(reference) => parameter_name(&reference.pat),
        _ => "_".to_string(),
    }
}

fn action(method: &ImplItemFn, attributes: &[TokenStream]) -> TokenStream {
    let method_name = method.sig.ident.to_string();
    let parameters = method.sig.inputs.iter().filter_map(|input| match input {
        FnArg::Typed(typed) => {
            let name = parameter_name(&typed.pat);
            let type_name = tidy(&typed.ty.to_token_stream());
            Some(quote!(.with_parameter(#name, #type_name)))
        }
        FnArg::Receiver(_) => None,
    });
    let asynchronous = method.sig.asyncness.map(|_| quote!(.asynchronous()));
    quote! {
        ::probar_mvc::mvc::ActionDescriptor::new(#method_name)
            #(#parameters)*
            #(.with_attribute(#attributes))*
            #asynchronous
    }
}
