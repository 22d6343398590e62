//! `#[derive(Reflect)]`

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::meta::ParseNestedMeta;
use syn::spanned::Spanned;
use syn::{parse_quote, Attribute, Data, DataEnum, DeriveInput, Expr, Fields, Ident, Index, LitStr, Member, Path};

/// How values of the type are compared
enum Equality {
    Structural,
    Operator,
    Comparable,
    Custom(Path),
    Opaque,
}

struct FieldOptions {
    skip: bool,
    rename: Option<String>,
    rules: Vec<Rule>,
}

enum Rule {
    Required,
    Range { min: Option<Expr>, max: Option<Expr> },
    Length { min: Option<Expr>, max: Option<Expr> },
    Email,
    Regex(LitStr),
}

/// A reflected field: its property name and how to reach it
struct ReflectedField {
    name: String,
    member: Member,
    binding: Ident,
    rules: Vec<Rule>,
}

pub fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    let equality = parse_container(&input.attrs)?;
    let name = &input.ident;

    let mut generics = input.generics.clone();
    for parameter in generics.type_params_mut() {
        parameter.bounds.push(parse_quote!(::probar_mvc::reflection::Reflect));
    }
    let (impl_generics, type_generics, where_clause) = generics.split_for_impl();

    let (shape, validation) = match &input.data {
        Data::Struct(data) => {
            let fields = reflected_fields(&data.fields)?;
            (struct_shape(&fields, &data.fields), struct_validation(&fields))
        }
        Data::Enum(data) => (enum_shape(data)?, enum_validation(data)?),
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span(),
                "Reflect cannot be derived for unions",
            ))
        }
    };

    let shape = match equality {
        Equality::Structural => shape,
        Equality::Operator => quote!(::probar_mvc::reflection::Reflection::operator(self)),
        Equality::Comparable => quote!(::probar_mvc::reflection::Reflection::comparable(self)),
        Equality::Custom(path) => quote!(::probar_mvc::reflection::Reflection::custom_equality(self, #path)),
        Equality::Opaque => quote!(::probar_mvc::reflection::Reflection::Opaque),
    };
    let context = if validation.is_empty() {
        format_ident!("_context")
    } else {
        format_ident!("context")
    };

    Ok(quote! {
        impl #impl_generics ::probar_mvc::reflection::Reflect for #name #type_generics #where_clause {
            fn reflect(&self) -> ::probar_mvc::reflection::Reflection<'_> {
                #shape
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn validate(&self, #context: &mut ::probar_mvc::mvc::validation::ValidationContext<'_>) {
                #validation
            }
        }
    })
}

fn parse_container(attrs: &[Attribute]) -> syn::Result<Equality> {
    let mut equality = Equality::Structural;
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("reflect")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("eq") {
                equality = Equality::Operator;
            } else if meta.path.is_ident("ord") {
                equality = Equality::Comparable;
            } else if meta.path.is_ident("opaque") {
                equality = Equality::Opaque;
            } else if meta.path.is_ident("equals") {
                let path: LitStr = meta.value()?.parse()?;
                equality = Equality::Custom(path.parse()?);
            } else {
                return Err(meta.error("expected `eq`, `ord`, `opaque` or `equals = \"path\"`"));
            }
            Ok(())
        })?;
    }
    Ok(equality)
}

fn parse_field(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions {
        skip: false,
        rename: None,
        rules: Vec::new(),
    };
    for attr in attrs {
        if attr.path().is_ident("reflect") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                } else if meta.path.is_ident("rename") {
                    let name: LitStr = meta.value()?.parse()?;
                    options.rename = Some(name.value());
                } else {
                    return Err(meta.error("expected `skip` or `rename = \"Name\"`"));
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("validate") {
            attr.parse_nested_meta(|meta| {
                options.rules.push(parse_rule(&meta)?);
                Ok(())
            })?;
        }
    }
    Ok(options)
}

fn parse_rule(meta: &ParseNestedMeta<'_>) -> syn::Result<Rule> {
    if meta.path.is_ident("required") {
        Ok(Rule::Required)
    } else if meta.path.is_ident("email") {
        Ok(Rule::Email)
    } else if meta.path.is_ident("regex") {
        Ok(Rule::Regex(meta.value()?.parse()?))
    } else if meta.path.is_ident("range") || meta.path.is_ident("length") {
        let (mut min, mut max) = (None, None);
        meta.parse_nested_meta(|bound| {
            if bound.path.is_ident("min") {
                min = Some(bound.value()?.parse()?);
            } else if bound.path.is_ident("max") {
                max = Some(bound.value()?.parse()?);
            } else {
                return Err(bound.error("expected `min` or `max`"));
            }
            Ok(())
        })?;
        if meta.path.is_ident("range") {
            Ok(Rule::Range { min, max })
        } else {
            Ok(Rule::Length { min, max })
        }
    } else {
        Err(meta.error("expected `required`, `range(..)`, `length(..)`, `email` or `regex = \"..\"`"))
    }
}

fn reflected_fields(fields: &Fields) -> syn::Result<Vec<ReflectedField>> {
    let mut reflected = Vec::new();
    for (position, field) in fields.iter().enumerate() {
        let options = parse_field(&field.attrs)?;
        if options.skip {
            continue;
        }
        let (member, default_name) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (Member::Unnamed(Index::from(position)), position.to_string()),
        };
        reflected.push(ReflectedField {
            name: options.rename.unwrap_or(default_name),
            member,
            binding: format_ident!("__field{}", position),
            rules: options.rules,
        });
    }
    Ok(reflected)
}

fn properties(fields: &[ReflectedField], access: impl Fn(&ReflectedField) -> TokenStream) -> TokenStream {
    let properties = fields.iter().map(|field| {
        let name = &field.name;
        let value = access(field);
        quote!(::probar_mvc::reflection::Property::new(#name, #value))
    });
    quote!(::std::vec![#(#properties),*])
}

fn struct_shape(fields: &[ReflectedField], all: &Fields) -> TokenStream {
    if matches!(all, Fields::Unit) {
        return quote!(::probar_mvc::reflection::Reflection::record(::std::vec::Vec::new()));
    }
    let properties = properties(fields, |field| {
        let member = &field.member;
        quote!(&self.#member)
    });
    quote!(::probar_mvc::reflection::Reflection::record(#properties))
}

fn validation_calls(field: &ReflectedField, value: &TokenStream) -> TokenStream {
    let name = &field.name;
    let rules = field.rules.iter().map(|rule| match rule {
        Rule::Required => quote!(context.required(#name, #value);),
        Rule::Email => quote!(context.email(#name, #value);),
        Rule::Regex(pattern) => quote!(context.regex(#name, #value, #pattern);),
        Rule::Range { min, max } => {
            let min = min.as_ref().map_or(quote!(f64::MIN), |min| quote!((#min) as f64));
            let max = max.as_ref().map_or(quote!(f64::MAX), |max| quote!((#max) as f64));
            quote!(context.range(#name, #value, #min, #max);)
        }
        Rule::Length { min, max } => {
            let bound = |bound: &Option<Expr>| {
                bound.as_ref().map_or(
                    quote!(::std::option::Option::None),
                    |bound| quote!(::std::option::Option::Some((#bound) as usize)),
                )
            };
            let (min, max) = (bound(min), bound(max));
            quote!(context.length(#name, #value, #min, #max);)
        }
    });
    quote! {
        #(#rules)*
        context.nested(#name, #value);
    }
}

fn struct_validation(fields: &[ReflectedField]) -> TokenStream {
    fields
        .iter()
        .map(|field| {
            let member = &field.member;
            validation_calls(field, &quote!(&self.#member))
        })
        .collect()
}

/// Pattern binding the reflected fields of a variant to `__fieldN`
fn variant_pattern(variant: &Ident, fields: &Fields, reflected: &[ReflectedField]) -> TokenStream {
    match fields {
        Fields::Unit => quote!(Self::#variant),
        Fields::Named(_) => {
            let bindings = reflected.iter().map(|field| {
                let member = &field.member;
                let binding = &field.binding;
                quote!(#member: #binding)
            });
            quote!(Self::#variant { #(#bindings,)* .. })
        }
        Fields::Unnamed(unnamed) => {
            let bindings = (0..unnamed.unnamed.len()).map(|position| {
                reflected
                    .iter()
                    .find(|field| matches!(&field.member, Member::Unnamed(index) if index.index as usize == position))
                    .map_or(quote!(_), |field| {
                        let binding = &field.binding;
                        quote!(#binding)
                    })
            });
            quote!(Self::#variant(#(#bindings),*))
        }
    }
}

fn enum_shape(data: &DataEnum) -> syn::Result<TokenStream> {
    if data.variants.is_empty() {
        return Ok(quote!(match *self {}));
    }
    let mut arms = Vec::new();
    for variant in &data.variants {
        let ident = &variant.ident;
        let name = ident.to_string();
        if matches!(variant.fields, Fields::Unit) {
            arms.push(quote! {
                Self::#ident => ::probar_mvc::reflection::Reflection::Enumeration(::std::string::String::from(#name)),
            });
            continue;
        }
        let reflected = reflected_fields(&variant.fields)?;
        let pattern = variant_pattern(ident, &variant.fields, &reflected);
        let properties = properties(&reflected, |field| {
            let binding = &field.binding;
            quote!(#binding)
        });
        arms.push(quote! {
            #pattern => ::probar_mvc::reflection::Reflection::Variant {
                name: #name,
                fields: #properties,
            },
        });
    }
    Ok(quote! {
        match self {
            #(#arms)*
        }
    })
}

fn enum_validation(data: &DataEnum) -> syn::Result<TokenStream> {
    let mut arms = Vec::new();
    for variant in &data.variants {
        let reflected = reflected_fields(&variant.fields)?;
        if reflected.is_empty() {
            continue;
        }
        let pattern = variant_pattern(&variant.ident, &variant.fields, &reflected);
        let calls: TokenStream = reflected
            .iter()
            .map(|field| {
                let binding = &field.binding;
                validation_calls(field, &quote!(#binding))
            })
            .collect();
        arms.push(quote!(#pattern => { #calls }));
    }
    if arms.is_empty() {
        return Ok(TokenStream::new());
    }
    Ok(quote! {
        match self {
            #(#arms)*
            #[allow(unreachable_patterns)]
            _ => {}
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expanded(input: TokenStream) -> String {
        let input: DeriveInput = syn::parse2(input).unwrap();
        expand(&input).unwrap().to_string()
    }

    #[test]
    fn test_struct_properties_skip_and_rename() {
        let output = expanded(quote! {
            struct Customer {
                #[reflect(rename = "Name")]
                name: String,
                #[reflect(skip)]
                secret: String,
                age: u32,
            }
        });
        assert!(output.contains("Property :: new (\"Name\" , & self . name)"));
        assert!(output.contains("Property :: new (\"age\" , & self . age)"));
        assert!(!output.contains("secret"));
        assert!(output.contains("fn validate (& self , context :"));
        assert!(output.contains("context . nested (\"Name\" , & self . name)"));
    }

    #[test]
    fn test_fieldless_struct_ignores_validation_context() {
        let output = expanded(quote! {
            struct Marker;
        });
        assert!(output.contains("fn validate (& self , _context :"));
        assert!(!output.contains("nested"));
    }

    #[test]
    fn test_validation_rules() {
        let output = expanded(quote! {
            struct Customer {
                #[validate(required, length(max = 5))]
                name: String,
                #[validate(range(min = 18, max = 99))]
                age: u32,
                #[validate(email, regex = "[a-z]+@[a-z]+")]
                email: String,
            }
        });
        assert!(output.contains("context . required (\"name\" , & self . name)"));
        assert!(output.contains("context . length (\"name\" , & self . name , :: std :: option :: Option :: None"));
        assert!(output.contains("context . range (\"age\" , & self . age , (18) as f64 , (99) as f64)"));
        assert!(output.contains("context . regex (\"email\" , & self . email , \"[a-z]+@[a-z]+\")"));
        assert!(output.contains("context . nested (\"age\" , & self . age)"));
    }

    #[test]
    fn test_unit_enum_is_enumeration() {
        let output = expanded(quote! {
            enum Priority { Low, High }
        });
        assert!(output.contains("Enumeration"));
        assert!(!output.contains("Variant {"));
    }

    #[test]
    fn test_data_enum_is_variant() {
        let output = expanded(quote! {
            enum Shape { Empty, Circle(f64), Rect { width: f64, #[reflect(skip)] cached: f64 } }
        });
        assert!(output.contains("Self :: Empty => :: probar_mvc :: reflection :: Reflection :: Enumeration"));
        assert!(output.contains("Self :: Circle (__field0)"));
        assert!(output.contains("Self :: Rect { width : __field0 , .. }"));
        assert!(output.contains("Property :: new (\"0\" , __field0)"));
    }

    #[test]
    fn test_container_equality() {
        let output = expanded(quote! {
            #[reflect(eq)]
            struct Money { cents: i64 }
        });
        assert!(output.contains("Reflection :: operator (self)"));

        let output = expanded(quote! {
            #[reflect(equals = "same_id")]
            struct Entity { id: u32 }
        });
        assert!(output.contains("Reflection :: custom_equality (self , same_id)"));
    }

    #[test]
    fn test_generic_parameters_are_bounded() {
        let output = expanded(quote! {
            struct Page<T> { items: Vec<T> }
        });
        assert!(output.contains("impl < T : :: probar_mvc :: reflection :: Reflect >"));
    }

    #[test]
    fn test_unknown_attribute_is_an_error() {
        let input: DeriveInput = syn::parse2(quote! {
            struct Item { #[validate(phone)] number: String }
        })
        .unwrap();
        assert!(expand(&input).is_err());
    }
}
