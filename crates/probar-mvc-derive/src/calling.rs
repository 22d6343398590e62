//! `calling!` and `calling_void!`: capture an action call as an expression
//! tree, then invoke it.
//!
//! Each argument is evaluated once into a temporary. The tree borrows the
//! temporaries while the call is prepared; the invocation closure then takes
//! them by move.

use crate::tidy;
use proc_macro2::{Span, TokenStream, TokenTree};
use quote::{format_ident, quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::visit::Visit;
use syn::{Expr, ExprCall, ExprClosure, ExprMethodCall, Ident, Lit, Pat, Token, UnOp};

pub struct CallingInput {
    builder: Expr,
    closure: ExprClosure,
}

impl Parse for CallingInput {
    fn parse(input: ParseStream<'_>) -> syn::Result<Self> {
        let builder = input.parse()?;
        input.parse::<Token![,]>()?;
        let closure = input.parse()?;
        input.parse::<Option<Token![,]>>()?;
        Ok(Self { builder, closure })
    }
}

/// Shape of the invoked action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Returns {
    Value,
    Void,
}

/// How one argument reaches the tree and the invocation
struct Argument {
    /// Temporary holding the evaluated argument; `None` when the argument
    /// mentions the controller and is kept inline
    temporary: Option<Ident>,
    expr: Expr,
    node: TokenStream,
}

pub fn expand(input: CallingInput, returns: Returns) -> syn::Result<TokenStream> {
    let CallingInput { builder, closure } = input;
    if closure.inputs.len() != 1 {
        return Err(syn::Error::new_spanned(
            &closure.inputs,
            "the call lambda takes exactly one parameter, the controller",
        ));
    }
    let parameter_pattern = &closure.inputs[0];
    let parameter = parameter_ident(parameter_pattern)?;
    let parameter_name = parameter.to_string();

    let body = unwrap_body(&closure.body);
    let (call, awaited) = match body {
        Expr::Await(awaited) => (unwrap_body(&awaited.base), true),
        other => (other, false),
    };

    let Some(method_call) = instance_call(call, &parameter) else {
        return Ok(rejected(&builder, &parameter_name, call, returns));
    };

    let arguments: Vec<Argument> = method_call
        .args
        .iter()
        .enumerate()
        .map(|(position, expr)| argument(position, expr, &parameter))
        .collect();

    let method = &method_call.method;
    let method_name = method.to_string();
    let turbofish = &method_call.turbofish;
    let temporaries = arguments.iter().filter_map(|argument| {
        argument.temporary.as_ref().map(|temporary| {
            let expr = &argument.expr;
            quote!(let #temporary = #expr;)
        })
    });
    let nodes = arguments.iter().map(|argument| &argument.node);
    let call_arguments = arguments.iter().map(|argument| {
        argument
            .temporary
            .as_ref()
            .map_or_else(|| argument.expr.to_token_stream(), ToTokens::to_token_stream)
    });
    let invocation = quote!(#parameter.#method #turbofish(#(#call_arguments),*));

    let invoke = match (returns, awaited) {
        (Returns::Value, false) => quote!(__probar_mvc_ready.invoke(move |#parameter_pattern| #invocation)),
        (Returns::Value, true) => {
            quote!(__probar_mvc_ready.invoke_async(move |#parameter_pattern| ::std::boxed::Box::pin(#invocation)))
        }
        (Returns::Void, false) => quote!(__probar_mvc_ready.invoke_void(move |#parameter_pattern| {
            #invocation;
        })),
        (Returns::Void, true) => {
            quote!(__probar_mvc_ready.invoke_void_async(move |#parameter_pattern| ::std::boxed::Box::pin(#invocation)))
        }
    };

    Ok(quote! {{
        let __probar_mvc_builder = #builder;
        let __probar_mvc_scope = __probar_mvc_builder.request_scope();
        #(#temporaries)*
        let __probar_mvc_prepared = {
            #[allow(unused_imports)]
            use ::probar_mvc::expression::{OpaqueArgument as _, ReflectArgument as _};
            let __probar_mvc_call = ::probar_mvc::expression::LambdaExpression::new(
                #parameter_name,
                ::probar_mvc::expression::Expression::call(
                    ::probar_mvc::expression::Expression::parameter(#parameter_name),
                    ::probar_mvc::expression::MethodIdentity::instance(#method_name),
                    ::std::vec![#(#nodes),*],
                ),
            );
            __probar_mvc_builder.prepare_call(&__probar_mvc_call)
        };
        let __probar_mvc_result = match __probar_mvc_prepared {
            ::std::result::Result::Ok(__probar_mvc_ready) => #invoke,
            ::std::result::Result::Err(error) => ::std::result::Result::Err(error),
        };
        ::std::mem::drop(__probar_mvc_scope);
        __probar_mvc_result
    }})
}

fn parameter_ident(pat: &Pat) -> syn::Result<Ident> {
    match pat {
        Pat::Ident(ident) => Ok(ident.ident.clone()),
        Pat::Type(typed) => parameter_ident(&typed.pat),
        other => Err(syn::Error::new_spanned(other, "expected a named controller parameter")),
    }
}

/// Strip parentheses and single-expression blocks
fn unwrap_body(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(inner) => unwrap_body(&inner.expr),
        Expr::Group(inner) => unwrap_body(&inner.expr),
        Expr::Block(block) if block.block.stmts.len() == 1 => match &block.block.stmts[0] {
            syn::Stmt::Expr(inner, None) => unwrap_body(inner),
            _ => expr,
        },
        _ => expr,
    }
}

/// `parameter.method(..)`, the only call shape that can be invoked
fn instance_call<'a>(expr: &'a Expr, parameter: &Ident) -> Option<&'a ExprMethodCall> {
    let Expr::MethodCall(call) = expr else {
        return None;
    };
    match unwrap_body(&call.receiver) {
        Expr::Path(path) if path.qself.is_none() && path.path.is_ident(parameter) => Some(call),
        _ => None,
    }
}

/// Expansion for bodies that cannot be invoked; preparing them reports the
/// call expression error.
fn rejected(builder: &Expr, parameter: &str, body: &Expr, returns: Returns) -> TokenStream {
    let node = match body {
        Expr::Call(ExprCall { func, .. }) => match &**func {
            Expr::Path(path) if path.path.segments.len() >= 2 => {
                let segments: Vec<String> = path.path.segments.iter().map(|segment| segment.ident.to_string()).collect();
                let declaring = &segments[segments.len() - 2];
                let name = &segments[segments.len() - 1];
                quote! {
                    ::probar_mvc::expression::Expression::static_call(
                        ::probar_mvc::expression::MethodIdentity::associated(#declaring, #name),
                        ::std::vec::Vec::new(),
                        ::std::option::Option::None,
                    )
                }
            }
            _ => unsupported(body),
        },
        _ => unsupported(body),
    };
    let reject = match returns {
        Returns::Value => quote!(reject_call),
        Returns::Void => quote!(reject_void_call),
    };
    quote! {{
        let __probar_mvc_builder = #builder;
        let __probar_mvc_call = ::probar_mvc::expression::LambdaExpression::new(#parameter, #node);
        __probar_mvc_builder.#reject(&__probar_mvc_call)
    }}
}

fn unsupported(body: &Expr) -> TokenStream {
    let source = tidy(&body.to_token_stream());
    quote!(::probar_mvc::expression::Expression::unsupported(#source))
}

fn argument(position: usize, expr: &Expr, parameter: &Ident) -> Argument {
    let source = tidy(&expr.to_token_stream());
    if mentions(expr, parameter) {
        return Argument {
            temporary: None,
            expr: expr.clone(),
            node: quote!(::probar_mvc::expression::Expression::unresolvable(#source)),
        };
    }
    let temporary = format_ident!("__probar_mvc_arg{}", position, span = Span::call_site());
    let (value_expr, probe_target) = match unwrap_body(expr) {
        Expr::Reference(reference) if reference.mutability.is_some() => (&*reference.expr, quote!(&*#temporary)),
        Expr::Reference(reference) => (&*reference.expr, quote!(#temporary)),
        _ => (expr, quote!(&#temporary)),
    };
    let probe = quote!(::probar_mvc::expression::ArgumentProbe(#probe_target).reflect_argument());
    Argument {
        temporary: Some(temporary),
        expr: expr.clone(),
        node: node(value_expr, &probe),
    }
}

/// Tree node of an argument whose value is read through `probe`
fn node(expr: &Expr, probe: &TokenStream) -> TokenStream {
    let source = tidy(&expr.to_token_stream());
    let from_probe = |build: TokenStream| {
        quote!(::probar_mvc::expression::Expression::from_probe(#probe, #source, |value| #build))
    };
    match expr {
        Expr::Paren(inner) => node(&inner.expr, probe),
        Expr::Group(inner) => node(&inner.expr, probe),
        Expr::Lit(_) => from_probe(quote!(::probar_mvc::expression::Expression::constant(value))),
        Expr::Unary(unary) if matches!(unary.op, UnOp::Neg(_)) && matches!(&*unary.expr, Expr::Lit(lit) if !matches!(lit.lit, Lit::Str(_))) => {
            from_probe(quote!(::probar_mvc::expression::Expression::constant(value)))
        }
        Expr::Path(path) if path.qself.is_none() && path.path.get_ident().is_some() => {
            from_probe(quote!(::probar_mvc::expression::Expression::captured(#source, value)))
        }
        Expr::Cast(cast) => {
            let operand = node(&cast.expr, probe);
            let target = tidy(&cast.ty.to_token_stream());
            quote!(::probar_mvc::expression::Expression::convert(#operand, #target))
        }
        Expr::MethodCall(call) if call.method == "into" && call.args.is_empty() => {
            let operand = node(&call.receiver, probe);
            quote!(::probar_mvc::expression::Expression::convert(#operand, "_"))
        }
        Expr::Call(call) => match placeholder(&call.func) {
            Some((declaring, name)) => quote! {
                ::probar_mvc::expression::Expression::static_call(
                    ::probar_mvc::expression::MethodIdentity::associated(#declaring, #name),
                    ::std::vec::Vec::new(),
                    #probe,
                )
            },
            None => from_probe(quote!(::probar_mvc::expression::Expression::compiled(#source, value))),
        },
        _ => from_probe(quote!(::probar_mvc::expression::Expression::compiled(#source, value))),
    }
}

/// `With::..` and `FromServices::..` calls, by declaring type and name
fn placeholder(func: &Expr) -> Option<(String, String)> {
    let Expr::Path(path) = func else {
        return None;
    };
    let segments: Vec<&syn::PathSegment> = path.path.segments.iter().collect();
    let [.., declaring, name] = segments.as_slice() else {
        return None;
    };
    let declaring = declaring.ident.to_string();
    if declaring == "With" || declaring == "FromServices" {
        Some((declaring, name.ident.to_string()))
    } else {
        None
    }
}

struct Mentions<'a> {
    parameter: &'a Ident,
    found: bool,
}

impl<'ast> Visit<'ast> for Mentions<'_> {
    fn visit_expr_path(&mut self, path: &'ast syn::ExprPath) {
        if path.qself.is_none() && path.path.is_ident(self.parameter) {
            self.found = true;
        }
        syn::visit::visit_expr_path(self, path);
    }

    fn visit_macro(&mut self, mac: &'ast syn::Macro) {
        if tokens_mention(mac.tokens.clone(), self.parameter) {
            self.found = true;
        }
    }
}

fn tokens_mention(tokens: TokenStream, parameter: &Ident) -> bool {
    tokens.into_iter().any(|token| match token {
        TokenTree::Ident(ident) => ident == *parameter,
        TokenTree::Group(group) => tokens_mention(group.stream(), parameter),
        _ => false,
    })
}

/// Whether the argument reads the controller parameter
fn mentions(expr: &Expr, parameter: &Ident) -> bool {
    let mut visitor = Mentions { parameter, found: false };
    visitor.visit_expr(expr);
    visitor.found
}
