//! Procedural macros for reader-dispatch

use darling::{FromDeriveInput, FromMeta, FromVariant};
use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput};

/// Container-level attributes for #[derive(Action)]
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(action), supports(enum_any))]
struct ActionOpts {
    ident: syn::Ident,
    generics: syn::Generics,
    data: darling::ast::Data<ActionVariant, ()>,

    /// Payload type carried by single-field tuple variants
    #[darling(default)]
    payload: Option<syn::Type>,

    /// Naming convention for action type keys
    #[darling(default)]
    rename_all: Option<RenameRule>,
}

/// Variant-level attributes
#[derive(Debug, FromVariant)]
#[darling(attributes(action))]
struct ActionVariant {
    ident: syn::Ident,
    fields: darling::ast::Fields<syn::Field>,

    /// Explicit action type key
    #[darling(default)]
    rename: Option<String>,

    /// Never report a payload for this variant
    #[darling(default)]
    skip_payload: bool,
}

#[derive(Debug, Clone, Copy)]
enum RenameRule {
    ScreamingSnakeCase,
    SnakeCase,
}

impl FromMeta for RenameRule {
    fn from_string(value: &str) -> darling::Result<Self> {
        match value {
            "SCREAMING_SNAKE_CASE" => Ok(RenameRule::ScreamingSnakeCase),
            "snake_case" => Ok(RenameRule::SnakeCase),
            other => Err(darling::Error::unknown_value(other)),
        }
    }
}

impl RenameRule {
    fn apply(self, variant: &str) -> String {
        match self {
            RenameRule::ScreamingSnakeCase => to_snake_case(variant).to_uppercase(),
            RenameRule::SnakeCase => to_snake_case(variant),
        }
    }
}

/// Convert PascalCase to snake_case
fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}

/// Derive macro for the Action trait
///
/// Generates `name()` from the variant name and `payload()` from the single
/// field of tuple variants. The field is cloned and converted with `Into`, so
/// variants with different field types can share one payload type (usually
/// an enum with a `From` impl per field type).
///
/// # Attributes
///
/// Container:
/// - `payload = "Type"`: the payload type. Without it the payload type is `()`
///   and no variant carries a payload.
/// - `rename_all = "SCREAMING_SNAKE_CASE" | "snake_case"`: naming convention for
///   action type keys. Defaults to the variant name as written.
///
/// Variant:
/// - `rename = "KEY"`: explicit action type key
/// - `skip_payload`: report no payload even for a single-field tuple variant
///
/// # Example
///
/// ```ignore
/// #[derive(Action, Clone, Debug)]
/// #[action(payload = "i64", rename_all = "SCREAMING_SNAKE_CASE")]
/// enum CountAction {
///     SetCount(i64),
///     Add(i64),
///     #[action(rename = "RESET_ALL")]
///     Reset,
/// }
///
/// let action = CountAction::Add(5);
/// assert_eq!(action.name(), "ADD");
/// assert_eq!(action.payload(), Some(5));
/// assert_eq!(CountAction::Reset.name(), "RESET_ALL");
/// ```
#[proc_macro_derive(Action, attributes(action))]
pub fn derive_action(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let opts = match ActionOpts::from_derive_input(&input) {
        Ok(opts) => opts,
        Err(e) => return e.write_errors().into(),
    };

    let name = &opts.ident;
    let (impl_generics, ty_generics, where_clause) = opts.generics.split_for_impl();

    let variants = match &opts.data {
        darling::ast::Data::Enum(variants) => variants,
        _ => {
            return syn::Error::new_spanned(&input, "Action can only be derived for enums")
                .to_compile_error()
                .into();
        }
    };

    let name_arms = variants.iter().map(|v| {
        let variant_name = &v.ident;
        let key = match (&v.rename, opts.rename_all) {
            (Some(explicit), _) => explicit.clone(),
            (None, Some(rule)) => rule.apply(&variant_name.to_string()),
            (None, None) => variant_name.to_string(),
        };

        quote! {
            #name::#variant_name { .. } => #key
        }
    });

    let payload_type = match &opts.payload {
        Some(ty) => quote! { #ty },
        None => quote! { () },
    };

    let payload_arms = variants.iter().map(|v| {
        let variant_name = &v.ident;
        let carries_payload = opts.payload.is_some()
            && !v.skip_payload
            && v.fields.style == darling::ast::Style::Tuple
            && v.fields.len() == 1;

        if carries_payload {
            quote! {
                #name::#variant_name(value) => ::core::option::Option::Some(
                    ::core::convert::Into::into(::core::clone::Clone::clone(value))
                )
            }
        } else {
            quote! {
                #name::#variant_name { .. } => ::core::option::Option::None
            }
        }
    });

    let expanded = quote! {
        impl #impl_generics reader_dispatch::Action for #name #ty_generics #where_clause {
            type Payload = #payload_type;

            fn name(&self) -> &str {
                match self {
                    #(#name_arms),*
                }
            }

            fn payload(&self) -> ::core::option::Option<Self::Payload> {
                match self {
                    #(#payload_arms),*
                }
            }
        }
    };

    TokenStream::from(expanded)
}
