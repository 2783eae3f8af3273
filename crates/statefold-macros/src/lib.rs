//! Procedural macros for the statefold component framework.
//!
//! # EventName Derive Macro
//!
//! Automatically implements `EventName` for entity event enums, exposing the
//! variant name as the event-type tag used by the replay dispatch table.
//!
//! ## Usage
//!
//! ```ignore
//! #[derive(EventName, Serialize, Deserialize, Clone)]
//! #[serde(tag = "type")]
//! enum CounterEvent {
//!     ValueIncreased { value: i32 },
//!     ValueMultiplied { multiplier: i32 },
//! }
//!
//! assert_eq!(CounterEvent::NAMES, &["ValueIncreased", "ValueMultiplied"]);
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input, spanned::Spanned};

/// Derives `EventName` for an enum.
///
/// Each variant contributes its identifier as the event-type tag; the full
/// list is exposed as `EventName::NAMES` so a dispatch table can be built and
/// validated before any event is replayed.
#[proc_macro_derive(EventName)]
pub fn derive_event_name(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_event_name_impl(input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_event_name_impl(input: DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;

    let data = match &input.data {
        Data::Enum(data) => data,
        _ => {
            return Err(syn::Error::new(
                input.span(),
                "EventName can only be derived for enums",
            ));
        }
    };

    if data.variants.is_empty() {
        return Err(syn::Error::new(
            input.span(),
            "EventName requires at least one variant",
        ));
    }

    let mut names = Vec::new();
    let mut match_arms = Vec::new();

    for variant in &data.variants {
        let variant_name = &variant.ident;
        let tag = variant_name.to_string();

        let pattern = match &variant.fields {
            Fields::Named(_) => quote! { #name::#variant_name { .. } },
            Fields::Unnamed(_) => quote! { #name::#variant_name(..) },
            Fields::Unit => quote! { #name::#variant_name },
        };

        match_arms.push(quote! { #pattern => #tag, });
        names.push(tag);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::statefold::event_sourced::EventName for #name #ty_generics #where_clause {
            const NAMES: &'static [&'static str] = &[#(#names),*];

            fn event_name(&self) -> &'static str {
                match self {
                    #(#match_arms)*
                }
            }
        }
    })
}
