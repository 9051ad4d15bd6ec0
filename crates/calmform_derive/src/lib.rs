use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Data, DeriveInput, Fields, parse_macro_input};

/// Generates `FormModel` for a struct with named fields.
///
/// Each field maps to the form field of the same name. The generated
/// `{Model}Fields` type exposes one `FieldKey` accessor per field.
#[proc_macro_derive(FormModel)]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "FormModel derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;
    let fields_struct_ident = format_ident!("{model_ident}Fields");

    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let calmform = calmform_path();
    let form = quote!(#calmform::form);
    let mut key_accessors = Vec::new();
    let mut keys = Vec::new();
    let mut decoders = Vec::new();
    let mut encoders = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let field_name = field_ident.to_string();
        let field_name = field_name.strip_prefix("r#").unwrap_or(&field_name);

        key_accessors.push(quote! {
            pub const fn #field_ident(&self) -> #form::FieldKey {
                #form::FieldKey::new(#field_name)
            }
        });
        keys.push(quote!(#form::FieldKey::new(#field_name)));
        decoders.push(quote! {
            #field_ident: snapshot.decode::<#field_ty>(#form::FieldKey::new(#field_name))?
        });
        encoders.push(quote! {
            snapshot.insert(
                #form::FieldKey::new(#field_name),
                <#field_ty as #form::FieldType>::into_field_value(self.#field_ident),
            );
        });
    }

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#key_accessors)*
        }

        impl #form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn field_keys() -> &'static [#form::FieldKey] {
                const KEYS: &[#form::FieldKey] = &[#(#keys),*];
                KEYS
            }

            fn from_snapshot(
                snapshot: &#form::ValueSnapshot,
            ) -> #form::FormResult<Self> {
                Ok(Self {
                    #(#decoders),*
                })
            }

            fn into_snapshot(self) -> #form::ValueSnapshot {
                let mut snapshot = #form::ValueSnapshot::new();
                #(#encoders)*
                snapshot
            }
        }
    }
    .into()
}

fn calmform_path() -> TokenStream2 {
    match crate_name("calmform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::calmform),
    }
}
