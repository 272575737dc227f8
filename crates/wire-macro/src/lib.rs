//! Derive macros for the crmwire capability traits.
//!
//! The codec walks a per-type capability table instead of runtime
//! reflection. `#[derive(Record)]` and `#[derive(UrlOptions)]` generate that
//! table from `#[wire("...")]` field annotations, which carry the raw
//! comma-separated tag grammar (wire name, `required`, `default>V`,
//! `noencode`, `strip`, conditional rename) resolved at runtime by
//! `crmwire::descriptor`.
//!
//! ```ignore
//! #[derive(Debug, Default, Record)]
//! #[wire(group = "product")]
//! struct Product {
//!     #[wire("ID")]
//!     id: i64,
//!     #[wire("Product Name")]
//!     name: String,
//! }
//! ```
//!
//! Field type drives the marshaling strategy: `String`, integers, floats and
//! `bool` are scalars with the codec's coercion fallbacks;
//! `Option<NaiveDateTime>` is a timestamp; `Vec<T: Record>` is a repeated
//! nested group; any other path type is a single nested `T: Record`. Options
//! structs additionally accept `Option<Payload>` for the structured-data
//! parameter. Missing annotations and unsupported types are compile errors.

use heck::ToLowerCamelCase;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Fields, GenericArgument, PathArguments, Type, parse_macro_input};

/// Derives `crmwire::Record` for a named-field struct.
#[proc_macro_derive(Record, attributes(wire))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_record(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Derives `crmwire::UrlOptions` for a named-field struct.
#[proc_macro_derive(UrlOptions, attributes(wire))]
pub fn derive_url_options(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_url_options(&input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

struct WireField<'a> {
    field: &'a syn::Field,
    ident: &'a syn::Ident,
    tag: String,
    wire_name: String,
}

fn is_keyword(token: &str) -> bool {
    matches!(token, "required" | "strip" | "noencode" | "literal") || token.starts_with("default>")
}

fn wire_tag(field: &syn::Field) -> syn::Result<Option<String>> {
    for attr in &field.attrs {
        if attr.path().is_ident("wire") {
            let lit: syn::LitStr = attr.parse_args()?;
            return Ok(Some(lit.value()));
        }
    }
    Ok(None)
}

fn collect_fields<'a>(input: &'a DeriveInput, derive: &str) -> syn::Result<Vec<WireField<'a>>> {
    let Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("#[derive({derive})] supports structs only"),
        ));
    };
    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input.ident,
            format!("#[derive({derive})] requires named fields"),
        ));
    };

    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(field, "expected a named field"))?;
        let tag = wire_tag(field)?.ok_or_else(|| {
            syn::Error::new_spanned(field, "missing #[wire(\"...\")] annotation")
        })?;
        let wire_name = tag
            .split(',')
            .next()
            .unwrap_or("")
            .trim()
            .to_string();
        if wire_name.is_empty() || is_keyword(&wire_name) {
            return Err(syn::Error::new_spanned(
                field,
                "wire annotation must begin with the wire name",
            ));
        }
        fields.push(WireField {
            field,
            ident,
            tag,
            wire_name,
        });
    }
    Ok(fields)
}

fn group_attr(input: &DeriveInput) -> syn::Result<Option<String>> {
    for attr in &input.attrs {
        if attr.path().is_ident("wire") {
            let mut group = None;
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("group") {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    group = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported wire container attribute"))
                }
            })?;
            return Ok(group);
        }
    }
    Ok(None)
}

enum FieldKind<'a> {
    Text,
    Int,
    IntCast(&'a Type),
    Float,
    FloatCast(&'a Type),
    Bool,
    Timestamp,
    List,
    Nested,
    PayloadOpt,
}

fn inner_type(segment: &syn::PathSegment) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = &segment.arguments {
        for arg in &args.args {
            if let GenericArgument::Type(ty) = arg {
                return Some(ty);
            }
        }
    }
    None
}

fn last_segment_name(ty: &Type) -> Option<String> {
    if let Type::Path(path) = ty {
        path.path
            .segments
            .last()
            .map(|segment| segment.ident.to_string())
    } else {
        None
    }
}

fn classify<'a>(field: &'a syn::Field) -> syn::Result<FieldKind<'a>> {
    let Type::Path(path) = &field.ty else {
        return Err(syn::Error::new_spanned(field, "unsupported field type"));
    };
    let segment = path
        .path
        .segments
        .last()
        .ok_or_else(|| syn::Error::new_spanned(field, "unsupported field type"))?;

    Ok(match segment.ident.to_string().as_str() {
        "String" => FieldKind::Text,
        "i64" => FieldKind::Int,
        "i8" | "i16" | "i32" | "u8" | "u16" | "u32" | "isize" | "usize" => {
            FieldKind::IntCast(&field.ty)
        }
        "f64" => FieldKind::Float,
        "f32" => FieldKind::FloatCast(&field.ty),
        "bool" => FieldKind::Bool,
        "NaiveDateTime" | "DateTime" => {
            return Err(syn::Error::new_spanned(
                field,
                "timestamp fields must be Option<NaiveDateTime>",
            ));
        }
        "Option" => match inner_type(segment).and_then(last_segment_name).as_deref() {
            Some("NaiveDateTime") => FieldKind::Timestamp,
            Some("Payload") => FieldKind::PayloadOpt,
            _ => {
                return Err(syn::Error::new_spanned(
                    field,
                    "unsupported Option field type",
                ));
            }
        },
        "Vec" => FieldKind::List,
        "Payload" => {
            return Err(syn::Error::new_spanned(
                field,
                "structured data fields must be Option<Payload>",
            ));
        }
        _ => FieldKind::Nested,
    })
}

fn shared_tag_fns(fields: &[WireField<'_>], trait_path: TokenStream2) -> TokenStream2 {
    let tags: Vec<&str> = fields.iter().map(|f| f.tag.as_str()).collect();
    quote! {
        fn field_tags() -> &'static [&'static str] {
            &[#(#tags),*]
        }

        fn descriptors() -> &'static [::crmwire::FieldDescriptor] {
            static DESCRIPTORS: ::std::sync::OnceLock<::std::vec::Vec<::crmwire::FieldDescriptor>> =
                ::std::sync::OnceLock::new();
            DESCRIPTORS
                .get_or_init(|| {
                    ::crmwire::descriptor::resolve_tags(<Self as #trait_path>::field_tags())
                })
                .as_slice()
        }
    }
}

fn expand_record(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = collect_fields(input, "Record")?;
    let name = &input.ident;
    let group_name = match group_attr(input)? {
        Some(group) => group,
        None => name.to_string().to_lower_camel_case(),
    };

    let mut absorb_arms = Vec::with_capacity(fields.len());
    let mut emit_stmts = Vec::with_capacity(fields.len());

    for wire_field in &fields {
        let ident = wire_field.ident;
        let wire_name = wire_field.wire_name.as_str();

        let (absorb, emit) = match classify(wire_field.field)? {
            FieldKind::Text => (
                quote! { self.#ident = ::crmwire::materialize::coerce::text(field); },
                quote! {
                    row.push(::crmwire::FieldLabel::text(#wire_name, self.#ident.clone()));
                },
            ),
            FieldKind::Int => (
                quote! { self.#ident = ::crmwire::materialize::coerce::int(field); },
                quote! {
                    row.push(::crmwire::FieldLabel::text(#wire_name, self.#ident.to_string()));
                },
            ),
            FieldKind::IntCast(ty) => (
                quote! { self.#ident = ::crmwire::materialize::coerce::int(field) as #ty; },
                quote! {
                    row.push(::crmwire::FieldLabel::text(#wire_name, self.#ident.to_string()));
                },
            ),
            FieldKind::Float => (
                quote! { self.#ident = ::crmwire::materialize::coerce::float(field); },
                quote! {
                    row.push(::crmwire::FieldLabel::text(#wire_name, self.#ident.to_string()));
                },
            ),
            FieldKind::FloatCast(ty) => (
                quote! { self.#ident = ::crmwire::materialize::coerce::float(field) as #ty; },
                quote! {
                    row.push(::crmwire::FieldLabel::text(#wire_name, self.#ident.to_string()));
                },
            ),
            FieldKind::Bool => (
                quote! { self.#ident = ::crmwire::materialize::coerce::boolean(field); },
                quote! {
                    row.push(::crmwire::FieldLabel::text(
                        #wire_name,
                        if self.#ident { "true" } else { "false" },
                    ));
                },
            ),
            FieldKind::Timestamp => (
                quote! { self.#ident = Some(::crmwire::materialize::coerce::timestamp(field)?); },
                quote! {
                    if let Some(value) = self.#ident.as_ref() {
                        row.push(::crmwire::FieldLabel::text(
                            #wire_name,
                            ::crmwire::serialize::format_wire_timestamp(value),
                        ));
                    }
                },
            ),
            FieldKind::List => (
                quote! { self.#ident = ::crmwire::materialize::coerce::list(field)?; },
                quote! {
                    if !self.#ident.is_empty() {
                        row.push(::crmwire::FieldLabel::with_groups(
                            #wire_name,
                            ::crmwire::serialize::groups_of(&self.#ident)?,
                        ));
                    }
                },
            ),
            FieldKind::Nested => (
                quote! { self.#ident = ::crmwire::materialize::coerce::nested(field)?; },
                quote! {
                    row.push(::crmwire::FieldLabel::with_groups(
                        #wire_name,
                        ::std::vec![::crmwire::serialize::group_of(1, &self.#ident)?],
                    ));
                },
            ),
            FieldKind::PayloadOpt => {
                return Err(syn::Error::new_spanned(
                    wire_field.field,
                    "Payload is an options-only field type",
                ));
            }
        };

        absorb_arms.push(quote! { #wire_name => { #absorb } });
        emit_stmts.push(emit);
    }

    let tag_fns = shared_tag_fns(&fields, quote!(::crmwire::Record));
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::crmwire::Record for #name #ty_generics #where_clause {
            #tag_fns

            fn group_name() -> &'static str {
                #group_name
            }

            fn absorb(
                &mut self,
                wire_name: &str,
                field: &::crmwire::FieldLabel,
            ) -> ::crmwire::Result<()> {
                match wire_name {
                    #(#absorb_arms)*
                    _ => {}
                }
                Ok(())
            }

            fn emit(&self, row: &mut ::crmwire::GenericRow) -> ::crmwire::Result<()> {
                #(#emit_stmts)*
                Ok(())
            }
        }
    })
}

fn expand_url_options(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = collect_fields(input, "UrlOptions")?;
    let name = &input.ident;

    let mut push_stmts = Vec::with_capacity(fields.len());
    for (index, wire_field) in fields.iter().enumerate() {
        let ident = wire_field.ident;
        let value = match classify(wire_field.field)? {
            FieldKind::Text => quote! { ::crmwire::ParamValue::Text(self.#ident.as_str()) },
            FieldKind::Int => quote! { ::crmwire::ParamValue::Int(self.#ident) },
            FieldKind::IntCast(_) => quote! { ::crmwire::ParamValue::Int(self.#ident as i64) },
            FieldKind::Float => quote! { ::crmwire::ParamValue::Float(self.#ident) },
            FieldKind::FloatCast(_) => quote! { ::crmwire::ParamValue::Float(self.#ident as f64) },
            FieldKind::Bool => quote! { ::crmwire::ParamValue::Bool(self.#ident) },
            FieldKind::Timestamp => {
                quote! { ::crmwire::ParamValue::Timestamp(self.#ident.as_ref()) }
            }
            FieldKind::PayloadOpt => {
                quote! { ::crmwire::ParamValue::Payload(self.#ident.as_ref()) }
            }
            FieldKind::List | FieldKind::Nested => {
                return Err(syn::Error::new_spanned(
                    wire_field.field,
                    "unsupported option field type; embed records via Option<Payload>",
                ));
            }
        };
        push_stmts.push(quote! {
            params.push_field(&descriptors[#index], #value)?;
        });
    }

    let tag_fns = shared_tag_fns(&fields, quote!(::crmwire::UrlOptions));
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        #[automatically_derived]
        impl #impl_generics ::crmwire::UrlOptions for #name #ty_generics #where_clause {
            #tag_fns

            fn encode(&self, params: &mut ::crmwire::QueryPairs) -> ::crmwire::Result<()> {
                let descriptors = <Self as ::crmwire::UrlOptions>::descriptors();
                #(#push_stmts)*
                Ok(())
            }
        }
    })
}
