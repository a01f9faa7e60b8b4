use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr, Path, Visibility};

/// Derive macro for record and newtype descriptors.
///
/// Generates `typeconv_api::Reflect` for the annotated struct:
///
/// - `describe()`: record kind with one `FieldDesc` per field, or the inner
///   kind for a single-field tuple struct.
/// - `to_value(&self)` / `from_value(Value)`: positional record values.
///
/// # Example
///
/// ```ignore
/// #[derive(Record)]
/// #[conv(to_json = "date_to_json", from_json = "date_from_json")]
/// pub struct Order {
///     #[tag(json = "id", db = "order_id")]
///     pub id: String,
///
///     #[conv(embed)]
///     pub audit: Audit,
///
///     #[conv(readonly)]
///     pub created: i64,
/// }
/// ```
///
/// Field attributes: `#[tag(key = "value", ...)]`, `#[conv(embed)]`,
/// `#[conv(readonly)]`. Only `pub` fields are visible for matching.
///
/// Container attributes: `#[conv(to_json = "path")]` with
/// `fn(&Self) -> Result<serde_json::Value, BoxError>` and
/// `#[conv(from_json = "path")]` with
/// `fn(serde_json::Value) -> Result<Self, BoxError>`.
#[proc_macro_derive(Record, attributes(tag, conv))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_impl(input: &DeriveInput) -> Result<TokenStream2, syn::Error> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record does not support generic types",
        ));
    }

    let hooks = parse_container(input)?;

    let data = match &input.data {
        Data::Struct(data) => data,
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record only supports structs",
            ))
        }
    };

    let (describe, to_value, from_value) = match &data.fields {
        Fields::Named(fields) => record_impl(name, fields)?,
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => newtype_impl(&fields.unnamed[0]),
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record only supports structs with named fields or single-field tuple structs",
            ))
        }
    };

    let describe = match hooks_expr(name, &hooks) {
        Some(hooks) => quote! { (#describe).with_json(#hooks) },
        None => describe,
    };

    Ok(quote! {
        impl ::typeconv_api::Reflect for #name {
            fn describe() -> ::typeconv_api::TypeDesc {
                #describe
            }

            fn to_value(&self) -> ::typeconv_api::Value {
                #to_value
            }

            fn from_value(
                __value: ::typeconv_api::Value,
            ) -> ::core::result::Result<Self, ::typeconv_api::ValueError> {
                #from_value
            }
        }
    })
}

#[derive(Default)]
struct ContainerHooks {
    to_json: Option<Path>,
    from_json: Option<Path>,
}

fn parse_container(input: &DeriveInput) -> Result<ContainerHooks, syn::Error> {
    let mut hooks = ContainerHooks::default();
    for attr in &input.attrs {
        if !attr.path().is_ident("conv") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("to_json") {
                let value: LitStr = meta.value()?.parse()?;
                hooks.to_json = Some(value.parse()?);
            } else if meta.path.is_ident("from_json") {
                let value: LitStr = meta.value()?.parse()?;
                hooks.from_json = Some(value.parse()?);
            } else {
                return Err(meta.error("unknown container attribute (expected to_json or from_json)"));
            }
            Ok(())
        })?;
    }
    Ok(hooks)
}

/// Wrap the user's typed hooks into the type-erased signatures of `JsonHooks`.
fn hooks_expr(name: &syn::Ident, hooks: &ContainerHooks) -> Option<TokenStream2> {
    if hooks.to_json.is_none() && hooks.from_json.is_none() {
        return None;
    }

    let to_json = match &hooks.to_json {
        Some(path) => quote! {{
            fn __to_json(
                __value: &::typeconv_api::Value,
            ) -> ::core::result::Result<::typeconv_api::serde_json::Value, ::typeconv_api::BoxError> {
                let __this = <#name as ::typeconv_api::Reflect>::from_value(__value.clone())?;
                #path(&__this)
            }
            ::core::option::Option::Some(__to_json as ::typeconv_api::codec::ToJsonFn)
        }},
        None => quote! { ::core::option::Option::None },
    };

    let from_json = match &hooks.from_json {
        Some(path) => quote! {{
            fn __from_json(
                __json: ::typeconv_api::serde_json::Value,
            ) -> ::core::result::Result<::typeconv_api::Value, ::typeconv_api::BoxError> {
                let __this: #name = #path(__json)?;
                ::core::result::Result::Ok(::typeconv_api::Reflect::to_value(&__this))
            }
            ::core::option::Option::Some(__from_json as ::typeconv_api::codec::FromJsonFn)
        }},
        None => quote! { ::core::option::Option::None },
    };

    Some(quote! {
        ::typeconv_api::JsonHooks {
            to_json: #to_json,
            from_json: #from_json,
        }
    })
}

#[derive(Default)]
struct FieldFlags {
    tags: Vec<(String, String)>,
    embed: bool,
    readonly: bool,
}

fn parse_field(field: &syn::Field) -> Result<FieldFlags, syn::Error> {
    let mut flags = FieldFlags::default();
    for attr in &field.attrs {
        if attr.path().is_ident("tag") {
            attr.parse_nested_meta(|meta| {
                let key = meta
                    .path
                    .get_ident()
                    .ok_or_else(|| meta.error("expected tag key"))?
                    .to_string();
                let value: LitStr = meta.value()?.parse()?;
                flags.tags.push((key, value.value()));
                Ok(())
            })?;
        } else if attr.path().is_ident("conv") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("embed") {
                    flags.embed = true;
                } else if meta.path.is_ident("readonly") {
                    flags.readonly = true;
                } else {
                    return Err(meta.error("unknown field attribute (expected embed or readonly)"));
                }
                Ok(())
            })?;
        }
    }
    Ok(flags)
}

fn record_impl(
    name: &syn::Ident,
    fields: &syn::FieldsNamed,
) -> Result<(TokenStream2, TokenStream2, TokenStream2), syn::Error> {
    let name_str = name.to_string();
    let count = fields.named.len();

    let mut descs = Vec::new();
    let mut to_values = Vec::new();
    let mut from_values = Vec::new();

    for field in &fields.named {
        let field_name = field.ident.as_ref().ok_or_else(|| {
            syn::Error::new_spanned(field, "expected named field")
        })?;
        let field_name_str = field_name.to_string();
        let field_ty = &field.ty;
        let flags = parse_field(field)?;

        let tag_keys = flags.tags.iter().map(|(k, _)| k);
        let tag_values = flags.tags.iter().map(|(_, v)| v);

        let mut desc = quote! {
            ::typeconv_api::FieldDesc::new(
                #field_name_str,
                ::typeconv_api::Type::of::<#field_ty>(),
            )
            .with_tags(&[#((#tag_keys, #tag_values)),*])
        };
        if flags.embed {
            desc = quote! { #desc.embedded() };
        }
        if flags.readonly {
            desc = quote! { #desc.read_only() };
        }
        if !matches!(field.vis, Visibility::Public(_)) {
            desc = quote! { #desc.hidden() };
        }
        descs.push(desc);

        to_values.push(quote! {
            ::typeconv_api::Reflect::to_value(&self.#field_name)
        });

        from_values.push(quote! {
            #field_name: <#field_ty as ::typeconv_api::Reflect>::from_value(
                __fields.next().unwrap_or_default(),
            )
            .map_err(|e| e.with_context(#field_name_str))?
        });
    }

    let describe = quote! {
        ::typeconv_api::TypeDesc::record(vec![
            #(#descs),*
        ])
    };
    let to_value = quote! {
        ::typeconv_api::Value::Record(vec![
            #(#to_values),*
        ])
    };
    let from_value = quote! {
        let mut __fields = __value.into_fields(#name_str, #count)?.into_iter();
        ::core::result::Result::Ok(Self {
            #(#from_values),*
        })
    };
    Ok((describe, to_value, from_value))
}

fn newtype_impl(field: &syn::Field) -> (TokenStream2, TokenStream2, TokenStream2) {
    let inner = &field.ty;
    let describe = quote! {
        ::typeconv_api::TypeDesc::new(::typeconv_api::Type::of::<#inner>().kind().clone())
    };
    let to_value = quote! {
        ::typeconv_api::Reflect::to_value(&self.0)
    };
    let from_value = quote! {
        ::core::result::Result::Ok(Self(<#inner as ::typeconv_api::Reflect>::from_value(__value)?))
    };
    (describe, to_value, from_value)
}
