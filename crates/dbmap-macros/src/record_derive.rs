//! Implementation of the Record derive macro.
//!
//! This module turns a struct and its `#[dbmap(...)]` field attributes into a
//! `RecordDescriptor` built at compile time.

use proc_macro2::TokenStream;
use quote::{ToTokens, quote};
use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Error, Field, Fields, Ident, LitStr, Result, Type};

/// Parsed definition of a struct with `#[derive(Record)]`.
#[derive(Debug)]
pub struct RecordDef {
    pub name: Ident,
    pub shape: RecordShape,
}

/// What the derive was applied to.
#[derive(Debug)]
pub enum RecordShape {
    /// Named fields (or a unit struct, which maps no columns).
    Struct(Vec<RecordFieldDef>),
    /// Tuple structs have no field names to map.
    TupleStruct,
    Enum,
}

/// Parsed attributes of a single field.
#[derive(Debug)]
pub struct RecordFieldDef {
    pub name: Ident,
    pub ty: Type,
    /// Explicit column name from `#[dbmap(column = "...")]`.
    pub column: Option<String>,
    /// `#[dbmap(skip)]`
    pub skip: bool,
    /// `#[dbmap(flatten)]`
    pub flatten: bool,
}

/// Parse a `DeriveInput` into a `RecordDef`.
pub fn parse_record(input: &DeriveInput) -> Result<RecordDef> {
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "Record cannot be derived for generic types",
        ));
    }

    let shape = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => RecordShape::Struct(
                named
                    .named
                    .iter()
                    .map(parse_record_field)
                    .collect::<Result<_>>()?,
            ),
            Fields::Unnamed(_) => RecordShape::TupleStruct,
            Fields::Unit => RecordShape::Struct(Vec::new()),
        },
        Data::Enum(_) => RecordShape::Enum,
        Data::Union(_) => {
            return Err(Error::new_spanned(
                input,
                "Record can only be derived for structs and enums, not unions",
            ));
        }
    };

    Ok(RecordDef {
        name: input.ident.clone(),
        shape,
    })
}

/// Parse a single field and its `#[dbmap(...)]` attributes.
fn parse_record_field(field: &Field) -> Result<RecordFieldDef> {
    let name = field
        .ident
        .clone()
        .ok_or_else(|| Error::new_spanned(field, "expected named field"))?;

    let mut column: Option<String> = None;
    let mut skip = false;
    let mut flatten = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("dbmap") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            let path = &meta.path;

            if path.is_ident("column") {
                if column.is_some() {
                    return Err(meta.error("duplicate `column` attribute"));
                }
                let value: LitStr = meta.value()?.parse()?;
                let name = value.value();
                if name.is_empty() {
                    return Err(Error::new_spanned(value, "column name cannot be empty"));
                }
                column = Some(name);
            } else if path.is_ident("skip") {
                skip = true;
            } else if path.is_ident("flatten") {
                flatten = true;
            } else {
                let attr_name = path.to_token_stream().to_string();
                return Err(Error::new_spanned(
                    path,
                    format!(
                        "unknown dbmap attribute `{attr_name}`. \
                         Valid attributes are: column, skip, flatten"
                    ),
                ));
            }

            Ok(())
        })?;
    }

    if skip && (column.is_some() || flatten) {
        return Err(Error::new_spanned(
            &name,
            "`skip` cannot be combined with `column` or `flatten`",
        ));
    }

    Ok(RecordFieldDef {
        name,
        ty: field.ty.clone(),
        column,
        skip,
        flatten,
    })
}

/// Generate the `Record` trait implementation.
pub fn generate_record_impl(def: &RecordDef) -> TokenStream {
    let name = &def.name;

    let body = match &def.shape {
        RecordShape::Struct(fields) => {
            let descriptors = fields.iter().map(generate_field_descriptor);
            quote! {
                #[allow(unused_imports)]
                use dbmap_core::__private::{
                    DecodeFallback as _, DecodeImpl as _, EncodeFallback as _, EncodeImpl as _,
                    JsonFallback as _, JsonImpl as _,
                };
                dbmap_core::RecordDescriptor::record::<Self>(vec![#(#descriptors),*])
            }
        }
        RecordShape::TupleStruct => quote! {
            dbmap_core::RecordDescriptor::opaque::<Self>(dbmap_core::RecordKind::TupleStruct)
        },
        RecordShape::Enum => quote! {
            dbmap_core::RecordDescriptor::opaque::<Self>(dbmap_core::RecordKind::Enum)
        },
    };

    quote! {
        impl dbmap_core::Record for #name {
            fn descriptor() -> dbmap_core::RecordDescriptor {
                #body
            }
        }
    }
}

/// The column annotation a field resolves to.
fn column_tag(field: &RecordFieldDef) -> TokenStream {
    match (&field.column, field.skip) {
        (_, true) => quote! { dbmap_core::ColumnTag::Skip },
        (Some(column), false) => quote! { dbmap_core::ColumnTag::Named(#column) },
        (None, false) => quote! { dbmap_core::ColumnTag::Infer },
    }
}

/// Generate the `FieldDescriptor` expression for one field.
fn generate_field_descriptor(field: &RecordFieldDef) -> TokenStream {
    let ident = &field.name;
    let name = ident.unraw().to_string();
    let ty = &field.ty;
    let tag = column_tag(field);

    let descriptor = quote! {
        dbmap_core::FieldDescriptor::new(
            #name,
            #tag,
            dbmap_core::__private::field_type::<#ty>(
                (&dbmap_core::__private::Probe::<#ty>::new()).decode_hook(),
                (&dbmap_core::__private::Probe::<#ty>::new()).encode_hook(),
                (&dbmap_core::__private::Probe::<#ty>::new()).json_hooks(),
            ),
            |record| {
                record
                    .downcast_ref::<Self>()
                    .map(|r| &r.#ident as &dyn ::std::any::Any)
            },
            |record| {
                record
                    .downcast_mut::<Self>()
                    .map(|r| &mut r.#ident as &mut dyn ::std::any::Any)
            },
        )
    };

    // An explicit column makes a flattened field a regular one.
    if field.flatten && field.column.is_none() {
        quote! {
            #descriptor.embedded(<#ty as dbmap_core::Record>::descriptor)
        }
    } else {
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn fields(def: &RecordDef) -> &[RecordFieldDef] {
        match &def.shape {
            RecordShape::Struct(fields) => fields,
            other => panic!("expected a struct, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_field_attributes() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[dbmap(column = "hero_id")]
                id: i64,
                name: String,
                #[dbmap(skip)]
                cache: Vec<String>,
                #[dbmap(flatten)]
                audit: Audit,
            }
        };
        let def = parse_record(&input).unwrap();
        let fields = fields(&def);
        assert_eq!(fields.len(), 4);
        assert_eq!(fields[0].column.as_deref(), Some("hero_id"));
        assert!(fields[1].column.is_none() && !fields[1].skip);
        assert!(fields[2].skip);
        assert!(fields[3].flatten);
    }

    #[test]
    fn test_unknown_attribute_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[dbmap(rename = "x")]
                id: i64,
            }
        };
        let err = parse_record(&input).unwrap_err();
        assert!(err.to_string().contains("unknown dbmap attribute `rename`"));
    }

    #[test]
    fn test_skip_with_column_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[dbmap(skip, column = "x")]
                id: i64,
            }
        };
        assert!(parse_record(&input).is_err());
    }

    #[test]
    fn test_empty_column_is_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[dbmap(column = "")]
                id: i64,
            }
        };
        assert!(parse_record(&input).is_err());
    }

    #[test]
    fn test_generics_are_rejected() {
        let input: DeriveInput = parse_quote! {
            struct Wrapper<T> {
                inner: T,
            }
        };
        let err = parse_record(&input).unwrap_err();
        assert!(err.to_string().contains("generic"));
    }

    #[test]
    fn test_non_struct_shapes() {
        let tuple: DeriveInput = parse_quote! { struct Pair(i64, i64); };
        assert!(matches!(
            parse_record(&tuple).unwrap().shape,
            RecordShape::TupleStruct
        ));

        let en: DeriveInput = parse_quote! { enum Color { Red } };
        assert!(matches!(parse_record(&en).unwrap().shape, RecordShape::Enum));

        let union: DeriveInput = parse_quote! { union Bits { a: u32, b: f32 } };
        assert!(parse_record(&union).is_err());
    }

    #[test]
    fn test_generated_impl() {
        let input: DeriveInput = parse_quote! {
            struct Hero {
                #[dbmap(column = "hero_id")]
                id: i64,
                #[dbmap(flatten)]
                audit: Audit,
                #[dbmap(flatten, column = "meta")]
                meta: Meta,
                r#type: String,
            }
        };
        let tokens = generate_record_impl(&parse_record(&input).unwrap()).to_string();
        assert!(tokens.contains("impl dbmap_core :: Record for Hero"));
        assert!(tokens.contains("Named (\"hero_id\")"));
        assert_eq!(tokens.matches(". embedded").count(), 1);
        assert!(tokens.contains("\"type\""));
    }
}
