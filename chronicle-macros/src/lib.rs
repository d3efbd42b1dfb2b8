// These lints are triggered by darling's generated code for
// `#[darling(default)]`.
#![allow(clippy::option_if_let_else)]
#![allow(clippy::needless_continue)]

use darling::{FromDeriveInput, FromField, ast::Data, util::Flag};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{DeriveInput, Ident, parse_macro_input};

/// Field-level `#[event(...)]` markers.
#[derive(Debug, FromField)]
#[darling(attributes(event))]
struct EventField {
    ident: Option<Ident>,
    id: Flag,
    version: Flag,
    at: Flag,
    model: Flag,
}

/// Configuration for the `#[event(...)]` attribute.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(event), supports(struct_named))]
struct EventArgs {
    ident: Ident,
    generics: syn::Generics,
    data: Data<darling::util::Ignored, EventField>,
    #[darling(default)]
    type_tag: Option<String>,
}

/// Field-level `#[command(...)]` markers.
#[derive(Debug, FromField)]
#[darling(attributes(command))]
struct CommandField {
    ident: Option<Ident>,
    id: Flag,
    model: Flag,
}

/// Configuration for the `#[command(...)]` attribute.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(command), supports(struct_named))]
struct CommandArgs {
    ident: Ident,
    generics: syn::Generics,
    data: Data<darling::util::Ignored, CommandField>,
}

/// One of the three attributes every event exposes.
#[derive(Clone, Copy)]
enum Role {
    Id,
    Version,
    At,
}

impl Role {
    const fn attr(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Version => "version",
            Self::At => "at",
        }
    }

    /// Field names picked up when no field is marked.
    const fn conventional_names(self) -> &'static [&'static str] {
        match self {
            Self::Id => &["id", "aggregate_id"],
            Self::Version => &["version"],
            Self::At => &["at", "occurred_at"],
        }
    }

    fn is_marked(self, field: &EventField) -> bool {
        match self {
            Self::Id => field.id.is_present(),
            Self::Version => field.version.is_present(),
            Self::At => field.at.is_present(),
        }
    }
}

/// Where an event reads one of its attributes from.
enum Source<'a> {
    Field(&'a Ident),
    Model(&'a Ident),
}

/// Parse derive input with darling and render errors as tokens.
fn parse_or_error<T, F>(input: &DeriveInput, f: F) -> TokenStream2
where
    T: FromDeriveInput,
    F: FnOnce(T) -> darling::Result<TokenStream2>,
{
    match T::from_derive_input(input).and_then(f) {
        Ok(tokens) => tokens,
        Err(err) => err.write_errors(),
    }
}

/// Returns the single field carrying `marker`, if any.
fn single_marked<'a, F>(
    fields: &'a [F],
    ident: impl Fn(&'a F) -> Option<&'a Ident>,
    marked: impl Fn(&F) -> bool,
    marker: &str,
    struct_name: &Ident,
) -> darling::Result<Option<&'a Ident>> {
    let mut found = fields.iter().filter(|&f| marked(f)).filter_map(ident);
    let first = found.next();
    if let Some(second) = found.next() {
        return Err(darling::Error::custom(format!(
            "`#[{marker}]` may only be placed on one field of `{struct_name}`"
        ))
        .with_span(second));
    }
    Ok(first)
}

/// Find the field an event attribute is read from: an explicitly marked
/// field, then the model field, then a field with a conventional name.
fn resolve_event_field<'a>(
    role: Role,
    fields: &'a [EventField],
    model: Option<&'a Ident>,
    struct_name: &Ident,
) -> darling::Result<Source<'a>> {
    let marker = format!("event({})", role.attr());
    if let Some(field) = single_marked(
        fields,
        |f| f.ident.as_ref(),
        |f| role.is_marked(f),
        &marker,
        struct_name,
    )? {
        return Ok(Source::Field(field));
    }
    if let Some(model) = model {
        return Ok(Source::Model(model));
    }
    fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .find(|ident| role.conventional_names().iter().any(|name| ident == name))
        .map(Source::Field)
        .ok_or_else(|| {
            darling::Error::custom(format!(
                "`{struct_name}` has no `{}` field; mark one with `#[{marker}]` or embed an \
                 `EventModel` with `#[event(model)]`",
                role.attr()
            ))
            .with_span(struct_name)
        })
}

/// Derives `Event` and `DomainEvent` for a struct with named fields.
///
/// The aggregate id, version and timestamp are read from fields:
///
/// - a field marked `#[event(id)]`, `#[event(version)]` or `#[event(at)]`;
/// - otherwise an embedded `EventModel` marked `#[event(model)]`;
/// - otherwise a field named `id`/`aggregate_id`, `version` or
///   `at`/`occurred_at`.
///
/// The id field must deref to `str`, the version field must be a `u64` and
/// the timestamp field a `DateTime<Utc>`.
///
/// # Attributes
///
/// ## Optional
/// - `type_tag = "name"` - Serialization tag (default: the struct name)
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Serialize, Deserialize, Event)]
/// #[event(type_tag = "order.shipped")]
/// pub struct OrderShipped {
///     #[serde(flatten)]
///     #[event(model)]
///     model: EventModel,
///     carrier: String,
/// }
/// ```
#[proc_macro_derive(Event, attributes(event))]
pub fn derive_event(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_event_impl(&input).into()
}

/// Internal entry point that returns tokens for the event derive.
fn derive_event_impl(input: &DeriveInput) -> TokenStream2 {
    parse_or_error::<EventArgs, _>(input, generate_event_impl)
}

/// Generate the event derive implementation tokens.
fn generate_event_impl(args: EventArgs) -> darling::Result<TokenStream2> {
    let EventArgs {
        ident: struct_name,
        generics,
        data,
        type_tag,
    } = args;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let fields = data.take_struct().map(|f| f.fields).unwrap_or_default();

    let model = single_marked(
        &fields,
        |f| f.ident.as_ref(),
        |f| f.model.is_present(),
        "event(model)",
        &struct_name,
    )?;

    let resolve = |role| resolve_event_field(role, &fields, model, &struct_name);
    let (id, version, at) = match (resolve(Role::Id), resolve(Role::Version), resolve(Role::At)) {
        (Ok(id), Ok(version), Ok(at)) => (id, version, at),
        (id, version, at) => {
            let errors = [id.err(), version.err(), at.err()]
                .into_iter()
                .flatten()
                .collect();
            return Err(darling::Error::multiple(errors));
        }
    };

    let aggregate_id = match id {
        Source::Field(field) => quote! { &self.#field },
        Source::Model(model) => {
            quote! { ::chronicle::event::EventModel::aggregate_id(&self.#model) }
        }
    };
    let event_version = match version {
        Source::Field(field) => quote! { self.#field },
        Source::Model(model) => {
            quote! { ::chronicle::event::EventModel::event_version(&self.#model) }
        }
    };
    let event_at = match at {
        Source::Field(field) => quote! { self.#field },
        Source::Model(model) => quote! { ::chronicle::event::EventModel::event_at(&self.#model) },
    };

    let type_tag_fn = match type_tag {
        Some(tag) if tag.trim().is_empty() => {
            return Err(darling::Error::custom("`type_tag` may not be empty").with_span(&struct_name));
        }
        Some(tag) => quote! {
            fn type_tag() -> &'static str {
                #tag
            }
        },
        None => quote! {},
    };

    Ok(quote! {
        impl #impl_generics ::chronicle::event::DomainEvent for #struct_name #ty_generics #where_clause {
            #type_tag_fn
        }

        impl #impl_generics ::chronicle::event::Event for #struct_name #ty_generics #where_clause {
            fn aggregate_id(&self) -> &str {
                #aggregate_id
            }

            fn event_version(&self) -> u64 {
                #event_version
            }

            fn event_at(&self) -> ::chronicle::event::Timestamp {
                #event_at
            }
        }
    })
}

/// Derives `Command` for a struct with named fields.
///
/// The aggregate id is read from a field marked `#[command(id)]`, an embedded
/// `CommandModel` marked `#[command(model)]`, or a field named `id` or
/// `aggregate_id`, in that order.
///
/// # Example
///
/// ```ignore
/// #[derive(Debug, Command)]
/// pub struct ShipOrder {
///     #[command(id)]
///     order_id: String,
///     carrier: String,
/// }
/// ```
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    derive_command_impl(&input).into()
}

/// Internal entry point that returns tokens for the command derive.
fn derive_command_impl(input: &DeriveInput) -> TokenStream2 {
    parse_or_error::<CommandArgs, _>(input, generate_command_impl)
}

/// Generate the command derive implementation tokens.
fn generate_command_impl(args: CommandArgs) -> darling::Result<TokenStream2> {
    let CommandArgs {
        ident: struct_name,
        generics,
        data,
    } = args;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let fields = data.take_struct().map(|f| f.fields).unwrap_or_default();

    let explicit = single_marked(
        &fields,
        |f| f.ident.as_ref(),
        |f| f.id.is_present(),
        "command(id)",
        &struct_name,
    )?;
    let model = single_marked(
        &fields,
        |f| f.ident.as_ref(),
        |f| f.model.is_present(),
        "command(model)",
        &struct_name,
    )?;

    let aggregate_id = if let Some(field) = explicit {
        quote! { &self.#field }
    } else if let Some(model) = model {
        quote! { ::chronicle::command::Command::aggregate_id(&self.#model) }
    } else if let Some(field) = fields
        .iter()
        .filter_map(|f| f.ident.as_ref())
        .find(|ident| *ident == "id" || *ident == "aggregate_id")
    {
        quote! { &self.#field }
    } else {
        return Err(darling::Error::custom(format!(
            "`{struct_name}` has no `id` field; mark one with `#[command(id)]` or embed a \
             `CommandModel` with `#[command(model)]`"
        ))
        .with_span(&struct_name));
    };

    Ok(quote! {
        impl #impl_generics ::chronicle::command::Command for #struct_name #ty_generics #where_clause {
            fn aggregate_id(&self) -> &str {
                #aggregate_id
            }
        }
    })
}
