//! `#[command]`: turn an async fn into a command piece.

use crate::args::{PieceArgs, piece_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, LitStr, PatType, ReturnType};

const KEYS: &[&str] = &[
    "name",
    "aliases",
    "description",
    "usage",
    "subcommands",
    "permission_level",
    "cooldown",
    "bucket",
    "run_in",
];

pub fn expand(args: PieceArgs, input: ItemFn) -> syn::Result<TokenStream> {
    args.only(KEYS)?;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "Command function must be async",
        ));
    }
    let [message, params] = typed_inputs(&input)?;

    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let output = match &input.sig.output {
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                &input.sig,
                "Command function must return `Result<T, BoxError>`",
            ));
        }
        ReturnType::Type(_, ty) => ty,
    };
    let name = piece_name(&args, fn_name)?;

    let mut overrides = Vec::new();
    if let Some(aliases) = args.list("aliases")? {
        overrides.push(quote! {
            options.aliases = ::std::vec![#(::std::string::String::from(#aliases)),*];
        });
    }
    for key in ["description", "usage"] {
        if let Some(text) = args.string(key)? {
            let field = syn::Ident::new(key, text.span());
            overrides.push(quote! { options.#field = ::std::string::String::from(#text); });
        }
    }
    if args.flag("subcommands")? {
        overrides.push(quote! { options.subcommands = true; });
    }
    if let Some(level) = args.int("permission_level")? {
        overrides.push(quote! { options.permission_level = #level; });
    }
    if let Some(cooldown) = args.int("cooldown")? {
        overrides.push(quote! { options.cooldown_ms = #cooldown; });
    }
    if let Some(bucket) = args.int("bucket")? {
        overrides.push(quote! { options.bucket = #bucket; });
    }
    if let Some(scopes) = args.list("run_in")? {
        let scopes = scopes
            .iter()
            .map(scope)
            .collect::<syn::Result<Vec<_>>>()?;
        overrides.push(quote! { options.run_in = ::std::vec![#(#scopes),*]; });
    }

    let (message_pat, message_ty) = (&message.pat, &message.ty);
    let (params_pat, params_ty) = (&params.pat, &params.ty);

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Command from `#[piecework::command]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #fn_name;

        impl #fn_name {
            /// Name the command registers under.
            pub const NAME: &'static str = #name;

            /// Options declared on the attribute.
            pub fn options() -> ::piecework::CommandOptions {
                #[allow(unused_mut)]
                let mut options = ::piecework::CommandOptions::default();
                #(#overrides)*
                options
            }

            /// A piece ready to register.
            pub fn piece() -> ::piecework::CommandPiece {
                ::piecework::CommandPiece::new(Self::NAME, Self).with_options(Self::options())
            }
        }

        impl ::piecework::Command for #fn_name {
            async fn run(
                &self,
                __message: ::std::sync::Arc<::piecework::Message>,
                __params: ::std::vec::Vec<::std::string::String>,
            ) -> ::core::result::Result<::piecework::Response, ::piecework::BoxError> {
                async fn __inner(#message_pat: #message_ty, #params_pat: #params_ty) -> #output {
                    #fn_block
                }
                __inner(__message, __params)
                    .await
                    .map(::piecework::IntoResponse::into_response)
            }
        }
    })
}

fn typed_inputs(input: &ItemFn) -> syn::Result<[&PatType; 2]> {
    let typed = input
        .sig
        .inputs
        .iter()
        .map(|arg| match arg {
            FnArg::Typed(pat_type) => Ok(pat_type),
            FnArg::Receiver(receiver) => Err(syn::Error::new_spanned(
                receiver,
                "Command function cannot have a self parameter",
            )),
        })
        .collect::<syn::Result<Vec<_>>>()?;

    match typed.as_slice() {
        [message, params] => Ok([*message, *params]),
        _ => Err(syn::Error::new_spanned(
            &input.sig.inputs,
            "Command function must take `(message: Arc<Message>, params: Vec<String>)`",
        )),
    }
}

fn scope(lit: &LitStr) -> syn::Result<TokenStream> {
    match lit.value().as_str() {
        "guild" => Ok(quote! { ::piecework::ChannelScope::Guild }),
        "direct" | "dm" => Ok(quote! { ::piecework::ChannelScope::Direct }),
        other => Err(syn::Error::new(
            lit.span(),
            format!("unknown channel scope `{}`, expected `guild` or `direct`", other),
        )),
    }
}
