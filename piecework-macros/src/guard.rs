//! `#[guard]`: turn an async fn into a guard piece.

use crate::args::{PieceArgs, piece_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn, ReturnType};

pub fn expand(args: PieceArgs, input: ItemFn) -> syn::Result<TokenStream> {
    args.only(&["name", "spam_protection"])?;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "Guard function must be async",
        ));
    }

    let inputs = &input.sig.inputs;
    let (message, command) = match (inputs.first(), inputs.iter().nth(1), inputs.len()) {
        (Some(FnArg::Typed(message)), Some(FnArg::Typed(command)), 2) => (message, command),
        _ => {
            return Err(syn::Error::new_spanned(
                inputs,
                "Guard function must take `(message: Arc<Message>, command: Arc<CommandPiece>)`",
            ));
        }
    };
    let output = match &input.sig.output {
        ReturnType::Type(_, ty) => ty,
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                &input.sig,
                "Guard function must return `Result<T, BoxError>`",
            ));
        }
    };

    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let name = piece_name(&args, fn_name)?;
    let spam_protection = args.flag("spam_protection")?;
    let (message_pat, message_ty) = (&message.pat, &message.ty);
    let (command_pat, command_ty) = (&command.pat, &command.ty);

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Guard from `#[piecework::guard]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #fn_name;

        impl #fn_name {
            /// Name the guard registers under.
            pub const NAME: &'static str = #name;

            /// Options declared on the attribute.
            pub fn options() -> ::piecework::GuardOptions {
                ::piecework::GuardOptions {
                    spam_protection: #spam_protection,
                }
            }

            /// A piece ready to register.
            pub fn piece() -> ::piecework::GuardPiece {
                ::piecework::GuardPiece::new(Self::NAME, Self).with_options(Self::options())
            }
        }

        impl ::piecework::Guard for #fn_name {
            async fn run(
                &self,
                __message: ::std::sync::Arc<::piecework::Message>,
                __command: ::std::sync::Arc<::piecework::CommandPiece>,
            ) -> ::core::result::Result<::piecework::GuardResult, ::piecework::BoxError> {
                async fn __inner(#message_pat: #message_ty, #command_pat: #command_ty) -> #output {
                    #fn_block
                }
                __inner(__message, __command)
                    .await
                    .map(::core::convert::Into::into)
            }
        }
    })
}
