//! `#[event]`: turn an async fn into an event listener piece.

use crate::args::{PieceArgs, piece_name};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{FnArg, ItemFn};

pub fn expand(args: PieceArgs, input: ItemFn) -> syn::Result<TokenStream> {
    args.only(&["name", "event", "once"])?;

    if input.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            input.sig.fn_token,
            "Event function must be async",
        ));
    }
    let event = match (input.sig.inputs.first(), input.sig.inputs.len()) {
        (Some(FnArg::Typed(event)), 1) => event,
        _ => {
            return Err(syn::Error::new_spanned(
                &input.sig.inputs,
                "Event function must take `(event: RuntimeEvent)`",
            ));
        }
    };

    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;
    let fn_block = &input.block;
    let output = &input.sig.output;
    let name = piece_name(&args, fn_name)?;
    let once = args.flag("once")?;
    let listens_to = match args.string("event")? {
        Some(event) => quote! { ::piecework::EventKind::from_name(#event) },
        None => quote! { ::core::option::Option::None },
    };
    let (event_pat, event_ty) = (&event.pat, &event.ty);

    Ok(quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Event from `#[piecework::event]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #fn_name;

        impl #fn_name {
            /// Name the listener registers under.
            pub const NAME: &'static str = #name;

            /// Options declared on the attribute.
            pub fn options() -> ::piecework::EventOptions {
                ::piecework::EventOptions {
                    event: #listens_to,
                    once: #once,
                }
            }

            /// A piece ready to register.
            pub fn piece() -> ::piecework::EventPiece {
                ::piecework::EventPiece::new(Self::NAME, Self).with_options(Self::options())
            }
        }

        impl ::piecework::Event for #fn_name {
            async fn run(
                &self,
                __event: ::piecework::RuntimeEvent,
            ) -> ::core::result::Result<(), ::piecework::BoxError> {
                async fn __inner(#event_pat: #event_ty) #output {
                    #fn_block
                }
                __inner(__event).await
            }
        }
    })
}
