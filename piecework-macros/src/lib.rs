//! Attribute macros for declaring Piecework pieces.
//!
//! Each macro turns an `async fn` into a unit struct named like the function
//! that implements the matching behavior trait, plus `NAME`, `options()` and
//! `piece()` helpers for registration.

use proc_macro::TokenStream;
use syn::{ItemFn, parse_macro_input};

mod args;
mod command;
mod event;
mod guard;

use args::PieceArgs;

/// Declare a command.
///
/// ```rust,ignore
/// #[piecework::command(aliases = ["p"], cooldown = 5000, run_in = ["guild"])]
/// async fn ping(message: Arc<Message>, params: Vec<String>) -> Result<&'static str, BoxError> {
///     Ok("pong")
/// }
///
/// runtime.commands().register(ping::piece())?;
/// ```
///
/// Accepted keys: `name`, `aliases`, `description`, `usage`, `subcommands`,
/// `permission_level`, `cooldown` (milliseconds), `bucket`, `run_in`.
#[proc_macro_attribute]
pub fn command(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as PieceArgs);
    let input = parse_macro_input!(item as ItemFn);

    command::expand(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Declare a guard. Accepted keys: `name`, `spam_protection`.
///
/// The function may return anything convertible into a `GuardResult`,
/// such as `bool` or `Option<String>`.
#[proc_macro_attribute]
pub fn guard(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as PieceArgs);
    let input = parse_macro_input!(item as ItemFn);

    guard::expand(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Declare an event listener. Accepted keys: `name`, `event`, `once`.
///
/// Without `event`, the listener answers to the event its name spells.
#[proc_macro_attribute]
pub fn event(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as PieceArgs);
    let input = parse_macro_input!(item as ItemFn);

    event::expand(args, input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
