//! `key = value` attribute arguments shared by every piece macro.

use proc_macro2::Span;
use syn::{
    Ident, LitBool, LitInt, LitStr, Token, bracketed,
    parse::{Parse, ParseStream},
    punctuated::Punctuated,
};

pub enum ArgValue {
    Str(LitStr),
    Int(LitInt),
    Bool(LitBool),
    List(Vec<LitStr>),
}

pub struct PieceArgs {
    entries: Vec<(Ident, ArgValue)>,
}

impl Parse for PieceArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut entries = Vec::new();

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            let value = if input.peek(LitStr) {
                ArgValue::Str(input.parse()?)
            } else if input.peek(LitInt) {
                ArgValue::Int(input.parse()?)
            } else if input.peek(LitBool) {
                ArgValue::Bool(input.parse()?)
            } else if input.peek(syn::token::Bracket) {
                let content;
                bracketed!(content in input);
                let items = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                ArgValue::List(items.into_iter().collect())
            } else {
                return Err(input.error("expected a string, integer, boolean or list of strings"));
            };

            if entries.iter().any(|(seen, _): &(Ident, ArgValue)| *seen == ident) {
                return Err(syn::Error::new(
                    ident.span(),
                    format!("duplicate attribute: {}", ident),
                ));
            }
            entries.push((ident, value));

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(PieceArgs { entries })
    }
}

impl PieceArgs {
    /// Reject any key outside `known`.
    pub fn only(&self, known: &[&str]) -> syn::Result<()> {
        match self
            .entries
            .iter()
            .find(|(ident, _)| !known.contains(&ident.to_string().as_str()))
        {
            Some((ident, _)) => Err(syn::Error::new(
                ident.span(),
                format!("unknown attribute: {}", ident),
            )),
            None => Ok(()),
        }
    }

    fn get(&self, key: &str) -> Option<(&Ident, &ArgValue)> {
        self.entries
            .iter()
            .find(|(ident, _)| ident == key)
            .map(|(ident, value)| (ident, value))
    }

    pub fn string(&self, key: &str) -> syn::Result<Option<LitStr>> {
        match self.get(key) {
            None => Ok(None),
            Some((_, ArgValue::Str(lit))) => Ok(Some(lit.clone())),
            Some((ident, _)) => Err(expected(ident, "a string literal")),
        }
    }

    pub fn int(&self, key: &str) -> syn::Result<Option<LitInt>> {
        match self.get(key) {
            None => Ok(None),
            Some((_, ArgValue::Int(lit))) => Ok(Some(lit.clone())),
            Some((ident, _)) => Err(expected(ident, "an integer literal")),
        }
    }

    pub fn flag(&self, key: &str) -> syn::Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some((_, ArgValue::Bool(lit))) => Ok(lit.value),
            Some((ident, _)) => Err(expected(ident, "`true` or `false`")),
        }
    }

    pub fn list(&self, key: &str) -> syn::Result<Option<Vec<LitStr>>> {
        match self.get(key) {
            None => Ok(None),
            Some((_, ArgValue::List(items))) => Ok(Some(items.clone())),
            Some((_, ArgValue::Str(lit))) => Ok(Some(vec![lit.clone()])),
            Some((ident, _)) => Err(expected(ident, "a list of string literals")),
        }
    }
}

fn expected(ident: &Ident, what: &str) -> syn::Error {
    syn::Error::new(ident.span(), format!("`{}` expects {}", ident, what))
}

/// Piece name: the `name` argument, or the function name.
pub fn piece_name(args: &PieceArgs, fn_name: &Ident) -> syn::Result<LitStr> {
    Ok(args
        .string("name")?
        .unwrap_or_else(|| LitStr::new(&fn_name.to_string(), Span::call_site())))
}
