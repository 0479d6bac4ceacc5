//! Command responses and conversion into them.

/// What a command produced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Response {
    /// Nothing to report.
    #[default]
    Empty,
    /// A single piece of text.
    Text(String),
    /// Several lines of text.
    Lines(Vec<String>),
}

impl Response {
    /// Whether the response carries no text.
    pub fn is_empty(&self) -> bool {
        match self {
            Response::Empty => true,
            Response::Text(text) => text.is_empty(),
            Response::Lines(lines) => lines.is_empty(),
        }
    }

    /// Render the response as one string, lines joined by newlines.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Response::Empty => None,
            Response::Text(text) => Some(text.clone()),
            Response::Lines(lines) => Some(lines.join("\n")),
        }
    }
}

/// Trait for converting a command's output into a [`Response`].
///
/// # Default Implementations
///
/// - `()` → `Empty`
/// - `String` / `&'static str` → `Text`
/// - `Vec<String>` → `Lines`
/// - `Option<T>` → delegates to `T`, `None` is `Empty`
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not an `IntoResponse`",
    label = "missing `IntoResponse` implementation",
    note = "Commands must return `Result<T, BoxError>` where `T: IntoResponse`."
)]
pub trait IntoResponse {
    /// Convert the output into a response.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::Empty
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::Text(self)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::Text(self.to_string())
    }
}

impl IntoResponse for Vec<String> {
    fn into_response(self) -> Response {
        Response::Lines(self)
    }
}

impl<T: IntoResponse> IntoResponse for Option<T> {
    fn into_response(self) -> Response {
        match self {
            Some(t) => t.into_response(),
            None => Response::Empty,
        }
    }
}
