//! Cookie parsing.

use std::collections::BTreeMap;
use std::sync::Arc;
use strata_core::{handler_fn, BoxHandler, Context, Error, Event, Handler, Middleware, Result};

/// Cookies sent with the request, by name.
///
/// # Example
///
/// ```
/// use strata_middleware::stages::Cookies;
///
/// let cookies = Cookies::parse(r#"session=abc123; theme="dark"; name=J%C3%BCrgen"#).unwrap();
/// assert_eq!(cookies.get("session"), Some("abc123"));
/// assert_eq!(cookies.get("theme"), Some("dark"));
/// assert_eq!(cookies.get("name"), Some("Jürgen"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookies {
    cookies: BTreeMap<String, String>,
}

impl Cookies {
    /// Parses a `Cookie` header value.
    ///
    /// Pairs without `=` are skipped, the first occurrence of a name wins,
    /// surrounding double quotes are removed and values are percent-decoded
    /// when they decode to valid UTF-8.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cookie`] when a pair has an empty name.
    pub fn parse(header_value: &str) -> Result<Self> {
        let mut cookies = BTreeMap::new();

        for pair in header_value.split(';') {
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(Error::Cookie {
                    message: format!("cookie pair {:?} has no name", pair.trim()),
                });
            }
            let value = value.trim();
            let value = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            let value = urlencoding::decode(value)
                .map_or_else(|_| value.to_string(), |decoded| decoded.into_owned());
            cookies.entry(name.to_string()).or_insert(value);
        }

        Ok(Self { cookies })
    }

    /// Get a cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Check if a cookie exists.
    pub fn contains(&self, name: &str) -> bool {
        self.cookies.contains_key(name)
    }

    /// Get all cookie names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.cookies.keys().map(String::as_str)
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Returns `true` if no cookies were sent.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// Middleware adding [`Cookies`]. See [`parse_cookie`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseCookie;

/// Creates the cookie parsing middleware.
///
/// Reads the `Cookie` header (any casing) from the raw event headers. A
/// missing header gives empty cookies.
pub fn parse_cookie() -> ParseCookie {
    ParseCookie
}

fn cookie_header(event: &Event) -> Option<&str> {
    event
        .headers()?
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("cookie"))
        .and_then(|(_, value)| value.as_str())
}

impl<R: 'static> Middleware<R> for ParseCookie {
    fn name(&self) -> &'static str {
        "parse_cookie"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            async move {
                let cookies = match cookie_header(&event) {
                    Some(header) => Cookies::parse(header)?,
                    None => Cookies::default(),
                };
                inner.call(event.with(cookies), ctx).await
            }
        })
        .boxed()
    }
}
