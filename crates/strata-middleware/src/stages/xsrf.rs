//! XSRF token verification.
//!
//! Stateless double-submit tokens: a token is `<salt>-<hash>` where `hash` is
//! the unpadded base64url SHA-1 of `<salt>-<secret>`. The secret is kept on
//! the caller's side (usually in an HTTP-only cookie) and the token is sent
//! back in a header. [`XsrfTokens`] creates both; [`verify_xsrf_token`]
//! checks them on every request.

use crate::stages::headers::SanitizedHeaders;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use rand::distributions::Alphanumeric;
use rand::{Rng, RngCore};
use sha1::{Digest, Sha1};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use strata_core::{
    handler_fn, BoxFuture, BoxHandler, Context, Event, Handler, HttpError, Middleware,
};
use subtle::ConstantTimeEq;

/// Default header carrying the token.
pub const XSRF_HEADER: &str = "x-xsrf-token";

const DEFAULT_SALT_LENGTH: usize = 8;
const SECRET_LENGTH: usize = 18;

/// Creates and verifies XSRF secrets and tokens.
#[derive(Debug, Clone, Copy)]
pub struct XsrfTokens {
    salt_length: usize,
}

impl Default for XsrfTokens {
    fn default() -> Self {
        Self {
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

impl XsrfTokens {
    /// Token factory with the default salt length.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of salt characters in created tokens.
    pub fn with_salt_length(mut self, salt_length: usize) -> Self {
        self.salt_length = salt_length.max(1);
        self
    }

    /// A new random secret.
    pub fn create_secret(&self) -> String {
        let mut bytes = [0_u8; SECRET_LENGTH];
        rand::thread_rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// A new token for `secret`.
    pub fn create(&self, secret: &str) -> String {
        let salt: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(self.salt_length)
            .map(char::from)
            .collect();
        tokenize(&salt, secret)
    }

    /// Checks that `token` was created for `secret`.
    pub fn verify(&self, secret: &str, token: &str) -> bool {
        let Some((salt, _)) = token.split_once('-') else {
            return false;
        };
        let expected = tokenize(salt, secret);
        expected.as_bytes().ct_eq(token.as_bytes()).into()
    }
}

fn tokenize(salt: &str, secret: &str) -> String {
    let digest = Sha1::digest(format!("{salt}-{secret}").as_bytes());
    format!("{salt}-{}", URL_SAFE_NO_PAD.encode(digest))
}

type SecretResolver = Arc<dyn Fn(Event) -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// Configuration for [`VerifyXsrfToken`].
#[derive(Clone)]
pub struct XsrfOptions {
    secret: SecretResolver,
    header_name: String,
}

impl XsrfOptions {
    /// Options with an async secret resolver and the default header.
    pub fn new<S, Fut>(secret: S) -> Self
    where
        S: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<String>> + Send + 'static,
    {
        Self {
            secret: Arc::new(move |event| Box::pin(secret(event))),
            header_name: XSRF_HEADER.to_string(),
        }
    }

    /// Reads the token from another header.
    pub fn with_header_name(mut self, name: impl Into<String>) -> Self {
        self.header_name = name.into().to_ascii_lowercase();
        self
    }

    /// The header carrying the token.
    pub fn header_name(&self) -> &str {
        &self.header_name
    }
}

impl fmt::Debug for XsrfOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XsrfOptions")
            .field("header_name", &self.header_name)
            .finish_non_exhaustive()
    }
}

/// XSRF verification middleware. Requires [`SanitizedHeaders`].
#[derive(Debug, Clone)]
pub struct VerifyXsrfToken {
    options: Arc<XsrfOptions>,
}

/// Creates the XSRF verification middleware.
///
/// A missing token, a secret resolver returning `None` or a mismatch all
/// fail with [`HttpError::unauthorized`].
pub fn verify_xsrf_token(options: XsrfOptions) -> VerifyXsrfToken {
    VerifyXsrfToken {
        options: Arc::new(options),
    }
}

impl<R: 'static> Middleware<R> for VerifyXsrfToken {
    fn name(&self) -> &'static str {
        "verify_xsrf_token"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        let options = Arc::clone(&self.options);
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            let options = Arc::clone(&options);
            async move {
                let token = event
                    .require::<SanitizedHeaders>()?
                    .non_empty(&options.header_name)
                    .map(str::to_string);
                let Some(token) = token else {
                    tracing::debug!(header = %options.header_name, "XSRF token missing");
                    return Err(HttpError::unauthorized().into());
                };
                let Some(secret) = (options.secret)(event.clone()).await else {
                    tracing::debug!("XSRF secret missing");
                    return Err(HttpError::unauthorized().into());
                };
                if !XsrfTokens::new().verify(&secret, &token) {
                    tracing::debug!("XSRF token mismatch");
                    return Err(HttpError::unauthorized().into());
                }
                inner.call(event, ctx).await
            }
        })
        .boxed()
    }
}
