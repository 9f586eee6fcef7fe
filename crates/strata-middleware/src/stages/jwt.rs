//! JWT verification.
//!
//! Reads a token from the event, asks a resolver for the verification key
//! and verifies the token with `jsonwebtoken`. The verified claims become
//! the [`User`] extension. Every failure, whatever its cause, is reported to
//! the caller as the same [`HttpError::unauthorized`]; the cause is only
//! logged at `DEBUG` level.
//!
//! The key resolver sees the decoded (unverified) header and payload, so it
//! can pick a key by `kid` or issuer before verification.
//!
//! # Example
//!
//! ```
//! use jsonwebtoken::DecodingKey;
//! use strata_middleware::stages::{token_from_header, verify_jwt, JwtOptions};
//!
//! let auth = verify_jwt(JwtOptions::new(
//!     token_from_header("authorization"),
//!     |_request| async { Some(DecodingKey::from_secret(b"testsecret")) },
//! ));
//! ```

use crate::stages::cookie::Cookies;
use crate::stages::headers::SanitizedHeaders;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use strata_core::{
    handler_fn, BoxFuture, BoxHandler, Context, Event, Handler, HttpError, Middleware,
};

/// Default header carrying the token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Default cookie carrying the token.
pub const AUTHENTICATION_COOKIE: &str = "authentication";

/// Verified token claims.
#[derive(Debug, Clone, PartialEq)]
pub struct User(pub Value);

impl User {
    /// The verified claims.
    pub fn claims(&self) -> &Value {
        &self.0
    }

    /// The `sub` claim.
    pub fn subject(&self) -> Option<&str> {
        self.0.get("sub").and_then(Value::as_str)
    }
}

/// A token decoded without verification.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    /// The token header.
    pub header: Header,
    /// The token payload.
    pub payload: Value,
}

/// Decodes a token's header and payload without checking the signature.
///
/// Returns `None` for anything that is not a three-part JWT with a JSON
/// header and payload.
pub fn decode_unverified(token: &str) -> Option<DecodedToken> {
    let header = jsonwebtoken::decode_header(token).ok()?;
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return None,
    };
    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let payload = serde_json::from_slice(&bytes).ok()?;
    Some(DecodedToken { header, payload })
}

/// Input of the key resolver.
#[derive(Debug, Clone)]
pub struct SecretRequest {
    /// The raw token.
    pub token: String,
    /// The event being authenticated.
    pub event: Event,
    /// The token decoded without verification.
    pub decoded: DecodedToken,
}

type TokenGetter = Arc<dyn Fn(&Event) -> Option<String> + Send + Sync>;
type SecretResolver =
    Arc<dyn Fn(SecretRequest) -> BoxFuture<'static, Option<DecodingKey>> + Send + Sync>;

/// Configuration for [`VerifyJwt`].
#[derive(Clone)]
pub struct JwtOptions {
    token: TokenGetter,
    secret: SecretResolver,
    validation: Validation,
}

impl JwtOptions {
    /// Creates options from a token getter and an async key resolver.
    ///
    /// Tokens are verified as HS256 by default. An `exp` claim is checked
    /// when present but not required, and audiences are not checked; use
    /// [`JwtOptions::with_validation`] to change that.
    pub fn new<T, S, Fut>(token: T, secret: S) -> Self
    where
        T: Fn(&Event) -> Option<String> + Send + Sync + 'static,
        S: Fn(SecretRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<DecodingKey>> + Send + 'static,
    {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        Self {
            token: Arc::new(token),
            secret: Arc::new(move |request| Box::pin(secret(request))),
            validation,
        }
    }

    /// Replaces the validation rules.
    pub fn with_validation(mut self, validation: Validation) -> Self {
        self.validation = validation;
        self
    }

    /// The validation rules.
    pub fn validation(&self) -> &Validation {
        &self.validation
    }
}

impl fmt::Debug for JwtOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtOptions")
            .field("validation", &self.validation)
            .finish_non_exhaustive()
    }
}

/// Reads a token from a header of the form `<scheme> <token>`.
///
/// Requires [`SanitizedHeaders`]. `name` is matched case-insensitively.
pub fn token_from_header(
    name: impl Into<String>,
) -> impl Fn(&Event) -> Option<String> + Send + Sync + 'static {
    let name = name.into().to_ascii_lowercase();
    move |event: &Event| {
        let value = event.get::<SanitizedHeaders>()?.non_empty(&name)?;
        value.split(' ').nth(1).map(str::to_string)
    }
}

/// Reads a token from a cookie. Requires [`Cookies`].
pub fn token_from_cookie(
    field: impl Into<String>,
) -> impl Fn(&Event) -> Option<String> + Send + Sync + 'static {
    let field = field.into();
    move |event: &Event| {
        event
            .get::<Cookies>()?
            .get(&field)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }
}

#[derive(Debug, thiserror::Error)]
enum Rejection {
    #[error("no token")]
    MissingToken,
    #[error("token is not a decodable JWT")]
    Malformed,
    #[error("no verification key for token")]
    MissingKey,
    #[error("verification failed: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
}

impl JwtOptions {
    async fn authenticate(&self, event: &Event) -> Result<Value, Rejection> {
        let token = (self.token)(event).ok_or(Rejection::MissingToken)?;
        let decoded = decode_unverified(&token).ok_or(Rejection::Malformed)?;
        let key = (self.secret)(SecretRequest {
            token: token.clone(),
            event: event.clone(),
            decoded,
        })
        .await
        .ok_or(Rejection::MissingKey)?;
        let data = jsonwebtoken::decode::<Value>(&token, &key, &self.validation)?;
        Ok(data.claims)
    }
}

/// JWT verification middleware. See the [module docs](self).
#[derive(Debug, Clone)]
pub struct VerifyJwt {
    options: Arc<JwtOptions>,
}

/// Creates the JWT verification middleware.
pub fn verify_jwt(options: JwtOptions) -> VerifyJwt {
    VerifyJwt {
        options: Arc::new(options),
    }
}

impl<R: 'static> Middleware<R> for VerifyJwt {
    fn name(&self) -> &'static str {
        "verify_jwt"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<R> {
        let options = Arc::clone(&self.options);
        handler_fn(move |event: Event, ctx: Context| {
            let inner = Arc::clone(&inner);
            let options = Arc::clone(&options);
            async move {
                match options.authenticate(&event).await {
                    Ok(claims) => inner.call(event.with(User(claims)), ctx).await,
                    Err(rejection) => {
                        tracing::debug!(reason = %rejection, "rejecting JWT");
                        Err(HttpError::unauthorized().into())
                    }
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey};
    use serde_json::json;
    use std::time::{SystemTime, UNIX_EPOCH};
    use strata_core::ProxyResult;

    const SECRET: &[u8] = b"testsecret";

    fn sign(claims: &Value, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_string);
        encode(&header, claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn now() -> u64 {
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
    }

    fn fixed_token(token: Option<String>) -> JwtOptions {
        JwtOptions::new(
            move |_event: &Event| token.clone(),
            |_request: SecretRequest| async { Some(DecodingKey::from_secret(SECRET)) },
        )
    }

    fn echo_user() -> BoxHandler {
        handler_fn(|event: Event, _ctx: Context| async move {
            let user = event.require::<User>()?.claims().clone();
            Ok(ProxyResult::ok().with_body(user))
        })
        .boxed()
    }

    async fn status_of(options: JwtOptions) -> Result<Value, u16> {
        match verify_jwt(options)
            .wrap(echo_user())
            .call(Event::default(), Context::new())
            .await
        {
            Ok(result) => match result.body {
                Some(strata_core::Body::Json(claims)) => Ok(claims),
                other => panic!("unexpected body: {other:?}"),
            },
            Err(error) => Err(error.declared().and_then(HttpError::status_code).unwrap_or(0)),
        }
    }

    #[tokio::test]
    async fn test_valid_token_adds_user() {
        let claims = json!({ "name": "bob" });
        let token = sign(&claims, None);
        assert_eq!(status_of(fixed_token(Some(token))).await, Ok(claims));
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let token = sign(&json!({ "name": "bob", "exp": now() - 3600 }), None);
        assert_eq!(status_of(fixed_token(Some(token))).await, Err(401));
    }

    #[tokio::test]
    async fn test_missing_token_is_rejected() {
        assert_eq!(status_of(fixed_token(None)).await, Err(401));
    }

    #[tokio::test]
    async fn test_garbage_token_is_rejected() {
        assert_eq!(status_of(fixed_token(Some("not.a.jwt".into()))).await, Err(401));
    }

    #[tokio::test]
    async fn test_wrong_key_is_rejected() {
        let token = sign(&json!({ "name": "bob" }), None);
        let options = JwtOptions::new(
            move |_event: &Event| Some(token.clone()),
            |_request: SecretRequest| async { Some(DecodingKey::from_secret(b"other")) },
        );
        assert_eq!(status_of(options).await, Err(401));
    }

    #[tokio::test]
    async fn test_resolver_sees_decoded_token() {
        let token = sign(&json!({ "iss": "tenant-a" }), Some("key-1"));
        let options = JwtOptions::new(
            move |_event: &Event| Some(token.clone()),
            |request: SecretRequest| async move {
                let kid = request.decoded.header.kid.as_deref();
                let issuer = request.decoded.payload.get("iss").and_then(Value::as_str);
                (kid == Some("key-1") && issuer == Some("tenant-a"))
                    .then(|| DecodingKey::from_secret(SECRET))
            },
        );
        assert_eq!(status_of(options).await, Ok(json!({ "iss": "tenant-a" })));
    }

    #[tokio::test]
    async fn test_resolver_without_key_rejects() {
        let token = sign(&json!({ "name": "bob" }), None);
        let options = JwtOptions::new(
            move |_event: &Event| Some(token.clone()),
            |_request: SecretRequest| async { None },
        );
        assert_eq!(status_of(options).await, Err(401));
    }

    #[test]
    fn test_token_from_header() {
        let getter = token_from_header("Authorization");
        let event = Event::default().with(SanitizedHeaders::from_iter([(
            "authorization",
            "Bearer TOKEN",
        )]));
        assert_eq!(getter(&event), Some("TOKEN".to_string()));

        let custom = token_from_header("auth");
        let event = Event::default().with(SanitizedHeaders::from_iter([("auth", "Bearer T2")]));
        assert_eq!(custom(&event), Some("T2".to_string()));

        let empty = Event::default().with(SanitizedHeaders::default());
        assert_eq!(getter(&empty), None);
    }

    #[test]
    fn test_token_from_cookie() {
        let getter = token_from_cookie(AUTHENTICATION_COOKIE);
        let event = Event::default().with(Cookies::parse("authentication=TOKEN").unwrap());
        assert_eq!(getter(&event), Some("TOKEN".to_string()));

        let event = Event::default().with(Cookies::parse("authentication=").unwrap());
        assert_eq!(getter(&event), None);
    }

    #[test]
    fn test_decode_unverified() {
        let token = sign(&json!({ "sub": "u-1" }), Some("k"));
        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("k"));
        assert_eq!(decoded.payload, json!({ "sub": "u-1" }));
        assert!(decode_unverified("a.b").is_none());
    }
}
