//! Leaf middleware stages.
//!
//! Each stage does one thing and owns one event extension:
//!
//! | Stage | Adds / consumes |
//! |-------|-----------------|
//! | [`sanitize_headers`] | adds [`SanitizedHeaders`] |
//! | [`parse_cookie`] | adds [`Cookies`] |
//! | [`parse_json`] | adds [`JsonBody`] |
//! | [`serialize_json`] | encodes [`Body::Json`](strata_core::Body) results |
//! | [`decode_parameters`] | adds [`DecodedParameters`] |
//! | [`inject`] | adds [`Deps`] |
//! | [`cors`] | requires [`SanitizedHeaders`] |
//! | [`http_error_handler`] | turns errors into responses |
//! | [`verify_jwt`] | adds [`User`] |
//! | [`verify_xsrf_token`] | requires [`SanitizedHeaders`] |
//! | [`for_each_record`] | adds [`BatchRecord`] per record |
//!
//! [`Routes`] is not a middleware but a terminal handler dispatching on
//! method and path.

pub mod batch;
pub mod cookie;
pub mod cors;
pub mod error_handler;
pub mod headers;
pub mod inject;
pub mod json;
pub mod jwt;
pub mod parameters;
pub mod routes;
pub mod xsrf;

pub use batch::{for_each_record, BatchOptions, BatchRecord, ForEachRecord};
pub use cookie::{parse_cookie, Cookies, ParseCookie};
pub use cors::{cors, AllowedHeaders, AllowedOrigin, Cors, CorsBuilder, CorsOptions};
pub use error_handler::{
    default_blacklist, http_error_handler, BlacklistItem, HttpErrorHandler,
    HttpErrorHandlerOptions,
};
pub use headers::{sanitize_headers, SanitizeHeaders, SanitizedHeaders};
pub use inject::{inject, Deps, Inject};
pub use json::{parse_json, serialize_json, JsonBody, ParseJson, SerializeJson};
pub use jwt::{
    decode_unverified, token_from_cookie, token_from_header, verify_jwt, DecodedToken,
    JwtOptions, SecretRequest, User, VerifyJwt,
};
pub use parameters::{decode_parameters, DecodeParameters, DecodedParameters};
pub use routes::{routes, RouteError, RouteParams, Routes, RoutesBuilder};
pub use xsrf::{verify_xsrf_token, VerifyXsrfToken, XsrfOptions, XsrfTokens};
