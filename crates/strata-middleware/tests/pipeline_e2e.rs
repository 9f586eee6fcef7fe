//! End-to-end pipeline integration tests.
//!
//! These tests assemble realistic stacks of middlewares with `compose!` and
//! check how the stages behave together:
//!
//! 1. CORS preflight and simple responses
//! 2. Error translation inside CORS
//! 3. JSON parse → serialize round trip
//! 4. Routes with injected dependencies
//! 5. Batch iteration with a logger dependency
//! 6. Authentication in front of a handler

use jsonwebtoken::{encode, DecodingKey, EncodingKey, Header};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use strata_core::{
    compose, handler_fn, BatchResponse, Body, BoxHandler, Context, Dependencies, Error, Event,
    Handler, Headers, HttpError, Middleware, ProxyResult,
};
use strata_middleware::{
    stages::{
        cors, for_each_record, http_error_handler, inject, parse_cookie, parse_json, routes,
        sanitize_headers, serialize_json, token_from_cookie, verify_jwt, verify_xsrf_token,
        BatchOptions, BatchRecord, Cors, Deps, JsonBody, JwtOptions, RouteParams, SecretRequest,
        User, XsrfOptions, XsrfTokens,
    },
    ErrorLogger, LOGGER_DEPENDENCY,
};

/// Creates an HTTP event with the given method, path, headers and body.
fn http_event(method: &str, path: &str, headers: Value, body: Option<&str>) -> Event {
    Event::new(json!({
        "httpMethod": method,
        "path": path,
        "headers": headers,
        "body": body,
    }))
}

fn body_json(result: &ProxyResult) -> Value {
    match &result.body {
        Some(Body::Text(text)) => serde_json::from_str(text).unwrap(),
        other => panic!("unexpected body: {other:?}"),
    }
}

/// A standard HTTP stack around `handler`.
fn http_stack(cors: Cors, handler: BoxHandler) -> BoxHandler {
    compose![
        sanitize_headers(),
        cors,
        http_error_handler(),
        serialize_json(),
        parse_json(),
    ]
    .wrap(handler)
}

// =============================================================================
// CORS
// =============================================================================

#[tokio::test]
async fn test_preflight_short_circuits_the_stack() {
    let reached = Arc::new(Mutex::new(false));
    let flag = Arc::clone(&reached);
    let handler = http_stack(
        cors(),
        handler_fn(move |_event: Event, _ctx: Context| {
            let flag = Arc::clone(&flag);
            async move {
                *flag.lock() = true;
                Ok(ProxyResult::ok())
            }
        })
        .boxed(),
    );

    let result = handler
        .call(http_event("OPTIONS", "/", json!({}), None), Context::new())
        .await
        .unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(result.body, None);
    assert_eq!(
        result.headers,
        [
            ("Access-Control-Allow-Credentials", "true"),
            ("Access-Control-Allow-Headers", "Content-Type"),
            ("Access-Control-Allow-Methods", "GET,HEAD,PUT,PATCH,POST,DELETE"),
            ("Access-Control-Allow-Origin", "*"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect::<Headers>()
    );
    assert!(!*reached.lock());
}

#[tokio::test]
async fn test_unlisted_origin_gets_null() {
    let handler = http_stack(
        Cors::builder().allow_origins(["test"]).build(),
        handler_fn(|_event: Event, _ctx: Context| async move { Ok(ProxyResult::ok()) }).boxed(),
    );

    let result = handler
        .call(
            http_event("GET", "/", json!({ "Origin": "invalid" }), None),
            Context::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.header("Access-Control-Allow-Origin"), Some("null"));

    let result = handler
        .call(
            http_event("GET", "/", json!({ "origin": "test" }), None),
            Context::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.header("Access-Control-Allow-Origin"), Some("test"));
}

// =============================================================================
// Error translation
// =============================================================================

#[tokio::test]
async fn test_error_responses_carry_cors_headers() {
    let handler = http_stack(
        cors(),
        handler_fn(|_event: Event, _ctx: Context| async move {
            Err::<ProxyResult, _>(HttpError::not_found("No such order").into())
        })
        .boxed(),
    );

    let result = handler
        .call(http_event("GET", "/orders/9", json!({}), None), Context::new())
        .await
        .unwrap();

    assert_eq!(result.status_code, 404);
    assert_eq!(result.header("Content-Type"), Some("application/json"));
    assert_eq!(result.header("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(body_json(&result), json!({ "message": "No such order" }));
}

#[tokio::test]
async fn test_undeclared_error_is_masked() {
    let handler = http_stack(
        cors(),
        handler_fn(|_event: Event, _ctx: Context| async move {
            Err::<ProxyResult, _>(Error::other(anyhow::anyhow!("connection refused: 10.0.0.3")))
        })
        .boxed(),
    );

    let result = handler
        .call(http_event("GET", "/", json!({}), None), Context::new())
        .await
        .unwrap();

    assert_eq!(result.status_code, 500);
    assert_eq!(result.body, Some(r#"{"message":"InternalServerError"}"#.into()));
}

#[tokio::test]
async fn test_malformed_json_body_is_masked() {
    let handler = http_stack(
        cors(),
        handler_fn(|_event: Event, _ctx: Context| async move { Ok(ProxyResult::ok()) }).boxed(),
    );

    let result = handler
        .call(http_event("POST", "/", json!({}), Some("{oops")), Context::new())
        .await
        .unwrap();
    assert_eq!(result.status_code, 500);
}

// =============================================================================
// JSON round trip
// =============================================================================

#[tokio::test]
async fn test_json_round_trip() {
    let handler = http_stack(
        cors(),
        handler_fn(|event: Event, _ctx: Context| async move {
            let body = event.require::<JsonBody>()?.value().clone();
            Ok(ProxyResult::ok().with_body(body))
        })
        .boxed(),
    );

    let input = json!({ "order": { "id": 7, "items": ["a", "b"] }, "paid": false });
    let result = handler
        .call(
            http_event("POST", "/", json!({}), Some(&input.to_string())),
            Context::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.body, Some(Body::Text(input.to_string())));
}

// =============================================================================
// Routes with dependencies
// =============================================================================

#[derive(Default)]
struct UserService {
    users: Mutex<Vec<Value>>,
}

impl UserService {
    fn create(&self, mut user: Value) -> Value {
        let mut users = self.users.lock();
        user["id"] = (users.len() + 1).to_string().into();
        users.push(user.clone());
        user
    }

    fn find(&self, id: &str) -> Option<Value> {
        self.users.lock().iter().find(|user| user["id"] == id).cloned()
    }
}

fn user_api() -> BoxHandler {
    let deps = Dependencies::new().provide("users", |_| Ok(UserService::default()));

    let router = routes()
        .get(
            "/users",
            handler_fn(|event: Event, _ctx: Context| async move {
                let users = event.require::<Deps>()?.require::<UserService>("users")?;
                let list = users.users.lock().clone();
                Ok(ProxyResult::ok().with_body(Value::Array(list)))
            }),
        )
        .post(
            "/users",
            handler_fn(|event: Event, _ctx: Context| async move {
                let users = event.require::<Deps>()?.require::<UserService>("users")?;
                let created = users.create(event.require::<JsonBody>()?.value().clone());
                Ok(ProxyResult::new(201).with_body(created))
            }),
        )
        .get(
            "/users/{id}",
            handler_fn(|event: Event, _ctx: Context| async move {
                let users = event.require::<Deps>()?.require::<UserService>("users")?;
                let id = event.require::<RouteParams>()?.get("id").unwrap_or_default();
                match users.find(id) {
                    Some(user) => Ok(ProxyResult::ok().with_body(user)),
                    None => Err(HttpError::not_found("User not found").into()),
                }
            }),
        )
        .build()
        .unwrap();

    compose![
        sanitize_headers(),
        cors(),
        http_error_handler(),
        inject(deps),
        serialize_json(),
        parse_json(),
    ]
    .wrap(router.boxed())
}

#[tokio::test]
async fn test_routes_share_injected_state() {
    let api = user_api();

    let result = api
        .call(http_event("get", "/users", json!({}), None), Context::new())
        .await
        .unwrap();
    assert_eq!(result.body, Some("[]".into()));

    let result = api
        .call(http_event("get", "/users/1", json!({}), None), Context::new())
        .await
        .unwrap();
    assert_eq!(result.status_code, 404);

    let result = api
        .call(
            http_event("post", "/users", json!({}), Some(r#"{"name":"bob"}"#)),
            Context::new(),
        )
        .await
        .unwrap();
    assert_eq!(result.status_code, 201);
    assert_eq!(body_json(&result), json!({ "name": "bob", "id": "1" }));

    let result = api
        .call(http_event("GET", "/users/1", json!({}), None), Context::new())
        .await
        .unwrap();
    assert_eq!(body_json(&result), json!({ "name": "bob", "id": "1" }));

    let result = api
        .call(http_event("DELETE", "/users/1", json!({}), None), Context::new())
        .await
        .unwrap();
    assert_eq!(result.status_code, 404);
}

// =============================================================================
// Batches
// =============================================================================

#[derive(Default)]
struct Captured(Mutex<Vec<String>>);

impl ErrorLogger for Captured {
    fn error(&self, error: &Error) {
        self.0.lock().push(error.to_string());
    }
}

#[tokio::test]
async fn test_batch_failures_go_to_logger_dependency() {
    let captured = Arc::new(Captured::default());
    let logger: Arc<dyn ErrorLogger> = captured.clone();
    let deps = Dependencies::new().provide_value(LOGGER_DEPENDENCY, logger);

    let processed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&processed);
    let per_record = handler_fn(move |event: Event, _ctx: Context| {
        let sink = Arc::clone(&sink);
        async move {
            let record = event.require::<BatchRecord>()?;
            if record.body["amount"].as_i64().unwrap_or(0) < 0 {
                return Err(HttpError::bad_request("negative amount").into());
            }
            sink.lock().push(record.message_id.clone());
            Ok(())
        }
    });
    let options = BatchOptions {
        batch_item_failures: true,
        sequential: true,
    };
    let handler = inject(deps).wrap(for_each_record(options).wrap(per_record.boxed()));

    let event = Event::new(json!({
        "Records": [
            { "messageId": "m1", "body": r#"{"amount": 5}"# },
            { "messageId": "m2", "body": r#"{"amount": -1}"# },
            { "messageId": "m3", "body": r#"{"amount": 7}"# },
        ]
    }));
    let response: Option<BatchResponse> = handler.call(event, Context::new()).await.unwrap();

    assert_eq!(response.unwrap().failed_ids(), vec!["m2", "m3"]);
    assert_eq!(*processed.lock(), vec!["m1"]);
    assert_eq!(*captured.0.lock(), vec!["negative amount"]);
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_cookie_jwt_and_xsrf() {
    let token = encode(
        &Header::default(),
        &json!({ "sub": "user-1" }),
        &EncodingKey::from_secret(b"jwt-secret"),
    )
    .unwrap();
    let xsrf = XsrfTokens::new().create("xsrf-secret");

    let handler = compose![
        sanitize_headers(),
        http_error_handler(),
        parse_cookie(),
        verify_jwt(JwtOptions::new(
            token_from_cookie("authentication"),
            |_request: SecretRequest| async { Some(DecodingKey::from_secret(b"jwt-secret")) },
        )),
        verify_xsrf_token(XsrfOptions::new(|_event: Event| async {
            Some("xsrf-secret".to_string())
        })),
        serialize_json(),
    ]
    .wrap(
        handler_fn(|event: Event, _ctx: Context| async move {
            let subject = event.require::<User>()?.subject().map(str::to_string);
            Ok(ProxyResult::ok().with_body(json!({ "sub": subject })))
        })
        .boxed(),
    );

    let headers = json!({
        "Cookie": format!("authentication={token}"),
        "X-XSRF-Token": xsrf,
    });
    let result = handler
        .call(http_event("GET", "/me", headers, None), Context::new())
        .await
        .unwrap();
    assert_eq!(result.status_code, 200);
    assert_eq!(body_json(&result), json!({ "sub": "user-1" }));

    let headers = json!({ "Cookie": format!("authentication={token}") });
    let result = handler
        .call(http_event("GET", "/me", headers, None), Context::new())
        .await
        .unwrap();
    assert_eq!(result.status_code, 401);
    assert_eq!(body_json(&result), json!({ "message": "Unauthorized" }));
}
