//! Stacks assembled from loaded configuration.

use serde_json::{json, Value};
use strata::prelude::*;

const CONFIG: &str = r#"
[cors]
origin = ["https://app.example.com"]
methods = ["GET", "POST"]
max_age_secs = 600

[[error_handler.blacklist]]
status_code = 404
alternative_message = "Gone"
alternative_status_code = 410

[batch]
batch_item_failures = true
sequential = true

[logging]
enabled = false
"#;

fn load() -> StrataConfig {
    ConfigLoader::new()
        .with_string(CONFIG, "toml")
        .unwrap()
        .load()
        .unwrap()
}

fn http_event(method: &str, headers: Value) -> Event {
    Event::new(json!({
        "httpMethod": method,
        "path": "/items/1",
        "headers": headers,
        "body": null,
    }))
}

fn http_stack(config: &StrataConfig, handler: BoxHandler) -> BoxHandler {
    compose![
        sanitize_headers(),
        Cors::new(CorsOptions::from(&config.cors)),
        HttpErrorHandler::new(HttpErrorHandlerOptions::from(&config.error_handler)),
        serialize_json(),
    ]
    .wrap(handler)
}

#[tokio::test]
async fn test_configured_preflight() {
    let config = load();
    let handler = http_stack(
        &config,
        handler_fn(|_event: Event, _ctx: Context| async move { Ok(ProxyResult::ok()) }).boxed(),
    );

    let result = handler
        .call(
            http_event("OPTIONS", json!({ "Origin": "https://app.example.com" })),
            Context::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.status_code, 200);
    assert_eq!(
        result.header("Access-Control-Allow-Origin"),
        Some("https://app.example.com")
    );
    assert_eq!(result.header("Access-Control-Allow-Methods"), Some("GET,POST"));
    assert_eq!(result.header("Access-Control-Allow-Max-Age"), Some("600"));
}

#[tokio::test]
async fn test_configured_blacklist() {
    let config = load();
    let handler = http_stack(
        &config,
        handler_fn(|_event: Event, _ctx: Context| async move {
            Err::<ProxyResult, Error>(HttpError::not_found("item 1 does not exist").into())
        })
        .boxed(),
    );

    let result = handler
        .call(http_event("GET", json!({})), Context::new())
        .await
        .unwrap();

    assert_eq!(result.status_code, 410);
    let body: Value = match &result.body {
        Some(Body::Text(text)) => serde_json::from_str(text).unwrap(),
        other => panic!("unexpected body: {other:?}"),
    };
    assert_eq!(body, json!({ "message": "Gone" }));
}

#[tokio::test]
async fn test_configured_batch() {
    let config = load();
    let per_record = handler_fn(|event: Event, _ctx: Context| async move {
        let record = event.require::<BatchRecord>()?;
        if record.message_id == "2" {
            return Err(HttpError::bad_request("rejected").into());
        }
        Ok::<_, Error>(ProxyResult::ok())
    });
    let handler = for_each_record(BatchOptions::from(&config.batch)).wrap(per_record.boxed());

    let event = Event::new(json!({
        "Records": [
            { "messageId": "1", "body": "{}" },
            { "messageId": "2", "body": "{}" },
            { "messageId": "3", "body": "{}" },
        ]
    }));
    let response = handler.call(event, Context::new()).await.unwrap().unwrap();

    assert_eq!(response.failed_ids(), vec!["2", "3"]);
}

#[test]
fn test_logging_config_carried() {
    let config = load();
    assert!(!config.logging.enabled);
    assert!(init_logging(&config.logging).is_ok());
}
