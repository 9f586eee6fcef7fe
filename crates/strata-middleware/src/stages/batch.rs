//! Per-record iteration over queue batches.
//!
//! [`for_each_record`] turns a handler of one record into a handler of a
//! whole batch event (`{"Records": [...]}`). Every record body is parsed as
//! JSON; the inner handler sees the record, body decoded, in the `record`
//! payload field and as a [`BatchRecord`] extension. Other payload fields
//! and all extensions are passed along unchanged.
//!
//! | `batch_item_failures` | `sequential` | Behaviour |
//! |-----------------------|--------------|-----------|
//! | `false` | `false` | Records run concurrently; the first error fails the batch |
//! | `false` | `true`  | Records run one by one; the first error fails the batch |
//! | `true`  | `false` | Records run concurrently; failed records are reported |
//! | `true`  | `true`  | Records run one by one; after the first failure the remaining records are reported without being processed |
//!
//! Reported failures are logged through the `"logger"` dependency, or
//! `tracing` without one.

use crate::logger::{logger_from_deps, ErrorLogger, TracingLogger};
use futures_util::future::{join_all, try_join_all};
use serde_json::Value;
use std::sync::Arc;
use strata_core::{
    handler_fn, BatchItemFailure, BatchResponse, BoxHandler, Context, Error, Event, Extensions,
    Handler, Middleware, Result,
};

/// Payload field holding the batch records.
pub const RECORDS_FIELD: &str = "Records";

/// Payload field holding the current record.
pub const RECORD_FIELD: &str = "record";

/// The record being handled.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRecord {
    /// The record's `messageId`.
    pub message_id: String,
    /// The record's decoded body.
    pub body: Value,
}

/// Configuration for [`ForEachRecord`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOptions {
    /// Report failed records instead of failing the batch.
    pub batch_item_failures: bool,
    /// Handle records one at a time, in order.
    pub sequential: bool,
}

/// Batch iteration middleware. See the [module docs](self).
#[derive(Debug, Clone, Copy, Default)]
pub struct ForEachRecord {
    options: BatchOptions,
}

/// Creates the batch iteration middleware.
pub fn for_each_record(options: BatchOptions) -> ForEachRecord {
    ForEachRecord { options }
}

impl ForEachRecord {
    /// The configured options.
    pub fn options(&self) -> BatchOptions {
        self.options
    }
}

/// Splits a batch event into one event per record.
fn split(mut event: Event) -> Vec<(String, Result<Event>)> {
    let records = match event.take_field(RECORDS_FIELD) {
        Some(Value::Array(records)) => records,
        _ => Vec::new(),
    };
    let (payload, extensions) = event.into_parts();

    records
        .into_iter()
        .map(|record| {
            let message_id = record
                .get("messageId")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let event = record_event(&payload, &extensions, &message_id, record);
            (message_id, event)
        })
        .collect()
}

fn record_event(
    payload: &Value,
    extensions: &Extensions,
    message_id: &str,
    mut record: Value,
) -> Result<Event> {
    let body = match record.get("body").and_then(Value::as_str) {
        Some(raw) => serde_json::from_str(raw)?,
        None => Value::Null,
    };
    if let Value::Object(map) = &mut record {
        map.insert("body".into(), body.clone());
    }

    Ok(Event::from_parts(payload.clone(), extensions.clone())
        .with_field(RECORD_FIELD, record)
        .with(BatchRecord {
            message_id: message_id.to_string(),
            body,
        }))
}

async fn run_one<R: 'static>(
    inner: &BoxHandler<R>,
    event: Result<Event>,
    ctx: Context,
) -> Result<()> {
    inner.call(event?, ctx).await.map(drop)
}

fn report(extensions: &Extensions, message_id: &str, error: &Error) -> BatchItemFailure {
    match logger_from_deps(extensions) {
        Some(logger) => logger.error(error),
        None => TracingLogger.error(error),
    }
    tracing::debug!(message_id, "batch record failed");
    BatchItemFailure {
        item_identifier: message_id.to_string(),
    }
}

impl ForEachRecord {
    async fn run<R: 'static>(
        options: BatchOptions,
        inner: BoxHandler<R>,
        event: Event,
        ctx: Context,
    ) -> Result<Option<BatchResponse>> {
        let extensions = event.extensions().clone();
        let records = split(event);
        tracing::debug!(records = records.len(), ?options, "handling batch");

        match (options.batch_item_failures, options.sequential) {
            (false, false) => {
                try_join_all(
                    records
                        .into_iter()
                        .map(|(_, event)| run_one(&inner, event, ctx.clone())),
                )
                .await?;
                Ok(None)
            }
            (false, true) => {
                for (_, event) in records {
                    run_one(&inner, event, ctx.clone()).await?;
                }
                Ok(None)
            }
            (true, false) => {
                let outcomes = join_all(records.into_iter().map(|(message_id, event)| {
                    let ctx = ctx.clone();
                    let inner = &inner;
                    async move { (message_id, run_one(inner, event, ctx).await) }
                }))
                .await;

                let batch_item_failures = outcomes
                    .into_iter()
                    .filter_map(|(message_id, outcome)| {
                        outcome
                            .err()
                            .map(|error| report(&extensions, &message_id, &error))
                    })
                    .collect();
                Ok(Some(BatchResponse {
                    batch_item_failures,
                }))
            }
            (true, true) => {
                let mut batch_item_failures = Vec::new();
                let mut records = records.into_iter();
                for (message_id, event) in records.by_ref() {
                    if let Err(error) = run_one(&inner, event, ctx.clone()).await {
                        batch_item_failures.push(report(&extensions, &message_id, &error));
                        break;
                    }
                }
                batch_item_failures.extend(records.map(|(message_id, _)| BatchItemFailure {
                    item_identifier: message_id,
                }));
                Ok(Some(BatchResponse {
                    batch_item_failures,
                }))
            }
        }
    }
}

impl<R: 'static> Middleware<R, Option<BatchResponse>> for ForEachRecord {
    fn name(&self) -> &'static str {
        "for_each_record"
    }

    fn wrap(&self, inner: BoxHandler<R>) -> BoxHandler<Option<BatchResponse>> {
        let options = self.options;
        handler_fn(move |event: Event, ctx: Context| {
            Self::run(options, Arc::clone(&inner), event, ctx)
        })
        .boxed()
    }
}
