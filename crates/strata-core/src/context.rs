//! Invocation context.
//!
//! The [`Context`] is the extra argument passed next to the event on every
//! call: the platform's invocation metadata (request id, function ARN,
//! deadline). Middlewares forward it unchanged.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Per-invocation context supplied by the hosting platform.
///
/// # Example
///
/// ```
/// use strata_core::Context;
///
/// let ctx = Context::new()
///     .with_request_id("c6af9ac6-7b61-11e6-9a41-93e8deadbeef")
///     .with_function_arn("arn:aws:lambda:eu-west-1:123456789012:function:orders");
///
/// assert_eq!(ctx.request_id(), Some("c6af9ac6-7b61-11e6-9a41-93e8deadbeef"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Context {
    request_id: Option<String>,
    invoked_function_arn: Option<String>,
    deadline: Option<SystemTime>,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the platform request id.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the invoked function ARN.
    #[must_use]
    pub fn with_function_arn(mut self, arn: impl Into<String>) -> Self {
        self.invoked_function_arn = Some(arn.into());
        self
    }

    /// Sets the deadline as milliseconds since the Unix epoch.
    #[must_use]
    pub fn with_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.deadline = Some(UNIX_EPOCH + Duration::from_millis(deadline_ms));
        self
    }

    /// Returns the platform request id.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Returns the invoked function ARN.
    pub fn invoked_function_arn(&self) -> Option<&str> {
        self.invoked_function_arn.as_deref()
    }

    /// Returns the deadline, if the platform provided one.
    pub fn deadline(&self) -> Option<SystemTime> {
        self.deadline
    }

}
