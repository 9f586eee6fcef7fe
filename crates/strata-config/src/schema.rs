//! Configuration schema types.
//!
//! One section per configurable middleware. Every section converts into the
//! options type its middleware is built from.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use strata_middleware::stages::{
    default_blacklist, AllowedHeaders, AllowedOrigin, BatchOptions, BlacklistItem, CorsOptions,
    HttpErrorHandlerOptions, XsrfOptions,
};

/// Allowed origin setting: a single value or a list.
///
/// ```toml
/// origin = "*"
/// # or
/// origin = ["https://app.example.com", "https://admin.example.com"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OriginSetting {
    /// Always send this value.
    One(String),
    /// Echo the request origin when it is listed.
    Many(Vec<String>),
}

/// CORS configuration section.
///
/// # Example
///
/// ```
/// use strata_config::CorsSection;
///
/// let section = CorsSection::default();
/// assert!(section.preflight);
/// assert_eq!(section.methods, ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CorsSection {
    /// Answer `OPTIONS` requests directly.
    #[serde(default = "default_true")]
    pub preflight: bool,

    /// Allowed origin. Ignored when `echo_origin` is set.
    #[serde(default = "default_origin")]
    pub origin: OriginSetting,

    /// Echo the request origin, whatever it is.
    #[serde(default)]
    pub echo_origin: bool,

    /// Value of `Access-Control-Allow-Credentials`.
    #[serde(default = "default_true")]
    pub credentials: bool,

    /// Allowed request headers. Ignored when `echo_request_headers` is set.
    #[serde(default = "default_headers")]
    pub headers: Vec<String>,

    /// Echo `Access-Control-Request-Headers` on preflight.
    #[serde(default)]
    pub echo_request_headers: bool,

    /// Allowed methods.
    #[serde(default = "default_methods")]
    pub methods: Vec<String>,

    /// Preflight cache duration in seconds.
    #[serde(default)]
    pub max_age_secs: Option<u64>,
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            preflight: true,
            origin: default_origin(),
            echo_origin: false,
            credentials: true,
            headers: default_headers(),
            echo_request_headers: false,
            methods: default_methods(),
            max_age_secs: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_origin() -> OriginSetting {
    OriginSetting::One("*".to_string())
}

fn default_headers() -> Vec<String> {
    vec!["Content-Type".to_string()]
}

fn default_methods() -> Vec<String> {
    CorsOptions::default().methods
}

impl From<&CorsSection> for CorsOptions {
    fn from(section: &CorsSection) -> Self {
        let origin = match (&section.origin, section.echo_origin) {
            (_, true) => AllowedOrigin::Echo,
            (OriginSetting::One(value), false) => AllowedOrigin::Literal(value.clone()),
            (OriginSetting::Many(values), false) => AllowedOrigin::List(values.clone()),
        };
        let headers = if section.echo_request_headers {
            AllowedHeaders::Echo
        } else {
            AllowedHeaders::List(section.headers.clone())
        };

        Self {
            preflight: section.preflight,
            origin,
            credentials: section.credentials,
            headers,
            methods: section.methods.clone(),
            max_age: section.max_age_secs.map(Duration::from_secs),
        }
    }
}

/// One blacklist entry of the error handler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BlacklistEntry {
    /// Status code to hide. Absent matches errors without a status code.
    #[serde(default)]
    pub status_code: Option<u16>,

    /// Message sent instead.
    pub alternative_message: String,

    /// Status code sent instead.
    #[serde(default)]
    pub alternative_status_code: Option<u16>,
}

impl From<&BlacklistItem> for BlacklistEntry {
    fn from(item: &BlacklistItem) -> Self {
        Self {
            status_code: item.status_code,
            alternative_message: item.alternative_message.clone(),
            alternative_status_code: item.alternative_status_code,
        }
    }
}

impl From<&BlacklistEntry> for BlacklistItem {
    fn from(entry: &BlacklistEntry) -> Self {
        Self {
            status_code: entry.status_code,
            alternative_message: entry.alternative_message.clone(),
            alternative_status_code: entry.alternative_status_code,
        }
    }
}

/// Error handler configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ErrorHandlerSection {
    /// Status codes whose messages are replaced. Replaces the default list
    /// entirely when given.
    #[serde(default = "default_blacklist_entries")]
    pub blacklist: Vec<BlacklistEntry>,
}

impl Default for ErrorHandlerSection {
    fn default() -> Self {
        Self {
            blacklist: default_blacklist_entries(),
        }
    }
}

fn default_blacklist_entries() -> Vec<BlacklistEntry> {
    default_blacklist().iter().map(BlacklistEntry::from).collect()
}

impl From<&ErrorHandlerSection> for HttpErrorHandlerOptions {
    fn from(section: &ErrorHandlerSection) -> Self {
        Self {
            blacklist: section.blacklist.iter().map(BlacklistItem::from).collect(),
            ..Self::default()
        }
    }
}

/// Batch iteration configuration section.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BatchSection {
    /// Report failed records instead of failing the batch.
    #[serde(default)]
    pub batch_item_failures: bool,

    /// Handle records one at a time.
    #[serde(default)]
    pub sequential: bool,
}

impl From<&BatchSection> for BatchOptions {
    fn from(section: &BatchSection) -> Self {
        Self {
            batch_item_failures: section.batch_item_failures,
            sequential: section.sequential,
        }
    }
}

/// XSRF configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct XsrfSection {
    /// Header carrying the token.
    #[serde(default = "default_xsrf_header")]
    pub header_name: String,
}

impl Default for XsrfSection {
    fn default() -> Self {
        Self {
            header_name: default_xsrf_header(),
        }
    }
}

fn default_xsrf_header() -> String {
    strata_middleware::stages::xsrf::XSRF_HEADER.to_string()
}

impl XsrfSection {
    /// Applies the section to options holding the secret resolver.
    pub fn apply(&self, options: XsrfOptions) -> XsrfOptions {
        options.with_header_name(self.header_name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_middleware::stages::Cors;

    #[test]
    fn test_default_cors_matches_middleware_default() {
        assert_eq!(CorsOptions::from(&CorsSection::default()), CorsOptions::default());
        assert_eq!(
            Cors::new(CorsOptions::from(&CorsSection::default())).options(),
            &CorsOptions::default()
        );
    }

    #[test]
    fn test_origin_list_from_toml() {
        let section: CorsSection = toml::from_str(
            r#"
            origin = ["https://a.example", "https://b.example"]
            max_age_secs = 600
            "#,
        )
        .unwrap();
        let options = CorsOptions::from(&section);
        assert_eq!(
            options.origin,
            AllowedOrigin::List(vec!["https://a.example".into(), "https://b.example".into()])
        );
        assert_eq!(options.max_age, Some(Duration::from_secs(600)));
    }

    #[test]
    fn test_echo_flags_win() {
        let section = CorsSection {
            echo_origin: true,
            echo_request_headers: true,
            ..CorsSection::default()
        };
        let options = CorsOptions::from(&section);
        assert_eq!(options.origin, AllowedOrigin::Echo);
        assert_eq!(options.headers, AllowedHeaders::Echo);
    }

    #[test]
    fn test_default_blacklist_round_trips() {
        let options = HttpErrorHandlerOptions::from(&ErrorHandlerSection::default());
        assert_eq!(options.blacklist, default_blacklist());
    }

    #[test]
    fn test_blacklist_from_toml() {
        let section: ErrorHandlerSection = toml::from_str(
            r#"
            [[blacklist]]
            status_code = 404
            alternative_message = "Gone"
            alternative_status_code = 410
            "#,
        )
        .unwrap();
        let options = HttpErrorHandlerOptions::from(&section);
        assert_eq!(
            options.blacklist,
            vec![BlacklistItem::new(Some(404), "Gone").with_alternative_status(410)]
        );
    }

    #[test]
    fn test_batch_and_xsrf_sections() {
        let batch = BatchSection {
            batch_item_failures: true,
            sequential: false,
        };
        assert_eq!(
            BatchOptions::from(&batch),
            BatchOptions {
                batch_item_failures: true,
                sequential: false,
            }
        );

        let xsrf = XsrfSection {
            header_name: "X-CSRF".to_string(),
        };
        let options = xsrf.apply(XsrfOptions::new(|_event| async { None }));
        assert_eq!(options.header_name(), "x-csrf");
    }
}
