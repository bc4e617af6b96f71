//! Per-request context holding the three value sources.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::BindError;

/// The query, header and body inputs of one request.
///
/// `RequestContext` is the framework-agnostic view the bind engine reads from.
/// It is built once per call, either from an `http::Request` through
/// [`ExtractContext`](super::ExtractContext) or from raw parts with the
/// builder-style methods below, and is never mutated during a bind.
///
/// Repeated query parameters and headers keep their first value. Header names
/// are stored in canonical form, so lookups are case-insensitive.
///
/// # Examples
///
/// ```
/// use hx_bind::web::RequestContext;
///
/// let mut context = RequestContext::new();
/// context.parse_query("bandwidth=2&dir=a%2Fb");
/// context.add_header("x-client-id", "172.1.2.1");
/// context.decode_body(br#"{"Name":"test"}"#).unwrap();
///
/// assert_eq!(context.query("bandwidth"), Some("2"));
/// assert_eq!(context.query("dir"), Some("a/b"));
/// assert_eq!(context.header("X-Client-ID"), Some("172.1.2.1"));
/// assert_eq!(context.body_object().unwrap()["Name"], "test");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Query parameters from the URL
    query: HashMap<String, String>,
    /// Request headers, keyed by canonical name
    headers: HashMap<String, String>,
    /// Decoded JSON body, if the request carried one
    body: Option<Value>,
}

impl RequestContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a query parameter. An existing value for the same key is kept.
    pub fn add_query_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.query.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Adds every parameter of a raw, percent-encoded query string.
    pub fn parse_query(&mut self, query: &str) {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            self.add_query_param(key, value);
        }
    }

    /// Adds a header. An existing value for the same name is kept.
    pub fn add_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers
            .entry(canonical_header_key(name))
            .or_insert_with(|| value.into());
    }

    /// Replaces the decoded body.
    pub fn set_body(&mut self, body: Option<Value>) {
        self.body = body;
    }

    /// Decodes a buffered request body.
    ///
    /// An empty or whitespace-only body leaves the context without a body.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::MalformedBody`] if the bytes are not valid JSON.
    pub fn decode_body(&mut self, bytes: &[u8]) -> Result<(), BindError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            self.body = None;
            return Ok(());
        }

        let value = serde_json::from_slice::<Value>(bytes).map_err(BindError::MalformedBody)?;
        self.body = Some(value);
        Ok(())
    }

    /// Returns a query parameter.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(String::as_str)
    }

    /// Returns a header value, matching the name in canonical form.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&canonical_header_key(name))
            .map(String::as_str)
    }

    /// Returns the decoded body.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Returns the decoded body when it is a JSON object.
    pub fn body_object(&self) -> Option<&Map<String, Value>> {
        self.body.as_ref().and_then(Value::as_object)
    }

    /// Returns all query parameters.
    pub fn query_params(&self) -> &HashMap<String, String> {
        &self.query
    }

    /// Returns all headers, keyed by canonical name.
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }
}

/// Returns the canonical MIME form of a header name.
///
/// The first letter and every letter following a hyphen are upper-cased, the
/// rest lower-cased: `x-client-ID` becomes `X-Client-Id`. Names that are not
/// valid header tokens are returned unchanged.
///
/// # Examples
///
/// ```
/// use hx_bind::web::canonical_header_key;
///
/// assert_eq!(canonical_header_key("x-real-ip"), "X-Real-Ip");
/// assert_eq!(canonical_header_key("X-Client-ID"), "X-Client-Id");
/// assert_eq!(canonical_header_key("bad name"), "bad name");
/// ```
pub fn canonical_header_key(name: &str) -> String {
    if http::HeaderName::from_bytes(name.as_bytes()).is_err() {
        return name.to_string();
    }

    let mut upper = true;
    name.chars()
        .map(|c| {
            let out = if upper {
                c.to_ascii_uppercase()
            } else {
                c.to_ascii_lowercase()
            };
            upper = c == '-';
            out
        })
        .collect()
}
