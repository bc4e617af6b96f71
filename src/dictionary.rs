//! Client-facing error codes for bind failures.
//!
//! The bind engine reports a [`BindError`]; an HTTP layer turns it into a
//! response. [`ErrorDictionary`] is the explicit mapping from each error kind to
//! an HTTP status, a machine-readable code and a numeric errno, and
//! [`Rejection`] is the rendered result.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use http::StatusCode;
use serde_json::{json, Value};

use crate::error::{BindError, BindErrorKind};

/// Status, code and errno reported for one kind of error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorCode {
    status: StatusCode,
    code: Cow<'static, str>,
    errno: i32,
}

impl ErrorCode {
    /// Creates an error code.
    pub fn new(status: StatusCode, code: impl Into<Cow<'static, str>>, errno: i32) -> Self {
        Self {
            status,
            code: code.into(),
            errno,
        }
    }

    /// Returns the HTTP status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the machine-readable code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the numeric errno.
    pub fn errno(&self) -> i32 {
        self.errno
    }

    /// The code used for anything the dictionary has no entry for.
    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "InternalError",
            i32::from(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
        )
    }
}

/// Maps error kinds to client-facing codes.
///
/// The default dictionary reports every request problem as `400 Bad Request`
/// and a layout mismatch as `500 Internal Server Error`.
///
/// # Examples
///
/// ```
/// use http::StatusCode;
/// use hx_bind::{BindErrorKind, ErrorCode, ErrorDictionary};
///
/// let dictionary = ErrorDictionary::default().with(
///     BindErrorKind::OutOfRange,
///     ErrorCode::new(StatusCode::UNPROCESSABLE_ENTITY, "ValueOutOfRange", 42201),
/// );
///
/// let code = dictionary.lookup(BindErrorKind::OutOfRange);
/// assert_eq!(code.status(), StatusCode::UNPROCESSABLE_ENTITY);
/// assert_eq!(code.code(), "ValueOutOfRange");
/// ```
#[derive(Debug, Clone)]
pub struct ErrorDictionary {
    codes: HashMap<BindErrorKind, ErrorCode>,
}

impl Default for ErrorDictionary {
    fn default() -> Self {
        let bad_request = |code: &'static str, errno| ErrorCode::new(StatusCode::BAD_REQUEST, code, errno);

        Self {
            codes: HashMap::from([
                (BindErrorKind::MalformedBody, bad_request("MalformedBody", 40001)),
                (BindErrorKind::MissingParameter, bad_request("MissingParameter", 40002)),
                (BindErrorKind::OutOfRange, bad_request("InvalidParameter", 40003)),
                (
                    BindErrorKind::TypeCoercionFailure,
                    bad_request("InvalidParameter", 40004),
                ),
                (BindErrorKind::Layout, ErrorCode::internal()),
            ]),
        }
    }
}

impl ErrorDictionary {
    /// Replaces the code reported for `kind`.
    pub fn with(mut self, kind: BindErrorKind, code: ErrorCode) -> Self {
        self.codes.insert(kind, code);
        self
    }

    /// Returns the code for `kind`.
    pub fn lookup(&self, kind: BindErrorKind) -> ErrorCode {
        self.codes
            .get(&kind)
            .cloned()
            .unwrap_or_else(ErrorCode::internal)
    }

    /// Renders a bind error for the client.
    pub fn reject(&self, error: &BindError) -> Rejection {
        Rejection::new(self.lookup(error.kind()), error.to_string())
    }
}

/// A bind failure in client-facing form.
///
/// # Examples
///
/// ```
/// use hx_bind::{BindError, ErrorDictionary, Source};
///
/// let error = BindError::MissingParameter {
///     place: Source::Query,
///     field: "bandwidth".to_string(),
/// };
/// let rejection = ErrorDictionary::default().reject(&error);
///
/// assert_eq!(rejection.status().as_u16(), 400);
/// assert_eq!(
///     rejection.to_json().to_string(),
///     r#"{"Code":"MissingParameter","Errno":40002,"Message":"missing query parameter bandwidth"}"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    code: ErrorCode,
    message: String,
}

impl Rejection {
    /// Creates a rejection from a code and a message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status to respond with.
    pub fn status(&self) -> StatusCode {
        self.code.status
    }

    /// Returns the machine-readable code.
    pub fn code(&self) -> &str {
        self.code.code()
    }

    /// Returns the numeric errno.
    pub fn errno(&self) -> i32 {
        self.code.errno
    }

    /// Returns the human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Renders the response body: `{"Code", "Errno", "Message"}`.
    pub fn to_json(&self) -> Value {
        json!({
            "Code": self.code(),
            "Errno": self.errno(),
            "Message": self.message,
        })
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Code:{}, Errno:{}, Message:{}",
            self.code(),
            self.errno(),
            self.message
        )
    }
}
