use std::fmt;

use crate::tag::Source;

/// Errors that can occur while binding a request into a record.
///
/// Every variant is terminal for the current bind call. The first error found
/// during the walk is returned; errors are never aggregated.
///
/// The `Display` output of each variant is a compatibility surface: response
/// formatting layers match on it, so the wording is kept stable.
#[derive(Debug, thiserror::Error)]
pub enum BindError {
    /// The request body is not valid JSON.
    ///
    /// Raised before any field is processed, so it takes precedence over all
    /// field-level errors.
    #[error("malformed request body: {0}")]
    MalformedBody(#[source] serde_json::Error),

    /// A required value is absent, or present as an empty collection.
    #[error("missing {}parameter {field}", .place.qualifier())]
    MissingParameter {
        /// Where the value was expected to come from
        place: Source,
        /// Name reported to the client
        field: String,
    },

    /// A value was resolved but falls outside the declared range.
    #[error("parameter {field} out of range [{allowed}]")]
    OutOfRange {
        /// Name reported to the client
        field: String,
        /// The range specification as declared in the tag
        allowed: String,
    },

    /// A raw value could not be converted into the field's static type.
    #[error("invalid value {raw} for parameter {field}, expected {target}")]
    TypeCoercionFailure {
        /// Name reported to the client
        field: String,
        /// The raw text or JSON that failed to convert
        raw: String,
        /// Name of the destination type
        target: &'static str,
        /// What the conversion complained about
        #[source]
        cause: CoerceError,
    },

    /// A record's visitor did not follow the layout recorded for its type.
    ///
    /// This only happens when `Record::visit_fields` declares fields
    /// conditionally or in a different order between calls.
    #[error("field {field} does not match the declared layout of {record}")]
    Layout {
        /// Type name of the record being bound
        record: &'static str,
        /// Field name the visitor reported
        field: &'static str,
    },
}

impl BindError {
    /// Returns the kind of this error, used for error-code lookups.
    pub fn kind(&self) -> BindErrorKind {
        match self {
            BindError::MalformedBody(_) => BindErrorKind::MalformedBody,
            BindError::MissingParameter { .. } => BindErrorKind::MissingParameter,
            BindError::OutOfRange { .. } => BindErrorKind::OutOfRange,
            BindError::TypeCoercionFailure { .. } => BindErrorKind::TypeCoercionFailure,
            BindError::Layout { .. } => BindErrorKind::Layout,
        }
    }
}

/// The kind of a [`BindError`], without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindErrorKind {
    /// See [`BindError::MalformedBody`]
    MalformedBody,
    /// See [`BindError::MissingParameter`]
    MissingParameter,
    /// See [`BindError::OutOfRange`]
    OutOfRange,
    /// See [`BindError::TypeCoercionFailure`]
    TypeCoercionFailure,
    /// See [`BindError::Layout`]
    Layout,
}

impl fmt::Display for BindErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedBody => write!(f, "malformed body"),
            Self::MissingParameter => write!(f, "missing parameter"),
            Self::OutOfRange => write!(f, "out of range"),
            Self::TypeCoercionFailure => write!(f, "type coercion failure"),
            Self::Layout => write!(f, "layout mismatch"),
        }
    }
}

/// Error returned by a single value conversion.
///
/// Carries only a short description; the bind engine attaches the field name,
/// raw value and target type when it turns this into a
/// [`BindError::TypeCoercionFailure`].
///
/// # Examples
///
/// ```
/// use hx_bind::CoerceError;
///
/// let error = CoerceError::expected("number");
/// assert_eq!(error.to_string(), "expected number");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{detail}")]
pub struct CoerceError {
    detail: String,
}

impl CoerceError {
    /// Creates a conversion error with a free-form description.
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    /// Creates an error stating which kind of JSON value was expected.
    pub fn expected(what: &str) -> Self {
        Self::new(format!("expected {what}"))
    }

    /// Returns the description.
    pub fn detail(&self) -> &str {
        &self.detail
    }
}
