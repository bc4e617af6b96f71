//! Conversion of raw request values into typed field values.
//!
//! Query and header values arrive as text, body values as decoded JSON. Built-in
//! field types implement [`Coerce`]; types that need full control over their
//! decoding, including what a JSON `null` means, implement the [`DecodeFrom`]
//! capability instead and are declared through
//! [`FieldVisitor::decoded`](crate::FieldVisitor::decoded).

use std::marker::PhantomData;

use serde_json::Value;

use crate::error::CoerceError;
use crate::tag::RangeSpec;

/// A raw value located by the resolver, before coercion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue<'a> {
    /// Text from the query string, a header, or a default.
    Text(&'a str),
    /// A value from the decoded JSON body.
    Json(&'a Value),
}

impl RawValue<'_> {
    /// Renders the raw value for error messages.
    pub fn render(&self) -> String {
        match self {
            RawValue::Text(text) => (*text).to_string(),
            RawValue::Json(value) => value.to_string(),
        }
    }
}

/// Built-in conversion from raw request values.
///
/// Implemented for the integer and float primitives, `bool`, `String`,
/// `serde_json::Value`, and for `Option<T>` and `Vec<T>` of any of those.
pub trait Coerce: Sized {
    /// Converts query, header or default text.
    fn from_text(raw: &str) -> Result<Self, CoerceError>;

    /// Converts a non-null JSON body value.
    fn from_json(raw: &Value) -> Result<Self, CoerceError>;

    /// Value produced by a JSON `null`.
    ///
    /// `Ok(None)` means the field is treated as absent, so defaults and the
    /// required check apply. This is the default.
    fn from_null() -> Result<Option<Self>, CoerceError> {
        Ok(None)
    }

    /// Whether the value counts as absent for the required check.
    fn is_empty(&self) -> bool {
        false
    }

    /// Whether the value satisfies a declared range.
    fn within(&self, _range: &RangeSpec) -> bool {
        true
    }
}

/// Self-decoding capability for field types with custom JSON handling.
///
/// The hook replaces built-in coercion entirely. It receives JSON `null` as
/// well, so a type may substitute its own sentinel instead of being treated as
/// absent.
///
/// # Examples
///
/// ```
/// use hx_bind::{CoerceError, DecodeFrom};
/// use serde_json::Value;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Timeout {
///     valued: bool,
///     seconds: i64,
/// }
///
/// impl DecodeFrom for Timeout {
///     fn decode_from(raw: &Value) -> Result<Self, CoerceError> {
///         match raw {
///             Value::Null => Ok(Timeout { valued: false, seconds: 123 }),
///             Value::Number(n) => n
///                 .as_i64()
///                 .map(|seconds| Timeout { valued: true, seconds })
///                 .ok_or_else(|| CoerceError::expected("integer")),
///             _ => Err(CoerceError::expected("integer or null")),
///         }
///     }
/// }
///
/// assert_eq!(Timeout::decode_from(&Value::Null).unwrap().seconds, 123);
/// ```
pub trait DecodeFrom: Sized {
    /// Decodes the raw JSON value, including `null`.
    fn decode_from(raw: &Value) -> Result<Self, CoerceError>;

    /// Whether the value satisfies a declared range. No constraint by default.
    fn within(&self, _range: &RangeSpec) -> bool {
        true
    }
}

/// How a leaf field is converted; chosen by the field's declaration.
pub(crate) trait Strategy {
    type Target;

    fn from_text(raw: &str) -> Result<Self::Target, CoerceError>;
    fn from_json(raw: &Value) -> Result<Self::Target, CoerceError>;
    fn from_null() -> Result<Option<Self::Target>, CoerceError>;
    fn is_empty(value: &Self::Target) -> bool;
    fn within(value: &Self::Target, range: &RangeSpec) -> bool;
}

/// Conversion through [`Coerce`].
pub(crate) struct Builtin<F>(PhantomData<F>);

impl<F: Coerce> Strategy for Builtin<F> {
    type Target = F;

    fn from_text(raw: &str) -> Result<F, CoerceError> {
        F::from_text(raw)
    }

    fn from_json(raw: &Value) -> Result<F, CoerceError> {
        F::from_json(raw)
    }

    fn from_null() -> Result<Option<F>, CoerceError> {
        F::from_null()
    }

    fn is_empty(value: &F) -> bool {
        value.is_empty()
    }

    fn within(value: &F, range: &RangeSpec) -> bool {
        value.within(range)
    }
}

/// Conversion through [`DecodeFrom`].
pub(crate) struct SelfDecoding<F>(PhantomData<F>);

impl<F: DecodeFrom> Strategy for SelfDecoding<F> {
    type Target = F;

    fn from_text(raw: &str) -> Result<F, CoerceError> {
        F::decode_from(&text_as_json(raw))
    }

    fn from_json(raw: &Value) -> Result<F, CoerceError> {
        F::decode_from(raw)
    }

    fn from_null() -> Result<Option<F>, CoerceError> {
        F::decode_from(&Value::Null).map(Some)
    }

    fn is_empty(_value: &F) -> bool {
        false
    }

    fn within(value: &F, range: &RangeSpec) -> bool {
        value.within(range)
    }
}

/// Converts a resolved raw value.
///
/// Returns `Ok(None)` when a JSON `null` is to be treated as absent.
pub(crate) fn coerce<S: Strategy>(raw: RawValue<'_>) -> Result<Option<S::Target>, CoerceError> {
    match raw {
        RawValue::Text(text) => S::from_text(text).map(Some),
        RawValue::Json(Value::Null) => S::from_null(),
        RawValue::Json(value) => S::from_json(value).map(Some),
    }
}

macro_rules! coerce_integer {
    ($($ty:ty),* $(,)?) => {$(
        impl Coerce for $ty {
            fn from_text(raw: &str) -> Result<Self, CoerceError> {
                raw.trim()
                    .parse::<$ty>()
                    .map_err(|e| CoerceError::new(e.to_string()))
            }

            fn from_json(raw: &Value) -> Result<Self, CoerceError> {
                let Value::Number(number) = raw else {
                    return Err(CoerceError::expected("number"));
                };
                if let Some(v) = number.as_i64() {
                    return <$ty>::try_from(v).map_err(|e| CoerceError::new(e.to_string()));
                }
                if let Some(v) = number.as_u64() {
                    return <$ty>::try_from(v).map_err(|e| CoerceError::new(e.to_string()));
                }
                Err(CoerceError::new(format!("{number} is not an integer")))
            }

            fn within(&self, range: &RangeSpec) -> bool {
                range.contains_typed(self, *self as f64)
            }
        }
    )*};
}

coerce_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl Coerce for f64 {
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        raw.trim()
            .parse::<f64>()
            .map_err(|e| CoerceError::new(e.to_string()))
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        match raw {
            Value::Number(number) => number
                .as_f64()
                .ok_or_else(|| CoerceError::new(format!("{number} is not representable as f64"))),
            _ => Err(CoerceError::expected("number")),
        }
    }

    fn within(&self, range: &RangeSpec) -> bool {
        range.contains_typed(self, *self)
    }
}

impl Coerce for f32 {
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        narrow(f64::from_text(raw)?)
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        narrow(f64::from_json(raw)?)
    }

    fn within(&self, range: &RangeSpec) -> bool {
        range.contains_typed(self, f64::from(*self))
    }
}

fn narrow(value: f64) -> Result<f32, CoerceError> {
    let narrowed = value as f32;
    if value.is_finite() && !narrowed.is_finite() {
        return Err(CoerceError::new(format!("{value} overflows f32")));
    }
    Ok(narrowed)
}

impl Coerce for bool {
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        match raw.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(CoerceError::expected("true or false")),
        }
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        raw.as_bool().ok_or_else(|| CoerceError::expected("boolean"))
    }

    fn within(&self, range: &RangeSpec) -> bool {
        range.contains_text(if *self { "true" } else { "false" })
    }
}

impl Coerce for String {
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        Ok(raw.to_string())
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        raw.as_str()
            .map(str::to_string)
            .ok_or_else(|| CoerceError::expected("string"))
    }

    fn within(&self, range: &RangeSpec) -> bool {
        range.contains_text(self)
    }
}

/// Reads query or header text as JSON when it parses as JSON, otherwise as a
/// JSON string.
fn text_as_json(raw: &str) -> Value {
    serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Free-form values keep the decoded JSON as-is. Text is read the same way
/// [`DecodeFrom`] types receive it.
impl Coerce for Value {
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        Ok(text_as_json(raw))
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        Ok(raw.clone())
    }

    fn within(&self, range: &RangeSpec) -> bool {
        match self {
            Value::Number(number) => {
                if let Some(n) = number.as_u64() {
                    range.contains_typed(&n, n as f64)
                } else if let Some(n) = number.as_i64() {
                    range.contains_typed(&n, n as f64)
                } else {
                    number.as_f64().map_or(true, |n| range.contains_number(n))
                }
            }
            Value::String(text) => range.contains_text(text),
            _ => true,
        }
    }
}

impl<T: Coerce> Coerce for Option<T> {
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        T::from_text(raw).map(Some)
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        T::from_json(raw).map(Some)
    }

    fn from_null() -> Result<Option<Self>, CoerceError> {
        Ok(T::from_null()?.map(Some))
    }

    fn is_empty(&self) -> bool {
        self.as_ref().map_or(true, T::is_empty)
    }

    fn within(&self, range: &RangeSpec) -> bool {
        self.as_ref().map_or(true, |v| v.within(range))
    }
}

impl<T: Coerce> Coerce for Vec<T> {
    /// Splits on commas; empty text is an empty collection.
    fn from_text(raw: &str) -> Result<Self, CoerceError> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        raw.split(',').map(T::from_text).collect()
    }

    fn from_json(raw: &Value) -> Result<Self, CoerceError> {
        let Value::Array(items) = raw else {
            return Err(CoerceError::expected("array"));
        };

        items
            .iter()
            .enumerate()
            .map(|(idx, item)| {
                let element = match item {
                    Value::Null => T::from_null()?,
                    other => Some(T::from_json(other)?),
                };
                element.ok_or_else(|| CoerceError::new(format!("null element at index {idx}")))
            })
            .collect()
    }

    fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    fn within(&self, range: &RangeSpec) -> bool {
        self.iter().all(|v| v.within(range))
    }
}
