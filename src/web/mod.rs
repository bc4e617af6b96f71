//! HTTP integration surface.
//!
//! This module is the boundary between HTTP request types and the bind
//! engine. It handles:
//! - Buffering and decoding the JSON body once per request
//! - Percent-decoding the query string
//! - Canonicalizing header names
//!
//! # Integration Model
//!
//! Framework-specific code either hands an `http::Request` with a buffered body
//! to [`Binder::bind`](crate::Binder::bind), or builds a [`RequestContext`]
//! itself and calls [`Binder::bind_context`](crate::Binder::bind_context):
//!
//! ```ignore
//! let context = framework_request.extract_context()?;
//! let mut input = ListInput::default();
//! binder.bind_context(&context, &mut input)?;
//! ```

mod adapter;
mod extract;

pub use adapter::{canonical_header_key, RequestContext};
pub use extract::ExtractContext;
