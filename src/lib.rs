//! Tag-driven request binding and validation.
//!
//! Destination records describe their fields, together with a small tag
//! grammar, through the [`Record`] trait. A bind call locates each field's
//! value among three sources (query parameters, headers and the decoded JSON
//! body), applies defaults, converts the raw value into the field's type and
//! validates required-ness and ranges. It then populates the record in place,
//! or fails fast with a source-attributed [`BindError`].
//!
//! # Core Types
//!
//! - [`Record`] / [`FieldVisitor`]: how a destination type declares its fields
//! - [`TagDescriptor`]: the parsed form of a field's tag text
//! - [`Binder`] / [`BindConfig`]: the bind orchestrator and its configuration
//! - [`RequestContext`](web::RequestContext): the per-request value sources
//! - [`ErrorDictionary`] / [`Rejection`]: client-facing rendering of failures
//!
//! # Examples
//!
//! ```
//! use hx_bind::{bind_and_validate, BindError, FieldVisitor, Record};
//!
//! #[derive(Debug, Default)]
//! struct Quality {
//!     level: f64,
//! }
//!
//! impl Record for Quality {
//!     fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
//!         v.field("Level", r#"hx_must:"true""#, &mut self.level)
//!     }
//! }
//!
//! #[derive(Debug, Default)]
//! struct PatchInput {
//!     client_ip: String,
//!     bandwidth: u64,
//!     quality: Quality,
//! }
//!
//! impl Record for PatchInput {
//!     fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
//!         v.field(
//!             "ClientIp",
//!             r#"hx_place:"header" hx_name:"X-Client-ID" hx_must:"true""#,
//!             &mut self.client_ip,
//!         )?;
//!         v.field("Bandwidth", r#"hx_must:"true" hx_range:"0-10""#, &mut self.bandwidth)?;
//!         v.nested("Quality", "", &mut self.quality)
//!     }
//! }
//!
//! let request = http::Request::builder()
//!     .method("PATCH")
//!     .uri("/we?Level=2")
//!     .header("x-client-id", "172.1.2.1")
//!     .body(br#"{"Bandwidth":1, "Quality":{"Level":1.0}}"#.to_vec())
//!     .unwrap();
//!
//! let mut input = PatchInput::default();
//! bind_and_validate(&request, &mut input).unwrap();
//!
//! assert_eq!(input.client_ip, "172.1.2.1");
//! assert_eq!(input.bandwidth, 1);
//! assert_eq!(input.quality.level, 1.0);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bind;
mod coerce;
mod dictionary;
mod error;
mod record;
mod resolve;
pub mod tag;
mod tree;
mod validate;
pub mod web;

pub use bind::{bind_and_validate, BindConfig, Binder};
pub use coerce::{Coerce, DecodeFrom, RawValue};
pub use dictionary::{ErrorCode, ErrorDictionary, Rejection};
pub use error::{BindError, BindErrorKind, CoerceError};
pub use record::{FieldVisitor, Record};
pub use tag::{RangeSpec, Source, TagDescriptor};
pub use tree::{field_tree, FieldNode, FieldTree, NodeKind, Placement};
