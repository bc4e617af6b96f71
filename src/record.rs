//! Destination records and the visitor they describe themselves to.

use crate::coerce::{Coerce, DecodeFrom};
use crate::error::BindError;

/// A destination type the bind engine can populate.
///
/// `visit_fields` reports every field to the visitor, in declaration order,
/// together with its tag text and a mutable reference to its storage. The same
/// method is used to build the type's cached field tree and to bind each
/// request, so it must declare the same fields in the same order every time.
///
/// # Examples
///
/// ```
/// use hx_bind::{BindError, FieldVisitor, Record};
///
/// #[derive(Debug, Default)]
/// struct Page {
///     num: i64,
///     size: i64,
/// }
///
/// impl Record for Page {
///     fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
///         v.field("PageNum", r#"hx_default:"1""#, &mut self.num)?;
///         v.field("PageSize", r#"hx_range:"1-100""#, &mut self.size)
///     }
/// }
///
/// #[derive(Debug, Default)]
/// struct ListInput {
///     page: Page,
///     name: String,
/// }
///
/// impl Record for ListInput {
///     fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
///         v.embedded("Page", &mut self.page)?;
///         v.field("Name", r#"hx_must:"true""#, &mut self.name)
///     }
/// }
/// ```
pub trait Record: Default + 'static {
    /// Reports each field to `visitor` in declaration order.
    ///
    /// # Errors
    ///
    /// Propagates the first error returned by the visitor.
    fn visit_fields<V: FieldVisitor>(&mut self, visitor: &mut V) -> Result<(), BindError>;
}

/// Receives a record's field declarations.
///
/// `name` is the field's declared name: the key used for body lookups and the
/// default external name. `tag` is the field's tag text (see [`crate::tag`]).
pub trait FieldVisitor {
    /// A scalar, optional or collection field converted through [`Coerce`].
    fn field<F: Coerce>(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &mut F,
    ) -> Result<(), BindError>;

    /// A field whose type decodes itself through [`DecodeFrom`].
    fn decoded<F: DecodeFrom>(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &mut F,
    ) -> Result<(), BindError>;

    /// An embedded record whose fields are flattened into this one's namespace.
    fn embedded<R: Record>(&mut self, name: &'static str, slot: &mut R) -> Result<(), BindError>;

    /// A named nested record, bound from the body sub-object under `name`.
    fn nested<R: Record>(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &mut R,
    ) -> Result<(), BindError>;

    /// An optional nested record, allocated only when the body carries it.
    fn nested_optional<R: Record>(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &mut Option<R>,
    ) -> Result<(), BindError>;

    /// A list of records, bound element-wise from a body JSON array.
    fn records<R: Record>(
        &mut self,
        name: &'static str,
        tag: &str,
        slot: &mut Vec<R>,
    ) -> Result<(), BindError>;
}
