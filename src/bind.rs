//! The bind orchestrator.
//!
//! One bind call walks the destination's cached field tree in step with the
//! record's own [`Record::visit_fields`] declaration. For every leaf it
//! resolves the raw value, applies the default, coerces, validates and only
//! then assigns. The first error aborts the walk.

use std::slice;

use serde_json::{Map, Value};

use crate::coerce::{coerce, Builtin, Coerce, DecodeFrom, RawValue, SelfDecoding, Strategy};
use crate::dictionary::{ErrorDictionary, Rejection};
use crate::error::{BindError, CoerceError};
use crate::record::{FieldVisitor, Record};
use crate::resolve::{resolve, Scope};
use crate::tree::{field_tree, FieldNode, FieldTree, NodeKind};
use crate::validate::{missing, validate};
use crate::web::{ExtractContext, RequestContext};

/// Configuration of a [`Binder`].
///
/// # Examples
///
/// ```
/// use hx_bind::{BindConfig, Binder};
///
/// let binder = Binder::new(BindConfig::default().with_query_fallback(false));
/// assert!(!binder.config().query_fallback());
/// ```
#[derive(Debug, Clone)]
pub struct BindConfig {
    errors: ErrorDictionary,
    query_fallback: bool,
}

impl Default for BindConfig {
    fn default() -> Self {
        Self {
            errors: ErrorDictionary::default(),
            query_fallback: true,
        }
    }
}

impl BindConfig {
    /// Replaces the error dictionary used by [`Binder::reject`].
    pub fn with_errors(mut self, errors: ErrorDictionary) -> Self {
        self.errors = errors;
        self
    }

    /// Enables or disables reading body fields from the query string when the
    /// body does not carry them. Enabled by default.
    pub fn with_query_fallback(mut self, enabled: bool) -> Self {
        self.query_fallback = enabled;
        self
    }

    /// Returns the error dictionary.
    pub fn errors(&self) -> &ErrorDictionary {
        &self.errors
    }

    /// Returns whether the query fallback is enabled.
    pub fn query_fallback(&self) -> bool {
        self.query_fallback
    }
}

/// Binds requests into destination records.
///
/// A `Binder` holds no per-request state and can be shared across threads.
///
/// # Examples
///
/// ```
/// use hx_bind::{BindError, Binder, FieldVisitor, Record};
///
/// #[derive(Debug, Default)]
/// struct Input {
///     bandwidth: u64,
/// }
///
/// impl Record for Input {
///     fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
///         v.field(
///             "Bandwidth",
///             r#"hx_place:"query" hx_must:"true" hx_name:"bandwidth" hx_range:"1-10""#,
///             &mut self.bandwidth,
///         )
///     }
/// }
///
/// let binder = Binder::default();
///
/// let request = http::Request::builder()
///     .uri("/?bandwidth=2")
///     .body(Vec::new())
///     .unwrap();
/// let mut input = Input::default();
/// binder.bind(&request, &mut input).unwrap();
/// assert_eq!(input.bandwidth, 2);
///
/// let request = http::Request::builder()
///     .uri("/?bandwidth=20")
///     .body(Vec::new())
///     .unwrap();
/// let err = binder.bind(&request, &mut Input::default()).unwrap_err();
/// assert_eq!(err.to_string(), "parameter bandwidth out of range [1-10]");
/// assert_eq!(binder.reject(&err).status().as_u16(), 400);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Binder {
    config: BindConfig,
}

impl Binder {
    /// Creates a binder with the given configuration.
    pub fn new(config: BindConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &BindConfig {
        &self.config
    }

    /// Binds an HTTP request with a buffered body into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`BindError::MalformedBody`] before touching any field if the
    /// body is not valid JSON, otherwise the first field error found.
    pub fn bind<B, R>(&self, request: &http::Request<B>, dest: &mut R) -> Result<(), BindError>
    where
        B: AsRef<[u8]>,
        R: Record,
    {
        let context = request.extract_context().map_err(|err| {
            tracing::debug!(error = %err, "request body rejected");
            err
        })?;
        self.bind_context(&context, dest)
    }

    /// Binds an already extracted request context into `dest`.
    ///
    /// # Errors
    ///
    /// Returns the first field error found. Fields bound before the failing
    /// one keep their new values.
    pub fn bind_context<R: Record>(
        &self,
        context: &RequestContext,
        dest: &mut R,
    ) -> Result<(), BindError> {
        let tree = field_tree::<R>();
        let span = tracing::debug_span!("bind", record = tree.type_name());
        let _enter = span.enter();

        let scope = Scope::root(context, self.config.query_fallback);
        let result = bind_record(dest, &tree, scope, context);
        if let Err(err) = &result {
            tracing::debug!(error = %err, kind = %err.kind(), "bind failed");
        }
        result
    }

    /// Renders a bind error for the client using the configured dictionary.
    pub fn reject(&self, error: &BindError) -> Rejection {
        self.config.errors.reject(error)
    }
}

/// Binds `request` into `dest` with the default configuration.
///
/// # Errors
///
/// See [`Binder::bind`].
pub fn bind_and_validate<B, R>(request: &http::Request<B>, dest: &mut R) -> Result<(), BindError>
where
    B: AsRef<[u8]>,
    R: Record,
{
    Binder::default().bind(request, dest)
}

fn bind_record<R: Record>(
    dest: &mut R,
    tree: &FieldTree,
    scope: Scope<'_>,
    context: &RequestContext,
) -> Result<(), BindError> {
    let mut visitor = BindVisitor {
        tree,
        cursor: tree.fields().iter(),
        scope,
        context,
    };
    dest.visit_fields(&mut visitor)?;

    match visitor.cursor.next() {
        Some(node) => Err(BindError::Layout {
            record: tree.type_name(),
            field: node.name(),
        }),
        None => Ok(()),
    }
}

/// Walks one record's tree alongside its field declarations.
struct BindVisitor<'t, 'a> {
    tree: &'t FieldTree,
    cursor: slice::Iter<'t, FieldNode>,
    scope: Scope<'a>,
    context: &'a RequestContext,
}

impl<'t, 'a> BindVisitor<'t, 'a> {
    fn layout(&self, name: &'static str) -> BindError {
        BindError::Layout {
            record: self.tree.type_name(),
            field: name,
        }
    }

    fn next_node(&mut self, name: &'static str) -> Result<&'t FieldNode, BindError> {
        match self.cursor.next() {
            Some(node) if node.name() == name => Ok(node),
            _ => Err(self.layout(name)),
        }
    }

    fn next_leaf(&mut self, name: &'static str) -> Result<&'t FieldNode, BindError> {
        let node = self.next_node(name)?;
        if !node.kind().is_leaf() {
            return Err(self.layout(name));
        }
        Ok(node)
    }

    fn bind_leaf<S: Strategy>(&self, node: &FieldNode, slot: &mut S::Target) -> Result<(), BindError> {
        let resolved = match resolve(node, &self.scope, self.context) {
            Some(raw) => convert::<S>(node, raw)?,
            None => None,
        };

        let value = match (resolved, node.descriptor().default.as_deref()) {
            (Some(value), _) => Some(value),
            (None, Some(text)) => convert::<S>(node, RawValue::Text(text))?,
            (None, None) => None,
        };

        validate::<S>(node, value.as_ref())?;

        if let Some(value) = value {
            tracing::trace!(
                field = node.name(),
                source = %node.descriptor().source,
                "field bound"
            );
            *slot = value;
        }
        Ok(())
    }

    /// Returns the body sub-object for a nested record.
    fn sub_object(&self, node: &FieldNode) -> Result<Option<&'a Map<String, Value>>, BindError> {
        match self.scope.body_value(node.name()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(object)) => Ok(Some(object)),
            Some(other) => Err(BindError::TypeCoercionFailure {
                field: node.reported_name().to_string(),
                raw: other.to_string(),
                target: node.type_name(),
                cause: CoerceError::expected("object"),
            }),
        }
    }
}

fn convert<S: Strategy>(node: &FieldNode, raw: RawValue<'_>) -> Result<Option<S::Target>, BindError> {
    coerce::<S>(raw).map_err(|cause| BindError::TypeCoercionFailure {
        field: node.reported_name().to_string(),
        raw: raw.render(),
        target: node.type_name(),
        cause,
    })
}

impl FieldVisitor for BindVisitor<'_, '_> {
    fn field<F: Coerce>(
        &mut self,
        name: &'static str,
        _tag: &str,
        slot: &mut F,
    ) -> Result<(), BindError> {
        let node = self.next_leaf(name)?;
        if node.is_shadowed() {
            return Ok(());
        }
        self.bind_leaf::<Builtin<F>>(node, slot)
    }

    fn decoded<F: DecodeFrom>(
        &mut self,
        name: &'static str,
        _tag: &str,
        slot: &mut F,
    ) -> Result<(), BindError> {
        let node = self.next_leaf(name)?;
        if node.is_shadowed() {
            return Ok(());
        }
        self.bind_leaf::<SelfDecoding<F>>(node, slot)
    }

    fn embedded<R: Record>(&mut self, _name: &'static str, slot: &mut R) -> Result<(), BindError> {
        // Flattened children sit in this tree, in declaration order.
        slot.visit_fields(self)
    }

    fn nested<R: Record>(
        &mut self,
        name: &'static str,
        _tag: &str,
        slot: &mut R,
    ) -> Result<(), BindError> {
        let node = self.next_node(name)?;
        let NodeKind::Scoped { subtree, .. } = node.kind() else {
            return Err(self.layout(name));
        };
        if node.is_shadowed() {
            return Ok(());
        }

        let body = self.sub_object(node)?;
        if body.is_none() && node.descriptor().required {
            return Err(missing(node));
        }
        // An absent sub-object still binds: its fields may come from the
        // query or headers.
        bind_record(slot, &subtree(), self.scope.nested(body), self.context)
    }

    fn nested_optional<R: Record>(
        &mut self,
        name: &'static str,
        _tag: &str,
        slot: &mut Option<R>,
    ) -> Result<(), BindError> {
        let node = self.next_node(name)?;
        let NodeKind::Scoped { subtree, .. } = node.kind() else {
            return Err(self.layout(name));
        };
        if node.is_shadowed() {
            return Ok(());
        }

        match self.sub_object(node)? {
            Some(body) => {
                let record = slot.get_or_insert_with(R::default);
                bind_record(record, &subtree(), self.scope.nested(Some(body)), self.context)
            }
            None if node.descriptor().required => Err(missing(node)),
            None => Ok(()),
        }
    }

    fn records<R: Record>(
        &mut self,
        name: &'static str,
        _tag: &str,
        slot: &mut Vec<R>,
    ) -> Result<(), BindError> {
        let node = self.next_node(name)?;
        let NodeKind::RecordList { element } = node.kind() else {
            return Err(self.layout(name));
        };
        if node.is_shadowed() {
            return Ok(());
        }

        let items = match self.scope.body_value(name) {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(items),
            Some(other) => {
                return Err(BindError::TypeCoercionFailure {
                    field: node.reported_name().to_string(),
                    raw: other.to_string(),
                    target: node.type_name(),
                    cause: CoerceError::expected("array"),
                })
            }
        };

        let items = match items {
            Some(items) if !items.is_empty() => items,
            _ if node.descriptor().required => return Err(missing(node)),
            Some(_) => {
                slot.clear();
                return Ok(());
            }
            None => return Ok(()),
        };

        let tree = element();
        let mut bound = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            let Value::Object(object) = item else {
                return Err(BindError::TypeCoercionFailure {
                    field: format!("{}[{idx}]", node.reported_name()),
                    raw: item.to_string(),
                    target: tree.type_name(),
                    cause: CoerceError::expected("object"),
                });
            };

            let mut record = R::default();
            bind_record(&mut record, &tree, Scope::element(object), self.context)?;
            bound.push(record);
        }

        tracing::trace!(field = node.name(), elements = bound.len(), "record list bound");
        *slot = bound;
        Ok(())
    }
}
