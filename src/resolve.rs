//! Locating a field's raw value among the request's sources.

use serde_json::{Map, Value};

use crate::coerce::RawValue;
use crate::tag::Source;
use crate::tree::FieldNode;
use crate::web::RequestContext;

/// The body object and lookup rules in effect at the current nesting level.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope<'a> {
    /// The JSON object body lookups read from, if any.
    pub(crate) body: Option<&'a Map<String, Value>>,
    /// Whether body-sourced leaves missing from `body` are read from the query.
    pub(crate) query_fallback: bool,
}

impl<'a> Scope<'a> {
    /// The top-level scope of a request.
    pub(crate) fn root(context: &'a RequestContext, query_fallback: bool) -> Self {
        Self {
            body: context.body_object(),
            query_fallback,
        }
    }

    /// A scope for a nested body object.
    pub(crate) fn nested(&self, body: Option<&'a Map<String, Value>>) -> Self {
        Self {
            body,
            query_fallback: self.query_fallback,
        }
    }

    /// A scope for one element of a record list. Elements never read the query.
    pub(crate) fn element(body: &'a Map<String, Value>) -> Self {
        Self {
            body: Some(body),
            query_fallback: false,
        }
    }

    /// Returns the body value stored under `key`.
    pub(crate) fn body_value(&self, key: &str) -> Option<&'a Value> {
        self.body.and_then(|body| body.get(key))
    }
}

/// Returns the raw value for a leaf, or `None` when no source carries it.
///
/// Query and header lookups use the external name; header names match in any
/// case. Body lookups use the declared name. A body-sourced leaf missing from
/// the body is read from the query under its declared name when the scope
/// allows it.
pub(crate) fn resolve<'a>(
    node: &FieldNode,
    scope: &Scope<'a>,
    context: &'a RequestContext,
) -> Option<RawValue<'a>> {
    let descriptor = node.descriptor();
    match descriptor.source {
        Source::Query => context
            .query(descriptor.external_name(node.name()))
            .map(RawValue::Text),
        Source::Header => context
            .header(descriptor.external_name(node.name()))
            .map(RawValue::Text),
        Source::Body => match scope.body_value(node.name()) {
            Some(value) => Some(RawValue::Json(value)),
            None if scope.query_fallback => context.query(node.name()).map(RawValue::Text),
            None => None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BindError;
    use crate::record::{FieldVisitor, Record};
    use crate::tree::field_tree;
    use serde_json::json;

    #[derive(Default)]
    struct Sources {
        level: f64,
        client: String,
        bandwidth: u64,
        tags: Vec<String>,
    }

    impl Record for Sources {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.field("Level", r#"hx_place:"query" hx_name:"level""#, &mut self.level)?;
            v.field("ClientIp", r#"hx_place:"header" hx_name:"X-Client-ID""#, &mut self.client)?;
            v.field("Bandwidth", r#"hx_name:"bandwidth""#, &mut self.bandwidth)?;
            v.field("Tags", "", &mut self.tags)
        }
    }

    fn context() -> RequestContext {
        let mut context = RequestContext::new();
        context.parse_query("level=2.1&Level=9&Bandwidth=7&Tags=a,b");
        context.add_header("x-client-id", "172.1.2.1");
        context.set_body(Some(json!({"Bandwidth": 5, "bandwidth": 6, "Tags": []})));
        context
    }

    fn node(name: &str) -> FieldNode {
        field_tree::<Sources>().get(name).cloned().unwrap()
    }

    #[test]
    fn query_uses_external_name() {
        let context = context();
        let scope = Scope::root(&context, true);

        assert_eq!(
            resolve(&node("Level"), &scope, &context),
            Some(RawValue::Text("2.1"))
        );
    }

    #[test]
    fn header_matches_canonical_name() {
        let context = context();
        let scope = Scope::root(&context, true);

        assert_eq!(
            resolve(&node("ClientIp"), &scope, &context),
            Some(RawValue::Text("172.1.2.1"))
        );
    }

    #[test]
    fn body_uses_declared_name() {
        let context = context();
        let scope = Scope::root(&context, true);

        assert_eq!(
            resolve(&node("Bandwidth"), &scope, &context),
            Some(RawValue::Json(&json!(5)))
        );
    }

    #[test]
    fn empty_array_is_returned_as_found() {
        let context = context();
        let scope = Scope::root(&context, true);

        assert_eq!(
            resolve(&node("Tags"), &scope, &context),
            Some(RawValue::Json(&json!([])))
        );
    }

    #[test]
    fn missing_body_key_falls_back_to_query() {
        let mut context = context();
        context.set_body(None);
        let scope = Scope::root(&context, true);

        assert_eq!(
            resolve(&node("Bandwidth"), &scope, &context),
            Some(RawValue::Text("7"))
        );
        assert_eq!(
            resolve(&node("Tags"), &scope, &context),
            Some(RawValue::Text("a,b"))
        );
    }

    #[test]
    fn fallback_can_be_disabled() {
        let mut context = context();
        context.set_body(None);
        let scope = Scope::root(&context, false);

        assert_eq!(resolve(&node("Bandwidth"), &scope, &context), None);
    }

    #[test]
    fn element_scope_never_reads_query() {
        let context = context();
        let element = json!({"Other": 1});
        let scope = Scope::element(element.as_object().unwrap());

        assert_eq!(resolve(&node("Bandwidth"), &scope, &context), None);
    }

    #[test]
    fn absent_sources_resolve_to_none() {
        let context = RequestContext::new();
        let scope = Scope::root(&context, true);

        for name in ["Level", "ClientIp", "Bandwidth", "Tags"] {
            assert_eq!(resolve(&node(name), &scope, &context), None, "{name}");
        }
    }
}
