//! Field trees: the per-type layout the bind engine walks.
//!
//! A record's field tree is built on first use from its
//! [`Record::visit_fields`] declaration and cached for the lifetime of the
//! process. Embedded records are flattened while the tree is built: their
//! fields are spliced into the parent's list in declaration order. When two
//! flattened fields share a name, the first one declared wins and the later one
//! is marked shadowed, which means it is never bound.

use std::any::{type_name, TypeId};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::coerce::{Coerce, DecodeFrom};
use crate::error::BindError;
use crate::record::{FieldVisitor, Record};
use crate::tag::{Source, TagDescriptor};

static TREES: Lazy<DashMap<TypeId, Arc<FieldTree>>> = Lazy::new(DashMap::new);

/// Returns the cached field tree of `R`, building it on first use.
///
/// Safe to call from many threads at once. If two threads build the same tree
/// concurrently, the first one stored is the one every caller receives.
///
/// # Examples
///
/// ```
/// use hx_bind::{field_tree, BindError, FieldVisitor, Record};
///
/// #[derive(Default)]
/// struct Input {
///     bandwidth: u64,
/// }
///
/// impl Record for Input {
///     fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
///         v.field("Bandwidth", r#"hx_place:"query" hx_name:"bandwidth""#, &mut self.bandwidth)
///     }
/// }
///
/// let tree = field_tree::<Input>();
/// assert_eq!(tree.fields().len(), 1);
/// assert_eq!(tree.fields()[0].name(), "Bandwidth");
/// assert_eq!(tree.fields()[0].type_name(), "u64");
/// ```
pub fn field_tree<R: Record>() -> Arc<FieldTree> {
    let id = TypeId::of::<R>();
    if let Some(tree) = TREES.get(&id) {
        return Arc::clone(tree.value());
    }

    // No map guard may be held here: building can recurse into field_tree for
    // embedded types.
    let mut builder = TreeBuilder::default();
    if let Err(err) = R::default().visit_fields(&mut builder) {
        tracing::warn!(record = type_name::<R>(), error = %err, "field declaration stopped early");
    }

    let tree = FieldTree {
        type_name: type_name::<R>(),
        fields: builder.fields,
    };
    tracing::debug!(
        record = tree.type_name,
        fields = tree.fields.len(),
        "field tree built"
    );

    Arc::clone(TREES.entry(id).or_insert_with(|| Arc::new(tree)).value())
}

/// The flattened field layout of one record type.
#[derive(Debug, Clone)]
pub struct FieldTree {
    type_name: &'static str,
    fields: Vec<FieldNode>,
}

impl FieldTree {
    /// Returns the record's type name.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the fields in declaration order, flattened members included.
    pub fn fields(&self) -> &[FieldNode] {
        &self.fields
    }

    /// Returns the field that binds under `name`, skipping shadowed ones.
    pub fn get(&self, name: &str) -> Option<&FieldNode> {
        self.fields
            .iter()
            .find(|node| !node.shadowed && node.name == name)
    }
}

/// One field of a record, as the bind engine sees it.
#[derive(Debug, Clone)]
pub struct FieldNode {
    name: &'static str,
    type_name: &'static str,
    descriptor: TagDescriptor,
    kind: NodeKind,
    placement: Placement,
    shadowed: bool,
}

impl FieldNode {
    fn new(
        name: &'static str,
        type_name: &'static str,
        descriptor: TagDescriptor,
        kind: NodeKind,
    ) -> Self {
        Self {
            name,
            type_name,
            descriptor,
            kind,
            placement: Placement::Direct,
            shadowed: false,
        }
    }

    /// Returns the declared name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the static type name of the field.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the parsed tag.
    pub fn descriptor(&self) -> &TagDescriptor {
        &self.descriptor
    }

    /// Returns how the field is bound.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Returns whether the field was declared here or flattened in.
    pub fn placement(&self) -> Placement {
        self.placement
    }

    /// Returns true if an earlier field with the same name hides this one.
    pub fn is_shadowed(&self) -> bool {
        self.shadowed
    }

    /// Name used in error messages.
    ///
    /// Body fields report their declared name; query and header fields report
    /// their external name as written in the tag.
    pub fn reported_name(&self) -> &str {
        match self.descriptor.source {
            Source::Body => self.name,
            Source::Query | Source::Header => self.descriptor.external_name(self.name),
        }
    }
}

/// How a field node is bound.
#[derive(Debug, Clone, Copy)]
pub enum NodeKind {
    /// A value converted as a whole.
    Leaf,
    /// A named nested record bound from a body sub-object.
    Scoped {
        /// Whether the record is only allocated when the sub-object exists
        optional: bool,
        /// The nested record's tree
        subtree: fn() -> Arc<FieldTree>,
    },
    /// A list of records bound from a body array.
    RecordList {
        /// The element record's tree
        element: fn() -> Arc<FieldTree>,
    },
}

impl NodeKind {
    /// Returns true for [`NodeKind::Leaf`].
    pub fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Leaf)
    }
}

/// Where a field was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Declared directly on the record.
    Direct,
    /// Promoted from an embedded record.
    Flattened {
        /// Declared name of the embedded member it came from
        via: &'static str,
    },
}

/// Records field declarations into a flat node list.
#[derive(Default)]
struct TreeBuilder {
    fields: Vec<FieldNode>,
}

impl TreeBuilder {
    fn push(&mut self, mut node: FieldNode) {
        if self
            .fields
            .iter()
            .any(|existing| !existing.shadowed && existing.name == node.name)
        {
            node.shadowed = true;
        }
        self.fields.push(node);
    }

    /// Records are only ever read from the body.
    fn body_descriptor(name: &'static str, tag: &str) -> TagDescriptor {
        let mut descriptor = TagDescriptor::parse(tag);
        if descriptor.source != Source::Body {
            tracing::warn!(
                field = name,
                source = %descriptor.source,
                "records bind from the body only; source ignored"
            );
            descriptor.source = Source::Body;
        }
        descriptor
    }
}

impl FieldVisitor for TreeBuilder {
    fn field<F: Coerce>(
        &mut self,
        name: &'static str,
        tag: &str,
        _slot: &mut F,
    ) -> Result<(), BindError> {
        self.push(FieldNode::new(
            name,
            type_name::<F>(),
            TagDescriptor::parse(tag),
            NodeKind::Leaf,
        ));
        Ok(())
    }

    fn decoded<F: DecodeFrom>(
        &mut self,
        name: &'static str,
        tag: &str,
        _slot: &mut F,
    ) -> Result<(), BindError> {
        self.push(FieldNode::new(
            name,
            type_name::<F>(),
            TagDescriptor::parse(tag),
            NodeKind::Leaf,
        ));
        Ok(())
    }

    fn embedded<R: Record>(&mut self, name: &'static str, _slot: &mut R) -> Result<(), BindError> {
        for child in field_tree::<R>().fields() {
            let mut child = child.clone();
            if child.placement == Placement::Direct {
                child.placement = Placement::Flattened { via: name };
            }
            self.push(child);
        }
        Ok(())
    }

    fn nested<R: Record>(
        &mut self,
        name: &'static str,
        tag: &str,
        _slot: &mut R,
    ) -> Result<(), BindError> {
        self.push(FieldNode::new(
            name,
            type_name::<R>(),
            Self::body_descriptor(name, tag),
            NodeKind::Scoped {
                optional: false,
                subtree: field_tree::<R>,
            },
        ));
        Ok(())
    }

    fn nested_optional<R: Record>(
        &mut self,
        name: &'static str,
        tag: &str,
        _slot: &mut Option<R>,
    ) -> Result<(), BindError> {
        self.push(FieldNode::new(
            name,
            type_name::<Option<R>>(),
            Self::body_descriptor(name, tag),
            NodeKind::Scoped {
                optional: true,
                subtree: field_tree::<R>,
            },
        ));
        Ok(())
    }

    fn records<R: Record>(
        &mut self,
        name: &'static str,
        tag: &str,
        _slot: &mut Vec<R>,
    ) -> Result<(), BindError> {
        self.push(FieldNode::new(
            name,
            type_name::<Vec<R>>(),
            Self::body_descriptor(name, tag),
            NodeKind::RecordList {
                element: field_tree::<R>,
            },
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Page {
        num: i64,
        size: i64,
    }

    impl Record for Page {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.field("PageNum", "", &mut self.num)?;
            v.field("PageSize", "", &mut self.size)
        }
    }

    #[derive(Debug, Default)]
    struct Sort {
        field: String,
        page: Page,
    }

    impl Record for Sort {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.field("SortField", "", &mut self.field)?;
            v.embedded("Page", &mut self.page)
        }
    }

    #[derive(Debug, Default)]
    struct Listing {
        sort: Sort,
        page: Page,
        name: String,
    }

    impl Record for Listing {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.embedded("Sort", &mut self.sort)?;
            v.embedded("Page", &mut self.page)?;
            v.field("Name", r#"hx_must:"true""#, &mut self.name)
        }
    }

    #[test]
    fn embedded_fields_are_spliced_in_order() {
        let tree = field_tree::<Listing>();
        let names: Vec<_> = tree.fields().iter().map(FieldNode::name).collect();

        assert_eq!(
            names,
            ["SortField", "PageNum", "PageSize", "PageNum", "PageSize", "Name"]
        );
        assert_eq!(tree.type_name(), type_name::<Listing>());
    }

    #[test]
    fn flattened_fields_record_their_origin() {
        let tree = field_tree::<Listing>();

        assert_eq!(
            tree.fields()[0].placement(),
            Placement::Flattened { via: "Sort" }
        );
        // Deeper embedding keeps the innermost member.
        assert_eq!(
            tree.fields()[1].placement(),
            Placement::Flattened { via: "Page" }
        );
        assert_eq!(tree.fields()[5].placement(), Placement::Direct);
    }

    #[test]
    fn later_duplicates_are_shadowed() {
        let tree = field_tree::<Listing>();
        let shadowed: Vec<_> = tree.fields().iter().map(FieldNode::is_shadowed).collect();

        assert_eq!(shadowed, [false, false, false, true, true, false]);
        assert!(!tree.get("PageNum").unwrap().is_shadowed());
    }

    #[derive(Debug, Default)]
    struct Quality {
        level: f64,
    }

    impl Record for Quality {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.field("Level", r#"hx_must:"true""#, &mut self.level)
        }
    }

    #[derive(Debug, Default)]
    struct Patch {
        quality: Quality,
        extra: Option<Quality>,
        history: Vec<Quality>,
    }

    impl Record for Patch {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.nested("Quality", r#"hx_place:"query""#, &mut self.quality)?;
            v.nested_optional("Extra", "", &mut self.extra)?;
            v.records("History", "", &mut self.history)
        }
    }

    #[test]
    fn nested_records_are_scoped_to_the_body() {
        let tree = field_tree::<Patch>();
        let quality = tree.get("Quality").unwrap();

        assert_eq!(quality.descriptor().source, Source::Body);
        match quality.kind() {
            NodeKind::Scoped { optional, subtree } => {
                assert!(!optional);
                assert_eq!(subtree().fields()[0].name(), "Level");
            }
            other => panic!("expected scoped node, got {other:?}"),
        }

        assert!(matches!(
            tree.get("Extra").unwrap().kind(),
            NodeKind::Scoped { optional: true, .. }
        ));
        assert!(matches!(
            tree.get("History").unwrap().kind(),
            NodeKind::RecordList { .. }
        ));
    }

    #[derive(Debug, Default)]
    struct Menu {
        title: String,
        children: Vec<Menu>,
    }

    impl Record for Menu {
        fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
            v.field("Title", "", &mut self.title)?;
            v.records("Children", "", &mut self.children)
        }
    }

    #[test]
    fn self_referential_record_lists_resolve_lazily() {
        let tree = field_tree::<Menu>();
        let NodeKind::RecordList { element } = tree.get("Children").unwrap().kind() else {
            panic!("expected record list");
        };

        assert!(Arc::ptr_eq(&element(), &tree));
    }

    #[test]
    fn trees_are_cached() {
        let first = field_tree::<Quality>();
        let second = field_tree::<Quality>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn reported_names_follow_source() {
        #[derive(Default)]
        struct Names {
            ip: String,
            level: u8,
            body: u8,
        }

        impl Record for Names {
            fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
                v.field("ClientIp", r#"hx_place:"header" hx_name:"X-Client-ID""#, &mut self.ip)?;
                v.field("Level", r#"hx_place:"query" hx_name:"level""#, &mut self.level)?;
                v.field("Body", r#"hx_name:"ignored""#, &mut self.body)
            }
        }

        let tree = field_tree::<Names>();
        let reported: Vec<_> = tree.fields().iter().map(FieldNode::reported_name).collect();
        assert_eq!(reported, ["X-Client-ID", "level", "Body"]);
    }
}
