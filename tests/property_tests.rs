//! Integration property tests for hx-bind.
//!
//! These tests validate parser robustness and end-to-end binding invariants
//! using property-based testing.

use hx_bind::web::{canonical_header_key, RequestContext};
use hx_bind::{BindError, Binder, FieldVisitor, RangeSpec, Record, Source, TagDescriptor};
use proptest::prelude::*;

// Strategy: tag-like text built from grammar fragments and noise
fn arb_tag_text() -> impl Strategy<Value = String> {
    let fragment = prop_oneof![
        Just(r#"hx_place:"query""#.to_string()),
        Just(r#"hx_place:"header""#.to_string()),
        Just(r#"hx_must:"true""#.to_string()),
        Just(r#"hx_name:"x""#.to_string()),
        Just(r#"hx_default:"""#.to_string()),
        Just(r#"hx_range:"1-10""#.to_string()),
        Just(r#"hx_tag:";;;;""#.to_string()),
        Just("hx_must:".to_string()),
        Just("\"".to_string()),
        ".{0,12}",
    ];
    prop::collection::vec(fragment, 0..6).prop_map(|parts| parts.join(" "))
}

#[derive(Debug, Default)]
struct Paged {
    page: i64,
}

impl Record for Paged {
    fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
        v.field("Page", r#"hx_place:"query" hx_name:"page""#, &mut self.page)
    }
}

#[derive(Debug, Default)]
struct Bounded {
    level: i64,
}

impl Record for Bounded {
    fn visit_fields<V: FieldVisitor>(&mut self, v: &mut V) -> Result<(), BindError> {
        v.field("Level", r#"hx_place:"query" hx_name:"level" hx_range:"0-10""#, &mut self.level)
    }
}

proptest! {
    /// Property: Tag parsing never panics
    ///
    /// Arbitrary text, including truncated attributes and stray quotes, always
    /// yields a descriptor.
    #[test]
    fn proptest_tag_parser_never_panics(text in arb_tag_text()) {
        let descriptor = TagDescriptor::parse(&text);
        prop_assert!(!descriptor.external_name("Field").is_empty());
    }

    /// Property: Fully random tag text never panics either
    #[test]
    fn proptest_tag_parser_random_input(text in ".*") {
        let _ = TagDescriptor::parse(&text);
        let _ = TagDescriptor::parse_compact(&text);
        let _ = RangeSpec::parse(&text);
    }

    /// Property: Source names parse regardless of case
    #[test]
    fn proptest_source_case_insensitive(upper in prop::collection::vec(any::<bool>(), 6)) {
        let name: String = "header"
            .chars()
            .zip(upper)
            .map(|(c, up)| if up { c.to_ascii_uppercase() } else { c })
            .collect();
        prop_assert_eq!(Source::parse(&name), Some(Source::Header));
    }

    /// Property: Integers survive a round trip through the query string
    #[test]
    fn proptest_query_integer_binds(page in any::<i64>()) {
        let mut context = RequestContext::new();
        context.parse_query(&format!("page={page}"));

        let mut dest = Paged::default();
        Binder::default().bind_context(&context, &mut dest).unwrap();
        prop_assert_eq!(dest.page, page);
    }

    /// Property: Header canonicalization is idempotent and case-blind
    #[test]
    fn proptest_canonical_header_idempotent(name in "[A-Za-z][A-Za-z0-9-]{0,20}") {
        let once = canonical_header_key(&name);
        prop_assert_eq!(canonical_header_key(&once), once.clone());
        prop_assert_eq!(canonical_header_key(&name.to_ascii_lowercase()), once);
    }

    /// Property: A header stored under any casing is found under any other
    #[test]
    fn proptest_header_lookup_case_blind(name in "[a-z][a-z0-9-]{0,15}", value in "[a-z0-9.]{1,12}") {
        let mut context = RequestContext::new();
        context.add_header(&name.to_ascii_uppercase(), value.clone());
        prop_assert_eq!(context.header(&name), Some(value.as_str()));
    }

    /// Property: Interval ranges are inclusive and exact
    ///
    /// The bound record accepts `0..=10` and rejects everything else with an
    /// out-of-range error.
    #[test]
    fn proptest_interval_containment(level in -10i64..20) {
        let mut context = RequestContext::new();
        context.add_query_param("level", level.to_string());

        let mut dest = Bounded::default();
        let result = Binder::default().bind_context(&context, &mut dest);

        if (0..=10).contains(&level) {
            prop_assert!(result.is_ok());
            prop_assert_eq!(dest.level, level);
        } else {
            let is_out_of_range = matches!(result, Err(BindError::OutOfRange { .. }));
            prop_assert!(is_out_of_range);
        }
    }

    /// Property: Membership ranges accept exactly their members
    #[test]
    fn proptest_membership(value in "[a-d]{1,2}") {
        let range = RangeSpec::parse("a,b,cd").unwrap();
        prop_assert_eq!(range.contains_text(&value), ["a", "b", "cd"].contains(&value.as_str()));
    }
}
