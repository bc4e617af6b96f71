//! Field tag grammar.
//!
//! A field's tag text uses the space-separated `key:"value"` convention:
//!
//! ```text
//! hx_place:"query" hx_must:"true" hx_name:"bandwidth" hx_default:"1" hx_range:"1-10"
//! ```
//!
//! or the compact, semicolon-delimited form carrying the same five slots in
//! order (source, name, required, default, range):
//!
//! ```text
//! hx_tag:"query;bandwidth;true;1;1-10"
//! ```
//!
//! When `hx_tag` is present it is the only interpretation: its empty slots take
//! the built-in defaults and any individual `hx_*` attributes are ignored.
//!
//! Values are matched as written. The one exception is the source name, which
//! is compared case-insensitively (`Query` selects the query string). The
//! required flag is set only by the exact text `true`.
//!
//! Parsing never fails. Unknown keys are ignored, malformed tag text stops the
//! scan at the malformed point, and a range that is neither an interval nor a
//! set degrades to no constraint.

use std::fmt;
use std::str::FromStr;

/// Key selecting the value source.
pub const TAG_SOURCE: &str = "hx_place";
/// Key marking a field as required.
pub const TAG_REQUIRED: &str = "hx_must";
/// Key overriding the external name.
pub const TAG_NAME: &str = "hx_name";
/// Key carrying the default text.
pub const TAG_DEFAULT: &str = "hx_default";
/// Key carrying the range specification.
pub const TAG_RANGE: &str = "hx_range";
/// Key carrying the compact form.
pub const TAG_COMPACT: &str = "hx_tag";

/// Which part of the request supplies a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Source {
    /// URL query string
    Query,
    /// Request headers
    Header,
    /// Decoded JSON body
    #[default]
    Body,
}

impl Source {
    /// Parses a source name, case-insensitively.
    ///
    /// Returns `None` for anything other than `query`, `header` or `body`.
    pub fn parse(text: &str) -> Option<Self> {
        if text.eq_ignore_ascii_case("query") {
            Some(Source::Query)
        } else if text.eq_ignore_ascii_case("header") {
            Some(Source::Header)
        } else if text.eq_ignore_ascii_case("body") {
            Some(Source::Body)
        } else {
            None
        }
    }

    /// Word inserted before "parameter" in missing-parameter messages.
    pub(crate) fn qualifier(&self) -> &'static str {
        match self {
            Source::Query => "query ",
            Source::Header => "header ",
            Source::Body => "",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Query => write!(f, "query"),
            Source::Header => write!(f, "header"),
            Source::Body => write!(f, "body"),
        }
    }
}

/// A declared constraint on acceptable values.
///
/// Both interpretations of the raw text are kept; the field's static type picks
/// one at validation time. Numeric fields use the inclusive interval when there
/// is one, string fields use set membership. Bounds and members are compared
/// in the field's own type, so `0-1.1` admits an `f32` of `1.1` and a `u64`
/// interval is exact past 2^53.
///
/// # Examples
///
/// ```
/// use hx_bind::RangeSpec;
///
/// let interval = RangeSpec::parse("1-10").unwrap();
/// assert_eq!(interval.interval(), Some((1.0, 10.0)));
/// assert!(interval.contains_number(10.0));
/// assert!(!interval.contains_number(11.0));
/// assert!(interval.contains_typed(&10u64, 10.0));
///
/// let set = RangeSpec::parse("eq,gt,lt,in").unwrap();
/// assert!(set.interval().is_none());
/// assert!(set.contains_text("gt"));
/// assert!(!set.contains_text("ne"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RangeSpec {
    raw: String,
    interval: Option<(f64, f64)>,
    bounds: Option<(String, String)>,
    members: Vec<String>,
}

impl RangeSpec {
    /// Parses range text. Returns `None` when the text is blank.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        let bounds = raw
            .split_once('-')
            .map(|(lo, hi)| (lo.trim().to_string(), hi.trim().to_string()));
        let interval = bounds.as_ref().and_then(|(lo, hi)| {
            Some((lo.parse::<f64>().ok()?, hi.parse::<f64>().ok()?))
        });
        let bounds = bounds.filter(|_| interval.is_some());

        let members = raw
            .split(',')
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .collect();

        Some(Self {
            raw: raw.to_string(),
            interval,
            bounds,
            members,
        })
    }

    /// Returns the range text as declared.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the inclusive numeric interval, if the text is `min-max`.
    pub fn interval(&self) -> Option<(f64, f64)> {
        self.interval
    }

    /// Returns the comma-separated members.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Checks an `f64` value. See [`contains_typed`](Self::contains_typed).
    pub fn contains_number(&self, value: f64) -> bool {
        self.contains_typed(&value, value)
    }

    /// Checks a numeric value in its own type.
    ///
    /// Uses the interval when there is one. Otherwise the members that parse
    /// as numbers form a discrete set; with no numeric members the range is no
    /// constraint.
    ///
    /// Each bound or member is parsed as `T` and compared exactly. One that
    /// `T` cannot represent, such as a fractional bound on an integer field,
    /// is compared against `approx`, the value widened to `f64`.
    pub fn contains_typed<T>(&self, value: &T, approx: f64) -> bool
    where
        T: FromStr + PartialOrd,
    {
        if let (Some((lo_text, hi_text)), Some((lo, hi))) = (&self.bounds, self.interval) {
            let above = match lo_text.parse::<T>() {
                Ok(lo) => lo <= *value,
                Err(_) => lo <= approx,
            };
            let below = match hi_text.parse::<T>() {
                Ok(hi) => *value <= hi,
                Err(_) => approx <= hi,
            };
            return above && below;
        }

        let mut numeric = self
            .members
            .iter()
            .filter_map(|m| m.parse::<f64>().ok().map(|wide| (m, wide)))
            .peekable();
        if numeric.peek().is_none() {
            return true;
        }
        numeric.any(|(text, wide)| match text.parse::<T>() {
            Ok(member) => member == *value,
            Err(_) => wide == approx,
        })
    }

    /// Checks a textual value for set membership.
    pub fn contains_text(&self, value: &str) -> bool {
        self.members.iter().any(|m| m == value)
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Normalized binding instructions for one field.
///
/// # Examples
///
/// ```
/// use hx_bind::{Source, TagDescriptor};
///
/// let tag = TagDescriptor::parse(
///     r#"hx_place:"query" hx_must:"true" hx_name:"bandwidth" hx_default:"1" hx_range:"1-10""#,
/// );
/// assert_eq!(tag.source, Source::Query);
/// assert!(tag.required);
/// assert_eq!(tag.external_name("Bandwidth"), "bandwidth");
/// assert_eq!(tag.default.as_deref(), Some("1"));
///
/// let compact = TagDescriptor::parse(r#"hx_tag:"header;X-Real-Ip;true;;""#);
/// assert_eq!(compact.source, Source::Header);
/// assert_eq!(compact.external_name("ClientIp"), "X-Real-Ip");
/// assert!(compact.default.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagDescriptor {
    /// Where the value comes from
    pub source: Source,
    /// Explicit external name, if overridden
    pub name: Option<String>,
    /// Whether absence is a binding failure
    pub required: bool,
    /// Default text, parsed per field type when the value is absent
    pub default: Option<String>,
    /// Allowed values
    pub range: Option<RangeSpec>,
}

impl TagDescriptor {
    /// Parses tag text into a descriptor. Never fails.
    pub fn parse(text: &str) -> Self {
        let attrs = attributes(text);
        let lookup = |key: &str| {
            attrs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        if let Some(compact) = lookup(TAG_COMPACT) {
            return Self::parse_compact(compact);
        }

        Self {
            source: lookup(TAG_SOURCE)
                .and_then(Source::parse)
                .unwrap_or_default(),
            name: lookup(TAG_NAME).and_then(non_empty),
            required: lookup(TAG_REQUIRED).is_some_and(parse_flag),
            default: lookup(TAG_DEFAULT).and_then(non_empty),
            range: lookup(TAG_RANGE).and_then(RangeSpec::parse),
        }
    }

    /// Parses the compact `source;name;required;default;range` form.
    ///
    /// Missing or empty slots take the built-in defaults.
    pub fn parse_compact(text: &str) -> Self {
        let mut slots = text.splitn(5, ';');
        let mut next = || slots.next().and_then(non_empty);

        let source = next().and_then(|s| Source::parse(&s)).unwrap_or_default();
        let name = next();
        let required = next().is_some_and(|s| parse_flag(&s));
        let default = next();
        let range = next().and_then(|s| RangeSpec::parse(&s));

        Self {
            source,
            name,
            required,
            default,
            range,
        }
    }

    /// Returns the name used for query and header lookups.
    ///
    /// This is the explicit name when one was given, otherwise `declared`.
    pub fn external_name<'a>(&'a self, declared: &'a str) -> &'a str {
        self.name.as_deref().unwrap_or(declared)
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn parse_flag(value: &str) -> bool {
    value == "true"
}

/// Splits tag text into `(key, value)` pairs in declaration order.
///
/// Values are double-quoted and may contain backslash escapes. Scanning stops
/// at the first malformed pair.
fn attributes(text: &str) -> Vec<(&str, String)> {
    let mut pairs = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let Some(colon) = rest.find(':') else { break };
        let key = &rest[..colon];
        if key.is_empty() || key.contains(|c: char| c.is_whitespace() || c == '"') {
            break;
        }

        let Some(quoted) = rest[colon + 1..].strip_prefix('"') else {
            break;
        };
        let Some((value, consumed)) = unquote(quoted) else {
            break;
        };

        pairs.push((key, value));
        rest = &quoted[consumed..];
    }

    pairs
}

/// Reads a quoted value whose opening quote has been stripped.
///
/// Returns the unescaped value and the number of bytes consumed, including the
/// closing quote.
fn unquote(text: &str) -> Option<(String, usize)> {
    let mut value = String::new();
    let mut chars = text.char_indices();

    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Some((value, idx + 1)),
            '\\' => {
                let (_, escaped) = chars.next()?;
                value.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => other,
                });
            }
            other => value.push(other),
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_tag_is_empty() {
        let tag = TagDescriptor::parse("");
        assert_eq!(tag, TagDescriptor::default());
        assert_eq!(tag.source, Source::Body);
        assert_eq!(tag.external_name("Bandwidth"), "Bandwidth");
    }

    #[test]
    fn parses_individual_attributes() {
        let tag = TagDescriptor::parse(
            r#"hx_place:"query" hx_must:"true" hx_name:"bandwidth" hx_default:"1" hx_range:"1-10""#,
        );

        assert_eq!(tag.source, Source::Query);
        assert!(tag.required);
        assert_eq!(tag.name.as_deref(), Some("bandwidth"));
        assert_eq!(tag.default.as_deref(), Some("1"));
        assert_eq!(tag.range.unwrap().interval(), Some((1.0, 10.0)));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let tag = TagDescriptor::parse(
            r#"hx_place:"query" hx_query_name:"bandwidth" json:"bw,omitempty" hx_must:"true""#,
        );

        assert_eq!(tag.source, Source::Query);
        assert!(tag.required);
        assert!(tag.name.is_none());
    }

    #[test]
    fn first_occurrence_of_a_key_wins() {
        let tag = TagDescriptor::parse(r#"hx_place:"header" hx_place:"query""#);
        assert_eq!(tag.source, Source::Header);
    }

    #[test]
    fn unknown_source_falls_back_to_body() {
        let tag = TagDescriptor::parse(r#"hx_place:"cookie""#);
        assert_eq!(tag.source, Source::Body);
    }

    #[test]
    fn empty_default_is_absent() {
        let tag = TagDescriptor::parse(r#"hx_default:"""#);
        assert!(tag.default.is_none());
    }

    #[test]
    fn compact_form_fills_positional_slots() {
        let tag = TagDescriptor::parse(r#"hx_tag:"query;create;true;;0-21""#);

        assert_eq!(tag.source, Source::Query);
        assert_eq!(tag.name.as_deref(), Some("create"));
        assert!(tag.required);
        assert!(tag.default.is_none());
        assert_eq!(tag.range.unwrap().interval(), Some((0.0, 21.0)));
    }

    #[test]
    fn compact_form_with_empty_slots_uses_builtin_defaults() {
        let tag = TagDescriptor::parse(r#"hx_tag:";;true;;0-21""#);

        assert_eq!(tag.source, Source::Body);
        assert!(tag.name.is_none());
        assert!(tag.required);
    }

    #[test]
    fn compact_form_wins_over_individual_attributes() {
        let tag = TagDescriptor::parse(
            r#"hx_place:"header" hx_must:"false" hx_default:"7" hx_tag:"query;;true""#,
        );

        assert_eq!(tag.source, Source::Query);
        assert!(tag.required);
        assert!(tag.default.is_none());
        assert!(tag.range.is_none());
    }

    #[test]
    fn compact_form_with_fewer_slots() {
        let tag = TagDescriptor::parse(r#"hx_tag:"header""#);
        assert_eq!(tag.source, Source::Header);
        assert!(!tag.required);
    }

    #[test]
    fn malformed_tag_keeps_what_was_parsed() {
        let tag = TagDescriptor::parse(r#"hx_place:"query" hx_must:true hx_name:"x""#);

        assert_eq!(tag.source, Source::Query);
        assert!(!tag.required);
        assert!(tag.name.is_none());
    }

    #[test]
    fn unterminated_value_is_dropped() {
        let tag = TagDescriptor::parse(r#"hx_place:"query"#);
        assert_eq!(tag.source, Source::Body);
    }

    #[test]
    fn escaped_quotes_in_values() {
        let tag = TagDescriptor::parse(r#"hx_default:"say \"hi\"""#);
        assert_eq!(tag.default.as_deref(), Some(r#"say "hi""#));
    }

    #[test]
    fn range_interval_and_members() {
        let range = RangeSpec::parse("1.2-3.4").unwrap();
        assert_eq!(range.interval(), Some((1.2, 3.4)));
        assert!(range.contains_number(1.2));
        assert!(range.contains_number(3.4));
        assert!(!range.contains_number(3.5));
        assert_eq!(range.to_string(), "1.2-3.4");
    }

    #[test]
    fn range_that_is_not_numeric_is_a_set() {
        let range = RangeSpec::parse("alice,bob").unwrap();
        assert!(range.interval().is_none());
        assert_eq!(range.members().to_vec(), vec!["alice", "bob"]);
        assert!(range.contains_text("bob"));
        assert!(!range.contains_text("carol"));
    }

    #[test]
    fn negative_lower_bound_is_not_an_interval() {
        let range = RangeSpec::parse("-5-10").unwrap();
        assert!(range.interval().is_none());
        // No numeric members either, so numbers are unconstrained.
        assert!(range.contains_number(100.0));
    }

    #[test]
    fn numeric_set_without_interval() {
        let range = RangeSpec::parse("1,2,4").unwrap();
        assert!(range.contains_number(4.0));
        assert!(!range.contains_number(3.0));
    }

    #[test]
    fn interval_compares_in_the_field_type() {
        let range = RangeSpec::parse("0-1.1").unwrap();
        assert!(range.contains_typed(&1.1f32, f64::from(1.1f32)));
        assert!(!range.contains_typed(&1.2f32, f64::from(1.2f32)));

        let range = RangeSpec::parse("0-9007199254740992").unwrap();
        let edge = 9_007_199_254_740_992u64;
        assert!(range.contains_typed(&edge, edge as f64));
        assert!(!range.contains_typed(&(edge + 1), (edge + 1) as f64));
    }

    #[test]
    fn fractional_bound_on_integer_widens() {
        let range = RangeSpec::parse("0.5-3.5").unwrap();
        assert!(range.contains_typed(&3i64, 3.0));
        assert!(!range.contains_typed(&0i64, 0.0));
        assert!(!range.contains_typed(&4i64, 4.0));
    }

    #[test]
    fn numeric_members_compare_in_the_field_type() {
        let range = RangeSpec::parse("1.1,2.5").unwrap();
        assert!(range.contains_typed(&1.1f32, f64::from(1.1f32)));

        let range = RangeSpec::parse("9007199254740993").unwrap();
        let member = 9_007_199_254_740_993u64;
        assert!(range.contains_typed(&member, member as f64));
        assert!(!range.contains_typed(&(member - 1), (member - 1) as f64));
    }

    #[test]
    fn required_flag_is_exact() {
        assert!(!TagDescriptor::parse(r#"hx_must:"TRUE""#).required);
        assert!(!TagDescriptor::parse(r#"hx_must:" true ""#).required);
        assert!(!TagDescriptor::parse(r#"hx_tag:";;True""#).required);
        assert!(TagDescriptor::parse(r#"hx_must:"true""#).required);
    }

    #[test]
    fn blank_range_is_absent() {
        assert!(RangeSpec::parse("  ").is_none());
    }

    #[test]
    fn source_parse_and_display() {
        assert_eq!(Source::parse("QUERY"), Some(Source::Query));
        assert_eq!(Source::parse("Header"), Some(Source::Header));
        assert_eq!(Source::parse(" header "), None);
        assert_eq!(Source::parse("body"), Some(Source::Body));
        assert_eq!(Source::parse("path"), None);
        assert_eq!(Source::Header.to_string(), "header");
    }
}
