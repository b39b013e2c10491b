//! URL rule matching and rewriting.
//!
//! A [`RuleTable`] is an ordered list of [`SiteRule`]s evaluated first-match-
//! wins. Each rule constrains some of the five URL fields with a [`Matcher`]
//! and may rewrite fields through capture-group templates; it may also hand
//! the URL off to a named unwrap adapter. The table is pure data interpreted
//! by this engine — adapter implementations live behind a name registry, not
//! inside the rules.
//!
//! ## Template tokens
//!
//! | Token | Meaning |
//! |-------|---------|
//! | `#0` | Whole matched value of the field being rewritten |
//! | `#N` | Capture group N of the field being rewritten |
//! | `#{field.N}` | Capture group N of another field |
//!
//! Unconstrained fields still carry a single capture (their original value),
//! so `#0` resolves uniformly. Out-of-range indices expand to the empty
//! string; anything else after `#` is a hard error.

mod table;

pub use table::default_table;

use std::collections::HashMap;

use regex::Regex;

use crate::error::{Result, UnpasteError};
use crate::urlrec::{Field, UrlRecord};

/// How a rule constrains one URL field.
#[derive(Debug, Clone)]
pub enum Matcher {
    /// Exact string equality.
    Literal(String),
    /// Regex, search semantics. Group 0 is always the whole match.
    Pattern(Regex),
    /// Ordered alternatives; the first that matches wins.
    AnyOf(Vec<Matcher>),
}

impl Matcher {
    /// Match `value`, returning the capture list (index 0 = whole matched
    /// value, then explicit groups with unmatched ones as empty strings).
    fn captures(&self, value: &str) -> Option<Vec<String>> {
        match self {
            Matcher::Literal(s) => (s == value).then(|| vec![value.to_string()]),
            Matcher::Pattern(re) => re.captures(value).map(|caps| {
                caps.iter()
                    .map(|g| g.map_or_else(String::new, |m| m.as_str().to_string()))
                    .collect()
            }),
            Matcher::AnyOf(alternatives) => {
                alternatives.iter().find_map(|alt| alt.captures(value))
            }
        }
    }
}

/// One entry of the site table.
///
/// Immutable once built; construction is through the chained `field`/
/// `rewrite`/`adapter` methods in table order.
#[derive(Debug, Clone, Default)]
pub struct SiteRule {
    matchers: Vec<(Field, Matcher)>,
    templates: Vec<(Field, String)>,
    adapter: Option<&'static str>,
    note: Option<&'static str>,
}

impl SiteRule {
    pub fn new() -> SiteRule {
        SiteRule::default()
    }

    /// Constrain `field` to exactly `value`.
    pub fn field_eq(mut self, field: Field, value: &str) -> SiteRule {
        self.matchers.push((field, Matcher::Literal(value.to_string())));
        self
    }

    /// Constrain `field` with a regex. Panics on an invalid pattern: the
    /// table is compiled-in configuration.
    pub fn field_re(mut self, field: Field, pattern: &str) -> SiteRule {
        let re = Regex::new(pattern).expect("invalid site-rule pattern");
        self.matchers.push((field, Matcher::Pattern(re)));
        self
    }

    /// Constrain `field` to any of several literal values, tried in order.
    pub fn field_any(mut self, field: Field, values: &[&str]) -> SiteRule {
        let alternatives = values
            .iter()
            .map(|v| Matcher::Literal((*v).to_string()))
            .collect();
        self.matchers.push((field, Matcher::AnyOf(alternatives)));
        self
    }

    /// Rewrite `field` with a capture template. An empty template clears the
    /// field.
    pub fn rewrite(mut self, field: Field, template: &str) -> SiteRule {
        self.templates.push((field, template.to_string()));
        self
    }

    /// Hand matching URLs to the named unwrap adapter.
    pub fn adapter(mut self, name: &'static str) -> SiteRule {
        self.adapter = Some(name);
        self
    }

    pub fn note(mut self, note: &'static str) -> SiteRule {
        self.note = Some(note);
        self
    }

    /// Try to match, producing per-field capture lists.
    ///
    /// A rule constraining zero fields never matches — that guards against a
    /// rule accidentally becoming a catch-all.
    fn try_match(&self, url: &UrlRecord) -> Option<HashMap<Field, Vec<String>>> {
        if self.matchers.is_empty() {
            return None;
        }
        let mut captures: HashMap<Field, Vec<String>> = HashMap::new();
        for (field, matcher) in &self.matchers {
            let caps = matcher.captures(url.get(*field))?;
            captures.insert(*field, caps);
        }
        for field in Field::ALL {
            captures
                .entry(field)
                .or_insert_with(|| vec![url.get(field).to_string()]);
        }
        Some(captures)
    }
}

/// Where a matched URL goes next.
#[derive(Debug, Clone)]
pub struct Dispatch {
    /// The rewritten URL.
    pub url: UrlRecord,
    /// Adapter to hand off to; `None` means fetch the URL directly.
    pub adapter: Option<&'static str>,
    /// Fragment value, kept off the wire (it commonly carries the key).
    pub fragment: Option<String>,
    /// The matching rule's note, for diagnostics.
    pub note: Option<&'static str>,
}

/// Ordered rule table.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    rules: Vec<SiteRule>,
}

impl RuleTable {
    pub fn new(rules: Vec<SiteRule>) -> RuleTable {
        RuleTable { rules }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluate the table in order against `url`.
    ///
    /// `Ok(None)` means no rule matched (the caller reports the unknown
    /// destination); a malformed template in a matching rule is a hard error.
    pub fn match_url(&self, url: &UrlRecord) -> Result<Option<Dispatch>> {
        for rule in &self.rules {
            let Some(captures) = rule.try_match(url) else {
                continue;
            };
            let mut rewritten = url.clone();
            for (field, template) in &rule.templates {
                let value = expand(template, *field, &captures)?;
                rewritten.set(*field, value);
            }
            let fragment = rewritten.fragment.clone();
            return Ok(Some(Dispatch {
                url: rewritten,
                adapter: rule.adapter,
                fragment,
                note: rule.note,
            }));
        }
        Ok(None)
    }
}

/// Expand a rewrite template against the captured values.
fn expand(
    template: &str,
    current: Field,
    captures: &HashMap<Field, Vec<String>>,
) -> Result<String> {
    let lookup = |field: Field, index: usize| -> &str {
        captures
            .get(&field)
            .and_then(|caps| caps.get(index))
            .map_or("", String::as_str)
    };

    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '#' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(d) if d.is_ascii_digit() => {
                out.push_str(lookup(current, d as usize - '0' as usize));
            }
            Some('{') => {
                let mut token = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(t) => token.push(t),
                        None => {
                            return Err(UnpasteError::Template(format!(
                                "unterminated #{{...}} in {:?}",
                                template
                            )))
                        }
                    }
                }
                let (name, index) = token.split_once('.').ok_or_else(|| {
                    UnpasteError::Template(format!("missing '.' in #{{{}}}", token))
                })?;
                let field = Field::from_name(name).ok_or_else(|| {
                    UnpasteError::Template(format!("unknown field in #{{{}}}", token))
                })?;
                let index: usize = index.parse().map_err(|_| {
                    UnpasteError::Template(format!("bad capture index in #{{{}}}", token))
                })?;
                out.push_str(lookup(field, index));
            }
            other => {
                return Err(UnpasteError::Template(format!(
                    "'#' followed by {:?} in {:?}",
                    other, template
                )))
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> UrlRecord {
        UrlRecord::parse(s).unwrap()
    }

    #[test]
    fn host_only_rule_passes_other_fields_through() {
        let table = RuleTable::new(vec![
            SiteRule::new().field_eq(Field::Host, "example.com")
        ]);
        let dispatch = table
            .match_url(&url("https://example.com/a/b?q=1#frag"))
            .unwrap()
            .unwrap();
        assert_eq!(dispatch.url.path.as_deref(), Some("/a/b"));
        assert_eq!(dispatch.url.query.as_deref(), Some("q=1"));
        assert_eq!(dispatch.fragment.as_deref(), Some("frag"));
    }

    #[test]
    fn hash_zero_is_identity_on_unconstrained_fields() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_eq(Field::Host, "example.com")
            .rewrite(Field::Path, "#0")
            .rewrite(Field::Query, "#0")]);
        let dispatch = table
            .match_url(&url("https://example.com/keep/me?and=me"))
            .unwrap()
            .unwrap();
        assert_eq!(dispatch.url.path.as_deref(), Some("/keep/me"));
        assert_eq!(dispatch.url.query.as_deref(), Some("and=me"));
    }

    #[test]
    fn first_matching_rule_wins() {
        let table = RuleTable::new(vec![
            SiteRule::new()
                .field_eq(Field::Host, "example.com")
                .rewrite(Field::Path, "/first"),
            SiteRule::new()
                .field_eq(Field::Host, "example.com")
                .rewrite(Field::Path, "/second"),
        ]);
        let dispatch = table
            .match_url(&url("https://example.com/x"))
            .unwrap()
            .unwrap();
        assert_eq!(dispatch.url.path.as_deref(), Some("/first"));
    }

    #[test]
    fn capture_groups_feed_templates() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_eq(Field::Host, "paste.example")
            .field_re(Field::Path, r"^/p/([a-z0-9]+)$")
            .rewrite(Field::Path, "/raw/#1")]);
        let dispatch = table
            .match_url(&url("https://paste.example/p/abc123"))
            .unwrap()
            .unwrap();
        assert_eq!(dispatch.url.path.as_deref(), Some("/raw/abc123"));
    }

    #[test]
    fn cross_field_tokens_resolve() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_re(Field::Host, r"^([a-z]+)\.example\.com$")
            .rewrite(Field::Path, "/mirror/#{host.1}#0")]);
        let dispatch = table
            .match_url(&url("https://files.example.com/data"))
            .unwrap()
            .unwrap();
        assert_eq!(dispatch.url.path.as_deref(), Some("/mirror/files/data"));
    }

    #[test]
    fn pattern_without_groups_still_resolves_hash_zero() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_re(Field::Host, r"example")
            .rewrite(Field::Host, "#0.test")]);
        let dispatch = table
            .match_url(&url("https://my.example.com/x"))
            .unwrap()
            .unwrap();
        // Search semantics: the whole match is "example"
        assert_eq!(dispatch.url.host.as_deref(), Some("example.test"));
    }

    #[test]
    fn out_of_range_index_is_empty() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_eq(Field::Host, "h")
            .rewrite(Field::Path, "x#7y")]);
        let dispatch = table.match_url(&url("https://h/p")).unwrap().unwrap();
        assert_eq!(dispatch.url.path.as_deref(), Some("xy"));
    }

    #[test]
    fn unknown_token_syntax_is_a_hard_error() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_eq(Field::Host, "h")
            .rewrite(Field::Path, "#x")]);
        assert!(matches!(
            table.match_url(&url("https://h/p")),
            Err(UnpasteError::Template(_))
        ));
    }

    #[test]
    fn empty_template_clears_the_field() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_eq(Field::Host, "h")
            .rewrite(Field::Query, "")]);
        let dispatch = table.match_url(&url("https://h/p?drop=me")).unwrap().unwrap();
        assert_eq!(dispatch.url.query, None);
        assert_eq!(dispatch.url.to_fetch_url(), "https://h/p");
    }

    #[test]
    fn unconstrained_rule_never_matches() {
        let table = RuleTable::new(vec![SiteRule::new().rewrite(Field::Path, "/boom")]);
        assert!(table.match_url(&url("https://any/thing")).unwrap().is_none());
    }

    #[test]
    fn any_of_tries_alternatives_in_order() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_any(Field::Host, &["a.example", "b.example"])
            .rewrite(Field::Path, "/hit")]);
        assert!(table.match_url(&url("https://b.example/x")).unwrap().is_some());
        assert!(table.match_url(&url("https://c.example/x")).unwrap().is_none());
    }

    #[test]
    fn failed_field_rejects_whole_rule() {
        let table = RuleTable::new(vec![SiteRule::new()
            .field_eq(Field::Host, "example.com")
            .field_re(Field::Path, r"^/p/")]);
        assert!(table
            .match_url(&url("https://example.com/other"))
            .unwrap()
            .is_none());
    }
}
