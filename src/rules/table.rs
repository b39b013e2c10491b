//! The built-in site table.
//!
//! Pure configuration: hosts, patterns and rewrite templates wired to adapter
//! names. Order matters — more specific rules for a host must precede general
//! ones, because the engine commits to the first match. The engine itself
//! (../mod.rs) knows nothing about any of these entries.

use super::{RuleTable, SiteRule};
use crate::urlrec::Field;

/// Default rule table. One entry per supported hosting flavor, plus plain
/// rewrite and redirect-indirection rules.
pub fn default_table() -> RuleTable {
    RuleTable::new(vec![
        // Raw-view rewrites: turn a pretty paste URL into the raw body.
        SiteRule::new()
            .field_eq(Field::Host, "paste.debian.net")
            .field_re(Field::Path, r"^/(?:hidden/)?(\w+)/?$")
            .rewrite(Field::Path, "/plain/#1")
            .note("pretty page to plain body"),
        SiteRule::new()
            .field_any(Field::Host, &["pastebin.com", "www.pastebin.com"])
            .field_re(Field::Path, r"^/(?:raw/)?(\w+)$")
            .rewrite(Field::Host, "pastebin.com")
            .rewrite(Field::Path, "/raw/#1")
            .rewrite(Field::Query, "")
            .note("raw endpoint, tracking query stripped"),
        SiteRule::new()
            .field_re(Field::Host, r"^gist\.github\.com$")
            .field_re(Field::Path, r"^/([^/]+)/([0-9a-f]+)$")
            .rewrite(Field::Host, "gist.githubusercontent.com")
            .rewrite(Field::Path, "/#1/#2/raw")
            .note("gist page to raw content"),
        // Shorteners resolve to their destination, then the pipeline re-runs.
        SiteRule::new()
            .field_any(Field::Host, &["is.gd", "v.gd", "tinyurl.com"])
            .adapter("redirect")
            .note("follow the shortener, then re-dispatch"),
        // Client-side encrypted services, one per envelope flavor.
        SiteRule::new()
            .field_eq(Field::Host, "ezcrypt.it")
            .field_re(Field::Path, r"^/(\w+)$")
            .rewrite(Field::Path, "/data/#1")
            .adapter("ocb_hex")
            .note("colon-hex envelope, OCB2"),
        SiteRule::new()
            .field_eq(Field::Host, "paste.kde.org")
            .field_re(Field::Path, r"^/(\w+)")
            .rewrite(Field::Path, "/#1/raw")
            .adapter("salted_ofb"),
        SiteRule::new()
            .field_re(Field::Host, r"^(?:www\.)?pastee?\.org$")
            .field_re(Field::Path, r"^/(?:json/)?([a-z0-9]+)$")
            .rewrite(Field::Path, "/json/#1")
            .adapter("versioned_ofb"),
        SiteRule::new()
            .field_eq(Field::Host, "cryptb.in")
            .field_re(Field::Path, r"^/(\w+)$")
            .rewrite(Field::Path, "/raw/#1")
            .adapter("openssl_cbc")
            .note("Salted__ envelope"),
        SiteRule::new()
            .field_eq(Field::Host, "defuse.ca")
            .field_re(Field::Path, r"^/b/(\w+)")
            .rewrite(Field::Path, "/b/#1/raw")
            .adapter("mac_gated"),
        SiteRule::new()
            .field_re(Field::Host, r"^(?:www\.)?privatebin\.net$")
            .field_re(Field::Query, r"^([a-f0-9]+)$")
            .rewrite(Field::Path, "/")
            .adapter("structured_v2")
            .note("v2 JSON envelope, key in fragment"),
        SiteRule::new()
            .field_any(Field::Host, &["0bin.net", "zerobin.net"])
            .field_re(Field::Path, r"^/paste/([\w+-]+)$")
            .rewrite(Field::Path, "/paste/#1")
            .adapter("small_object")
            .note("SJCL-style JSON envelope"),
        SiteRule::new()
            .field_eq(Field::Host, "cryptobin.org")
            .field_re(Field::Path, r"^/(\w+)$")
            .adapter("challenge_post")
            .note("may demand a password POST before serving"),
        SiteRule::new()
            .field_eq(Field::Host, "pasted.sh")
            .field_re(Field::Path, r"^/(\w+)$")
            .rewrite(Field::Path, "/#1.txt")
            .adapter("keyed_header")
            .note("header block with RIPEMD key check"),
        SiteRule::new()
            .field_re(Field::Host, r"^send\.[\w.-]+$")
            .field_re(Field::Path, r"^/download/(\w+)/?$")
            .adapter("fixed_key")
            .note("fetch path derived from the fragment secret"),
    ])
}
