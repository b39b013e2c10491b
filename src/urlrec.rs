//! URL record parsing and re-serialization.
//!
//! The grammar is `scheme://host path ?query #fragment` with every component
//! optional, parsed by a single anchored regex. This is deliberately looser
//! than a full RFC 3986 parser: the rule engine rewrites whole components and
//! needs the fragment kept verbatim (fragments commonly carry decryption keys
//! and must never be sent to the server), so components are plain strings with
//! no percent-decoding applied.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, UnpasteError};

static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([A-Za-z][A-Za-z0-9+.-]*)://)?([^/?#]*)?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .unwrap()
});

/// The five addressable components of a URL record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Scheme,
    Host,
    Path,
    Query,
    Fragment,
}

impl Field {
    /// All fields, in rule-evaluation order.
    pub const ALL: [Field; 5] = [
        Field::Scheme,
        Field::Host,
        Field::Path,
        Field::Query,
        Field::Fragment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Field::Scheme => "scheme",
            Field::Host => "host",
            Field::Path => "path",
            Field::Query => "query",
            Field::Fragment => "fragment",
        }
    }

    pub fn from_name(name: &str) -> Option<Field> {
        match name {
            "scheme" => Some(Field::Scheme),
            "host" => Some(Field::Host),
            "path" => Some(Field::Path),
            "query" => Some(Field::Query),
            "fragment" => Some(Field::Fragment),
            _ => None,
        }
    }
}

/// A parsed URL.
///
/// `None` and `Some("")` differ only for `query` and `fragment`, where they
/// distinguish an absent component from a present-but-empty one (`?` / `#`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UrlRecord {
    pub scheme: Option<String>,
    pub host: Option<String>,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl UrlRecord {
    /// Parse a URL string into its components.
    ///
    /// Fails with [`UnpasteError::BadUrl`] when neither a host nor a path can
    /// be found.
    pub fn parse(input: &str) -> Result<UrlRecord> {
        let caps = URL_RE
            .captures(input)
            .ok_or_else(|| UnpasteError::BadUrl(input.to_string()))?;

        let grab = |i: usize| caps.get(i).map(|m| m.as_str().to_string());

        let scheme = grab(1);
        // Without "://" the host group still eats the first path segment of a
        // bare path like "/x/y"; only treat it as a host when a scheme marker
        // was present or the text looks like an authority.
        let (host, path) = if scheme.is_some() {
            (grab(2), grab(3))
        } else {
            let joined = format!("{}{}", grab(2).unwrap_or_default(), grab(3).unwrap_or_default());
            (None, Some(joined))
        };

        let record = UrlRecord {
            scheme,
            host,
            path,
            query: grab(4),
            fragment: grab(5),
        };

        if record.host.is_none() && record.path.as_deref().unwrap_or("").is_empty() {
            return Err(UnpasteError::BadUrl(input.to_string()));
        }
        Ok(record)
    }

    /// Current value of a field, with absent components reading as `""`.
    pub fn get(&self, field: Field) -> &str {
        let slot = match field {
            Field::Scheme => &self.scheme,
            Field::Host => &self.host,
            Field::Path => &self.path,
            Field::Query => &self.query,
            Field::Fragment => &self.fragment,
        };
        slot.as_deref().unwrap_or("")
    }

    /// Replace a field's value. An empty string clears `query`/`fragment`
    /// entirely (no dangling `?`/`#` on re-serialization).
    pub fn set(&mut self, field: Field, value: String) {
        let cleared = value.is_empty() && matches!(field, Field::Query | Field::Fragment);
        let slot = match field {
            Field::Scheme => &mut self.scheme,
            Field::Host => &mut self.host,
            Field::Path => &mut self.path,
            Field::Query => &mut self.query,
            Field::Fragment => &mut self.fragment,
        };
        *slot = if cleared { None } else { Some(value) };
    }

    /// Re-serialize, dropping the fragment (which must never reach the wire).
    pub fn to_fetch_url(&self) -> String {
        let mut out = String::new();
        if let Some(scheme) = &self.scheme {
            out.push_str(scheme);
            out.push_str("://");
        }
        if let Some(host) = &self.host {
            out.push_str(host);
        }
        out.push_str(self.path.as_deref().unwrap_or(""));
        if let Some(query) = &self.query {
            out.push('?');
            out.push_str(query);
        }
        out
    }
}

impl fmt::Display for UrlRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_fetch_url())?;
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}
