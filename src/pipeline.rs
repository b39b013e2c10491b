//! Retrieval orchestrator: URL in, plaintext bytes out.
//!
//! One call to [`Pipeline::run`] is one self-contained retrieval: parse the
//! URL, find the first matching site rule, then either GET the rewritten URL
//! directly or hand it to the named adapter. The reserved adapter name
//! `redirect` resolves the URL's redirect chain and re-runs the whole
//! pipeline on the result; the re-entry is unguarded, so a pathological
//! redirect loop recurses until the stack gives out (known limitation).

use std::io::IsTerminal;

use crate::error::{Result, UnpasteError};
use crate::rules::RuleTable;
use crate::transport::Transport;
use crate::unwrap::{adapter_by_name, UnwrapContext};
use crate::urlrec::{Field, UrlRecord};

/// The reserved adapter name for redirect indirection.
const REDIRECT: &str = "redirect";

pub struct Pipeline<'a> {
    transport: &'a dyn Transport,
    rules: RuleTable,
}

impl<'a> Pipeline<'a> {
    pub fn new(transport: &'a dyn Transport, rules: RuleTable) -> Pipeline<'a> {
        Pipeline { transport, rules }
    }

    /// Retrieve one URL. The fragment (or `secret_override`) is the secret
    /// material handed to the adapter; `want_index` picks a file out of
    /// multi-file bundles.
    pub fn run(
        &self,
        url_str: &str,
        secret_override: Option<&str>,
        want_index: Option<usize>,
    ) -> Result<Vec<u8>> {
        let url = UrlRecord::parse(url_str)?;
        let Some(dispatch) = self.rules.match_url(&url)? else {
            tracing::debug!(
                host = url.get(Field::Host),
                path = url.get(Field::Path),
                "no rule matched"
            );
            return Err(UnpasteError::UnknownDestination(url_str.to_string()));
        };
        if let Some(note) = dispatch.note {
            tracing::debug!(note, url = %dispatch.url, "matched rule");
        }

        match dispatch.adapter {
            Some(REDIRECT) => {
                let resolved = self.transport.resolve(&dispatch.url.to_fetch_url())?;
                tracing::debug!(from = url_str, to = %resolved, "following redirect");
                self.run(&resolved, secret_override, want_index)
            }
            Some(name) => {
                let adapter = adapter_by_name(name).ok_or_else(|| {
                    UnpasteError::UnsupportedParameters(format!("adapter {:?}", name))
                })?;
                let secret = secret_override
                    .map(str::to_string)
                    .or_else(|| dispatch.fragment.clone());
                let ctx = UnwrapContext {
                    transport: self.transport,
                    secret,
                    want_index,
                    interactive: std::io::stdin().is_terminal(),
                };
                adapter.retrieve(&ctx, &dispatch.url)
            }
            None => self.transport.get(&dispatch.url.to_fetch_url()),
        }
    }
}
