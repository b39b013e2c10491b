//! HTTP transport collaborator.
//!
//! Everything network-shaped goes through the [`Transport`] trait so the
//! pipeline and adapters can be exercised against an in-memory map in tests.
//! The real implementation is a blocking reqwest client; redirects are
//! followed transparently and every request carries a `Referer` equal to the
//! URL being fetched (several services refuse to serve the raw body without
//! it).

use crate::error::{Result, UnpasteError};

/// Blocking fetch operations the pipeline relies on.
pub trait Transport {
    /// GET a URL and return the response body.
    fn get(&self, url: &str) -> Result<Vec<u8>>;

    /// POST form fields to a URL and return the response body.
    fn post(&self, url: &str, form: &[(String, String)]) -> Result<Vec<u8>>;

    /// Resolve the final location of a URL by following its redirect chain.
    fn resolve(&self, url: &str) -> Result<String>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new() -> Result<HttpTransport> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("unpaste/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UnpasteError::TransportFailure {
                url: String::new(),
                detail: format!("client setup: {}", e),
            })?;
        Ok(HttpTransport { client })
    }

    fn body(url: &str, response: reqwest::blocking::Response) -> Result<Vec<u8>> {
        let status = response.status();
        if !status.is_success() {
            return Err(UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: format!("HTTP {}", status),
            });
        }
        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: e.to_string(),
            })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .header(reqwest::header::REFERER, url)
            .send()
            .map_err(|e| UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        Self::body(url, response)
    }

    fn post(&self, url: &str, form: &[(String, String)]) -> Result<Vec<u8>> {
        tracing::debug!(url, fields = form.len(), "POST");
        let response = self
            .client
            .post(url)
            .header(reqwest::header::REFERER, url)
            .form(form)
            .send()
            .map_err(|e| UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        Self::body(url, response)
    }

    fn resolve(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "HEAD (resolve)");
        let response = self
            .client
            .head(url)
            .header(reqwest::header::REFERER, url)
            .send()
            .map_err(|e| UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: e.to_string(),
            })?;
        Ok(response.url().to_string())
    }
}

/// Map-backed transport for tests: GET/POST bodies and redirect targets are
/// looked up by URL.
#[cfg(test)]
#[derive(Default)]
pub struct MapTransport {
    pub bodies: std::collections::HashMap<String, Vec<u8>>,
    pub post_bodies: std::collections::HashMap<String, Vec<u8>>,
    pub redirects: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl Transport for MapTransport {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        self.bodies
            .get(url)
            .cloned()
            .ok_or_else(|| UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: "HTTP 404".into(),
            })
    }

    fn post(&self, url: &str, _form: &[(String, String)]) -> Result<Vec<u8>> {
        self.post_bodies
            .get(url)
            .cloned()
            .ok_or_else(|| UnpasteError::TransportFailure {
                url: url.to_string(),
                detail: "HTTP 404".into(),
            })
    }

    fn resolve(&self, url: &str) -> Result<String> {
        Ok(self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string()))
    }
}
