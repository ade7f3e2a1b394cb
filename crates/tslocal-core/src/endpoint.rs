//! Endpoint descriptors: method, versioned path, query and JSON body.

use std::fmt;

use hyper::Method;
use serde_json::Value;
use url::Url;

use crate::error::LocalApiError;

/// LocalAPI version segment.
pub const API_VERSION: &str = "v0";

/// Pseudo-host the socket transport addresses; the real destination is the
/// Unix socket.
pub const PSEUDO_HOST: &str = "local-tailscaled.sock";

const BASE_URL: &str = "http://local-tailscaled.sock/localapi/v0/";

/// One LocalAPI call, independent of transport.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    method: Method,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: Option<Value>,
}

impl Endpoint {
    /// `path` is split on `/`; use [`Endpoint::segment`] for caller-supplied
    /// values that need escaping.
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            segments: path
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: &str) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn put(path: &str) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append one path segment, escaped.
    pub fn segment(mut self, value: impl Into<String>) -> Self {
        self.segments.push(value.into());
        self
    }

    /// Append a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Full URL on the pseudo-host, e.g.
    /// `http://local-tailscaled.sock/localapi/v0/status?peers=false`.
    pub fn url(&self) -> Result<Url, LocalApiError> {
        let mut url = Url::parse(BASE_URL)
            .map_err(|e| LocalApiError::Request(format!("invalid base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| LocalApiError::Request("base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(&self.segments);
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }

    /// Origin-form request target for HTTP, e.g. `/localapi/v0/status`.
    pub fn request_target(&self) -> Result<String, LocalApiError> {
        let url = self.url()?;
        Ok(match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        })
    }

    /// Path handed to the CLI, e.g. `v0/status?peers=false`.
    pub fn versioned_path(&self) -> Result<String, LocalApiError> {
        let target = self.request_target()?;
        Ok(target
            .strip_prefix("/localapi/")
            .unwrap_or(&target)
            .to_string())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.method, API_VERSION, self.segments.join("/"))?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}
