//! Fetch and parse boundaries.
//!
//! The change detector never touches the network or an RDF syntax directly:
//! it is handed a `Fetcher` for HEAD/GET requests and a `QuadParser` for
//! response bodies.

use async_trait::async_trait;
use hashbrown::HashMap;
use tidal_core::{Quad, Result};

/// HTTP-style request method.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Validator check, no body expected.
    Head,
    /// Full retrieval.
    Get,
}

/// A request handed to the fetch boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: Method,
    pub headers: Vec<(String, String)>,
}

impl FetchRequest {
    pub fn head() -> Self {
        Self {
            method: Method::Head,
            headers: Vec::new(),
        }
    }

    pub fn get() -> Self {
        Self {
            method: Method::Get,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A response from the fetch boundary. Header names are stored lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FetchResponse {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// True for 2xx statuses.
    #[inline]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// The injected network capability.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, request: FetchRequest) -> Result<FetchResponse>;
}

/// The injected RDF syntax capability.
pub trait QuadParser: Send + Sync {
    fn parse(&self, url: &str, response: &FetchResponse) -> Result<Vec<Quad>>;
}
