//! The transport collaborator: HTTP execution behind an object-safe trait.
//!
//! The mapping layer never opens sockets itself. Every load and action call
//! goes through a `Transport`, and the built-in `HttpTransport` wraps a
//! `reqwest` blocking client. Implementations can substitute mock
//! responses for testing.

use serde::{Deserialize, Serialize};
use url::Url;

use restmap_core::{Error, Result, WireFormat};

/// HTTP method for requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl Method {
    /// Whether this method carries a request body.
    pub fn supports_body(&self) -> bool {
        matches!(self, Method::POST | Method::PUT | Method::PATCH)
    }
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
            Method::PATCH => http::Method::PATCH,
            Method::HEAD => http::Method::HEAD,
            Method::OPTIONS => http::Method::OPTIONS,
        }
    }
}

impl From<http::Method> for Method {
    fn from(method: http::Method) -> Self {
        match method {
            http::Method::POST => Method::POST,
            http::Method::PUT => Method::PUT,
            http::Method::DELETE => Method::DELETE,
            http::Method::PATCH => Method::PATCH,
            http::Method::HEAD => Method::HEAD,
            http::Method::OPTIONS => Method::OPTIONS,
            _ => Method::GET,
        }
    }
}

/// One outgoing request as the mapping layer describes it.
#[derive(Debug, Clone)]
pub struct WireRequest {
    /// HTTP method.
    pub method: Method,

    /// Absolute URL, query string included.
    pub url: Url,

    /// Request body text, if parameters travel in the body.
    pub body: Option<String>,

    /// Content type of the body.
    pub content_type: Option<WireFormat>,
}

/// The response a transport hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,

    /// Reason phrase (e.g. "OK", "Not Found").
    pub reason: String,

    /// Response body as text.
    pub body: String,

    /// Response headers as (name, value) pairs.
    pub headers: Vec<(String, String)>,
}

impl WireResponse {
    /// Build a response from its parts, with no headers.
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
            headers: Vec::new(),
        }
    }

    /// Check if the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Text encoding named by the `charset` parameter of the content-type
    /// header, defaulting to `utf-8`.
    ///
    /// The built-in transport already decodes bodies; this stays on the
    /// contract for transports that hand bytes through undecoded.
    pub fn charset(&self) -> String {
        let default = "utf-8".to_string();
        let content_type = match self.header("content-type") {
            Some(ct) => ct,
            None => return default,
        };

        for parameter in content_type.split(';').skip(1) {
            let mut parts = parameter.splitn(2, '=');
            let name = parts.next().unwrap_or("").trim();
            if name.eq_ignore_ascii_case("charset") {
                if let Some(value) = parts.next() {
                    return value.trim().trim_matches('"').to_lowercase();
                }
            }
        }
        default
    }
}

/// Trait for performing HTTP requests.
///
/// A transport is shared by reference (`Arc<dyn Transport>`) across every
/// load and action call a resource issues, and across the nested-resource
/// resolutions it spawns. The mapping layer never mutates it. Timeouts and
/// retries are the implementation's concern; any failure here is
/// unrecoverable for that call.
pub trait Transport: Send + Sync {
    /// Execute a request and return the response.
    fn send(&self, request: &WireRequest) -> Result<WireResponse>;
}

/// Production transport over a `reqwest` blocking client.
///
/// One client instance means one connection pool (and cookie/credential
/// state) shared by everything that holds the transport.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
        }
    }

    /// Create a transport around a preconfigured client.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &WireRequest) -> Result<WireResponse> {
        tracing::debug!(method = ?request.method, url = %request.url, "sending request");

        let method: http::Method = request.method.clone().into();
        let mut builder = self.client.request(method, request.url.clone());

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }
        if let Some(content_type) = &request.content_type {
            builder = builder.header("Content-Type", content_type.as_str());
        }

        let response = builder.send().map_err(|e| Error::Transport {
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let reason = response
            .status()
            .canonical_reason()
            .unwrap_or("Unknown")
            .to_string();

        let mut headers = Vec::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.push((name.to_string(), v.to_string()));
            }
        }

        let body = response.text().map_err(|e| Error::Transport {
            message: e.to_string(),
        })?;

        Ok(WireResponse {
            status,
            reason,
            body,
            headers,
        })
    }
}
