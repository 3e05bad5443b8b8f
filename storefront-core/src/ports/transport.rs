//! HTTP transport port
//!
//! Defines how the core talks to the storefront backend. The `ApiClient`
//! layers the refresh interceptor on top of whatever implements this trait
//! (reqwest in production, a scripted in-memory backend in tests).

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::result::Result;

/// HTTP methods used by the storefront API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An outbound request, replayable byte-for-byte
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    pub path: String,
    pub body: Option<JsonValue>,
    pub headers: Vec<(String, String)>,
    /// Set once the request has been replayed after a refresh
    pub retried: bool,
    /// Whether a 401 on this request may trigger a session refresh
    pub refreshable: bool,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            retried: false,
            refreshable: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Delete, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Mark as a credentials-establishing call: a 401 means "bad credentials",
    /// not "session expired", so the interceptor must not refresh.
    pub fn without_refresh(mut self) -> Self {
        self.refreshable = false;
        self
    }
}

/// A response as seen by the core
///
/// Bodies are decoded leniently: empty → `Null`, non-JSON text → `String`.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: JsonValue,
}

impl ApiResponse {
    pub fn new(status: u16, body: JsonValue) -> Self {
        Self { status, body }
    }

    pub fn ok(body: JsonValue) -> Self {
        Self::new(200, body)
    }

    pub fn empty(status: u16) -> Self {
        Self::new(status, JsonValue::Null)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }

    /// Server-provided message: `message` first, then `error`, then a bare string body
    pub fn server_message(&self) -> Option<String> {
        match &self.body {
            JsonValue::Object(map) => ["message", "error"]
                .iter()
                .filter_map(|key| map.get(*key))
                .filter_map(JsonValue::as_str)
                .find(|s| !s.trim().is_empty())
                .map(str::to_string),
            JsonValue::String(text) if !text.trim().is_empty() => Some(text.clone()),
            _ => None,
        }
    }

    /// Decode raw response bytes the way every transport should
    pub fn decode_body(bytes: &[u8]) -> JsonValue {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return JsonValue::Null;
        }
        serde_json::from_slice(bytes)
            .unwrap_or_else(|_| JsonValue::String(String::from_utf8_lossy(bytes).into_owned()))
    }
}

/// Network transport trait
///
/// Implementations return `Ok` for every response that arrived, whatever its
/// status; `Err` is reserved for "no response" (`NetworkUnreachable`).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Transport name (e.g., "reqwest", "scripted")
    fn name(&self) -> &str;

    /// Send one request and return the raw response
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse>;
}
