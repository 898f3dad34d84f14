//! Transport trait and implementations for sending HTTP requests.
//!
//! This module provides the [`Transport`] trait and implementations. The
//! production implementation is [`http::UreqTransport`].
//!
//! # Testing
//!
//! Use [`MockTransport`] for testing without network access:
//!
//! ```
//! use mgmtapi::transport::{HttpRequest, Method, MockTransport, Transport};
//!
//! let mock = MockTransport::new();
//! mock.push_json(200, r#"{"ok":true}"#);
//!
//! let response = mock
//!     .send(&HttpRequest::new(Method::Get, "https://tenant.example.com/api/v2/clients"))
//!     .unwrap();
//! assert_eq!(response.status, 200);
//! assert_eq!(mock.requests().len(), 1);
//! ```

pub mod http;

use crate::error::{Error, Result};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

pub use http::UreqTransport;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("tenantctl/", env!("CARGO_PKG_VERSION"));

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    /// Uppercase method name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built request.
#[derive(Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// A request with no headers and no body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Add a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set the body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Value of the first header with this name (case-insensitive).
    #[must_use]
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Body parsed as JSON, for assertions.
    pub fn json_body(&self) -> Option<serde_json::Value> {
        self.body
            .as_deref()
            .and_then(|b| serde_json::from_str(b).ok())
    }
}

// Headers and bodies may carry bearer tokens or client secrets.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("body", &self.body.as_ref().map(|b| format!("<{} bytes>", b.len())))
            .finish()
    }
}

/// A fully read response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Transport trait for sending requests.
///
/// Implementations never interpret the status code; any response that was
/// fully received is `Ok`. Only connection, TLS, timeout and body-read
/// failures are errors.
pub trait Transport: Send + Sync {
    /// Send one request and read the whole response.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the exchange could not be completed.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).send(request)
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Response(HttpResponse),
    Failure(String),
}

/// Mock transport for testing without network access.
///
/// Replies are served first in, first out. Clones share the same queue
/// and request log.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    requests: Arc<Mutex<Vec<HttpRequest>>>,
}

impl MockTransport {
    /// Create a new mock transport with no queued replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn push(&self, response: HttpResponse) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Reply::Response(response));
    }

    /// Queue a response with a JSON body.
    pub fn push_json(&self, status: u16, body: &str) {
        self.push(HttpResponse::new(status, body));
    }

    /// Queue a response with an empty body.
    pub fn push_status(&self, status: u16) {
        self.push(HttpResponse::new(status, ""));
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(Reply::Failure(message.into()));
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recent request.
    #[must_use]
    pub fn last_request(&self) -> Option<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    /// Number of requests sent so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of queued replies not yet served.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Transport for MockTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());

        let reply = self
            .replies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Failure(message)) => Err(Error::transport(&request.url, message)),
            None => Err(Error::transport(
                &request.url,
                "mock transport has no queued reply",
            )),
        }
    }
}
