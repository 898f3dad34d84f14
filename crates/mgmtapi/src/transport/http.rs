//! Blocking HTTPS transport built on `ureq`.

use crate::error::{Error, Result};
use crate::transport::{HttpRequest, HttpResponse, Method, Transport};
use std::time::Duration;

/// Default global timeout for a single exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport backed by one `ureq` agent.
///
/// Status codes are never turned into errors here; classifying them is the
/// caller's job.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Create a transport whose every exchange is bounded by `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: config.into(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

/// Copy the request headers onto a `ureq` builder.
fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &HttpRequest,
) -> ureq::RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let url = request.url.as_str();
        let body = request.body.as_deref().unwrap_or("");

        let sent = match request.method {
            Method::Get => with_headers(self.agent.get(url), request).call(),
            Method::Delete => with_headers(self.agent.delete(url), request).call(),
            Method::Post => with_headers(self.agent.post(url), request).send(body),
            Method::Patch => with_headers(self.agent.patch(url), request).send(body),
        };

        let mut response = sent.map_err(|e| Error::transport(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| Error::transport(url, e))?;

        Ok(HttpResponse { status, body })
    }
}
