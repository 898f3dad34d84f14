//! One authenticated JSON request/response cycle against the management API.

use crate::auth::Session;
use crate::error::{Error, Result};
use crate::transport::{HttpRequest, Method, Transport, USER_AGENT};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;

/// Coarse classification of a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 404
    NotFound,
    /// Anything else
    ClientOrServerError,
}

impl StatusClass {
    #[must_use]
    pub fn of(status: u16) -> Self {
        match status {
            200..=299 => Self::Success,
            404 => Self::NotFound,
            _ => Self::ClientOrServerError,
        }
    }
}

/// A fully read response. The status is classified, never judged; each
/// operation decides what a given status means.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeResult {
    pub status: u16,
    pub class: StatusClass,
    pub body: String,
}

impl ExchangeResult {
    /// Decode the body into `T`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Decode` naming `context` if the body does not parse.
    pub fn decode<T: DeserializeOwned>(&self, context: &str) -> Result<T> {
        serde_json::from_str(&self.body).map_err(|e| Error::decode(context, e))
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.class == StatusClass::Success
    }
}

// Bodies may carry client secrets.
impl fmt::Debug for ExchangeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExchangeResult")
            .field("status", &self.status)
            .field("class", &self.class)
            .field("body", &format!("<{} bytes>", self.body.len()))
            .finish()
    }
}

/// Sends authenticated requests for one session.
#[derive(Clone)]
pub struct Exchange {
    transport: Arc<dyn Transport>,
    session: Session,
}

impl Exchange {
    pub fn new(transport: Arc<dyn Transport>, session: Session) -> Self {
        Self { transport, session }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Absolute URL for an API path (which starts with `/`).
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("https://{}{}", self.session.domain(), path)
    }

    /// Perform one exchange.
    ///
    /// # Errors
    ///
    /// Returns `Error::Transport` if the request could not be completed.
    /// Non-2xx statuses are not errors here.
    pub fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<ExchangeResult> {
        let url = self.url(path);
        let mut request = HttpRequest::new(method, &url)
            .header("Content-Type", "application/json")
            .header(
                "Authorization",
                format!("Bearer {}", self.session.access_token()),
            )
            .header("User-Agent", USER_AGENT);

        if let Some(body) = body {
            let json = serde_json::to_string(body).map_err(|e| Error::decode("request payload", e))?;
            request = request.body(json);
        }

        let response = self.transport.send(&request)?;
        let class = StatusClass::of(response.status);
        log::debug!("{method} {url} -> {} ({class:?})", response.status);

        Ok(ExchangeResult {
            status: response.status,
            class,
            body: response.body,
        })
    }

    pub fn get(&self, path: &str) -> Result<ExchangeResult> {
        self.send::<()>(Method::Get, path, None)
    }

    pub fn delete(&self, path: &str) -> Result<ExchangeResult> {
        self.send::<()>(Method::Delete, path, None)
    }

    pub fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ExchangeResult> {
        self.send(Method::Post, path, Some(body))
    }

    pub fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ExchangeResult> {
        self.send(Method::Patch, path, Some(body))
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use serde::Deserialize;

    fn exchange(mock: &MockTransport) -> Exchange {
        let session = Session::new("tenant.example.com", "tok-123").unwrap();
        Exchange::new(Arc::new(mock.clone()), session)
    }

    #[test]
    fn test_status_class() {
        assert_eq!(StatusClass::of(200), StatusClass::Success);
        assert_eq!(StatusClass::of(201), StatusClass::Success);
        assert_eq!(StatusClass::of(204), StatusClass::Success);
        assert_eq!(StatusClass::of(404), StatusClass::NotFound);
        assert_eq!(StatusClass::of(400), StatusClass::ClientOrServerError);
        assert_eq!(StatusClass::of(500), StatusClass::ClientOrServerError);
        assert_eq!(StatusClass::of(301), StatusClass::ClientOrServerError);
    }

    #[test]
    fn test_request_shape() {
        let mock = MockTransport::new();
        mock.push_json(201, r#"{"id":"x"}"#);

        let result = exchange(&mock)
            .post("/api/v2/clients", &serde_json::json!({"name": "web"}))
            .unwrap();
        assert!(result.is_success());

        let request = mock.last_request().unwrap();
        assert_eq!(request.url, "https://tenant.example.com/api/v2/clients");
        assert_eq!(request.header_value("Authorization"), Some("Bearer tok-123"));
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));
        assert!(request.header_value("User-Agent").unwrap().starts_with("tenantctl/"));
        assert_eq!(request.json_body().unwrap()["name"], "web");
    }

    #[test]
    fn test_get_has_no_body() {
        let mock = MockTransport::new();
        mock.push_status(404);

        let result = exchange(&mock).get("/api/v2/clients/abc").unwrap();
        assert_eq!(result.class, StatusClass::NotFound);
        assert_eq!(mock.last_request().unwrap().body, None);
    }

    #[test]
    fn test_error_status_is_not_an_error() {
        let mock = MockTransport::new();
        mock.push_json(500, "boom");

        let result = exchange(&mock).delete("/api/v2/clients/abc").unwrap();
        assert_eq!(result.class, StatusClass::ClientOrServerError);
        assert_eq!(result.body, "boom");
    }

    #[test]
    fn test_decode() {
        #[derive(Deserialize)]
        struct Thing {
            id: String,
        }

        let ok = ExchangeResult {
            status: 200,
            class: StatusClass::Success,
            body: r#"{"id":"a1"}"#.to_string(),
        };
        assert_eq!(ok.decode::<Thing>("thing").unwrap().id, "a1");

        let bad = ExchangeResult {
            body: "<html>".to_string(),
            ..ok
        };
        assert!(matches!(
            bad.decode::<Thing>("thing"),
            Err(Error::Decode { .. })
        ));
    }

    #[test]
    fn test_transport_failure_surfaces() {
        let mock = MockTransport::new();
        mock.push_failure("tls handshake failed");

        let err = exchange(&mock).get("/api/v2/clients/abc").unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }
}
