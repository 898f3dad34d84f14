//! Bootstrap authentication.
//!
//! A [`Session`] is obtained either from a pre-issued token, trusted as-is,
//! or from one OAuth2 client-credentials exchange against
//! `https://{domain}/oauth/token`. Tokens are never refreshed; every
//! invocation authenticates again.

use crate::error::{Error, Result};
use crate::transport::{HttpRequest, Method, Transport, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Authenticated context for one invocation.
///
/// The access token is never empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    domain: String,
    access_token: String,
}

impl Session {
    /// Build a session from a domain and a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if either value is empty.
    pub fn new(domain: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let domain = validate_domain(&domain.into())?;
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(Error::configuration("access token must not be empty"));
        }
        Ok(Self {
            domain,
            access_token,
        })
    }

    /// Host name of the tenant.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Bearer token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("domain", &self.domain)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Credentials as supplied by configuration. Empty strings count as absent.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialInput {
    pub access_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl CredentialInput {
    /// Input carrying only a pre-issued token.
    pub fn token(access_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Input carrying only a client id and secret.
    pub fn client_credentials(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            ..Self::default()
        }
    }

    /// Pick the usable credential form.
    ///
    /// A token wins over a client id and secret.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` if there is no token and the pair is
    /// incomplete.
    pub fn resolve(&self) -> Result<Credentials> {
        if let Some(token) = non_empty(self.access_token.as_deref()) {
            return Ok(Credentials::Token(token.to_string()));
        }

        match (
            non_empty(self.client_id.as_deref()),
            non_empty(self.client_secret.as_deref()),
        ) {
            (Some(client_id), Some(client_secret)) => Ok(Credentials::ClientCredentials {
                client_id: client_id.to_string(),
                client_secret: client_secret.to_string(),
            }),
            _ => Err(Error::configuration(
                "must supply a token, or both a client id and client secret",
            )),
        }
    }
}

impl fmt::Debug for CredentialInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialInput")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// A usable credential.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued bearer token, used verbatim
    Token(String),
    /// Pair exchanged for a token
    ClientCredentials {
        client_id: String,
        client_secret: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.write_str("Token(<redacted>)"),
            Self::ClientCredentials { client_id, .. } => f
                .debug_struct("ClientCredentials")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
        }
    }
}

/// Decoded token endpoint response.
///
/// Everything except `access_token` is carried through uninterpreted.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("scope", &self.scope)
            .field("token_type", &self.token_type)
            .finish()
    }
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    audience: String,
}

/// Result of authenticating, with the token metadata when an exchange took place.
#[derive(Debug, Clone)]
pub struct Login {
    pub session: Session,
    /// `None` when a pre-issued token was used
    pub token: Option<TokenResponse>,
}

/// Resolves credentials into a [`Session`].
#[derive(Clone)]
pub struct Authenticator {
    transport: Arc<dyn Transport>,
}

impl Authenticator {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Obtain a session for `domain`.
    ///
    /// # Errors
    ///
    /// - `Error::Configuration` before any I/O if the domain is empty or no
    ///   usable credential is supplied
    /// - `Error::Transport` if the token request could not be completed
    /// - `Error::AuthRejected` if the token endpoint answered non-2xx
    /// - `Error::Decode` if the 2xx body carries no usable `access_token`
    pub fn authenticate(&self, domain: &str, input: &CredentialInput) -> Result<Session> {
        self.login(domain, input).map(|login| login.session)
    }

    /// Like [`Authenticator::authenticate`], also returning token metadata.
    pub fn login(&self, domain: &str, input: &CredentialInput) -> Result<Login> {
        let domain = validate_domain(domain)?;

        match input.resolve()? {
            Credentials::Token(token) => {
                log::info!("Using pre-issued access token for {domain}");
                Ok(Login {
                    session: Session::new(domain, token)?,
                    token: None,
                })
            }
            Credentials::ClientCredentials {
                client_id,
                client_secret,
            } => {
                let token = self.request_token(&domain, &client_id, &client_secret)?;
                Ok(Login {
                    session: Session::new(domain, token.access_token.clone())?,
                    token: Some(token),
                })
            }
        }
    }

    /// Perform one client-credentials exchange.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate`].
    pub fn request_token(
        &self,
        domain: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Result<TokenResponse> {
        let domain = validate_domain(domain)?;
        let url = format!("https://{domain}/oauth/token");

        let payload = TokenRequest {
            grant_type: "client_credentials",
            client_id,
            client_secret,
            audience: format!("https://{domain}/api/v2/"),
        };
        let body = serde_json::to_string(&payload).map_err(|e| Error::decode("token request", e))?;

        let request = HttpRequest::new(Method::Post, &url)
            .header("Content-Type", "application/json")
            .header("User-Agent", USER_AGENT)
            .body(body);

        log::debug!("Requesting access token from {url} for client {client_id}");
        let response = self.transport.send(&request)?;

        if !(200..300).contains(&response.status) {
            log::debug!("Token endpoint answered HTTP {}", response.status);
            return Err(Error::AuthRejected {
                status: response.status,
                body: response.body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&response.body)
            .map_err(|e| Error::decode("token response", e))?;
        if token.access_token.is_empty() {
            return Err(Error::decode("token response", "access_token is empty"));
        }

        log::info!(
            "Authenticated against {domain}{}",
            token
                .expires_in
                .map(|secs| format!(" (expires in {secs}s)"))
                .unwrap_or_default()
        );
        Ok(token)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_domain(domain: &str) -> Result<String> {
    let domain = domain.trim().trim_end_matches('/');
    if domain.is_empty() {
        return Err(Error::configuration("a domain is required"));
    }
    if domain.contains("://") {
        return Err(Error::configuration(format!(
            "domain must be a host name, not a URL: {domain}"
        )));
    }
    Ok(domain.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;

    fn authenticator(mock: &MockTransport) -> Authenticator {
        Authenticator::new(Arc::new(mock.clone()))
    }

    #[test]
    fn test_client_credentials_exchange() {
        let mock = MockTransport::new();
        mock.push_json(
            200,
            r#"{"access_token":"wubbalubbadubdub","expires_in":86400,"scope":"read:clients","token_type":"Bearer"}"#,
        );

        let session = authenticator(&mock)
            .authenticate(
                "tenant.example.com",
                &CredentialInput::client_credentials("joebang", "cauliflower"),
            )
            .unwrap();

        assert_eq!(session.access_token(), "wubbalubbadubdub");
        assert_eq!(session.domain(), "tenant.example.com");
        assert_eq!(mock.call_count(), 1);

        let request = mock.last_request().unwrap();
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.url, "https://tenant.example.com/oauth/token");
        assert_eq!(request.header_value("Authorization"), None);
        assert_eq!(request.header_value("Content-Type"), Some("application/json"));

        let body = request.json_body().unwrap();
        assert_eq!(body["client_id"], "joebang");
        assert_eq!(body["client_secret"], "cauliflower");
        assert_eq!(body["grant_type"], "client_credentials");
        assert_eq!(body["audience"], "https://tenant.example.com/api/v2/");
    }

    #[test]
    fn test_token_metadata_carried_through() {
        let mock = MockTransport::new();
        mock.push_json(
            200,
            r#"{"access_token":"abc","expires_in":86400,"scope":"read:clients create:clients","token_type":"Bearer"}"#,
        );

        let login = authenticator(&mock)
            .login(
                "tenant.example.com",
                &CredentialInput::client_credentials("id", "secret"),
            )
            .unwrap();

        let token = login.token.unwrap();
        assert_eq!(token.expires_in, Some(86400));
        assert_eq!(token.scope.as_deref(), Some("read:clients create:clients"));
        assert_eq!(token.token_type.as_deref(), Some("Bearer"));
    }

    #[test]
    fn test_pre_issued_token_short_circuits() {
        let mock = MockTransport::new();
        let login = authenticator(&mock)
            .login("tenant.example.com", &CredentialInput::token("preissued.jwt"))
            .unwrap();

        assert_eq!(login.session.access_token(), "preissued.jwt");
        assert!(login.token.is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_token_wins_over_pair() {
        let mock = MockTransport::new();
        let input = CredentialInput {
            access_token: Some("tok".into()),
            client_id: Some("id".into()),
            client_secret: Some("secret".into()),
        };

        let session = authenticator(&mock)
            .authenticate("tenant.example.com", &input)
            .unwrap();
        assert_eq!(session.access_token(), "tok");
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_missing_credentials_is_configuration_error() {
        let mock = MockTransport::new();
        let cases = [
            CredentialInput::default(),
            CredentialInput {
                client_id: Some("id".into()),
                ..CredentialInput::default()
            },
            CredentialInput {
                client_secret: Some("secret".into()),
                ..CredentialInput::default()
            },
            CredentialInput {
                access_token: Some(String::new()),
                client_id: Some("id".into()),
                client_secret: Some("  ".into()),
            },
        ];

        for input in &cases {
            let err = authenticator(&mock)
                .authenticate("tenant.example.com", input)
                .unwrap_err();
            assert!(matches!(err, Error::Configuration(_)), "{input:?}");
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_empty_domain_is_configuration_error() {
        let mock = MockTransport::new();
        let err = authenticator(&mock)
            .authenticate("  ", &CredentialInput::client_credentials("id", "secret"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));

        let err = authenticator(&mock)
            .authenticate("https://tenant.example.com", &CredentialInput::token("t"))
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn test_rejected_token_request() {
        let mock = MockTransport::new();
        mock.push_json(401, r#"{"error":"access_denied","error_description":"Unauthorized"}"#);

        let err = authenticator(&mock)
            .authenticate(
                "tenant.example.com",
                &CredentialInput::client_credentials("id", "wrong"),
            )
            .unwrap_err();

        assert_eq!(err.status(), Some(401));
        assert_eq!(
            err.body(),
            Some(r#"{"error":"access_denied","error_description":"Unauthorized"}"#)
        );
        assert!(matches!(err, Error::AuthRejected { .. }));
    }

    #[test]
    fn test_missing_access_token_is_decode_error() {
        let mock = MockTransport::new();
        mock.push_json(200, r#"{"token_type":"Bearer"}"#);
        mock.push_json(200, "not json");
        mock.push_json(200, r#"{"access_token":""}"#);

        let auth = authenticator(&mock);
        let input = CredentialInput::client_credentials("id", "secret");
        for _ in 0..3 {
            let err = auth.authenticate("tenant.example.com", &input).unwrap_err();
            assert!(matches!(err, Error::Decode { .. }));
        }
    }

    #[test]
    fn test_transport_failure_is_not_retried() {
        let mock = MockTransport::new();
        mock.push_failure("connection refused");

        let err = authenticator(&mock)
            .authenticate(
                "tenant.example.com",
                &CredentialInput::client_credentials("id", "secret"),
            )
            .unwrap_err();

        assert!(matches!(err, Error::Transport { .. }));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let session = Session::new("tenant.example.com", "wubbalubbadubdub").unwrap();
        assert!(!format!("{session:?}").contains("wubbalubbadubdub"));

        let input = CredentialInput::client_credentials("joebang", "cauliflower");
        let rendered = format!("{input:?}");
        assert!(rendered.contains("joebang"));
        assert!(!rendered.contains("cauliflower"));

        let creds = input.resolve().unwrap();
        assert!(!format!("{creds:?}").contains("cauliflower"));
    }

    #[test]
    fn test_session_requires_token() {
        assert!(Session::new("tenant.example.com", "").is_err());
        assert!(Session::new("", "tok").is_err());
    }
}
