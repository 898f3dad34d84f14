//! # mgmtapi
//!
//! Declarative reconciliation of identity-provider management API objects.
//!
//! This crate provides:
//! - Bootstrap authentication (pre-issued token or OAuth2 client credentials)
//! - Authenticated JSON exchanges with status classification
//! - Create/read/update/delete reconcilers for application clients and access grants
//! - An error taxonomy separating transport failures, rejections and decode errors
//!
//! ## Example
//!
//! ```no_run
//! use mgmtapi::{CredentialInput, ManagementApi, UreqTransport};
//! use declarative::{Reconciler, ResourceState};
//! use std::sync::Arc;
//!
//! let api = ManagementApi::connect(
//!     Arc::new(UreqTransport::default()),
//!     "tenant.example.com",
//!     &CredentialInput::client_credentials("my-client-id", "my-client-secret"),
//! )?;
//!
//! let spec = mgmtapi::ClientSpec::new("Web Frontend");
//! let outcome = api.clients().create(&ResourceState::Unmanaged, &spec)?;
//! println!("created {}", outcome.state);
//! # Ok::<(), mgmtapi::Error>(())
//! ```
//!
//! ## Lifecycle
//!
//! | operation | success status | absent remotely |
//! |-----------|----------------|-----------------|
//! | create    | 201            | n/a             |
//! | read      | 2xx            | 404, or no grant matches: identity cleared |
//! | update    | 200            | `UpdateRejected` |
//! | delete    | 204            | `DeleteRejected` |

pub mod auth;
pub mod error;
pub mod exchange;
pub mod resources;
pub mod transport;

pub use auth::{Authenticator, CredentialInput, Credentials, Login, Session, TokenResponse};
pub use error::{Error, ErrorCategory, Result};
pub use exchange::{Exchange, ExchangeResult, StatusClass};
pub use resources::{
    AccessGrant, ApplicationClient, ClientReconciler, ClientSpec, GrantReconciler, GrantSpec,
};
pub use transport::{HttpRequest, HttpResponse, Method, MockTransport, Transport, UreqTransport};

use std::sync::Arc;

/// High-level handle for one authenticated invocation.
///
/// Holds the transport and session; hands out reconcilers bound to them.
#[derive(Debug, Clone)]
pub struct ManagementApi {
    exchange: Exchange,
    token: Option<TokenResponse>,
}

impl ManagementApi {
    /// Authenticate and return a handle.
    ///
    /// # Errors
    ///
    /// See [`Authenticator::authenticate`].
    pub fn connect(
        transport: Arc<dyn Transport>,
        domain: &str,
        credentials: &CredentialInput,
    ) -> Result<Self> {
        let login = Authenticator::new(Arc::clone(&transport)).login(domain, credentials)?;
        Ok(Self {
            exchange: Exchange::new(transport, login.session),
            token: login.token,
        })
    }

    /// Wrap an existing session.
    pub fn with_session(transport: Arc<dyn Transport>, session: Session) -> Self {
        Self {
            exchange: Exchange::new(transport, session),
            token: None,
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        self.exchange.session()
    }

    /// Token metadata, when a client-credentials exchange took place.
    #[must_use]
    pub fn token(&self) -> Option<&TokenResponse> {
        self.token.as_ref()
    }

    /// Reconciler for application clients.
    #[must_use]
    pub fn clients(&self) -> ClientReconciler {
        ClientReconciler::new(self.exchange.clone())
    }

    /// Reconciler for access grants.
    #[must_use]
    pub fn grants(&self) -> GrantReconciler {
        GrantReconciler::new(self.exchange.clone())
    }
}
