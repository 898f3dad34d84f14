//! Application client reconciler.
//!
//! The remote `client_id` is the durable identity. The `client_secret` is
//! only ever read from responses: it is captured as a sensitive output and
//! never sent back.

use crate::error::{Error, Result};
use crate::exchange::{Exchange, ExchangeResult, StatusClass};
use crate::resources::{compare, encode, nullable};
use declarative::{FieldChange, Outcome, Output, Reconciler, ResourceState};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource kind label.
pub const KIND: &str = "client";

const COLLECTION: &str = "/api/v2/clients";

/// Desired state of an application client.
///
/// Unset booleans, `description` and `grant_types` are sent as `false`,
/// `""` and `[]`; the other unset fields are left out of the payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_token_endpoint_ip_header_trusted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_first_party: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_origin_auth: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sso: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint_auth_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_types: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_login_page_on: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callbacks: Option<Vec<String>>,
}

impl ClientSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Wire body for create and update.
///
/// Booleans, `name`, `description` and `grant_types` are always sent;
/// the remaining optional strings and lists only when set.
#[derive(Debug, Serialize)]
struct ClientPayload<'a> {
    name: &'a str,
    description: &'a str,
    is_token_endpoint_ip_header_trusted: bool,
    is_first_party: bool,
    cross_origin_auth: bool,
    sso: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    token_endpoint_auth_method: Option<&'a str>,
    grant_types: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    app_type: Option<&'a str>,
    custom_login_page_on: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    callbacks: Option<&'a [String]>,
}

impl<'a> From<&'a ClientSpec> for ClientPayload<'a> {
    fn from(spec: &'a ClientSpec) -> Self {
        Self {
            name: &spec.name,
            description: spec.description.as_deref().unwrap_or_default(),
            is_token_endpoint_ip_header_trusted: spec
                .is_token_endpoint_ip_header_trusted
                .unwrap_or(false),
            is_first_party: spec.is_first_party.unwrap_or(false),
            cross_origin_auth: spec.cross_origin_auth.unwrap_or(false),
            sso: spec.sso.unwrap_or(false),
            token_endpoint_auth_method: spec.token_endpoint_auth_method.as_deref(),
            grant_types: spec.grant_types.as_deref().unwrap_or_default(),
            app_type: spec.app_type.as_deref(),
            custom_login_page_on: spec.custom_login_page_on.unwrap_or(false),
            callbacks: spec.callbacks.as_deref(),
        }
    }
}

/// Application client as reported by the service.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ApplicationClient {
    #[serde(deserialize_with = "nullable")]
    pub client_id: String,
    pub client_secret: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub name: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(deserialize_with = "nullable")]
    pub is_token_endpoint_ip_header_trusted: bool,
    #[serde(deserialize_with = "nullable")]
    pub is_first_party: bool,
    #[serde(deserialize_with = "nullable")]
    pub cross_origin_auth: bool,
    #[serde(deserialize_with = "nullable")]
    pub sso: bool,
    pub token_endpoint_auth_method: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub grant_types: Vec<String>,
    pub app_type: Option<String>,
    #[serde(deserialize_with = "nullable")]
    pub custom_login_page_on: bool,
    #[serde(deserialize_with = "nullable")]
    pub callbacks: Vec<String>,
}

impl fmt::Debug for ApplicationClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("name", &self.name)
            .field("description", &self.description)
            .field("is_first_party", &self.is_first_party)
            .field("app_type", &self.app_type)
            .field("grant_types", &self.grant_types)
            .finish_non_exhaustive()
    }
}

/// Reconciler for application clients.
#[derive(Debug, Clone)]
pub struct ClientReconciler {
    exchange: Exchange,
}

impl ClientReconciler {
    pub fn new(exchange: Exchange) -> Self {
        Self { exchange }
    }

    fn instance_path(id: &str) -> String {
        format!("{COLLECTION}/{}", encode(id))
    }

    /// Decode a client record and check it belongs to `expected`.
    fn decode_instance(result: &ExchangeResult, expected: &str) -> Result<ApplicationClient> {
        let mut client: ApplicationClient = result.decode("client response")?;
        if client.client_id.is_empty() {
            client.client_id = expected.to_string();
        } else if client.client_id != expected {
            return Err(Error::IdentityMismatch {
                kind: KIND,
                expected: expected.to_string(),
                actual: client.client_id,
            });
        }
        Ok(client)
    }
}

impl Reconciler for ClientReconciler {
    type Desired = ClientSpec;
    type Remote = ApplicationClient;
    type Error = Error;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn create(
        &self,
        state: &ResourceState,
        desired: &ClientSpec,
    ) -> Result<Outcome<ApplicationClient>> {
        state.require_unmanaged(KIND)?;

        let result = self
            .exchange
            .post(COLLECTION, &ClientPayload::from(desired))?;
        if result.status != 201 {
            return Err(Error::CreateRejected {
                kind: KIND,
                status: result.status,
                body: result.body,
            });
        }

        let client: ApplicationClient = result.decode("client create response")?;
        if client.client_id.is_empty() {
            return Err(Error::decode(
                "client create response",
                "client_id is missing",
            ));
        }

        log::debug!("Client {} assigned to {:?}", client.client_id, desired.name);
        Ok(Outcome::managed(client.client_id.clone(), client))
    }

    fn read(
        &self,
        state: &ResourceState,
        _desired: &ClientSpec,
    ) -> Result<Outcome<ApplicationClient>> {
        let id = state.require_managed(KIND)?;

        let result = self.exchange.get(&Self::instance_path(id))?;
        match result.class {
            StatusClass::NotFound => {
                log::debug!("Client {id} not found remotely");
                Ok(Outcome::absent())
            }
            StatusClass::Success => {
                let client = Self::decode_instance(&result, id)?;
                Ok(Outcome::managed(id, client))
            }
            StatusClass::ClientOrServerError => Err(Error::ReadFailed {
                kind: KIND,
                status: result.status,
                body: result.body,
            }),
        }
    }

    fn update(
        &self,
        state: &ResourceState,
        desired: &ClientSpec,
    ) -> Result<Outcome<ApplicationClient>> {
        let id = state.require_managed(KIND)?;

        let result = self
            .exchange
            .patch(&Self::instance_path(id), &ClientPayload::from(desired))?;
        if result.status != 200 {
            return Err(Error::UpdateRejected {
                kind: KIND,
                status: result.status,
                body: result.body,
            });
        }

        let client = Self::decode_instance(&result, id)?;
        Ok(Outcome::managed(id, client))
    }

    fn delete(&self, state: &ResourceState) -> Result<ResourceState> {
        let id = state.require_managed(KIND)?;

        let result = self.exchange.delete(&Self::instance_path(id))?;
        if result.status != 204 {
            return Err(Error::DeleteRejected {
                kind: KIND,
                status: result.status,
                body: result.body,
            });
        }
        Ok(ResourceState::Unmanaged)
    }

    /// Compares what an update would send. Fields always present in the
    /// payload are compared even when unset, since the update resets them;
    /// the omitted ones only when set.
    fn diff(&self, remote: &ApplicationClient, desired: &ClientSpec) -> Vec<FieldChange> {
        let payload = ClientPayload::from(desired);
        let mut changes = Vec::new();
        compare(&mut changes, "name", remote.name.as_str(), payload.name);
        compare(&mut changes, "description", remote.description.as_str(), payload.description);

        let flags = [
            (
                "is_token_endpoint_ip_header_trusted",
                remote.is_token_endpoint_ip_header_trusted,
                payload.is_token_endpoint_ip_header_trusted,
            ),
            ("is_first_party", remote.is_first_party, payload.is_first_party),
            ("cross_origin_auth", remote.cross_origin_auth, payload.cross_origin_auth),
            ("sso", remote.sso, payload.sso),
            (
                "custom_login_page_on",
                remote.custom_login_page_on,
                payload.custom_login_page_on,
            ),
        ];
        for (field, remote_value, sent) in flags {
            compare(&mut changes, field, &remote_value, &sent);
        }
        compare(&mut changes, "grant_types", remote.grant_types.as_slice(), payload.grant_types);

        if let Some(method) = payload.token_endpoint_auth_method {
            compare(
                &mut changes,
                "token_endpoint_auth_method",
                &remote.token_endpoint_auth_method.as_deref(),
                &Some(method),
            );
        }
        if let Some(app_type) = payload.app_type {
            compare(&mut changes, "app_type", &remote.app_type.as_deref(), &Some(app_type));
        }
        if let Some(callbacks) = payload.callbacks {
            compare(&mut changes, "callbacks", remote.callbacks.as_slice(), callbacks);
        }
        changes
    }

    fn outputs(&self, remote: &ApplicationClient) -> Vec<Output> {
        let mut outputs = vec![Output::plain("client_id", remote.client_id.clone())];
        if let Some(secret) = remote.client_secret.as_ref().filter(|s| !s.is_empty()) {
            outputs.push(Output::sensitive("client_secret", secret.clone()));
        }
        outputs
    }
}
