//! Access grant reconciler.
//!
//! The grant collection has no single-object GET, so a grant is read back
//! through the `client_id` + `audience` filter. At most one grant may match
//! a pair; more than one is refused rather than guessed at.

use crate::error::{Error, Result};
use crate::exchange::{Exchange, ExchangeResult, StatusClass};
use crate::resources::{compare, encode, nullable};
use declarative::{FieldChange, Outcome, Output, Reconciler, ResourceState};
use serde::{Deserialize, Serialize};

/// Resource kind label.
pub const KIND: &str = "grant";

const COLLECTION: &str = "/api/v2/client-grants";

/// Output holding the client the grant was created for.
pub const OUTPUT_CLIENT_ID: &str = "client_id";
/// Output holding the audience the grant was created for.
pub const OUTPUT_AUDIENCE: &str = "audience";

/// Desired state of an access grant, also its wire body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSpec {
    pub client_id: String,
    pub audience: String,
    pub scope: Vec<String>,
}

impl GrantSpec {
    pub fn new(
        client_id: impl Into<String>,
        audience: impl Into<String>,
        scope: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            audience: audience.into(),
            scope: scope.into_iter().map(Into::into).collect(),
        }
    }
}

/// Access grant as reported by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccessGrant {
    #[serde(deserialize_with = "nullable")]
    pub id: String,
    #[serde(deserialize_with = "nullable")]
    pub client_id: String,
    #[serde(deserialize_with = "nullable")]
    pub audience: String,
    #[serde(deserialize_with = "nullable")]
    pub scope: Vec<String>,
}

/// Reconciler for access grants.
#[derive(Debug, Clone)]
pub struct GrantReconciler {
    exchange: Exchange,
}

impl GrantReconciler {
    pub fn new(exchange: Exchange) -> Self {
        Self { exchange }
    }

    fn instance_path(id: &str) -> String {
        format!("{COLLECTION}/{}", encode(id))
    }

    fn filter_path(desired: &GrantSpec) -> String {
        format!(
            "{COLLECTION}?client_id={}&audience={}",
            encode(&desired.client_id),
            encode(&desired.audience)
        )
    }

    fn decode_instance(result: &ExchangeResult, expected: &str) -> Result<AccessGrant> {
        let mut grant: AccessGrant = result.decode("grant response")?;
        if grant.id.is_empty() {
            grant.id = expected.to_string();
        } else if grant.id != expected {
            return Err(Error::IdentityMismatch {
                kind: KIND,
                expected: expected.to_string(),
                actual: grant.id,
            });
        }
        Ok(grant)
    }
}

impl Reconciler for GrantReconciler {
    type Desired = GrantSpec;
    type Remote = AccessGrant;
    type Error = Error;

    fn kind(&self) -> &'static str {
        KIND
    }

    fn create(&self, state: &ResourceState, desired: &GrantSpec) -> Result<Outcome<AccessGrant>> {
        state.require_unmanaged(KIND)?;

        let result = self.exchange.post(COLLECTION, desired)?;
        if result.status != 201 {
            return Err(Error::CreateRejected {
                kind: KIND,
                status: result.status,
                body: result.body,
            });
        }

        let mut grant: AccessGrant = result.decode("grant create response")?;
        if grant.id.is_empty() {
            return Err(Error::decode("grant create response", "id is missing"));
        }
        if grant.client_id.is_empty() {
            grant.client_id.clone_from(&desired.client_id);
        }
        if grant.audience.is_empty() {
            grant.audience.clone_from(&desired.audience);
        }

        log::debug!(
            "Grant {} binds client {} to {}",
            grant.id,
            desired.client_id,
            desired.audience
        );
        Ok(Outcome::managed(grant.id.clone(), grant))
    }

    fn read(&self, state: &ResourceState, desired: &GrantSpec) -> Result<Outcome<AccessGrant>> {
        let id = state.require_managed(KIND)?;

        let result = self.exchange.get(&Self::filter_path(desired))?;
        match result.class {
            StatusClass::NotFound => return Ok(Outcome::absent()),
            StatusClass::ClientOrServerError => {
                return Err(Error::ReadFailed {
                    kind: KIND,
                    status: result.status,
                    body: result.body,
                });
            }
            StatusClass::Success => {}
        }

        let mut grants: Vec<AccessGrant> = result.decode("grant list")?;
        match grants.len() {
            0 => {
                log::debug!("Grant {id} not found remotely");
                Ok(Outcome::absent())
            }
            1 => {
                let grant = grants.remove(0);
                if grant.id != id {
                    return Err(Error::IdentityMismatch {
                        kind: KIND,
                        expected: id.to_string(),
                        actual: grant.id,
                    });
                }
                Ok(Outcome::managed(id, grant))
            }
            count => Err(Error::DuplicateResource {
                client_id: desired.client_id.clone(),
                audience: desired.audience.clone(),
                count,
                body: result.body,
            }),
        }
    }

    fn update(&self, state: &ResourceState, desired: &GrantSpec) -> Result<Outcome<AccessGrant>> {
        let id = state.require_managed(KIND)?;

        let result = self.exchange.patch(&Self::instance_path(id), desired)?;
        if result.status != 200 {
            return Err(Error::UpdateRejected {
                kind: KIND,
                status: result.status,
                body: result.body,
            });
        }

        let grant = Self::decode_instance(&result, id)?;
        Ok(Outcome::managed(id, grant))
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

    fn diff(&self, remote: &AccessGrant, desired: &GrantSpec) -> Vec<FieldChange> {
        let mut changes = Vec::new();
        compare(&mut changes, "client_id", &remote.client_id, &desired.client_id);
        compare(&mut changes, "audience", &remote.audience, &desired.audience);
        compare(&mut changes, "scope", &remote.scope, &desired.scope);
        changes
    }

    /// A grant is found by its client and audience, so moving either one
    /// means a new grant.
    fn requires_replacement(&self, recorded: &GrantSpec, desired: &GrantSpec) -> bool {
        recorded.client_id != desired.client_id || recorded.audience != desired.audience
    }

    fn outputs(&self, remote: &AccessGrant) -> Vec<Output> {
        vec![
            Output::plain("grant_id", remote.id.clone()),
            Output::plain(OUTPUT_CLIENT_ID, remote.client_id.clone()),
            Output::plain(OUTPUT_AUDIENCE, remote.audience.clone()),
        ]
    }
}
