//! Builds execution plans from the manifest and recorded state
//!
//! Resources are reconciled in stages so that identities flow forward:
//! 1. orphan grants (recorded, no longer declared) are deleted
//! 2. clients, declared and orphaned
//! 3. declared grants, whose `client` references resolve through state
//!    written by stage 2

use crate::manifest::{ClientRef, GrantEntry, Manifest, client_address, grant_address};
use crate::state::StateFile;
use declarative::{ExecutionPlan, ManagedResource, matches_target};
use mgmtapi::resources::{client, grant};
use mgmtapi::{GrantSpec, ManagementApi};

/// A declared grant whose client had no identity yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deferred {
    pub address: String,
    pub key: String,
    pub client_address: String,
}

/// How a declared grant's client was resolved
enum Resolution {
    Ready(GrantSpec),
    Waiting(String),
}

/// Builds plans for one manifest against one tenant
pub struct Planner<'a> {
    api: &'a ManagementApi,
    manifest: &'a Manifest,
    target: Option<&'a str>,
}

impl<'a> Planner<'a> {
    pub fn new(api: &'a ManagementApi, manifest: &'a Manifest, target: Option<&'a str>) -> Self {
        Self {
            api,
            manifest,
            target,
        }
    }

    /// Stage 1: recorded grants with no manifest entry
    pub fn orphan_grants(&self, state: &StateFile) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for address in state.addresses_of(grant::KIND) {
            if !self.declares(&address) {
                plan.add_resource(Box::new(ManagedResource::absent(
                    address.as_str(),
                    self.api.grants(),
                    state.resource_state(&address),
                )));
            }
        }
        plan.filter_by_target(self.target)
    }

    /// Stage 2: declared clients, then orphaned ones
    pub fn clients(&self, state: &StateFile) -> ExecutionPlan {
        let mut plan = ExecutionPlan::new();
        for (key, spec) in &self.manifest.clients {
            let address = client_address(key);
            let current = state.resource_state(&address);
            plan.add_resource(Box::new(ManagedResource::present(
                address,
                self.api.clients(),
                spec.clone(),
                current,
            )));
        }
        for address in state.addresses_of(client::KIND) {
            if !self.declares(&address) {
                plan.add_resource(Box::new(ManagedResource::absent(
                    address.as_str(),
                    self.api.clients(),
                    state.resource_state(&address),
                )));
            }
        }
        plan.filter_by_target(self.target)
    }

    /// Stage 3: declared grants whose client identity is known.
    ///
    /// Grants referring to a client without a recorded identity are
    /// returned separately; they can only be planned once that client
    /// exists.
    pub fn grants(&self, state: &StateFile) -> (ExecutionPlan, Vec<Deferred>) {
        self.grants_where(state, |_| true)
    }

    /// Re-plan previously deferred grants against updated state
    pub fn deferred(&self, state: &StateFile, deferred: &[Deferred]) -> (ExecutionPlan, Vec<Deferred>) {
        self.grants_where(state, |key| deferred.iter().any(|d| d.key == key))
    }

    fn grants_where<F>(&self, state: &StateFile, include: F) -> (ExecutionPlan, Vec<Deferred>)
    where
        F: Fn(&str) -> bool,
    {
        let mut plan = ExecutionPlan::new();
        let mut waiting = Vec::new();

        for (key, entry) in &self.manifest.grants {
            let address = grant_address(key);
            if !include(key) || !self.targeted(grant::KIND, &address) {
                continue;
            }

            match resolve(entry, state) {
                Resolution::Ready(spec) => {
                    let current = state.resource_state(&address);
                    let mut resource =
                        ManagedResource::present(address.as_str(), self.api.grants(), spec, current);
                    if let Some(recorded) = recorded_pair(state, &address) {
                        resource = resource.with_recorded(recorded);
                    }
                    plan.add_resource(Box::new(resource));
                }
                Resolution::Waiting(client_address) => {
                    log::debug!("{address} waits for {client_address}");
                    waiting.push(Deferred {
                        address,
                        key: key.clone(),
                        client_address,
                    });
                }
            }
        }

        (plan, waiting)
    }

    fn declares(&self, address: &str) -> bool {
        match address.split_once('.') {
            Some((client::KIND, key)) => self.manifest.clients.contains_key(key),
            Some((grant::KIND, key)) => self.manifest.grants.contains_key(key),
            _ => false,
        }
    }

    fn targeted(&self, kind: &str, address: &str) -> bool {
        self.target
            .is_none_or(|target| matches_target(target, kind, address))
    }
}

/// Plans deleting every recorded resource, grants before clients
pub fn destroy_plans(
    api: &ManagementApi,
    state: &StateFile,
    target: Option<&str>,
) -> Vec<ExecutionPlan> {
    let mut grants = ExecutionPlan::new();
    for address in state.addresses_of(grant::KIND) {
        grants.add_resource(Box::new(ManagedResource::absent(
            address.as_str(),
            api.grants(),
            state.resource_state(&address),
        )));
    }

    let mut clients = ExecutionPlan::new();
    for address in state.addresses_of(client::KIND) {
        clients.add_resource(Box::new(ManagedResource::absent(
            address.as_str(),
            api.clients(),
            state.resource_state(&address),
        )));
    }

    vec![
        grants.filter_by_target(target),
        clients.filter_by_target(target),
    ]
}

/// Client and audience a managed grant was last applied with
fn recorded_pair(state: &StateFile, address: &str) -> Option<GrantSpec> {
    let record = state.get(address)?;
    let client_id = record.outputs.get(grant::OUTPUT_CLIENT_ID)?;
    let audience = record.outputs.get(grant::OUTPUT_AUDIENCE)?;
    Some(GrantSpec::new(
        client_id.as_str(),
        audience.as_str(),
        std::iter::empty::<String>(),
    ))
}

fn resolve(entry: &GrantEntry, state: &StateFile) -> Resolution {
    let client_id = match entry.client_ref() {
        Some(ClientRef::Id(id)) => id.to_string(),
        Some(ClientRef::Key(key)) => {
            let address = client_address(key);
            match state.id(&address) {
                Some(id) => id.to_string(),
                None => return Resolution::Waiting(address),
            }
        }
        // Rejected by manifest validation
        None => return Resolution::Waiting(String::new()),
    };

    Resolution::Ready(GrantSpec::new(
        client_id,
        entry.audience.as_str(),
        entry.scope.iter().map(String::as_str),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use declarative::ResourceState;
    use mgmtapi::{MockTransport, Session};
    use std::sync::Arc;

    fn api() -> ManagementApi {
        let session = Session::new("tenant.example.com", "tok").unwrap();
        ManagementApi::with_session(Arc::new(MockTransport::new()), session)
    }

    fn manifest() -> Manifest {
        Manifest::parse(
            r#"
[clients.web]
name = "Web"

[grants.web-api]
client = "web"
audience = "https://api.example.com/"
scope = ["read:items"]

[grants.legacy]
client_id = "ext-1"
audience = "https://api.example.com/"
scope = []
"#,
        )
        .unwrap()
    }

    fn state_with(records: &[(&str, &str, &str)]) -> StateFile {
        let mut state = StateFile::new("tenant.example.com");
        for (address, kind, id) in records {
            state.record(address, kind, &ResourceState::managed(*id), &[]);
        }
        state
    }

    #[test]
    fn test_orphan_grants_only_undeclared() {
        let api = api();
        let manifest = manifest();
        let state = state_with(&[
            ("grant.web-api", "grant", "cgr_1"),
            ("grant.old", "grant", "cgr_2"),
        ]);

        let plan = Planner::new(&api, &manifest, None).orphan_grants(&state);
        assert_eq!(plan.addresses(), vec!["grant.old".to_string()]);
    }

    #[test]
    fn test_clients_declared_then_orphaned() {
        let api = api();
        let manifest = manifest();
        let state = state_with(&[("client.gone", "client", "c-9")]);

        let plan = Planner::new(&api, &manifest, None).clients(&state);
        assert_eq!(
            plan.addresses(),
            vec!["client.web".to_string(), "client.gone".to_string()]
        );
        assert!(plan.resources[0].state().id().is_none());
        assert_eq!(plan.resources[1].state().id(), Some("c-9"));
    }

    #[test]
    fn test_grants_defer_unknown_client() {
        let api = api();
        let manifest = manifest();
        let state = StateFile::new("tenant.example.com");

        let (plan, deferred) = Planner::new(&api, &manifest, None).grants(&state);
        assert_eq!(plan.addresses(), vec!["grant.legacy".to_string()]);
        assert_eq!(
            deferred,
            vec![Deferred {
                address: "grant.web-api".to_string(),
                key: "web-api".to_string(),
                client_address: "client.web".to_string(),
            }]
        );
    }

    #[test]
    fn test_deferred_resolve_after_client_recorded() {
        let api = api();
        let manifest = manifest();
        let planner = Planner::new(&api, &manifest, None);

        let (_, deferred) = planner.grants(&StateFile::new("tenant.example.com"));
        let state = state_with(&[("client.web", "client", "abc123")]);

        let (plan, waiting) = planner.deferred(&state, &deferred);
        assert!(waiting.is_empty());
        assert_eq!(plan.addresses(), vec!["grant.web-api".to_string()]);
    }

    #[test]
    fn test_target_filters_every_stage() {
        let api = api();
        let manifest = manifest();
        let state = state_with(&[("grant.old", "grant", "cgr_2")]);
        let planner = Planner::new(&api, &manifest, Some("grant.web-api"));

        assert!(planner.orphan_grants(&state).is_empty());
        assert!(planner.clients(&state).is_empty());
        let (plan, deferred) = planner.grants(&state);
        assert!(plan.is_empty());
        assert_eq!(deferred.len(), 1);
    }

    #[test]
    fn test_recorded_pair_from_grant_outputs() {
        let mut state = StateFile::new("tenant.example.com");
        state.record(
            "grant.legacy",
            "grant",
            &ResourceState::managed("cgr_1"),
            &[
                declarative::Output::plain("grant_id", "cgr_1"),
                declarative::Output::plain("client_id", "ext-1"),
                declarative::Output::plain("audience", "https://old.example.com/"),
            ],
        );

        let pair = recorded_pair(&state, "grant.legacy").unwrap();
        assert_eq!(pair.client_id, "ext-1");
        assert_eq!(pair.audience, "https://old.example.com/");

        // records written without the pair fall back to the manifest's
        let bare = state_with(&[("grant.legacy", "grant", "cgr_1")]);
        assert!(recorded_pair(&bare, "grant.legacy").is_none());
    }

    #[test]
    fn test_destroy_plans_grants_first() {
        let api = api();
        let state = state_with(&[
            ("client.web", "client", "abc"),
            ("grant.web-api", "grant", "cgr_1"),
        ]);

        let plans = destroy_plans(&api, &state, None);
        assert_eq!(plans[0].addresses(), vec!["grant.web-api".to_string()]);
        assert_eq!(plans[1].addresses(), vec!["client.web".to_string()]);

        let targeted = destroy_plans(&api, &state, Some("clients"));
        assert!(targeted[0].is_empty());
        assert_eq!(targeted[1].total_resources(), 1);
    }
}
