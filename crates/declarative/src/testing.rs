//! In-memory reconciler for tests

use crate::reconciler::{Outcome, Reconciler};
use crate::types::{FieldChange, LifecycleError, Output, ResourceState};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeRemote {
    pub id: String,
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum FakeError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
    #[error("remote rejected the write")]
    Rejected,
}

#[derive(Debug, Default)]
struct Store {
    records: BTreeMap<String, String>,
    next_id: u32,
    calls: usize,
    fail_writes: bool,
    fail_creates: bool,
}

impl Store {
    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("fake-{}", self.next_id)
    }
}

/// Reconciler over a shared in-memory map; clones share the same store
#[derive(Debug, Clone, Default)]
pub struct FakeReconciler {
    store: Rc<RefCell<Store>>,
}

impl FakeReconciler {
    /// Insert a remote record without counting it as a call
    pub fn seed(&self, value: &str) -> String {
        let mut store = self.store.borrow_mut();
        let id = store.allocate_id();
        store.records.insert(id.clone(), value.to_string());
        id
    }

    pub fn value(&self, id: &str) -> Option<String> {
        self.store.borrow().records.get(id).cloned()
    }

    pub fn calls(&self) -> usize {
        self.store.borrow().calls
    }

    pub fn fail_writes(&self) {
        self.store.borrow_mut().fail_writes = true;
    }

    pub fn fail_creates(&self) {
        self.store.borrow_mut().fail_creates = true;
    }

    fn begin_write(&self) -> Result<std::cell::RefMut<'_, Store>, FakeError> {
        let mut store = self.store.borrow_mut();
        store.calls += 1;
        if store.fail_writes {
            return Err(FakeError::Rejected);
        }
        Ok(store)
    }
}

impl Reconciler for FakeReconciler {
    type Desired = String;
    type Remote = FakeRemote;
    type Error = FakeError;

    fn kind(&self) -> &'static str {
        "fake"
    }

    fn create(
        &self,
        state: &ResourceState,
        desired: &String,
    ) -> Result<Outcome<FakeRemote>, FakeError> {
        state.require_unmanaged(self.kind())?;
        let mut store = self.begin_write()?;
        if store.fail_creates {
            return Err(FakeError::Rejected);
        }
        let id = store.allocate_id();
        store.records.insert(id.clone(), desired.clone());
        Ok(Outcome::managed(
            id.clone(),
            FakeRemote {
                id,
                value: desired.clone(),
            },
        ))
    }

    fn read(
        &self,
        state: &ResourceState,
        _desired: &String,
    ) -> Result<Outcome<FakeRemote>, FakeError> {
        let id = state.require_managed(self.kind())?;
        let mut store = self.store.borrow_mut();
        store.calls += 1;
        Ok(match store.records.get(id) {
            Some(value) => Outcome::managed(
                id,
                FakeRemote {
                    id: id.to_string(),
                    value: value.clone(),
                },
            ),
            None => Outcome::absent(),
        })
    }

    fn update(
        &self,
        state: &ResourceState,
        desired: &String,
    ) -> Result<Outcome<FakeRemote>, FakeError> {
        let id = state.require_managed(self.kind())?;
        let mut store = self.begin_write()?;
        let Some(value) = store.records.get_mut(id) else {
            return Err(FakeError::Rejected);
        };
        value.clone_from(desired);
        Ok(Outcome::managed(
            id,
            FakeRemote {
                id: id.to_string(),
                value: desired.clone(),
            },
        ))
    }

    fn delete(&self, state: &ResourceState) -> Result<ResourceState, FakeError> {
        let id = state.require_managed(self.kind())?;
        let mut store = self.begin_write()?;
        store
            .records
            .remove(id)
            .map(|_| ResourceState::Unmanaged)
            .ok_or(FakeError::Rejected)
    }

    fn diff(&self, remote: &FakeRemote, desired: &String) -> Vec<FieldChange> {
        if remote.value == *desired {
            Vec::new()
        } else {
            vec![FieldChange::new("value", remote.value.clone(), desired.clone())]
        }
    }

    /// Values are `key:value`; a different key needs a new record
    fn requires_replacement(&self, recorded: &String, desired: &String) -> bool {
        recorded.split(':').next() != desired.split(':').next()
    }

    fn outputs(&self, remote: &FakeRemote) -> Vec<Output> {
        vec![Output::plain("fake_id", remote.id.clone())]
    }
}
