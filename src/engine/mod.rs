//! Reconciliation engine for tenantctl
//!
//! The engine orchestrates:
//! 1. Planning - Build staged plans from manifest and state
//! 2. Diffing - Read each managed resource and compare with the manifest
//! 3. Executing - Apply changes one resource at a time, saving state after each

pub mod differ;
pub mod executor;
pub mod planner;

pub use executor::{Engine, Preview};
