//! Managed resources
//!
//! Every function and secret is modeled as a [`declarative::Resource`] that
//! plans against its state record and applies through the engine. Records
//! without a desired counterpart become delete steps.

pub mod function;
pub mod secret;

pub use function::FunctionResource;
pub use secret::SecretResource;

use crate::function::FunctionEngine;
use crate::schema::Desired;
use crate::state::StateStore;
use declarative::BoxedResource;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Resources for the desired state, plus delete steps for orphaned records
pub fn build(desired: Desired, engine: &FunctionEngine, store: &Arc<StateStore>) -> Vec<BoxedResource> {
    let state = store.snapshot();
    let client = engine.shared_client();
    let mut resources: Vec<BoxedResource> = Vec::new();

    let mut declared = BTreeSet::new();
    for spec in desired.secrets {
        declared.insert(spec.name.clone());
        resources.push(Box::new(SecretResource::new(
            spec.name.clone(),
            Some(spec),
            Arc::clone(&client),
            Arc::clone(store),
        )));
    }
    for name in state.secrets.keys().filter(|n| !declared.contains(*n)) {
        resources.push(Box::new(SecretResource::new(
            name.clone(),
            None,
            Arc::clone(&client),
            Arc::clone(store),
        )));
    }

    let mut declared = BTreeSet::new();
    for spec in desired.functions {
        declared.insert(spec.name.clone());
        resources.push(Box::new(FunctionResource::new(
            spec.name.clone(),
            Some(spec),
            engine.clone(),
            Arc::clone(store),
        )));
    }
    for name in state.functions.keys().filter(|n| !declared.contains(*n)) {
        resources.push(Box::new(FunctionResource::new(
            name.clone(),
            None,
            engine.clone(),
            Arc::clone(store),
        )));
    }

    resources
}

/// Delete steps for everything recorded in state
pub fn build_destroy(engine: &FunctionEngine, store: &Arc<StateStore>) -> Vec<BoxedResource> {
    build(Desired::default(), engine, store)
}
