// Reconciliation
pub mod apply;
pub mod plan;
pub mod refresh;

// State and catalog inspection
pub mod import;
pub mod runtimes;
pub mod show;
