pub mod assembler;
pub mod balance;
pub mod models;
pub mod next_due;

pub use assembler::{HierarchyAssembler, ReconcilePolicy};
pub use models::{ReconciledPlan, Reconciliation};
pub use next_due::NextDueFallback;
