pub mod budget;
pub mod defect;
pub mod gate;
pub mod reconciler;

pub use budget::{RevisionBudget, RevisionLimitExceeded};
pub use defect::{rank_defects, Defect, Severity};
pub use gate::{judge, FixFactory, ReviewGate, ReviewResult};
pub use reconciler::Reconciler;
