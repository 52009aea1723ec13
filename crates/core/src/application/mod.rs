// Application Layer - Use Cases and Business Logic

pub mod config;
pub mod diagnostics;
pub mod executor;
pub mod planner;
pub mod rollback;

// Re-exports
pub use config::AgentConfig;
pub use diagnostics::DiagnosticsEngine;
pub use executor::ActionExecutor;
pub use planner::{propose, PlannedStep, ProposedPlan};
pub use rollback::{RollbackHandler, RollbackOutcome, RollbackReport, RollbackService};

use crate::port::AuditLog;
use std::sync::Arc;
use tracing::warn;

/// Best-effort audit append: a failed append must never fail the audited
/// operation, so failures are downgraded to a warning.
pub async fn audit_best_effort(audit: &Arc<dyn AuditLog>, event: &str, data: serde_json::Value) {
    if let Err(e) = audit.log(event, data).await {
        warn!(error = %e, event = %event, "Audit append failed; continuing");
    }
}
