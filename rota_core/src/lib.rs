//! Daily nurse-rota scheduling: compiles patients, recurring tasks and
//! nurses into a mixed-integer model, solves it behind an opaque backend,
//! and decodes the assignment into per-instance start times.
//!
//! Two formulations share the domain model and the extractor: continuous
//! start times with big-M exclusivity (primary), and a discretized
//! nurse/slot assignment with clustering bonuses (alternate).

pub mod compiler;
pub mod config;
pub mod domain;
pub mod error;
pub mod extractor;
pub mod model;
pub mod solver;

pub use config::{Formulation, ModelLimits, SolveConfig};
pub use domain::{CarePlan, Event, ScheduleRequest};
pub use error::ScheduleError;
pub use solver::{MilpBackend, SolverBackend};

/// Validates a request and runs the full pipeline with the default
/// MILP backend.
pub fn solve_request(
    request: ScheduleRequest,
    config: &SolveConfig,
) -> Result<Vec<Event>, ScheduleError> {
    let plan = CarePlan::from_request(request)?;
    tracing::debug!(
        nurses = plan.nurses().len(),
        tasks = plan.tasks().len(),
        instances = plan.instance_count(),
        "request validated"
    );
    compiler::schedule(&plan, config, &MilpBackend)
}
