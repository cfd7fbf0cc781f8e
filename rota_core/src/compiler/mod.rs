//! Turns a validated care plan into a solver model and a solved assignment
//! back into events. One call covers the whole pipeline for a request:
//! size guard, compile, solve, decode.

pub mod continuous;
pub mod discrete;

use crate::config::{Formulation, ModelLimits, SolveConfig};
use crate::domain::{CarePlan, Event, MAX_TIME, TIME_INTERVAL};
use crate::error::ScheduleError;
use crate::extractor;
use crate::solver::SolverBackend;

pub fn schedule(
    plan: &CarePlan,
    config: &SolveConfig,
    backend: &impl SolverBackend,
) -> Result<Vec<Event>, ScheduleError> {
    estimate(plan, config.formulation).check(&config.limits)?;

    let events = match config.formulation {
        Formulation::Continuous => {
            let continuous::ContinuousModel { model, starts } = continuous::compile(plan);
            tracing::debug!(
                vars = model.var_count(),
                constraints = model.constraint_count(),
                "continuous model built"
            );
            let solved = backend.solve(model, config.deadline)?;
            tracing::debug!(status = ?solved.status, objective = solved.objective, "solved");
            extractor::decode_continuous(&starts, &solved)?
        }
        Formulation::Discrete => {
            let discrete::DiscreteModel { model, assignments } = discrete::compile(plan)?;
            tracing::debug!(
                vars = model.var_count(),
                constraints = model.constraint_count(),
                "discrete model built"
            );
            let solved = backend.solve(model, config.deadline)?;
            tracing::debug!(status = ?solved.status, objective = solved.objective, "solved");
            extractor::decode_discrete(&assignments, &solved)?
        }
    };
    tracing::debug!(events = events.len(), "schedule extracted");
    Ok(events)
}

/// Predicted model size, computed arithmetically before anything is
/// allocated. Slightly conservative for the discrete formulation: pruning
/// that depends on slot fixing is not anticipated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelEstimate {
    pub variables: usize,
    pub constraints: usize,
}

impl ModelEstimate {
    fn check(self, limits: &ModelLimits) -> Result<(), ScheduleError> {
        if self.variables > limits.max_variables {
            return Err(ScheduleError::ResourceExceeded {
                quantity: "variables",
                estimated: self.variables,
                limit: limits.max_variables,
            });
        }
        if self.constraints > limits.max_constraints {
            return Err(ScheduleError::ResourceExceeded {
                quantity: "constraints",
                estimated: self.constraints,
                limit: limits.max_constraints,
            });
        }
        Ok(())
    }
}

pub fn estimate(plan: &CarePlan, formulation: Formulation) -> ModelEstimate {
    match formulation {
        Formulation::Continuous => estimate_continuous(plan),
        Formulation::Discrete => estimate_discrete(plan),
    }
}

fn unordered_pairs(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

fn estimate_continuous(plan: &CarePlan) -> ModelEstimate {
    let starts = plan.instance_count();
    let exclusivity_pairs: usize = plan
        .activity_groups()
        .map(|(_, members)| unordered_pairs(members.len()))
        .sum();
    let spacing_pairs: usize = plan
        .tasks()
        .iter()
        .map(|t| t.number_of_times as usize - 1)
        .sum();
    let gap_pairs: usize = plan
        .patients()
        .iter()
        .map(|p| unordered_pairs(plan.patient_group(p.id).len()))
        .sum();

    ModelEstimate {
        variables: starts + exclusivity_pairs + plan.patients().len(),
        constraints: 2 * exclusivity_pairs + 2 * spacing_pairs + 2 * gap_pairs,
    }
}

fn estimate_discrete(plan: &CarePlan) -> ModelEstimate {
    let slots = (MAX_TIME / TIME_INTERVAL) as usize;
    let nurses = plan.nurses().len();
    let instances = plan.instance_count();
    let base = instances * nurses * slots;

    // Ordered slot pairs within the proximity reward window.
    let proximity_slot_pairs = slot_pairs_within(2 * TIME_INTERVAL);
    let proximity = unordered_pairs(instances) * nurses * nurses * proximity_slot_pairs;

    let separation: usize = plan
        .tasks()
        .iter()
        .map(|t| {
            unordered_pairs(t.number_of_times as usize)
                * nurses
                * nurses
                * slot_pairs_strictly_within(t.minimum_separation)
        })
        .sum();

    ModelEstimate {
        // base assignments + one AND indicator per proximity pair
        variables: base + proximity,
        // coverage + pins + capacity + separation + 3 rows per indicator
        constraints: instances
            + plan.completed_entries().count()
            + nurses * slots
            + separation
            + 3 * proximity,
    }
}

fn slot_pairs_within(limit: u32) -> usize {
    count_slot_pairs(|gap| gap <= limit)
}

fn slot_pairs_strictly_within(limit: u32) -> usize {
    count_slot_pairs(|gap| gap < limit)
}

fn count_slot_pairs(close: impl Fn(u32) -> bool) -> usize {
    let mut count = 0;
    for t1 in discrete::slots() {
        for t2 in discrete::slots() {
            if close(t1.abs_diff(t2)) {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ScheduleRequest;

    fn plan(json: serde_json::Value) -> CarePlan {
        CarePlan::from_request(serde_json::from_value::<ScheduleRequest>(json).unwrap()).unwrap()
    }

    fn small_plan() -> CarePlan {
        plan(serde_json::json!({
            "nurses": [{"id": 1}],
            "patients": [{"id": 1}],
            "tasks": [{
                "id": 1, "patient_id": 1, "number_of_times": 3, "duration": 10,
                "activity_type": "a", "minimum_separation": 40, "maximum_separation": 120
            }]
        }))
    }

    #[test]
    fn continuous_estimate_matches_the_built_model() {
        let plan = small_plan();
        let estimate = estimate_continuous(&plan);
        let compiled = continuous::compile(&plan);
        assert_eq!(estimate.variables, compiled.model.var_count());
        assert_eq!(estimate.constraints, compiled.model.constraint_count());
    }

    #[test]
    fn discrete_estimate_dominates_the_built_model() {
        let plan = small_plan();
        let estimate = estimate_discrete(&plan);
        let compiled = discrete::compile(&plan).unwrap();
        assert!(estimate.variables >= compiled.model.var_count());
        assert!(estimate.constraints >= compiled.model.constraint_count());
    }

    #[test]
    fn oversized_models_are_refused() {
        let estimate = ModelEstimate {
            variables: 10,
            constraints: 10,
        };
        let limits = ModelLimits {
            max_variables: 9,
            max_constraints: 100,
        };
        assert!(matches!(
            estimate.check(&limits),
            Err(ScheduleError::ResourceExceeded {
                quantity: "variables",
                estimated: 10,
                limit: 9,
            })
        ));
    }
}
