//! Continuous-time formulation: one start variable per task instance, a
//! big-M ordering disjunction between same-activity instances, spacing
//! chains within a task, and a per-patient gap objective.

use std::collections::BTreeMap;

use crate::domain::{CarePlan, InstanceKey, MAX_TIME};
use crate::model::{Direction, LinExpr, Model, Relation, VarId};

/// Big-M for the exclusivity disjunction. A full day dominates any feasible
/// difference of two start times, so once the order indicator is fixed
/// exactly one inequality of each pair binds.
const BIG_M: f64 = MAX_TIME as f64;

pub struct ContinuousModel {
    pub model: Model,
    /// Start variable of every task instance.
    pub starts: BTreeMap<InstanceKey, VarId>,
}

pub fn compile(plan: &CarePlan) -> ContinuousModel {
    let mut model = Model::new();
    let mut starts = BTreeMap::new();

    for (key, task) in plan.instances() {
        let (lb, ub) = match plan.completed(key) {
            // An already-performed instance keeps its recorded time.
            Some(done) => (done.start_time as f64, done.start_time as f64),
            None => (task.earliest_start_time as f64, MAX_TIME as f64),
        };
        starts.insert(key, model.continuous(lb, ub));
    }

    exclusivity(plan, &mut model, &starts);
    spacing(plan, &mut model, &starts);
    objective(plan, &mut model, &starts);

    ContinuousModel { model, starts }
}

/// Two instances of the same activity type may not overlap, each instance
/// occupying half its duration on either side of its start instant. For
/// every unordered pair, a binary `z` picks the order:
///
///   a - b >= (dur_a + dur_b)/2 - M*z
///   b - a >= (dur_a + dur_b)/2 - M*(1 - z)
fn exclusivity(plan: &CarePlan, model: &mut Model, starts: &BTreeMap<InstanceKey, VarId>) {
    for (_, members) in plan.activity_groups() {
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                let half_sum =
                    (plan.task(a.task).duration + plan.task(b.task).duration) as f64 / 2.0;
                let (sa, sb) = (starts[&a], starts[&b]);
                let z = model.binary();
                model.constrain(LinExpr::diff(sa, sb).term(z, BIG_M), Relation::Ge, half_sum);
                model.constrain(
                    LinExpr::diff(sb, sa).term(z, -BIG_M),
                    Relation::Ge,
                    half_sum - BIG_M,
                );
            }
        }
    }
}

/// Consecutive instances of a task stay within the separation window.
fn spacing(plan: &CarePlan, model: &mut Model, starts: &BTreeMap<InstanceKey, VarId>) {
    for task in plan.tasks() {
        for instance in 1..task.number_of_times {
            let prev = starts[&InstanceKey {
                task: task.id,
                instance: instance - 1,
            }];
            let cur = starts[&InstanceKey {
                task: task.id,
                instance,
            }];
            model.constrain(
                LinExpr::diff(cur, prev),
                Relation::Ge,
                task.minimum_separation as f64,
            );
            model.constrain(
                LinExpr::diff(cur, prev),
                Relation::Le,
                task.maximum_separation as f64,
            );
        }
    }
}

/// One gap variable per patient, bounded above by every signed pairwise
/// difference of the patient's instances, so it can reach at most the
/// negative of the patient's largest gap. Minimizing the negated sum pulls
/// each patient's tasks together.
fn objective(plan: &CarePlan, model: &mut Model, starts: &BTreeMap<InstanceKey, VarId>) {
    let mut expr = LinExpr::new();
    for patient in plan.patients() {
        let gap = model.continuous(-BIG_M, BIG_M);
        let members = plan.patient_group(patient.id);
        for (i, &a) in members.iter().enumerate() {
            for &b in &members[i + 1..] {
                let (sa, sb) = (starts[&a], starts[&b]);
                model.constrain(
                    LinExpr::new().term(gap, 1.0).term(sa, -1.0).term(sb, 1.0),
                    Relation::Le,
                    0.0,
                );
                model.constrain(
                    LinExpr::new().term(gap, 1.0).term(sb, -1.0).term(sa, 1.0),
                    Relation::Le,
                    0.0,
                );
            }
        }
        expr.add_term(gap, -1.0);
    }
    model.set_objective(Direction::Minimize, expr);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ScheduleRequest, Task};
    use crate::model::VarKind;

    fn plan_with_tasks(tasks: Vec<Task>) -> CarePlan {
        let patients = serde_json::from_value(serde_json::json!([{"id": 1}, {"id": 2}])).unwrap();
        CarePlan::from_request(ScheduleRequest {
            nurses: vec![],
            patients,
            tasks,
            already_completed_tasks: vec![],
        })
        .unwrap()
    }

    fn task(id: u32, patient_id: u32, times: u32, activity: &str) -> Task {
        Task {
            id,
            name: String::new(),
            patient_id,
            number_of_times: times,
            duration: 30,
            activity_type: activity.into(),
            minimum_separation: 40,
            maximum_separation: 120,
            earliest_start_time: 0,
        }
    }

    #[test]
    fn one_start_variable_per_instance() {
        let plan = plan_with_tasks(vec![task(1, 1, 3, "a"), task(2, 2, 2, "b")]);
        let compiled = compile(&plan);
        assert_eq!(compiled.starts.len(), 5);
    }

    #[test]
    fn exclusivity_adds_one_indicator_and_two_rows_per_pair() {
        // Two single-instance tasks of different patients sharing an
        // activity type: one z, two big-M rows, no spacing, no gap pairs.
        let plan = plan_with_tasks(vec![task(1, 1, 1, "wash"), task(2, 2, 1, "wash")]);
        let compiled = compile(&plan);

        // 2 starts + 1 z + 2 patient gaps
        assert_eq!(compiled.model.var_count(), 5);
        let binaries = compiled
            .model
            .vars()
            .iter()
            .filter(|v| matches!(v, VarKind::Binary { .. }))
            .count();
        assert_eq!(binaries, 1);
        assert_eq!(compiled.model.constraint_count(), 2);
    }

    #[test]
    fn spacing_adds_two_rows_per_consecutive_pair() {
        let plan = plan_with_tasks(vec![task(1, 1, 3, "a")]);
        let compiled = compile(&plan);

        // Instances share the activity type: C(3,2)=3 pairs -> 3 z + 6 rows;
        // spacing: 2 consecutive pairs -> 4 rows; patient 1 pairs -> 6 rows.
        assert_eq!(compiled.model.constraint_count(), 6 + 4 + 6);
    }

    #[test]
    fn earliest_start_becomes_the_lower_bound() {
        let mut t = task(1, 1, 1, "a");
        t.earliest_start_time = 600;
        let plan = plan_with_tasks(vec![t]);
        let compiled = compile(&plan);

        let var = compiled.starts[&InstanceKey { task: 1, instance: 0 }];
        assert_eq!(
            compiled.model.vars()[var.index()],
            VarKind::Continuous {
                lb: 600.0,
                ub: MAX_TIME as f64
            }
        );
    }

    #[test]
    fn completed_instances_are_pinned() {
        let plan = CarePlan::from_request(
            serde_json::from_value(serde_json::json!({
                "patients": [{"id": 1}],
                "tasks": [{
                    "id": 1, "patient_id": 1, "number_of_times": 2,
                    "duration": 0, "activity_type": "a",
                    "minimum_separation": 40, "maximum_separation": 120
                }],
                "already_completed_tasks": [
                    {"task_id": 1, "task_instance_id": 0, "start_time": 100}
                ]
            }))
            .unwrap(),
        )
        .unwrap();
        let compiled = compile(&plan);

        let var = compiled.starts[&InstanceKey { task: 1, instance: 0 }];
        assert_eq!(
            compiled.model.vars()[var.index()],
            VarKind::Continuous { lb: 100.0, ub: 100.0 }
        );
    }
}
