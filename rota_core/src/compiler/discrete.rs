//! Discretized assignment formulation: one boolean per
//! `(task instance, nurse, slot)` quadruple, exact-coverage and capacity
//! rows, and a clustering objective built from pairwise AND indicators.

use std::collections::BTreeMap;

use crate::domain::{CarePlan, InstanceKey, NurseId, TaskId, MAX_TIME, TIME_INTERVAL};
use crate::error::ScheduleError;
use crate::model::{Direction, LinExpr, Model, Relation, VarId};

/// Reward for two assignments at most one interval apart.
pub(crate) const ADJACENT_REWARD: f64 = 80.0;
/// Reward for two assignments at most two intervals apart.
pub(crate) const NEAR_REWARD: f64 = 40.0;
/// Bonus per assignment scheduled between 07:00 and 21:00.
pub(crate) const DAYTIME_BONUS: f64 = 10.0;
const DAYTIME_START: u32 = 7 * 60;
const DAYTIME_END: u32 = 21 * 60;

/// Coordinates of one boolean assignment variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SlotKey {
    pub task: TaskId,
    pub instance: u32,
    pub nurse: NurseId,
    pub slot: u32,
}

impl SlotKey {
    pub fn instance_key(&self) -> InstanceKey {
        InstanceKey {
            task: self.task,
            instance: self.instance,
        }
    }
}

#[derive(Debug)]
pub struct DiscreteModel {
    pub model: Model,
    pub assignments: BTreeMap<SlotKey, VarId>,
}

pub fn slots() -> impl Iterator<Item = u32> {
    (0..MAX_TIME).step_by(TIME_INTERVAL as usize)
}

pub fn compile(plan: &CarePlan) -> Result<DiscreteModel, ScheduleError> {
    if plan.nurses().is_empty() {
        return Err(ScheduleError::validation(
            "nurses",
            "the discrete formulation needs at least one nurse",
        ));
    }

    let mut model = Model::new();
    let mut assignments = BTreeMap::new();

    // Slots before a task's earliest start are fixed off at creation; every
    // later row may assume the remaining domain is the feasible one.
    for (key, task) in plan.instances() {
        for nurse in plan.nurses() {
            for slot in slots() {
                let var = if slot < task.earliest_start_time {
                    model.fixed_binary(false)
                } else {
                    model.binary()
                };
                assignments.insert(
                    SlotKey {
                        task: key.task,
                        instance: key.instance,
                        nurse: nurse.id,
                        slot,
                    },
                    var,
                );
            }
        }
    }

    coverage(plan, &mut model, &assignments);
    pin_completed(plan, &mut model, &assignments);
    capacity(plan, &mut model, &assignments);
    minimum_separation(plan, &mut model, &assignments);
    objective(plan, &mut model, &assignments);

    Ok(DiscreteModel { model, assignments })
}

/// Each instance is performed exactly once, by exactly one nurse, at
/// exactly one slot.
fn coverage(plan: &CarePlan, model: &mut Model, assignments: &BTreeMap<SlotKey, VarId>) {
    for (key, _) in plan.instances() {
        let mut sum = LinExpr::new();
        for nurse in plan.nurses() {
            for slot in slots() {
                sum.add_term(
                    assignments[&SlotKey {
                        task: key.task,
                        instance: key.instance,
                        nurse: nurse.id,
                        slot,
                    }],
                    1.0,
                );
            }
        }
        model.constrain(sum, Relation::Eq, 1.0);
    }
}

/// An already-performed instance must land on its recorded slot (and nurse,
/// when one was reported).
fn pin_completed(plan: &CarePlan, model: &mut Model, assignments: &BTreeMap<SlotKey, VarId>) {
    for done in plan.completed_entries() {
        let slot = done.start_time - done.start_time % TIME_INTERVAL;
        let mut sum = LinExpr::new();
        match done.nurse_id {
            Some(nurse) => sum.add_term(
                assignments[&SlotKey {
                    task: done.task_id,
                    instance: done.task_instance_id,
                    nurse,
                    slot,
                }],
                1.0,
            ),
            None => {
                for nurse in plan.nurses() {
                    sum.add_term(
                        assignments[&SlotKey {
                            task: done.task_id,
                            instance: done.task_instance_id,
                            nurse: nurse.id,
                            slot,
                        }],
                        1.0,
                    );
                }
            }
        }
        model.constrain(sum, Relation::Eq, 1.0);
    }
}

/// A nurse performs at most one instance per slot.
fn capacity(plan: &CarePlan, model: &mut Model, assignments: &BTreeMap<SlotKey, VarId>) {
    for nurse in plan.nurses() {
        for slot in slots() {
            let mut sum = LinExpr::new();
            for (key, _) in plan.instances() {
                sum.add_term(
                    assignments[&SlotKey {
                        task: key.task,
                        instance: key.instance,
                        nurse: nurse.id,
                        slot,
                    }],
                    1.0,
                );
            }
            model.constrain(sum, Relation::Le, 1.0);
        }
    }
}

/// Two instances of the same task cannot land closer than the task's
/// minimum separation, regardless of nurse.
fn minimum_separation(plan: &CarePlan, model: &mut Model, assignments: &BTreeMap<SlotKey, VarId>) {
    for task in plan.tasks() {
        for i in 0..task.number_of_times {
            for j in i + 1..task.number_of_times {
                for n1 in plan.nurses() {
                    for n2 in plan.nurses() {
                        for t1 in slots() {
                            for t2 in slots() {
                                if t1.abs_diff(t2) >= task.minimum_separation {
                                    continue;
                                }
                                let a = assignments[&SlotKey {
                                    task: task.id,
                                    instance: i,
                                    nurse: n1.id,
                                    slot: t1,
                                }];
                                let b = assignments[&SlotKey {
                                    task: task.id,
                                    instance: j,
                                    nurse: n2.id,
                                    slot: t2,
                                }];
                                model.constrain(
                                    LinExpr::new().term(a, 1.0).term(b, 1.0),
                                    Relation::Le,
                                    1.0,
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

/// Clustering bonus: an AND indicator per eligible pair of assignments,
/// rewarded by how close the two slots are, plus a flat daytime bonus.
///
/// Pairs are pruned at generation instead of enumerated: same-instance
/// pairs can never both hold (coverage), pairs more than two intervals
/// apart carry no reward, and same-task pairs inside the minimum
/// separation are already forbidden outright.
fn objective(plan: &CarePlan, model: &mut Model, assignments: &BTreeMap<SlotKey, VarId>) {
    let mut expr = LinExpr::new();

    let instances: Vec<(InstanceKey, u32)> = plan
        .instances()
        .map(|(key, task)| (key, task.earliest_start_time))
        .collect();

    for (i, &(ka, earliest_a)) in instances.iter().enumerate() {
        for &(kb, earliest_b) in &instances[i + 1..] {
            let same_task = ka.task == kb.task;
            let min_sep = plan.task(ka.task).minimum_separation;
            for n1 in plan.nurses() {
                for n2 in plan.nurses() {
                    for t1 in slots() {
                        if t1 < earliest_a {
                            continue;
                        }
                        for t2 in slots() {
                            if t2 < earliest_b {
                                continue;
                            }
                            let gap = t1.abs_diff(t2);
                            if gap > 2 * TIME_INTERVAL {
                                continue;
                            }
                            if same_task && gap < min_sep {
                                continue;
                            }
                            let reward = if gap <= TIME_INTERVAL {
                                ADJACENT_REWARD
                            } else {
                                NEAR_REWARD
                            };
                            let a = assignments[&SlotKey {
                                task: ka.task,
                                instance: ka.instance,
                                nurse: n1.id,
                                slot: t1,
                            }];
                            let b = assignments[&SlotKey {
                                task: kb.task,
                                instance: kb.instance,
                                nurse: n2.id,
                                slot: t2,
                            }];
                            let both = model.and_indicator(a, b);
                            expr.add_term(both, reward);
                        }
                    }
                }
            }
        }
    }

    for (key, task) in plan.instances() {
        for nurse in plan.nurses() {
            for slot in slots() {
                if slot < DAYTIME_START || slot >= DAYTIME_END {
                    continue;
                }
                if slot < task.earliest_start_time {
                    continue;
                }
                expr.add_term(
                    assignments[&SlotKey {
                        task: key.task,
                        instance: key.instance,
                        nurse: nurse.id,
                        slot,
                    }],
                    DAYTIME_BONUS,
                );
            }
        }
    }

    model.set_objective(Direction::Maximize, expr);
}
