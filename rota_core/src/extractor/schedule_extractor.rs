use std::collections::BTreeMap;

use crate::compiler::discrete::SlotKey;
use crate::domain::{Event, InstanceKey};
use crate::error::ScheduleError;
use crate::model::VarId;
use crate::solver::Solved;

/// One event per instance at its solved start value, in
/// `(task_id, instance)` order.
pub fn decode_continuous(
    starts: &BTreeMap<InstanceKey, VarId>,
    solved: &Solved,
) -> Result<Vec<Event>, ScheduleError> {
    Ok(starts
        .iter()
        .map(|(key, &var)| Event {
            task_id: key.task,
            task_instance_id: key.instance,
            start_time: solved.value(var),
            nurse_id: None,
        })
        .collect())
}

/// One event per instance from its unique true assignment, carrying the
/// nurse and the slot time. A missing or duplicated assignment means the
/// solver broke the coverage contract; the whole result is rejected rather
/// than returned partially.
pub fn decode_discrete(
    assignments: &BTreeMap<SlotKey, VarId>,
    solved: &Solved,
) -> Result<Vec<Event>, ScheduleError> {
    let mut events: BTreeMap<InstanceKey, Event> = BTreeMap::new();
    for (key, &var) in assignments {
        if !solved.is_true(var) {
            continue;
        }
        let instance = key.instance_key();
        if events.contains_key(&instance) {
            return Err(ScheduleError::Solver(format!(
                "task {} instance {} was assigned more than once",
                instance.task, instance.instance
            )));
        }
        events.insert(
            instance,
            Event {
                task_id: key.task,
                task_instance_id: key.instance,
                start_time: key.slot as f64,
                nurse_id: Some(key.nurse),
            },
        );
    }

    for key in assignments.keys() {
        let instance = key.instance_key();
        if !events.contains_key(&instance) {
            return Err(ScheduleError::Solver(format!(
                "task {} instance {} received no assignment",
                instance.task, instance.instance
            )));
        }
    }

    Ok(events.into_values().collect())
}
