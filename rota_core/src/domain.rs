//! Domain model: the wire-facing request types, the validated care plan,
//! and the lookup indices that drive pairwise constraint generation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Minutes in a day. Every time in the system lives in `[0, MAX_TIME)`,
/// and this is also the big-M constant of the continuous formulation.
pub const MAX_TIME: u32 = 24 * 60;

/// Slot width of the discrete formulation, in minutes.
pub const TIME_INTERVAL: u32 = 20;

pub type NurseId = u32;
pub type PatientId = u32;
pub type TaskId = u32;

#[derive(Debug, Clone, Deserialize)]
pub struct Nurse {
    pub id: NurseId,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Patient {
    pub id: PatientId,
    #[serde(default)]
    pub name: String,
}

/// A recurring care action on one patient.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: TaskId,
    #[serde(default)]
    pub name: String,
    pub patient_id: PatientId,
    pub number_of_times: u32,
    /// Minutes the action occupies, split half before and half after the
    /// start instant for exclusivity purposes.
    #[serde(default)]
    pub duration: u32,
    /// Opaque category; instances sharing it are mutually exclusive in time.
    pub activity_type: String,
    pub minimum_separation: u32,
    pub maximum_separation: u32,
    #[serde(default)]
    pub earliest_start_time: u32,
}

/// An instance already performed earlier in the day; its slot is pinned.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletedTask {
    pub task_id: TaskId,
    pub task_instance_id: u32,
    pub start_time: u32,
    #[serde(default)]
    pub nurse_id: Option<NurseId>,
}

/// The `POST /schedule` request body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub nurses: Vec<Nurse>,
    #[serde(default)]
    pub patients: Vec<Patient>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub already_completed_tasks: Vec<CompletedTask>,
}

/// One concrete occurrence of a recurring task. Instances of a task are
/// totally ordered by `instance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceKey {
    pub task: TaskId,
    pub instance: u32,
}

/// One solved schedule entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub task_id: TaskId,
    pub task_instance_id: u32,
    pub start_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nurse_id: Option<NurseId>,
}

/// A validated request, with instances pre-grouped by activity type and by
/// patient. The groups exist before any decision variable is created; the
/// compilers iterate them instead of scanning the full entity set.
#[derive(Debug, Clone)]
pub struct CarePlan {
    nurses: Vec<Nurse>,
    patients: Vec<Patient>,
    tasks: Vec<Task>,
    task_index: HashMap<TaskId, usize>,
    completed: BTreeMap<InstanceKey, CompletedTask>,
    by_activity: BTreeMap<String, Vec<InstanceKey>>,
    by_patient: BTreeMap<PatientId, Vec<InstanceKey>>,
}

impl CarePlan {
    /// Validates the raw request. Any violation fails the whole request;
    /// nothing is partially built.
    pub fn from_request(request: ScheduleRequest) -> Result<Self, ScheduleError> {
        let ScheduleRequest {
            nurses,
            patients,
            tasks,
            already_completed_tasks,
        } = request;

        let mut nurse_ids = HashSet::new();
        for nurse in &nurses {
            if !nurse_ids.insert(nurse.id) {
                return Err(ScheduleError::validation(
                    "nurses",
                    format!("duplicate nurse id {}", nurse.id),
                ));
            }
        }

        let mut patient_ids = HashSet::new();
        for patient in &patients {
            if !patient_ids.insert(patient.id) {
                return Err(ScheduleError::validation(
                    "patients",
                    format!("duplicate patient id {}", patient.id),
                ));
            }
        }

        let mut task_index = HashMap::new();
        for (i, task) in tasks.iter().enumerate() {
            if task_index.insert(task.id, i).is_some() {
                return Err(ScheduleError::validation(
                    "tasks",
                    format!("duplicate task id {}", task.id),
                ));
            }
            if !patient_ids.contains(&task.patient_id) {
                return Err(ScheduleError::validation(
                    "patient_id",
                    format!(
                        "task {} references unknown patient {}",
                        task.id, task.patient_id
                    ),
                ));
            }
            if task.number_of_times < 1 {
                return Err(ScheduleError::validation(
                    "number_of_times",
                    format!("task {} must recur at least once", task.id),
                ));
            }
            if task.minimum_separation > task.maximum_separation {
                return Err(ScheduleError::validation(
                    "minimum_separation",
                    format!(
                        "task {}: minimum separation {} exceeds maximum separation {}",
                        task.id, task.minimum_separation, task.maximum_separation
                    ),
                ));
            }
            if task.earliest_start_time > MAX_TIME {
                return Err(ScheduleError::validation(
                    "earliest_start_time",
                    format!(
                        "task {}: {} is past the end of the day",
                        task.id, task.earliest_start_time
                    ),
                ));
            }
        }

        let mut completed = BTreeMap::new();
        for done in already_completed_tasks {
            let Some(&i) = task_index.get(&done.task_id) else {
                return Err(ScheduleError::validation(
                    "already_completed_tasks",
                    format!("unknown task {}", done.task_id),
                ));
            };
            if done.task_instance_id >= tasks[i].number_of_times {
                return Err(ScheduleError::validation(
                    "already_completed_tasks",
                    format!(
                        "task {} has no instance {}",
                        done.task_id, done.task_instance_id
                    ),
                ));
            }
            if done.start_time >= MAX_TIME {
                return Err(ScheduleError::validation(
                    "already_completed_tasks",
                    format!("start time {} is past the end of the day", done.start_time),
                ));
            }
            if let Some(nurse) = done.nurse_id {
                if !nurse_ids.contains(&nurse) {
                    return Err(ScheduleError::validation(
                        "already_completed_tasks",
                        format!("unknown nurse {nurse}"),
                    ));
                }
            }
            let key = InstanceKey {
                task: done.task_id,
                instance: done.task_instance_id,
            };
            if completed.insert(key, done).is_some() {
                return Err(ScheduleError::validation(
                    "already_completed_tasks",
                    format!("task {} instance {} reported twice", key.task, key.instance),
                ));
            }
        }

        let mut by_activity: BTreeMap<String, Vec<InstanceKey>> = BTreeMap::new();
        let mut by_patient: BTreeMap<PatientId, Vec<InstanceKey>> = BTreeMap::new();
        for task in &tasks {
            for instance in 0..task.number_of_times {
                let key = InstanceKey {
                    task: task.id,
                    instance,
                };
                by_activity
                    .entry(task.activity_type.clone())
                    .or_default()
                    .push(key);
                by_patient.entry(task.patient_id).or_default().push(key);
            }
        }

        Ok(Self {
            nurses,
            patients,
            tasks,
            task_index,
            completed,
            by_activity,
            by_patient,
        })
    }

    pub fn nurses(&self) -> &[Nurse] {
        &self.nurses
    }

    pub fn patients(&self) -> &[Patient] {
        &self.patients
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: TaskId) -> &Task {
        &self.tasks[self.task_index[&id]]
    }

    /// Every task instance in task order, instances ordered within a task.
    pub fn instances(&self) -> impl Iterator<Item = (InstanceKey, &Task)> + '_ {
        self.tasks.iter().flat_map(|task| {
            (0..task.number_of_times).map(move |instance| {
                (
                    InstanceKey {
                        task: task.id,
                        instance,
                    },
                    task,
                )
            })
        })
    }

    pub fn instance_count(&self) -> usize {
        self.tasks.iter().map(|t| t.number_of_times as usize).sum()
    }

    pub fn activity_groups(&self) -> impl Iterator<Item = (&str, &[InstanceKey])> {
        self.by_activity
            .iter()
            .map(|(activity, members)| (activity.as_str(), members.as_slice()))
    }

    pub fn patient_group(&self, id: PatientId) -> &[InstanceKey] {
        self.by_patient
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn completed(&self, key: InstanceKey) -> Option<&CompletedTask> {
        self.completed.get(&key)
    }

    pub fn completed_entries(&self) -> impl Iterator<Item = &CompletedTask> {
        self.completed.values()
    }
}
