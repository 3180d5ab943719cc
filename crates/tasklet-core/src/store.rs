use std::collections::BTreeSet;

use tracing::{
  debug,
  info,
  warn
};

use crate::clock::{
  Clock,
  SystemClock,
  next_task_id
};
use crate::error::TaskError;
use crate::kv::KeyValueStore;
use crate::task::{
  Task,
  TaskId
};

pub const DEFAULT_STORAGE_KEY: &str =
  "tasks";

/// Asked before a task is removed.
pub trait Confirm {
  fn confirm(&mut self, task: &Task) -> bool;
}

impl<F> Confirm for F
where
  F: FnMut(&Task) -> bool
{
  fn confirm(&mut self, task: &Task) -> bool {
    self(task)
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal {
  Removed(Task),
  Declined,
  NotFound
}

/// The task collection, mirrored to a
/// key-value store after every mutation.
pub struct TaskStore<S> {
  kv:    S,
  key:   String,
  tasks: Vec<Task>,
  clock: Box<dyn Clock>
}

impl<S: KeyValueStore> TaskStore<S> {
  pub fn load(
    kv: S,
    key: &str
  ) -> Result<Self, TaskError> {
    Self::load_with_clock(
      kv,
      key,
      Box::new(SystemClock)
    )
  }

  /// Reads the collection stored at `key`.
  /// Missing or unparsable data yields an
  /// empty collection and malformed records
  /// are skipped; read errors from the
  /// backend are returned.
  #[tracing::instrument(skip(kv, clock))]
  pub fn load_with_clock(
    kv: S,
    key: &str,
    clock: Box<dyn Clock>
  ) -> Result<Self, TaskError> {
    let tasks = match kv.get(key)? {
      | Some(raw) => decode_tasks(&raw),
      | None => {
        debug!("no saved tasks, starting empty");
        Vec::new()
      }
    };

    info!(count = tasks.len(), "loaded tasks");

    Ok(Self {
      kv,
      key: key.to_string(),
      tasks,
      clock
    })
  }

  pub fn tasks(&self) -> &[Task] {
    &self.tasks
  }

  pub fn get(
    &self,
    id: TaskId
  ) -> Option<&Task> {
    self.tasks.iter().find(|t| t.id == id)
  }

  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }

  pub fn key(&self) -> &str {
    &self.key
  }

  pub fn kv(&self) -> &S {
    &self.kv
  }

  #[tracing::instrument(skip(self))]
  pub fn add(
    &mut self,
    name: &str,
    date: &str,
    category: &str
  ) -> Result<Task, TaskError> {
    let name = name.trim();
    if name.is_empty() {
      debug!("rejecting task with empty name");
      return Err(TaskError::EmptyName);
    }

    let id = next_task_id(
      &self.tasks,
      self.clock.now()
    );
    let task = Task::new(
      id,
      name.to_string(),
      date.to_string(),
      category.to_string()
    );
    self.tasks.push(task.clone());
    debug!(id, count = self.tasks.len(), "task added");

    self.persist()?;
    Ok(task)
  }

  /// Replaces name, date and category.
  /// Id and completion state are kept.
  #[tracing::instrument(skip(self))]
  pub fn update(
    &mut self,
    id: TaskId,
    name: &str,
    date: &str,
    category: &str
  ) -> Result<Option<Task>, TaskError> {
    let name = name.trim();
    if name.is_empty() {
      return Err(TaskError::EmptyName);
    }

    let Some(slot) = self
      .tasks
      .iter_mut()
      .find(|t| t.id == id)
    else {
      debug!(id, "update target not found");
      return Ok(None);
    };

    *slot = Task {
      id,
      name: name.to_string(),
      date: date.to_string(),
      category: category.to_string(),
      completed: slot.completed
    };
    let updated = slot.clone();

    self.persist()?;
    Ok(Some(updated))
  }

  #[tracing::instrument(skip(self))]
  pub fn toggle(
    &mut self,
    id: TaskId
  ) -> Result<Option<Task>, TaskError> {
    let Some(slot) = self
      .tasks
      .iter_mut()
      .find(|t| t.id == id)
    else {
      debug!(id, "toggle target not found");
      return Ok(None);
    };

    *slot = Task {
      completed: !slot.completed,
      ..slot.clone()
    };
    let toggled = slot.clone();

    self.persist()?;
    Ok(Some(toggled))
  }

  #[tracing::instrument(skip(self, confirm))]
  pub fn remove(
    &mut self,
    id: TaskId,
    confirm: &mut dyn Confirm
  ) -> Result<Removal, TaskError> {
    let Some(idx) = self
      .tasks
      .iter()
      .position(|t| t.id == id)
    else {
      debug!(id, "remove target not found");
      return Ok(Removal::NotFound);
    };

    if !confirm.confirm(&self.tasks[idx]) {
      debug!(id, "removal declined");
      return Ok(Removal::Declined);
    }

    let removed = self.tasks.remove(idx);
    self.persist()?;
    Ok(Removal::Removed(removed))
  }

  /// Overwrites the stored value with the
  /// whole collection.
  #[tracing::instrument(skip(self), fields(key = %self.key))]
  pub fn persist(
    &mut self
  ) -> Result<(), TaskError> {
    let serialized =
      serde_json::to_string(&self.tasks)?;
    self.kv.set(&self.key, &serialized)?;
    debug!(
      count = self.tasks.len(),
      bytes = serialized.len(),
      "persisted tasks"
    );
    Ok(())
  }
}

fn decode_tasks(raw: &str) -> Vec<Task> {
  let records: Vec<serde_json::Value> =
    match serde_json::from_str(raw) {
      | Ok(records) => records,
      | Err(error) => {
        warn!(
          %error,
          "stored tasks are unreadable; \
           starting empty"
        );
        return Vec::new();
      }
    };

  let before = records.len();
  let parsed: Vec<Task> = records
    .into_iter()
    .enumerate()
    .filter_map(|(idx, record)| {
      match serde_json::from_value(record) {
        | Ok(task) => Some(task),
        | Err(error) => {
          warn!(idx, %error, "dropping malformed stored task");
          None
        }
      }
    })
    .collect();

  let mut seen = BTreeSet::new();
  let kept: Vec<Task> = parsed
    .into_iter()
    .filter(|task| {
      if task.name.trim().is_empty() {
        warn!(id = task.id, "dropping stored task with empty name");
        return false;
      }
      if !seen.insert(task.id) {
        warn!(id = task.id, "dropping stored task with duplicate id");
        return false;
      }
      true
    })
    .collect();

  if kept.len() != before {
    info!(
      before,
      after = kept.len(),
      "discarded invalid stored tasks"
    );
  }
  kept
}
