use serde::Serialize;
use tracing::debug;

use crate::error::TaskError;
use crate::kv::KeyValueStore;
use crate::store::TaskStore;
use crate::task::{
  Task,
  TaskId
};

/// Field values of the task form.
#[derive(
  Debug,
  Clone,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub struct TaskForm {
  pub name:     String,
  pub date:     String,
  pub category: String
}

impl TaskForm {
  pub fn new(
    name: impl Into<String>,
    date: impl Into<String>,
    category: impl Into<String>
  ) -> Self {
    Self {
      name:     name.into(),
      date:     date.into(),
      category: category.into()
    }
  }

  pub fn from_task(task: &Task) -> Self {
    Self {
      name:     task.name.clone(),
      date:     task.date.clone(),
      category: task.category.clone()
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
)]
pub enum EditSession {
  #[default]
  Creating,
  Editing(TaskId)
}

/// What a submit did to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
  Created(Task),
  Updated(Task),
  /// The edited task no longer exists.
  Vanished(TaskId)
}

impl EditSession {
  pub fn editing(&self) -> Option<TaskId> {
    match self {
      | Self::Creating => None,
      | Self::Editing(id) => Some(*id)
    }
  }

  /// Targets `id` for editing and returns
  /// the form filled from it. A request for
  /// another task while editing re-targets
  /// the session; unknown ids change
  /// nothing.
  pub fn begin_edit(
    &mut self,
    tasks: &[Task],
    id: TaskId
  ) -> Option<TaskForm> {
    let task =
      tasks.iter().find(|t| t.id == id)?;
    if let Self::Editing(previous) = *self
      && previous != id
    {
      debug!(previous, id, "re-targeting edit session");
    }
    *self = Self::Editing(id);
    Some(TaskForm::from_task(task))
  }

  pub fn cancel(&mut self) {
    if let Self::Editing(id) = *self {
      debug!(id, "edit cancelled");
    }
    *self = Self::Creating;
  }

  /// Creates or updates depending on the
  /// state. A rejected form keeps the
  /// session where it was.
  pub fn submit<S: KeyValueStore>(
    &mut self,
    store: &mut TaskStore<S>,
    form: &TaskForm
  ) -> Result<Submitted, TaskError> {
    let submitted = match *self {
      | Self::Creating => {
        Submitted::Created(store.add(
          &form.name,
          &form.date,
          &form.category
        )?)
      }
      | Self::Editing(id) => {
        match store.update(
          id,
          &form.name,
          &form.date,
          &form.category
        )? {
          | Some(task) => {
            Submitted::Updated(task)
          }
          | None => Submitted::Vanished(id)
        }
      }
    };

    *self = Self::Creating;
    Ok(submitted)
  }
}

#[cfg(test)]
mod tests {
  use super::{
    EditSession,
    Submitted,
    TaskForm
  };
  use crate::error::TaskError;
  use crate::kv::{
    KeyValueStore,
    MemoryStore
  };
  use crate::store::TaskStore;
  use crate::task::Task;

  fn seeded() -> TaskStore<MemoryStore> {
    let mut kv = MemoryStore::new();
    kv.set(
      "tasks",
      r#"[
        {"id":1,"name":"Buy milk","date":"2024-01-01","category":"errand","completed":false},
        {"id":2,"name":"Walk dog","date":"","category":"chore","completed":true}
      ]"#
    )
    .expect("seed");
    TaskStore::load(kv, "tasks").expect("load")
  }

  #[test]
  fn begin_edit_prefills_form() {
    let store = seeded();
    let mut session = EditSession::default();
    let form = session
      .begin_edit(store.tasks(), 1)
      .expect("known id");
    assert_eq!(session, EditSession::Editing(1));
    assert_eq!(
      form,
      TaskForm::new("Buy milk", "2024-01-01", "errand")
    );
  }

  #[test]
  fn begin_edit_unknown_id_is_noop() {
    let store = seeded();
    let mut session = EditSession::Editing(2);
    assert!(session.begin_edit(store.tasks(), 42).is_none());
    assert_eq!(session, EditSession::Editing(2));
  }

  #[test]
  fn last_edit_request_wins() {
    let store = seeded();
    let mut session = EditSession::default();
    session.begin_edit(store.tasks(), 1);
    let form = session
      .begin_edit(store.tasks(), 2)
      .expect("known id");
    assert_eq!(session.editing(), Some(2));
    assert_eq!(form.name, "Walk dog");
  }

  #[test]
  fn cancel_discards_without_touching_store() {
    let store = seeded();
    let before: Vec<Task> = store.tasks().to_vec();
    let mut session = EditSession::default();
    let mut form = session
      .begin_edit(store.tasks(), 1)
      .expect("known id");
    form.name = "Something else".to_string();

    session.cancel();
    assert_eq!(session, EditSession::Creating);
    assert_eq!(store.tasks(), before.as_slice());
  }

  #[test]
  fn submit_in_creating_adds() {
    let mut store = seeded();
    let mut session = EditSession::default();
    let submitted = session
      .submit(
        &mut store,
        &TaskForm::new("Pay rent", "", "bills")
      )
      .expect("submit");
    assert!(matches!(submitted, Submitted::Created(ref t) if t.name == "Pay rent"));
    assert_eq!(store.len(), 3);
    assert_eq!(session, EditSession::Creating);
  }

  #[test]
  fn submit_in_editing_updates_and_returns_to_creating() {
    let mut store = seeded();
    let mut session = EditSession::default();
    let mut form = session
      .begin_edit(store.tasks(), 2)
      .expect("known id");
    form.date = "2024-02-01".to_string();

    let submitted = session
      .submit(&mut store, &form)
      .expect("submit");
    let Submitted::Updated(task) = submitted else {
      panic!("expected update, got {submitted:?}");
    };
    assert_eq!(task.id, 2);
    assert!(task.completed);
    assert_eq!(task.date, "2024-02-01");
    assert_eq!(store.len(), 2);
    assert_eq!(session, EditSession::Creating);
  }

  #[test]
  fn rejected_submit_keeps_session() {
    let mut store = seeded();
    let mut session = EditSession::default();
    session.begin_edit(store.tasks(), 1);

    let err = session
      .submit(&mut store, &TaskForm::new(" ", "", ""))
      .expect_err("blank name");
    assert!(matches!(err, TaskError::EmptyName));
    assert_eq!(session, EditSession::Editing(1));
  }

  #[test]
  fn submit_for_vanished_task_returns_to_creating() {
    let mut store = seeded();
    let mut session = EditSession::default();
    session.begin_edit(store.tasks(), 1);
    store
      .remove(1, &mut |_: &Task| true)
      .expect("remove");

    let submitted = session
      .submit(&mut store, &TaskForm::new("x", "", ""))
      .expect("submit");
    assert_eq!(submitted, Submitted::Vanished(1));
    assert_eq!(session, EditSession::Creating);
    assert_eq!(store.len(), 1);
  }
}
