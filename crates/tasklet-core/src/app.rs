use serde::Serialize;
use tracing::{
  debug,
  info,
  instrument
};

use crate::error::TaskError;
use crate::kv::KeyValueStore;
use crate::session::{
  EditSession,
  Submitted,
  TaskForm
};
use crate::store::{
  Confirm,
  Removal,
  TaskStore
};
use crate::task::{
  Task,
  TaskId
};
use crate::view::{
  FilterMode,
  SortMode,
  Stats,
  ViewQuery,
  derive_view,
  stats
};

/// Named operations a front end can
/// invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Add(TaskForm),
  Update {
    id:   TaskId,
    form: TaskForm
  },
  Toggle(TaskId),
  Remove(TaskId),
  BeginEdit(TaskId),
  /// Replaces the form contents without
  /// submitting.
  EditForm(TaskForm),
  CancelEdit,
  Submit,
  SetSearch(String),
  SetSort(SortMode),
  SetFilter(FilterMode)
}

/// Result of one dispatched command.
#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct Outcome {
  /// Tasks or view state changed and a
  /// re-render is due.
  pub changed: bool,
  /// Message for the user, if any.
  pub notice:  Option<String>,
  /// Task the command acted on.
  pub task:    Option<Task>
}

impl Outcome {
  fn changed(task: Option<Task>) -> Self {
    Self {
      changed: true,
      notice: None,
      task
    }
  }

  fn notice(
    message: impl Into<String>
  ) -> Self {
    Self {
      changed: false,
      notice:  Some(message.into()),
      task:    None
    }
  }
}

/// Everything a renderer needs.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
  pub view:    Vec<Task>,
  pub stats:   Stats,
  pub session: EditSession,
  pub form:    TaskForm
}

pub type Observer =
  Box<dyn FnMut(&Snapshot)>;

/// Owns the task store plus the transient
/// UI state around it.
pub struct TaskList<S> {
  store:     TaskStore<S>,
  session:   EditSession,
  form:      TaskForm,
  query:     ViewQuery,
  confirm:   Box<dyn Confirm>,
  observers: Vec<Observer>
}

impl<S: KeyValueStore> TaskList<S> {
  pub fn new(
    store: TaskStore<S>,
    confirm: Box<dyn Confirm>
  ) -> Self {
    Self {
      store,
      session: EditSession::default(),
      form: TaskForm::default(),
      query: ViewQuery::default(),
      confirm,
      observers: Vec::new()
    }
  }

  pub fn with_query(
    mut self,
    query: ViewQuery
  ) -> Self {
    self.query = query;
    self
  }

  pub fn store(&self) -> &TaskStore<S> {
    &self.store
  }

  pub fn session(&self) -> EditSession {
    self.session
  }

  pub fn form(&self) -> &TaskForm {
    &self.form
  }

  pub fn query(&self) -> &ViewQuery {
    &self.query
  }

  pub fn view(&self) -> Vec<Task> {
    derive_view(
      self.store.tasks(),
      &self.query
    )
  }

  pub fn stats(&self) -> Stats {
    stats(self.store.tasks())
  }

  pub fn snapshot(&self) -> Snapshot {
    Snapshot {
      view:    self.view(),
      stats:   self.stats(),
      session: self.session,
      form:    self.form.clone()
    }
  }

  pub fn subscribe(
    &mut self,
    observer: Observer
  ) {
    self.observers.push(observer);
  }

  /// Sends a fresh snapshot to every
  /// observer. Never called by `dispatch`.
  pub fn notify(&mut self) {
    let snapshot = self.snapshot();
    debug!(
      observers = self.observers.len(),
      visible = snapshot.view.len(),
      "notifying observers"
    );
    for observer in &mut self.observers {
      observer(&snapshot);
    }
  }

  /// Runs one command. Empty names come
  /// back as a notice; storage failures are
  /// returned as errors.
  #[instrument(skip(self))]
  pub fn dispatch(
    &mut self,
    command: Command
  ) -> Result<Outcome, TaskError> {
    info!("dispatching command");

    let result = match command {
      | Command::Add(form) => self
        .store
        .add(
          &form.name,
          &form.date,
          &form.category
        )
        .map(|task| {
          Outcome::changed(Some(task))
        }),
      | Command::Update {
        id,
        form
      } => self
        .store
        .update(
          id,
          &form.name,
          &form.date,
          &form.category
        )
        .map(found),
      | Command::Toggle(id) => {
        self.store.toggle(id).map(found)
      }
      | Command::Remove(id) => self
        .store
        .remove(id, self.confirm.as_mut())
        .map(|removal| match removal {
          | Removal::Removed(task) => {
            if self.session.editing()
              == Some(task.id)
            {
              self.session.cancel();
              self.form = TaskForm::default();
            }
            Outcome::changed(Some(task))
          }
          | Removal::Declined
          | Removal::NotFound => {
            Outcome::default()
          }
        }),
      | Command::BeginEdit(id) => {
        match self
          .session
          .begin_edit(self.store.tasks(), id)
        {
          | Some(form) => {
            self.form = form;
            Ok(Outcome::changed(
              self.store.get(id).cloned()
            ))
          }
          | None => Ok(Outcome::default())
        }
      }
      | Command::EditForm(form) => {
        self.form = form;
        Ok(Outcome::changed(None))
      }
      | Command::CancelEdit => {
        self.session.cancel();
        self.form = TaskForm::default();
        Ok(Outcome::changed(None))
      }
      | Command::Submit => self
        .session
        .submit(&mut self.store, &self.form)
        .map(|submitted| {
          self.form = TaskForm::default();
          match submitted {
            | Submitted::Created(task)
            | Submitted::Updated(task) => {
              Outcome::changed(Some(task))
            }
            | Submitted::Vanished(_) => {
              Outcome::changed(None)
            }
          }
        }),
      | Command::SetSearch(search) => {
        self.query.search = search;
        Ok(Outcome::changed(None))
      }
      | Command::SetSort(sort) => {
        self.query.sort = sort;
        Ok(Outcome::changed(None))
      }
      | Command::SetFilter(filter) => {
        self.query.filter = filter;
        Ok(Outcome::changed(None))
      }
    };

    match result {
      | Err(err) if err.is_rejection() => {
        debug!(%err, "command rejected");
        Ok(Outcome::notice(err.to_string()))
      }
      | other => other
    }
  }
}

fn found(task: Option<Task>) -> Outcome {
  match task {
    | Some(task) => {
      Outcome::changed(Some(task))
    }
    | None => Outcome::default()
  }
}
