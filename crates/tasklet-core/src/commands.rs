use std::io::{
  self,
  BufRead,
  Write
};

use tracing::{
  debug,
  info,
  instrument,
  warn
};

use crate::app::{
  Command,
  Outcome,
  TaskList
};
use crate::cli::{
  CliCommand,
  ListArgs
};
use crate::config::Config;
use crate::kv::KeyValueStore;
use crate::render::Renderer;
use crate::session::TaskForm;
use crate::store::Confirm;
use crate::task::{
  Task,
  TaskId
};

/// Confirmation strategy for a command:
/// an interactive prompt for `delete`
/// unless `--yes` or `confirm = false`.
pub fn confirm_for(
  command: &CliCommand,
  cfg: &Config
) -> Box<dyn Confirm> {
  let prompt = match command {
    | CliCommand::Delete {
      yes, ..
    } => {
      !*yes
        && cfg
          .get_bool("confirm")
          .unwrap_or(true)
    }
    | _ => false
  };

  if prompt {
    Box::new(prompt_on_stdin)
  } else {
    Box::new(|_: &Task| true)
  }
}

fn prompt_on_stdin(task: &Task) -> bool {
  let mut err = io::stderr().lock();
  if write!(
    err,
    "Delete task {} \"{}\"? [y/N] ",
    task.id, task.name
  )
  .and_then(|()| err.flush())
  .is_err()
  {
    return false;
  }

  let mut answer = String::new();
  match io::stdin().lock().read_line(&mut answer) {
    | Ok(_) => matches!(
      answer.trim().to_ascii_lowercase().as_str(),
      "y" | "yes"
    ),
    | Err(error) => {
      warn!(%error, "could not read confirmation");
      false
    }
  }
}

#[instrument(skip(app, renderer, command))]
pub fn execute<S: KeyValueStore>(
  app: &mut TaskList<S>,
  renderer: &Renderer,
  command: CliCommand
) -> anyhow::Result<()> {
  match command {
    | CliCommand::Add {
      name,
      date,
      category
    } => cmd_add(
      app,
      TaskForm::new(name.join(" "), date, category)
    ),
    | CliCommand::Edit {
      id,
      name,
      date,
      category
    } => cmd_edit(app, id, name, date, category),
    | CliCommand::Toggle {
      id
    } => cmd_toggle(app, id),
    | CliCommand::Delete {
      id, ..
    } => cmd_delete(app, id),
    | CliCommand::List(args) => {
      cmd_list(app, renderer, args)
    }
    | CliCommand::Stats => {
      info!("command stats");
      renderer.print_stats(app.stats())
    }
  }
}

fn cmd_add<S: KeyValueStore>(
  app: &mut TaskList<S>,
  form: TaskForm
) -> anyhow::Result<()> {
  info!("command add");
  let outcome =
    app.dispatch(Command::Add(form))?;
  if report_notice(&outcome) {
    return Ok(());
  }

  if let Some(task) = &outcome.task {
    println!("Created task {}.", task.id);
  }
  app.notify();
  Ok(())
}

fn cmd_edit<S: KeyValueStore>(
  app: &mut TaskList<S>,
  id: TaskId,
  name: Option<String>,
  date: Option<String>,
  category: Option<String>
) -> anyhow::Result<()> {
  info!("command edit");

  let opened =
    app.dispatch(Command::BeginEdit(id))?;
  if !opened.changed {
    println!("No task with id {id}.");
    return Ok(());
  }

  let prefilled = app.form().clone();
  let form = TaskForm {
    name:     name.unwrap_or(prefilled.name),
    date:     date.unwrap_or(prefilled.date),
    category: category
      .unwrap_or(prefilled.category)
  };
  debug!(?form, "submitting edited form");
  app.dispatch(Command::EditForm(form))?;

  let outcome =
    app.dispatch(Command::Submit)?;
  if report_notice(&outcome) {
    app.dispatch(Command::CancelEdit)?;
    return Ok(());
  }

  match &outcome.task {
    | Some(task) => {
      println!("Modified task {}.", task.id)
    }
    | None => {
      println!("No task with id {id}.")
    }
  }
  app.notify();
  Ok(())
}

fn cmd_toggle<S: KeyValueStore>(
  app: &mut TaskList<S>,
  id: TaskId
) -> anyhow::Result<()> {
  info!("command toggle");
  let outcome =
    app.dispatch(Command::Toggle(id))?;

  match &outcome.task {
    | Some(task) if task.completed => {
      println!("Completed task {id}.")
    }
    | Some(_) => {
      println!("Reopened task {id}.")
    }
    | None => {
      println!("No task with id {id}.");
      return Ok(());
    }
  }
  app.notify();
  Ok(())
}

fn cmd_delete<S: KeyValueStore>(
  app: &mut TaskList<S>,
  id: TaskId
) -> anyhow::Result<()> {
  info!("command delete");
  let outcome =
    app.dispatch(Command::Remove(id))?;

  if outcome.changed {
    println!("Deleted task {id}.");
    app.notify();
  } else if app.store().get(id).is_some() {
    println!("Kept task {id}.");
  } else {
    println!("No task with id {id}.");
  }
  Ok(())
}

fn cmd_list<S: KeyValueStore>(
  app: &mut TaskList<S>,
  renderer: &Renderer,
  args: ListArgs
) -> anyhow::Result<()> {
  info!("command list");

  if let Some(search) = args.search {
    app.dispatch(Command::SetSearch(search))?;
  }
  if let Some(sort) = args.sort {
    app.dispatch(Command::SetSort(sort))?;
  }
  if let Some(filter) = args.filter {
    app.dispatch(Command::SetFilter(filter))?;
  }
  debug!(query = ?app.query(), "listing tasks");

  app.subscribe(renderer.observer(io::stdout()));
  app.notify();
  Ok(())
}

fn report_notice(outcome: &Outcome) -> bool {
  match &outcome.notice {
    | Some(notice) => {
      println!("{notice}");
      true
    }
    | None => false
  }
}
