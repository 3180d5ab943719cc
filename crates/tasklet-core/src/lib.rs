pub mod app;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod error;
pub mod kv;
pub mod render;
pub mod session;
pub mod store;
pub mod task;
pub mod view;

use std::ffi::OsString;

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use app::{
  Command,
  Outcome,
  Snapshot,
  TaskList
};
pub use error::TaskError;
pub use kv::{
  FileStore,
  KeyValueStore,
  MemoryStore
};
pub use session::{
  EditSession,
  TaskForm
};
pub use store::{
  Removal,
  TaskStore
};
pub use task::{
  Task,
  TaskId
};
pub use view::{
  FilterMode,
  SortMode,
  Stats,
  ViewQuery,
  derive_view,
  stats
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let cli = cli::GlobalCli::parse_from(
    raw_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasklet CLI"
  );

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    cli
      .rc_overrides
      .iter()
      .map(|kv| {
        (kv.key.clone(), kv.value.clone())
      })
  );

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let kv = FileStore::open(&data_dir)
    .with_context(|| {
      format!(
        "failed to open storage at {}",
        data_dir.display()
      )
    })?;
  let key = cfg.storage_key();
  let store = TaskStore::load(kv, &key)
    .with_context(|| {
      format!(
        "failed to load tasks from {key}"
      )
    })?;

  let command = cli.command_or_default();
  let renderer =
    render::Renderer::new(&cfg)?;
  let mut app = TaskList::new(
    store,
    commands::confirm_for(&command, &cfg)
  )
  .with_query(cfg.default_query()?);

  app.subscribe(Box::new(
    |snapshot: &Snapshot| {
      debug!(
        visible = snapshot.view.len(),
        total = snapshot.stats.total,
        completed = snapshot.stats.completed,
        "view refreshed"
      );
    }
  ));

  commands::execute(
    &mut app, &renderer, command
  )?;

  info!("done");
  Ok(())
}
