use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{
  ArgAction,
  Parser,
  Subcommand
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::task::TaskId;
use crate::view::{
  FilterMode,
  SortMode
};

#[derive(Debug, Clone)]
pub struct KeyVal {
  pub key:   String,
  pub value: String
}

impl std::str::FromStr for KeyVal {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    let (k, v) =
      s.split_once('=').ok_or_else(|| {
        anyhow!(
          "expected KEY=VALUE, got: {s}"
        )
      })?;
    Ok(Self {
      key:   k.trim().to_string(),
      value: v.trim().to_string()
    })
  }
}

#[derive(Parser, Debug, Clone)]
#[command(
  name = "tasklet",
  version,
  about = "Tasklet: a small local task list",
  disable_help_subcommand = true
)]
pub struct GlobalCli {
  #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
  pub verbose: u8,

  #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
  pub quiet: u8,

  #[arg(
    long = "rc",
    value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
    action = ArgAction::Append,
    global = true
  )]
  pub rc_overrides: Vec<KeyVal>,

  #[arg(long = "config", global = true)]
  pub config: Option<PathBuf>,

  #[arg(long = "data", global = true)]
  pub data: Option<PathBuf>,

  #[command(subcommand)]
  pub command: Option<CliCommand>
}

#[derive(Subcommand, Debug, Clone)]
pub enum CliCommand {
  /// Create a task.
  Add {
    #[arg(required = true, num_args = 1..)]
    name:     Vec<String>,
    #[arg(long, default_value = "")]
    date:     String,
    #[arg(long, default_value = "")]
    category: String
  },
  /// Change name, date or category of a
  /// task. Fields not given keep their
  /// value.
  Edit {
    id:       TaskId,
    #[arg(long)]
    name:     Option<String>,
    #[arg(long)]
    date:     Option<String>,
    #[arg(long)]
    category: Option<String>
  },
  /// Flip a task between done and open.
  Toggle { id: TaskId },
  /// Delete a task.
  Delete {
    id:  TaskId,
    /// Skip the confirmation prompt.
    #[arg(short = 'y', long)]
    yes: bool
  },
  /// Show tasks.
  List(ListArgs),
  /// Show task counts.
  Stats
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ListArgs {
  #[arg(long, short = 's')]
  pub search: Option<String>,

  /// name, date or none.
  #[arg(long, value_parser = parse_sort)]
  pub sort:   Option<SortMode>,

  /// all, completed or uncompleted.
  #[arg(long, value_parser = parse_filter)]
  pub filter: Option<FilterMode>
}

fn parse_sort(
  s: &str
) -> Result<SortMode, String> {
  Ok(s.parse::<SortMode>().unwrap_or_default())
}

fn parse_filter(
  s: &str
) -> Result<FilterMode, String> {
  s.parse::<FilterMode>()
    .map_err(|err| err.to_string())
}

impl GlobalCli {
  pub fn command_or_default(
    &self
  ) -> CliCommand {
    self.command.clone().unwrap_or_else(
      || {
        debug!("no explicit command, using list");
        CliCommand::List(ListArgs::default())
      }
    )
  }
}

pub fn init_tracing(
  verbose: u8,
  quiet: u8
) -> anyhow::Result<()> {
  let default_level = if quiet >= 2 {
    "error"
  } else if quiet == 1 {
    "warn"
  } else if verbose >= 3 {
    "trace"
  } else if verbose == 2 {
    "debug"
  } else if verbose == 1 {
    "info"
  } else {
    "warn"
  };

  let env_filter =
    EnvFilter::try_from_default_env()
      .or_else(|_| {
        EnvFilter::try_new(default_level)
      })
      .map_err(|e| {
        anyhow!(
          "invalid RUST_LOG / log \
           filter: {e}"
        )
      })?;

  let init_result =
    tracing_subscriber::fmt()
      .with_env_filter(env_filter)
      .with_target(true)
      .with_level(true)
      .with_writer(std::io::stderr)
      .with_ansi(
        std::io::stderr().is_terminal()
      )
      .try_init();

  if let Err(err) = init_result {
    debug!(error = %err, "tracing subscriber already set, continuing");
  }

  Ok(())
}
