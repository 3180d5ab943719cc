use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{
  Deserialize,
  Serialize
};
use tracing::trace;

use crate::task::Task;

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
  Name,
  Date,
  /// Keep insertion order.
  #[default]
  #[serde(rename = "none")]
  Insertion
}

impl SortMode {
  pub fn label(self) -> &'static str {
    match self {
      | Self::Name => "name",
      | Self::Date => "date",
      | Self::Insertion => "none"
    }
  }
}

/// Unknown sort names fall back to
/// insertion order instead of failing.
impl FromStr for SortMode {
  type Err = std::convert::Infallible;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    Ok(
      match s
        .trim()
        .to_ascii_lowercase()
        .as_str()
      {
        | "name" => Self::Name,
        | "date" => Self::Date,
        | _ => Self::Insertion
      }
    )
  }
}

impl fmt::Display for SortMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
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
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
  #[default]
  All,
  Completed,
  Uncompleted
}

impl FilterMode {
  pub fn label(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Completed => "completed",
      | Self::Uncompleted => "uncompleted"
    }
  }

  pub fn keeps(self, task: &Task) -> bool {
    match self {
      | Self::All => true,
      | Self::Completed => task.completed,
      | Self::Uncompleted => !task.completed
    }
  }
}

impl FromStr for FilterMode {
  type Err = anyhow::Error;

  fn from_str(
    s: &str
  ) -> Result<Self, Self::Err> {
    match s
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "all" => Ok(Self::All),
      | "completed" => Ok(Self::Completed),
      | "uncompleted" => {
        Ok(Self::Uncompleted)
      }
      | other => Err(anyhow!(
        "invalid filter {other:?}; \
         expected all, completed or \
         uncompleted"
      ))
    }
  }
}

impl fmt::Display for FilterMode {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>
  ) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(
  Debug, Clone, Default, PartialEq, Eq,
)]
pub struct ViewQuery {
  pub search: String,
  pub sort:   SortMode,
  pub filter: FilterMode
}

/// Search, then sort, then completion
/// filter. The input is left untouched.
#[tracing::instrument(skip(tasks))]
pub fn derive_view(
  tasks: &[Task],
  query: &ViewQuery
) -> Vec<Task> {
  let needle = query.search.to_lowercase();

  let mut view: Vec<Task> = tasks
    .iter()
    .filter(|task| {
      needle.is_empty()
        || task
          .name
          .to_lowercase()
          .contains(&needle)
    })
    .cloned()
    .collect();

  match query.sort {
    | SortMode::Name => {
      view.sort_by(|a, b| {
        compare_names(&a.name, &b.name)
      });
    }
    | SortMode::Date => {
      view.sort_by(compare_dates);
    }
    | SortMode::Insertion => {}
  }

  view.retain(|task| query.filter.keeps(task));

  trace!(
    input = tasks.len(),
    output = view.len(),
    "derived view"
  );
  view
}

fn compare_names(
  left: &str,
  right: &str
) -> Ordering {
  left
    .to_lowercase()
    .cmp(&right.to_lowercase())
    .then_with(|| left.cmp(right))
}

/// Undated tasks go after dated ones.
fn compare_dates(
  left: &Task,
  right: &Task
) -> Ordering {
  match (
    left.calendar_date(),
    right.calendar_date()
  ) {
    | (Some(a), Some(b)) => a.cmp(&b),
    | (Some(_), None) => Ordering::Less,
    | (None, Some(_)) => Ordering::Greater,
    | (None, None) => Ordering::Equal
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
pub struct Stats {
  pub total:       usize,
  pub completed:   usize,
  pub uncompleted: usize
}

/// Counts over the whole collection,
/// ignoring search and filters.
pub fn stats(tasks: &[Task]) -> Stats {
  let total = tasks.len();
  let completed = tasks
    .iter()
    .filter(|task| task.completed)
    .count();
  Stats {
    total,
    completed,
    uncompleted: total - completed
  }
}
