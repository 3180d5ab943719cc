use chrono::{
  DateTime,
  NaiveDate
};
use serde::{
  Deserialize,
  Serialize
};

pub type TaskId = u64;

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct Task {
  pub id:        TaskId,

  pub name:      String,

  /// Empty when the task has no date.
  #[serde(default)]
  pub date:      String,

  #[serde(default)]
  pub category:  String,

  #[serde(default)]
  pub completed: bool
}

impl Task {
  pub fn new(
    id: TaskId,
    name: String,
    date: String,
    category: String
  ) -> Self {
    Self {
      id,
      name,
      date,
      category,
      completed: false
    }
  }

  pub fn has_date(&self) -> bool {
    !self.date.trim().is_empty()
  }

  /// Calendar date used for sorting.
  /// `None` for missing or unparsable
  /// text.
  #[must_use]
  pub fn calendar_date(
    &self
  ) -> Option<NaiveDate> {
    parse_calendar_date(&self.date)
  }
}

/// Accepts `YYYY-MM-DD` and RFC 3339
/// timestamps.
#[must_use]
pub fn parse_calendar_date(
  raw: &str
) -> Option<NaiveDate> {
  let trimmed = raw.trim();
  if trimmed.is_empty() {
    return None;
  }

  if let Ok(date) = NaiveDate::parse_from_str(
    trimmed, "%Y-%m-%d"
  ) {
    return Some(date);
  }

  DateTime::parse_from_rfc3339(trimmed)
    .ok()
    .map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::{
    Task,
    parse_calendar_date
  };

  #[test]
  fn new_task_starts_uncompleted() {
    let task = Task::new(
      7,
      "Buy milk".to_string(),
      String::new(),
      "errand".to_string()
    );
    assert!(!task.completed);
    assert!(!task.has_date());
  }

  #[test]
  fn parses_plain_and_rfc3339_dates() {
    let expected =
      NaiveDate::from_ymd_opt(2024, 1, 2);
    assert_eq!(
      parse_calendar_date("2024-01-02"),
      expected
    );
    assert_eq!(
      parse_calendar_date(
        "2024-01-02T08:30:00Z"
      ),
      expected
    );
    assert_eq!(
      parse_calendar_date("  "),
      None
    );
    assert_eq!(
      parse_calendar_date("tomorrow"),
      None
    );
  }

  #[test]
  fn missing_fields_default_on_load() {
    let task: Task = serde_json::from_str(
      r#"{"id":1,"name":"x"}"#
    )
    .expect("parse minimal task");
    assert_eq!(task.date, "");
    assert_eq!(task.category, "");
    assert!(!task.completed);
  }
}
