use chrono::{
  DateTime,
  Utc
};

use crate::task::{
  Task,
  TaskId
};

/// Time source for new task ids.
pub trait Clock {
  fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
  fn now(&self) -> DateTime<Utc> {
    Utc::now()
  }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
  fn now(&self) -> DateTime<Utc> {
    self.0
  }
}

/// Millisecond timestamp of `now`, bumped
/// past the largest existing id so two
/// tasks created in the same millisecond
/// (or after the clock stepped back) still
/// get distinct ids.
pub fn next_task_id(
  tasks: &[Task],
  now: DateTime<Utc>
) -> TaskId {
  let stamp =
    u64::try_from(now.timestamp_millis())
      .unwrap_or(0);
  match tasks.iter().map(|t| t.id).max() {
    | Some(max) if stamp <= max => {
      max.saturating_add(1)
    }
    | _ => stamp
  }
}

#[cfg(test)]
mod tests {
  use chrono::{
    TimeZone,
    Utc
  };

  use super::next_task_id;
  use crate::task::Task;

  fn task(id: u64) -> Task {
    Task::new(
      id,
      "t".to_string(),
      String::new(),
      String::new()
    )
  }

  #[test]
  fn uses_millisecond_timestamp() {
    let now = Utc
      .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
      .single()
      .expect("valid now");
    assert_eq!(
      next_task_id(&[], now),
      1_704_067_200_000
    );
  }

  #[test]
  fn bumps_past_existing_ids() {
    let now = Utc
      .with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
      .single()
      .expect("valid now");
    let stamp = 1_704_067_200_000;
    assert_eq!(
      next_task_id(&[task(stamp)], now),
      stamp + 1
    );
    assert_eq!(
      next_task_id(
        &[task(stamp + 50), task(3)],
        now
      ),
      stamp + 51
    );
    assert_eq!(
      next_task_id(&[task(3)], now),
      stamp
    );
  }
}
