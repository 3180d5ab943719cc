use std::io::{
  self,
  IsTerminal,
  Write
};

use anyhow::anyhow;
use tracing::warn;
use unicode_width::UnicodeWidthStr;

use crate::app::{
  Observer,
  Snapshot
};
use crate::config::Config;
use crate::task::Task;
use crate::view::Stats;

const NO_DATE: &str = "No date";

#[derive(Debug, Clone)]
pub struct Renderer {
  color: bool
}

impl Renderer {
  pub fn new(
    cfg: &Config
  ) -> anyhow::Result<Self> {
    let color_cfg = cfg
      .get("color")
      .unwrap_or_else(|| "on".to_string());
    let color = match color_cfg
      .to_ascii_lowercase()
      .as_str()
    {
      | "on" | "yes" | "true" | "1" => {
        io::stdout().is_terminal()
      }
      | "off" | "no" | "false" | "0" => {
        false
      }
      | other => {
        return Err(anyhow!(
          "invalid color setting: {other}"
        ));
      }
    };

    Ok(Self {
      color
    })
  }

  pub fn plain() -> Self {
    Self {
      color: false
    }
  }

  /// Observer printing the task table and
  /// stats line of every snapshot it is
  /// sent.
  pub fn observer<W>(
    &self,
    mut writer: W
  ) -> Observer
  where
    W: Write + 'static
  {
    let renderer = self.clone();
    Box::new(move |snapshot: &Snapshot| {
      let written = renderer
        .write_tasks(&mut writer, &snapshot.view)
        .and_then(|()| {
          write_stats(&mut writer, snapshot.stats)
        });
      if let Err(error) = written {
        warn!(%error, "failed to render tasks");
      }
    })
  }

  pub fn print_stats(
    &self,
    stats: Stats
  ) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    write_stats(&mut out, stats)
  }

  pub fn write_tasks<W: Write>(
    &self,
    writer: &mut W,
    tasks: &[Task]
  ) -> anyhow::Result<()> {
    if tasks.is_empty() {
      writeln!(writer, "No tasks.")?;
      return Ok(());
    }

    let headers = vec![
      "ID".to_string(),
      "Done".to_string(),
      "Name".to_string(),
      "Category".to_string(),
      "Date".to_string(),
    ];

    let rows = tasks
      .iter()
      .map(|task| {
        let done = if task.completed {
          "[x]"
        } else {
          "[ ]"
        };
        let date = if task.has_date() {
          task.date.clone()
        } else {
          NO_DATE.to_string()
        };
        let name = if task.completed {
          self.paint(&task.name, "9;2")
        } else {
          task.name.clone()
        };
        vec![
          self.paint(&task.id.to_string(), "33"),
          done.to_string(),
          name,
          task.category.clone(),
          date,
        ]
      })
      .collect();

    write_table(writer, headers, rows)
  }

  fn paint(
    &self,
    text: &str,
    code: &str
  ) -> String {
    if !self.color {
      return text.to_string();
    }
    format!("\x1b[{code}m{text}\x1b[0m")
  }
}

pub fn write_stats<W: Write>(
  writer: &mut W,
  stats: Stats
) -> anyhow::Result<()> {
  writeln!(
    writer,
    "total {}, completed {}, uncompleted {}",
    stats.total,
    stats.completed,
    stats.uncompleted
  )?;
  Ok(())
}

fn write_table<W: Write>(
  writer: &mut W,
  headers: Vec<String>,
  rows: Vec<Vec<String>>
) -> anyhow::Result<()> {
  let mut widths: Vec<usize> = headers
    .iter()
    .map(|h| UnicodeWidthStr::width(h.as_str()))
    .collect();

  for row in &rows {
    for (idx, cell) in row.iter().enumerate() {
      widths[idx] = widths[idx].max(
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        )
      );
    }
  }

  let mut line = String::new();
  for (header, &width) in
    headers.iter().zip(&widths)
  {
    line.push_str(&format!(
      "{header:width$} "
    ));
  }
  writeln!(writer, "{}", line.trim_end())?;

  line.clear();
  for &width in &widths {
    line.push_str(&format!(
      "{:-<width$} ",
      ""
    ));
  }
  writeln!(writer, "{}", line.trim_end())?;

  for row in rows {
    line.clear();
    for (cell, &width) in
      row.iter().zip(&widths)
    {
      let visible =
        UnicodeWidthStr::width(
          strip_ansi(cell).as_str()
        );
      let padding =
        width.saturating_sub(visible);
      line.push_str(cell);
      line.push_str(&" ".repeat(padding));
      line.push(' ');
    }
    writeln!(writer, "{}", line.trim_end())?;
  }

  Ok(())
}

fn strip_ansi(s: &str) -> String {
  let mut out =
    String::with_capacity(s.len());
  let mut escaped = false;

  for ch in s.chars() {
    if escaped {
      if ch == 'm' {
        escaped = false;
      }
      continue;
    }

    if ch == '\x1b' {
      escaped = true;
      continue;
    }

    out.push(ch);
  }

  out
}
