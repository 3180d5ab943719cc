use std::collections::BTreeMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use tracing::{
  debug,
  info,
  trace
};

use crate::store::DEFAULT_STORAGE_KEY;
use crate::view::{
  FilterMode,
  SortMode,
  ViewQuery
};

const CONFIG_ENV_VAR: &str =
  "TASKLET_CONFIG";
const APP_DIR: &str = "tasklet";

#[derive(Debug, Clone)]
pub struct Config {
  map:             BTreeMap<String, String>,
  pub loaded_file: Option<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = BTreeMap::new();
    map.insert(
      "storage.key".to_string(),
      DEFAULT_STORAGE_KEY.to_string()
    );
    map.insert(
      "view.sort".to_string(),
      "none".to_string()
    );
    map.insert(
      "view.filter".to_string(),
      "all".to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    map.insert(
      "confirm".to_string(),
      "true".to_string()
    );

    Self {
      map,
      loaded_file: None
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    config_override
  ))]
  pub fn load(
    config_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Self::default();

    match resolve_config_path(
      config_override
    )? {
      | Some(path) => {
        info!(config = %path.display(), "loading config");
        let text = fs::read_to_string(&path)
          .with_context(|| {
            format!(
              "failed to read {}",
              path.display()
            )
          })?;
        cfg.merge_toml(&text).with_context(
          || {
            format!(
              "invalid config {}",
              path.display()
            )
          }
        )?;
        cfg.loaded_file = Some(path);
      }
      | None => {
        debug!("no config file; using defaults");
      }
    }

    Ok(cfg)
  }

  /// Flattens nested tables into dotted
  /// keys (`[view] sort = "date"` becomes
  /// `view.sort`).
  pub fn merge_toml(
    &mut self,
    text: &str
  ) -> anyhow::Result<()> {
    let table: toml::Table =
      toml::from_str(text)?;
    flatten_into(
      &mut self.map,
      "",
      &table
    )
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      debug!(key = %key, value = %v, "applying override");
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn get_bool(
    &self,
    key: &str
  ) -> Option<bool> {
    self
      .map
      .get(key)
      .map(|v| parse_bool(v))
  }

  pub fn storage_key(&self) -> String {
    self
      .get("storage.key")
      .filter(|key| !key.trim().is_empty())
      .unwrap_or_else(|| {
        DEFAULT_STORAGE_KEY.to_string()
      })
  }

  /// Default query for `list` from
  /// `view.sort` and `view.filter`.
  pub fn default_query(
    &self
  ) -> anyhow::Result<ViewQuery> {
    let sort = self
      .get("view.sort")
      .map(|raw| {
        raw
          .parse::<SortMode>()
          .unwrap_or_default()
      })
      .unwrap_or_default();
    let filter = match self.get("view.filter")
    {
      | Some(raw) => raw
        .parse::<FilterMode>()
        .context("invalid view.filter")?,
      | None => FilterMode::default()
    };

    Ok(ViewQuery {
      search: String::new(),
      sort,
      filter
    })
  }
}

fn flatten_into(
  map: &mut BTreeMap<String, String>,
  prefix: &str,
  table: &toml::Table
) -> anyhow::Result<()> {
  for (k, v) in table {
    let key = if prefix.is_empty() {
      k.clone()
    } else {
      format!("{prefix}.{k}")
    };

    let value = match v {
      | toml::Value::Table(inner) => {
        flatten_into(map, &key, inner)?;
        continue;
      }
      | toml::Value::String(s) => s.clone(),
      | toml::Value::Integer(i) => {
        i.to_string()
      }
      | toml::Value::Float(f) => {
        f.to_string()
      }
      | toml::Value::Boolean(b) => {
        b.to_string()
      }
      | other => {
        return Err(anyhow!(
          "unsupported value for {key}: \
           {other:?}"
        ));
      }
    };

    trace!(key = %key, value = %value, "loaded config key");
    map.insert(key, value);
  }
  Ok(())
}

#[tracing::instrument(skip(
  cfg,
  override_dir
))]
pub fn resolve_data_dir(
  cfg: &Config,
  override_dir: Option<&Path>
) -> anyhow::Result<PathBuf> {
  let dir = if let Some(path) =
    override_dir
  {
    path.to_path_buf()
  } else if let Some(cfg_value) =
    cfg.get("data.location")
  {
    expand_tilde(Path::new(&cfg_value))
  } else {
    default_data_dir()?
  };

  if !dir.exists() {
    info!(dir = %dir.display(), "creating data directory");
    fs::create_dir_all(&dir)
      .with_context(|| {
        format!(
          "failed to create {}",
          dir.display()
        )
      })?;
  }

  Ok(dir)
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_config_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(expand_tilde(path)));
  }

  if let Ok(env_path) =
    std::env::var(CONFIG_ENV_VAR)
  {
    if env_path == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(expand_tilde(
      Path::new(&env_path)
    )));
  }

  let Some(config_dir) = dirs::config_dir()
  else {
    return Ok(None);
  };
  let candidate = config_dir
    .join(APP_DIR)
    .join("config.toml");
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn default_data_dir()
-> anyhow::Result<PathBuf> {
  let base = dirs::data_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine data \
         directory"
      )
    })?;
  Ok(base.join(APP_DIR))
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

fn parse_bool(s: &str) -> bool {
  matches!(
    s.trim()
      .to_ascii_lowercase()
      .as_str(),
    "1" | "y" | "yes" | "on" | "true"
  )
}
