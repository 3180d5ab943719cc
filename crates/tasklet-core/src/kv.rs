use std::collections::BTreeMap;
use std::fs;
use std::io::{
  self,
  Write
};
use std::path::{
  Path,
  PathBuf
};

use tempfile::NamedTempFile;
use tracing::{
  debug,
  info,
  warn
};

use crate::error::TaskError;

/// String key-value storage holding the
/// serialized task collection.
pub trait KeyValueStore {
  fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, TaskError>;

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> Result<(), TaskError>;
}

/// In-process storage. An optional quota
/// caps the total bytes of keys and values,
/// like a browser storage area does.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
  entries: BTreeMap<String, String>,
  quota:   Option<usize>
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_quota(quota: usize) -> Self {
    Self {
      entries: BTreeMap::new(),
      quota:   Some(quota)
    }
  }

  pub fn used_bytes(&self) -> usize {
    self
      .entries
      .iter()
      .map(|(k, v)| k.len() + v.len())
      .sum()
  }
}

impl KeyValueStore for MemoryStore {
  fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, TaskError> {
    Ok(self.entries.get(key).cloned())
  }

  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> Result<(), TaskError> {
    if let Some(quota) = self.quota {
      let replaced = self
        .entries
        .get(key)
        .map(|old| key.len() + old.len())
        .unwrap_or(0);
      let size = self.used_bytes()
        - replaced
        + key.len()
        + value.len();
      if size > quota {
        return Err(
          TaskError::QuotaExceeded {
            key: key.to_string(),
            size,
            quota
          }
        );
      }
    }

    self
      .entries
      .insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// One `<key>.json` file per key inside a
/// data directory. Writes replace the file
/// atomically.
#[derive(Debug)]
pub struct FileStore {
  pub data_dir: PathBuf
}

impl FileStore {
  #[tracing::instrument(skip(data_dir))]
  pub fn open(
    data_dir: &Path
  ) -> Result<Self, TaskError> {
    let data_dir = data_dir.to_path_buf();
    fs::create_dir_all(&data_dir).map_err(
      |source| TaskError::Io {
        key: data_dir.display().to_string(),
        source
      }
    )?;

    info!(
      data_dir = %data_dir.display(),
      "opened file store"
    );

    Ok(Self {
      data_dir
    })
  }

  pub fn path_for(
    &self,
    key: &str
  ) -> Result<PathBuf, TaskError> {
    validate_key(key)?;
    Ok(
      self
        .data_dir
        .join(format!("{key}.json"))
    )
  }
}

impl KeyValueStore for FileStore {
  #[tracing::instrument(skip(self))]
  fn get(
    &self,
    key: &str
  ) -> Result<Option<String>, TaskError> {
    let path = self.path_for(key)?;
    let bytes = match fs::read(&path) {
      | Ok(bytes) => bytes,
      | Err(err)
        if err.kind()
          == io::ErrorKind::NotFound =>
      {
        debug!(file = %path.display(), "no stored value");
        return Ok(None);
      }
      | Err(source) => {
        return Err(TaskError::Io {
          key: key.to_string(),
          source
        });
      }
    };

    match String::from_utf8(bytes) {
      | Ok(text) => {
        debug!(
          file = %path.display(),
          bytes = text.len(),
          "read stored value"
        );
        Ok(Some(text))
      }
      | Err(error) => {
        warn!(
          file = %path.display(),
          %error,
          "stored value is not UTF-8; \
           treating it as absent"
        );
        Ok(None)
      }
    }
  }

  #[tracing::instrument(skip(self, value))]
  fn set(
    &mut self,
    key: &str,
    value: &str
  ) -> Result<(), TaskError> {
    let path = self.path_for(key)?;
    debug!(
      file = %path.display(),
      bytes = value.len(),
      "writing stored value atomically"
    );

    let io_err = |source| TaskError::Io {
      key: key.to_string(),
      source
    };

    let mut temp =
      NamedTempFile::new_in(&self.data_dir)
        .map_err(io_err)?;
    temp
      .write_all(value.as_bytes())
      .map_err(io_err)?;
    temp.flush().map_err(io_err)?;
    temp
      .persist(&path)
      .map_err(|err| io_err(err.error))?;

    Ok(())
  }
}

fn validate_key(
  key: &str
) -> Result<(), TaskError> {
  let bad = key.trim().is_empty()
    || key.contains(['/', '\\'])
    || key.contains("..");
  if bad {
    return Err(TaskError::InvalidKey(
      key.to_string()
    ));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::fs;

  use tempfile::tempdir;

  use super::{
    FileStore,
    KeyValueStore,
    MemoryStore
  };
  use crate::error::TaskError;

  #[test]
  fn memory_store_overwrites_values() {
    let mut kv = MemoryStore::new();
    kv.set("tasks", "[1]").expect("set");
    kv.set("tasks", "[2]").expect("set");
    assert_eq!(
      kv.get("tasks").expect("get"),
      Some("[2]".to_string())
    );
    assert_eq!(
      kv.get("other").expect("get"),
      None
    );
  }

  #[test]
  fn memory_store_enforces_quota() {
    let mut kv = MemoryStore::with_quota(10);
    kv.set("k", "12345").expect("fits");
    // replacing the value frees the old bytes
    kv.set("k", "123456789").expect("fits");

    let err = kv
      .set("k", "1234567890")
      .expect_err("over quota");
    assert!(matches!(
      err,
      TaskError::QuotaExceeded {
        size: 11,
        quota: 10,
        ..
      }
    ));
    assert_eq!(
      kv.get("k").expect("get"),
      Some("123456789".to_string())
    );
  }

  #[test]
  fn file_store_round_trips_and_reports_absent() {
    let temp = tempdir().expect("tempdir");
    let mut kv = FileStore::open(temp.path())
      .expect("open store");

    assert_eq!(
      kv.get("tasks").expect("get"),
      None
    );
    kv.set("tasks", "[]").expect("set");
    assert_eq!(
      kv.get("tasks").expect("get"),
      Some("[]".to_string())
    );
    assert!(
      temp.path().join("tasks.json").exists()
    );
  }

  #[test]
  fn file_store_treats_non_utf8_as_absent() {
    let temp = tempdir().expect("tempdir");
    fs::write(
      temp.path().join("tasks.json"),
      [0xff, 0xfe, b'[', b']']
    )
    .expect("write bytes");
    let mut kv = FileStore::open(temp.path())
      .expect("open store");

    assert_eq!(
      kv.get("tasks").expect("get"),
      None
    );
    kv.set("tasks", "[]").expect("set");
    assert_eq!(
      kv.get("tasks").expect("get"),
      Some("[]".to_string())
    );
  }

  #[test]
  fn file_store_rejects_path_like_keys() {
    let temp = tempdir().expect("tempdir");
    let mut kv = FileStore::open(temp.path())
      .expect("open store");

    for key in ["", "../x", "a/b", "a\\b"] {
      assert!(matches!(
        kv.set(key, "[]"),
        Err(TaskError::InvalidKey(_))
      ));
    }
  }
}
