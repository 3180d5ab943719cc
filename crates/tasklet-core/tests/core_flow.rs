use std::fs;

use tasklet_core::{
  Command,
  EditSession,
  FileStore,
  FilterMode,
  KeyValueStore,
  SortMode,
  Stats,
  Task,
  TaskForm,
  TaskList,
  TaskStore,
  ViewQuery,
  derive_view
};
use tempfile::tempdir;

fn always(_: &Task) -> bool {
  true
}

#[test]
fn file_store_round_trip_preserves_collection() {
  let temp = tempdir().expect("tempdir");

  let saved = {
    let kv =
      FileStore::open(temp.path()).expect("open store");
    let mut store =
      TaskStore::load(kv, "tasks").expect("load");
    store
      .add("Buy milk", "2024-01-01", "errand")
      .expect("add");
    let walk = store
      .add("Walk dog", "", "chore")
      .expect("add");
    store.toggle(walk.id).expect("toggle");
    store
      .add("Pay rent", "2024-02-01", "")
      .expect("add");
    store.tasks().to_vec()
  };

  let kv =
    FileStore::open(temp.path()).expect("reopen store");
  let reloaded =
    TaskStore::load(kv, "tasks").expect("reload");
  assert_eq!(reloaded.tasks(), saved.as_slice());

  let raw = fs::read_to_string(temp.path().join("tasks.json"))
    .expect("stored file");
  let json: serde_json::Value =
    serde_json::from_str(&raw).expect("json");
  let first = &json[0];
  assert_eq!(first["name"], "Buy milk");
  assert_eq!(first["date"], "2024-01-01");
  assert_eq!(first["category"], "errand");
  assert_eq!(first["completed"], false);
  assert!(first["id"].is_u64());
}

#[test]
fn corrupt_file_starts_empty_and_is_overwritten() {
  let temp = tempdir().expect("tempdir");
  fs::write(temp.path().join("tasks.json"), "not json at all")
    .expect("write garbage");

  let kv =
    FileStore::open(temp.path()).expect("open store");
  let mut store =
    TaskStore::load(kv, "tasks").expect("load");
  assert!(store.is_empty());

  store.add("Fresh start", "", "").expect("add");
  let stored = store
    .kv()
    .get("tasks")
    .expect("get")
    .expect("value");
  assert!(stored.contains("Fresh start"));
}

#[test]
fn non_utf8_file_loads_empty_instead_of_failing() {
  let temp = tempdir().expect("tempdir");
  fs::write(
    temp.path().join("tasks.json"),
    [0xff, 0xfe, b'[', b']']
  )
  .expect("write bytes");

  let kv =
    FileStore::open(temp.path()).expect("open store");
  let mut store =
    TaskStore::load(kv, "tasks").expect("load");
  assert!(store.is_empty());

  store.add("Recovered", "", "").expect("add");
  let raw = fs::read_to_string(temp.path().join("tasks.json"))
    .expect("stored file is utf-8 again");
  assert!(raw.contains("Recovered"));
}

#[test]
fn buy_milk_walk_dog_scenario() {
  let temp = tempdir().expect("tempdir");
  let mut kv =
    FileStore::open(temp.path()).expect("open store");
  kv.set(
    "tasks",
    r#"[{"id":1,"name":"Buy milk","date":"2024-01-01","category":"errand","completed":false}]"#
  )
  .expect("seed");

  let store = TaskStore::load(kv, "tasks").expect("load");
  let mut app = TaskList::new(store, Box::new(always));

  let added = app
    .dispatch(Command::Add(TaskForm::new(
      "Walk dog",
      "2024-01-02",
      "chore"
    )))
    .expect("add")
    .task
    .expect("created task");
  assert_eq!(app.store().len(), 2);
  assert_eq!(app.store().tasks()[1].id, added.id);
  assert_ne!(added.id, 1);
  assert!(!added.completed);

  app.dispatch(Command::Toggle(1)).expect("toggle");
  assert_eq!(
    app.store().get(1).map(|t| t.completed),
    Some(true)
  );
  assert_eq!(
    app.stats(),
    Stats {
      total:       2,
      completed:   1,
      uncompleted: 1
    }
  );

  let milk = derive_view(
    app.store().tasks(),
    &ViewQuery {
      search: "milk".to_string(),
      sort:   "all".parse::<SortMode>().expect("infallible"),
      filter: FilterMode::All
    }
  );
  assert_eq!(milk.len(), 1);
  assert_eq!(milk[0].name, "Buy milk");

  app.dispatch(Command::BeginEdit(1)).expect("edit");
  assert_eq!(app.session(), EditSession::Editing(1));
  app.dispatch(Command::CancelEdit).expect("cancel");
  assert_eq!(app.session(), EditSession::Creating);
  assert_eq!(
    app.store().get(1).map(|t| t.name.as_str()),
    Some("Buy milk")
  );
}

#[test]
fn remove_then_lookup_misses() {
  let temp = tempdir().expect("tempdir");
  let kv =
    FileStore::open(temp.path()).expect("open store");
  let mut store =
    TaskStore::load(kv, "tasks").expect("load");
  let a = store.add("a", "", "").expect("add");
  store.add("b", "", "").expect("add");

  store
    .remove(a.id, &mut always)
    .expect("remove");
  assert!(store.get(a.id).is_none());
  assert_eq!(store.len(), 1);

  store
    .remove(a.id, &mut always)
    .expect("remove again");
  assert_eq!(store.len(), 1);
}
