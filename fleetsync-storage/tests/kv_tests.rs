use fleetsync_storage::{KeyValueStore, MemoryKv, SqliteKv};
use pretty_assertions::assert_eq;

fn exercise(kv: &dyn KeyValueStore) {
    assert_eq!(kv.get("fleet:a").unwrap(), None);

    kv.set("fleet:a", "1").unwrap();
    kv.set("fleet:b", "2").unwrap();
    kv.set("other:c", "3").unwrap();
    assert_eq!(kv.get("fleet:a").unwrap().as_deref(), Some("1"));

    kv.set("fleet:a", "updated").unwrap();
    assert_eq!(kv.get("fleet:a").unwrap().as_deref(), Some("updated"));

    assert_eq!(kv.keys("fleet:").unwrap(), vec!["fleet:a", "fleet:b"]);

    kv.remove("fleet:a").unwrap();
    kv.remove("fleet:missing").unwrap();
    assert_eq!(kv.get("fleet:a").unwrap(), None);
    assert_eq!(kv.keys("").unwrap(), vec!["fleet:b", "other:c"]);
}

#[test]
fn memory_kv_basic_operations() {
    exercise(&MemoryKv::new());
}

#[test]
fn sqlite_kv_basic_operations() {
    exercise(&SqliteKv::open_in_memory().unwrap());
}

#[test]
fn sqlite_kv_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fleet.db");

    {
        let kv = SqliteKv::open(&path).unwrap();
        kv.set("fleet:collections", "[\"drivers\"]").unwrap();
    }

    let kv = SqliteKv::open(&path).unwrap();
    assert_eq!(
        kv.get("fleet:collections").unwrap().as_deref(),
        Some("[\"drivers\"]")
    );
}
