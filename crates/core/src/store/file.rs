//! JSON-file order store.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//!   orders/
//!     <c0c1>/
//!       <code>.json    # one pretty-printed Order per file
//!   ids/
//!     <n>              # empty marker, one per allocated id
//! ```
//!
//! where `c0c1` are the first two digits of the order code.
//!
//! A new order is written in full to a temporary file in its shard directory and then published
//! with a hard link to `<code>.json`. The link fails if the name exists, so the filesystem itself
//! refuses a second order with the same code, including from another process, and readers never
//! see a partially written order. Updates are written to a temporary file and renamed into place.
//! Writes within one process are serialised by a store-wide lock, which makes read-modify-write
//! of a single order atomic.
//!
//! Ids are claimed by creating `ids/<n>` with `create_new`, so several processes sharing one data
//! directory never hand out the same id.

use super::OrderStore;
use crate::constants::{IDS_DIR_NAME, ORDERS_DIR_NAME};
use crate::order::Order;
use crate::{OrderError, OrderResult};
use allergo_types::OrderCode;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct JsonFileOrderStore {
    orders_dir: PathBuf,
    ids_dir: PathBuf,
    write_lock: Mutex<()>,
    /// Lowest id this process has not yet seen claimed.
    next_id: AtomicU64,
}

impl JsonFileOrderStore {
    /// Opens (creating if needed) the store under `data_dir`.
    ///
    /// The id sequence resumes after the largest id already on disk.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Storage`] if the store directories cannot be created or read.
    pub fn open(data_dir: &Path) -> OrderResult<Self> {
        let orders_dir = data_dir.join(ORDERS_DIR_NAME);
        let ids_dir = data_dir.join(IDS_DIR_NAME);
        fs::create_dir_all(&orders_dir)?;
        fs::create_dir_all(&ids_dir)?;

        let store = Self {
            orders_dir,
            ids_dir,
            write_lock: Mutex::new(()),
            next_id: AtomicU64::new(1),
        };
        let max_order_id = store.list_all()?.iter().map(|o| o.id).max().unwrap_or(0);
        let max_claimed_id = store.max_claimed_id()?;
        let next = max_order_id.max(max_claimed_id) + 1;
        store.next_id.store(next, Ordering::SeqCst);

        tracing::info!(
            dir = %store.orders_dir.display(),
            next_id = next,
            "opened order store"
        );
        Ok(store)
    }

    pub fn orders_dir(&self) -> &Path {
        &self.orders_dir
    }

    fn lock(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn path_for(&self, code: &OrderCode) -> PathBuf {
        code.sharded_file(&self.orders_dir)
    }

    fn max_claimed_id(&self) -> OrderResult<u64> {
        let mut max = 0;
        for entry in fs::read_dir(&self.ids_dir)?.flatten() {
            if let Some(id) = entry.file_name().to_str().and_then(|n| n.parse::<u64>().ok()) {
                max = max.max(id);
            }
        }
        Ok(max)
    }

    fn read(&self, code: &OrderCode) -> OrderResult<Order> {
        let text = match fs::read_to_string(self.path_for(code)) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(OrderError::NotFound(code.to_string()))
            }
            Err(e) => return Err(OrderError::Storage(e)),
        };
        Ok(serde_json::from_str(&text)?)
    }

    /// Writes `bytes` to a process-unique temporary file next to `path`.
    fn write_temp(path: &Path, bytes: &[u8]) -> OrderResult<PathBuf> {
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(tmp)
    }

    fn write_replace(&self, order: &Order) -> OrderResult<()> {
        let path = self.path_for(&order.code);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = Self::write_temp(&path, &serde_json::to_vec_pretty(order)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

impl OrderStore for JsonFileOrderStore {
    fn next_id(&self) -> OrderResult<u64> {
        let mut candidate = self.next_id.load(Ordering::SeqCst);
        loop {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(self.ids_dir.join(candidate.to_string()))
            {
                Ok(_) => {
                    self.next_id.fetch_max(candidate + 1, Ordering::SeqCst);
                    return Ok(candidate);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    candidate = (candidate + 1).max(self.next_id.load(Ordering::SeqCst));
                }
                Err(e) => return Err(OrderError::Storage(e)),
            }
        }
    }

    fn insert_new(&self, order: Order) -> OrderResult<()> {
        let _guard = self.lock();
        let path = self.path_for(&order.code);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp = Self::write_temp(&path, &serde_json::to_vec_pretty(&order)?)?;
        let linked = fs::hard_link(&tmp, &path);
        fs::remove_file(&tmp)?;

        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(OrderError::CodeTaken(order.code.to_string()))
            }
            Err(e) => Err(OrderError::Storage(e)),
        }
    }

    fn put(&self, order: Order) -> OrderResult<()> {
        let _guard = self.lock();
        self.write_replace(&order)
    }

    fn get(&self, code: &OrderCode) -> OrderResult<Order> {
        self.read(code)
    }

    fn list_all(&self) -> OrderResult<Vec<Order>> {
        let mut orders = Vec::new();

        for shard in fs::read_dir(&self.orders_dir)?.flatten() {
            let shard_path = shard.path();
            if !shard_path.is_dir() {
                continue;
            }

            for entry in fs::read_dir(&shard_path)?.flatten() {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }

                let parsed = fs::read_to_string(&path)
                    .map_err(OrderError::from)
                    .and_then(|text| Ok(serde_json::from_str::<Order>(&text)?));
                match parsed {
                    Ok(order) => orders.push(order),
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable order file");
                    }
                }
            }
        }

        Ok(orders)
    }

    fn update(
        &self,
        code: &OrderCode,
        apply: &mut dyn FnMut(&mut Order) -> OrderResult<()>,
    ) -> OrderResult<Order> {
        let _guard = self.lock();
        let mut order = self.read(code)?;
        apply(&mut order)?;
        self.write_replace(&order)?;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use crate::test_support::sample_order;
    use tempfile::TempDir;

    #[test]
    fn stores_orders_in_sharded_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        store.insert_new(sample_order(1, "98711", "900101300001")).unwrap();

        let path = temp_dir.path().join("orders").join("98").join("98711.json");
        assert!(path.is_file(), "order file should exist at {}", path.display());

        let loaded = store.get(&OrderCode::parse("98711").unwrap()).unwrap();
        assert_eq!(loaded, sample_order(1, "98711", "900101300001"));
    }

    #[test]
    fn insert_new_refuses_existing_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        store.insert_new(sample_order(1, "98711", "900101300001")).unwrap();

        let err = store
            .insert_new(sample_order(2, "98711", "910202300002"))
            .expect_err("duplicate code must be refused");
        assert!(matches!(err, OrderError::CodeTaken(_)));
    }

    #[test]
    fn reopening_resumes_id_sequence() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        {
            let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
            assert_eq!(store.next_id().unwrap(), 1);
            store.insert_new(sample_order(7, "98711", "900101300001")).unwrap();
            store.insert_new(sample_order(3, "98712", "900101300001")).unwrap();
        }

        let reopened = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.next_id().unwrap(), 8);
        assert_eq!(reopened.list_all().unwrap().len(), 2);
    }

    #[test]
    fn update_persists_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        let order = sample_order(1, "98713", "900101300001");
        let code = order.code.clone();
        store.insert_new(order).unwrap();

        let updated = store
            .update(&code, &mut |o: &mut Order| {
                o.status = OrderStatus::BloodTaken;
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.status, OrderStatus::BloodTaken);

        let reopened = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.get(&code).unwrap().status, OrderStatus::BloodTaken);
    }

    #[test]
    fn unknown_code_is_not_found() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        let code = OrderCode::parse("12345").unwrap();

        assert!(matches!(store.get(&code), Err(OrderError::NotFound(_))));
        assert!(matches!(
            store.update(&code, &mut |_: &mut Order| Ok(())),
            Err(OrderError::NotFound(_))
        ));
    }

    #[test]
    fn list_all_skips_corrupt_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        store.insert_new(sample_order(1, "98711", "900101300001")).unwrap();
        fs::write(store.orders_dir().join("98").join("98799.json"), b"{not json")
            .expect("write corrupt file");

        let all = store.list_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].code.as_str(), "98711");
    }

    #[test]
    fn readers_never_see_a_partially_written_order() {
        use std::sync::atomic::AtomicBool;
        use std::sync::Arc;

        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(JsonFileOrderStore::open(temp_dir.path()).unwrap());
        let codes: Vec<String> = (0..20).map(|i| format!("{}", 98700 + i)).collect();
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let store = store.clone();
            let codes = codes.clone();
            let done = done.clone();
            std::thread::spawn(move || {
                let parsed: Vec<OrderCode> =
                    codes.iter().map(|c| OrderCode::parse(c).unwrap()).collect();
                while !done.load(Ordering::SeqCst) {
                    for code in &parsed {
                        match store.get(code) {
                            Ok(order) => assert_eq!(&order.code, code),
                            Err(OrderError::NotFound(_)) => {}
                            Err(e) => panic!("reader saw {e:?}"),
                        }
                        match store.list_all() {
                            Ok(_) => {}
                            Err(e) => panic!("list_all failed with {e:?}"),
                        }
                    }
                }
            })
        };

        for (i, code) in codes.iter().enumerate() {
            store
                .insert_new(sample_order(i as u64 + 1, code, "900101300001"))
                .unwrap();
        }
        done.store(true, Ordering::SeqCst);
        reader.join().expect("reader thread must not panic");

        assert_eq!(store.list_all().unwrap().len(), codes.len());
    }

    #[test]
    fn insert_leaves_no_temporary_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        store.insert_new(sample_order(1, "98711", "900101300001")).unwrap();
        let _ = store.insert_new(sample_order(2, "98711", "900101300001"));

        let names: Vec<String> = fs::read_dir(store.orders_dir().join("98"))
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["98711.json".to_string()]);
    }

    #[test]
    fn stores_sharing_a_directory_never_share_an_id() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let server = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        let cli = JsonFileOrderStore::open(temp_dir.path()).unwrap();

        let a = server.next_id().unwrap();
        let b = cli.next_id().unwrap();
        let c = server.next_id().unwrap();
        assert_eq!((a, b, c), (1, 2, 3));

        server.insert_new(sample_order(a, "98711", "900101300001")).unwrap();
        cli.insert_new(sample_order(b, "98712", "900101300001")).unwrap();

        let mut ids: Vec<u64> = server.list_all().unwrap().iter().map(|o| o.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);

        let reopened = JsonFileOrderStore::open(temp_dir.path()).unwrap();
        assert_eq!(reopened.next_id().unwrap(), 4);
    }
}
