//! Per-package-name install locks
//!
//! Installs of the same name are serialized twice over: an in-process mutex
//! keeps worker threads apart, and an advisory file lock under
//! `.bpm/locks/` keeps concurrent bpm processes apart.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use fs2::FileExt;

use crate::error::{Result, install};

#[derive(Debug)]
pub struct NameLocks {
    dir: PathBuf,
    held: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl NameLocks {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            held: Mutex::new(HashMap::new()),
        }
    }

    fn mutex_for(&self, name: &str) -> Arc<Mutex<()>> {
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(held.entry(name.to_string()).or_default())
    }

    /// Run `f` while holding both locks for `name`
    pub fn with_lock<T>(&self, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let mutex = self.mutex_for(name);
        let _guard = mutex.lock().unwrap_or_else(PoisonError::into_inner);

        fs::create_dir_all(&self.dir).map_err(|e| install::store_io(&self.dir, &e))?;
        let lock_path = self.dir.join(format!("{name}.lock"));
        let lock_file = fs::File::create(&lock_path).map_err(|e| install::store_io(&lock_path, &e))?;
        lock_file
            .lock_exclusive()
            .map_err(|e| install::store_io(&lock_path, &e))?;

        let result = f();

        let _ = lock_file.unlock();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::create_temp_dir;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_lock_file_created() {
        let temp = create_temp_dir();
        let locks = NameLocks::new(temp.path().join("locks"));
        let value = locks.with_lock("rake", || Ok(7)).unwrap();
        assert_eq!(value, 7);
        assert!(temp.path().join("locks/rake.lock").is_file());
    }

    #[test]
    fn test_same_name_is_serialized() {
        let temp = create_temp_dir();
        let locks = Arc::new(NameLocks::new(temp.path().join("locks")));
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let max_seen = Arc::clone(&max_seen);
                thread::spawn(move || {
                    locks
                        .with_lock("rake", || {
                            let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                            max_seen.fetch_max(now, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(10));
                            inside.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_passes_through() {
        let temp = create_temp_dir();
        let locks = NameLocks::new(temp.path().join("locks"));
        let result: Result<()> =
            locks.with_lock("rake", || Err(install::not_installed("rake")));
        assert!(result.is_err());
    }
}
