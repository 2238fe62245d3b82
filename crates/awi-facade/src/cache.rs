use awi_hierarchy::RunMeta;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Keyed snapshot cache invalidated strictly by elapsed time since the
/// stamped fetch. Reads hand out clones, never live references; a missing
/// key and an expired key look identical to the caller.
pub struct TtlCache<V: Clone> {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, V)>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let entries = lock(&self.entries);
        let (fetched_at, value) = entries.get(key)?;
        if fetched_at.elapsed() < self.ttl {
            Some(value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: &str, value: V) {
        self.put_at(key, value, Instant::now());
    }

    fn put_at(&self, key: &str, value: V, fetched_at: Instant) {
        lock(&self.entries).insert(key.to_string(), (fetched_at, value));
    }

    /// Backdate an entry, as if it had been fetched `age` ago.
    #[cfg(test)]
    pub fn put_aged(&self, key: &str, value: V, age: Duration) {
        self.put_at(key, value, Instant::now() - age);
    }
}

/// Run-id to run-metadata index filled as a side effect of hierarchy
/// rebuilds. Deliberately has no TTL: it is the only way to find a run's
/// owning agent when a caller arrives with just a run id, so stale is
/// better than absent.
#[derive(Default)]
pub struct RunMetaIndex {
    entries: Mutex<HashMap<String, RunMeta>>,
}

impl RunMetaIndex {
    pub fn record(&self, meta: RunMeta) {
        lock(&self.entries).insert(meta.run_id.clone(), meta);
    }

    pub fn get(&self, run_id: &str) -> Option<RunMeta> {
        lock(&self.entries).get(run_id).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
