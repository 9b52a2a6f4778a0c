use crate::server::process::{ProcessHandle, ServerStatus};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// What the registry holds for one server id.
#[derive(Debug)]
enum Slot {
    /// Claimed by a start, create or delete that has not finished yet.
    Reserved,
    Running(Arc<ProcessHandle>),
    Stopping(Arc<ProcessHandle>),
}

impl Slot {
    fn is_live(&self) -> bool {
        match self {
            Slot::Reserved => true,
            Slot::Running(handle) | Slot::Stopping(handle) => !handle.has_exited(),
        }
    }

    fn holds(&self, other: &Arc<ProcessHandle>) -> bool {
        match self {
            Slot::Reserved => false,
            Slot::Running(handle) | Slot::Stopping(handle) => Arc::ptr_eq(handle, other),
        }
    }
}

/// Concurrency-safe table of live server processes, keyed by server id.
///
/// Backed by a sharded map, so operations on different ids do not contend on
/// a single lock. Every test-and-set goes through the map's entry API and is
/// atomic with respect to other callers on the same id.
#[derive(Debug, Default)]
pub struct Registry {
    entries: DashMap<String, Slot>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `id` if nothing live holds it.
    ///
    /// An entry whose process has already exited is replaced. Returns `false`
    /// when another reservation or a live process owns the id.
    pub fn claim(&self, id: &str) -> bool {
        match self.entries.entry(id.to_string()) {
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::Reserved);
                true
            }
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live() {
                    false
                } else {
                    occupied.insert(Slot::Reserved);
                    true
                }
            }
        }
    }

    /// Attaches a spawned process to a reservation made by [`Registry::claim`].
    ///
    /// Returns `false` if `id` is not currently reserved.
    pub fn attach(&self, id: &str, handle: Arc<ProcessHandle>) -> bool {
        match self.entries.get_mut(id) {
            Some(mut slot) if matches!(*slot, Slot::Reserved) => {
                *slot = Slot::Running(handle);
                true
            }
            _ => false,
        }
    }

    /// Drops a reservation. Live process entries are left alone.
    pub fn release(&self, id: &str) {
        self.entries
            .remove_if(id, |_, slot| matches!(slot, Slot::Reserved));
    }

    /// Returns the process handle for `id` if its process is still believed alive.
    pub fn get(&self, id: &str) -> Option<Arc<ProcessHandle>> {
        self.entries.get(id).and_then(|slot| match &*slot {
            Slot::Running(handle) | Slot::Stopping(handle) if !handle.has_exited() => {
                Some(Arc::clone(handle))
            }
            _ => None,
        })
    }

    /// Returns the recorded state and handle for `id`, without checking liveness.
    pub fn lookup(&self, id: &str) -> Option<(ServerStatus, Arc<ProcessHandle>)> {
        self.entries.get(id).and_then(|slot| match &*slot {
            Slot::Reserved => None,
            Slot::Running(handle) => Some((ServerStatus::Running, Arc::clone(handle))),
            Slot::Stopping(handle) => Some((ServerStatus::Stopping, Arc::clone(handle))),
        })
    }

    /// Moves a live `Running` entry to `Stopping` and returns its handle.
    ///
    /// Returns `None` when there is nothing to stop: no entry, a reservation,
    /// a stop already in flight, or a process that has already exited (whose
    /// stale entry is dropped on the way out).
    pub fn begin_stop(&self, id: &str) -> Option<Arc<ProcessHandle>> {
        let Entry::Occupied(mut occupied) = self.entries.entry(id.to_string()) else {
            return None;
        };

        let handle = match occupied.get() {
            Slot::Reserved => return None,
            Slot::Running(handle) if !handle.has_exited() => Some(Arc::clone(handle)),
            Slot::Stopping(handle) if !handle.has_exited() => return None,
            Slot::Running(_) | Slot::Stopping(_) => None,
        };

        match handle {
            Some(handle) => {
                occupied.insert(Slot::Stopping(Arc::clone(&handle)));
                Some(handle)
            }
            None => {
                occupied.remove();
                None
            }
        }
    }

    /// Returns a `Stopping` entry to `Running` after a stop that failed.
    pub fn abort_stop(&self, id: &str, handle: &Arc<ProcessHandle>) {
        if let Some(mut slot) = self.entries.get_mut(id) {
            if matches!(&*slot, Slot::Stopping(current) if Arc::ptr_eq(current, handle)) {
                *slot = Slot::Running(Arc::clone(handle));
            }
        }
    }

    /// Removes the entry for `id` only if it still refers to `handle`.
    ///
    /// Returns `true` if an entry was removed.
    pub fn remove_if_same(&self, id: &str, handle: &Arc<ProcessHandle>) -> bool {
        self.entries
            .remove_if(id, |_, slot| slot.holds(handle))
            .is_some()
    }

    /// Removes whatever is stored for `id`. Idempotent.
    pub fn remove(&self, id: &str) {
        self.entries.remove(id);
    }

    /// Ids that currently have a process entry, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| !matches!(entry.value(), Slot::Reserved))
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort();
        ids
    }

    /// Number of entries, reservations included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
