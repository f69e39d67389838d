use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, Thread};

use tracing::{debug, trace};

use donor_core::ThreadId;

use crate::scheduler::Scheduler;

/// What the scheduler's clients need from the thread runtime.
pub trait ThreadRuntime: Send + Sync {
    /// Identity of the calling thread.
    fn current_thread(&self) -> ThreadId;

    /// Suspend the calling thread until another thread calls [`ready`](Self::ready)
    /// on it. May return early; callers re-check their wake condition.
    fn sleep(&self);

    /// Make `thread` runnable again. A wake that arrives before the matching
    /// `sleep` is not lost.
    fn ready(&self, thread: ThreadId);

    fn yield_now(&self);
}

#[derive(Default)]
struct Registry {
    threads: HashMap<ThreadId, Thread>,
    by_os: HashMap<thread::ThreadId, ThreadId>,
    /// Spawned threads that have not registered yet, and whether a wake
    /// arrived for them in the meantime.
    starting: HashMap<ThreadId, bool>,
}

/// Runtime backed by OS threads and `park`/`unpark`.
///
/// Threads started with [`spawn`](Self::spawn) get an id up front; any other
/// thread is assigned one the first time it asks for `current_thread`.
///
/// A runtime built with [`with_scheduler`](Self::with_scheduler) reports each
/// spawned thread to the scheduler as finished once its body returns.
pub struct ParkingRuntime {
    registry: Mutex<Registry>,
    handles: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
    scheduler: Option<Arc<Scheduler>>,
}

impl ParkingRuntime {
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    pub fn with_scheduler(scheduler: Arc<Scheduler>) -> Arc<Self> {
        Self::build(Some(scheduler))
    }

    fn build(scheduler: Option<Arc<Scheduler>>) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(Registry::default()),
            handles: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            scheduler,
        })
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(&self) -> ThreadId {
        ThreadId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Allocate an id for a thread that will register itself later.
    fn reserve_id(&self) -> ThreadId {
        let id = self.allocate_id();
        self.registry().starting.insert(id, false);
        id
    }

    fn register(&self, id: ThreadId, handle: Thread) {
        let mut registry = self.registry();
        registry.by_os.insert(handle.id(), id);
        if registry.starting.remove(&id) == Some(true) {
            handle.unpark();
        }
        registry.threads.insert(id, handle);
    }

    fn unregister(&self, id: ThreadId) {
        let mut registry = self.registry();
        if let Some(handle) = registry.threads.remove(&id) {
            registry.by_os.remove(&handle.id());
        }
    }

    /// Start `f` on a new OS thread and return its scheduler identity.
    pub fn spawn<F>(self: &Arc<Self>, name: &str, f: F) -> io::Result<ThreadId>
    where
        F: FnOnce(ThreadId) + Send + 'static,
    {
        let id = self.reserve_id();
        let runtime = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                runtime.register(id, thread::current());
                f(id);
                if let Some(scheduler) = &runtime.scheduler {
                    scheduler.section().thread_finished(id);
                }
                runtime.unregister(id);
            });
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.registry().starting.remove(&id);
                return Err(err);
            }
        };
        debug!(thread = %id, name, "thread spawned");
        self.handles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handle);
        Ok(id)
    }

    /// Join every spawned thread, re-raising the first panic.
    pub fn join_all(&self) {
        loop {
            let handles = std::mem::take(
                &mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if let Err(payload) = handle.join() {
                    std::panic::resume_unwind(payload);
                }
            }
        }
    }
}

impl ThreadRuntime for ParkingRuntime {
    fn current_thread(&self) -> ThreadId {
        let current = thread::current();
        if let Some(&id) = self.registry().by_os.get(&current.id()) {
            return id;
        }
        let id = self.allocate_id();
        self.register(id, current);
        id
    }

    fn sleep(&self) {
        trace!("thread sleeping");
        thread::park();
    }

    fn ready(&self, thread: ThreadId) {
        let mut registry = self.registry();
        if let Some(handle) = registry.threads.get(&thread) {
            handle.unpark();
        } else if let Some(woken) = registry.starting.get_mut(&thread) {
            *woken = true;
        } else {
            trace!(thread = %thread, "ready for an exited thread ignored");
            return;
        }
        trace!(thread = %thread, "thread readied");
    }

    fn yield_now(&self) {
        thread::yield_now();
    }
}
