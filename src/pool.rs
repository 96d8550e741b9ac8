//! Elastic object pool for expensive codec contexts.
//!
//! A pool is a named, mutex-protected slot array plus two hooks: an
//! allocator (build a fresh object) and a reset (scrub a pooled object at
//! checkout).  Freeing is just `Drop`.  The slot array does double duty: a
//! `Some` slot holds an idle object, a `None` slot is the hole left by an
//! in-flight borrow.  That keeps `grab`/`ungrab` free of any separate
//! in-use bookkeeping, at the price of one rule: nothing may be reclaimed
//! while any hole exists, because a hole *is* an outstanding borrow.
//!
//! The pool grows by one slot whenever a borrow outruns the current
//! capacity, and an idle-reap empties it again after [`REAP_TIMEOUT`] of
//! quiet.  Contention on the mutex is acceptable: the codec work done with
//! a borrowed object dwarfs the lock hold times, and the only calls made
//! under the lock are the slot scan, the allocator hook, and the
//! (parameter-level, cheap) reset hook.

use std::sync::Mutex;
use std::time::{Duration, Instant};

/// How long a pool must sit idle before `reap` empties it.
pub const REAP_TIMEOUT: Duration = Duration::from_secs(15);

type AllocFn<T> = Box<dyn Fn() -> Option<T> + Send + Sync>;
type ResetFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;

struct Slots<T> {
    list: Vec<Option<T>>,
    last_used: Instant,
}

/// A thread-safe elastic free-list of `T`.
pub struct ObjPool<T> {
    name: &'static str,
    alloc: AllocFn<T>,
    reset: ResetFn<T>,
    reap_timeout: Duration,
    inner: Mutex<Slots<T>>,
}

impl<T> ObjPool<T> {
    /// An empty pool with the standard [`REAP_TIMEOUT`].
    pub fn new(name: &'static str, alloc: AllocFn<T>, reset: ResetFn<T>) -> ObjPool<T> {
        Self::with_reap_timeout(name, alloc, reset, REAP_TIMEOUT)
    }

    /// An empty pool with a caller-chosen reap interval (tests use short
    /// ones; production code wants [`ObjPool::new`]).
    pub fn with_reap_timeout(
        name: &'static str,
        alloc: AllocFn<T>,
        reset: ResetFn<T>,
        reap_timeout: Duration,
    ) -> ObjPool<T> {
        ObjPool {
            name,
            alloc,
            reset,
            reap_timeout,
            inner: Mutex::new(Slots { list: Vec::new(), last_used: Instant::now() }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Borrows an object, building a new one when every slot is empty or a
    /// hole.  `None` only when the allocator hook returned `None`.
    pub fn grab(&self) -> Option<T> {
        let mut inner = self.inner.lock().unwrap();

        let mut grabbed = None;
        for slot in inner.list.iter_mut() {
            if slot.is_some() {
                grabbed = slot.take();
                break;
            }
        }

        match grabbed {
            Some(mut obj) => {
                (self.reset)(&mut obj);
                Some(obj)
            }
            None => {
                let obj = (self.alloc)()?;
                // Grow by one and leave the new slot as the hole that
                // represents this borrow.
                inner.list.push(None);
                Some(obj)
            }
        }
    }

    /// Current number of idle objects.
    pub fn pooled_count(&self) -> usize {
        self.inner.lock().unwrap().list.iter().filter(|s| s.is_some()).count()
    }

    /// Current number of slots, holes included.
    pub fn slot_count(&self) -> usize {
        self.inner.lock().unwrap().list.len()
    }

    /// Reap immediately if the idle interval has elapsed; refuses to free
    /// anything while any borrow is outstanding.
    pub fn reap(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.last_used.elapsed() < self.reap_timeout {
            return;
        }
        let drained = Self::clear_unused_locked(&mut inner);
        inner.last_used = Instant::now();
        drop(inner);

        if !drained.is_empty() {
            tracing::trace!(pool = self.name, count = drained.len(), "reaped idle contexts");
        }
        drop(drained);
    }

    /// Empties the slot array, but only when every slot is occupied: a
    /// `None` slot is a live borrow whose `ungrab` still expects a hole.
    fn clear_unused_locked(inner: &mut Slots<T>) -> Vec<T> {
        if inner.list.iter().any(|slot| slot.is_none()) {
            return Vec::new();
        }
        inner.list.drain(..).flatten().collect()
    }
}

impl<T: PartialEq> ObjPool<T> {
    /// Returns a borrowed object.  Fills the first hole; when the pool is
    /// somehow full (concurrent releases racing the growth path), the
    /// object is simply dropped — after the lock is released.
    pub fn ungrab(&self, obj: T) {
        let mut inner = self.inner.lock().unwrap();
        debug_assert!(
            !inner.list.iter().flatten().any(|pooled| pooled == &obj),
            "object returned twice to pool {}",
            self.name,
        );

        let mut obj = Some(obj);
        for slot in inner.list.iter_mut() {
            if slot.is_none() {
                *slot = obj.take();
                break;
            }
        }
        inner.last_used = Instant::now();
        drop(inner);

        // No hole for it: destroy outside the lock.
        drop(obj);
    }
}

impl<T> Drop for ObjPool<T> {
    fn drop(&mut self) {
        if let Ok(inner) = self.inner.get_mut() {
            debug_assert!(
                inner.list.iter().all(|slot| slot.is_some()),
                "pool {} destroyed with outstanding borrows",
                self.name,
            );
        }
    }
}
