/// SceneLock - interruptible read/write lock with reentry detection.
///
/// Wraps a `parking_lot::RwLock` and tracks which threads currently hold
/// it, so that:
/// - a thread already holding a read lock may take another read lock
///   (recursive read, never blocked by queued writers);
/// - any nested acquisition involving the write lock on the same thread
///   fails with `Error::LockReentry` instead of deadlocking;
/// - a blocked waiter observes `interrupt()` within one poll interval and
///   fails with `Error::Interrupted`.
///
/// Guards release on drop, on every exit path including unwinding.

use std::ops::{Deref, DerefMut};
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};
use parking_lot::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rustc_hash::{FxHashMap, FxHashSet};
use crate::error::{Error, Result};

const SOURCE: &str = "rajawali::SceneLock";

/// Kind of lock a thread holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy)]
struct Hold {
    kind: HoldKind,
    count: usize,
}

pub struct SceneLock<T> {
    data: RwLock<T>,
    holders: Mutex<FxHashMap<ThreadId, Hold>>,
    interrupted: Mutex<FxHashSet<ThreadId>>,
    poll_interval: Duration,
}

impl<T> SceneLock<T> {
    /// `poll_interval` bounds how long a blocked waiter takes to notice
    /// an interruption. Zero is raised to one millisecond.
    pub fn new(data: T, poll_interval: Duration) -> Self {
        Self {
            data: RwLock::new(data),
            holders: Mutex::new(FxHashMap::default()),
            interrupted: Mutex::new(FxHashSet::default()),
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    // ===== ACQUISITION =====

    /// Block until a shared lock is held.
    ///
    /// # Errors
    ///
    /// - `LockReentry` if this thread holds the write lock
    /// - `Interrupted` if the thread is interrupted before or while waiting
    pub fn acquire_read(&self) -> Result<SceneReadGuard<'_, T>> {
        self.read_until(None)
    }

    /// Block until the exclusive lock is held.
    ///
    /// # Errors
    ///
    /// - `LockReentry` if this thread holds any lock on this graph
    /// - `Interrupted` if the thread is interrupted before or while waiting
    pub fn acquire_write(&self) -> Result<SceneWriteGuard<'_, T>> {
        self.write_until(None)
    }

    /// As `acquire_read`, failing with `Timeout` after `timeout`.
    pub fn try_acquire_read_for(&self, timeout: Duration) -> Result<SceneReadGuard<'_, T>> {
        self.read_until(Some(Instant::now() + timeout))
    }

    /// As `acquire_write`, failing with `Timeout` after `timeout`.
    pub fn try_acquire_write_for(&self, timeout: Duration) -> Result<SceneWriteGuard<'_, T>> {
        self.write_until(Some(Instant::now() + timeout))
    }

    fn read_until(&self, deadline: Option<Instant>) -> Result<SceneReadGuard<'_, T>> {
        let thread = thread::current().id();

        match self.held_by(thread) {
            Some(HoldKind::Write) => {
                return Err(Error::LockReentry(
                    "read lock requested while holding the write lock".to_string(),
                ));
            }
            Some(HoldKind::Read) => {
                // No writer can be active while we hold a read lock
                let guard = self.data.read_recursive();
                self.register(thread, HoldKind::Read);
                return Ok(SceneReadGuard { lock: self, guard });
            }
            None => {}
        }

        loop {
            self.check_interrupted(thread)?;
            let slice = self.next_slice(deadline)?;
            if let Some(guard) = self.data.try_read_for(slice) {
                self.register(thread, HoldKind::Read);
                return Ok(SceneReadGuard { lock: self, guard });
            }
        }
    }

    fn write_until(&self, deadline: Option<Instant>) -> Result<SceneWriteGuard<'_, T>> {
        let thread = thread::current().id();

        if let Some(kind) = self.held_by(thread) {
            return Err(Error::LockReentry(format!(
                "write lock requested while holding a {:?} lock",
                kind
            )));
        }

        loop {
            self.check_interrupted(thread)?;
            let slice = self.next_slice(deadline)?;
            if let Some(guard) = self.data.try_write_for(slice) {
                self.register(thread, HoldKind::Write);
                return Ok(SceneWriteGuard { lock: self, guard });
            }
        }
    }

    /// Length of the next wait slice, or `Timeout` once the deadline passed.
    fn next_slice(&self, deadline: Option<Instant>) -> Result<Duration> {
        match deadline {
            None => Ok(self.poll_interval),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    Err(Error::Timeout)
                } else {
                    Ok(remaining.min(self.poll_interval))
                }
            }
        }
    }

    // ===== INTERRUPTION =====

    /// Flag `thread` as interrupted. Its current or next wait on this lock
    /// fails with `Error::Interrupted`, which consumes the flag.
    ///
    /// A flag on a thread that never waits on this lock again stays set
    /// until `clear_interrupt` or until the lock is dropped.
    pub fn interrupt(&self, thread: ThreadId) {
        self.interrupted.lock().insert(thread);
    }

    pub fn is_interrupted(&self, thread: ThreadId) -> bool {
        self.interrupted.lock().contains(&thread)
    }

    /// Clear a pending interruption without waiting.
    pub fn clear_interrupt(&self, thread: ThreadId) -> bool {
        self.interrupted.lock().remove(&thread)
    }

    fn check_interrupted(&self, thread: ThreadId) -> Result<()> {
        if self.interrupted.lock().remove(&thread) {
            crate::engine_warn!(SOURCE, "Thread {:?} interrupted while waiting for the scene lock", thread);
            return Err(Error::Interrupted);
        }
        Ok(())
    }

    // ===== HOLDER BOOKKEEPING =====

    /// Lock kind `thread` currently holds, if any.
    pub fn held_by(&self, thread: ThreadId) -> Option<HoldKind> {
        self.holders.lock().get(&thread).map(|hold| hold.kind)
    }

    /// Lock kind the calling thread currently holds, if any.
    pub fn held_by_current_thread(&self) -> Option<HoldKind> {
        self.held_by(thread::current().id())
    }

    /// True if any thread holds the lock.
    pub fn is_locked(&self) -> bool {
        !self.holders.lock().is_empty()
    }

    fn register(&self, thread: ThreadId, kind: HoldKind) {
        self.holders
            .lock()
            .entry(thread)
            .and_modify(|hold| hold.count += 1)
            .or_insert(Hold { kind, count: 1 });
    }

    fn release(&self) {
        let thread = thread::current().id();
        let mut holders = self.holders.lock();
        if let Some(hold) = holders.get_mut(&thread) {
            hold.count -= 1;
            if hold.count == 0 {
                holders.remove(&thread);
            }
        }
    }
}

// ===== GUARDS =====

/// Shared access to the locked data. Released on drop.
pub struct SceneReadGuard<'a, T> {
    lock: &'a SceneLock<T>,
    guard: RwLockReadGuard<'a, T>,
}

impl<T> Deref for SceneReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> Drop for SceneReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

/// Exclusive access to the locked data. Released on drop.
pub struct SceneWriteGuard<'a, T> {
    lock: &'a SceneLock<T>,
    guard: RwLockWriteGuard<'a, T>,
}

impl<T> Deref for SceneWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for SceneWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for SceneWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
#[path = "scene_lock_tests.rs"]
mod tests;
