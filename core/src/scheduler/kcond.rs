//! Kernel condition variables (`kcond`).
//!
//! A `kcond` carries no value: signaling it means "something that might
//! matter changed, go recheck your predicate." Waiters subscribe through the
//! multi-object waiter ([`super::multiwait`]); a signal wakes every current
//! subscriber and marks its queue entry fired, leaving removal to the
//! subscriber itself. This mirrors the bucket/slot layout `futex.rs` uses for
//! its wait queues, sized down since a single kcond rarely has more than a
//! handful of simultaneous waiters.

use core::ptr;

use slopos_lib::IrqMutex;

use super::scheduler::unblock_task;
use super::task_struct::Task;

/// Maximum simultaneous subscribers per condition variable.
const KCOND_MAX_SUBSCRIBERS: usize = 32;

#[derive(Clone, Copy)]
struct KCondSubscriber {
    task: *mut Task,
    /// Cleared to `true` by [`KCond::signal`] to mark "this entry fired".
    /// The owning waiter slot's own type tag is untouched, so after wakeup
    /// the slot can still be told apart from an empty one.
    fired: bool,
    active: bool,
}

impl KCondSubscriber {
    const fn empty() -> Self {
        Self {
            task: ptr::null_mut(),
            fired: false,
            active: false,
        }
    }
}

// SAFETY: the task pointer is only dereferenced by the scheduler, which
// synchronizes task state independently; the queue itself just stores it.
unsafe impl Send for KCondSubscriber {}

struct KCondQueue {
    subscribers: [KCondSubscriber; KCOND_MAX_SUBSCRIBERS],
}

impl KCondQueue {
    const fn new() -> Self {
        Self {
            subscribers: [KCondSubscriber::empty(); KCOND_MAX_SUBSCRIBERS],
        }
    }
}

/// A wait queue with no payload. See module docs.
pub struct KCond {
    queue: IrqMutex<KCondQueue>,
}

impl KCond {
    pub const fn new() -> Self {
        Self {
            queue: IrqMutex::new(KCondQueue::new()),
        }
    }

    /// Subscribe `task`, returning the index used to detach it again.
    /// `None` means the queue is full — callers size their condition
    /// variables generously relative to the handles that can name them, so
    /// this is treated as a programmer error rather than plumbed as OOM.
    pub fn subscribe(&self, task: *mut Task) -> Option<usize> {
        let mut q = self.queue.lock();
        for (idx, slot) in q.subscribers.iter_mut().enumerate() {
            if !slot.active {
                *slot = KCondSubscriber {
                    task,
                    fired: false,
                    active: true,
                };
                return Some(idx);
            }
        }
        None
    }

    /// Detach subscriber `idx`. Idempotent.
    pub fn unsubscribe(&self, idx: usize) {
        let mut q = self.queue.lock();
        if let Some(slot) = q.subscribers.get_mut(idx) {
            *slot = KCondSubscriber::empty();
        }
    }

    /// Whether subscriber `idx` was marked fired. Does not detach it.
    pub fn is_fired(&self, idx: usize) -> bool {
        let q = self.queue.lock();
        q.subscribers
            .get(idx)
            .map(|s| s.active && s.fired)
            .unwrap_or(false)
    }

    /// Wake every current subscriber: mark its entry fired and unblock its
    /// task. Entries are left in place for the waiter to detach through
    /// `unsubscribe`/`reset_slot`.
    ///
    /// May be called from interrupt context (a driver's ISR signaling
    /// readiness), so locking is interrupt-safe via `IrqMutex`.
    pub fn signal(&self) {
        let mut q = self.queue.lock();
        for slot in q.subscribers.iter_mut() {
            if slot.active && !slot.fired {
                slot.fired = true;
                let _ = unblock_task(slot.task);
            }
        }
    }
}

impl Default for KCond {
    fn default() -> Self {
        Self::new()
    }
}
