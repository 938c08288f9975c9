//! The multi-object waiter: lets a task sleep until any of N condition
//! variables is signaled, or its wakeup timer fires, whichever comes first.
//! This is the wait-object protocol behind `select`/`poll`.
//!
//! Layered the same way `sleep.rs` and `futex.rs` are: a small fixed-size
//! queue type (here, per-task timer entries) protected by an `IrqMutex`, plus
//! free functions the syscall layer calls into.

use core::ffi::c_void;
use core::mem;
use core::ptr;
use core::sync::atomic::Ordering;

use slopos_abi::task::{BlockReason, INVALID_TASK_ID, MAX_TASKS};
use slopos_lib::IrqMutex;
use slopos_mm::kernel_heap::{kfree, kmalloc};

use super::kcond::KCond;
use super::scheduler::{block_current_task, scheduler_get_current_task, unblock_task};
use super::task::task_find_by_id;
use super::task_struct::Task;
use crate::platform;

// =============================================================================
// Per-task wakeup timer
// =============================================================================
//
// Separate from the multi-waiter itself: a task may subscribe to many
// condition variables at once but has at most one active wakeup timer. Armed
// once before the wait loop and left armed across spurious condition
// wakeups (see the open question in the orchestrator).

#[derive(Copy, Clone)]
struct TimerEntry {
    task_id: u32,
    deadline_tick: u64,
    active: bool,
}

impl TimerEntry {
    const fn empty() -> Self {
        Self {
            task_id: INVALID_TASK_ID,
            deadline_tick: 0,
            active: false,
        }
    }
}

struct TimerQueue {
    entries: [TimerEntry; MAX_TASKS],
}

impl TimerQueue {
    const fn new() -> Self {
        Self {
            entries: [TimerEntry::empty(); MAX_TASKS],
        }
    }
}

static TIMER_QUEUE: IrqMutex<TimerQueue> = IrqMutex::new(TimerQueue::new());

#[inline]
fn tick_reached(now_tick: u64, deadline_tick: u64) -> bool {
    now_tick.wrapping_sub(deadline_tick) < (1u64 << 63)
}

/// Arm `task_id`'s wakeup timer for `ticks` ticks from now. Replaces any
/// timer already armed for this task.
pub fn task_set_wakeup_timer(task_id: u32, ticks: u32) {
    let now = platform::timer_ticks();
    let deadline = now.wrapping_add(ticks as u64);
    let mut q = TIMER_QUEUE.lock();
    for entry in q.entries.iter_mut() {
        if entry.active && entry.task_id == task_id {
            entry.deadline_tick = deadline;
            return;
        }
    }
    for entry in q.entries.iter_mut() {
        if !entry.active {
            *entry = TimerEntry {
                task_id,
                deadline_tick: deadline,
                active: true,
            };
            return;
        }
    }
}

/// Cancel `task_id`'s wakeup timer, returning the ticks remaining until it
/// would have fired (0 if it was not armed, or had already elapsed).
pub fn task_cancel_wakeup_timer(task_id: u32) -> u32 {
    let now = platform::timer_ticks();
    let mut q = TIMER_QUEUE.lock();
    for entry in q.entries.iter_mut() {
        if entry.active && entry.task_id == task_id {
            let deadline = entry.deadline_tick;
            *entry = TimerEntry::empty();
            if tick_reached(now, deadline) {
                return 0;
            }
            return (deadline - now).min(u32::MAX as u64) as u32;
        }
    }
    0
}

/// Fire every timer due at `now_tick`: mark the owning task's wakeup object
/// and unblock it if it is currently waiting on a multi-object waiter.
pub fn wake_due_multiwait_timers(now_tick: u64) {
    let mut due = [INVALID_TASK_ID; MAX_TASKS];
    let mut due_count = 0usize;
    {
        let mut q = TIMER_QUEUE.lock();
        for entry in q.entries.iter_mut() {
            if entry.active && tick_reached(now_tick, entry.deadline_tick) {
                if due_count < due.len() {
                    due[due_count] = entry.task_id;
                    due_count += 1;
                }
                *entry = TimerEntry::empty();
            }
        }
    }

    for &task_id in due.iter().take(due_count) {
        let task = task_find_by_id(task_id);
        if task.is_null() {
            continue;
        }
        unsafe { (*task).multiwait_timer_fired.store(true, Ordering::Release) };
        let _ = unblock_task(task);
    }
}

/// Reset a task's timer wakeup flag. Called once the orchestrator has
/// consumed it.
pub fn clear_wakeup_object(task: *mut Task) {
    if task.is_null() {
        return;
    }
    unsafe { (*task).multiwait_timer_fired.store(false, Ordering::Release) };
}

pub fn wakeup_timer_fired(task: *mut Task) -> bool {
    if task.is_null() {
        return false;
    }
    unsafe { (*task).multiwait_timer_fired.load(Ordering::Acquire) }
}

/// Remove any timer still armed for a task. Called on task termination so a
/// stale entry can't outlive the task slot being recycled.
pub fn multiwait_remove_task(task: *mut Task) {
    if task.is_null() {
        return;
    }
    let task_id = unsafe { (*task).task_id };
    let mut q = TIMER_QUEUE.lock();
    for entry in q.entries.iter_mut() {
        if entry.active && entry.task_id == task_id {
            *entry = TimerEntry::empty();
        }
    }
}

// =============================================================================
// Multi-object waiter
// =============================================================================

#[derive(Clone, Copy, PartialEq, Eq)]
enum SlotKind {
    Empty,
    KCondSlot,
}

/// One element of a `multi_obj_waiter`.
///
/// `kind` is the slot's own, outer type tag: it stays set once a slot is
/// registered and is only cleared by `reset_slot`. `source` is the
/// registered condition; the condition's *subscriber* entry (keyed by
/// `subscriber_idx`) is what gets cleared on signal. That asymmetry — outer
/// tag untouched, inner subscriber entry fired — is how post-wakeup code
/// attributes a wakeup to specific slots without losing the registration.
struct MwobjElem {
    kind: SlotKind,
    source: Option<&'static KCond>,
    subscriber_idx: usize,
}

impl MwobjElem {
    const fn empty() -> Self {
        Self {
            kind: SlotKind::Empty,
            source: None,
            subscriber_idx: 0,
        }
    }
}

/// A fixed-size array of waiter slots, sized at allocation time from the
/// count of interesting conditions. Task-local for its lifetime: allocated
/// at the start of a wait, released before the syscall returns.
pub struct MultiObjWaiter {
    slots: *mut MwobjElem,
    len: usize,
}

// SAFETY: a MultiObjWaiter is only ever touched by the task that owns it,
// between allocation and release within a single syscall.
unsafe impl Send for MultiObjWaiter {}

impl MultiObjWaiter {
    /// Obtain a waiter with exactly `n` empty slots. `n == 0` is permitted:
    /// `sleep` then degenerates to blocking purely on the wakeup timer.
    pub fn allocate(n: usize) -> Option<Self> {
        if n == 0 {
            return Some(Self {
                slots: ptr::null_mut(),
                len: 0,
            });
        }

        let bytes = n * mem::size_of::<MwobjElem>();
        let raw = kmalloc(bytes) as *mut MwobjElem;
        if raw.is_null() {
            return None;
        }
        for i in 0..n {
            unsafe { raw.add(i).write(MwobjElem::empty()) };
        }
        Some(Self { slots: raw, len: n })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn slot(&self, index: usize) -> &MwobjElem {
        assert!(index < self.len, "multi-waiter slot index out of range");
        unsafe { &*self.slots.add(index) }
    }

    fn slot_mut(&mut self, index: usize) -> &mut MwobjElem {
        assert!(index < self.len, "multi-waiter slot index out of range");
        unsafe { &mut *self.slots.add(index) }
    }

    /// Register slot `index` to listen on `source`, subscribing `task` on
    /// its queue. Precondition: `index < n` and the slot is empty; violating
    /// either is a programmer error, matching the spec's infallible
    /// registration contract.
    pub fn set_slot(&mut self, index: usize, source: &'static KCond, task: *mut Task) {
        let subscriber_idx = source
            .subscribe(task)
            .expect("kcond subscriber queue exhausted");
        let slot = self.slot_mut(index);
        debug_assert!(slot.kind == SlotKind::Empty);
        slot.kind = SlotKind::KCondSlot;
        slot.source = Some(source);
        slot.subscriber_idx = subscriber_idx;
    }

    /// Detach slot `index` from its source queue and mark it empty. Idempotent.
    pub fn reset_slot(&mut self, index: usize) {
        let slot = self.slot_mut(index);
        if let Some(source) = slot.source.take() {
            source.unsubscribe(slot.subscriber_idx);
        }
        slot.kind = SlotKind::Empty;
    }

    /// Whether any registered slot's source has fired since registration (or
    /// since the last reset).
    pub fn any_fired(&self) -> bool {
        for i in 0..self.len {
            let slot = self.slot(i);
            if slot.kind == SlotKind::KCondSlot {
                if let Some(source) = slot.source {
                    if source.is_fired(slot.subscriber_idx) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// Suspend the calling task until at least one slot is signaled or the
    /// task's wakeup timer fires.
    pub fn sleep(&self) {
        let current = scheduler_get_current_task();
        if current.is_null() {
            return;
        }
        unsafe { (*current).block_reason = BlockReason::MultiWait };
        block_current_task();
    }

    /// Reset all slots and free the backing storage. Equivalent to dropping
    /// the waiter; provided as a named operation to match the wait-object
    /// vocabulary used elsewhere in this module.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for MultiObjWaiter {
    fn drop(&mut self) {
        for i in 0..self.len {
            self.reset_slot(i);
        }
        if !self.slots.is_null() {
            kfree(self.slots as *mut c_void);
            self.slots = ptr::null_mut();
        }
    }
}
