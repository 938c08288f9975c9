//! Structural tests for `kcond` and the multi-object waiter.
//!
//! These exercise subscribe/signal/unsubscribe and slot registration directly
//! rather than driving a real block/wake cycle through the scheduler: a task
//! that calls `MultiObjWaiter::sleep()` truly suspends, and there is no second
//! task here to wake it, so these tests stay one level below that (the same
//! boundary `sched_tests.rs` draws around state-machine transitions versus
//! full context switches).

use core::ffi::{c_char, c_void};
use core::ptr;

use slopos_lib::testing::TestResult;

use super::kcond::KCond;
use super::multiwait::MultiObjWaiter;
use super::sched_tests::SchedFixture;
use super::task::{
    task_create, task_find_by_id, task_shutdown_all, INVALID_TASK_ID, TASK_FLAG_KERNEL_MODE,
    TASK_PRIORITY_NORMAL,
};

fn dummy_task_fn(_arg: *mut c_void) {}

fn spawn_dummy(name: &[u8]) -> *mut super::task_struct::Task {
    let task_id = task_create(
        name.as_ptr() as *const c_char,
        dummy_task_fn,
        ptr::null_mut(),
        TASK_PRIORITY_NORMAL,
        TASK_FLAG_KERNEL_MODE,
    );
    if task_id == INVALID_TASK_ID {
        return ptr::null_mut();
    }
    task_find_by_id(task_id)
}

/// Signaling a kcond with exactly one subscriber fires that subscriber and
/// leaves no other state behind.
pub fn test_kcond_signal_fires_subscriber() -> TestResult {
    let _fixture = SchedFixture::new();
    let cond = KCond::new();

    let task = spawn_dummy(b"KCondOne\0");
    if task.is_null() {
        return TestResult::Fail;
    }

    let Some(idx) = cond.subscribe(task) else {
        return TestResult::Fail;
    };
    if cond.is_fired(idx) {
        return TestResult::Fail;
    }

    cond.signal();

    if !cond.is_fired(idx) {
        return TestResult::Fail;
    }

    cond.unsubscribe(idx);
    if cond.is_fired(idx) {
        return TestResult::Fail;
    }

    TestResult::Pass
}

/// Registering K subscribers and signaling wakes all of them: `signal` has
/// no notion of "the one slot that mattered", only "everyone currently
/// subscribed".
pub fn test_kcond_signal_wakes_all_subscribers() -> TestResult {
    let _fixture = SchedFixture::new();
    let cond = KCond::new();

    let t1 = spawn_dummy(b"KCondA\0");
    let t2 = spawn_dummy(b"KCondB\0");
    let t3 = spawn_dummy(b"KCondC\0");
    if t1.is_null() || t2.is_null() || t3.is_null() {
        return TestResult::Fail;
    }

    let (Some(i1), Some(i2), Some(i3)) = (cond.subscribe(t1), cond.subscribe(t2), cond.subscribe(t3))
    else {
        return TestResult::Fail;
    };

    cond.signal();

    if !(cond.is_fired(i1) && cond.is_fired(i2) && cond.is_fired(i3)) {
        return TestResult::Fail;
    }

    TestResult::Pass
}

/// Unsubscribing is idempotent: detaching twice, or detaching an index that
/// was never subscribed, must not panic or corrupt other entries.
pub fn test_kcond_unsubscribe_idempotent() -> TestResult {
    let _fixture = SchedFixture::new();
    let cond = KCond::new();

    let task = spawn_dummy(b"KCondIdem\0");
    if task.is_null() {
        return TestResult::Fail;
    }

    let Some(idx) = cond.subscribe(task) else {
        return TestResult::Fail;
    };
    cond.unsubscribe(idx);
    cond.unsubscribe(idx);
    cond.unsubscribe(idx + 1);

    TestResult::Pass
}

/// A waiter allocated with zero slots is valid and reports nothing fired:
/// the degenerate "sleep resolves purely against the wakeup timer" case.
pub fn test_multiwait_allocate_zero_slots() -> TestResult {
    let Some(waiter) = MultiObjWaiter::allocate(0) else {
        return TestResult::Fail;
    };
    if waiter.len() != 0 {
        return TestResult::Fail;
    }
    if waiter.any_fired() {
        return TestResult::Fail;
    }
    waiter.release();
    TestResult::Pass
}

/// Registering K condition variables and signaling exactly one of them wakes
/// the waiter via `any_fired`, and the other K-1 slots remain unfired
/// (the Testable Properties invariant #5 from the readiness-wait spec).
pub fn test_multiwait_signal_one_of_many() -> TestResult {
    static COND_A: KCond = KCond::new();
    static COND_B: KCond = KCond::new();
    static COND_C: KCond = KCond::new();

    let _fixture = SchedFixture::new();

    let task = spawn_dummy(b"MultiwaitK\0");
    if task.is_null() {
        return TestResult::Fail;
    }

    let Some(mut waiter) = MultiObjWaiter::allocate(3) else {
        return TestResult::Fail;
    };
    waiter.set_slot(0, &COND_A, task);
    waiter.set_slot(1, &COND_B, task);
    waiter.set_slot(2, &COND_C, task);

    if waiter.any_fired() {
        return TestResult::Fail;
    }

    COND_B.signal();

    if !waiter.any_fired() {
        return TestResult::Fail;
    }

    waiter.reset_slot(0);
    waiter.reset_slot(2);
    waiter.release();

    TestResult::Pass
}

/// `reset_slot` detaches from the source queue; once reset, a later signal
/// on that same condition must not affect the (now empty) slot.
pub fn test_multiwait_reset_slot_detaches() -> TestResult {
    static COND: KCond = KCond::new();

    let _fixture = SchedFixture::new();

    let task = spawn_dummy(b"MultiwaitReset\0");
    if task.is_null() {
        return TestResult::Fail;
    }

    let Some(mut waiter) = MultiObjWaiter::allocate(1) else {
        return TestResult::Fail;
    };
    waiter.set_slot(0, &COND, task);
    waiter.reset_slot(0);

    COND.signal();

    if waiter.any_fired() {
        return TestResult::Fail;
    }

    waiter.release();
    TestResult::Pass
}

/// Dropping (releasing) a waiter unsubscribes every slot, freeing its
/// entries on the condition's subscriber queue for reuse.
pub fn test_multiwait_release_frees_subscriber_slots() -> TestResult {
    static COND: KCond = KCond::new();

    let _fixture = SchedFixture::new();

    let task = spawn_dummy(b"MultiwaitRelease\0");
    if task.is_null() {
        return TestResult::Fail;
    }

    let Some(mut waiter) = MultiObjWaiter::allocate(1) else {
        return TestResult::Fail;
    };
    waiter.set_slot(0, &COND, task);
    waiter.release();
    let Some(reused_idx) = COND.subscribe(task) else {
        return TestResult::Fail;
    };
    COND.unsubscribe(reused_idx);

    task_shutdown_all();
    TestResult::Pass
}

slopos_lib::define_test_suite!(
    multiwait_core,
    [
        test_kcond_signal_fires_subscriber,
        test_kcond_signal_wakes_all_subscribers,
        test_kcond_unsubscribe_idempotent,
        test_multiwait_allocate_zero_slots,
        test_multiwait_signal_one_of_many,
        test_multiwait_reset_slot_detaches,
        test_multiwait_release_frees_subscriber_slots,
    ]
);
