//! Pipe/readiness integration tests for the `select`/`poll` wait path.
//!
//! These drive `slopos_fs::fileio`'s pipe primitives and this module's
//! `cond_for_fd`/`signal_pipe_fd`/`pipe_cond` helpers directly, one layer
//! below the syscall entry points (which additionally marshal user-space
//! descriptor sets and pointers — see `multiwait_tests.rs` for why the
//! blocking half of `multiwait_block` stays out of scope here too: a real
//! wakeup needs a second task to do the signaling concurrently).

use core::ffi::{c_char, c_int};

use slopos_abi::syscall::POLLIN;
use slopos_abi::task::INVALID_PROCESS_ID;
use slopos_fs::fileio::{file_close_fd, file_pipe_create, file_poll_fd, file_read_fd, file_write_fd};
use slopos_lib::testing::TestResult;

use super::fs::{cond_for_fd, pipe_cond, signal_pipe_fd};

fn make_pipe() -> Option<(c_int, c_int)> {
    let mut read_fd: c_int = -1;
    let mut write_fd: c_int = -1;
    if file_pipe_create(INVALID_PROCESS_ID, 0, &mut read_fd, &mut write_fd) != 0 {
        return None;
    }
    Some((read_fd, write_fd))
}

/// Both ends of a freshly created pipe are pipe-backed: `cond_for_fd` finds
/// a condition variable for each, and they share a bucket (same pipe id).
pub fn test_cond_for_fd_pipe_ends_share_bucket() -> TestResult {
    let Some((read_fd, write_fd)) = make_pipe() else {
        return TestResult::Fail;
    };

    let read_cond = cond_for_fd(INVALID_PROCESS_ID, read_fd);
    let write_cond = cond_for_fd(INVALID_PROCESS_ID, write_fd);

    let result = match (read_cond, write_cond) {
        (Some(a), Some(b)) if core::ptr::eq(a, b) => TestResult::Pass,
        _ => TestResult::Fail,
    };

    let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
    let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
    result
}

/// A descriptor with no pipe backing (an invalid fd, here) has no condition
/// to subscribe to — the marshaller must fall back to treating it as
/// always-ready rather than waiting on it.
pub fn test_cond_for_fd_non_pipe_is_none() -> TestResult {
    if cond_for_fd(INVALID_PROCESS_ID, 9999).is_some() {
        return TestResult::Fail;
    }
    TestResult::Pass
}

/// Writing into an empty pipe signals its condition variable, and
/// `file_poll_fd` reports POLLIN afterwards — the readiness transition a
/// blocked `select`/`poll` caller is waiting to observe.
pub fn test_pipe_write_signals_and_marks_readable() -> TestResult {
    let Some((read_fd, write_fd)) = make_pipe() else {
        return TestResult::Fail;
    };

    let Some(cond) = cond_for_fd(INVALID_PROCESS_ID, read_fd) else {
        let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
        let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
        return TestResult::Fail;
    };

    let before = file_poll_fd(INVALID_PROCESS_ID, read_fd, POLLIN) & POLLIN;

    let data = b"x";
    let written = file_write_fd(INVALID_PROCESS_ID, write_fd, data.as_ptr() as *const c_char, 1);
    signal_pipe_fd(INVALID_PROCESS_ID, write_fd);

    let after = file_poll_fd(INVALID_PROCESS_ID, read_fd, POLLIN) & POLLIN;

    let _ = cond;
    let result = if written == 1 && before == 0 && after != 0 {
        TestResult::Pass
    } else {
        TestResult::Fail
    };

    let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
    let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
    result
}

/// Draining a pipe back to empty clears its POLLIN readiness again.
pub fn test_pipe_read_drains_readiness() -> TestResult {
    let Some((read_fd, write_fd)) = make_pipe() else {
        return TestResult::Fail;
    };

    let data = b"y";
    if file_write_fd(INVALID_PROCESS_ID, write_fd, data.as_ptr() as *const c_char, 1) != 1 {
        let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
        let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
        return TestResult::Fail;
    }

    let mut buf = [0u8; 1];
    let read = file_read_fd(INVALID_PROCESS_ID, read_fd, buf.as_mut_ptr() as *mut c_char, 1);
    signal_pipe_fd(INVALID_PROCESS_ID, read_fd);

    let after = file_poll_fd(INVALID_PROCESS_ID, read_fd, POLLIN) & POLLIN;

    let result = if read == 1 && after == 0 {
        TestResult::Pass
    } else {
        TestResult::Fail
    };

    let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
    let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
    result
}

/// Closing one end signals the shared bucket too, so a waiter blocked on
/// the surviving end gets a chance to observe the hangup. The syscall layer
/// (`syscall_fs_close`) captures the condition before closing and signals it
/// after; this test reproduces that sequencing against the lower-level
/// `file_close_fd`, which does not signal on its own.
pub fn test_pipe_close_signals_bucket() -> TestResult {
    let Some((read_fd, write_fd)) = make_pipe() else {
        return TestResult::Fail;
    };

    let Some(write_cond) = cond_for_fd(INVALID_PROCESS_ID, write_fd) else {
        let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
        let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
        return TestResult::Fail;
    };

    let Some(idx) = write_cond.subscribe(core::ptr::null_mut()) else {
        let _ = file_close_fd(INVALID_PROCESS_ID, read_fd);
        let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);
        return TestResult::Fail;
    };

    let captured_cond = cond_for_fd(INVALID_PROCESS_ID, read_fd);
    let closed = file_close_fd(INVALID_PROCESS_ID, read_fd) == 0;
    if closed {
        if let Some(cond) = captured_cond {
            cond.signal();
        }
    }
    let fired = write_cond.is_fired(idx);
    write_cond.unsubscribe(idx);

    let _ = file_close_fd(INVALID_PROCESS_ID, write_fd);

    if closed && fired {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

/// Two pipe ids that land in the same bucket (differing by `PIPE_COND_COUNT`)
/// really do resolve to the same condition variable — the documented
/// collision-tolerance case behind testable property 9.
pub fn test_pipe_cond_bucket_collision() -> TestResult {
    let a = pipe_cond(3);
    let b = pipe_cond(3 + 64);
    if core::ptr::eq(a, b) {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

slopos_lib::define_test_suite!(
    fs_select_readiness,
    [
        test_cond_for_fd_pipe_ends_share_bucket,
        test_cond_for_fd_non_pipe_is_none,
        test_pipe_write_signals_and_marks_readable,
        test_pipe_read_drains_readiness,
        test_pipe_close_signals_bucket,
        test_pipe_cond_bucket_collision,
    ]
);
