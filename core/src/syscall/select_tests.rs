//! Entry-point tests for `syscall_select`/`syscall_poll`: the non-blocking
//! paths, which return without ever touching the scheduler or a second task.
//!
//! Unlike `fs_tests.rs`, these go through the real syscall ABI — user-space
//! fd sets, pollfds and timevals, validated and copied via `UserPtr`/
//! `UserBytes` against an actual process page directory. That means each
//! test needs a genuine mapped page and, because `copy_from_user`/
//! `copy_to_user` dereference the raw user address, the CPU's page
//! directory really has to be switched to the owning process for the
//! duration of the call (mirroring what happens on a syscall trap) and
//! back to the kernel's afterward.

use core::ffi::{c_char, c_int, c_void};
use core::ptr;

use slopos_abi::syscall::{POLLIN, UserPollFd, UserTimeval};
use slopos_abi::task::{INVALID_TASK_ID, TASK_FLAG_KERNEL_MODE};
use slopos_lib::{InterruptFrame, testing::TestResult};

use slopos_fs::fileio::{file_close_fd, file_pipe_create, file_write_fd};
use slopos_mm::paging::{paging_get_kernel_directory, switch_page_directory};
use slopos_mm::paging_defs::PageFlags;
use slopos_mm::test_fixtures::{ProcessVmGuard, map_test_page};
use slopos_mm::user_copy::{restore_task_provider, set_syscall_process_id};

use crate::scheduler::scheduler::{init_scheduler, scheduler_shutdown};
use crate::scheduler::task::{init_task_manager, task_create, task_find_by_id, task_shutdown_all};
use crate::scheduler::task_struct::Task;

use super::fs::{syscall_poll, syscall_select};

const RFDS_VA: u64 = 0x4000_0000;
const TIMEVAL_VA: u64 = 0x4000_1000;
const POLLFD_VA: u64 = 0x4000_2000;

struct SelectFixture;

impl SelectFixture {
    fn new() -> Self {
        task_shutdown_all();
        scheduler_shutdown();
        let _ = init_task_manager();
        let _ = init_scheduler();
        Self
    }
}

impl Drop for SelectFixture {
    fn drop(&mut self) {
        task_shutdown_all();
        scheduler_shutdown();
    }
}

fn dummy_entry(_arg: *mut c_void) {}

/// A kernel-mode task whose `process_id` has been pinned to `process_id`, so
/// `require_process_id` resolves it the same way a real user-mode task's
/// would, without needing a full user-mode task setup.
fn make_task(process_id: u32) -> Option<*mut Task> {
    let task_id = task_create(
        b"SelectTest\0".as_ptr() as *const c_char,
        dummy_entry,
        ptr::null_mut(),
        1,
        TASK_FLAG_KERNEL_MODE,
    );
    if task_id == INVALID_TASK_ID {
        return None;
    }
    let task = task_find_by_id(task_id);
    if task.is_null() {
        return None;
    }
    unsafe { (*task).process_id = process_id };
    Some(task)
}

fn make_frame(arg0: u64, arg1: u64, arg2: u64, arg3: u64, arg4: u64) -> InterruptFrame {
    InterruptFrame {
        r15: 0,
        r14: 0,
        r13: 0,
        r12: 0,
        r11: 0,
        r10: arg3,
        r9: 0,
        r8: arg4,
        rbp: 0,
        rdi: arg0,
        rsi: arg1,
        rdx: arg2,
        rcx: 0,
        rbx: 0,
        rax: 0,
        vector: 0,
        error_code: 0,
        rip: 0,
        cs: 0,
        rflags: 0,
        rsp: 0,
        ss: 0,
    }
}

fn set_fd_bit(buf: &mut [u8], fd: usize) {
    buf[fd / 8] |= 1u8 << (fd % 8);
}

unsafe fn write_user_bytes(va: u64, data: &[u8]) {
    unsafe {
        core::slice::from_raw_parts_mut(va as *mut u8, data.len()).copy_from_slice(data);
    }
}

unsafe fn read_user_bytes(va: u64, out: &mut [u8]) {
    unsafe {
        out.copy_from_slice(core::slice::from_raw_parts(va as *const u8, out.len()));
    }
}

unsafe fn write_user_timeval(va: u64, tv: UserTimeval) {
    unsafe { (va as *mut UserTimeval).write(tv) };
}

unsafe fn read_user_timeval(va: u64) -> UserTimeval {
    unsafe { (va as *const UserTimeval).read() }
}

unsafe fn write_user_pollfd(va: u64, pfd: UserPollFd) {
    unsafe { (va as *mut UserPollFd).write(pfd) };
}

unsafe fn read_user_pollfd(va: u64) -> UserPollFd {
    unsafe { (va as *const UserPollFd).read() }
}

/// `select` on an already-readable pipe returns immediately with it marked,
/// never touching the wait path. No timeout pointer is supplied.
pub fn test_syscall_select_immediate_readiness() -> TestResult {
    let Some(vm) = ProcessVmGuard::new() else {
        return TestResult::Fail;
    };
    let _fixture = SelectFixture::new();
    let Some(task) = make_task(vm.pid) else {
        return TestResult::Fail;
    };

    let mut read_fd: c_int = -1;
    let mut write_fd: c_int = -1;
    if file_pipe_create(vm.pid, 0, &mut read_fd, &mut write_fd) != 0 {
        return TestResult::Fail;
    }
    let payload = b"x";
    if file_write_fd(vm.pid, write_fd, payload.as_ptr() as *const c_char, 1) != 1 {
        let _ = file_close_fd(vm.pid, read_fd);
        let _ = file_close_fd(vm.pid, write_fd);
        return TestResult::Fail;
    }

    let nfds = read_fd as usize + 1;
    let bytes_len = nfds.div_ceil(8);
    let mut rfds = [0u8; 32];
    set_fd_bit(&mut rfds, read_fd as usize);

    if map_test_page(vm.page_dir, RFDS_VA, PageFlags::USER_RW.bits()).is_none() {
        let _ = file_close_fd(vm.pid, read_fd);
        let _ = file_close_fd(vm.pid, write_fd);
        return TestResult::Fail;
    }

    switch_page_directory(vm.page_dir);
    let prev_provider = set_syscall_process_id(vm.pid);
    unsafe { write_user_bytes(RFDS_VA, &rfds[..bytes_len]) };

    let mut frame = make_frame(nfds as u64, RFDS_VA, 0, 0, 0);
    let _ = syscall_select(task, &mut frame as *mut InterruptFrame);
    let result = frame.rax;

    let mut out = [0u8; 32];
    unsafe { read_user_bytes(RFDS_VA, &mut out[..bytes_len]) };

    restore_task_provider(prev_provider);
    switch_page_directory(paging_get_kernel_directory());

    let _ = file_close_fd(vm.pid, read_fd);
    let _ = file_close_fd(vm.pid, write_fd);

    if result == 1 && out[..bytes_len] == rfds[..bytes_len] {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

/// `select` with a `{0, 0}` timeout on a pipe with nothing to read returns 0
/// immediately, the fd set is cleared, and the timeout is written back
/// unchanged — the zero-timeout poll case that never enters the wait path.
pub fn test_syscall_select_zero_timeout_no_readiness() -> TestResult {
    let Some(vm) = ProcessVmGuard::new() else {
        return TestResult::Fail;
    };
    let _fixture = SelectFixture::new();
    let Some(task) = make_task(vm.pid) else {
        return TestResult::Fail;
    };

    let mut read_fd: c_int = -1;
    let mut write_fd: c_int = -1;
    if file_pipe_create(vm.pid, 0, &mut read_fd, &mut write_fd) != 0 {
        return TestResult::Fail;
    }

    let nfds = read_fd as usize + 1;
    let bytes_len = nfds.div_ceil(8);
    let mut rfds = [0u8; 32];
    set_fd_bit(&mut rfds, read_fd as usize);

    if map_test_page(vm.page_dir, RFDS_VA, PageFlags::USER_RW.bits()).is_none()
        || map_test_page(vm.page_dir, TIMEVAL_VA, PageFlags::USER_RW.bits()).is_none()
    {
        let _ = file_close_fd(vm.pid, read_fd);
        let _ = file_close_fd(vm.pid, write_fd);
        return TestResult::Fail;
    }

    switch_page_directory(vm.page_dir);
    let prev_provider = set_syscall_process_id(vm.pid);
    unsafe {
        write_user_bytes(RFDS_VA, &rfds[..bytes_len]);
        write_user_timeval(
            TIMEVAL_VA,
            UserTimeval {
                tv_sec: 0,
                tv_usec: 0,
            },
        );
    }

    let mut frame = make_frame(nfds as u64, RFDS_VA, 0, 0, TIMEVAL_VA);
    let _ = syscall_select(task, &mut frame as *mut InterruptFrame);
    let result = frame.rax;

    let mut out = [0u8; 32];
    let tv = unsafe {
        read_user_bytes(RFDS_VA, &mut out[..bytes_len]);
        read_user_timeval(TIMEVAL_VA)
    };

    restore_task_provider(prev_provider);
    switch_page_directory(paging_get_kernel_directory());

    let _ = file_close_fd(vm.pid, read_fd);
    let _ = file_close_fd(vm.pid, write_fd);

    let fds_cleared = out[..bytes_len].iter().all(|&b| b == 0);
    if result == 0 && fds_cleared && tv.tv_sec == 0 && tv.tv_usec == 0 {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

/// `poll` on an already-readable pipe reports `POLLIN` in `revents`
/// immediately, without arming a wakeup timer.
pub fn test_syscall_poll_immediate_readiness() -> TestResult {
    let Some(vm) = ProcessVmGuard::new() else {
        return TestResult::Fail;
    };
    let _fixture = SelectFixture::new();
    let Some(task) = make_task(vm.pid) else {
        return TestResult::Fail;
    };

    let mut read_fd: c_int = -1;
    let mut write_fd: c_int = -1;
    if file_pipe_create(vm.pid, 0, &mut read_fd, &mut write_fd) != 0 {
        return TestResult::Fail;
    }
    let payload = b"y";
    if file_write_fd(vm.pid, write_fd, payload.as_ptr() as *const c_char, 1) != 1 {
        let _ = file_close_fd(vm.pid, read_fd);
        let _ = file_close_fd(vm.pid, write_fd);
        return TestResult::Fail;
    }

    if map_test_page(vm.page_dir, POLLFD_VA, PageFlags::USER_RW.bits()).is_none() {
        let _ = file_close_fd(vm.pid, read_fd);
        let _ = file_close_fd(vm.pid, write_fd);
        return TestResult::Fail;
    }

    switch_page_directory(vm.page_dir);
    let prev_provider = set_syscall_process_id(vm.pid);
    unsafe {
        write_user_pollfd(
            POLLFD_VA,
            UserPollFd {
                fd: read_fd,
                events: POLLIN,
                revents: 0,
            },
        );
    }

    let mut frame = make_frame(POLLFD_VA, 1, 0, 0, 0);
    let _ = syscall_poll(task, &mut frame as *mut InterruptFrame);
    let result = frame.rax;
    let pfd = unsafe { read_user_pollfd(POLLFD_VA) };

    restore_task_provider(prev_provider);
    switch_page_directory(paging_get_kernel_directory());

    let _ = file_close_fd(vm.pid, read_fd);
    let _ = file_close_fd(vm.pid, write_fd);

    if result == 1 && (pfd.revents & POLLIN) != 0 {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

/// `poll` with `timeout_ms == 0` on a pipe with nothing to read returns 0
/// straight away — the non-blocking poll case.
pub fn test_syscall_poll_zero_timeout_no_readiness() -> TestResult {
    let Some(vm) = ProcessVmGuard::new() else {
        return TestResult::Fail;
    };
    let _fixture = SelectFixture::new();
    let Some(task) = make_task(vm.pid) else {
        return TestResult::Fail;
    };

    let mut read_fd: c_int = -1;
    let mut write_fd: c_int = -1;
    if file_pipe_create(vm.pid, 0, &mut read_fd, &mut write_fd) != 0 {
        return TestResult::Fail;
    }

    if map_test_page(vm.page_dir, POLLFD_VA, PageFlags::USER_RW.bits()).is_none() {
        let _ = file_close_fd(vm.pid, read_fd);
        let _ = file_close_fd(vm.pid, write_fd);
        return TestResult::Fail;
    }

    switch_page_directory(vm.page_dir);
    let prev_provider = set_syscall_process_id(vm.pid);
    unsafe {
        write_user_pollfd(
            POLLFD_VA,
            UserPollFd {
                fd: read_fd,
                events: POLLIN,
                revents: 0,
            },
        );
    }

    let mut frame = make_frame(POLLFD_VA, 1, 0, 0, 0);
    let _ = syscall_poll(task, &mut frame as *mut InterruptFrame);
    let result = frame.rax;
    let pfd = unsafe { read_user_pollfd(POLLFD_VA) };

    restore_task_provider(prev_provider);
    switch_page_directory(paging_get_kernel_directory());

    let _ = file_close_fd(vm.pid, read_fd);
    let _ = file_close_fd(vm.pid, write_fd);

    if result == 0 && pfd.revents == 0 {
        TestResult::Pass
    } else {
        TestResult::Fail
    }
}

slopos_lib::define_test_suite!(
    syscall_select_poll,
    [
        test_syscall_select_immediate_readiness,
        test_syscall_select_zero_timeout_no_readiness,
        test_syscall_poll_immediate_readiness,
        test_syscall_poll_zero_timeout_no_readiness,
    ]
);
