use slopos_core::syscall_services::{TtyServices, register_tty_services};

use crate::tty;

static TTY_SERVICES: TtyServices = TtyServices {
    read_line: tty_read_line,
    read_char_blocking: tty_read_char_blocking,
    set_focus: tty_set_focus,
    get_focus: tty_get_focus,
};

fn tty_read_line(buf: *mut u8, len: usize) -> usize {
    tty::tty_read_line(buf, len)
}

fn tty_read_char_blocking(buf: *mut u8) -> i32 {
    tty::tty_read_char_blocking(buf)
}

fn tty_set_focus(target: u32) -> i32 {
    tty::tty_set_focus(target)
}

fn tty_get_focus() -> u32 {
    tty::tty_get_focus()
}

pub fn init_syscall_services() {
    register_tty_services(&TTY_SERVICES);
}
