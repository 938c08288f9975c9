//! Early platform bring-up that must happen before the IRQ dispatcher and
//! scheduler are available.
//!
//! Runs ahead of `boot_drivers`'s staged init steps: it only pokes I/O ports
//! directly and must not depend on interrupts or the timer.

use slopos_lib::klog_info;

use crate::ps2;

pub fn init_platform_services() {
    ps2::init_controller();
    klog_info!("platform_init: PS/2 controller ready");
}
