#![no_std]
#![allow(unsafe_op_in_unsafe_fn)]

pub mod apic;
pub mod apic_defs;
pub mod hpet;
pub mod interrupt_test;
pub mod ioapic;
pub mod ioapic_defs;
pub mod irq;
pub mod pic;
pub mod pit;
pub mod platform_init;
pub mod ps2;
pub mod random;
pub mod serial;
pub mod syscall_services_init;
pub mod tty;

#[cfg(feature = "itests")]
pub mod apic_timer_tests;
#[cfg(feature = "itests")]
pub mod hpet_tests;
#[cfg(feature = "itests")]
pub mod pit_tests;

pub use ps2::keyboard;
