#[macro_use]
pub mod macros;
pub mod common;
pub mod context;
pub mod core_handlers;
pub mod dispatch;
pub mod fs;
#[cfg(feature = "itests")]
pub mod fs_tests;
pub mod handlers;
pub mod memory_handlers;
pub mod process_handlers;
#[cfg(feature = "itests")]
pub mod select_tests;
pub mod signal;
#[cfg(feature = "itests")]
pub mod tests;

pub use dispatch::syscall_handle;
