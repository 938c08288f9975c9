pub mod tty;

pub use tty::*;
