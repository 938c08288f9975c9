//! One-shot and re-enterable atomic flags used to coordinate init and
//! shutdown sequences without a full lock.

use core::sync::atomic::{AtomicBool, Ordering};

/// A flag that is meant to be set exactly once.
///
/// Typical use: a subsystem's `init()` calls [`InitFlag::init_once`] and
/// panics if it was already set, while accessors call [`InitFlag::is_set`]
/// to guard against use-before-init.
pub struct InitFlag {
    flag: AtomicBool,
}

impl InitFlag {
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Atomically claim the flag. Returns `true` if this call is the one
    /// that set it, `false` if it was already set.
    #[inline]
    pub fn init_once(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Unconditionally mark the flag as set.
    #[inline]
    pub fn mark_set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_set_relaxed(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Default for InitFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// A boolean flag that can be entered, left, and re-entered, used to
/// coordinate transient states like "shutdown in progress".
pub struct StateFlag {
    flag: AtomicBool,
}

impl StateFlag {
    pub const fn new() -> Self {
        Self {
            flag: AtomicBool::new(false),
        }
    }

    /// Atomically transition from inactive to active. Returns `true` if
    /// this call performed the transition, `false` if already active.
    #[inline]
    pub fn enter(&self) -> bool {
        self.flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Reset the flag to inactive.
    #[inline]
    pub fn leave(&self) {
        self.flag.store(false, Ordering::Release);
    }

    #[inline]
    pub fn set_active(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Atomically reset to inactive and return the previous value.
    #[inline]
    pub fn take(&self) -> bool {
        self.flag.swap(false, Ordering::AcqRel)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_active_relaxed(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

impl Default for StateFlag {
    fn default() -> Self {
        Self::new()
    }
}
