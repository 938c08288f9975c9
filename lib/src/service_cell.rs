//! Backing storage for [`crate::define_service!`] tables.
//!
//! Each generated service is a `&'static` vtable registered once during
//! boot and read from interrupt context and normal kernel code alike for
//! the remainder of the kernel's lifetime. [`ServiceCell`] stores that
//! pointer behind an atomic so registration and lookup don't need a lock.

use core::ptr;
use core::sync::atomic::{AtomicPtr, Ordering};

pub struct ServiceCell<T: 'static> {
    ptr: AtomicPtr<T>,
}

impl<T: 'static> ServiceCell<T> {
    pub const fn new() -> Self {
        Self {
            ptr: AtomicPtr::new(ptr::null_mut()),
        }
    }

    /// Register the service implementation. Intended to be called once,
    /// early in boot, before any other CPU can observe a null pointer.
    pub fn register(&self, services: &'static T) {
        self.ptr
            .store(services as *const T as *mut T, Ordering::Release);
    }

    #[inline]
    pub fn is_registered(&self) -> bool {
        !self.ptr.load(Ordering::Acquire).is_null()
    }

    /// Fetch the registered implementation.
    ///
    /// # Panics
    /// Panics if no implementation has been registered yet. Every service
    /// table must be registered during early boot before any syscall or
    /// interrupt handler can reach it.
    #[inline]
    pub fn get(&self) -> &'static T {
        let p = self.ptr.load(Ordering::Acquire);
        assert!(!p.is_null(), "service accessed before registration");
        unsafe { &*p }
    }
}

impl<T: 'static> Default for ServiceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the pointee is always `&'static T`, so sharing the raw pointer
// across CPUs is equivalent to sharing that reference.
unsafe impl<T: 'static> Sync for ServiceCell<T> {}
