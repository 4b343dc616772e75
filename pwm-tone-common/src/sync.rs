//! 中断上下文共享状态
//!
//! State touched both by the caller and by a timer callback lives in a
//! [`SharedCell`]: a critical-section blocking mutex around a `RefCell`, usable
//! from interrupt handlers on target and from threads on the host.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};

pub struct SharedCell<T> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<T>>,
}

impl<T> SharedCell<T> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(value)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.inner.lock(|cell| f(&cell.borrow()))
    }

    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }
}
