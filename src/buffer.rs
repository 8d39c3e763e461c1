//! The shared trace page.
//!
//! One page-aligned page, filled by the hypervisor through its physical
//! address and copied out by readers. Every stream opened on a dump shares
//! the same page.

use core::ptr::NonNull;

use axerrno::AxResult;
use spin::{Mutex, MutexGuard};

use crate::platform::{PAGE_SIZE, Platform, PlatformOps};

struct Page(NonNull<u8>);

// The page is only touched through the owning mutex.
unsafe impl Send for Page {}

impl Drop for Page {
    fn drop(&mut self) {
        unsafe { Platform::free_page(self.0) }
    }
}

/// Single-page trace buffer shared by every reader of a dump.
pub struct TraceBuffer {
    page: Mutex<Page>,
    phys_addr: u64,
}

impl TraceBuffer {
    pub fn new() -> AxResult<Self> {
        let Some(ptr) = Platform::alloc_page() else {
            return axerrno::ax_err!(NoMemory, "htmdump: failed to allocate trace page");
        };
        let phys_addr = Platform::virt_to_phys(ptr.as_ptr() as usize);
        debug!("htmdump: trace page va={:p} pa={:#x}", ptr.as_ptr(), phys_addr);
        Ok(Self {
            page: Mutex::new(Page(ptr)),
            phys_addr,
        })
    }

    /// Physical address handed to the hypervisor.
    pub fn phys_addr(&self) -> u64 {
        self.phys_addr
    }

    /// Take the page for one fetch-and-copy.
    ///
    /// The guard is held across the H_HTM hypercall, which may block for
    /// the whole remote query. `spin::Mutex` busy-waits, so a concurrent
    /// reader spins on its CPU until the holder's fetch and copy finish.
    pub fn lock(&self) -> TracePage<'_> {
        TracePage {
            guard: self.page.lock(),
        }
    }
}

/// Exclusive access to the trace page for the duration of one read.
pub struct TracePage<'a> {
    guard: MutexGuard<'a, Page>,
}

impl TracePage<'_> {
    /// Page contents as left by the most recent fetch.
    pub fn as_slice(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.guard.0.as_ptr(), PAGE_SIZE) }
    }
}
