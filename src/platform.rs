//! Platform abstraction layer for kernel operations.
//!
//! This module provides an abstraction over the platform-specific operations
//! the dump reader needs (page allocation, virtual to physical translation)
//! to allow testing in user space.

use core::ptr::NonNull;
#[cfg(any(test, not(feature = "axhal")))]
use core::sync::atomic::{AtomicBool, Ordering};

/// Size of one trace page (4KB).
pub const PAGE_SIZE: usize = 0x1000;

/// Platform operations trait.
///
/// Abstracts over kernel-specific operations to enable mock testing.
pub trait PlatformOps {
    /// Allocate one page-aligned, zeroed page of `PAGE_SIZE` bytes.
    fn alloc_page() -> Option<NonNull<u8>>;

    /// Release a page obtained from [`PlatformOps::alloc_page`].
    ///
    /// # Safety
    /// `page` must come from `alloc_page` and must not be used afterwards.
    unsafe fn free_page(page: NonNull<u8>);

    /// Translate a kernel virtual address to the physical address the
    /// hypervisor expects.
    fn virt_to_phys(vaddr: usize) -> u64;
}

// =============================================================================
// Real Implementation (kernel environment with axhal)
// =============================================================================

/// Real platform operations using axhal and axalloc.
#[cfg(all(not(test), feature = "axhal"))]
pub struct RealPlatform;

#[cfg(all(not(test), feature = "axhal"))]
impl PlatformOps for RealPlatform {
    fn alloc_page() -> Option<NonNull<u8>> {
        let vaddr = axalloc::global_allocator()
            .alloc_pages(1, PAGE_SIZE, axalloc::UsageKind::Dma)
            .ok()?;
        unsafe {
            core::ptr::write_bytes(vaddr as *mut u8, 0, PAGE_SIZE);
        }
        NonNull::new(vaddr as *mut u8)
    }

    unsafe fn free_page(page: NonNull<u8>) {
        axalloc::global_allocator().dealloc_pages(
            page.as_ptr() as usize,
            1,
            axalloc::UsageKind::Dma,
        );
    }

    fn virt_to_phys(vaddr: usize) -> u64 {
        axhal::mem::virt_to_phys(vaddr.into()).as_usize() as u64
    }
}

// =============================================================================
// Mock Implementation (test environment or no axhal)
// =============================================================================

/// When set, the mock allocator refuses every request.
#[cfg(any(test, not(feature = "axhal")))]
static MOCK_ALLOC_FAIL: AtomicBool = AtomicBool::new(false);

/// Mock platform operations for testing.
///
/// Pages come from the global allocator and physical addresses are the
/// identity mapping, so a mock hypervisor can write straight through them.
#[cfg(any(test, not(feature = "axhal")))]
pub struct MockPlatform;

#[cfg(any(test, not(feature = "axhal")))]
fn page_layout() -> core::alloc::Layout {
    // PAGE_SIZE is a non-zero power of two.
    unsafe { core::alloc::Layout::from_size_align_unchecked(PAGE_SIZE, PAGE_SIZE) }
}

#[cfg(any(test, not(feature = "axhal")))]
impl PlatformOps for MockPlatform {
    fn alloc_page() -> Option<NonNull<u8>> {
        if MOCK_ALLOC_FAIL.load(Ordering::Relaxed) {
            return None;
        }
        NonNull::new(unsafe { alloc::alloc::alloc_zeroed(page_layout()) })
    }

    unsafe fn free_page(page: NonNull<u8>) {
        unsafe { alloc::alloc::dealloc(page.as_ptr(), page_layout()) }
    }

    fn virt_to_phys(vaddr: usize) -> u64 {
        vaddr as u64
    }
}

/// Make the mock allocator fail (or succeed again) for testing.
#[cfg(any(test, not(feature = "axhal")))]
pub fn set_mock_alloc_fail(fail: bool) {
    MOCK_ALLOC_FAIL.store(fail, Ordering::Relaxed);
}

// =============================================================================
// Platform Type Alias
// =============================================================================

/// The active platform implementation.
///
/// In kernel environment with axhal: RealPlatform (uses axhal/axalloc)
/// In test environment or without axhal: MockPlatform (global allocator)
#[cfg(all(not(test), feature = "axhal"))]
pub type Platform = RealPlatform;

#[cfg(any(test, not(feature = "axhal")))]
pub type Platform = MockPlatform;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_page_is_aligned_and_zeroed() {
        let page = Platform::alloc_page().unwrap();
        assert_eq!(page.as_ptr() as usize % PAGE_SIZE, 0);
        let bytes = unsafe { core::slice::from_raw_parts(page.as_ptr(), PAGE_SIZE) };
        assert!(bytes.iter().all(|&b| b == 0));
        unsafe { Platform::free_page(page) };
    }

    #[test]
    fn test_mock_identity_mapping() {
        assert_eq!(Platform::virt_to_phys(0x8000_1000), 0x8000_1000);
    }
}
