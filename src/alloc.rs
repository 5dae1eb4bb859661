//! Module for native allocation and storage selection

use std::alloc::{alloc, dealloc, Layout};
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::mem::MaybeUninit;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::Context;

/// Error type for fallible allocation
/// This error is returned when an allocation fails.
/// It does not contain any additional information.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct AllocError;

impl Error for AllocError {}

impl fmt::Display for AllocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("memory allocation failed")
    }
}

static ALLOCATED_BYTES: AtomicU64 = AtomicU64::new(0);

/// Total number of bytes currently held by native allocations made by this
/// crate. Wrapped foreign memory is not counted.
pub fn allocated_native_bytes() -> u64 {
    ALLOCATED_BYTES.load(Ordering::Relaxed)
}

/// Where the elements of an array physically live.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StorageMode {
    /// An ordinary `Vec` owned by the array
    Managed,
    /// A block requested directly from the system allocator
    Native,
}

/// Chooses the storage for a new array of `len` elements.
pub fn select_storage(ctx: &Context, len: usize) -> StorageMode {
    if len <= ctx.max_managed_len() {
        StorageMode::Managed
    } else {
        StorageMode::Native
    }
}

/// A block of memory obtained from the system allocator.
///
/// The block is released when the value is dropped. Release is guarded by a
/// one-shot sentinel, so calling [`NativeMemory::release`] early is allowed
/// and the later drop does nothing.
pub struct NativeMemory {
    ptr: NonNull<u8>,
    layout: Layout,
    freed: AtomicBool,
}

// Safety: the block is plain bytes; synchronisation of the contents is the
// responsibility of the arrays built on top of it.
unsafe impl Send for NativeMemory {}
unsafe impl Sync for NativeMemory {}

impl NativeMemory {
    /// Allocates `layout.size()` bytes. When `zero` is set the block is
    /// cleared, splitting the work over the context's workers for large
    /// blocks.
    pub fn allocate(ctx: &Context, layout: Layout, zero: bool) -> Result<Self, AllocError> {
        if layout.size() == 0 {
            return Err(AllocError);
        }
        // Safety: layout has a non-zero size
        let ptr = NonNull::new(unsafe { alloc(layout) }).ok_or(AllocError)?;
        if zero {
            // Safety: the block was just allocated with this size, and
            // `MaybeUninit<u8>` has no validity requirement
            let bytes = unsafe {
                std::slice::from_raw_parts_mut(ptr.as_ptr().cast::<MaybeUninit<u8>>(), layout.size())
            };
            ctx.zero_bytes(bytes);
        }
        let total = ALLOCATED_BYTES.fetch_add(layout.size() as u64, Ordering::Relaxed)
            + layout.size() as u64;
        tracing::debug!(bytes = layout.size(), total, "allocated native block");
        Ok(Self {
            ptr,
            layout,
            freed: AtomicBool::new(false),
        })
    }

    /// Pointer to the start of the block.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    /// Size of the block in bytes.
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Returns `true` once the block has been released.
    pub fn is_freed(&self) -> bool {
        self.freed.load(Ordering::Acquire)
    }

    /// Returns the block to the allocator. Only the first call has an effect.
    ///
    /// # Safety
    ///
    /// No pointer into the block may be used after this call.
    pub unsafe fn release(&self) {
        if self.freed.swap(true, Ordering::AcqRel) {
            return;
        }
        dealloc(self.ptr.as_ptr(), self.layout);
        let total = ALLOCATED_BYTES.fetch_sub(self.layout.size() as u64, Ordering::Relaxed)
            - self.layout.size() as u64;
        tracing::debug!(bytes = self.layout.size(), total, "released native block");
    }
}

impl Drop for NativeMemory {
    fn drop(&mut self) {
        // Safety: nothing can point into the block once its owner is gone
        unsafe { self.release() }
    }
}

impl fmt::Debug for NativeMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMemory")
            .field("ptr", &self.ptr)
            .field("size", &self.layout.size())
            .field("freed", &self.is_freed())
            .finish()
    }
}

/// Handle keeping native memory alive.
#[derive(Clone)]
pub(crate) enum NativeOrigin {
    /// Memory allocated by this crate
    Allocated(Arc<NativeMemory>),
    /// Memory owned by someone else, kept alive through `owner`
    Wrapped(Arc<dyn Any + Send + Sync>),
}

impl NativeOrigin {
    pub(crate) fn owner(&self) -> Arc<dyn Any + Send + Sync> {
        match self {
            Self::Allocated(memory) => memory.clone(),
            Self::Wrapped(owner) => owner.clone(),
        }
    }

    fn owner_ptr(&self) -> *const () {
        match self {
            Self::Allocated(memory) => Arc::as_ptr(memory).cast(),
            Self::Wrapped(owner) => Arc::as_ptr(owner).cast(),
        }
    }
}

/// Typed view over native memory.
pub(crate) struct NativeBuffer<T> {
    ptr: NonNull<T>,
    len: usize,
    origin: NativeOrigin,
}

// Safety: the buffer behaves like a `Box<[T]>`
unsafe impl<T: Send> Send for NativeBuffer<T> {}
unsafe impl<T: Sync> Sync for NativeBuffer<T> {}

impl<T> NativeBuffer<T> {
    pub(crate) fn layout(len: usize) -> Option<Layout> {
        Layout::array::<T>(len).ok()
    }

    /// Allocates room for `len` elements. Without `zero` the contents are
    /// unspecified.
    pub(crate) fn allocate(ctx: &Context, layout: Layout, zero: bool) -> Self {
        let len = layout.size() / std::mem::size_of::<T>();
        match NativeMemory::allocate(ctx, layout, zero) {
            Ok(memory) => Self {
                ptr: memory.ptr.cast(),
                len,
                origin: NativeOrigin::Allocated(Arc::new(memory)),
            },
            Err(AllocError) => std::alloc::handle_alloc_error(layout),
        }
    }

    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` elements for as long
    /// as `owner` is alive, and must not be accessed through other paths while
    /// the buffer exists.
    pub(crate) unsafe fn wrap(owner: Arc<dyn Any + Send + Sync>, ptr: NonNull<T>, len: usize) -> Self {
        Self {
            ptr,
            len,
            origin: NativeOrigin::Wrapped(owner),
        }
    }

    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub(crate) fn as_slice(&self) -> &[T] {
        // Safety: `ptr` is valid for `len` elements while `origin` lives
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        // Safety: as above, and `&mut self` guarantees exclusive access
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    pub(crate) fn origin(&self) -> &NativeOrigin {
        &self.origin
    }

    /// Identity comparison: same memory, and same owner.
    pub(crate) fn same_memory(&self, other: &Self) -> bool {
        self.ptr == other.ptr && self.origin.owner_ptr() == other.origin.owner_ptr()
    }
}
