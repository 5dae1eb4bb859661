//! Functionality relating to arrays of primitive elements

use std::any::Any;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::ptr::NonNull;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::alloc::{select_storage, NativeBuffer, StorageMode};
use crate::element::Element;
use crate::error::{check_index, check_len, LargeArrayError, Result};
use crate::{Context, ElementKind};

/// Largest number of elements materialized into a `Vec` by bulk reads.
pub const LARGEST_SUBARRAY: usize = 1 << 30;

pub(crate) enum Storage<T> {
    Managed(Vec<T>),
    Native(NativeBuffer<T>),
}

/// A fixed-length array of primitive elements.
///
/// Arrays up to [`Context::max_managed_len`] elements keep their data in a
/// `Vec`. Longer arrays allocate directly from the system allocator; that
/// memory is released when the array is dropped. The choice is made once, at
/// construction.
///
/// A constant array stores a single value and reads it back at every index.
/// Constant arrays cannot be modified.
///
/// Arrays provide no internal locking. Reading an array from several threads
/// is fine; mutating it while another thread reads it is not possible through
/// the safe API and is undefined behaviour through the raw one.
pub struct TypedArray<T> {
    len: usize,
    constant: bool,
    storage: Storage<T>,
}

fn element_layout<T>(len: usize) -> Result<std::alloc::Layout> {
    NativeBuffer::<T>::layout(len).ok_or_else(|| {
        LargeArrayError::invalid(format!("{} elements do not fit in memory", len))
    })
}

impl<T: Element> TypedArray<T> {
    fn allocate(ctx: &Context, len: usize, zero: bool) -> Result<Self> {
        check_len(len)?;
        let storage = match select_storage(ctx, len) {
            StorageMode::Managed => Storage::Managed(vec![T::default(); len]),
            StorageMode::Native => {
                // only 0 and 1 are valid bytes for `bool`
                let zero = zero || T::KIND == ElementKind::Logic;
                Storage::Native(NativeBuffer::allocate(ctx, element_layout::<T>(len)?, zero))
            }
        };
        Ok(Self {
            len,
            constant: false,
            storage,
        })
    }

    /// Constructs a zero-filled array of `len` elements using the global
    /// context to choose the storage.
    pub fn new(len: usize) -> Result<Self> {
        Self::new_in(Context::global(), len)
    }

    /// Constructs a zero-filled array of `len` elements.
    pub fn new_in(ctx: &Context, len: usize) -> Result<Self> {
        Self::allocate(ctx, len, true)
    }

    /// Constructs an array without clearing native memory.
    ///
    /// # Safety
    ///
    /// Every element must be written before it is read.
    pub unsafe fn new_uninit(len: usize) -> Result<Self> {
        Self::new_uninit_in(Context::global(), len)
    }

    /// Constructs an array without clearing native memory.
    ///
    /// # Safety
    ///
    /// Every element must be written before it is read.
    pub unsafe fn new_uninit_in(ctx: &Context, len: usize) -> Result<Self> {
        Self::allocate(ctx, len, false)
    }

    /// Constructs an array whose element `i` is `f(i)`, evaluating `f` in
    /// parallel for long arrays.
    pub fn from_fn_in<F>(ctx: &Context, len: usize, f: F) -> Result<Self>
    where
        F: Fn(usize) -> T + Sync,
    {
        // Safety: `fill_with` writes every element
        let mut res = unsafe { Self::new_uninit_in(ctx, len)? };
        res.fill_with(ctx, f);
        Ok(res)
    }

    /// Constructs a constant array reading `value` at every index.
    pub fn constant(len: usize, value: T) -> Result<Self> {
        check_len(len)?;
        Ok(Self {
            len,
            constant: true,
            storage: Storage::Managed(vec![value]),
        })
    }

    /// Takes ownership of `data` without copying. The array is managed
    /// regardless of its length.
    pub fn from_vec(data: Vec<T>) -> Result<Self> {
        check_len(data.len())?;
        Ok(Self {
            len: data.len(),
            constant: false,
            storage: Storage::Managed(data),
        })
    }

    /// Copies `data` into a new array.
    pub fn from_slice(data: &[T]) -> Result<Self> {
        Self::from_slice_in(Context::global(), data)
    }

    /// Copies `data` into a new array, choosing storage with `ctx`.
    pub fn from_slice_in(ctx: &Context, data: &[T]) -> Result<Self> {
        Self::from_fn_in(ctx, data.len(), |i| data[i])
    }

    /// Wraps native memory owned by someone else. The array never frees the
    /// memory; it keeps `owner` alive instead.
    ///
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` elements of `T`, hold
    /// valid values of `T`, and stay valid while `owner` is alive. No other
    /// code may access the memory while the array exists.
    pub unsafe fn from_raw_parts(
        owner: Arc<dyn Any + Send + Sync>,
        ptr: NonNull<T>,
        len: usize,
    ) -> Result<Self> {
        check_len(len)?;
        Ok(Self {
            len,
            constant: false,
            storage: Storage::Native(NativeBuffer::wrap(owner, ptr, len)),
        })
    }

    /// Kind of the elements
    pub fn kind(&self) -> ElementKind {
        T::KIND
    }

    /// Number of elements. Always positive.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Bytes per element
    pub fn element_width(&self) -> usize {
        T::KIND.width()
    }

    /// Returns `true` if the array stores a single replicated value.
    pub fn is_constant(&self) -> bool {
        self.constant
    }

    /// Returns `true` if the array is backed by native memory.
    pub fn is_large(&self) -> bool {
        matches!(self.storage, Storage::Native(_))
    }

    /// Where the elements live
    pub fn storage_mode(&self) -> StorageMode {
        match self.storage {
            Storage::Managed(_) => StorageMode::Managed,
            Storage::Native(_) => StorageMode::Native,
        }
    }

    /// Handle keeping the native memory of this array alive. Can be passed
    /// to [`TypedArray::from_raw_parts`] to build further views. `None` for
    /// managed arrays.
    pub fn native_owner(&self) -> Option<Arc<dyn Any + Send + Sync>> {
        match &self.storage {
            Storage::Managed(_) => None,
            Storage::Native(buffer) => Some(buffer.origin().owner()),
        }
    }

    /// Raw pointer to the first stored element.
    pub fn as_ptr(&self) -> *const T {
        match &self.storage {
            Storage::Managed(data) => data.as_ptr(),
            Storage::Native(buffer) => buffer.as_ptr(),
        }
    }

    /// The physically stored elements; a single element for constant arrays.
    pub(crate) fn stored(&self) -> &[T] {
        match &self.storage {
            Storage::Managed(data) => data,
            Storage::Native(buffer) => buffer.as_slice(),
        }
    }

    fn stored_mut(&mut self) -> &mut [T] {
        match &mut self.storage {
            Storage::Managed(data) => data,
            Storage::Native(buffer) => buffer.as_mut_slice(),
        }
    }

    /// Borrows the elements. `None` for constant arrays.
    pub fn as_slice(&self) -> Option<&[T]> {
        if self.constant {
            None
        } else {
            Some(self.stored())
        }
    }

    /// Mutably borrows the elements. `None` for constant arrays.
    pub fn as_mut_slice(&mut self) -> Option<&mut [T]> {
        if self.constant {
            None
        } else {
            Some(self.stored_mut())
        }
    }

    /// Element `i`, treating constant arrays. Panics if `i` is out of range.
    #[inline]
    pub(crate) fn value(&self, i: usize) -> T {
        if self.constant {
            assert!(i < self.len);
            self.stored()[0]
        } else {
            self.stored()[i]
        }
    }

    /// Returns element `i`.
    pub fn get(&self, i: usize) -> Result<T> {
        check_index(i, self.len)?;
        Ok(self.value(i))
    }

    /// Returns element `i` without bounds checking.
    ///
    /// # Safety
    ///
    /// `i` must be less than `self.len()`.
    #[inline]
    pub unsafe fn get_unchecked(&self, i: usize) -> T {
        if self.constant {
            *self.stored().get_unchecked(0)
        } else {
            *self.as_ptr().add(i)
        }
    }

    /// Reads element `i` straight from native memory.
    ///
    /// # Safety
    ///
    /// The array must be native (`is_large()`), not constant, and `i` must be
    /// less than `self.len()`.
    #[inline]
    pub unsafe fn get_from_native(&self, i: usize) -> T {
        match &self.storage {
            Storage::Native(buffer) => buffer.as_ptr().add(i).read(),
            Storage::Managed(_) => std::hint::unreachable_unchecked(),
        }
    }

    /// Overwrites element `i`.
    pub fn set(&mut self, i: usize, value: T) -> Result<()> {
        if self.constant {
            return Err(LargeArrayError::AccessDenied);
        }
        check_index(i, self.len)?;
        self.stored_mut()[i] = value;
        Ok(())
    }

    /// Overwrites element `i` without any checks.
    ///
    /// # Safety
    ///
    /// The array must not be constant and `i` must be less than `self.len()`.
    #[inline]
    pub unsafe fn set_unchecked(&mut self, i: usize, value: T) {
        *self.stored_mut().get_unchecked_mut(i) = value;
    }

    /// Writes element `i` straight to native memory.
    ///
    /// # Safety
    ///
    /// The array must be native (`is_large()`), not constant, and `i` must be
    /// less than `self.len()`.
    #[inline]
    pub unsafe fn set_to_native(&mut self, i: usize, value: T) {
        match &mut self.storage {
            Storage::Native(buffer) => buffer.as_ptr().add(i).write(value),
            Storage::Managed(_) => std::hint::unreachable_unchecked(),
        }
    }

    /// Iterates over every logical element.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = T> + '_ {
        (0..self.len).map(move |i| self.value(i))
    }

    /// Copies the elements `start, start + step, ...` below `end` into a
    /// `Vec`, reusing `buf` when its capacity suffices. Returns `None` when
    /// more than [`LARGEST_SUBARRAY`] elements would be produced.
    pub fn get_bulk(
        &self,
        start: usize,
        end: usize,
        step: usize,
        buf: Option<Vec<T>>,
    ) -> Result<Option<Vec<T>>> {
        if start >= self.len {
            return Err(LargeArrayError::OutOfRange {
                index: start,
                len: self.len,
            });
        }
        if end < start || end > self.len {
            return Err(LargeArrayError::OutOfRange {
                index: end,
                len: self.len,
            });
        }
        if step == 0 {
            return Err(LargeArrayError::invalid("step must be positive"));
        }
        let count = (end - start).div_ceil(step);
        if count > LARGEST_SUBARRAY {
            return Ok(None);
        }
        let mut out = match buf {
            Some(mut buf) if buf.capacity() >= count => {
                buf.clear();
                buf
            }
            _ => Vec::with_capacity(count),
        };
        if self.constant {
            out.resize(count, self.stored()[0]);
        } else {
            out.extend(self.stored()[start..end].iter().step_by(step).copied());
        }
        Ok(Some(out))
    }

    /// Copies every element into a `Vec`. Returns `None` for arrays longer
    /// than [`LARGEST_SUBARRAY`].
    pub fn to_vec(&self) -> Option<Vec<T>> {
        if self.len > LARGEST_SUBARRAY {
            None
        } else if self.constant {
            Some(vec![self.stored()[0]; self.len])
        } else {
            Some(self.stored().to_vec())
        }
    }

    /// Sets every element to `f(i)`.
    pub(crate) fn fill_with<F>(&mut self, ctx: &Context, f: F)
    where
        F: Fn(usize) -> T + Sync,
    {
        debug_assert!(!self.constant);
        ctx.fill_chunks(self.stored_mut(), |offset, chunk| {
            for (j, v) in chunk.iter_mut().enumerate() {
                *v = f(offset + j);
            }
        });
    }

    /// Clones the array, choosing storage for the copy with `ctx`.
    pub fn clone_in(&self, ctx: &Context) -> Result<Self> {
        if self.constant {
            return Self::constant(self.len, self.stored()[0]);
        }
        let src = self.stored();
        Self::from_fn_in(ctx, self.len, |i| src[i])
    }
}

impl<T: Element> Clone for TypedArray<T> {
    fn clone(&self) -> Self {
        match self.clone_in(Context::global()) {
            Ok(copy) => copy,
            Err(e) => panic!("cannot clone {} array: {}", T::KIND, e),
        }
    }
}

impl<T: Element> PartialEq for TypedArray<T> {
    fn eq(&self, other: &Self) -> bool {
        if self.len != other.len || self.constant != other.constant {
            return false;
        }
        match (&self.storage, &other.storage) {
            (Storage::Managed(a), Storage::Managed(b)) => a == b,
            (Storage::Native(a), Storage::Native(b)) => a.same_memory(b),
            _ => false,
        }
    }
}

impl<T: Element> Hash for TypedArray<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        T::KIND.hash(state);
        self.len.hash(state);
        T::KIND.width().hash(state);
        self.constant.hash(state);
        if let Storage::Native(buffer) = &self.storage {
            buffer.as_ptr().hash(state);
        }
    }
}

impl<T: Element> Debug for TypedArray<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 16;
        let head: Vec<T> = self.iter().take(SHOWN).collect();
        f.debug_struct("TypedArray")
            .field("kind", &T::KIND)
            .field("len", &self.len)
            .field("constant", &self.constant)
            .field("storage", &self.storage_mode())
            .field("head", &head)
            .finish()
    }
}

impl<T: Element + Serialize> Serialize for TypedArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len))?;
        for v in self.iter() {
            seq.serialize_element(&v)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native_ctx() -> Context {
        Context::new().with_max_managed_len(8)
    }

    #[mockalloc::test]
    fn zero_length_is_rejected() {
        assert!(matches!(TypedArray::<f64>::new(0), Err(LargeArrayError::InvalidArgument(_))));
        assert!(TypedArray::<i32>::constant(0, 1).is_err());
        assert!(TypedArray::<u8>::from_vec(Vec::new()).is_err());
    }

    #[mockalloc::test]
    fn storage_switches_past_threshold() {
        let ctx = native_ctx();
        let managed = TypedArray::<i16>::new_in(&ctx, 8).unwrap();
        let native = TypedArray::<i16>::new_in(&ctx, 9).unwrap();
        assert!(!managed.is_large());
        assert!(native.is_large());
        assert_eq!(native.storage_mode(), StorageMode::Native);
        assert!(native.native_owner().is_some());
        assert!(managed.native_owner().is_none());
    }

    #[mockalloc::test]
    fn checked_and_unchecked_agree() {
        let ctx = native_ctx();
        for len in [4, 40] {
            let mut arr = TypedArray::<f32>::new_in(&ctx, len).unwrap();
            for i in 0..len {
                arr.set(i, i as f32 * 0.5).unwrap();
            }
            for i in 0..len {
                assert_eq!(arr.get(i).unwrap(), unsafe { arr.get_unchecked(i) });
            }
            unsafe { arr.set_unchecked(1, 9.0) };
            assert_eq!(arr.get(1).unwrap(), 9.0);
            assert_eq!(
                arr.get(len),
                Err(LargeArrayError::OutOfRange { index: len, len })
            );
            assert!(arr.set(len, 0.0).is_err());
        }
    }

    #[mockalloc::test]
    fn native_accessors() {
        let mut arr = TypedArray::<i64>::new_in(&native_ctx(), 20).unwrap();
        unsafe {
            arr.set_to_native(19, -5);
            assert_eq!(arr.get_from_native(19), -5);
        }
        assert_eq!(arr.get(19).unwrap(), -5);
        assert_eq!(arr.get(0).unwrap(), 0);
    }

    #[mockalloc::test]
    fn constants_replicate_and_reject_writes() {
        let mut arr = TypedArray::constant(1_000_000, 4i32).unwrap();
        assert!(arr.is_constant());
        assert!(!arr.is_large());
        assert_eq!(arr.get(0).unwrap(), 4);
        assert_eq!(arr.get(999_999).unwrap(), 4);
        assert_eq!(unsafe { arr.get_unchecked(123_456) }, 4);
        assert_eq!(arr.set(3, 1), Err(LargeArrayError::AccessDenied));
        assert!(arr.as_slice().is_none());
        let copy = arr.clone();
        assert!(copy.is_constant());
        assert_eq!(copy, arr);
    }

    #[mockalloc::test]
    fn bulk_reads() {
        let arr = TypedArray::from_vec((0..10u8).collect()).unwrap();
        assert_eq!(arr.get_bulk(1, 8, 3, None).unwrap(), Some(vec![1, 4, 7]));
        assert_eq!(arr.get_bulk(2, 2, 1, None).unwrap(), Some(vec![]));
        let buf = Vec::with_capacity(16);
        let ptr = buf.as_ptr();
        let out = arr.get_bulk(0, 10, 1, Some(buf)).unwrap().unwrap();
        assert_eq!(out.as_ptr(), ptr);
        assert_eq!(out.len(), 10);
        assert!(arr.get_bulk(10, 10, 1, None).is_err());
        assert!(arr.get_bulk(5, 4, 1, None).is_err());
        assert!(arr.get_bulk(0, 11, 1, None).is_err());
        assert!(matches!(arr.get_bulk(0, 1, 0, None), Err(LargeArrayError::InvalidArgument(_))));

        let constant = TypedArray::constant(100, 2.5f64).unwrap();
        assert_eq!(constant.get_bulk(10, 20, 5, None).unwrap(), Some(vec![2.5, 2.5]));
    }

    #[mockalloc::test]
    fn clone_copies_native_memory() {
        let ctx = native_ctx();
        let mut arr = TypedArray::<u8>::new_in(&ctx, 32).unwrap();
        arr.set(31, 200).unwrap();
        let copy = arr.clone_in(&ctx).unwrap();
        assert!(copy.is_large());
        assert_eq!(copy.get(31).unwrap(), 200);
        // native equality is identity
        assert_ne!(copy, arr);
        assert_eq!(arr, arr);
    }

    #[mockalloc::test]
    fn managed_equality_compares_contents() {
        let a = TypedArray::from_slice_in(&Context::new(), &[1i32, 2, 3]).unwrap();
        let b = TypedArray::from_vec(vec![1i32, 2, 3]).unwrap();
        let c = TypedArray::from_vec(vec![1i32, 2, 4]).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, TypedArray::constant(3, 1i32).unwrap());
    }

    #[mockalloc::test]
    fn wrapped_memory_is_not_freed_by_the_view() {
        let ctx = native_ctx();
        let mut base = TypedArray::<i32>::new_in(&ctx, 16).unwrap();
        base.set(3, 42).unwrap();
        let owner = base.native_owner().unwrap();
        let ptr = NonNull::new(base.as_ptr() as *mut i32).unwrap();
        let view = unsafe { TypedArray::from_raw_parts(owner, ptr, 16).unwrap() };
        drop(base);
        // the view keeps the allocation alive
        assert_eq!(view.get(3).unwrap(), 42);
        assert!(view.is_large());
    }

    #[mockalloc::test]
    fn to_vec_and_iter() {
        let arr = TypedArray::from_vec(vec![true, false, true]).unwrap();
        assert_eq!(arr.to_vec(), Some(vec![true, false, true]));
        assert_eq!(arr.iter().filter(|&b| b).count(), 2);
        assert_eq!(arr.kind(), ElementKind::Logic);
        assert_eq!(arr.element_width(), 1);
    }

    #[test]
    fn parallel_fill_matches_sequential() {
        let parallel = Context::new().with_threads(4).with_concurrency_threshold(1).with_max_managed_len(100);
        let sequential = Context::new().with_threads(1).with_max_managed_len(100);
        let a = TypedArray::from_fn_in(&parallel, 10_007, |i| (i * 7) as i64).unwrap();
        let b = TypedArray::from_fn_in(&sequential, 10_007, |i| (i * 7) as i64).unwrap();
        assert!(a.is_large() && b.is_large());
        assert!(a.iter().eq(b.iter()));
    }

    #[mockalloc::test]
    fn serializes_as_sequence() {
        let arr = TypedArray::from_vec(vec![1i16, -2, 3]).unwrap();
        assert_eq!(serde_json::to_string(&arr).unwrap(), "[1,-2,3]");
        let constant = TypedArray::constant(2, 0.5f32).unwrap();
        assert_eq!(serde_json::to_string(&constant).unwrap(), "[0.5,0.5]");
    }
}
