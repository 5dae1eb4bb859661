//! Arrays of complex numbers stored as two real arrays

use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};

use serde::ser::{Serialize, SerializeSeq, Serializer};

use crate::complex::{Complex, ComplexMath, ReIm};
use crate::element::Real;
use crate::error::{check_index, check_len, LargeArrayError, Result};
use crate::{Context, ElementKind, StorageMode, TypedArray};

/// An array of complex numbers, kept as a real part array and an imaginary
/// part array of the same length and storage mode.
///
/// The array is constant only when both parts are constant. Writing to an
/// array with a constant part fails.
#[derive(Clone, PartialEq)]
pub struct ComplexArray<F: Real> {
    re: TypedArray<F>,
    im: TypedArray<F>,
}

impl<F: Real> ComplexArray<F> {
    /// Constructs a zero-filled array using the global context.
    pub fn new(len: usize) -> Result<Self> {
        Self::new_in(Context::global(), len)
    }

    /// Constructs a zero-filled array.
    pub fn new_in(ctx: &Context, len: usize) -> Result<Self> {
        Ok(Self {
            re: TypedArray::new_in(ctx, len)?,
            im: TypedArray::new_in(ctx, len)?,
        })
    }

    /// Constructs an array whose contents are unspecified.
    ///
    /// # Safety
    ///
    /// Both parts of every element must be written before they are read.
    pub unsafe fn new_uninit_in(ctx: &Context, len: usize) -> Result<Self> {
        Ok(Self {
            re: TypedArray::new_uninit_in(ctx, len)?,
            im: TypedArray::new_uninit_in(ctx, len)?,
        })
    }

    /// Constructs an array whose element `i` is `f(i)`.
    pub fn from_fn_in<G>(ctx: &Context, len: usize, f: G) -> Result<Self>
    where
        G: Fn(usize) -> Complex<F> + Sync,
    {
        // Safety: both parts are fully written below
        let mut res = unsafe { Self::new_uninit_in(ctx, len)? };
        res.fill_with(ctx, f);
        Ok(res)
    }

    /// Constructs a constant array.
    pub fn constant(len: usize, value: Complex<F>) -> Result<Self> {
        Ok(Self {
            re: TypedArray::constant(len, value.re)?,
            im: TypedArray::constant(len, value.im)?,
        })
    }

    /// Splits interleaved `re, im` pairs into a new array.
    pub fn from_interleaved(data: &[F]) -> Result<Self> {
        Self::from_interleaved_in(Context::global(), data)
    }

    /// Splits interleaved `re, im` pairs into a new array.
    pub fn from_interleaved_in(ctx: &Context, data: &[F]) -> Result<Self> {
        if data.len() % 2 != 0 {
            return Err(LargeArrayError::invalid(format!(
                "interleaved data must have even length, got {}",
                data.len()
            )));
        }
        check_len(data.len() / 2)?;
        Self::from_fn_in(ctx, data.len() / 2, |i| Complex::new(data[2 * i], data[2 * i + 1]))
    }

    /// Uses `re` and `im` as the two parts, without copying.
    pub fn from_parts(re: TypedArray<F>, im: TypedArray<F>) -> Result<Self> {
        if re.len() != im.len() {
            return Err(LargeArrayError::invalid(format!(
                "parts have different lengths: {} and {}",
                re.len(),
                im.len()
            )));
        }
        if re.is_large() != im.is_large() {
            return Err(LargeArrayError::invalid("parts must use the same storage mode"));
        }
        Ok(Self { re, im })
    }

    /// Splits the array into its real and imaginary parts.
    pub fn into_parts(self) -> (TypedArray<F>, TypedArray<F>) {
        (self.re, self.im)
    }

    /// The real parts
    pub fn real_part(&self) -> &TypedArray<F> {
        &self.re
    }

    /// The imaginary parts
    pub fn imag_part(&self) -> &TypedArray<F> {
        &self.im
    }

    /// Kind tag of the array
    pub fn kind(&self) -> ElementKind {
        F::COMPLEX_KIND
    }

    /// Number of elements
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.re.len()
    }

    /// Bytes per component
    pub fn element_width(&self) -> usize {
        self.re.element_width()
    }

    /// Returns `true` if both parts are constant.
    pub fn is_constant(&self) -> bool {
        self.re.is_constant() && self.im.is_constant()
    }

    /// Returns `true` if the parts are backed by native memory.
    pub fn is_large(&self) -> bool {
        self.re.is_large()
    }

    /// Where the parts live
    pub fn storage_mode(&self) -> StorageMode {
        self.re.storage_mode()
    }

    #[inline]
    pub(crate) fn value(&self, i: usize) -> Complex<F> {
        Complex::new(self.re.value(i), self.im.value(i))
    }

    /// Returns element `i`.
    pub fn get_complex(&self, i: usize) -> Result<Complex<F>> {
        check_index(i, self.len())?;
        Ok(self.value(i))
    }

    /// Returns element `i` without bounds checking.
    ///
    /// # Safety
    ///
    /// `i` must be less than `self.len()`.
    pub unsafe fn get_complex_unchecked(&self, i: usize) -> Complex<F> {
        Complex::new(self.re.get_unchecked(i), self.im.get_unchecked(i))
    }

    /// Overwrites element `i`.
    pub fn set_complex(&mut self, i: usize, value: Complex<F>) -> Result<()> {
        if self.re.is_constant() || self.im.is_constant() {
            return Err(LargeArrayError::AccessDenied);
        }
        self.re.set(i, value.re)?;
        self.im.set(i, value.im)
    }

    /// Overwrites element `i` without any checks.
    ///
    /// # Safety
    ///
    /// Neither part may be constant and `i` must be less than `self.len()`.
    pub unsafe fn set_complex_unchecked(&mut self, i: usize, value: Complex<F>) {
        self.re.set_unchecked(i, value.re);
        self.im.set_unchecked(i, value.im);
    }

    /// Iterates over every element.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = Complex<F>> + '_ {
        (0..self.len()).map(move |i| self.value(i))
    }

    /// Mutable access to both parts at once. `None` if either is constant.
    pub(crate) fn parts_mut(&mut self) -> Option<(&mut [F], &mut [F])> {
        let re = self.re.as_mut_slice()?;
        let im = self.im.as_mut_slice()?;
        Some((re, im))
    }

    /// Sets every element to `f(i)`.
    pub(crate) fn fill_with<G>(&mut self, ctx: &Context, f: G)
    where
        G: Fn(usize) -> Complex<F> + Sync,
    {
        if let Some((re, im)) = self.parts_mut() {
            ctx.fill_chunks2(re, im, |offset, re, im| {
                for (j, (r, m)) in re.iter_mut().zip(im.iter_mut()).enumerate() {
                    let z = f(offset + j);
                    *r = z.re;
                    *m = z.im;
                }
            });
        }
    }

    /// Modulus of every element, computed on the calling thread.
    pub fn abs_array(&self) -> Result<TypedArray<F>> {
        self.abs_array_in(Context::global())
    }

    /// Like [`ComplexArray::abs_array`], choosing storage with `ctx`.
    pub fn abs_array_in(&self, ctx: &Context) -> Result<TypedArray<F>> {
        self.derived(ctx, |z| z.modulus())
    }

    /// Argument of every element, computed on the calling thread.
    pub fn arg_array(&self) -> Result<TypedArray<F>> {
        self.arg_array_in(Context::global())
    }

    /// Like [`ComplexArray::arg_array`], choosing storage with `ctx`.
    pub fn arg_array_in(&self, ctx: &Context) -> Result<TypedArray<F>> {
        self.derived(ctx, |z| z.arg())
    }

    fn derived(&self, ctx: &Context, f: fn(Complex<F>) -> F) -> Result<TypedArray<F>> {
        if self.is_constant() {
            return TypedArray::constant(self.len(), f(self.value(0)));
        }
        // Safety: every element is written below
        let mut out = unsafe { TypedArray::new_uninit_in(ctx, self.len())? };
        if let Some(slots) = out.as_mut_slice() {
            for (i, v) in slots.iter_mut().enumerate() {
                *v = f(self.value(i));
            }
        }
        Ok(out)
    }

    /// Clones the array, choosing storage for the copy with `ctx`.
    pub fn clone_in(&self, ctx: &Context) -> Result<Self> {
        Ok(Self {
            re: self.re.clone_in(ctx)?,
            im: self.im.clone_in(ctx)?,
        })
    }
}

impl<F: Real> Hash for ComplexArray<F> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.re.hash(state);
        self.im.hash(state);
    }
}

impl<F: Real> Debug for ComplexArray<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComplexArray")
            .field("kind", &F::COMPLEX_KIND)
            .field("re", &self.re)
            .field("im", &self.im)
            .finish()
    }
}

impl<F: Real + Serialize> Serialize for ComplexArray<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for z in self.iter() {
            seq.serialize_element(&ReIm::from(z))?;
        }
        seq.end()
    }
}
