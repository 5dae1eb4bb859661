//! Conversion between kinds, random generation, masked selection and bulk
//! copies

use std::borrow::Cow;

use rand::distributions::{Alphanumeric, Distribution, Standard};
use rand::Rng;

use crate::arith::{build, f64_reader, i64_reader};
use crate::array::{ArrayElement, ComplexElement};
use crate::complex::{Complex, ComplexMath};
use crate::element::Element;
use crate::error::{check_len, LargeArrayError, Result};
use crate::varlen::{VarArray, VarElement, DEFAULT_MAX_BYTES};
use crate::{ComplexArray, Context, ElementKind, LargeArray, TypedArray};

/// `a` as a complex array with `F` components. Arrays that already have that
/// kind are borrowed; others are converted into a fresh array.
fn complex_operand<'a, F: ComplexElement>(
    ctx: &Context,
    a: &'a LargeArray,
) -> Result<Cow<'a, ComplexArray<F>>> {
    if let Some(c) = F::complex(a) {
        return Ok(Cow::Borrowed(c));
    }
    let len = a.len();
    let converted = match a {
        LargeArray::ComplexFloat(c) => complex_from_fn(ctx, len, c.is_constant(), |i| c.value(i).cast::<F>())?,
        LargeArray::ComplexDouble(c) => complex_from_fn(ctx, len, c.is_constant(), |i| c.value(i).cast::<F>())?,
        _ => {
            let r = f64_reader(a)?;
            complex_from_fn(ctx, len, a.is_constant(), |i| Complex::from_real(F::from_f64(r(i))))?
        }
    };
    Ok(Cow::Owned(converted))
}

fn complex_from_fn<F, G>(ctx: &Context, len: usize, constant: bool, f: G) -> Result<ComplexArray<F>>
where
    F: ComplexElement,
    G: Fn(usize) -> Complex<F> + Sync,
{
    if constant {
        ComplexArray::constant(len, f(0))
    } else {
        ComplexArray::from_fn_in(ctx, len, f)
    }
}

fn var_from_fn<V, F>(ctx: &Context, len: usize, constant: bool, mut f: F) -> Result<VarArray<V>>
where
    V: VarElement,
    F: FnMut(usize) -> Result<V>,
{
    if constant {
        VarArray::constant(len, f(0)?)
    } else {
        VarArray::try_from_fn_in(ctx, len, DEFAULT_MAX_BYTES, f)
    }
}

fn check_span(pos: usize, count: usize, len: usize) -> Result<()> {
    match pos.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(LargeArrayError::OutOfRange {
            index: pos.saturating_add(count),
            len,
        }),
    }
}

fn random_typed<T>(ctx: &Context, len: usize) -> Result<LargeArray>
where
    T: ArrayElement,
    Standard: Distribution<T>,
{
    // Safety: every element is written below
    let mut array = unsafe { TypedArray::<T>::new_uninit_in(ctx, len)? };
    if let Some(data) = array.as_mut_slice() {
        ctx.fill_chunks(data, |_, chunk| {
            let mut rng = rand::thread_rng();
            for v in chunk {
                *v = rng.gen();
            }
        });
    }
    Ok(T::into_array(array))
}

fn random_complex<F>(ctx: &Context, len: usize) -> Result<LargeArray>
where
    F: ComplexElement,
    Standard: Distribution<F>,
{
    // Safety: both parts are written below
    let mut array = unsafe { ComplexArray::<F>::new_uninit_in(ctx, len)? };
    if let Some((re, im)) = array.parts_mut() {
        ctx.fill_chunks2(re, im, |_, re, im| {
            let mut rng = rand::thread_rng();
            for (r, m) in re.iter_mut().zip(im.iter_mut()) {
                *r = rng.gen();
                *m = rng.gen();
            }
        });
    }
    Ok(F::into_complex_array(array))
}

/// Longest string produced by [`Context::random`].
const RANDOM_STRING_LEN: usize = 10;

fn random_string<R: Rng>(rng: &mut R) -> String {
    let n = rng.gen_range(1..=RANDOM_STRING_LEN);
    rng.sample_iter(&Alphanumeric).take(n).map(char::from).collect()
}

fn copy_typed<T: Element>(
    ctx: &Context,
    src: &TypedArray<T>,
    src_pos: usize,
    dst: &mut TypedArray<T>,
    dst_pos: usize,
    len: usize,
) -> Result<()> {
    let out = dst.as_mut_slice().ok_or(LargeArrayError::AccessDenied)?;
    ctx.fill_chunks(&mut out[dst_pos..dst_pos + len], |offset, chunk| {
        for (j, v) in chunk.iter_mut().enumerate() {
            *v = src.value(src_pos + offset + j);
        }
    });
    Ok(())
}

fn copy_complex<F: ComplexElement>(
    ctx: &Context,
    src: &ComplexArray<F>,
    src_pos: usize,
    dst: &mut ComplexArray<F>,
    dst_pos: usize,
    len: usize,
) -> Result<()> {
    let (re, im) = dst.parts_mut().ok_or(LargeArrayError::AccessDenied)?;
    let span = dst_pos..dst_pos + len;
    ctx.fill_chunks2(&mut re[span.clone()], &mut im[span], |offset, re, im| {
        for (j, (r, m)) in re.iter_mut().zip(im.iter_mut()).enumerate() {
            let z = src.value(src_pos + offset + j);
            *r = z.re;
            *m = z.im;
        }
    });
    Ok(())
}

fn copy_var<V: VarElement>(
    src: &VarArray<V>,
    src_pos: usize,
    dst: &mut VarArray<V>,
    dst_pos: usize,
    len: usize,
) -> Result<()> {
    dst.set_range(dst_pos, (src_pos..src_pos + len).map(|i| src.value(i)).collect())
}

impl Context {
    /// `a` converted to `kind`. An array that already has that kind is
    /// returned as is, without copying.
    ///
    /// Numeric kinds convert among themselves with the usual narrowing rules;
    /// complex arrays contribute their real part to real targets. Every kind
    /// converts to strings (display form) and objects (JSON form). Strings
    /// and objects do not convert to numeric kinds.
    pub fn convert<'a>(&self, a: &'a LargeArray, kind: ElementKind) -> Result<Cow<'a, LargeArray>> {
        if a.kind() == kind {
            return Ok(Cow::Borrowed(a));
        }
        let len = a.len();
        let constant = a.is_constant();
        let converted = match kind {
            ElementKind::String => LargeArray::String(var_from_fn(self, len, constant, |i| Ok(a.scalar(i).to_string()))?),
            ElementKind::Object => LargeArray::Object(var_from_fn(self, len, constant, |i| a.scalar(i).to_json())?),
            _ if !a.kind().is_numeric() => {
                return Err(LargeArrayError::Unsupported {
                    kind: a.kind(),
                    what: "conversion to a numeric kind",
                })
            }
            _ if kind.is_complex_numeric() => with_complex!(kind, F => {
                F::into_complex_array(complex_operand::<F>(self, a)?.into_owned())
            }, _ => unreachable!("kind is complex")),
            _ if a.kind().is_integer_numeric() => {
                let r = i64_reader(a)?;
                with_primitive!(kind, T => build::<T, _>(self, len, constant, |i| T::from_i64(r(i)))?,
                    _ => unreachable!("kind is primitive"))
            }
            _ => {
                let r = f64_reader(a)?;
                with_primitive!(kind, T => build::<T, _>(self, len, constant, |i| T::from_f64(r(i)))?,
                    _ => unreachable!("kind is primitive"))
            }
        };
        Ok(Cow::Owned(converted))
    }

    /// Like [`Context::convert`], consuming `a`.
    pub fn into_kind(&self, a: LargeArray, kind: ElementKind) -> Result<LargeArray> {
        if a.kind() == kind {
            return Ok(a);
        }
        self.convert(&a, kind).map(Cow::into_owned)
    }

    /// An array of random values.
    ///
    /// Floating point elements and complex components are uniform in
    /// `[0, 1)`, integers cover their whole range and strings are
    /// alphanumeric, one to ten characters long. Object arrays cannot be
    /// generated.
    pub fn random(&self, kind: ElementKind, len: usize) -> Result<LargeArray> {
        check_len(len)?;
        with_primitive!(kind, T => return random_typed::<T>(self, len), _ => ());
        with_complex!(kind, F => return random_complex::<F>(self, len), _ => ());
        match kind {
            ElementKind::String => {
                let mut rng = rand::thread_rng();
                VarArray::try_from_fn_in(self, len, DEFAULT_MAX_BYTES, |_| Ok(random_string(&mut rng)))
                    .map(LargeArray::String)
            }
            _ => Err(LargeArrayError::invalid(format!("cannot generate random {} arrays", kind))),
        }
    }

    /// The elements of `a` at the positions where the logic array `mask` is
    /// `true`, in order.
    pub fn select(&self, a: &LargeArray, mask: &LargeArray) -> Result<LargeArray> {
        let mask = mask.as_typed::<bool>().ok_or_else(|| {
            LargeArrayError::invalid(format!("mask must be a logic array, got {}", mask.kind()))
        })?;
        if mask.len() != a.len() {
            return Err(LargeArrayError::invalid(format!(
                "mask length {} does not match array length {}",
                mask.len(),
                a.len()
            )));
        }
        let picked: Vec<usize> = mask.iter().enumerate().filter(|&(_, m)| m).map(|(i, _)| i).collect();
        if picked.is_empty() {
            return Err(LargeArrayError::invalid("mask selects no elements"));
        }
        let len = picked.len();
        Ok(match a {
            LargeArray::Logic(t) => build::<bool, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::Byte(t) => build::<i8, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::UnsignedByte(t) => build::<u8, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::Short(t) => build::<i16, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::Int(t) => build::<i32, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::Long(t) => build::<i64, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::Float(t) => build::<f32, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::Double(t) => build::<f64, _>(self, len, false, |k| t.value(picked[k]))?,
            LargeArray::ComplexFloat(c) => {
                LargeArray::ComplexFloat(complex_from_fn(self, len, false, |k| c.value(picked[k]))?)
            }
            LargeArray::ComplexDouble(c) => {
                LargeArray::ComplexDouble(complex_from_fn(self, len, false, |k| c.value(picked[k]))?)
            }
            LargeArray::String(s) => LargeArray::String(var_from_fn(self, len, false, |k| Ok(s.value(picked[k])))?),
            LargeArray::Object(o) => LargeArray::Object(var_from_fn(self, len, false, |k| Ok(o.value(picked[k])))?),
        })
    }

    /// Copies `len` elements of `src` starting at `src_pos` into `dst`
    /// starting at `dst_pos`. Both arrays must have the same kind.
    pub fn copy(
        &self,
        src: &LargeArray,
        src_pos: usize,
        dst: &mut LargeArray,
        dst_pos: usize,
        len: usize,
    ) -> Result<()> {
        if src.kind() != dst.kind() {
            return Err(LargeArrayError::invalid(format!(
                "cannot copy {} elements into a {} array",
                src.kind(),
                dst.kind()
            )));
        }
        if dst.is_constant() {
            return Err(LargeArrayError::AccessDenied);
        }
        check_span(src_pos, len, src.len())?;
        check_span(dst_pos, len, dst.len())?;
        if len == 0 {
            return Ok(());
        }
        match (src, dst) {
            (LargeArray::Logic(s), LargeArray::Logic(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::Byte(s), LargeArray::Byte(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::UnsignedByte(s), LargeArray::UnsignedByte(d)) => {
                copy_typed(self, s, src_pos, d, dst_pos, len)
            }
            (LargeArray::Short(s), LargeArray::Short(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::Int(s), LargeArray::Int(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::Long(s), LargeArray::Long(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::Float(s), LargeArray::Float(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::Double(s), LargeArray::Double(d)) => copy_typed(self, s, src_pos, d, dst_pos, len),
            (LargeArray::ComplexFloat(s), LargeArray::ComplexFloat(d)) => {
                copy_complex(self, s, src_pos, d, dst_pos, len)
            }
            (LargeArray::ComplexDouble(s), LargeArray::ComplexDouble(d)) => {
                copy_complex(self, s, src_pos, d, dst_pos, len)
            }
            (LargeArray::String(s), LargeArray::String(d)) => copy_var(s, src_pos, d, dst_pos, len),
            (LargeArray::Object(s), LargeArray::Object(d)) => copy_var(s, src_pos, d, dst_pos, len),
            _ => unreachable!("kinds were compared above"),
        }
    }

    /// Copies `len` elements of `src` starting at `src_pos` into `dst`
    /// starting at `dst_pos`.
    pub fn copy_from_slice<T: Element>(
        &self,
        src: &[T],
        src_pos: usize,
        dst: &mut TypedArray<T>,
        dst_pos: usize,
        len: usize,
    ) -> Result<()> {
        if dst.is_constant() {
            return Err(LargeArrayError::AccessDenied);
        }
        check_span(src_pos, len, src.len())?;
        check_span(dst_pos, len, dst.len())?;
        let out = dst.as_mut_slice().ok_or(LargeArrayError::AccessDenied)?;
        let src = &src[src_pos..src_pos + len];
        self.fill_chunks(&mut out[dst_pos..dst_pos + len], |offset, chunk| {
            chunk.copy_from_slice(&src[offset..offset + chunk.len()]);
        });
        Ok(())
    }
}

/// [`Context::convert`] on the global context.
pub fn convert(a: &LargeArray, kind: ElementKind) -> Result<Cow<'_, LargeArray>> {
    Context::global().convert(a, kind)
}

/// [`Context::into_kind`] on the global context.
pub fn into_kind(a: LargeArray, kind: ElementKind) -> Result<LargeArray> {
    Context::global().into_kind(a, kind)
}

/// [`Context::random`] on the global context.
pub fn random(kind: ElementKind, len: usize) -> Result<LargeArray> {
    Context::global().random(kind, len)
}

/// [`Context::select`] on the global context.
pub fn select(a: &LargeArray, mask: &LargeArray) -> Result<LargeArray> {
    Context::global().select(a, mask)
}

/// [`Context::copy`] on the global context.
pub fn copy(src: &LargeArray, src_pos: usize, dst: &mut LargeArray, dst_pos: usize, len: usize) -> Result<()> {
    Context::global().copy(src, src_pos, dst, dst_pos, len)
}

/// [`Context::copy_from_slice`] on the global context.
pub fn copy_from_slice<T: Element>(
    src: &[T],
    src_pos: usize,
    dst: &mut TypedArray<T>,
    dst_pos: usize,
    len: usize,
) -> Result<()> {
    Context::global().copy_from_slice(src, src_pos, dst, dst_pos, len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complex::Complex64;
    use crate::Scalar;
    use serde_json::json;

    fn native_ctx() -> Context {
        Context::new().with_threads(1).with_max_managed_len(4)
    }

    #[mockalloc::test]
    fn same_kind_is_borrowed() {
        let ctx = Context::new().with_threads(1);
        let a = LargeArray::new_in(&ctx, ElementKind::Int, 3).unwrap();
        assert!(matches!(ctx.convert(&a, ElementKind::Int).unwrap(), Cow::Borrowed(_)));
    }

    #[mockalloc::test]
    fn lossless_round_trip() {
        let ctx = Context::new().with_threads(1);
        let a: LargeArray = TypedArray::from_slice(&[i32::MIN, -1, 0, 7, i32::MAX]).unwrap().into();
        let wide = ctx.convert(&a, ElementKind::Long).unwrap().into_owned();
        assert_eq!(wide.kind(), ElementKind::Long);
        let back = ctx.into_kind(wide, ElementKind::Int).unwrap();
        assert_eq!(back, a);
    }

    #[mockalloc::test]
    fn narrowing_and_complex_targets() {
        let ctx = native_ctx();
        let a: LargeArray = TypedArray::from_slice(&[1.9f64, -1.9, 300.0]).unwrap().into();
        let bytes = ctx.convert(&a, ElementKind::Byte).unwrap();
        assert_eq!(bytes.get_i8(0).unwrap(), 1);
        assert_eq!(bytes.get_i8(1).unwrap(), -1);
        assert_eq!(bytes.get_i8(2).unwrap(), 44);

        let z = ctx.convert(&a, ElementKind::ComplexFloat).unwrap();
        assert_eq!(z.kind(), ElementKind::ComplexFloat);
        assert_eq!(z.get_complex64(2).unwrap(), Complex64::new(300.0, 0.0));
        let real = ctx.convert(&z, ElementKind::Double).unwrap();
        assert_eq!(real.get_f64(2).unwrap(), 300.0);
    }

    #[mockalloc::test]
    fn constants_stay_constant() {
        let ctx = Context::new().with_threads(1);
        let a = LargeArray::constant(ElementKind::Short, 50, &Scalar::Short(-3)).unwrap();
        let d = ctx.convert(&a, ElementKind::Double).unwrap();
        assert!(d.is_constant());
        assert_eq!(d.get_f64(49).unwrap(), -3.0);
        let s = ctx.convert(&a, ElementKind::String).unwrap();
        assert!(s.is_constant());
        assert_eq!(s.get(0).unwrap(), Scalar::String("-3".into()));
    }

    #[mockalloc::test]
    fn strings_and_objects() {
        let ctx = native_ctx();
        let a: LargeArray = TypedArray::from_slice(&[true, false, true, true, false]).unwrap().into();
        let s = ctx.convert(&a, ElementKind::String).unwrap();
        assert!(s.is_large());
        assert_eq!(s.get(1).unwrap(), Scalar::String("false".into()));
        let o = ctx.convert(&a, ElementKind::Object).unwrap();
        assert_eq!(o.get(0).unwrap(), Scalar::Object(json!(true)));
        assert!(matches!(
            ctx.convert(&s, ElementKind::Int),
            Err(LargeArrayError::Unsupported { kind: ElementKind::String, .. })
        ));
    }

    // thread_rng keeps its state in a thread local, which the allocation
    // checker would report as leaked
    #[test]
    fn random_values_are_in_range() {
        let ctx = Context::new().with_threads(1);
        let d = ctx.random(ElementKind::Double, 1000).unwrap();
        assert!((0..1000).all(|i| (0.0..1.0).contains(&d.get_f64(i).unwrap())));
        let z = ctx.random(ElementKind::ComplexFloat, 100).unwrap();
        let first = z.get_complex64(0).unwrap();
        assert!((0.0..1.0).contains(&first.re) && (0.0..1.0).contains(&first.im));
        let s = ctx.random(ElementKind::String, 10).unwrap();
        match s.get(3).unwrap() {
            Scalar::String(v) => assert!(!v.is_empty() && v.len() <= RANDOM_STRING_LEN),
            other => panic!("unexpected {:?}", other),
        }
        assert!(ctx.random(ElementKind::Object, 10).is_err());
        assert!(ctx.random(ElementKind::Int, 0).is_err());
    }

    #[mockalloc::test]
    fn select_by_mask() {
        let ctx = Context::new().with_threads(1);
        let a: LargeArray = TypedArray::from_slice(&[10i64, 20, 30, 40]).unwrap().into();
        let mask: LargeArray = TypedArray::from_slice(&[false, true, false, true]).unwrap().into();
        let picked = ctx.select(&a, &mask).unwrap();
        assert_eq!(picked.len(), 2);
        assert_eq!(picked.get_i64(0).unwrap(), 20);
        assert_eq!(picked.get_i64(1).unwrap(), 40);

        let none: LargeArray = TypedArray::from_slice(&[false; 4]).unwrap().into();
        assert!(ctx.select(&a, &none).is_err());
        assert!(ctx.select(&a, &a).is_err());
    }

    #[mockalloc::test]
    fn copies_between_arrays() {
        let ctx = native_ctx();
        let src: LargeArray = TypedArray::from_slice(&[1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap().into();
        let mut dst = LargeArray::new_in(&ctx, ElementKind::Float, 6).unwrap();
        assert!(dst.is_large());
        ctx.copy(&src, 1, &mut dst, 3, 3).unwrap();
        let got: Vec<f32> = (0..6).map(|i| dst.get_f32(i).unwrap()).collect();
        assert_eq!(got, vec![0.0, 0.0, 0.0, 2.0, 3.0, 4.0]);

        assert!(matches!(ctx.copy(&src, 4, &mut dst, 0, 3), Err(LargeArrayError::OutOfRange { .. })));
        let mut ints = LargeArray::new_in(&ctx, ElementKind::Int, 6).unwrap();
        assert!(ctx.copy(&src, 0, &mut ints, 0, 1).is_err());
        let mut constant = LargeArray::constant(ElementKind::Float, 6, &Scalar::Float(0.0)).unwrap();
        assert_eq!(ctx.copy(&src, 0, &mut constant, 0, 1), Err(LargeArrayError::AccessDenied));
    }

    #[mockalloc::test]
    fn copies_complex_and_strings() {
        let ctx = native_ctx();
        let src: LargeArray = ComplexArray::<f64>::from_interleaved(&[1.0, 2.0, 3.0, 4.0]).unwrap().into();
        let mut dst = LargeArray::new_in(&ctx, ElementKind::ComplexDouble, 5).unwrap();
        ctx.copy(&src, 0, &mut dst, 3, 2).unwrap();
        assert_eq!(dst.get_complex64(4).unwrap(), Complex64::new(3.0, 4.0));

        let words: LargeArray = VarArray::from_vec(vec!["a".to_string(), "b".to_string()]).unwrap().into();
        let mut out = LargeArray::new_in(&ctx, ElementKind::String, 5).unwrap();
        ctx.copy(&words, 0, &mut out, 1, 2).unwrap();
        assert_eq!(out.get(2).unwrap(), Scalar::String("b".into()));
    }

    #[mockalloc::test]
    fn oversized_string_copy_leaves_destination_untouched() {
        let ctx = native_ctx();
        let src: LargeArray = VarArray::from_vec(vec!["ab".to_string(), "y".repeat(150)]).unwrap().into();
        let mut dst = LargeArray::new_in(&ctx, ElementKind::String, 5).unwrap();
        assert!(dst.is_large());
        assert!(matches!(ctx.copy(&src, 0, &mut dst, 0, 2), Err(LargeArrayError::InvalidArgument(_))));
        assert_eq!(dst.get(0).unwrap(), Scalar::String(String::new()));
        ctx.copy(&src, 0, &mut dst, 4, 1).unwrap();
        assert_eq!(dst.get(4).unwrap(), Scalar::String("ab".into()));
    }

    #[mockalloc::test]
    fn complex_to_string_shows_the_sign() {
        let ctx = Context::new().with_threads(1);
        let z: LargeArray = ComplexArray::<f64>::from_interleaved(&[1.0, -2.0, 0.5, 3.0, -4.0, 0.0]).unwrap().into();
        let s = ctx.convert(&z, ElementKind::String).unwrap();
        assert_eq!(s.get(0).unwrap(), Scalar::String("1-2i".into()));
        assert_eq!(s.get(1).unwrap(), Scalar::String("0.5+3i".into()));
        assert_eq!(s.get(2).unwrap(), Scalar::String("-4".into()));
        let o = ctx.convert(&z, ElementKind::Object).unwrap();
        assert_eq!(o.get(0).unwrap(), Scalar::Object(json!({"re": 1.0, "im": -2.0})));
    }

    #[mockalloc::test]
    fn copy_from_slice_into_native() {
        let ctx = native_ctx();
        let mut dst = TypedArray::<u8>::new_in(&ctx, 8).unwrap();
        ctx.copy_from_slice(&[9, 8, 7, 6], 1, &mut dst, 5, 3).unwrap();
        assert_eq!(dst.to_vec().unwrap(), vec![0, 0, 0, 0, 0, 8, 7, 6]);
        assert!(ctx.copy_from_slice(&[1, 2], 0, &mut dst, 7, 2).is_err());
    }
}
