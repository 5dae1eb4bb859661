use std::borrow::Cow;
use std::fmt::Debug;

use larray::{
    arith, convert, ArrayElement, Complex64, ComplexArray, Context, ElementKind, LargeArray,
    LargeArrayError, Scalar, StringArray, TypedArray,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[ctor::ctor]
fn pin_global_context() {
    larray::set_thread_count(4);
    larray::set_concurrency_threshold(larray::DEFAULT_CONCURRENCY_THRESHOLD);
    larray::set_max_managed_len(larray::DEFAULT_MAX_MANAGED_LEN);
}

fn native_after(max_managed_len: usize) -> Context {
    Context::new().with_max_managed_len(max_managed_len)
}

#[test]
fn zeroed_double_array_accepts_writes() {
    let mut a = LargeArray::new(ElementKind::Double, 10).unwrap();
    assert!((0..10).all(|i| a.get_f64(i).unwrap() == 0.0));
    a.set_f64(5, 3.14).unwrap();
    assert_eq!(a.get_f64(5).unwrap(), 3.14);
    for i in (0..10).filter(|&i| i != 5) {
        assert_eq!(a.get_f64(i).unwrap(), 0.0);
    }
}

#[test]
fn adding_constant_int_arrays_stays_constant() {
    let a = LargeArray::constant(ElementKind::Int, 1000, &Scalar::Int(4)).unwrap();
    let b = LargeArray::constant(ElementKind::Int, 1000, &Scalar::Int(7)).unwrap();
    let sum = arith::add(&a, &b, None).unwrap();
    assert!(sum.is_constant());
    assert_eq!(sum.len(), 1000);
    assert_eq!(sum.get_i32(0).unwrap(), 11);
}

#[test]
fn logic_not_of_bytes() {
    let bytes: LargeArray = TypedArray::from_slice(&[1i8, 0, 1, 1, 0, 0, 1, 0]).unwrap().into();
    let logic = convert::convert(&bytes, ElementKind::Logic).unwrap();
    let negated = arith::not(&logic).unwrap();
    let got: Vec<i8> = (0..8).map(|i| negated.get_i8(i).unwrap()).collect();
    assert_eq!(got, vec![0, 1, 0, 0, 1, 1, 0, 1]);
}

#[test]
fn complex_from_interleaved_pairs() {
    let z: LargeArray = ComplexArray::<f64>::from_interleaved(&[1.0, 2.0, 3.0, 4.0]).unwrap().into();
    assert_eq!(z.len(), 2);
    assert_eq!(z.get_complex64(0).unwrap(), Complex64::new(1.0, 2.0));
    assert_eq!(z.get_complex64(1).unwrap(), Complex64::new(3.0, 4.0));
}

#[test]
fn storage_threshold_boundary_for_every_kind() {
    let ctx = native_after(8);
    for kind in ElementKind::ALL {
        let at = LargeArray::new_in(&ctx, kind, 8).unwrap();
        let past = LargeArray::new_in(&ctx, kind, 9).unwrap();
        assert!(!at.is_large(), "{} of length 8", kind);
        assert!(past.is_large(), "{} of length 9", kind);
        assert_eq!(past.kind(), kind);
    }
}

#[test]
fn non_positive_lengths_are_rejected() {
    for kind in ElementKind::ALL {
        assert!(matches!(
            LargeArray::new(kind, 0),
            Err(LargeArrayError::InvalidArgument(_))
        ));
        assert!(LargeArray::constant(kind, 0, &Scalar::Int(1)).is_err());
    }
}

fn checked_and_unchecked_agree<T>(value: fn(usize) -> T)
where
    T: ArrayElement + Debug,
{
    for ctx in [native_after(1 << 20), native_after(4)] {
        let len = 37;
        let mut a = TypedArray::<T>::new_in(&ctx, len).unwrap();
        for i in 0..len {
            a.set(i, value(i)).unwrap();
        }
        for i in 0..len {
            let checked = a.get(i).unwrap();
            assert_eq!(checked, value(i));
            assert_eq!(unsafe { a.get_unchecked(i) }, checked);
            if a.is_large() {
                assert_eq!(unsafe { a.get_from_native(i) }, checked);
            }
        }
        unsafe { a.set_unchecked(3, value(0)) };
        assert_eq!(a.get(3).unwrap(), value(0));
        assert!(matches!(a.get(len), Err(LargeArrayError::OutOfRange { .. })));
    }
}

#[test]
fn accessors_for_every_primitive_kind() {
    checked_and_unchecked_agree::<bool>(|i| i % 3 == 0);
    checked_and_unchecked_agree::<i8>(|i| i as i8 - 20);
    checked_and_unchecked_agree::<u8>(|i| (i * 7) as u8);
    checked_and_unchecked_agree::<i16>(|i| (i as i16) * -300);
    checked_and_unchecked_agree::<i32>(|i| (i as i32) << 20);
    checked_and_unchecked_agree::<i64>(|i| (i as i64) << 40);
    checked_and_unchecked_agree::<f32>(|i| i as f32 / 3.0);
    checked_and_unchecked_agree::<f64>(|i| (i as f64).sqrt());
}

#[test]
fn constant_arrays_replicate_and_refuse_writes() {
    for kind in ElementKind::ALL {
        let value = Scalar::Short(5).cast(kind).unwrap();
        let mut a = LargeArray::constant(kind, 12_345, &value).unwrap();
        for i in [0, 1, 6_000, 12_344] {
            assert_eq!(a.get(i).unwrap(), value);
        }
        assert_eq!(a.set(10, &value), Err(LargeArrayError::AccessDenied));
    }
}

#[test]
fn conversion_round_trips() {
    let ctx = native_after(16);
    let a: LargeArray = TypedArray::from_slice_in(&ctx, &(0..40).map(|i| i * 1_000_003).collect::<Vec<i32>>())
        .unwrap()
        .into();
    assert!(matches!(ctx.convert(&a, ElementKind::Int).unwrap(), Cow::Borrowed(_)));
    let long = ctx.convert(&a, ElementKind::Long).unwrap().into_owned();
    let back = ctx.into_kind(long, ElementKind::Int).unwrap();
    for i in 0..40 {
        assert_eq!(back.get_i32(i).unwrap(), a.get_i32(i).unwrap());
    }
}

#[test]
fn elementwise_arithmetic_on_doubles() {
    let mut rng = StdRng::seed_from_u64(7);
    let xs: Vec<f64> = (0..5000).map(|_| rng.gen_range(-100.0..100.0)).collect();
    let ys: Vec<f64> = (0..5000).map(|_| rng.gen_range(-100.0..100.0)).collect();
    let a: LargeArray = TypedArray::from_slice(&xs).unwrap().into();
    let b: LargeArray = TypedArray::from_slice(&ys).unwrap().into();
    let sum = arith::add(&a, &b, None).unwrap();
    let diff = arith::diff(&a, &b, None).unwrap();
    let prod = arith::mult(&a, &b, None).unwrap();
    let quot = arith::div(&a, &b, None).unwrap();
    for i in 0..xs.len() {
        assert_eq!(sum.get_f64(i).unwrap(), xs[i] + ys[i]);
        assert_eq!(diff.get_f64(i).unwrap(), xs[i] - ys[i]);
        assert_eq!(prod.get_f64(i).unwrap(), xs[i] * ys[i]);
        assert_eq!(quot.get_f64(i).unwrap(), xs[i] / ys[i]);
    }
}

#[test]
fn division_by_a_zero_double_follows_ieee() {
    let a: LargeArray = TypedArray::from_slice(&[1.0f64, 0.0]).unwrap().into();
    let b: LargeArray = TypedArray::from_slice(&[0.0f64, 0.0]).unwrap().into();
    let q = arith::div(&a, &b, None).unwrap();
    assert!(q.get_f64(0).unwrap().is_infinite());
    assert!(q.get_f64(1).unwrap().is_nan());
}

#[test]
fn complex_log_and_sqrt_invert() {
    let mut rng = StdRng::seed_from_u64(11);
    let data: Vec<f64> = (0..200).map(|_| rng.gen_range(-10.0..10.0)).collect();
    let z: LargeArray = ComplexArray::<f64>::from_interleaved(&data).unwrap().into();
    let back = arith::exp(&arith::log(&z, None).unwrap(), None).unwrap();
    let root = arith::sqrt(&z, None).unwrap();
    let squared = arith::mult(&root, &root, None).unwrap();
    for i in 0..z.len() {
        let original = z.get_complex64(i).unwrap();
        for candidate in [back.get_complex64(i).unwrap(), squared.get_complex64(i).unwrap()] {
            assert!((candidate.re - original.re).abs() < 1e-9, "{} vs {}", candidate, original);
            assert!((candidate.im - original.im).abs() < 1e-9, "{} vs {}", candidate, original);
        }
    }
}

#[test]
fn threshold_does_not_change_results() {
    let mut rng = StdRng::seed_from_u64(3);
    for len in [1, 2, 3, 17, 1_000, 100_003, 2_000_000] {
        let xs: Vec<f64> = (0..len).map(|_| rng.gen()).collect();
        let ys: Vec<f64> = (0..len).map(|_| rng.gen()).collect();
        let a: LargeArray = TypedArray::from_vec(xs).unwrap().into();
        let b: LargeArray = TypedArray::from_vec(ys).unwrap().into();

        let single = Context::new().with_threads(4).with_concurrency_threshold(len + 1);
        let multi = Context::new().with_threads(4).with_concurrency_threshold(1);
        let x = single.add(&a, &b, None).unwrap();
        let y = multi.add(&a, &b, None).unwrap();
        let (x, y) = (x.as_typed::<f64>().unwrap(), y.as_typed::<f64>().unwrap());
        let bits = |t: &TypedArray<f64>| t.iter().map(f64::to_bits).collect::<Vec<_>>();
        assert_eq!(bits(x), bits(y), "length {}", len);
    }
}

#[test]
fn native_results_for_long_operands() {
    let ctx = Context::new()
        .with_threads(3)
        .with_concurrency_threshold(10)
        .with_max_managed_len(100);
    let a = ctx.random(ElementKind::Float, 1_000).unwrap();
    let b = ctx.random(ElementKind::Int, 1_000).unwrap();
    assert!(a.is_large() && b.is_large());
    let sum = ctx.add(&a, &b, Some(ElementKind::Double)).unwrap();
    assert!(sum.is_large());
    for i in (0..1_000).step_by(97) {
        let expected = a.get_f64(i).unwrap() + b.get_f64(i).unwrap();
        assert_eq!(sum.get_f64(i).unwrap(), expected);
    }
    // values survive a clone into fresh native memory
    let copy = sum.clone_in(&ctx).unwrap();
    assert_ne!(copy, sum);
    assert_eq!(copy.get_f64(999).unwrap(), sum.get_f64(999).unwrap());
}

#[test]
fn global_configuration_is_adjustable() {
    let before = larray::concurrency_threshold();
    larray::set_concurrency_threshold(0);
    assert_eq!(larray::concurrency_threshold(), 1);
    larray::set_concurrency_threshold(before);
    assert!(larray::thread_count() >= 1);
}

#[test]
fn long_strings_survive_a_native_clone() {
    let long = "x".repeat(200);
    let managed: LargeArray = StringArray::from_vec(vec![long.clone(); 6]).unwrap().into();
    let copy = managed.clone_in(&native_after(4)).unwrap();
    assert!(copy.is_large());
    for i in 0..6 {
        assert_eq!(copy.get(i).unwrap(), Scalar::String(long.clone()));
    }
}

#[test]
fn failed_string_copy_writes_nothing() {
    let ctx = native_after(1);
    let src: LargeArray = StringArray::from_vec(vec!["ab".to_string(), "y".repeat(150)]).unwrap().into();
    let mut dst = LargeArray::new_in(&ctx, ElementKind::String, 2).unwrap();
    assert!(dst.is_large());
    assert!(matches!(
        ctx.copy(&src, 0, &mut dst, 0, 2),
        Err(LargeArrayError::InvalidArgument(_))
    ));
    assert_eq!(dst.get(0).unwrap(), Scalar::String(String::new()));
    assert_eq!(dst.get(1).unwrap(), Scalar::String(String::new()));

    let mut objects = LargeArray::new_in(&ctx, ElementKind::Object, 2).unwrap();
    assert!(ctx.copy(&src, 0, &mut objects, 0, 1).is_err());
}

#[test]
fn complex_output_from_real_operands_is_chunk_independent() {
    let a: LargeArray = TypedArray::from_fn_in(&Context::new(), 50_000, |i| i as f64 - 25_000.0)
        .unwrap()
        .into();
    let single = Context::new().with_threads(1);
    let multi = Context::new().with_threads(4).with_concurrency_threshold(1);
    let x = single.sqrt(&a, Some(ElementKind::ComplexDouble)).unwrap();
    let y = multi.sqrt(&a, Some(ElementKind::ComplexDouble)).unwrap();
    for i in (0..50_000).step_by(1_234) {
        assert_eq!(x.get_complex64(i).unwrap(), y.get_complex64(i).unwrap());
    }
    assert_eq!(y.get_complex64(0).unwrap(), Complex64::new(0.0, 25_000f64.sqrt()));
    assert_eq!(a.get_f64(0).unwrap(), -25_000.0);
}
