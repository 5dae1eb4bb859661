//! Primitive element types and the conversions between them

use std::fmt::Debug;

use num_traits::{Float, FloatConst};

use crate::ElementKind;

mod private {
    pub trait Sealed {}
}

/// A primitive type that can be stored in a [`TypedArray`](crate::TypedArray).
///
/// The conversions follow the usual narrowing rules: integers wrap when
/// narrowed, floats truncate toward zero (saturating at the bounds of the
/// target type, NaN becoming zero), and booleans read as `0`/`1`.
pub trait Element:
    private::Sealed + Copy + Default + PartialEq + Debug + Send + Sync + 'static
{
    /// Kind tag of arrays holding this type
    const KIND: ElementKind;

    /// Narrows a 64-bit integer to this type.
    fn from_i64(value: i64) -> Self;
    /// Widens or truncates this value to a 64-bit integer.
    fn into_i64(self) -> i64;
    /// Converts a double to this type.
    fn from_f64(value: f64) -> Self;
    /// Converts this value to a double.
    fn into_f64(self) -> f64;

    /// Non-zero values are `true`.
    fn into_bool(self) -> bool {
        self.into_f64() != 0.0
    }
    /// `true` becomes one, `false` zero.
    fn from_bool(value: bool) -> Self {
        Self::from_i64(i64::from(value))
    }
}

macro_rules! int_element {
    ($(($ty:ty, $kind:ident)),*) => {
        $(impl private::Sealed for $ty {}
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::$kind;

            #[inline]
            fn from_i64(value: i64) -> Self {
                value as $ty
            }
            #[inline]
            fn into_i64(self) -> i64 {
                self as i64
            }
            #[inline]
            fn from_f64(value: f64) -> Self {
                value as i64 as $ty
            }
            #[inline]
            fn into_f64(self) -> f64 {
                self as f64
            }
            #[inline]
            fn into_bool(self) -> bool {
                self != 0
            }
        })*
    };
}

int_element!(
    (i8, Byte),
    (u8, UnsignedByte),
    (i16, Short),
    (i32, Int),
    (i64, Long)
);

macro_rules! float_element {
    ($(($ty:ty, $kind:ident)),*) => {
        $(impl private::Sealed for $ty {}
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::$kind;

            #[inline]
            fn from_i64(value: i64) -> Self {
                value as $ty
            }
            #[inline]
            fn into_i64(self) -> i64 {
                self as i64
            }
            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $ty
            }
            #[inline]
            fn into_f64(self) -> f64 {
                self as f64
            }
        })*
    };
}

float_element!((f32, Float), (f64, Double));

impl private::Sealed for bool {}
impl Element for bool {
    const KIND: ElementKind = ElementKind::Logic;

    #[inline]
    fn from_i64(value: i64) -> Self {
        value != 0
    }
    #[inline]
    fn into_i64(self) -> i64 {
        i64::from(self)
    }
    #[inline]
    fn from_f64(value: f64) -> Self {
        value != 0.0
    }
    #[inline]
    fn into_f64(self) -> f64 {
        f64::from(u8::from(self))
    }
    #[inline]
    fn into_bool(self) -> bool {
        self
    }
    #[inline]
    fn from_bool(value: bool) -> Self {
        value
    }
}

/// Converts between element types the way the cross-kind accessors do:
/// integer sources go through `i64`, floating sources through `f64`, and a
/// boolean target is `true` for any non-zero source.
#[inline]
pub fn cast<S: Element, D: Element>(value: S) -> D {
    if D::KIND == ElementKind::Logic {
        D::from_bool(value.into_bool())
    } else if S::KIND.is_integer_numeric() {
        D::from_i64(value.into_i64())
    } else {
        D::from_f64(value.into_f64())
    }
}

/// Floating point type used for the components of a complex array.
pub trait Real: Element + Float + FloatConst {
    /// Kind tag of complex arrays with components of this type
    const COMPLEX_KIND: ElementKind;
}

impl Real for f32 {
    const COMPLEX_KIND: ElementKind = ElementKind::ComplexFloat;
}

impl Real for f64 {
    const COMPLEX_KIND: ElementKind = ElementKind::ComplexDouble;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrowing_wraps() {
        assert_eq!(i8::from_i64(300), 44);
        assert_eq!(u8::from_i64(-1), 255);
        assert_eq!(i16::from_i64(70_000), 4464);
    }

    #[test]
    fn floats_truncate_toward_zero() {
        assert_eq!(i32::from_f64(2.9), 2);
        assert_eq!(i32::from_f64(-2.9), -2);
        assert_eq!(2.9f32.into_i64(), 2);
        assert_eq!(i64::from_f64(f64::NAN), 0);
        assert_eq!(i64::from_f64(1e300), i64::MAX);
    }

    #[test]
    fn booleans_store_zero_or_one() {
        assert_eq!(f64::from_bool(true), 1.0);
        assert_eq!(i32::from_bool(false), 0);
        assert!(bool::from_f64(0.5));
        assert!(!bool::from_i64(0));
        assert_eq!(true.into_f64(), 1.0);
        assert!(3u8.into_bool());
    }

    #[test]
    fn cast_keeps_integer_precision() {
        assert_eq!(cast::<i64, i64>(i64::MAX - 1), i64::MAX - 1);
        assert_eq!(cast::<i64, i32>(1 << 33), 0);
        assert_eq!(cast::<f64, i16>(-7.9), -7);
        assert!(cast::<f32, bool>(0.25));
        assert_eq!(cast::<bool, f32>(true), 1.0);
    }

    #[test]
    fn kinds_match_widths() {
        assert_eq!(<bool as Element>::KIND.width(), std::mem::size_of::<bool>());
        assert_eq!(<i16 as Element>::KIND.width(), std::mem::size_of::<i16>());
        assert_eq!(<f32 as Element>::KIND.width(), std::mem::size_of::<f32>());
        assert_eq!(<f64 as Real>::COMPLEX_KIND, ElementKind::ComplexDouble);
    }
}
