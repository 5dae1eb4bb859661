//! Functionality relating to arrays of any element kind

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::complex::{fmt_complex, Complex, Complex32, Complex64, ComplexMath, ReIm};
use crate::element::{cast, Element, Real};
use crate::error::{check_index, LargeArrayError, Result};
use crate::varlen::DEFAULT_MAX_BYTES;
use crate::{ComplexArray, Context, ElementKind, ObjectArray, StorageMode, StringArray, TypedArray};

/// Runs `$body` with `$t` bound to the element type of a primitive kind.
/// Complex and non-numeric kinds evaluate `$other`.
macro_rules! with_primitive {
    ($kind:expr, $t:ident => $body:expr, _ => $other:expr) => {
        match $kind {
            $crate::ElementKind::Logic => {
                type $t = bool;
                $body
            }
            $crate::ElementKind::Byte => {
                type $t = i8;
                $body
            }
            $crate::ElementKind::UnsignedByte => {
                type $t = u8;
                $body
            }
            $crate::ElementKind::Short => {
                type $t = i16;
                $body
            }
            $crate::ElementKind::Int => {
                type $t = i32;
                $body
            }
            $crate::ElementKind::Long => {
                type $t = i64;
                $body
            }
            $crate::ElementKind::Float => {
                type $t = f32;
                $body
            }
            $crate::ElementKind::Double => {
                type $t = f64;
                $body
            }
            _ => $other,
        }
    };
}

/// Runs `$body` with `$f` bound to the component type of a complex kind.
macro_rules! with_complex {
    ($kind:expr, $f:ident => $body:expr, _ => $other:expr) => {
        match $kind {
            $crate::ElementKind::ComplexFloat => {
                type $f = f32;
                $body
            }
            $crate::ElementKind::ComplexDouble => {
                type $f = f64;
                $body
            }
            _ => $other,
        }
    };
}

/// Evaluates `$body` with `$a` bound to the inner array, whatever the kind.
macro_rules! each_variant {
    ($array:expr, $a:ident => $body:expr) => {
        match $array {
            LargeArray::Logic($a) => $body,
            LargeArray::Byte($a) => $body,
            LargeArray::UnsignedByte($a) => $body,
            LargeArray::Short($a) => $body,
            LargeArray::Int($a) => $body,
            LargeArray::Long($a) => $body,
            LargeArray::Float($a) => $body,
            LargeArray::Double($a) => $body,
            LargeArray::ComplexFloat($a) => $body,
            LargeArray::ComplexDouble($a) => $body,
            LargeArray::String($a) => $body,
            LargeArray::Object($a) => $body,
        }
    };
}

/// A single value of any element kind.
///
/// This is the value type of the type-erased accessors [`LargeArray::get`]
/// and [`LargeArray::set`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// A boolean
    Logic(bool),
    /// A signed byte
    Byte(i8),
    /// An unsigned byte
    UnsignedByte(u8),
    /// A 16-bit integer
    Short(i16),
    /// A 32-bit integer
    Int(i32),
    /// A 64-bit integer
    Long(i64),
    /// A 32-bit float
    Float(f32),
    /// A 64-bit float
    Double(f64),
    /// A complex number with 32-bit components
    ComplexFloat(Complex32),
    /// A complex number with 64-bit components
    ComplexDouble(Complex64),
    /// A string
    String(String),
    /// A JSON value
    Object(Value),
}

impl Scalar {
    /// Kind of the value
    pub fn kind(&self) -> ElementKind {
        match self {
            Scalar::Logic(_) => ElementKind::Logic,
            Scalar::Byte(_) => ElementKind::Byte,
            Scalar::UnsignedByte(_) => ElementKind::UnsignedByte,
            Scalar::Short(_) => ElementKind::Short,
            Scalar::Int(_) => ElementKind::Int,
            Scalar::Long(_) => ElementKind::Long,
            Scalar::Float(_) => ElementKind::Float,
            Scalar::Double(_) => ElementKind::Double,
            Scalar::ComplexFloat(_) => ElementKind::ComplexFloat,
            Scalar::ComplexDouble(_) => ElementKind::ComplexDouble,
            Scalar::String(_) => ElementKind::String,
            Scalar::Object(_) => ElementKind::Object,
        }
    }

    /// Reads a numeric value as element type `E`. Complex values contribute
    /// their real part.
    pub fn to_element<E: Element>(&self) -> Result<E> {
        Ok(match *self {
            Scalar::Logic(v) => cast(v),
            Scalar::Byte(v) => cast(v),
            Scalar::UnsignedByte(v) => cast(v),
            Scalar::Short(v) => cast(v),
            Scalar::Int(v) => cast(v),
            Scalar::Long(v) => cast(v),
            Scalar::Float(v) => cast(v),
            Scalar::Double(v) => cast(v),
            Scalar::ComplexFloat(z) => cast(z.re),
            Scalar::ComplexDouble(z) => cast(z.re),
            Scalar::String(_) | Scalar::Object(_) => {
                return Err(LargeArrayError::Unsupported {
                    kind: self.kind(),
                    what: "numeric conversion",
                })
            }
        })
    }

    /// Reads a numeric value as a complex number.
    pub fn to_complex<F: Real>(&self) -> Result<Complex<F>> {
        match *self {
            Scalar::ComplexFloat(z) => Ok(z.cast()),
            Scalar::ComplexDouble(z) => Ok(z.cast()),
            _ => self.to_element::<F>().map(Complex::from_real),
        }
    }

    /// Converts the value to `kind`.
    ///
    /// Numeric kinds convert among themselves. Any value converts to a string
    /// (its display form) or to an object (its JSON form). Strings and
    /// objects do not convert to numeric kinds.
    pub fn cast(&self, kind: ElementKind) -> Result<Scalar> {
        if self.kind() == kind {
            return Ok(self.clone());
        }
        match kind {
            ElementKind::String => Ok(Scalar::String(self.to_string())),
            ElementKind::Object => self.to_json().map(Scalar::Object),
            ElementKind::ComplexFloat => self.to_complex().map(Scalar::ComplexFloat),
            ElementKind::ComplexDouble => self.to_complex().map(Scalar::ComplexDouble),
            _ => with_primitive!(kind, T => self.to_element::<T>().map(T::into_scalar),
                _ => unreachable!("every kind is handled above")),
        }
    }

    /// The JSON form of the value. Complex numbers become `{"re", "im"}`
    /// objects and non-finite floats become `null`.
    pub fn to_json(&self) -> Result<Value> {
        Ok(match self {
            Scalar::Logic(v) => Value::from(*v),
            Scalar::Byte(v) => Value::from(*v),
            Scalar::UnsignedByte(v) => Value::from(*v),
            Scalar::Short(v) => Value::from(*v),
            Scalar::Int(v) => Value::from(*v),
            Scalar::Long(v) => Value::from(*v),
            Scalar::Float(v) => Value::from(*v),
            Scalar::Double(v) => Value::from(*v),
            Scalar::ComplexFloat(z) => {
                serde_json::to_value(ReIm::from(*z)).map_err(|e| LargeArrayError::invalid(e.to_string()))?
            }
            Scalar::ComplexDouble(z) => {
                serde_json::to_value(ReIm::from(*z)).map_err(|e| LargeArrayError::invalid(e.to_string()))?
            }
            Scalar::String(s) => Value::from(s.as_str()),
            Scalar::Object(v) => v.clone(),
        })
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Logic(v) => v.fmt(f),
            Scalar::Byte(v) => v.fmt(f),
            Scalar::UnsignedByte(v) => v.fmt(f),
            Scalar::Short(v) => v.fmt(f),
            Scalar::Int(v) => v.fmt(f),
            Scalar::Long(v) => v.fmt(f),
            Scalar::Float(v) => v.fmt(f),
            Scalar::Double(v) => v.fmt(f),
            Scalar::ComplexFloat(z) => fmt_complex(z, f),
            Scalar::ComplexDouble(z) => fmt_complex(z, f),
            Scalar::String(s) => s.fmt(f),
            Scalar::Object(v) => v.fmt(f),
        }
    }
}

/// A primitive element type with a [`LargeArray`] variant of its own.
pub trait ArrayElement: Element {
    /// The typed array inside `array`, if it holds this type.
    fn typed(array: &LargeArray) -> Option<&TypedArray<Self>>;
    /// Mutable form of [`ArrayElement::typed`].
    fn typed_mut(array: &mut LargeArray) -> Option<&mut TypedArray<Self>>;
    /// Wraps a typed array.
    fn into_array(array: TypedArray<Self>) -> LargeArray;
    /// Wraps a value.
    fn into_scalar(self) -> Scalar;
}

macro_rules! array_element {
    ($(($ty:ty, $variant:ident)),*) => {
        $(impl ArrayElement for $ty {
            fn typed(array: &LargeArray) -> Option<&TypedArray<Self>> {
                match array {
                    LargeArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
            fn typed_mut(array: &mut LargeArray) -> Option<&mut TypedArray<Self>> {
                match array {
                    LargeArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
            fn into_array(array: TypedArray<Self>) -> LargeArray {
                LargeArray::$variant(array)
            }
            fn into_scalar(self) -> Scalar {
                Scalar::$variant(self)
            }
        }

        impl From<TypedArray<$ty>> for LargeArray {
            fn from(array: TypedArray<$ty>) -> Self {
                LargeArray::$variant(array)
            }
        })*
    };
}

array_element!(
    (bool, Logic),
    (i8, Byte),
    (u8, UnsignedByte),
    (i16, Short),
    (i32, Int),
    (i64, Long),
    (f32, Float),
    (f64, Double)
);

/// A floating point type with a complex [`LargeArray`] variant.
pub trait ComplexElement: Real + ArrayElement {
    /// The complex array inside `array`, if it holds this component type.
    fn complex(array: &LargeArray) -> Option<&ComplexArray<Self>>;
    /// Mutable form of [`ComplexElement::complex`].
    fn complex_mut(array: &mut LargeArray) -> Option<&mut ComplexArray<Self>>;
    /// Wraps a complex array.
    fn into_complex_array(array: ComplexArray<Self>) -> LargeArray;
    /// Wraps a value.
    fn into_complex_scalar(value: Complex<Self>) -> Scalar;
}

macro_rules! complex_element {
    ($(($ty:ty, $variant:ident)),*) => {
        $(impl ComplexElement for $ty {
            fn complex(array: &LargeArray) -> Option<&ComplexArray<Self>> {
                match array {
                    LargeArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
            fn complex_mut(array: &mut LargeArray) -> Option<&mut ComplexArray<Self>> {
                match array {
                    LargeArray::$variant(a) => Some(a),
                    _ => None,
                }
            }
            fn into_complex_array(array: ComplexArray<Self>) -> LargeArray {
                LargeArray::$variant(array)
            }
            fn into_complex_scalar(value: Complex<Self>) -> Scalar {
                Scalar::$variant(value)
            }
        }

        impl From<ComplexArray<$ty>> for LargeArray {
            fn from(array: ComplexArray<$ty>) -> Self {
                LargeArray::$variant(array)
            }
        })*
    };
}

complex_element!((f32, ComplexFloat), (f64, ComplexDouble));

impl From<StringArray> for LargeArray {
    fn from(array: StringArray) -> Self {
        LargeArray::String(array)
    }
}

impl From<ObjectArray> for LargeArray {
    fn from(array: ObjectArray) -> Self {
        LargeArray::Object(array)
    }
}

/// A large array of any element kind.
///
/// The kind is fixed at construction. Typed access goes through
/// [`LargeArray::as_typed`] and [`LargeArray::as_complex`]; the accessors
/// defined here convert between the array's kind and the requested one.
#[derive(Debug, Clone, PartialEq, Hash, Serialize)]
#[serde(tag = "kind", content = "data")]
pub enum LargeArray {
    /// Booleans
    Logic(TypedArray<bool>),
    /// Signed bytes
    Byte(TypedArray<i8>),
    /// Unsigned bytes
    UnsignedByte(TypedArray<u8>),
    /// 16-bit integers
    Short(TypedArray<i16>),
    /// 32-bit integers
    Int(TypedArray<i32>),
    /// 64-bit integers
    Long(TypedArray<i64>),
    /// 32-bit floats
    Float(TypedArray<f32>),
    /// 64-bit floats
    Double(TypedArray<f64>),
    /// Complex numbers with 32-bit components
    ComplexFloat(ComplexArray<f32>),
    /// Complex numbers with 64-bit components
    ComplexDouble(ComplexArray<f64>),
    /// Strings
    String(StringArray),
    /// JSON values
    Object(ObjectArray),
}

impl LargeArray {
    /// Constructs a zero-filled array using the global context.
    pub fn new(kind: ElementKind, len: usize) -> Result<Self> {
        Self::new_in(Context::global(), kind, len)
    }

    /// Constructs a zero-filled array. Strings start empty and objects start
    /// as `null`.
    pub fn new_in(ctx: &Context, kind: ElementKind, len: usize) -> Result<Self> {
        with_primitive!(kind, T => return TypedArray::<T>::new_in(ctx, len).map(T::into_array),
            _ => ());
        with_complex!(kind, F => return ComplexArray::<F>::new_in(ctx, len).map(F::into_complex_array),
            _ => ());
        match kind {
            ElementKind::String => StringArray::new_in(ctx, len, DEFAULT_MAX_BYTES).map(Self::String),
            _ => ObjectArray::new_in(ctx, len, DEFAULT_MAX_BYTES).map(Self::Object),
        }
    }

    /// Constructs an array of `kind` without initializing numeric elements.
    ///
    /// # Safety
    ///
    /// Every element of a numeric array must be written before it is read.
    pub(crate) unsafe fn new_uninit_in(ctx: &Context, kind: ElementKind, len: usize) -> Result<Self> {
        with_primitive!(kind, T => return TypedArray::<T>::new_uninit_in(ctx, len).map(T::into_array),
            _ => ());
        Self::new_in(ctx, kind, len)
    }

    /// Constructs a constant array holding `value` converted to `kind`.
    pub fn constant(kind: ElementKind, len: usize, value: &Scalar) -> Result<Self> {
        let value = value.cast(kind)?;
        Ok(match value {
            Scalar::Logic(v) => Self::Logic(TypedArray::constant(len, v)?),
            Scalar::Byte(v) => Self::Byte(TypedArray::constant(len, v)?),
            Scalar::UnsignedByte(v) => Self::UnsignedByte(TypedArray::constant(len, v)?),
            Scalar::Short(v) => Self::Short(TypedArray::constant(len, v)?),
            Scalar::Int(v) => Self::Int(TypedArray::constant(len, v)?),
            Scalar::Long(v) => Self::Long(TypedArray::constant(len, v)?),
            Scalar::Float(v) => Self::Float(TypedArray::constant(len, v)?),
            Scalar::Double(v) => Self::Double(TypedArray::constant(len, v)?),
            Scalar::ComplexFloat(z) => Self::ComplexFloat(ComplexArray::constant(len, z)?),
            Scalar::ComplexDouble(z) => Self::ComplexDouble(ComplexArray::constant(len, z)?),
            Scalar::String(s) => Self::String(StringArray::constant(len, s)?),
            Scalar::Object(v) => Self::Object(ObjectArray::constant(len, v)?),
        })
    }

    /// Kind of the elements
    pub fn kind(&self) -> ElementKind {
        each_variant!(self, a => a.kind())
    }

    /// Number of elements
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        each_variant!(self, a => a.len())
    }

    /// Bytes per element, or per component for complex kinds
    pub fn element_width(&self) -> usize {
        each_variant!(self, a => a.element_width())
    }

    /// Returns `true` if every element reads as the same stored value.
    pub fn is_constant(&self) -> bool {
        each_variant!(self, a => a.is_constant())
    }

    /// Returns `true` if the elements live in native memory.
    pub fn is_large(&self) -> bool {
        each_variant!(self, a => a.is_large())
    }

    /// Where the elements live
    pub fn storage_mode(&self) -> StorageMode {
        each_variant!(self, a => a.storage_mode())
    }

    /// The typed array, if the array holds elements of type `T`.
    pub fn as_typed<T: ArrayElement>(&self) -> Option<&TypedArray<T>> {
        T::typed(self)
    }

    /// Mutable form of [`LargeArray::as_typed`].
    pub fn as_typed_mut<T: ArrayElement>(&mut self) -> Option<&mut TypedArray<T>> {
        T::typed_mut(self)
    }

    /// The complex array, if the array holds complex numbers with `F`
    /// components.
    pub fn as_complex<F: ComplexElement>(&self) -> Option<&ComplexArray<F>> {
        F::complex(self)
    }

    /// Mutable form of [`LargeArray::as_complex`].
    pub fn as_complex_mut<F: ComplexElement>(&mut self) -> Option<&mut ComplexArray<F>> {
        F::complex_mut(self)
    }

    /// Clones the array, choosing storage for the copy with `ctx`.
    pub fn clone_in(&self, ctx: &Context) -> Result<Self> {
        Ok(match self {
            Self::Logic(a) => Self::Logic(a.clone_in(ctx)?),
            Self::Byte(a) => Self::Byte(a.clone_in(ctx)?),
            Self::UnsignedByte(a) => Self::UnsignedByte(a.clone_in(ctx)?),
            Self::Short(a) => Self::Short(a.clone_in(ctx)?),
            Self::Int(a) => Self::Int(a.clone_in(ctx)?),
            Self::Long(a) => Self::Long(a.clone_in(ctx)?),
            Self::Float(a) => Self::Float(a.clone_in(ctx)?),
            Self::Double(a) => Self::Double(a.clone_in(ctx)?),
            Self::ComplexFloat(a) => Self::ComplexFloat(a.clone_in(ctx)?),
            Self::ComplexDouble(a) => Self::ComplexDouble(a.clone_in(ctx)?),
            Self::String(a) => Self::String(a.clone_in(ctx)?),
            Self::Object(a) => Self::Object(a.clone_in(ctx)?),
        })
    }

    /// Returns element `i` as a value of the array's own kind.
    pub fn get(&self, i: usize) -> Result<Scalar> {
        check_index(i, self.len())?;
        Ok(self.scalar(i))
    }

    pub(crate) fn scalar(&self, i: usize) -> Scalar {
        match self {
            Self::Logic(a) => Scalar::Logic(a.value(i)),
            Self::Byte(a) => Scalar::Byte(a.value(i)),
            Self::UnsignedByte(a) => Scalar::UnsignedByte(a.value(i)),
            Self::Short(a) => Scalar::Short(a.value(i)),
            Self::Int(a) => Scalar::Int(a.value(i)),
            Self::Long(a) => Scalar::Long(a.value(i)),
            Self::Float(a) => Scalar::Float(a.value(i)),
            Self::Double(a) => Scalar::Double(a.value(i)),
            Self::ComplexFloat(a) => Scalar::ComplexFloat(a.value(i)),
            Self::ComplexDouble(a) => Scalar::ComplexDouble(a.value(i)),
            Self::String(a) => Scalar::String(a.value(i)),
            Self::Object(a) => Scalar::Object(a.value(i)),
        }
    }

    /// Overwrites element `i`, converting `value` to the array's kind.
    pub fn set(&mut self, i: usize, value: &Scalar) -> Result<()> {
        if self.is_constant() {
            return Err(LargeArrayError::AccessDenied);
        }
        check_index(i, self.len())?;
        let value = value.cast(self.kind())?;
        match (self, value) {
            (Self::Logic(a), Scalar::Logic(v)) => a.set(i, v),
            (Self::Byte(a), Scalar::Byte(v)) => a.set(i, v),
            (Self::UnsignedByte(a), Scalar::UnsignedByte(v)) => a.set(i, v),
            (Self::Short(a), Scalar::Short(v)) => a.set(i, v),
            (Self::Int(a), Scalar::Int(v)) => a.set(i, v),
            (Self::Long(a), Scalar::Long(v)) => a.set(i, v),
            (Self::Float(a), Scalar::Float(v)) => a.set(i, v),
            (Self::Double(a), Scalar::Double(v)) => a.set(i, v),
            (Self::ComplexFloat(a), Scalar::ComplexFloat(z)) => a.set_complex(i, z),
            (Self::ComplexDouble(a), Scalar::ComplexDouble(z)) => a.set_complex(i, z),
            (Self::String(a), Scalar::String(s)) => a.set(i, s),
            (Self::Object(a), Scalar::Object(v)) => a.set(i, v),
            _ => unreachable!("cast returns a value of the requested kind"),
        }
    }

    /// Reads element `i` as type `E`, using the usual numeric conversions.
    /// Complex arrays contribute the real part.
    pub fn get_as<E: Element>(&self, i: usize) -> Result<E> {
        check_index(i, self.len())?;
        Ok(match self {
            Self::Logic(a) => cast(a.value(i)),
            Self::Byte(a) => cast(a.value(i)),
            Self::UnsignedByte(a) => cast(a.value(i)),
            Self::Short(a) => cast(a.value(i)),
            Self::Int(a) => cast(a.value(i)),
            Self::Long(a) => cast(a.value(i)),
            Self::Float(a) => cast(a.value(i)),
            Self::Double(a) => cast(a.value(i)),
            Self::ComplexFloat(a) => cast(a.real_part().value(i)),
            Self::ComplexDouble(a) => cast(a.real_part().value(i)),
            Self::String(_) | Self::Object(_) => {
                return Err(LargeArrayError::Unsupported {
                    kind: self.kind(),
                    what: "numeric access",
                })
            }
        })
    }

    /// Writes `value` into element `i`, converting it to the array's kind.
    /// Complex arrays receive it as the real part, with a zero imaginary
    /// part.
    pub fn set_as<E: Element>(&mut self, i: usize, value: E) -> Result<()> {
        match self {
            Self::Logic(a) => a.set(i, cast(value)),
            Self::Byte(a) => a.set(i, cast(value)),
            Self::UnsignedByte(a) => a.set(i, cast(value)),
            Self::Short(a) => a.set(i, cast(value)),
            Self::Int(a) => a.set(i, cast(value)),
            Self::Long(a) => a.set(i, cast(value)),
            Self::Float(a) => a.set(i, cast(value)),
            Self::Double(a) => a.set(i, cast(value)),
            Self::ComplexFloat(a) => a.set_complex(i, Complex::from_real(cast(value))),
            Self::ComplexDouble(a) => a.set_complex(i, Complex::from_real(cast(value))),
            Self::String(_) | Self::Object(_) => Err(LargeArrayError::Unsupported {
                kind: self.kind(),
                what: "numeric access",
            }),
        }
    }

    /// Reads element `i` as a complex number. Real arrays give a zero
    /// imaginary part.
    pub fn get_complex_as<F: Real>(&self, i: usize) -> Result<Complex<F>> {
        match self {
            Self::ComplexFloat(a) => a.get_complex(i).map(Complex::cast),
            Self::ComplexDouble(a) => a.get_complex(i).map(Complex::cast),
            _ => self.get_as::<F>(i).map(Complex::from_real),
        }
    }

    /// Writes a complex number into element `i`. Real arrays receive the
    /// real part.
    pub fn set_complex_as<F: Real>(&mut self, i: usize, value: Complex<F>) -> Result<()> {
        match self {
            Self::ComplexFloat(a) => a.set_complex(i, value.cast()),
            Self::ComplexDouble(a) => a.set_complex(i, value.cast()),
            _ => self.set_as(i, value.re),
        }
    }
}

macro_rules! accessors {
    ($(($get:ident, $set:ident, $ty:ty)),*) => {
        impl LargeArray {
            $(#[doc = concat!("Reads element `i` as `", stringify!($ty), "`.")]
            pub fn $get(&self, i: usize) -> Result<$ty> {
                self.get_as(i)
            }

            #[doc = concat!("Writes a `", stringify!($ty), "` into element `i`.")]
            pub fn $set(&mut self, i: usize, value: $ty) -> Result<()> {
                self.set_as(i, value)
            })*
        }
    };
}

accessors!(
    (get_bool, set_bool, bool),
    (get_i8, set_i8, i8),
    (get_u8, set_u8, u8),
    (get_i16, set_i16, i16),
    (get_i32, set_i32, i32),
    (get_i64, set_i64, i64),
    (get_f32, set_f32, f32),
    (get_f64, set_f64, f64)
);

impl LargeArray {
    /// Reads element `i` as a complex number with `f32` components.
    pub fn get_complex32(&self, i: usize) -> Result<Complex32> {
        self.get_complex_as(i)
    }

    /// Reads element `i` as a complex number with `f64` components.
    pub fn get_complex64(&self, i: usize) -> Result<Complex64> {
        self.get_complex_as(i)
    }

    /// Writes a complex number with `f32` components into element `i`.
    pub fn set_complex32(&mut self, i: usize, value: Complex32) -> Result<()> {
        self.set_complex_as(i, value)
    }

    /// Writes a complex number with `f64` components into element `i`.
    pub fn set_complex64(&mut self, i: usize, value: Complex64) -> Result<()> {
        self.set_complex_as(i, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[mockalloc::test]
    fn every_kind_constructs() {
        for kind in ElementKind::ALL {
            let arr = LargeArray::new(kind, 5).unwrap();
            assert_eq!(arr.kind(), kind);
            assert_eq!(arr.len(), 5);
            assert_eq!(arr.element_width(), kind.width());
            assert!(!arr.is_constant());
            assert!(LargeArray::new(kind, 0).is_err());
        }
    }

    #[mockalloc::test]
    fn cross_kind_accessors_convert() {
        let mut arr = LargeArray::new(ElementKind::Float, 4).unwrap();
        arr.set_f64(0, -2.75).unwrap();
        assert_eq!(arr.get_i32(0).unwrap(), -2);
        assert!(arr.get_bool(0).unwrap());
        arr.set_bool(1, true).unwrap();
        assert_eq!(arr.get_f32(1).unwrap(), 1.0);

        let mut bytes = LargeArray::new(ElementKind::Byte, 2).unwrap();
        bytes.set_i64(0, 300).unwrap();
        assert_eq!(bytes.get_i8(0).unwrap(), 44);
        assert_eq!(bytes.get_complex64(0).unwrap(), Complex64::new(44.0, 0.0));
    }

    #[mockalloc::test]
    fn complex_arrays_read_as_real_part() {
        let mut arr = LargeArray::new(ElementKind::ComplexDouble, 3).unwrap();
        arr.set_complex64(2, Complex64::new(1.5, -4.0)).unwrap();
        assert_eq!(arr.get_f64(2).unwrap(), 1.5);
        arr.set_f64(1, 7.0).unwrap();
        assert_eq!(arr.get_complex64(1).unwrap(), Complex64::new(7.0, 0.0));
        assert_eq!(arr.get(2).unwrap(), Scalar::ComplexDouble(Complex64::new(1.5, -4.0)));
        assert_eq!(arr.get_complex32(2).unwrap(), Complex32::new(1.5, -4.0));
    }

    #[mockalloc::test]
    fn non_numeric_kinds_reject_numeric_access() {
        let mut arr = LargeArray::new(ElementKind::String, 2).unwrap();
        assert_eq!(
            arr.get_f64(0),
            Err(LargeArrayError::Unsupported {
                kind: ElementKind::String,
                what: "numeric access"
            })
        );
        assert!(arr.set_i32(0, 1).is_err());
        arr.set(0, &Scalar::Int(12)).unwrap();
        assert_eq!(arr.get(0).unwrap(), Scalar::String("12".into()));
    }

    #[mockalloc::test]
    fn type_erased_access() {
        let mut arr = LargeArray::new(ElementKind::Long, 3).unwrap();
        arr.set(1, &Scalar::Double(9.9)).unwrap();
        assert_eq!(arr.get(1).unwrap(), Scalar::Long(9));
        assert_eq!(arr.get(3), Err(LargeArrayError::OutOfRange { index: 3, len: 3 }));
        assert!(arr.set(0, &Scalar::String("1".into())).is_err());

        let mut objects = LargeArray::new(ElementKind::Object, 1).unwrap();
        objects.set(0, &Scalar::Object(json!({"a": 1}))).unwrap();
        assert_eq!(objects.get(0).unwrap(), Scalar::Object(json!({"a": 1})));
    }

    #[mockalloc::test]
    fn constants_of_every_numeric_kind() {
        for kind in ElementKind::ALL.iter().copied().filter(|k| k.is_numeric()) {
            let mut arr = LargeArray::constant(kind, 100, &Scalar::Int(3)).unwrap();
            assert!(arr.is_constant());
            assert_eq!(arr.get_f64(99).unwrap(), if kind == ElementKind::Logic { 1.0 } else { 3.0 });
            assert_eq!(arr.set_f64(0, 1.0), Err(LargeArrayError::AccessDenied));
            assert_eq!(arr.set(0, &Scalar::Int(1)), Err(LargeArrayError::AccessDenied));
        }
        assert!(LargeArray::constant(ElementKind::Int, 1, &Scalar::String("x".into())).is_err());
    }

    #[mockalloc::test]
    fn typed_views() {
        let mut arr: LargeArray = TypedArray::from_vec(vec![1i16, 2, 3]).unwrap().into();
        assert_eq!(arr.kind(), ElementKind::Short);
        assert!(arr.as_typed::<i32>().is_none());
        arr.as_typed_mut::<i16>().unwrap().set(0, 10).unwrap();
        assert_eq!(arr.get_i16(0).unwrap(), 10);
        assert!(arr.as_complex::<f64>().is_none());
    }

    #[test]
    fn scalar_display_and_cast() {
        assert_eq!(Scalar::ComplexDouble(Complex64::new(1.0, 2.0)).to_string(), "1+2i");
        assert_eq!(Scalar::ComplexDouble(Complex64::new(1.0, -2.0)).to_string(), "1-2i");
        assert_eq!(
            Scalar::ComplexFloat(Complex32::new(1.0, -2.0)).cast(ElementKind::String).unwrap(),
            Scalar::String("1-2i".into())
        );
        assert_eq!(Scalar::Double(2.5).cast(ElementKind::Short).unwrap(), Scalar::Short(2));
        assert_eq!(
            Scalar::Long(4).cast(ElementKind::ComplexFloat).unwrap(),
            Scalar::ComplexFloat(Complex32::new(4.0, 0.0))
        );
        assert_eq!(Scalar::Byte(-1).cast(ElementKind::Object).unwrap(), Scalar::Object(json!(-1)));
        assert_eq!(
            Scalar::ComplexFloat(Complex32::new(0.5, 1.0)).to_json().unwrap(),
            json!({"re": 0.5, "im": 1.0})
        );
        assert_eq!(Scalar::Double(f64::NAN).to_json().unwrap(), Value::Null);
    }
}
