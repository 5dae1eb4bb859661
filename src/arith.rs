//! Elementwise arithmetic and math over whole arrays
//!
//! Every operation follows the same steps:
//!
//! 1. Validate the operands: they must be numeric and of equal length.
//! 2. Pick the output kind. Binary operations use the higher-ranked operand
//!    kind; unary operations use [`UnaryOp::default_output`].
//! 3. If every operand is constant, evaluate once and return a constant
//!    array.
//! 4. Otherwise fill a fresh array chunk by chunk through the context's
//!    workers. Integer outputs are computed with wrapping 64-bit arithmetic,
//!    real outputs in `f64`, and complex outputs with the formulas of
//!    [`ComplexMath`] at the output's precision.
//!
//! Operations with a complex input and a real output are rejected, except
//! for [`UnaryOp::Abs`].

use crate::array::{ArrayElement, ComplexElement};
use crate::complex::{Complex, ComplexMath};
use crate::element::{Element, Real};
use crate::error::{LargeArrayError, Result};
use crate::{ComplexArray, Context, ElementKind, LargeArray, TypedArray};

/// Operations combining two arrays element by element.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a + b`
    Add,
    /// `a - b`
    Diff,
    /// `a * b`
    Mult,
    /// `a / b`
    Div,
    /// `a` raised to the power `b`
    Pow,
}

impl BinaryOp {
    fn apply_i64(self, a: i64, b: i64) -> i64 {
        match self {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Diff => a.wrapping_sub(b),
            BinaryOp::Mult => a.wrapping_mul(b),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Pow => i64::from_f64((a as f64).powf(b as f64)),
        }
    }

    fn apply_f64(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Diff => a - b,
            BinaryOp::Mult => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }

    fn apply_complex<F: Real>(self, a: Complex<F>, b: Complex<F>) -> Complex<F> {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Diff => a - b,
            BinaryOp::Mult => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powc_principal(b),
        }
    }
}

/// Operations mapping each element of one array.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// Negation
    Neg,
    /// Square root (principal root for complex values)
    Sqrt,
    /// Natural logarithm
    Log,
    /// Base 10 logarithm
    Log10,
    /// Exponential
    Exp,
    /// Absolute value, or modulus for complex values
    Abs,
    /// Sine
    Sin,
    /// Cosine
    Cos,
    /// Tangent
    Tan,
    /// Inverse sine
    Asin,
    /// Inverse cosine
    Acos,
    /// Inverse tangent
    Atan,
    /// `-1`, `0` or `1` by sign
    Signum,
}

/// Output kind of the transcendental functions: narrow integers become
/// `Float`, 32 and 64-bit integers `Double`, other kinds stay as they are.
fn promote_to_real(kind: ElementKind) -> ElementKind {
    use ElementKind::*;
    match kind {
        Logic | Byte | UnsignedByte | Short => Float,
        Int | Long => Double,
        other => other,
    }
}

impl UnaryOp {
    /// Output kind used when the caller does not ask for one.
    pub fn default_output(self, input: ElementKind) -> Result<ElementKind> {
        if !input.is_numeric() {
            return Err(non_numeric(input));
        }
        Ok(match self {
            UnaryOp::Neg => input,
            UnaryOp::Abs => input.component_kind(),
            UnaryOp::Signum => {
                if input.is_complex_numeric() {
                    return Err(LargeArrayError::invalid("signum is not defined for complex values"));
                }
                ElementKind::Byte
            }
            _ => promote_to_real(input),
        })
    }
}

/// The per-element function behind a unary operation.
#[derive(Copy, Clone, Debug)]
enum Kernel {
    Op(UnaryOp),
    Powf(f64),
}

impl Kernel {
    fn default_output(self, input: ElementKind) -> Result<ElementKind> {
        match self {
            Kernel::Op(op) => op.default_output(input),
            Kernel::Powf(_) if input.is_numeric() => Ok(promote_to_real(input)),
            Kernel::Powf(_) => Err(non_numeric(input)),
        }
    }

    /// Integer form, only for the operations that have one.
    fn integer(self) -> Option<fn(i64) -> i64> {
        match self {
            Kernel::Op(UnaryOp::Neg) => Some(i64::wrapping_neg),
            Kernel::Op(UnaryOp::Abs) => Some(i64::wrapping_abs),
            Kernel::Op(UnaryOp::Signum) => Some(i64::signum),
            _ => None,
        }
    }

    fn apply_f64(self, x: f64) -> f64 {
        let op = match self {
            Kernel::Powf(n) => return x.powf(n),
            Kernel::Op(op) => op,
        };
        match op {
            UnaryOp::Neg => -x,
            UnaryOp::Sqrt => x.sqrt(),
            UnaryOp::Log => x.ln(),
            UnaryOp::Log10 => x.log10(),
            UnaryOp::Exp => x.exp(),
            UnaryOp::Abs => x.abs(),
            UnaryOp::Sin => x.sin(),
            UnaryOp::Cos => x.cos(),
            UnaryOp::Tan => x.tan(),
            UnaryOp::Asin => x.asin(),
            UnaryOp::Acos => x.acos(),
            UnaryOp::Atan => x.atan(),
            // zero and NaN map to themselves
            UnaryOp::Signum if x > 0.0 => 1.0,
            UnaryOp::Signum if x < 0.0 => -1.0,
            UnaryOp::Signum => x,
        }
    }

    fn apply_complex<F: Real>(self, z: Complex<F>) -> Complex<F> {
        let op = match self {
            Kernel::Powf(n) => return z.powf_polar(F::from_f64(n)),
            Kernel::Op(op) => op,
        };
        match op {
            UnaryOp::Neg => -z,
            UnaryOp::Sqrt => z.sqrt_principal(),
            UnaryOp::Log => z.ln(),
            UnaryOp::Log10 => z.log10(),
            UnaryOp::Exp => z.exp(),
            UnaryOp::Abs => Complex::from_real(z.modulus()),
            UnaryOp::Sin => z.sin(),
            UnaryOp::Cos => z.cos(),
            UnaryOp::Tan => z.tan_ratio(),
            UnaryOp::Asin => z.asin_log(),
            UnaryOp::Acos => z.acos_log(),
            UnaryOp::Atan => z.atan_log(),
            UnaryOp::Signum => z / Complex::from_real(z.modulus()),
        }
    }
}

/// Operations on logic arrays.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogicOp {
    /// Conjunction
    And,
    /// Disjunction
    Or,
    /// Exclusive or
    Xor,
}

impl LogicOp {
    fn apply(self, a: bool, b: bool) -> bool {
        match self {
            LogicOp::And => a & b,
            LogicOp::Or => a | b,
            LogicOp::Xor => a ^ b,
        }
    }
}

fn non_numeric(kind: ElementKind) -> LargeArrayError {
    LargeArrayError::invalid(format!("{} arrays are not numeric", kind))
}

pub(crate) type Reader<'a, V> = Box<dyn Fn(usize) -> V + Sync + 'a>;

macro_rules! reader {
    ($array:expr, $into:ident) => {
        match $array {
            LargeArray::Logic(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::Byte(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::UnsignedByte(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::Short(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::Int(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::Long(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::Float(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::Double(a) => Ok(Box::new(move |i| a.value(i).$into()) as Reader<'_, _>),
            LargeArray::ComplexFloat(a) => {
                let re = a.real_part();
                Ok(Box::new(move |i| re.value(i).$into()) as Reader<'_, _>)
            }
            LargeArray::ComplexDouble(a) => {
                let re = a.real_part();
                Ok(Box::new(move |i| re.value(i).$into()) as Reader<'_, _>)
            }
            other => Err(non_numeric(other.kind())),
        }
    };
}

/// Reads any numeric array as `f64`. Complex arrays give their real part.
pub(crate) fn f64_reader(array: &LargeArray) -> Result<Reader<'_, f64>> {
    reader!(array, into_f64)
}

/// Reads any numeric array as `i64`, truncating floats toward zero.
pub(crate) fn i64_reader(array: &LargeArray) -> Result<Reader<'_, i64>> {
    reader!(array, into_i64)
}

/// Reads any numeric array as a complex value with `F` components. Real
/// arrays give a zero imaginary part.
fn complex_reader<F: ComplexElement>(array: &LargeArray) -> Result<Reader<'_, Complex<F>>> {
    match array {
        LargeArray::ComplexFloat(a) => Ok(Box::new(move |i| a.value(i).cast::<F>())),
        LargeArray::ComplexDouble(a) => Ok(Box::new(move |i| a.value(i).cast::<F>())),
        other => {
            let r = f64_reader(other)?;
            Ok(Box::new(move |i| Complex::from_real(F::from_f64(r(i)))))
        }
    }
}

/// Reads a complex array as the modulus of each element.
fn modulus_reader(array: &LargeArray) -> Result<Reader<'_, f64>> {
    match array {
        LargeArray::ComplexFloat(a) => Ok(Box::new(move |i| f64::from(a.value(i).modulus()))),
        LargeArray::ComplexDouble(a) => Ok(Box::new(move |i| a.value(i).modulus())),
        other => f64_reader(other),
    }
}

/// Builds an array of `len` elements `f(i)`, or a constant array `f(0)`.
pub(crate) fn build<T, F>(ctx: &Context, len: usize, constant: bool, f: F) -> Result<LargeArray>
where
    T: ArrayElement,
    F: Fn(usize) -> T + Sync,
{
    let array = if constant {
        TypedArray::constant(len, f(0))?
    } else {
        TypedArray::from_fn_in(ctx, len, f)?
    };
    Ok(T::into_array(array))
}

/// Builds a complex array of `len` elements `f(i)`, or a constant array
/// `f(0)`. Operands are read through their readers, so the output is the
/// only allocation.
fn complex_build<F, G>(ctx: &Context, len: usize, constant: bool, f: G) -> Result<LargeArray>
where
    F: ComplexElement,
    G: Fn(usize) -> Complex<F> + Sync,
{
    let out = if constant {
        ComplexArray::constant(len, f(0))?
    } else {
        ComplexArray::from_fn_in(ctx, len, f)?
    };
    Ok(F::into_complex_array(out))
}

fn check_numeric(array: &LargeArray) -> Result<()> {
    if array.kind().is_numeric() {
        Ok(())
    } else {
        Err(non_numeric(array.kind()))
    }
}

fn check_output(kind: ElementKind) -> Result<()> {
    if kind.is_numeric() {
        Ok(())
    } else {
        Err(LargeArrayError::invalid(format!("{} is not a numeric output kind", kind)))
    }
}

fn unsupported_output(kind: ElementKind) -> LargeArrayError {
    LargeArrayError::invalid(format!("unsupported output kind {}", kind))
}

impl Context {
    /// Applies `op` to every pair `(a[i], b[i])`.
    ///
    /// `out` overrides the output kind. Integer division by zero is reported
    /// before any element is computed; floating point division follows IEEE
    /// semantics.
    pub fn binary(
        &self,
        op: BinaryOp,
        a: &LargeArray,
        b: &LargeArray,
        out: Option<ElementKind>,
    ) -> Result<LargeArray> {
        check_numeric(a)?;
        check_numeric(b)?;
        if a.len() != b.len() {
            return Err(LargeArrayError::invalid(format!(
                "operands have different lengths: {} and {}",
                a.len(),
                b.len()
            )));
        }
        let out = out.unwrap_or_else(|| a.kind().promote(b.kind()));
        check_output(out)?;
        let complex_input = a.kind().is_complex_numeric() || b.kind().is_complex_numeric();
        if complex_input && !out.is_complex_numeric() {
            return Err(LargeArrayError::invalid(format!(
                "complex operands cannot produce {} output",
                out
            )));
        }

        let len = a.len();
        let constant = a.is_constant() && b.is_constant();
        if out.is_integer_numeric() {
            let (ra, rb) = (i64_reader(a)?, i64_reader(b)?);
            if op == BinaryOp::Div {
                let zero_divisor = if b.is_constant() {
                    rb(0) == 0
                } else {
                    self.map_ranges(len, |mut range| range.any(|i| rb(i) == 0))
                        .into_iter()
                        .any(|found| found)
                };
                if zero_divisor {
                    return Err(LargeArrayError::invalid("integer division by zero"));
                }
            }
            with_primitive!(out, T => build::<T, _>(self, len, constant, |i| T::from_i64(op.apply_i64(ra(i), rb(i)))),
                _ => Err(unsupported_output(out)))
        } else if out.is_real_numeric() {
            let (ra, rb) = (f64_reader(a)?, f64_reader(b)?);
            with_primitive!(out, T => build::<T, _>(self, len, constant, |i| T::from_f64(op.apply_f64(ra(i), rb(i)))),
                _ => Err(unsupported_output(out)))
        } else {
            with_complex!(out, F => {
                let (za, zb) = (complex_reader::<F>(a)?, complex_reader::<F>(b)?);
                complex_build(self, len, constant, |i| op.apply_complex(za(i), zb(i)))
            }, _ => Err(unsupported_output(out)))
        }
    }

    /// Applies `op` to every element of `a`.
    ///
    /// `out` overrides the output kind given by [`UnaryOp::default_output`].
    pub fn unary(&self, op: UnaryOp, a: &LargeArray, out: Option<ElementKind>) -> Result<LargeArray> {
        if op == UnaryOp::Signum && out.map_or(false, ElementKind::is_complex_numeric) {
            return Err(LargeArrayError::invalid("signum cannot produce complex output"));
        }
        self.map_unary(Kernel::Op(op), a, out)
    }

    /// Raises every element of `a` to the real power `n`.
    pub fn pow_scalar(&self, a: &LargeArray, n: f64, out: Option<ElementKind>) -> Result<LargeArray> {
        self.map_unary(Kernel::Powf(n), a, out)
    }

    fn map_unary(&self, kernel: Kernel, a: &LargeArray, out: Option<ElementKind>) -> Result<LargeArray> {
        let input = a.kind();
        let default = kernel.default_output(input)?;
        let out = out.unwrap_or(default);
        check_output(out)?;
        let modulus = matches!(kernel, Kernel::Op(UnaryOp::Abs));
        if input.is_complex_numeric() && !out.is_complex_numeric() && !modulus {
            return Err(LargeArrayError::invalid(format!(
                "complex operands cannot produce {} output",
                out
            )));
        }

        let len = a.len();
        let constant = a.is_constant();
        if out.is_complex_numeric() {
            return with_complex!(out, F => {
                let z = complex_reader::<F>(a)?;
                complex_build(self, len, constant, |i| kernel.apply_complex(z(i)))
            }, _ => Err(unsupported_output(out)));
        }
        if input.is_complex_numeric() {
            let r = modulus_reader(a)?;
            return with_primitive!(out, T => build::<T, _>(self, len, constant, |i| T::from_f64(r(i))),
                _ => Err(unsupported_output(out)));
        }
        match kernel.integer() {
            Some(f) if input.is_integer_numeric() && out.is_integer_numeric() => {
                let r = i64_reader(a)?;
                with_primitive!(out, T => build::<T, _>(self, len, constant, |i| T::from_i64(f(r(i)))),
                    _ => Err(unsupported_output(out)))
            }
            _ => {
                let r = f64_reader(a)?;
                with_primitive!(out, T => build::<T, _>(self, len, constant, |i| T::from_f64(kernel.apply_f64(r(i)))),
                    _ => Err(unsupported_output(out)))
            }
        }
    }

    /// Negates every element of a logic array.
    pub fn not(&self, a: &LargeArray) -> Result<LargeArray> {
        let a = logic_operand(a)?;
        build::<bool, _>(self, a.len(), a.is_constant(), |i| !a.value(i))
    }

    /// Combines two logic arrays element by element.
    pub fn logic(&self, op: LogicOp, a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
        let (a, b) = (logic_operand(a)?, logic_operand(b)?);
        if a.len() != b.len() {
            return Err(LargeArrayError::invalid(format!(
                "operands have different lengths: {} and {}",
                a.len(),
                b.len()
            )));
        }
        let constant = a.is_constant() && b.is_constant();
        build::<bool, _>(self, a.len(), constant, |i| op.apply(a.value(i), b.value(i)))
    }

    /// Conjunction of two logic arrays.
    pub fn and(&self, a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
        self.logic(LogicOp::And, a, b)
    }

    /// Disjunction of two logic arrays.
    pub fn or(&self, a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
        self.logic(LogicOp::Or, a, b)
    }

    /// Exclusive or of two logic arrays.
    pub fn xor(&self, a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
        self.logic(LogicOp::Xor, a, b)
    }
}

fn logic_operand(array: &LargeArray) -> Result<&TypedArray<bool>> {
    array.as_typed::<bool>().ok_or_else(|| {
        LargeArrayError::invalid(format!("expected a logic array, got {}", array.kind()))
    })
}

macro_rules! binary_ops {
    ($(($name:ident, $op:ident, $doc:literal)),*) => {
        impl Context {
            $(#[doc = $doc]
            pub fn $name(&self, a: &LargeArray, b: &LargeArray, out: Option<ElementKind>) -> Result<LargeArray> {
                self.binary(BinaryOp::$op, a, b, out)
            })*
        }

        $(#[doc = $doc]
        ///
        /// Runs on the global context.
        pub fn $name(a: &LargeArray, b: &LargeArray, out: Option<ElementKind>) -> Result<LargeArray> {
            Context::global().binary(BinaryOp::$op, a, b, out)
        })*
    };
}

binary_ops!(
    (add, Add, "Elementwise sum."),
    (diff, Diff, "Elementwise difference."),
    (mult, Mult, "Elementwise product."),
    (div, Div, "Elementwise quotient."),
    (pow, Pow, "Elementwise power.")
);

macro_rules! unary_ops {
    ($(($name:ident, $op:ident, $doc:literal)),*) => {
        impl Context {
            $(#[doc = $doc]
            pub fn $name(&self, a: &LargeArray, out: Option<ElementKind>) -> Result<LargeArray> {
                self.unary(UnaryOp::$op, a, out)
            })*
        }

        $(#[doc = $doc]
        ///
        /// Runs on the global context.
        pub fn $name(a: &LargeArray, out: Option<ElementKind>) -> Result<LargeArray> {
            Context::global().unary(UnaryOp::$op, a, out)
        })*
    };
}

unary_ops!(
    (neg, Neg, "Elementwise negation."),
    (sqrt, Sqrt, "Elementwise square root."),
    (log, Log, "Elementwise natural logarithm."),
    (log10, Log10, "Elementwise base 10 logarithm."),
    (exp, Exp, "Elementwise exponential."),
    (abs, Abs, "Elementwise absolute value. Complex inputs give their modulus."),
    (sin, Sin, "Elementwise sine."),
    (cos, Cos, "Elementwise cosine."),
    (tan, Tan, "Elementwise tangent."),
    (asin, Asin, "Elementwise inverse sine."),
    (acos, Acos, "Elementwise inverse cosine."),
    (atan, Atan, "Elementwise inverse tangent."),
    (signum, Signum, "Elementwise sign, as a byte array unless `out` says otherwise.")
);

/// Raises every element of `a` to the real power `n` on the global context.
pub fn pow_scalar(a: &LargeArray, n: f64, out: Option<ElementKind>) -> Result<LargeArray> {
    Context::global().pow_scalar(a, n, out)
}

/// Negates every element of a logic array on the global context.
pub fn not(a: &LargeArray) -> Result<LargeArray> {
    Context::global().not(a)
}

/// Conjunction of two logic arrays on the global context.
pub fn and(a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
    Context::global().and(a, b)
}

/// Disjunction of two logic arrays on the global context.
pub fn or(a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
    Context::global().or(a, b)
}

/// Exclusive or of two logic arrays on the global context.
pub fn xor(a: &LargeArray, b: &LargeArray) -> Result<LargeArray> {
    Context::global().xor(a, b)
}
