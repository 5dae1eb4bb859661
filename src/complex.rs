//! Complex scalars and the elementwise formulas used by complex arrays
//!
//! The scalar type is [`num_complex::Complex`]. Functions whose branch
//! choice matters are evaluated through [`ComplexMath`] so every kernel
//! uses the same closed-form expressions.

use std::fmt::{self, Display, Formatter};

pub use num_complex::{Complex, Complex32, Complex64};
use serde::Serialize;

use crate::element::{Element, Real};

/// Elementwise formulas over [`Complex`] values.
pub trait ComplexMath<F: Real>: Sized {
    /// A complex number with a zero imaginary part
    fn from_real(re: F) -> Self;

    /// Converts both components to another precision.
    fn cast<G: Real>(self) -> Complex<G>;

    /// The modulus `sqrt(re² + im²)`
    fn modulus(self) -> F;

    /// Principal square root. A zero imaginary part counts as positive.
    fn sqrt_principal(self) -> Self;

    /// `|z|^n * (cos(n·arg z) + i·sin(n·arg z))`
    fn powf_polar(self, n: F) -> Self;

    /// `exp(n · ln z)`
    fn powc_principal(self, n: Self) -> Self;

    /// `sin z / cos z`
    fn tan_ratio(self) -> Self;

    /// `-i · ln(i·z + sqrt(1 - z²))`
    fn asin_log(self) -> Self;

    /// `-i · ln(z + i·sqrt(1 - z²))`
    fn acos_log(self) -> Self;

    /// `(i/2) · ln((i + z) / (i - z))`
    fn atan_log(self) -> Self;
}

impl<F: Real> ComplexMath<F> for Complex<F> {
    fn from_real(re: F) -> Self {
        Complex::new(re, F::zero())
    }

    fn cast<G: Real>(self) -> Complex<G> {
        Complex::new(G::from_f64(Element::into_f64(self.re)), G::from_f64(Element::into_f64(self.im)))
    }

    fn modulus(self) -> F {
        self.norm()
    }

    fn sqrt_principal(self) -> Self {
        let two = F::one() + F::one();
        let modulus = self.norm();
        let re = ((self.re + modulus) / two).sqrt();
        let im = ((-self.re + modulus) / two).sqrt();
        if self.im < F::zero() {
            Complex::new(re, -im)
        } else {
            Complex::new(re, im)
        }
    }

    fn powf_polar(self, n: F) -> Self {
        Complex::from_polar(self.norm().powf(n), self.arg() * n)
    }

    fn powc_principal(self, n: Self) -> Self {
        (n * self.ln()).exp()
    }

    fn tan_ratio(self) -> Self {
        self.sin() / self.cos()
    }

    fn asin_log(self) -> Self {
        let one = Self::from_real(F::one());
        let i: Self = Complex::i();
        -i * (i * self + (one - self * self).sqrt_principal()).ln()
    }

    fn acos_log(self) -> Self {
        let one = Self::from_real(F::one());
        let i: Self = Complex::i();
        -i * (self + i * (one - self * self).sqrt_principal()).ln()
    }

    fn atan_log(self) -> Self {
        let i: Self = Complex::i();
        let half_i = Complex::new(F::zero(), F::one() / (F::one() + F::one()));
        half_i * ((i + self) / (i - self)).ln()
    }
}

/// Writes `z` as `re`, `re+imi` or `re-imi`, dropping a zero imaginary part.
pub(crate) fn fmt_complex<F: Real + Display>(z: &Complex<F>, f: &mut Formatter<'_>) -> fmt::Result {
    if z.im == F::zero() {
        Display::fmt(&z.re, f)
    } else if z.im.is_sign_negative() {
        write!(f, "{}-{}i", z.re, -z.im)
    } else {
        write!(f, "{}+{}i", z.re, z.im)
    }
}

/// `{"re", "im"}` form of a complex value
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub(crate) struct ReIm<F> {
    pub re: F,
    pub im: F,
}

impl<F> From<Complex<F>> for ReIm<F> {
    fn from(z: Complex<F>) -> Self {
        ReIm { re: z.re, im: z.im }
    }
}
