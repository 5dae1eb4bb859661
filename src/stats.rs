//! Summary statistics over real-valued arrays
//!
//! Each statistic is reduced per chunk on the context's workers and the
//! partial results are combined on the calling thread.

use crate::arith::f64_reader;
use crate::error::{LargeArrayError, Result};
use crate::{Context, LargeArray};

fn real_operand(a: &LargeArray) -> Result<()> {
    if a.kind().is_real_numeric() {
        Ok(())
    } else {
        Err(LargeArrayError::invalid(format!(
            "statistics need a real-valued array, got {}",
            a.kind()
        )))
    }
}

impl Context {
    /// Smallest element. NaN elements are ignored unless every element is NaN.
    pub fn min(&self, a: &LargeArray) -> Result<f64> {
        real_operand(a)?;
        if a.is_constant() {
            return a.get_f64(0);
        }
        let r = f64_reader(a)?;
        let partials = self.map_ranges(a.len(), |range| range.map(|i| r(i)).fold(f64::NAN, f64::min));
        Ok(partials.into_iter().fold(f64::NAN, f64::min))
    }

    /// Largest element. NaN elements are ignored unless every element is NaN.
    pub fn max(&self, a: &LargeArray) -> Result<f64> {
        real_operand(a)?;
        if a.is_constant() {
            return a.get_f64(0);
        }
        let r = f64_reader(a)?;
        let partials = self.map_ranges(a.len(), |range| range.map(|i| r(i)).fold(f64::NAN, f64::max));
        Ok(partials.into_iter().fold(f64::NAN, f64::max))
    }

    /// Sum of every element.
    pub fn sum(&self, a: &LargeArray) -> Result<f64> {
        real_operand(a)?;
        if a.is_constant() {
            return Ok(a.get_f64(0)? * a.len() as f64);
        }
        let r = f64_reader(a)?;
        Ok(self.map_ranges(a.len(), |range| range.map(|i| r(i)).sum::<f64>()).into_iter().sum())
    }

    /// Arithmetic mean.
    pub fn avg(&self, a: &LargeArray) -> Result<f64> {
        if a.is_constant() {
            real_operand(a)?;
            return a.get_f64(0);
        }
        Ok(self.sum(a)? / a.len() as f64)
    }

    /// Sample standard deviation, dividing by `n - 1`. Arrays of a single
    /// element give zero.
    pub fn std(&self, a: &LargeArray) -> Result<f64> {
        real_operand(a)?;
        if a.len() == 1 || a.is_constant() {
            return Ok(0.0);
        }
        let mean = self.avg(a)?;
        let r = f64_reader(a)?;
        let squares: f64 = self
            .map_ranges(a.len(), |range| range.map(|i| (r(i) - mean).powi(2)).sum::<f64>())
            .into_iter()
            .sum();
        Ok((squares / (a.len() - 1) as f64).sqrt())
    }
}

/// [`Context::min`] on the global context.
pub fn min(a: &LargeArray) -> Result<f64> {
    Context::global().min(a)
}

/// [`Context::max`] on the global context.
pub fn max(a: &LargeArray) -> Result<f64> {
    Context::global().max(a)
}

/// [`Context::sum`] on the global context.
pub fn sum(a: &LargeArray) -> Result<f64> {
    Context::global().sum(a)
}

/// [`Context::avg`] on the global context.
pub fn avg(a: &LargeArray) -> Result<f64> {
    Context::global().avg(a)
}

/// [`Context::std`] on the global context.
pub fn std(a: &LargeArray) -> Result<f64> {
    Context::global().std(a)
}
