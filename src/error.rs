//! Error types returned by array construction, access and arithmetic

use thiserror::Error;

use crate::ElementKind;

/// Error type for larray
///
/// Native allocation failure is deliberately absent: it is fatal and goes
/// through [`std::alloc::handle_alloc_error`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LargeArrayError {
    /// An argument was rejected before any work was performed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A checked accessor was given an index outside `[0, len)`
    #[error("index {index} out of range for length {len}")]
    OutOfRange {
        /// The offending index
        index: usize,
        /// Length of the array
        len: usize,
    },
    /// A setter was called on a constant array
    #[error("constant arrays cannot be modified")]
    AccessDenied,
    /// The accessor has no meaning for this element kind
    #[error("operation not supported for {kind} arrays: {what}")]
    Unsupported {
        /// Kind of the array the operation was attempted on
        kind: ElementKind,
        /// Short description of the operation
        what: &'static str,
    },
}

impl LargeArrayError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, LargeArrayError>;

pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(LargeArrayError::OutOfRange { index, len })
    }
}

pub(crate) fn check_len(len: usize) -> Result<()> {
    if len == 0 {
        Err(LargeArrayError::invalid("length must be positive"))
    } else if len > isize::MAX as usize {
        Err(LargeArrayError::invalid(format!(
            "length {} exceeds the addressable range",
            len
        )))
    } else {
        Ok(())
    }
}
