//! The closed set of element kinds a large array can hold

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

/// Tag identifying the type of elements stored in a large array.
///
/// Kinds are totally ordered from the narrowest integer to the widest complex
/// type, followed by the two non-numeric kinds. Binary arithmetic picks the
/// higher-ranked of its two operands as the output kind.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    /// Booleans stored as one byte each
    Logic = 0,
    /// Signed 8-bit integers
    Byte = 1,
    /// Unsigned 8-bit integers
    UnsignedByte = 2,
    /// Signed 16-bit integers
    Short = 3,
    /// Signed 32-bit integers
    Int = 4,
    /// Signed 64-bit integers
    Long = 5,
    /// 32-bit floats
    Float = 6,
    /// 64-bit floats
    Double = 7,
    /// Pairs of 32-bit floats
    ComplexFloat = 8,
    /// Pairs of 64-bit floats
    ComplexDouble = 9,
    /// UTF-8 strings
    String = 10,
    /// JSON values
    Object = 11,
}

impl ElementKind {
    /// Every kind, in rank order.
    pub const ALL: [ElementKind; 12] = [
        ElementKind::Logic,
        ElementKind::Byte,
        ElementKind::UnsignedByte,
        ElementKind::Short,
        ElementKind::Int,
        ElementKind::Long,
        ElementKind::Float,
        ElementKind::Double,
        ElementKind::ComplexFloat,
        ElementKind::ComplexDouble,
        ElementKind::String,
        ElementKind::Object,
    ];

    /// Number of bytes per stored unit.
    ///
    /// Complex kinds report the width of one component, since the real and
    /// imaginary parts live in separate arrays. String and object kinds are
    /// stored as bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        use ElementKind::*;
        match self {
            Logic | Byte | UnsignedByte | String | Object => 1,
            Short => 2,
            Int | Float | ComplexFloat => 4,
            Long | Double | ComplexDouble => 8,
        }
    }

    /// Returns `true` for every kind arithmetic can be performed on.
    #[must_use]
    pub const fn is_numeric(self) -> bool {
        !matches!(self, ElementKind::String | ElementKind::Object)
    }

    /// Returns `true` for the logic and integer kinds.
    #[must_use]
    pub const fn is_integer_numeric(self) -> bool {
        use ElementKind::*;
        matches!(self, Logic | Byte | UnsignedByte | Short | Int | Long)
    }

    /// Returns `true` for the real kinds, including the integer kinds.
    #[must_use]
    pub const fn is_real_numeric(self) -> bool {
        use ElementKind::*;
        matches!(self, Logic | Byte | UnsignedByte | Short | Int | Long | Float | Double)
    }

    /// Returns `true` for the two complex kinds.
    #[must_use]
    pub const fn is_complex_numeric(self) -> bool {
        matches!(self, ElementKind::ComplexFloat | ElementKind::ComplexDouble)
    }

    /// The real kind holding one component of a complex kind. Other kinds
    /// map to themselves.
    #[must_use]
    pub const fn component_kind(self) -> Self {
        match self {
            ElementKind::ComplexFloat => ElementKind::Float,
            ElementKind::ComplexDouble => ElementKind::Double,
            other => other,
        }
    }

    /// The higher-ranked of two kinds.
    #[must_use]
    pub fn promote(self, other: Self) -> Self {
        self.max(other)
    }

    /// Human readable name of the kind.
    #[must_use]
    pub const fn name(self) -> &'static str {
        use ElementKind::*;
        match self {
            Logic => "logic",
            Byte => "byte",
            UnsignedByte => "unsigned byte",
            Short => "short",
            Int => "int",
            Long => "long",
            Float => "float",
            Double => "double",
            ComplexFloat => "complex float",
            ComplexDouble => "complex double",
            String => "string",
            Object => "object",
        }
    }
}

impl Display for ElementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
