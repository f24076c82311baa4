//! Element types and the numeric policy behind every operation.
//!
//! Storage buffers hold exactly one of seven numeric types, tagged by
//! [`ElementType`] and abstracted by the [`Element`] trait. All conversion
//! and arithmetic policy lives here so the operation engine stays free of
//! per-type switches:
//!
//! - integer arithmetic wraps (two's complement) and integer division by
//!   zero yields zero, so results never depend on the build profile;
//! - conversion between element types follows `as`-cast semantics
//!   (float→int truncates toward zero and saturates, int→float rounds to
//!   nearest);
//! - `round` resolves ties away from zero.

use num_traits::AsPrimitive;
use std::fmt;

/// Identifies one of the seven element types a storage buffer can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Byte,
    Char,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
}

impl ElementType {
    /// All element types, in declaration order.
    pub const ALL: [ElementType; 7] = [
        ElementType::Byte,
        ElementType::Char,
        ElementType::Int16,
        ElementType::Int32,
        ElementType::Int64,
        ElementType::Float32,
        ElementType::Float64,
    ];

    /// Human-readable type name.
    pub fn name(self) -> &'static str {
        match self {
            ElementType::Byte => "Byte",
            ElementType::Char => "Char",
            ElementType::Int16 => "Int16",
            ElementType::Int32 => "Int32",
            ElementType::Int64 => "Int64",
            ElementType::Float32 => "Float32",
            ElementType::Float64 => "Float64",
        }
    }

    /// Size of one element in bytes.
    pub fn byte_size(self) -> usize {
        match self {
            ElementType::Byte | ElementType::Char => 1,
            ElementType::Int16 => 2,
            ElementType::Int32 | ElementType::Float32 => 4,
            ElementType::Int64 | ElementType::Float64 => 8,
        }
    }

    /// Whether the type is a floating-point type.
    pub fn is_float(self) -> bool {
        matches!(self, ElementType::Float32 | ElementType::Float64)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storage element for tensors.
///
/// Implemented by the seven types listed in [`ElementType`]; the engine is
/// generic over this trait and the dynamic surface dispatches on the tag.
pub trait Element:
    Copy
    + Clone
    + Send
    + Sync
    + Default
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + 'static
    + bytemuck::Pod
    + AsPrimitive<f64>
{
    /// The dynamic tag for this type.
    const TYPE: ElementType;

    /// Addition; wraps on integer overflow.
    fn add(self, rhs: Self) -> Self;

    /// Subtraction; wraps on integer overflow.
    fn sub(self, rhs: Self) -> Self;

    /// Multiplication; wraps on integer overflow.
    fn mul(self, rhs: Self) -> Self;

    /// Division; integer division by zero yields zero.
    fn div(self, rhs: Self) -> Self;

    /// Largest integral value not greater than `self`; identity on integers.
    fn floor(self) -> Self;

    /// Smallest integral value not less than `self`; identity on integers.
    fn ceil(self) -> Self;

    /// Nearest integral value, ties away from zero; identity on integers.
    fn round(self) -> Self;

    /// Lossless widening to f64 (`as`-cast).
    fn to_f64(self) -> f64 {
        self.as_()
    }

    /// `as`-cast conversion from f64.
    fn from_f64(v: f64) -> Self;

    /// Nearest representable value. Used by the range constructor and for
    /// range parameters crossing the dynamic surface.
    fn from_f64_rounded(v: f64) -> Self;

    /// Checked conversion for values crossing the dynamic surface: integer
    /// targets require an exactly representable value, float targets round.
    fn from_f64_checked(v: f64) -> Option<Self>;

    /// `as`-cast conversion from another element type.
    fn from_element<U: Element>(v: U) -> Self;

    fn as_byte(self) -> u8;
    fn as_char(self) -> i8;
    fn as_int16(self) -> i16;
    fn as_int32(self) -> i32;
    fn as_int64(self) -> i64;
    fn as_float32(self) -> f32;
    fn as_float64(self) -> f64;

    /// Row-major matrix product `a (m×k) · b (k×n)` in this type's own
    /// arithmetic. Float types route to faer; integers use the generic loop.
    fn matmul(a: &[Self], b: &[Self], m: usize, k: usize, n: usize) -> Vec<Self> {
        crate::tensor::ops::generic_matmul(a, b, m, k, n)
    }
}

macro_rules! impl_casts {
    () => {
        #[inline]
        fn as_byte(self) -> u8 {
            self as u8
        }
        #[inline]
        fn as_char(self) -> i8 {
            self as i8
        }
        #[inline]
        fn as_int16(self) -> i16 {
            self as i16
        }
        #[inline]
        fn as_int32(self) -> i32 {
            self as i32
        }
        #[inline]
        fn as_int64(self) -> i64 {
            self as i64
        }
        #[inline]
        fn as_float32(self) -> f32 {
            self as f32
        }
        #[inline]
        fn as_float64(self) -> f64 {
            self as f64
        }
    };
}

macro_rules! impl_int_element {
    ($t:ty, $tag:expr, $cast:ident, $lo:expr, $hi:expr) => {
        impl Element for $t {
            const TYPE: ElementType = $tag;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                self.wrapping_add(rhs)
            }
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self.wrapping_sub(rhs)
            }
            #[inline]
            fn mul(self, rhs: Self) -> Self {
                self.wrapping_mul(rhs)
            }
            #[inline]
            fn div(self, rhs: Self) -> Self {
                if rhs == 0 {
                    0
                } else {
                    self.wrapping_div(rhs)
                }
            }

            #[inline]
            fn floor(self) -> Self {
                self
            }
            #[inline]
            fn ceil(self) -> Self {
                self
            }
            #[inline]
            fn round(self) -> Self {
                self
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
            #[inline]
            fn from_f64_rounded(v: f64) -> Self {
                v.round() as $t
            }
            fn from_f64_checked(v: f64) -> Option<Self> {
                // [lo, hi) bounds are exact powers of two, so the
                // comparison itself is precise even for 64-bit targets.
                if v.fract() == 0.0 && v >= $lo && v < $hi {
                    Some(v as $t)
                } else {
                    None
                }
            }
            #[inline]
            fn from_element<U: Element>(v: U) -> Self {
                v.$cast()
            }

            impl_casts!();
        }
    };
}

macro_rules! impl_float_element {
    ($t:ty, $tag:expr, $cast:ident, $kernel:path) => {
        impl Element for $t {
            const TYPE: ElementType = $tag;

            #[inline]
            fn add(self, rhs: Self) -> Self {
                self + rhs
            }
            #[inline]
            fn sub(self, rhs: Self) -> Self {
                self - rhs
            }
            #[inline]
            fn mul(self, rhs: Self) -> Self {
                self * rhs
            }
            #[inline]
            fn div(self, rhs: Self) -> Self {
                self / rhs
            }

            #[inline]
            fn floor(self) -> Self {
                <$t>::floor(self)
            }
            #[inline]
            fn ceil(self) -> Self {
                <$t>::ceil(self)
            }
            #[inline]
            fn round(self) -> Self {
                <$t>::round(self)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
            #[inline]
            fn from_f64_rounded(v: f64) -> Self {
                v as $t
            }
            #[inline]
            fn from_f64_checked(v: f64) -> Option<Self> {
                Some(v as $t)
            }
            #[inline]
            fn from_element<U: Element>(v: U) -> Self {
                v.$cast()
            }

            impl_casts!();

            fn matmul(a: &[Self], b: &[Self], m: usize, k: usize, n: usize) -> Vec<Self> {
                $kernel(a, b, m, k, n)
            }
        }
    };
}

impl_int_element!(u8, ElementType::Byte, as_byte, 0.0, 256.0);
impl_int_element!(i8, ElementType::Char, as_char, -128.0, 128.0);
impl_int_element!(i16, ElementType::Int16, as_int16, -32768.0, 32768.0);
impl_int_element!(
    i32,
    ElementType::Int32,
    as_int32,
    -2147483648.0,
    2147483648.0
);
impl_int_element!(
    i64,
    ElementType::Int64,
    as_int64,
    -9223372036854775808.0,
    9223372036854775808.0
);
impl_float_element!(
    f32,
    ElementType::Float32,
    as_float32,
    crate::tensor::ops::faer_matmul_f32
);
impl_float_element!(
    f64,
    ElementType::Float64,
    as_float64,
    crate::tensor::ops::faer_matmul_f64
);
