//! Element-type-erased tensors for embedding boundaries.
//!
//! [`ElementTensor`] wraps one [`Tensor`] per element type behind a single
//! enum, for hosts where the element type is run-time data (a scripting
//! binding that picks `Byte` or `Double` tensors by name). Every numeric
//! parameter crosses this surface as f64: values and scalar operands must
//! be exactly representable in the target element type, while range
//! parameters are rounded to it first (matching how the parameters of
//! [`Tensor::from_range`] behave).

use std::fmt;
use std::path::PathBuf;

use rand::Rng;

use crate::element::{Element, ElementType};
use crate::error::{Result, TensorError};
use crate::tensor::Tensor;
use crate::value::Nested;

/// Range construction parameters.
///
/// Encodes the construction grammar: `to` alone counts 1, 2, …, to;
/// `from` and `step` override the defaults of 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeSpec {
    pub from: Option<f64>,
    pub to: f64,
    pub step: Option<f64>,
}

/// File-read parameters for [`ElementTensor::from_file`]; `byte_offset`
/// defaults to 0 and `element_count` to every remaining whole element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSpec {
    pub path: PathBuf,
    pub byte_offset: Option<u64>,
    pub element_count: Option<usize>,
}

/// A tensor whose element type is data rather than a type parameter.
///
/// Cloning clones the handle (storage stays shared) and equality requires
/// the same element type, exactly like the typed layer.
///
/// # Example
///
/// ```
/// use gridtensor::{ElementTensor, ElementType, RangeSpec};
///
/// let mut t = ElementTensor::from_range(
///     ElementType::Int32,
///     RangeSpec { from: Some(1.0), to: 6.0, step: None },
/// )?;
/// t.mul(2.0)?;
/// assert_eq!(t.sum()?, 42.0);
///
/// // Int32 cannot represent 0.5, so the scalar is rejected.
/// assert!(t.add(0.5).is_err());
/// # Ok::<(), gridtensor::TensorError>(())
/// ```
#[derive(Clone, PartialEq)]
pub enum ElementTensor {
    Byte(Tensor<u8>),
    Char(Tensor<i8>),
    Int16(Tensor<i16>),
    Int32(Tensor<i32>),
    Int64(Tensor<i64>),
    Float32(Tensor<f32>),
    Float64(Tensor<f64>),
}

macro_rules! impl_from_tensor {
    ($t:ty, $variant:ident) => {
        impl From<Tensor<$t>> for ElementTensor {
            fn from(tensor: Tensor<$t>) -> Self {
                ElementTensor::$variant(tensor)
            }
        }
    };
}

impl_from_tensor!(u8, Byte);
impl_from_tensor!(i8, Char);
impl_from_tensor!(i16, Int16);
impl_from_tensor!(i32, Int32);
impl_from_tensor!(i64, Int64);
impl_from_tensor!(f32, Float32);
impl_from_tensor!(f64, Float64);

/// Runs `$body` with `$t` bound to the inner tensor of any variant.
macro_rules! dispatch {
    ($value:expr, $t:ident => $body:expr) => {
        match $value {
            ElementTensor::Byte($t) => $body,
            ElementTensor::Char($t) => $body,
            ElementTensor::Int16($t) => $body,
            ElementTensor::Int32($t) => $body,
            ElementTensor::Int64($t) => $body,
            ElementTensor::Float32($t) => $body,
            ElementTensor::Float64($t) => $body,
        }
    };
}

/// Runs `$body` with the inner tensors of two same-variant values; mixed
/// variants fail with `LengthOrTypeMismatch` before touching either side.
macro_rules! dispatch_pair {
    ($lhs:expr, $rhs:expr, $a:ident, $b:ident => $body:expr) => {
        match ($lhs, $rhs) {
            (ElementTensor::Byte($a), ElementTensor::Byte($b)) => $body,
            (ElementTensor::Char($a), ElementTensor::Char($b)) => $body,
            (ElementTensor::Int16($a), ElementTensor::Int16($b)) => $body,
            (ElementTensor::Int32($a), ElementTensor::Int32($b)) => $body,
            (ElementTensor::Int64($a), ElementTensor::Int64($b)) => $body,
            (ElementTensor::Float32($a), ElementTensor::Float32($b)) => $body,
            (ElementTensor::Float64($a), ElementTensor::Float64($b)) => $body,
            (lhs, rhs) => Err(TensorError::mismatch(format!(
                "element types differ: {} vs {}",
                lhs.element_type(),
                rhs.element_type()
            ))),
        }
    };
}

/// Instantiates `$body` for the concrete element type selected by `$ty`,
/// with `$t` naming that type inside the body.
macro_rules! dispatch_element_type {
    ($ty:expr, $t:ident => $body:expr) => {
        match $ty {
            ElementType::Byte => {
                type $t = u8;
                $body
            }
            ElementType::Char => {
                type $t = i8;
                $body
            }
            ElementType::Int16 => {
                type $t = i16;
                $body
            }
            ElementType::Int32 => {
                type $t = i32;
                $body
            }
            ElementType::Int64 => {
                type $t = i64;
                $body
            }
            ElementType::Float32 => {
                type $t = f32;
                $body
            }
            ElementType::Float64 => {
                type $t = f64;
                $body
            }
        }
    };
}

/// Exact conversion for values crossing the dynamic surface.
fn exact<T: Element>(v: f64) -> Result<T> {
    T::from_f64_checked(v).ok_or_else(|| {
        TensorError::mismatch(format!("value {v} is not representable as {}", T::TYPE))
    })
}

fn exact_all<T: Element>(values: &[f64]) -> Result<Vec<T>> {
    values.iter().map(|&v| exact(v)).collect()
}

impl ElementTensor {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Zero-initialized tensor of element type `ty` with the given extents.
    pub fn with_extents(ty: ElementType, extents: &[usize]) -> ElementTensor {
        dispatch_element_type!(ty, T => Tensor::<T>::with_extents(extents).into())
    }

    /// Tensor from a nested value tree; every value must be exactly
    /// representable in `ty`.
    pub fn from_values(ty: ElementType, values: &Nested<f64>) -> Result<ElementTensor> {
        dispatch_element_type!(ty, T => {
            let tree = values.try_map(exact::<T>)?;
            Ok(Tensor::from_values(&tree)?.into())
        })
    }

    /// Rank-1 tensor over a range, parameters rounded to `ty` before the
    /// element count is evaluated.
    pub fn from_range(ty: ElementType, range: RangeSpec) -> Result<ElementTensor> {
        let from = range.from.unwrap_or(1.0);
        let step = range.step.unwrap_or(1.0);
        dispatch_element_type!(ty, T => {
            Ok(Tensor::<T>::from_range(
                T::from_f64_rounded(from),
                T::from_f64_rounded(range.to),
                T::from_f64_rounded(step),
            )?
            .into())
        })
    }

    /// Rank-1 tensor read from a file of raw `ty` values.
    pub fn from_file(ty: ElementType, spec: &FileSpec) -> Result<ElementTensor> {
        let byte_offset = spec.byte_offset.unwrap_or(0);
        dispatch_element_type!(ty, T => {
            Ok(Tensor::<T>::from_file(&spec.path, byte_offset, spec.element_count)?.into())
        })
    }

    /// Copy into a tensor of element type `ty` with `as`-cast conversion.
    pub fn convert_to(&self, ty: ElementType) -> Result<ElementTensor> {
        dispatch!(self, t => dispatch_element_type!(ty, U => Ok(t.convert::<U>()?.into())))
    }

    /// Independent copy in fresh contiguous storage, same element type.
    pub fn deep_clone(&self) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.deep_clone()?.into()))
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// The element type tag of this tensor.
    pub fn element_type(&self) -> ElementType {
        dispatch!(self, t => t.element_type())
    }

    /// Per-dimension extents.
    pub fn shape(&self) -> &[usize] {
        dispatch!(self, t => t.shape())
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        dispatch!(self, t => t.rank())
    }

    /// Number of elements addressed (1 for rank 0).
    pub fn size(&self) -> usize {
        dispatch!(self, t => t.size())
    }

    pub fn is_contiguous(&self) -> bool {
        dispatch!(self, t => t.is_contiguous())
    }

    pub fn is_owned(&self) -> bool {
        dispatch!(self, t => t.is_owned())
    }

    pub fn is_valid(&self) -> bool {
        dispatch!(self, t => t.is_valid())
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Read one element by full 1-based multi-index, widened to f64.
    pub fn get(&self, index: &[usize]) -> Result<f64> {
        dispatch!(self, t => Ok(t.get(index)?.to_f64()))
    }

    /// Write one element by full 1-based multi-index; `value` must be
    /// exactly representable.
    pub fn set(&mut self, index: &[usize], value: f64) -> Result<()> {
        dispatch!(self, t => t.set(index, exact(value)?))
    }

    /// Sub-view addressed by a leading 1-based index per dimension.
    pub fn at(&self, index: &[usize]) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.at(index)?.into()))
    }

    /// The whole view as an f64 value tree.
    pub fn values(&self) -> Result<Nested<f64>> {
        dispatch!(self, t => Ok(t.values()?.map(|v| v.to_f64())))
    }

    /// Write the whole view from an f64 value tree of exactly matching
    /// shape; every value must be exactly representable.
    pub fn set_values(&mut self, values: &Nested<f64>) -> Result<()> {
        dispatch!(self, t => {
            let tree = values.try_map(exact)?;
            t.set_values(&tree)
        })
    }

    // ========================================================================
    // Layout views (zero-copy)
    // ========================================================================

    /// Swap two 1-based dimensions; the result aliases this storage.
    pub fn transpose(&self, d1: usize, d2: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.transpose(d1, d2)?.into()))
    }

    /// Drop dimension `dim`, fixing it to the 1-based `index`.
    pub fn select(&self, dim: usize, index: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.select(dim, index)?.into()))
    }

    /// Restrict dimension `dim` to `len` entries starting at `index`.
    pub fn narrow(&self, dim: usize, index: usize, len: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.narrow(dim, index, len)?.into()))
    }

    /// Flip dimension `dim`.
    pub fn reverse(&self, dim: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.reverse(dim)?.into()))
    }

    /// Reinterpret the same elements under new extents.
    pub fn reshape(&self, extents: &[usize]) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.reshape(extents)?.into()))
    }

    // ========================================================================
    // Scalar ops
    // ========================================================================

    /// Set every element to `value` (exactly representable, else
    /// `LengthOrTypeMismatch`).
    pub fn fill(&mut self, value: f64) -> Result<()> {
        dispatch!(self, t => t.fill(exact(value)?))
    }

    /// Add `value` to every element.
    pub fn add(&mut self, value: f64) -> Result<()> {
        dispatch!(self, t => t.add(exact(value)?))
    }

    /// Subtract `value` from every element.
    pub fn sub(&mut self, value: f64) -> Result<()> {
        dispatch!(self, t => t.sub(exact(value)?))
    }

    /// Multiply every element by `value`.
    pub fn mul(&mut self, value: f64) -> Result<()> {
        dispatch!(self, t => t.mul(exact(value)?))
    }

    /// Divide every element by `value`.
    pub fn div(&mut self, value: f64) -> Result<()> {
        dispatch!(self, t => t.div(exact(value)?))
    }

    /// Set one value per index of the final dimension.
    pub fn fill_slice(&mut self, values: &[f64]) -> Result<()> {
        dispatch!(self, t => t.fill_slice(&exact_all(values)?))
    }

    /// Add one value per index of the final dimension.
    pub fn add_slice(&mut self, values: &[f64]) -> Result<()> {
        dispatch!(self, t => t.add_slice(&exact_all(values)?))
    }

    /// Subtract one value per index of the final dimension.
    pub fn sub_slice(&mut self, values: &[f64]) -> Result<()> {
        dispatch!(self, t => t.sub_slice(&exact_all(values)?))
    }

    /// Multiply by one value per index of the final dimension.
    pub fn mul_slice(&mut self, values: &[f64]) -> Result<()> {
        dispatch!(self, t => t.mul_slice(&exact_all(values)?))
    }

    /// Divide by one value per index of the final dimension.
    pub fn div_slice(&mut self, values: &[f64]) -> Result<()> {
        dispatch!(self, t => t.div_slice(&exact_all(values)?))
    }

    // ========================================================================
    // Component ops
    // ========================================================================

    /// Overwrite from `other`; element types and counts must match.
    pub fn copy_from(&mut self, other: &ElementTensor) -> Result<()> {
        dispatch_pair!(self, other, a, b => a.copy_from(b))
    }

    /// Element-wise addition with `other`, in place.
    pub fn cadd(&mut self, other: &ElementTensor) -> Result<()> {
        dispatch_pair!(self, other, a, b => a.cadd(b))
    }

    /// Element-wise subtraction of `other`, in place.
    pub fn csub(&mut self, other: &ElementTensor) -> Result<()> {
        dispatch_pair!(self, other, a, b => a.csub(b))
    }

    /// Element-wise multiplication by `other`, in place.
    pub fn cmul(&mut self, other: &ElementTensor) -> Result<()> {
        dispatch_pair!(self, other, a, b => a.cmul(b))
    }

    /// Element-wise division by `other`, in place.
    pub fn cdiv(&mut self, other: &ElementTensor) -> Result<()> {
        dispatch_pair!(self, other, a, b => a.cdiv(b))
    }

    // ========================================================================
    // Accumulate ops and reductions
    // ========================================================================

    /// Sum of every element in f64.
    pub fn sum(&self) -> Result<f64> {
        dispatch!(self, t => t.sum())
    }

    /// Product of every element in f64.
    pub fn product(&self) -> Result<f64> {
        dispatch!(self, t => t.product())
    }

    /// Sum of every squared element in f64.
    pub fn length_squared(&self) -> Result<f64> {
        dispatch!(self, t => t.length_squared())
    }

    /// Inner product in f64; element types and counts must match.
    pub fn dot(&self, other: &ElementTensor) -> Result<f64> {
        dispatch_pair!(self, other, a, b => a.dot(b))
    }

    /// Largest element along the 1-based dimension `dim`.
    pub fn max(&self, dim: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.max(dim)?.into()))
    }

    /// Smallest element along the 1-based dimension `dim`.
    pub fn min(&self, dim: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.min(dim)?.into()))
    }

    /// 1-based indices of the largest elements along `dim`, as an Int64
    /// tensor.
    pub fn arg_max(&self, dim: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.arg_max(dim)?.into()))
    }

    /// 1-based indices of the smallest elements along `dim`, as an Int64
    /// tensor.
    pub fn arg_min(&self, dim: usize) -> Result<ElementTensor> {
        dispatch!(self, t => Ok(t.arg_min(dim)?.into()))
    }

    /// Largest element of the whole view, widened to f64.
    pub fn max_element(&self) -> Result<f64> {
        dispatch!(self, t => Ok(t.max_element()?.to_f64()))
    }

    /// Smallest element of the whole view, widened to f64.
    pub fn min_element(&self) -> Result<f64> {
        dispatch!(self, t => Ok(t.min_element()?.to_f64()))
    }

    /// 1-based multi-index of the largest element.
    pub fn arg_max_element(&self) -> Result<Vec<usize>> {
        dispatch!(self, t => t.arg_max_element())
    }

    /// 1-based multi-index of the smallest element.
    pub fn arg_min_element(&self) -> Result<Vec<usize>> {
        dispatch!(self, t => t.arg_min_element())
    }

    // ========================================================================
    // Matrix product, shuffle, rounding
    // ========================================================================

    /// Matrix product of two rank-2 tensors of the same element type.
    pub fn mmul(&self, other: &ElementTensor) -> Result<ElementTensor> {
        dispatch_pair!(self, other, a, b => Ok(a.mmul(b)?.into()))
    }

    /// Fisher–Yates permutation of a rank-1 tensor, in place.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        dispatch!(self, t => t.shuffle(rng))
    }

    /// Round every element down; identity on integer types.
    pub fn floor(&mut self) -> Result<()> {
        dispatch!(self, t => t.floor())
    }

    /// Round every element up; identity on integer types.
    pub fn ceil(&mut self) -> Result<()> {
        dispatch!(self, t => t.ceil())
    }

    /// Round every element to nearest, ties away from zero.
    pub fn round(&mut self) -> Result<()> {
        dispatch!(self, t => t.round())
    }

    /// Limit every element to `[min, max]`; bounds must be exactly
    /// representable in the element type.
    pub fn clamp(&mut self, min: Option<f64>, max: Option<f64>) -> Result<()> {
        dispatch!(self, t => {
            let lo = min.map(exact).transpose()?;
            let hi = max.map(exact).transpose()?;
            t.clamp(lo, hi)
        })
    }
}

impl fmt::Debug for ElementTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, t => fmt::Debug::fmt(t, f))
    }
}

impl fmt::Display for ElementTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        dispatch!(self, t => fmt::Display::fmt(t, f))
    }
}
