//! The operation engine: arithmetic, reductions, matrix product, shuffle.
//!
//! Every algorithm here is defined over [`Layout`] position sequences, so
//! the same code handles contiguous, narrowed, transposed, and reversed
//! views. In-place operations mutate shared storage: every view aliasing
//! the same buffer observes the result.

use rand::Rng;

use super::Tensor;
use crate::element::Element;
use crate::error::{Result, TensorError};
use crate::layout::Layout;
use crate::storage::Storage;

impl<T: Element> Tensor<T> {
    // ========================================================================
    // Scalar ops (in place)
    // ========================================================================

    /// Set every element to `value`.
    pub fn fill(&mut self, value: T) -> Result<()> {
        self.scalar_op(value, |_, v| v)
    }

    /// Add `value` to every element. Integer arithmetic wraps.
    pub fn add(&mut self, value: T) -> Result<()> {
        self.scalar_op(value, T::add)
    }

    /// Subtract `value` from every element. Integer arithmetic wraps.
    pub fn sub(&mut self, value: T) -> Result<()> {
        self.scalar_op(value, T::sub)
    }

    /// Multiply every element by `value`. Integer arithmetic wraps.
    pub fn mul(&mut self, value: T) -> Result<()> {
        self.scalar_op(value, T::mul)
    }

    /// Divide every element by `value`. Integer division by zero yields
    /// zero.
    pub fn div(&mut self, value: T) -> Result<()> {
        self.scalar_op(value, T::div)
    }

    /// Set one value per index of the final dimension: `values[j]` lands
    /// on every element whose last index is `j+1`.
    pub fn fill_slice(&mut self, values: &[T]) -> Result<()> {
        self.scalar_slice_op(values, |_, v| v)
    }

    /// Add one value per index of the final dimension.
    ///
    /// # Example
    ///
    /// ```
    /// use gridtensor::Tensor;
    ///
    /// let mut t = Tensor::from_data(&[1i32, 2, 3, 4], &[2, 2])?;
    /// t.add_slice(&[10, 20])?; // per column
    /// assert_eq!(t.to_vec()?, vec![11, 22, 13, 24]);
    /// # Ok::<(), gridtensor::TensorError>(())
    /// ```
    pub fn add_slice(&mut self, values: &[T]) -> Result<()> {
        self.scalar_slice_op(values, T::add)
    }

    /// Subtract one value per index of the final dimension.
    pub fn sub_slice(&mut self, values: &[T]) -> Result<()> {
        self.scalar_slice_op(values, T::sub)
    }

    /// Multiply by one value per index of the final dimension.
    pub fn mul_slice(&mut self, values: &[T]) -> Result<()> {
        self.scalar_slice_op(values, T::mul)
    }

    /// Divide by one value per index of the final dimension.
    pub fn div_slice(&mut self, values: &[T]) -> Result<()> {
        self.scalar_slice_op(values, T::div)
    }

    fn scalar_op(&mut self, value: T, op: impl Fn(T, T) -> T) -> Result<()> {
        self.storage.with_write(|data| {
            for position in self.layout.positions() {
                data[position] = op(data[position], value);
            }
        })
    }

    fn scalar_slice_op(&mut self, values: &[T], op: impl Fn(T, T) -> T) -> Result<()> {
        if self.rank() == 0 {
            return Err(TensorError::mismatch(format!(
                "cannot spread {} values over a rank-0 view",
                values.len()
            )));
        }
        let extent = self.shape()[self.rank() - 1];
        if values.len() != extent {
            return Err(TensorError::mismatch(format!(
                "{} values do not match the final dimension's extent {}",
                values.len(),
                extent
            )));
        }
        self.storage.with_write(|data| {
            // The final dimension varies fastest in layout order.
            for (ordinal, position) in self.layout.positions().enumerate() {
                data[position] = op(data[position], values[ordinal % extent]);
            }
        })
    }

    // ========================================================================
    // Component ops (in place, element count must match)
    // ========================================================================

    /// Overwrite every element with the corresponding element of `other`,
    /// each side read in its own layout order. Shapes may differ as long
    /// as the element counts agree.
    pub fn copy_from(&mut self, other: &Tensor<T>) -> Result<()> {
        self.component_op(other, |_, v| v)
    }

    /// Element-wise addition with `other`, in place.
    pub fn cadd(&mut self, other: &Tensor<T>) -> Result<()> {
        self.component_op(other, T::add)
    }

    /// Element-wise subtraction of `other`, in place.
    pub fn csub(&mut self, other: &Tensor<T>) -> Result<()> {
        self.component_op(other, T::sub)
    }

    /// Element-wise multiplication by `other`, in place.
    ///
    /// # Example
    ///
    /// ```
    /// use gridtensor::Tensor;
    ///
    /// let mut a = Tensor::from_data(&[1i32, 2, 3, 4, 5, 6], &[3, 2])?;
    /// let b = Tensor::from_data(&[1i32, 2, 3, 4, 5, 6], &[2, 3])?;
    /// a.cmul(&b)?; // counts match, shapes need not
    /// assert_eq!(a.to_vec()?, vec![1, 4, 9, 16, 25, 36]);
    /// # Ok::<(), gridtensor::TensorError>(())
    /// ```
    pub fn cmul(&mut self, other: &Tensor<T>) -> Result<()> {
        self.component_op(other, T::mul)
    }

    /// Element-wise division by `other`, in place. Integer division by
    /// zero yields zero.
    pub fn cdiv(&mut self, other: &Tensor<T>) -> Result<()> {
        self.component_op(other, T::div)
    }

    /// Both operands may alias one buffer; elements are then processed
    /// sequentially in layout order, so later reads observe earlier
    /// writes.
    fn component_op(&mut self, other: &Tensor<T>, op: impl Fn(T, T) -> T) -> Result<()> {
        self.check_counts_match(other)?;
        self.storage.with_write_read(&other.storage, |dst, src| {
            let pairs = self.layout.positions().zip(other.layout.positions());
            match src {
                Some(src) => {
                    for (d, s) in pairs {
                        dst[d] = op(dst[d], src[s]);
                    }
                }
                None => {
                    for (d, s) in pairs {
                        dst[d] = op(dst[d], dst[s]);
                    }
                }
            }
        })
    }

    fn check_counts_match(&self, other: &Tensor<T>) -> Result<()> {
        if self.size() != other.size() {
            return Err(TensorError::mismatch(format!(
                "element counts differ: shape {:?} holds {} but shape {:?} holds {}",
                self.shape(),
                self.size(),
                other.shape(),
                other.size()
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Accumulate ops
    // ========================================================================

    /// Sum of every element, accumulated in f64. 0.0 when empty.
    pub fn sum(&self) -> Result<f64> {
        self.storage
            .with_read(|data| self.layout.positions().map(|p| data[p].to_f64()).sum())
    }

    /// Product of every element, accumulated in f64. 1.0 when empty.
    pub fn product(&self) -> Result<f64> {
        self.storage
            .with_read(|data| self.layout.positions().map(|p| data[p].to_f64()).product())
    }

    /// Sum of every squared element, accumulated in f64. 0.0 when empty.
    pub fn length_squared(&self) -> Result<f64> {
        self.storage.with_read(|data| {
            self.layout
                .positions()
                .map(|p| {
                    let v = data[p].to_f64();
                    v * v
                })
                .sum()
        })
    }

    /// Inner product with `other`, accumulated in f64. The element counts
    /// must agree; 0.0 when both are empty.
    pub fn dot(&self, other: &Tensor<T>) -> Result<f64> {
        self.check_counts_match(other)?;
        self.storage.with_read_pair(&other.storage, |lhs, rhs| {
            self.layout
                .positions()
                .zip(other.layout.positions())
                .map(|(a, b)| lhs[a].to_f64() * rhs[b].to_f64())
                .sum()
        })
    }

    // ========================================================================
    // Reductions along a dimension
    // ========================================================================

    /// Largest element along the 1-based dimension `dim`: the result drops
    /// that dimension and owns fresh storage. Ties keep the first
    /// occurrence.
    pub fn max(&self, dim: usize) -> Result<Tensor<T>> {
        self.reduce_dim(dim, |data, lane| lane_extreme(data, lane, |c, b| c > b).0)
    }

    /// Smallest element along the 1-based dimension `dim`.
    pub fn min(&self, dim: usize) -> Result<Tensor<T>> {
        self.reduce_dim(dim, |data, lane| lane_extreme(data, lane, |c, b| c < b).0)
    }

    /// 1-based index of the largest element along dimension `dim`, first
    /// occurrence on ties.
    pub fn arg_max(&self, dim: usize) -> Result<Tensor<i64>> {
        self.reduce_dim(dim, |data, lane| lane_extreme(data, lane, |c, b| c > b).1)
    }

    /// 1-based index of the smallest element along dimension `dim`, first
    /// occurrence on ties.
    pub fn arg_min(&self, dim: usize) -> Result<Tensor<i64>> {
        self.reduce_dim(dim, |data, lane| lane_extreme(data, lane, |c, b| c < b).1)
    }

    /// Applies `f` to every lane of dimension `dim` and collects the
    /// layout-order results into a fresh rank R−1 tensor.
    fn reduce_dim<U: Element>(
        &self,
        dim: usize,
        f: impl Fn(&[T], Lane) -> U,
    ) -> Result<Tensor<U>> {
        if self.rank() == 0 {
            return Err(TensorError::bad_dimension(
                "cannot reduce a scalar view; it has no dimensions",
            ));
        }
        let d = self.checked_dim(dim)?;
        let extent = self.shape()[d];
        if extent == 0 {
            return Err(TensorError::bad_dimension(format!(
                "cannot reduce dimension {dim} with no elements"
            )));
        }
        let stride = self.strides()[d];
        let lanes = self.layout.select(d, 0);
        let data = self.storage.with_read(|data| {
            lanes
                .positions()
                .map(|start| {
                    f(
                        data,
                        Lane {
                            start,
                            stride,
                            extent,
                        },
                    )
                })
                .collect::<Vec<U>>()
        })?;
        Ok(Tensor::from_parts(
            Storage::from_vec(data),
            Layout::contiguous(lanes.shape()),
        ))
    }

    // ========================================================================
    // Whole-tensor reductions
    // ========================================================================

    /// Largest element of the whole view, first occurrence on ties.
    pub fn max_element(&self) -> Result<T> {
        Ok(self.extreme_ordinal(|c, b| c > b)?.1)
    }

    /// Smallest element of the whole view, first occurrence on ties.
    pub fn min_element(&self) -> Result<T> {
        Ok(self.extreme_ordinal(|c, b| c < b)?.1)
    }

    /// 1-based multi-index of the largest element, first occurrence on
    /// ties.
    pub fn arg_max_element(&self) -> Result<Vec<usize>> {
        let (ordinal, _) = self.extreme_ordinal(|c, b| c > b)?;
        Ok(self.index_of_ordinal(ordinal))
    }

    /// 1-based multi-index of the smallest element, first occurrence on
    /// ties.
    pub fn arg_min_element(&self) -> Result<Vec<usize>> {
        let (ordinal, _) = self.extreme_ordinal(|c, b| c < b)?;
        Ok(self.index_of_ordinal(ordinal))
    }

    /// Layout-order ordinal and value of the first strictly-best element.
    fn extreme_ordinal(&self, better: impl Fn(T, T) -> bool) -> Result<(usize, T)> {
        if self.rank() == 0 {
            return Err(TensorError::bad_dimension(
                "cannot reduce a scalar view; it has no dimensions",
            ));
        }
        if self.size() == 0 {
            return Err(TensorError::bad_dimension(
                "cannot reduce a view with no elements",
            ));
        }
        self.storage.with_read(|data| {
            let mut best = T::default();
            let mut best_ordinal = 0;
            for (ordinal, position) in self.layout.positions().enumerate() {
                let candidate = data[position];
                if ordinal == 0 || better(candidate, best) {
                    best = candidate;
                    best_ordinal = ordinal;
                }
            }
            (best_ordinal, best)
        })
    }

    fn index_of_ordinal(&self, ordinal: usize) -> Vec<usize> {
        self.layout
            .unravel(ordinal)
            .into_iter()
            .map(|i| i + 1)
            .collect()
    }

    // ========================================================================
    // Matrix product
    // ========================================================================

    /// Matrix product of two rank-2 views into a fresh contiguous tensor.
    /// f32/f64 route through faer; integer types run a wrapping loop.
    ///
    /// # Example
    ///
    /// ```
    /// use gridtensor::Tensor;
    ///
    /// let a = Tensor::from_data(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2])?;
    /// let b = Tensor::from_data(&[5.0f64, 6.0, 7.0, 8.0], &[2, 2])?;
    /// assert_eq!(a.mmul(&b)?.to_vec()?, vec![19.0, 22.0, 43.0, 50.0]);
    /// # Ok::<(), gridtensor::TensorError>(())
    /// ```
    pub fn mmul(&self, other: &Tensor<T>) -> Result<Tensor<T>> {
        if self.rank() != 2 || other.rank() != 2 || self.shape()[1] != other.shape()[0] {
            return Err(TensorError::DimensionMismatch {
                left: self.shape().to_vec(),
                right: other.shape().to_vec(),
            });
        }
        let (m, k) = (self.shape()[0], self.shape()[1]);
        let n = other.shape()[1];
        // Copying out first makes strided and aliasing operands safe.
        let a = self.to_vec()?;
        let b = other.to_vec()?;
        let c = T::matmul(&a, &b, m, k, n);
        Ok(Tensor::from_parts(
            Storage::from_vec(c),
            Layout::contiguous(&[m, n]),
        ))
    }

    // ========================================================================
    // Shuffle
    // ========================================================================

    /// Fisher–Yates permutation of a rank-1 view, in place, drawing from
    /// `rng`. Empty and single-element views are untouched.
    pub fn shuffle<R: Rng>(&mut self, rng: &mut R) -> Result<()> {
        if self.rank() != 1 {
            return Err(TensorError::bad_dimension(format!(
                "shuffle requires a rank-1 view, this one has shape {:?}",
                self.shape()
            )));
        }
        let count = self.size();
        let offset = self.layout.offset() as isize;
        let step = self.strides()[0];
        let at = |k: usize| (offset + k as isize * step) as usize;
        self.storage.with_write(|data| {
            for i in 1..count {
                let j = rng.gen_range(0..=count - i);
                data.swap(at(count - i), at(j));
            }
        })
    }

    // ========================================================================
    // Rounding and clamping (in place)
    // ========================================================================

    /// Round every element down; identity on integer types.
    pub fn floor(&mut self) -> Result<()> {
        self.apply(T::floor)
    }

    /// Round every element up; identity on integer types.
    pub fn ceil(&mut self) -> Result<()> {
        self.apply(T::ceil)
    }

    /// Round every element to the nearest integral value, ties away from
    /// zero; identity on integer types.
    pub fn round(&mut self) -> Result<()> {
        self.apply(T::round)
    }

    /// Limit every element to `[min, max]`; an absent bound leaves that
    /// side unconstrained and NaN elements pass through unchanged.
    pub fn clamp(&mut self, min: Option<T>, max: Option<T>) -> Result<()> {
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(TensorError::InvalidClampBounds {
                    min: lo.to_string(),
                    max: hi.to_string(),
                });
            }
        }
        self.apply(|v| {
            let v = match min {
                Some(lo) if v < lo => lo,
                _ => v,
            };
            match max {
                Some(hi) if v > hi => hi,
                _ => v,
            }
        })
    }
}

/// One reduction lane: `extent` elements from storage position `start`,
/// `stride` apart.
#[derive(Clone, Copy)]
struct Lane {
    start: usize,
    stride: isize,
    extent: usize,
}

/// Value and 1-based index of the first strictly-best element of a lane.
fn lane_extreme<T: Element>(data: &[T], lane: Lane, better: impl Fn(T, T) -> bool) -> (T, i64) {
    let mut best = data[lane.start];
    let mut best_at = 1i64;
    let mut position = lane.start as isize;
    for i in 1..lane.extent {
        position += lane.stride;
        let candidate = data[position as usize];
        if better(candidate, best) {
            best = candidate;
            best_at = i as i64 + 1;
        }
    }
    (best, best_at)
}

/// Row-major matrix product accumulated in `T`'s own arithmetic.
///
/// Computes C = A · B where A is m×k, B is k×n, C is m×n. Element (i, j)
/// of an r×c matrix sits at index i · c + j.
pub(crate) fn generic_matmul<T: Element>(
    a: &[T],
    b: &[T],
    m: usize,
    k: usize,
    n: usize,
) -> Vec<T> {
    let mut c = vec![T::default(); m * n];
    for i in 0..m {
        for j in 0..n {
            let mut acc = T::default();
            for p in 0..k {
                acc = acc.add(a[i * k + p].mul(b[p * n + j]));
            }
            c[i * n + j] = acc;
        }
    }
    c
}

/// Matrix product through faer for f32, row-major operands and result.
pub(crate) fn faer_matmul_f32(a: &[f32], b: &[f32], m: usize, k: usize, n: usize) -> Vec<f32> {
    use faer::Mat;

    let a_mat = Mat::from_fn(m, k, |i, j| a[i * k + j]);
    let b_mat = Mat::from_fn(k, n, |i, j| b[i * n + j]);

    let c_mat = &a_mat * &b_mat;

    let mut c = vec![0.0f32; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = c_mat[(i, j)];
        }
    }
    c
}

/// Matrix product through faer for f64, row-major operands and result.
pub(crate) fn faer_matmul_f64(a: &[f64], b: &[f64], m: usize, k: usize, n: usize) -> Vec<f64> {
    use faer::Mat;

    let a_mat = Mat::from_fn(m, k, |i, j| a[i * k + j]);
    let b_mat = Mat::from_fn(k, n, |i, j| b[i * n + j]);

    let c_mat = &a_mat * &b_mat;

    let mut c = vec![0.0f64; m * n];
    for i in 0..m {
        for j in 0..n {
            c[i * n + j] = c_mat[(i, j)];
        }
    }
    c
}
