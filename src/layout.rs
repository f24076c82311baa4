//! Shape/stride descriptors and layout-order traversal.
//!
//! A [`Layout`] maps multi-indices onto storage positions through per
//! dimension extents, signed strides, and a base offset. Layout transforms
//! (transpose, select, narrow, reverse, reshape) are pure descriptor
//! rewrites; no element ever moves. [`Layout::positions`] yields the
//! storage positions a view visits in row-major logical order (outermost
//! dimension slowest), which is the traversal every operation in the crate
//! is defined over.
//!
//! Indices here are 0-based; the public tensor API converts from its
//! 1-based convention before calling in.

/// Shape, strides, and base offset of one view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    shape: Vec<usize>,
    strides: Vec<isize>,
    offset: usize,
}

impl Layout {
    /// Contiguous row-major layout over `shape`, offset 0.
    pub fn contiguous(shape: &[usize]) -> Self {
        Layout {
            strides: contiguous_strides(shape),
            shape: shape.to_vec(),
            offset: 0,
        }
    }

    pub(crate) fn from_parts(shape: Vec<usize>, strides: Vec<isize>, offset: usize) -> Self {
        debug_assert_eq!(shape.len(), strides.len());
        Layout {
            shape,
            strides,
            offset,
        }
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Per-dimension extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Per-dimension strides, in elements.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        &self.strides
    }

    /// Base offset into storage, in elements.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of elements addressed (product of extents; 1 for rank 0).
    #[inline]
    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    /// The constant step between consecutive layout-order positions, if one
    /// exists. Contiguous views report 1, reversed-contiguous views -1,
    /// uniformly strided windows their step. `None` for layouts that need
    /// the full counter walk.
    pub fn linear_stride(&self) -> Option<isize> {
        if self.size() == 0 {
            return Some(1);
        }
        // Extent-1 dimensions never move the cursor, so their strides are
        // unconstrained.
        let mut step = 1isize;
        let mut expected = 0isize;
        let mut seen = false;
        for i in (0..self.rank()).rev() {
            if self.shape[i] == 1 {
                continue;
            }
            if !seen {
                step = self.strides[i];
                if step == 0 {
                    return None;
                }
                seen = true;
            } else if self.strides[i] != expected {
                return None;
            }
            expected = self.strides[i] * self.shape[i] as isize;
        }
        Some(step)
    }

    /// Whether row-major traversal visits consecutive ascending unit
    /// positions. The base offset is irrelevant: a narrowed window with
    /// unit steps is contiguous.
    pub fn is_contiguous(&self) -> bool {
        self.linear_stride() == Some(1)
    }

    /// Storage position of a 0-based multi-index.
    pub(crate) fn position_of(&self, index: &[usize]) -> usize {
        debug_assert_eq!(index.len(), self.rank());
        let mut position = self.offset as isize;
        for (i, stride) in index.iter().zip(&self.strides) {
            position += *i as isize * stride;
        }
        debug_assert!(position >= 0);
        position as usize
    }

    /// 0-based multi-index of the `ordinal`-th element in layout order.
    /// Valid only for non-empty layouts.
    pub(crate) fn unravel(&self, ordinal: usize) -> Vec<usize> {
        let mut index = vec![0usize; self.rank()];
        let mut rest = ordinal;
        for i in (0..self.rank()).rev() {
            index[i] = rest % self.shape[i];
            rest /= self.shape[i];
        }
        index
    }

    // ========================================================================
    // Transforms (0-based, validated by the caller)
    // ========================================================================

    pub(crate) fn transpose(&self, d1: usize, d2: usize) -> Layout {
        let mut out = self.clone();
        out.shape.swap(d1, d2);
        out.strides.swap(d1, d2);
        out
    }

    pub(crate) fn select(&self, dim: usize, index: usize) -> Layout {
        let mut shape = self.shape.clone();
        let mut strides = self.strides.clone();
        let offset = self.offset as isize + index as isize * self.strides[dim];
        shape.remove(dim);
        strides.remove(dim);
        debug_assert!(offset >= 0);
        Layout {
            shape,
            strides,
            offset: offset as usize,
        }
    }

    pub(crate) fn narrow(&self, dim: usize, start: usize, len: usize) -> Layout {
        let mut out = self.clone();
        let offset = self.offset as isize + start as isize * self.strides[dim];
        debug_assert!(offset >= 0);
        out.shape[dim] = len;
        out.offset = offset as usize;
        out
    }

    pub(crate) fn reverse(&self, dim: usize) -> Layout {
        let mut out = self.clone();
        if self.shape[dim] > 0 {
            let offset =
                self.offset as isize + (self.shape[dim] - 1) as isize * self.strides[dim];
            debug_assert!(offset >= 0);
            out.offset = offset as usize;
        }
        out.strides[dim] = -self.strides[dim];
        out
    }

    /// Reinterpret the addressed elements under `new_shape`. Requires a
    /// constant linear stride; the new strides follow the row-major pattern
    /// scaled by that step. `None` when the layout has no linear stride.
    pub(crate) fn reshape(&self, new_shape: &[usize]) -> Option<Layout> {
        let step = self.linear_stride()?;
        let mut strides = vec![step; new_shape.len()];
        for i in (0..new_shape.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * new_shape[i + 1] as isize;
        }
        Some(Layout {
            shape: new_shape.to_vec(),
            strides,
            offset: self.offset,
        })
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Iterator over the storage positions this layout visits, in row-major
    /// logical order. Lazy, exact-size, and restartable by calling again.
    pub fn positions(&self) -> Positions<'_> {
        let remaining = self.size();
        let repr = match self.linear_stride() {
            Some(step) => Repr::Linear {
                next: self.offset as isize,
                step,
            },
            None => Repr::Counters {
                shape: &self.shape,
                strides: &self.strides,
                counters: vec![0; self.shape.len()],
                offset: self.offset as isize,
            },
        };
        Positions { repr, remaining }
    }

    /// Layout-order walk passing the 0-based multi-index alongside each
    /// storage position. Used where the index itself matters; plain element
    /// traversals go through [`positions`](Layout::positions).
    pub(crate) fn for_each_indexed(&self, mut f: impl FnMut(&[usize], usize)) {
        let size = self.size();
        if size == 0 {
            return;
        }
        let rank = self.rank();
        let mut index = vec![0usize; rank];
        let mut offset = self.offset as isize;
        for _ in 0..size {
            f(&index, offset as usize);
            for i in (0..rank).rev() {
                index[i] += 1;
                offset += self.strides[i];
                if index[i] < self.shape[i] {
                    break;
                }
                index[i] = 0;
                offset -= self.strides[i] * self.shape[i] as isize;
            }
        }
    }
}

/// Row-major strides for `shape`: innermost dimension has stride 1.
pub(crate) fn contiguous_strides(shape: &[usize]) -> Vec<isize> {
    let mut strides = vec![1isize; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1] as isize;
    }
    strides
}

enum Repr<'a> {
    /// Constant-step layouts: one add per element.
    Linear { next: isize, step: isize },
    /// General layouts: nested counters, one per dimension.
    Counters {
        shape: &'a [usize],
        strides: &'a [isize],
        counters: Vec<usize>,
        offset: isize,
    },
}

/// Iterator over storage positions in row-major logical order.
///
/// Produced by [`Layout::positions`].
pub struct Positions<'a> {
    repr: Repr<'a>,
    remaining: usize,
}

impl Iterator for Positions<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        match &mut self.repr {
            Repr::Linear { next, step } => {
                let position = *next;
                *next += *step;
                debug_assert!(position >= 0);
                Some(position as usize)
            }
            Repr::Counters {
                shape,
                strides,
                counters,
                offset,
            } => {
                let position = *offset;
                for i in (0..shape.len()).rev() {
                    counters[i] += 1;
                    *offset += strides[i];
                    if counters[i] < shape[i] {
                        break;
                    }
                    counters[i] = 0;
                    *offset -= strides[i] * shape[i] as isize;
                }
                debug_assert!(position >= 0);
                Some(position as usize)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Positions<'_> {}
impl std::iter::FusedIterator for Positions<'_> {}
