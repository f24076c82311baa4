//! Strided tensor views over shared storage.
//!
//! A [`Tensor`] is a handle: shape, strides, and an offset over a shared
//! [`Storage`] buffer. Layout operations (transpose, select, narrow,
//! reverse, reshape) return new handles over the *same* buffer, so writes
//! through one view are visible through every other. Construction,
//! conversion, and `deep_clone` are the only entry points that allocate.
//!
//! All public dimension and index arguments are 1-based, matching the
//! convention of the scripting hosts this engine serves; `select(dim, 1)`
//! picks the first entry.

pub(crate) mod ops;

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::element::{Element, ElementType};
use crate::error::{Result, TensorError};
use crate::layout::Layout;
use crate::storage::{ExternalBuffer, Storage};
use crate::value::Nested;

/// Number of elements rendered by `Display` before truncating.
const MAX_DISPLAY_ELEMENTS: usize = 1024;

/// A multi-dimensional view over typed, shared storage.
///
/// Cloning a `Tensor` clones the handle: both clones address the same
/// storage (use [`deep_clone`](Tensor::deep_clone) for an independent
/// copy). Several views of different shapes may alias one buffer.
///
/// # Example
///
/// ```
/// use gridtensor::Tensor;
///
/// let t = Tensor::<f64>::from_range(1.0, 6.0, 1.0)?;
/// let mut m = t.reshape(&[2, 3])?;
/// m.transpose(1, 2)?.select(1, 2)?.fill(0.0)?; // zero the second column
/// assert_eq!(t.to_vec()?, vec![1.0, 0.0, 3.0, 4.0, 0.0, 6.0]);
/// # Ok::<(), gridtensor::TensorError>(())
/// ```
#[derive(Clone)]
pub struct Tensor<T: Element> {
    storage: Storage<T>,
    layout: Layout,
}

impl<T: Element> Tensor<T> {
    // ========================================================================
    // Constructors
    // ========================================================================

    /// Zero-initialized tensor with the given extents. No extents make a
    /// rank-0 scalar holding one element.
    pub fn with_extents(extents: &[usize]) -> Self {
        Tensor {
            storage: Storage::alloc(extents.iter().product()),
            layout: Layout::contiguous(extents),
        }
    }

    /// Rank-0 tensor holding `value`.
    pub fn scalar(value: T) -> Self {
        Tensor {
            storage: Storage::from_vec(vec![value]),
            layout: Layout::contiguous(&[]),
        }
    }

    /// Tensor over a copy of `data`, read in layout order.
    pub fn from_data(data: &[T], extents: &[usize]) -> Result<Self> {
        let size: usize = extents.iter().product();
        if data.len() != size {
            return Err(TensorError::mismatch(format!(
                "data length {} does not match shape {:?} ({} elements)",
                data.len(),
                extents,
                size
            )));
        }
        Ok(Tensor {
            storage: Storage::from_vec(data.to_vec()),
            layout: Layout::contiguous(extents),
        })
    }

    /// Tensor from a nested value tree, inferring the shape from the
    /// nesting. Every sibling sequence at a given depth must have the same
    /// shape.
    ///
    /// # Example
    ///
    /// ```
    /// use gridtensor::{Nested, Tensor};
    ///
    /// let tree = Nested::Seq(vec![
    ///     Nested::Seq(vec![Nested::Scalar(1u8), Nested::Scalar(2)]),
    ///     Nested::Seq(vec![Nested::Scalar(3), Nested::Scalar(4)]),
    /// ]);
    /// let t = Tensor::from_values(&tree)?;
    /// assert_eq!(t.shape(), &[2, 2]);
    /// # Ok::<(), gridtensor::TensorError>(())
    /// ```
    pub fn from_values(values: &Nested<T>) -> Result<Self> {
        let shape = values.shape()?;
        let mut data = Vec::with_capacity(shape.iter().product());
        values.flatten_into(&mut data);
        Ok(Tensor {
            storage: Storage::from_vec(data),
            layout: Layout::contiguous(&shape),
        })
    }

    /// Rank-1 tensor spanning `from..=to` in steps of `step`.
    ///
    /// The element count is ⌊(to−from)/step⌋+1 and each element
    /// from+(k−1)·step is rounded to `T` individually. Both are evaluated
    /// on the parameters *after* conversion to `T`, so a low-precision
    /// target can merge, truncate, or extend the sequence relative to f64
    /// arithmetic: `Tensor::<f32>::from_range(3.0e8, 300000001.0, 0.5)`
    /// holds the single element `3.0e8` because the bounds collapse in f32.
    ///
    /// Fails when `step` is zero or the range contains no elements.
    pub fn from_range(from: T, to: T, step: T) -> Result<Self> {
        let from_f = from.to_f64();
        let step_f = step.to_f64();
        let span = to.to_f64() - from_f;
        if step_f == 0.0 {
            return Err(TensorError::out_of_bounds(format!(
                "invalid range {{{from}, {to}, {step}}}: step must be non-zero"
            )));
        }
        let count = (span / step_f).floor() + 1.0;
        if !(count >= 1.0) {
            return Err(TensorError::out_of_bounds(format!(
                "invalid range {{{from}, {to}, {step}}}: no elements"
            )));
        }
        let count = count as usize;
        let mut data = Vec::with_capacity(count);
        for k in 0..count {
            data.push(T::from_f64_rounded(from_f + k as f64 * step_f));
        }
        Ok(Tensor {
            storage: Storage::from_vec(data),
            layout: Layout::contiguous(&[count]),
        })
    }

    /// Rank-1 tensor read from a file of raw `T` values in host-native
    /// byte order, starting at `byte_offset`. `element_count` defaults to
    /// every remaining whole element.
    ///
    /// # Errors
    ///
    /// `RangeOutOfBounds` when the file cannot be read, `byte_offset` lies
    /// past the end, or the requested window exceeds the file size.
    pub fn from_file<P: AsRef<Path>>(
        path: P,
        byte_offset: u64,
        element_count: Option<usize>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let elem_size = std::mem::size_of::<T>() as u64;
        let read_err = |e: std::io::Error| {
            TensorError::out_of_bounds(format!("cannot read '{}': {e}", path.display()))
        };

        let mut file = File::open(path).map_err(read_err)?;
        let file_size = file.metadata().map_err(read_err)?.len();
        if byte_offset > file_size {
            return Err(TensorError::out_of_bounds(format!(
                "byteOffset {byte_offset} exceeds the {file_size} bytes of '{}'",
                path.display()
            )));
        }
        let available = (file_size - byte_offset) / elem_size;
        let count = match element_count {
            Some(n) => n as u64,
            None => available,
        };
        if count > available {
            return Err(TensorError::out_of_bounds(format!(
                "elementCount {count} exceeds the {available} elements left in '{}' at byteOffset {byte_offset}",
                path.display()
            )));
        }

        file.seek(SeekFrom::Start(byte_offset)).map_err(read_err)?;
        let mut bytes = vec![0u8; (count * elem_size) as usize];
        file.read_exact(&mut bytes).map_err(read_err)?;

        let mut data = vec![T::default(); count as usize];
        bytemuck::cast_slice_mut::<T, u8>(&mut data).copy_from_slice(&bytes);
        debug!("loaded {} x {} from '{}'", count, T::TYPE, path.display());
        Ok(Tensor {
            storage: Storage::from_vec(data),
            layout: Layout::contiguous(&[count as usize]),
        })
    }

    /// View borrowing an [`ExternalBuffer`]. The extents must account for
    /// exactly the buffer's length. Once the owner releases the buffer,
    /// every access through this view fails with `InvalidStorage`.
    pub fn borrowed(buffer: &ExternalBuffer<T>, extents: &[usize]) -> Result<Self> {
        let size: usize = extents.iter().product();
        if size != buffer.len() {
            return Err(TensorError::mismatch(format!(
                "shape {:?} needs {} elements but the external buffer holds {}",
                extents,
                size,
                buffer.len()
            )));
        }
        Ok(Tensor {
            storage: buffer.storage(),
            layout: Layout::contiguous(extents),
        })
    }

    pub(crate) fn from_parts(storage: Storage<T>, layout: Layout) -> Self {
        Tensor { storage, layout }
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// The element type tag.
    #[inline]
    pub fn element_type(&self) -> ElementType {
        T::TYPE
    }

    /// Per-dimension extents.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        self.layout.shape()
    }

    /// Per-dimension strides, in elements.
    #[inline]
    pub fn strides(&self) -> &[isize] {
        self.layout.strides()
    }

    /// Number of dimensions.
    #[inline]
    pub fn rank(&self) -> usize {
        self.layout.rank()
    }

    /// Number of elements addressed (1 for rank 0).
    #[inline]
    pub fn size(&self) -> usize {
        self.layout.size()
    }

    /// Whether layout order visits consecutive ascending unit storage
    /// positions.
    pub fn is_contiguous(&self) -> bool {
        self.layout.is_contiguous()
    }

    /// Whether this view owns its storage (as opposed to borrowing an
    /// external buffer).
    pub fn is_owned(&self) -> bool {
        self.storage.is_owned()
    }

    /// Diagnostic check that the backing storage is still accessible.
    /// Access paths do not consult this; they fail with `InvalidStorage`
    /// themselves.
    pub fn is_valid(&self) -> bool {
        self.storage.is_valid()
    }

    pub(crate) fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn storage(&self) -> &Storage<T> {
        &self.storage
    }

    // ========================================================================
    // Element access
    // ========================================================================

    /// Copy the elements into a `Vec` in layout order.
    pub fn to_vec(&self) -> Result<Vec<T>> {
        self.storage
            .with_read(|data| self.layout.positions().map(|p| data[p]).collect())
    }

    /// The single element of a rank-0 view.
    pub fn item(&self) -> Result<T> {
        if self.rank() != 0 {
            return Err(TensorError::bad_dimension(format!(
                "item() requires a rank-0 view, this one has shape {:?}",
                self.shape()
            )));
        }
        let position = self.layout.offset();
        self.storage.with_read(|data| data[position])
    }

    /// Write the single element of a rank-0 view.
    pub fn set_item(&mut self, value: T) -> Result<()> {
        if self.rank() != 0 {
            return Err(TensorError::bad_dimension(format!(
                "set_item() requires a rank-0 view, this one has shape {:?}",
                self.shape()
            )));
        }
        let position = self.layout.offset();
        self.storage.with_write(|data| data[position] = value)
    }

    /// Read one element by full 1-based multi-index.
    pub fn get(&self, index: &[usize]) -> Result<T> {
        let position = self.checked_position(index)?;
        self.storage.with_read(|data| data[position])
    }

    /// Write one element by full 1-based multi-index.
    pub fn set(&mut self, index: &[usize], value: T) -> Result<()> {
        let position = self.checked_position(index)?;
        self.storage.with_write(|data| data[position] = value)
    }

    /// Sub-view addressed by a leading 1-based index per dimension:
    /// `t.at(&[2])` is the second row, `t.at(&[2, 3])` the rank-0 cell at
    /// row 2, column 3.
    pub fn at(&self, index: &[usize]) -> Result<Tensor<T>> {
        let mut view = self.clone();
        for &i in index {
            view = view.select(1, i)?;
        }
        Ok(view)
    }

    /// Read the whole view as a nested value tree: the single element for
    /// rank 0, otherwise one `Seq` level per dimension.
    pub fn values(&self) -> Result<Nested<T>> {
        let flat = self.to_vec()?;
        let mut cursor = 0;
        Ok(Nested::from_fn(self.shape(), &mut || {
            let v = flat[cursor];
            cursor += 1;
            v
        }))
    }

    /// Write the whole view from a nested value tree whose shape matches
    /// exactly; elements are assigned in layout order.
    pub fn set_values(&mut self, values: &Nested<T>) -> Result<()> {
        let got = values.shape()?;
        if got != self.shape() {
            return Err(TensorError::ShapeMismatch {
                path: vec![],
                expected: self.shape().to_vec(),
                got,
            });
        }
        let mut flat = Vec::with_capacity(self.size());
        values.flatten_into(&mut flat);
        self.storage.with_write(|data| {
            for (value, position) in flat.iter().zip(self.layout.positions()) {
                data[position] = *value;
            }
        })
    }

    /// Replace every element with `f(element)`, in layout order.
    pub fn apply(&mut self, mut f: impl FnMut(T) -> T) -> Result<()> {
        self.storage.with_write(|data| {
            for position in self.layout.positions() {
                data[position] = f(data[position]);
            }
        })
    }

    /// Replace every element with `f(index, element)`, where `index` is
    /// the 1-based multi-index of the element.
    pub fn apply_indexed(&mut self, mut f: impl FnMut(&[usize], T) -> T) -> Result<()> {
        let mut index1 = vec![0usize; self.rank()];
        self.storage.with_write(|data| {
            self.layout.for_each_indexed(|index, position| {
                for (out, i) in index1.iter_mut().zip(index) {
                    *out = i + 1;
                }
                data[position] = f(&index1, data[position]);
            });
        })
    }

    // ========================================================================
    // Layout views (zero-copy)
    // ========================================================================

    /// Swap two 1-based dimensions. Zero-copy; the result aliases this
    /// view's storage.
    pub fn transpose(&self, d1: usize, d2: usize) -> Result<Tensor<T>> {
        let a = self.checked_dim(d1)?;
        let b = self.checked_dim(d2)?;
        Ok(Tensor {
            storage: self.storage.clone(),
            layout: self.layout.transpose(a, b),
        })
    }

    /// Drop dimension `dim`, fixing it to the 1-based `index`. Zero-copy.
    pub fn select(&self, dim: usize, index: usize) -> Result<Tensor<T>> {
        let d = self.checked_dim(dim)?;
        let i = self.checked_index(d, index)?;
        Ok(Tensor {
            storage: self.storage.clone(),
            layout: self.layout.select(d, i),
        })
    }

    /// Restrict dimension `dim` to `len` entries starting at the 1-based
    /// `index`. Zero-copy.
    pub fn narrow(&self, dim: usize, index: usize, len: usize) -> Result<Tensor<T>> {
        let d = self.checked_dim(dim)?;
        let extent = self.shape()[d];
        if index < 1 || (index - 1) + len > extent {
            return Err(TensorError::bad_dimension(format!(
                "narrow window [{index}, {}] exceeds extent {extent} of dimension {dim}",
                index + len.max(1) - 1
            )));
        }
        Ok(Tensor {
            storage: self.storage.clone(),
            layout: self.layout.narrow(d, index - 1, len),
        })
    }

    /// Flip dimension `dim`. Zero-copy; the stride turns negative.
    pub fn reverse(&self, dim: usize) -> Result<Tensor<T>> {
        let d = self.checked_dim(dim)?;
        Ok(Tensor {
            storage: self.storage.clone(),
            layout: self.layout.reverse(d),
        })
    }

    /// Reinterpret the same elements under new extents. Zero-copy, but
    /// only defined for views with a constant step between consecutive
    /// elements (contiguous or uniformly strided).
    pub fn reshape(&self, extents: &[usize]) -> Result<Tensor<T>> {
        let size: usize = extents.iter().product();
        if size != self.size() {
            return Err(TensorError::mismatch(format!(
                "reshape from {:?} ({} elements) to {:?} ({} elements)",
                self.shape(),
                self.size(),
                extents,
                size
            )));
        }
        match self.layout.reshape(extents) {
            Some(layout) => Ok(Tensor {
                storage: self.storage.clone(),
                layout,
            }),
            None => Err(TensorError::bad_dimension(
                "reshape requires a constant stride between consecutive elements",
            )),
        }
    }

    // ========================================================================
    // Conversion
    // ========================================================================

    /// Copy into fresh contiguous owned storage of element type `U`,
    /// converting each value with `as`-cast semantics.
    pub fn convert<U: Element>(&self) -> Result<Tensor<U>> {
        let data: Vec<U> = self
            .storage
            .with_read(|data| {
                self.layout
                    .positions()
                    .map(|p| U::from_element(data[p]))
                    .collect()
            })?;
        Ok(Tensor {
            storage: Storage::from_vec(data),
            layout: Layout::contiguous(self.shape()),
        })
    }

    /// Independent copy: same shape and values in fresh contiguous owned
    /// storage. Contrast with `clone()`, which shares storage.
    pub fn deep_clone(&self) -> Result<Tensor<T>> {
        self.convert::<T>()
    }

    // ========================================================================
    // Validation helpers
    // ========================================================================

    /// 1-based dimension argument to 0-based.
    fn checked_dim(&self, dim: usize) -> Result<usize> {
        if dim < 1 || dim > self.rank() {
            return Err(TensorError::bad_dimension(format!(
                "dimension {} out of range 0 < dim <= {}",
                dim,
                self.rank()
            )));
        }
        Ok(dim - 1)
    }

    /// 1-based index into 0-based dimension `d`.
    fn checked_index(&self, d: usize, index: usize) -> Result<usize> {
        let extent = self.shape()[d];
        if index < 1 || index > extent {
            return Err(TensorError::bad_dimension(format!(
                "index {} out of range 1..={} in dimension {}",
                index,
                extent,
                d + 1
            )));
        }
        Ok(index - 1)
    }

    /// Storage position of a full 1-based multi-index.
    fn checked_position(&self, index: &[usize]) -> Result<usize> {
        if index.len() != self.rank() {
            return Err(TensorError::bad_dimension(format!(
                "index {:?} has {} entries, expected {}",
                index,
                index.len(),
                self.rank()
            )));
        }
        let mut zero_based = Vec::with_capacity(index.len());
        for (d, &i) in index.iter().enumerate() {
            zero_based.push(self.checked_index(d, i)?);
        }
        Ok(self.layout.position_of(&zero_based))
    }
}

impl<T: Element> PartialEq for Tensor<T> {
    /// Views are equal when their shapes and every corresponding logical
    /// element agree; strides, offsets, and storage identity play no part.
    /// Views whose borrowed storage has been released compare unequal.
    fn eq(&self, other: &Self) -> bool {
        if self.shape() != other.shape() {
            return false;
        }
        self.storage
            .with_read_pair(&other.storage, |lhs, rhs| {
                self.layout
                    .positions()
                    .zip(other.layout.positions())
                    .all(|(a, b)| lhs[a] == rhs[b])
            })
            .unwrap_or(false)
    }
}

impl<T: Element> fmt::Debug for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("element_type", &T::TYPE)
            .field("shape", &self.shape())
            .field("strides", &self.strides())
            .field("offset", &self.layout.offset())
            .field("contiguous", &self.is_contiguous())
            .field("owned", &self.is_owned())
            .finish()
    }
}

impl<T: Element> fmt::Display for Tensor<T> {
    /// Nested bracket rendering in layout order, truncated past
    /// [`MAX_DISPLAY_ELEMENTS`] elements.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?} ", T::TYPE, self.shape())?;
        let flat = match self.to_vec() {
            Ok(flat) => flat,
            Err(_) => return f.write_str("<invalid storage>"),
        };
        let mut cursor = 0;
        fmt_level(f, self.shape(), &flat, &mut cursor)
    }
}

fn fmt_level<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    shape: &[usize],
    flat: &[T],
    cursor: &mut usize,
) -> fmt::Result {
    match shape.split_first() {
        None => {
            let v = &flat[*cursor];
            *cursor += 1;
            write!(f, "{v}")
        }
        Some((&extent, rest)) => {
            f.write_str("[")?;
            for i in 0..extent {
                if i > 0 {
                    f.write_str(", ")?;
                }
                if *cursor >= MAX_DISPLAY_ELEMENTS {
                    f.write_str("...")?;
                    break;
                }
                fmt_level(f, rest, flat, cursor)?;
            }
            f.write_str("]")
        }
    }
}
