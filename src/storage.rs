//! Shared storage buffers behind tensor views.
//!
//! A [`Storage`] is either *owned* (reference counted, released when the
//! last view drops) or *borrowed* from an [`ExternalBuffer`] whose owner
//! controls the lifetime. Borrowed storage holds only a weak handle: once
//! the owner releases the buffer, every access through a borrowed view
//! fails with [`TensorError::InvalidStorage`] instead of touching freed
//! data. There is deliberately no validity probe on the access path — each
//! read or write attempts the upgrade itself, so lifetime bugs surface as
//! errors rather than being masked by a stale check.

use std::sync::{Arc, Weak};

use log::trace;
use parking_lot::RwLock;

use crate::element::Element;
use crate::error::{Result, TensorError};

type Buffer<T> = Arc<RwLock<Vec<T>>>;

#[derive(Clone)]
enum Handle<T> {
    Owned(Buffer<T>),
    Borrowed(Weak<RwLock<Vec<T>>>),
}

/// Typed storage shared by every view derived from it.
///
/// Cloning a `Storage` clones the handle, not the data; all clones address
/// the same buffer.
#[derive(Clone)]
pub struct Storage<T: Element> {
    handle: Handle<T>,
    len: usize,
}

impl<T: Element> Storage<T> {
    /// Allocate zero-initialized owned storage for `len` elements.
    pub fn alloc(len: usize) -> Self {
        trace!("alloc {} x {}", len, T::TYPE);
        Self::from_vec(vec![T::default(); len])
    }

    /// Wrap owned storage around existing data.
    pub fn from_vec(data: Vec<T>) -> Self {
        let len = data.len();
        Storage {
            handle: Handle::Owned(Arc::new(RwLock::new(data))),
            len,
        }
    }

    /// Number of elements the buffer was created with.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether this handle owns its buffer.
    pub fn is_owned(&self) -> bool {
        matches!(self.handle, Handle::Owned(_))
    }

    /// Diagnostic check: true for owned storage, and for borrowed storage
    /// while its external owner is alive. Access paths do not consult this;
    /// they re-attempt the upgrade themselves.
    pub fn is_valid(&self) -> bool {
        match &self.handle {
            Handle::Owned(_) => true,
            Handle::Borrowed(weak) => weak.strong_count() > 0,
        }
    }

    /// Whether two handles address the same underlying buffer.
    pub(crate) fn same_buffer(&self, other: &Storage<T>) -> bool {
        match (self.buffer(), other.buffer()) {
            (Ok(a), Ok(b)) => Arc::ptr_eq(&a, &b),
            _ => false,
        }
    }

    fn buffer(&self) -> Result<Buffer<T>> {
        match &self.handle {
            Handle::Owned(arc) => Ok(Arc::clone(arc)),
            Handle::Borrowed(weak) => weak.upgrade().ok_or(TensorError::InvalidStorage),
        }
    }

    /// Run `f` with read access to the elements.
    pub(crate) fn with_read<R>(&self, f: impl FnOnce(&[T]) -> R) -> Result<R> {
        let buffer = self.buffer()?;
        let guard = buffer.read();
        Ok(f(&guard))
    }

    /// Run `f` with write access to the elements.
    pub(crate) fn with_write<R>(&self, f: impl FnOnce(&mut [T]) -> R) -> Result<R> {
        let buffer = self.buffer()?;
        let mut guard = buffer.write();
        Ok(f(&mut guard))
    }

    /// Run `f` with read access to two storages. When both handles address
    /// the same buffer a single guard is taken and `f` receives it twice.
    pub(crate) fn with_read_pair<R>(
        &self,
        other: &Storage<T>,
        f: impl FnOnce(&[T], &[T]) -> R,
    ) -> Result<R> {
        let lhs = self.buffer()?;
        let rhs = other.buffer()?;
        if Arc::ptr_eq(&lhs, &rhs) {
            let guard = lhs.read();
            Ok(f(&guard, &guard))
        } else {
            let lg = lhs.read();
            let rg = rhs.read();
            Ok(f(&lg, &rg))
        }
    }

    /// Run `f` with write access to `self` and read access to `other`.
    /// When both handles address the same buffer, `f` receives `None` for
    /// the read side and must read through the write slice.
    pub(crate) fn with_write_read<R>(
        &self,
        other: &Storage<T>,
        f: impl FnOnce(&mut [T], Option<&[T]>) -> R,
    ) -> Result<R> {
        let lhs = self.buffer()?;
        let rhs = other.buffer()?;
        if Arc::ptr_eq(&lhs, &rhs) {
            let mut guard = lhs.write();
            Ok(f(&mut guard, None))
        } else {
            let mut lg = lhs.write();
            let rg = rhs.read();
            Ok(f(&mut lg, Some(&rg)))
        }
    }
}

impl<T: Element> std::fmt::Debug for Storage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("element_type", &T::TYPE)
            .field("len", &self.len)
            .field("owned", &self.is_owned())
            .field("valid", &self.is_valid())
            .finish()
    }
}

/// Owner-side handle for storage lent to the engine.
///
/// Views created from an `ExternalBuffer` borrow its data: they read and
/// write the owner's buffer in place, and every one of them is revoked the
/// moment the owner drops (or [`release`](ExternalBuffer::release)s) the
/// handle.
///
/// # Example
///
/// ```
/// use gridtensor::{ExternalBuffer, Tensor, TensorError};
///
/// let owner = ExternalBuffer::new(vec![0.0f64; 6]);
/// let mut view = Tensor::borrowed(&owner, &[2, 3])?;
/// view.fill(1.5)?;
/// assert_eq!(owner.with_data(|d| d[0]), 1.5);
///
/// owner.release();
/// assert_eq!(view.sum(), Err(TensorError::InvalidStorage));
/// # Ok::<(), TensorError>(())
/// ```
pub struct ExternalBuffer<T: Element> {
    data: Buffer<T>,
}

impl<T: Element> ExternalBuffer<T> {
    /// Take ownership of `data` on the external side.
    pub fn new(data: Vec<T>) -> Self {
        ExternalBuffer {
            data: Arc::new(RwLock::new(data)),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read access to the current contents, including any mutation done
    /// through borrowed views.
    pub fn with_data<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.data.read())
    }

    /// Revoke every borrowed view. Equivalent to dropping the handle.
    pub fn release(self) {
        trace!("releasing external buffer of {} x {}", self.len(), T::TYPE);
    }

    /// A borrowed storage handle over this buffer.
    pub(crate) fn storage(&self) -> Storage<T> {
        Storage {
            handle: Handle::Borrowed(Arc::downgrade(&self.data)),
            len: self.data.read().len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_storage_access() {
        let storage = Storage::from_vec(vec![1.0f64, 2.0, 3.0]);
        assert_eq!(storage.len(), 3);
        assert!(storage.is_owned());
        assert!(storage.is_valid());

        let sum = storage.with_read(|d| d.iter().sum::<f64>()).unwrap();
        assert_eq!(sum, 6.0);

        storage.with_write(|d| d[1] = 5.0).unwrap();
        assert_eq!(storage.with_read(|d| d[1]).unwrap(), 5.0);
    }

    #[test]
    fn test_alloc_zero_initialized() {
        let storage = Storage::<i32>::alloc(4);
        assert_eq!(storage.with_read(|d| d.to_vec()).unwrap(), vec![0; 4]);
    }

    #[test]
    fn test_clone_shares_buffer() {
        let a = Storage::from_vec(vec![1u8, 2, 3]);
        let b = a.clone();
        assert!(a.same_buffer(&b));
        b.with_write(|d| d[0] = 9).unwrap();
        assert_eq!(a.with_read(|d| d[0]).unwrap(), 9);

        let c = Storage::from_vec(vec![1u8, 2, 3]);
        assert!(!a.same_buffer(&c));
    }

    #[test]
    fn test_borrowed_storage_revocation() {
        let owner = ExternalBuffer::new(vec![1i64, 2, 3]);
        let storage = owner.storage();
        assert!(!storage.is_owned());
        assert!(storage.is_valid());
        assert_eq!(storage.with_read(|d| d[2]).unwrap(), 3);

        drop(owner);
        assert!(!storage.is_valid());
        assert_eq!(
            storage.with_read(|d| d[2]).unwrap_err(),
            TensorError::InvalidStorage
        );
        assert_eq!(
            storage.with_write(|d| d[0] = 0).unwrap_err(),
            TensorError::InvalidStorage
        );
    }

    #[test]
    fn test_owner_observes_writes() {
        let owner = ExternalBuffer::new(vec![0.0f32; 3]);
        let storage = owner.storage();
        storage.with_write(|d| d[1] = 2.5).unwrap();
        assert_eq!(owner.with_data(|d| d.to_vec()), vec![0.0, 2.5, 0.0]);
    }

    #[test]
    fn test_same_buffer_pair_access() {
        let a = Storage::from_vec(vec![1i16, 2, 3]);
        let b = a.clone();
        let total = a
            .with_read_pair(&b, |x, y| {
                x.iter().zip(y).map(|(p, q)| p + q).sum::<i16>()
            })
            .unwrap();
        assert_eq!(total, 12);

        a.with_write_read(&b, |dst, src| {
            assert!(src.is_none());
            dst[0] = 7;
        })
        .unwrap();
        assert_eq!(a.with_read(|d| d[0]).unwrap(), 7);
    }
}
