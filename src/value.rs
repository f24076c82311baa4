//! Nested value trees for literal construction and `values()` round-trips.

use crate::error::{Result, TensorError};

/// A recursively nested scalar-or-sequence value.
///
/// Mirrors a tensor's shape: a rank-0 view reads as a `Scalar`, a rank-R
/// view as R levels of `Seq`. Literal construction infers its shape from
/// one of these trees; `values()` produces one.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Scalar(T),
    Seq(Vec<Nested<T>>),
}

impl<T: Copy> Nested<T> {
    /// Infer the shape of this tree.
    ///
    /// Every sibling at a given depth must have the same shape; the error
    /// names the 1-based position of the first entry that disagrees with
    /// its leading sibling. A scalar has shape `[]`, an empty sequence
    /// `[0]`.
    pub fn shape(&self) -> Result<Vec<usize>> {
        let mut path = Vec::new();
        self.shape_at(&mut path)
    }

    fn shape_at(&self, path: &mut Vec<usize>) -> Result<Vec<usize>> {
        match self {
            Nested::Scalar(_) => Ok(Vec::new()),
            Nested::Seq(items) => {
                let first = match items.first() {
                    Some(first) => first,
                    None => return Ok(vec![0]),
                };
                path.push(1);
                let head = first.shape_at(path)?;
                path.pop();
                for (k, item) in items.iter().enumerate().skip(1) {
                    path.push(k + 1);
                    let got = item.shape_at(path)?;
                    if got != head {
                        return Err(TensorError::ShapeMismatch {
                            path: path.clone(),
                            expected: head,
                            got,
                        });
                    }
                    path.pop();
                }
                let mut shape = Vec::with_capacity(head.len() + 1);
                shape.push(items.len());
                shape.extend_from_slice(&head);
                Ok(shape)
            }
        }
    }

    /// Append every value to `out` in layout order (depth first).
    pub fn flatten_into(&self, out: &mut Vec<T>) {
        match self {
            Nested::Scalar(v) => out.push(*v),
            Nested::Seq(items) => {
                for item in items {
                    item.flatten_into(out);
                }
            }
        }
    }

    /// Build a tree of `shape` by drawing values in layout order.
    pub(crate) fn from_fn(shape: &[usize], next: &mut impl FnMut() -> T) -> Nested<T> {
        match shape.split_first() {
            None => Nested::Scalar(next()),
            Some((&extent, rest)) => {
                Nested::Seq((0..extent).map(|_| Nested::from_fn(rest, next)).collect())
            }
        }
    }

    /// Convert every value.
    pub fn map<U, F: Fn(T) -> U + Copy>(&self, f: F) -> Nested<U> {
        match self {
            Nested::Scalar(v) => Nested::Scalar(f(*v)),
            Nested::Seq(items) => Nested::Seq(items.iter().map(|item| item.map(f)).collect()),
        }
    }

    /// Convert every value with a fallible conversion, keeping the tree
    /// structure on success.
    pub fn try_map<U, F: Fn(T) -> Result<U> + Copy>(&self, f: F) -> Result<Nested<U>> {
        match self {
            Nested::Scalar(v) => Ok(Nested::Scalar(f(*v)?)),
            Nested::Seq(items) => Ok(Nested::Seq(
                items
                    .iter()
                    .map(|item| item.try_map(f))
                    .collect::<Result<_>>()?,
            )),
        }
    }
}
