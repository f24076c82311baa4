//! Storage lifetime tests: borrowed buffers, revocation, and ownership.
//!
//! A view over an [`ExternalBuffer`] holds only a weak handle. The owner
//! revoking the buffer must turn every subsequent element access into
//! `InvalidStorage`, never into a read of freed data.

use gridtensor::{ExternalBuffer, Tensor, TensorError};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// Borrowed views
// ============================================================================

#[test]
fn test_borrowed_view_shares_the_owner_buffer() {
    let owner = ExternalBuffer::new(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let mut view = Tensor::borrowed(&owner, &[2, 3]).unwrap();
    assert!(!view.is_owned());
    assert!(view.is_valid());
    assert_eq!(view.get(&[2, 1]).unwrap(), 4.0);

    view.set(&[1, 1], 9.0).unwrap();
    view.select(1, 2).unwrap().fill(0.0).unwrap();
    assert_eq!(
        owner.with_data(|d| d.to_vec()),
        vec![9.0, 2.0, 3.0, 0.0, 0.0, 0.0]
    );
}

#[test]
fn test_multiple_borrowed_views_alias() {
    let owner = ExternalBuffer::new(vec![0i32; 6]);
    let mut flat = Tensor::borrowed(&owner, &[6]).unwrap();
    let grid = Tensor::borrowed(&owner, &[3, 2]).unwrap();

    flat.fill_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
    assert_eq!(grid.get(&[2, 2]).unwrap(), 4);
    assert_eq!(grid.sum().unwrap(), 21.0);
}

#[test]
fn test_borrowed_shape_must_cover_the_buffer() {
    let owner = ExternalBuffer::new(vec![0u8; 5]);
    let err = Tensor::borrowed(&owner, &[2, 3]).unwrap_err();
    assert!(err.to_string().contains("external buffer holds 5"), "{err}");
    assert!(Tensor::borrowed(&owner, &[5]).is_ok());
}

// ============================================================================
// Revocation
// ============================================================================

#[test]
fn test_release_revokes_every_access_path() {
    let owner = ExternalBuffer::new(vec![1.0f64, 2.0, 3.0, 4.0]);
    let mut view = Tensor::borrowed(&owner, &[2, 2]).unwrap();
    owner.release();

    assert!(!view.is_valid());
    assert_eq!(view.to_vec(), Err(TensorError::InvalidStorage));
    assert_eq!(view.get(&[1, 1]), Err(TensorError::InvalidStorage));
    assert_eq!(view.set(&[1, 1], 0.0), Err(TensorError::InvalidStorage));
    assert_eq!(view.fill(0.0), Err(TensorError::InvalidStorage));
    assert_eq!(view.sum(), Err(TensorError::InvalidStorage));
    assert_eq!(view.max_element(), Err(TensorError::InvalidStorage));
    assert_eq!(view.clamp(None, None), Err(TensorError::InvalidStorage));
    assert!(view.values().is_err());
    assert!(view.deep_clone().is_err());
    assert!(view.convert::<f32>().is_err());
    assert!(view.mmul(&view.clone()).is_err());
}

#[test]
fn test_dropping_the_owner_revokes_too() {
    let view = {
        let owner = ExternalBuffer::new(vec![1i64, 2, 3]);
        Tensor::borrowed(&owner, &[3]).unwrap()
    };
    assert!(!view.is_valid());
    assert_eq!(view.to_vec(), Err(TensorError::InvalidStorage));
}

#[test]
fn test_layout_ops_still_derive_from_revoked_views() {
    // Descriptor rewrites touch no storage, so they keep working; only
    // element access reports the revocation.
    let owner = ExternalBuffer::new(vec![1u8, 2, 3, 4]);
    let view = Tensor::borrowed(&owner, &[2, 2]).unwrap();
    owner.release();

    let derived = view.transpose(1, 2).unwrap().select(1, 2).unwrap();
    assert_eq!(derived.shape(), &[2]);
    assert!(!derived.is_valid());
    assert_eq!(derived.to_vec(), Err(TensorError::InvalidStorage));
}

#[test]
fn test_revoked_operand_fails_pair_operations() {
    let owner = ExternalBuffer::new(vec![1.0f32, 2.0, 3.0]);
    let borrowed = Tensor::borrowed(&owner, &[3]).unwrap();
    let mut owned = Tensor::from_data(&[1.0f32, 1.0, 1.0], &[3]).unwrap();
    owned.cadd(&borrowed).unwrap();
    assert_eq!(owned.to_vec().unwrap(), vec![2.0, 3.0, 4.0]);

    owner.release();
    assert_eq!(owned.cadd(&borrowed), Err(TensorError::InvalidStorage));
    assert_eq!(owned.dot(&borrowed), Err(TensorError::InvalidStorage));
    assert_eq!(owned.to_vec().unwrap(), vec![2.0, 3.0, 4.0]);
}

#[test]
fn test_shuffle_on_revoked_storage_fails() {
    let owner = ExternalBuffer::new(vec![1i32, 2, 3, 4]);
    let mut view = Tensor::borrowed(&owner, &[4]).unwrap();
    owner.release();
    let mut rng = StdRng::seed_from_u64(0);
    assert_eq!(view.shuffle(&mut rng), Err(TensorError::InvalidStorage));
}

// ============================================================================
// Equality and cloning around revocation
// ============================================================================

#[test]
fn test_revoked_views_compare_unequal() {
    let owner = ExternalBuffer::new(vec![1u8, 2, 3]);
    let view = Tensor::borrowed(&owner, &[3]).unwrap();
    let copy = view.deep_clone().unwrap();
    assert_eq!(view, copy);

    owner.release();
    assert_ne!(view, copy);
    // Even self-comparison fails once the buffer is gone.
    assert_ne!(view, view.clone());
}

#[test]
fn test_deep_clone_escapes_the_borrow() {
    let owner = ExternalBuffer::new(vec![1i16, 2, 3, 4]);
    let view = Tensor::borrowed(&owner, &[2, 2]).unwrap();
    let copy = view.deep_clone().unwrap();
    assert!(copy.is_owned());

    owner.release();
    assert_eq!(copy.to_vec().unwrap(), vec![1, 2, 3, 4]);
    assert!(view.to_vec().is_err());
}

#[test]
fn test_shallow_clone_of_a_borrowed_view_still_borrows() {
    let owner = ExternalBuffer::new(vec![1u8, 2]);
    let view = Tensor::borrowed(&owner, &[2]).unwrap();
    let alias = view.clone();
    assert!(!alias.is_owned());

    owner.release();
    assert_eq!(alias.to_vec(), Err(TensorError::InvalidStorage));
}

#[test]
fn test_display_reports_revoked_storage() {
    let owner = ExternalBuffer::new(vec![1.5f32, 2.5]);
    let view = Tensor::borrowed(&owner, &[2]).unwrap();
    assert_eq!(view.to_string(), "Float32[2] [1.5, 2.5]");
    owner.release();
    assert!(view.to_string().contains("<invalid storage>"));
}
