//! Arithmetic tests: scalar, slice, and component operations, matrix
//! products, shuffling, and rounding.
//!
//! Integer arithmetic wraps and integer division by zero yields zero, so
//! every operation is total over its element type.

use gridtensor::{Tensor, TensorError};
use rand::rngs::StdRng;
use rand::SeedableRng;

// ============================================================================
// Scalar operations
// ============================================================================

#[test]
fn test_scalar_ops_touch_every_element() {
    let mut a = Tensor::<u8>::with_extents(&[3, 3]);
    a.fill(1).unwrap();
    a.add(1).unwrap();
    let mut b = Tensor::<u8>::with_extents(&[3, 3]);
    b.fill(3).unwrap();
    assert_ne!(a, b);
    a.add(1).unwrap();
    assert_eq!(a, b);

    a.mul(4).unwrap();
    a.div(2).unwrap();
    a.sub(5).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![1; 9]);
}

#[test]
fn test_scalar_ops_through_a_view() {
    let t = Tensor::from_data(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
    t.select(2, 2).unwrap().mul(10.0).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![1.0, 20.0, 3.0, 40.0, 5.0, 60.0]);
}

#[test]
fn test_integer_arithmetic_wraps() {
    let mut t = Tensor::from_data(&[250u8, 251, 252], &[3]).unwrap();
    t.add(10).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![4, 5, 6]);

    let mut t = Tensor::from_data(&[100i8, -100], &[2]).unwrap();
    t.mul(3).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![44, -44]);
}

#[test]
fn test_integer_division_by_zero_is_zero() {
    let mut t = Tensor::from_data(&[7i32, -7, 0], &[3]).unwrap();
    t.div(0).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![0, 0, 0]);

    // Floats follow IEEE instead.
    let mut t = Tensor::from_data(&[1.0f64, -1.0], &[2]).unwrap();
    t.div(0.0).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![f64::INFINITY, f64::NEG_INFINITY]);
}

// ============================================================================
// Slice operations (broadcast over the final dimension)
// ============================================================================

#[test]
fn test_slice_ops_broadcast_over_rows() {
    let mut t = Tensor::from_data(&[1u8, 2, 3, 4, 5, 6], &[3, 2]).unwrap();
    t.mul_slice(&[2, 4]).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![2, 8, 6, 16, 10, 24]);
    t.add_slice(&[2, 4]).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![4, 12, 8, 20, 12, 28]);
    t.div_slice(&[2, 4]).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![2, 3, 4, 5, 6, 7]);
    t.sub_slice(&[2, 3]).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![0, 0, 2, 2, 4, 4]);
}

#[test]
fn test_fill_slice_stamps_each_row() {
    let mut t = Tensor::<i32>::with_extents(&[2, 3]);
    t.fill_slice(&[7, 8, 9]).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![7, 8, 9, 7, 8, 9]);

    // A rank-1 view is its own final dimension.
    let mut line = Tensor::<i32>::with_extents(&[3]);
    line.fill_slice(&[1, 2, 3]).unwrap();
    assert_eq!(line.to_vec().unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_slice_ops_check_length_and_rank() {
    let mut t = Tensor::<i32>::with_extents(&[2, 3]);
    let err = t.fill_slice(&[1, 2]).unwrap_err();
    assert!(err.to_string().contains("extent 3"), "{err}");

    let mut scalar = Tensor::scalar(1i32);
    assert!(matches!(
        scalar.fill_slice(&[1]),
        Err(TensorError::LengthOrTypeMismatch { .. })
    ));
}

// ============================================================================
// Component operations
// ============================================================================

#[test]
fn test_component_ops_match_by_count_not_shape() {
    // [3, 2] against [2, 3]: both hold six elements in layout order.
    let mut a = Tensor::from_data(&[1u8, 2, 3, 4, 5, 6], &[3, 2]).unwrap();
    let b = Tensor::from_data(&[1u8, 2, 3, 4, 5, 6], &[2, 3]).unwrap();

    a.cmul(&b).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![1, 4, 9, 16, 25, 36]);
    a.cadd(&b).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![2, 6, 12, 20, 30, 42]);
    a.cdiv(&b).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![2, 3, 4, 5, 6, 7]);
    a.csub(&b).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![1, 1, 1, 1, 1, 1]);
    a.copy_from(&b).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_component_ops_pair_in_layout_order() {
    let mut a = Tensor::from_data(&[1i32, 2, 3, 4], &[2, 2]).unwrap();
    let b = Tensor::from_data(&[10i32, 20, 30, 40], &[2, 2]).unwrap();
    a.cadd(&b.transpose(1, 2).unwrap()).unwrap();
    assert_eq!(a.to_vec().unwrap(), vec![11, 32, 23, 44]);
}

#[test]
fn test_component_ops_reject_count_mismatch() {
    let mut a = Tensor::<f32>::with_extents(&[2, 3]);
    let b = Tensor::<f32>::with_extents(&[2, 2]);
    let err = a.cadd(&b).unwrap_err();
    assert!(err.to_string().contains("element counts differ"), "{err}");
}

#[test]
fn test_component_ops_allow_aliasing_views() {
    // Adding a view to itself doubles every element.
    let mut t = Tensor::from_data(&[1i64, 2, 3, 4], &[4]).unwrap();
    let alias = t.clone();
    t.cadd(&alias).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![2, 4, 6, 8]);

    // Overlapping but distinct views of one buffer are processed in
    // layout order, element by element.
    let base = Tensor::from_data(&[1i64, 2, 3, 4], &[4]).unwrap();
    let mut head = base.narrow(1, 1, 3).unwrap();
    let tail = base.narrow(1, 2, 3).unwrap();
    head.copy_from(&tail).unwrap();
    assert_eq!(base.to_vec().unwrap(), vec![2, 3, 4, 4]);
}

// ============================================================================
// Dot product
// ============================================================================

#[test]
fn test_dot_accumulates_in_f64() {
    let a = Tensor::from_data(&[1.0f64, 2.0, 3.0], &[3]).unwrap();
    let b = Tensor::from_data(&[4.0f64, 5.0, 6.0], &[3]).unwrap();
    assert_eq!(a.dot(&b).unwrap(), 32.0);

    // Small integer types do not overflow their dot products.
    let a = Tensor::from_data(&[100u8, 100], &[2]).unwrap();
    assert_eq!(a.dot(&a).unwrap(), 20000.0);

    let a = Tensor::from_data(&[1.0f64, 2.0, 3.0], &[3]).unwrap();
    assert_eq!(a.dot(&a.reverse(1).unwrap()).unwrap(), 10.0);
}

// ============================================================================
// Matrix product
// ============================================================================

#[test]
fn test_mmul_float_and_integer() {
    let a = Tensor::from_data(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[2, 3]).unwrap();
    let b = Tensor::from_data(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
    let c = a.mmul(&b).unwrap();
    assert_eq!(c.shape(), &[2, 2]);
    assert_eq!(c.to_vec().unwrap(), vec![22.0, 28.0, 49.0, 64.0]);

    let a = Tensor::from_data(&[1i64, 2, 3, 4, 5, 6], &[2, 3]).unwrap();
    let b = Tensor::from_data(&[1i64, 2, 3, 4, 5, 6], &[3, 2]).unwrap();
    assert_eq!(a.mmul(&b).unwrap().to_vec().unwrap(), vec![22, 28, 49, 64]);
}

#[test]
fn test_mmul_reads_strided_operands() {
    let a = Tensor::from_data(&[1.0f64, 4.0, 2.0, 5.0, 3.0, 6.0], &[3, 2]).unwrap();
    let b = Tensor::from_data(&[1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0], &[3, 2]).unwrap();
    // a transposed reads as [[1, 2, 3], [4, 5, 6]].
    let c = a.transpose(1, 2).unwrap().mmul(&b).unwrap();
    assert_eq!(c.to_vec().unwrap(), vec![22.0, 28.0, 49.0, 64.0]);

    // Multiplying a view by itself is fine; operands are read out first.
    let s = Tensor::from_data(&[1.0f64, 2.0, 3.0, 4.0], &[2, 2]).unwrap();
    assert_eq!(s.mmul(&s).unwrap().to_vec().unwrap(), vec![7.0, 10.0, 15.0, 22.0]);
}

#[test]
fn test_mmul_shape_requirements() {
    let a = Tensor::<f64>::with_extents(&[2, 3]);
    let b = Tensor::<f64>::with_extents(&[2, 2]);
    let err = a.mmul(&b).unwrap_err();
    assert_eq!(
        err,
        TensorError::DimensionMismatch {
            left: vec![2, 3],
            right: vec![2, 2],
        }
    );
    assert!(err.to_string().contains("cannot multiply"), "{err}");

    let line = Tensor::<f64>::with_extents(&[3]);
    assert!(a.mmul(&line).is_err());
}

// ============================================================================
// Shuffle
// ============================================================================

#[test]
fn test_shuffle_is_seed_deterministic() {
    let mut a = Tensor::<i64>::from_range(1, 100, 1).unwrap();
    let mut b = a.deep_clone().unwrap();
    a.shuffle(&mut StdRng::seed_from_u64(7)).unwrap();
    b.shuffle(&mut StdRng::seed_from_u64(7)).unwrap();
    assert_eq!(a, b);

    let mut c = Tensor::<i64>::from_range(1, 100, 1).unwrap();
    c.shuffle(&mut StdRng::seed_from_u64(8)).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_shuffle_permutes_the_elements() {
    let mut t = Tensor::<i64>::from_range(1, 100, 1).unwrap();
    t.shuffle(&mut StdRng::seed_from_u64(3)).unwrap();
    let mut sorted = t.to_vec().unwrap();
    sorted.sort_unstable();
    assert_eq!(sorted, (1..=100).collect::<Vec<i64>>());
}

#[test]
fn test_shuffle_edge_cases() {
    let mut rng = StdRng::seed_from_u64(0);

    let mut empty = Tensor::<f64>::with_extents(&[0]);
    empty.shuffle(&mut rng).unwrap();

    let mut single = Tensor::scalar(5i32).reshape(&[1]).unwrap();
    single.shuffle(&mut rng).unwrap();
    assert_eq!(single.to_vec().unwrap(), vec![5]);

    let mut matrix = Tensor::<f64>::with_extents(&[2, 2]);
    let err = matrix.shuffle(&mut rng).unwrap_err();
    assert!(err.to_string().contains("rank-1"), "{err}");
}

#[test]
fn test_shuffle_through_a_strided_view() {
    // Shuffling one column leaves the other untouched.
    let t = Tensor::from_data(&[1i32, 0, 2, 0, 3, 0, 4, 0], &[4, 2]).unwrap();
    let mut col = t.select(2, 1).unwrap();
    col.shuffle(&mut StdRng::seed_from_u64(11)).unwrap();

    let mut sorted = col.to_vec().unwrap();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![1, 2, 3, 4]);
    assert_eq!(t.select(2, 2).unwrap().to_vec().unwrap(), vec![0, 0, 0, 0]);
}

// ============================================================================
// Rounding and clamping
// ============================================================================

#[test]
fn test_rounding_families() {
    let source = Tensor::from_data(
        &[-1.25f64, -0.75, -0.5, -0.25, 0.0, 0.25, 0.5, 0.75, 1.25],
        &[3, 3],
    )
    .unwrap();

    let mut t = source.deep_clone().unwrap();
    t.floor().unwrap();
    assert_eq!(
        t.to_vec().unwrap(),
        vec![-2.0, -1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0]
    );

    let mut t = source.deep_clone().unwrap();
    t.ceil().unwrap();
    assert_eq!(
        t.to_vec().unwrap(),
        vec![-1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0]
    );

    // Ties round away from zero.
    let mut t = source.deep_clone().unwrap();
    t.round().unwrap();
    assert_eq!(
        t.to_vec().unwrap(),
        vec![-1.0, -1.0, -1.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]
    );
}

#[test]
fn test_rounding_is_identity_on_integers() {
    let mut t = Tensor::from_data(&[-3i32, 0, 7], &[3]).unwrap();
    t.floor().unwrap();
    t.ceil().unwrap();
    t.round().unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![-3, 0, 7]);
}

#[test]
fn test_clamp_limits_both_sides() {
    let mut t = Tensor::from_data(&[-500.0f64, 25.0, 500.0], &[3]).unwrap();
    t.clamp(Some(0.0), Some(255.0)).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![0.0, 25.0, 255.0]);

    let mut t = Tensor::from_data(&[-500.0f64, 25.0, 500.0], &[3]).unwrap();
    t.clamp(None, Some(100.0)).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![-500.0, 25.0, 100.0]);

    let mut t = Tensor::from_data(&[-500.0f64, 25.0, 500.0], &[3]).unwrap();
    t.clamp(Some(0.0), None).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![0.0, 25.0, 500.0]);

    let mut t = Tensor::from_data(&[-500.0f64, 25.0, 500.0], &[3]).unwrap();
    t.clamp(None, None).unwrap();
    assert_eq!(t.to_vec().unwrap(), vec![-500.0, 25.0, 500.0]);
}

#[test]
fn test_clamp_bound_order_and_nan() {
    let mut t = Tensor::from_data(&[1.0f64], &[1]).unwrap();
    let err = t.clamp(Some(3.0), Some(1.0)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid clamp bounds: minimum 3 must not exceed maximum 1"
    );

    let mut t = Tensor::from_data(&[f64::NAN, 2.0], &[2]).unwrap();
    t.clamp(Some(0.0), Some(1.0)).unwrap();
    let out = t.to_vec().unwrap();
    assert!(out[0].is_nan());
    assert_eq!(out[1], 1.0);
}
