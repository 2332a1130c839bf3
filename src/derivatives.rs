//! Closed-form derivatives of matrix invariants.
//!
//! All functions here accumulate into a [`Hessian`] (see its documentation
//! for the layout) and are meant to be combined when implementing
//! [`TargetMetric`](crate::TargetMetric) for a function of `T`. The chain rule
//! from `T = A·W⁻¹` back to `A` is provided by
//! [`grad_wrt_product_factor`] and [`second_deriv_wrt_product_factor`].
//!
//! The derivatives of the determinant are used often enough to have
//! dedicated helpers for a scalar function `h(det T)`:
//! [`det_function_grad`] and [`add_det_function_hessian`].

use crate::core::{FixedMatrix, Hessian};

/// Gradient of the determinant, that is the transpose of the adjugate.
pub fn transpose_adj<M: FixedMatrix>(t: &M) -> M {
    t.transpose_adj()
}

/// `H += alpha * ∂²det(T) / ∂T²`.
pub fn add_scaled_det_hessian<M: FixedMatrix>(hess: &mut Hessian<M>, alpha: f64, t: &M) {
    for (i, j) in Hessian::<M>::pairs() {
        *hess.block_mut(i, j) += t.det_hessian_block(i, j) * alpha;
    }
}

/// `H += alpha * ∂²|adj T|² / ∂T²`.
pub fn add_scaled_sqr_frobenius_adj_hessian<M: FixedMatrix>(
    hess: &mut Hessian<M>,
    alpha: f64,
    t: &M,
) {
    for (i, j) in Hessian::<M>::pairs() {
        *hess.block_mut(i, j) += t.sqr_frobenius_adj_hessian_block(i, j) * alpha;
    }
}

/// `H += alpha * ∂²tr(adj T) / ∂T²`.
pub fn add_scaled_trace_adj_hessian<M: FixedMatrix>(hess: &mut Hessian<M>, alpha: f64, t: &M) {
    for (i, j) in Hessian::<M>::pairs() {
        *hess.block_mut(i, j) += t.trace_adj_hessian_block(i, j) * alpha;
    }
}

/// `H(i, j)(k, l) += alpha * G(i, k) * G(j, l)`.
pub fn add_scaled_outer_product<M: FixedMatrix>(hess: &mut Hessian<M>, alpha: f64, g: &M) {
    for (i, j) in Hessian::<M>::pairs() {
        let block = hess.block_mut(i, j);
        for k in 0..M::DIM {
            for l in 0..M::DIM {
                block[(k, l)] += alpha * g[(i, k)] * g[(j, l)];
            }
        }
    }
}

/// `H(i, j)(k, l) += alpha * (G(i, k) * K(j, l) + K(i, k) * G(j, l))`.
pub fn add_scaled_sum_outer_product<M: FixedMatrix>(
    hess: &mut Hessian<M>,
    alpha: f64,
    g: &M,
    k: &M,
) {
    for (i, j) in Hessian::<M>::pairs() {
        let block = hess.block_mut(i, j);
        for r in 0..M::DIM {
            for c in 0..M::DIM {
                block[(r, c)] += alpha * (g[(i, r)] * k[(j, c)] + k[(i, r)] * g[(j, c)]);
            }
        }
    }
}

/// `H += alpha * I`, which is the Hessian of `alpha / 2 * |T|²`.
pub fn add_scaled_identity<M: FixedMatrix>(hess: &mut Hessian<M>, alpha: f64) {
    for i in 0..M::DIM {
        let block = hess.block_mut(i, i);
        for k in 0..M::DIM {
            block[(k, k)] += alpha;
        }
    }
}

/// Gradient of `h(det T)` given `h'(det T)`.
pub fn det_function_grad<M: FixedMatrix>(t: &M, d1: f64) -> M {
    t.transpose_adj() * d1
}

/// `H += ∂²h(det T) / ∂T²` given `h'(det T)` and `h''(det T)`.
pub fn add_det_function_hessian<M: FixedMatrix>(hess: &mut Hessian<M>, t: &M, d1: f64, d2: f64) {
    add_scaled_outer_product(hess, d2, &t.transpose_adj());
    add_scaled_det_hessian(hess, d1, t);
}

/// Gradient with respect to `A` of a function of `T = A·W⁻¹`, given the
/// gradient with respect to `T`.
pub fn grad_wrt_product_factor<M: FixedMatrix>(grad: &M, winv: &M) -> M {
    *grad * winv.transposed()
}

/// Converts the Hessian with respect to `T = A·W⁻¹` to the Hessian with
/// respect to `A` in place.
///
/// Each block is transformed as `W⁻¹ · H(i, j) · W⁻ᵀ`.
pub fn second_deriv_wrt_product_factor<M: FixedMatrix>(hess: &mut Hessian<M>, winv: &M) {
    let winv_t = winv.transposed();
    for block in hess.blocks_mut() {
        *block = *winv * *block * winv_t;
    }
}
