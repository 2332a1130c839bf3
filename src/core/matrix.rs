use std::fmt::Debug;
use std::ops::{
    Add, AddAssign, Div, Index, IndexMut, Mul, MulAssign, Neg, Sub, SubAssign,
};

use nalgebra::{DMatrix, Matrix2, Matrix3};
use num_traits::{One, Zero};

/// Small dense square matrix of a fixed dimension.
///
/// Implemented for [`Matrix2<f64>`] and [`Matrix3<f64>`]. Besides the usual
/// arithmetic, the trait provides the matrix invariants used by target metrics
/// (determinant, trace, Frobenius norm, adjugate) together with the
/// dimension-specific second derivatives of the invariants that do not have a
/// dimension-independent closed form.
///
/// Derivative blocks use the convention of [`Hessian`]: block `(i, j)` holds
/// `∂²f / ∂M(i, k) ∂M(j, l)` at position `(k, l)`.
pub trait FixedMatrix:
    Copy
    + Debug
    + PartialEq
    + Send
    + Sync
    + 'static
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Mul<f64, Output = Self>
    + Div<f64, Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign<f64>
    + Index<(usize, usize), Output = f64>
    + IndexMut<(usize, usize)>
{
    /// Number of rows (and columns).
    const DIM: usize;

    /// Storage for the `DIM * (DIM + 1) / 2` independent blocks of a
    /// [`Hessian`].
    type Blocks: Copy + Debug + PartialEq + AsRef<[Self]> + AsMut<[Self]>;

    /// Returns zero-initialized Hessian block storage.
    fn zero_blocks() -> Self::Blocks;

    /// Builds the matrix from a function of `(row, col)`.
    fn from_fn<F: FnMut(usize, usize) -> f64>(f: F) -> Self;

    /// Determinant.
    fn det(&self) -> f64;

    /// Adjugate (transpose of the cofactor matrix). Defined for singular
    /// matrices too.
    fn adj(&self) -> Self;

    /// Transpose.
    fn transposed(&self) -> Self;

    /// Transpose of the adjugate, which is the gradient of the determinant.
    fn transpose_adj(&self) -> Self {
        self.adj().transposed()
    }

    /// Inverse computed from the adjugate.
    ///
    /// The determinant must be non-zero, the result is not finite otherwise.
    fn inverse(&self) -> Self {
        self.adj() / self.det()
    }

    /// Trace.
    fn trace(&self) -> f64 {
        (0..Self::DIM).map(|i| self[(i, i)]).sum()
    }

    /// Frobenius inner product.
    fn dot(&self, other: &Self) -> f64 {
        let mut sum = 0.0;
        for i in 0..Self::DIM {
            for j in 0..Self::DIM {
                sum += self[(i, j)] * other[(i, j)];
            }
        }
        sum
    }

    /// Squared Frobenius norm.
    fn sqr_frobenius(&self) -> f64 {
        self.dot(self)
    }

    /// Frobenius norm.
    fn frobenius(&self) -> f64 {
        self.sqr_frobenius().sqrt()
    }

    /// Returns `true` if all entries are finite.
    fn is_finite(&self) -> bool {
        (0..Self::DIM).all(|i| (0..Self::DIM).all(|j| self[(i, j)].is_finite()))
    }

    /// Block `(i, j)` of the second derivative of the determinant.
    fn det_hessian_block(&self, i: usize, j: usize) -> Self;

    /// Gradient of `|adj M|²`.
    fn sqr_frobenius_adj_grad(&self) -> Self;

    /// Block `(i, j)` of the second derivative of `|adj M|²`.
    fn sqr_frobenius_adj_hessian_block(&self, i: usize, j: usize) -> Self;

    /// Gradient of `tr(adj M)`.
    fn trace_adj_grad(&self) -> Self;

    /// Block `(i, j)` of the second derivative of `tr(adj M)`.
    fn trace_adj_hessian_block(&self, i: usize, j: usize) -> Self;
}

fn delta(i: usize, j: usize) -> f64 {
    if i == j {
        1.0
    } else {
        0.0
    }
}

// Levi-Civita symbol of three indices from {0, 1, 2}.
fn levi_civita(i: usize, j: usize, k: usize) -> f64 {
    let (i, j, k) = (i as i64, j as i64, k as i64);
    ((i - j) * (j - k) * (k - i) / 2) as f64
}

impl FixedMatrix for Matrix2<f64> {
    const DIM: usize = 2;

    type Blocks = [Self; 3];

    fn zero_blocks() -> Self::Blocks {
        [Self::zeros(); 3]
    }

    fn from_fn<F: FnMut(usize, usize) -> f64>(mut f: F) -> Self {
        let m00 = f(0, 0);
        let m01 = f(0, 1);
        let m10 = f(1, 0);
        let m11 = f(1, 1);
        Self::new(m00, m01, m10, m11)
    }

    fn det(&self) -> f64 {
        self[(0, 0)] * self[(1, 1)] - self[(0, 1)] * self[(1, 0)]
    }

    fn adj(&self) -> Self {
        Self::new(self[(1, 1)], -self[(0, 1)], -self[(1, 0)], self[(0, 0)])
    }

    fn transposed(&self) -> Self {
        Self::new(self[(0, 0)], self[(1, 0)], self[(0, 1)], self[(1, 1)])
    }

    fn transpose_adj(&self) -> Self {
        Self::new(self[(1, 1)], -self[(1, 0)], -self[(0, 1)], self[(0, 0)])
    }

    fn det_hessian_block(&self, i: usize, j: usize) -> Self {
        // ε(i, j) ε(k, l), independent of the matrix itself.
        let e = j as f64 - i as f64;
        Self::new(0.0, e, -e, 0.0)
    }

    fn sqr_frobenius_adj_grad(&self) -> Self {
        // The adjugate of a 2x2 matrix is a signed permutation of its entries.
        *self * 2.0
    }

    fn sqr_frobenius_adj_hessian_block(&self, i: usize, j: usize) -> Self {
        Self::identity() * (2.0 * delta(i, j))
    }

    fn trace_adj_grad(&self) -> Self {
        Self::identity()
    }

    fn trace_adj_hessian_block(&self, _i: usize, _j: usize) -> Self {
        Self::zeros()
    }
}

impl Matrix3Ext for Matrix3<f64> {
    fn cofactor(&self, i: usize, j: usize) -> f64 {
        let (i1, i2) = ((i + 1) % 3, (i + 2) % 3);
        let (j1, j2) = ((j + 1) % 3, (j + 2) % 3);
        self[(i1, j1)] * self[(i2, j2)] - self[(i1, j2)] * self[(i2, j1)]
    }
}

trait Matrix3Ext {
    fn cofactor(&self, i: usize, j: usize) -> f64;
}

impl FixedMatrix for Matrix3<f64> {
    const DIM: usize = 3;

    type Blocks = [Self; 6];

    fn zero_blocks() -> Self::Blocks {
        [Self::zeros(); 6]
    }

    fn from_fn<F: FnMut(usize, usize) -> f64>(mut f: F) -> Self {
        let mut m = Self::zeros();
        for i in 0..3 {
            for j in 0..3 {
                m[(i, j)] = f(i, j);
            }
        }
        m
    }

    fn det(&self) -> f64 {
        self[(0, 0)] * self.cofactor(0, 0)
            + self[(0, 1)] * self.cofactor(0, 1)
            + self[(0, 2)] * self.cofactor(0, 2)
    }

    fn adj(&self) -> Self {
        <Self as FixedMatrix>::from_fn(|i, j| self.cofactor(j, i))
    }

    fn transposed(&self) -> Self {
        <Self as FixedMatrix>::from_fn(|i, j| self[(j, i)])
    }

    fn transpose_adj(&self) -> Self {
        <Self as FixedMatrix>::from_fn(|i, j| self.cofactor(i, j))
    }

    fn det_hessian_block(&self, i: usize, j: usize) -> Self {
        if i == j {
            return Self::zeros();
        }

        // ∂²det / ∂M(i, k) ∂M(j, l) = ε(i, j, m) ε(k, l, p) M(m, p) with m and
        // p being the remaining indices.
        let m = 3 - i - j;
        <Self as FixedMatrix>::from_fn(|k, l| {
            if k == l {
                0.0
            } else {
                let p = 3 - k - l;
                levi_civita(i, j, m) * levi_civita(k, l, p) * self[(m, p)]
            }
        })
    }

    fn sqr_frobenius_adj_grad(&self) -> Self {
        let s = self.sqr_frobenius();
        (*self * s - *self * self.transposed() * *self) * 2.0
    }

    fn sqr_frobenius_adj_hessian_block(&self, i: usize, j: usize) -> Self {
        let s = self.sqr_frobenius();
        let mtm = self.transposed() * *self;
        let mmt = *self * self.transposed();
        let dij = delta(i, j);

        <Self as FixedMatrix>::from_fn(|k, l| {
            let dkl = delta(k, l);
            2.0 * (s * dij * dkl + 2.0 * self[(i, k)] * self[(j, l)]
                - dij * mtm[(k, l)]
                - self[(i, l)] * self[(j, k)]
                - mmt[(i, j)] * dkl)
        })
    }

    fn trace_adj_grad(&self) -> Self {
        Self::identity() * FixedMatrix::trace(self) - self.transposed()
    }

    fn trace_adj_hessian_block(&self, i: usize, j: usize) -> Self {
        <Self as FixedMatrix>::from_fn(|k, l| delta(i, k) * delta(j, l) - delta(i, l) * delta(j, k))
    }
}

/// Second derivative of a scalar function of a matrix.
///
/// The full Hessian is a symmetric rank-4 tensor `∂²f / ∂M(i, k) ∂M(j, l)`.
/// It is stored as `DIM * DIM` blocks of size `DIM * DIM` where block
/// `(i, j)` contains the entries for rows `i` and `j` of the matrix argument.
/// Because block `(j, i)` is the transpose of block `(i, j)`, only the upper
/// blocks `i <= j` are stored, in row-major order:
///
/// * 2x2: `[H00, H01, H11]`
/// * 3x3: `[H00, H01, H02, H11, H12, H22]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hessian<M: FixedMatrix> {
    blocks: M::Blocks,
}

impl<M: FixedMatrix> Hessian<M> {
    /// Initializes the Hessian with zeros.
    pub fn zeros() -> Self {
        Self {
            blocks: M::zero_blocks(),
        }
    }

    /// Position of block `(i, j)` in the storage. Requires `i <= j`.
    pub fn block_index(i: usize, j: usize) -> usize {
        assert!(i <= j, "only upper blocks are stored");
        assert!(j < M::DIM, "block index out of bounds");
        i * (2 * M::DIM - i - 1) / 2 + j
    }

    /// Iterates over the `(i, j)` pairs of the stored blocks in the storage
    /// order.
    pub fn pairs() -> impl Iterator<Item = (usize, usize)> {
        (0..M::DIM).flat_map(|i| (i..M::DIM).map(move |j| (i, j)))
    }

    /// Block `(i, j)`. Lower blocks are obtained by transposition.
    pub fn block(&self, i: usize, j: usize) -> M {
        if i <= j {
            self.blocks.as_ref()[Self::block_index(i, j)]
        } else {
            self.blocks.as_ref()[Self::block_index(j, i)].transposed()
        }
    }

    /// Mutable access to the stored block `(i, j)`. Requires `i <= j`.
    pub fn block_mut(&mut self, i: usize, j: usize) -> &mut M {
        &mut self.blocks.as_mut()[Self::block_index(i, j)]
    }

    /// The stored blocks.
    pub fn blocks(&self) -> &[M] {
        self.blocks.as_ref()
    }

    /// The stored blocks, mutably.
    pub fn blocks_mut(&mut self) -> &mut [M] {
        self.blocks.as_mut()
    }

    /// The entry `∂²f / ∂M(row) ∂M(col)`.
    pub fn get(&self, row: (usize, usize), col: (usize, usize)) -> f64 {
        self.block(row.0, col.0)[(row.1, col.1)]
    }

    /// Expands the blocks into the full `DIM² x DIM²` symmetric matrix with
    /// the entries of the matrix argument ordered row by row.
    pub fn to_full(&self) -> DMatrix<f64> {
        let n = M::DIM;
        DMatrix::from_fn(n * n, n * n, |r, c| {
            self.get((r / n, r % n), (c / n, c % n))
        })
    }

    /// Second derivative in direction `x`, that is the full contraction
    /// `Σ x(i, k) x(j, l) ∂²f / ∂M(i, k) ∂M(j, l)`.
    pub fn contract(&self, x: &M) -> f64 {
        let mut sum = 0.0;
        for i in 0..M::DIM {
            for j in 0..M::DIM {
                let block = self.block(i, j);
                for k in 0..M::DIM {
                    for l in 0..M::DIM {
                        sum += x[(i, k)] * x[(j, l)] * block[(k, l)];
                    }
                }
            }
        }
        sum
    }

    /// Largest absolute value of an entry.
    pub fn max_abs(&self) -> f64 {
        let mut max = 0.0f64;
        for block in self.blocks() {
            for k in 0..M::DIM {
                for l in 0..M::DIM {
                    max = max.max(block[(k, l)].abs());
                }
            }
        }
        max
    }
}

impl<M: FixedMatrix> Default for Hessian<M> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<M: FixedMatrix> Index<usize> for Hessian<M> {
    type Output = M;

    fn index(&self, index: usize) -> &Self::Output {
        &self.blocks.as_ref()[index]
    }
}

impl<M: FixedMatrix> IndexMut<usize> for Hessian<M> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.blocks.as_mut()[index]
    }
}

impl<M: FixedMatrix> AddAssign for Hessian<M> {
    fn add_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.blocks_mut().iter_mut().zip(rhs.blocks()) {
            *lhs += *rhs;
        }
    }
}

impl<M: FixedMatrix> SubAssign for Hessian<M> {
    fn sub_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.blocks_mut().iter_mut().zip(rhs.blocks()) {
            *lhs -= *rhs;
        }
    }
}

impl<M: FixedMatrix> MulAssign<f64> for Hessian<M> {
    fn mul_assign(&mut self, rhs: f64) {
        for block in self.blocks_mut() {
            *block *= rhs;
        }
    }
}

impl<M: FixedMatrix> Add for Hessian<M> {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl<M: FixedMatrix> Sub for Hessian<M> {
    type Output = Self;

    fn sub(mut self, rhs: Self) -> Self::Output {
        self -= rhs;
        self
    }
}

impl<M: FixedMatrix> Mul<f64> for Hessian<M> {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self::Output {
        self *= rhs;
        self
    }
}

impl<M: FixedMatrix> Neg for Hessian<M> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self * -1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;

    fn sample2() -> Matrix2<f64> {
        Matrix2::new(-0.1, -0.15, -0.25, -0.8)
    }

    fn sample3() -> Matrix3<f64> {
        Matrix3::new(1.5, -0.7, -0.8, 0.8, -1.3, -0.7, 0.6, -0.9, -2.0)
    }

    #[test]
    fn determinant() {
        assert_abs_diff_eq!(sample2().det(), 0.0425, epsilon = 1e-12);
        assert_abs_diff_eq!(sample3().det(), sample3().determinant(), epsilon = 1e-12);
        assert_abs_diff_eq!(sample3().det(), 2.081, epsilon = 1e-12);
    }

    #[test]
    fn adjugate_identity() {
        let m = sample2();
        assert_abs_diff_eq!(m * m.adj(), Matrix2::<f64>::identity() * m.det(), epsilon = 1e-12);

        let m = sample3();
        assert_abs_diff_eq!(m * m.adj(), Matrix3::<f64>::identity() * m.det(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.adj() * m, Matrix3::<f64>::identity() * m.det(), epsilon = 1e-12);
    }

    #[test]
    fn adjugate_of_singular() {
        let m = Matrix3::new(1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 0.0, 1.0, 1.0);
        assert_abs_diff_eq!(m.det(), 0.0, epsilon = 1e-12);
        assert!(m.adj().is_finite());
        assert_abs_diff_eq!(m * m.adj(), Matrix3::<f64>::zeros(), epsilon = 1e-12);
    }

    #[test]
    fn inverse() {
        let m = sample3();
        let inv = FixedMatrix::inverse(&m);
        assert_abs_diff_eq!(m * inv, Matrix3::<f64>::identity(), epsilon = 1e-12);
        assert_abs_diff_eq!(inv, m.try_inverse().unwrap(), epsilon = 1e-12);
    }

    #[test]
    fn invariants() {
        let m = sample3();
        assert_abs_diff_eq!(FixedMatrix::trace(&m), -1.8, epsilon = 1e-12);
        assert_abs_diff_eq!(m.sqr_frobenius(), m.norm_squared(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.frobenius(), m.norm(), epsilon = 1e-12);
        assert_eq!(m.transposed(), m.transpose());
        assert_eq!(m.transpose_adj(), m.adj().transpose());
    }

    // Second central difference of det(M + tX) at t = 0.
    fn det_second_difference<M: FixedMatrix>(m: &M, x: &M) -> f64 {
        let h = 1e-4;
        let plus = (*m + *x * h).det();
        let minus = (*m - *x * h).det();
        (plus - 2.0 * m.det() + minus) / (h * h)
    }

    fn det_hessian<M: FixedMatrix>(m: &M) -> Hessian<M> {
        let mut hess = Hessian::<M>::zeros();
        for (i, j) in Hessian::<M>::pairs() {
            *hess.block_mut(i, j) = m.det_hessian_block(i, j);
        }
        hess
    }

    #[test]
    fn det_hessian_contraction() {
        let x2 = Matrix2::new(0.3, -1.2, 0.7, 0.4);
        assert_abs_diff_eq!(
            det_hessian(&sample2()).contract(&x2),
            det_second_difference(&sample2(), &x2),
            epsilon = 1e-6
        );

        let x3 = Matrix3::new(0.3, -1.2, 0.7, 0.4, 0.1, -0.5, 0.9, 0.2, -0.6);
        assert_abs_diff_eq!(
            det_hessian(&sample3()).contract(&x3),
            det_second_difference(&sample3(), &x3),
            epsilon = 1e-6
        );
    }

    #[test]
    fn det_hessian_2d_blocks() {
        let hess = det_hessian(&sample2());
        assert_eq!(hess[0], Matrix2::<f64>::zeros());
        assert_eq!(hess[1], Matrix2::new(0.0, 1.0, -1.0, 0.0));
        assert_eq!(hess[2], Matrix2::<f64>::zeros());
    }

    #[test]
    fn adjugate_norm_scaling() {
        // |adj(λM)|² = λ⁴ |adj M|², so the gradient contracted with M is
        // 4 |adj M|² and the Hessian contracted with M is 12 |adj M|².
        let m = sample3();
        let q = m.adj().sqr_frobenius();
        assert_abs_diff_eq!(m.sqr_frobenius_adj_grad().dot(&m), 4.0 * q, epsilon = 1e-10);

        let mut hess = Hessian::<Matrix3<f64>>::zeros();
        for (i, j) in Hessian::<Matrix3<f64>>::pairs() {
            *hess.block_mut(i, j) = m.sqr_frobenius_adj_hessian_block(i, j);
        }
        assert_abs_diff_eq!(hess.contract(&m), 12.0 * q, epsilon = 1e-10);
    }

    #[test]
    fn trace_adjugate_gradient() {
        let m = sample3();
        let p = FixedMatrix::trace(&m.adj());
        // tr(adj(λM)) = λ² tr(adj M).
        assert_abs_diff_eq!(m.trace_adj_grad().dot(&m), 2.0 * p, epsilon = 1e-10);
    }

    #[test]
    fn block_layout() {
        assert_eq!(Hessian::<Matrix2<f64>>::block_index(0, 0), 0);
        assert_eq!(Hessian::<Matrix2<f64>>::block_index(0, 1), 1);
        assert_eq!(Hessian::<Matrix2<f64>>::block_index(1, 1), 2);

        let pairs: Vec<_> = Hessian::<Matrix3<f64>>::pairs().collect();
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 1), (1, 2), (2, 2)]);
        for (index, (i, j)) in pairs.into_iter().enumerate() {
            assert_eq!(Hessian::<Matrix3<f64>>::block_index(i, j), index);
        }
    }

    #[test]
    fn lower_blocks_are_transposed() {
        let mut hess = Hessian::<Matrix2<f64>>::zeros();
        *hess.block_mut(0, 1) = Matrix2::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(hess.block(1, 0), Matrix2::new(1.0, 3.0, 2.0, 4.0));
        assert_eq!(hess.get((0, 1), (1, 0)), 3.0);
        assert_eq!(hess.get((1, 0), (0, 1)), 3.0);

        let full = hess.to_full();
        assert_eq!(full, full.transpose());
    }
}
