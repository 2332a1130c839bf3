use crate::core::{FixedMatrix, Hessian, MetricError, TargetFrame, TargetMetric};

/// Evaluates a metric for the inverse transpose of the element.
///
/// The wrapped metric `mu` is evaluated at `(A⁻ᵀ, W⁻ᵀ)`, which corresponds to
/// `T⁻ᵀ`. A metric that penalizes large `T` becomes one that penalizes small
/// `T`, so for example `InverseTranspose(ShapeSizeOrient)` is the same function
/// as [`ShapeSizeOrientBarrier`](crate::metric::ShapeSizeOrientBarrier).
///
/// The result is a barrier metric regardless of the wrapped one: it is not
/// defined for inverted or degenerate elements.
///
/// With `B = A⁻ᵀ` and `G`, `H` being the derivatives of `mu` with respect to
/// `B`, the derivatives with respect to `A` are
///
/// ```text
/// ∇  = −B Gᵀ B
/// ∇² = Σ_pq B(p, k) B(q, l) (B H(p, q) Bᵀ)(i, j) + B(j, k) Y(i, l) + B(i, l) Y(j, k)
/// ```
///
/// where `Y = B Gᵀ B` and the entry of the Hessian is at position `(k, l)` of
/// block `(i, j)`.
pub struct InverseTranspose<M: FixedMatrix> {
    metric: Box<dyn TargetMetric<M>>,
}

impl<M: FixedMatrix> InverseTranspose<M> {
    /// Initializes the inverse transpose of a metric.
    pub fn new<T>(metric: T) -> Self
    where
        T: TargetMetric<M> + 'static,
    {
        Self {
            metric: Box::new(metric),
        }
    }

    /// Returns `(A⁻ᵀ, W⁻ᵀ)`, or `None` if the element is not valid.
    fn transformed(a: &M, w: &M) -> Result<Option<(M, M)>, MetricError> {
        Ok(TargetFrame::barrier(a, w)?
            .map(|frame| (a.inverse().transposed(), frame.winv().transposed())))
    }
}

fn grad_wrt_a<M: FixedMatrix>(b: &M, grad: &M) -> M {
    -(*b * grad.transposed() * *b)
}

fn hess_wrt_a<M: FixedMatrix>(b: &M, grad: &M, inner: &Hessian<M>) -> Hessian<M> {
    let n = M::DIM;
    let bt = b.transposed();
    let y = *b * grad.transposed() * *b;

    // B H(p, q) Bᵀ for all p, q, indexed by p * n + q.
    let mut conjugated = [M::zero(); 9];
    for (index, block) in conjugated.iter_mut().take(n * n).enumerate() {
        *block = *b * inner.block(index / n, index % n) * bt;
    }

    let mut hess = Hessian::<M>::zeros();
    for (i, j) in Hessian::<M>::pairs() {
        let d = M::from_fn(|p, q| conjugated[p * n + q][(i, j)]);
        let rank_two = M::from_fn(|k, l| b[(j, k)] * y[(i, l)] + b[(i, l)] * y[(j, k)]);
        *hess.block_mut(i, j) = bt * d * *b + rank_two;
    }
    hess
}

impl<M: FixedMatrix> TargetMetric<M> for InverseTranspose<M> {
    fn name(&self) -> String {
        format!("invtrans({})", self.metric.name())
    }

    fn evaluate(&self, a: &M, w: &M) -> Result<Option<f64>, MetricError> {
        match Self::transformed(a, w)? {
            Some((b, v)) => self.metric.evaluate(&b, &v),
            None => Ok(None),
        }
    }

    fn evaluate_with_grad(&self, a: &M, w: &M) -> Result<Option<(f64, M)>, MetricError> {
        let (b, v) = match Self::transformed(a, w)? {
            Some(transformed) => transformed,
            None => return Ok(None),
        };

        Ok(self
            .metric
            .evaluate_with_grad(&b, &v)?
            .map(|(value, grad)| (value, grad_wrt_a(&b, &grad))))
    }

    fn evaluate_with_hess(
        &self,
        a: &M,
        w: &M,
    ) -> Result<Option<(f64, M, Hessian<M>)>, MetricError> {
        let (b, v) = match Self::transformed(a, w)? {
            Some(transformed) => transformed,
            None => return Ok(None),
        };

        Ok(self
            .metric
            .evaluate_with_hess(&b, &v)?
            .map(|(value, grad, hess)| {
                let hess = hess_wrt_a(&b, &grad, &hess);
                (value, grad_wrt_a(&b, &grad), hess)
            }))
    }
}
