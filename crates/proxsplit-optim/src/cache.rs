//! Memoised evaluation of forward-backward quantities at one point.
//!
//! Every quantity the solver needs at an iterate `x` for a step size `γ`
//! derives from a short chain
//!
//! ```text
//! A x + b ─▶ f, ∇(f∘A) ─▶ forward step x − γ∇ ─▶ z = prox_{γg}(·)
//!         ─▶ residual r = x − z ─▶ envelope value φ_γ(x), gradient ∇φ_γ(x)
//! ```
//!
//! [`EvaluationCache`] keeps one snapshot of this chain, keyed by the exact
//! point and step size. Asking for a quantity computes only the missing
//! links. A different point discards the whole snapshot; a different step
//! size at the same point keeps `A x + b`, `f` and `∇(f∘A)`.

use crate::problem::Problem;
use nalgebra::DVector;
use proxsplit_core::{
    core::{
        error::Result,
        function::{ProximalFunction, SmoothFunction},
        types::Scalar,
    },
    numerical::{ensure_finite, ensure_finite_vector},
};

/// Hit/miss totals and per-quantity computation counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests answered from the snapshot
    pub hits: usize,
    /// Requests that computed something
    pub misses: usize,
    /// Evaluations of `f(A x + b)` with its gradient
    pub smooth_evaluations: usize,
    pub forward_steps: usize,
    /// Evaluations of `prox_{γg}` (with `g` at the result)
    pub prox_evaluations: usize,
    pub residuals: usize,
    /// Evaluations of `f(A z + b)` for the step-size check
    pub smooth_at_prox_evaluations: usize,
    pub envelope_values: usize,
    pub envelope_gradients: usize,
    /// Hessian-vector products of the smooth term
    pub hessian_products: usize,
}

#[derive(Debug, Clone)]
struct Snapshot<T: Scalar> {
    point: Option<DVector<T>>,
    step_size: Option<T>,
    image: Option<DVector<T>>,
    smooth: Option<(T, DVector<T>)>,
    forward: Option<DVector<T>>,
    prox: Option<(DVector<T>, T)>,
    residual: Option<(DVector<T>, T)>,
    smooth_at_prox: Option<T>,
    envelope_value: Option<T>,
    envelope_gradient: Option<DVector<T>>,
}

impl<T: Scalar> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            point: None,
            step_size: None,
            image: None,
            smooth: None,
            forward: None,
            prox: None,
            residual: None,
            smooth_at_prox: None,
            envelope_value: None,
            envelope_gradient: None,
        }
    }
}

impl<T: Scalar> Snapshot<T> {
    fn clear_step_dependent(&mut self) {
        self.forward = None;
        self.prox = None;
        self.residual = None;
        self.smooth_at_prox = None;
        self.envelope_value = None;
        self.envelope_gradient = None;
    }
}

/// Single-snapshot cache over a [`Problem`].
///
/// # Example
///
/// ```rust
/// use nalgebra::DVector;
/// use proxsplit_core::prelude::*;
/// use proxsplit_optim::{EvaluationCache, Problem};
///
/// #[derive(Debug)]
/// struct HalfSquared;
///
/// impl SmoothFunction<f64> for HalfSquared {
///     fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
///         Ok((0.5 * x.norm_squared(), x.clone()))
///     }
/// }
///
/// #[derive(Debug)]
/// struct NoPenalty;
///
/// impl ProximalFunction<f64> for NoPenalty {
///     fn value(&self, _x: &DVector<f64>) -> Result<f64> { Ok(0.0) }
///     fn prox(&self, x: &DVector<f64>, _gamma: f64) -> Result<DVector<f64>> { Ok(x.clone()) }
/// }
///
/// let problem = Problem::new(&HalfSquared, &NoPenalty);
/// let mut cache = EvaluationCache::new(&problem);
/// let x = DVector::from_vec(vec![3.0, -4.0]);
///
/// let r1 = cache.fixed_point_residual(&x, 0.5).unwrap();
/// let r2 = cache.fixed_point_residual(&x, 0.5).unwrap();
/// assert_eq!(r1, r2);
/// assert_eq!(cache.stats().smooth_evaluations, 1);
/// ```
#[derive(Debug)]
pub struct EvaluationCache<'p, T, F, G>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    problem: &'p Problem<'p, T, F, G>,
    snapshot: Snapshot<T>,
    stats: CacheStats,
}

impl<'p, T, F, G> EvaluationCache<'p, T, F, G>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    /// Creates an empty cache.
    pub fn new(problem: &'p Problem<'p, T, F, G>) -> Self {
        Self {
            problem,
            snapshot: Snapshot::default(),
            stats: CacheStats::default(),
        }
    }

    /// Returns the underlying problem.
    pub fn problem(&self) -> &'p Problem<'p, T, F, G> {
        self.problem
    }

    /// Returns the statistics accumulated since creation or the last reset.
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = CacheStats::default();
    }

    /// Drops the snapshot.
    pub fn invalidate(&mut self) {
        self.snapshot = Snapshot::default();
    }

    /// Point the snapshot belongs to, if any.
    pub fn cached_point(&self) -> Option<&DVector<T>> {
        self.snapshot.point.as_ref()
    }

    /// Step size the step-dependent fields belong to, if any.
    pub fn cached_step_size(&self) -> Option<T> {
        self.snapshot.step_size
    }

    fn sync_point(&mut self, point: &DVector<T>) {
        if self.snapshot.point.as_ref() != Some(point) {
            log::trace!("evaluation cache: new point, snapshot dropped");
            self.snapshot = Snapshot {
                point: Some(point.clone()),
                ..Snapshot::default()
            };
        }
    }

    fn sync(&mut self, point: &DVector<T>, gamma: T) {
        self.sync_point(point);
        if self.snapshot.step_size != Some(gamma) {
            self.snapshot.clear_step_dependent();
            self.snapshot.step_size = Some(gamma);
        }
    }

    fn record(&mut self, hit: bool) {
        if hit {
            self.stats.hits += 1;
        } else {
            self.stats.misses += 1;
        }
    }

    fn ensure_smooth(&mut self) -> Result<()> {
        if self.snapshot.smooth.is_some() {
            return Ok(());
        }
        let Some(point) = self.snapshot.point.as_ref() else {
            return Ok(());
        };
        let (value, grad, image) = self.problem.smooth_value_and_gradient(point)?;
        ensure_finite("smooth value", value)?;
        ensure_finite_vector("smooth gradient", &grad)?;
        self.stats.smooth_evaluations += 1;
        self.snapshot.image = Some(image);
        self.snapshot.smooth = Some((value, grad));
        Ok(())
    }

    fn ensure_forward(&mut self, gamma: T) -> Result<()> {
        if self.snapshot.forward.is_some() {
            return Ok(());
        }
        self.ensure_smooth()?;
        if let (Some(point), Some((_, grad))) = (&self.snapshot.point, &self.snapshot.smooth) {
            self.snapshot.forward = Some(point - grad * gamma);
            self.stats.forward_steps += 1;
        }
        Ok(())
    }

    fn ensure_prox(&mut self, gamma: T) -> Result<()> {
        if self.snapshot.prox.is_some() {
            return Ok(());
        }
        self.ensure_forward(gamma)?;
        if let Some(forward) = &self.snapshot.forward {
            let (z, value) = self.problem.prox_with_value(forward, gamma)?;
            ensure_finite_vector("proximal point", &z)?;
            ensure_finite("nonsmooth value at the proximal point", value)?;
            self.stats.prox_evaluations += 1;
            self.snapshot.prox = Some((z, value));
        }
        Ok(())
    }

    fn ensure_residual(&mut self, gamma: T) -> Result<()> {
        if self.snapshot.residual.is_some() {
            return Ok(());
        }
        self.ensure_prox(gamma)?;
        if let (Some(point), Some((z, _))) = (&self.snapshot.point, &self.snapshot.prox) {
            let r = point - z;
            let norm = r.norm();
            self.stats.residuals += 1;
            self.snapshot.residual = Some((r, norm));
        }
        Ok(())
    }

    fn ensure_envelope_value(&mut self, gamma: T) -> Result<()> {
        if self.snapshot.envelope_value.is_some() {
            return Ok(());
        }
        self.ensure_residual(gamma)?;
        if let (Some((f, grad)), Some((_, g)), Some((r, norm))) = (
            &self.snapshot.smooth,
            &self.snapshot.prox,
            &self.snapshot.residual,
        ) {
            let two = <T as Scalar>::from_f64(2.0);
            let value = *f + *g - grad.dot(r) + *norm * *norm / (two * gamma);
            self.snapshot.envelope_value = Some(ensure_finite("envelope value", value)?);
            self.stats.envelope_values += 1;
        }
        Ok(())
    }

    fn ensure_envelope_gradient(&mut self, gamma: T) -> Result<()> {
        if self.snapshot.envelope_gradient.is_some() {
            return Ok(());
        }
        self.ensure_residual(gamma)?;
        if let (Some(image), Some((r, _))) = (&self.snapshot.image, &self.snapshot.residual) {
            let hr = self.problem.smooth_hessian_product(image, r)?;
            self.stats.hessian_products += 1;
            let grad = (r - hr * gamma) / gamma;
            ensure_finite_vector("envelope gradient", &grad)?;
            self.snapshot.envelope_gradient = Some(grad);
            self.stats.envelope_gradients += 1;
        }
        Ok(())
    }

    fn ensure_smooth_at_prox(&mut self, gamma: T) -> Result<()> {
        if self.snapshot.smooth_at_prox.is_some() {
            return Ok(());
        }
        self.ensure_prox(gamma)?;
        if let Some((z, _)) = &self.snapshot.prox {
            let value = self.problem.smooth_value(z)?;
            self.snapshot.smooth_at_prox = Some(ensure_finite("smooth value at the proximal point", value)?);
            self.stats.smooth_at_prox_evaluations += 1;
        }
        Ok(())
    }

    /// `(f(A x + b), Aᵀ ∇f(A x + b))`.
    pub fn value_and_gradient_of_smooth(&mut self, point: &DVector<T>) -> Result<(T, DVector<T>)> {
        self.sync_point(point);
        self.record(self.snapshot.smooth.is_some());
        self.ensure_smooth()?;
        self.snapshot
            .smooth
            .clone()
            .ok_or_else(missing)
    }

    /// `x − γ ∇(f∘A)(x)`.
    pub fn forward_step(&mut self, point: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        self.sync(point, gamma);
        self.record(self.snapshot.forward.is_some());
        self.ensure_forward(gamma)?;
        self.snapshot.forward.clone().ok_or_else(missing)
    }

    /// `z = prox_{γg}(x − γ ∇(f∘A)(x))`.
    pub fn forward_backward_step(&mut self, point: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        self.sync(point, gamma);
        self.record(self.snapshot.prox.is_some());
        self.ensure_prox(gamma)?;
        self.snapshot
            .prox
            .as_ref()
            .map(|(z, _)| z.clone())
            .ok_or_else(missing)
    }

    /// `g(z)` at the forward-backward step.
    pub fn nonsmooth_value_at_prox(&mut self, point: &DVector<T>, gamma: T) -> Result<T> {
        self.sync(point, gamma);
        self.record(self.snapshot.prox.is_some());
        self.ensure_prox(gamma)?;
        self.snapshot
            .prox
            .as_ref()
            .map(|(_, g)| *g)
            .ok_or_else(missing)
    }

    /// `r = x − z`.
    pub fn fixed_point_residual(&mut self, point: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        self.sync(point, gamma);
        self.record(self.snapshot.residual.is_some());
        self.ensure_residual(gamma)?;
        self.snapshot
            .residual
            .as_ref()
            .map(|(r, _)| r.clone())
            .ok_or_else(missing)
    }

    /// `‖x − z‖`.
    pub fn residual_norm(&mut self, point: &DVector<T>, gamma: T) -> Result<T> {
        self.sync(point, gamma);
        self.record(self.snapshot.residual.is_some());
        self.ensure_residual(gamma)?;
        self.snapshot
            .residual
            .as_ref()
            .map(|(_, n)| *n)
            .ok_or_else(missing)
    }

    /// `φ_γ(x) = f(x) + g(z) − ⟨∇f(x), r⟩ + ‖r‖² / (2γ)`.
    pub fn envelope_value(&mut self, point: &DVector<T>, gamma: T) -> Result<T> {
        self.sync(point, gamma);
        self.record(self.snapshot.envelope_value.is_some());
        self.ensure_envelope_value(gamma)?;
        self.snapshot.envelope_value.ok_or_else(missing)
    }

    /// `∇φ_γ(x) = (r − γ ∇²(f∘A)(x) r) / γ`.
    pub fn envelope_gradient(&mut self, point: &DVector<T>, gamma: T) -> Result<DVector<T>> {
        self.sync(point, gamma);
        self.record(self.snapshot.envelope_gradient.is_some());
        self.ensure_envelope_gradient(gamma)?;
        self.snapshot.envelope_gradient.clone().ok_or_else(missing)
    }

    /// `f(A z + b)` at the forward-backward step.
    pub fn smooth_value_at_prox(&mut self, point: &DVector<T>, gamma: T) -> Result<T> {
        self.sync(point, gamma);
        self.record(self.snapshot.smooth_at_prox.is_some());
        self.ensure_smooth_at_prox(gamma)?;
        self.snapshot.smooth_at_prox.ok_or_else(missing)
    }
}

fn missing() -> proxsplit_core::ProxError {
    proxsplit_core::ProxError::numerical_failure("evaluation cache has no point")
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proxsplit_core::core::function::CountingSmoothFunction;

    #[derive(Debug)]
    struct HalfSquared;

    impl SmoothFunction<f64> for HalfSquared {
        fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
            Ok((0.5 * x.norm_squared(), x.clone()))
        }

        fn hessian_vector_product(&self, _x: &DVector<f64>, v: &DVector<f64>) -> Result<DVector<f64>> {
            Ok(v.clone())
        }
    }

    #[derive(Debug)]
    struct Absolute;

    impl ProximalFunction<f64> for Absolute {
        fn value(&self, x: &DVector<f64>) -> Result<f64> {
            Ok(x.lp_norm(1))
        }

        fn prox(&self, x: &DVector<f64>, gamma: f64) -> Result<DVector<f64>> {
            Ok(x.map(|v| v.signum() * (v.abs() - gamma).max(0.0)))
        }
    }

    #[test]
    fn test_envelope_formulas() {
        let problem = Problem::new(&HalfSquared, &Absolute);
        let mut cache = EvaluationCache::new(&problem);
        let x = DVector::from_vec(vec![3.0, -0.2]);
        let gamma = 0.5;

        // forward = x − γx = [1.5, −0.1]; z = [1.0, 0.0]; r = [2.0, −0.2]
        assert_relative_eq!(
            cache.forward_step(&x, gamma).unwrap(),
            DVector::from_vec(vec![1.5, -0.1])
        );
        let z = cache.forward_backward_step(&x, gamma).unwrap();
        assert_relative_eq!(z, DVector::from_vec(vec![1.0, 0.0]));
        let r = cache.fixed_point_residual(&x, gamma).unwrap();
        assert_relative_eq!(r, DVector::from_vec(vec![2.0, -0.2]));

        let f = 0.5 * (9.0 + 0.04);
        let expected = f + 1.0 - (3.0 * 2.0 + 0.04) + (4.0 + 0.04) / (2.0 * gamma);
        assert_relative_eq!(cache.envelope_value(&x, gamma).unwrap(), expected, epsilon = 1e-12);

        // (r − γ r) / γ with an identity Hessian
        assert_relative_eq!(
            cache.envelope_gradient(&x, gamma).unwrap(),
            DVector::from_vec(vec![2.0, -0.2]),
            epsilon = 1e-12
        );
        assert_relative_eq!(cache.nonsmooth_value_at_prox(&x, gamma).unwrap(), 1.0);
        assert_relative_eq!(cache.smooth_value_at_prox(&x, gamma).unwrap(), 0.5);
    }

    #[test]
    fn test_repeated_requests_hit() {
        let f = CountingSmoothFunction::new(HalfSquared);
        let problem = Problem::new(&f, &Absolute);
        let mut cache = EvaluationCache::new(&problem);
        let x = DVector::from_vec(vec![1.0, 2.0]);

        let phi = cache.envelope_value(&x, 0.5).unwrap();
        let again = cache.envelope_value(&x, 0.5).unwrap();
        assert_eq!(phi, again);
        cache.residual_norm(&x, 0.5).unwrap();
        cache.forward_step(&x, 0.5).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.smooth_evaluations, 1);
        assert_eq!(stats.prox_evaluations, 1);
        assert_eq!(f.counts(), (1, 1, 0));
    }

    #[test]
    fn test_step_size_change_keeps_gradient() {
        let f = CountingSmoothFunction::new(HalfSquared);
        let problem = Problem::new(&f, &Absolute);
        let mut cache = EvaluationCache::new(&problem);
        let x = DVector::from_vec(vec![1.0, 2.0]);

        cache.residual_norm(&x, 0.5).unwrap();
        cache.residual_norm(&x, 0.25).unwrap();
        assert_eq!(cache.cached_step_size(), Some(0.25));
        assert_eq!(cache.stats().smooth_evaluations, 1);
        assert_eq!(cache.stats().prox_evaluations, 2);

        let y = DVector::from_vec(vec![1.0, 2.5]);
        cache.residual_norm(&y, 0.25).unwrap();
        assert_eq!(cache.stats().smooth_evaluations, 2);
        assert_eq!(cache.cached_point(), Some(&y));

        cache.invalidate();
        assert!(cache.cached_point().is_none());
        cache.reset_stats();
        assert_eq!(cache.stats(), CacheStats::default());
    }

    #[test]
    fn test_non_finite_gradient_is_numerical_failure() {
        #[derive(Debug)]
        struct Broken;

        impl SmoothFunction<f64> for Broken {
            fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
                Ok((0.0, x.map(|_| f64::NAN)))
            }
        }

        let problem = Problem::new(&Broken, &Absolute);
        let mut cache = EvaluationCache::new(&problem);
        let err = cache
            .envelope_value(&DVector::from_vec(vec![1.0]), 1.0)
            .unwrap_err();
        assert!(err.is_numerical());
    }
}
