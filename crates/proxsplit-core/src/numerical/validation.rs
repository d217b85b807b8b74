//! Numerical validation utilities.
//!
//! Finite-value guards used on every function output, plus derivative and
//! prox checks for validating new function implementations.

use crate::core::{
    error::{ProxError, Result},
    function::{ProximalFunction, SmoothFunction},
    types::Scalar,
};
use nalgebra::DVector;
use num_traits::Float;

/// Fails with `NumericalFailure` unless `value` is finite.
pub fn ensure_finite<T: Scalar>(what: &str, value: T) -> Result<T> {
    if Float::is_finite(value) {
        Ok(value)
    } else {
        Err(ProxError::numerical_failure(format!(
            "{} is not finite ({})",
            what, value
        )))
    }
}

/// Fails with `NumericalFailure` unless every entry of `v` is finite.
pub fn ensure_finite_vector<T: Scalar>(what: &str, v: &DVector<T>) -> Result<()> {
    match v.iter().position(|x| !Float::is_finite(*x)) {
        None => Ok(()),
        Some(i) => Err(ProxError::numerical_failure(format!(
            "{} has a non-finite entry at index {} ({})",
            what, i, v[i]
        ))),
    }
}

/// Configuration for numerical validation tests.
#[derive(Debug, Clone)]
pub struct NumericalValidationConfig<T> {
    /// Step size for central differences
    pub base_step_size: T,
    /// Tolerance for gradient checking
    pub gradient_tolerance: T,
    /// Tolerance for the prox optimality check
    pub prox_tolerance: T,
    /// Magnitude of the perturbations used by the prox check
    pub perturbation: T,
}

impl<T: Scalar> Default for NumericalValidationConfig<T> {
    fn default() -> Self {
        Self {
            base_step_size: <T as Scalar>::from_f64(1e-6),
            gradient_tolerance: <T as Scalar>::from_f64(1e-6),
            prox_tolerance: <T as Scalar>::from_f64(1e-10),
            perturbation: <T as Scalar>::from_f64(1e-3),
        }
    }
}

/// Results from gradient checking.
#[derive(Debug)]
pub struct GradientCheckResult<T> {
    /// Maximum relative error over all components
    pub max_relative_error: T,
    /// Whether the check passed
    pub passed: bool,
    /// Individual errors for each component
    pub component_errors: Vec<T>,
}

/// Numerical validation tools for function implementations.
pub struct NumericalValidator;

impl NumericalValidator {
    /// Compares the analytical gradient with central differences, one
    /// coordinate at a time.
    pub fn check_gradient<T, F>(
        f: &F,
        point: &DVector<T>,
        config: &NumericalValidationConfig<T>,
    ) -> Result<GradientCheckResult<T>>
    where
        T: Scalar,
        F: SmoothFunction<T> + ?Sized,
    {
        let analytical = f.gradient(point)?;
        let h = config.base_step_size;
        let two = <T as Scalar>::from_f64(2.0);

        let mut component_errors = Vec::with_capacity(point.len());
        for i in 0..point.len() {
            let mut plus = point.clone();
            let mut minus = point.clone();
            plus[i] += h;
            minus[i] -= h;
            let numerical = (f.value(&plus)? - f.value(&minus)?) / (two * h);

            let error = <T as Float>::abs(analytical[i] - numerical);
            let scale = <T as Float>::max(
                <T as Float>::max(<T as Float>::abs(analytical[i]), <T as Float>::abs(numerical)),
                T::one(),
            );
            component_errors.push(error / scale);
        }

        let max_relative_error = component_errors
            .iter()
            .cloned()
            .fold(T::zero(), |a, b| <T as Float>::max(a, b));

        Ok(GradientCheckResult {
            max_relative_error,
            passed: max_relative_error < config.gradient_tolerance,
            component_errors,
        })
    }

    /// Checks that `z = prox_{γ g}(x)` does not lose to nearby points on the
    /// prox objective `g(w) + ‖w − x‖² / (2γ)`.
    ///
    /// Perturbations along each coordinate axis (both signs) are tried;
    /// returns the largest decrease found, which should be at most the
    /// configured tolerance for a correct prox of a convex function.
    pub fn check_prox<T, G>(
        g: &G,
        x: &DVector<T>,
        gamma: T,
        config: &NumericalValidationConfig<T>,
    ) -> Result<(bool, T)>
    where
        T: Scalar,
        G: ProximalFunction<T> + ?Sized,
    {
        let z = g.prox(x, gamma)?;
        let two = <T as Scalar>::from_f64(2.0);
        let objective = |w: &DVector<T>| -> Result<T> {
            Ok(g.value(w)? + (w - x).norm_squared() / (two * gamma))
        };
        let base = objective(&z)?;

        let mut worst = T::zero();
        for i in 0..z.len() {
            for sign in [T::one(), -T::one()] {
                let mut w = z.clone();
                w[i] += sign * config.perturbation;
                let candidate = objective(&w)?;
                // infinite values mean the perturbation left the domain
                if Float::is_finite(candidate) {
                    worst = <T as Float>::max(worst, base - candidate);
                }
            }
        }
        Ok((worst <= config.prox_tolerance, worst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Cubic;

    impl SmoothFunction<f64> for Cubic {
        fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
            Ok((x.iter().map(|v| v.powi(3)).sum(), x.map(|v| 3.0 * v * v)))
        }
    }

    #[derive(Debug)]
    struct WrongGradient;

    impl SmoothFunction<f64> for WrongGradient {
        fn value_and_gradient(&self, x: &DVector<f64>) -> Result<(f64, DVector<f64>)> {
            Ok((x.norm_squared(), x.clone()))
        }
    }

    #[derive(Debug)]
    struct HalfSquaredNorm {
        broken: bool,
    }

    impl ProximalFunction<f64> for HalfSquaredNorm {
        fn value(&self, x: &DVector<f64>) -> Result<f64> {
            Ok(0.5 * x.norm_squared())
        }

        fn prox(&self, x: &DVector<f64>, gamma: f64) -> Result<DVector<f64>> {
            if self.broken {
                Ok(x.clone())
            } else {
                Ok(x / (1.0 + gamma))
            }
        }
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite("value", 1.5).unwrap(), 1.5);
        assert!(ensure_finite("value", f64::NAN).unwrap_err().is_numerical());

        let v = DVector::from_vec(vec![1.0, f64::INFINITY]);
        let err = ensure_finite_vector("gradient", &v).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn test_check_gradient() {
        let config = NumericalValidationConfig::default();
        let x = DVector::from_vec(vec![0.5, -1.0, 2.0]);
        let good = NumericalValidator::check_gradient(&Cubic, &x, &config).unwrap();
        assert!(good.passed, "max error {}", good.max_relative_error);
        assert_eq!(good.component_errors.len(), 3);

        let bad = NumericalValidator::check_gradient(&WrongGradient, &x, &config).unwrap();
        assert!(!bad.passed);
    }

    #[test]
    fn test_check_prox() {
        let config = NumericalValidationConfig::default();
        let x = DVector::from_vec(vec![1.0, -2.0]);
        let (ok, _) =
            NumericalValidator::check_prox(&HalfSquaredNorm { broken: false }, &x, 0.5, &config)
                .unwrap();
        assert!(ok);

        let (ok, gap) =
            NumericalValidator::check_prox(&HalfSquaredNorm { broken: true }, &x, 0.5, &config)
                .unwrap();
        assert!(!ok);
        assert!(gap > 0.0);
    }
}
