//! Solver configuration.
//!
//! [`SolverOptions`] is a flat record with documented defaults. Builder
//! methods set single fields, [`SolverOptions::validate`] checks every range
//! before the solver touches the problem, and [`SolverOptions::from_map`]
//! reads the camelCase keys
//!
//! | key                         | field                          | default |
//! |-----------------------------|--------------------------------|---------|
//! | `tolerance`                 | `tolerance`                    | `Scalar::DEFAULT_TOLERANCE` |
//! | `relativeTolerance`         | `relative_tolerance`           | 0 |
//! | `maxIterations`             | `max_iterations`               | 1000 |
//! | `memorySize`                | `memory_size`                  | 10 |
//! | `initialStepSize`           | `initial_step_size`            | estimated |
//! | `lineSearchMaxTrials`       | `line_search_max_trials`       | 20 |
//! | `lineSearchBacktrackFactor` | `line_search_backtrack_factor` | 0.5 |
//! | `sufficientDecrease`        | `sufficient_decrease`          | 1e-4 |
//! | `adaptiveStepSize`          | `adaptive_step_size`           | true |
//! | `maxTimeSeconds`            | `max_time`                     | none |
//!
//! Unrecognised keys are ignored. With the `serde` feature the same keys
//! deserialise from any self-describing format.

use crate::{
    error::{Result, SolverError},
    line_search::EnvelopeLineSearch,
};
use num_traits::Float;
use proxsplit_core::core::types::Scalar;
use std::{collections::HashMap, time::Duration};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options of the splitting solver.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct SolverOptions<T: Scalar> {
    /// Absolute bound on the fixed-point residual `‖x − z‖`
    pub tolerance: T,
    /// Bound relative to the residual at the initial point
    pub relative_tolerance: T,
    pub max_iterations: usize,
    /// Number of curvature pairs kept by the quasi-Newton history
    pub memory_size: usize,
    /// Proximal step size γ; estimated from the gradient when `None`
    pub initial_step_size: Option<T>,
    pub line_search_max_trials: usize,
    pub line_search_backtrack_factor: T,
    /// Armijo constant of the envelope line search
    pub sufficient_decrease: T,
    /// Halve γ whenever the quadratic upper bound of the smooth term fails
    pub adaptive_step_size: bool,
    /// Wall-clock budget, checked once per iteration
    #[cfg_attr(
        feature = "serde",
        serde(rename = "maxTimeSeconds", with = "max_time_seconds")
    )]
    pub max_time: Option<Duration>,
}

impl<T: Scalar> Default for SolverOptions<T> {
    fn default() -> Self {
        Self {
            tolerance: T::DEFAULT_TOLERANCE,
            relative_tolerance: T::zero(),
            max_iterations: 1000,
            memory_size: 10,
            initial_step_size: None,
            line_search_max_trials: 20,
            line_search_backtrack_factor: <T as Scalar>::from_f64(0.5),
            sufficient_decrease: <T as Scalar>::from_f64(1e-4),
            adaptive_step_size: true,
            max_time: None,
        }
    }
}

impl<T: Scalar> SolverOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerance(mut self, tolerance: T) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_relative_tolerance(mut self, relative_tolerance: T) -> Self {
        self.relative_tolerance = relative_tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    /// Fixes γ instead of estimating it.
    pub fn with_initial_step_size(mut self, step_size: T) -> Self {
        self.initial_step_size = Some(step_size);
        self
    }

    pub fn with_line_search_max_trials(mut self, trials: usize) -> Self {
        self.line_search_max_trials = trials;
        self
    }

    pub fn with_line_search_backtrack_factor(mut self, factor: T) -> Self {
        self.line_search_backtrack_factor = factor;
        self
    }

    pub fn with_sufficient_decrease(mut self, c1: T) -> Self {
        self.sufficient_decrease = c1;
        self
    }

    pub fn with_adaptive_step_size(mut self, adaptive: bool) -> Self {
        self.adaptive_step_size = adaptive;
        self
    }

    pub fn with_max_time(mut self, max_time: Duration) -> Self {
        self.max_time = Some(max_time);
        self
    }

    /// Line search configured from these options.
    pub fn line_search(&self) -> EnvelopeLineSearch<T> {
        EnvelopeLineSearch::new(
            self.line_search_max_trials,
            self.line_search_backtrack_factor,
            self.sufficient_decrease,
        )
    }

    /// Checks every option against its admissible range.
    ///
    /// # Errors
    ///
    /// `InvalidConfiguration` naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        let zero = T::zero();
        let one = T::one();

        if !(Float::is_finite(self.tolerance) && self.tolerance > zero) {
            return Err(invalid("must be positive and finite", "tolerance", self.tolerance));
        }
        if !(Float::is_finite(self.relative_tolerance) && self.relative_tolerance >= zero) {
            return Err(invalid(
                "must be non-negative and finite",
                "relativeTolerance",
                self.relative_tolerance,
            ));
        }
        if self.max_iterations == 0 {
            return Err(invalid("must be at least 1", "maxIterations", 0));
        }
        if self.memory_size == 0 {
            return Err(invalid("must be at least 1", "memorySize", 0));
        }
        if let Some(gamma) = self.initial_step_size {
            if !(Float::is_finite(gamma) && gamma > zero) {
                return Err(invalid("must be positive and finite", "initialStepSize", gamma));
            }
        }
        if self.line_search_max_trials == 0 {
            return Err(invalid("must be at least 1", "lineSearchMaxTrials", 0));
        }
        let rho = self.line_search_backtrack_factor;
        if !(rho > zero && rho < one) {
            return Err(invalid("must lie in (0, 1)", "lineSearchBacktrackFactor", rho));
        }
        let c1 = self.sufficient_decrease;
        if !(c1 > zero && c1 < one) {
            return Err(invalid("must lie in (0, 1)", "sufficientDecrease", c1));
        }
        if let Some(max_time) = self.max_time {
            if max_time.is_zero() {
                return Err(invalid(
                    "must be positive",
                    "maxTimeSeconds",
                    max_time.as_secs_f64(),
                ));
            }
        }
        Ok(())
    }

    /// Builds options from a key/value map and validates them.
    ///
    /// Counts must be non-negative integers, `adaptiveStepSize` is true for
    /// any nonzero value and unrecognised keys are skipped.
    pub fn from_map(map: &HashMap<String, f64>) -> Result<Self> {
        let mut options = Self::default();
        for (key, &value) in map {
            match key.as_str() {
                "tolerance" => options.tolerance = scalar(key, value)?,
                "relativeTolerance" => options.relative_tolerance = scalar(key, value)?,
                "maxIterations" => options.max_iterations = count(key, value)?,
                "memorySize" => options.memory_size = count(key, value)?,
                "initialStepSize" => options.initial_step_size = Some(scalar(key, value)?),
                "lineSearchMaxTrials" => options.line_search_max_trials = count(key, value)?,
                "lineSearchBacktrackFactor" => {
                    options.line_search_backtrack_factor = scalar(key, value)?
                }
                "sufficientDecrease" => options.sufficient_decrease = scalar(key, value)?,
                "adaptiveStepSize" => options.adaptive_step_size = value != 0.0,
                "maxTimeSeconds" => {
                    let max_time = Duration::try_from_secs_f64(value)
                        .map_err(|_| invalid("must be a non-negative duration", key.as_str(), value))?;
                    options.max_time = Some(max_time);
                }
                other => log::debug!("ignoring unknown solver option `{}`", other),
            }
        }
        options.validate()?;
        Ok(options)
    }
}

fn invalid<V: std::fmt::Display>(reason: &str, parameter: &str, value: V) -> SolverError {
    SolverError::invalid_configuration(reason, parameter, value)
}

fn scalar<T: Scalar>(key: &str, value: f64) -> Result<T> {
    <T as Scalar>::try_from_f64(value)
        .ok_or_else(|| invalid("is not representable in this precision", key, value))
}

fn count(key: &str, value: f64) -> Result<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < usize::MAX as f64 {
        Ok(value as usize)
    } else {
        Err(invalid("must be a non-negative integer", key, value))
    }
}

#[cfg(feature = "serde")]
mod max_time_seconds {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(|seconds| Duration::try_from_secs_f64(seconds).map_err(D::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parameter_of(err: SolverError) -> String {
        match err {
            SolverError::InvalidConfiguration { parameter, .. } => parameter,
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let options = SolverOptions::<f64>::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.tolerance, 1e-8);
        assert_eq!(options.max_iterations, 1000);
        assert_eq!(options.memory_size, 10);
        assert_eq!(options.initial_step_size, None);
        assert_eq!(options.line_search_max_trials, 20);
        assert_eq!(options.line_search_backtrack_factor, 0.5);
        assert_eq!(options.sufficient_decrease, 1e-4);
        assert!(options.adaptive_step_size);
        assert!(SolverOptions::<f32>::default().validate().is_ok());
    }

    #[test]
    fn test_each_invalid_value_is_rejected() {
        let base = SolverOptions::<f64>::default;
        let cases: Vec<(SolverOptions<f64>, &str)> = vec![
            (base().with_tolerance(0.0), "tolerance"),
            (base().with_tolerance(f64::NAN), "tolerance"),
            (base().with_relative_tolerance(-1e-3), "relativeTolerance"),
            (base().with_max_iterations(0), "maxIterations"),
            (base().with_memory_size(0), "memorySize"),
            (base().with_initial_step_size(-0.1), "initialStepSize"),
            (base().with_initial_step_size(f64::INFINITY), "initialStepSize"),
            (base().with_line_search_max_trials(0), "lineSearchMaxTrials"),
            (base().with_line_search_backtrack_factor(1.0), "lineSearchBacktrackFactor"),
            (base().with_line_search_backtrack_factor(0.0), "lineSearchBacktrackFactor"),
            (base().with_sufficient_decrease(1.5), "sufficientDecrease"),
            (base().with_max_time(Duration::ZERO), "maxTimeSeconds"),
        ];
        for (options, parameter) in cases {
            let err = options.validate().unwrap_err();
            assert_eq!(parameter_of(err), parameter);
        }
    }

    #[test]
    fn test_from_map_reads_known_keys() {
        let map: HashMap<String, f64> = [
            ("tolerance", 1e-10),
            ("maxIterations", 250.0),
            ("memorySize", 5.0),
            ("initialStepSize", 0.1),
            ("adaptiveStepSize", 0.0),
            ("maxTimeSeconds", 2.5),
            ("verbosity", 3.0),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let options = SolverOptions::<f64>::from_map(&map).unwrap();
        assert_eq!(
            options,
            SolverOptions::default()
                .with_tolerance(1e-10)
                .with_max_iterations(250)
                .with_memory_size(5)
                .with_initial_step_size(0.1)
                .with_adaptive_step_size(false)
                .with_max_time(Duration::from_millis(2500))
        );
    }

    #[test]
    fn test_from_map_rejects_bad_values() {
        let single = |key: &str, value: f64| {
            let map = HashMap::from([(key.to_string(), value)]);
            SolverOptions::<f64>::from_map(&map)
        };
        assert_eq!(parameter_of(single("maxIterations", 2.5).unwrap_err()), "maxIterations");
        assert_eq!(parameter_of(single("memorySize", -1.0).unwrap_err()), "memorySize");
        assert_eq!(parameter_of(single("maxTimeSeconds", -1.0).unwrap_err()), "maxTimeSeconds");
        assert_eq!(parameter_of(single("tolerance", -1.0).unwrap_err()), "tolerance");
        assert!(single("unknown", f64::NAN).is_ok());
    }

    #[test]
    fn test_counts_beyond_usize_are_rejected() {
        // `usize::MAX as f64` rounds up to a power of two outside the range
        assert!(count("maxIterations", usize::MAX as f64).is_err());
        assert!(count("maxIterations", 2.0 * usize::MAX as f64).is_err());
        assert_eq!(count("maxIterations", 4096.0).unwrap(), 4096);
    }

    #[test]
    fn test_line_search_from_options() {
        let options = SolverOptions::<f64>::default()
            .with_line_search_max_trials(7)
            .with_line_search_backtrack_factor(0.3);
        let search = options.line_search();
        assert_eq!(search.max_trials, 7);
        assert_eq!(search.backtrack_factor, 0.3);
        assert_eq!(search.sufficient_decrease, 1e-4);
    }
}
