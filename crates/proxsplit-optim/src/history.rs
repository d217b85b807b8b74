//! Limited-memory quasi-Newton history.
//!
//! Pairs `(s, y)` live in a fixed ring of `m` slots. The pair pushed as the
//! `k`-th accepted update (counting from zero over the buffer's lifetime)
//! occupies slot `k mod m`, so lookups by global index and by recency are
//! plain modular arithmetic.
//!
//! Directions come from the two-loop recursion
//!
//! ```text
//! q = g
//! for i = newest .. oldest:   α_i = ρ_i ⟨s_i, q⟩;  q -= α_i y_i
//! r = H₀ q,  H₀ = ⟨s, y⟩ / ⟨y, y⟩ of the newest pair
//! for i = oldest .. newest:   β = ρ_i ⟨y_i, r⟩;   r += (α_i − β) s_i
//! d = −r
//! ```
//!
//! with `ρ_i = 1 / ⟨s_i, y_i⟩`. Pairs violating the curvature condition are
//! never stored, so the implicit inverse Hessian stays positive definite and
//! `d` is a descent direction for any nonzero `g`.

use nalgebra::DVector;
use proxsplit_core::{
    core::{
        error::{ProxError, Result},
        types::Scalar,
    },
};

/// One stored update with its cached inner product `⟨s, y⟩`.
#[derive(Debug, Clone, PartialEq)]
pub struct CurvaturePair<T: Scalar> {
    /// Step `x⁺ − x`
    pub s: DVector<T>,
    /// Gradient change `∇φ(x⁺) − ∇φ(x)`
    pub y: DVector<T>,
    /// `⟨s, y⟩`, strictly positive
    pub sy: T,
}

/// Ring buffer of curvature pairs with the two-loop recursion.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T: Scalar> {
    slots: Vec<Option<CurvaturePair<T>>>,
    len: usize,
    total_pushed: usize,
}

impl<T: Scalar> HistoryBuffer<T> {
    /// Creates an empty buffer holding at most `capacity` pairs.
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(ProxError::invalid_parameter(
                "history capacity must be at least 1",
            ));
        }
        Ok(Self {
            slots: vec![None; capacity],
            len: 0,
            total_pushed: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of pairs accepted over the buffer's lifetime, resets included.
    pub fn total_pushed(&self) -> usize {
        self.total_pushed
    }

    /// Forgets every stored pair. Global indices keep counting.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.len = 0;
    }

    /// Stores `(s, y)` unless it fails the curvature condition.
    ///
    /// Returns `false`, leaving the buffer untouched, when the dimensions
    /// disagree, an entry is not finite, or
    /// `⟨s, y⟩ ≤ CURVATURE_TOLERANCE · ‖s‖ ‖y‖`.
    pub fn push(&mut self, s: DVector<T>, y: DVector<T>) -> bool {
        if s.len() != y.len() || s.is_empty() {
            return false;
        }
        if let Some(newest) = self.iter_recent().next() {
            if newest.s.len() != s.len() {
                return false;
            }
        }
        let sy = s.dot(&y);
        let bound = T::CURVATURE_TOLERANCE * s.norm() * y.norm();
        if !<T as num_traits::Float>::is_finite(sy)
            || !<T as num_traits::Float>::is_finite(bound)
            || sy <= bound
        {
            log::trace!("curvature pair rejected (s·y = {})", sy);
            return false;
        }

        let capacity = self.capacity();
        self.slots[self.total_pushed % capacity] = Some(CurvaturePair { s, y, sy });
        self.total_pushed += 1;
        self.len = (self.len + 1).min(capacity);
        true
    }

    /// Slot holding the pair with global index `k`, if it is still stored.
    pub fn index_of(&self, k: usize) -> Option<usize> {
        if k < self.total_pushed && self.total_pushed - k <= self.len {
            Some(k % self.capacity())
        } else {
            None
        }
    }

    /// Recency of slot `j`: 0 for the newest pair, `len − 1` for the oldest.
    pub fn age(&self, j: usize) -> Option<usize> {
        let capacity = self.capacity();
        if j >= capacity || self.len == 0 {
            return None;
        }
        let newest = (self.total_pushed - 1) % capacity;
        let age = (newest + capacity - j) % capacity;
        (age < self.len).then_some(age)
    }

    /// Stored pairs from newest to oldest.
    pub fn iter_recent(&self) -> impl Iterator<Item = &CurvaturePair<T>> + '_ {
        let capacity = self.capacity();
        let total = self.total_pushed;
        (0..self.len).filter_map(move |age| self.slots[(total - 1 - age) % capacity].as_ref())
    }

    /// Quasi-Newton direction `−H g`.
    ///
    /// An empty buffer yields exactly `−g`.
    ///
    /// # Errors
    ///
    /// `DimensionMismatch` when `g` does not match the stored pairs.
    pub fn compute_direction(&self, g: &DVector<T>) -> Result<DVector<T>> {
        let Some(newest) = self.iter_recent().next() else {
            return Ok(-g);
        };
        if newest.s.len() != g.len() {
            return Err(ProxError::dimension_mismatch(newest.s.len(), g.len()));
        }

        let mut q = g.clone();
        let mut alphas = Vec::with_capacity(self.len);
        for pair in self.iter_recent() {
            let alpha = pair.s.dot(&q) / pair.sy;
            q.axpy(-alpha, &pair.y, T::one());
            alphas.push(alpha);
        }

        let gamma = newest.sy / newest.y.norm_squared();
        let mut r = q * gamma;

        let pairs: Vec<&CurvaturePair<T>> = self.iter_recent().collect();
        for (pair, alpha) in pairs.iter().rev().zip(alphas.iter().rev()) {
            let beta = pair.y.dot(&r) / pair.sy;
            r.axpy(*alpha - beta, &pair.s, T::one());
        }

        Ok(-r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn v(data: &[f64]) -> DVector<f64> {
        DVector::from_column_slice(data)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(HistoryBuffer::<f64>::new(0).is_err());
    }

    #[test]
    fn test_empty_buffer_returns_negative_gradient() {
        let buffer = HistoryBuffer::<f64>::new(3).unwrap();
        let g = v(&[1.0, -2.0, 0.5]);
        assert_eq!(buffer.compute_direction(&g).unwrap(), -g);
    }

    #[test]
    fn test_curvature_rejection() {
        let mut buffer = HistoryBuffer::<f64>::new(3).unwrap();
        assert!(!buffer.push(v(&[1.0, 0.0]), v(&[-1.0, 0.0])));
        assert!(!buffer.push(v(&[1.0, 0.0]), v(&[0.0, 1.0])));
        assert!(!buffer.push(v(&[1.0, 0.0]), v(&[f64::NAN, 1.0])));
        assert!(!buffer.push(v(&[1.0, 0.0]), v(&[1.0])));
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_pushed(), 0);

        assert!(buffer.push(v(&[1.0, 0.0]), v(&[2.0, 0.0])));
        assert!(!buffer.push(v(&[1.0, 0.0, 0.0]), v(&[2.0, 0.0, 0.0])));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_single_pair_scaling() {
        // Pair from a quadratic with Hessian 4I: the direction is −g / 4
        let mut buffer = HistoryBuffer::<f64>::new(2).unwrap();
        assert!(buffer.push(v(&[1.0, 0.0]), v(&[4.0, 0.0])));
        let d = buffer.compute_direction(&v(&[4.0, 8.0])).unwrap();
        assert_relative_eq!(d, v(&[-1.0, -2.0]), epsilon = 1e-12);
    }

    #[test]
    fn test_ring_overwrites_oldest() {
        let mut buffer = HistoryBuffer::<f64>::new(3).unwrap();
        for k in 0..4 {
            let scale = (k + 1) as f64;
            assert!(buffer.push(v(&[scale, 0.0]), v(&[scale, 0.0])));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.total_pushed(), 4);

        assert_eq!(buffer.index_of(0), None);
        assert_eq!(buffer.index_of(1), Some(1));
        assert_eq!(buffer.index_of(3), Some(0));
        assert_eq!(buffer.index_of(4), None);

        assert_eq!(buffer.age(0), Some(0));
        assert_eq!(buffer.age(2), Some(1));
        assert_eq!(buffer.age(1), Some(2));

        let newest_first: Vec<f64> = buffer.iter_recent().map(|p| p.s[0]).collect();
        assert_eq!(newest_first, vec![4.0, 3.0, 2.0]);
    }

    #[test]
    fn test_reset_keeps_global_count() {
        let mut buffer = HistoryBuffer::<f64>::new(2).unwrap();
        buffer.push(v(&[1.0]), v(&[1.0]));
        buffer.push(v(&[2.0]), v(&[3.0]));
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.total_pushed(), 2);
        assert_eq!(buffer.index_of(1), None);
        assert_eq!(buffer.age(0), None);

        buffer.push(v(&[1.0]), v(&[5.0]));
        assert_eq!(buffer.index_of(2), Some(0));
        assert_eq!(buffer.age(0), Some(0));
        assert_eq!(buffer.age(1), None);
    }

    #[test]
    fn test_direction_dimension_mismatch() {
        let mut buffer = HistoryBuffer::<f64>::new(2).unwrap();
        buffer.push(v(&[1.0, 1.0]), v(&[1.0, 2.0]));
        assert!(matches!(
            buffer.compute_direction(&v(&[1.0])),
            Err(ProxError::DimensionMismatch { .. })
        ));
    }
}
