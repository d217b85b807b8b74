//! Function capabilities and proximal dispatch.
//!
//! Functions declare what they are through a [`CapabilitySet`]: structural
//! facts such as "separable" or "has a Lipschitz gradient", and membership
//! of a family with a closed-form prox such as "weighted ℓ₁ norm". The
//! [`ProxDispatcher`] maps these declarations to specialised kernels.
//!
//! # Dispatch
//!
//! The dispatcher holds a flat table of `(CapabilityKind, ProxRoutine)`
//! entries ordered most specific first. The first entry whose kind is
//! present in the function's capability set wins; when nothing matches,
//! the function's own [`ProximalFunction::prox`] is called. A missing
//! specialisation is therefore never an error.

use crate::core::{
    error::{ProxError, Result},
    function::ProximalFunction,
    kernels,
    types::Scalar,
};
use nalgebra::DVector;
use std::fmt;

/// A property declared by a function.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Capability<T: Scalar> {
    /// The function is identically zero.
    Zero,
    /// The function is a quadratic form plus a linear term.
    Quadratic,
    /// The function is a sum over consecutive blocks of `block_len` entries.
    Separable { block_len: usize },
    /// Strong convexity with the given modulus.
    StronglyConvex { modulus: T },
    /// Gradient is Lipschitz with the given constant.
    LipschitzGradient { constant: T },
    /// Indicator of a convex set.
    Indicator,
    /// A norm.
    Norm,
    /// A data-fitting loss.
    Loss,
    /// `weight · ‖x‖₁`.
    L1Norm { weight: T },
    /// `weight · Σ_b ‖x_b‖₂` over blocks of `block_len` entries.
    GroupL2Norm { weight: T, block_len: usize },
    /// Indicator of `[lower, upper]^n`.
    Box { lower: T, upper: T },
    /// Indicator of the second-order cone, cone variable last.
    SecondOrderCone,
    /// `l1 · ‖x‖₁ + (l2 / 2) · ‖x‖²`.
    ElasticNet { l1: T, l2: T },
}

/// Payload-free discriminant of a [`Capability`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapabilityKind {
    Zero,
    Quadratic,
    Separable,
    StronglyConvex,
    LipschitzGradient,
    Indicator,
    Norm,
    Loss,
    L1Norm,
    GroupL2Norm,
    Box,
    SecondOrderCone,
    ElasticNet,
}

impl<T: Scalar> Capability<T> {
    /// Discriminant of this capability.
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Self::Zero => CapabilityKind::Zero,
            Self::Quadratic => CapabilityKind::Quadratic,
            Self::Separable { .. } => CapabilityKind::Separable,
            Self::StronglyConvex { .. } => CapabilityKind::StronglyConvex,
            Self::LipschitzGradient { .. } => CapabilityKind::LipschitzGradient,
            Self::Indicator => CapabilityKind::Indicator,
            Self::Norm => CapabilityKind::Norm,
            Self::Loss => CapabilityKind::Loss,
            Self::L1Norm { .. } => CapabilityKind::L1Norm,
            Self::GroupL2Norm { .. } => CapabilityKind::GroupL2Norm,
            Self::Box { .. } => CapabilityKind::Box,
            Self::SecondOrderCone => CapabilityKind::SecondOrderCone,
            Self::ElasticNet { .. } => CapabilityKind::ElasticNet,
        }
    }
}

/// Ordered set of capabilities, at most one per kind.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilitySet<T: Scalar> {
    items: Vec<Capability<T>>,
}

impl<T: Scalar> Default for CapabilitySet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Scalar> CapabilitySet<T> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Builder-style insert.
    pub fn with(mut self, capability: Capability<T>) -> Self {
        self.insert(capability);
        self
    }

    /// Inserts a capability, replacing any existing one of the same kind.
    pub fn insert(&mut self, capability: Capability<T>) {
        let kind = capability.kind();
        match self.items.iter_mut().find(|c| c.kind() == kind) {
            Some(existing) => *existing = capability,
            None => self.items.push(capability),
        }
    }

    /// True when a capability of this kind is declared.
    pub fn contains_kind(&self, kind: CapabilityKind) -> bool {
        self.items.iter().any(|c| c.kind() == kind)
    }

    /// Returns the capability of the given kind, if declared.
    pub fn find(&self, kind: CapabilityKind) -> Option<&Capability<T>> {
        self.items.iter().find(|c| c.kind() == kind)
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Capability<T>> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Declared Lipschitz constant of the gradient, if any.
    pub fn lipschitz_constant(&self) -> Option<T> {
        match self.find(CapabilityKind::LipschitzGradient) {
            Some(Capability::LipschitzGradient { constant }) => Some(*constant),
            _ => None,
        }
    }
}

impl<T: Scalar> FromIterator<Capability<T>> for CapabilitySet<T> {
    fn from_iter<I: IntoIterator<Item = Capability<T>>>(iter: I) -> Self {
        let mut set = Self::new();
        for capability in iter {
            set.insert(capability);
        }
        set
    }
}

/// Proximal routine selected by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ProxRoutine {
    /// `prox = x`.
    Identity,
    /// Componentwise soft thresholding.
    SoftThreshold,
    /// Block soft thresholding.
    GroupSoftThreshold,
    /// Clamp to a box.
    BoxClamp,
    /// Second-order cone projection.
    SocProjection,
    /// Soft thresholding followed by ridge scaling.
    ElasticNetShrink,
    /// The function's own `prox`.
    Generic,
}

impl fmt::Display for ProxRoutine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Table mapping capability kinds to closed-form prox kernels.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxDispatcher {
    entries: Vec<(CapabilityKind, ProxRoutine)>,
}

impl Default for ProxDispatcher {
    fn default() -> Self {
        Self {
            entries: vec![
                (CapabilityKind::Zero, ProxRoutine::Identity),
                (CapabilityKind::ElasticNet, ProxRoutine::ElasticNetShrink),
                (CapabilityKind::GroupL2Norm, ProxRoutine::GroupSoftThreshold),
                (CapabilityKind::L1Norm, ProxRoutine::SoftThreshold),
                (CapabilityKind::Box, ProxRoutine::BoxClamp),
                (CapabilityKind::SecondOrderCone, ProxRoutine::SocProjection),
            ],
        }
    }
}

impl ProxDispatcher {
    /// Dispatcher with no entries; every prox goes through the generic path.
    pub fn generic_only() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends an entry with the lowest priority.
    pub fn with_entry(mut self, kind: CapabilityKind, routine: ProxRoutine) -> Self {
        self.entries.push((kind, routine));
        self
    }

    /// Entries in priority order.
    pub fn entries(&self) -> &[(CapabilityKind, ProxRoutine)] {
        &self.entries
    }

    /// Routine for a capability set: first matching entry, else `Generic`.
    pub fn select<T: Scalar>(&self, capabilities: &CapabilitySet<T>) -> ProxRoutine {
        self.entries
            .iter()
            .find(|(kind, _)| capabilities.contains_kind(*kind))
            .map(|&(_, routine)| routine)
            .unwrap_or(ProxRoutine::Generic)
    }

    /// Computes `prox_{γ g}(x)` through the selected routine.
    pub fn prox<T, G>(&self, g: &G, x: &DVector<T>, gamma: T) -> Result<DVector<T>>
    where
        T: Scalar,
        G: ProximalFunction<T> + ?Sized,
    {
        let capabilities = g.capabilities();
        let routine = self.select(&capabilities);
        log::trace!("prox dispatched to {}", routine);
        match (routine, routine_capability(routine, &capabilities)) {
            (ProxRoutine::Identity, _) => Ok(x.clone()),
            (ProxRoutine::SoftThreshold, Some(Capability::L1Norm { weight })) => {
                Ok(kernels::soft_threshold(x, gamma * weight))
            }
            (
                ProxRoutine::GroupSoftThreshold,
                Some(Capability::GroupL2Norm { weight, block_len }),
            ) => kernels::group_soft_threshold(x, gamma * weight, block_len),
            (ProxRoutine::BoxClamp, Some(Capability::Box { lower, upper })) => {
                kernels::box_clamp(x, lower, upper)
            }
            (ProxRoutine::SocProjection, _) => kernels::soc_projection(x),
            (ProxRoutine::ElasticNetShrink, Some(Capability::ElasticNet { l1, l2 })) => {
                Ok(kernels::elastic_net_shrink(x, gamma * l1, gamma * l2))
            }
            (ProxRoutine::Generic, _) => g.prox(x, gamma),
            (routine, _) => Err(ProxError::invalid_parameter(format!(
                "routine {} registered for a capability without matching parameters",
                routine
            ))),
        }
    }

    /// Computes the prox and the value of `g` at it.
    pub fn prox_with_value<T, G>(&self, g: &G, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)>
    where
        T: Scalar,
        G: ProximalFunction<T> + ?Sized,
    {
        if self.select(&g.capabilities()) == ProxRoutine::Generic {
            return g.prox_with_value(x, gamma);
        }
        let z = self.prox(g, x, gamma)?;
        let value = g.value(&z)?;
        Ok((z, value))
    }
}

/// Capability that parameterises a routine, looked up by the kind the
/// routine consumes.
fn routine_capability<T: Scalar>(
    routine: ProxRoutine,
    capabilities: &CapabilitySet<T>,
) -> Option<Capability<T>> {
    let kind = match routine {
        ProxRoutine::SoftThreshold => CapabilityKind::L1Norm,
        ProxRoutine::GroupSoftThreshold => CapabilityKind::GroupL2Norm,
        ProxRoutine::BoxClamp => CapabilityKind::Box,
        ProxRoutine::ElasticNetShrink => CapabilityKind::ElasticNet,
        ProxRoutine::SocProjection => CapabilityKind::SecondOrderCone,
        ProxRoutine::Identity | ProxRoutine::Generic => return None,
    };
    capabilities.find(kind).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_same_kind() {
        let mut set = CapabilitySet::<f64>::new()
            .with(Capability::Norm)
            .with(Capability::L1Norm { weight: 1.0 });
        set.insert(Capability::L1Norm { weight: 2.0 });
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.find(CapabilityKind::L1Norm),
            Some(&Capability::L1Norm { weight: 2.0 })
        );
        assert!(set.contains_kind(CapabilityKind::Norm));
        assert!(!set.contains_kind(CapabilityKind::Box));
    }

    #[test]
    fn test_select_prefers_most_specific() {
        let dispatcher = ProxDispatcher::default();
        let set: CapabilitySet<f64> = [
            Capability::L1Norm { weight: 1.0 },
            Capability::ElasticNet { l1: 1.0, l2: 0.5 },
        ]
        .into_iter()
        .collect();
        assert_eq!(dispatcher.select(&set), ProxRoutine::ElasticNetShrink);

        let empty = CapabilitySet::<f64>::new();
        assert_eq!(dispatcher.select(&empty), ProxRoutine::Generic);

        let structural = CapabilitySet::<f64>::new().with(Capability::Separable { block_len: 1 });
        assert_eq!(dispatcher.select(&structural), ProxRoutine::Generic);
    }

    #[test]
    fn test_generic_only_dispatcher() {
        let set = CapabilitySet::<f64>::new().with(Capability::Zero);
        assert_eq!(ProxDispatcher::generic_only().select(&set), ProxRoutine::Generic);
        let custom = ProxDispatcher::generic_only()
            .with_entry(CapabilityKind::Zero, ProxRoutine::Identity);
        assert_eq!(custom.select(&set), ProxRoutine::Identity);
        assert_eq!(custom.entries().len(), 1);
    }

    #[test]
    fn test_lipschitz_constant_lookup() {
        let set = CapabilitySet::<f64>::new()
            .with(Capability::Loss)
            .with(Capability::LipschitzGradient { constant: 4.0 });
        assert_eq!(set.lipschitz_constant(), Some(4.0));
        assert_eq!(CapabilitySet::<f64>::new().lipschitz_constant(), None);
    }
}
