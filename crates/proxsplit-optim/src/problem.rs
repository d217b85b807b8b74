//! Composite problem `f(A x + b) + g(x)`.

use nalgebra::DVector;
use proxsplit_core::{
    core::{
        capability::ProxDispatcher,
        error::{ProxError, Result},
        function::{ProximalFunction, SmoothFunction},
        types::Scalar,
    },
    linalg::LinearOperator,
};
use std::fmt;

/// Borrowed bundle of the problem data.
///
/// The operator defaults to the identity and the offset to zero. Prox
/// evaluations of `g` go through the problem's [`ProxDispatcher`].
pub struct Problem<'p, T, F, G>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    smooth: &'p F,
    nonsmooth: &'p G,
    operator: Option<&'p LinearOperator<T>>,
    offset: Option<&'p DVector<T>>,
    dispatcher: ProxDispatcher,
}

impl<'p, T, F, G> fmt::Debug for Problem<'p, T, F, G>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Problem")
            .field("smooth", &self.smooth)
            .field("nonsmooth", &self.nonsmooth)
            .field("operator", &self.operator.map(|op| (op.kind(), op.shape())))
            .field("has_offset", &self.offset.is_some())
            .finish()
    }
}

impl<'p, T, F, G> Problem<'p, T, F, G>
where
    T: Scalar,
    F: SmoothFunction<T> + ?Sized,
    G: ProximalFunction<T> + ?Sized,
{
    /// Problem `f(x) + g(x)`.
    pub fn new(smooth: &'p F, nonsmooth: &'p G) -> Self {
        Self {
            smooth,
            nonsmooth,
            operator: None,
            offset: None,
            dispatcher: ProxDispatcher::default(),
        }
    }

    /// Sets the linear operator `A`.
    pub fn with_operator(mut self, operator: &'p LinearOperator<T>) -> Self {
        self.operator = Some(operator);
        self
    }

    /// Sets the offset `b`.
    pub fn with_offset(mut self, offset: &'p DVector<T>) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Replaces the prox dispatch table.
    pub fn with_dispatcher(mut self, dispatcher: ProxDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn smooth(&self) -> &F {
        self.smooth
    }

    pub fn nonsmooth(&self) -> &G {
        self.nonsmooth
    }

    pub fn operator(&self) -> Option<&LinearOperator<T>> {
        self.operator
    }

    pub fn dispatcher(&self) -> &ProxDispatcher {
        &self.dispatcher
    }

    /// Checks that a point of length `dim` fits the operator, offset and
    /// smooth function.
    pub fn validate(&self, dim: usize) -> Result<()> {
        let image_dim = match self.operator {
            Some(op) => {
                let (rows, cols) = op.shape();
                if cols != dim {
                    return Err(ProxError::dimension_mismatch(
                        format!("operator with {} columns", dim),
                        format!("{} columns", cols),
                    ));
                }
                rows
            }
            None => dim,
        };
        if let Some(b) = self.offset {
            if b.len() != image_dim {
                return Err(ProxError::dimension_mismatch(
                    format!("offset of length {}", image_dim),
                    format!("length {}", b.len()),
                ));
            }
        }
        if let Some(hint) = self.smooth.dimension_hint() {
            if hint != image_dim {
                return Err(ProxError::dimension_mismatch(
                    format!("smooth term on R^{}", image_dim),
                    format!("R^{}", hint),
                ));
            }
        }
        Ok(())
    }

    /// `A x + b`.
    pub fn affine_image(&self, x: &DVector<T>) -> Result<DVector<T>> {
        let ax = match self.operator {
            Some(op) if !op.is_identity() => op.apply(x)?,
            Some(op) => {
                if op.ncols() != x.len() {
                    return Err(ProxError::dimension_mismatch(op.ncols(), x.len()));
                }
                x.clone()
            }
            None => x.clone(),
        };
        match self.offset {
            Some(b) if b.len() == ax.len() => Ok(ax + b),
            Some(b) => Err(ProxError::dimension_mismatch(ax.len(), b.len())),
            None => Ok(ax),
        }
    }

    /// `Aᵀ y`.
    pub fn pull_back(&self, y: DVector<T>) -> Result<DVector<T>> {
        match self.operator {
            Some(op) if !op.is_identity() => op.apply_adjoint(&y),
            _ => Ok(y),
        }
    }

    /// `A v` without the offset.
    pub fn push_forward(&self, v: &DVector<T>) -> Result<DVector<T>> {
        match self.operator {
            Some(op) if !op.is_identity() => op.apply(v),
            _ => Ok(v.clone()),
        }
    }

    /// `(f(A x + b), Aᵀ ∇f(A x + b), A x + b)`.
    pub fn smooth_value_and_gradient(&self, x: &DVector<T>) -> Result<(T, DVector<T>, DVector<T>)> {
        let image = self.affine_image(x)?;
        let (value, grad) = self.smooth.value_and_gradient(&image)?;
        Ok((value, self.pull_back(grad)?, image))
    }

    /// `f(A x + b)`.
    pub fn smooth_value(&self, x: &DVector<T>) -> Result<T> {
        self.smooth.value(&self.affine_image(x)?)
    }

    /// `Aᵀ ∇²f(image) A v`, where `image = A x + b` is already known.
    pub fn smooth_hessian_product(&self, image: &DVector<T>, v: &DVector<T>) -> Result<DVector<T>> {
        let av = self.push_forward(v)?;
        let hav = self.smooth.hessian_vector_product(image, &av)?;
        self.pull_back(hav)
    }

    /// `prox_{γ g}(x)` and `g` at the result, through the dispatcher.
    pub fn prox_with_value(&self, x: &DVector<T>, gamma: T) -> Result<(DVector<T>, T)> {
        self.dispatcher.prox_with_value(self.nonsmooth, x, gamma)
    }

    /// Upper bound on the Lipschitz constant of `∇(f∘A)`, when `f` declares one.
    pub fn lipschitz_bound(&self) -> Option<T> {
        let constant = self.smooth.capabilities().lipschitz_constant()?;
        let operator_norm = match self.operator {
            Some(op) => op.squared_norm_bound(),
            None => T::one(),
        };
        Some(constant * operator_norm)
    }
}
