//! Derived matrices for a draw call.
//!
//! A [`TransformPipeline`] observes one model-view stack and one projection
//! stack and hands a renderer the four matrices it uploads as uniforms:
//! model-view, projection, model-view-projection and the normal matrix.
//!
//! The two derived matrices are cached and keyed on each stack's
//! `(id, generation)` pair, so repeated draw calls against unchanged stacks
//! cost one comparison, and any mutation is seen on the very next read.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, trace};

use crate::error::{Result, TransformError};
use crate::math::mat3::Mat3;
use crate::math::mat4::Mat4;
use crate::matrix_stack::{MatrixStack, SharedMatrixStack};

/// Identity and generation of a stack at the time a value was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Stamp {
    id: u64,
    generation: u64,
}

/// Snapshot of a stack's top.
struct Read {
    stamp: Stamp,
    top: Mat4,
}

#[derive(Debug, Clone, Copy)]
struct CachedMvp {
    model_view: Stamp,
    projection: Stamp,
    matrix: Mat4,
}

#[derive(Debug, Clone, Copy)]
struct CachedNormal {
    model_view: Stamp,
    matrix: Mat3,
}

/// Non-owning view over a model-view and a projection [`MatrixStack`].
///
/// The pipeline holds [`Weak`] references: it never keeps a stack alive, and
/// a stack dropped after binding reads as [`TransformError::NotBound`].
#[derive(Debug, Default)]
pub struct TransformPipeline {
    model_view: Option<Weak<RefCell<MatrixStack>>>,
    projection: Option<Weak<RefCell<MatrixStack>>>,
    mvp: Cell<Option<CachedMvp>>,
    normal: Cell<Option<CachedNormal>>,
    recomputations: Cell<u64>,
}

fn read(stack: &Rc<RefCell<MatrixStack>>) -> Result<Read> {
    let stack = stack.try_borrow().map_err(|_| {
        TransformError::InvalidOperation("matrix stack is mutably borrowed".into())
    })?;
    Ok(Read {
        stamp: Stamp {
            id: stack.id(),
            generation: stack.generation(),
        },
        top: stack.top(),
    })
}

impl TransformPipeline {
    /// Creates an unbound pipeline. Every read fails with `NotBound` until
    /// [`bind`](Self::bind) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pipeline already bound to the given stacks.
    pub fn bound(model_view: &SharedMatrixStack, projection: &SharedMatrixStack) -> Self {
        let mut pipeline = Self::new();
        pipeline.bind(model_view, projection);
        pipeline
    }

    /// Observes `model_view` and `projection` from now on. Rebinding drops
    /// any cached values.
    pub fn bind(&mut self, model_view: &SharedMatrixStack, projection: &SharedMatrixStack) {
        self.model_view = Some(Rc::downgrade(model_view));
        self.projection = Some(Rc::downgrade(projection));
        self.mvp.set(None);
        self.normal.set(None);
        debug!("transform pipeline bound");
    }

    /// True when both stacks are bound and still alive.
    pub fn is_bound(&self) -> bool {
        self.model_view_stack().is_ok() && self.projection_stack().is_ok()
    }

    /// How many times a derived matrix was actually computed rather than
    /// served from cache.
    pub fn recomputations(&self) -> u64 {
        self.recomputations.get()
    }

    fn model_view_stack(&self) -> Result<Rc<RefCell<MatrixStack>>> {
        self.model_view
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(TransformError::NotBound)
    }

    fn projection_stack(&self) -> Result<Rc<RefCell<MatrixStack>>> {
        self.projection
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(TransformError::NotBound)
    }

    fn bump_recomputations(&self) {
        self.recomputations.set(self.recomputations.get() + 1);
    }

    /// Top of the model-view stack.
    pub fn model_view_matrix(&self) -> Result<Mat4> {
        Ok(read(&self.model_view_stack()?)?.top)
    }

    /// Top of the projection stack.
    pub fn projection_matrix(&self) -> Result<Mat4> {
        Ok(read(&self.projection_stack()?)?.top)
    }

    /// `projection.top() * model_view.top()`, recomputed only when either
    /// stack changed since the previous call.
    pub fn model_view_projection_matrix(&self) -> Result<Mat4> {
        let model_view = read(&self.model_view_stack()?)?;
        let projection = read(&self.projection_stack()?)?;

        if let Some(cached) = self.mvp.get() {
            if cached.model_view == model_view.stamp && cached.projection == projection.stamp {
                trace!("model-view-projection served from cache");
                return Ok(cached.matrix);
            }
        }

        let matrix = projection.top * model_view.top;
        self.mvp.set(Some(CachedMvp {
            model_view: model_view.stamp,
            projection: projection.stamp,
            matrix,
        }));
        self.bump_recomputations();
        trace!(
            model_view_generation = model_view.stamp.generation,
            projection_generation = projection.stamp.generation,
            "model-view-projection recomputed"
        );
        Ok(matrix)
    }

    /// Inverse-transpose of the model-view matrix's upper-left 3x3, with the
    /// same caching discipline as
    /// [`model_view_projection_matrix`](Self::model_view_projection_matrix).
    ///
    /// A singular model-view (zero scale) fails with `InvalidOperation`;
    /// failures are not cached.
    pub fn normal_matrix(&self) -> Result<Mat3> {
        let model_view = read(&self.model_view_stack()?)?;
        // Bound means both stacks, even though only one is read here.
        self.projection_stack()?;

        if let Some(cached) = self.normal.get() {
            if cached.model_view == model_view.stamp {
                trace!("normal matrix served from cache");
                return Ok(cached.matrix);
            }
        }

        let matrix = model_view.top.upper_left_3x3_inverse_transpose()?;
        self.normal.set(Some(CachedNormal {
            model_view: model_view.stamp,
            matrix,
        }));
        self.bump_recomputations();
        trace!(
            model_view_generation = model_view.stamp.generation,
            "normal matrix recomputed"
        );
        Ok(matrix)
    }
}
