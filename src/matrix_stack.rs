//! Bounded stack of transformation matrices.
//!
//! One stack holds the model-view chain, a second holds the projection. The
//! stack always has at least one entry (the base), and its top is the
//! "current" transform consumers read.
//!
//! ```ignore
//! let mut stack = MatrixStack::new();
//! stack.push(Mat4::translation(1.0, 0.0, 0.0))?;
//! stack.multiply_top(Mat4::rotation(angle, 0.0, 1.0, 0.0));
//! // draw...
//! stack.pop()?;
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{error, warn};

use crate::error::{Result, TransformError};
use crate::frame::Frame;
use crate::math::mat4::Mat4;

/// Default maximum depth, counting the base entry.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// A matrix stack shared between the code that mutates it and a
/// [`TransformPipeline`](crate::pipeline::TransformPipeline) that observes it.
pub type SharedMatrixStack = Rc<RefCell<MatrixStack>>;

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

fn next_stack_id() -> u64 {
    NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed)
}

/// A bounded stack of [`Mat4`] with a generation counter.
///
/// Every successful mutation bumps [`generation`](Self::generation) by
/// exactly one; failed operations change nothing. Each instance (clones
/// included) also carries a unique [`id`](Self::id), so an observer keyed on
/// `(id, generation)` never confuses two stacks.
#[derive(Debug)]
pub struct MatrixStack {
    id: u64,
    top: Mat4,
    /// Entries below the top, base first.
    saved: Vec<Mat4>,
    max_depth: usize,
    generation: u64,
}

impl MatrixStack {
    /// Creates a stack holding a single identity entry, with the default
    /// maximum depth.
    pub fn new() -> Self {
        Self {
            id: next_stack_id(),
            top: Mat4::IDENTITY,
            saved: Vec::with_capacity(DEFAULT_MAX_DEPTH - 1),
            max_depth: DEFAULT_MAX_DEPTH,
            generation: 0,
        }
    }

    /// Creates a stack with a custom maximum depth (base entry included).
    pub fn with_max_depth(max_depth: usize) -> Result<Self> {
        if max_depth == 0 {
            return Err(TransformError::InvalidArgument(
                "matrix stack depth must be at least 1".into(),
            ));
        }
        Ok(Self {
            id: next_stack_id(),
            top: Mat4::IDENTITY,
            saved: Vec::with_capacity(max_depth - 1),
            max_depth,
            generation: 0,
        })
    }

    /// Wraps the stack for sharing with a pipeline.
    pub fn into_shared(self) -> SharedMatrixStack {
        Rc::new(RefCell::new(self))
    }

    // ============ Queries ============

    /// The current transform.
    pub fn top(&self) -> Mat4 {
        self.top
    }

    /// Number of entries, including the base. Always at least 1.
    pub fn depth(&self) -> usize {
        self.saved.len() + 1
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_full(&self) -> bool {
        self.depth() >= self.max_depth
    }

    /// Monotonic mutation counter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Process-unique identity of this stack instance.
    pub fn id(&self) -> u64 {
        self.id
    }

    // ============ Push / Pop ============

    /// Pushes a fresh identity entry.
    pub fn push_identity(&mut self) -> Result<()> {
        self.push_raw(Mat4::IDENTITY)
    }

    /// Duplicates the current top.
    pub fn push_copy(&mut self) -> Result<()> {
        self.push_raw(self.top)
    }

    /// Enters a local coordinate frame: pushes `top * matrix`.
    pub fn push(&mut self, matrix: Mat4) -> Result<()> {
        self.push_raw(self.top * matrix)
    }

    /// Pushes `top * frame.object_to_world_matrix()`, placing an object.
    pub fn push_frame(&mut self, frame: &Frame) -> Result<()> {
        self.push(frame.object_to_world_matrix())
    }

    /// Pushes `top * frame.world_to_camera_matrix()`, entering a camera's
    /// eye space.
    pub fn push_camera(&mut self, camera: &Frame) -> Result<()> {
        self.push(camera.world_to_camera_matrix())
    }

    fn push_raw(&mut self, new_top: Mat4) -> Result<()> {
        if self.is_full() {
            warn!(max_depth = self.max_depth, "matrix stack overflow");
            return Err(TransformError::StackOverflow {
                max_depth: self.max_depth,
            });
        }
        self.saved.push(self.top);
        self.top = new_top;
        self.generation += 1;
        Ok(())
    }

    /// Removes the top entry. The base entry is never popped.
    pub fn pop(&mut self) -> Result<()> {
        match self.saved.pop() {
            Some(previous) => {
                self.top = previous;
                self.generation += 1;
                Ok(())
            }
            None => {
                warn!("matrix stack underflow");
                Err(TransformError::StackUnderflow)
            }
        }
    }

    // ============ In-place edits of the top ============

    /// Replaces the top with `top * matrix`.
    pub fn multiply_top(&mut self, matrix: Mat4) {
        self.top = self.top * matrix;
        self.generation += 1;
    }

    /// Replaces the top outright.
    pub fn load_top(&mut self, matrix: Mat4) {
        self.top = matrix;
        self.generation += 1;
    }

    pub fn load_identity(&mut self) {
        self.load_top(Mat4::IDENTITY);
    }

    pub fn translate(&mut self, x: f32, y: f32, z: f32) {
        self.multiply_top(Mat4::translation(x, y, z));
    }

    /// Rotates the current frame by `angle` radians about the unit axis
    /// `(x, y, z)`.
    pub fn rotate(&mut self, angle: f32, x: f32, y: f32, z: f32) {
        self.multiply_top(Mat4::rotation(angle, x, y, z));
    }

    pub fn scale(&mut self, x: f32, y: f32, z: f32) {
        self.multiply_top(Mat4::scale(x, y, z));
    }

    /// Drops every entry above the base and loads identity into the base.
    pub fn reset(&mut self) {
        self.saved.clear();
        self.top = Mat4::IDENTITY;
        self.generation += 1;
    }
}

impl Default for MatrixStack {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MatrixStack {
    /// Copies the entries under a fresh id.
    fn clone(&self) -> Self {
        Self {
            id: next_stack_id(),
            top: self.top,
            saved: self.saved.clone(),
            max_depth: self.max_depth,
            generation: self.generation,
        }
    }
}

/// RAII push on a shared stack: the entry is popped when the guard drops.
///
/// The guard holds its own handle to the stack and borrows it only while
/// pushing and popping, so the stack stays readable (and mutable) in between.
#[must_use = "the pushed entry is popped as soon as the guard is dropped"]
pub struct ScopedPush {
    stack: SharedMatrixStack,
    depth: usize,
}

impl ScopedPush {
    /// Pushes `top * matrix` and returns the guard.
    pub fn new(stack: &SharedMatrixStack, matrix: Mat4) -> Result<Self> {
        Self::with(stack, |s| s.push(matrix))
    }

    /// Duplicates the top and returns the guard.
    pub fn copy(stack: &SharedMatrixStack) -> Result<Self> {
        Self::with(stack, MatrixStack::push_copy)
    }

    fn with(
        stack: &SharedMatrixStack,
        push: impl FnOnce(&mut MatrixStack) -> Result<()>,
    ) -> Result<Self> {
        let mut s = stack.try_borrow_mut().map_err(|_| {
            TransformError::InvalidOperation("matrix stack is already borrowed".into())
        })?;
        push(&mut *s)?;
        Ok(Self {
            stack: Rc::clone(stack),
            depth: s.depth(),
        })
    }

    /// Stack depth right after this guard's push.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl Drop for ScopedPush {
    fn drop(&mut self) {
        let Ok(mut stack) = self.stack.try_borrow_mut() else {
            error!(depth = self.depth, "matrix stack borrowed when scope ended; entry not popped");
            return;
        };
        if stack.depth() != self.depth {
            error!(
                expected = self.depth,
                actual = stack.depth(),
                "unbalanced push/pop inside scoped push; leaving stack untouched"
            );
            return;
        }
        if let Err(err) = stack.pop() {
            error!(%err, "scoped pop failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_matrix(rng: &mut StdRng) -> Mat4 {
        let axis = crate::math::Vec3::new(
            rng.gen_range(-1.0..1.0),
            rng.gen_range(-1.0..1.0),
            rng.gen_range(0.1..1.0),
        )
        .normalize();
        Mat4::translation(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        ) * Mat4::rotation(rng.gen_range(-3.0..3.0), axis.x, axis.y, axis.z)
            * Mat4::scale(rng.gen_range(0.5..2.0), 1.0, rng.gen_range(0.5..2.0))
    }

    #[test]
    fn starts_with_identity_base() {
        let stack = MatrixStack::new();
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top(), Mat4::IDENTITY);
        assert_eq!(stack.max_depth(), DEFAULT_MAX_DEPTH);
        assert_eq!(stack.generation(), 0);
    }

    #[test]
    fn nested_translations_compose() {
        let mut stack = MatrixStack::new();
        stack.push(Mat4::translation(1.0, 0.0, 0.0)).unwrap();
        stack.push(Mat4::translation(0.0, 1.0, 0.0)).unwrap();
        assert_relative_eq!(stack.top(), Mat4::translation(1.0, 1.0, 0.0));

        stack.pop().unwrap();
        assert_relative_eq!(stack.top(), Mat4::translation(1.0, 0.0, 0.0));
    }

    #[test]
    fn push_then_pop_restores_exact_top() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut stack = MatrixStack::new();

        for _ in 0..200 {
            // Random legal pre-push depth, leaving room for one more push.
            let target = rng.gen_range(1..DEFAULT_MAX_DEPTH);
            while stack.depth() < target {
                stack.push(random_matrix(&mut rng)).unwrap();
            }
            while stack.depth() > target {
                stack.pop().unwrap();
            }

            let before = stack.top();
            let depth = stack.depth();
            stack.push(random_matrix(&mut rng)).unwrap();
            stack.pop().unwrap();
            assert_eq!(stack.top(), before);
            assert_eq!(stack.depth(), depth);
        }
    }

    #[test]
    fn overflow_leaves_stack_unchanged() {
        let mut stack = MatrixStack::with_max_depth(3).unwrap();
        stack.push(Mat4::translation(1.0, 0.0, 0.0)).unwrap();
        stack.push_copy().unwrap();
        assert!(stack.is_full());

        let top = stack.top();
        let generation = stack.generation();
        let err = stack.push(Mat4::scale(2.0, 2.0, 2.0)).unwrap_err();
        assert_eq!(err, TransformError::StackOverflow { max_depth: 3 });
        assert_eq!(stack.push_identity(), Err(TransformError::StackOverflow { max_depth: 3 }));
        assert_eq!(stack.top(), top);
        assert_eq!(stack.depth(), 3);
        assert_eq!(stack.generation(), generation);
    }

    #[test]
    fn underflow_leaves_stack_unchanged() {
        let mut stack = MatrixStack::new();
        stack.load_top(Mat4::translation(0.0, 0.0, -5.0));
        let generation = stack.generation();

        assert_eq!(stack.pop(), Err(TransformError::StackUnderflow));
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.top(), Mat4::translation(0.0, 0.0, -5.0));
        assert_eq!(stack.generation(), generation);
    }

    #[test]
    fn clones_get_their_own_id() {
        let stack = MatrixStack::new();
        let copy = stack.clone();
        assert_ne!(stack.id(), copy.id());
        assert_eq!(stack.generation(), copy.generation());
        assert_eq!(stack.top(), copy.top());
    }

    #[test]
    fn zero_depth_is_rejected() {
        assert!(matches!(
            MatrixStack::with_max_depth(0),
            Err(TransformError::InvalidArgument(_))
        ));
        // Depth 1 is legal: only the base, every push overflows.
        let mut stack = MatrixStack::with_max_depth(1).unwrap();
        assert!(stack.push_identity().is_err());
    }

    #[test]
    fn push_identity_and_copy() {
        let mut stack = MatrixStack::new();
        stack.load_top(Mat4::translation(1.0, 2.0, 3.0));

        stack.push_copy().unwrap();
        assert_eq!(stack.top(), Mat4::translation(1.0, 2.0, 3.0));

        stack.push_identity().unwrap();
        assert_eq!(stack.top(), Mat4::IDENTITY);
        assert_eq!(stack.depth(), 3);
    }

    #[test]
    fn multiply_and_load_keep_depth() {
        let mut stack = MatrixStack::new();
        stack.push_copy().unwrap();
        stack.translate(0.0, 0.0, -2.0);
        stack.scale(2.0, 2.0, 2.0);
        assert_eq!(stack.depth(), 2);
        assert_relative_eq!(
            stack.top(),
            Mat4::translation(0.0, 0.0, -2.0) * Mat4::scale(2.0, 2.0, 2.0)
        );

        stack.load_identity();
        assert_eq!(stack.top(), Mat4::IDENTITY);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn every_mutation_bumps_generation_once() {
        let mut stack = MatrixStack::new();
        let mut expected = 0;
        let mut check = |stack: &MatrixStack| {
            expected += 1;
            assert_eq!(stack.generation(), expected);
        };

        stack.push_identity().unwrap();
        check(&stack);
        stack.push_copy().unwrap();
        check(&stack);
        stack.push(Mat4::translation(1.0, 0.0, 0.0)).unwrap();
        check(&stack);
        stack.multiply_top(Mat4::scale(1.0, 2.0, 1.0));
        check(&stack);
        stack.rotate(0.5, 0.0, 0.0, 1.0);
        check(&stack);
        stack.load_top(Mat4::IDENTITY);
        check(&stack);
        stack.pop().unwrap();
        check(&stack);
        stack.reset();
        check(&stack);
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn push_frame_places_object() {
        let mut frame = Frame::new();
        frame.set_origin(crate::math::Vec3::new(0.0, 0.0, -5.0));

        let mut stack = MatrixStack::new();
        stack.push_frame(&frame).unwrap();
        assert_relative_eq!(stack.top(), Mat4::translation(0.0, 0.0, -5.0));
    }

    #[test]
    fn scoped_push_pops_on_drop() {
        let shared = MatrixStack::new().into_shared();
        {
            let guard = ScopedPush::new(&shared, Mat4::translation(5.0, 0.0, 0.0)).unwrap();
            assert_eq!(guard.depth(), 2);
            // The stack stays usable while the guard is alive.
            shared.borrow_mut().scale(2.0, 2.0, 2.0);
            assert_eq!(shared.borrow().depth(), 2);
        }
        assert_eq!(shared.borrow().depth(), 1);
        assert_eq!(shared.borrow().top(), Mat4::IDENTITY);
    }

    #[test]
    fn scoped_push_propagates_overflow() {
        let shared = MatrixStack::with_max_depth(1).unwrap().into_shared();
        assert!(matches!(
            ScopedPush::copy(&shared),
            Err(TransformError::StackOverflow { max_depth: 1 })
        ));
        assert_eq!(shared.borrow().depth(), 1);
    }

    #[test]
    fn unbalanced_scope_does_not_pop_foreign_entry() {
        let shared = MatrixStack::new().into_shared();
        let guard = ScopedPush::copy(&shared).unwrap();
        shared.borrow_mut().push_identity().unwrap();
        drop(guard);
        // The stray push is left for the caller to find.
        assert_eq!(shared.borrow().depth(), 3);
    }
}
