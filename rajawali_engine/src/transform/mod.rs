//! Transform module - per-node position, scale and orientation.
//!
//! `Transformation` is plain data and is not synchronized. Nodes attached to
//! a scene graph are only mutated through `Transformable::request_transformations`,
//! which runs a `Transformer` while the graph's write lock is held.

mod transformation;

pub use transformation::Transformation;

use crate::error::Result;

/// A unit of transform mutation, applied exactly once under the write lock.
///
/// Any `FnOnce(&mut Transformation)` closure is a `Transformer`.
pub trait Transformer {
    /// Apply the mutation.
    fn transform(self, transformation: &mut Transformation);
}

impl<F> Transformer for F
where
    F: FnOnce(&mut Transformation),
{
    fn transform(self, transformation: &mut Transformation) {
        self(transformation)
    }
}

/// Something whose transform can be edited safely from any thread.
pub trait Transformable {
    /// Block until the owning graph's write lock is held, run `transformer`
    /// once, propagate the new matrices and bounds, then release the lock.
    fn request_transformations<T: Transformer>(&self, transformer: T) -> Result<()>;
}
