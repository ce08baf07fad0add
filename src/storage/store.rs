use std::num::NonZeroUsize;

use crate::{error::Result, initialization::StateGen, storage::FeatureCell};

/// Shared per-feature state, read and written concurrently by every worker of a batch.
///
/// Implementors must apply `update` as a single read-modify-write of the whole `(z, n)`
/// pair: no update is ever lost and no reader observes a `z` and an `n` from different steps.
pub trait Store: Send + Sync {
    /// Creates a new store filled from a state generator.
    ///
    /// # Arguments
    /// * `shard_size` - The maximum amount of features per shard.
    /// * `state_gen` - The generator of the initial feature state.
    fn build<G: StateGen>(shard_size: NonZeroUsize, state_gen: G) -> Self
    where
        Self: Sized;

    /// The amount of features in the store.
    fn len(&self) -> usize;

    /// Whether the store holds no features at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads a consistent snapshot of a feature's accumulators.
    ///
    /// # Panics
    /// If `feature` is out of bounds.
    fn load(&self, feature: usize) -> FeatureCell;

    /// Atomically replaces a feature's accumulators with `step` applied to them.
    ///
    /// `step` may be called more than once and must be pure.
    ///
    /// # Panics
    /// If `feature` is out of bounds.
    fn update<F>(&self, feature: usize, step: F)
    where
        F: Fn(FeatureCell) -> FeatureCell;

    /// Copies every feature's accumulators into the provided buffers.
    ///
    /// # Returns
    /// A `DimensionMismatch` error if either buffer isn't the same size as the store.
    fn pull(&self, z: &mut [f32], n: &mut [f32]) -> Result<()>;
}
