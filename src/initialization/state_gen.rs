use crate::storage::FeatureCell;

/// A `StateGen` generates the initial accumulators of the model's features.
pub trait StateGen {
    /// Should sample at most `n` feature cells.
    ///
    /// # Arguments
    /// * `n` - The upper limit of cells to generate.
    ///
    /// # Returns
    /// `None` once the generator is exhausted.
    fn sample(&mut self, n: usize) -> Option<Vec<FeatureCell>>;
}
