use std::iter::{self, RepeatN};

use super::StateGen;
use crate::storage::FeatureCell;

/// A state generator for a freshly initialized model, every accumulator starts at zero.
pub struct ZeroStateGen {
    cells: RepeatN<FeatureCell>,
}

impl ZeroStateGen {
    /// Creates a new `ZeroStateGen`.
    ///
    /// # Arguments
    /// * `nfeatures` - The amount of features to generate.
    pub fn new(nfeatures: usize) -> Self {
        Self {
            cells: iter::repeat_n(FeatureCell::default(), nfeatures),
        }
    }
}

impl StateGen for ZeroStateGen {
    fn sample(&mut self, n: usize) -> Option<Vec<FeatureCell>> {
        let sample: Vec<_> = self.cells.by_ref().take(n).collect();
        (!sample.is_empty()).then_some(sample)
    }
}
