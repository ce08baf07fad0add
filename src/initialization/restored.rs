use std::vec;

use super::StateGen;
use crate::storage::FeatureCell;

/// A state generator that replays previously dumped accumulators.
///
/// Both vectors are expected to have the same length, the shorter one bounds the output.
pub struct RestoredStateGen {
    cells: std::iter::Zip<vec::IntoIter<f32>, vec::IntoIter<f32>>,
}

impl RestoredStateGen {
    /// Creates a new `RestoredStateGen`.
    ///
    /// # Arguments
    /// * `z` - The dumped `z` accumulators.
    /// * `n` - The dumped `n` accumulators.
    pub fn new(z: Vec<f32>, n: Vec<f32>) -> Self {
        Self {
            cells: z.into_iter().zip(n),
        }
    }
}

impl StateGen for RestoredStateGen {
    fn sample(&mut self, n: usize) -> Option<Vec<FeatureCell>> {
        let sample: Vec<_> = self
            .cells
            .by_ref()
            .take(n)
            .map(|(z, sq)| FeatureCell::new(z, sq))
            .collect();

        (!sample.is_empty()).then_some(sample)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty() {
        let mut state_gen = RestoredStateGen::new(vec![], vec![]);
        assert!(state_gen.sample(1).is_none());
    }

    #[test]
    fn replays_in_order() {
        let mut state_gen = RestoredStateGen::new(vec![1., 2., 3.], vec![10., 20., 30.]);

        let sample = state_gen.sample(2).unwrap();
        assert_eq!(sample, [FeatureCell::new(1., 10.), FeatureCell::new(2., 20.)]);

        let sample = state_gen.sample(2).unwrap();
        assert_eq!(sample, [FeatureCell::new(3., 30.)]);
        assert!(state_gen.sample(1).is_none());
    }
}
