use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{family::Link, optimization::Proximal, params::FtrlParams, storage::Store};

/// Everything the engine needs to know about a row besides its entries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowInput {
    /// The observed target, `None` for a read-only prediction.
    pub target: Option<f32>,
    /// The sample weight scaling the row's gradient.
    pub weight: f32,
    /// Seeds the row's dropout mask, `None` disables masking.
    pub mask_seed: Option<u64>,
}

impl RowInput {
    /// A row that's only predicted.
    pub fn predict() -> Self {
        Self {
            target: None,
            weight: 1.,
            mask_seed: None,
        }
    }
}

/// Predicts and updates single rows against a shared feature state.
///
/// Weights are derived from the state every time a row reads a feature,
/// they're never cached across rows.
pub struct RowEngine<'a, S: Store> {
    store: &'a S,
    rule: Proximal,
    link: Link,
    dropout: f32,
}

impl<'a, S: Store> RowEngine<'a, S> {
    /// Creates a new `RowEngine`.
    ///
    /// # Arguments
    /// * `store` - The shared feature state.
    /// * `params` - The model's hyperparameters.
    pub fn new(store: &'a S, params: &FtrlParams) -> Self {
        Self {
            store,
            rule: Proximal::from(params),
            link: Link::from(params.family),
            dropout: params.dropout,
        }
    }

    /// Predicts a row and, when it carries a target, applies its gradient to the state.
    ///
    /// # Arguments
    /// * `entries` - The row's nonzero `(column, value)` entries.
    /// * `input` - The row's target, weight and dropout seed.
    /// * `retained` - Scratch space reused between rows, its contents are overwritten.
    ///
    /// # Returns
    /// The link function applied to the row's score.
    pub fn process<I>(&self, entries: I, input: &RowInput, retained: &mut Vec<(usize, f32)>) -> f32
    where
        I: Iterator<Item = (usize, f32)>,
    {
        retained.clear();

        match input.mask_seed {
            Some(seed) if self.dropout > 0. => {
                let mut rng = StdRng::seed_from_u64(seed);
                let dropout = self.dropout as f64;
                retained.extend(entries.filter(|_| !rng.random_bool(dropout)));
            }
            _ => retained.extend(entries),
        }

        let score: f32 = retained
            .iter()
            .map(|&(feature, value)| self.rule.weight(self.store.load(feature)) * value)
            .sum();

        let prediction = self.link.inverse(score);

        let Some(target) = input.target else {
            return prediction;
        };

        let grad = self.link.gradient(prediction, target) * input.weight;
        if grad == 0. || !grad.is_finite() {
            return prediction;
        }

        for &(feature, value) in retained.iter() {
            let grad = grad * value;
            self.store.update(feature, |cell| self.rule.step(cell, grad));
        }

        prediction
    }
}
