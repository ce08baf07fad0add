use crate::{params::FtrlParams, storage::FeatureCell};

/// The FTRL-proximal update rule.
///
/// It holds the hyperparameters the rule needs already split into their L1 and L2
/// parts, both methods are pure so they can be evaluated from any worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximal {
    alpha: f32,
    beta: f32,
    lambda1: f32,
    lambda2: f32,
}

impl From<&FtrlParams> for Proximal {
    fn from(params: &FtrlParams) -> Self {
        Self {
            alpha: params.alpha,
            beta: params.beta,
            lambda1: params.lambda1(),
            lambda2: params.lambda2(),
        }
    }
}

impl Proximal {
    /// Derives the current weight of a feature.
    ///
    /// Features whose `|z|` doesn't exceed the L1 threshold are exactly zero.
    ///
    /// # Arguments
    /// * `cell` - A consistent snapshot of the feature's accumulators.
    pub fn weight(&self, cell: FeatureCell) -> f32 {
        let FeatureCell { z, n } = cell;

        if z.abs() <= self.lambda1 {
            return 0.;
        }

        let shrunk = z - z.signum() * self.lambda1;
        let rate = (self.beta + n.sqrt()) / self.alpha + self.lambda2;
        -shrunk / rate
    }

    /// Applies one gradient contribution to a feature.
    ///
    /// # Arguments
    /// * `cell` - The snapshot the step starts from, the weight adjustment is derived from it.
    /// * `grad` - The gradient factor of the row times the feature's value.
    ///
    /// # Returns
    /// The accumulators after the step.
    /// The step is computed in `f64` and saturated back into `f32`, so a finite
    /// gradient always leaves both accumulators finite.
    pub fn step(&self, cell: FeatureCell, grad: f32) -> FeatureCell {
        let (z, n, grad) = (cell.z as f64, cell.n as f64, grad as f64);

        let next_n = n + grad * grad;
        let sigma = (next_n.sqrt() - n.sqrt()) / self.alpha as f64;
        let next_z = z + grad - sigma * self.weight(cell) as f64;

        FeatureCell {
            z: saturate(next_z),
            n: saturate(next_n),
        }
    }
}

fn saturate(value: f64) -> f32 {
    value.clamp(f32::MIN as f64, f32::MAX as f64) as f32
}
