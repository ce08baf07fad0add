use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    error::{FtrlErr, Result},
    family::Family,
    optimization::Proximal,
    params::FtrlParams,
    storage::FeatureCell,
};

/// A snapshot of a model, enough to rebuild an equivalent one.
///
/// Only the accumulators are persisted, weights are always derived from them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FtrlDump {
    pub alpha: f32,
    pub beta: f32,
    pub lambda: f32,
    pub l1_ratio: f32,
    pub dropout: f32,
    pub family: Family,
    pub n_features: usize,
    pub z: Vec<f32>,
    pub n: Vec<f32>,
}

impl FtrlDump {
    /// Creates a new `FtrlDump`.
    ///
    /// # Arguments
    /// * `params` - The hyperparameters of the dumped model.
    /// * `z` - The `z` accumulator of every feature.
    /// * `n` - The `n` accumulator of every feature.
    pub fn new(params: &FtrlParams, z: Vec<f32>, n: Vec<f32>) -> Self {
        Self {
            alpha: params.alpha,
            beta: params.beta,
            lambda: params.lambda,
            l1_ratio: params.l1_ratio,
            dropout: params.dropout,
            family: params.family,
            n_features: z.len(),
            z,
            n,
        }
    }

    /// The hyperparameters stored in the record.
    pub fn params(&self) -> FtrlParams {
        FtrlParams {
            alpha: self.alpha,
            beta: self.beta,
            lambda: self.lambda,
            l1_ratio: self.l1_ratio,
            dropout: self.dropout,
            family: self.family,
        }
    }

    /// Checks the record describes a valid model.
    ///
    /// # Returns
    /// An `InvalidDump` error describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.params()
            .validate()
            .map_err(|e| FtrlErr::InvalidDump(e.to_string()))?;

        if self.z.len() != self.n_features || self.n.len() != self.n_features {
            return Err(FtrlErr::InvalidDump(format!(
                "expected {} features, got {} z and {} n accumulators",
                self.n_features,
                self.z.len(),
                self.n.len()
            )));
        }

        if let Some(j) = self.z.iter().position(|z| !z.is_finite()) {
            return Err(FtrlErr::InvalidDump(format!("z of feature {j} isn't finite")));
        }

        if let Some(j) = self.n.iter().position(|n| !n.is_finite() || *n < 0.) {
            return Err(FtrlErr::InvalidDump(format!(
                "n of feature {j} must be finite and non-negative"
            )));
        }

        Ok(())
    }

    /// Derives the weight of every feature in the record.
    pub fn weights(&self) -> Vec<f32> {
        let rule = Proximal::from(&self.params());

        self.z
            .par_iter()
            .zip(&self.n)
            .map(|(&z, &n)| rule.weight(FeatureCell::new(z, n)))
            .collect()
    }
}
