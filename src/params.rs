use serde::{Deserialize, Serialize};

use crate::{
    error::{FtrlErr, Result},
    family::Family,
};

/// The hyperparameters of an FTRL-proximal model.
///
/// They are fixed at construction and read-only for the lifetime of the model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FtrlParams {
    /// Base learning rate.
    pub alpha: f32,
    /// Learning rate smoothing term.
    pub beta: f32,
    /// Regularization strength.
    pub lambda: f32,
    /// Elastic-net mixing, `1` is pure L1 and `0` is pure L2.
    pub l1_ratio: f32,
    /// Fraction of a row's active features excluded per sample while fitting.
    pub dropout: f32,
    pub family: Family,
}

impl Default for FtrlParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            beta: 0.5,
            lambda: 0.,
            l1_ratio: 1.,
            dropout: 0.,
            family: Family::Binomial,
        }
    }
}

impl FtrlParams {
    /// Checks every hyperparameter lies in its valid range.
    ///
    /// # Returns
    /// An `InvalidInput` error naming the first offending hyperparameter.
    pub fn validate(&self) -> Result<()> {
        let &Self {
            alpha,
            beta,
            lambda,
            l1_ratio,
            dropout,
            ..
        } = self;

        let checks = [
            ("alpha", alpha, alpha > 0.),
            ("beta", beta, beta > 0.),
            ("lambda", lambda, lambda >= 0.),
            ("l1_ratio", l1_ratio, (0. ..=1.).contains(&l1_ratio)),
            ("dropout", dropout, dropout.abs() < 1.),
        ];

        for (name, value, valid) in checks {
            if !value.is_finite() || !valid {
                return Err(FtrlErr::InvalidInput(format!(
                    "hyperparameter {name} is out of range: {value}"
                )));
            }
        }

        Ok(())
    }

    /// The L1 part of the regularization, also the proximal threshold.
    pub fn lambda1(&self) -> f32 {
        self.lambda * self.l1_ratio
    }

    /// The L2 part of the regularization.
    pub fn lambda2(&self) -> f32 {
        self.lambda * (1. - self.l1_ratio)
    }

    /// Whether fitting should mask features at random.
    pub fn has_dropout(&self) -> bool {
        self.dropout > 0.
    }
}
