use super::Family;

/// Raw scores are clamped to this magnitude before exponentiation.
const MAX_SCORE: f32 = 35.;

/// A link function resolved once from a `Family`.
///
/// It maps a raw linear score into the family's output domain and
/// supplies the loss gradient factor for an observed target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Logistic,
    Identity,
    Exp,
}
use Link::*;

impl From<Family> for Link {
    fn from(family: Family) -> Self {
        match family {
            Family::Binomial => Logistic,
            Family::Gaussian => Identity,
            Family::Poisson => Exp,
        }
    }
}

impl Link {
    /// Maps a raw linear score into the output domain.
    ///
    /// # Arguments
    /// * `score` - The dot product between the derived weights and a row.
    ///
    /// # Returns
    /// A probability for `Logistic`, the score itself for `Identity` and a rate for `Exp`.
    pub fn inverse(&self, score: f32) -> f32 {
        match self {
            Logistic => {
                let score = score.clamp(-MAX_SCORE, MAX_SCORE);
                1. / (1. + (-score).exp())
            }
            Identity => score,
            Exp => score.clamp(-MAX_SCORE, MAX_SCORE).exp(),
        }
    }

    /// The gradient of the loss with respect to the raw score.
    ///
    /// All three links are canonical, so the factor is the residual.
    ///
    /// # Arguments
    /// * `prediction` - The output of `Self::inverse` for a row.
    /// * `target` - The observed target of that row.
    pub fn gradient(&self, prediction: f32, target: f32) -> f32 {
        prediction - target
    }

    /// Whether `target` belongs to the label domain of this link.
    pub fn accepts_target(&self, target: f32) -> bool {
        match self {
            Logistic => (0. ..=1.).contains(&target),
            Identity => target.is_finite(),
            Exp => target.is_finite() && target >= 0.,
        }
    }
}
