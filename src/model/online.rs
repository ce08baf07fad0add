use super::{Ftrl, FtrlDump};
use crate::{data::CsrMatrix, error::Result, params::FtrlParams, storage::Store};

/// The interface of an incrementally trained model, independent of its storage strategy.
pub trait OnlineModel: Send {
    fn params(&self) -> &FtrlParams;

    fn n_features(&self) -> Option<usize>;

    /// Fits a batch, mutating the model's state.
    ///
    /// # Returns
    /// The prediction of every row in input order.
    fn fit_batch(
        &mut self,
        x: &CsrMatrix,
        targets: &[f32],
        weights: Option<&[f32]>,
        workers: usize,
    ) -> Result<Vec<f32>>;

    /// Predicts a batch without mutating anything.
    fn predict_batch(
        &self,
        x: &CsrMatrix,
        weights: Option<&[f32]>,
        workers: usize,
    ) -> Result<Vec<f32>>;

    /// Derives the weight of every feature.
    fn derive_weights(&self) -> Result<Vec<f32>>;

    fn dump(&self) -> Result<FtrlDump>;
}

impl<S: Store> OnlineModel for Ftrl<S> {
    fn params(&self) -> &FtrlParams {
        Ftrl::params(self)
    }

    fn n_features(&self) -> Option<usize> {
        Ftrl::n_features(self)
    }

    fn fit_batch(
        &mut self,
        x: &CsrMatrix,
        targets: &[f32],
        weights: Option<&[f32]>,
        workers: usize,
    ) -> Result<Vec<f32>> {
        Ftrl::fit_batch(self, x, targets, weights, workers)
    }

    fn predict_batch(
        &self,
        x: &CsrMatrix,
        weights: Option<&[f32]>,
        workers: usize,
    ) -> Result<Vec<f32>> {
        Ftrl::predict_batch(self, x, weights, workers)
    }

    fn derive_weights(&self) -> Result<Vec<f32>> {
        Ftrl::derive_weights(self)
    }

    fn dump(&self) -> Result<FtrlDump> {
        Ftrl::dump(self)
    }
}
