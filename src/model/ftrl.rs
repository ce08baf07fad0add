use std::num::NonZeroUsize;

use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use super::{FtrlDump, spec::DEFAULT_SHARD_SIZE};
use crate::{
    data::CsrMatrix,
    error::{FtrlErr, Result},
    family::Link,
    initialization::{RestoredStateGen, ZeroStateGen},
    optimization::Proximal,
    params::FtrlParams,
    storage::{AtomicStore, FeatureCell, Store},
    training::{self, Batch, BatchRunner, RowEngine},
};

/// Bounds `|x_ij * w_i|`, about `sqrt(f32::MAX)`.
const MAX_SCALED_VALUE: f32 = 1.8e19;

/// An FTRL-proximal model trained incrementally over sparse mini-batches.
///
/// The model owns its feature state exclusively, callers only ever get
/// predictions, weights and dumps back by value.
pub struct Ftrl<S: Store = AtomicStore> {
    params: FtrlParams,
    state: Option<S>,
    shard_size: NonZeroUsize,
    seed: u64,
    batches: u64,
    runner: BatchRunner,
}

impl<S: Store> Ftrl<S> {
    /// Creates a new unfitted `Ftrl` model with the default shard size and a random seed.
    ///
    /// # Returns
    /// An `InvalidInput` error if a hyperparameter is out of range.
    pub fn new(params: FtrlParams) -> Result<Self> {
        Self::with_config(params, DEFAULT_SHARD_SIZE, None)
    }

    /// Creates a new unfitted `Ftrl` model.
    ///
    /// # Arguments
    /// * `params` - The model's hyperparameters.
    /// * `shard_size` - The maximum amount of features per storage shard.
    /// * `seed` - Seeds the dropout masks, drawn from the OS when missing.
    ///
    /// # Returns
    /// An `InvalidInput` error if a hyperparameter is out of range.
    pub fn with_config(
        params: FtrlParams,
        shard_size: NonZeroUsize,
        seed: Option<u64>,
    ) -> Result<Self> {
        params.validate()?;

        let seed = seed.unwrap_or_else(|| StdRng::from_os_rng().random());

        Ok(Self {
            params,
            state: None,
            shard_size,
            seed,
            batches: 0,
            runner: BatchRunner::new(),
        })
    }

    /// Rebuilds a model from a dump.
    ///
    /// # Returns
    /// An `InvalidDump` error if the record is malformed.
    pub fn load(dump: FtrlDump, shard_size: NonZeroUsize, seed: Option<u64>) -> Result<Self> {
        dump.validate()?;

        let mut model = Self::with_config(dump.params(), shard_size, seed)
            .map_err(|e| FtrlErr::InvalidDump(e.to_string()))?;

        let n_features = dump.n_features;
        let state_gen = RestoredStateGen::new(dump.z, dump.n);
        model.state = Some(S::build(shard_size, state_gen));

        info!(n_features = n_features; "feature state restored");
        Ok(model)
    }

    pub fn params(&self) -> &FtrlParams {
        &self.params
    }

    /// The amount of features of the model, `None` until its state is initialized.
    pub fn n_features(&self) -> Option<usize> {
        self.state.as_ref().map(S::len)
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Allocates a zeroed feature state.
    ///
    /// This happens implicitly on the first fit, with the column count of its matrix.
    ///
    /// # Returns
    /// A `Reinitialization` error if the state already exists.
    pub fn init_state(&mut self, n_features: usize) -> Result<()> {
        if let Some(state) = &self.state {
            return Err(FtrlErr::Reinitialization {
                n_features: state.len(),
            });
        }

        self.state = Some(S::build(self.shard_size, ZeroStateGen::new(n_features)));
        info!(n_features = n_features; "feature state initialized");
        Ok(())
    }

    /// Fits the model on a batch of rows.
    ///
    /// The whole batch is validated before the state is touched, a rejected
    /// batch leaves the model unchanged.
    ///
    /// # Arguments
    /// * `x` - The rows to fit.
    /// * `targets` - One target per row.
    /// * `weights` - One non-negative sample weight per row, all ones when `None`.
    /// * `workers` - The amount of workers, `0` and `1` run on the calling thread.
    ///
    /// # Returns
    /// The prediction of every row, made right before its own update.
    pub fn fit_batch(
        &mut self,
        x: &CsrMatrix,
        targets: &[f32],
        weights: Option<&[f32]>,
        workers: usize,
    ) -> Result<Vec<f32>> {
        self.check_fit(x, targets, weights)
            .inspect_err(|e| warn!("rejected batch: {e}"))?;

        // a failed pool build must leave an unfitted model unfitted
        self.runner.prepare(workers, x.nrows())?;

        if self.state.is_none() {
            self.init_state(x.ncols())?;
        }

        let state = self.state.as_ref().ok_or(FtrlErr::NotFitted)?;
        let mask_seed = self
            .params
            .has_dropout()
            .then(|| training::mix(self.seed, self.batches));

        debug!(rows = x.nrows(), nnz = x.nnz(), workers = workers; "fitting batch");

        let engine = RowEngine::new(state, &self.params);
        let batch = Batch {
            x,
            targets: Some(targets),
            weights,
            mask_seed,
        };
        let predictions = self.runner.run(&engine, &batch, workers)?;

        self.batches += 1;
        Ok(predictions)
    }

    /// Predicts a batch of rows, the state is only read.
    ///
    /// Sample weights are validated like in `fit_batch` but leave predictions unchanged,
    /// they only ever scale gradients.
    ///
    /// # Arguments
    /// * `x` - The rows to predict.
    /// * `weights` - The optional sample weight of every row.
    /// * `workers` - The amount of workers, `0` and `1` run on the calling thread.
    ///
    /// # Returns
    /// The prediction of every row in input order, or `NotFitted` if there's no state yet.
    pub fn predict_batch(
        &self,
        x: &CsrMatrix,
        weights: Option<&[f32]>,
        workers: usize,
    ) -> Result<Vec<f32>> {
        let state = self.state.as_ref().ok_or(FtrlErr::NotFitted)?;
        check_weights(x.nrows(), weights)?;
        self.check_matrix(x, state.len())?;

        debug!(rows = x.nrows(), workers = workers; "predicting batch");

        let engine = RowEngine::new(state, &self.params);
        self.runner.run(&engine, &Batch::predict(x), workers)
    }

    /// Derives the current weight of a single feature.
    pub fn weight(&self, feature: usize) -> Result<f32> {
        let state = self.state.as_ref().ok_or(FtrlErr::NotFitted)?;

        if feature >= state.len() {
            return Err(FtrlErr::InvalidInput(format!(
                "feature {feature} out of bounds for {} features",
                state.len()
            )));
        }

        Ok(Proximal::from(&self.params).weight(state.load(feature)))
    }

    /// Derives the current weight of every feature.
    pub fn derive_weights(&self) -> Result<Vec<f32>> {
        let state = self.state.as_ref().ok_or(FtrlErr::NotFitted)?;
        let (z, n) = pull(state)?;
        let rule = Proximal::from(&self.params);

        Ok(z
            .par_iter()
            .zip(&n)
            .map(|(&z, &n)| rule.weight(FeatureCell::new(z, n)))
            .collect())
    }

    /// Snapshots the model, an unfitted model dumps no features.
    pub fn dump(&self) -> Result<FtrlDump> {
        let (z, n) = match &self.state {
            Some(state) => pull(state)?,
            None => (Vec::new(), Vec::new()),
        };

        Ok(FtrlDump::new(&self.params, z, n))
    }

    fn check_fit(&self, x: &CsrMatrix, targets: &[f32], weights: Option<&[f32]>) -> Result<()> {
        let nrows = x.nrows();

        if targets.len() != nrows {
            return Err(FtrlErr::DimensionMismatch {
                what: "targets",
                got: targets.len(),
                expected: nrows,
            });
        }

        check_weights(nrows, weights)?;

        let link = Link::from(self.params.family);
        if let Some(i) = targets.iter().position(|&y| !link.accepts_target(y)) {
            return Err(FtrlErr::InvalidInput(format!(
                "target {} of row {i} is outside the {} domain",
                targets[i], self.params.family
            )));
        }

        let n_features = self.n_features().unwrap_or(x.ncols());
        self.check_matrix(x, n_features)?;
        check_scaled_values(x, weights)
    }

    fn check_matrix(&self, x: &CsrMatrix, n_features: usize) -> Result<()> {
        if x.ncols() != n_features {
            return Err(FtrlErr::DimensionMismatch {
                what: "features",
                got: x.ncols(),
                expected: n_features,
            });
        }

        if !x.is_finite() {
            return Err(FtrlErr::InvalidInput(
                "the matrix contains non-finite values".into(),
            ));
        }

        Ok(())
    }
}

fn check_weights(nrows: usize, weights: Option<&[f32]>) -> Result<()> {
    let Some(weights) = weights else {
        return Ok(());
    };

    if weights.len() != nrows {
        return Err(FtrlErr::DimensionMismatch {
            what: "sample weights",
            got: weights.len(),
            expected: nrows,
        });
    }

    match weights.iter().position(|w| !w.is_finite() || *w < 0.) {
        Some(i) => Err(FtrlErr::InvalidInput(format!(
            "sample weight {} of row {i} must be finite and non-negative",
            weights[i]
        ))),
        None => Ok(()),
    }
}

/// Rejects rows holding a value whose square, once scaled by its sample weight, overflows `f32`.
fn check_scaled_values(x: &CsrMatrix, weights: Option<&[f32]>) -> Result<()> {
    for i in 0..x.nrows() {
        let weight = weights.map_or(1., |weights| weights[i]);

        let oversized = x
            .row(i)
            .find(|(_, v)| (v * weight).abs() >= MAX_SCALED_VALUE);

        if let Some((j, value)) = oversized {
            return Err(FtrlErr::InvalidInput(format!(
                "value {value} at row {i}, column {j} is too large once weighted by {weight}"
            )));
        }
    }

    Ok(())
}

fn pull<S: Store>(state: &S) -> Result<(Vec<f32>, Vec<f32>)> {
    let mut z = vec![0.; state.len()];
    let mut n = vec![0.; state.len()];
    state.pull(&mut z, &mut n)?;
    Ok((z, n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{family::Family, storage::LockedStore};

    fn params() -> FtrlParams {
        FtrlParams {
            alpha: 0.5,
            beta: 1.,
            lambda: 0.,
            l1_ratio: 1.,
            ..Default::default()
        }
    }

    fn model() -> Ftrl {
        Ftrl::with_config(params(), NonZeroUsize::new(2).unwrap(), Some(0)).unwrap()
    }

    fn matrix() -> CsrMatrix {
        CsrMatrix::from_rows(
            3,
            [vec![(0, 1.), (1, 1.)], vec![(1, -1.), (2, 1.)], vec![]],
        )
        .unwrap()
    }

    #[test]
    fn reject_invalid_params() {
        let params = FtrlParams {
            alpha: -1.,
            ..Default::default()
        };

        assert!(matches!(
            Ftrl::<AtomicStore>::new(params),
            Err(FtrlErr::InvalidInput(_))
        ));
    }

    #[test]
    fn first_fit_initializes_state() {
        let mut model = model();
        assert!(!model.is_fitted());

        let predictions = model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();

        assert_eq!(model.n_features(), Some(3));
        assert_eq!(predictions.len(), 3);
        assert_eq!(predictions[0], 0.5);
        assert_eq!(predictions[2], 0.5);
    }

    #[test]
    fn n_is_the_sum_of_squared_gradients() {
        let mut model = model();
        let x = CsrMatrix::from_rows(2, [vec![(0, 2.)]]).unwrap();

        model.fit_batch(&x, &[1.], None, 1).unwrap();

        // g = 0.5 - 1 = -0.5, g * x = -1
        let dump = model.dump().unwrap();
        assert_eq!(dump.n, [1., 0.]);
        assert_eq!(dump.z, [-1., 0.]);

        let p = model.predict_batch(&x, None, 1).unwrap()[0];
        model.fit_batch(&x, &[1.], None, 1).unwrap();

        let grad = (p - 1.) * 2.;
        let dump = model.dump().unwrap();
        assert!((dump.n[0] - (1. + grad * grad)).abs() < 1e-6);
    }

    #[test]
    fn reinitialization_is_rejected() {
        let mut model = model();
        model.init_state(3).unwrap();

        assert_eq!(
            model.init_state(5),
            Err(FtrlErr::Reinitialization { n_features: 3 })
        );
        assert_eq!(model.n_features(), Some(3));
    }

    #[test]
    fn feature_count_is_fixed_after_first_fit() {
        let mut model = model();
        model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();

        let wider = CsrMatrix::from_rows(4, [vec![(3, 1.)]]).unwrap();
        let err = model.fit_batch(&wider, &[1.], None, 1).unwrap_err();

        assert_eq!(
            err,
            FtrlErr::DimensionMismatch {
                what: "features",
                got: 4,
                expected: 3
            }
        );
        assert!(matches!(
            model.predict_batch(&wider, None, 1),
            Err(FtrlErr::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn rejected_batches_leave_state_untouched() {
        let mut model = model();
        model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();
        let before = model.dump().unwrap();

        let nan = CsrMatrix::from_rows(3, [vec![(0, 1.)], vec![(1, f32::NAN)]]).unwrap();
        let cases = [
            model.fit_batch(&matrix(), &[1., 0.], None, 2),
            model.fit_batch(&matrix(), &[1., 0., 1.], Some(&[1., 1.][..]), 2),
            model.fit_batch(&matrix(), &[1., 0., 1.], Some(&[1., -1., 1.][..]), 2),
            model.fit_batch(&matrix(), &[1., 2., 1.], None, 2),
            model.fit_batch(&nan, &[1., 0.], None, 2),
        ];

        for case in cases {
            assert!(case.is_err());
        }

        assert_eq!(model.dump().unwrap(), before);
    }

    #[test]
    fn oversized_values_are_rejected_before_any_update() {
        let mut model = model();
        let huge = CsrMatrix::from_rows(2, [vec![(0, 1e20)]]).unwrap();

        assert!(matches!(
            model.fit_batch(&huge, &[1.], None, 1),
            Err(FtrlErr::InvalidInput(_))
        ));
        assert!(!model.is_fitted());

        let x = CsrMatrix::from_rows(2, [vec![(0, 1.)]]).unwrap();
        model.fit_batch(&x, &[1.], None, 1).unwrap();
        let before = model.dump().unwrap();

        assert!(matches!(
            model.fit_batch(&huge, &[1.], None, 1),
            Err(FtrlErr::InvalidInput(_))
        ));

        let scaled = CsrMatrix::from_rows(2, [vec![(1, 1e10)]]).unwrap();
        assert!(matches!(
            model.fit_batch(&scaled, &[0.], Some(&[1e10][..]), 1),
            Err(FtrlErr::InvalidInput(_))
        ));

        assert_eq!(model.dump().unwrap(), before);
        assert!(Ftrl::<AtomicStore>::load(before, DEFAULT_SHARD_SIZE, Some(0)).is_ok());
    }

    #[test]
    fn large_finite_values_keep_the_state_finite() {
        let mut model = model();
        let x = CsrMatrix::from_rows(2, [vec![(0, 1e18)], vec![(0, -1e18), (1, 1.)]]).unwrap();

        for _ in 0..3 {
            model.fit_batch(&x, &[1., 0.], None, 1).unwrap();
        }

        let dump = model.dump().unwrap();
        assert!(dump.validate().is_ok());
        assert!(model.derive_weights().unwrap().iter().all(|w| w.is_finite()));
    }

    #[test]
    fn more_workers_than_rows() {
        let mut model = model();
        let x = CsrMatrix::from_rows(2, [vec![(0, 1.)], vec![(1, 1.)]]).unwrap();

        let fitted = model.fit_batch(&x, &[1., 0.], None, 200_000).unwrap();
        assert_eq!(fitted.len(), 2);
        assert_eq!(model.n_features(), Some(2));

        let predicted = model.predict_batch(&x, None, 200_000).unwrap();
        assert_eq!(predicted, model.predict_batch(&x, None, 1).unwrap());
    }

    #[test]
    fn rejected_first_batch_leaves_model_unfitted() {
        let mut model = model();
        let err = model.fit_batch(&matrix(), &[1.], None, 1).unwrap_err();

        assert!(matches!(err, FtrlErr::DimensionMismatch { what: "targets", .. }));
        assert!(!model.is_fitted());
    }

    #[test]
    fn unfitted_model() {
        let model = model();

        assert_eq!(model.predict_batch(&matrix(), None, 1), Err(FtrlErr::NotFitted));
        assert_eq!(model.derive_weights(), Err(FtrlErr::NotFitted));
        assert_eq!(model.weight(0), Err(FtrlErr::NotFitted));

        let dump = model.dump().unwrap();
        assert_eq!(dump.n_features, 0);
        assert!(dump.z.is_empty() && dump.n.is_empty());
    }

    #[test]
    fn predict_weights_are_checked_but_ignored() {
        let mut model = model();
        model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();

        let plain = model.predict_batch(&matrix(), None, 1).unwrap();
        let weighted = model
            .predict_batch(&matrix(), Some(&[0., 2., 5.][..]), 1)
            .unwrap();
        assert_eq!(plain, weighted);

        assert!(matches!(
            model.predict_batch(&matrix(), Some(&[1.][..]), 1),
            Err(FtrlErr::DimensionMismatch { .. })
        ));
        assert!(matches!(
            model.predict_batch(&matrix(), Some(&[1., -1., 1.][..]), 1),
            Err(FtrlErr::InvalidInput(_))
        ));
    }

    #[test]
    fn weight_out_of_bounds() {
        let mut model = model();
        model.init_state(2).unwrap();

        assert_eq!(model.weight(1), Ok(0.));
        assert!(matches!(model.weight(2), Err(FtrlErr::InvalidInput(_))));
    }

    #[test]
    fn derive_weights_matches_single_weights() {
        let mut model = model();
        model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();

        let weights = model.derive_weights().unwrap();
        for (j, &w) in weights.iter().enumerate() {
            assert_eq!(model.weight(j).unwrap(), w);
        }
        assert_eq!(weights, model.dump().unwrap().weights());
    }

    #[test]
    fn load_restores_state() {
        let mut model = model();
        model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();
        let dump = model.dump().unwrap();

        let restored: Ftrl<LockedStore> =
            Ftrl::load(dump.clone(), NonZeroUsize::new(1).unwrap(), Some(0)).unwrap();

        assert_eq!(restored.dump().unwrap(), dump);
        assert_eq!(
            restored.predict_batch(&matrix(), None, 1).unwrap(),
            model.predict_batch(&matrix(), None, 1).unwrap()
        );
    }

    #[test]
    fn load_rejects_malformed_dump() {
        let mut dump = FtrlDump::new(&params(), vec![0.; 3], vec![0.; 3]);
        dump.n_features = 2;

        let err = Ftrl::<AtomicStore>::load(dump, DEFAULT_SHARD_SIZE, None).err();
        assert!(matches!(err, Some(FtrlErr::InvalidDump(_))));
    }

    #[test]
    fn zero_dropout_ignores_the_seed() {
        let fit = |seed| {
            let mut model: Ftrl =
                Ftrl::with_config(params(), DEFAULT_SHARD_SIZE, Some(seed)).unwrap();
            model.fit_batch(&matrix(), &[1., 0., 1.], None, 1).unwrap();
            model.dump().unwrap()
        };

        assert_eq!(fit(1), fit(2));
    }

    #[test]
    fn seeded_dropout_is_reproducible() {
        let params = FtrlParams {
            dropout: 0.5,
            ..params()
        };
        let row: Vec<_> = (0..16).map(|j| (j, 1.)).collect();
        let x = CsrMatrix::from_rows(16, vec![row; 8]).unwrap();
        let targets = [1.; 8];

        let fit = |seed| {
            let mut model: Ftrl =
                Ftrl::with_config(params, DEFAULT_SHARD_SIZE, Some(seed)).unwrap();
            model.fit_batch(&x, &targets, None, 1).unwrap();
            model.fit_batch(&x, &targets, None, 1).unwrap();
            model.dump().unwrap()
        };

        assert_eq!(fit(9), fit(9));
    }

    #[test]
    fn gaussian_family_accepts_any_target() {
        let params = FtrlParams {
            family: Family::Gaussian,
            ..params()
        };
        let mut model: Ftrl = Ftrl::with_config(params, DEFAULT_SHARD_SIZE, Some(0)).unwrap();

        let predictions = model.fit_batch(&matrix(), &[3.5, -2., 0.], None, 1).unwrap();
        assert_eq!(predictions[0], 0.);
        assert!(model.weight(0).unwrap() > 0.);
    }
}
