use std::sync::Arc;

use parking_lot::Mutex;
use rayon::{ThreadPool, ThreadPoolBuilder, prelude::*};

use super::{RowEngine, RowInput};
use crate::{data::CsrMatrix, error::Result, storage::Store};

/// Derives an independent seed for the `index`-th batch or row.
pub(crate) fn mix(seed: u64, index: u64) -> u64 {
    // splitmix64 finalizer
    let mut z = seed ^ index.wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// A batch of rows ready to be processed, already validated by the model.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    pub x: &'a CsrMatrix,
    pub targets: Option<&'a [f32]>,
    pub weights: Option<&'a [f32]>,
    pub mask_seed: Option<u64>,
}

impl<'a> Batch<'a> {
    /// A read-only batch.
    pub fn predict(x: &'a CsrMatrix) -> Self {
        Self {
            x,
            targets: None,
            weights: None,
            mask_seed: None,
        }
    }

    fn input(&self, row: usize) -> RowInput {
        RowInput {
            target: self.targets.map(|targets| targets[row]),
            weight: self.weights.map_or(1., |weights| weights[row]),
            mask_seed: self.mask_seed.map(|seed| mix(seed, row as u64)),
        }
    }

    /// Runs the rows starting at `start` writing each prediction to its slot in `out`.
    fn run_chunk<S: Store>(&self, engine: &RowEngine<'_, S>, start: usize, out: &mut [f32]) {
        let mut retained = Vec::new();

        for (offset, slot) in out.iter_mut().enumerate() {
            let row = start + offset;
            *slot = engine.process(self.x.row(row), &self.input(row), &mut retained);
        }
    }
}

/// Fans the rows of a batch out across a pool of workers.
///
/// The pool is built lazily and kept around until a batch asks for a different size.
#[derive(Default)]
pub struct BatchRunner {
    pool: Mutex<Option<Arc<ThreadPool>>>,
}

impl BatchRunner {
    /// Creates a new `BatchRunner`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Processes every row of `batch`.
    ///
    /// The rows are split in contiguous chunks, one per worker. This call blocks until
    /// every worker is done.
    ///
    /// # Arguments
    /// * `engine` - The row engine bound to the model's state.
    /// * `batch` - The rows to process.
    /// * `workers` - The amount of workers, `0` and `1` run on the calling thread. Never
    ///   more workers than rows are used.
    ///
    /// # Returns
    /// The predictions in the input's row order, or a `ThreadPool` error if the pool can't be built.
    pub fn run<S: Store>(
        &self,
        engine: &RowEngine<'_, S>,
        batch: &Batch<'_>,
        workers: usize,
    ) -> Result<Vec<f32>> {
        let nrows = batch.x.nrows();
        let workers = workers.min(nrows);
        let mut out = vec![0.; nrows];

        if workers <= 1 {
            batch.run_chunk(engine, 0, &mut out);
            return Ok(out);
        }

        let pool = self.pool(workers)?;
        let chunk_size = nrows.div_ceil(workers);

        pool.install(|| {
            out.par_chunks_mut(chunk_size)
                .enumerate()
                .for_each(|(i, chunk)| batch.run_chunk(engine, i * chunk_size, chunk));
        });

        Ok(out)
    }

    /// Builds the pool a batch of `nrows` rows will run on, if it needs one.
    ///
    /// # Returns
    /// A `ThreadPool` error if the pool can't be built.
    pub fn prepare(&self, workers: usize, nrows: usize) -> Result<()> {
        let workers = workers.min(nrows);

        if workers > 1 {
            self.pool(workers)?;
        }

        Ok(())
    }

    fn pool(&self, workers: usize) -> Result<Arc<ThreadPool>> {
        let mut cached = self.pool.lock();

        if let Some(pool) = cached.as_ref().filter(|pool| pool.current_num_threads() == workers) {
            return Ok(Arc::clone(pool));
        }

        let built = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ftrl-worker-{i}"))
            .build()?;

        let built = Arc::new(built);
        *cached = Some(Arc::clone(&built));
        Ok(built)
    }
}
