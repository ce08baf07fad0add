use std::num::NonZeroUsize;

use rayon::prelude::*;

use super::AtomicShard;
use crate::{
    error::{FtrlErr, Result},
    initialization::StateGen,
    storage::{FeatureCell, Store},
};

/// Partitions the feature state in lock-free shards.
///
/// Workers race on the same features freely, every update lands through a
/// compare-and-swap on the packed `(z, n)` pair.
#[derive(Debug)]
pub struct AtomicStore {
    nfeatures: usize,
    shards: Box<[AtomicShard]>,
    shard_size: NonZeroUsize,
}

impl AtomicStore {
    fn locate(&self, feature: usize) -> (&AtomicShard, usize) {
        let size = self.shard_size.get();
        (&self.shards[feature / size], feature % size)
    }
}

impl Store for AtomicStore {
    fn build<G: StateGen>(shard_size: NonZeroUsize, mut state_gen: G) -> Self {
        let mut nfeatures = 0;
        let mut shards = Vec::new();

        while let Some(cells) = state_gen.sample(shard_size.get()) {
            nfeatures += cells.len();
            shards.push(AtomicShard::new(cells));
        }

        Self {
            nfeatures,
            shards: shards.into_boxed_slice(),
            shard_size,
        }
    }

    fn len(&self) -> usize {
        self.nfeatures
    }

    fn load(&self, feature: usize) -> FeatureCell {
        let (shard, offset) = self.locate(feature);
        shard.load(offset)
    }

    fn update<F>(&self, feature: usize, step: F)
    where
        F: Fn(FeatureCell) -> FeatureCell,
    {
        let (shard, offset) = self.locate(feature);
        shard.update(offset, step);
    }

    fn pull(&self, z: &mut [f32], n: &mut [f32]) -> Result<()> {
        if z.len() != self.nfeatures || n.len() != self.nfeatures {
            return Err(FtrlErr::DimensionMismatch {
                what: "state buffer",
                got: z.len().min(n.len()),
                expected: self.nfeatures,
            });
        }

        let size = self.shard_size.get();

        self.shards
            .par_iter()
            .zip(z.par_chunks_mut(size))
            .zip(n.par_chunks_mut(size))
            .try_for_each(|((shard, z), n)| shard.pull(z, n))
    }
}
