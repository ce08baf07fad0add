use std::sync::atomic::{AtomicU64, Ordering};

use crate::{
    error::{FtrlErr, Result},
    storage::FeatureCell,
};

/// A slice of the feature state updated without locks.
///
/// Each feature lives in one `AtomicU64` with both accumulators packed in it, so an update
/// is a compare-and-swap retry loop over the whole pair.
#[derive(Debug)]
pub struct AtomicShard {
    cells: Box<[AtomicU64]>,
}

impl AtomicShard {
    /// Creates a new `AtomicShard`.
    ///
    /// # Arguments
    /// * `cells` - The initial state of the shard's features.
    pub fn new(cells: Vec<FeatureCell>) -> Self {
        let cells = cells
            .into_iter()
            .map(|cell| AtomicU64::new(cell.to_bits()))
            .collect();

        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn load(&self, offset: usize) -> FeatureCell {
        FeatureCell::from_bits(self.cells[offset].load(Ordering::Acquire))
    }

    /// Replaces the feature at `offset` with `step` applied to it.
    ///
    /// # Arguments
    /// * `offset` - The position of the feature inside this shard.
    /// * `step` - A pure function, it's re-evaluated whenever another worker wins the race.
    pub fn update<F>(&self, offset: usize, step: F)
    where
        F: Fn(FeatureCell) -> FeatureCell,
    {
        let cell = &self.cells[offset];
        let mut current = cell.load(Ordering::Acquire);

        loop {
            let next = step(FeatureCell::from_bits(current)).to_bits();

            match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    /// Copies the shard's accumulators into the provided buffers.
    ///
    /// # Returns
    /// A `DimensionMismatch` error if either buffer isn't the same size as this shard.
    pub fn pull(&self, z: &mut [f32], n: &mut [f32]) -> Result<()> {
        if z.len() != self.len() || n.len() != self.len() {
            return Err(FtrlErr::DimensionMismatch {
                what: "shard buffer",
                got: z.len().min(n.len()),
                expected: self.len(),
            });
        }

        for (offset, (z, n)) in z.iter_mut().zip(n.iter_mut()).enumerate() {
            let cell = self.load(offset);
            *z = cell.z;
            *n = cell.n;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    fn add_step(cell: FeatureCell) -> FeatureCell {
        FeatureCell::new(cell.z + 1., cell.n + 2.)
    }

    #[test]
    fn update_and_pull() {
        let shard = AtomicShard::new(vec![FeatureCell::default(); 3]);

        shard.update(1, add_step);
        shard.update(1, add_step);

        let mut z = [0.; 3];
        let mut n = [0.; 3];
        shard.pull(&mut z, &mut n).unwrap();

        assert_eq!(z, [0., 2., 0.]);
        assert_eq!(n, [0., 4., 0.]);
    }

    #[test]
    fn pull_size_mismatch() {
        let shard = AtomicShard::new(vec![FeatureCell::default(); 3]);
        let mut z = [0.; 2];
        let mut n = [0.; 3];

        assert!(matches!(
            shard.pull(&mut z, &mut n),
            Err(FtrlErr::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        const THREADS: usize = 8;
        const UPDATES: usize = 1000;

        let shard = Arc::new(AtomicShard::new(vec![FeatureCell::default()]));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let shard = Arc::clone(&shard);
                thread::spawn(move || {
                    for _ in 0..UPDATES {
                        shard.update(0, add_step);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let cell = shard.load(0);
        assert_eq!(cell.z, (THREADS * UPDATES) as f32);
        assert_eq!(cell.n, (2 * THREADS * UPDATES) as f32);
    }
}
