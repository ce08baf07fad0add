use parking_lot::RwLock;

use crate::{
    error::{FtrlErr, Result},
    storage::FeatureCell,
};

/// A slice of the feature state guarded by a reader-writer lock.
///
/// Readers share the lock, an update holds it exclusively for a single
/// feature's read-modify-write.
#[derive(Debug)]
pub struct LockedShard {
    nfeatures: usize,
    cells: RwLock<Box<[FeatureCell]>>,
}

impl LockedShard {
    /// Creates a new `LockedShard`.
    ///
    /// # Arguments
    /// * `cells` - The initial state of the shard's features.
    pub fn new(cells: Vec<FeatureCell>) -> Self {
        Self {
            nfeatures: cells.len(),
            cells: RwLock::new(cells.into_boxed_slice()),
        }
    }

    pub fn len(&self) -> usize {
        self.nfeatures
    }

    pub fn is_empty(&self) -> bool {
        self.nfeatures == 0
    }

    pub fn load(&self, offset: usize) -> FeatureCell {
        self.cells.read()[offset]
    }

    pub fn update<F>(&self, offset: usize, step: F)
    where
        F: Fn(FeatureCell) -> FeatureCell,
    {
        let mut cells = self.cells.write();
        cells[offset] = step(cells[offset]);
    }

    /// Copies the shard's accumulators into the provided buffers.
    ///
    /// # Returns
    /// A `DimensionMismatch` error if either buffer isn't the same size as this shard.
    pub fn pull(&self, z: &mut [f32], n: &mut [f32]) -> Result<()> {
        if z.len() != self.nfeatures || n.len() != self.nfeatures {
            return Err(FtrlErr::DimensionMismatch {
                what: "shard buffer",
                got: z.len().min(n.len()),
                expected: self.nfeatures,
            });
        }

        let cells = self.cells.read();

        for ((z, n), cell) in z.iter_mut().zip(n.iter_mut()).zip(cells.iter()) {
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

    #[test]
    fn update_and_pull() {
        let shard = LockedShard::new(vec![FeatureCell::default(); 2]);

        shard.update(0, |cell| FeatureCell::new(cell.z - 1., cell.n + 1.));
        shard.update(0, |cell| FeatureCell::new(cell.z - 1., cell.n + 1.));

        let mut z = [0.; 2];
        let mut n = [0.; 2];
        shard.pull(&mut z, &mut n).unwrap();

        assert_eq!(z, [-2., 0.]);
        assert_eq!(n, [2., 0.]);
    }

    #[test]
    fn concurrent_updates_are_not_lost() {
        const THREADS: usize = 4;
        const UPDATES: usize = 500;

        let shard = Arc::new(LockedShard::new(vec![FeatureCell::default(); 2]));

        let handles: Vec<_> = (0..THREADS)
            .map(|i| {
                let shard = Arc::clone(&shard);
                thread::spawn(move || {
                    for _ in 0..UPDATES {
                        shard.update(i % 2, |cell| FeatureCell::new(cell.z + 1., cell.n + 1.));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let expected = (THREADS / 2 * UPDATES) as f32;
        assert_eq!(shard.load(0), FeatureCell::new(expected, expected));
        assert_eq!(shard.load(1), FeatureCell::new(expected, expected));
    }
}
