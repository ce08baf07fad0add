use log::debug;

use super::{Ftrl, FtrlDump, ModelSpec, OnlineModel, StoreSpec};
use crate::{
    error::Result,
    storage::{AtomicStore, LockedStore},
};

/// Builds models from their configuration.
#[derive(Default)]
pub struct ModelBuilder;

impl ModelBuilder {
    /// Creates a new `ModelBuilder`.
    ///
    /// # Returns
    /// A new `ModelBuilder` instance.
    pub fn new() -> Self {
        Self
    }

    /// Builds a new unfitted model.
    ///
    /// # Arguments
    /// * `spec` - The model configuration.
    ///
    /// # Returns
    /// A new model or an `InvalidInput` error if the spec holds invalid hyperparameters.
    pub fn build(&self, spec: ModelSpec) -> Result<Box<dyn OnlineModel>> {
        debug!(store:? = spec.store, shard_size = spec.shard_size.get(); "building model");

        let ModelSpec {
            params,
            store,
            shard_size,
            seed,
        } = spec;

        let model: Box<dyn OnlineModel> = match store {
            StoreSpec::Atomic => Box::new(Ftrl::<AtomicStore>::with_config(
                params, shard_size, seed,
            )?),
            StoreSpec::Locked => Box::new(Ftrl::<LockedStore>::with_config(
                params, shard_size, seed,
            )?),
        };

        Ok(model)
    }

    /// Rebuilds a model from a dump.
    ///
    /// The hyperparameters come from the dump, the spec only contributes its storage settings.
    ///
    /// # Returns
    /// The restored model or an `InvalidDump` error if the record is malformed.
    pub fn restore(&self, spec: ModelSpec, dump: FtrlDump) -> Result<Box<dyn OnlineModel>> {
        debug!(store:? = spec.store, n_features = dump.n_features; "restoring model");

        let ModelSpec {
            store,
            shard_size,
            seed,
            ..
        } = spec;

        let model: Box<dyn OnlineModel> = match store {
            StoreSpec::Atomic => Box::new(Ftrl::<AtomicStore>::load(dump, shard_size, seed)?),
            StoreSpec::Locked => Box::new(Ftrl::<LockedStore>::load(dump, shard_size, seed)?),
        };

        Ok(model)
    }
}
