use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::params::FtrlParams;

/// The default amount of features per storage shard.
pub const DEFAULT_SHARD_SIZE: NonZeroUsize = NonZeroUsize::new(1024).unwrap();

fn default_shard_size() -> NonZeroUsize {
    DEFAULT_SHARD_SIZE
}

/// Selects the `Store` implementation backing a model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSpec {
    #[default]
    Atomic,
    Locked,
}

/// The configuration a model is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    #[serde(default)]
    pub params: FtrlParams,
    #[serde(default)]
    pub store: StoreSpec,
    #[serde(default = "default_shard_size")]
    pub shard_size: NonZeroUsize,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ModelSpec {
    fn default() -> Self {
        Self {
            params: FtrlParams::default(),
            store: StoreSpec::default(),
            shard_size: DEFAULT_SHARD_SIZE,
            seed: None,
        }
    }
}
