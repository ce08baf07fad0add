use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the whole engine.
pub type Result<T> = std::result::Result<T, FtrlErr>;

/// The engine's error type.
///
/// Every variant is raised before any mutation of the feature state begins,
/// a rejected batch leaves `z` and `n` untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum FtrlErr {
    DimensionMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    InvalidInput(String),
    UnsupportedFamily(String),
    Reinitialization {
        n_features: usize,
    },
    InvalidDump(String),
    NotFitted,
    ThreadPool(String),
}

impl Display for FtrlErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtrlErr::DimensionMismatch {
                what,
                got,
                expected,
            } => write!(
                f,
                "dimension mismatch in {what}: got {got}, expected {expected}"
            ),
            FtrlErr::InvalidInput(reason) => write!(f, "invalid input: {reason}"),
            FtrlErr::UnsupportedFamily(family) => write!(f, "unsupported family: {family}"),
            FtrlErr::Reinitialization { n_features } => write!(
                f,
                "the feature state is already initialized with {n_features} features"
            ),
            FtrlErr::InvalidDump(reason) => write!(f, "invalid dump: {reason}"),
            FtrlErr::NotFitted => f.write_str("the model has no feature state, fit it first"),
            FtrlErr::ThreadPool(reason) => write!(f, "failed to build the worker pool: {reason}"),
        }
    }
}

impl Error for FtrlErr {}

impl From<rayon::ThreadPoolBuildError> for FtrlErr {
    fn from(value: rayon::ThreadPoolBuildError) -> Self {
        Self::ThreadPool(value.to_string())
    }
}
