use std::{
    fmt::{self, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::error::{FtrlErr, Result};

/// The closed set of model families, each one names its canonical link function.
///
/// Unknown names or codes are rejected when the family is parsed, so a constructed
/// model can never hold a family without an implemented link.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Family {
    #[default]
    Binomial,
    Gaussian,
    Poisson,
}

impl Family {
    /// Returns the stable name of the family.
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Binomial => "binomial",
            Family::Gaussian => "gaussian",
            Family::Poisson => "poisson",
        }
    }

    /// Returns the numeric code of the family.
    pub fn code(&self) -> u8 {
        match self {
            Family::Binomial => 0,
            Family::Gaussian => 1,
            Family::Poisson => 2,
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = FtrlErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binomial" => Ok(Family::Binomial),
            "gaussian" => Ok(Family::Gaussian),
            "poisson" => Ok(Family::Poisson),
            other => Err(FtrlErr::UnsupportedFamily(other.to_string())),
        }
    }
}

impl TryFrom<u8> for Family {
    type Error = FtrlErr;

    fn try_from(code: u8) -> Result<Self> {
        match code {
            0 => Ok(Family::Binomial),
            1 => Ok(Family::Gaussian),
            2 => Ok(Family::Poisson),
            other => Err(FtrlErr::UnsupportedFamily(format!("code {other}"))),
        }
    }
}
