use crate::{
    carrier::Frequency,
    constants::{
        EXTRA_WIDE_LANE_WEIGHT, NARROW_LANE_UPD_ACCEPTANCE, NARROW_LANE_WEIGHT,
        WIDE_LANE_UPD_ACCEPTANCE, WIDE_LANE_WEIGHT,
    },
    error::Error,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ambiguity resolution cascade [Stage]s.
/// Stages must be processed in [Stage::CASCADE] order, because later
/// stages consume the integers fixed by the earlier ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Stage {
    /// Extra wide lane (F2/F3)
    Ewl,
    /// Extra wide lane (F2/F4)
    Ewl24,
    /// Extra wide lane (F2/F5)
    Ewl25,
    /// Wide lane (F1/F2)
    #[default]
    Wl,
    /// Narrow lane (F1/F2)
    Nl,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::Ewl => write!(f, "EWL"),
            Self::Ewl24 => write!(f, "EWL24"),
            Self::Ewl25 => write!(f, "EWL25"),
            Self::Wl => write!(f, "WL"),
            Self::Nl => write!(f, "NL"),
        }
    }
}

impl std::str::FromStr for Stage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "EWL" => Ok(Self::Ewl),
            "EWL24" => Ok(Self::Ewl24),
            "EWL25" => Ok(Self::Ewl25),
            "WL" => Ok(Self::Wl),
            "NL" => Ok(Self::Nl),
            _ => Err(Error::Configuration(format!("unknown stage \"{}\"", s))),
        }
    }
}

impl Stage {
    /// Processing order
    pub const CASCADE: [Stage; 5] = [Self::Ewl, Self::Ewl24, Self::Ewl25, Self::Wl, Self::Nl];

    /// Position in the cascade
    pub fn index(&self) -> usize {
        match self {
            Self::Ewl => 0,
            Self::Ewl24 => 1,
            Self::Ewl25 => 2,
            Self::Wl => 3,
            Self::Nl => 4,
        }
    }

    /// True for all stages resolved by rounding (wide and extra wide lanes)
    pub fn is_wide_lane_class(&self) -> bool {
        !matches!(self, Self::Nl)
    }

    /// Frequency slots this stage combines
    pub fn frequencies(&self) -> (Frequency, Frequency) {
        match self {
            Self::Ewl => (Frequency::F2, Frequency::F3),
            Self::Ewl24 => (Frequency::F2, Frequency::F4),
            Self::Ewl25 => (Frequency::F2, Frequency::F5),
            Self::Wl | Self::Nl => (Frequency::F1, Frequency::F2),
        }
    }

    /// Weight of the virtual observations created for this stage
    pub fn constraint_weight(&self) -> f64 {
        match self {
            Self::Nl => NARROW_LANE_WEIGHT,
            Self::Wl => WIDE_LANE_WEIGHT,
            Self::Ewl | Self::Ewl24 | Self::Ewl25 => EXTRA_WIDE_LANE_WEIGHT,
        }
    }

    /// UPD acceptance criteria: (max sigma, exclusive lower bound on the number of points)
    pub fn upd_acceptance(&self) -> (f64, u32) {
        match self {
            Self::Nl => NARROW_LANE_UPD_ACCEPTANCE,
            _ => WIDE_LANE_UPD_ACCEPTANCE,
        }
    }
}
