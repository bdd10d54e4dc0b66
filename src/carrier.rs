use crate::constants::{
    GLONASS_G1_BASE_HZ, GLONASS_G1_SPACING_HZ, GLONASS_G2_BASE_HZ, GLONASS_G2_SPACING_HZ,
    SPEED_OF_LIGHT_M_S,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Carrier {
    /// L1 (GPS/QZSS/SBAS) same frequency as E1 and B1C
    #[default]
    L1,
    /// L2 (GPS/QZSS)
    L2,
    /// L5 (GPS/QZSS/SBAS) same frequency as E5A and B2A
    L5,
    /// E1 (Galileo)
    E1,
    /// E5 (Galileo) same frequency as B2
    E5,
    /// E5A (Galileo) same frequency as L5
    E5A,
    /// E5B (Galileo) same frequency as B2B
    E5B,
    /// E6 (Galileo)
    E6,
    /// B1I (BDS)
    B1I,
    /// B1C (BDS) same frequency as L1
    B1C,
    /// B2A (BDS) same frequency as L5 and E5A
    B2A,
    /// B2B (BDS) same frequency as E5B
    B2B,
    /// B3 (BDS)
    B3,
    /// G1 (Glonass FDMA)
    G1,
    /// G2 (Glonass FDMA)
    G2,
    /// G3 (Glonass CDMA)
    G3,
}

impl std::fmt::Display for Carrier {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Self::L1 => write!(f, "L1"),
            Self::L2 => write!(f, "L2"),
            Self::L5 => write!(f, "L5"),
            Self::E1 => write!(f, "E1"),
            Self::E5 => write!(f, "E5"),
            Self::E5A => write!(f, "E5A"),
            Self::E5B => write!(f, "E5B"),
            Self::E6 => write!(f, "E6"),
            Self::B1I => write!(f, "B1I"),
            Self::B1C => write!(f, "B1C"),
            Self::B2A => write!(f, "B2A"),
            Self::B2B => write!(f, "B2B"),
            Self::B3 => write!(f, "B3"),
            Self::G1 => write!(f, "G1"),
            Self::G2 => write!(f, "G2"),
            Self::G3 => write!(f, "G3"),
        }
    }
}

impl Carrier {
    /// True for carriers shared by satellites on distinct frequencies (FDMA),
    /// for which the frequency channel is required.
    pub fn is_fdma(&self) -> bool {
        matches!(self, Self::G1 | Self::G2)
    }

    /// Carrier frequency in Hz. `channel` is the Glonass frequency
    /// channel number and only applies to FDMA carriers.
    pub fn frequency(&self, channel: Option<i8>) -> f64 {
        let k = channel.unwrap_or_default() as f64;
        match self {
            Self::L1 | Self::E1 | Self::B1C => 1575.42E6_f64,
            Self::L2 => 1227.60E6_f64,
            Self::L5 | Self::E5A | Self::B2A => 1176.45E6_f64,
            Self::E5 => 1191.795E6_f64,
            Self::E6 => 1278.750E6_f64,
            Self::B3 => 1268.52E6_f64,
            Self::E5B | Self::B2B => 1207.14E6_f64,
            Self::B1I => 1561.098E6_f64,
            Self::G1 => GLONASS_G1_BASE_HZ + k * GLONASS_G1_SPACING_HZ,
            Self::G2 => GLONASS_G2_BASE_HZ + k * GLONASS_G2_SPACING_HZ,
            Self::G3 => 1202.025E6_f64,
        }
    }

    /// Carrier wavelength in meters.
    pub fn wavelength(&self, channel: Option<i8>) -> f64 {
        SPEED_OF_LIGHT_M_S / self.frequency(channel)
    }
}

/// Frequency slot, as assigned by the band plan of each constellation.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Eq, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Frequency {
    #[default]
    F1,
    F2,
    F3,
    F4,
    F5,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(f, "F{}", self.index() + 1)
    }
}

impl Frequency {
    /// All frequency slots, in ascending order
    pub const ALL: [Frequency; 5] = [Self::F1, Self::F2, Self::F3, Self::F4, Self::F5];

    /// Zero based index of this slot
    pub fn index(&self) -> usize {
        match self {
            Self::F1 => 0,
            Self::F2 => 1,
            Self::F3 => 2,
            Self::F4 => 3,
            Self::F5 => 4,
        }
    }
}
