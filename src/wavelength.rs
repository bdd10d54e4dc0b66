use std::collections::HashMap;

use crate::{
    carrier::Frequency,
    cfg::BandPlan,
    constants::SPEED_OF_LIGHT_M_S,
    prelude::{Constellation, Stage},
};

/// Wavelengths (meters) of one constellation, for one frequency channel.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Wavelengths {
    /// Carrier frequencies (Hz), per [Frequency] slot
    pub frequencies: [Option<f64>; 5],
}

impl Wavelengths {
    fn frequency(&self, frequency: Frequency) -> Option<f64> {
        self.frequencies[frequency.index()]
    }

    fn lane(&self, lhs: Frequency, rhs: Frequency) -> Option<f64> {
        let (f_a, f_b) = (self.frequency(lhs)?, self.frequency(rhs)?);
        Some(SPEED_OF_LIGHT_M_S / (f_a - f_b))
    }

    /// Carrier wavelength of this [Frequency] slot
    pub fn band(&self, frequency: Frequency) -> Option<f64> {
        Some(SPEED_OF_LIGHT_M_S / self.frequency(frequency)?)
    }

    /// F1/F2 wide lane
    pub fn wide_lane(&self) -> Option<f64> {
        self.lane(Frequency::F1, Frequency::F2)
    }

    /// F1/F2 narrow lane
    pub fn narrow_lane(&self) -> Option<f64> {
        let (f_1, f_2) = (self.frequency(Frequency::F1)?, self.frequency(Frequency::F2)?);
        Some(SPEED_OF_LIGHT_M_S / (f_1 + f_2))
    }

    /// F2/F3 extra wide lane
    pub fn extra_wide_lane(&self) -> Option<f64> {
        self.lane(Frequency::F2, Frequency::F3)
    }

    /// F2/F4 extra wide lane
    pub fn extra_wide_lane_24(&self) -> Option<f64> {
        self.lane(Frequency::F2, Frequency::F4)
    }

    /// F2/F5 extra wide lane
    pub fn extra_wide_lane_25(&self) -> Option<f64> {
        self.lane(Frequency::F2, Frequency::F5)
    }

    /// Wavelength of this [Stage] combination
    pub fn stage(&self, stage: Stage) -> Option<f64> {
        match stage {
            Stage::Ewl => self.extra_wide_lane(),
            Stage::Ewl24 => self.extra_wide_lane_24(),
            Stage::Ewl25 => self.extra_wide_lane_25(),
            Stage::Wl => self.wide_lane(),
            Stage::Nl => self.narrow_lane(),
        }
    }

    /// Coefficient of the wide lane integer in the F1/F2 ionosphere free
    /// ambiguity: B_if = λ_nl N_1 + c f_2 / (f_1² - f_2²) N_wl
    pub fn if_wide_lane_coefficient(&self) -> Option<f64> {
        let (f_1, f_2) = (self.frequency(Frequency::F1)?, self.frequency(Frequency::F2)?);
        Some(SPEED_OF_LIGHT_M_S * f_2 / (f_1.powi(2) - f_2.powi(2)))
    }
}

/// [WavelengthTable] caches [Wavelengths] per [Constellation] and frequency channel.
#[derive(Debug, Clone, Default)]
pub struct WavelengthTable {
    bands: BandPlan,
    cache: HashMap<(Constellation, i8), Wavelengths>,
}

impl WavelengthTable {
    /// Creates a new [WavelengthTable] for this [BandPlan]
    pub fn new(bands: BandPlan) -> Self {
        Self {
            bands,
            cache: HashMap::with_capacity(8),
        }
    }

    /// Returns [Wavelengths] for this [Constellation]. `channel` only applies to FDMA signals.
    pub fn wavelengths(&mut self, constellation: Constellation, channel: Option<i8>) -> Wavelengths {
        let key = (constellation, channel.unwrap_or_default());

        if let Some(cached) = self.cache.get(&key) {
            return *cached;
        }

        let mut wavelengths = Wavelengths::default();

        for frequency in Frequency::ALL {
            if let Some(carrier) = self.bands.carrier(constellation, frequency) {
                wavelengths.frequencies[frequency.index()] = Some(carrier.frequency(channel));
            }
        }

        self.cache.insert(key, wavelengths);
        wavelengths
    }
}

#[cfg(test)]
mod test {
    use super::WavelengthTable;
    use crate::{
        carrier::Frequency,
        prelude::{Constellation, Stage},
    };

    #[test]
    fn gps_combinations() {
        let mut table = WavelengthTable::new(Default::default());
        let gps = table.wavelengths(Constellation::GPS, None);

        let wl = gps.wide_lane().unwrap();
        let nl = gps.narrow_lane().unwrap();
        assert!((wl - 0.861918400).abs() < 1.0E-6, "wl={}", wl);
        assert!((nl - 0.106953378).abs() < 1.0E-6, "nl={}", nl);
        assert_eq!(gps.stage(Stage::Wl), Some(wl));

        let ewl = gps.extra_wide_lane().unwrap();
        assert!((ewl - 5.861).abs() < 1.0E-3, "ewl={}", ewl);

        // no F4 for GPS
        assert!(gps.extra_wide_lane_24().is_none());

        let k = gps.if_wide_lane_coefficient().unwrap();
        assert!((k - 0.377482).abs() < 1.0E-5, "k={}", k);

        assert!(gps.band(Frequency::F1).unwrap() < gps.band(Frequency::F2).unwrap());
    }

    #[test]
    fn glonass_channels() {
        let mut table = WavelengthTable::new(Default::default());
        let k1 = table.wavelengths(Constellation::Glonass, Some(1));
        let k2 = table.wavelengths(Constellation::Glonass, Some(-4));
        assert_ne!(k1.band(Frequency::F1), k2.band(Frequency::F1));

        // cached
        let k1_bis = table.wavelengths(Constellation::Glonass, Some(1));
        assert_eq!(k1, k1_bis);
    }
}
