use std::collections::HashMap;

#[cfg(feature = "serde")]
use serde::Deserialize;

use crate::{
    carrier::{Carrier, Frequency},
    prelude::Constellation,
};

/// [BandPlan] assigns a [Carrier] to each [Frequency] slot, per [Constellation].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize))]
pub struct BandPlan {
    /// Carriers, by ascending [Frequency] slot
    pub inner: HashMap<Constellation, Vec<Carrier>>,
}

impl Default for BandPlan {
    fn default() -> Self {
        let mut inner = HashMap::with_capacity(5);
        inner.insert(Constellation::GPS, vec![Carrier::L1, Carrier::L2, Carrier::L5]);
        inner.insert(Constellation::QZSS, vec![Carrier::L1, Carrier::L2, Carrier::L5]);
        inner.insert(
            Constellation::Galileo,
            vec![
                Carrier::E1,
                Carrier::E5A,
                Carrier::E5B,
                Carrier::E5,
                Carrier::E6,
            ],
        );
        inner.insert(
            Constellation::BeiDou,
            vec![
                Carrier::B1I,
                Carrier::B3,
                Carrier::B2B,
                Carrier::B1C,
                Carrier::B2A,
            ],
        );
        inner.insert(
            Constellation::Glonass,
            vec![Carrier::G1, Carrier::G2, Carrier::G3],
        );
        Self { inner }
    }
}

impl BandPlan {
    /// Returns the [Carrier] assigned to this slot, if any.
    pub fn carrier(&self, constellation: Constellation, frequency: Frequency) -> Option<Carrier> {
        self.inner
            .get(&constellation)?
            .get(frequency.index())
            .copied()
    }

    /// Copies and updates the plan of a [Constellation]
    pub fn with_carriers(&self, constellation: Constellation, carriers: &[Carrier]) -> Self {
        let mut s = self.clone();
        s.inner.insert(constellation, carriers.to_vec());
        s
    }
}
