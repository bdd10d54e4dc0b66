use crate::{
    carrier::Frequency,
    prelude::{Duration, Epoch, SV},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Ambiguity subtype of a filter parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AmbiguityKind {
    /// F1/F2 ionosphere free ambiguity, in meters
    #[default]
    IonosphereFree,
    /// Uncombined ambiguity on this [Frequency] slot, in meters
    Raw(Frequency),
}

impl std::fmt::Display for AmbiguityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::IonosphereFree => write!(f, "IF"),
            Self::Raw(frequency) => write!(f, "{}", frequency),
        }
    }
}

/// Validity window of an ambiguity parameter (first and last epoch it was observed).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub start: Epoch,
    pub end: Epoch,
}

impl TimeWindow {
    pub fn new(start: Epoch, end: Epoch) -> Self {
        Self { start, end }
    }

    /// Window [Duration], null when inverted
    pub fn duration(&self) -> Duration {
        if self.end > self.start {
            self.end - self.start
        } else {
            Duration::ZERO
        }
    }

    /// Intersection of two windows
    pub fn intersection(&self, rhs: &Self) -> Self {
        let start = if self.start > rhs.start {
            self.start
        } else {
            rhs.start
        };
        let end = if self.end < rhs.end {
            self.end
        } else {
            rhs.end
        };
        Self { start, end }
    }

    /// Clips the end of this window to `t`
    pub fn clipped(&self, t: Epoch) -> Self {
        Self {
            start: self.start,
            end: if self.end > t { t } else { self.end },
        }
    }
}

/// Nature of a filter parameter
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// Carrier phase ambiguity of this [SV]
    Ambiguity {
        sv: SV,
        kind: AmbiguityKind,
        /// Frequency channel (Glonass FDMA only)
        channel: Option<i8>,
    },
    /// Any other parameter (position, clock, troposphere..)
    Other,
}

/// Parameter, as described by the positioning filter
#[derive(Debug, Clone, PartialEq)]
pub struct FilterParameter {
    /// Site (receiver) name
    pub site: String,
    /// [ParameterKind]
    pub kind: ParameterKind,
    /// Validity window
    pub window: TimeWindow,
    /// Current value (prior to increment)
    pub value: f64,
}

impl FilterParameter {
    /// Describes a new ambiguity parameter
    pub fn ambiguity(site: &str, sv: SV, kind: AmbiguityKind, window: TimeWindow, value: f64) -> Self {
        Self {
            site: site.to_string(),
            kind: ParameterKind::Ambiguity {
                sv,
                kind,
                channel: None,
            },
            window,
            value,
        }
    }

    /// Copies and returns with Glonass frequency channel
    pub fn with_channel(&self, channel: i8) -> Self {
        let mut s = self.clone();
        if let ParameterKind::Ambiguity { channel: ch, .. } = &mut s.kind {
            *ch = Some(channel);
        }
        s
    }

    /// Describes any other parameter
    pub fn other(site: &str, window: TimeWindow, value: f64) -> Self {
        Self {
            site: site.to_string(),
            kind: ParameterKind::Other,
            window,
            value,
        }
    }
}

/// Float ambiguity, extracted from the filter state
#[derive(Debug, Clone, PartialEq)]
pub struct FloatParameter {
    pub site: String,
    pub sv: SV,
    pub kind: AmbiguityKind,
    /// Frequency channel (Glonass FDMA only)
    pub channel: Option<i8>,
    pub window: TimeWindow,
    /// Index in the filter parameter vector
    pub index: usize,
    /// Value prior to this epoch increment
    pub value: f64,
    /// value + increment
    pub predicted: f64,
}

#[cfg(test)]
mod test {
    use super::TimeWindow;
    use crate::prelude::{Duration, Epoch};

    #[test]
    fn window_intersection() {
        let t0 = Epoch::from_gpst_seconds(1000.0);
        let w1 = TimeWindow::new(t0, t0 + Duration::from_seconds(3600.0));
        let w2 = TimeWindow::new(
            t0 + Duration::from_seconds(600.0),
            t0 + Duration::from_seconds(7200.0),
        );

        let inter = w1.intersection(&w2);
        assert_eq!(inter.duration(), Duration::from_seconds(3000.0));

        let clipped = inter.clipped(t0 + Duration::from_seconds(1200.0));
        assert_eq!(clipped.duration(), Duration::from_seconds(600.0));

        let disjoint = TimeWindow::new(t0, t0).intersection(&w2);
        assert_eq!(disjoint.duration(), Duration::ZERO);
    }
}
