use anise::constants::SPEED_OF_LIGHT_KM_S;

/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = SPEED_OF_LIGHT_KM_S * 1000.0;

/// GLONASS G1 FDMA base frequency (Hz)
pub const GLONASS_G1_BASE_HZ: f64 = 1602.0E6;

/// GLONASS G1 FDMA channel spacing (Hz)
pub const GLONASS_G1_SPACING_HZ: f64 = 0.5625E6;

/// GLONASS G2 FDMA base frequency (Hz)
pub const GLONASS_G2_BASE_HZ: f64 = 1246.0E6;

/// GLONASS G2 FDMA channel spacing (Hz)
pub const GLONASS_G2_SPACING_HZ: f64 = 0.4375E6;

/// Maximal ratio reported by the integer search
pub const MAX_RATIO: f64 = 99.0;

/// Residual norm below which an incidence vector is considered
/// to lie in the span of the current basis
pub const INDEPENDENCE_TOLERANCE: f64 = 1.0E-8;

/// Virtual observation weight, narrow lane constraints
pub const NARROW_LANE_WEIGHT: f64 = 1.0E9;

/// Virtual observation weight, wide lane constraints
pub const WIDE_LANE_WEIGHT: f64 = 1.0E6;

/// Virtual observation weight, extra wide lane constraints
pub const EXTRA_WIDE_LANE_WEIGHT: f64 = 1.0E4;

/// UPD acceptance for wide and extra wide lane classes: (max sigma, min points exclusive)
pub const WIDE_LANE_UPD_ACCEPTANCE: (f64, u32) = (0.2, 2);

/// UPD acceptance for the narrow lane: (max sigma, min points exclusive)
pub const NARROW_LANE_UPD_ACCEPTANCE: (f64, u32) = (0.1, 3);

/// Deviation bounds are widened by this factor for well tracked satellites
pub const RELAXED_DEVIATION_FACTOR: f64 = 1.1;

/// Fix epochs in current stage required to widen the deviation bounds
pub const RELAXED_MIN_FIXES: u32 = 20;

/// Continuous lock (epochs) required to widen the deviation bounds
pub const RELAXED_MIN_LOCK_EPOCHS: f64 = 200.0;

/// Fix epochs below which an ambiguity is a removal candidate in partial fixing
pub const PARTIAL_MIN_FIX_EPOCHS: u32 = 5;
