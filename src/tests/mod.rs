
pub use filter::TestFilter;

use log::LevelFilter;
use std::{cell::RefCell, io::Write, rc::Rc, sync::Once};

use crate::{
    mw::MwAccumulator,
    parameter::{AmbiguityKind, FilterParameter, TimeWindow},
    prelude::{Constellation, Duration, Epoch, Stage, SV},
    upd::{UpdRecord, UpdSet, UpdTable},
    wavelength::WavelengthTable,
};

static INIT: Once = Once::new();

pub fn init_logger() {
    INIT.call_once(|| {
        env_logger::builder()
            .is_test(true)
            .filter_level(LevelFilter::Debug)
            .init();
    });
}

/// In memory diagnostic stream, readable after being handed to an engine
#[derive(Clone, Default)]
pub struct SharedStream(Rc<RefCell<Vec<u8>>>);

impl SharedStream {
    /// Content written so far
    pub fn content(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

impl Write for SharedStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Reference epoch of all scenarios
pub fn reference_epoch() -> Epoch {
    Epoch::from_gpst_seconds(1_000_000.0)
}

pub const SITE: &str = "ALGO";

/// Formal variance of the float ambiguities (m²)
pub const AMBIGUITY_VARIANCE_M2: f64 = 9.0E-6;

/// One tracked satellite of the ionosphere free scenario
#[derive(Debug, Clone, Copy)]
pub struct TrackedSatellite {
    pub sv: SV,
    /// Wide lane integer
    pub n_wl: i64,
    /// F1 integer
    pub n_1: i64,
    /// Wide lane UPD (cycles)
    pub upd_wl: f64,
    /// Narrow lane UPD (cycles)
    pub upd_nl: f64,
    /// Float error (m)
    pub error: f64,
}

impl TrackedSatellite {
    pub fn new(prn: u8, n_wl: i64, n_1: i64, upd_wl: f64, upd_nl: f64, error: f64) -> Self {
        Self {
            sv: SV::new(Constellation::GPS, prn),
            n_wl,
            n_1,
            upd_wl,
            upd_nl,
            error,
        }
    }
}

pub fn gps_satellites() -> Vec<TrackedSatellite> {
    vec![
        TrackedSatellite::new(2, 12, 100, 0.12, 0.21, 0.002),
        TrackedSatellite::new(5, -3, -40, -0.31, -0.05, -0.001),
        TrackedSatellite::new(9, 7, 33, 0.05, 0.31, 0.0),
        TrackedSatellite::new(15, 20, 7, 0.44, 0.0, 0.001),
        TrackedSatellite::new(21, 5, 58, -0.18, -0.22, -0.002),
    ]
}

/// Four MW samples per satellite, 30s apart and up to the reference epoch.
/// Averages are exactly N(wl) + UPD(wl).
pub fn mw_averages(satellites: &[TrackedSatellite]) -> MwAccumulator {
    let t0 = reference_epoch();
    let dt = Duration::from_seconds(30.0);

    let mut mw = MwAccumulator::new(Duration::from_seconds(60.0), 2.0);

    for i in 0..4 {
        let noise = if i % 2 == 0 { 0.01 } else { -0.01 };
        for sat in satellites.iter() {
            let value = sat.n_wl as f64 + sat.upd_wl + noise;
            mw.push(t0 - dt * (3 - i) as f64, sat.sv, Stage::Wl, value);
        }
    }

    mw
}

/// Ionosphere free scenario: filter, MW averages and UPD products
pub struct IonosphereFreeScenario {
    pub filter: TestFilter,
    pub mw: MwAccumulator,
    pub upd: UpdTable,
    pub narrow_lane: f64,
    pub wl_coefficient: f64,
}

impl IonosphereFreeScenario {
    pub fn new(satellites: &[TrackedSatellite]) -> Self {
        let t0 = reference_epoch();

        let gps = WavelengthTable::new(Default::default()).wavelengths(Constellation::GPS, None);

        let narrow_lane = gps.narrow_lane().unwrap();
        let wl_coefficient = gps.if_wide_lane_coefficient().unwrap();

        let window = TimeWindow::new(
            t0 - Duration::from_seconds(3600.0),
            t0 + Duration::from_seconds(3600.0),
        );

        // one clock parameter, then one ambiguity per satellite
        let mut parameters = vec![FilterParameter::other(SITE, window, 12.5)];

        for sat in satellites.iter() {
            let b_if = narrow_lane * (sat.n_1 as f64 + sat.upd_nl)
                + wl_coefficient * sat.n_wl as f64
                + sat.error;

            parameters.push(FilterParameter::ambiguity(
                SITE,
                sat.sv,
                AmbiguityKind::IonosphereFree,
                window,
                b_if,
            ));
        }

        let filter = TestFilter::new(parameters, AMBIGUITY_VARIANCE_M2);

        let mw = mw_averages(satellites);

        let mut wl_set = UpdSet::new(t0 - Duration::from_seconds(3600.0));
        let mut nl_set = UpdSet::new(t0);

        for sat in satellites.iter() {
            wl_set = wl_set.with_record(sat.sv, UpdRecord::new(sat.upd_wl, 0.05, 10));
            nl_set = nl_set.with_record(sat.sv, UpdRecord::new(sat.upd_nl, 0.01, 10));
        }

        let mut upd = UpdTable::default()
            .with_interval(Stage::Wl, Duration::from_days(1.0))
            .with_interval(Stage::Nl, Duration::from_seconds(30.0));

        upd.insert(Stage::Wl, wl_set);
        upd.insert(Stage::Nl, nl_set);

        Self {
            filter,
            mw,
            upd,
            narrow_lane,
            wl_coefficient,
        }
    }

    /// Expected double difference (m) of these two satellites
    pub fn expected(&self, lhs: &TrackedSatellite, rhs: &TrackedSatellite) -> f64 {
        self.narrow_lane * ((lhs.n_1 - rhs.n_1) as f64 + lhs.upd_nl - rhs.upd_nl)
            + self.wl_coefficient * (lhs.n_wl - rhs.n_wl) as f64
    }
}
