use log::{debug, error};

use crate::{
    double_diff::DoubleDifference,
    error::Error,
    filter::{ConstraintEquation, PositioningFilter},
    prelude::{Epoch, Stage},
};

/// [ConstraintInjector] converts fixed [DoubleDifference]s
/// into virtual observations of the [PositioningFilter].
pub struct ConstraintInjector;

impl ConstraintInjector {
    /// [ConstraintEquation] of this fixed [DoubleDifference]:
    /// Σ terms·x = λ (N + upd) + offset.
    /// Returns None when not fixed, or not related to filter parameters.
    pub fn equation(stage: Stage, dd: &DoubleDifference) -> Option<ConstraintEquation> {
        let combination = dd.combination.as_ref()?;
        let fixed = combination.fixed?;

        if combination.terms.is_empty() {
            return None;
        }

        Some(ConstraintEquation {
            terms: combination.terms.clone(),
            value: combination.wavelength * (fixed as f64 + combination.upd) + combination.offset,
            weight: stage.constraint_weight(),
        })
    }

    /// Applies all fixed [DoubleDifference]s to the [PositioningFilter],
    /// in a single update. Returns the number of applied equations.
    pub fn apply<F: PositioningFilter + ?Sized>(
        t: Epoch,
        stage: Stage,
        filter: &mut F,
        dds: &[DoubleDifference],
    ) -> Result<usize, Error> {
        let equations = dds
            .iter()
            .filter_map(|dd| Self::equation(stage, dd))
            .collect::<Vec<_>>();

        if equations.is_empty() {
            debug!("{}({}) - no constraint to apply", t, stage);
            return Ok(0);
        }

        filter.reset_virtual_observations();

        for equation in equations.iter() {
            filter.add_virtual_observation(equation);
        }

        filter.update().map_err(|e| {
            error!("{}({}) - constraint update failure: {}", t, stage, e);
            Error::ConstraintApply(e.to_string())
        })?;

        debug!("{}({}) - applied {} constraints", t, stage, equations.len());
        Ok(equations.len())
    }
}

#[cfg(test)]
mod test {
    use super::ConstraintInjector;
    use crate::{
        constants::{NARROW_LANE_WEIGHT, WIDE_LANE_WEIGHT},
        double_diff::{Combination, DoubleDifference, SatPair},
        parameter::{AmbiguityKind, TimeWindow},
        prelude::{Constellation, Epoch, Stage, SV},
    };

    fn dd(combination: Option<Combination>) -> DoubleDifference {
        let t = Epoch::from_gpst_seconds(0.0);
        DoubleDifference {
            combination,
            pair: SatPair::new(
                "ALGO",
                SV::new(Constellation::GPS, 1),
                SV::new(Constellation::GPS, 2),
            ),
            constellation: Constellation::GPS,
            kind: AmbiguityKind::IonosphereFree,
            channels: (None, None),
            indexes: (3, 4),
            window: TimeWindow::new(t, t),
            factors: (1.0, 1.0),
            raw: 0.0,
            raw_sigma: None,
        }
    }

    #[test]
    fn narrow_lane_equation() {
        let dd = dd(Some(Combination {
            terms: vec![(3, 1.0), (4, -1.0)],
            offset: 1.5,
            wavelength: 0.1,
            float: 12.04,
            sigma: 0.01,
            upd: 0.25,
            fixed: Some(12),
        }));

        let equation = ConstraintInjector::equation(Stage::Nl, &dd).unwrap();
        assert_eq!(equation.terms, vec![(3, 1.0), (4, -1.0)]);
        assert_eq!(equation.weight, NARROW_LANE_WEIGHT);
        assert!((equation.value - (0.1 * 12.25 + 1.5)).abs() < 1.0E-12);
    }

    #[test]
    fn no_equation() {
        // not fixed
        let unfixed = dd(Some(Combination {
            terms: vec![(3, 1.0), (4, -1.0)],
            wavelength: 0.1,
            ..Default::default()
        }));
        assert!(ConstraintInjector::equation(Stage::Nl, &unfixed).is_none());

        // MW wide lane: no filter parameter involved
        let mw = dd(Some(Combination {
            wavelength: 0.86,
            fixed: Some(3),
            ..Default::default()
        }));
        assert!(ConstraintInjector::equation(Stage::Wl, &mw).is_none());

        assert!(ConstraintInjector::equation(Stage::Wl, &dd(None)).is_none());

        let raw = dd(Some(Combination {
            terms: vec![(0, 5.2), (1, -5.2), (2, -4.0), (3, 4.0)],
            wavelength: 1.0,
            fixed: Some(-2),
            ..Default::default()
        }));

        let equation = ConstraintInjector::equation(Stage::Wl, &raw).unwrap();
        assert_eq!(equation.terms.len(), 4);
        assert_eq!(equation.value, -2.0);
        assert_eq!(equation.weight, WIDE_LANE_WEIGHT);
    }
}
