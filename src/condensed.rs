//! Activity models for condensed phases: pure minerals and liquids, and
//! ideal solid or liquid solutions.

use chemeq_core::{ActivityInput, ActivityModel, PhaseActivity};
use ndarray::Array1;
use std::fmt;

const X_MIN: f64 = 1e-300;

/// Unit activities for pure condensed phases (one mineral or one pure
/// liquid per phase). The molar volume comes from the standard property
/// models of the species.
pub struct UnitActivity;

impl ActivityModel for UnitActivity {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        PhaseActivity::ideal(Array1::zeros(input.amounts.len()))
    }
}

impl fmt::Display for UnitActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UnitActivity")
    }
}

/// Ideal mixing on the mole fraction scale, for solid solutions and
/// non-aqueous liquid mixtures.
pub struct IdealSolution;

impl ActivityModel for IdealSolution {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        PhaseActivity::ideal(input.mole_fractions().mapv(|x| x.max(X_MIN).ln()))
    }
}

impl fmt::Display for IdealSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdealSolution")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chemeq_core::{ConstantGibbsEnergy, PhaseKind, Species};
    use ndarray::arr1;
    use std::sync::Arc;

    #[test]
    fn unit_and_ideal() {
        let sp = vec![
            Species::new(
                "Calcite",
                &[("Ca", 1.0), ("C", 1.0), ("O", 3.0)],
                0.0,
                Arc::new(ConstantGibbsEnergy::new(0.0)),
            ),
            Species::new(
                "Magnesite",
                &[("Mg", 1.0), ("C", 1.0), ("O", 3.0)],
                0.0,
                Arc::new(ConstantGibbsEnergy::new(0.0)),
            ),
        ];
        let amounts = arr1(&[1.0, 3.0]);
        let input = ActivityInput {
            temperature: 298.15,
            pressure: 1.0e5,
            amounts: amounts.view(),
            species: &sp,
            kind: PhaseKind::SolidSolution,
        };
        let result = UnitActivity.evaluate(&input);
        assert_relative_eq!(result.ln_activities[0], 0.0);

        let result = IdealSolution.evaluate(&input);
        assert_relative_eq!(result.ln_activities[1], 0.75f64.ln());
    }
}
