//! Activity models for ion exchange phases.

use chemeq_core::{ActivityInput, ActivityModel, PhaseActivity};
use ndarray::Array1;
use std::fmt;

const BETA_MIN: f64 = 1e-300;

/// Ideal ion exchange activities in the Gaines-Thomas convention:
/// the activity of every exchange species is its equivalent fraction
///
/// $$\beta_i=\frac{e_in_i}{\sum_je_jn_j}$$
///
/// where $e_i$ is the number of exchanger sites `X` in the formula.
/// Species without exchanger sites fall back to their mole fraction.
pub struct GainesThomasIdeal;

impl ActivityModel for GainesThomasIdeal {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        let equivalents: Vec<f64> = input
            .species
            .iter()
            .map(|s| s.element_coefficient("X"))
            .collect();
        let total: f64 = input
            .amounts
            .iter()
            .zip(&equivalents)
            .map(|(n, e)| n * e)
            .sum();

        let ln_a = if total < BETA_MIN {
            input.mole_fractions().mapv(|x| x.max(BETA_MIN).ln())
        } else {
            let x = input.mole_fractions();
            Array1::from_shape_fn(input.amounts.len(), |i| {
                if equivalents[i] > 0.0 {
                    (input.amounts[i] * equivalents[i] / total).max(BETA_MIN).ln()
                } else {
                    x[i].max(BETA_MIN).ln()
                }
            })
        };
        PhaseActivity::ideal(ln_a)
    }
}

impl fmt::Display for GainesThomasIdeal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GainesThomasIdeal")
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
    fn equivalent_fractions() {
        let sp = vec![
            Species::new(
                "NaX",
                &[("Na", 1.0), ("X", 1.0)],
                0.0,
                Arc::new(ConstantGibbsEnergy::new(0.0)),
            ),
            Species::new(
                "CaX2",
                &[("Ca", 1.0), ("X", 2.0)],
                0.0,
                Arc::new(ConstantGibbsEnergy::new(0.0)),
            ),
        ];
        let amounts = arr1(&[0.2, 0.4]);
        let input = ActivityInput {
            temperature: 298.15,
            pressure: 1.0e5,
            amounts: amounts.view(),
            species: &sp,
            kind: PhaseKind::IonExchange,
        };
        let result = GainesThomasIdeal.evaluate(&input);
        // equivalents: 0.2 and 0.8, total 1.0
        assert_relative_eq!(result.ln_activities[0].exp(), 0.2, max_relative = 1e-12);
        assert_relative_eq!(result.ln_activities[1].exp(), 0.8, max_relative = 1e-12);
    }
}
