//! Activity models for aqueous electrolyte phases.

use chemeq_core::{ActivityInput, ActivityModel, PhaseActivity};
use ndarray::Array1;
use std::fmt;

/// Molar mass of water in kg/mol.
pub(crate) const MW_WATER: f64 = 0.0180153;

/// Smallest amount used when taking logarithms of compositions.
const N_MIN: f64 = 1e-300;

/// Ideal aqueous activities: solutes on the molality scale referenced to
/// 1 mol/kg, the water solvent on the mole fraction scale.
///
/// This is the base model of every aqueous phase; non-ideal corrections
/// like [Davies] are chained on top of it.
pub struct IdealAqueous;

impl ActivityModel for IdealAqueous {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        let solvent = input.species.iter().position(|s| s.is_water());
        match solvent {
            Some(w) => {
                let kgw = (input.amounts[w] * MW_WATER).max(N_MIN);
                let total = input.total().max(N_MIN);
                let ln_a = Array1::from_shape_fn(input.amounts.len(), |i| {
                    if i == w {
                        (input.amounts[i] / total).max(N_MIN).ln()
                    } else {
                        (input.amounts[i] / kgw).max(N_MIN).ln()
                    }
                });
                PhaseActivity::ideal(ln_a)
            }
            // no solvent: degenerate to the mole fraction scale
            None => PhaseActivity::ideal(input.mole_fractions().mapv(|x| x.max(N_MIN).ln())),
        }
    }
}

impl fmt::Display for IdealAqueous {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdealAqueous")
    }
}

/// Debye-Hückel charging correction in the Davies form,
///
/// $$\log_{10}\gamma_i=-A(T)z_i^2\left(\frac{\sqrt I}{1+\sqrt I}-0.3I\right)$$
///
/// with the ionic strength $I$ in mol/kg. The Debye-Hückel slope uses a
/// linearized temperature dependence around 25 °C. Applicable up to ionic
/// strengths of roughly 0.5 mol/kg; chain it after [IdealAqueous].
pub struct Davies;

impl Davies {
    pub fn new() -> Self {
        Self
    }

    /// The Debye-Hückel slope $A$ at the given temperature.
    pub fn slope(temperature: f64) -> f64 {
        (0.5092 + (temperature - 298.15) * 8.5e-4).max(0.49)
    }
}

impl Default for Davies {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityModel for Davies {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        let solvent = input.species.iter().position(|s| s.is_water());
        let kgw = solvent
            .map(|w| (input.amounts[w] * MW_WATER).max(N_MIN))
            .unwrap_or(N_MIN);

        let mut strength = 0.0;
        for (i, s) in input.species.iter().enumerate() {
            strength += 0.5 * input.amounts[i] / kgw * s.charge() * s.charge();
        }

        let sqrt_i = strength.sqrt();
        let factor = sqrt_i / (1.0 + sqrt_i) - 0.3 * strength;
        let a = Self::slope(input.temperature) * std::f64::consts::LN_10;

        let mut result = PhaseActivity::ideal(Array1::zeros(input.amounts.len()));
        for (i, s) in input.species.iter().enumerate() {
            if Some(i) != solvent {
                result.ln_activity_coefficients[i] = -a * s.charge() * s.charge() * factor;
            }
        }
        result
    }
}

impl fmt::Display for Davies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Davies")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chemeq_core::{ConstantGibbsEnergy, PhaseKind, Species};
    use ndarray::arr1;
    use std::sync::Arc;

    fn species(name: &str, formula: &[(&str, f64)], charge: f64) -> Species {
        Species::new(name, formula, charge, Arc::new(ConstantGibbsEnergy::new(0.0)))
    }

    fn input<'a>(
        species: &'a [Species],
        amounts: &'a Array1<f64>,
        temperature: f64,
    ) -> ActivityInput<'a> {
        ActivityInput {
            temperature,
            pressure: 1.0e5,
            amounts: amounts.view(),
            species,
            kind: PhaseKind::Aqueous,
        }
    }

    #[test]
    fn molality_scale() {
        let sp = vec![
            species("H2O", &[("H", 2.0), ("O", 1.0)], 0.0),
            species("Na+", &[("Na", 1.0)], 1.0),
        ];
        let n_w = 1.0 / MW_WATER; // 1 kg of water
        let amounts = arr1(&[n_w, 0.25]);
        let result = IdealAqueous.evaluate(&input(&sp, &amounts, 298.15));
        assert_relative_eq!(result.ln_activities[1], 0.25f64.ln(), max_relative = 1e-12);
        // solvent close to unit activity in a dilute solution
        assert!(result.ln_activities[0].abs() < 0.01);
    }

    #[test]
    fn davies_limits() {
        let sp = vec![
            species("H2O", &[("H", 2.0), ("O", 1.0)], 0.0),
            species("Na+", &[("Na", 1.0)], 1.0),
            species("Cl-", &[("Cl", 1.0)], -1.0),
            species("Ca+2", &[("Ca", 1.0)], 2.0),
        ];
        // pure water: no ionic strength, no correction
        let amounts = arr1(&[1.0 / MW_WATER, 0.0, 0.0, 0.0]);
        let result = Davies.evaluate(&input(&sp, &amounts, 298.15));
        assert_relative_eq!(result.ln_activity_coefficients[1], 0.0);

        // I = 0.1 mol/kg from a 1:1 salt
        let amounts = arr1(&[1.0 / MW_WATER, 0.1, 0.1, 0.0]);
        let result = Davies.evaluate(&input(&sp, &amounts, 298.15));
        let factor: f64 = 0.1f64.sqrt() / (1.0 + 0.1f64.sqrt()) - 0.03;
        let expected = -0.5092 * std::f64::consts::LN_10 * factor;
        assert_relative_eq!(
            result.ln_activity_coefficients[1],
            expected,
            max_relative = 1e-10
        );
        // a divalent ion is four times more affected
        assert_relative_eq!(
            result.ln_activity_coefficients[3],
            4.0 * expected,
            max_relative = 1e-10
        );
        // the solvent is left alone
        assert_relative_eq!(result.ln_activity_coefficients[0], 0.0);
    }

    #[test]
    fn slope_grows_with_temperature() {
        assert!(Davies::slope(350.0) > Davies::slope(298.15));
    }
}
