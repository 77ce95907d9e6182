//! Activity models for gaseous phases.

use chemeq_core::{ActivityInput, ActivityModel, PhaseActivity, P_REF, RGAS};
use ndarray::Array1;
use std::fmt;

const Y_MIN: f64 = 1e-300;

/// Ideal gas fugacities: unit fugacity coefficients, so that the fugacity
/// of every species equals its partial pressure referenced to 1 bar,
/// $\ln a_i=\ln y_i+\ln(p/p^0)$. The molar volume is $RT/p$.
pub struct IdealGasActivity;

impl ActivityModel for IdealGasActivity {
    fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
        let y = input.mole_fractions();
        let ln_p = (input.pressure / P_REF).ln();
        let ln_a = y.mapv(|yi| yi.max(Y_MIN).ln() + ln_p);
        let n = input.amounts.len();
        PhaseActivity {
            ln_activity_coefficients: Array1::zeros(n),
            ln_activities: ln_a,
            ln_fugacity_coefficients: Some(Array1::zeros(n)),
            molar_volume: Some(RGAS * input.temperature / input.pressure),
        }
    }
}

impl fmt::Display for IdealGasActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdealGasActivity")
    }
}
