//! Standard thermodynamic property models.
//!
//! A standard model maps temperature and pressure to the standard molar
//! Gibbs energy of one species. Models are evaluated with generalized dual
//! numbers, so that standard entropies, enthalpies and molar volumes are
//! obtained from the same implementation by automatic differentiation.

use crate::errors::{ChemeqError, ChemeqResult};
use crate::{P_REF, T_REF};
use num_dual::{Dual64, DualNum};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Standard molar Gibbs energy that can be evaluated using
/// generalized dual numbers.
///
/// This trait needs to be implemented generically or for the specific
/// types in the supertraits of [StandardThermoModel] so that the
/// implementor can be used as a standard property model of a species.
pub trait StandardThermoModelDual<D: DualNum<f64> + Copy> {
    /// The standard molar Gibbs energy in J/mol.
    fn standard_gibbs_energy(&self, temperature: D, pressure: D) -> D;
}

/// Object safe version of the [StandardThermoModelDual] trait.
///
/// The trait is implemented automatically for every struct that implements
/// the supertraits.
pub trait StandardThermoModel:
    StandardThermoModelDual<f64> + StandardThermoModelDual<Dual64> + fmt::Display + Send + Sync
{
}

impl<T> StandardThermoModel for T where
    T: StandardThermoModelDual<f64>
        + StandardThermoModelDual<Dual64>
        + fmt::Display
        + Send
        + Sync
{
}

/// Standard properties derived from a [StandardThermoModel] by automatic
/// differentiation.
#[derive(Clone, Copy, Debug)]
pub struct StandardProps {
    /// Standard molar Gibbs energy in J/mol.
    pub gibbs_energy: f64,
    /// Standard molar enthalpy in J/mol.
    pub enthalpy: f64,
    /// Standard molar entropy in J/(mol K).
    pub entropy: f64,
    /// Standard molar volume in m³/mol.
    pub molar_volume: f64,
}

/// Evaluate the derived standard properties of a model at the given
/// temperature (K) and pressure (Pa).
pub fn standard_props(model: &dyn StandardThermoModel, temperature: f64, pressure: f64) -> StandardProps {
    let gt = model.standard_gibbs_energy(
        Dual64::from(temperature).derivative(),
        Dual64::from(pressure),
    );
    let gp = model.standard_gibbs_energy(
        Dual64::from(temperature),
        Dual64::from(pressure).derivative(),
    );
    let entropy = -gt.eps;
    StandardProps {
        gibbs_energy: gt.re,
        enthalpy: gt.re + temperature * entropy,
        entropy,
        molar_volume: gp.eps,
    }
}

/// A temperature and pressure independent standard Gibbs energy.
#[derive(Debug, Clone)]
pub struct ConstantGibbsEnergy {
    g0: f64,
}

impl ConstantGibbsEnergy {
    /// Create a model from the standard Gibbs energy in J/mol.
    pub fn new(g0: f64) -> Self {
        Self { g0 }
    }
}

impl<D: DualNum<f64> + Copy> StandardThermoModelDual<D> for ConstantGibbsEnergy {
    fn standard_gibbs_energy(&self, _temperature: D, _pressure: D) -> D {
        D::from(self.g0)
    }
}

impl fmt::Display for ConstantGibbsEnergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConstantGibbsEnergy(g0={})", self.g0)
    }
}

/// Standard Gibbs energy from reference state properties.
///
/// $$G^0(T,p)=g_0-s_0(T-T_0)-c_{p,0}\left(T\ln\frac{T}{T_0}-(T-T_0)\right)+v_0(p-p_0)$$
///
/// with the reference conditions $T_0=298.15\\,\text{K}$ and
/// $p_0=10^5\\,\text{Pa}$. The heat capacity and volume terms default to
/// zero for species for which only $g_0$ and $s_0$ are tabulated.
#[derive(Debug, Clone)]
pub struct ReferenceThermoModel {
    g0: f64,
    s0: f64,
    cp0: f64,
    v0: f64,
}

impl ReferenceThermoModel {
    /// Create a model from the standard Gibbs energy (J/mol), entropy
    /// (J/(mol K)), isobaric heat capacity (J/(mol K)) and molar volume
    /// (m³/mol) at reference conditions.
    pub fn new(g0: f64, s0: f64, cp0: f64, v0: f64) -> Self {
        Self { g0, s0, cp0, v0 }
    }
}

impl<D: DualNum<f64> + Copy> StandardThermoModelDual<D> for ReferenceThermoModel {
    fn standard_gibbs_energy(&self, temperature: D, pressure: D) -> D {
        let t = temperature;
        let dt = t - T_REF;
        ((t / T_REF).ln() * t - dt) * (-self.cp0) - dt * self.s0
            + (pressure - P_REF) * self.v0
            + self.g0
    }
}

impl fmt::Display for ReferenceThermoModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ReferenceThermoModel(g0={}, s0={}, cp0={}, v0={})",
            self.g0, self.s0, self.cp0, self.v0
        )
    }
}

/// Standard Gibbs energy interpolated linearly in temperature between
/// tabulated nodes. Pressure independent.
#[derive(Debug, Clone)]
pub struct InterpolatedGibbsEnergy {
    temperatures: Vec<f64>,
    gibbs_energies: Vec<f64>,
}

impl InterpolatedGibbsEnergy {
    /// Create a model from tabulated temperatures (K, strictly increasing)
    /// and Gibbs energies (J/mol).
    pub fn new(temperatures: Vec<f64>, gibbs_energies: Vec<f64>) -> ChemeqResult<Self> {
        if temperatures.len() < 2 || temperatures.len() != gibbs_energies.len() {
            return Err(ChemeqError::Error(
                "interpolated model requires at least two (T, G) nodes".into(),
            ));
        }
        if temperatures.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ChemeqError::Error(
                "interpolation temperatures must be strictly increasing".into(),
            ));
        }
        Ok(Self {
            temperatures,
            gibbs_energies,
        })
    }
}

impl<D: DualNum<f64> + Copy> StandardThermoModelDual<D> for InterpolatedGibbsEnergy {
    fn standard_gibbs_energy(&self, temperature: D, _pressure: D) -> D {
        let t = temperature.re();
        // extrapolate with the boundary segments
        let i = match self.temperatures.iter().position(|&ti| ti > t) {
            Some(0) | None => {
                if t < self.temperatures[0] {
                    0
                } else {
                    self.temperatures.len() - 2
                }
            }
            Some(i) => i - 1,
        };
        let i = i.min(self.temperatures.len() - 2);
        let slope = (self.gibbs_energies[i + 1] - self.gibbs_energies[i])
            / (self.temperatures[i + 1] - self.temperatures[i]);
        (temperature - self.temperatures[i]) * slope + self.gibbs_energies[i]
    }
}

impl fmt::Display for InterpolatedGibbsEnergy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InterpolatedGibbsEnergy({} nodes)",
            self.temperatures.len()
        )
    }
}

/// Serializable description of a standard thermodynamic model.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum ThermoRecord {
    /// Constant standard Gibbs energy (J/mol).
    Constant { g0: f64 },
    /// Reference state properties, see [ReferenceThermoModel].
    Reference {
        g0: f64,
        s0: f64,
        #[serde(default)]
        cp0: f64,
        #[serde(default)]
        v0: f64,
    },
    /// Tabulated Gibbs energies, see [InterpolatedGibbsEnergy].
    Interpolated {
        temperatures: Vec<f64>,
        gibbs_energies: Vec<f64>,
    },
}

impl ThermoRecord {
    /// Build the corresponding standard property model.
    pub fn build(&self) -> ChemeqResult<Arc<dyn StandardThermoModel>> {
        Ok(match self {
            Self::Constant { g0 } => Arc::new(ConstantGibbsEnergy::new(*g0)),
            Self::Reference { g0, s0, cp0, v0 } => {
                Arc::new(ReferenceThermoModel::new(*g0, *s0, *cp0, *v0))
            }
            Self::Interpolated {
                temperatures,
                gibbs_energies,
            } => Arc::new(InterpolatedGibbsEnergy::new(
                temperatures.clone(),
                gibbs_energies.clone(),
            )?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn reference_model_derivatives() {
        let model = ReferenceThermoModel::new(-237.14e3, 69.95, 75.3, 1.807e-5);
        let props = standard_props(&model, 298.15, 1.0e5);
        assert_relative_eq!(props.gibbs_energy, -237.14e3, max_relative = 1e-12);
        assert_relative_eq!(props.entropy, 69.95, max_relative = 1e-12);
        assert_relative_eq!(props.molar_volume, 1.807e-5, max_relative = 1e-12);
        assert_relative_eq!(
            props.enthalpy,
            -237.14e3 + 298.15 * 69.95,
            max_relative = 1e-12
        );

        // entropy picks up the heat capacity term away from T0
        let props = standard_props(&model, 350.0, 1.0e5);
        assert_relative_eq!(
            props.entropy,
            69.95 + 75.3 * (350.0f64 / 298.15).ln(),
            max_relative = 1e-12
        );
    }

    #[test]
    fn pressure_slope() {
        let model = ReferenceThermoModel::new(-1.0e3, 0.0, 0.0, 2.0e-5);
        let g1: f64 = model.standard_gibbs_energy(298.15, 1.0e5);
        let g2: f64 = model.standard_gibbs_energy(298.15, 2.0e5);
        assert_relative_eq!(g2 - g1, 2.0e-5 * 1.0e5, max_relative = 1e-12);
    }

    #[test]
    fn interpolated_model() {
        let model =
            InterpolatedGibbsEnergy::new(vec![273.15, 298.15, 373.15], vec![-1.0, -2.0, -5.0])
                .unwrap();
        let g: f64 = model.standard_gibbs_energy(298.15, 1.0e5);
        assert_relative_eq!(g, -2.0, max_relative = 1e-12);
        let g: f64 = model.standard_gibbs_energy(335.65, 1.0e5);
        assert_relative_eq!(g, -3.5, max_relative = 1e-12);
        // linear extrapolation beyond the last node
        let g: f64 = model.standard_gibbs_energy(398.15, 1.0e5);
        assert_relative_eq!(g, -6.0, max_relative = 1e-12);
    }

    #[test]
    fn invalid_nodes() {
        assert!(InterpolatedGibbsEnergy::new(vec![298.15], vec![-1.0]).is_err());
        assert!(InterpolatedGibbsEnergy::new(vec![300.0, 300.0], vec![-1.0, -2.0]).is_err());
    }

    #[test]
    fn record_roundtrip() {
        let json = r#"{"model": "reference", "g0": -237140.0, "s0": 69.95}"#;
        let record: ThermoRecord = serde_json::from_str(json).unwrap();
        let model = record.build().unwrap();
        let props = standard_props(model.as_ref(), 298.15, 1.0e5);
        assert_relative_eq!(props.gibbs_energy, -237140.0, max_relative = 1e-12);
        assert_relative_eq!(props.molar_volume, 0.0);
    }
}
