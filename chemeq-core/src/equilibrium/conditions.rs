use super::specs::EquilibriumSpecs;
use crate::errors::{ChemeqError, ChemeqResult};
use crate::state::ChemicalState;
use quantity::{MolarEnergy, Pressure, Temperature, JOULE, KELVIN, MOL, PASCAL};

/// Numeric values for the inputs declared by an [EquilibriumSpecs], plus
/// optional bounds for unknown temperature and pressure.
///
/// One conditions object pairs with one specs object; it is re-set between
/// the points of a parameter sweep while the specs (and the solver built
/// from them) are reused.
pub struct EquilibriumConditions {
    input_names: Vec<String>,
    values: Vec<Option<f64>>,
    lower_temperature: Option<f64>,
    upper_temperature: Option<f64>,
    lower_pressure: Option<f64>,
    upper_pressure: Option<f64>,
}

impl EquilibriumConditions {
    pub fn new(specs: &EquilibriumSpecs) -> Self {
        let input_names: Vec<String> = specs.inputs().map(|s| s.to_string()).collect();
        let values = vec![None; input_names.len()];
        Self {
            input_names,
            values,
            lower_temperature: None,
            upper_temperature: None,
            lower_pressure: None,
            upper_pressure: None,
        }
    }

    /// Set a named input to a raw scalar value. Temperature and pressure
    /// inputs are in K and Pa, fugacities in Pa, chemical potentials in
    /// J/mol; user declared inputs carry whatever unit their constraint
    /// equations assume.
    pub fn set(&mut self, name: &str, value: f64) -> ChemeqResult<()> {
        let i = self
            .input_names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| ChemeqError::Error(format!("input `{name}` is not declared")))?;
        if !value.is_finite() {
            return Err(ChemeqError::InvalidInput(
                "EquilibriumConditions".into(),
                name.into(),
                value,
            ));
        }
        self.values[i] = Some(value);
        Ok(())
    }

    pub fn temperature(&mut self, temperature: Temperature) -> ChemeqResult<()> {
        self.set("T", (temperature / KELVIN).into_value())
    }

    pub fn pressure(&mut self, pressure: Pressure) -> ChemeqResult<()> {
        self.set("P", (pressure / PASCAL).into_value())
    }

    /// Set the fugacity target of the species previously declared with
    /// [EquilibriumSpecs::fugacity].
    pub fn fugacity(&mut self, species: &str, fugacity: Pressure) -> ChemeqResult<()> {
        self.set(&format!("f[{species}]"), (fugacity / PASCAL).into_value())
    }

    pub fn ph(&mut self, ph: f64) -> ChemeqResult<()> {
        self.set("pH", ph)
    }

    /// Set the chemical potential target of the species previously declared
    /// with [EquilibriumSpecs::chemical_potential].
    pub fn chemical_potential(
        &mut self,
        species: &str,
        potential: MolarEnergy,
    ) -> ChemeqResult<()> {
        self.set(
            &format!("u[{species}]"),
            (potential / (JOULE / MOL)).into_value(),
        )
    }

    pub fn set_lower_bound_temperature(&mut self, temperature: Temperature) {
        self.lower_temperature = Some((temperature / KELVIN).into_value());
    }

    pub fn set_upper_bound_temperature(&mut self, temperature: Temperature) {
        self.upper_temperature = Some((temperature / KELVIN).into_value());
    }

    pub fn set_lower_bound_pressure(&mut self, pressure: Pressure) {
        self.lower_pressure = Some((pressure / PASCAL).into_value());
    }

    pub fn set_upper_bound_pressure(&mut self, pressure: Pressure) {
        self.upper_pressure = Some((pressure / PASCAL).into_value());
    }

    pub(crate) fn temperature_bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.lower_temperature, self.upper_temperature)
    }

    pub(crate) fn pressure_bounds(&self) -> (Option<f64>, Option<f64>) {
        (self.lower_pressure, self.upper_pressure)
    }

    /// Check that the conditions were built for the given specs.
    pub(crate) fn matches(&self, specs: &EquilibriumSpecs) -> ChemeqResult<()> {
        if self.input_names.len() != specs.input_count()
            || !specs.inputs().zip(&self.input_names).all(|(a, b)| a == b)
        {
            return Err(ChemeqError::Error(
                "the conditions were built for a different specs object".to_string(),
            ));
        }
        Ok(())
    }

    /// Reject contradictory bound declarations before any iteration.
    pub(crate) fn validate_bounds(&self) -> ChemeqResult<()> {
        if let (Some(lb), Some(ub)) = (self.lower_temperature, self.upper_temperature) {
            if lb > ub {
                return Err(ChemeqError::Infeasible(format!(
                    "temperature bounds [{lb}, {ub}] K are contradictory"
                )));
            }
        }
        if let (Some(lb), Some(ub)) = (self.lower_pressure, self.upper_pressure) {
            if lb > ub {
                return Err(ChemeqError::Infeasible(format!(
                    "pressure bounds [{lb}, {ub}] Pa are contradictory"
                )));
            }
        }
        Ok(())
    }

    /// Resolve the full input vector. Temperature and pressure inputs fall
    /// back to the values of the state if unset; every other input must
    /// have been given a value.
    pub(crate) fn input_vector(&self, state: &ChemicalState) -> ChemeqResult<Vec<f64>> {
        self.input_names
            .iter()
            .zip(&self.values)
            .map(|(name, value)| match (value, name.as_str()) {
                (Some(v), _) => Ok(*v),
                (None, "T") => Ok((state.temperature() / KELVIN).into_value()),
                (None, "P") => Ok((state.pressure() / PASCAL).into_value()),
                (None, _) => Err(ChemeqError::UndeterminedProblem(format!(
                    "no value set for input `{name}`"
                ))),
            })
            .collect()
    }
}
