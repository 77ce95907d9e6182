use crate::errors::{ChemeqError, ChemeqResult};
use crate::system::ChemicalSystem;
use ndarray::{Array1, ArrayView1};
use quantity::{Mass, Moles, Pressure, Temperature, KELVIN, KILOGRAM, MOL, PASCAL};
use std::fmt;
use std::sync::Arc;

/// Temperature, pressure and species amounts of a chemical system at one
/// instant.
///
/// A state is created against a shared [ChemicalSystem] with zero amounts,
/// mutated through the `set_*` operations before a calculation, and
/// overwritten by the equilibrium solver afterwards. Reusing a converged
/// state as the initial guess of the next calculation (warm start) is the
/// intended pattern for parameter sweeps; clone the state instead if the
/// previous solution must be preserved.
///
/// All setters take unit-typed quantities; internally amounts are stored in
/// mol, temperature in K and pressure in Pa.
#[derive(Clone)]
pub struct ChemicalState {
    system: Arc<ChemicalSystem>,
    temperature: f64,
    pressure: f64,
    amounts: Array1<f64>,
    element_multipliers: Array1<f64>,
    species_multipliers: Array1<f64>,
}

impl ChemicalState {
    /// A new state at 25 °C, 1 bar and zero amounts.
    pub fn new(system: &Arc<ChemicalSystem>) -> Self {
        Self {
            system: system.clone(),
            temperature: 298.15,
            pressure: 1.0e5,
            amounts: Array1::zeros(system.species_count()),
            element_multipliers: Array1::zeros(system.balance_count()),
            species_multipliers: Array1::zeros(system.species_count()),
        }
    }

    pub fn system(&self) -> &Arc<ChemicalSystem> {
        &self.system
    }

    pub fn set_temperature(&mut self, temperature: Temperature) -> ChemeqResult<()> {
        let t = (temperature / KELVIN).into_value();
        if !t.is_finite() || t <= 0.0 {
            return Err(ChemeqError::InvalidInput(
                "ChemicalState".into(),
                "temperature".into(),
                t,
            ));
        }
        self.temperature = t;
        Ok(())
    }

    pub fn set_pressure(&mut self, pressure: Pressure) -> ChemeqResult<()> {
        let p = (pressure / PASCAL).into_value();
        if !p.is_finite() || p <= 0.0 {
            return Err(ChemeqError::InvalidInput(
                "ChemicalState".into(),
                "pressure".into(),
                p,
            ));
        }
        self.pressure = p;
        Ok(())
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature * KELVIN
    }

    pub fn pressure(&self) -> Pressure {
        self.pressure * PASCAL
    }

    /// Set the amount of the species with the given name (first occurrence
    /// across phases).
    pub fn set_species_amount(&mut self, name: &str, amount: Moles) -> ChemeqResult<()> {
        let i = self.system.species_index(name)?;
        self.set_amount(i, amount)
    }

    /// Set the amount of a species by its global index.
    pub fn set_amount(&mut self, index: usize, amount: Moles) -> ChemeqResult<()> {
        let n = (amount / MOL).into_value();
        if !n.is_finite() || n < 0.0 {
            return Err(ChemeqError::InvalidInput(
                "ChemicalState".into(),
                "amount".into(),
                n,
            ));
        }
        self.amounts[index] = n;
        Ok(())
    }

    /// Set the amount of a species from its mass, using the molar mass
    /// derived from the formula.
    pub fn set_species_mass(&mut self, name: &str, mass: Mass) -> ChemeqResult<()> {
        let i = self.system.species_index(name)?;
        let molar_mass = self.system.molar_masses()[i];
        if molar_mass <= 0.0 {
            return Err(ChemeqError::InvalidInput(
                "ChemicalState".into(),
                "molar mass".into(),
                molar_mass,
            ));
        }
        let m = (mass / KILOGRAM).into_value();
        self.set_amount(i, m / molar_mass * MOL)
    }

    pub fn species_amount(&self, name: &str) -> ChemeqResult<Moles> {
        Ok(self.amounts[self.system.species_index(name)?] * MOL)
    }

    /// Species amounts in mol, in global index order.
    pub fn amounts(&self) -> ArrayView1<f64> {
        self.amounts.view()
    }

    /// Element amounts and total charge of the current composition.
    pub fn element_amounts(&self) -> Array1<f64> {
        self.system.element_amounts(self.amounts.view())
    }

    /// Lagrange multipliers of the element and charge balance equations in
    /// J/mol, populated by the equilibrium solver.
    pub fn element_multipliers(&self) -> ArrayView1<f64> {
        self.element_multipliers.view()
    }

    /// Lagrange multipliers of the non-negativity bounds in J/mol,
    /// populated by the equilibrium solver.
    pub fn species_multipliers(&self) -> ArrayView1<f64> {
        self.species_multipliers.view()
    }

    pub(crate) fn temperature_si(&self) -> f64 {
        self.temperature
    }

    pub(crate) fn pressure_si(&self) -> f64 {
        self.pressure
    }

    pub(crate) fn assign_solution(
        &mut self,
        temperature: f64,
        pressure: f64,
        amounts: Array1<f64>,
        element_multipliers: Array1<f64>,
        species_multipliers: Array1<f64>,
    ) {
        self.temperature = temperature;
        self.pressure = pressure;
        self.amounts = amounts;
        self.element_multipliers = element_multipliers;
        self.species_multipliers = species_multipliers;
    }
}

impl fmt::Display for ChemicalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "T = {:.2} K, p = {:.0} Pa",
            self.temperature, self.pressure
        )?;
        for (s, n) in self.system.species().iter().zip(self.amounts.iter()) {
            writeln!(f, "{:>16}: {:.6e} mol", s.name(), n)?;
        }
        Ok(())
    }
}
