use crate::errors::{ChemeqError, ChemeqResult};
use crate::phase::PhaseKind;
use crate::state::ChemicalState;
use crate::system::ChemicalSystem;
use crate::thermo::standard_props;
use ndarray::{Array1, ArrayView1};
use quantity::{
    Energy, Mass, MolarEnergy, Moles, Pressure, Temperature, Volume, JOULE, KELVIN, KILOGRAM,
    METER, MOL, PASCAL,
};
use std::ops::Div;
use std::sync::Arc;

/// Amount of substance per mass of solvent (mol/kg).
pub type Molality = <Moles as Div<Mass>>::Output;

/// Derived properties of a chemical state.
///
/// The view is a pure function of (system, state): it is recomputed on
/// demand and never cached beyond its own snapshot. It is cheap enough to
/// be evaluated inside constraint equations during an equilibrium
/// iteration.
pub struct ChemicalProps {
    system: Arc<ChemicalSystem>,
    temperature: f64,
    pressure: f64,
    amounts: Array1<f64>,
    ln_activities: Array1<f64>,
    ln_activity_coefficients: Array1<f64>,
    chemical_potentials: Array1<f64>,
    phase_molar_volumes: Vec<f64>,
}

impl ChemicalProps {
    pub fn new(state: &ChemicalState) -> ChemeqResult<Self> {
        Self::from_parts(
            state.system(),
            state.temperature_si(),
            state.pressure_si(),
            state.amounts().to_owned(),
        )
    }

    pub(crate) fn from_parts(
        system: &Arc<ChemicalSystem>,
        temperature: f64,
        pressure: f64,
        amounts: Array1<f64>,
    ) -> ChemeqResult<Self> {
        let eval = system.evaluate(temperature, pressure, amounts.view())?;
        Ok(Self {
            system: system.clone(),
            temperature,
            pressure,
            amounts,
            ln_activities: eval.ln_activities,
            ln_activity_coefficients: eval.ln_activity_coefficients,
            chemical_potentials: eval.chemical_potentials,
            phase_molar_volumes: eval.phase_molar_volumes,
        })
    }

    pub fn system(&self) -> &Arc<ChemicalSystem> {
        &self.system
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature * KELVIN
    }

    pub fn pressure(&self) -> Pressure {
        self.pressure * PASCAL
    }

    /// Species amounts in mol, in global index order.
    pub fn amounts(&self) -> ArrayView1<f64> {
        self.amounts.view()
    }

    pub fn species_amount(&self, name: &str) -> ChemeqResult<Moles> {
        Ok(self.amounts[self.system.species_index(name)?] * MOL)
    }

    /// Mole fraction of a species within its phase, zero for a vanished
    /// phase.
    pub fn mole_fraction(&self, name: &str) -> ChemeqResult<f64> {
        let i = self.system.species_index(name)?;
        let range = self.system.phase_range(self.system.phase_of_species(i));
        let total: f64 = self.amounts.slice(ndarray::s![range]).sum();
        Ok(if total > 0.0 {
            self.amounts[i] / total
        } else {
            0.0
        })
    }

    /// Total amount of the species of a named phase.
    pub fn phase_amount(&self, phase: &str) -> ChemeqResult<Moles> {
        let p = self
            .system
            .phases()
            .iter()
            .position(|ph| ph.name() == phase)
            .ok_or_else(|| ChemeqError::MissingPhase(phase.to_string()))?;
        let range = self.system.phase_range(p);
        Ok(self.amounts.slice(ndarray::s![range]).sum() * MOL)
    }

    /// Natural logarithm of the activity of a species.
    pub fn ln_activity(&self, name: &str) -> ChemeqResult<f64> {
        Ok(self.ln_activities[self.system.species_index(name)?])
    }

    /// Natural logarithm of the activity of the species with the given
    /// global index.
    pub fn ln_activity_by_index(&self, index: usize) -> f64 {
        self.ln_activities[index]
    }

    pub fn ln_activity_coefficient(&self, name: &str) -> ChemeqResult<f64> {
        Ok(self.ln_activity_coefficients[self.system.species_index(name)?])
    }

    /// Total chemical potential of a species.
    pub fn chemical_potential(&self, name: &str) -> ChemeqResult<MolarEnergy> {
        Ok(self.chemical_potentials[self.system.species_index(name)?] * (JOULE / MOL))
    }

    /// Fugacity of a gaseous species, $f_i=\exp(\ln a_i)\\,p^0$.
    pub fn fugacity(&self, name: &str) -> ChemeqResult<Pressure> {
        let i = self.system.species_index(name)?;
        let p = self.system.phase_of_species(i);
        if self.system.phases()[p].kind() != PhaseKind::Gaseous {
            return Err(ChemeqError::Error(format!(
                "species `{name}` is not in a gaseous phase"
            )));
        }
        Ok(self.ln_activities[i].exp() * crate::P_REF * PASCAL)
    }

    /// Element amounts and charge, the formula matrix times the amounts.
    pub fn element_amount(&self, symbol: &str) -> ChemeqResult<Moles> {
        let i = self.system.element_index(symbol)?;
        let b = self.system.element_amounts(self.amounts.view());
        Ok(b[i] * MOL)
    }

    /// Element amount within one named phase.
    pub fn element_amount_in_phase(&self, symbol: &str, phase: &str) -> ChemeqResult<Moles> {
        let i = self.system.element_index(symbol)?;
        let p = self
            .system
            .phases()
            .iter()
            .position(|ph| ph.name() == phase)
            .ok_or_else(|| ChemeqError::MissingPhase(phase.to_string()))?;
        let range = self.system.phase_range(p);
        let mut amount = 0.0;
        for j in range {
            amount += self.system.formula_matrix()[(i, j)] * self.amounts[j];
        }
        Ok(amount * MOL)
    }

    /// Net electric charge of the system.
    pub fn charge(&self) -> Moles {
        let b = self.system.element_amounts(self.amounts.view());
        b[self.system.element_count()] * MOL
    }

    /// Total volume, assembled from the phase molar volumes.
    pub fn volume(&self) -> Volume {
        let mut v = 0.0;
        for (p, vm) in self.phase_molar_volumes.iter().enumerate() {
            let range = self.system.phase_range(p);
            v += self.amounts.slice(ndarray::s![range]).sum() * vm;
        }
        v * (METER * METER * METER)
    }

    /// Total Gibbs energy $G=\sum_i n_i\mu_i$.
    pub fn gibbs_energy(&self) -> Energy {
        (&self.amounts * &self.chemical_potentials).sum() * JOULE
    }

    /// Total enthalpy from the standard molar enthalpies of the species.
    ///
    /// Temperature derivatives of the activity coefficients are neglected,
    /// consistent with the ideal-form activity models of this crate.
    pub fn enthalpy(&self) -> Energy {
        let mut h = 0.0;
        for (s, n) in self.system.species().iter().zip(self.amounts.iter()) {
            if *n > 0.0 {
                h += n * standard_props(s.thermo().as_ref(), self.temperature, self.pressure)
                    .enthalpy;
            }
        }
        h * JOULE
    }

    /// Total internal energy $U=H-pV$.
    pub fn internal_energy(&self) -> Energy {
        self.enthalpy() - self.pressure() * self.volume()
    }
}

/// Derived properties of the aqueous phase of a state: pH, ionic strength
/// and molalities.
pub struct AqueousProps {
    props: ChemicalProps,
    phase_index: usize,
    solvent_index: usize,
    /// Mass of the solvent water in kg.
    solvent_mass: f64,
}

impl AqueousProps {
    pub fn new(state: &ChemicalState) -> ChemeqResult<Self> {
        let props = ChemicalProps::new(state)?;
        Self::from_props(props)
    }

    pub(crate) fn from_props(props: ChemicalProps) -> ChemeqResult<Self> {
        let system = props.system.clone();
        let phase_index = system
            .aqueous_phase_index()
            .ok_or_else(|| ChemeqError::MissingPhase("aqueous".to_string()))?;
        let phase = &system.phases()[phase_index];
        let local = phase.solvent_index().ok_or_else(|| {
            ChemeqError::Error("the aqueous phase contains no water solvent".to_string())
        })?;
        let solvent_index = system.phase_range(phase_index).start + local;
        let solvent_mass =
            props.amounts[solvent_index] * system.molar_masses()[solvent_index];
        if solvent_mass <= 0.0 {
            return Err(ChemeqError::Error(
                "the aqueous phase contains no solvent water".to_string(),
            ));
        }
        Ok(Self {
            props,
            phase_index,
            solvent_index,
            solvent_mass,
        })
    }

    pub fn props(&self) -> &ChemicalProps {
        &self.props
    }

    pub fn solvent_mass(&self) -> Mass {
        self.solvent_mass * KILOGRAM
    }

    /// The pH, $-\log_{10}a_{\text{H}^+}$.
    pub fn ph(&self) -> ChemeqResult<f64> {
        let system = &self.props.system;
        let range = system.phase_range(self.phase_index);
        let hydron = range
            .clone()
            .find(|&i| {
                let s = &system.species()[i];
                s.charge() == 1.0
                    && s.formula().len() == 1
                    && s.element_coefficient("H") == 1.0
            })
            .ok_or_else(|| {
                ChemeqError::Error("the aqueous phase contains no H+ species".to_string())
            })?;
        Ok(-self.props.ln_activities[hydron] / std::f64::consts::LN_10)
    }

    /// Molality of an aqueous species in mol per kg of solvent.
    pub fn molality(&self, name: &str) -> ChemeqResult<Molality> {
        let system = &self.props.system;
        let i = system.species_index(name)?;
        if !system.phase_range(self.phase_index).contains(&i) {
            return Err(ChemeqError::Error(format!(
                "species `{name}` is not in the aqueous phase"
            )));
        }
        Ok(self.props.amounts[i] / self.solvent_mass * (MOL / KILOGRAM))
    }

    /// Molality of an element in the aqueous phase, excluding the solvent.
    pub fn element_molality(&self, symbol: &str) -> ChemeqResult<Molality> {
        let system = &self.props.system;
        let e = system.element_index(symbol)?;
        let mut amount = 0.0;
        for i in system.phase_range(self.phase_index) {
            if i != self.solvent_index {
                amount += system.formula_matrix()[(e, i)] * self.props.amounts[i];
            }
        }
        Ok(amount / self.solvent_mass * (MOL / KILOGRAM))
    }

    /// Ionic strength $I=\tfrac12\sum_i m_iz_i^2$ of the aqueous phase.
    pub fn ionic_strength(&self) -> Molality {
        let system = &self.props.system;
        let mut strength = 0.0;
        for i in system.phase_range(self.phase_index) {
            let z = system.species()[i].charge();
            strength += 0.5 * self.props.amounts[i] * z * z;
        }
        strength / self.solvent_mass * (MOL / KILOGRAM)
    }
}
