use crate::element::{Element, ElementDatabase};
use crate::errors::{ChemeqError, ChemeqResult};
use crate::phase::{Phase, PhaseKind};
use crate::species::Species;
use crate::RGAS;
use indexmap::IndexMap;
use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1};
use std::fmt;
use std::ops::Range;

/// The immutable assembly of phases and species defining the index space of
/// a calculation.
///
/// The global species index is the concatenation of the phase-local
/// indices in phase order. The formula matrix maps species to element
/// amounts; its trailing row carries the electric charge and is used for
/// charge balance.
///
/// A system is built once and shared (typically behind an [std::sync::Arc])
/// by all states and solvers referencing it. It holds no interior mutable
/// state, so sharing across threads is safe.
pub struct ChemicalSystem {
    phases: Vec<Phase>,
    species: Vec<Species>,
    elements: Vec<Element>,
    formula_matrix: Array2<f64>,
    species_names: IndexMap<String, usize>,
    phase_ranges: Vec<Range<usize>>,
    molar_masses: Vec<f64>,
}

/// Activities and chemical potentials of all species at one composition.
pub(crate) struct SystemEvaluation {
    /// Standard molar Gibbs energies in J/mol.
    pub standard_gibbs_energies: Array1<f64>,
    pub ln_activities: Array1<f64>,
    pub ln_activity_coefficients: Array1<f64>,
    /// Total chemical potentials $\mu_i=G^0_i+RT\ln a_i$ in J/mol.
    pub chemical_potentials: Array1<f64>,
    /// Molar volume of every phase in m³/mol.
    pub phase_molar_volumes: Vec<f64>,
}

impl ChemicalSystem {
    /// Build a system from phases, resolving formulas against the built-in
    /// element table.
    pub fn new(phases: Vec<Phase>) -> ChemeqResult<Self> {
        Self::with_elements(phases, &ElementDatabase::with_defaults())
    }

    /// Build a system from phases and an explicit element database.
    ///
    /// Fails fast if a species formula contains an unknown element, if a
    /// phase has no activity model, or if a species name is duplicated
    /// within a phase. The same species name in different phases is
    /// permitted; name lookups then resolve to the first occurrence and
    /// phase-qualified lookups remain available.
    pub fn with_elements(
        phases: Vec<Phase>,
        element_db: &ElementDatabase,
    ) -> ChemeqResult<Self> {
        let mut elements: Vec<Element> = Vec::new();
        let mut species = Vec::new();
        let mut species_names = IndexMap::new();
        let mut phase_ranges = Vec::with_capacity(phases.len());
        let mut molar_masses = Vec::new();

        let mut offset = 0;
        for phase in &phases {
            if phase.species().is_empty() {
                return Err(ChemeqError::EmptyPhase(phase.name().to_string()));
            }
            if !phase.has_activity_model() {
                return Err(ChemeqError::MissingActivityModel(phase.name().to_string()));
            }
            phase_ranges.push(offset..offset + phase.len());
            for s in phase.species() {
                for symbol in s.formula().keys() {
                    let element = element_db.resolve(symbol, s.name())?;
                    if !elements.iter().any(|e| &e.symbol == symbol) {
                        elements.push(element.clone());
                    }
                }
                molar_masses.push(s.molar_mass(element_db)?);
                species_names.entry(s.name().to_string()).or_insert(offset);
                species.push(s.clone());
                offset += 1;
            }
        }

        let ns = species.len();
        let ne = elements.len();
        let mut formula_matrix = Array2::zeros((ne + 1, ns));
        for (j, s) in species.iter().enumerate() {
            for (i, e) in elements.iter().enumerate() {
                formula_matrix[(i, j)] = s.element_coefficient(&e.symbol);
            }
            formula_matrix[(ne, j)] = s.charge();
        }

        Ok(Self {
            phases,
            species,
            elements,
            formula_matrix,
            species_names,
            phase_ranges,
            molar_masses,
        })
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// All species in global index order.
    pub fn species(&self) -> &[Species] {
        &self.species
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// The elements of the system (the charge row is not an element).
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// The formula matrix: one row per element plus a trailing charge row,
    /// one column per species.
    pub fn formula_matrix(&self) -> &Array2<f64> {
        &self.formula_matrix
    }

    /// Number of balance equations (elements plus charge).
    pub fn balance_count(&self) -> usize {
        self.element_count() + 1
    }

    /// Global index of a species by name (first occurrence across phases).
    pub fn species_index(&self, name: &str) -> ChemeqResult<usize> {
        self.species_names
            .get(name)
            .copied()
            .ok_or_else(|| ChemeqError::UnknownSpecies(name.to_string()))
    }

    /// Global index of a species within a named phase.
    pub fn species_index_in_phase(&self, phase: &str, name: &str) -> ChemeqResult<usize> {
        let (p, phase) = self
            .phases
            .iter()
            .enumerate()
            .find(|(_, ph)| ph.name() == phase)
            .ok_or_else(|| ChemeqError::MissingPhase(phase.to_string()))?;
        let local = phase
            .species()
            .iter()
            .position(|s| s.name() == name)
            .ok_or_else(|| ChemeqError::UnknownSpecies(name.to_string()))?;
        Ok(self.phase_ranges[p].start + local)
    }

    pub fn element_index(&self, symbol: &str) -> ChemeqResult<usize> {
        self.elements
            .iter()
            .position(|e| e.symbol == symbol)
            .ok_or_else(|| ChemeqError::UnknownElement(symbol.to_string(), "system".to_string()))
    }

    /// The global index range of the species of phase `p`.
    pub fn phase_range(&self, p: usize) -> Range<usize> {
        self.phase_ranges[p].clone()
    }

    /// Index of the phase containing the species with global index `i`.
    pub fn phase_of_species(&self, i: usize) -> usize {
        self.phase_ranges
            .iter()
            .position(|r| r.contains(&i))
            .expect("species index out of range")
    }

    /// Index of the first aqueous phase, if any.
    pub fn aqueous_phase_index(&self) -> Option<usize> {
        self.phases.iter().position(|p| p.kind() == PhaseKind::Aqueous)
    }

    /// Molar masses of all species in kg/mol.
    pub fn molar_masses(&self) -> &[f64] {
        &self.molar_masses
    }

    /// Element amounts (and total charge in the trailing entry) for the
    /// given species amounts: the formula matrix times the amounts vector.
    pub fn element_amounts(&self, amounts: ArrayView1<f64>) -> Array1<f64> {
        self.formula_matrix.dot(&amounts)
    }

    /// The formula matrix column of an arbitrary species, resolved against
    /// the elements of this system. Used for titrants that are not
    /// themselves part of the system.
    pub fn formula_column(&self, species: &Species) -> ChemeqResult<Array1<f64>> {
        let mut column = Array1::zeros(self.balance_count());
        for (symbol, nu) in species.formula() {
            let i = self.element_index(symbol).map_err(|_| {
                ChemeqError::UnknownElement(symbol.clone(), species.name().to_string())
            })?;
            column[i] = *nu;
        }
        column[self.element_count()] = species.charge();
        Ok(column)
    }

    /// Evaluate all phases at the given temperature (K), pressure (Pa) and
    /// species amounts (mol).
    pub(crate) fn evaluate(
        &self,
        temperature: f64,
        pressure: f64,
        amounts: ArrayView1<f64>,
    ) -> ChemeqResult<SystemEvaluation> {
        let ns = self.species_count();
        let mut ln_activities = Array1::zeros(ns);
        let mut ln_activity_coefficients = Array1::zeros(ns);
        let mut phase_molar_volumes = Vec::with_capacity(self.phases.len());

        for (p, phase) in self.phases.iter().enumerate() {
            let range = self.phase_ranges[p].clone();
            let result = phase.evaluate(
                temperature,
                pressure,
                amounts.slice(ndarray::s![range.clone()]),
            )?;
            ln_activities
                .slice_mut(ndarray::s![range.clone()])
                .assign(&result.ln_activities);
            ln_activity_coefficients
                .slice_mut(ndarray::s![range])
                .assign(&result.ln_activity_coefficients);
            phase_molar_volumes.push(result.molar_volume.unwrap_or(0.0));
        }

        let standard_gibbs_energies = Array1::from_shape_fn(ns, |i| {
            self.species[i].standard_gibbs_energy(temperature, pressure)
        });
        let chemical_potentials =
            &standard_gibbs_energies + &(&ln_activities * (RGAS * temperature));

        Ok(SystemEvaluation {
            standard_gibbs_energies,
            ln_activities,
            ln_activity_coefficients,
            chemical_potentials,
            phase_molar_volumes,
        })
    }
}

impl fmt::Display for ChemicalSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ChemicalSystem({} phases, {} species, elements: {})",
            self.phases.len(),
            self.species_count(),
            self.elements.iter().map(|e| &e.symbol).join(" ")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{ActivityInput, ActivityModel, PhaseActivity};
    use crate::thermo::ConstantGibbsEnergy;
    use approx::assert_relative_eq;
    use ndarray::arr1;
    use std::sync::Arc;

    struct Ideal;

    impl ActivityModel for Ideal {
        fn evaluate(&self, input: &ActivityInput) -> PhaseActivity {
            PhaseActivity::ideal(input.mole_fractions().mapv(|x| x.max(1e-300).ln()))
        }
    }

    impl fmt::Display for Ideal {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "Ideal")
        }
    }

    fn species(name: &str, formula: &[(&str, f64)], charge: f64) -> Species {
        Species::new(name, formula, charge, Arc::new(ConstantGibbsEnergy::new(0.0)))
    }

    fn test_system() -> ChemicalSystem {
        let solution = Phase::new(
            "aqueous",
            PhaseKind::Aqueous,
            vec![
                species("H2O", &[("H", 2.0), ("O", 1.0)], 0.0),
                species("Na+", &[("Na", 1.0)], 1.0),
                species("Cl-", &[("Cl", 1.0)], -1.0),
            ],
        )
        .unwrap()
        .with_activity_model(Arc::new(Ideal));
        let halite = Phase::new(
            "Halite",
            PhaseKind::Mineral,
            vec![species("Halite", &[("Na", 1.0), ("Cl", 1.0)], 0.0)],
        )
        .unwrap()
        .with_activity_model(Arc::new(Ideal));
        ChemicalSystem::new(vec![solution, halite]).unwrap()
    }

    #[test]
    fn formula_matrix() {
        let system = test_system();
        assert_eq!(system.species_count(), 4);
        assert_eq!(system.element_count(), 4); // H O Na Cl
        let a = system.formula_matrix();
        let i_na = system.element_index("Na").unwrap();
        let j_halite = system.species_index("Halite").unwrap();
        assert_relative_eq!(a[(i_na, j_halite)], 1.0);
        // charge row
        let j_na = system.species_index("Na+").unwrap();
        assert_relative_eq!(a[(system.element_count(), j_na)], 1.0);
    }

    #[test]
    fn element_amounts_and_charge() {
        let system = test_system();
        let n = arr1(&[55.5, 0.5, 0.3, 0.1]);
        let b = system.element_amounts(n.view());
        let i_cl = system.element_index("Cl").unwrap();
        assert_relative_eq!(b[i_cl], 0.3 + 0.1);
        // net charge
        assert_relative_eq!(b[system.element_count()], 0.5 - 0.3);
    }

    #[test]
    fn unknown_element_fails_fast() {
        let phase = Phase::new(
            "aqueous",
            PhaseKind::Aqueous,
            vec![species("Qz+", &[("Qz", 1.0)], 1.0)],
        )
        .unwrap()
        .with_activity_model(Arc::new(Ideal));
        assert!(ChemicalSystem::new(vec![phase]).is_err());
    }

    #[test]
    fn missing_activity_model_fails_fast() {
        let phase = Phase::new(
            "aqueous",
            PhaseKind::Aqueous,
            vec![species("H2O", &[("H", 2.0), ("O", 1.0)], 0.0)],
        )
        .unwrap();
        assert!(ChemicalSystem::new(vec![phase]).is_err());
    }

    #[test]
    fn phase_qualified_lookup() {
        let system = test_system();
        assert_eq!(system.species_index_in_phase("Halite", "Halite").unwrap(), 3);
        assert_eq!(system.phase_of_species(3), 1);
        assert_eq!(system.phase_range(0), 0..3);
    }

    #[test]
    fn titrant_column() {
        let system = test_system();
        let co2 = species("CO2", &[("C", 1.0), ("O", 2.0)], 0.0);
        // carbon is not an element of this system
        assert!(system.formula_column(&co2).is_err());
        let hcl = species("HCl", &[("H", 1.0), ("Cl", 1.0)], 0.0);
        let column = system.formula_column(&hcl).unwrap();
        assert_relative_eq!(column[system.element_index("H").unwrap()], 1.0);
        assert_relative_eq!(column[system.element_index("Cl").unwrap()], 1.0);
    }
}
