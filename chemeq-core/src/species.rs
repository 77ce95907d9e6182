use crate::element::ElementDatabase;
use crate::errors::{ChemeqError, ChemeqResult};
use crate::thermo::{StandardThermoModel, ThermoRecord};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A chemical species: name, elemental formula, electric charge and a
/// standard thermodynamic property model.
///
/// Species are immutable after construction. The formula is an explicit
/// mapping from element symbols to stoichiometric coefficients; no formula
/// string parsing is performed.
#[derive(Clone)]
pub struct Species {
    name: String,
    formula: IndexMap<String, f64>,
    charge: f64,
    thermo: Arc<dyn StandardThermoModel>,
}

impl Species {
    pub fn new(
        name: &str,
        formula: &[(&str, f64)],
        charge: f64,
        thermo: Arc<dyn StandardThermoModel>,
    ) -> Self {
        Self {
            name: name.to_string(),
            formula: formula
                .iter()
                .map(|(symbol, nu)| (symbol.to_string(), *nu))
                .collect(),
            charge,
            thermo,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element symbols and stoichiometric coefficients.
    pub fn formula(&self) -> &IndexMap<String, f64> {
        &self.formula
    }

    pub fn charge(&self) -> f64 {
        self.charge
    }

    pub fn thermo(&self) -> &Arc<dyn StandardThermoModel> {
        &self.thermo
    }

    /// Stoichiometric coefficient of an element in the formula.
    pub fn element_coefficient(&self, symbol: &str) -> f64 {
        self.formula.get(symbol).copied().unwrap_or(0.0)
    }

    /// Molar mass in kg/mol, resolved against an element database.
    pub fn molar_mass(&self, elements: &ElementDatabase) -> ChemeqResult<f64> {
        let mut mass = 0.0;
        for (symbol, nu) in &self.formula {
            mass += nu * elements.resolve(symbol, &self.name)?.molar_mass;
        }
        Ok(mass)
    }

    /// The standard molar Gibbs energy in J/mol at the given temperature
    /// (K) and pressure (Pa).
    pub fn standard_gibbs_energy(&self, temperature: f64, pressure: f64) -> f64 {
        self.thermo.standard_gibbs_energy(temperature, pressure)
    }

    /// Whether this species is water, identified by its formula H2O and
    /// zero charge. Used to locate the solvent of aqueous phases.
    pub fn is_water(&self) -> bool {
        self.charge == 0.0
            && self.formula.len() == 2
            && self.element_coefficient("H") == 2.0
            && self.element_coefficient("O") == 1.0
    }
}

impl fmt::Debug for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Species({})", self.name)
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] z={}",
            self.name,
            self.formula
                .iter()
                .map(|(symbol, nu)| format!("{symbol}:{nu}"))
                .join(" "),
            self.charge
        )
    }
}

/// Serializable record of a single species.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpeciesRecord {
    pub name: String,
    pub formula: IndexMap<String, f64>,
    #[serde(default)]
    pub charge: f64,
    pub thermo: ThermoRecord,
}

impl SpeciesRecord {
    pub fn build(&self) -> ChemeqResult<Species> {
        Ok(Species {
            name: self.name.clone(),
            formula: self.formula.clone(),
            charge: self.charge,
            thermo: self.thermo.build()?,
        })
    }
}

/// A catalog of species keyed by name.
///
/// The catalog is typically populated by an external database loader; the
/// core only requires lookup by name. Reading records from json is
/// supported, parsing of any specific thermodynamic database file format is
/// not.
#[derive(Clone, Default)]
pub struct SpeciesDatabase {
    species: IndexMap<String, Species>,
}

impl SpeciesDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: &[SpeciesRecord]) -> ChemeqResult<Self> {
        let mut db = Self::new();
        for record in records {
            db.add(record.build()?)?;
        }
        Ok(db)
    }

    pub fn from_json(json: &str) -> ChemeqResult<Self> {
        let records: Vec<SpeciesRecord> = serde_json::from_str(json)?;
        Self::from_records(&records)
    }

    pub fn add(&mut self, species: Species) -> ChemeqResult<()> {
        if self.species.contains_key(&species.name) {
            return Err(ChemeqError::DuplicateSpecies(
                species.name.clone(),
                "database".to_string(),
            ));
        }
        self.species.insert(species.name.clone(), species);
        Ok(())
    }

    pub fn get(&self, name: &str) -> ChemeqResult<&Species> {
        self.species
            .get(name)
            .ok_or_else(|| ChemeqError::UnknownSpecies(name.to_string()))
    }

    /// Fetch several species at once, preserving the requested order.
    pub fn get_all(&self, names: &[&str]) -> ChemeqResult<Vec<Species>> {
        names.iter().map(|name| Ok(self.get(name)?.clone())).collect()
    }

    pub fn species(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thermo::ConstantGibbsEnergy;
    use approx::assert_relative_eq;

    #[test]
    fn molar_mass() {
        let elements = ElementDatabase::with_defaults();
        let water = Species::new(
            "H2O",
            &[("H", 2.0), ("O", 1.0)],
            0.0,
            Arc::new(ConstantGibbsEnergy::new(-237.14e3)),
        );
        assert_relative_eq!(
            water.molar_mass(&elements).unwrap(),
            2.0 * 1.008e-3 + 15.999e-3
        );
        assert!(water.is_water());

        let unknown = Species::new(
            "QzO",
            &[("Qz", 1.0), ("O", 1.0)],
            0.0,
            Arc::new(ConstantGibbsEnergy::new(0.0)),
        );
        assert!(unknown.molar_mass(&elements).is_err());
    }

    #[test]
    fn database_from_json() {
        let json = r#"[
            {
                "name": "Na+",
                "formula": {"Na": 1.0},
                "charge": 1.0,
                "thermo": {"model": "reference", "g0": -261880.0, "s0": 59.0}
            },
            {
                "name": "Cl-",
                "formula": {"Cl": 1.0},
                "charge": -1.0,
                "thermo": {"model": "constant", "g0": -131290.0}
            }
        ]"#;
        let db = SpeciesDatabase::from_json(json).unwrap();
        assert_eq!(db.len(), 2);
        assert_relative_eq!(db.get("Na+").unwrap().charge(), 1.0);
        assert_relative_eq!(
            db.get("Cl-").unwrap().standard_gibbs_energy(298.15, 1.0e5),
            -131290.0
        );
        assert!(db.get("K+").is_err());
    }

    #[test]
    fn duplicate_species_rejected() {
        let na = Species::new(
            "Na+",
            &[("Na", 1.0)],
            1.0,
            Arc::new(ConstantGibbsEnergy::new(0.0)),
        );
        let mut db = SpeciesDatabase::new();
        db.add(na.clone()).unwrap();
        assert!(db.add(na).is_err());
    }
}
