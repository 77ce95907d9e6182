use crate::errors::{ChemeqError, ChemeqResult};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A chemical element with its molar mass.
///
/// The exchanger site of ion exchange phases is modeled as the fictitious
/// element `X` with zero molar mass, following the convention of
/// geochemical databases.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Element {
    /// Element symbol used in species formulas.
    pub symbol: String,
    /// Full element name.
    pub name: String,
    /// Molar mass in kg/mol.
    pub molar_mass: f64,
}

impl Element {
    pub fn new(symbol: &str, name: &str, molar_mass: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            name: name.to_string(),
            molar_mass,
        }
    }
}

/// Lookup table of elements by symbol.
#[derive(Debug, Clone)]
pub struct ElementDatabase {
    elements: IndexMap<String, Element>,
}

impl ElementDatabase {
    /// An empty element database.
    pub fn new() -> Self {
        Self {
            elements: IndexMap::new(),
        }
    }

    /// The built-in table of elements commonly encountered in aqueous
    /// geochemistry, including the exchanger site `X`.
    pub fn with_defaults() -> Self {
        let mut db = Self::new();
        for (symbol, name, molar_mass) in [
            ("H", "hydrogen", 1.008e-3),
            ("He", "helium", 4.002602e-3),
            ("B", "boron", 10.81e-3),
            ("C", "carbon", 12.011e-3),
            ("N", "nitrogen", 14.007e-3),
            ("O", "oxygen", 15.999e-3),
            ("F", "fluorine", 18.998403e-3),
            ("Na", "sodium", 22.98977e-3),
            ("Mg", "magnesium", 24.305e-3),
            ("Al", "aluminium", 26.981538e-3),
            ("Si", "silicon", 28.0855e-3),
            ("P", "phosphorus", 30.973762e-3),
            ("S", "sulfur", 32.06e-3),
            ("Cl", "chlorine", 35.453e-3),
            ("K", "potassium", 39.0983e-3),
            ("Ca", "calcium", 40.078e-3),
            ("Mn", "manganese", 54.938044e-3),
            ("Fe", "iron", 55.845e-3),
            ("Cu", "copper", 63.546e-3),
            ("Zn", "zinc", 65.38e-3),
            ("Sr", "strontium", 87.62e-3),
            ("Ba", "barium", 137.327e-3),
            ("X", "exchanger site", 0.0),
        ] {
            db.add(Element::new(symbol, name, molar_mass));
        }
        db
    }

    /// Add an element, replacing any existing entry with the same symbol.
    pub fn add(&mut self, element: Element) {
        self.elements.insert(element.symbol.clone(), element);
    }

    pub fn get(&self, symbol: &str) -> Option<&Element> {
        self.elements.get(symbol)
    }

    /// Resolve a formula entry, reporting the species name on failure.
    pub(crate) fn resolve(&self, symbol: &str, species: &str) -> ChemeqResult<&Element> {
        self.elements.get(symbol).ok_or_else(|| {
            ChemeqError::UnknownElement(symbol.to_string(), species.to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl Default for ElementDatabase {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn default_table() {
        let db = ElementDatabase::with_defaults();
        assert_relative_eq!(db.get("Na").unwrap().molar_mass, 22.98977e-3);
        assert_relative_eq!(db.get("X").unwrap().molar_mass, 0.0);
        assert!(db.get("Uuo").is_none());
    }

    #[test]
    fn custom_element() {
        let mut db = ElementDatabase::with_defaults();
        db.add(Element::new("Li", "lithium", 6.94e-3));
        assert_relative_eq!(db.get("Li").unwrap().molar_mass, 6.94e-3);
    }
}
